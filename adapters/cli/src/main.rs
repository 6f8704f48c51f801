#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless Wallbreaker session.

mod autopilot;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;

use crate::{autopilot::Settings, config::GameConfig};

/// Runs an automated Wallbreaker session without a window and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "wallbreaker", version)]
struct Cli {
    /// TOML file overriding the default tuning.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of floors to play before stopping.
    #[arg(long, default_value_t = 3)]
    floors: u32,
    /// Seconds of play on each floor before descending.
    #[arg(long, default_value_t = 30.0)]
    seconds_per_floor: f32,
    /// Simulation steps per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Seed for every random roll; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// Print debug logs.
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Wallbreaker command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => GameConfig::default(),
    };

    ensure!(cli.fps > 0, "--fps must be positive");
    ensure!(
        cli.seconds_per_floor.is_finite() && cli.seconds_per_floor > 0.0,
        "--seconds-per-floor must be a positive number"
    );

    let settings = Settings {
        floors: cli.floors,
        seconds_per_floor: cli.seconds_per_floor,
        fps: cli.fps,
        seed: cli.seed.or(config.seed),
    };
    let summary = autopilot::run(config.world, &settings).context("autopilot session failed")?;
    println!("{summary}");
    Ok(())
}
