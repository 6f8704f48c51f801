//! Loading of the TOML game configuration.

use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// Everything a session can be tuned with.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct GameConfig {
    /// Seed for every random roll; entropy when absent.
    pub(crate) seed: Option<u64>,
    /// Tuning handed to the world.
    pub(crate) world: wallbreaker_world::Config,
}

/// Failure to produce a [`GameConfig`].
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("could not read configuration file")]
    Read(#[from] io::Error),
    /// The file is not valid TOML or does not match the expected layout.
    #[error("invalid configuration")]
    Parse(#[from] toml::de::Error),
}

/// Reads and parses the configuration stored at `path`.
pub(crate) fn load(path: &Path) -> Result<GameConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}

fn parse(text: &str) -> Result<GameConfig, ConfigError> {
    let config: GameConfig = toml::from_str(text)?;
    log::debug!("parsed configuration {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse("").expect("valid toml"), GameConfig::default());
    }

    #[test]
    fn nested_tables_override_single_fields() {
        let config = parse(
            r#"
            seed = 42

            [world]
            tank_oxygen = 35.0

            [world.enemies]
            elite_chance = 0.5

            [world.player.stats]
            max_hp = 9
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.world.tank_oxygen, 35.0);
        assert_eq!(config.world.enemies.elite_chance, 0.5);
        assert_eq!(config.world.player.stats.max_hp, 9);
        assert_eq!(
            config.world.enemies.spawner_max_alive,
            wallbreaker_world::Config::default().enemies.spawner_max_alive
        );
    }

    #[test]
    fn partial_tank_table_keeps_tank_defaults() {
        let config = parse("[world.oxygen_tanks]\nradius = 12.0\n").expect("valid toml");
        let defaults = wallbreaker_world::Config::default();

        assert_eq!(config.world.oxygen_tanks.radius, 12.0);
        assert_eq!(
            config.world.oxygen_tanks.drop_chance,
            defaults.oxygen_tanks.drop_chance
        );
        assert_eq!(
            config.world.oxygen_tanks.attract_speed,
            defaults.oxygen_tanks.attract_speed
        );
        assert_eq!(config.world.gems, defaults.gems);
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(matches!(
            parse("[world]\nelite_gem_burst = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
