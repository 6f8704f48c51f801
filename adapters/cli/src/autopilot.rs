//! Scripted player that drives a headless world.
//!
//! The pilot breaks a wall near the player at a fixed cadence, swings at
//! whatever is close, walks to the nearest loot (or the nearest enemy when no
//! loot is lying around), takes the first upgrade it is offered and descends
//! once the time budget of a floor is spent.

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use anyhow::Result;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wallbreaker_core::{listener, EventKind, GameEvent, HeadlessScene, UpgradeKind, WallColor};
use wallbreaker_world::{Config, Phase, World};

const WALL_REACH: f32 = 90.0;
const WALL_EVERY: u64 = 12;
const ATTACK_EVERY: u64 = 6;
const WALL_COLORS: [WallColor; 3] = [
    WallColor::from_rgb(0x6b, 0x5a, 0x4a),
    WallColor::from_rgb(0x4e, 0x5d, 0x6c),
    WallColor::from_rgb(0x7a, 0x4b, 0x3a),
];
const TALLIED: [EventKind; 8] = [
    EventKind::WallDestroyed,
    EventKind::EnemyDied,
    EventKind::EliteDied,
    EventKind::GemCollected,
    EventKind::OxygenTankCollected,
    EventKind::ChestCollected,
    EventKind::UpgradeSelected,
    EventKind::PlayerDamaged,
];

/// Shape of an autopilot session.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) floors: u32,
    pub(crate) seconds_per_floor: f32,
    pub(crate) fps: u32,
    pub(crate) seed: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Tally {
    walls: u32,
    enemies: u32,
    elites: u32,
    gems: u32,
    tanks: u32,
    chests: u32,
    upgrades: u32,
    hits: u32,
}

impl Tally {
    fn record(&mut self, event: &GameEvent) {
        let counter = match event {
            GameEvent::WallDestroyed { .. } => &mut self.walls,
            GameEvent::EnemyDied { .. } => &mut self.enemies,
            GameEvent::EliteDied { .. } => &mut self.elites,
            GameEvent::GemCollected { .. } => &mut self.gems,
            GameEvent::OxygenTankCollected { .. } => &mut self.tanks,
            GameEvent::ChestCollected { .. } => &mut self.chests,
            GameEvent::UpgradeSelected { .. } => &mut self.upgrades,
            GameEvent::PlayerDamaged { .. } => &mut self.hits,
            _ => return,
        };
        *counter += 1;
    }
}

/// Outcome of a session.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    floor: u32,
    level: u32,
    hp: u32,
    oxygen: f32,
    phase: Phase,
    elapsed: Duration,
    tally: Tally,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.phase {
            Phase::GameOver => "defeated",
            Phase::Running | Phase::ChoosingUpgrade => "survived",
        };
        writeln!(f, "outcome:        {outcome} after {:.1}s", self.elapsed.as_secs_f32())?;
        writeln!(f, "floor reached:  {}", self.floor)?;
        writeln!(f, "level:          {}", self.level)?;
        writeln!(f, "hit points:     {}", self.hp)?;
        writeln!(f, "oxygen left:    {:.1}s", self.oxygen)?;
        writeln!(f, "walls broken:   {}", self.tally.walls)?;
        writeln!(
            f,
            "enemies slain:  {} ({} elite)",
            self.tally.enemies + self.tally.elites,
            self.tally.elites
        )?;
        writeln!(f, "gems collected: {}", self.tally.gems)?;
        writeln!(f, "oxygen tanks:   {}", self.tally.tanks)?;
        writeln!(f, "chests opened:  {}", self.tally.chests)?;
        writeln!(f, "upgrades taken: {}", self.tally.upgrades)?;
        write!(f, "hits taken:     {}", self.tally.hits)
    }
}

/// Plays a whole session with the provided tuning.
pub(crate) fn run(config: Config, settings: &Settings) -> Result<Summary> {
    let mut rng = match settings.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut world = World::with_seed(config, HeadlessScene::new(), rng.gen());

    let tally = Rc::new(RefCell::new(Tally::default()));
    let sink = Rc::clone(&tally);
    let recorder = listener(move |event| {
        sink.try_borrow_mut()?.record(event);
        Ok(())
    });
    for kind in TALLIED {
        world.bus().on(kind, &recorder);
    }

    let dt = Duration::from_secs_f64(1.0 / f64::from(settings.fps));
    let frames_per_floor = (settings.seconds_per_floor * settings.fps as f32).ceil() as u32;
    let mut pilot = Pilot { rng, frame: 0 };

    'floors: for played in 1..=settings.floors {
        for _ in 0..frames_per_floor {
            if !pilot.step(&mut world, dt)? {
                break 'floors;
            }
        }
        if played == settings.floors {
            break;
        }

        if !pilot.settle(&mut world)? {
            break;
        }
        let target = world.floor().floor() + 1;
        let _ = world.descend()?;
        while world.floor().floor() < target {
            if !pilot.step(&mut world, dt)? {
                break 'floors;
            }
        }
    }

    let progression = world.progression()?;
    let summary = Summary {
        floor: world.floor().floor(),
        level: progression.level(),
        hp: world.player().hp(),
        oxygen: world.oxygen()?.remaining(),
        phase: world.phase(),
        elapsed: pilot.elapsed(dt),
        tally: tally.try_borrow()?.clone(),
    };
    log::info!("session finished on floor {}", summary.floor);
    Ok(summary)
}

struct Pilot {
    rng: ChaCha8Rng,
    frame: u64,
}

impl Pilot {
    /// Plays one frame; `false` once the game is over.
    fn step(&mut self, world: &mut World<HeadlessScene>, dt: Duration) -> Result<bool> {
        match world.phase() {
            Phase::GameOver => return Ok(false),
            Phase::ChoosingUpgrade => {
                self.choose(world)?;
                return Ok(true);
            }
            Phase::Running => {}
        }

        self.frame += 1;
        let position = world.player().position();

        if self.frame % WALL_EVERY == 0 {
            let offset = Vec2::new(
                self.rng.gen_range(-WALL_REACH..WALL_REACH),
                self.rng.gen_range(-WALL_REACH..WALL_REACH),
            );
            let color = WALL_COLORS[self.rng.gen_range(0..WALL_COLORS.len())];
            let wall = position + offset;
            world.destroy_wall(wall.x, wall.y, color)?;
        }

        if self.frame % ATTACK_EVERY == 0 {
            let _ = world.attack()?;
        }

        if let Some(target) = nearest_target(world)? {
            world.move_player(target - position, dt)?;
        }

        world.update(dt)?;
        Ok(true)
    }

    /// Spends every pending pick; `false` when the game is over.
    fn settle(&mut self, world: &mut World<HeadlessScene>) -> Result<bool> {
        while world.phase() == Phase::ChoosingUpgrade {
            self.choose(world)?;
        }
        Ok(world.phase() == Phase::Running)
    }

    fn choose(&mut self, world: &mut World<HeadlessScene>) -> Result<()> {
        let offer = world.upgrade_offer()?;
        let upgrade = offer.first().copied().unwrap_or(UpgradeKind::MaxHp);
        world.choose_upgrade(upgrade)?;
        log::debug!("autopilot picked {upgrade:?} out of {offer:?}");
        Ok(())
    }

    fn elapsed(&self, dt: Duration) -> Duration {
        dt.saturating_mul(u32::try_from(self.frame).unwrap_or(u32::MAX))
    }
}

/// Nearest loot, or the nearest enemy when the floor is bare.
fn nearest_target(world: &World<HeadlessScene>) -> Result<Option<Vec2>> {
    let from = world.player().position();

    let mut candidates: Vec<Vec2> = world
        .gems()?
        .pickups()
        .iter()
        .map(|gem| gem.position())
        .collect();
    candidates.extend(
        world
            .oxygen_tanks()?
            .pickups()
            .iter()
            .map(|tank| tank.position()),
    );

    let enemies = world.enemies()?;
    candidates.extend(enemies.chests().iter().map(|chest| chest.position()));
    if candidates.is_empty() {
        candidates.extend(enemies.enemies().iter().map(|enemy| enemy.position()));
        candidates.extend(enemies.elites().iter().map(|elite| elite.position()));
    }

    Ok(candidates.into_iter().min_by(|a, b| {
        a.distance_squared(from)
            .total_cmp(&b.distance_squared(from))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_session(seed: u64) -> Settings {
        Settings {
            floors: 2,
            seconds_per_floor: 3.0,
            fps: 30,
            seed: Some(seed),
        }
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let first = run(Config::default(), &short_session(17)).expect("session");
        let second = run(Config::default(), &short_session(17)).expect("session");
        assert_eq!(first, second);
        assert!(first.tally.walls > 0);
    }

    #[test]
    fn session_descends_through_every_floor() {
        let mut config = Config::default();
        config.enemies.contact_damage = 0;

        let summary = run(config, &short_session(3)).expect("session");

        assert_ne!(summary.phase, Phase::GameOver);
        assert_eq!(summary.floor, 2);
    }

    #[test]
    fn oxygen_starved_session_ends_early() {
        let mut config = Config::default();
        config.player.stats.oxygen_capacity = 1.0;
        config.oxygen_tanks.drop_chance = 0.0;

        let summary = run(config, &short_session(5)).expect("session");

        assert_eq!(summary.phase, Phase::GameOver);
        assert_eq!(summary.floor, 1);
        assert!(summary.to_string().contains("defeated"));
    }
}
