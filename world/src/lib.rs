#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for Wallbreaker.
//!
//! The [`World`] owns the event bus, every population manager and the player,
//! and wires the reactions between them as bus listeners: destroyed walls
//! roll enemies and oxygen tanks, dead enemies drop gems, gems feed the
//! experience curve and level-ups or chests pause the simulation until an
//! upgrade is chosen. Adapters drive the world through a handful of
//! operations and a fixed-step [`World::update`].

mod wiring;

use std::{
    cell::{BorrowError, BorrowMutError, Cell, Ref, RefCell},
    rc::Rc,
    time::Duration,
};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use wallbreaker_core::{
    finite_position, ActorKind, DrawableHandle, EventBus, FloorScaling, GameEvent, InputError,
    PlayerTarget, Scene, UpgradeKind, WallColor,
};
use wallbreaker_system_enemies::EnemyManager;
use wallbreaker_system_floor::FloorManager;
use wallbreaker_system_pickups::{GemManager, OxygenTankManager};
use wallbreaker_system_player::{
    Oxygen, OxygenConfig, Player, PlayerStats, Progression, ProgressionConfig, UpgradeError,
};

/// Tuning for every system the world owns.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Player body and starting stats.
    pub player: wallbreaker_system_player::Config,
    /// Oxygen drain and warning threshold.
    pub oxygen: OxygenConfig,
    /// Experience curve and upgrade offers.
    pub progression: ProgressionConfig,
    /// Per-floor difficulty.
    pub floor: wallbreaker_system_floor::Config,
    /// Enemy population.
    pub enemies: wallbreaker_system_enemies::Config,
    /// Experience gems.
    pub gems: wallbreaker_system_pickups::Config,
    /// Oxygen tanks. Keys missing from the table keep the tank defaults.
    #[serde(deserialize_with = "tank_config")]
    pub oxygen_tanks: wallbreaker_system_pickups::Config,
    /// Seconds of oxygen carried by a tank.
    pub tank_oxygen: f32,
    /// Number of gems an elite scatters when it dies.
    pub elite_gem_burst: u32,
    /// Distance from the elite at which its gems land.
    pub elite_gem_spread: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: wallbreaker_system_player::Config::default(),
            oxygen: OxygenConfig::default(),
            progression: ProgressionConfig::default(),
            floor: wallbreaker_system_floor::Config::default(),
            enemies: wallbreaker_system_enemies::Config::default(),
            gems: wallbreaker_system_pickups::Config::gems(),
            oxygen_tanks: wallbreaker_system_pickups::Config::oxygen_tanks(),
            tank_oxygen: 20.0,
            elite_gem_burst: 5,
            elite_gem_spread: 16.0,
        }
    }
}

/// Reads a partial pickup table over the oxygen tank defaults.
fn tank_config<'de, D>(deserializer: D) -> Result<wallbreaker_system_pickups::Config, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Overrides {
        radius: Option<f32>,
        attract_speed: Option<f32>,
        drop_chance: Option<f32>,
    }

    let overrides = Overrides::deserialize(deserializer)?;
    let defaults = wallbreaker_system_pickups::Config::oxygen_tanks();
    Ok(wallbreaker_system_pickups::Config {
        radius: overrides.radius.unwrap_or(defaults.radius),
        attract_speed: overrides.attract_speed.unwrap_or(defaults.attract_speed),
        drop_chance: overrides.drop_chance.unwrap_or(defaults.drop_chance),
    })
}

/// Coarse state of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The simulation advances normally.
    Running,
    /// An upgrade pick is pending; the simulation is paused.
    ChoosingUpgrade,
    /// The player ran out of hit points or oxygen.
    GameOver,
}

/// Failure of a world operation.
#[derive(Debug, Error)]
pub enum WorldError {
    /// An adapter supplied an unusable value.
    #[error(transparent)]
    Input(#[from] InputError),
    /// An upgrade could not be selected.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
    /// The operation is not available in the current phase.
    #[error("operation unavailable while the world is {0:?}")]
    Halted(Phase),
    /// World state was already mutably borrowed.
    #[error("world state is busy: {0}")]
    Busy(#[from] BorrowMutError),
    /// World state was mutably borrowed while a read was attempted.
    #[error("world state is locked: {0}")]
    Locked(#[from] BorrowError),
}

/// Scene shared between the world and its listeners.
///
/// Each call borrows the inner scene only for its own duration, so managers
/// running inside a listener can attach drawables while another manager is
/// in the middle of its update.
#[derive(Debug)]
pub(crate) struct SharedScene<S>(Rc<RefCell<S>>);

impl<S> Clone for SharedScene<S> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<S: Scene> Scene for SharedScene<S> {
    fn attach(&mut self, kind: ActorKind, position: Vec2) -> DrawableHandle {
        self.0.borrow_mut().attach(kind, position)
    }

    fn detach(&mut self, handle: DrawableHandle) {
        self.0.borrow_mut().detach(handle);
    }
}

/// Complete state of a running game.
#[derive(Debug)]
pub struct World<S: Scene + 'static> {
    config: Config,
    bus: Rc<EventBus>,
    scene: SharedScene<S>,
    rng: ChaCha8Rng,
    floor: FloorManager,
    player: Player,
    stats: PlayerStats,
    enemies: Rc<RefCell<EnemyManager>>,
    gems: Rc<RefCell<GemManager>>,
    tanks: Rc<RefCell<OxygenTankManager>>,
    oxygen: Rc<RefCell<Oxygen>>,
    progression: Rc<RefCell<Progression>>,
    phase: Rc<Cell<Phase>>,
    scaling: Rc<Cell<FloorScaling>>,
}

impl<S: Scene + 'static> World<S> {
    /// Creates a world whose randomness is seeded from system entropy.
    #[must_use]
    pub fn new(config: Config, scene: S) -> Self {
        Self::with_rng(config, scene, ChaCha8Rng::from_entropy())
    }

    /// Creates a world whose randomness follows the provided seed.
    #[must_use]
    pub fn with_seed(config: Config, scene: S, seed: u64) -> Self {
        Self::with_rng(config, scene, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, scene: S, mut rng: ChaCha8Rng) -> Self {
        let floor = FloorManager::new(config.floor.clone());
        let scaling = floor.scaling();
        let stats = config.player.stats.clone();

        let world = Self {
            bus: Rc::new(EventBus::new()),
            scene: SharedScene(Rc::new(RefCell::new(scene))),
            enemies: Rc::new(RefCell::new(EnemyManager::with_seed(
                config.enemies.clone(),
                scaling,
                rng.gen(),
            ))),
            gems: Rc::new(RefCell::new(GemManager::with_seed(
                config.gems.clone(),
                rng.gen(),
            ))),
            tanks: Rc::new(RefCell::new(OxygenTankManager::with_seed(
                config.oxygen_tanks.clone(),
                rng.gen(),
            ))),
            oxygen: Rc::new(RefCell::new(Oxygen::new(
                stats.oxygen_capacity,
                &config.oxygen,
            ))),
            progression: Rc::new(RefCell::new(Progression::new(
                config.progression.clone(),
            ))),
            phase: Rc::new(Cell::new(Phase::Running)),
            scaling: Rc::new(Cell::new(scaling)),
            player: Player::new(Vec2::ZERO, &config.player),
            stats,
            floor,
            rng,
            config,
        };
        wiring::connect(world.links());
        world
    }

    fn links(&self) -> wiring::Links<S> {
        wiring::Links {
            bus: Rc::downgrade(&self.bus),
            scene: self.scene.clone(),
            enemies: Rc::clone(&self.enemies),
            gems: Rc::clone(&self.gems),
            tanks: Rc::clone(&self.tanks),
            oxygen: Rc::clone(&self.oxygen),
            progression: Rc::clone(&self.progression),
            phase: Rc::clone(&self.phase),
            scaling: Rc::clone(&self.scaling),
            tank_oxygen: self.config.tank_oxygen,
            elite_gem_burst: self.config.elite_gem_burst,
            elite_gem_spread: self.config.elite_gem_spread,
        }
    }

    /// Bus carrying every gameplay event; adapters may subscribe to it.
    #[must_use]
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Current phase of the simulation.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Floor progression.
    #[must_use]
    pub fn floor(&self) -> &FloorManager {
        &self.floor
    }

    /// The player's body and hit points.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The player's upgraded attributes.
    #[must_use]
    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    /// Enemy population.
    pub fn enemies(&self) -> Result<Ref<'_, EnemyManager>, WorldError> {
        Ok(self.enemies.try_borrow()?)
    }

    /// Experience gems on the floor.
    pub fn gems(&self) -> Result<Ref<'_, GemManager>, WorldError> {
        Ok(self.gems.try_borrow()?)
    }

    /// Oxygen tanks on the floor.
    pub fn oxygen_tanks(&self) -> Result<Ref<'_, OxygenTankManager>, WorldError> {
        Ok(self.tanks.try_borrow()?)
    }

    /// Oxygen supply.
    pub fn oxygen(&self) -> Result<Ref<'_, Oxygen>, WorldError> {
        Ok(self.oxygen.try_borrow()?)
    }

    /// Level and experience.
    pub fn progression(&self) -> Result<Ref<'_, Progression>, WorldError> {
        Ok(self.progression.try_borrow()?)
    }

    /// Runs `inspect` against the scene.
    pub fn with_scene<R>(&self, inspect: impl FnOnce(&S) -> R) -> Result<R, WorldError> {
        let scene = self.scene.0.try_borrow()?;
        Ok(inspect(&scene))
    }

    /// Breaks the wall at `(x, y)` and publishes `WallDestroyed`.
    pub fn destroy_wall(&mut self, x: f32, y: f32, color: WallColor) -> Result<(), WorldError> {
        self.ensure_running()?;
        let _ = finite_position(x, y)?;
        self.bus.emit(GameEvent::WallDestroyed { x, y, color });
        Ok(())
    }

    /// Swings at the first enemy inside the attack radius around the player.
    pub fn attack(&mut self) -> Result<bool, WorldError> {
        self.ensure_running()?;
        let position = self.player.position();
        let hit = self.enemies.try_borrow_mut()?.damage_enemy_at(
            position.x,
            position.y,
            self.stats.attack_radius,
            self.stats.attack_damage,
        );
        Ok(hit)
    }

    /// Moves the player along `direction` for `dt` at the upgraded speed.
    pub fn move_player(&mut self, direction: Vec2, dt: Duration) -> Result<(), WorldError> {
        self.ensure_running()?;
        self.player.walk(direction, self.stats.move_speed, dt);
        Ok(())
    }

    /// Starts descending to the next floor; `false` while already descending.
    pub fn descend(&mut self) -> Result<bool, WorldError> {
        self.ensure_running()?;
        Ok(self.floor.begin_descent(&self.bus))
    }

    /// Draws the upgrades offered for the pending pick.
    pub fn upgrade_offer(&mut self) -> Result<Vec<UpgradeKind>, WorldError> {
        Ok(self.progression.try_borrow()?.offer(&mut self.rng))
    }

    /// Applies `upgrade` and resumes once no pick is left.
    pub fn choose_upgrade(&mut self, upgrade: UpgradeKind) -> Result<(), WorldError> {
        let phase = self.phase.get();
        if phase != Phase::ChoosingUpgrade {
            return Err(WorldError::Halted(phase));
        }

        let pending = {
            let mut progression = self.progression.try_borrow_mut()?;
            progression.select(upgrade, &mut self.stats, &self.bus)?;
            progression.pending_upgrades()
        };

        match upgrade {
            UpgradeKind::MaxHp => self.player.heal_to(self.stats.max_hp),
            UpgradeKind::OxygenCapacity => self
                .oxygen
                .try_borrow_mut()?
                .set_capacity(self.stats.oxygen_capacity),
            _ => {}
        }

        if pending == 0 {
            self.phase.set(Phase::Running);
        }
        Ok(())
    }

    /// Advances the simulation by `dt`. Paused or finished worlds stay put.
    ///
    /// Listeners can pause or end the game mid-tick; the stages after that
    /// point wait for the next running tick.
    pub fn update(&mut self, dt: Duration) -> Result<(), WorldError> {
        if self.halted() {
            return Ok(());
        }

        if let Some(scaling) = self.floor.update(dt, &self.bus) {
            self.enter_floor(scaling)?;
        }
        self.oxygen.try_borrow_mut()?.update(dt, &self.bus);
        if self.halted() {
            return Ok(());
        }

        self.player.tick(dt);
        self.enemies
            .try_borrow_mut()?
            .update(dt, &mut self.player, &self.bus, &mut self.scene);
        if self.halted() {
            return Ok(());
        }

        let body = self.player.body();
        let attract_range = self.stats.attract_range;
        self.gems
            .try_borrow_mut()?
            .update(dt, body, attract_range, &self.bus, &mut self.scene);
        if self.halted() {
            return Ok(());
        }

        self.tanks
            .try_borrow_mut()?
            .update(dt, body, attract_range, &self.bus, &mut self.scene);
        Ok(())
    }

    fn halted(&self) -> bool {
        self.phase.get() != Phase::Running
    }

    fn enter_floor(&mut self, scaling: FloorScaling) -> Result<(), WorldError> {
        self.scaling.set(scaling);
        {
            let mut enemies = self.enemies.try_borrow_mut()?;
            enemies.clear(&mut self.scene);
            enemies.rescale(scaling);
        }
        self.gems.try_borrow_mut()?.clear(&mut self.scene);
        self.tanks.try_borrow_mut()?.clear(&mut self.scene);
        self.player.teleport(Vec2::ZERO);
        log::info!("entered floor {}", self.floor.floor());
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), WorldError> {
        match self.phase.get() {
            Phase::Running => Ok(()),
            phase => Err(WorldError::Halted(phase)),
        }
    }
}
