#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Population managers for collectibles that fly to the player.
//!
//! Gems and oxygen tanks share one simulation: they idle in place, home in on
//! the player once inside the attract range granted by the player's stats,
//! and publish a collection event when they touch the player. The two kinds
//! only differ in the value they carry and the event they publish, which the
//! [`PickupKind`] marker types describe.

use std::{f32::consts::TAU, fmt, marker::PhantomData, time::Duration};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use wallbreaker_core::{
    circles_overlap, finite_position, ActorKind, DrawableHandle, EventBus, GameEvent, InputError,
    PlayerBody, Scene,
};

const BOB_RATE: f32 = 3.0;
const BOB_AMPLITUDE: f32 = 1.5;

/// Describes one kind of collectible.
pub trait PickupKind {
    /// Value carried by a single pickup.
    type Value: Copy + fmt::Debug + PartialEq;

    /// Drawable kind requested from the scene.
    const ACTOR: ActorKind;

    /// Event published when the player collects a pickup carrying `value`.
    fn collected(value: Self::Value) -> GameEvent;
}

/// Experience gem dropped by defeated enemies.
#[derive(Debug)]
pub enum Gem {}

impl PickupKind for Gem {
    type Value = u32;

    const ACTOR: ActorKind = ActorKind::Gem;

    fn collected(exp: u32) -> GameEvent {
        GameEvent::GemCollected { exp }
    }
}

/// Oxygen tank uncovered behind destroyed walls.
#[derive(Debug)]
pub enum OxygenTank {}

impl PickupKind for OxygenTank {
    type Value = f32;

    const ACTOR: ActorKind = ActorKind::OxygenTank;

    fn collected(amount: f32) -> GameEvent {
        GameEvent::OxygenTankCollected { amount }
    }
}

/// Manager for experience gems.
pub type GemManager = PickupManager<Gem>;

/// Manager for oxygen tanks.
pub type OxygenTankManager = PickupManager<OxygenTank>;

/// Tuning knobs for one collectible population.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collision radius of a pickup.
    pub radius: f32,
    /// Speed at which an attracted pickup flies to the player.
    pub attract_speed: f32,
    /// Probability used by [`PickupManager::roll_drop`].
    pub drop_chance: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self::gems()
    }
}

impl Config {
    /// Defaults tuned for experience gems, which always drop.
    #[must_use]
    pub fn gems() -> Self {
        Self {
            radius: 6.0,
            attract_speed: 240.0,
            drop_chance: 1.0,
        }
    }

    /// Defaults tuned for oxygen tanks, which hide behind some walls.
    #[must_use]
    pub fn oxygen_tanks() -> Self {
        Self {
            radius: 9.0,
            attract_speed: 180.0,
            drop_chance: 0.12,
        }
    }
}

/// Outcome of advancing a pickup by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// The pickup stays on the floor.
    Alive,
    /// The player touched the pickup; it must be removed this tick.
    Collected,
}

/// A single collectible lying on the floor.
#[derive(Clone, Debug, PartialEq)]
pub struct Pickup<V> {
    position: Vec2,
    value: V,
    bob_phase: f32,
    handle: DrawableHandle,
}

impl<V: Copy> Pickup<V> {
    fn new(position: Vec2, value: V, handle: DrawableHandle) -> Self {
        Self {
            position,
            value,
            bob_phase: 0.0,
            handle,
        }
    }

    /// Current centre of the pickup in world units.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Value handed to the player on collection.
    #[must_use]
    pub fn value(&self) -> V {
        self.value
    }

    /// Vertical offset of the idle bobbing animation.
    #[must_use]
    pub fn bob_offset(&self) -> f32 {
        self.bob_phase.sin() * BOB_AMPLITUDE
    }

    /// Drawable owned by the presentation layer.
    #[must_use]
    pub fn handle(&self) -> DrawableHandle {
        self.handle
    }

    /// Animates, attracts and tests the pickup against the player.
    pub fn advance(
        &mut self,
        dt: Duration,
        body: PlayerBody,
        attract_range: f32,
        config: &Config,
    ) -> Lifecycle {
        let secs = dt.as_secs_f32();
        self.bob_phase = (self.bob_phase + secs * BOB_RATE) % TAU;

        let offset = body.position - self.position;
        let distance = offset.length();
        if distance < attract_range {
            let step = config.attract_speed * secs;
            if distance <= step {
                self.position = body.position;
            } else {
                self.position += offset / distance * step;
            }
        }

        if circles_overlap(self.position, body.position, config.radius + body.radius) {
            Lifecycle::Collected
        } else {
            Lifecycle::Alive
        }
    }
}

/// Owns every pickup of one kind on the current floor.
pub struct PickupManager<K: PickupKind> {
    config: Config,
    rng: ChaCha8Rng,
    pickups: Vec<Pickup<K::Value>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: PickupKind> fmt::Debug for PickupManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickupManager")
            .field("kind", &K::ACTOR)
            .field("config", &self.config)
            .field("pickups", &self.pickups)
            .finish()
    }
}

impl<K: PickupKind> PickupManager<K> {
    /// Creates a manager whose drop rolls are seeded from system entropy.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Creates a manager whose drop rolls follow the provided seed.
    #[must_use]
    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            rng,
            pickups: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Tuning the manager was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pickups lying on the floor in creation order.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup<K::Value>] {
        &self.pickups
    }

    /// Drops a pickup carrying `value` at `(x, y)`.
    pub fn spawn(
        &mut self,
        x: f32,
        y: f32,
        value: K::Value,
        scene: &mut dyn Scene,
    ) -> Result<(), InputError> {
        let position = finite_position(x, y)?;
        let handle = scene.attach(K::ACTOR, position);
        self.pickups.push(Pickup::new(position, value, handle));
        log::debug!("{:?} dropped at {position} carrying {value:?}", K::ACTOR);
        Ok(())
    }

    /// Drops a pickup with the configured probability and reports whether
    /// one appeared.
    pub fn roll_drop(
        &mut self,
        x: f32,
        y: f32,
        value: K::Value,
        scene: &mut dyn Scene,
    ) -> Result<bool, InputError> {
        let _ = finite_position(x, y)?;
        if self.rng.gen::<f32>() >= self.config.drop_chance {
            return Ok(false);
        }
        self.spawn(x, y, value, scene)?;
        Ok(true)
    }

    /// Advances every pickup and publishes an event for each one collected.
    pub fn update(
        &mut self,
        dt: Duration,
        body: PlayerBody,
        attract_range: f32,
        bus: &EventBus,
        scene: &mut dyn Scene,
    ) {
        for index in (0..self.pickups.len()).rev() {
            let lifecycle = self.pickups[index].advance(dt, body, attract_range, &self.config);
            if lifecycle == Lifecycle::Alive {
                continue;
            }

            let pickup = self.pickups.remove(index);
            bus.emit(K::collected(pickup.value()));
            scene.detach(pickup.handle());
        }
    }

    /// Releases every pickup, e.g. when a floor is torn down.
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        for pickup in self.pickups.drain(..) {
            scene.detach(pickup.handle());
        }
    }
}
