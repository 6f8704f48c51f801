#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Wallbreaker engine.
//!
//! This crate defines the message surface that connects the population
//! managers, the player systems, and whatever presentation layer drives them.
//! Managers publish [`GameEvent`] values on the [`EventBus`] whenever an
//! entity dies or is collected, and every downstream reaction (loot drops,
//! experience, upgrade prompts, floor scaling) subscribes by [`EventKind`]
//! instead of holding a reference back into the manager.

mod bus;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bus::{listener, EventBus, Listener, ListenerError};

/// Events published on the bus by managers and player systems.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A wall tile was broken by the player.
    WallDestroyed {
        /// Horizontal world coordinate of the destroyed wall.
        x: f32,
        /// Vertical world coordinate of the destroyed wall.
        y: f32,
        /// Tint of the wall, used by particle effects.
        color: WallColor,
    },
    /// A normal enemy was removed after its hit points ran out.
    EnemyDied {
        /// Horizontal world coordinate where the enemy died.
        x: f32,
        /// Vertical world coordinate where the enemy died.
        y: f32,
    },
    /// An elite enemy was removed after its hit points ran out.
    EliteDied {
        /// Horizontal world coordinate where the elite died.
        x: f32,
        /// Vertical world coordinate where the elite died.
        y: f32,
    },
    /// The player opened a treasure chest.
    ChestCollected {
        /// Number of upgrade picks the chest grants.
        upgrade_count: u32,
    },
    /// Experience was credited to the player.
    ExpGained {
        /// Amount of experience credited.
        amount: u32,
    },
    /// The player reached a new level.
    LevelUp {
        /// Level reached after the increment.
        level: u32,
    },
    /// The player picked an upgrade from an offer.
    UpgradeSelected {
        /// Upgrade that was applied.
        upgrade: UpgradeKind,
    },
    /// A descent to the next floor started.
    FloorTransitionStart {
        /// Floor being entered.
        floor: u32,
    },
    /// A descent finished and the new floor is live.
    FloorTransitionEnd {
        /// Floor that became active.
        floor: u32,
    },
    /// Contact damage landed on the player.
    PlayerDamaged {
        /// Damage dealt by the hit.
        damage: u32,
        /// Hit points remaining after the hit.
        new_hp: u32,
    },
    /// The oxygen supply dropped below the warning threshold.
    OxygenWarning {
        /// Remaining oxygen as a fraction of capacity.
        ratio: f32,
    },
    /// The oxygen supply ran out.
    OxygenDepleted,
    /// A gem was picked up.
    GemCollected {
        /// Experience carried by the gem.
        exp: u32,
    },
    /// An oxygen tank was picked up.
    OxygenTankCollected {
        /// Seconds of oxygen carried by the tank.
        amount: f32,
    },
}

impl GameEvent {
    /// Discriminant used to route the event to its listeners.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::WallDestroyed { .. } => EventKind::WallDestroyed,
            Self::EnemyDied { .. } => EventKind::EnemyDied,
            Self::EliteDied { .. } => EventKind::EliteDied,
            Self::ChestCollected { .. } => EventKind::ChestCollected,
            Self::ExpGained { .. } => EventKind::ExpGained,
            Self::LevelUp { .. } => EventKind::LevelUp,
            Self::UpgradeSelected { .. } => EventKind::UpgradeSelected,
            Self::FloorTransitionStart { .. } => EventKind::FloorTransitionStart,
            Self::FloorTransitionEnd { .. } => EventKind::FloorTransitionEnd,
            Self::PlayerDamaged { .. } => EventKind::PlayerDamaged,
            Self::OxygenWarning { .. } => EventKind::OxygenWarning,
            Self::OxygenDepleted => EventKind::OxygenDepleted,
            Self::GemCollected { .. } => EventKind::GemCollected,
            Self::OxygenTankCollected { .. } => EventKind::OxygenTankCollected,
        }
    }
}

/// Payload-free tag identifying a [`GameEvent`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Tag of [`GameEvent::WallDestroyed`].
    WallDestroyed,
    /// Tag of [`GameEvent::EnemyDied`].
    EnemyDied,
    /// Tag of [`GameEvent::EliteDied`].
    EliteDied,
    /// Tag of [`GameEvent::ChestCollected`].
    ChestCollected,
    /// Tag of [`GameEvent::ExpGained`].
    ExpGained,
    /// Tag of [`GameEvent::LevelUp`].
    LevelUp,
    /// Tag of [`GameEvent::UpgradeSelected`].
    UpgradeSelected,
    /// Tag of [`GameEvent::FloorTransitionStart`].
    FloorTransitionStart,
    /// Tag of [`GameEvent::FloorTransitionEnd`].
    FloorTransitionEnd,
    /// Tag of [`GameEvent::PlayerDamaged`].
    PlayerDamaged,
    /// Tag of [`GameEvent::OxygenWarning`].
    OxygenWarning,
    /// Tag of [`GameEvent::OxygenDepleted`].
    OxygenDepleted,
    /// Tag of [`GameEvent::GemCollected`].
    GemCollected,
    /// Tag of [`GameEvent::OxygenTankCollected`].
    OxygenTankCollected,
}

/// Colour of a destroyed wall tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl WallColor {
    /// Creates a new wall color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Unique identifier assigned to a spawner by its owning manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a new spawner identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Upgrades the player can pick after a level-up or a chest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Raises maximum hit points.
    MaxHp,
    /// Raises movement speed.
    MoveSpeed,
    /// Raises damage dealt by each attack.
    AttackDamage,
    /// Widens the attack radius.
    AttackRadius,
    /// Widens the range from which pickups fly to the player.
    AttractRange,
    /// Raises oxygen capacity.
    OxygenCapacity,
}

impl UpgradeKind {
    /// Every upgrade in presentation order.
    pub const ALL: [UpgradeKind; 6] = [
        UpgradeKind::MaxHp,
        UpgradeKind::MoveSpeed,
        UpgradeKind::AttackDamage,
        UpgradeKind::AttackRadius,
        UpgradeKind::AttractRange,
        UpgradeKind::OxygenCapacity,
    ];
}

/// Difficulty values pulled from the floor manager at floor boundaries.
///
/// Managers cache the snapshot and apply it to actors spawned afterwards;
/// actors that are already alive keep the values they were created with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorScaling {
    /// Hit points of a normal enemy.
    pub enemy_hp: u32,
    /// Probability that a destroyed wall releases a normal enemy.
    pub enemy_spawn_chance: f32,
    /// Experience carried by a gem.
    pub gem_exp_value: u32,
}

impl Default for FloorScaling {
    fn default() -> Self {
        Self {
            enemy_hp: 1,
            enemy_spawn_chance: 0.3,
            gem_exp_value: 1,
        }
    }
}

/// Collision footprint of the player captured for a single tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerBody {
    /// Centre of the player in world units.
    pub position: Vec2,
    /// Collision radius of the player in world units.
    pub radius: f32,
}

/// Player-side contract used by managers that deal contact damage.
pub trait PlayerTarget {
    /// Captures the player's current collision footprint.
    fn body(&self) -> PlayerBody;

    /// Applies contact damage and returns the remaining hit points when the
    /// hit landed, or `None` when the player shrugged it off.
    fn absorb_hit(&mut self, damage: u32) -> Option<u32>;
}

/// Reports whether two circles overlap.
///
/// Touching circles do not overlap.
#[must_use]
pub fn circles_overlap(a: Vec2, b: Vec2, combined_radius: f32) -> bool {
    a.distance(b) < combined_radius
}

/// Kinds of actor handed to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorKind {
    /// Stationary enemy emitter.
    Spawner,
    /// Normal enemy.
    Enemy,
    /// Elite enemy.
    Elite,
    /// Treasure chest dropped by an elite.
    Chest,
    /// Experience gem.
    Gem,
    /// Oxygen tank.
    OxygenTank,
}

/// Opaque handle to a drawable owned by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableHandle(u64);

impl DrawableHandle {
    /// Creates a handle from the presentation layer's raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw identifier of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Presentation layer that owns one drawable per live actor.
///
/// Managers attach a drawable when an actor is created and detach it in the
/// same step that removes the actor from its collection.
pub trait Scene {
    /// Creates a drawable for a new actor and returns its handle.
    fn attach(&mut self, kind: ActorKind, position: Vec2) -> DrawableHandle;

    /// Releases the drawable behind `handle`.
    fn detach(&mut self, handle: DrawableHandle);
}

/// Scene without any rendering that only tracks which drawables are live.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next: u64,
    live: BTreeMap<DrawableHandle, ActorKind>,
}

impl HeadlessScene {
    /// Creates an empty headless scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drawables currently attached.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of drawables of the provided kind currently attached.
    #[must_use]
    pub fn live_of(&self, kind: ActorKind) -> usize {
        self.live.values().filter(|live| **live == kind).count()
    }

    /// Reports whether the handle is still attached.
    #[must_use]
    pub fn is_live(&self, handle: DrawableHandle) -> bool {
        self.live.contains_key(&handle)
    }
}

impl Scene for HeadlessScene {
    fn attach(&mut self, kind: ActorKind, _position: Vec2) -> DrawableHandle {
        self.next += 1;
        let handle = DrawableHandle::new(self.next);
        let _ = self.live.insert(handle, kind);
        handle
    }

    fn detach(&mut self, handle: DrawableHandle) {
        if self.live.remove(&handle).is_none() {
            log::warn!("detach of unknown drawable {}", handle.get());
        }
    }
}

/// Input rejected at a manager's public boundary.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum InputError {
    /// A spawn position contained NaN or an infinity.
    #[error("position ({x}, {y}) is not finite")]
    NonFinitePosition {
        /// Horizontal coordinate that was provided.
        x: f32,
        /// Vertical coordinate that was provided.
        y: f32,
    },
}

/// Converts raw coordinates into a position, rejecting non-finite values.
pub fn finite_position(x: f32, y: f32) -> Result<Vec2, InputError> {
    if x.is_finite() && y.is_finite() {
        Ok(Vec2::new(x, y))
    } else {
        Err(InputError::NonFinitePosition { x, y })
    }
}

/// Converts a configured number of seconds into a [`Duration`].
///
/// Negative, non-finite, or overflowing inputs collapse to zero.
#[must_use]
pub fn seconds(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
}
