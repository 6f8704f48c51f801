#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player state: body, stats, oxygen supply and level progression.

mod oxygen;
mod progression;

use std::time::Duration;

use glam::Vec2;
use serde::Deserialize;
use wallbreaker_core::{seconds, PlayerBody, PlayerTarget, UpgradeKind};

pub use self::oxygen::{Config as OxygenConfig, Oxygen};
pub use self::progression::{Config as ProgressionConfig, Progression, UpgradeError};

const MOVE_SPEED_GROWTH: f32 = 1.1;
const ATTACK_RADIUS_STEP: f32 = 4.0;
const ATTRACT_RANGE_STEP: f32 = 20.0;
const OXYGEN_CAPACITY_STEP: f32 = 15.0;

/// Attributes the player improves by picking upgrades.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    /// Hit points restored by a full heal.
    pub max_hp: u32,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Damage dealt by one attack.
    pub attack_damage: u32,
    /// Radius of the attack probe around the player.
    pub attack_radius: f32,
    /// Distance from which pickups start flying to the player.
    pub attract_range: f32,
    /// Seconds of oxygen a full supply lasts.
    pub oxygen_capacity: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            max_hp: 5,
            move_speed: 120.0,
            attack_damage: 1,
            attack_radius: 24.0,
            attract_range: 60.0,
            oxygen_capacity: 60.0,
        }
    }
}

impl PlayerStats {
    /// Improves the attribute behind `upgrade` by one step.
    pub fn apply(&mut self, upgrade: UpgradeKind) {
        match upgrade {
            UpgradeKind::MaxHp => self.max_hp = self.max_hp.saturating_add(1),
            UpgradeKind::MoveSpeed => self.move_speed *= MOVE_SPEED_GROWTH,
            UpgradeKind::AttackDamage => self.attack_damage = self.attack_damage.saturating_add(1),
            UpgradeKind::AttackRadius => self.attack_radius += ATTACK_RADIUS_STEP,
            UpgradeKind::AttractRange => self.attract_range += ATTRACT_RANGE_STEP,
            UpgradeKind::OxygenCapacity => self.oxygen_capacity += OXYGEN_CAPACITY_STEP,
        }
    }
}

/// Tuning knobs for the player body.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collision radius of the player.
    pub radius: f32,
    /// Seconds during which further hits are ignored after one lands.
    pub invulnerability_secs: f32,
    /// Attributes the player starts with.
    pub stats: PlayerStats,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radius: 8.0,
            invulnerability_secs: 0.8,
            stats: PlayerStats::default(),
        }
    }
}

/// The player's body and hit points.
#[derive(Clone, Debug)]
pub struct Player {
    position: Vec2,
    radius: f32,
    hp: u32,
    invulnerable: Duration,
    invulnerability: Duration,
}

impl Player {
    /// Creates a player at full health standing at `position`.
    #[must_use]
    pub fn new(position: Vec2, config: &Config) -> Self {
        Self {
            position,
            radius: config.radius,
            hp: config.stats.max_hp.max(1),
            invulnerable: Duration::ZERO,
            invulnerability: seconds(config.invulnerability_secs),
        }
    }

    /// Current centre of the player.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Remaining hit points.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Reports whether the player still has hit points.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Reports whether incoming hits are currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        !self.invulnerable.is_zero()
    }

    /// Moves the player along `direction` at `speed` for `dt`.
    ///
    /// The direction is normalised; a zero or non-finite direction leaves
    /// the player in place.
    pub fn walk(&mut self, direction: Vec2, speed: f32, dt: Duration) {
        if !direction.is_finite() || !speed.is_finite() {
            log::warn!("ignored walk along {direction} at speed {speed}");
            return;
        }
        self.position += direction.normalize_or_zero() * speed * dt.as_secs_f32();
    }

    /// Places the player at `position`, e.g. when entering a new floor.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Restores the player to `max_hp`.
    pub fn heal_to(&mut self, max_hp: u32) {
        self.hp = max_hp.max(self.hp);
    }

    /// Counts down the invulnerability window.
    pub fn tick(&mut self, dt: Duration) {
        self.invulnerable = self.invulnerable.saturating_sub(dt);
    }
}

impl PlayerTarget for Player {
    fn body(&self) -> PlayerBody {
        PlayerBody {
            position: self.position,
            radius: self.radius,
        }
    }

    fn absorb_hit(&mut self, damage: u32) -> Option<u32> {
        if self.is_invulnerable() || !self.is_alive() {
            return None;
        }
        self.hp = self.hp.saturating_sub(damage);
        self.invulnerable = self.invulnerability;
        Some(self.hp)
    }
}
