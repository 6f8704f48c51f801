#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Floor progression and per-floor difficulty scaling.
//!
//! The floor manager is the single source of the [`FloorScaling`] snapshot
//! that population managers cache. Descending is a timed transition bracketed
//! by `FloorTransitionStart` and `FloorTransitionEnd` events; the new snapshot
//! is handed back to the caller when the transition completes so it can be
//! pushed into the managers explicitly.

use std::time::Duration;

use serde::Deserialize;
use wallbreaker_core::{seconds, EventBus, FloorScaling, GameEvent};

/// Tuning knobs for floor difficulty.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enemy hit points on the first floor.
    pub base_enemy_hp: u32,
    /// Floors between successive enemy hit point increments. Zero disables growth.
    pub floors_per_hp_step: u32,
    /// Enemy spawn chance on the first floor.
    pub base_spawn_chance: f32,
    /// Spawn chance added per floor descended.
    pub spawn_chance_per_floor: f32,
    /// Upper bound on the spawn chance.
    pub max_spawn_chance: f32,
    /// Gem experience on the first floor.
    pub base_gem_exp: u32,
    /// Floors between successive gem experience increments. Zero disables growth.
    pub floors_per_exp_step: u32,
    /// Seconds a descent takes.
    pub transition_secs: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_enemy_hp: 1,
            floors_per_hp_step: 3,
            base_spawn_chance: 0.25,
            spawn_chance_per_floor: 0.02,
            max_spawn_chance: 0.6,
            base_gem_exp: 1,
            floors_per_exp_step: 2,
            transition_secs: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Descent {
    target: u32,
    remaining: Duration,
}

/// Tracks the current floor and the descent in progress.
#[derive(Debug)]
pub struct FloorManager {
    config: Config,
    floor: u32,
    descent: Option<Descent>,
}

impl FloorManager {
    /// Creates a manager positioned on the first floor.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            floor: 1,
            descent: None,
        }
    }

    /// Current floor, starting at 1.
    #[must_use]
    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Reports whether a descent is running.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.descent.is_some()
    }

    /// Hit points of a normal enemy on the current floor.
    #[must_use]
    pub fn enemy_hp(&self) -> u32 {
        self.config
            .base_enemy_hp
            .max(1)
            .saturating_add(steps(self.floor, self.config.floors_per_hp_step))
    }

    /// Probability that a destroyed wall releases a normal enemy.
    #[must_use]
    pub fn enemy_spawn_chance(&self) -> f32 {
        let descended = self.floor.saturating_sub(1) as f32;
        let chance = self.config.base_spawn_chance + self.config.spawn_chance_per_floor * descended;
        chance.min(self.config.max_spawn_chance).clamp(0.0, 1.0)
    }

    /// Experience carried by a gem on the current floor.
    #[must_use]
    pub fn gem_exp_value(&self) -> u32 {
        self.config
            .base_gem_exp
            .saturating_add(steps(self.floor, self.config.floors_per_exp_step))
    }

    /// Snapshot of every difficulty value for the current floor.
    #[must_use]
    pub fn scaling(&self) -> FloorScaling {
        FloorScaling {
            enemy_hp: self.enemy_hp(),
            enemy_spawn_chance: self.enemy_spawn_chance(),
            gem_exp_value: self.gem_exp_value(),
        }
    }

    /// Starts descending to the next floor.
    ///
    /// Returns `false` without emitting anything when a descent is already
    /// running.
    pub fn begin_descent(&mut self, bus: &EventBus) -> bool {
        if self.descent.is_some() {
            return false;
        }

        let target = self.floor.saturating_add(1);
        self.descent = Some(Descent {
            target,
            remaining: seconds(self.config.transition_secs),
        });
        log::info!("descending from floor {} to {target}", self.floor);
        bus.emit(GameEvent::FloorTransitionStart { floor: target });
        true
    }

    /// Advances a running descent and returns the new floor's scaling once it
    /// completes.
    pub fn update(&mut self, dt: Duration, bus: &EventBus) -> Option<FloorScaling> {
        let descent = self.descent.as_mut()?;
        descent.remaining = descent.remaining.saturating_sub(dt);
        if !descent.remaining.is_zero() {
            return None;
        }

        let target = descent.target;
        self.descent = None;
        self.floor = target;
        let scaling = self.scaling();
        log::info!("floor {target} reached with {scaling:?}");
        bus.emit(GameEvent::FloorTransitionEnd { floor: target });
        Some(scaling)
    }
}

fn steps(floor: u32, floors_per_step: u32) -> u32 {
    if floors_per_step == 0 {
        return 0;
    }
    floor.saturating_sub(1) / floors_per_step
}
