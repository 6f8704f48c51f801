//! Draining oxygen supply with one-shot warnings.

use std::time::Duration;

use serde::Deserialize;
use wallbreaker_core::{EventBus, GameEvent};

/// Tuning knobs for the oxygen supply.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds of oxygen consumed per second of play.
    pub drain_per_sec: f32,
    /// Fraction of capacity below which a warning is published.
    pub warning_ratio: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drain_per_sec: 1.0,
            warning_ratio: 0.25,
        }
    }
}

/// Oxygen left to the player.
#[derive(Clone, Debug)]
pub struct Oxygen {
    capacity: f32,
    remaining: f32,
    drain_per_sec: f32,
    warning_ratio: f32,
    warned: bool,
    depleted: bool,
}

impl Oxygen {
    /// Creates a full supply lasting `capacity` seconds.
    #[must_use]
    pub fn new(capacity: f32, config: &Config) -> Self {
        let capacity = sanitize(capacity);
        Self {
            capacity,
            remaining: capacity,
            drain_per_sec: sanitize(config.drain_per_sec),
            warning_ratio: config.warning_ratio,
            warned: false,
            depleted: false,
        }
    }

    /// Seconds of oxygen a full supply lasts.
    #[must_use]
    pub fn capacity(&self) -> f32 {
        self.capacity
    }

    /// Seconds of oxygen left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Remaining oxygen as a fraction of capacity.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.capacity > 0.0 {
            self.remaining / self.capacity
        } else {
            0.0
        }
    }

    /// Reports whether the supply ran out.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    /// Drains the supply and publishes the warning and depletion events the
    /// first time their threshold is crossed.
    pub fn update(&mut self, dt: Duration, bus: &EventBus) {
        if self.depleted {
            return;
        }

        self.remaining = (self.remaining - self.drain_per_sec * dt.as_secs_f32()).max(0.0);

        if !self.warned && self.ratio() < self.warning_ratio {
            self.warned = true;
            log::info!("oxygen low: {:.0}% left", self.ratio() * 100.0);
            bus.emit(GameEvent::OxygenWarning {
                ratio: self.ratio(),
            });
        }

        if self.remaining <= 0.0 {
            self.depleted = true;
            log::info!("oxygen depleted");
            bus.emit(GameEvent::OxygenDepleted);
        }
    }

    /// Adds `amount` seconds of oxygen, capped at capacity.
    ///
    /// Climbing back above the warning threshold re-arms the warning.
    pub fn refill(&mut self, amount: f32) {
        if !amount.is_finite() || amount < 0.0 {
            log::warn!("ignored oxygen refill of {amount}");
            return;
        }
        self.remaining = (self.remaining + amount).min(self.capacity);
        if self.remaining > 0.0 {
            self.depleted = false;
        }
        if self.ratio() >= self.warning_ratio {
            self.warned = false;
        }
    }

    /// Changes the capacity, crediting any increase to the remaining supply.
    pub fn set_capacity(&mut self, capacity: f32) {
        let capacity = sanitize(capacity);
        let gained = (capacity - self.capacity).max(0.0);
        self.capacity = capacity;
        self.remaining = self.remaining.min(capacity);
        self.refill(gained);
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
