//! Experience curve, level-ups and upgrade offers.

use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use thiserror::Error;
use wallbreaker_core::{EventBus, GameEvent, UpgradeKind};

use crate::PlayerStats;

/// Tuning knobs for the experience curve.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Experience needed to leave the first level.
    pub base_exp: u32,
    /// Factor applied to the requirement at every level.
    pub exp_growth: f32,
    /// Number of distinct upgrades presented per pick.
    pub offer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_exp: 5,
            exp_growth: 1.5,
            offer_size: 3,
        }
    }
}

/// Upgrade pick that could not be honoured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum UpgradeError {
    /// No level-up or chest is waiting for a pick.
    #[error("no upgrade pick is pending")]
    NothingPending,
}

/// Player level, banked experience and pending upgrade picks.
#[derive(Clone, Debug)]
pub struct Progression {
    config: Config,
    level: u32,
    exp: u32,
    pending: u32,
}

impl Progression {
    /// Creates a level one player without experience.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            level: 1,
            exp: 0,
            pending: 0,
        }
    }

    /// Current level, starting at 1.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Experience banked towards the next level.
    #[must_use]
    pub fn exp(&self) -> u32 {
        self.exp
    }

    /// Experience the current level requires in total.
    #[must_use]
    pub fn exp_to_next(&self) -> u32 {
        let exponent = i32::try_from(self.level.saturating_sub(1)).unwrap_or(i32::MAX);
        let required = self.config.base_exp as f32 * self.config.exp_growth.powi(exponent);
        if required.is_finite() {
            (required.round() as u32).max(1)
        } else {
            u32::MAX
        }
    }

    /// Upgrade picks waiting to be made.
    #[must_use]
    pub fn pending_upgrades(&self) -> u32 {
        self.pending
    }

    /// Credits experience, publishing `ExpGained` and one `LevelUp` per
    /// level crossed. Every level crossed grants one upgrade pick.
    pub fn gain_exp(&mut self, amount: u32, bus: &EventBus) {
        if amount == 0 {
            return;
        }
        self.exp = self.exp.saturating_add(amount);
        bus.emit(GameEvent::ExpGained { amount });

        loop {
            let required = self.exp_to_next();
            if self.exp < required {
                break;
            }
            self.exp -= required;
            self.level = self.level.saturating_add(1);
            self.pending = self.pending.saturating_add(1);
            log::info!("reached level {}", self.level);
            bus.emit(GameEvent::LevelUp { level: self.level });
        }
    }

    /// Adds `count` upgrade picks, e.g. from an opened chest.
    pub fn grant_upgrades(&mut self, count: u32) {
        self.pending = self.pending.saturating_add(count);
    }

    /// Draws distinct upgrades to choose from, or nothing when no pick is
    /// pending.
    pub fn offer<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<UpgradeKind> {
        if self.pending == 0 {
            return Vec::new();
        }
        UpgradeKind::ALL
            .choose_multiple(rng, self.config.offer_size)
            .copied()
            .collect()
    }

    /// Spends a pending pick on `upgrade` and publishes `UpgradeSelected`.
    pub fn select(
        &mut self,
        upgrade: UpgradeKind,
        stats: &mut PlayerStats,
        bus: &EventBus,
    ) -> Result<(), UpgradeError> {
        if self.pending == 0 {
            return Err(UpgradeError::NothingPending);
        }
        self.pending -= 1;
        stats.apply(upgrade);
        log::info!("selected upgrade {upgrade:?}");
        bus.emit(GameEvent::UpgradeSelected { upgrade });
        Ok(())
    }
}
