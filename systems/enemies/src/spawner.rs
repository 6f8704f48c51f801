use std::time::Duration;

use glam::Vec2;
use wallbreaker_core::{DrawableHandle, SpawnerId};

/// Lifecycle state of a spawner. `Disabled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnerState {
    /// Counting down toward the next emission.
    Active,
    /// Shut down by the player; never spawns again on this floor.
    Disabled,
}

/// Tuning shared by every spawner of a manager.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnerRules {
    pub(crate) interval: Duration,
    pub(crate) max_alive: u32,
    pub(crate) disable_radius: f32,
}

/// Result of advancing a spawner by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SpawnerStep {
    /// Nothing happened.
    Idle,
    /// The player came close enough to shut the spawner down.
    Disabled,
    /// A bound enemy must be created at the spawner position.
    Spawn,
}

/// Stationary enemy emitter with a bounded population.
#[derive(Clone, Debug, PartialEq)]
pub struct Spawner {
    id: SpawnerId,
    position: Vec2,
    timer: Duration,
    alive_count: u32,
    state: SpawnerState,
    handle: DrawableHandle,
}

impl Spawner {
    pub(crate) fn new(
        id: SpawnerId,
        position: Vec2,
        interval: Duration,
        handle: DrawableHandle,
    ) -> Self {
        Self {
            id,
            position,
            timer: interval,
            alive_count: 0,
            state: SpawnerState::Active,
            handle,
        }
    }

    /// Identifier enemies use to refer back to the spawner.
    #[must_use]
    pub fn id(&self) -> SpawnerId {
        self.id
    }

    /// Centre of the spawner in world units.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Time left before the next emission attempt.
    #[must_use]
    pub fn timer(&self) -> Duration {
        self.timer
    }

    /// Number of live enemies emitted by this spawner.
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SpawnerState {
        self.state
    }

    /// Drawable owned by the presentation layer.
    #[must_use]
    pub fn handle(&self) -> DrawableHandle {
        self.handle
    }

    /// Advances the state machine by `dt`.
    ///
    /// The proximity check runs before the timer and wins over a spawn on the
    /// same tick. A full spawner keeps its timer at zero so it emits again on
    /// the first tick after a bound enemy is released.
    pub(crate) fn step(&mut self, dt: Duration, player: Vec2, rules: &SpawnerRules) -> SpawnerStep {
        if self.state == SpawnerState::Disabled {
            return SpawnerStep::Idle;
        }

        if self.position.distance(player) < rules.disable_radius {
            self.state = SpawnerState::Disabled;
            return SpawnerStep::Disabled;
        }

        self.timer = self.timer.saturating_sub(dt);
        if !self.timer.is_zero() || self.alive_count >= rules.max_alive {
            return SpawnerStep::Idle;
        }

        self.alive_count += 1;
        self.timer = rules.interval;
        SpawnerStep::Spawn
    }

    /// Returns a population slot after a bound enemy died.
    pub(crate) fn release(&mut self) {
        if self.alive_count == 0 {
            log::warn!("spawner {} released with no live enemies", self.id.get());
            return;
        }
        self.alive_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAR: Vec2 = Vec2::new(1_000.0, 1_000.0);

    fn rules(max_alive: u32) -> SpawnerRules {
        SpawnerRules {
            interval: Duration::from_secs(2),
            max_alive,
            disable_radius: 30.0,
        }
    }

    fn spawner() -> Spawner {
        Spawner::new(
            SpawnerId::new(7),
            Vec2::ZERO,
            Duration::from_secs(2),
            DrawableHandle::new(1),
        )
    }

    #[test]
    fn spawns_when_timer_elapses_and_resets_it() {
        let mut spawner = spawner();
        let rules = rules(2);

        assert_eq!(spawner.step(Duration::from_secs(1), FAR, &rules), SpawnerStep::Idle);
        assert_eq!(spawner.step(Duration::from_secs(1), FAR, &rules), SpawnerStep::Spawn);
        assert_eq!(spawner.alive_count(), 1);
        assert_eq!(spawner.timer(), Duration::from_secs(2));
    }

    #[test]
    fn full_spawner_holds_timer_until_release() {
        let mut spawner = spawner();
        let rules = rules(1);

        assert_eq!(spawner.step(Duration::from_secs(2), FAR, &rules), SpawnerStep::Spawn);
        assert_eq!(spawner.step(Duration::from_secs(5), FAR, &rules), SpawnerStep::Idle);
        assert!(spawner.timer().is_zero());

        spawner.release();
        assert_eq!(spawner.step(Duration::from_millis(1), FAR, &rules), SpawnerStep::Spawn);
        assert_eq!(spawner.alive_count(), 1);
    }

    #[test]
    fn proximity_disables_before_spawning_and_is_terminal() {
        let mut spawner = spawner();
        let rules = rules(3);

        assert_eq!(
            spawner.step(Duration::from_secs(10), Vec2::new(5.0, 0.0), &rules),
            SpawnerStep::Disabled
        );
        assert_eq!(spawner.state(), SpawnerState::Disabled);
        assert_eq!(spawner.alive_count(), 0);

        for _ in 0..5 {
            assert_eq!(spawner.step(Duration::from_secs(10), FAR, &rules), SpawnerStep::Idle);
        }
        assert_eq!(spawner.state(), SpawnerState::Disabled);
    }

    #[test]
    fn release_never_goes_below_zero() {
        let mut spawner = spawner();
        spawner.release();
        assert_eq!(spawner.alive_count(), 0);
    }
}
