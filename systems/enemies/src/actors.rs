use std::{f32::consts::TAU, time::Duration};

use glam::Vec2;
use wallbreaker_core::{DrawableHandle, SpawnerId};

/// Hit points and motion shared by normal and elite enemies.
#[derive(Clone, Debug, PartialEq)]
struct Vitals {
    position: Vec2,
    hp: u32,
    active: bool,
    hit_flash: Duration,
    handle: DrawableHandle,
}

impl Vitals {
    fn new(position: Vec2, hp: u32, handle: DrawableHandle) -> Self {
        Self {
            position,
            hp: hp.max(1),
            active: true,
            hit_flash: Duration::ZERO,
            handle,
        }
    }

    fn take_damage(&mut self, damage: u32, flash: Duration) {
        if !self.active {
            return;
        }
        self.hp = self.hp.saturating_sub(damage);
        self.hit_flash = flash;
        if self.hp == 0 {
            self.active = false;
        }
    }

    fn chase(&mut self, target: Vec2, speed: f32, dt: Duration) {
        let offset = target - self.position;
        let distance = offset.length();
        let step = speed * dt.as_secs_f32();
        if distance <= step {
            self.position = target;
        } else {
            self.position += offset / distance * step;
        }
    }

    fn decay_flash(&mut self, dt: Duration) {
        self.hit_flash = self.hit_flash.saturating_sub(dt);
    }
}

/// Behaviour the manager drives identically for normal and elite enemies.
pub(crate) trait Hostile {
    fn position(&self) -> Vec2;
    fn is_active(&self) -> bool;
    fn handle(&self) -> DrawableHandle;
    fn take_damage(&mut self, damage: u32, flash: Duration);
    fn chase(&mut self, target: Vec2, speed: f32, dt: Duration);
    fn decay_flash(&mut self, dt: Duration);
}

macro_rules! hostile_via_vitals {
    ($actor:ty) => {
        impl Hostile for $actor {
            fn position(&self) -> Vec2 {
                self.vitals.position
            }

            fn is_active(&self) -> bool {
                self.vitals.active
            }

            fn handle(&self) -> DrawableHandle {
                self.vitals.handle
            }

            fn take_damage(&mut self, damage: u32, flash: Duration) {
                self.vitals.take_damage(damage, flash);
            }

            fn chase(&mut self, target: Vec2, speed: f32, dt: Duration) {
                self.vitals.chase(target, speed, dt);
            }

            fn decay_flash(&mut self, dt: Duration) {
                self.vitals.decay_flash(dt);
            }
        }

        impl $actor {
            /// Current centre of the enemy in world units.
            #[must_use]
            pub fn position(&self) -> Vec2 {
                self.vitals.position
            }

            /// Remaining hit points.
            #[must_use]
            pub fn hp(&self) -> u32 {
                self.vitals.hp
            }

            /// Reports whether the enemy is still alive.
            #[must_use]
            pub fn is_active(&self) -> bool {
                self.vitals.active
            }

            /// Time left on the hit flash shown after taking damage.
            #[must_use]
            pub fn hit_flash(&self) -> Duration {
                self.vitals.hit_flash
            }

            /// Drawable owned by the presentation layer.
            #[must_use]
            pub fn handle(&self) -> DrawableHandle {
                self.vitals.handle
            }
        }
    };
}

/// Normal enemy chasing the player.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    vitals: Vitals,
    spawner: Option<SpawnerId>,
}

impl Enemy {
    pub(crate) fn new(
        position: Vec2,
        hp: u32,
        spawner: Option<SpawnerId>,
        handle: DrawableHandle,
    ) -> Self {
        Self {
            vitals: Vitals::new(position, hp, handle),
            spawner,
        }
    }

    /// Spawner that emitted the enemy, if any.
    #[must_use]
    pub fn spawner(&self) -> Option<SpawnerId> {
        self.spawner
    }
}

hostile_via_vitals!(Enemy);

/// Slow, durable enemy that drops a treasure chest on death.
#[derive(Clone, Debug, PartialEq)]
pub struct EliteEnemy {
    vitals: Vitals,
}

impl EliteEnemy {
    pub(crate) fn new(position: Vec2, hp: u32, handle: DrawableHandle) -> Self {
        Self {
            vitals: Vitals::new(position, hp, handle),
        }
    }
}

hostile_via_vitals!(EliteEnemy);

const CHEST_IDLE_RATE: f32 = 2.5;
const CHEST_BOB_AMPLITUDE: f32 = 2.0;

/// Chest left behind by an elite, granting upgrade picks when opened.
#[derive(Clone, Debug, PartialEq)]
pub struct TreasureChest {
    position: Vec2,
    upgrade_count: u32,
    active: bool,
    idle_phase: f32,
    handle: DrawableHandle,
}

impl TreasureChest {
    pub(crate) fn new(position: Vec2, upgrade_count: u32, handle: DrawableHandle) -> Self {
        Self {
            position,
            upgrade_count,
            active: true,
            idle_phase: 0.0,
            handle,
        }
    }

    /// Resting centre of the chest in world units.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Upgrade picks granted on collection.
    #[must_use]
    pub fn upgrade_count(&self) -> u32 {
        self.upgrade_count
    }

    /// Reports whether the chest is still waiting to be opened.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Vertical offset of the idle bobbing animation.
    #[must_use]
    pub fn bob_offset(&self) -> f32 {
        self.idle_phase.sin() * CHEST_BOB_AMPLITUDE
    }

    /// Drawable owned by the presentation layer.
    #[must_use]
    pub fn handle(&self) -> DrawableHandle {
        self.handle
    }

    pub(crate) fn advance_idle(&mut self, dt: Duration) {
        self.idle_phase = (self.idle_phase + dt.as_secs_f32() * CHEST_IDLE_RATE) % TAU;
    }

    pub(crate) fn open(&mut self) {
        self.active = false;
    }
}
