#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy population manager: spawners, normal and elite enemies, and the
//! treasure chests elites leave behind.
//!
//! The manager owns every actor and spawner it creates. Each tick it advances
//! spawners, enemies, elites and chests in that order, resolves contact with
//! the player, and announces deaths and collections on the [`EventBus`].
//! Actors that died are swept in reverse index order during the same update
//! so removal never skips or revisits an element.

mod actors;
mod spawner;

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use wallbreaker_core::{
    circles_overlap, finite_position, seconds, ActorKind, EventBus, FloorScaling, GameEvent,
    InputError, PlayerBody, PlayerTarget, Scene, SpawnerId,
};

use self::actors::Hostile;
pub use self::actors::{EliteEnemy, Enemy, TreasureChest};
use self::spawner::{SpawnerRules, SpawnerStep};
pub use self::spawner::{Spawner, SpawnerState};

/// Elite hit points relative to a normal enemy on the same floor.
pub const ELITE_HP_MULTIPLIER: u32 = 5;
/// Elite contact damage relative to a normal enemy.
pub const ELITE_DAMAGE_MULTIPLIER: u32 = 4;
/// Elite collision radius relative to a normal enemy.
pub const ELITE_SIZE_MULTIPLIER: f32 = 1.8;

/// Tuning knobs for the enemy population.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collision radius of a normal enemy.
    pub enemy_radius: f32,
    /// Chase speed of a normal enemy in world units per second.
    pub enemy_speed: f32,
    /// Damage a normal enemy deals on contact.
    pub contact_damage: u32,
    /// Seconds an enemy flashes after being hit.
    pub hit_flash_secs: f32,
    /// Fraction of the normal chase speed used by elites.
    pub elite_speed_factor: f32,
    /// Probability that a destroyed wall releases an elite.
    pub elite_chance: f32,
    /// Probability that a destroyed wall uncovers a spawner.
    pub spawner_chance: f32,
    /// Seconds between spawner emissions.
    pub spawner_interval_secs: f32,
    /// Maximum number of live enemies per spawner.
    pub spawner_max_alive: u32,
    /// Distance under which the player shuts a spawner down.
    pub spawner_disable_radius: f32,
    /// Collision radius of a treasure chest.
    pub chest_radius: f32,
    /// Fewest upgrade picks a chest grants.
    pub chest_min_upgrades: u32,
    /// Most upgrade picks a chest grants.
    pub chest_max_upgrades: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enemy_radius: 10.0,
            enemy_speed: 60.0,
            contact_damage: 1,
            hit_flash_secs: 0.12,
            elite_speed_factor: 0.6,
            elite_chance: 0.03,
            spawner_chance: 0.05,
            spawner_interval_secs: 4.0,
            spawner_max_alive: 3,
            spawner_disable_radius: 40.0,
            chest_radius: 14.0,
            chest_min_upgrades: 1,
            chest_max_upgrades: 3,
        }
    }
}

impl Config {
    fn spawner_rules(&self) -> SpawnerRules {
        SpawnerRules {
            interval: seconds(self.spawner_interval_secs),
            max_alive: self.spawner_max_alive,
            disable_radius: self.spawner_disable_radius,
        }
    }

    fn elite_radius(&self) -> f32 {
        self.enemy_radius * ELITE_SIZE_MULTIPLIER
    }

    fn upgrade_range(&self) -> (u32, u32) {
        let low = self.chest_min_upgrades.min(self.chest_max_upgrades);
        let high = self.chest_min_upgrades.max(self.chest_max_upgrades);
        (low, high)
    }
}

/// What a destroyed wall released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallOutcome {
    /// Every roll failed.
    Nothing,
    /// An elite enemy appeared.
    Elite,
    /// A spawner was uncovered.
    Spawner(SpawnerId),
    /// A normal, unbound enemy appeared.
    Enemy,
}

/// Owns and simulates every spawner, enemy, elite and chest on a floor.
#[derive(Debug)]
pub struct EnemyManager {
    config: Config,
    scaling: FloorScaling,
    rng: ChaCha8Rng,
    next_spawner: u32,
    spawners: Vec<Spawner>,
    enemies: Vec<Enemy>,
    elites: Vec<EliteEnemy>,
    chests: Vec<TreasureChest>,
}

impl EnemyManager {
    /// Creates a manager whose rolls are seeded from system entropy.
    #[must_use]
    pub fn new(config: Config, scaling: FloorScaling) -> Self {
        Self::with_rng(config, scaling, ChaCha8Rng::from_entropy())
    }

    /// Creates a manager whose rolls follow the provided seed.
    #[must_use]
    pub fn with_seed(config: Config, scaling: FloorScaling, seed: u64) -> Self {
        Self::with_rng(config, scaling, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, scaling: FloorScaling, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            scaling,
            rng,
            next_spawner: 0,
            spawners: Vec::new(),
            enemies: Vec::new(),
            elites: Vec::new(),
            chests: Vec::new(),
        }
    }

    /// Tuning the manager was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Floor scaling applied to newly spawned actors.
    #[must_use]
    pub fn scaling(&self) -> FloorScaling {
        self.scaling
    }

    /// Replaces the cached floor scaling. Live actors keep their hit points.
    pub fn rescale(&mut self, scaling: FloorScaling) {
        log::debug!("enemy scaling changed to {scaling:?}");
        self.scaling = scaling;
    }

    /// Hit points given to newly spawned normal enemies.
    #[must_use]
    pub fn enemy_hp(&self) -> u32 {
        self.scaling.enemy_hp
    }

    /// Hit points given to newly spawned elites.
    #[must_use]
    pub fn elite_hp(&self) -> u32 {
        self.scaling.enemy_hp.saturating_mul(ELITE_HP_MULTIPLIER)
    }

    /// Contact damage dealt by a normal enemy.
    #[must_use]
    pub fn enemy_damage(&self) -> u32 {
        self.config.contact_damage
    }

    /// Contact damage dealt by an elite.
    #[must_use]
    pub fn elite_damage(&self) -> u32 {
        self.config
            .contact_damage
            .saturating_mul(ELITE_DAMAGE_MULTIPLIER)
    }

    /// Spawners on the current floor in creation order.
    #[must_use]
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    /// Looks up a spawner by identifier.
    #[must_use]
    pub fn spawner(&self, id: SpawnerId) -> Option<&Spawner> {
        self.spawner_index(id).map(|index| &self.spawners[index])
    }

    /// Live normal enemies in collection order.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Live elites in collection order.
    #[must_use]
    pub fn elites(&self) -> &[EliteEnemy] {
        &self.elites
    }

    /// Unopened treasure chests.
    #[must_use]
    pub fn chests(&self) -> &[TreasureChest] {
        &self.chests
    }

    /// Rolls what a destroyed wall at `(x, y)` releases.
    ///
    /// The elite, spawner and enemy rolls run in that order and the first
    /// success ends the sequence, so a wall releases at most one thing.
    pub fn on_wall_destroyed(
        &mut self,
        x: f32,
        y: f32,
        scene: &mut dyn Scene,
    ) -> Result<WallOutcome, InputError> {
        let position = finite_position(x, y)?;

        if self.roll(self.config.elite_chance) {
            self.push_elite(position, scene);
            return Ok(WallOutcome::Elite);
        }

        if self.roll(self.config.spawner_chance) {
            let id = self.push_spawner(position, scene);
            return Ok(WallOutcome::Spawner(id));
        }

        if self.roll(self.scaling.enemy_spawn_chance) {
            self.push_enemy(position, None, scene);
            return Ok(WallOutcome::Enemy);
        }

        Ok(WallOutcome::Nothing)
    }

    /// Spawns an unbound normal enemy at `(x, y)`.
    pub fn spawn_enemy(&mut self, x: f32, y: f32, scene: &mut dyn Scene) -> Result<(), InputError> {
        let position = finite_position(x, y)?;
        self.push_enemy(position, None, scene);
        Ok(())
    }

    /// Spawns an elite at `(x, y)`.
    pub fn spawn_elite(&mut self, x: f32, y: f32, scene: &mut dyn Scene) -> Result<(), InputError> {
        let position = finite_position(x, y)?;
        self.push_elite(position, scene);
        Ok(())
    }

    /// Places a spawner at `(x, y)` and returns its identifier.
    pub fn spawn_spawner(
        &mut self,
        x: f32,
        y: f32,
        scene: &mut dyn Scene,
    ) -> Result<SpawnerId, InputError> {
        let position = finite_position(x, y)?;
        Ok(self.push_spawner(position, scene))
    }

    /// Deals `damage` to the first enemy overlapping the circle at `(x, y)`.
    ///
    /// Normal enemies are scanned first in collection order and elites are
    /// only considered when no normal enemy overlaps. At most one actor is
    /// hit per call; the return value reports whether one was.
    pub fn damage_enemy_at(&mut self, x: f32, y: f32, radius: f32, damage: u32) -> bool {
        let point = match finite_position(x, y) {
            Ok(point) if radius.is_finite() => point,
            _ => {
                log::warn!("ignored damage probe at ({x}, {y}) with radius {radius}");
                return false;
            }
        };
        let flash = seconds(self.config.hit_flash_secs);

        let enemy_reach = radius + self.config.enemy_radius;
        if let Some(enemy) = first_overlap(&mut self.enemies, point, enemy_reach) {
            enemy.take_damage(damage, flash);
            return true;
        }

        let elite_reach = radius + self.config.elite_radius();
        if let Some(elite) = first_overlap(&mut self.elites, point, elite_reach) {
            elite.take_damage(damage, flash);
            return true;
        }

        false
    }

    /// Advances the whole population by `dt`.
    ///
    /// Runs spawners, enemies, elites and chests in that order. A contact
    /// emits `PlayerDamaged` only when [`PlayerTarget::absorb_hit`] lands the
    /// hit, so a player-side invulnerability window suppresses the event.
    pub fn update<P: PlayerTarget>(
        &mut self,
        dt: Duration,
        player: &mut P,
        bus: &EventBus,
        scene: &mut dyn Scene,
    ) {
        self.update_spawners(dt, player.body(), scene);
        self.update_enemies(dt, player, bus, scene);
        self.update_elites(dt, player, bus, scene);
        self.update_chests(dt, player.body(), bus, scene);
    }

    /// Releases every actor and spawner, e.g. when a floor is torn down.
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        for spawner in self.spawners.drain(..) {
            scene.detach(spawner.handle());
        }
        for enemy in self.enemies.drain(..) {
            scene.detach(enemy.handle());
        }
        for elite in self.elites.drain(..) {
            scene.detach(elite.handle());
        }
        for chest in self.chests.drain(..) {
            scene.detach(chest.handle());
        }
    }

    fn update_spawners(&mut self, dt: Duration, body: PlayerBody, scene: &mut dyn Scene) {
        let rules = self.config.spawner_rules();
        for index in (0..self.spawners.len()).rev() {
            let spawner = &mut self.spawners[index];
            match spawner.step(dt, body.position, &rules) {
                SpawnerStep::Idle => {}
                SpawnerStep::Disabled => {
                    log::info!("spawner {} disabled by the player", spawner.id().get());
                }
                SpawnerStep::Spawn => {
                    let (id, position) = (spawner.id(), spawner.position());
                    self.push_enemy(position, Some(id), scene);
                }
            }
        }
    }

    fn update_enemies<P: PlayerTarget>(
        &mut self,
        dt: Duration,
        player: &mut P,
        bus: &EventBus,
        scene: &mut dyn Scene,
    ) {
        let contact = Contact {
            speed: self.config.enemy_speed,
            reach: self.config.enemy_radius,
            damage: self.enemy_damage(),
        };
        for index in (0..self.enemies.len()).rev() {
            if self.enemies[index].is_active() {
                contact.resolve(&mut self.enemies[index], dt, player, bus);
                continue;
            }

            let enemy = self.enemies.remove(index);
            if let Some(id) = enemy.spawner() {
                self.release_spawner_slot(id);
            }
            let position = enemy.position();
            bus.emit(GameEvent::EnemyDied {
                x: position.x,
                y: position.y,
            });
            dispose(&enemy, scene);
        }
    }

    fn update_elites<P: PlayerTarget>(
        &mut self,
        dt: Duration,
        player: &mut P,
        bus: &EventBus,
        scene: &mut dyn Scene,
    ) {
        let contact = Contact {
            speed: self.config.enemy_speed * self.config.elite_speed_factor,
            reach: self.config.elite_radius(),
            damage: self.elite_damage(),
        };
        for index in (0..self.elites.len()).rev() {
            if self.elites[index].is_active() {
                contact.resolve(&mut self.elites[index], dt, player, bus);
                continue;
            }

            let elite = self.elites.remove(index);
            let position = elite.position();
            self.push_chest(position, scene);
            bus.emit(GameEvent::EliteDied {
                x: position.x,
                y: position.y,
            });
            dispose(&elite, scene);
        }
    }

    fn update_chests(
        &mut self,
        dt: Duration,
        body: PlayerBody,
        bus: &EventBus,
        scene: &mut dyn Scene,
    ) {
        let reach = self.config.chest_radius + body.radius;
        for index in (0..self.chests.len()).rev() {
            let chest = &mut self.chests[index];
            if chest.is_active() {
                chest.advance_idle(dt);
                if !circles_overlap(chest.position(), body.position, reach) {
                    continue;
                }
                chest.open();
            }

            let chest = self.chests.remove(index);
            bus.emit(GameEvent::ChestCollected {
                upgrade_count: chest.upgrade_count(),
            });
            scene.detach(chest.handle());
            log::debug!("chest opened for {} upgrades", chest.upgrade_count());
        }
    }

    fn roll(&mut self, chance: f32) -> bool {
        self.rng.gen::<f32>() < chance
    }

    fn push_enemy(&mut self, position: Vec2, spawner: Option<SpawnerId>, scene: &mut dyn Scene) {
        let handle = scene.attach(ActorKind::Enemy, position);
        self.enemies.push(Enemy::new(position, self.enemy_hp(), spawner, handle));
        log::debug!("enemy spawned at {position} from {spawner:?}");
    }

    fn push_elite(&mut self, position: Vec2, scene: &mut dyn Scene) {
        let handle = scene.attach(ActorKind::Elite, position);
        self.elites.push(EliteEnemy::new(position, self.elite_hp(), handle));
        log::debug!("elite spawned at {position}");
    }

    fn push_spawner(&mut self, position: Vec2, scene: &mut dyn Scene) -> SpawnerId {
        let id = SpawnerId::new(self.next_spawner);
        self.next_spawner = self.next_spawner.wrapping_add(1);
        let handle = scene.attach(ActorKind::Spawner, position);
        let interval = self.config.spawner_rules().interval;
        self.spawners.push(Spawner::new(id, position, interval, handle));
        log::debug!("spawner {} placed at {position}", id.get());
        id
    }

    fn push_chest(&mut self, position: Vec2, scene: &mut dyn Scene) {
        let (low, high) = self.config.upgrade_range();
        let upgrade_count = self.rng.gen_range(low..=high);
        let handle = scene.attach(ActorKind::Chest, position);
        self.chests.push(TreasureChest::new(position, upgrade_count, handle));
    }

    fn spawner_index(&self, id: SpawnerId) -> Option<usize> {
        self.spawners.binary_search_by_key(&id, Spawner::id).ok()
    }

    fn release_spawner_slot(&mut self, id: SpawnerId) {
        if let Some(index) = self.spawner_index(id) {
            self.spawners[index].release();
        }
    }
}

/// Chase and contact-damage parameters for one enemy class.
#[derive(Clone, Copy, Debug)]
struct Contact {
    speed: f32,
    reach: f32,
    damage: u32,
}

impl Contact {
    fn resolve<H: Hostile, P: PlayerTarget>(
        &self,
        actor: &mut H,
        dt: Duration,
        player: &mut P,
        bus: &EventBus,
    ) {
        let body = player.body();
        actor.chase(body.position, self.speed, dt);
        actor.decay_flash(dt);
        if !circles_overlap(actor.position(), body.position, self.reach + body.radius) {
            return;
        }
        if let Some(new_hp) = player.absorb_hit(self.damage) {
            bus.emit(GameEvent::PlayerDamaged {
                damage: self.damage,
                new_hp,
            });
        }
    }
}

fn first_overlap<H: Hostile>(actors: &mut [H], point: Vec2, reach: f32) -> Option<&mut H> {
    actors
        .iter_mut()
        .find(|actor| actor.is_active() && circles_overlap(actor.position(), point, reach))
}

fn dispose<H: Hostile>(actor: &H, scene: &mut dyn Scene) {
    scene.detach(actor.handle());
}
