use std::{cell::RefCell, rc::Rc, time::Duration};

use glam::Vec2;
use wallbreaker_core::{
    listener, ActorKind, EventBus, EventKind, FloorScaling, GameEvent, HeadlessScene, PlayerBody,
    PlayerTarget, SpawnerId,
};
use wallbreaker_system_enemies::{
    Config, EnemyManager, SpawnerState, WallOutcome, ELITE_DAMAGE_MULTIPLIER, ELITE_HP_MULTIPLIER,
};

const FRAME: Duration = Duration::from_millis(16);

struct Dummy {
    body: PlayerBody,
    hp: u32,
}

impl Dummy {
    fn at(x: f32, y: f32) -> Self {
        Self {
            body: PlayerBody {
                position: Vec2::new(x, y),
                radius: 8.0,
            },
            hp: 10,
        }
    }
}

impl PlayerTarget for Dummy {
    fn body(&self) -> PlayerBody {
        self.body
    }

    fn absorb_hit(&mut self, damage: u32) -> Option<u32> {
        self.hp = self.hp.saturating_sub(damage);
        Some(self.hp)
    }
}

struct Harness {
    manager: EnemyManager,
    player: Dummy,
    bus: EventBus,
    scene: HeadlessScene,
    log: Rc<RefCell<Vec<GameEvent>>>,
}

impl Harness {
    fn new(config: Config) -> Self {
        Self::with_scaling(config, FloorScaling::default())
    }

    fn with_scaling(config: Config, scaling: FloorScaling) -> Self {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let recorder = listener(move |event| {
            sink.try_borrow_mut()?.push(event.clone());
            Ok(())
        });
        for kind in [
            EventKind::EnemyDied,
            EventKind::EliteDied,
            EventKind::ChestCollected,
            EventKind::PlayerDamaged,
        ] {
            bus.on(kind, &recorder);
        }

        Self {
            manager: EnemyManager::with_seed(config, scaling, 0x5eed_cafe),
            player: Dummy::at(0.0, 0.0),
            bus,
            scene: HeadlessScene::new(),
            log,
        }
    }

    fn tick(&mut self, dt: Duration) {
        self.manager
            .update(dt, &mut self.player, &self.bus, &mut self.scene);
    }

    fn take_events(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

fn quiet_walls() -> Config {
    Config {
        elite_chance: 0.0,
        spawner_chance: 0.0,
        ..Config::default()
    }
}

#[test]
fn elite_scales_hp_and_damage_from_base_values() {
    let config = Config {
        contact_damage: 2,
        ..quiet_walls()
    };
    let mut harness = Harness::new(config);
    assert_eq!(harness.manager.enemy_hp(), 1);
    assert_eq!(harness.manager.elite_hp(), 5);
    assert_eq!(harness.manager.elite_damage(), 8);
    assert_eq!(
        harness.manager.elite_damage(),
        harness.manager.enemy_damage() * ELITE_DAMAGE_MULTIPLIER
    );

    harness
        .manager
        .spawn_elite(0.0, 0.0, &mut harness.scene)
        .expect("finite position");
    assert_eq!(harness.manager.elites()[0].hp(), ELITE_HP_MULTIPLIER);

    harness.tick(FRAME);
    assert_eq!(
        harness.take_events(),
        vec![GameEvent::PlayerDamaged {
            damage: 8,
            new_hp: 2
        }]
    );
}

#[test]
fn enemy_on_player_deals_base_damage_once() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(0.0, 0.0, &mut harness.scene)
        .expect("finite position");

    harness.tick(FRAME);

    assert_eq!(
        harness.take_events(),
        vec![GameEvent::PlayerDamaged {
            damage: 1,
            new_hp: 9
        }]
    );
}

#[test]
fn distant_enemy_deals_no_damage() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(500.0, 500.0, &mut harness.scene)
        .expect("finite position");

    harness.tick(FRAME);

    assert!(harness.take_events().is_empty());
    let enemy = &harness.manager.enemies()[0];
    assert!(enemy.position().length() < Vec2::new(500.0, 500.0).length());
}

#[test]
fn killed_elite_leaves_one_chest_that_can_be_collected() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_elite(300.0, 0.0, &mut harness.scene)
        .expect("finite position");

    assert!(harness.manager.damage_enemy_at(300.0, 0.0, 4.0, 100));
    harness.tick(FRAME);

    assert_eq!(
        harness.take_events(),
        vec![GameEvent::EliteDied { x: 300.0, y: 0.0 }]
    );
    assert!(harness.manager.elites().is_empty());
    assert_eq!(harness.manager.chests().len(), 1);
    assert_eq!(
        harness.manager.chests()[0].position(),
        Vec2::new(300.0, 0.0)
    );
    assert_eq!(harness.scene.live_of(ActorKind::Elite), 0);
    assert_eq!(harness.scene.live_of(ActorKind::Chest), 1);

    harness.player.body.position = Vec2::new(300.0, 0.0);
    harness.tick(FRAME);

    let events = harness.take_events();
    assert_eq!(events.len(), 1);
    match events[0] {
        GameEvent::ChestCollected { upgrade_count } => {
            let config = harness.manager.config();
            assert!(upgrade_count >= config.chest_min_upgrades);
            assert!(upgrade_count <= config.chest_max_upgrades);
        }
        ref other => panic!("unexpected event: {other:?}"),
    }
    assert!(harness.manager.chests().is_empty());
    assert_eq!(harness.scene.live_count(), 0);
}

#[test]
fn damage_hits_a_single_target_preferring_normal_enemies() {
    let config = quiet_walls();
    let mut harness = Harness::new(config);
    for _ in 0..2 {
        harness
            .manager
            .spawn_enemy(200.0, 0.0, &mut harness.scene)
            .expect("finite position");
    }
    harness
        .manager
        .spawn_elite(200.0, 0.0, &mut harness.scene)
        .expect("finite position");

    assert!(harness.manager.damage_enemy_at(200.0, 0.0, 5.0, 1));
    let enemies = harness.manager.enemies();
    assert!(!enemies[0].is_active());
    assert!(enemies[1].is_active());
    assert_eq!(harness.manager.elites()[0].hp(), 5);

    assert!(harness.manager.damage_enemy_at(200.0, 0.0, 5.0, 1));
    assert!(!harness.manager.enemies()[1].is_active());
    assert_eq!(harness.manager.elites()[0].hp(), 5);

    assert!(harness.manager.damage_enemy_at(200.0, 0.0, 5.0, 1));
    assert_eq!(harness.manager.elites()[0].hp(), 4);
}

#[test]
fn damage_probe_misses_when_nothing_overlaps() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(200.0, 0.0, &mut harness.scene)
        .expect("finite position");

    assert!(!harness.manager.damage_enemy_at(-200.0, 0.0, 5.0, 1));
    assert!(!harness.manager.damage_enemy_at(f32::NAN, 0.0, 5.0, 1));
    assert!(!harness.manager.damage_enemy_at(200.0, 0.0, f32::INFINITY, 1));
    assert_eq!(harness.manager.enemies()[0].hp(), 1);
}

#[test]
fn full_spawner_waits_for_a_bound_death() {
    let config = Config {
        spawner_max_alive: 1,
        spawner_interval_secs: 1.0,
        ..quiet_walls()
    };
    let mut harness = Harness::new(config);
    let id = harness
        .manager
        .spawn_spawner(900.0, 0.0, &mut harness.scene)
        .expect("finite position");

    harness.tick(Duration::from_secs(1));
    assert_eq!(harness.manager.enemies().len(), 1);
    assert_eq!(harness.manager.enemies()[0].spawner(), Some(id));
    assert_eq!(harness.manager.spawner(id).map(|s| s.alive_count()), Some(1));

    for _ in 0..3 {
        harness.tick(Duration::from_secs(1));
    }
    assert_eq!(harness.manager.enemies().len(), 1);

    let position = harness.manager.enemies()[0].position();
    assert!(harness
        .manager
        .damage_enemy_at(position.x, position.y, 1.0, 10));
    harness.tick(FRAME);
    assert!(harness.manager.enemies().is_empty());
    assert_eq!(harness.manager.spawner(id).map(|s| s.alive_count()), Some(0));
    assert!(matches!(
        harness.take_events().as_slice(),
        [GameEvent::EnemyDied { .. }]
    ));

    harness.tick(FRAME);
    assert_eq!(harness.manager.enemies().len(), 1);
    assert_eq!(harness.manager.spawner(id).map(|s| s.alive_count()), Some(1));
}

#[test]
fn spawned_and_disposed_enemy_leaves_no_trace() {
    let config = Config {
        spawner_interval_secs: 0.5,
        ..quiet_walls()
    };
    let mut harness = Harness::new(config);
    let id = harness
        .manager
        .spawn_spawner(900.0, 0.0, &mut harness.scene)
        .expect("finite position");
    let baseline = harness.scene.live_count();

    harness.tick(Duration::from_millis(500));
    let spawned = harness.manager.enemies()[0].position();
    assert!(harness
        .manager
        .damage_enemy_at(spawned.x, spawned.y, 1.0, 1));
    harness.tick(Duration::from_millis(1));

    assert!(harness.manager.enemies().is_empty());
    assert_eq!(harness.manager.spawner(id).map(|s| s.alive_count()), Some(0));
    assert_eq!(harness.scene.live_count(), baseline);
    assert_eq!(harness.scene.live_of(ActorKind::Enemy), 0);
}

#[test]
fn close_spawner_is_disabled_for_good() {
    let config = Config {
        spawner_interval_secs: 0.1,
        ..quiet_walls()
    };
    let mut harness = Harness::new(config);
    let id = harness
        .manager
        .spawn_spawner(10.0, 0.0, &mut harness.scene)
        .expect("finite position");

    harness.tick(Duration::from_secs(1));
    harness.player.body.position = Vec2::new(5_000.0, 0.0);
    for _ in 0..10 {
        harness.tick(Duration::from_secs(1));
    }

    let spawner = harness.manager.spawner(id).expect("spawner stays on the floor");
    assert_eq!(spawner.state(), SpawnerState::Disabled);
    assert!(harness.manager.enemies().is_empty());
    assert_eq!(harness.scene.live_of(ActorKind::Spawner), 1);
}

#[test]
fn wall_rolls_follow_priority_and_short_circuit() {
    let everything = Config {
        elite_chance: 1.0,
        spawner_chance: 1.0,
        ..Config::default()
    };
    let certain = FloorScaling {
        enemy_spawn_chance: 1.0,
        ..FloorScaling::default()
    };

    let mut harness = Harness::with_scaling(everything.clone(), certain);
    let outcome = harness
        .manager
        .on_wall_destroyed(50.0, 50.0, &mut harness.scene);
    assert_eq!(outcome, Ok(WallOutcome::Elite));
    assert_eq!(harness.manager.elites().len(), 1);
    assert!(harness.manager.spawners().is_empty());
    assert!(harness.manager.enemies().is_empty());

    let no_elites = Config {
        elite_chance: 0.0,
        ..everything
    };
    let mut harness = Harness::with_scaling(no_elites, certain);
    let outcome = harness
        .manager
        .on_wall_destroyed(50.0, 50.0, &mut harness.scene);
    assert_eq!(outcome, Ok(WallOutcome::Spawner(SpawnerId::new(0))));
    assert!(harness.manager.enemies().is_empty());

    let mut harness = Harness::with_scaling(quiet_walls(), certain);
    let outcome = harness
        .manager
        .on_wall_destroyed(50.0, 50.0, &mut harness.scene);
    assert_eq!(outcome, Ok(WallOutcome::Enemy));
    assert_eq!(harness.manager.enemies()[0].spawner(), None);

    let never = FloorScaling {
        enemy_spawn_chance: 0.0,
        ..FloorScaling::default()
    };
    let mut harness = Harness::with_scaling(quiet_walls(), never);
    let outcome = harness
        .manager
        .on_wall_destroyed(50.0, 50.0, &mut harness.scene);
    assert_eq!(outcome, Ok(WallOutcome::Nothing));
    assert!(harness
        .manager
        .on_wall_destroyed(f32::NAN, 0.0, &mut harness.scene)
        .is_err());
    assert_eq!(harness.scene.live_count(), 0);
}

#[test]
fn rescale_only_affects_new_enemies() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(400.0, 0.0, &mut harness.scene)
        .expect("finite position");

    harness.manager.rescale(FloorScaling {
        enemy_hp: 3,
        ..FloorScaling::default()
    });
    harness
        .manager
        .spawn_enemy(-400.0, 0.0, &mut harness.scene)
        .expect("finite position");

    let hp: Vec<u32> = harness.manager.enemies().iter().map(|e| e.hp()).collect();
    assert_eq!(hp, vec![1, 3]);
    assert_eq!(harness.manager.elite_hp(), 15);
}

#[test]
fn unbound_enemy_death_reports_its_position() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(120.0, -40.0, &mut harness.scene)
        .expect("finite position");
    assert!(harness.manager.damage_enemy_at(120.0, -40.0, 0.0, 1));

    harness.tick(FRAME);
    harness.tick(FRAME);

    assert_eq!(
        harness.take_events(),
        vec![GameEvent::EnemyDied { x: 120.0, y: -40.0 }]
    );
    assert_eq!(harness.scene.live_count(), 0);
}

#[test]
fn clear_releases_every_drawable() {
    let mut harness = Harness::new(quiet_walls());
    harness
        .manager
        .spawn_enemy(100.0, 0.0, &mut harness.scene)
        .expect("finite position");
    harness
        .manager
        .spawn_elite(200.0, 0.0, &mut harness.scene)
        .expect("finite position");
    let _ = harness
        .manager
        .spawn_spawner(300.0, 0.0, &mut harness.scene)
        .expect("finite position");
    assert_eq!(harness.scene.live_count(), 3);

    harness.manager.clear(&mut harness.scene);

    assert_eq!(harness.scene.live_count(), 0);
    assert!(harness.manager.enemies().is_empty());
    assert!(harness.manager.elites().is_empty());
    assert!(harness.manager.spawners().is_empty());
}

#[test]
fn elites_chase_slower_than_normal_enemies() {
    let config = Config {
        enemy_speed: 50.0,
        elite_speed_factor: 0.6,
        ..quiet_walls()
    };
    let mut harness = Harness::new(config);
    let enemy_start = Vec2::new(1_000.0, 0.0);
    let elite_start = Vec2::new(-1_000.0, 0.0);
    harness
        .manager
        .spawn_enemy(enemy_start.x, enemy_start.y, &mut harness.scene)
        .expect("finite position");
    harness
        .manager
        .spawn_elite(elite_start.x, elite_start.y, &mut harness.scene)
        .expect("finite position");

    harness.tick(Duration::from_secs(1));

    let enemy_moved = harness.manager.enemies()[0].position().distance(enemy_start);
    let elite_moved = harness.manager.elites()[0].position().distance(elite_start);
    assert!((enemy_moved - 50.0).abs() < 1e-3);
    assert!((elite_moved - 30.0).abs() < 1e-3);
    assert!((elite_moved / enemy_moved - 0.6).abs() < 1e-4);
}

#[test]
fn several_dead_enemies_are_swept_in_one_update() {
    let mut harness = Harness::new(quiet_walls());
    for x in [200.0, 400.0, 600.0] {
        harness
            .manager
            .spawn_enemy(x, 300.0, &mut harness.scene)
            .expect("finite position");
    }

    assert!(harness.manager.damage_enemy_at(200.0, 300.0, 1.0, 1));
    assert!(harness.manager.damage_enemy_at(600.0, 300.0, 1.0, 1));
    harness.tick(FRAME);

    assert_eq!(
        harness.take_events(),
        vec![
            GameEvent::EnemyDied { x: 600.0, y: 300.0 },
            GameEvent::EnemyDied { x: 200.0, y: 300.0 },
        ]
    );

    let survivors = harness.manager.enemies();
    assert_eq!(survivors.len(), 1);
    assert!(survivors[0].is_active());
    assert!((survivors[0].position().x - 400.0).abs() < 5.0);
    assert_eq!(harness.scene.live_of(ActorKind::Enemy), 1);
}
