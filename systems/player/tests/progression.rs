use std::{cell::RefCell, collections::HashSet, rc::Rc};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wallbreaker_core::{listener, EventBus, EventKind, GameEvent, UpgradeKind};
use wallbreaker_system_player::{PlayerStats, Progression, ProgressionConfig, UpgradeError};

fn recording_bus(kinds: &[EventKind]) -> (EventBus, Rc<RefCell<Vec<GameEvent>>>) {
    let bus = EventBus::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let recorder = listener(move |event| {
        sink.try_borrow_mut()?.push(event.clone());
        Ok(())
    });
    for kind in kinds {
        bus.on(*kind, &recorder);
    }
    (bus, log)
}

#[test]
fn large_gain_crosses_several_levels() {
    let (bus, log) = recording_bus(&[EventKind::ExpGained, EventKind::LevelUp]);
    let mut progression = Progression::new(ProgressionConfig::default());

    progression.gain_exp(14, &bus);

    assert_eq!(
        *log.borrow(),
        vec![
            GameEvent::ExpGained { amount: 14 },
            GameEvent::LevelUp { level: 2 },
            GameEvent::LevelUp { level: 3 },
        ]
    );
    assert_eq!(progression.level(), 3);
    assert_eq!(progression.exp(), 1);
    assert_eq!(progression.pending_upgrades(), 2);
}

#[test]
fn zero_exp_publishes_nothing() {
    let (bus, log) = recording_bus(&[EventKind::ExpGained, EventKind::LevelUp]);
    let mut progression = Progression::new(ProgressionConfig::default());
    progression.gain_exp(0, &bus);
    assert!(log.borrow().is_empty());
}

#[test]
fn offers_are_distinct_and_sized() {
    let mut progression = Progression::new(ProgressionConfig::default());
    progression.grant_upgrades(1);
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for _ in 0..20 {
        let offer = progression.offer(&mut rng);
        let unique: HashSet<_> = offer.iter().copied().collect();
        assert_eq!(offer.len(), 3);
        assert_eq!(unique.len(), 3);
    }
}

#[test]
fn selection_spends_a_pick_and_applies_the_upgrade() {
    let (bus, log) = recording_bus(&[EventKind::UpgradeSelected]);
    let mut progression = Progression::new(ProgressionConfig::default());
    let mut stats = PlayerStats::default();
    progression.grant_upgrades(1);

    assert_eq!(
        progression.select(UpgradeKind::AttackDamage, &mut stats, &bus),
        Ok(())
    );
    assert_eq!(
        progression.select(UpgradeKind::AttackDamage, &mut stats, &bus),
        Err(UpgradeError::NothingPending)
    );

    assert_eq!(stats.attack_damage, 2);
    assert_eq!(
        *log.borrow(),
        vec![GameEvent::UpgradeSelected {
            upgrade: UpgradeKind::AttackDamage
        }]
    );
}
