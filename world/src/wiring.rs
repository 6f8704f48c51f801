//! Bus listeners connecting the managers owned by the world.

use std::{
    cell::{Cell, RefCell},
    f32::consts::TAU,
    fmt::Display,
    rc::{Rc, Weak},
};

use glam::Vec2;
use wallbreaker_core::{
    listener, EventBus, EventKind, FloorScaling, GameEvent, ListenerError, Scene,
};
use wallbreaker_system_enemies::EnemyManager;
use wallbreaker_system_pickups::{GemManager, OxygenTankManager};
use wallbreaker_system_player::{Oxygen, Progression};

use crate::{Phase, SharedScene};

/// State the listeners reach into.
pub(crate) struct Links<S> {
    pub(crate) bus: Weak<EventBus>,
    pub(crate) scene: SharedScene<S>,
    pub(crate) enemies: Rc<RefCell<EnemyManager>>,
    pub(crate) gems: Rc<RefCell<GemManager>>,
    pub(crate) tanks: Rc<RefCell<OxygenTankManager>>,
    pub(crate) oxygen: Rc<RefCell<Oxygen>>,
    pub(crate) progression: Rc<RefCell<Progression>>,
    pub(crate) phase: Rc<Cell<Phase>>,
    pub(crate) scaling: Rc<Cell<FloorScaling>>,
    pub(crate) tank_oxygen: f32,
    pub(crate) elite_gem_burst: u32,
    pub(crate) elite_gem_spread: f32,
}

type Reaction<S> = fn(&Links<S>, &GameEvent) -> Result<(), ListenerError>;

/// Subscribes every world reaction on the bus the links point at.
pub(crate) fn connect<S: Scene + 'static>(links: Links<S>) {
    let Some(bus) = links.bus.upgrade() else {
        return;
    };
    let links = Rc::new(links);
    let reactions: [(EventKind, Reaction<S>); 8] = [
        (EventKind::WallDestroyed, wall_destroyed),
        (EventKind::EnemyDied, enemy_died),
        (EventKind::EliteDied, elite_died),
        (EventKind::GemCollected, gem_collected),
        (EventKind::LevelUp, level_up),
        (EventKind::ChestCollected, chest_collected),
        (EventKind::OxygenTankCollected, tank_collected),
        (EventKind::PlayerDamaged, player_damaged),
    ];

    for (kind, reaction) in reactions {
        let links = Rc::clone(&links);
        bus.on(kind, &listener(move |event| reaction(&links, event)));
    }

    let phase = Rc::clone(&links.phase);
    bus.on(
        EventKind::OxygenDepleted,
        &listener(move |_| {
            game_over(&phase, "oxygen depleted");
            Ok(())
        }),
    );
}

fn wall_destroyed<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::WallDestroyed { x, y, .. } = *event else {
        return Ok(());
    };
    let mut scene = links.scene.clone();

    let outcome = links
        .enemies
        .try_borrow_mut()?
        .on_wall_destroyed(x, y, &mut scene)
        .map_err(|err| rejected(event, err))?;
    log::debug!("wall at ({x}, {y}) released {outcome:?}");

    let _ = links
        .tanks
        .try_borrow_mut()?
        .roll_drop(x, y, links.tank_oxygen, &mut scene)
        .map_err(|err| rejected(event, err))?;
    Ok(())
}

fn enemy_died<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::EnemyDied { x, y } = *event else {
        return Ok(());
    };
    let exp = links.scaling.get().gem_exp_value;
    let mut scene = links.scene.clone();
    let _ = links
        .gems
        .try_borrow_mut()?
        .roll_drop(x, y, exp, &mut scene)
        .map_err(|err| rejected(event, err))?;
    Ok(())
}

fn elite_died<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::EliteDied { x, y } = *event else {
        return Ok(());
    };
    let exp = links.scaling.get().gem_exp_value;
    let mut scene = links.scene.clone();
    let mut gems = links.gems.try_borrow_mut()?;
    let count = links.elite_gem_burst;

    for index in 0..count {
        let angle = TAU * index as f32 / count as f32;
        let spot = Vec2::new(x, y) + Vec2::from_angle(angle) * links.elite_gem_spread;
        gems.spawn(spot.x, spot.y, exp, &mut scene)
            .map_err(|err| rejected(event, err))?;
    }
    Ok(())
}

fn gem_collected<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::GemCollected { exp } = *event else {
        return Ok(());
    };
    let Some(bus) = links.bus.upgrade() else {
        return Ok(());
    };
    links.progression.try_borrow_mut()?.gain_exp(exp, &bus);
    Ok(())
}

fn level_up<S: Scene>(links: &Links<S>, _event: &GameEvent) -> Result<(), ListenerError> {
    pause(&links.phase);
    Ok(())
}

fn chest_collected<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::ChestCollected { upgrade_count } = *event else {
        return Ok(());
    };
    if upgrade_count == 0 {
        return Ok(());
    }
    links
        .progression
        .try_borrow_mut()?
        .grant_upgrades(upgrade_count);
    pause(&links.phase);
    Ok(())
}

fn tank_collected<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    let GameEvent::OxygenTankCollected { amount } = *event else {
        return Ok(());
    };
    links.oxygen.try_borrow_mut()?.refill(amount);
    Ok(())
}

fn player_damaged<S: Scene>(links: &Links<S>, event: &GameEvent) -> Result<(), ListenerError> {
    if let GameEvent::PlayerDamaged { new_hp: 0, .. } = *event {
        game_over(&links.phase, "player defeated");
    }
    Ok(())
}

fn pause(phase: &Cell<Phase>) {
    if phase.get() == Phase::Running {
        phase.set(Phase::ChoosingUpgrade);
    }
}

fn game_over(phase: &Cell<Phase>, cause: &str) {
    if phase.get() != Phase::GameOver {
        log::info!("game over: {cause}");
        phase.set(Phase::GameOver);
    }
}

fn rejected(event: &GameEvent, err: impl Display) -> ListenerError {
    ListenerError::Rejected {
        kind: event.kind(),
        reason: err.to_string(),
    }
}
