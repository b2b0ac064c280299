use std::{collections::BTreeMap, time::Duration};

use throne_defence_core::{Command, Event, Target, UnitId, UnitKind, Vec2};
use throne_defence_system_combat::UnitAi;
use throne_defence_world::{apply, query, World, WorldConfig};

const TICK: Duration = Duration::from_millis(50);

fn sturdy_world() -> World {
    let mut profiles = BTreeMap::new();
    for kind in [UnitKind::Minion, UnitKind::Raider, UnitKind::Hero] {
        let mut profile = kind.default_profile();
        profile.max_health = 1_000_000.0;
        let _ = profiles.insert(kind, profile);
    }
    World::with_config(WorldConfig {
        profiles,
        ..WorldConfig::default()
    })
    .expect("valid config")
}

fn spawn(world: &mut World, kind: UnitKind, x: f32, z: f32) -> UnitId {
    let mut events = Vec::new();
    apply(
        world,
        Command::SpawnUnit {
            kind,
            position: Vec2::new(x, z),
        },
        &mut events,
    )
    .expect("spawn");
    events
        .iter()
        .find_map(|event| match event {
            Event::UnitSpawned { unit, .. } => Some(*unit),
            _ => None,
        })
        .expect("unit spawned")
}

/// Runs one tick followed by one AI pass and returns every emitted event.
fn step(world: &mut World, ai: &mut UnitAi) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, Command::Tick { dt: TICK }, &mut events).expect("tick");

    let view = query::unit_view(world);
    let mut commands = Vec::new();
    ai.handle(&*world, query::elapsed(world), &events, view.iter(), &mut commands);
    for command in commands {
        apply(world, command, &mut events).expect("command applies");
    }
    events
}

fn attacks_by(events: &[Event], attacker: UnitId) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::UnitAttacked { attacker: a, .. } if *a == attacker))
        .count()
}

#[test]
fn adjacent_enemies_trade_blows_at_their_attack_rate() {
    let mut world = sturdy_world();
    let minion = spawn(&mut world, UnitKind::Minion, 0.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 1.0, 0.0);
    let mut ai = UnitAi::default();

    let mut attacks = 0;
    let mut acquired = false;
    for _ in 0..61 {
        let events = step(&mut world, &mut ai);
        attacks += attacks_by(&events, minion);
        acquired |= events.contains(&Event::TargetChanged {
            unit: minion,
            target: Some(Target::Unit(raider)),
            manual: false,
        });
    }

    assert!(acquired, "minion acquires the raider on its own");
    assert_eq!(attacks, 4, "one attack per second over three seconds plus the opening strike");
    assert_eq!(
        query::unit(&world, minion).map(|unit| unit.position),
        Some(Vec2::ZERO),
        "units in range do not move"
    );
}

#[test]
fn enemies_march_on_distant_targets() {
    let mut world = sturdy_world();
    let minion = spawn(&mut world, UnitKind::Minion, 0.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 20.0, 0.0);
    let mut ai = UnitAi::default();

    let mut first_attack = None;
    for tick in 0..200 {
        let events = step(&mut world, &mut ai);
        if first_attack.is_none() && attacks_by(&events, raider) > 0 {
            first_attack = Some(tick);
        }
    }

    let first_attack = first_attack.expect("raider eventually strikes");
    assert!(first_attack > 10, "the raider had to walk first");
    let gap = query::unit(&world, raider)
        .zip(query::unit(&world, minion))
        .map(|(raider, minion)| raider.position.distance(minion.position))
        .expect("both alive");
    assert!(gap <= 2.0 + 0.01, "units end up in attack range, gap {gap}");
}

#[test]
fn queued_skills_are_cast_once_in_reach() {
    let mut world = sturdy_world();
    let hero = spawn(&mut world, UnitKind::Hero, 0.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 40.0, 0.0);
    let mut ai = UnitAi::default();

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::QueueSkill {
            unit: hero,
            slot: 0,
            target: Target::Unit(raider),
        },
        &mut events,
    )
    .expect("queue");

    let mut cast_at = None;
    for tick in 0..200 {
        let events = step(&mut world, &mut ai);
        if events
            .iter()
            .any(|event| matches!(event, Event::SkillCast { unit, .. } if *unit == hero))
        {
            cast_at = Some(tick);
            break;
        }
    }

    assert!(cast_at.is_some_and(|tick| tick > 0), "hero walks into range before casting");
    let caster = query::unit(&world, hero).expect("hero alive");
    assert!(caster.skills[0].is_recharging());
    assert_eq!(caster.handling, throne_defence_core::TargetHandling::Attack);
}

#[test]
fn manual_orders_survive_target_searches() {
    let mut world = sturdy_world();
    let minion = spawn(&mut world, UnitKind::Minion, 0.0, 0.0);
    let _raider = spawn(&mut world, UnitKind::Raider, 3.0, 0.0);
    let rally = Vec2::new(-10.0, 0.0);
    let mut ai = UnitAi::default();

    let mut events = Vec::new();
    apply(
        &mut world,
        Command::AssignTarget {
            unit: minion,
            target: Target::Point(rally),
            manual: true,
        },
        &mut events,
    )
    .expect("assign");

    for _ in 0..20 {
        let _ = step(&mut world, &mut ai);
    }

    let snapshot = query::unit(&world, minion).expect("minion alive");
    assert_eq!(snapshot.target, Some(Target::Point(rally)));
    assert!(snapshot.position.x < -1.0, "minion walks to the rally point");
}
