use std::{collections::BTreeMap, time::Duration};

use throne_defence_core::{
    AreaTarget, BuildingDirectory, BuildingKind, Event, Target, Team, UnitKind, Vec2,
};
use throne_defence_system_bootstrap::{
    headless::{RecordingPool, TopDownCamera},
    BootstrapError, Frontend, ProfileOverride, RevivalNotice, Session, SessionConfig, TickReport,
};
use throne_defence_system_input::{InputCondition, InputFrame, Key, MouseButton, ScreenRect};
use throne_defence_system_selection::{Accessory, Selectable, SelectionEvent};
use throne_defence_system_spawning::{EnemySheet, SpawnArea, SpawnError, SpawnReport, WaveData};
use throne_defence_world::query;

const TICK: Duration = Duration::from_millis(50);

fn quiet() -> SessionConfig {
    SessionConfig {
        waves: Vec::new(),
        ..SessionConfig::default()
    }
}

fn step(session: &mut Session, pool: &mut RecordingPool, frame: InputFrame) -> TickReport {
    let camera = TopDownCamera::default();
    session
        .tick(
            TICK,
            &frame,
            Frontend {
                projector: &camera,
                pool,
            },
        )
        .expect("tick succeeds")
}

fn idle(session: &mut Session, pool: &mut RecordingPool) -> TickReport {
    step(session, pool, InputFrame::new(Vec2::new(500.0, 500.0)))
}

#[test]
fn sessions_open_with_buildings_hero_and_minions() {
    let mut session = Session::new(SessionConfig::default()).expect("default session");
    let mut pool = RecordingPool::default();
    let report = idle(&mut session, &mut pool);

    let placed = report
        .events
        .iter()
        .filter(|event| matches!(event, Event::BuildingPlaced { .. }))
        .count();
    assert_eq!(placed, 3);
    assert!(report.events.iter().any(|event| matches!(
        event,
        Event::UnitSpawned {
            kind: UnitKind::Hero,
            ..
        }
    )));
    assert!(report.events.contains(&Event::TimeAdvanced { dt: TICK }));

    let friends = query::living_units_of(session.world(), Team::Friends);
    assert_eq!(friends.len(), 5);
    assert!(session.hero().is_some_and(|hero| friends.contains(&hero)));
    assert!(query::living_units_of(session.world(), Team::Enemies).is_empty());
    assert!(!session.spawner().is_started());
}

#[test]
fn waves_start_after_the_configured_delay() {
    let mut session = Session::new(SessionConfig {
        wave_start_delay_secs: 1.0,
        waves: vec![WaveData {
            start_delay_secs: 0.0,
            enemies: vec![EnemySheet {
                kind: UnitKind::Raider,
                count: 2,
            }],
        }],
        ..SessionConfig::default()
    })
    .expect("session");
    let mut pool = RecordingPool::default();

    for _ in 0..19 {
        let report = idle(&mut session, &mut pool);
        assert!(report.spawns.is_empty());
    }
    assert!(query::living_units_of(session.world(), Team::Enemies).is_empty());

    let report = idle(&mut session, &mut pool);
    assert_eq!(
        report.spawns,
        vec![SpawnReport::WaveSpawned { wave: 0 }, SpawnReport::WavesEnded]
    );
    assert_eq!(query::living_units_of(session.world(), Team::Enemies).len(), 2);
}

#[test]
fn fallen_heroes_return_after_ten_seconds_per_level() {
    let mut profiles = BTreeMap::new();
    let _ = profiles.insert(
        UnitKind::Hero,
        ProfileOverride {
            max_health: Some(1.0),
            ..ProfileOverride::default()
        },
    );
    let mut session = Session::new(SessionConfig {
        profiles,
        wave_start_delay_secs: 0.0,
        waves: vec![WaveData {
            start_delay_secs: 0.0,
            enemies: vec![EnemySheet {
                kind: UnitKind::Raider,
                count: 1,
            }],
        }],
        spawn_area: SpawnArea {
            from: Vec2::ZERO,
            to: Vec2::ZERO,
        },
        hero_spawn: Vec2::new(0.0, 1.0),
        minion_spawns: Vec::new(),
        throne: Vec2::new(0.0, -60.0),
        fountain: Vec2::new(40.0, -60.0),
        ..SessionConfig::default()
    })
    .expect("session");
    let hero = session.hero().expect("hero spawned");
    let mut pool = RecordingPool::default();

    let mut died_at = None;
    let mut revived_at = None;
    let mut board: Vec<RevivalNotice> = Vec::new();
    for _ in 0..400 {
        let report = idle(&mut session, &mut pool);
        let now = query::elapsed(session.world());
        if died_at.is_some() {
            board.extend(report.revivals);
        }
        if report
            .events
            .iter()
            .any(|event| matches!(event, Event::UnitRevived { unit, .. } if *unit == hero))
        {
            revived_at = Some(now);
            break;
        }
        if died_at.is_none()
            && report.events.iter().any(
                |event| matches!(event, Event::UnitDied { unit, .. } if *unit == hero),
            )
        {
            died_at = Some(now);
            assert_eq!(session.revival_seconds_left(hero), Some(10.0));
        }
    }

    let died_at = died_at.expect("the raider kills the hero");
    let revived_at = revived_at.expect("the hero comes back");
    assert_eq!(revived_at - died_at, Duration::from_secs(10));
    assert_eq!(
        board.iter().map(|notice| notice.seconds_left).collect::<Vec<_>>(),
        vec![10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]
    );
    assert!(board
        .iter()
        .all(|notice| notice.unit == hero && notice.description == "Hero will be reborn in"));
    assert_eq!(session.revival_seconds_left(hero), None);
    assert!(query::unit(session.world(), hero).is_some_and(|unit| unit.alive));
}

#[test]
fn dragging_selects_minions_and_right_click_rallies_them() {
    let mut session = Session::new(quiet()).expect("session");
    let mut pool = RecordingPool::default();
    let start = Vec2::new(-10.0, -24.0);
    let end = Vec2::new(10.0, -16.0);

    let _ = step(
        &mut session,
        &mut pool,
        InputFrame::new(start).button_pressed(MouseButton::Left),
    );
    for _ in 0..3 {
        let report = step(
            &mut session,
            &mut pool,
            InputFrame::new(end).button_held(MouseButton::Left),
        );
        assert_eq!(
            report.selection,
            vec![SelectionEvent::DrawRectangle { start, end }]
        );
    }
    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(end).button_released(MouseButton::Left),
    );
    assert!(report.selection.iter().any(|event| matches!(
        event,
        SelectionEvent::Selected(Selectable::Squad(squad)) if squad.len() == 4
    )));
    assert_eq!(report.selection.last(), Some(&SelectionEvent::SelectionEnded));
    let squad = session.selector().controllable_units().to_vec();
    assert_eq!(squad.len(), 4);
    assert!(session.hero().is_some_and(|hero| !squad.contains(&hero)));

    let rally = Vec2::new(20.0, 0.0);
    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(rally).button_pressed(MouseButton::Right),
    );
    for unit in &squad {
        assert!(report.events.contains(&Event::TargetChanged {
            unit: *unit,
            target: Some(Target::Point(rally)),
            manual: true,
        }));
    }
    assert_eq!(pool.acquired(), 1);
    assert!(pool.active().any(|(_, accessory, position)| {
        accessory == Accessory::PositionMarker && position == rally
    }));
}

#[test]
fn ui_panels_block_new_selections() {
    let mut session = Session::new(SessionConfig {
        ui_panels: vec![ScreenRect::from_corners(
            Vec2::new(-100.0, -100.0),
            Vec2::new(100.0, 100.0),
        )],
        ..quiet()
    })
    .expect("session");
    let mut pool = RecordingPool::default();
    let hero_spot = Vec2::new(0.0, -25.0);

    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(hero_spot).button_pressed(MouseButton::Left),
    );
    assert!(report.selection.is_empty());
    assert!(session.selector().is_blocked());

    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(hero_spot).button_released(MouseButton::Left),
    );
    assert_eq!(report.selection, vec![SelectionEvent::SelectionEnded]);
    assert!(session.selector().selected().is_none());
}

#[test]
fn hotkeys_aim_and_queue_hero_skills() {
    let mut session = Session::new(quiet()).expect("session");
    let hero = session.hero().expect("hero");
    let mut pool = RecordingPool::default();
    let hero_spot = Vec2::new(0.0, -25.0);

    let _ = step(
        &mut session,
        &mut pool,
        InputFrame::new(hero_spot).button_pressed(MouseButton::Left),
    );
    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(hero_spot).button_released(MouseButton::Left),
    );
    assert!(report
        .selection
        .contains(&SelectionEvent::Selected(Selectable::Unit(hero))));

    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(Vec2::new(10.0, 10.0)).key_pressed(Key::char('w')),
    );
    assert!(report
        .selection
        .contains(&SelectionEvent::SkillTargetingStarted { unit: hero, slot: 1 }));
    assert_eq!(session.selector().skill_targeting(), Some((hero, 1)));
    assert!(pool.active().any(|(_, accessory, position)| {
        accessory == Accessory::AreaIndicator { radius: 6.0 } && position == Vec2::new(10.0, 10.0)
    }));

    let aim = Vec2::new(12.0, 8.0);
    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(aim).button_pressed(MouseButton::Left),
    );
    let target = Target::Area(AreaTarget {
        center: aim,
        radius: 6.0,
    });
    assert!(report.events.contains(&Event::SkillQueued {
        unit: hero,
        slot: 1,
        target,
    }));
    assert!(report.selection.contains(&SelectionEvent::SkillTargetingCompleted {
        unit: hero,
        slot: 1,
        target,
    }));
    assert_eq!(session.selector().skill_targeting(), None);
    assert_eq!(pool.active().count(), 0);
}

#[test]
fn dropping_a_session_releases_its_input_subscriptions() {
    let session = Session::new(quiet()).expect("session");
    let input = session.input().clone();
    let left = input
        .handler(InputCondition::MouseButton(MouseButton::Left))
        .expect("handler");
    assert_eq!(left.subscriber_count().expect("count"), 3);

    drop(session);
    assert_eq!(left.subscriber_count().expect("count"), 0);
}

#[test]
fn identical_sessions_replay_identical_event_streams() {
    let config = SessionConfig {
        wave_start_delay_secs: 0.5,
        waves: vec![WaveData {
            start_delay_secs: 0.0,
            enemies: vec![
                EnemySheet {
                    kind: UnitKind::Raider,
                    count: 3,
                },
                EnemySheet {
                    kind: UnitKind::Archer,
                    count: 2,
                },
            ],
        }],
        seed: 42,
        ..SessionConfig::default()
    };

    let run = |config: SessionConfig| {
        let mut session = Session::new(config).expect("session");
        let mut pool = RecordingPool::default();
        let mut events = Vec::new();
        for _ in 0..300 {
            events.extend(idle(&mut session, &mut pool).events);
        }
        events
    };

    let first = run(config.clone());
    assert!(first
        .iter()
        .any(|event| matches!(event, Event::UnitSpawned { kind: UnitKind::Raider, .. })));
    assert_eq!(first, run(config));
}

#[test]
fn sessions_reject_waves_they_could_never_start() {
    let config = SessionConfig::from_toml_str(
        r#"
        [[waves]]
        start_delay_secs = 1e30
        enemies = [{ kind = "raider", count = 1 }]
        "#,
    )
    .expect("config parses");
    assert!(matches!(
        Session::new(config),
        Err(BootstrapError::Spawn(SpawnError::InvalidWaveDelay { wave: 0, .. }))
    ));

    let config = SessionConfig {
        spawn_area: SpawnArea {
            from: Vec2::new(0.0, f32::NAN),
            to: Vec2::new(f32::INFINITY, 0.0),
        },
        ..SessionConfig::default()
    };
    assert!(matches!(
        Session::new(config),
        Err(BootstrapError::Spawn(SpawnError::InvalidArea { .. }))
    ));
}

#[test]
fn barracks_train_minions_at_their_creation_speed() {
    let mut session = Session::new(SessionConfig {
        barracks_creation_speed: 2.0,
        ..quiet()
    })
    .expect("session");
    let mut pool = RecordingPool::default();
    let door = Vec2::new(-15.0, -27.0);

    let mut trained_at = Vec::new();
    for _ in 0..40 {
        let report = idle(&mut session, &mut pool);
        let now = query::elapsed(session.world());
        trained_at.extend(report.events.iter().filter_map(|event| match event {
            Event::UnitSpawned {
                kind: UnitKind::Minion,
                position,
                ..
            } if *position == door => Some(now),
            _ => None,
        }));
    }

    let expected: Vec<Duration> = (1..=4).map(|n| Duration::from_millis(500) * n).collect();
    assert_eq!(trained_at, expected);
}

#[test]
fn the_upgrade_hotkey_levels_up_the_selected_barracks() {
    let mut session = Session::new(quiet()).expect("session");
    let barracks = session
        .world()
        .building_of_kind(BuildingKind::Barracks)
        .expect("barracks placed");
    let mut pool = RecordingPool::default();
    let door = Vec2::new(-15.0, -30.0);

    let _ = step(
        &mut session,
        &mut pool,
        InputFrame::new(door).button_pressed(MouseButton::Left),
    );
    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(door).button_released(MouseButton::Left),
    );
    assert!(report
        .selection
        .contains(&SelectionEvent::Selected(Selectable::Building(barracks))));

    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(door).key_pressed(Key::char('u')),
    );
    assert!(report.events.contains(&Event::GoldChanged { old: 100, new: 0 }));
    assert!(report.events.contains(&Event::BuildingLeveledUp {
        building: barracks,
        level: 2,
    }));
    assert_eq!(query::gold(session.world()), 0);

    let report = step(
        &mut session,
        &mut pool,
        InputFrame::new(door).key_pressed(Key::char('u')),
    );
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, Event::BuildingLeveledUp { .. })));
}
