use throne_defence_core::{
    AreaTarget, BuildingDirectory, BuildingKind, Command, Event, Target, Team, UnitId, UnitKind,
    UnitSnapshot, Vec2,
};
use throne_defence_system_targeting::TargetResolver;
use throne_defence_world::{apply, query, World};

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

fn place(world: &mut World, kind: BuildingKind, x: f32, z: f32) {
    let mut events = Vec::new();
    apply(
        world,
        Command::PlaceBuilding {
            kind,
            position: Vec2::new(x, z),
        },
        &mut events,
    )
    .expect("place");
}

fn snapshot(world: &World, unit: UnitId) -> UnitSnapshot {
    query::unit(world, unit).expect("unit exists")
}

#[test]
fn unit_targets_come_from_the_opposing_team() {
    let mut world = World::new();
    let hero = spawn(&mut world, UnitKind::Hero, 0.0, 0.0);
    let minion = spawn(&mut world, UnitKind::Minion, 1.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 6.0, 0.0);
    let resolver = TargetResolver::new();

    assert_eq!(
        resolver.unit_target_for(&world, Team::Friends, Vec2::ZERO),
        Some(raider),
        "friends never target friends even when they are closer"
    );
    assert_eq!(
        resolver.unit_target_for(&world, Team::Enemies, Vec2::new(6.0, 0.0)),
        Some(minion)
    );
    let _ = hero;
}

#[test]
fn area_targets_are_opponents_only() {
    let mut world = World::new();
    let _minion = spawn(&mut world, UnitKind::Minion, 0.0, 0.0);
    let near = spawn(&mut world, UnitKind::Raider, 1.0, 1.0);
    let _far = spawn(&mut world, UnitKind::Archer, 15.0, 0.0);
    let resolver = TargetResolver::new();

    let mut hits = Vec::new();
    resolver.unit_targets_in_area(
        &world,
        Team::Friends,
        &AreaTarget {
            center: Vec2::ZERO,
            radius: 5.0,
        },
        &mut hits,
    );
    assert_eq!(hits, vec![near]);
}

#[test]
fn enemies_fall_back_to_the_throne() {
    let mut world = World::new();
    place(&mut world, BuildingKind::Throne, 0.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 30.0, 0.0);
    let throne = world
        .building_of_kind(BuildingKind::Throne)
        .expect("throne placed");
    let resolver = TargetResolver::new();

    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, raider)),
        Some(Target::Building(throne))
    );

    let minion = spawn(&mut world, UnitKind::Minion, 50.0, 0.0);
    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, raider)),
        Some(Target::Unit(minion)),
        "any friendly unit outranks the throne"
    );
}

#[test]
fn minions_keep_assigned_targets_then_return_to_the_fountain() {
    let mut world = World::new();
    place(&mut world, BuildingKind::Fountain, 0.0, 0.0);
    let fountain = world
        .building_of_kind(BuildingKind::Fountain)
        .expect("fountain placed");
    let minion = spawn(&mut world, UnitKind::Minion, 5.0, 0.0);
    let resolver = TargetResolver::new();

    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, minion)),
        Some(Target::Building(fountain))
    );

    let rally = Target::Point(Vec2::new(40.0, 40.0));
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::AssignTarget {
            unit: minion,
            target: rally,
            manual: true,
        },
        &mut events,
    )
    .expect("assign");
    let _raider = spawn(&mut world, UnitKind::Raider, 6.0, 0.0);

    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, minion)),
        Some(rally),
        "player orders outrank nearby enemies"
    );
}

#[test]
fn heroes_only_engage_within_auto_attack_distance() {
    let mut world = World::new();
    place(&mut world, BuildingKind::Fountain, 0.0, 0.0);
    let hero = spawn(&mut world, UnitKind::Hero, 0.0, 0.0);
    let raider = spawn(&mut world, UnitKind::Raider, 25.0, 0.0);
    let resolver = TargetResolver::new();

    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, hero)),
        None,
        "heroes have no building fallback"
    );

    let close = spawn(&mut world, UnitKind::Raider, 0.0, 19.0);
    assert_eq!(
        resolver.next_target(&world, &snapshot(&world, hero)),
        Some(Target::Unit(close))
    );
    assert_eq!(
        TargetResolver::with_auto_attack_distance(30.0)
            .next_target(&world, &snapshot(&world, hero)),
        Some(Target::Unit(close))
    );
    let _ = raider;
}
