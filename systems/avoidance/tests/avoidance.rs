use std::time::Duration;

use horde_core::{AgentId, AgentKind, AgentSpawn, AvoidanceConfig, Command, Event, Vec2, WaveId};
use horde_system_avoidance::Avoidance;
use horde_world::{self as world, query, World};

fn spawn_agent(world: &mut World, position: Vec2) -> AgentId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnAgent {
            spawn: AgentSpawn {
                kind: AgentKind::Normal,
                position,
                wave: WaveId::new(1),
                health: 1.0,
                damage: 1.0,
            },
        },
        &mut events,
    );
    match events.as_slice() {
        [Event::AgentSpawned { agent, .. }] => *agent,
        other => panic!("unexpected events: {other:?}"),
    }
}

fn pump(world: &mut World, avoidance: &mut Avoidance, pending_events: Vec<Event>) -> usize {
    let mut events = pending_events;
    let mut rebuilds = 0;

    while !events.is_empty() {
        let agents = query::agent_view(world);
        let mut commands = Vec::new();
        avoidance.handle(&events, &agents, query::spatial_grid(world), &mut commands);

        events.clear();
        for command in commands {
            if command == Command::RebuildSpatialGrid {
                rebuilds += 1;
            }
            world::apply(world, command, &mut events);
        }
    }

    rebuilds
}

fn tick(world: &mut World, avoidance: &mut Avoidance, dt: Duration) -> usize {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    pump(world, avoidance, events)
}

#[test]
fn forces_appear_only_after_first_interval() {
    let mut world = World::default();
    let a = spawn_agent(&mut world, Vec2::new(0.2, 0.2));
    let b = spawn_agent(&mut world, Vec2::new(0.6, 0.2));
    let mut avoidance = Avoidance::new(AvoidanceConfig::default());

    assert_eq!(tick(&mut world, &mut avoidance, Duration::from_millis(250)), 0);
    assert_eq!(avoidance.force(a), Vec2::ZERO);

    assert_eq!(tick(&mut world, &mut avoidance, Duration::from_millis(250)), 1);
    let on_a = avoidance.force(a);
    let on_b = avoidance.force(b);
    assert!(on_a.x < 0.0, "a should be pushed away from b: {on_a}");
    assert!(on_b.x > 0.0, "b should be pushed away from a: {on_b}");
    assert!((on_a.length() - on_b.length()).abs() < 1e-6);
}

#[test]
fn isolated_agents_receive_zero_force() {
    let mut world = World::default();
    let lone = spawn_agent(&mut world, Vec2::new(-8.0, 8.0));
    let _pair_a = spawn_agent(&mut world, Vec2::new(0.2, 0.2));
    let _pair_b = spawn_agent(&mut world, Vec2::new(0.3, 0.2));
    let mut avoidance = Avoidance::new(AvoidanceConfig::default());

    let _ = tick(&mut world, &mut avoidance, Duration::from_millis(500));
    assert_eq!(avoidance.force(lone), Vec2::ZERO);
    assert_eq!(avoidance.tracked(), 3);
}

#[test]
fn forces_stay_stale_between_rebuilds() {
    let mut world = World::default();
    let a = spawn_agent(&mut world, Vec2::new(0.2, 0.2));
    let _b = spawn_agent(&mut world, Vec2::new(0.6, 0.2));
    let mut avoidance = Avoidance::new(AvoidanceConfig::default());
    let _ = tick(&mut world, &mut avoidance, Duration::from_millis(500));
    let before = avoidance.force(a);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::MoveAgent {
            agent: a,
            position: Vec2::new(-6.0, -6.0),
        },
        &mut events,
    );
    assert_eq!(tick(&mut world, &mut avoidance, Duration::from_millis(100)), 0);
    assert_eq!(avoidance.force(a), before);

    assert_eq!(tick(&mut world, &mut avoidance, Duration::from_millis(400)), 1);
    assert_eq!(avoidance.force(a), Vec2::ZERO);
}

#[test]
fn dead_agents_lose_their_force_immediately() {
    let mut world = World::default();
    let a = spawn_agent(&mut world, Vec2::new(0.2, 0.2));
    let _b = spawn_agent(&mut world, Vec2::new(0.6, 0.2));
    let mut avoidance = Avoidance::new(AvoidanceConfig::default());
    let _ = tick(&mut world, &mut avoidance, Duration::from_millis(500));
    assert_ne!(avoidance.force(a), Vec2::ZERO);

    let mut events = Vec::new();
    world::apply(&mut world, Command::KillAgent { agent: a }, &mut events);
    let _ = pump(&mut world, &mut avoidance, events);
    assert_eq!(avoidance.force(a), Vec2::ZERO);
    assert_eq!(avoidance.tracked(), 1);
}

#[test]
fn neighbour_scan_stays_within_adjacent_cells() {
    let mut world = World::default();
    let a = spawn_agent(&mut world, Vec2::new(0.2, 0.2));
    let b = spawn_agent(&mut world, Vec2::new(1.7, 0.2));
    let far = spawn_agent(&mut world, Vec2::new(4.0, 4.0));
    let mut avoidance = Avoidance::new(AvoidanceConfig {
        radius: 3_000.0,
        ..AvoidanceConfig::default()
    });

    assert_eq!(tick(&mut world, &mut avoidance, Duration::from_millis(500)), 1);

    assert!(avoidance.force(a).x < 0.0);
    assert!(avoidance.force(b).x > 0.0);
    assert_eq!(avoidance.force(far), Vec2::ZERO);
}
