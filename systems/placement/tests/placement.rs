use horde_core::{
    AgentKind, AgentSpawn, ArenaConfig, Command, GridConfig, PlacementConfig, PlacementError, Vec2,
    WaveId,
};
use horde_system_placement::{Config, PlacementContext, SpawnPositionResolver};
use horde_world::{self as world, query, World};

fn spawn_agent(world: &mut World, position: Vec2) {
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
}

fn resolve(world: &World, resolver: &SpawnPositionResolver, base: Vec2) -> Result<Vec2, PlacementError> {
    let agents = query::agent_view(world);
    let context = PlacementContext {
        arena: query::arena(world),
        grid: query::spatial_grid(world),
        agents: &agents,
    };
    resolver.resolve(base, &context)
}

fn assert_valid(world: &World, position: Vec2, placement: PlacementConfig, grid: GridConfig) {
    assert!(query::arena(world).contains(position), "{position} outside arena");
    let spatial = query::spatial_grid(world);
    assert!(spatial.agents_in_cell(spatial.cell_of(position)) < grid.max_agents_per_cell);
    for agent in query::active_agents(world) {
        assert!(
            agent.position.distance(position) >= placement.min_agent_distance,
            "{position} too close to agent {}",
            agent.id.get()
        );
    }
}

#[test]
fn free_base_point_is_returned_unchanged() {
    let world = World::default();
    let resolver = SpawnPositionResolver::new(Config::new(PlacementConfig::default(), 3));
    let base = Vec2::new(2.0, -3.0);
    assert_eq!(resolve(&world, &resolver, base), Ok(base));
}

#[test]
fn occupied_base_point_moves_to_valid_candidate() {
    let mut world = World::default();
    let placement = PlacementConfig::default();
    let grid = GridConfig::default();
    let resolver = SpawnPositionResolver::new(Config::new(placement, grid.max_agents_per_cell));
    let base = Vec2::new(0.7, 0.7);
    spawn_agent(&mut world, base);

    let position = resolve(&world, &resolver, base).expect("expected a nearby position");
    assert_ne!(position, base);
    assert_valid(&world, position, placement, grid);
}

#[test]
fn repeated_spawns_at_one_point_never_violate_guards() {
    let mut world = World::default();
    let placement = PlacementConfig::default();
    let grid = GridConfig::default();
    let resolver = SpawnPositionResolver::new(Config::new(placement, grid.max_agents_per_cell));
    let base = Vec2::new(-10.0, -10.0);

    let mut placed = 0;
    for _ in 0..80 {
        match resolve(&world, &resolver, base) {
            Ok(position) => {
                assert_valid(&world, position, placement, grid);
                spawn_agent(&mut world, position);
                placed += 1;
            }
            Err(PlacementError::Exhausted { candidates, .. }) => {
                assert_eq!(candidates, 1 + placement.max_search_attempts + 48);
            }
        }
    }
    assert!(placed > 5, "expected the search to place several agents, got {placed}");
}

#[test]
fn full_cell_without_alternatives_reports_failure() {
    let arena = ArenaConfig {
        min: Vec2::ZERO,
        max: Vec2::new(1.5, 1.5),
        spawn_points: Vec::new(),
    };
    let grid = GridConfig {
        cell_size: 1.5,
        max_agents_per_cell: 3,
    };
    let placement = PlacementConfig {
        min_agent_distance: 0.1,
        ..PlacementConfig::default()
    };
    let mut world = World::new(&arena, grid);
    for position in [
        Vec2::new(0.2, 0.2),
        Vec2::new(1.2, 0.2),
        Vec2::new(0.2, 1.2),
    ] {
        spawn_agent(&mut world, position);
    }

    let resolver = SpawnPositionResolver::new(Config::new(placement, grid.max_agents_per_cell));
    let result = resolve(&world, &resolver, Vec2::new(0.75, 0.75));
    assert!(matches!(result, Err(PlacementError::Exhausted { .. })), "got {result:?}");
}

#[test]
fn density_guard_rejects_independently_of_cell_cap() {
    let grid = GridConfig {
        cell_size: 1.0,
        max_agents_per_cell: 100,
    };
    let placement = PlacementConfig {
        min_agent_distance: 0.0,
        max_search_attempts: 0,
        density_radius: 1.0,
        max_spawn_density: 0.1,
    };
    let arena = ArenaConfig {
        min: Vec2::ZERO,
        max: Vec2::new(1.0, 1.0),
        spawn_points: Vec::new(),
    };
    let mut world = World::new(&arena, grid);
    spawn_agent(&mut world, Vec2::new(0.5, 0.5));

    let resolver = SpawnPositionResolver::new(Config::new(placement, grid.max_agents_per_cell));
    assert!(resolve(&world, &resolver, Vec2::new(0.2, 0.2)).is_err());

    let relaxed = SpawnPositionResolver::new(Config::new(
        PlacementConfig {
            max_spawn_density: 10.0,
            ..placement
        },
        grid.max_agents_per_cell,
    ));
    assert_eq!(
        resolve(&world, &relaxed, Vec2::new(0.2, 0.2)),
        Ok(Vec2::new(0.2, 0.2))
    );
}
