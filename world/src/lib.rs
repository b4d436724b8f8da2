#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state for Horde Arena.
//!
//! The world owns the live-agent set and the spatial grid. Both are mutated
//! exclusively through [`apply`], which keeps insertion on spawn and removal
//! on death inside a single call so the grid never indexes a dead agent.

use std::{collections::BTreeMap, time::Duration};

use horde_core::{
    AgentId, AgentKind, AgentSnapshot, AgentSpawn, ArenaBounds, ArenaConfig, Command, Event,
    GridConfig, SkipReason, Vec2, WaveId,
};

pub mod grid;

pub use grid::SpatialGrid;

/// Represents the authoritative arena state.
#[derive(Debug)]
pub struct World {
    arena: ArenaBounds,
    spawn_points: Vec<Vec2>,
    grid: SpatialGrid,
    agents: BTreeMap<AgentId, Agent>,
    next_agent_id: u32,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Creates an empty arena with the provided layout.
    #[must_use]
    pub fn new(arena: &ArenaConfig, grid: GridConfig) -> Self {
        Self {
            arena: arena.bounds(),
            spawn_points: arena.spawn_points.clone(),
            grid: SpatialGrid::new(grid.cell_size),
            agents: BTreeMap::new(),
            next_agent_id: 0,
            tick_index: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn spawn(&mut self, spawn: AgentSpawn, out_events: &mut Vec<Event>) {
        let Some(next) = self.next_agent_id.checked_add(1) else {
            tracing::warn!(wave = spawn.wave.get(), "agent ids exhausted; spawn dropped");
            out_events.push(Event::SpawnSkipped {
                wave: spawn.wave,
                kind: spawn.kind,
                reason: SkipReason::IdsExhausted,
            });
            return;
        };
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = next;

        let position = self.arena.clamp(spawn.position);
        if position != spawn.position {
            tracing::debug!(agent = id.get(), "spawn position clamped into arena");
        }

        let agent = Agent {
            id,
            kind: spawn.kind,
            wave: spawn.wave,
            position,
            health: spawn.health,
            max_health: spawn.health,
            damage: spawn.damage,
        };
        self.grid.insert(id, position);
        let _ = self.agents.insert(id, agent);

        out_events.push(Event::AgentSpawned {
            agent: id,
            kind: spawn.kind,
            wave: spawn.wave,
            position,
        });
    }

    fn take(&mut self, agent: AgentId) -> Option<Agent> {
        let removed = self.agents.remove(&agent)?;
        self.grid.remove(agent);
        Some(removed)
    }

    fn kill(&mut self, agent: AgentId, out_events: &mut Vec<Event>) {
        if let Some(dead) = self.take(agent) {
            out_events.push(Event::AgentDied {
                agent,
                kind: dead.kind,
                wave: dead.wave,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&ArenaConfig::default(), GridConfig::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SpawnAgent { spawn } => world.spawn(spawn, out_events),
        Command::MoveAgent { agent, position } => {
            let arena = world.arena;
            if let Some(existing) = world.agents.get_mut(&agent) {
                existing.position = arena.clamp(position);
            }
        }
        Command::DamageAgent { agent, amount } => {
            let Some(existing) = world.agents.get_mut(&agent) else {
                return;
            };
            existing.health -= amount.max(0.0);
            if existing.health <= 0.0 {
                world.kill(agent, out_events);
            }
        }
        Command::KillAgent { agent } => world.kill(agent, out_events),
        Command::DespawnAgent { agent } => {
            if world.take(agent).is_some() {
                out_events.push(Event::AgentDespawned { agent });
            }
        }
        Command::RebuildSpatialGrid => {
            let live = world
                .agents
                .values()
                .map(|agent| (agent.id, agent.position));
            world.grid.rebuild(live);
            out_events.push(Event::SpatialGridRebuilt {
                agents: world.grid.len(),
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use horde_core::{AgentId, AgentSnapshot, AgentView, ArenaBounds, Vec2};

    use super::{SpatialGrid, World};

    /// Bounds of the arena.
    #[must_use]
    pub fn arena(world: &World) -> ArenaBounds {
        world.arena
    }

    /// Configured spawn points.
    #[must_use]
    pub fn spawn_points(world: &World) -> &[Vec2] {
        &world.spawn_points
    }

    /// Read-only access to the spatial grid.
    #[must_use]
    pub fn spatial_grid(world: &World) -> &SpatialGrid {
        &world.grid
    }

    /// Captures a read-only view of every live agent.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(active_agents(world))
    }

    /// Owned snapshot of every live agent in identifier order.
    #[must_use]
    pub fn active_agents(world: &World) -> Vec<AgentSnapshot> {
        world.agents.values().map(super::Agent::snapshot).collect()
    }

    /// Number of live agents.
    #[must_use]
    pub fn live_count(world: &World) -> usize {
        world.agents.len()
    }

    /// Snapshot of a single agent, if alive.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        world.agents.get(&agent).map(super::Agent::snapshot)
    }

    /// Closest live agent within `max_distance` of `position`.
    ///
    /// Ties resolve to the lower identifier.
    #[must_use]
    pub fn nearest_agent(world: &World, position: Vec2, max_distance: f32) -> Option<AgentSnapshot> {
        if !(max_distance >= 0.0) {
            return None;
        }

        let limit = max_distance * max_distance;
        let mut best: Option<(f32, &super::Agent)> = None;
        for agent in world.agents.values() {
            let distance_sq = agent.position.distance_squared(position);
            if distance_sq > limit {
                continue;
            }
            match best {
                Some((current, _)) if current <= distance_sq => {}
                _ => best = Some((distance_sq, agent)),
            }
        }
        best.map(|(_, agent)| agent.snapshot())
    }

    /// Every live agent within `range` of `position`, in identifier order.
    #[must_use]
    pub fn agents_in_range(world: &World, position: Vec2, range: f32) -> Vec<AgentSnapshot> {
        if !(range >= 0.0) {
            return Vec::new();
        }

        let limit = range * range;
        world
            .agents
            .values()
            .filter(|agent| agent.position.distance_squared(position) <= limit)
            .map(super::Agent::snapshot)
            .collect()
    }

    /// Total simulated time.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    kind: AgentKind,
    wave: WaveId,
    position: Vec2,
    health: f32,
    max_health: f32,
    damage: f32,
}

impl Agent {
    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            kind: self.kind,
            wave: self.wave,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            damage: self.damage,
        }
    }
}
