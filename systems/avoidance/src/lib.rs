#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Throttled separation steering for crowded agents.
//!
//! The system accumulates simulated time and, once per rebuild interval,
//! requests a spatial grid rebuild. When the world confirms the rebuild it
//! recomputes a repulsion bias for every live agent from the neighbours in the
//! surrounding cells. Forces are a bias for the movement step to blend with
//! its own heading; the system never moves agents itself.

use std::{collections::HashMap, time::Duration};

use horde_core::{AgentId, AgentView, AvoidanceConfig, Command, Event, Vec2};
use horde_world::SpatialGrid;

/// Neighbour scans cover the agent's cell and the eight cells around it.
const NEIGHBOUR_RING: u32 = 1;

/// Pure system that maintains per-agent avoidance forces.
#[derive(Debug)]
pub struct Avoidance {
    config: AvoidanceConfig,
    interval: Duration,
    accumulator: Duration,
    forces: HashMap<AgentId, Vec2>,
}

impl Avoidance {
    /// Creates a new avoidance system with no computed forces.
    #[must_use]
    pub fn new(config: AvoidanceConfig) -> Self {
        Self {
            config,
            interval: config.rebuild_interval(),
            accumulator: Duration::ZERO,
            forces: HashMap::new(),
        }
    }

    /// Consumes world events, requesting grid rebuilds and refreshing forces.
    ///
    /// At most one [`Command::RebuildSpatialGrid`] is emitted per call. Forces
    /// are recomputed whenever the batch contains
    /// [`Event::SpatialGridRebuilt`], using the provided grid and agent view.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        grid: &SpatialGrid,
        out: &mut Vec<Command>,
    ) {
        let mut elapsed = Duration::ZERO;
        let mut rebuilt = false;

        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::SpatialGridRebuilt { .. } => rebuilt = true,
                Event::AgentDied { agent, .. } | Event::AgentDespawned { agent } => {
                    let _ = self.forces.remove(agent);
                }
                _ => {}
            }
        }

        if !elapsed.is_zero() && self.advance(elapsed) {
            out.push(Command::RebuildSpatialGrid);
        }

        if rebuilt {
            self.recompute(agents, grid);
        }
    }

    /// Last computed force for the agent, or zero when none exists yet.
    #[must_use]
    pub fn force(&self, agent: AgentId) -> Vec2 {
        self.forces.get(&agent).copied().unwrap_or(Vec2::ZERO)
    }

    /// Number of agents holding a computed force.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.forces.len()
    }

    fn advance(&mut self, elapsed: Duration) -> bool {
        self.accumulator = self.accumulator.saturating_add(elapsed);
        if self.interval.is_zero() {
            self.accumulator = Duration::ZERO;
            return true;
        }

        if self.accumulator < self.interval {
            return false;
        }

        let remainder = self.accumulator.as_nanos() % self.interval.as_nanos();
        self.accumulator = Duration::from_nanos(u64::try_from(remainder).unwrap_or(0));
        true
    }

    fn recompute(&mut self, agents: &AgentView, grid: &SpatialGrid) {
        self.forces.clear();
        let radius = self.config.radius;
        let strength = self.config.strength;

        for agent in agents.iter() {
            let mut total = Vec2::ZERO;
            for neighbour in grid.neighbors(grid.cell_of(agent.position), NEIGHBOUR_RING) {
                if neighbour == agent.id {
                    continue;
                }
                if let Some(other) = agents.get(neighbour) {
                    total += separation(agent.position, other.position, radius, strength);
                }
            }
            let _ = self.forces.insert(agent.id, total);
        }

        tracing::trace!(agents = agents.len(), "avoidance forces recomputed");
    }
}

/// Repulsion exerted on an agent at `position` by a neighbour at `neighbour`.
///
/// The magnitude decays linearly from `strength` at zero distance to zero at
/// `radius`. Coincident agents exert no force because no direction exists.
#[must_use]
pub fn separation(position: Vec2, neighbour: Vec2, radius: f32, strength: f32) -> Vec2 {
    let offset = position - neighbour;
    let distance = offset.length();
    if distance <= 0.0 || distance >= radius {
        return Vec2::ZERO;
    }

    offset / distance * strength * (1.0 - distance / radius)
}

/// Blends a desired heading with an avoidance force into a unit direction.
///
/// Returns zero when the blend cancels out.
#[must_use]
pub fn steer(desired: Vec2, force: Vec2, weight: f32) -> Vec2 {
    (desired + force * weight).normalize_or_zero()
}
