#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn-position resolver that turns requested base points into validated
//! arena positions.
//!
//! Candidates are tested in a fixed order and the first valid one wins:
//!
//! 1. the base point itself;
//! 2. a growing golden-angle spiral around the base point;
//! 3. the centres of the cells in Chebyshev rings 1 to 3 around the base cell.
//!
//! The resolver never mutates the grid; the caller inserts the agent once it
//! exists.

use horde_core::{AgentView, ArenaBounds, GridCell, PlacementConfig, PlacementError, Vec2};
use horde_world::SpatialGrid;

/// Angle between successive spiral candidates, roughly 137.5 degrees.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

const FALLBACK_RINGS: u32 = 3;

/// Configuration parameters required to construct the resolver.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    placement: PlacementConfig,
    max_agents_per_cell: usize,
}

impl Config {
    /// Creates a configuration from placement guards and the grid's cell cap.
    #[must_use]
    pub const fn new(placement: PlacementConfig, max_agents_per_cell: usize) -> Self {
        Self {
            placement,
            max_agents_per_cell,
        }
    }
}

/// Read-only state a placement decision depends on.
#[derive(Clone, Copy, Debug)]
pub struct PlacementContext<'a> {
    /// Arena the position must lie in.
    pub arena: ArenaBounds,
    /// Spatial index used for occupancy and density guards.
    pub grid: &'a SpatialGrid,
    /// Live agents used for the exact distance guard.
    pub agents: &'a AgentView,
}

/// Pure system that searches for valid spawn positions.
#[derive(Clone, Debug)]
pub struct SpawnPositionResolver {
    config: Config,
}

impl SpawnPositionResolver {
    /// Creates a new resolver using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Finds a valid position near `base` or reports that none exists.
    ///
    /// The search is bounded: at most one direct test, `max_search_attempts`
    /// spiral candidates, and the 48 cell centres of the fallback rings.
    pub fn resolve(
        &self,
        base: Vec2,
        context: &PlacementContext<'_>,
    ) -> Result<Vec2, PlacementError> {
        let mut candidates = 0u32;
        for candidate in self.candidates(base, context.grid.cell_size()) {
            candidates += 1;
            if self.is_valid_spawn_position(candidate, context) {
                tracing::trace!(candidates, "spawn position resolved");
                return Ok(candidate);
            }
        }

        Err(PlacementError::Exhausted { base, candidates })
    }

    /// Reports whether `position` passes every placement guard.
    ///
    /// The cell cap and density guards work on the grid, which may lag agent
    /// movement by one rebuild interval; the distance guard scans the exact
    /// positions of the live agents.
    #[must_use]
    pub fn is_valid_spawn_position(&self, position: Vec2, context: &PlacementContext<'_>) -> bool {
        if !context.arena.contains(position) {
            return false;
        }

        let grid = context.grid;
        if grid.agents_in_cell(grid.cell_of(position)) >= self.config.max_agents_per_cell {
            return false;
        }

        let placement = self.config.placement;
        if grid.density_near(position, placement.density_radius) > placement.max_spawn_density {
            return false;
        }

        let min_distance_sq = placement.min_agent_distance * placement.min_agent_distance;
        context
            .agents
            .iter()
            .all(|agent| agent.position.distance_squared(position) >= min_distance_sq)
    }

    /// Every candidate the resolver tests for `base`, in order.
    pub fn candidates(&self, base: Vec2, cell_size: f32) -> impl Iterator<Item = Vec2> {
        let spiral = (1..=self.config.placement.max_search_attempts).map(move |attempt| {
            let step = attempt as f32;
            let radius = step * cell_size * 0.5;
            let angle = step * GOLDEN_ANGLE;
            base + Vec2::from_angle(angle) * radius
        });

        let origin = GridCell::containing(base, cell_size);
        let rings = (1..=FALLBACK_RINGS)
            .flat_map(move |distance| ring(origin, distance).map(move |cell| cell.center(cell_size)));

        std::iter::once(base).chain(spiral).chain(rings)
    }
}

fn ring(origin: GridCell, distance: u32) -> impl Iterator<Item = GridCell> {
    let span = i32::try_from(distance).unwrap_or(i32::MAX);
    (-span..=span)
        .flat_map(move |rows| (-span..=span).map(move |columns| origin.offset(columns, rows)))
        .filter(move |cell| origin.chebyshev_distance(*cell) == distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_enumerate_square_perimeters() {
        let origin = GridCell::new(4, -2);
        assert_eq!(ring(origin, 1).count(), 8);
        assert_eq!(ring(origin, 2).count(), 16);
        assert_eq!(ring(origin, 3).count(), 24);
        assert!(ring(origin, 2).all(|cell| origin.chebyshev_distance(cell) == 2));
        assert!(ring(origin, 1).any(|cell| cell == origin.offset(-1, 1)));
    }

    #[test]
    fn spiral_radius_grows_with_attempts() {
        let resolver = SpawnPositionResolver::new(Config::new(PlacementConfig::default(), 3));
        let base = Vec2::new(1.0, 2.0);
        let spiral: Vec<Vec2> = resolver.candidates(base, 1.5).skip(1).take(10).collect();
        for (index, candidate) in spiral.iter().enumerate() {
            let expected = (index as f32 + 1.0) * 0.75;
            assert!((candidate.distance(base) - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn candidate_count_is_bounded() {
        let resolver = SpawnPositionResolver::new(Config::new(PlacementConfig::default(), 3));
        assert_eq!(resolver.candidates(Vec2::ZERO, 1.5).count(), 1 + 10 + 48);
    }
}
