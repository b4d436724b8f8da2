//! Uniform bucket index over world-space agent positions.

use std::collections::{BTreeSet, HashMap};

use horde_core::{AgentId, GridCell, Vec2};

/// Smallest radius accepted by [`SpatialGrid::density_near`].
pub const MIN_DENSITY_RADIUS: f32 = 1e-3;

/// Maps grid cells to the agents last inserted at positions inside them.
///
/// The grid is a cache of agent positions: it is refreshed wholesale by
/// [`SpatialGrid::rebuild`] rather than on every movement, so an agent stays in
/// the cell of the position it had when it was last inserted.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<GridCell, BTreeSet<AgentId>>,
    locations: HashMap<AgentId, GridCell>,
}

impl SpatialGrid {
    /// Creates an empty grid with square cells of `cell_size` world units.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            cells: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Side length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing the provided world position.
    #[must_use]
    pub fn cell_of(&self, position: Vec2) -> GridCell {
        GridCell::containing(position, self.cell_size)
    }

    /// Records `agent` in the cell containing `position`.
    ///
    /// Inserting an agent into the cell it already occupies is a no-op; an
    /// agent recorded elsewhere is moved so it never appears twice.
    pub fn insert(&mut self, agent: AgentId, position: Vec2) {
        let cell = self.cell_of(position);
        match self.locations.get(&agent).copied() {
            Some(current) if current == cell => return,
            Some(_) => self.remove(agent),
            None => {}
        }

        let _ = self.cells.entry(cell).or_default().insert(agent);
        let _ = self.locations.insert(agent, cell);
    }

    /// Erases `agent` from its last-known cell. Unknown agents are ignored.
    pub fn remove(&mut self, agent: AgentId) {
        let Some(cell) = self.locations.remove(&agent) else {
            return;
        };

        if let Some(members) = self.cells.get_mut(&cell) {
            let _ = members.remove(&agent);
            if members.is_empty() {
                let _ = self.cells.remove(&cell);
            }
        }
    }

    /// Clears every cell and re-inserts the provided live agents.
    pub fn rebuild<I>(&mut self, live_agents: I)
    where
        I: IntoIterator<Item = (AgentId, Vec2)>,
    {
        self.cells.clear();
        self.locations.clear();
        for (agent, position) in live_agents {
            self.insert(agent, position);
        }
    }

    /// Enumerates agents in the square block of cells within `radius_in_cells`
    /// of `cell`, row by row and in identifier order within a cell.
    pub fn neighbors(
        &self,
        cell: GridCell,
        radius_in_cells: u32,
    ) -> impl Iterator<Item = AgentId> + '_ {
        let radius = i32::try_from(radius_in_cells).unwrap_or(i32::MAX);
        (-radius..=radius)
            .flat_map(move |rows| (-radius..=radius).map(move |columns| cell.offset(columns, rows)))
            .filter_map(move |neighbour| self.cells.get(&neighbour))
            .flat_map(|members| members.iter().copied())
    }

    /// Number of agents recorded in `cell`.
    #[must_use]
    pub fn agents_in_cell(&self, cell: GridCell) -> usize {
        self.cells.get(&cell).map_or(0, BTreeSet::len)
    }

    /// Approximate agents per square unit around `position`.
    ///
    /// Counts every agent in the cells overlapping the circle's bounding
    /// square and divides by the circle's area, so the result is a cell-level
    /// approximation rather than exact circular membership.
    #[must_use]
    pub fn density_near(&self, position: Vec2, radius: f32) -> f32 {
        let radius = if radius.is_finite() {
            radius.max(MIN_DENSITY_RADIUS)
        } else {
            MIN_DENSITY_RADIUS
        };
        let low = self.cell_of(position - Vec2::splat(radius));
        let high = self.cell_of(position + Vec2::splat(radius));

        let mut count = 0usize;
        for row in low.row()..=high.row() {
            for column in low.column()..=high.column() {
                count += self.agents_in_cell(GridCell::new(column, row));
            }
        }

        count as f32 / (std::f32::consts::PI * radius * radius)
    }

    /// Cell the agent was last inserted into.
    #[must_use]
    pub fn cell_of_agent(&self, agent: AgentId) -> Option<GridCell> {
        self.locations.get(&agent).copied()
    }

    /// Reports whether the agent is indexed.
    #[must_use]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.locations.contains_key(&agent)
    }

    /// Number of indexed agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Reports whether no agent is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Iterates over occupied cells and their member counts.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (GridCell, usize)> + '_ {
        self.cells.iter().map(|(cell, members)| (*cell, members.len()))
    }
}
