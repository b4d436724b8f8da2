#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Horde Arena engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to. Systems consume event streams, query immutable
//! snapshots, and respond with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::{
    secs_to_duration, AgentTemplate, AgentTemplates, ArenaConfig, AvoidanceConfig, ConfigError,
    EngineConfig, GridConfig, PlacementConfig, WaveTuning,
};
pub use glam::Vec2;

/// Number of rounds every wave is divided into.
pub const ROUND_COUNT: usize = 5;

/// Unique identifier assigned to an agent by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based number of an escalating wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u32);

impl WaveId {
    /// Creates a new wave identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Number of waves preceding this one, saturating at zero.
    #[must_use]
    pub const fn steps_from_first(&self) -> u32 {
        self.0.saturating_sub(1)
    }
}

/// Tier of a hostile agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    /// Standard fodder.
    Normal,
    /// Tougher variant with boosted stats.
    Elite,
    /// Wave boss.
    Boss,
}

impl AgentKind {
    /// Every kind ordered from weakest to strongest.
    pub const ALL: [AgentKind; 3] = [AgentKind::Normal, AgentKind::Elite, AgentKind::Boss];

    /// Next-lower tier used when no template exists for this kind.
    #[must_use]
    pub const fn fallback(self) -> Option<AgentKind> {
        match self {
            Self::Boss => Some(Self::Elite),
            Self::Elite => Some(Self::Normal),
            Self::Normal => None,
        }
    }
}

/// Integer coordinate of a square cell of the spatial grid.
///
/// Cells are derived by floor-dividing a world position by the grid's cell
/// size, so negative positions map to negative cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    column: i32,
    row: i32,
}

impl GridCell {
    /// Creates a cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Cell containing `position` for a grid of `cell_size` world units.
    #[must_use]
    pub fn containing(position: Vec2, cell_size: f32) -> Self {
        Self {
            column: (position.x / cell_size).floor() as i32,
            row: (position.y / cell_size).floor() as i32,
        }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self {
            column: self.column.saturating_add(columns),
            row: self.row.saturating_add(rows),
        }
    }

    /// World-space centre of the cell.
    #[must_use]
    pub fn center(self, cell_size: f32) -> Vec2 {
        Vec2::new(
            (self.column as f32 + 0.5) * cell_size,
            (self.row as f32 + 0.5) * cell_size,
        )
    }

    /// Computes the Chebyshev (king-move) distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: GridCell) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// Axis-aligned rectangle bounding the playable arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    min: Vec2,
    max: Vec2,
}

impl ArenaBounds {
    /// Creates bounds from two opposite corners.
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Lower-left corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper-right corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Reports whether the position lies inside the arena, edges included.
    #[must_use]
    pub fn contains(&self, position: Vec2) -> bool {
        position.is_finite()
            && position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    /// Clamps the position into the arena.
    #[must_use]
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        position.clamp(self.min, self.max)
    }
}

/// Selection probabilities for each agent kind within a wave.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeProbabilities {
    normal: f32,
    elite: f32,
    boss: f32,
}

impl TypeProbabilities {
    /// Creates a probability table, normalising the entries so they sum to one.
    ///
    /// Negative entries are treated as zero. An all-zero table selects
    /// `Normal` exclusively.
    #[must_use]
    pub fn new(normal: f32, elite: f32, boss: f32) -> Self {
        let normal = normal.max(0.0);
        let elite = elite.max(0.0);
        let boss = boss.max(0.0);
        let total = normal + elite + boss;
        if total <= f32::EPSILON {
            return Self {
                normal: 1.0,
                elite: 0.0,
                boss: 0.0,
            };
        }

        Self {
            normal: normal / total,
            elite: elite / total,
            boss: boss / total,
        }
    }

    /// Probability assigned to the provided kind.
    #[must_use]
    pub const fn get(&self, kind: AgentKind) -> f32 {
        match kind {
            AgentKind::Normal => self.normal,
            AgentKind::Elite => self.elite,
            AgentKind::Boss => self.boss,
        }
    }

    /// Maps a uniform sample in `[0, 1)` onto a kind using cumulative weights.
    #[must_use]
    pub fn pick(&self, sample: f32) -> AgentKind {
        if sample < self.boss {
            AgentKind::Boss
        } else if sample < self.boss + self.elite {
            AgentKind::Elite
        } else {
            AgentKind::Normal
        }
    }
}

/// Immutable description of a single wave's composition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    wave: WaveId,
    total_count: u32,
    probabilities: TypeProbabilities,
    health_multiplier: f32,
    damage_multiplier: f32,
    boss_wave: bool,
}

impl WaveConfig {
    /// Creates a wave configuration.
    #[must_use]
    pub const fn new(
        wave: WaveId,
        total_count: u32,
        probabilities: TypeProbabilities,
        health_multiplier: f32,
        damage_multiplier: f32,
        boss_wave: bool,
    ) -> Self {
        Self {
            wave,
            total_count,
            probabilities,
            health_multiplier,
            damage_multiplier,
            boss_wave,
        }
    }

    /// Wave number the configuration belongs to.
    #[must_use]
    pub const fn wave(&self) -> WaveId {
        self.wave
    }

    /// Number of agents the wave schedules.
    #[must_use]
    pub const fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Per-kind selection probabilities.
    #[must_use]
    pub const fn probabilities(&self) -> TypeProbabilities {
        self.probabilities
    }

    /// Multiplier applied to template health.
    #[must_use]
    pub const fn health_multiplier(&self) -> f32 {
        self.health_multiplier
    }

    /// Multiplier applied to template damage.
    #[must_use]
    pub const fn damage_multiplier(&self) -> f32 {
        self.damage_multiplier
    }

    /// Whether the wave must field a boss.
    #[must_use]
    pub const fn is_boss_wave(&self) -> bool {
        self.boss_wave
    }
}

/// Pacing profile selecting how a wave's agents are spread across rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundProfile {
    /// Most agents arrive early; chosen against strong opposition.
    FrontLoaded,
    /// Even spread.
    Balanced,
    /// Most agents arrive late; chosen against weak opposition.
    BackLoaded,
}

impl RoundProfile {
    /// Share of the wave assigned to each round; the shares sum to one.
    #[must_use]
    pub const fn weights(self) -> [f64; ROUND_COUNT] {
        match self {
            Self::FrontLoaded => [0.35, 0.25, 0.20, 0.12, 0.08],
            Self::Balanced => [0.25, 0.20, 0.20, 0.20, 0.15],
            Self::BackLoaded => [0.10, 0.15, 0.20, 0.25, 0.30],
        }
    }
}

/// Extra requirement attached to a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundGuarantee {
    /// No additional requirement.
    None,
    /// The round opens with the wave's boss.
    Boss,
}

/// Scheduled size and guarantee of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundSpec {
    /// Number of agents scheduled for the round.
    pub count: u32,
    /// Requirement the round must honour.
    pub guarantee: RoundGuarantee,
}

/// Ordered five-round schedule derived from a [`WaveConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundPlan {
    profile: RoundProfile,
    rounds: [RoundSpec; ROUND_COUNT],
}

impl RoundPlan {
    /// Creates a plan from explicit rounds.
    #[must_use]
    pub const fn new(profile: RoundProfile, rounds: [RoundSpec; ROUND_COUNT]) -> Self {
        Self { profile, rounds }
    }

    /// Profile the plan was distributed with.
    #[must_use]
    pub const fn profile(&self) -> RoundProfile {
        self.profile
    }

    /// Rounds in scheduling order.
    #[must_use]
    pub const fn rounds(&self) -> &[RoundSpec; ROUND_COUNT] {
        &self.rounds
    }

    /// Round at the provided index, if any.
    #[must_use]
    pub fn round(&self, index: usize) -> Option<RoundSpec> {
        self.rounds.get(index).copied()
    }

    /// Per-round counts in order.
    #[must_use]
    pub fn counts(&self) -> [u32; ROUND_COUNT] {
        self.rounds.map(|round| round.count)
    }

    /// Sum of all round counts.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.rounds.iter().map(|round| round.count).sum()
    }
}

/// Fully resolved description of an agent the world should create.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    /// Kind of the agent after template fallback.
    pub kind: AgentKind,
    /// Validated world position.
    pub position: Vec2,
    /// Wave that scheduled the agent.
    pub wave: WaveId,
    /// Starting and maximum health.
    pub health: f32,
    /// Damage dealt by the agent.
    pub damage: f32,
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Tier of the agent.
    pub kind: AgentKind,
    /// Wave that spawned the agent.
    pub wave: WaveId,
    /// Authoritative world position.
    pub position: Vec2,
    /// Remaining health.
    pub health: f32,
    /// Health at spawn time.
    pub max_health: f32,
    /// Damage dealt by the agent.
    pub damage: f32,
}

/// Read-only snapshot describing every live agent.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of the provided agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of live agents captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no agent is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Reason a scheduled spawn was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The resolver exhausted every candidate position.
    NoValidPosition,
    /// Neither the requested kind nor any lower tier has a template.
    MissingTemplate,
    /// The world has handed out every agent id.
    IdsExhausted,
}

/// Failure reported by the spawn-position resolver.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum PlacementError {
    /// No candidate around the base point satisfied the placement guards.
    #[error("no valid spawn position near {base} after {candidates} candidates")]
    Exhausted {
        /// Requested base point.
        base: Vec2,
        /// Number of candidate positions that were tested.
        candidates: u32,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Creates an agent and inserts it into the live set and spatial grid.
    SpawnAgent {
        /// Resolved agent description.
        spawn: AgentSpawn,
    },
    /// Updates an agent's authoritative position.
    ///
    /// The spatial grid keeps the previous cell until its next rebuild.
    MoveAgent {
        /// Agent to move.
        agent: AgentId,
        /// New position, clamped into the arena.
        position: Vec2,
    },
    /// Applies damage, killing the agent when its health is exhausted.
    DamageAgent {
        /// Agent receiving damage.
        agent: AgentId,
        /// Amount of health removed.
        amount: f32,
    },
    /// Kills an agent outright.
    KillAgent {
        /// Agent to kill.
        agent: AgentId,
    },
    /// Removes an agent without counting it as a kill.
    DespawnAgent {
        /// Agent to remove.
        agent: AgentId,
    },
    /// Clears the spatial grid and re-inserts every live agent.
    RebuildSpatialGrid,
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent entered the arena.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Tier of the agent.
        kind: AgentKind,
        /// Wave that scheduled the agent.
        wave: WaveId,
        /// Position the agent occupies.
        position: Vec2,
    },
    /// Confirms that an agent died and left the live set and grid.
    AgentDied {
        /// Identifier of the dead agent.
        agent: AgentId,
        /// Tier of the dead agent.
        kind: AgentKind,
        /// Wave that scheduled the agent.
        wave: WaveId,
    },
    /// Confirms that an agent was removed without dying.
    AgentDespawned {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Confirms that the spatial grid reflects current positions.
    SpatialGridRebuilt {
        /// Number of agents indexed.
        agents: usize,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Wave that started.
        wave: WaveId,
        /// Total agents scheduled.
        total: u32,
        /// Pacing profile selected from the opposing power estimate.
        profile: RoundProfile,
    },
    /// Announces that a round of the active wave began.
    RoundStarted {
        /// Wave owning the round.
        wave: WaveId,
        /// Zero-based round index.
        round: usize,
        /// Agents scheduled for the round.
        count: u32,
    },
    /// Reports that a scheduled spawn was dropped.
    SpawnSkipped {
        /// Wave owning the spawn.
        wave: WaveId,
        /// Kind that was requested.
        kind: AgentKind,
        /// Why the spawn was dropped.
        reason: SkipReason,
    },
    /// Every round of the wave has been scheduled.
    WaveSpawnComplete {
        /// Wave that finished spawning.
        wave: WaveId,
    },
    /// Every agent of the wave has been cleared.
    WaveComplete {
        /// Wave that was cleared.
        wave: WaveId,
    },
}
