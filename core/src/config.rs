//! Tuning surface for the spawn and avoidance engine.
//!
//! Every struct deserializes from TOML with all fields optional; omitted
//! fields fall back to the [`Default`] values below. Durations are expressed
//! in seconds so configuration files stay flat key/value tables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AgentKind, ArenaBounds, Vec2};

/// Aggregated configuration for the whole engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Arena bounds and spawn points.
    pub arena: ArenaConfig,
    /// Spatial grid layout.
    pub grid: GridConfig,
    /// Spawn placement guards.
    pub placement: PlacementConfig,
    /// Separation steering.
    pub avoidance: AvoidanceConfig,
    /// Wave composition and pacing.
    pub waves: WaveTuning,
    /// Base stats per agent kind.
    pub templates: AgentTemplates,
    /// Seed feeding every random draw made by the scheduler.
    pub seed: u64,
}

impl EngineConfig {
    /// Rejects settings the engine cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.arena.max.x > self.arena.min.x && self.arena.max.y > self.arena.min.y) {
            return Err(ConfigError::EmptyArena);
        }
        positive("grid.cell_size", self.grid.cell_size)?;
        if self.grid.max_agents_per_cell == 0 {
            return Err(ConfigError::ZeroCellCapacity);
        }
        non_negative("placement.min_agent_distance", self.placement.min_agent_distance)?;
        positive("placement.density_radius", self.placement.density_radius)?;
        non_negative("placement.max_spawn_density", self.placement.max_spawn_density)?;
        non_negative("avoidance.radius", self.avoidance.radius)?;
        non_negative("avoidance.strength", self.avoidance.strength)?;
        if self.avoidance.radius > self.grid.cell_size {
            return Err(ConfigError::AvoidanceRadiusExceedsCell {
                radius: self.avoidance.radius,
                cell_size: self.grid.cell_size,
            });
        }
        for (name, value) in [
            (
                "avoidance.rebuild_interval_secs",
                self.avoidance.rebuild_interval_secs,
            ),
            (
                "waves.min_spawn_interval_secs",
                self.waves.min_spawn_interval_secs,
            ),
            (
                "waves.base_spawn_interval_secs",
                self.waves.base_spawn_interval_secs,
            ),
        ] {
            positive(name, value)?;
            representable(name, value)?;
        }
        non_negative(
            "waves.spawn_interval_decrease_per_wave",
            self.waves.spawn_interval_decrease_per_wave,
        )?;
        non_negative("waves.max_round_wait_secs", self.waves.max_round_wait_secs)?;
        representable("waves.max_round_wait_secs", self.waves.max_round_wait_secs)?;
        for (name, value) in [
            ("waves.elite_chance", self.waves.elite_chance),
            ("waves.elite_chance_per_wave", self.waves.elite_chance_per_wave),
            ("waves.max_elite_chance", self.waves.max_elite_chance),
            ("waves.boss_chance", self.waves.boss_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        positive(
            "waves.power_baseline_attack_rate",
            self.waves.power_baseline_attack_rate,
        )?;
        if self.waves.weak_threshold > self.waves.strong_threshold {
            return Err(ConfigError::InvertedThresholds {
                weak: self.waves.weak_threshold,
                strong: self.waves.strong_threshold,
            });
        }
        for kind in AgentKind::ALL {
            if let Some(template) = self.templates.get(kind) {
                if !(template.base_health > 0.0) {
                    return Err(ConfigError::Template { kind });
                }
            }
        }
        Ok(())
    }
}

/// Reasons an [`EngineConfig`] is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Arena bounds enclose no area.
    #[error("arena bounds must enclose a positive area")]
    EmptyArena,
    /// Grid cells must hold at least one agent.
    #[error("grid.max_agents_per_cell must be at least 1")]
    ZeroCellCapacity,
    /// A setting that must be strictly positive was not.
    #[error("{name} must be positive, got {value}")]
    NotPositive {
        /// Configuration key.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// A setting that must not be negative was.
    #[error("{name} must not be negative, got {value}")]
    Negative {
        /// Configuration key.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// A seconds setting does not fit in a [`Duration`].
    #[error("{name} is out of range for a duration, got {value}")]
    DurationOutOfRange {
        /// Configuration key.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// Neighbour scans only cover adjacent cells, so the avoidance radius
    /// may not exceed the cell size.
    #[error("avoidance.radius ({radius}) exceeds grid.cell_size ({cell_size})")]
    AvoidanceRadiusExceedsCell {
        /// Configured avoidance radius.
        radius: f32,
        /// Configured cell size.
        cell_size: f32,
    },
    /// A probability fell outside `[0, 1]`.
    #[error("{name} must lie in [0, 1], got {value}")]
    Probability {
        /// Configuration key.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// The weak power threshold exceeds the strong one.
    #[error("waves.weak_threshold ({weak}) exceeds waves.strong_threshold ({strong})")]
    InvertedThresholds {
        /// Weak threshold.
        weak: f32,
        /// Strong threshold.
        strong: f32,
    },
    /// A template carries non-positive base health.
    #[error("template for {kind:?} must have positive base health")]
    Template {
        /// Kind of the offending template.
        kind: AgentKind,
    },
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

fn representable(name: &'static str, value: f32) -> Result<(), ConfigError> {
    match Duration::try_from_secs_f32(value) {
        Ok(_) => Ok(()),
        Err(_) => Err(ConfigError::DurationOutOfRange { name, value }),
    }
}

/// Arena extents and the base points waves spawn around.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Lower-left corner of the arena.
    pub min: Vec2,
    /// Upper-right corner of the arena.
    pub max: Vec2,
    /// Requested spawn points; an empty list spawns anywhere in the arena.
    pub spawn_points: Vec<Vec2>,
}

impl ArenaConfig {
    /// Bounds described by the configuration.
    #[must_use]
    pub fn bounds(&self) -> ArenaBounds {
        ArenaBounds::new(self.min, self.max)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            min: Vec2::new(-12.0, -12.0),
            max: Vec2::new(12.0, 12.0),
            spawn_points: vec![
                Vec2::new(-10.0, -10.0),
                Vec2::new(10.0, -10.0),
                Vec2::new(-10.0, 10.0),
                Vec2::new(10.0, 10.0),
            ],
        }
    }
}

/// Spatial grid layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// Maximum agents a cell may hold before spawns into it are rejected.
    pub max_agents_per_cell: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.5,
            max_agents_per_cell: 3,
        }
    }
}

/// Guards applied when validating a spawn position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Minimum Euclidean distance to every live agent.
    pub min_agent_distance: f32,
    /// Number of spiral candidates tried after the direct test.
    pub max_search_attempts: u32,
    /// Radius of the approximate density query.
    pub density_radius: f32,
    /// Maximum agents per square world unit around a candidate.
    pub max_spawn_density: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_agent_distance: 0.8,
            max_search_attempts: 10,
            density_radius: 1.5,
            max_spawn_density: 1.2,
        }
    }
}

/// Separation steering parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Distance under which neighbours repel each other.
    pub radius: f32,
    /// Force magnitude at zero distance.
    pub strength: f32,
    /// Seconds between grid rebuilds and force recomputation.
    pub rebuild_interval_secs: f32,
}

impl AvoidanceConfig {
    /// Interval between grid rebuilds.
    #[must_use]
    pub fn rebuild_interval(&self) -> Duration {
        secs_to_duration(self.rebuild_interval_secs)
    }
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            strength: 2.0,
            rebuild_interval_secs: 0.5,
        }
    }
}

/// Wave composition, stat targets, and pacing knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Agents in wave one.
    pub base_count: u32,
    /// Agents added per subsequent wave.
    pub count_per_wave: u32,
    /// Every n-th wave is a boss wave; zero disables boss waves.
    pub boss_wave_interval: u32,
    /// Delay between spawns within a round in wave one.
    pub base_spawn_interval_secs: f32,
    /// Lower bound of the spawn delay.
    pub min_spawn_interval_secs: f32,
    /// Seconds removed from the spawn delay per wave.
    pub spawn_interval_decrease_per_wave: f32,
    /// Longest wait between rounds while agents remain alive.
    pub max_round_wait_secs: f32,
    /// Elite probability in wave one.
    pub elite_chance: f32,
    /// Elite probability added per wave.
    pub elite_chance_per_wave: f32,
    /// Elite probability ceiling.
    pub max_elite_chance: f32,
    /// Probability of extra bosses during boss waves.
    pub boss_chance: f32,
    /// Health factor applied to elites on top of the wave multiplier.
    pub elite_health_multiplier: f32,
    /// Damage factor applied to elites on top of the wave multiplier.
    pub elite_damage_multiplier: f32,
    /// Health factor applied to bosses on top of the wave multiplier.
    pub boss_health_multiplier: f32,
    /// Damage factor applied to bosses on top of the wave multiplier.
    pub boss_damage_multiplier: f32,
    /// Target normal-agent health in wave one.
    pub target_health_base: f32,
    /// Per-wave growth factor of the health target.
    pub target_health_growth: f32,
    /// Target normal-agent damage in wave one.
    pub target_damage_base: f32,
    /// Per-wave growth factor of the damage target.
    pub target_damage_growth: f32,
    /// Opposing attack rate considered even for wave one.
    pub power_baseline_attack_rate: f32,
    /// Fractional growth of the expected attack rate per wave.
    pub power_growth_per_wave: f32,
    /// Power ratio under which waves are back-loaded.
    pub weak_threshold: f32,
    /// Power ratio above which waves are front-loaded.
    pub strong_threshold: f32,
}

impl WaveTuning {
    /// Longest wait between rounds.
    #[must_use]
    pub fn max_round_wait(&self) -> Duration {
        secs_to_duration(self.max_round_wait_secs)
    }

    /// Per-kind health factor applied on top of the wave multiplier.
    #[must_use]
    pub const fn health_factor(&self, kind: AgentKind) -> f32 {
        match kind {
            AgentKind::Normal => 1.0,
            AgentKind::Elite => self.elite_health_multiplier,
            AgentKind::Boss => self.boss_health_multiplier,
        }
    }

    /// Per-kind damage factor applied on top of the wave multiplier.
    #[must_use]
    pub const fn damage_factor(&self, kind: AgentKind) -> f32 {
        match kind {
            AgentKind::Normal => 1.0,
            AgentKind::Elite => self.elite_damage_multiplier,
            AgentKind::Boss => self.boss_damage_multiplier,
        }
    }
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_count: 10,
            count_per_wave: 3,
            boss_wave_interval: 5,
            base_spawn_interval_secs: 0.5,
            min_spawn_interval_secs: 0.1,
            spawn_interval_decrease_per_wave: 0.03,
            max_round_wait_secs: 3.0,
            elite_chance: 0.1,
            elite_chance_per_wave: 0.02,
            max_elite_chance: 0.4,
            boss_chance: 0.0,
            elite_health_multiplier: 2.5,
            elite_damage_multiplier: 1.5,
            boss_health_multiplier: 10.0,
            boss_damage_multiplier: 3.0,
            target_health_base: 100.0,
            target_health_growth: 1.12,
            target_damage_base: 10.0,
            target_damage_growth: 1.08,
            power_baseline_attack_rate: 1.0,
            power_growth_per_wave: 0.15,
            weak_threshold: 0.8,
            strong_threshold: 1.25,
        }
    }
}

/// Base stats of one agent kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    /// Health before multipliers.
    pub base_health: f32,
    /// Damage before multipliers.
    pub base_damage: f32,
}

impl AgentTemplate {
    /// Creates a template.
    #[must_use]
    pub const fn new(base_health: f32, base_damage: f32) -> Self {
        Self {
            base_health,
            base_damage,
        }
    }
}

/// Optional template per agent kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTemplates {
    /// Template for normal agents.
    pub normal: Option<AgentTemplate>,
    /// Template for elites.
    pub elite: Option<AgentTemplate>,
    /// Template for bosses.
    pub boss: Option<AgentTemplate>,
}

impl AgentTemplates {
    /// Template configured for exactly this kind.
    #[must_use]
    pub const fn get(&self, kind: AgentKind) -> Option<AgentTemplate> {
        match kind {
            AgentKind::Normal => self.normal,
            AgentKind::Elite => self.elite,
            AgentKind::Boss => self.boss,
        }
    }

    /// Walks the fallback chain from `kind` down to the first configured tier.
    #[must_use]
    pub fn resolve(&self, kind: AgentKind) -> Option<(AgentKind, AgentTemplate)> {
        let mut current = Some(kind);
        while let Some(candidate) = current {
            if let Some(template) = self.get(candidate) {
                return Some((candidate, template));
            }
            current = candidate.fallback();
        }
        None
    }
}

impl Default for AgentTemplates {
    fn default() -> Self {
        Self {
            normal: Some(AgentTemplate::new(100.0, 10.0)),
            elite: Some(AgentTemplate::new(120.0, 12.0)),
            boss: Some(AgentTemplate::new(400.0, 25.0)),
        }
    }
}

/// Converts a seconds setting into a [`Duration`].
///
/// Zero, negative and NaN inputs give [`Duration::ZERO`]; values too large
/// for a `Duration` saturate at [`Duration::MAX`].
#[must_use]
pub fn secs_to_duration(secs: f32) -> Duration {
    if !(secs > 0.0) {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_cell_size_is_rejected() {
        let mut config = EngineConfig::default();
        config.grid.cell_size = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "grid.cell_size",
                ..
            })
        ));
    }

    #[test]
    fn inverted_arena_is_rejected() {
        let mut config = EngineConfig::default();
        config.arena.max = config.arena.min;
        assert_eq!(config.validate(), Err(ConfigError::EmptyArena));
    }

    #[test]
    fn template_fallback_walks_down_tiers() {
        let templates = AgentTemplates {
            normal: Some(AgentTemplate::new(10.0, 1.0)),
            elite: None,
            boss: None,
        };
        let resolved = templates.resolve(AgentKind::Boss).map(|(kind, _)| kind);
        assert_eq!(resolved, Some(AgentKind::Normal));

        let empty = AgentTemplates {
            normal: None,
            elite: None,
            boss: None,
        };
        assert!(empty.resolve(AgentKind::Boss).is_none());
    }

    #[test]
    fn durations_convert_from_seconds() {
        let tuning = WaveTuning::default();
        assert_eq!(tuning.max_round_wait(), Duration::from_secs(3));
        let avoidance = AvoidanceConfig {
            rebuild_interval_secs: -1.0,
            ..AvoidanceConfig::default()
        };
        assert_eq!(avoidance.rebuild_interval(), Duration::ZERO);
        assert_eq!(secs_to_duration(f32::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(1e20), Duration::MAX);
    }

    #[test]
    fn huge_durations_are_rejected() {
        let mut config = EngineConfig::default();
        config.avoidance.rebuild_interval_secs = 1e20;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DurationOutOfRange {
                name: "avoidance.rebuild_interval_secs",
                value: 1e20,
            })
        );

        let mut config = EngineConfig::default();
        config.waves.max_round_wait_secs = 1e20;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DurationOutOfRange {
                name: "waves.max_round_wait_secs",
                ..
            })
        ));

        let mut config = EngineConfig::default();
        config.waves.base_spawn_interval_secs = f32::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DurationOutOfRange {
                name: "waves.base_spawn_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn avoidance_radius_is_bounded_by_cell_size() {
        let mut config = EngineConfig::default();
        config.avoidance.radius = 3000.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::AvoidanceRadiusExceedsCell {
                radius: 3000.0,
                cell_size: 1.5,
            })
        );

        config.avoidance.radius = config.grid.cell_size;
        assert_eq!(config.validate(), Ok(()));
    }
}
