//! Scenario files for the headless driver.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use horde_core::{secs_to_duration, EngineConfig, Vec2};
use serde::{Deserialize, Serialize};

/// Engine configuration plus the settings of the scripted opposition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) engine: EngineConfig,
    pub(crate) simulation: SimulationConfig,
}

/// Settings of the headless loop and its single turret.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SimulationConfig {
    pub(crate) waves: u32,
    pub(crate) tick_rate_hz: u32,
    pub(crate) rest_secs: f32,
    pub(crate) max_secs: f32,
    pub(crate) agent_speed: f32,
    pub(crate) avoidance_weight: f32,
    pub(crate) hold_distance: f32,
    pub(crate) turret: TurretConfig,
}

impl SimulationConfig {
    pub(crate) fn tick(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    pub(crate) fn rest(&self) -> Duration {
        secs_to_duration(self.rest_secs)
    }

    pub(crate) fn max_duration(&self) -> Duration {
        secs_to_duration(self.max_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 {
            bail!("simulation.tick_rate_hz must be at least 1");
        }
        for (name, value) in [
            ("simulation.rest_secs", self.rest_secs),
            ("simulation.max_secs", self.max_secs),
            ("simulation.agent_speed", self.agent_speed),
            ("simulation.avoidance_weight", self.avoidance_weight),
            ("simulation.hold_distance", self.hold_distance),
            ("simulation.turret.range", self.turret.range),
            ("simulation.turret.damage", self.turret.damage),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{name} must be a non-negative number, got {value}");
            }
        }
        if !(self.turret.attack_rate.is_finite() && self.turret.attack_rate > 0.0) {
            bail!(
                "simulation.turret.attack_rate must be positive, got {}",
                self.turret.attack_rate
            );
        }
        for (name, secs) in [
            ("simulation.rest_secs", self.rest_secs),
            ("simulation.max_secs", self.max_secs),
            (
                "simulation.turret.attack_rate",
                self.turret.attack_rate.recip(),
            ),
        ] {
            if Duration::try_from_secs_f32(secs).is_err() {
                bail!("{name} is out of range for a duration");
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            waves: 5,
            tick_rate_hz: 20,
            rest_secs: 2.0,
            max_secs: 900.0,
            agent_speed: 1.5,
            avoidance_weight: 0.75,
            hold_distance: 1.5,
            turret: TurretConfig::default(),
        }
    }
}

/// Stationary turret that damages the nearest agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TurretConfig {
    pub(crate) position: Vec2,
    pub(crate) range: f32,
    pub(crate) damage: f32,
    pub(crate) attack_rate: f32,
}

impl TurretConfig {
    pub(crate) fn attack_interval(&self) -> Duration {
        secs_to_duration(self.attack_rate.recip())
    }
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            range: 9.0,
            damage: 35.0,
            attack_rate: 3.0,
        }
    }
}

/// Reads and validates the scenario stored at `path`.
pub(crate) fn load(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid scenario {}", path.display()))
}

/// Parses and validates scenario TOML.
pub(crate) fn parse(contents: &str) -> Result<Scenario> {
    let scenario: Scenario =
        toml::from_str(contents).context("failed to parse scenario toml contents")?;
    scenario.engine.validate()?;
    scenario.simulation.validate()?;
    Ok(scenario)
}
