//! Difficulty curves that size and scale a wave.

use horde_core::{
    AgentKind, AgentTemplates, TypeProbabilities, WaveConfig, WaveId, WaveTuning,
};

/// Source of the per-wave size and target stats.
///
/// The scheduler only depends on this trait, so campaigns can plug in
/// authored curves without touching the round logic.
pub trait WaveFormula {
    /// Number of agents scheduled for the wave.
    fn total_count(&self, wave: WaveId) -> u32;

    /// Health a normal agent should reach on the wave.
    fn target_health(&self, wave: WaveId) -> f32;

    /// Damage a normal agent should reach on the wave.
    fn target_damage(&self, wave: WaveId) -> f32;
}

/// Linear count growth with exponential stat growth, driven by [`WaveTuning`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StandardFormula {
    tuning: WaveTuning,
}

impl StandardFormula {
    /// Creates a formula over the provided tuning.
    #[must_use]
    pub const fn new(tuning: WaveTuning) -> Self {
        Self { tuning }
    }
}

impl WaveFormula for StandardFormula {
    fn total_count(&self, wave: WaveId) -> u32 {
        self.tuning.base_count.saturating_add(
            self.tuning
                .count_per_wave
                .saturating_mul(wave.steps_from_first()),
        )
    }

    fn target_health(&self, wave: WaveId) -> f32 {
        self.tuning.target_health_base * growth(self.tuning.target_health_growth, wave)
    }

    fn target_damage(&self, wave: WaveId) -> f32 {
        self.tuning.target_damage_base * growth(self.tuning.target_damage_growth, wave)
    }
}

fn growth(rate: f32, wave: WaveId) -> f32 {
    let steps = i32::try_from(wave.steps_from_first()).unwrap_or(i32::MAX);
    rate.powi(steps)
}

/// Reports whether the wave is scheduled to field a boss.
#[must_use]
pub fn is_boss_wave(wave: WaveId, tuning: &WaveTuning) -> bool {
    tuning.boss_wave_interval > 0
        && wave.get() > 0
        && wave.get() % tuning.boss_wave_interval == 0
}

/// Builds the immutable configuration for a wave.
///
/// Stat multipliers scale the normal template onto the formula's targets.
/// Without a usable normal template the multipliers stay at one.
#[must_use]
pub fn generate_wave_config<F>(
    wave: WaveId,
    formula: &F,
    tuning: &WaveTuning,
    templates: &AgentTemplates,
) -> WaveConfig
where
    F: WaveFormula + ?Sized,
{
    let boss_wave = is_boss_wave(wave, tuning);
    let steps = wave.steps_from_first() as f32;
    let elite = (tuning.elite_chance + tuning.elite_chance_per_wave * steps)
        .min(tuning.max_elite_chance)
        .max(0.0);
    let boss = if boss_wave {
        tuning.boss_chance.max(0.0)
    } else {
        0.0
    };
    let normal = (1.0 - elite - boss).max(0.0);

    let base = templates.resolve(AgentKind::Normal).map(|(_, template)| template);
    let health_multiplier = ratio(
        formula.target_health(wave),
        base.map(|template| template.base_health),
    );
    let damage_multiplier = ratio(
        formula.target_damage(wave),
        base.map(|template| template.base_damage),
    );

    WaveConfig::new(
        wave,
        formula.total_count(wave),
        TypeProbabilities::new(normal, elite, boss),
        health_multiplier,
        damage_multiplier,
        boss_wave,
    )
}

fn ratio(target: f32, base: Option<f32>) -> f32 {
    match base {
        Some(base) if base > 0.0 && target.is_finite() => target / base,
        _ => 1.0,
    }
}
