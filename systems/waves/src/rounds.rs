//! Splits a wave into its five rounds.

use horde_core::{
    RoundGuarantee, RoundPlan, RoundProfile, RoundSpec, WaveConfig, WaveId, WaveTuning,
    ROUND_COUNT,
};

// Absorbs float noise such as 25 * 0.2 = 5.000000000000001.
const SHARE_EPSILON: f64 = 1e-9;

/// Chooses the pacing profile from the opposing side's attack rate.
///
/// The rate is compared with the baseline expected on this wave; weak
/// opposition gets a back-loaded wave, strong opposition a front-loaded one.
#[must_use]
pub fn classify_power(attack_rate: f32, wave: WaveId, tuning: &WaveTuning) -> RoundProfile {
    let steps = wave.steps_from_first() as f32;
    let expected =
        tuning.power_baseline_attack_rate * (1.0 + tuning.power_growth_per_wave * steps);
    let ratio = attack_rate / expected;
    if !ratio.is_finite() {
        return RoundProfile::Balanced;
    }

    if ratio < tuning.weak_threshold {
        RoundProfile::BackLoaded
    } else if ratio > tuning.strong_threshold {
        RoundProfile::FrontLoaded
    } else {
        RoundProfile::Balanced
    }
}

/// Distributes `total` agents over the rounds of `profile`.
///
/// Every round but the last takes the ceiling of its share, capped by what is
/// left; the last round takes the remainder, so the counts always sum to
/// `total`.
#[must_use]
pub fn distribute_rounds(total: u32, profile: RoundProfile) -> [u32; ROUND_COUNT] {
    let weights = profile.weights();
    let mut counts = [0; ROUND_COUNT];
    let mut remaining = total;

    for (count, weight) in counts.iter_mut().zip(weights).take(ROUND_COUNT - 1) {
        let share = (f64::from(total) * weight - SHARE_EPSILON).ceil().max(0.0);
        let share = if share >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            share as u32
        };
        *count = share.min(remaining);
        remaining -= *count;
    }
    counts[ROUND_COUNT - 1] = remaining;

    counts
}

/// Builds the round plan for a wave. Boss waves open with the boss.
#[must_use]
pub fn plan_rounds(config: &WaveConfig, profile: RoundProfile) -> RoundPlan {
    let counts = distribute_rounds(config.total_count(), profile);
    let mut rounds = counts.map(|count| RoundSpec {
        count,
        guarantee: RoundGuarantee::None,
    });
    if config.is_boss_wave() {
        rounds[0].guarantee = RoundGuarantee::Boss;
    }

    RoundPlan::new(profile, rounds)
}
