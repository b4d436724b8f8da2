#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave scheduler that releases each wave's agents over five paced rounds.
//!
//! The scheduler is an explicit state machine driven by
//! [`Event::TimeAdvanced`]. Its entire progress lives in a serializable
//! [`SchedulerState`], and every random draw is derived from the configured
//! seed, the wave and the spawn index, so a saved state replays exactly.

use std::time::Duration;

use horde_core::{
    secs_to_duration, AgentKind, AgentSpawn, AgentTemplates, AgentView, ArenaBounds, Command,
    Event, RoundGuarantee, RoundPlan, RoundProfile, RoundSpec, SkipReason, Vec2, WaveConfig,
    WaveId, WaveTuning, ROUND_COUNT,
};
use horde_system_placement::{PlacementContext, SpawnPositionResolver};
use horde_world::SpatialGrid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod formula;
pub mod rounds;

pub use formula::{generate_wave_config, is_boss_wave, StandardFormula, WaveFormula};
pub use rounds::{classify_power, distribute_rounds, plan_rounds};

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    tuning: WaveTuning,
    templates: AgentTemplates,
    seed: u64,
}

impl Config {
    /// Creates a configuration from wave tuning, agent templates and the RNG seed.
    #[must_use]
    pub const fn new(tuning: WaveTuning, templates: AgentTemplates, seed: u64) -> Self {
        Self {
            tuning,
            templates,
            seed,
        }
    }
}

/// Read-only world state a scheduling step depends on.
#[derive(Clone, Copy, Debug)]
pub struct SpawnContext<'a> {
    /// Arena bounds, used when no spawn point is configured.
    pub arena: ArenaBounds,
    /// Configured spawn points.
    pub spawn_points: &'a [Vec2],
    /// Spatial index handed to the resolver.
    pub grid: &'a SpatialGrid,
    /// Live agents; also decides when rounds and waves clear.
    pub agents: &'a AgentView,
}

/// Coarse lifecycle of the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// No wave is active.
    #[default]
    Idle,
    /// Rounds of the active wave are being released.
    Spawning,
    /// Every agent was scheduled; waiting for the arena to clear.
    WaitingForClear,
}

/// Position inside the active round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStage {
    /// Agents of the round are being released.
    Spawning,
    /// The round is done; waiting for the arena to clear or the wait to expire.
    Waiting {
        /// Time spent waiting so far.
        elapsed: Duration,
    },
}

/// Progress of the wave currently owned by the scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveWave {
    config: WaveConfig,
    plan: RoundPlan,
    spawn_interval: Duration,
    round: usize,
    stage: RoundStage,
    spawn_clock: Duration,
    processed_in_round: u32,
    remaining: u32,
    spawned: u32,
    skipped: u32,
    spawn_index: u32,
    boss_satisfied: bool,
    announced: bool,
}

impl ActiveWave {
    fn new(config: WaveConfig, plan: RoundPlan, spawn_interval: Duration) -> Self {
        Self {
            config,
            plan,
            spawn_interval,
            round: 0,
            stage: RoundStage::Spawning,
            spawn_clock: spawn_interval,
            processed_in_round: 0,
            remaining: plan.total(),
            spawned: 0,
            skipped: 0,
            spawn_index: 0,
            boss_satisfied: false,
            announced: false,
        }
    }

    /// Configuration of the wave.
    #[must_use]
    pub const fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Round plan of the wave.
    #[must_use]
    pub const fn plan(&self) -> &RoundPlan {
        &self.plan
    }

    /// Zero-based index of the current round.
    #[must_use]
    pub const fn round(&self) -> usize {
        self.round
    }

    /// Stage of the current round.
    #[must_use]
    pub const fn stage(&self) -> RoundStage {
        self.stage
    }

    /// Scheduled spawns not yet attempted.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spawns handed to the world.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Spawns dropped for lack of a position or template.
    #[must_use]
    pub const fn skipped(&self) -> u32 {
        self.skipped
    }

    fn current_round(&self) -> RoundSpec {
        self.plan.round(self.round).unwrap_or(RoundSpec {
            count: 0,
            guarantee: RoundGuarantee::None,
        })
    }

    fn boss_pending(&self) -> bool {
        !self.boss_satisfied
            && self
                .plan
                .rounds()
                .iter()
                .take(self.round + 1)
                .any(|round| round.guarantee == RoundGuarantee::Boss)
    }

    fn advance(&mut self, elapsed: Duration) {
        match &mut self.stage {
            RoundStage::Spawning => self.spawn_clock = self.spawn_clock.saturating_add(elapsed),
            RoundStage::Waiting { elapsed: waited } => *waited = waited.saturating_add(elapsed),
        }
    }

    fn announce(&mut self, out_events: &mut Vec<Event>) {
        self.announced = true;
        let round = self.current_round();
        out_events.push(Event::WaveStarted {
            wave: self.config.wave(),
            total: self.plan.total(),
            profile: self.plan.profile(),
        });
        out_events.push(Event::RoundStarted {
            wave: self.config.wave(),
            round: self.round,
            count: round.count,
        });
    }

    fn begin_round(&mut self, round: usize, out_events: &mut Vec<Event>) {
        self.round = round;
        self.stage = RoundStage::Spawning;
        self.spawn_clock = self.spawn_interval;
        self.processed_in_round = 0;

        let count = self.current_round().count;
        tracing::debug!(wave = self.config.wave().get(), round, count, "round started");
        out_events.push(Event::RoundStarted {
            wave: self.config.wave(),
            round,
            count,
        });
    }

    fn spawn_next(
        &mut self,
        config: &Config,
        resolver: &SpawnPositionResolver,
        context: &SpawnContext<'_>,
        out: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let wave = self.config.wave();
        let mut rng = ChaCha8Rng::seed_from_u64(derive_spawn_seed(
            config.seed,
            wave,
            self.spawn_index,
        ));
        self.spawn_index = self.spawn_index.wrapping_add(1);
        self.processed_in_round += 1;
        self.remaining = self.remaining.saturating_sub(1);

        let forced = self.boss_pending();
        let requested = if forced {
            AgentKind::Boss
        } else {
            self.config.probabilities().pick(rng.gen())
        };

        let Some((kind, template)) = config.templates.resolve(requested) else {
            tracing::warn!(
                wave = wave.get(),
                kind = ?requested,
                "no template configured; spawn skipped"
            );
            self.skip(requested, SkipReason::MissingTemplate, out_events);
            return false;
        };
        if forced && kind != AgentKind::Boss {
            tracing::debug!(wave = wave.get(), "no boss template; boss guarantee waived");
            self.boss_satisfied = true;
        }

        let base = spawn_base(&mut rng, context);
        let placement = PlacementContext {
            arena: context.arena,
            grid: context.grid,
            agents: context.agents,
        };
        match resolver.resolve(base, &placement) {
            Ok(position) => {
                if kind == AgentKind::Boss {
                    self.boss_satisfied = true;
                }
                self.spawned += 1;
                out.push(Command::SpawnAgent {
                    spawn: AgentSpawn {
                        kind,
                        position,
                        wave,
                        health: template.base_health
                            * self.config.health_multiplier()
                            * config.tuning.health_factor(kind),
                        damage: template.base_damage
                            * self.config.damage_multiplier()
                            * config.tuning.damage_factor(kind),
                    },
                });
                true
            }
            Err(error) => {
                tracing::warn!(wave = wave.get(), kind = ?kind, %error, "spawn skipped");
                self.skip(kind, SkipReason::NoValidPosition, out_events);
                false
            }
        }
    }

    fn skip(&mut self, kind: AgentKind, reason: SkipReason, out_events: &mut Vec<Event>) {
        self.skipped += 1;
        out_events.push(Event::SpawnSkipped {
            wave: self.config.wave(),
            kind,
            reason,
        });
    }
}

/// Complete, serializable progress of the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    phase: WavePhase,
    paused: bool,
    active: Option<ActiveWave>,
}

impl SchedulerState {
    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Whether spawning is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Wave currently owned by the scheduler, if any.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveWave> {
        self.active.as_ref()
    }
}

/// Pure system that turns wave requests into spawn commands.
#[derive(Debug)]
pub struct WaveScheduler<F = StandardFormula> {
    config: Config,
    formula: F,
    resolver: SpawnPositionResolver,
    state: SchedulerState,
    opposing_attack_rate: Option<f32>,
}

impl WaveScheduler<StandardFormula> {
    /// Creates an idle scheduler using the standard difficulty curves.
    #[must_use]
    pub fn new(config: Config, resolver: SpawnPositionResolver) -> Self {
        let formula = StandardFormula::new(config.tuning);
        Self::with_formula(config, resolver, formula)
    }
}

impl<F: WaveFormula> WaveScheduler<F> {
    /// Creates an idle scheduler using a custom difficulty formula.
    #[must_use]
    pub fn with_formula(config: Config, resolver: SpawnPositionResolver, formula: F) -> Self {
        Self {
            config,
            formula,
            resolver,
            state: SchedulerState::default(),
            opposing_attack_rate: None,
        }
    }

    /// Configuration the scheduler would use for `wave`.
    #[must_use]
    pub fn generate_wave_config(&self, wave: WaveId) -> WaveConfig {
        generate_wave_config(
            wave,
            &self.formula,
            &self.config.tuning,
            &self.config.templates,
        )
    }

    /// Pacing profile the scheduler would use for `wave`.
    ///
    /// Without an attack-rate estimate every wave is balanced.
    #[must_use]
    pub fn round_profile(&self, wave: WaveId) -> RoundProfile {
        self.opposing_attack_rate
            .map_or(RoundProfile::Balanced, |rate| {
                classify_power(rate, wave, &self.config.tuning)
            })
    }

    /// Records the opposing side's attack rate used to pick later profiles.
    ///
    /// Negative or non-finite rates clear the estimate.
    pub fn set_opposing_attack_rate(&mut self, rate: f32) {
        self.opposing_attack_rate = (rate.is_finite() && rate >= 0.0).then_some(rate);
    }

    /// Starts scheduling `wave`.
    ///
    /// Returns `false` without side effects while another wave is still
    /// spawning. A wave still waiting to clear is superseded and never
    /// reports completion.
    pub fn spawn_wave(&mut self, wave: WaveId) -> bool {
        match (&self.state.phase, &self.state.active) {
            (WavePhase::Spawning, _) => {
                tracing::debug!(requested = wave.get(), "wave already spawning; request ignored");
                return false;
            }
            (WavePhase::WaitingForClear, Some(previous)) => {
                tracing::warn!(
                    previous = previous.config.wave().get(),
                    next = wave.get(),
                    "wave superseded before clearing"
                );
            }
            _ => {}
        }

        let config = self.generate_wave_config(wave);
        let plan = plan_rounds(&config, self.round_profile(wave));
        let interval = spawn_interval(&self.config.tuning, wave);
        tracing::info!(
            wave = wave.get(),
            total = plan.total(),
            profile = ?plan.profile(),
            boss = config.is_boss_wave(),
            "wave scheduled"
        );

        self.state.active = Some(ActiveWave::new(config, plan, interval));
        self.state.phase = WavePhase::Spawning;
        true
    }

    /// Freezes the spawn loop and its clocks.
    pub fn pause(&mut self) {
        if !self.state.paused {
            tracing::debug!("spawning paused");
        }
        self.state.paused = true;
    }

    /// Continues a paused spawn loop where it stopped.
    pub fn resume(&mut self) {
        if self.state.paused {
            tracing::debug!("spawning resumed");
        }
        self.state.paused = false;
    }

    /// Whether spawning is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.state.phase
    }

    /// Complete scheduler progress.
    #[must_use]
    pub const fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Replaces the scheduler progress, typically with a saved state.
    pub fn restore(&mut self, state: SchedulerState) {
        self.state = state;
    }

    /// Consumes world events and advances the state machine.
    ///
    /// At most one spawn command is emitted per call; the caller re-invokes
    /// the scheduler with the resulting events so each placement sees the
    /// previously spawned agent.
    pub fn handle(
        &mut self,
        events: &[Event],
        context: &SpawnContext<'_>,
        out: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let elapsed = events.iter().fold(Duration::ZERO, |total, event| match event {
            Event::TimeAdvanced { dt } => total.saturating_add(*dt),
            _ => total,
        });

        if self.state.phase == WavePhase::Spawning {
            self.drive(elapsed, context, out, out_events);
        }
        if self.state.phase == WavePhase::WaitingForClear {
            self.poll_clear(context, out_events);
        }
    }

    fn drive(
        &mut self,
        elapsed: Duration,
        context: &SpawnContext<'_>,
        out: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(active) = self.state.active.as_mut() else {
            self.state.phase = WavePhase::Idle;
            return;
        };
        if !active.announced {
            active.announce(out_events);
        }
        if self.state.paused {
            return;
        }

        active.advance(elapsed);
        loop {
            match active.stage {
                RoundStage::Spawning => {
                    if active.processed_in_round >= active.current_round().count {
                        if active.round + 1 >= ROUND_COUNT {
                            tracing::info!(
                                wave = active.config.wave().get(),
                                spawned = active.spawned,
                                skipped = active.skipped,
                                "wave finished spawning"
                            );
                            out_events.push(Event::WaveSpawnComplete {
                                wave: active.config.wave(),
                            });
                            self.state.phase = WavePhase::WaitingForClear;
                            return;
                        }
                        active.stage = RoundStage::Waiting {
                            elapsed: Duration::ZERO,
                        };
                        continue;
                    }

                    if active.spawn_clock < active.spawn_interval {
                        return;
                    }
                    active.spawn_clock -= active.spawn_interval;
                    if active.spawn_next(&self.config, &self.resolver, context, out, out_events) {
                        return;
                    }
                }
                RoundStage::Waiting { elapsed: waited } => {
                    if !context.agents.is_empty() && waited < self.config.tuning.max_round_wait() {
                        return;
                    }
                    let next = active.round + 1;
                    active.begin_round(next, out_events);
                }
            }
        }
    }

    fn poll_clear(&mut self, context: &SpawnContext<'_>, out_events: &mut Vec<Event>) {
        if !context.agents.is_empty() {
            return;
        }

        if let Some(finished) = self.state.active.take() {
            let wave = finished.config.wave();
            tracing::info!(wave = wave.get(), "wave cleared");
            out_events.push(Event::WaveComplete { wave });
        }
        self.state.phase = WavePhase::Idle;
    }
}

/// Delay between spawns within a round of `wave`.
#[must_use]
pub fn spawn_interval(tuning: &WaveTuning, wave: WaveId) -> Duration {
    let steps = wave.steps_from_first() as f32;
    let secs = (tuning.base_spawn_interval_secs - tuning.spawn_interval_decrease_per_wave * steps)
        .max(tuning.min_spawn_interval_secs);
    secs_to_duration(secs)
}

fn spawn_base(rng: &mut ChaCha8Rng, context: &SpawnContext<'_>) -> Vec2 {
    if !context.spawn_points.is_empty() {
        let index = rng.gen_range(0..context.spawn_points.len());
        if let Some(point) = context.spawn_points.get(index) {
            return *point;
        }
    }

    let min = context.arena.min();
    let max = context.arena.max();
    Vec2::new(sample_axis(rng, min.x, max.x), sample_axis(rng, min.y, max.y))
}

fn sample_axis(rng: &mut ChaCha8Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

fn derive_spawn_seed(seed: u64, wave: WaveId, spawn_index: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(wave.get().to_le_bytes());
    hasher.update(spawn_index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_interval_shrinks_to_floor() {
        let tuning = WaveTuning::default();
        assert_eq!(spawn_interval(&tuning, WaveId::new(1)), Duration::from_secs_f32(0.5));
        let later = spawn_interval(&tuning, WaveId::new(5));
        assert!((later.as_secs_f32() - 0.38).abs() < 1e-4);
        assert_eq!(
            spawn_interval(&tuning, WaveId::new(100)),
            Duration::from_secs_f32(0.1)
        );
        let slow = WaveTuning {
            base_spawn_interval_secs: 1e20,
            spawn_interval_decrease_per_wave: 0.0,
            ..tuning
        };
        assert_eq!(spawn_interval(&slow, WaveId::new(1)), Duration::MAX);
    }

    #[test]
    fn spawn_seeds_differ_per_index_and_wave() {
        let first = derive_spawn_seed(7, WaveId::new(1), 0);
        assert_eq!(first, derive_spawn_seed(7, WaveId::new(1), 0));
        assert_ne!(first, derive_spawn_seed(7, WaveId::new(1), 1));
        assert_ne!(first, derive_spawn_seed(7, WaveId::new(2), 0));
        assert_ne!(first, derive_spawn_seed(8, WaveId::new(1), 0));
    }

    #[test]
    fn boss_guarantee_only_covers_boss_rounds() {
        let tuning = WaveTuning::default();
        let formula = StandardFormula::new(tuning);
        let templates = AgentTemplates::default();
        let boss = generate_wave_config(WaveId::new(5), &formula, &tuning, &templates);
        let plain = generate_wave_config(WaveId::new(4), &formula, &tuning, &templates);

        let wave = ActiveWave::new(
            boss,
            plan_rounds(&boss, RoundProfile::Balanced),
            Duration::ZERO,
        );
        assert!(wave.boss_pending());
        let wave = ActiveWave::new(
            plain,
            plan_rounds(&plain, RoundProfile::Balanced),
            Duration::ZERO,
        );
        assert!(!wave.boss_pending());
    }

    #[test]
    fn stage_clocks_advance_independently() {
        let tuning = WaveTuning::default();
        let config = generate_wave_config(
            WaveId::new(1),
            &StandardFormula::new(tuning),
            &tuning,
            &AgentTemplates::default(),
        );
        let mut wave = ActiveWave::new(
            config,
            plan_rounds(&config, RoundProfile::Balanced),
            Duration::from_millis(500),
        );
        wave.advance(Duration::from_millis(100));
        assert_eq!(wave.spawn_clock, Duration::from_millis(600));

        wave.stage = RoundStage::Waiting {
            elapsed: Duration::ZERO,
        };
        wave.advance(Duration::from_millis(100));
        assert_eq!(
            wave.stage,
            RoundStage::Waiting {
                elapsed: Duration::from_millis(100)
            }
        );
        assert_eq!(wave.spawn_clock, Duration::from_millis(600));
    }
}
