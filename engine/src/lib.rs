#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Facade that wires the world, the avoidance system and the wave scheduler
//! into a single tickable engine.
//!
//! Every mutation goes through [`Engine::tick`] or [`Engine::apply`]. Both
//! feed the resulting world events through the systems and apply the
//! commands they emit until the batch settles, then hand the full event log
//! back to the caller.

use std::time::Duration;

use horde_core::{
    AgentId, AgentSnapshot, ArenaBounds, Command, ConfigError, EngineConfig, Event, Vec2,
    WaveConfig, WaveId,
};
use horde_system_avoidance::Avoidance;
use horde_system_placement::{Config as ResolverConfig, SpawnPositionResolver};
use horde_system_waves::{
    Config as SchedulerConfig, SchedulerState, SpawnContext, WavePhase, WaveScheduler,
};
use horde_world::{self as world, query, World};

/// Owns the simulation state and the systems that drive it.
#[derive(Debug)]
pub struct Engine {
    world: World,
    avoidance: Avoidance,
    scheduler: WaveScheduler,
}

impl Engine {
    /// Validates the configuration and builds an idle engine.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = SpawnPositionResolver::new(ResolverConfig::new(
            config.placement,
            config.grid.max_agents_per_cell,
        ));
        let scheduler = WaveScheduler::new(
            SchedulerConfig::new(config.waves, config.templates, config.seed),
            resolver,
        );
        tracing::debug!(
            seed = config.seed,
            spawn_points = config.arena.spawn_points.len(),
            "engine initialised"
        );

        Ok(Self {
            world: World::new(&config.arena, config.grid),
            avoidance: Avoidance::new(config.avoidance),
            scheduler,
        })
    }

    /// Advances simulated time by `dt` and returns every resulting event.
    pub fn tick(&mut self, dt: Duration) -> Vec<Event> {
        self.apply(Command::Tick { dt })
    }

    /// Applies an external command, such as movement or damage, and returns
    /// every resulting event.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events)
    }

    /// Requests that `wave` starts spawning on the next tick.
    ///
    /// Returns `false` while another wave is still spawning.
    pub fn spawn_wave(&mut self, wave: WaveId) -> bool {
        self.scheduler.spawn_wave(wave)
    }

    /// Freezes the spawn loop.
    pub fn pause_spawning(&mut self) {
        self.scheduler.pause();
    }

    /// Continues a paused spawn loop.
    pub fn resume_spawning(&mut self) {
        self.scheduler.resume();
    }

    /// Whether spawning is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// Current scheduler phase.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        self.scheduler.phase()
    }

    /// Feeds the opposing side's attack rate into round pacing.
    pub fn set_opposing_attack_rate(&mut self, rate: f32) {
        self.scheduler.set_opposing_attack_rate(rate);
    }

    /// Configuration the scheduler would generate for `wave`.
    #[must_use]
    pub fn wave_config(&self, wave: WaveId) -> WaveConfig {
        self.scheduler.generate_wave_config(wave)
    }

    /// Complete scheduler progress, suitable for serialization.
    #[must_use]
    pub fn scheduler_state(&self) -> &SchedulerState {
        self.scheduler.state()
    }

    /// Owned snapshot of every live agent.
    #[must_use]
    pub fn active_agents(&self) -> Vec<AgentSnapshot> {
        query::active_agents(&self.world)
    }

    /// Number of live agents.
    #[must_use]
    pub fn live_count(&self) -> usize {
        query::live_count(&self.world)
    }

    /// Snapshot of a single live agent.
    #[must_use]
    pub fn agent(&self, agent: AgentId) -> Option<AgentSnapshot> {
        query::agent(&self.world, agent)
    }

    /// Closest live agent within `max_distance` of `position`.
    #[must_use]
    pub fn nearest_agent(&self, position: Vec2, max_distance: f32) -> Option<AgentSnapshot> {
        query::nearest_agent(&self.world, position, max_distance)
    }

    /// Every live agent within `range` of `position`.
    #[must_use]
    pub fn agents_in_range(&self, position: Vec2, range: f32) -> Vec<AgentSnapshot> {
        query::agents_in_range(&self.world, position, range)
    }

    /// Last computed avoidance force for the agent; zero when none exists.
    #[must_use]
    pub fn avoidance_force(&self, agent: AgentId) -> Vec2 {
        self.avoidance.force(agent)
    }

    /// Arena bounds.
    #[must_use]
    pub fn arena(&self) -> ArenaBounds {
        query::arena(&self.world)
    }

    /// Total simulated time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        query::elapsed(&self.world)
    }

    fn pump(&mut self, pending: Vec<Event>) -> Vec<Event> {
        let mut log = Vec::new();
        let mut events = pending;

        while !events.is_empty() {
            let agents = query::agent_view(&self.world);
            let mut commands = Vec::new();
            let mut emitted = Vec::new();

            self.avoidance.handle(
                &events,
                &agents,
                query::spatial_grid(&self.world),
                &mut commands,
            );
            let context = SpawnContext {
                arena: query::arena(&self.world),
                spawn_points: query::spawn_points(&self.world),
                grid: query::spatial_grid(&self.world),
                agents: &agents,
            };
            self.scheduler
                .handle(&events, &context, &mut commands, &mut emitted);

            log.append(&mut events);
            log.append(&mut emitted);
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }

        log
    }
}
