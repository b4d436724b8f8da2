//! Headless driver: agents walk toward a turret that shoots the nearest one.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use horde_core::{Command, Event, Vec2, WaveId};
use horde_engine::Engine;
use horde_system_avoidance::steer;

use crate::scenario::{Scenario, SimulationConfig};

/// Totals gathered while the scenario ran.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Summary {
    pub(crate) waves_cleared: u32,
    pub(crate) spawned: u32,
    pub(crate) killed: u32,
    pub(crate) skipped: u32,
    pub(crate) shots: u32,
    pub(crate) elapsed: Duration,
    pub(crate) timed_out: bool,
}

impl Summary {
    fn record(&mut self, events: &[Event]) -> bool {
        let mut cleared = false;
        for event in events {
            match event {
                Event::AgentSpawned { .. } => self.spawned += 1,
                Event::AgentDied { .. } => self.killed += 1,
                Event::SpawnSkipped { .. } => self.skipped += 1,
                Event::WaveComplete { wave } => {
                    self.waves_cleared += 1;
                    cleared = true;
                    tracing::info!(wave = wave.get(), killed = self.killed, "wave cleared");
                }
                _ => {}
            }
        }
        cleared
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waves cleared: {}, spawned: {}, killed: {}, skipped: {}, shots: {}, simulated: {:.1}s",
            self.waves_cleared,
            self.spawned,
            self.killed,
            self.skipped,
            self.shots,
            self.elapsed.as_secs_f32()
        )?;
        if self.timed_out {
            write!(f, " (timed out)")?;
        }
        Ok(())
    }
}

/// Runs the scenario until every requested wave is cleared or time runs out.
pub(crate) fn run(scenario: Scenario) -> Result<Summary> {
    let simulation = scenario.simulation;
    let mut engine = Engine::new(scenario.engine).context("invalid engine configuration")?;
    engine.set_opposing_attack_rate(simulation.turret.attack_rate);

    let dt = simulation.tick();
    let attack_interval = simulation.turret.attack_interval();
    let mut summary = Summary::default();
    let mut next_wave = 1;
    let mut rest = Some(Duration::ZERO);
    let mut cooldown = Duration::ZERO;

    while summary.waves_cleared < simulation.waves {
        if engine.elapsed() >= simulation.max_duration() {
            tracing::warn!(
                cleared = summary.waves_cleared,
                requested = simulation.waves,
                "simulation ran out of time"
            );
            summary.timed_out = true;
            break;
        }

        if let Some(remaining) = rest {
            if remaining.is_zero() {
                if engine.spawn_wave(WaveId::new(next_wave)) {
                    next_wave += 1;
                }
                rest = None;
            } else {
                rest = Some(remaining.saturating_sub(dt));
            }
        }

        let mut cleared = summary.record(&engine.tick(dt));
        advance_agents(&mut engine, &simulation, dt);

        cooldown = cooldown.saturating_add(dt);
        while cooldown >= attack_interval {
            cooldown -= attack_interval;
            let Some(target) =
                engine.nearest_agent(simulation.turret.position, simulation.turret.range)
            else {
                cooldown = Duration::ZERO;
                break;
            };
            summary.shots += 1;
            cleared |= summary.record(&engine.apply(Command::DamageAgent {
                agent: target.id,
                amount: simulation.turret.damage,
            }));
        }

        if cleared {
            rest = Some(simulation.rest());
        }
    }

    summary.elapsed = engine.elapsed();
    Ok(summary)
}

fn advance_agents(engine: &mut Engine, simulation: &SimulationConfig, dt: Duration) {
    let goal = simulation.turret.position;
    let step = simulation.agent_speed * dt.as_secs_f32();

    for agent in engine.active_agents() {
        let to_goal = goal - agent.position;
        let desired = if to_goal.length() > simulation.hold_distance {
            to_goal.normalize_or_zero()
        } else {
            Vec2::ZERO
        };
        let heading = steer(
            desired,
            engine.avoidance_force(agent.id),
            simulation.avoidance_weight,
        );
        if heading == Vec2::ZERO {
            continue;
        }
        let _ = engine.apply(Command::MoveAgent {
            agent: agent.id,
            position: agent.position + heading * step,
        });
    }
}
