use std::time::Duration;

use horde_core::{
    AgentKind, AgentSpawn, Command, ConfigError, EngineConfig, Event, RoundProfile, Vec2, WaveId,
};
use horde_engine::Engine;
use horde_system_waves::WavePhase;
use sha2::{Digest, Sha256};

const STEP: Duration = Duration::from_millis(100);

fn engine(seed: u64) -> Engine {
    Engine::new(EngineConfig {
        seed,
        ..EngineConfig::default()
    })
    .expect("default config is valid")
}

fn tick_until(engine: &mut Engine, max_ticks: usize, done: impl Fn(&Event) -> bool) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..max_ticks {
        let events = engine.tick(STEP);
        let finished = events.iter().any(&done);
        log.extend(events);
        if finished {
            return log;
        }
    }
    panic!("condition not reached within {max_ticks} ticks");
}

fn kill_all(engine: &mut Engine) -> Vec<Event> {
    let mut log = Vec::new();
    for agent in engine.active_agents() {
        log.extend(engine.apply(Command::DamageAgent {
            agent: agent.id,
            amount: f32::MAX,
        }));
    }
    log
}

fn spawn(engine: &mut Engine, position: Vec2) -> Vec<Event> {
    engine.apply(Command::SpawnAgent {
        spawn: AgentSpawn {
            kind: AgentKind::Normal,
            position,
            wave: WaveId::new(1),
            health: 10.0,
            damage: 1.0,
        },
    })
}

#[test]
fn wave_lifecycle_reports_both_callbacks() {
    let mut engine = engine(1);
    assert!(engine.spawn_wave(WaveId::new(1)));

    let log = tick_until(&mut engine, 400, |event| {
        matches!(event, Event::WaveSpawnComplete { .. })
    });
    assert!(log.contains(&Event::WaveSpawnComplete {
        wave: WaveId::new(1)
    }));
    assert_eq!(engine.phase(), WavePhase::WaitingForClear);
    assert!(engine.live_count() > 0);

    let log = kill_all(&mut engine);
    assert_eq!(engine.live_count(), 0);
    assert!(log.contains(&Event::WaveComplete {
        wave: WaveId::new(1)
    }));
    assert_eq!(engine.phase(), WavePhase::Idle);
}

#[test]
fn oversized_settings_are_rejected_instead_of_panicking() {
    let mut config = EngineConfig::default();
    config.avoidance.rebuild_interval_secs = 1e20;
    assert!(matches!(
        Engine::new(config),
        Err(ConfigError::DurationOutOfRange { .. })
    ));

    let mut config = EngineConfig::default();
    config.waves.max_round_wait_secs = 1e20;
    assert!(matches!(
        Engine::new(config),
        Err(ConfigError::DurationOutOfRange { .. })
    ));

    let mut config = EngineConfig::default();
    config.avoidance.radius = 3_000.0;
    assert!(matches!(
        Engine::new(config),
        Err(ConfigError::AvoidanceRadiusExceedsCell { .. })
    ));
}

#[test]
fn crowded_agents_are_pushed_apart() {
    let mut engine = engine(1);
    let ids: Vec<_> = [Vec2::new(0.2, 0.2), Vec2::new(0.5, 0.2)]
        .into_iter()
        .flat_map(|position| spawn(&mut engine, position))
        .filter_map(|event| match event {
            Event::AgentSpawned { agent, .. } => Some(agent),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 2);

    let events = engine.tick(Duration::from_millis(500));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::SpatialGridRebuilt { agents: 2 })));

    let left = engine.avoidance_force(ids[0]);
    let right = engine.avoidance_force(ids[1]);
    assert!(left.x < 0.0 && right.x > 0.0);
    assert!((left + right).length() < 1e-5);
}

#[test]
fn queries_reflect_live_agents() {
    let mut engine = engine(1);
    let _ = spawn(&mut engine, Vec2::new(1.0, 0.0));
    let _ = spawn(&mut engine, Vec2::new(4.0, 0.0));

    let nearest = engine.nearest_agent(Vec2::ZERO, 2.0).expect("agent in range");
    assert_eq!(nearest.position, Vec2::new(1.0, 0.0));
    assert!(engine.nearest_agent(Vec2::ZERO, 0.5).is_none());
    assert_eq!(engine.agents_in_range(Vec2::ZERO, 5.0).len(), 2);
    assert_eq!(engine.active_agents().len(), 2);
}

#[test]
fn pause_and_duplicate_requests() {
    let mut engine = engine(2);
    assert!(engine.spawn_wave(WaveId::new(1)));
    assert!(!engine.spawn_wave(WaveId::new(2)));

    engine.pause_spawning();
    for _ in 0..20 {
        let _ = engine.tick(STEP);
    }
    assert!(engine.is_paused());
    assert_eq!(engine.live_count(), 0);

    engine.resume_spawning();
    let _ = engine.tick(STEP);
    assert_eq!(engine.live_count(), 1);
}

#[test]
fn strong_opposition_front_loads_the_wave() {
    let mut engine = engine(3);
    engine.set_opposing_attack_rate(5.0);
    assert!(engine.spawn_wave(WaveId::new(1)));

    let events = engine.tick(STEP);
    assert!(events.contains(&Event::WaveStarted {
        wave: WaveId::new(1),
        total: engine.wave_config(WaveId::new(1)).total_count(),
        profile: RoundProfile::FrontLoaded,
    }));
}

fn fingerprint(seed: u64) -> [u8; 32] {
    let mut engine = engine(seed);
    let mut hasher = Sha256::new();
    let turret = Vec2::ZERO;

    for wave in 1..=3 {
        assert!(engine.spawn_wave(WaveId::new(wave)));
        for _ in 0..2_000 {
            let mut events = engine.tick(STEP);
            if let Some(target) = engine.nearest_agent(turret, 30.0) {
                events.extend(engine.apply(Command::DamageAgent {
                    agent: target.id,
                    amount: 60.0,
                }));
            }
            for event in &events {
                hasher.update(format!("{event:?}").as_bytes());
            }
            if engine.phase() == WavePhase::Idle {
                break;
            }
        }
        assert_eq!(engine.phase(), WavePhase::Idle, "wave {wave} never cleared");
    }

    hasher.finalize().into()
}

#[test]
fn identical_seeds_produce_identical_fingerprints() {
    assert_eq!(fingerprint(17), fingerprint(17));
    assert_ne!(fingerprint(17), fingerprint(18));
}
