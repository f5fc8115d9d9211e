//! Arc Effect Demo
//!
//! Runs a handful of preset effects against the in-memory world and reports
//! what would have been sent to viewers.
//!
//! Configuration comes from `ARC_EFFECT_*` variables, or from a JSON file
//! given as the first argument. `RUST_LOG` controls log output.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arc_effect::{
    drive,
    effect::{presets, ParticleContext},
    network::{RecordingBroadcaster, Sent},
    world::{BodyKind, InMemoryRigs, InMemoryWorld, RigBinder},
    EffectRuntime, EngineConfig, Location, Vec3, ViewerId, TICK_RATE, VERSION,
};

/// Seconds of simulated time the demo runs for.
const DEMO_SECONDS: u64 = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json_file(&path).with_context(|| format!("loading {}", path))?,
        None => EngineConfig::from_env().context("reading ARC_EFFECT_* variables")?,
    };

    info!("Arc Effect Engine v{}", VERSION);
    info!("Tick Rate: {} Hz (host default {} Hz)", config.tick_rate, TICK_RATE);

    let world = Arc::new(InMemoryWorld::new());
    let net = Arc::new(RecordingBroadcaster::new());
    let rigs = Arc::new(InMemoryRigs::new());
    rigs.register(presets::LINE_STRIKE_MODEL, &["strike"]);

    // Two viewers near spawn, one far away
    world.set_viewer(ViewerId(1), Vec3::new(4.0, 64.0, 4.0));
    world.set_viewer(ViewerId(2), Vec3::new(-6.0, 65.0, 2.0));
    world.set_viewer(ViewerId(3), Vec3::new(400.0, 64.0, 400.0));

    let caster = world.add_body(BodyKind::Player, Vec3::new(0.0, 64.0, 0.0), 0.4);
    let targets: Vec<_> = (0..3)
        .map(|i| world.add_body(BodyKind::Living, Vec3::new(2.6, 64.0, i as f64 * 2.0), 0.5))
        .collect();

    let ticks = DEMO_SECONDS * config.tick_rate as u64;
    let runtime = EffectRuntime::start(config, world.clone(), net.clone(), Some(rigs as Arc<dyn RigBinder>))?;

    demo_effects(&runtime, caster)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let driver = tokio::spawn(drive(runtime.clock(), runtime.config().tick_rate, Some(ticks), shutdown_rx));

    tokio::select! {
        result = driver => {
            let frames = result.context("frame driver panicked")?;
            info!("Ran {} frames", frames);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            let _ = shutdown_tx.send(());
        }
    }

    report(&world, &net, &targets);
    runtime.stop();
    Ok(())
}

fn demo_effects(runtime: &EffectRuntime, caster: arc_effect::BodyId) -> anyhow::Result<()> {
    let center = Location::at(Vec3::new(0.0, 64.0, 0.0));

    runtime.play_particle(presets::ring_pulse(ParticleContext::default(), move || Some(center), 3.0, 2.0)?)?;
    runtime.play_particle(presets::spiral_ascend(ParticleContext::default(), move || Some(center), 4.0, 3, 60)?)?;

    // Fan of strikes facing +X
    for lane in 0..3 {
        let start = Location::facing(Vec3::new(0.0, 64.0, lane as f64 * 2.0), -90.0, 0.0);
        runtime.play_entity(presets::line_strike(caster, start)?)?;
    }

    info!(
        "Playing {} particle and {} entity effects in {} shard(s)",
        runtime.active_particle_effects(),
        runtime.active_entity_effects(),
        runtime.running_shards()
    );
    Ok(())
}

fn report(world: &InMemoryWorld, net: &RecordingBroadcaster, targets: &[arc_effect::BodyId]) {
    info!("=== Demo Results ===");
    let sent = net.sent();
    let mut bytes = 0;
    for message in &sent {
        let encoded = match message {
            Sent::Motion(_, update) => update.to_bytes(),
            Sent::Particles(_, render) => render.to_bytes(),
        };
        match encoded {
            Ok(data) => bytes += data.len(),
            Err(e) => warn!("Failed to encode message: {}", e),
        }
    }
    info!("Motion updates: {}", net.motion_count());
    info!("Particle renders: {}", net.particle_count());
    info!("Encoded payload: {} bytes", bytes);

    for target in targets {
        match world.body(*target) {
            Some(body) if body.health > 0.0 => info!("{} survived with {} health", target, body.health),
            _ => info!("{} was struck down", target),
        }
    }
}
