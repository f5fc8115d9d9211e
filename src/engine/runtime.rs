//! Effect Runtime
//!
//! The host-facing entry point: one frame clock, one particle engine and one
//! entity engine sharing a configuration. The host advances the clock once
//! per game tick, either by calling [`EffectRuntime::tick`] from its own loop
//! or by handing [`EffectRuntime::clock`] to [`drive`](crate::engine::drive).

use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::effect::entity::EntityEffectSpec;
use crate::effect::handle::EffectHandle;
use crate::effect::particle::ParticleEffectSpec;
use crate::engine::clock::FrameClock;
use crate::engine::entity::EntityEngine;
use crate::engine::particle::ParticleEngine;
use crate::error::Result;
use crate::network::Broadcaster;
use crate::world::{RigBinder, World};

/// Both schedulers on one clock.
pub struct EffectRuntime {
    clock: Arc<FrameClock>,
    particles: ParticleEngine,
    entities: EntityEngine,
}

impl EffectRuntime {
    /// Validate `config` and start the engines on a fresh clock.
    pub fn start(
        config: EngineConfig,
        world: Arc<dyn World>,
        broadcaster: Arc<dyn Broadcaster>,
        rigs: Option<Arc<dyn RigBinder>>,
    ) -> Result<Self> {
        Self::with_clock(config, Arc::new(FrameClock::new()), world, broadcaster, rigs)
    }

    /// Start the engines on a clock the host already drives.
    pub fn with_clock(
        config: EngineConfig,
        clock: Arc<FrameClock>,
        world: Arc<dyn World>,
        broadcaster: Arc<dyn Broadcaster>,
        rigs: Option<Arc<dyn RigBinder>>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Starting effect runtime: {} Hz, shard capacity {}, {} compute threads",
            config.tick_rate, config.shard_capacity, config.compute_threads
        );
        let particles = ParticleEngine::new(clock.clone(), world.clone(), broadcaster.clone());
        let entities = EntityEngine::new(config, clock.clone(), world, broadcaster, rigs)?;
        Ok(Self { clock, particles, entities })
    }

    /// Schedule a particle effect.
    pub fn play_particle(&self, spec: ParticleEffectSpec) -> Result<EffectHandle> {
        self.particles.play(spec)
    }

    /// Spawn and schedule an entity effect.
    pub fn play_entity(&self, spec: EntityEffectSpec) -> Result<EffectHandle> {
        self.entities.play(spec)
    }

    /// Cancel one effect. Idempotent.
    pub fn cancel(&self, handle: &EffectHandle) {
        handle.cancel();
    }

    /// Cancel every effect of both kinds. The runtime keeps accepting work.
    pub fn cancel_all(&self) {
        self.particles.cancel_all();
        self.entities.cancel_all();
    }

    /// Advance one frame. Returns how many clock tasks ran.
    pub fn tick(&self) -> usize {
        self.clock.advance()
    }

    /// Cancel everything and refuse further submissions.
    pub fn stop(&self) {
        self.particles.stop();
        self.entities.stop();
    }

    /// Whether [`stop`](Self::stop) was called.
    pub fn is_stopped(&self) -> bool {
        self.entities.is_stopped()
    }

    /// The clock both engines tick on.
    pub fn clock(&self) -> Arc<FrameClock> {
        self.clock.clone()
    }

    /// Settings in use.
    pub fn config(&self) -> &EngineConfig {
        self.entities.config()
    }

    /// Running particle effects.
    pub fn active_particle_effects(&self) -> usize {
        self.particles.active_effects()
    }

    /// Running entity effects.
    pub fn active_entity_effects(&self) -> usize {
        self.entities.active_effects()
    }

    /// Members of every running shard.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.entities.shard_sizes()
    }

    /// Shards whose task is alive.
    pub fn running_shards(&self) -> usize {
        self.entities.running_shards()
    }
}

impl Drop for EffectRuntime {
    fn drop(&mut self) {
        if !self.is_stopped() {
            self.stop();
        }
    }
}
