//! Entity Effect Engine
//!
//! Spawns proxy bodies and places their effects into bounded shards.
//!
//! ```text
//! play(spec) ──► spawn proxy ──► flags + freeze ──► bind rig
//!                                                      │
//!        ┌─────────────── shards (first with room) ◄───┘
//!        ▼
//!  ┌──────────┐ ┌──────────┐ ┌──────────┐
//!  │ shard 1  │ │ shard 2  │ │ shard 3  │   each: ≤ capacity members,
//!  │ 20 / 20  │ │ 20 / 20  │ │  3 / 20  │   one frame-clock task
//!  └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! Lock order is shards, then shard state, then shard task. The effect
//! registry is only ever taken last and never held while calling out.
//! Cancelling everything detaches the shard list first and stops the shards
//! after the list lock is released, so a hit callback that plays a new
//! effect never waits on a shard that is waiting on it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::effect::entity::{EntityEffectSpec, RigSpec};
use crate::effect::handle::{Canceller, EffectHandle, EffectId, EffectKind, EffectStatus};
use crate::engine::clock::FrameClock;
use crate::engine::pool::ComputePool;
use crate::engine::shard::{ActiveEffect, Registration, Shard, ShardContext};
use crate::error::{EffectError, Result};
use crate::network::Broadcaster;
use crate::world::{BodyId, RigBinder, World};

struct EntityInner {
    ctx: Arc<ShardContext>,
    clock: Arc<FrameClock>,
    shards: Mutex<Vec<Arc<Shard>>>,
    next_shard_id: AtomicUsize,
    stopped: AtomicBool,
}

/// Sharded scheduler for entity effects.
pub struct EntityEngine {
    inner: Arc<EntityInner>,
}

impl EntityEngine {
    /// Engine ticking on `clock`. Starts the compute pool.
    pub fn new(
        config: EngineConfig,
        clock: Arc<FrameClock>,
        world: Arc<dyn World>,
        broadcaster: Arc<dyn Broadcaster>,
        rigs: Option<Arc<dyn RigBinder>>,
    ) -> Result<Self> {
        config.validate()?;
        let pool = ComputePool::new(config.compute_threads, config.compute_queue_capacity)?;
        let ctx = ShardContext::new(config, world, broadcaster, rigs, pool);
        Ok(Self {
            inner: Arc::new(EntityInner {
                ctx: Arc::new(ctx),
                clock,
                shards: Mutex::new(Vec::new()),
                next_shard_id: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    /// Spawn the proxy for `spec` and schedule it.
    ///
    /// The proxy exists, frozen, when this returns. The first tick runs on
    /// the next frame of the owning shard.
    pub fn play(&self, spec: EntityEffectSpec) -> Result<EffectHandle> {
        let inner = &self.inner;
        if inner.stopped.load(Ordering::Acquire) {
            return Err(EffectError::EngineStopped);
        }

        let ctx = &inner.ctx;
        let body = ctx.world.spawn_proxy(spec.origin, &spec.proxy_kind)?;
        ctx.world.set_flags(body, spec.params.proxy_flags());
        ctx.world.freeze_body(body);
        let rig = inner.bind_rig(body, spec.params.rig.as_ref());

        let id = EffectId::new();
        let status = Arc::new(EffectStatus::default());
        let spec = Arc::new(spec);

        {
            let mut shards = inner.shards.lock();
            if inner.stopped.load(Ordering::Acquire) {
                drop(shards);
                ctx.world.remove_body(body);
                if rig {
                    ctx.detach_rig(body);
                }
                return Err(EffectError::EngineStopped);
            }

            let shard = inner.reserve(&mut shards);
            ctx.registry.lock().insert(
                id,
                Registration {
                    shard: Arc::downgrade(&shard),
                    body,
                    rig,
                    status: status.clone(),
                },
            );
            shard.admit(ActiveEffect::new(id, spec, body, rig, status.clone()));
            debug!("Entity effect {} on {} placed in shard {}", id, body, shard.id());
        }

        let weak = Arc::downgrade(&self.inner);
        let canceller: Weak<dyn Canceller> = weak;
        Ok(EffectHandle::new(id, EffectKind::Entity, status, canceller))
    }

    /// Cancel one effect by id. Unknown or ended ids are ignored.
    pub fn cancel(&self, id: EffectId) {
        self.inner.cancel_effect(id);
    }

    /// Cancel every effect and stop every shard.
    ///
    /// Must not be called from inside a hit callback.
    pub fn cancel_all(&self) {
        self.inner.cancel_shards(self.inner.shards.lock());
    }

    /// Cancel everything and refuse further submissions.
    pub fn stop(&self) {
        let shards = self.inner.shards.lock();
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.cancel_shards(shards);
        info!("Entity engine stopped");
    }

    /// Whether [`stop`](Self::stop) was called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Effects that have been submitted and not yet ended.
    pub fn active_effects(&self) -> usize {
        self.inner.ctx.registry.lock().len()
    }

    /// Member count of every running shard, in creation order.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.inner
            .shards
            .lock()
            .iter()
            .filter(|s| s.is_running())
            .map(|s| s.members())
            .collect()
    }

    /// Shards whose task is alive.
    pub fn running_shards(&self) -> usize {
        self.inner.shards.lock().iter().filter(|s| s.is_running()).count()
    }

    /// Settings in use.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.ctx.config
    }

    #[cfg(test)]
    fn shards(&self) -> Vec<Arc<Shard>> {
        self.inner.shards.lock().clone()
    }
}

impl EntityInner {
    fn bind_rig(&self, body: BodyId, rig: Option<&RigSpec>) -> bool {
        let Some(rig) = rig else {
            return false;
        };
        let Some(binder) = &self.ctx.rigs else {
            warn!("No rig binder installed, {} renders without {}", body, rig.model);
            return false;
        };
        if let Err(e) = binder.attach(body, &rig.model) {
            warn!("Rig {} not bound to {}: {}", rig.model, body, e);
            return false;
        }
        if let Some(animation) = &rig.animation {
            if let Err(e) = binder.play_animation(body, &rig.model, animation) {
                warn!("Animation not started on {}: {}", body, e);
            }
        }
        true
    }

    /// First running shard with room, or a new one. Stopped shards are
    /// dropped from the list here.
    fn reserve(&self, shards: &mut Vec<Arc<Shard>>) -> Arc<Shard> {
        shards.retain(|s| {
            let running = s.is_running();
            if !running {
                debug!("Reclaiming stopped shard {}", s.id());
            }
            running
        });

        if let Some(shard) = shards.iter().find(|s| s.try_reserve()) {
            return shard.clone();
        }

        let id = self.next_shard_id.fetch_add(1, Ordering::AcqRel) + 1;
        let shard = Shard::start(id, self.ctx.clone(), &self.clock);
        shards.push(shard.clone());
        shard
    }

    /// Detach every shard and registration under the list lock, then stop
    /// the shards with the lock released.
    fn cancel_shards(&self, mut shards: MutexGuard<'_, Vec<Arc<Shard>>>) {
        let detached = std::mem::take(&mut *shards);
        let registrations: Vec<Registration> = self.ctx.registry.lock().drain().map(|(_, r)| r).collect();
        drop(shards);

        for reg in &registrations {
            reg.status.cancel();
        }
        for shard in detached {
            shard.stop_all();
        }
        // Effects still in flight between registry and shard
        for reg in registrations {
            self.ctx.world.remove_body(reg.body);
            if reg.rig {
                self.ctx.detach_rig(reg.body);
            }
        }
    }
}

impl Canceller for EntityInner {
    fn cancel_effect(&self, id: EffectId) {
        let Some(reg) = self.ctx.registry.lock().remove(&id) else {
            return;
        };
        reg.status.cancel();
        self.ctx.world.remove_body(reg.body);
        if reg.rig {
            self.ctx.detach_rig(reg.body);
        }
        if let Some(shard) = reg.shard.upgrade() {
            shard.release_member();
        }
        debug!("Entity effect {} cancelled", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{Timeline, Transform};
    use crate::core::vec3::Vec3;
    use crate::effect::entity::EntityParams;
    use crate::network::RecordingBroadcaster;
    use crate::world::{BodyKind, InMemoryRigs, InMemoryWorld, Location, ProxyKind, ViewerId, WorldError};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct Fixture {
        clock: Arc<FrameClock>,
        world: Arc<InMemoryWorld>,
        net: Arc<RecordingBroadcaster>,
        rigs: Arc<InMemoryRigs>,
        engine: EntityEngine,
    }

    fn fixture(config: EngineConfig) -> Fixture {
        let clock = Arc::new(FrameClock::new());
        let world = Arc::new(InMemoryWorld::new());
        let net = Arc::new(RecordingBroadcaster::new());
        let rigs = Arc::new(InMemoryRigs::new());
        let engine = EntityEngine::new(
            config,
            clock.clone(),
            world.clone(),
            net.clone(),
            Some(rigs.clone() as Arc<dyn RigBinder>),
        )
        .unwrap();
        Fixture { clock, world, net, rigs, engine }
    }

    fn inline_config() -> EngineConfig {
        EngineConfig { compute_threads: 0, ..Default::default() }
    }

    fn advance(clock: &FrameClock, frames: u32) {
        for _ in 0..frames {
            clock.advance();
        }
    }

    fn still(caster: BodyId, duration: u32) -> EntityEffectSpec {
        EntityEffectSpec::builder(caster)
            .origin(Location::at(Vec3::new(0.0, 64.0, 0.0)))
            .timeline(Timeline::linear(duration).unwrap())
            .build()
            .unwrap()
    }

    /// Moves +X in the caster's frame at yaw -90, i.e. along world +X.
    fn sweep(caster: BodyId, length: f64, duration: u32, params: EntityParams) -> EntityEffectSpec {
        EntityEffectSpec::builder(caster)
            .origin(Location::facing(Vec3::new(0.0, 64.0, 0.0), -90.0, 0.0))
            .transform(Transform::identity().with_translate(move |t| Vec3::new(t * length, 0.0, 0.0)))
            .params(params)
            .timeline(Timeline::linear(duration).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_play_spawns_frozen_proxy() {
        let f = fixture(inline_config());
        let params = EntityParams { collidable: true, ..Default::default() };
        let spec = EntityEffectSpec::builder(BodyId(999))
            .origin(Location::at(Vec3::new(1.0, 2.0, 3.0)))
            .params(params)
            .timeline(Timeline::linear(10).unwrap())
            .build()
            .unwrap();

        let handle = f.engine.play(spec).unwrap();
        assert_eq!(handle.kind(), EffectKind::Entity);
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 1);
        assert_eq!(f.engine.shard_sizes(), vec![1]);
        assert_eq!(f.engine.active_effects(), 1);

        let state = f.world.body(BodyId(1)).unwrap();
        assert_eq!(state.location.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(state.flags.collidable);
        assert_eq!(state.freezes, 1);
    }

    #[test]
    fn test_runs_exactly_duration_ticks() {
        let f = fixture(inline_config());
        let handle = f.engine.play(still(BodyId(999), 5)).unwrap();

        advance(&f.clock, 4);
        assert!(!handle.is_finished());
        assert_eq!(f.engine.shards()[0].local_ticks(), vec![4]);

        advance(&f.clock, 1);
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
        assert_eq!(f.engine.active_effects(), 0);

        // The emptied shard flushes the despawn as it stops
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);
        assert_eq!(f.engine.running_shards(), 0);
    }

    #[test]
    fn test_shard_capacity_and_reclaim() {
        let f = fixture(inline_config());
        let handles: Vec<_> = (0..21).map(|_| f.engine.play(still(BodyId(999), 100)).unwrap()).collect();
        assert_eq!(f.engine.shard_sizes(), vec![20, 1]);

        handles[20].cancel();
        assert!(handles[20].is_cancelled());
        assert_eq!(f.engine.shard_sizes(), vec![20, 0]);
        advance(&f.clock, 1);
        assert_eq!(f.engine.running_shards(), 1);

        for h in &handles[..20] {
            h.cancel();
        }
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);
        advance(&f.clock, 1);
        assert_eq!(f.engine.running_shards(), 0);
        assert_eq!(f.clock.active_tasks(), 0);

        // A fresh submission starts a new shard
        f.engine.play(still(BodyId(999), 100)).unwrap();
        assert_eq!(f.engine.shard_sizes(), vec![1]);
        assert_eq!(f.engine.shards()[0].id(), 3);
    }

    #[test]
    fn test_motionless_effect_sends_nothing() {
        let f = fixture(inline_config());
        f.world.set_viewer(ViewerId(1), Vec3::new(0.0, 64.0, 5.0));
        f.engine.play(still(BodyId(999), 40)).unwrap();
        advance(&f.clock, 40);
        assert_eq!(f.net.motion_count(), 0);
    }

    #[test]
    fn test_moving_effect_reaches_viewers_in_range() {
        let f = fixture(inline_config());
        f.world.set_viewer(ViewerId(1), Vec3::new(0.0, 64.0, 5.0));
        f.world.set_viewer(ViewerId(2), Vec3::new(500.0, 64.0, 0.0));
        let handle = f.engine.play(sweep(BodyId(999), 4.0, 20, EntityParams::default())).unwrap();
        advance(&f.clock, 22);
        assert!(handle.is_finished());

        let updates = f.net.motions_for(BodyId(1));
        // Syncs at local ticks 2, 4, .. 18 move; tick 0 is the origin
        assert_eq!(updates.len(), 9);
        let dx: i32 = updates.iter().map(|u| u.dx as i32).sum();
        assert!((dx - (3.6 * 4096.0) as i32).abs() <= 9);
        for sent in f.net.sent() {
            if let crate::network::Sent::Motion(viewers, _) = sent {
                assert_eq!(viewers, vec![ViewerId(1)]);
            }
        }
    }

    #[test]
    fn test_each_target_hit_at_most_once() {
        let f = fixture(inline_config());
        let caster = f.world.add_body(BodyKind::Player, Vec3::new(0.0, 64.0, 0.0), 0.5);
        let target = f.world.add_body(BodyKind::Living, Vec3::new(2.0, 64.0, 0.0), 0.5);
        f.world.add_body(BodyKind::Item, Vec3::new(2.0, 64.0, 0.0), 0.25);

        let attacks = Arc::new(AtomicU32::new(0));
        let extras = Arc::new(AtomicU32::new(0));
        let (a, e) = (attacks.clone(), extras.clone());
        let params = EntityParams::default()
            .with_fixed_hitbox(1.0)
            .on_attack(move |hit| {
                assert_eq!(hit.caster, caster);
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_extra(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        // Stays overlapping the target for most of its life
        let spec = EntityEffectSpec::builder(caster)
            .origin(Location::at(Vec3::new(2.0, 64.0, 0.0)))
            .params(params)
            .timeline(Timeline::linear(40).unwrap())
            .build()
            .unwrap();
        f.engine.play(spec).unwrap();
        advance(&f.clock, 41);

        assert_eq!(attacks.load(Ordering::SeqCst), 1);
        assert_eq!(extras.load(Ordering::SeqCst), 1);
        assert!(f.world.is_body_valid(target));
    }

    #[test]
    fn test_failing_callbacks_are_isolated() {
        let f = fixture(inline_config());
        let caster = f.world.add_body(BodyKind::Player, Vec3::new(-5.0, 64.0, 0.0), 0.5);
        f.world.add_body(BodyKind::Living, Vec3::new(2.0, 64.0, 0.0), 0.5);

        let extras = Arc::new(AtomicU32::new(0));
        let e = extras.clone();
        let panicking = EntityParams::default()
            .with_fixed_hitbox(1.0)
            .on_attack(|_| panic!("attack exploded"))
            .on_extra(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        let failing = EntityParams::default()
            .with_fixed_hitbox(1.0)
            .on_attack(|_| Err(anyhow::anyhow!("target immune")));
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        let healthy = EntityParams::default().with_fixed_hitbox(1.0).on_attack(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let a = f.engine.play(sweep(caster, 4.0, 20, panicking)).unwrap();
        let b = f.engine.play(sweep(caster, 4.0, 20, failing)).unwrap();
        let c = f.engine.play(sweep(caster, 4.0, 20, healthy)).unwrap();
        advance(&f.clock, 21);

        assert_eq!(extras.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(a.is_finished() && b.is_finished() && c.is_finished());
    }

    #[test]
    fn test_removed_proxy_ends_effect_silently() {
        let f = fixture(inline_config());
        let caster = f.world.add_body(BodyKind::Player, Vec3::new(-5.0, 64.0, 0.0), 0.5);
        f.world.add_body(BodyKind::Living, Vec3::new(0.0, 64.0, 0.0), 0.5);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let params = EntityParams::default().with_fixed_hitbox(1.0).on_attack(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let handle = f.engine.play(sweep(caster, 4.0, 20, params)).unwrap();
        let proxy = BodyId(3);
        assert!(f.world.is_body_valid(proxy));
        f.world.remove_body(proxy);

        advance(&f.clock, 1);
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.engine.active_effects(), 0);
        assert_eq!(f.engine.running_shards(), 0);
    }

    #[test]
    fn test_callback_removing_proxy_ends_effect() {
        let f = fixture(inline_config());
        let caster = f.world.add_body(BodyKind::Player, Vec3::new(-5.0, 64.0, 0.0), 0.5);
        f.world.add_body(BodyKind::Living, Vec3::new(1.0, 64.0, 0.0), 0.5);

        let params = EntityParams::default().with_fixed_hitbox(1.0).on_attack(|hit| {
            hit.world.remove_body(hit.proxy);
            Ok(())
        });
        let handle = f.engine.play(sweep(caster, 4.0, 20, params)).unwrap();
        advance(&f.clock, 20);
        assert!(handle.is_finished());
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);
    }

    #[test]
    fn test_cancel_from_callback() {
        let f = fixture(inline_config());
        let caster = f.world.add_body(BodyKind::Player, Vec3::new(-5.0, 64.0, 0.0), 0.5);
        f.world.add_body(BodyKind::Living, Vec3::new(1.0, 64.0, 0.0), 0.5);

        let slot: Arc<Mutex<Option<EffectHandle>>> = Arc::new(Mutex::new(None));
        let own = slot.clone();
        let params = EntityParams::default().with_fixed_hitbox(1.0).on_attack(move |_| {
            if let Some(handle) = own.lock().as_ref() {
                handle.cancel();
            }
            Ok(())
        });
        let handle = f.engine.play(sweep(caster, 4.0, 20, params)).unwrap();
        *slot.lock() = Some(handle.clone());

        advance(&f.clock, 2);
        assert!(handle.is_cancelled());
        assert_eq!(f.engine.active_effects(), 0);
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);

        advance(&f.clock, 1);
        assert_eq!(f.engine.running_shards(), 0);
        assert_eq!(f.clock.active_tasks(), 0);
    }

    #[test]
    fn test_callback_may_play_while_cancel_all_runs() {
        let clock = Arc::new(FrameClock::new());
        let world = Arc::new(InMemoryWorld::new());
        let net = Arc::new(RecordingBroadcaster::new());
        let engine = Arc::new(EntityEngine::new(inline_config(), clock.clone(), world.clone(), net, None).unwrap());
        let caster = world.add_body(BodyKind::Player, Vec3::new(-5.0, 64.0, 0.0), 0.5);
        world.add_body(BodyKind::Living, Vec3::new(1.0, 64.0, 0.0), 0.5);

        let (hit_tx, hit_rx) = crossbeam_channel::bounded(1);
        let chained = Arc::new(AtomicBool::new(false));
        let (chainer, played) = (engine.clone(), chained.clone());
        let params = EntityParams::default().with_fixed_hitbox(1.0).on_attack(move |_| {
            let _ = hit_tx.try_send(());
            std::thread::sleep(Duration::from_millis(100));
            played.store(chainer.play(still(BodyId(999), 5)).is_ok(), Ordering::SeqCst);
            Ok(())
        });
        engine.play(sweep(caster, 4.0, 20, params)).unwrap();

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let ticker = {
            let clock = clock.clone();
            std::thread::spawn(move || {
                for _ in 0..3 {
                    clock.advance();
                }
                let _ = done_tx.send(());
            })
        };

        hit_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        engine.cancel_all();
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok(), "tick thread blocked");
        ticker.join().unwrap();

        assert!(chained.load(Ordering::SeqCst));
        assert!(!world.is_body_valid(BodyId(3)));
    }

    #[test]
    fn test_batch_limit_rotates_fairly() {
        let config = EngineConfig { batch_size_per_tick: 1, ..inline_config() };
        let f = fixture(config);
        for _ in 0..3 {
            f.engine.play(still(BodyId(999), 100)).unwrap();
        }

        advance(&f.clock, 1);
        assert_eq!(f.engine.shards()[0].local_ticks(), vec![1, 0, 0]);
        advance(&f.clock, 3);
        assert_eq!(f.engine.shards()[0].local_ticks(), vec![2, 1, 1]);
        advance(&f.clock, 5);
        assert_eq!(f.engine.shards()[0].local_ticks(), vec![3, 3, 3]);
    }

    #[test]
    fn test_spent_budget_defers_apply_jobs_in_order() {
        let config = EngineConfig { time_budget_micros: 1_000, ..inline_config() };
        let f = fixture(config);
        let targets: Vec<BodyId> = (0..3)
            .map(|lane| f.world.add_body(BodyKind::Living, Vec3::new(0.0, 64.0, lane as f64 * 10.0), 0.5))
            .collect();

        let hits = Arc::new(Mutex::new(Vec::new()));
        for lane in 0..3 {
            let log = hits.clone();
            let params = EntityParams::default().with_fixed_hitbox(0.5).on_attack(move |hit| {
                log.lock().push(hit.target);
                std::thread::sleep(Duration::from_millis(3));
                Ok(())
            });
            let spec = EntityEffectSpec::builder(BodyId(999))
                .origin(Location::at(Vec3::new(0.0, 64.0, lane as f64 * 10.0)))
                .params(params)
                .timeline(Timeline::linear(100).unwrap())
                .build()
                .unwrap();
            f.engine.play(spec).unwrap();
        }

        // Frame 1 queues a motion job per effect; the first slow hit spends
        // the budget of frame 2
        advance(&f.clock, 2);
        assert_eq!(*hits.lock(), vec![targets[0]]);

        advance(&f.clock, 8);
        assert_eq!(*hits.lock(), targets);
    }

    #[test]
    fn test_tiny_budget_still_finishes_every_effect() {
        let config = EngineConfig { time_budget_micros: 1, ..inline_config() };
        let f = fixture(config);
        let handles: Vec<_> = (0..3).map(|_| f.engine.play(still(BodyId(999), 30)).unwrap()).collect();

        let mut last_total = 0;
        for _ in 0..10 {
            f.clock.advance();
            let ticks = f.engine.shards()[0].local_ticks();
            let total: u32 = ticks.iter().sum();
            let (min, max) = (ticks.iter().min().unwrap(), ticks.iter().max().unwrap());
            assert!(max - min <= 1, "unfair rotation: {:?}", ticks);
            assert!(total > last_total);
            last_total = total;
        }

        advance(&f.clock, 80);
        assert!(handles.iter().all(|h| h.is_finished() && !h.is_cancelled()));
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);
        assert_eq!(f.engine.running_shards(), 0);
    }

    #[test]
    fn test_proxy_spawned_as_requested_kind() {
        let f = fixture(inline_config());
        let spec = EntityEffectSpec::builder(BodyId(999))
            .origin(Location::default())
            .proxy_kind(ProxyKind::Named("armor_stand".into()))
            .timeline(Timeline::linear(5).unwrap())
            .build()
            .unwrap();
        f.engine.play(spec).unwrap();
        assert_eq!(f.world.body(BodyId(1)).unwrap().proxy_kind, Some(ProxyKind::Named("armor_stand".into())));
    }

    #[test]
    fn test_rig_bound_and_released() {
        let f = fixture(inline_config());
        f.rigs.register("viperwolf", &["strike"]);
        let params = EntityParams::default().with_rig(RigSpec::model("viperwolf").with_animation("strike"));
        let spec = EntityEffectSpec::builder(BodyId(999))
            .origin(Location::default())
            .params(params)
            .timeline(Timeline::linear(50).unwrap())
            .build()
            .unwrap();

        let handle = f.engine.play(spec).unwrap();
        assert_eq!(f.rigs.attached(BodyId(1)).as_deref(), Some("viperwolf"));
        assert_eq!(f.rigs.played(), vec![(BodyId(1), "strike".to_string())]);

        handle.cancel();
        assert_eq!(f.rigs.attached(BodyId(1)), None);
        assert!(!f.world.is_body_valid(BodyId(1)));
    }

    #[test]
    fn test_unknown_rig_still_plays() {
        let f = fixture(inline_config());
        let params = EntityParams::default().with_rig(RigSpec::model("ghost"));
        let spec = EntityEffectSpec::builder(BodyId(999))
            .origin(Location::default())
            .params(params)
            .timeline(Timeline::linear(3).unwrap())
            .build()
            .unwrap();
        let handle = f.engine.play(spec).unwrap();
        advance(&f.clock, 3);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_spawn_rejected() {
        let f = fixture(inline_config());
        f.world.reject_spawns(true);
        let err = f.engine.play(still(BodyId(999), 5)).unwrap_err();
        assert!(matches!(err, EffectError::Spawn(WorldError::SpawnRejected(_))));
        assert_eq!(f.engine.running_shards(), 0);
    }

    #[test]
    fn test_stop_cancels_and_refuses() {
        let f = fixture(inline_config());
        let handles: Vec<_> = (0..3).map(|_| f.engine.play(still(BodyId(999), 100)).unwrap()).collect();
        advance(&f.clock, 2);

        f.engine.stop();
        assert!(handles.iter().all(|h| h.is_cancelled()));
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);
        assert_eq!(f.clock.active_tasks(), 0);
        assert!(matches!(f.engine.play(still(BodyId(999), 5)), Err(EffectError::EngineStopped)));
    }

    #[test]
    fn test_cancel_all_keeps_engine_usable() {
        let f = fixture(inline_config());
        for _ in 0..25 {
            f.engine.play(still(BodyId(999), 100)).unwrap();
        }
        f.engine.cancel_all();
        assert_eq!(f.engine.active_effects(), 0);
        assert_eq!(f.engine.running_shards(), 0);
        assert_eq!(f.world.count_kind(BodyKind::Proxy), 0);

        let handle = f.engine.play(still(BodyId(999), 2)).unwrap();
        advance(&f.clock, 2);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_worker_pool_delivers_motion() {
        let config = EngineConfig { compute_threads: 2, ..Default::default() };
        let f = fixture(config);
        f.world.set_viewer(ViewerId(1), Vec3::new(0.0, 64.0, 0.0));
        let handle = f.engine.play(sweep(BodyId(999), 8.0, 60, EntityParams::default())).unwrap();

        for _ in 0..61 {
            f.clock.advance();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(handle.is_finished());
        assert!(f.net.motion_count() > 0);
        let dx: i32 = f.net.motions_for(BodyId(1)).iter().map(|u| u.dx as i32).sum();
        assert!(dx > 0 && dx <= 8 * 4096);
    }
}
