//! Entity Shard
//!
//! A bounded bucket of entity effects sharing one frame-clock task.
//!
//! ```text
//!            ┌──────────────────── one frame, one time budget ────────────────────┐
//!  inbox ──► │ intake │ 1. apply phase (FIFO)       │ 2. slice (round robin)  │ prune │
//!            └────────┴─────────────▲───────────────┴───────────┬─────────────┴───────┘
//!                                   │                           │ motion jobs
//!                            apply queue ◄──── compute pool ◄───┘
//! ```
//!
//! Only the tick thread touches the active list and applies queued jobs, so
//! every proxy-body mutation and every hit callback runs on it. Compute
//! workers read a copy of what they need and answer through the apply queue.
//!
//! Membership is counted separately from the active list: it is incremented
//! when a submission reserves a slot and decremented exactly once when the
//! effect leaves its registry entry, by cancellation or by ending. A shard
//! whose membership drops to zero flushes its apply queue and stops.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::quant::Quantizer;
use crate::core::vec3::Vec3;
use crate::effect::entity::{EntityEffectSpec, HitCallback, HitContext};
use crate::effect::handle::{EffectId, EffectStatus};
use crate::engine::clock::{FrameClock, TaskHandle, TaskStatus};
use crate::engine::collision::{new_hits, Aabb, HitLedger};
use crate::engine::motion::{LookTracker, MotionSample};
use crate::engine::pool::ComputePool;
use crate::network::Broadcaster;
use crate::world::{BodyId, RigBinder, World};

// =============================================================================
// SHARED CONTEXT
// =============================================================================

/// Where a live effect is registered. Removing the entry is what ends
/// membership, so it happens exactly once per effect.
pub(crate) struct Registration {
    pub shard: Weak<Shard>,
    pub body: BodyId,
    pub rig: bool,
    pub status: Arc<EffectStatus>,
}

/// Collaborators and settings shared by every shard of one engine.
pub(crate) struct ShardContext {
    pub config: EngineConfig,
    pub quantizer: Quantizer,
    pub world: Arc<dyn World>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub rigs: Option<Arc<dyn RigBinder>>,
    pub pool: ComputePool,
    pub registry: Mutex<HashMap<EffectId, Registration>>,
}

impl ShardContext {
    pub fn new(
        config: EngineConfig,
        world: Arc<dyn World>,
        broadcaster: Arc<dyn Broadcaster>,
        rigs: Option<Arc<dyn RigBinder>>,
        pool: ComputePool,
    ) -> Self {
        let quantizer = Quantizer::new(config.quantization_scale, config.carry_quantization_remainder);
        Self {
            config,
            quantizer,
            world,
            broadcaster,
            rigs,
            pool,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn detach_rig(&self, body: BodyId) {
        if let Some(rigs) = &self.rigs {
            rigs.detach(body);
        }
    }

    /// Drop the registry entry for `id`. True if this call removed it.
    fn deregister(&self, id: EffectId) -> bool {
        self.registry.lock().remove(&id).is_some()
    }
}

// =============================================================================
// RUNTIME STATE
// =============================================================================

/// Mutable state of one running entity effect. Owned by its shard.
pub(crate) struct ActiveEffect {
    pub id: EffectId,
    pub spec: Arc<EntityEffectSpec>,
    pub body: BodyId,
    pub rig: bool,
    pub status: Arc<EffectStatus>,
    pub local_tick: u32,
    pub last_analytic: Vec3,
    remainder: Vec3,
    hits: HitLedger,
    look: LookTracker,
    body_lost: bool,
}

impl ActiveEffect {
    pub fn new(id: EffectId, spec: Arc<EntityEffectSpec>, body: BodyId, rig: bool, status: Arc<EffectStatus>) -> Self {
        // The proxy spawns at the origin, so the first delta is measured from there
        let last_analytic = spec.origin.position;
        Self {
            id,
            spec,
            body,
            rig,
            status,
            local_tick: 0,
            last_analytic,
            remainder: Vec3::ZERO,
            hits: HitLedger::default(),
            look: LookTracker::default(),
            body_lost: false,
        }
    }
}

/// Deferred mutation, applied on the tick thread in FIFO order.
enum ApplyJob {
    /// Result of an offloaded motion computation
    Motion {
        effect: EffectId,
        t: f64,
        sample: MotionSample,
    },
    /// Re-zero the proxy's authoritative velocity
    Freeze(BodyId),
    /// Remove a finished effect's proxy
    Despawn { body: BodyId, rig: bool },
}

#[derive(Default)]
struct ShardState {
    actives: Vec<ActiveEffect>,
    cursor: usize,
}

// =============================================================================
// SHARD
// =============================================================================

/// A bounded group of entity effects ticked by one frame-clock task.
pub(crate) struct Shard {
    id: usize,
    ctx: Arc<ShardContext>,
    state: Mutex<ShardState>,
    inbox_tx: Sender<ActiveEffect>,
    inbox_rx: Receiver<ActiveEffect>,
    apply_tx: Sender<ApplyJob>,
    apply_rx: Receiver<ApplyJob>,
    members: AtomicUsize,
    task: Mutex<Option<TaskHandle>>,
}

impl Shard {
    /// Create a shard holding one reserved slot and start its task.
    pub fn start(id: usize, ctx: Arc<ShardContext>, clock: &FrameClock) -> Arc<Self> {
        let (inbox_tx, inbox_rx) = unbounded();
        let (apply_tx, apply_rx) = unbounded();
        let shard = Arc::new(Self {
            id,
            ctx,
            state: Mutex::new(ShardState::default()),
            inbox_tx,
            inbox_rx,
            apply_tx,
            apply_rx,
            members: AtomicUsize::new(1),
            task: Mutex::new(None),
        });

        let weak = Arc::downgrade(&shard);
        let handle = clock.schedule(move || match weak.upgrade() {
            Some(shard) => shard.tick(),
            None => TaskStatus::Stop,
        });
        *shard.task.lock() = Some(handle);
        info!("Shard {} started", id);
        shard
    }

    /// Shard number, unique per engine.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Reserved plus active members.
    pub fn members(&self) -> usize {
        self.members.load(Ordering::Acquire)
    }

    /// Whether the tick task is alive.
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| h.is_running())
    }

    /// Reserve a slot if the shard is running and has spare capacity.
    pub fn try_reserve(&self) -> bool {
        let task = self.task.lock();
        let running = task.as_ref().is_some_and(|h| h.is_running());
        if running && self.members.load(Ordering::Acquire) < self.ctx.config.shard_capacity {
            self.members.fetch_add(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    /// Give up one slot. Called once per ended registration.
    pub fn release_member(&self) {
        let _ = self
            .members
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Hand an effect to the tick thread. It joins the active list at the
    /// start of the next tick.
    pub fn admit(&self, active: ActiveEffect) {
        if let Err(rejected) = self.inbox_tx.send(active) {
            warn!("Shard {} inbox closed, dropping effect {}", self.id, rejected.0.id);
        }
    }

    /// One frame.
    fn tick(&self) -> TaskStatus {
        let started = Instant::now();
        let budget = self.ctx.config.time_budget();
        let mut state = self.state.lock();

        for active in self.inbox_rx.try_iter() {
            // Cancelled before it ever ran
            if !active.status.is_finished() {
                state.actives.push(active);
            }
        }

        if self.members() == 0 && self.try_stop(&mut state) {
            return TaskStatus::Stop;
        }

        // 1) apply phase, always at least the oldest job
        let mut applied = 0;
        while applied == 0 || started.elapsed() <= budget {
            let Ok(job) = self.apply_rx.try_recv() else { break };
            self.apply(&mut state, job);
            applied += 1;
        }
        if !self.apply_rx.is_empty() {
            debug!("Shard {} over budget, {} apply jobs deferred", self.id, self.apply_rx.len());
        }

        // 2) slice phase
        self.slice(&mut state, started, budget);
        self.prune(&mut state);

        if self.members() == 0 && self.try_stop(&mut state) {
            return TaskStatus::Stop;
        }
        TaskStatus::Continue
    }

    fn slice(&self, state: &mut ShardState, started: Instant, budget: Duration) {
        let limit = self.ctx.config.batch_size_per_tick.min(state.actives.len());
        for visited in 0..limit {
            // At least one effect steps per tick
            if visited > 0 && started.elapsed() > budget {
                debug!("Shard {} over budget after {} of {} effects", self.id, visited, limit);
                break;
            }
            if state.cursor >= state.actives.len() {
                state.cursor = 0;
            }
            let idx = state.cursor;
            state.cursor += 1;
            self.advance(&mut state.actives[idx]);
        }
    }

    fn advance(&self, active: &mut ActiveEffect) {
        if active.status.is_finished() {
            return;
        }
        if !self.ctx.world.is_body_valid(active.body) {
            // Removed behind our back: ends without callbacks
            debug!("Effect {} lost its proxy {}", active.id, active.body);
            active.body_lost = true;
            active.status.finish();
            return;
        }

        let config = &self.ctx.config;
        let timeline = &active.spec.timeline;
        let t = timeline.progress(active.local_tick);

        if active.local_tick % config.client_sync_interval_ticks == 0 {
            self.submit_motion(active, t);
        }
        if active.local_tick % config.physics_freeze_interval_ticks == 0 {
            self.enqueue(ApplyJob::Freeze(active.body));
        }

        active.local_tick += 1;
        if timeline.is_complete(active.local_tick) {
            active.status.finish();
            self.enqueue(ApplyJob::Despawn { body: active.body, rig: active.rig });
            debug!("Effect {} finished after {} ticks", active.id, active.local_tick);
        }
    }

    fn submit_motion(&self, active: &ActiveEffect, t: f64) {
        let effect = active.id;
        let spec = active.spec.clone();
        let status = active.status.clone();
        let prev = active.last_analytic;
        let remainder = active.remainder;
        let quantizer = self.ctx.quantizer;
        let apply_tx = self.apply_tx.clone();

        self.ctx.pool.submit(move || {
            if status.is_finished() {
                return;
            }
            let sample = MotionSample::compute(&spec, t, prev, remainder, &quantizer);
            if status.is_finished() {
                return;
            }
            // Receiver gone means the shard is gone
            let _ = apply_tx.send(ApplyJob::Motion { effect, t, sample });
        });
    }

    fn enqueue(&self, job: ApplyJob) {
        // Both ends live in `self`
        let _ = self.apply_tx.send(job);
    }

    fn apply(&self, state: &mut ShardState, job: ApplyJob) {
        let world = &self.ctx.world;
        match job {
            ApplyJob::Freeze(body) => {
                if world.is_body_valid(body) {
                    world.freeze_body(body);
                }
            }
            ApplyJob::Despawn { body, rig } => {
                world.remove_body(body);
                if rig {
                    self.ctx.detach_rig(body);
                }
            }
            ApplyJob::Motion { effect, t, sample } => {
                let Some(active) = state.actives.iter_mut().find(|a| a.id == effect) else {
                    return;
                };
                if active.status.is_finished() || !world.is_body_valid(active.body) {
                    return;
                }
                self.apply_motion(active, t, sample);
            }
        }
    }

    fn apply_motion(&self, active: &mut ActiveEffect, t: f64, sample: MotionSample) {
        let sample = if sample.prev == active.last_analytic {
            sample
        } else {
            // An earlier result landed after this one was computed
            let hitbox = (active.spec.params.hitbox)(t);
            MotionSample::between(active.last_analytic, sample.now, active.remainder, hitbox, &self.ctx.quantizer)
        };

        self.send_motion(active, &sample);
        self.collide(active, &sample.swept);

        active.last_analytic = sample.now;
        active.remainder = sample.remainder;
    }

    fn send_motion(&self, active: &mut ActiveEffect, sample: &MotionSample) {
        let config = &self.ctx.config;
        if sample.delta.is_suppressed(config.quantization_scale, config.suppression_epsilon) {
            return;
        }
        let Some(facing) = self.ctx.world.body_location(active.body) else {
            return;
        };
        let viewers = self.ctx.world.viewers_near(facing.position, config.tracking_range_sq());
        if viewers.is_empty() {
            return;
        }
        let update = active.look.update(active.body, sample.delta, &facing, config.look_only_on_change);
        self.ctx.broadcaster.send_motion(&viewers, &update);
    }

    fn collide(&self, active: &mut ActiveEffect, swept: &Aabb) {
        let world = self.ctx.world.as_ref();
        let candidates = world.bodies_in(swept, active.body);
        if candidates.is_empty() {
            return;
        }

        let caster = active.spec.context.caster;
        for target in new_hits(&candidates, caster, &mut active.hits) {
            let hit = HitContext { caster, proxy: active.body, target, world };
            run_callback("attack", active.id, &active.spec.params.attack, &hit);
            run_callback("extra", active.id, &active.spec.params.extra, &hit);
        }
    }

    fn prune(&self, state: &mut ShardState) {
        state.actives.retain(|active| {
            if !active.status.is_finished() {
                return true;
            }
            if active.body_lost && active.rig {
                self.ctx.detach_rig(active.body);
            }
            if self.ctx.deregister(active.id) {
                self.release_member();
            }
            false
        });
    }

    /// Stop if nothing is reserved or active. Flushes pending jobs first so
    /// finished proxies are still despawned.
    fn try_stop(&self, state: &mut ShardState) -> bool {
        let mut task = self.task.lock();
        if self.members() != 0 {
            return false;
        }

        while let Ok(job) = self.apply_rx.try_recv() {
            self.apply(state, job);
        }
        state.actives.clear();
        state.cursor = 0;
        if let Some(handle) = task.take() {
            handle.cancel();
        }
        info!("Shard {} stopped", self.id);
        true
    }

    /// Cancel every effect and stop the task immediately.
    ///
    /// Runs on the caller's thread. Must not be called from a hit callback.
    pub fn stop_all(&self) {
        let mut state = self.state.lock();
        let mut task = self.task.lock();
        if let Some(handle) = task.take() {
            handle.cancel();
        }
        self.members.store(0, Ordering::Release);

        let world = &self.ctx.world;
        let pending: Vec<ActiveEffect> = self.inbox_rx.try_iter().collect();
        for active in state.actives.drain(..).chain(pending) {
            active.status.cancel();
            world.remove_body(active.body);
            if active.rig {
                self.ctx.detach_rig(active.body);
            }
        }
        state.cursor = 0;

        for job in self.apply_rx.try_iter() {
            if let ApplyJob::Despawn { body, rig } = job {
                world.remove_body(body);
                if rig {
                    self.ctx.detach_rig(body);
                }
            }
        }
        info!("Shard {} stopped with all effects", self.id);
    }

    #[cfg(test)]
    pub(crate) fn local_ticks(&self) -> Vec<u32> {
        self.state.lock().actives.iter().map(|a| a.local_tick).collect()
    }
}

/// Run one hit callback behind a guard. Failures are logged, never raised.
fn run_callback(which: &str, effect: EffectId, callback: &HitCallback, hit: &HitContext<'_>) {
    match catch_unwind(AssertUnwindSafe(|| callback(hit))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{} callback of effect {} failed on {}: {:#}", which, effect, hit.target, e),
        Err(_) => warn!("{} callback of effect {} panicked on {}", which, effect, hit.target),
    }
}
