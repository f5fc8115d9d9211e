//! Particle Effect Engine
//!
//! One frame-clock task per effect. Each tick resolves the origin and the
//! audience, scales density by viewer distance, caps the batch and emits one
//! render instruction per point.
//!
//! ```text
//! origin() ─► None ─────────────────────────────► skip, keep ticking
//!    │
//!    ▼
//! viewers ─► empty ─────────────────────────────► skip, keep ticking
//!    │
//!    ▼
//! shape(t, seed) ─► density ─► batch cap ─► base + transform(p, t) ─► send
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::effect::handle::{Canceller, EffectHandle, EffectId, EffectKind, EffectStatus};
use crate::effect::particle::ParticleEffectSpec;
use crate::engine::clock::{FrameClock, TaskHandle, TaskStatus};
use crate::error::{EffectError, Result};
use crate::network::{Broadcaster, ParticleRender};
use crate::world::{ViewerId, World};

struct Entry {
    task: TaskHandle,
    status: Arc<EffectStatus>,
}

struct ParticleInner {
    clock: Arc<FrameClock>,
    world: Arc<dyn World>,
    broadcaster: Arc<dyn Broadcaster>,
    active: Mutex<HashMap<EffectId, Entry>>,
    stopped: AtomicBool,
}

/// Scheduler for render-only particle effects.
pub struct ParticleEngine {
    inner: Arc<ParticleInner>,
}

impl ParticleEngine {
    /// Engine ticking on `clock`.
    pub fn new(clock: Arc<FrameClock>, world: Arc<dyn World>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            inner: Arc::new(ParticleInner {
                clock,
                world,
                broadcaster,
                active: Mutex::new(HashMap::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Schedule `spec`. Its first tick runs on the next frame.
    pub fn play(&self, spec: ParticleEffectSpec) -> Result<EffectHandle> {
        let inner = &self.inner;
        if inner.stopped.load(Ordering::Acquire) {
            return Err(EffectError::EngineStopped);
        }

        let id = EffectId::new();
        let status = Arc::new(EffectStatus::default());
        let mut runner = Runner {
            id,
            spec,
            local_tick: 0,
            status: status.clone(),
            world: inner.world.clone(),
            broadcaster: inner.broadcaster.clone(),
            owner: Arc::downgrade(inner),
        };

        {
            // Held across scheduling so a runner that ends on its first
            // frame always finds its own entry
            let mut active = inner.active.lock();
            let task = inner.clock.schedule(move || runner.tick());
            active.insert(id, Entry { task, status: status.clone() });
        }
        debug!("Particle effect {} scheduled", id);

        let weak = Arc::downgrade(inner);
        let canceller: Weak<dyn Canceller> = weak;
        Ok(EffectHandle::new(id, EffectKind::Particle, status, canceller))
    }

    /// Cancel one effect by id. Unknown or ended ids are ignored.
    pub fn cancel(&self, id: EffectId) {
        self.inner.cancel_effect(id);
    }

    /// Cancel every running effect.
    pub fn cancel_all(&self) {
        let entries: Vec<Entry> = self.inner.active.lock().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.status.cancel();
            entry.task.cancel();
        }
    }

    /// Cancel everything and refuse further submissions.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.cancel_all();
        info!("Particle engine stopped");
    }

    /// Effects scheduled and not yet ended.
    pub fn active_effects(&self) -> usize {
        self.inner.active.lock().len()
    }
}

impl Canceller for ParticleInner {
    fn cancel_effect(&self, id: EffectId) {
        let Some(entry) = self.active.lock().remove(&id) else {
            return;
        };
        entry.status.cancel();
        entry.task.cancel();
        debug!("Particle effect {} cancelled", id);
    }
}

/// Per-effect state, owned by its clock task.
struct Runner {
    id: EffectId,
    spec: ParticleEffectSpec,
    local_tick: u32,
    status: Arc<EffectStatus>,
    world: Arc<dyn World>,
    broadcaster: Arc<dyn Broadcaster>,
    owner: Weak<ParticleInner>,
}

impl Runner {
    fn tick(&mut self) -> TaskStatus {
        if self.status.is_finished() {
            return TaskStatus::Stop;
        }

        let t = self.spec.timeline.progress(self.local_tick);
        self.emit(t);

        self.local_tick += 1;
        if self.spec.timeline.is_complete(self.local_tick) {
            self.status.finish();
            if let Some(owner) = self.owner.upgrade() {
                owner.active.lock().remove(&self.id);
            }
            debug!("Particle effect {} finished after {} ticks", self.id, self.local_tick);
            return TaskStatus::Stop;
        }
        TaskStatus::Continue
    }

    /// Emit one frame. Returns the number of render instructions sent.
    fn emit(&self, t: f64) -> usize {
        let spec = &self.spec;
        let Some(origin) = (spec.origin)() else {
            return 0;
        };

        let viewers = spec.context.viewers.resolve(self.world.viewers());
        if viewers.is_empty() {
            return 0;
        }

        let density = spec.context.lod.density(origin.position, &viewers);
        let count = spec.params.scaled_count(density);
        if count == 0 {
            return 0;
        }

        let points = spec.shape.points(t, spec.seed);
        let cap = spec.context.batch.cap(points.len());
        let base = origin.position + spec.offset;
        let targets: Vec<ViewerId> = viewers.iter().map(|v| v.id).collect();

        for point in points.iter().take(cap) {
            let position = base + spec.transform.apply(*point, t);
            #[cfg(feature = "debug-tracing")]
            tracing::trace!("Effect {} point at {:?} (t = {:.3})", self.id, position, t);
            let render = ParticleRender::new(&spec.params, position, count);
            self.broadcaster.send_particles(&targets, &render);
        }
        cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::Timeline;
    use crate::core::vec3::Vec3;
    use crate::effect::context::{BatchPolicy, LodPolicy, ParticleContext, ViewerFilter};
    use crate::effect::particle::{ParticleKind, ParticleParams};
    use crate::network::{RecordingBroadcaster, Sent};
    use crate::shape::primitives::Circle;
    use crate::shape::shape;
    use crate::world::{InMemoryWorld, Location};
    use std::sync::atomic::AtomicBool;

    struct Fixture {
        clock: Arc<FrameClock>,
        world: Arc<InMemoryWorld>,
        net: Arc<RecordingBroadcaster>,
        engine: ParticleEngine,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FrameClock::new());
        let world = Arc::new(InMemoryWorld::new());
        let net = Arc::new(RecordingBroadcaster::new());
        let engine = ParticleEngine::new(clock.clone(), world.clone(), net.clone());
        world.set_viewer(ViewerId(1), Vec3::new(0.0, 64.0, 3.0));
        Fixture { clock, world, net, engine }
    }

    fn ring(context: ParticleContext, samples: u32, duration: u32) -> ParticleEffectSpec {
        ParticleEffectSpec::builder()
            .context(context)
            .at(Location::at(Vec3::new(0.0, 64.0, 0.0)))
            .shape(shape(Circle::new(2.0, samples).unwrap()))
            .params(ParticleParams::new(ParticleKind::Dust))
            .timeline(Timeline::linear(duration).unwrap())
            .seed(42)
            .build()
            .unwrap()
    }

    #[test]
    fn test_ring_runs_for_its_duration() {
        let f = fixture();
        let handle = f.engine.play(ring(ParticleContext::default(), 96, 40)).unwrap();
        assert_eq!(f.engine.active_effects(), 1);

        for _ in 0..40 {
            f.clock.advance();
            assert_eq!(f.net.drain().len(), 96);
        }
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
        assert_eq!(f.engine.active_effects(), 0);

        f.clock.advance();
        assert_eq!(f.net.particle_count(), 0);
        assert_eq!(f.clock.active_tasks(), 0);
    }

    #[test]
    fn test_points_are_offset_from_origin() {
        let f = fixture();
        let spec = ParticleEffectSpec::builder()
            .at(Location::at(Vec3::new(10.0, 64.0, 10.0)))
            .offset(Vec3::new(0.0, 1.0, 0.0))
            .shape(shape(Circle::new(2.0, 4).unwrap()))
            .timeline(Timeline::linear(1).unwrap())
            .build()
            .unwrap();
        f.engine.play(spec).unwrap();
        f.clock.advance();

        for sent in f.net.sent() {
            let Sent::Particles(viewers, render) = sent else {
                panic!("unexpected motion update");
            };
            assert_eq!(viewers, vec![ViewerId(1)]);
            let local = render.position - Vec3::new(10.0, 65.0, 10.0);
            assert!((local.length() - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_origin_skips_frame() {
        let f = fixture();
        let anchored = Arc::new(AtomicBool::new(false));
        let a = anchored.clone();
        let spec = ParticleEffectSpec::builder()
            .origin(move || a.load(Ordering::SeqCst).then(Location::default))
            .shape(shape(Circle::new(1.0, 8).unwrap()))
            .timeline(Timeline::linear(4).unwrap())
            .build()
            .unwrap();
        let handle = f.engine.play(spec).unwrap();

        f.clock.advance();
        f.clock.advance();
        assert_eq!(f.net.particle_count(), 0);
        anchored.store(true, Ordering::SeqCst);
        f.clock.advance();
        assert_eq!(f.net.particle_count(), 8);
        f.clock.advance();
        assert!(handle.is_finished());
    }

    #[test]
    fn test_viewer_filter_and_empty_audience() {
        let f = fixture();
        let far = ParticleContext::with_viewers(ViewerFilter::Radius {
            center: Vec3::new(0.0, 64.0, 0.0),
            radius: 1.0,
        });
        let handle = f.engine.play(ring(far, 16, 3)).unwrap();
        for _ in 0..3 {
            f.clock.advance();
        }
        assert_eq!(f.net.particle_count(), 0);
        assert!(handle.is_finished());

        f.world.remove_viewer(ViewerId(1));
        f.engine.play(ring(ParticleContext::default(), 16, 1)).unwrap();
        f.clock.advance();
        assert_eq!(f.net.particle_count(), 0);
    }

    #[test]
    fn test_batch_and_lod_limits() {
        let f = fixture();
        let capped = ParticleContext { batch: BatchPolicy::Size(10), ..Default::default() };
        f.engine.play(ring(capped, 96, 1)).unwrap();
        f.clock.advance();
        assert_eq!(f.net.drain().len(), 10);

        let timed = ParticleContext { batch: BatchPolicy::time(), ..Default::default() };
        f.engine.play(ring(timed, 100, 1)).unwrap();
        f.clock.advance();
        assert_eq!(f.net.drain().len(), 70);

        // Viewer 3 units away lands in the zero-density bucket
        let lod = ParticleContext {
            lod: LodPolicy::distance_scale(None, &[(0.0, 0.0), (32.0, 1.0)]).unwrap(),
            ..Default::default()
        };
        f.engine.play(ring(lod, 96, 1)).unwrap();
        f.clock.advance();
        assert_eq!(f.net.particle_count(), 0);
    }

    #[test]
    fn test_density_scales_count() {
        let f = fixture();
        let mut params = ParticleParams::new(ParticleKind::Crit);
        params.count = 4;
        let spec = ParticleEffectSpec::builder()
            .context(ParticleContext {
                lod: LodPolicy::distance_scale(None, &[(3.0, 0.5)]).unwrap(),
                ..Default::default()
            })
            .at(Location::at(Vec3::new(0.0, 64.0, 0.0)))
            .shape(shape(Circle::new(1.0, 2).unwrap()))
            .params(params)
            .timeline(Timeline::linear(1).unwrap())
            .build()
            .unwrap();
        f.engine.play(spec).unwrap();
        f.clock.advance();

        let counts: Vec<u32> = f
            .net
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Particles(_, r) => Some(r.count),
                Sent::Motion(..) => None,
            })
            .collect();
        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn test_cancel_and_stop() {
        let f = fixture();
        let handle = f.engine.play(ring(ParticleContext::default(), 8, 100)).unwrap();
        f.clock.advance();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(f.engine.active_effects(), 0);

        f.net.clear();
        f.clock.advance();
        assert_eq!(f.net.particle_count(), 0);

        f.engine.play(ring(ParticleContext::default(), 8, 100)).unwrap();
        f.engine.stop();
        assert_eq!(f.engine.active_effects(), 0);
        assert!(matches!(
            f.engine.play(ring(ParticleContext::default(), 8, 100)),
            Err(EffectError::EngineStopped)
        ));
    }
}
