//! Entity effect specification.
//!
//! An entity effect carries a proxy body along an analytic path and fires
//! attack/extra callbacks the first time the path sweeps over each target.

use std::fmt;
use std::sync::Arc;

use crate::anim::{Timeline, Transform};
use crate::core::vec3::Vec3;
use crate::effect::context::EntityContext;
use crate::error::{EffectError, Result};
use crate::world::{BodyId, Location, ProxyFlags, ProxyKind, World};

/// Bodies involved in a hit. Passed to attack and extra callbacks.
pub struct HitContext<'a> {
    /// Body that cast the effect
    pub caster: BodyId,
    /// The effect's proxy body
    pub proxy: BodyId,
    /// Body that was hit
    pub target: BodyId,
    /// Host world, for callbacks that mutate it
    pub world: &'a dyn World,
}

/// Side-effecting hit callback. Runs on the tick thread.
///
/// An `Err` or a panic is logged; other effects keep ticking.
pub type HitCallback = Arc<dyn Fn(&HitContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Hitbox radius as a function of eased progress.
pub type HitboxFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// External rig to bind to the proxy body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RigSpec {
    /// Model id
    pub model: String,
    /// Animation to play once attached
    pub animation: Option<String>,
}

impl RigSpec {
    /// Rig with no animation.
    pub fn model(model: impl Into<String>) -> Self {
        Self { model: model.into(), animation: None }
    }

    /// Play `animation` once attached.
    pub fn with_animation(mut self, animation: impl Into<String>) -> Self {
        self.animation = Some(animation.into());
        self
    }
}

/// Physical and combat parameters.
#[derive(Clone)]
pub struct EntityParams {
    /// Host gravity applies to the proxy
    pub gravity: bool,
    /// Proxy is rendered
    pub visible: bool,
    /// Small proxy variant
    pub small: bool,
    /// Proxy takes part in host collision
    pub collidable: bool,
    /// Nominal speed. Informational; the analytic path alone drives motion
    pub speed: f64,
    /// First callback on hit
    pub attack: HitCallback,
    /// Second callback on hit
    pub extra: HitCallback,
    /// Hitbox radius at progress `t`
    pub hitbox: HitboxFn,
    /// Optional rig binding
    pub rig: Option<RigSpec>,
}

impl EntityParams {
    /// Flags for spawning the proxy.
    pub fn proxy_flags(&self) -> ProxyFlags {
        ProxyFlags {
            visible: self.visible,
            small: self.small,
            collidable: self.collidable,
            gravity: self.gravity,
        }
    }

    /// Replace the attack callback.
    pub fn on_attack(mut self, f: impl Fn(&HitContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        self.attack = Arc::new(f);
        self
    }

    /// Replace the extra callback.
    pub fn on_extra(mut self, f: impl Fn(&HitContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        self.extra = Arc::new(f);
        self
    }

    /// Replace the hitbox function.
    pub fn with_hitbox(mut self, f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        self.hitbox = Arc::new(f);
        self
    }

    /// Constant hitbox radius.
    pub fn with_fixed_hitbox(self, radius: f64) -> Self {
        self.with_hitbox(move |_| radius)
    }

    /// Bind a rig.
    pub fn with_rig(mut self, rig: RigSpec) -> Self {
        self.rig = Some(rig);
        self
    }
}

impl Default for EntityParams {
    fn default() -> Self {
        Self {
            gravity: false,
            visible: true,
            small: false,
            collidable: false,
            speed: 0.1,
            attack: Arc::new(|_| Ok(())),
            extra: Arc::new(|_| Ok(())),
            hitbox: Arc::new(|_| 0.0),
            rig: None,
        }
    }
}

impl fmt::Debug for EntityParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityParams")
            .field("gravity", &self.gravity)
            .field("visible", &self.visible)
            .field("small", &self.small)
            .field("collidable", &self.collidable)
            .field("speed", &self.speed)
            .field("rig", &self.rig)
            .finish_non_exhaustive()
    }
}

/// Immutable description of an entity effect.
#[derive(Clone, Debug)]
pub struct EntityEffectSpec {
    /// Caster
    pub context: EntityContext,
    /// Host body type of the proxy
    pub proxy_kind: ProxyKind,
    /// Spawn location; its yaw defines the local frame
    pub origin: Location,
    /// Local-frame offset from the origin
    pub offset: Vec3,
    /// Drives the analytic path through `translate(t)`
    pub transform: Transform,
    /// Physical and combat parameters
    pub params: EntityParams,
    /// Timing
    pub timeline: Timeline,
}

impl EntityEffectSpec {
    /// Start a builder for an effect cast by `caster`.
    pub fn builder(caster: BodyId) -> EntityEffectBuilder {
        EntityEffectBuilder {
            context: EntityContext { caster },
            proxy_kind: ProxyKind::default(),
            origin: None,
            offset: Vec3::ZERO,
            transform: Transform::identity(),
            params: EntityParams::default(),
            timeline: None,
        }
    }
}

/// Builder for [`EntityEffectSpec`].
pub struct EntityEffectBuilder {
    context: EntityContext,
    proxy_kind: ProxyKind,
    origin: Option<Location>,
    offset: Vec3,
    transform: Transform,
    params: EntityParams,
    timeline: Option<Timeline>,
}

impl EntityEffectBuilder {
    /// Body type the proxy spawns as. Defaults to [`ProxyKind::Marker`].
    pub fn proxy_kind(mut self, kind: ProxyKind) -> Self {
        self.proxy_kind = kind;
        self
    }

    /// Spawn location.
    pub fn origin(mut self, origin: Location) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Local-frame offset.
    pub fn offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Path transform.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Physical and combat parameters.
    pub fn params(mut self, params: EntityParams) -> Self {
        self.params = params;
        self
    }

    /// Timing.
    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<EntityEffectSpec> {
        let origin = self.origin.ok_or_else(|| EffectError::invalid("entity effect needs an origin"))?;
        let timeline = self.timeline.ok_or_else(|| EffectError::invalid("entity effect needs a timeline"))?;
        if !origin.position.is_finite() || !self.offset.is_finite() {
            return Err(EffectError::invalid("entity origin and offset must be finite"));
        }
        if let ProxyKind::Named(name) = &self.proxy_kind {
            if name.is_empty() {
                return Err(EffectError::invalid("proxy body type name is empty"));
            }
        }
        if let Some(rig) = &self.params.rig {
            if rig.model.is_empty() {
                return Err(EffectError::invalid("rig model id is empty"));
            }
        }

        Ok(EntityEffectSpec {
            context: self.context,
            proxy_kind: self.proxy_kind,
            origin,
            offset: self.offset,
            transform: self.transform,
            params: self.params,
            timeline,
        })
    }
}
