//! Particle effect specification.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::anim::{Timeline, Transform};
use crate::core::vec3::Vec3;
use crate::effect::context::ParticleContext;
use crate::error::{EffectError, Result};
use crate::shape::Shape;
use crate::world::Location;

/// Particle kinds the host knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Flame
    Flame,
    /// Colored dust, honours `color` and `size`
    Dust,
    /// Spell swirl
    Witch,
    /// Small crit star
    Crit,
    /// End rod glow
    EndRod,
}

/// RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color {
    /// Color from components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Render parameters for every emitted point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleParams {
    /// Particle kind
    pub kind: ParticleKind,
    /// Particles per point, before LOD density
    pub count: u32,
    /// Particle speed
    pub speed: f64,
    /// Random spread passed to the renderer
    pub spread: Vec3,
    /// Optional color
    pub color: Option<Color>,
    /// Particle size
    pub size: f32,
}

impl ParticleParams {
    /// One particle per point, no spread, no color, size 1.
    pub fn new(kind: ParticleKind) -> Self {
        Self {
            kind,
            count: 1,
            speed: 0.0,
            spread: Vec3::ZERO,
            color: None,
            size: 1.0,
        }
    }

    /// Particles per point after LOD density. Zero means nothing is sent.
    pub fn scaled_count(&self, density: f64) -> u32 {
        (self.count as f64 * density.max(0.0)).round() as u32
    }
}

/// Lazy origin, evaluated once per tick. `None` means the anchor is gone.
pub type OriginFn = Arc<dyn Fn() -> Option<Location> + Send + Sync>;

/// Immutable description of a particle effect.
#[derive(Clone)]
pub struct ParticleEffectSpec {
    /// Targeting policies
    pub context: ParticleContext,
    /// Lazy anchor
    pub origin: OriginFn,
    /// Offset added to the anchor
    pub offset: Vec3,
    /// Point cloud generator
    pub shape: Shape,
    /// Per-point transform
    pub transform: Transform,
    /// Render parameters
    pub params: ParticleParams,
    /// Timing
    pub timeline: Timeline,
    /// Seed handed to the shape
    pub seed: i64,
}

impl ParticleEffectSpec {
    /// Start a builder.
    pub fn builder() -> ParticleEffectBuilder {
        ParticleEffectBuilder::default()
    }
}

impl fmt::Debug for ParticleEffectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticleEffectSpec")
            .field("context", &self.context)
            .field("offset", &self.offset)
            .field("params", &self.params)
            .field("timeline", &self.timeline)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ParticleEffectSpec`].
#[derive(Default)]
pub struct ParticleEffectBuilder {
    context: ParticleContext,
    origin: Option<OriginFn>,
    offset: Vec3,
    shape: Option<Shape>,
    transform: Option<Transform>,
    params: Option<ParticleParams>,
    timeline: Option<Timeline>,
    seed: Option<i64>,
}

impl ParticleEffectBuilder {
    /// Targeting policies.
    pub fn context(mut self, context: ParticleContext) -> Self {
        self.context = context;
        self
    }

    /// Fixed origin.
    pub fn at(mut self, location: Location) -> Self {
        self.origin = Some(Arc::new(move || Some(location)));
        self
    }

    /// Lazy origin re-evaluated every tick.
    pub fn origin(mut self, f: impl Fn() -> Option<Location> + Send + Sync + 'static) -> Self {
        self.origin = Some(Arc::new(f));
        self
    }

    /// Offset from the origin.
    pub fn offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Point generator.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Per-point transform. Defaults to identity.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Render parameters. Defaults to a single flame per point.
    pub fn params(mut self, params: ParticleParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Timing.
    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Shape seed. Defaults to a random value.
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<ParticleEffectSpec> {
        let origin = self.origin.ok_or_else(|| EffectError::invalid("particle effect needs an origin"))?;
        let shape = self.shape.ok_or_else(|| EffectError::invalid("particle effect needs a shape"))?;
        let timeline = self.timeline.ok_or_else(|| EffectError::invalid("particle effect needs a timeline"))?;
        if !self.offset.is_finite() {
            return Err(EffectError::invalid("particle offset must be finite"));
        }

        Ok(ParticleEffectSpec {
            context: self.context,
            origin,
            offset: self.offset,
            shape,
            transform: self.transform.unwrap_or_default(),
            params: self.params.unwrap_or(ParticleParams::new(ParticleKind::Flame)),
            timeline,
            seed: self.seed.unwrap_or_else(random_seed),
        })
    }
}

/// Fresh seed from a v4 uuid.
fn random_seed() -> i64 {
    let (hi, lo) = uuid::Uuid::new_v4().as_u64_pair();
    (hi ^ lo) as i64
}
