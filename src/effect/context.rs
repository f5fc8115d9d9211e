//! Targeting and Throttling Policies
//!
//! Every variant carries only the data it needs and every policy evaluates
//! as a pure function of the variant plus the current world snapshot.

use std::fmt;
use std::sync::Arc;

use crate::core::vec3::Vec3;
use crate::error::{EffectError, Result};
use crate::world::{BodyId, Viewer};

/// Hard cap applied by [`BatchPolicy::Auto`].
pub const AUTO_BATCH_CAP: usize = 512;

/// Fraction of the wanted points kept by the default [`BatchPolicy::Time`].
pub const DEFAULT_TIME_FRACTION: f64 = 0.7;

// =============================================================================
// VIEWER FILTER
// =============================================================================

/// Predicate over a viewer snapshot.
pub type ViewerPredicate = Arc<dyn Fn(&Viewer) -> bool + Send + Sync>;

/// Which viewers receive an effect.
#[derive(Clone, Default)]
pub enum ViewerFilter {
    /// Every connected viewer.
    #[default]
    All,
    /// Viewers within `radius` of `center`.
    Radius {
        /// Sphere center
        center: Vec3,
        /// Sphere radius
        radius: f64,
    },
    /// Viewers accepted by a caller predicate.
    Predicate(ViewerPredicate),
}

impl ViewerFilter {
    /// Build a predicate filter.
    pub fn predicate(f: impl Fn(&Viewer) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Keep the viewers this filter accepts.
    pub fn resolve(&self, viewers: Vec<Viewer>) -> Vec<Viewer> {
        match self {
            ViewerFilter::All => viewers,
            ViewerFilter::Radius { center, radius } => {
                let r2 = radius * radius;
                viewers
                    .into_iter()
                    .filter(|v| v.position.distance_squared(*center) <= r2)
                    .collect()
            }
            ViewerFilter::Predicate(accept) => viewers.into_iter().filter(|v| accept(v)).collect(),
        }
    }
}

impl fmt::Debug for ViewerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerFilter::All => write!(f, "All"),
            ViewerFilter::Radius { center, radius } => f
                .debug_struct("Radius")
                .field("center", center)
                .field("radius", radius)
                .finish(),
            ViewerFilter::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

// =============================================================================
// LOD
// =============================================================================

/// One `(distance, density)` bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodStep {
    /// Bucket distance
    pub distance: f64,
    /// Density multiplier in that bucket
    pub density: f64,
}

/// Density scaling by viewer distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LodPolicy {
    /// Full density.
    #[default]
    Default,
    /// Density of the bucket nearest to the average viewer distance.
    DistanceScale {
        /// Point distances are measured from. `None` uses the effect origin.
        center: Option<Vec3>,
        /// Non-empty bucket list.
        steps: Vec<LodStep>,
    },
}

impl LodPolicy {
    /// Distance-scaled policy from `(distance, density)` pairs.
    pub fn distance_scale(center: Option<Vec3>, steps: &[(f64, f64)]) -> Result<Self> {
        if steps.is_empty() {
            return Err(EffectError::invalid("LOD policy needs at least one step"));
        }
        let steps = steps
            .iter()
            .map(|&(distance, density)| LodStep { distance, density })
            .collect();
        Ok(Self::DistanceScale { center, steps })
    }

    /// Density to render at, given the effect origin and resolved viewers.
    ///
    /// With no viewers the average distance is zero.
    pub fn density(&self, origin: Vec3, viewers: &[Viewer]) -> f64 {
        match self {
            LodPolicy::Default => 1.0,
            LodPolicy::DistanceScale { center, steps } => {
                let from = center.unwrap_or(origin);
                let avg = if viewers.is_empty() {
                    0.0
                } else {
                    viewers.iter().map(|v| v.position.distance(from)).sum::<f64>()
                        / viewers.len() as f64
                };
                steps
                    .iter()
                    .min_by(|a, b| (a.distance - avg).abs().total_cmp(&(b.distance - avg).abs()))
                    .map(|s| s.density)
                    .unwrap_or(1.0)
            }
        }
    }
}

// =============================================================================
// BATCH
// =============================================================================

/// Cap on points emitted per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BatchPolicy {
    /// At most [`AUTO_BATCH_CAP`].
    #[default]
    Auto,
    /// At most `max` points.
    Size(usize),
    /// A fixed fraction of the wanted points.
    Time {
        /// Kept fraction
        fraction: f64,
    },
}

impl BatchPolicy {
    /// Time policy with the default fraction.
    pub fn time() -> Self {
        Self::Time { fraction: DEFAULT_TIME_FRACTION }
    }

    /// Points to emit out of `want`.
    pub fn cap(&self, want: usize) -> usize {
        match *self {
            BatchPolicy::Auto => want.min(AUTO_BATCH_CAP),
            BatchPolicy::Size(max) => want.min(max),
            BatchPolicy::Time { fraction } => {
                ((want as f64 * fraction.clamp(0.0, 1.0)) as usize).min(want)
            }
        }
    }
}

// =============================================================================
// CONTEXTS
// =============================================================================

/// Targeting for a particle effect.
#[derive(Clone, Debug, Default)]
pub struct ParticleContext {
    /// Who sees it
    pub viewers: ViewerFilter,
    /// Distance density scaling
    pub lod: LodPolicy,
    /// Per-tick point cap
    pub batch: BatchPolicy,
}

impl ParticleContext {
    /// Context with the given viewer filter and default LOD and batching.
    pub fn with_viewers(viewers: ViewerFilter) -> Self {
        Self { viewers, ..Default::default() }
    }
}

/// Targeting for an entity effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityContext {
    /// Body that cast the effect; never a collision target
    pub caster: BodyId,
}
