//! Procedural Shapes
//!
//! A shape maps `(progress, seed)` to an ordered point cloud in local space.
//! Generators hold no per-call state: the same inputs always give the same
//! points, so a shape can be evaluated from any thread at any tick.
//!
//! - `primitives`: line, circle, sphere, Bézier curve
//! - `scatter`: seeded pseudo-random cloud

pub mod primitives;
pub mod scatter;

use std::sync::Arc;

use crate::core::vec3::Vec3;

pub use primitives::{Bezier, Circle, Line, Sphere};
pub use scatter::Scatter;

/// Pure point generator.
pub trait PointGenerator: Send + Sync {
    /// Points for one evaluation.
    fn points(&self, progress: f64, seed: i64) -> Vec<Vec3>;
}

impl<F> PointGenerator for F
where
    F: Fn(f64, i64) -> Vec<Vec3> + Send + Sync,
{
    fn points(&self, progress: f64, seed: i64) -> Vec<Vec3> {
        self(progress, seed)
    }
}

/// Shared handle to any shape.
pub type Shape = Arc<dyn PointGenerator>;

/// Box a generator into a [`Shape`].
pub fn shape(generator: impl PointGenerator + 'static) -> Shape {
    Arc::new(generator)
}
