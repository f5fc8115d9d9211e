//! Seeded pseudo-random point cloud.

use crate::core::rng::ShapeRng;
use crate::core::vec3::Vec3;
use crate::shape::PointGenerator;

/// `count` points uniformly inside a sphere.
///
/// The cloud re-rolls whenever progress changes, and is identical for the
/// same `(progress, seed)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scatter {
    radius: f64,
    count: u32,
}

impl Scatter {
    /// Create a scatter cloud.
    pub fn new(radius: f64, count: u32) -> Self {
        Self { radius, count }
    }
}

impl PointGenerator for Scatter {
    fn points(&self, progress: f64, seed: i64) -> Vec<Vec3> {
        let mut rng = ShapeRng::for_sample(seed, progress);
        (0..self.count).map(|_| rng.point_in_sphere(self.radius)).collect()
    }
}
