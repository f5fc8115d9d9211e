//! Per-point spatial transform driven by progress.

use std::fmt;
use std::sync::Arc;

use crate::core::vec3::{Rotation, Vec3};

/// A pure function of progress producing a vector.
pub type ProgressFn = Arc<dyn Fn(f64) -> Vec3 + Send + Sync>;

/// Scale, rotate and translate as functions of eased progress.
///
/// Applied per point in that order: component-wise scale, then rotate the
/// local up axis onto `rotate(t)`, then add `translate(t)`.
#[derive(Clone)]
pub struct Transform {
    scale: ProgressFn,
    rotate: ProgressFn,
    translate: ProgressFn,
}

impl Transform {
    /// Unit scale, no rotation, no translation.
    pub fn identity() -> Self {
        Self {
            scale: Arc::new(|_| Vec3::ONE),
            rotate: Arc::new(|_| Vec3::UP),
            translate: Arc::new(|_| Vec3::ZERO),
        }
    }

    /// Replace the scale function.
    pub fn with_scale(mut self, f: impl Fn(f64) -> Vec3 + Send + Sync + 'static) -> Self {
        self.scale = Arc::new(f);
        self
    }

    /// Replace the rotate function. Its output is a target direction for the
    /// local up axis, not an angle. A zero vector means no rotation.
    pub fn with_rotate(mut self, f: impl Fn(f64) -> Vec3 + Send + Sync + 'static) -> Self {
        self.rotate = Arc::new(f);
        self
    }

    /// Replace the translate function.
    pub fn with_translate(mut self, f: impl Fn(f64) -> Vec3 + Send + Sync + 'static) -> Self {
        self.translate = Arc::new(f);
        self
    }

    /// Scale at `t`.
    #[inline]
    pub fn scale(&self, t: f64) -> Vec3 {
        (self.scale)(t)
    }

    /// Target up direction at `t`.
    #[inline]
    pub fn rotate(&self, t: f64) -> Vec3 {
        (self.rotate)(t)
    }

    /// Translation at `t`.
    #[inline]
    pub fn translate(&self, t: f64) -> Vec3 {
        (self.translate)(t)
    }

    /// Transform one shape point at progress `t`.
    pub fn apply(&self, point: Vec3, t: f64) -> Vec3 {
        let scaled = point.mul_elem(self.scale(t));
        let rotated = match Rotation::between(Vec3::UP, self.rotate(t)) {
            Some(rotation) => rotation.apply(scaled),
            None => scaled,
        };
        rotated + self.translate(t)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("scale(0)", &self.scale(0.0))
            .field("rotate(0)", &self.rotate(0.0))
            .field("translate(0)", &self.translate(0.0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_identity_leaves_points() {
        let tf = Transform::identity();
        let p = Vec3::new(1.0, -2.0, 0.5);
        assert!(close(tf.apply(p, 0.3), p));
    }

    #[test]
    fn test_scale_then_translate() {
        let tf = Transform::identity()
            .with_scale(|t| Vec3::new(2.0 * t, 1.0, 1.0))
            .with_translate(|t| Vec3::new(0.0, t, 0.0));
        let out = tf.apply(Vec3::new(1.0, 1.0, 1.0), 0.5);
        assert!(close(out, Vec3::new(1.0, 1.5, 1.0)));
    }

    #[test]
    fn test_rotate_tips_up_axis() {
        // Up tipped onto +X: a point on the up axis lands on +X
        let tf = Transform::identity().with_rotate(|_| Vec3::X);
        assert!(close(tf.apply(Vec3::new(0.0, 2.0, 0.0), 0.0), Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_zero_rotate_is_no_rotation() {
        let tf = Transform::identity().with_rotate(|_| Vec3::ZERO);
        let p = Vec3::new(1.0, 0.0, 0.0);
        assert!(close(tf.apply(p, 0.7), p));
    }
}
