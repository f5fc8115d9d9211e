//! 3D Vector
//!
//! Double-precision vector math for analytic effect positions.
//! Rotation helpers follow Rodrigues' formula; the yaw frame helpers map
//! an effect's local forward/right/up axes into world space.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// Squared axis length below which two directions count as (anti-)parallel.
pub const PARALLEL_EPSILON: f64 = 1e-10;

/// 3D vector with f64 components.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component (world up)
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// All components one
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };

    /// World up (+Y)
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };

    /// World +X
    pub const X: Self = Self { x: 1.0, y: 0.0, z: 0.0 };

    /// World +Z
    pub const Z: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same value on every axis.
    #[inline]
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Component-wise product.
    #[inline]
    pub fn mul_elem(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length (prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Linear interpolation. t = 0 returns self, t = 1 returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self.scale(1.0 - t) + other.scale(t)
    }

    /// Sum of absolute components.
    #[inline]
    pub fn l1(self) -> f64 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    /// True if every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Rotate around a unit axis by `angle` radians (Rodrigues).
    pub fn rotate_around_axis(self, axis: Self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        self.scale(cos)
            + axis.cross(self).scale(sin)
            + axis.scale(axis.dot(self) * (1.0 - cos))
    }

    /// Rotate this vector onto the direction of `target`, keeping its length.
    ///
    /// Parallel inputs come back unchanged. Anti-parallel inputs are turned
    /// by π about an axis orthogonal to `self`.
    pub fn rotate_to(self, target: Self) -> Self {
        match Rotation::between(self, target) {
            Some(rotation) => rotation.apply(self),
            None => self,
        }
    }

    /// Map a local offset into world space for a body facing `yaw` degrees.
    ///
    /// Local +X is forward, local +Z is right, local +Y is up.
    pub fn relative_by_yaw(self, yaw: f32) -> Self {
        let (sin, cos) = (yaw as f64).to_radians().sin_cos();
        let forward = Self::new(-sin, 0.0, cos);
        let right = Self::new(-cos, 0.0, -sin);
        forward.scale(self.x) + right.scale(self.z) + Self::UP.scale(self.y)
    }
}

/// A minimal-angle rotation between two directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    /// Unit rotation axis
    pub axis: Vec3,
    /// Angle in radians
    pub angle: f64,
}

impl Rotation {
    /// Rotation carrying the direction of `from` onto the direction of `to`.
    ///
    /// Returns `None` when no rotation is needed: the inputs are parallel or
    /// either one has zero length.
    pub fn between(from: Vec3, to: Vec3) -> Option<Self> {
        let a = from.normalize();
        let b = to.normalize();
        if a == Vec3::ZERO || b == Vec3::ZERO {
            return None;
        }

        let axis = a.cross(b);
        if axis.length_squared() < PARALLEL_EPSILON {
            if a.dot(b) > 0.0 {
                return None;
            }
            // Anti-parallel: any axis orthogonal to `from` works, pick the world
            // axis least aligned with it.
            let ortho = if a.x.abs() < 0.9 { Vec3::X } else { Vec3::UP };
            return Some(Self {
                axis: a.cross(ortho).normalize(),
                angle: std::f64::consts::PI,
            });
        }

        Some(Self {
            axis: axis.normalize(),
            angle: a.dot(b).clamp(-1.0, 1.0).acos(),
        })
    }

    /// Apply the rotation to a vector.
    #[inline]
    pub fn apply(self, v: Vec3) -> Vec3 {
        v.rotate_around_axis(self.axis, self.angle)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// =============================================================================
// TESTS
// =============================================================================
