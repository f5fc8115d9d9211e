//! Collision Detection
//!
//! Swept-volume overlap between an effect's last analytic position and its
//! new one, with at-most-once bookkeeping per target.
//!
//! ```text
//!          prev ●─────────────● now
//!   ┌──────────────────────────────────┐
//!   │ r                                │ r     swept AABB, inflated by the
//!   └──────────────────────────────────┘       hitbox radius on every axis
//! ```

use std::collections::HashSet;

use serde::{Serialize, Deserialize};

use crate::core::vec3::Vec3;
use crate::world::{BodyId, BodyRef};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Cube of half-extent `radius` around `center`.
    pub fn around(center: Vec3, radius: f64) -> Self {
        Self::new(center, center).inflate(radius)
    }

    /// Box covering the straight move `prev -> now`, inflated by `radius`.
    pub fn swept(prev: Vec3, now: Vec3, radius: f64) -> Self {
        Self::new(prev, now).inflate(radius)
    }

    /// Grow symmetrically on every axis. Negative amounts are treated as zero.
    pub fn inflate(self, amount: f64) -> Self {
        let d = Vec3::splat(amount.max(0.0));
        Self { min: self.min - d, max: self.max + d }
    }

    /// Whether two boxes overlap. Touching faces count.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Whether `p` lies inside or on the box.
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    /// Box center.
    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }
}

/// Targets an effect has already hit.
///
/// Membership is the at-most-once guarantee: a target enters once and the
/// callbacks fire only on that insertion.
#[derive(Clone, Debug, Default)]
pub struct HitLedger {
    hit: HashSet<BodyId>,
}

impl HitLedger {
    /// Record `target`. True the first time only.
    pub fn record(&mut self, target: BodyId) -> bool {
        self.hit.insert(target)
    }

    /// Whether `target` was already hit.
    pub fn contains(&self, target: BodyId) -> bool {
        self.hit.contains(&target)
    }

    /// Number of distinct targets hit.
    pub fn len(&self) -> usize {
        self.hit.len()
    }

    /// True if nothing was hit yet.
    pub fn is_empty(&self) -> bool {
        self.hit.is_empty()
    }
}

/// Filter an overlap result down to fresh, damageable targets.
///
/// Skips the caster and non-damageable kinds, records every survivor in the
/// ledger and returns them in query order.
pub fn new_hits(candidates: &[BodyRef], caster: BodyId, ledger: &mut HitLedger) -> Vec<BodyId> {
    candidates
        .iter()
        .filter(|c| c.id != caster && c.kind.is_damageable())
        .filter_map(|c| ledger.record(c.id).then_some(c.id))
        .collect()
}
