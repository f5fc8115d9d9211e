//! Analytic Motion
//!
//! The exact position an entity effect should occupy at eased progress `t`,
//! and the quantized delta that moves a viewer's copy of the proxy there.
//!
//! ```text
//! now   = origin + yawFrame(offset) + yawFrame(translate(t))
//! delta = now - lastAnalytic          (full precision)
//! wire  = quantize(delta)             (i16 per axis, 1/4096 units)
//! ```
//!
//! Everything here is pure and safe to run on a compute worker.

use crate::core::quant::{angle_to_byte, QuantizedDelta, Quantizer};
use crate::core::vec3::Vec3;
use crate::effect::entity::EntityEffectSpec;
use crate::engine::collision::Aabb;
use crate::network::protocol::MotionUpdate;
use crate::world::{BodyId, Location};

/// Analytic position of `spec` at eased progress `t`.
///
/// The offset and the transform's translation are both expressed in the
/// origin's local frame (forward = +X, up = +Y, right = +Z).
pub fn analytical_position(spec: &EntityEffectSpec, t: f64) -> Vec3 {
    let yaw = spec.origin.yaw;
    spec.origin.position
        + spec.offset.relative_by_yaw(yaw)
        + spec.transform.translate(t).relative_by_yaw(yaw)
}

/// Result of one sync interval for one effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    /// Analytic position the delta was measured from
    pub prev: Vec3,
    /// New analytic position
    pub now: Vec3,
    /// Wire delta
    pub delta: QuantizedDelta,
    /// Remainder to carry into the next interval
    pub remainder: Vec3,
    /// Volume swept between `prev` and `now`, inflated by the hitbox
    pub swept: Aabb,
}

impl MotionSample {
    /// Sample `spec` at `t`, measuring from `prev`.
    pub fn compute(
        spec: &EntityEffectSpec,
        t: f64,
        prev: Vec3,
        remainder: Vec3,
        quantizer: &Quantizer,
    ) -> Self {
        let now = analytical_position(spec, t);
        Self::between(prev, now, remainder, (spec.params.hitbox)(t), quantizer)
    }

    /// Sample the move `prev -> now` directly.
    pub fn between(prev: Vec3, now: Vec3, remainder: Vec3, hitbox: f64, quantizer: &Quantizer) -> Self {
        let (delta, remainder) = quantizer.quantize(now - prev, remainder);
        Self {
            prev,
            now,
            delta,
            remainder,
            swept: Aabb::swept(prev, now, hitbox),
        }
    }
}

/// Builds motion updates, optionally leaving out an unchanged facing.
#[derive(Clone, Copy, Debug, Default)]
pub struct LookTracker {
    last: Option<(u8, u8)>,
}

impl LookTracker {
    /// Update for `body` moving by `delta` while facing `facing`.
    ///
    /// With `only_on_change`, the facing is sent only when its bytes differ
    /// from the last update built by this tracker.
    pub fn update(&mut self, body: BodyId, delta: QuantizedDelta, facing: &Location, only_on_change: bool) -> MotionUpdate {
        let look = (angle_to_byte(facing.yaw), angle_to_byte(facing.pitch));
        let unchanged = self.last == Some(look);
        self.last = Some(look);

        if only_on_change && unchanged {
            MotionUpdate::move_only(body, delta)
        } else {
            MotionUpdate::with_look(body, delta, facing)
        }
    }
}
