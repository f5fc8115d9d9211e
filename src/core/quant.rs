//! Fixed-Point Motion Quantization
//!
//! Relative-move deltas travel as signed 16-bit integers in units of
//! `1 / scale` world units. Orientation travels as one byte per axis.
//!
//! ## Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Axis delta: i16, scale S = 4096 units per world unit       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  encode(d) = clamp(trunc(d * S), -32768, 32767)             │
//! │  decode(q) = q / S                                          │
//! │                                                             │
//! │  Range: about ±8.0 world units per update                   │
//! │  Precision: 1/4096 ≈ 0.000244 units                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Angle: u8, byte = trunc(((a mod 360) / 360) * 256)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Truncation drops the sub-quantum remainder every interval. Over many
//! intervals that remainder accumulates as drift against the analytic path.
//! [`Quantizer::carry_remainder`] opts into feeding it forward instead.

use serde::{Serialize, Deserialize};

use super::vec3::Vec3;

/// Default quantization scale (units per world unit).
pub const REL_SCALE: f64 = 4096.0;

/// Default suppression threshold on the summed decoded delta.
pub const SUPPRESSION_EPSILON: f64 = 1e-6;

/// Encode one axis delta. Truncates toward zero, clamps to i16.
#[inline]
pub fn encode_axis(d: f64, scale: f64) -> i16 {
    let q = (d * scale).trunc();
    q.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Decode one wire axis value back to world units.
#[inline]
pub fn decode_axis(q: i16, scale: f64) -> f64 {
    q as f64 / scale
}

/// Encode an angle in degrees as a fraction of a full turn.
#[inline]
pub fn angle_to_byte(degrees: f32) -> u8 {
    let wrapped = ((degrees % 360.0) + 360.0) % 360.0;
    (wrapped / 360.0 * 256.0) as u8
}

/// Decode an angle byte back to degrees.
#[inline]
pub fn byte_to_angle(b: u8) -> f32 {
    b as f32 * 360.0 / 256.0
}

/// A quantized relative move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedDelta {
    /// X axis
    pub dx: i16,
    /// Y axis
    pub dy: i16,
    /// Z axis
    pub dz: i16,
}

impl QuantizedDelta {
    /// No movement.
    pub const ZERO: Self = Self { dx: 0, dy: 0, dz: 0 };

    /// Decoded delta in world units.
    #[inline]
    pub fn decode(self, scale: f64) -> Vec3 {
        Vec3::new(
            decode_axis(self.dx, scale),
            decode_axis(self.dy, scale),
            decode_axis(self.dz, scale),
        )
    }

    /// True when the decoded magnitude falls under `epsilon`.
    ///
    /// Compares the value actually sent, not the unquantized delta.
    #[inline]
    pub fn is_suppressed(self, scale: f64, epsilon: f64) -> bool {
        self.decode(scale).l1() < epsilon
    }
}

/// Axis-wise delta quantizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    /// Units per world unit
    pub scale: f64,
    /// Feed the truncation remainder into the next interval
    pub carry_remainder: bool,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            scale: REL_SCALE,
            carry_remainder: false,
        }
    }
}

impl Quantizer {
    /// Create a quantizer.
    pub fn new(scale: f64, carry_remainder: bool) -> Self {
        Self { scale, carry_remainder }
    }

    /// Quantize `delta`, given the remainder left by the previous interval.
    ///
    /// Returns the wire delta and the remainder to hand to the next call.
    /// Without remainder carrying the returned remainder is always zero.
    pub fn quantize(&self, delta: Vec3, remainder: Vec3) -> (QuantizedDelta, Vec3) {
        let wanted = if self.carry_remainder { delta + remainder } else { delta };
        let q = QuantizedDelta {
            dx: encode_axis(wanted.x, self.scale),
            dy: encode_axis(wanted.y, self.scale),
            dz: encode_axis(wanted.z, self.scale),
        };
        let next = if self.carry_remainder {
            wanted - q.decode(self.scale)
        } else {
            Vec3::ZERO
        };
        (q, next)
    }

    /// One quantization step in world units.
    #[inline]
    pub fn step(&self) -> f64 {
        1.0 / self.scale
    }
}

// =============================================================================
// TESTS
// =============================================================================
