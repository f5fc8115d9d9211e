//! Protocol Messages
//!
//! Wire format for updates sent to remote viewers. Both messages are flat
//! structs, so they encode with bincode for production and JSON for
//! debugging.
//!
//! ```text
//! MotionUpdate (bincode, 17 bytes)
//! ┌──────────┬──────┬──────┬──────┬─────┬───────┬──────────┐
//! │ body u64 │ dx   │ dy   │ dz   │ yaw │ pitch │ has_look │
//! │          │ i16  │ i16  │ i16  │ u8  │ u8    │ bool     │
//! └──────────┴──────┴──────┴──────┴─────┴───────┴──────────┘
//! ```

use serde::{Serialize, Deserialize};

use crate::core::quant::{angle_to_byte, QuantizedDelta};
use crate::core::vec3::Vec3;
use crate::effect::particle::{Color, ParticleKind, ParticleParams};
use crate::world::{BodyId, Location};

// =============================================================================
// MOTION
// =============================================================================

/// Relative move of a proxy body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionUpdate {
    /// Body that moved
    pub body: BodyId,
    /// Quantized X delta
    pub dx: i16,
    /// Quantized Y delta
    pub dy: i16,
    /// Quantized Z delta
    pub dz: i16,
    /// Yaw as a fraction of a full turn
    pub yaw: u8,
    /// Pitch as a fraction of a full turn
    pub pitch: u8,
    /// Whether `yaw`/`pitch` should be applied
    pub has_look: bool,
}

impl MotionUpdate {
    /// Update carrying a delta and the body's current facing.
    pub fn with_look(body: BodyId, delta: QuantizedDelta, facing: &Location) -> Self {
        Self {
            body,
            dx: delta.dx,
            dy: delta.dy,
            dz: delta.dz,
            yaw: angle_to_byte(facing.yaw),
            pitch: angle_to_byte(facing.pitch),
            has_look: true,
        }
    }

    /// Update carrying only a delta.
    pub fn move_only(body: BodyId, delta: QuantizedDelta) -> Self {
        Self {
            body,
            dx: delta.dx,
            dy: delta.dy,
            dz: delta.dz,
            yaw: 0,
            pitch: 0,
            has_look: false,
        }
    }

    /// The quantized delta.
    pub fn delta(&self) -> QuantizedDelta {
        QuantizedDelta { dx: self.dx, dy: self.dy, dz: self.dz }
    }
}

// =============================================================================
// PARTICLES
// =============================================================================

/// One render call at one world position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleRender {
    /// Particle kind
    pub kind: ParticleKind,
    /// World position
    pub position: Vec3,
    /// Particle count
    pub count: u32,
    /// Particle speed
    pub speed: f64,
    /// Random spread
    pub spread: Vec3,
    /// Optional color
    pub color: Option<Color>,
    /// Particle size
    pub size: f32,
}

impl ParticleRender {
    /// Render call for `params` at `position` with an already LOD-scaled count.
    pub fn new(params: &ParticleParams, position: Vec3, count: u32) -> Self {
        Self {
            kind: params.kind,
            position,
            count,
            speed: params.speed,
            spread: params.spread,
            color: params.color,
            size: params.size,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl MotionUpdate {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ParticleRender {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
