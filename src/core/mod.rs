//! Core math primitives.
//!
//! Vector math, the motion quantization codec and the seeded random source
//! used by scatter shapes. Nothing here touches engine state.

pub mod vec3;
pub mod quant;
pub mod rng;

// Re-export core types
pub use vec3::{Vec3, Rotation};
pub use quant::{QuantizedDelta, Quantizer, REL_SCALE, angle_to_byte};
pub use rng::ShapeRng;
