//! Effect Specifications
//!
//! Immutable descriptions of what to animate. Specs are validated when
//! built and never change afterwards; the engines keep all runtime state.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │ ParticleEffectSpec   │        │ EntityEffectSpec     │
//! │  context (policies)  │        │  context (caster)    │
//! │  origin (lazy)       │        │  origin + offset     │
//! │  shape + transform   │        │  transform (path)    │
//! │  render params       │        │  params (callbacks)  │
//! │  timeline + seed     │        │  timeline            │
//! └──────────┬───────────┘        └──────────┬───────────┘
//!            ▼                               ▼
//!      ParticleEngine                   EntityEngine
//!            └───────────► EffectHandle ◄────┘
//! ```

pub mod context;
pub mod entity;
pub mod handle;
pub mod particle;
pub mod presets;

pub use context::{BatchPolicy, EntityContext, LodPolicy, LodStep, ParticleContext, ViewerFilter};
pub use entity::{EntityEffectSpec, EntityParams, HitCallback, HitContext, RigSpec};
pub use handle::{Canceller, EffectHandle, EffectId, EffectKind, EffectStatus};
pub use particle::{Color, ParticleEffectSpec, ParticleKind, ParticleParams};
