//! # Arc Effect Engine
//!
//! Time-bounded visual and physical effects for a shared simulated world,
//! streamed to remote viewers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ARC EFFECT ENGINE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Math primitives                           │
//! │  ├── vec3.rs     - 3D vectors, yaw frames, rotations         │
//! │  ├── quant.rs    - Relative-move quantization codec          │
//! │  └── rng.rs      - Seeded random source for shapes           │
//! │                                                              │
//! │  anim/           - Timelines, easing, transforms             │
//! │  shape/          - Point cloud generators                    │
//! │  effect/         - Immutable effect specs and handles        │
//! │                                                              │
//! │  engine/         - Scheduling                                │
//! │  ├── clock.rs    - Frame clock and repeating tasks           │
//! │  ├── particle.rs - Per-effect particle scheduler             │
//! │  ├── entity.rs   - Proxy spawn, shard placement, cancel      │
//! │  ├── shard.rs    - Budgeted apply and slice phases           │
//! │  ├── pool.rs     - Bounded compute workers                   │
//! │  ├── motion.rs   - Analytic positions and deltas             │
//! │  ├── collision.rs- Swept boxes and hit ledger                │
//! │  ├── driver.rs   - Async frame driver                        │
//! │  └── runtime.rs  - Host-facing facade                        │
//! │                                                              │
//! │  world/          - Host binding (bodies, viewers, rigs)      │
//! │  network/        - Outbound wire messages                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Every body mutation and every hit callback runs on the thread that
//! advances the [`FrameClock`](engine::FrameClock). Motion math may run on
//! the compute pool; its results are applied back on the tick thread.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod anim;
pub mod config;
pub mod core;
pub mod effect;
pub mod engine;
pub mod error;
pub mod network;
pub mod shape;
pub mod world;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::vec3::Vec3;
pub use effect::{EffectHandle, EntityEffectSpec, ParticleEffectSpec};
pub use engine::{drive, EffectRuntime, FrameClock};
pub use error::{EffectError, Result};
pub use world::{BodyId, Location, ViewerId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host tick rate (Hz)
pub const TICK_RATE: u32 = 20;
