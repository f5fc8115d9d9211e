//! Effect Engines
//!
//! Scheduling, motion, collision and the runtime that ties them together.
//!
//! ```text
//!                       ┌──────────────┐
//!   host loop / drive ─►│  FrameClock  │ one advance per game tick
//!                       └──────┬───────┘
//!             ┌────────────────┼──────────────────┐
//!             ▼                ▼                  ▼
//!      particle task     shard 1 task   ...  shard N task
//!       (per effect)       │    ▲
//!                          │    │ apply queue
//!                          ▼    │
//!                       ComputePool (motion + swept boxes)
//! ```

pub mod clock;
pub mod collision;
pub mod driver;
pub mod entity;
pub mod motion;
pub mod particle;
pub mod pool;
pub mod runtime;
mod shard;

pub use clock::{FrameClock, TaskHandle, TaskStatus};
pub use collision::{Aabb, HitLedger};
pub use driver::drive;
pub use entity::EntityEngine;
pub use motion::{analytical_position, LookTracker, MotionSample};
pub use particle::ParticleEngine;
pub use pool::ComputePool;
pub use runtime::EffectRuntime;
