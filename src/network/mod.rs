//! Network Layer
//!
//! Outbound updates to remote viewers. Transport is the host's concern:
//! delivery is assumed reliable and in order, so the engine only decides
//! what to send and to whom.

pub mod protocol;
pub mod recorder;

pub use protocol::{MotionUpdate, ParticleRender};
pub use recorder::{RecordingBroadcaster, Sent};

use crate::world::ViewerId;

/// Delivers engine updates to viewers.
pub trait Broadcaster: Send + Sync {
    /// Deliver a relative move to `viewers`.
    fn send_motion(&self, viewers: &[ViewerId], update: &MotionUpdate);

    /// Deliver a particle render call to `viewers`.
    fn send_particles(&self, viewers: &[ViewerId], render: &ParticleRender);
}
