//! In-memory broadcaster that keeps everything it was asked to send.

use parking_lot::Mutex;

use super::{Broadcaster, MotionUpdate, ParticleRender};
use crate::world::{BodyId, ViewerId};

/// One recorded outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    /// Motion update and its recipients
    Motion(Vec<ViewerId>, MotionUpdate),
    /// Render call and its recipients
    Particles(Vec<ViewerId>, ParticleRender),
}

/// Broadcaster that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    log: Mutex<Vec<Sent>>,
}

impl RecordingBroadcaster {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().clone()
    }

    /// Take and clear the log.
    pub fn drain(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Number of motion updates recorded.
    pub fn motion_count(&self) -> usize {
        self.log.lock().iter().filter(|s| matches!(s, Sent::Motion(..))).count()
    }

    /// Motion updates recorded for one body.
    pub fn motions_for(&self, body: BodyId) -> Vec<MotionUpdate> {
        self.log
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Motion(_, update) if update.body == body => Some(*update),
                _ => None,
            })
            .collect()
    }

    /// Number of render calls recorded.
    pub fn particle_count(&self) -> usize {
        self.log.lock().iter().filter(|s| matches!(s, Sent::Particles(..))).count()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn send_motion(&self, viewers: &[ViewerId], update: &MotionUpdate) {
        self.log.lock().push(Sent::Motion(viewers.to_vec(), *update));
    }

    fn send_particles(&self, viewers: &[ViewerId], render: &ParticleRender) {
        self.log.lock().push(Sent::Particles(viewers.to_vec(), *render));
    }
}
