//! Caller-held effect handles.
//!
//! A handle never owns engine state. It shares a status cell with the
//! running effect and holds a weak reference back to whatever can cancel
//! it, so dropping the engine leaves old handles inert.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Unique effect identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub Uuid);

impl EffectId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which engine runs the effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Render-only particles
    Particle,
    /// Proxy body
    Entity,
}

/// Lifecycle flags shared between an effect and its handles.
#[derive(Debug, Default)]
pub struct EffectStatus {
    finished: AtomicBool,
    cancelled: AtomicBool,
}

impl EffectStatus {
    /// Mark finished. Returns true on the first call.
    pub fn finish(&self) -> bool {
        !self.finished.swap(true, Ordering::AcqRel)
    }

    /// Mark cancelled and finished. Returns true on the first call.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        self.finished.store(true, Ordering::Release);
        first
    }

    /// Whether the effect has ended for any reason.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether the effect was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Something that can cancel an effect by id.
pub trait Canceller: Send + Sync {
    /// Request removal of `id`. Unknown or finished ids are ignored.
    fn cancel_effect(&self, id: EffectId);
}

/// Non-owning reference to a running effect.
#[derive(Clone)]
pub struct EffectHandle {
    id: EffectId,
    kind: EffectKind,
    status: Arc<EffectStatus>,
    canceller: Weak<dyn Canceller>,
}

impl EffectHandle {
    /// Handle bound to a status cell and a canceller.
    pub fn new(id: EffectId, kind: EffectKind, status: Arc<EffectStatus>, canceller: Weak<dyn Canceller>) -> Self {
        Self { id, kind, status, canceller }
    }

    /// Effect id.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Effect kind.
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Whether the effect has ended, by completion or cancellation.
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Whether the effect was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    /// Stop the effect. No further ticks fire for it.
    pub fn cancel(&self) {
        if self.status.is_finished() {
            return;
        }
        if let Some(canceller) = self.canceller.upgrade() {
            canceller.cancel_effect(self.id);
        }
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .finish()
    }
}
