//! Host World Binding
//!
//! The engine never owns the simulation. It reaches the host through the
//! [`World`] trait (bodies, viewers, overlap queries) and optionally a
//! [`RigBinder`] for animated models. [`InMemoryWorld`] is a complete host
//! for tests and the demo binary.

pub mod memory;

use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::vec3::Vec3;
use crate::engine::collision::Aabb;

pub use memory::{InMemoryRigs, InMemoryWorld};

/// Simulated body identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Remote viewer identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewerId(pub u64);

/// Position plus facing, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// World position
    pub position: Vec3,
    /// Yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
}

impl Location {
    /// Location facing yaw = pitch = 0.
    pub const fn at(position: Vec3) -> Self {
        Self { position, yaw: 0.0, pitch: 0.0 }
    }

    /// Location with a facing.
    pub const fn facing(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self { position, yaw, pitch }
    }
}

/// Coarse body category, used to keep collision away from non-targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Effect proxy (ours or another engine's)
    Proxy,
    /// Dropped item
    Item,
    /// Experience orb
    ExperienceOrb,
    /// Player-controlled body
    Player,
    /// Any other living body
    Living,
}

impl BodyKind {
    /// Whether collision callbacks may target this kind.
    pub fn is_damageable(self) -> bool {
        matches!(self, BodyKind::Player | BodyKind::Living)
    }
}

/// Host body type a proxy is spawned as.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyKind {
    /// Invisible marker body
    #[default]
    Marker,
    /// Host-defined body type, by name
    Named(String),
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Marker => write!(f, "marker"),
            ProxyKind::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Body returned by an overlap query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyRef {
    /// Identifier
    pub id: BodyId,
    /// Category
    pub kind: BodyKind,
}

/// Flags applied to a freshly spawned proxy body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyFlags {
    /// Rendered to viewers
    pub visible: bool,
    /// Small variant
    pub small: bool,
    /// Participates in host collision
    pub collidable: bool,
    /// Host gravity applies
    pub gravity: bool,
}

impl Default for ProxyFlags {
    fn default() -> Self {
        Self { visible: true, small: false, collidable: false, gravity: false }
    }
}

/// Remote viewer snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewer {
    /// Identifier
    pub id: ViewerId,
    /// Current position
    pub position: Vec3,
}

/// Host world failures.
#[derive(Debug, Clone, Error)]
pub enum WorldError {
    /// The host refused the spawn.
    #[error("Spawn rejected: {0}")]
    SpawnRejected(String),

    /// Body no longer exists.
    #[error("Unknown body {0}")]
    UnknownBody(BodyId),
}

/// Narrow interface onto the host simulation.
///
/// Every method may be called from the tick thread; `spawn_proxy`,
/// `remove_body` and the read-only queries may also be called from the
/// thread that submits or cancels effects.
pub trait World: Send + Sync {
    /// Spawn a proxy body of `kind` with default flags.
    fn spawn_proxy(&self, at: Location, kind: &ProxyKind) -> Result<BodyId, WorldError>;

    /// Remove a body. Unknown ids are ignored.
    fn remove_body(&self, body: BodyId);

    /// Whether the body still exists and is alive.
    fn is_body_valid(&self, body: BodyId) -> bool;

    /// Current location of a body.
    fn body_location(&self, body: BodyId) -> Option<Location>;

    /// Re-apply visibility/size/collidability/gravity flags.
    fn set_flags(&self, body: BodyId, flags: ProxyFlags);

    /// Zero the body's authoritative velocity and impulse.
    fn freeze_body(&self, body: BodyId);

    /// Deal `amount` damage to `target`, attributed to `source`.
    fn damage(&self, target: BodyId, amount: f64, source: BodyId);

    /// Bodies overlapping `volume`, excluding `exclude`.
    fn bodies_in(&self, volume: &Aabb, exclude: BodyId) -> Vec<BodyRef>;

    /// All connected viewers.
    fn viewers(&self) -> Vec<Viewer>;

    /// Viewers within `sqrt(range_sq)` of `at`.
    fn viewers_near(&self, at: Vec3, range_sq: f64) -> Vec<ViewerId> {
        self.viewers()
            .into_iter()
            .filter(|v| v.position.distance_squared(at) <= range_sq)
            .map(|v| v.id)
            .collect()
    }
}

/// Rig binding failures.
#[derive(Debug, Clone, Error)]
pub enum RigError {
    /// No model with this id.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Model exists, animation does not.
    #[error("Animation {animation} not found on model {model}")]
    UnknownAnimation {
        /// Model id
        model: String,
        /// Requested animation
        animation: String,
    },
}

/// Optional binding to an external animated-rig system.
pub trait RigBinder: Send + Sync {
    /// Attach `model` to `body`.
    fn attach(&self, body: BodyId, model: &str) -> Result<(), RigError>;

    /// Play a named animation on an attached model.
    fn play_animation(&self, body: BodyId, model: &str, animation: &str) -> Result<(), RigError>;

    /// Drop whatever is attached to `body`.
    fn detach(&self, body: BodyId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damageable_kinds() {
        assert!(BodyKind::Living.is_damageable());
        assert!(BodyKind::Player.is_damageable());
        assert!(!BodyKind::Proxy.is_damageable());
        assert!(!BodyKind::Item.is_damageable());
        assert!(!BodyKind::ExperienceOrb.is_damageable());
    }

    #[test]
    fn test_proxy_kind_default_and_display() {
        assert_eq!(ProxyKind::default(), ProxyKind::Marker);
        assert_eq!(ProxyKind::Marker.to_string(), "marker");
        assert_eq!(ProxyKind::Named("armor_stand".into()).to_string(), "armor_stand");
    }
}
