//! In-memory host world and rig registry.
//!
//! Complete enough to drive the engines end to end: bodies with health and
//! half-extents, viewers, freeze counters and a switch that makes spawns
//! fail. Used by the demo binary, the tests and the benchmark.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;
use tracing::debug;

use super::{
    BodyId, BodyKind, BodyRef, Location, ProxyFlags, ProxyKind, RigBinder, RigError, Viewer, ViewerId,
    World, WorldError,
};
use crate::core::vec3::Vec3;
use crate::engine::collision::Aabb;

/// Half-extent given to spawned proxies.
pub const PROXY_HALF_EXTENT: f64 = 0.25;

/// Starting health of bodies added with [`InMemoryWorld::add_body`].
pub const DEFAULT_HEALTH: f64 = 20.0;

/// One simulated body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyState {
    /// Category
    pub kind: BodyKind,
    /// Location and facing
    pub location: Location,
    /// Half-extent of the body's box
    pub half_extent: f64,
    /// Applied flags
    pub flags: ProxyFlags,
    /// Body type requested at spawn, for proxies
    pub proxy_kind: Option<ProxyKind>,
    /// Remaining health
    pub health: f64,
    /// How often the body was frozen
    pub freezes: u32,
}

impl BodyState {
    fn bounds(&self) -> Aabb {
        Aabb::around(self.location.position, self.half_extent)
    }
}

#[derive(Debug, Default)]
struct WorldState {
    next_id: u64,
    bodies: BTreeMap<BodyId, BodyState>,
    viewers: BTreeMap<ViewerId, Vec3>,
    reject_spawns: bool,
    removed: Vec<BodyId>,
}

/// Thread-safe in-memory [`World`].
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    state: Mutex<WorldState>,
}

impl InMemoryWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(state: &mut WorldState) -> BodyId {
        state.next_id += 1;
        BodyId(state.next_id)
    }

    /// Add a body of `kind` at `position`.
    pub fn add_body(&self, kind: BodyKind, position: Vec3, half_extent: f64) -> BodyId {
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state);
        state.bodies.insert(
            id,
            BodyState {
                kind,
                location: Location::at(position),
                half_extent,
                flags: ProxyFlags::default(),
                proxy_kind: None,
                health: DEFAULT_HEALTH,
                freezes: 0,
            },
        );
        id
    }

    /// Add or move a viewer.
    pub fn set_viewer(&self, id: ViewerId, position: Vec3) {
        self.state.lock().viewers.insert(id, position);
    }

    /// Disconnect a viewer.
    pub fn remove_viewer(&self, id: ViewerId) {
        self.state.lock().viewers.remove(&id);
    }

    /// Move a body.
    pub fn move_body(&self, body: BodyId, location: Location) {
        if let Some(b) = self.state.lock().bodies.get_mut(&body) {
            b.location = location;
        }
    }

    /// Snapshot of one body.
    pub fn body(&self, body: BodyId) -> Option<BodyState> {
        self.state.lock().bodies.get(&body).cloned()
    }

    /// Live bodies of a kind.
    pub fn count_kind(&self, kind: BodyKind) -> usize {
        self.state.lock().bodies.values().filter(|b| b.kind == kind).count()
    }

    /// Every body removed so far, in removal order.
    pub fn removed(&self) -> Vec<BodyId> {
        self.state.lock().removed.clone()
    }

    /// Make subsequent spawns fail.
    pub fn reject_spawns(&self, reject: bool) {
        self.state.lock().reject_spawns = reject;
    }
}

impl World for InMemoryWorld {
    fn spawn_proxy(&self, at: Location, kind: &ProxyKind) -> Result<BodyId, WorldError> {
        let mut state = self.state.lock();
        if state.reject_spawns {
            return Err(WorldError::SpawnRejected("spawns disabled".to_string()));
        }
        let id = Self::next_id(&mut state);
        state.bodies.insert(
            id,
            BodyState {
                kind: BodyKind::Proxy,
                location: at,
                half_extent: PROXY_HALF_EXTENT,
                flags: ProxyFlags::default(),
                proxy_kind: Some(kind.clone()),
                health: DEFAULT_HEALTH,
                freezes: 0,
            },
        );
        Ok(id)
    }

    fn remove_body(&self, body: BodyId) {
        let mut state = self.state.lock();
        if state.bodies.remove(&body).is_some() {
            state.removed.push(body);
        }
    }

    fn is_body_valid(&self, body: BodyId) -> bool {
        self.state.lock().bodies.get(&body).is_some_and(|b| b.health > 0.0)
    }

    fn body_location(&self, body: BodyId) -> Option<Location> {
        self.state.lock().bodies.get(&body).map(|b| b.location)
    }

    fn set_flags(&self, body: BodyId, flags: ProxyFlags) {
        if let Some(b) = self.state.lock().bodies.get_mut(&body) {
            b.flags = flags;
        }
    }

    fn freeze_body(&self, body: BodyId) {
        if let Some(b) = self.state.lock().bodies.get_mut(&body) {
            b.freezes += 1;
        }
    }

    fn damage(&self, target: BodyId, amount: f64, source: BodyId) {
        if let Some(b) = self.state.lock().bodies.get_mut(&target) {
            b.health -= amount;
            debug!("{} took {} damage from {} ({} left)", target, amount, source, b.health);
        }
    }

    fn bodies_in(&self, volume: &Aabb, exclude: BodyId) -> Vec<BodyRef> {
        self.state
            .lock()
            .bodies
            .iter()
            .filter(|(id, b)| **id != exclude && b.health > 0.0 && b.bounds().intersects(volume))
            .map(|(id, b)| BodyRef { id: *id, kind: b.kind })
            .collect()
    }

    fn viewers(&self) -> Vec<Viewer> {
        self.state
            .lock()
            .viewers
            .iter()
            .map(|(id, position)| Viewer { id: *id, position: *position })
            .collect()
    }
}

// =============================================================================
// RIGS
// =============================================================================

#[derive(Debug, Default)]
struct RigState {
    models: HashMap<String, HashSet<String>>,
    attached: HashMap<BodyId, String>,
    played: Vec<(BodyId, String)>,
}

/// In-memory [`RigBinder`] with a fixed model catalogue.
#[derive(Debug, Default)]
pub struct InMemoryRigs {
    state: Mutex<RigState>,
}

impl InMemoryRigs {
    /// Empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and its animations.
    pub fn register(&self, model: &str, animations: &[&str]) {
        self.state.lock().models.insert(
            model.to_string(),
            animations.iter().map(|a| a.to_string()).collect(),
        );
    }

    /// Model attached to `body`, if any.
    pub fn attached(&self, body: BodyId) -> Option<String> {
        self.state.lock().attached.get(&body).cloned()
    }

    /// Animations played so far.
    pub fn played(&self) -> Vec<(BodyId, String)> {
        self.state.lock().played.clone()
    }
}

impl RigBinder for InMemoryRigs {
    fn attach(&self, body: BodyId, model: &str) -> Result<(), RigError> {
        let mut state = self.state.lock();
        if !state.models.contains_key(model) {
            return Err(RigError::UnknownModel(model.to_string()));
        }
        state.attached.insert(body, model.to_string());
        Ok(())
    }

    fn play_animation(&self, body: BodyId, model: &str, animation: &str) -> Result<(), RigError> {
        let mut state = self.state.lock();
        let known = state
            .models
            .get(model)
            .ok_or_else(|| RigError::UnknownModel(model.to_string()))?
            .contains(animation);
        if !known {
            return Err(RigError::UnknownAnimation {
                model: model.to_string(),
                animation: animation.to_string(),
            });
        }
        state.played.push((body, animation.to_string()));
        Ok(())
    }

    fn detach(&self, body: BodyId) {
        self.state.lock().attached.remove(&body);
    }
}
