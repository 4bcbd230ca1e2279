//! Server-side portal ownership: the manager seam and its registry
//! implementation.

use tracing::{debug, info};

use crate::{PortalEntity, PortalGroupSnapshot, PortalId, PortalSpec};

/// Lifecycle events emitted on the replication boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalEvent {
    /// A portal was created.
    Added(PortalId),
    /// A portal was destroyed.
    Removed(PortalId),
}

/// Owner of all Portal Entities on the server.
pub trait PortalManager {
    /// Creates a portal and returns its id.
    fn add_portal(&mut self, spec: PortalSpec) -> PortalId;

    /// Destroys a portal. Returns `false` if the id was unknown.
    fn remove_portal(&mut self, id: PortalId) -> bool;

    /// Borrow a portal.
    fn portal(&self, id: PortalId) -> Option<&PortalEntity>;

    /// Mutably borrow a portal.
    fn portal_mut(&mut self, id: PortalId) -> Option<&mut PortalEntity>;
}

/// Ordered portal storage with monotonically allocated ids.
#[derive(Debug, Clone)]
pub struct PortalRegistry {
    next_id: u64,
    portals: Vec<PortalEntity>,
    events: Vec<PortalEvent>,
}

impl PortalRegistry {
    /// Creates an empty registry. The first allocated id is 1.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            portals: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Number of live portals.
    pub fn len(&self) -> usize {
        self.portals.len()
    }

    /// Returns `true` if there are no portals.
    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    /// Portals in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &PortalEntity> {
        self.portals.iter()
    }

    /// Takes all lifecycle events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<PortalEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ordered copy of the portal group for replication.
    pub fn snapshot(&self, tick: u64) -> PortalGroupSnapshot {
        PortalGroupSnapshot {
            tick,
            portals: self.portals.clone(),
        }
    }
}

impl Default for PortalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalManager for PortalRegistry {
    fn add_portal(&mut self, spec: PortalSpec) -> PortalId {
        let id = PortalId(self.next_id);
        self.next_id += 1;
        self.portals.push(PortalEntity::new(id, spec));
        self.events.push(PortalEvent::Added(id));
        info!(portal = %id, "portal added");
        id
    }

    fn remove_portal(&mut self, id: PortalId) -> bool {
        let Some(index) = self.portals.iter().position(|p| p.id() == id) else {
            debug!(portal = %id, "remove requested for unknown portal");
            return false;
        };
        self.portals.remove(index);
        self.events.push(PortalEvent::Removed(id));
        info!(portal = %id, "portal removed");
        true
    }

    fn portal(&self, id: PortalId) -> Option<&PortalEntity> {
        self.portals.iter().find(|p| p.id() == id)
    }

    fn portal_mut(&mut self, id: PortalId) -> Option<&mut PortalEntity> {
        self.portals.iter_mut().find(|p| p.id() == id)
    }
}
