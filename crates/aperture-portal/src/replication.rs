//! Replication boundary: the ordered portal group the server publishes and
//! each client mirrors.
//!
//! The transport itself lives outside this crate. The server hands
//! [`encode`]d snapshots to it, clients [`decode`] whatever arrives. Entries
//! are compared only by [`PortalId`].

use serde::{Deserialize, Serialize};

use crate::{PortalEntity, PortalId, ReplicationError};

/// Ordered children of the replicated portal group at one server tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalGroupSnapshot {
    /// Server tick the snapshot was taken at.
    pub tick: u64,
    /// Portals in server order.
    pub portals: Vec<PortalEntity>,
}

impl PortalGroupSnapshot {
    /// Looks up a portal by id.
    pub fn get(&self, id: PortalId) -> Option<&PortalEntity> {
        self.portals.iter().find(|p| p.id() == id)
    }

    /// Returns `true` if the group holds `id`.
    pub fn contains(&self, id: PortalId) -> bool {
        self.get(id).is_some()
    }

    /// Number of portals.
    pub fn len(&self) -> usize {
        self.portals.len()
    }

    /// Returns `true` if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }
}

/// Serializes a snapshot for the transport.
pub fn encode(snapshot: &PortalGroupSnapshot) -> Result<Vec<u8>, ReplicationError> {
    postcard::to_allocvec(snapshot).map_err(ReplicationError::Encode)
}

/// Deserializes a snapshot received from the transport.
pub fn decode(bytes: &[u8]) -> Result<PortalGroupSnapshot, ReplicationError> {
    postcard::from_bytes(bytes).map_err(ReplicationError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BorderMaterial, PortalManager, PortalModes, PortalRegistry, PortalSpec};
    use glam::{Mat4, Quat, Vec3};

    #[test]
    fn test_snapshot_survives_transport() {
        let mut registry = PortalRegistry::new();
        registry.add_portal(PortalSpec {
            entry: Mat4::from_rotation_translation(
                Quat::from_rotation_y(0.5),
                Vec3::new(1.0, 1.5, -2.0),
            ),
            exit: Mat4::from_translation(Vec3::new(10.0, 0.0, 3.0)),
            scale: 0.25,
            width: 0.3,
            height: 0.2,
            modes: PortalModes {
                border: BorderMaterial::Hidden,
                ..PortalModes::default()
            },
        });

        let snapshot = registry.snapshot(42);
        let bytes = encode(&snapshot).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
        assert!(decoded.contains(crate::PortalId(1)));
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut registry = PortalRegistry::new();
        registry.add_portal(PortalSpec {
            entry: Mat4::IDENTITY,
            exit: Mat4::IDENTITY,
            scale: 1.0,
            width: 0.3,
            height: 0.3,
            modes: PortalModes::default(),
        });
        let bytes = encode(&registry.snapshot(1)).unwrap();
        let result = decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ReplicationError::Decode(_))));
    }
}
