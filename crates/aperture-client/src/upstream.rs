//! Upstream state the client's bindings read from.

use std::collections::BTreeMap;

use aperture_portal::PortalGroupSnapshot;
use aperture_scene::BindingGraph;

use crate::{ObservationSlot, SlotPose};

/// Everything one-way bindings on the client observe: the latest
/// replicated portal group plus the tracked slot poses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientUpstream {
    /// Latest replicated portal group.
    pub snapshot: PortalGroupSnapshot,
    /// Latest pose of every registered slot.
    pub slot_poses: BTreeMap<ObservationSlot, SlotPose>,
}

impl ClientUpstream {
    /// Pose of `slot`, if tracked.
    pub fn slot_pose(&self, slot: &ObservationSlot) -> Option<&SlotPose> {
        self.slot_poses.get(slot)
    }
}

/// Binding graph of the client scene.
pub type ClientBindings = BindingGraph<ClientUpstream>;
