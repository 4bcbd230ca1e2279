//! Observation slots: one viewer eye or seat needing its own rendered view.

use std::collections::BTreeSet;
use std::fmt;

use glam::{Mat4, Vec3};
use tracing::warn;

use aperture_config::SlotConfig;

/// A (screen, slot) pair of one viewer on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationSlot {
    /// Platform the viewer stands on.
    pub platform: u32,
    /// Screen index on this client.
    pub screen: u32,
    /// Slot index on the screen.
    pub slot: u32,
    /// Whether the slot renders in stereo.
    pub stereo: bool,
}

impl ObservationSlot {
    /// Scene group holding geometry that belongs to this slot.
    pub fn group_name(&self) -> String {
        format!("s{}_slot{}", self.screen, self.slot)
    }
}

impl fmt::Display for ObservationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}/s{}/slot{}", self.platform, self.screen, self.slot)
    }
}

impl From<&SlotConfig> for ObservationSlot {
    fn from(config: &SlotConfig) -> Self {
        Self {
            platform: config.platform,
            screen: config.screen,
            slot: config.slot,
            stereo: config.stereo,
        }
    }
}

/// Tracked head and eye poses of a slot for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPose {
    /// World transform of the viewer's head.
    pub world: Mat4,
    /// Left eye relative to the head.
    pub left_eye: Mat4,
    /// Right eye relative to the head.
    pub right_eye: Mat4,
}

impl SlotPose {
    /// Mono pose at `world`.
    pub fn mono(world: Mat4) -> Self {
        Self {
            world,
            left_eye: Mat4::IDENTITY,
            right_eye: Mat4::IDENTITY,
        }
    }

    /// Untracked pose: head fixed at `head` on the platform, eyes split
    /// along the head's x axis.
    pub fn seated(platform: Mat4, head: Vec3, eye_distance: f32) -> Self {
        let half = eye_distance * 0.5;
        Self {
            world: platform * Mat4::from_translation(head),
            left_eye: Mat4::from_translation(Vec3::new(-half, 0.0, 0.0)),
            right_eye: Mat4::from_translation(Vec3::new(half, 0.0, 0.0)),
        }
    }
}

impl Default for SlotPose {
    fn default() -> Self {
        Self::mono(Mat4::IDENTITY)
    }
}

/// Observation slots registered on this client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotRegistry {
    slots: Vec<ObservationSlot>,
}

impl SlotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the configured slots.
    pub fn from_config(slots: &[SlotConfig]) -> Self {
        let mut registry = Self::new();
        for slot in slots {
            registry.register(slot.into());
        }
        registry
    }

    /// Adds a slot. Returns `false` if it was already registered, or if
    /// another slot already uses the same (screen, slot) pair and would
    /// share its group and texture names.
    pub fn register(&mut self, slot: ObservationSlot) -> bool {
        if self.slots.contains(&slot) {
            return false;
        }
        if let Some(taken) = self
            .slots
            .iter()
            .find(|s| s.screen == slot.screen && s.slot == slot.slot)
        {
            warn!(%slot, %taken, "slot names already in use");
            return false;
        }
        self.slots.push(slot);
        true
    }

    /// Returns `true` if `slot` is registered.
    pub fn contains(&self, slot: &ObservationSlot) -> bool {
        self.slots.contains(slot)
    }

    /// Removes a slot. Returns `false` if it was not registered.
    pub fn unregister(&mut self, slot: &ObservationSlot) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s != slot);
        before != self.slots.len()
    }

    /// Registered slots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ObservationSlot> {
        self.slots.iter()
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Distinct platforms that own at least one slot.
    pub fn platforms(&self) -> BTreeSet<u32> {
        self.slots.iter().map(|s| s.platform).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(platform: u32, screen: u32, slot: u32) -> ObservationSlot {
        ObservationSlot {
            platform,
            screen,
            slot,
            stereo: true,
        }
    }

    #[test]
    fn test_group_name() {
        assert_eq!(slot(0, 1, 3).group_name(), "s1_slot3");
        assert_eq!(slot(2, 0, 0).to_string(), "p2/s0/slot0");
    }

    #[test]
    fn test_seated_pose_splits_eyes() {
        let pose = SlotPose::seated(
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            Vec3::new(0.0, 1.7, 0.6),
            0.064,
        );
        let head = pose.world.transform_point3(Vec3::ZERO);
        assert!((head - Vec3::new(10.0, 1.7, 0.6)).length() < 1e-6);
        assert_eq!(pose.left_eye.w_axis.x, -0.032);
        assert_eq!(pose.right_eye.w_axis.x, 0.032);
    }

    #[test]
    fn test_register_deduplicates() {
        let mut registry = SlotRegistry::new();
        assert!(registry.register(slot(0, 0, 0)));
        assert!(!registry.register(slot(0, 0, 0)));
        assert!(registry.register(slot(1, 0, 1)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.platforms(), BTreeSet::from([0, 1]));
        assert!(registry.unregister(&slot(0, 0, 0)));
        assert!(!registry.unregister(&slot(0, 0, 0)));
    }

    #[test]
    fn test_register_rejects_name_collision() {
        let mut registry = SlotRegistry::new();
        assert!(registry.register(slot(0, 0, 0)));
        assert!(!registry.register(slot(1, 0, 0)));
        assert!(!registry.register(ObservationSlot {
            stereo: false,
            ..slot(0, 0, 0)
        }));
        assert!(registry.register(slot(1, 0, 1)));
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(&slot(1, 0, 0)));
    }

    #[test]
    fn test_from_config() {
        let registry = SlotRegistry::from_config(&[SlotConfig {
            platform: 3,
            screen: 1,
            slot: 2,
            stereo: false,
            head_position: [0.0, 1.7, 0.6],
            eye_distance: 0.0,
        }]);
        let only = registry.iter().next().unwrap();
        assert_eq!(only.group_name(), "s1_slot2");
        assert!(!only.stereo);
    }
}
