//! Camera render masks as explicit exclusion sets.

use std::collections::BTreeSet;

use aperture_scene::DO_NOT_DISPLAY_GROUP;

use crate::{ObservationSlot, SlotRegistry};

/// Scene groups a portal camera must not draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderMask {
    excluded: BTreeSet<String>,
}

impl RenderMask {
    /// Mask for a portal camera rendering on behalf of `slot`.
    ///
    /// Excludes hidden geometry, the per-slot portal quads of every
    /// registered slot (the viewer's own included, so a portal never sees
    /// itself), and avatar/status/platform markers of every other platform.
    pub fn for_slot(slot: &ObservationSlot, slots: &SlotRegistry) -> Self {
        let mut mask = Self::default();
        mask.exclude(DO_NOT_DISPLAY_GROUP);
        for registered in slots.iter() {
            mask.exclude(registered.group_name());
        }
        for platform in slots.platforms() {
            if platform == slot.platform {
                continue;
            }
            mask.exclude(format!("avatar_group_{platform}"));
            mask.exclude(format!("status_group_{platform}"));
            mask.exclude(format!("platform_group_{platform}"));
        }
        mask
    }

    /// Adds a group to the exclusion set.
    pub fn exclude(&mut self, group: impl Into<String>) {
        self.excluded.insert(group.into());
    }

    /// Returns `true` if `group` is excluded.
    pub fn excludes(&self, group: &str) -> bool {
        self.excluded.contains(group)
    }

    /// Returns `true` if a node in `groups` would be drawn.
    pub fn allows<'a>(&self, groups: impl IntoIterator<Item = &'a str>) -> bool {
        groups.into_iter().all(|g| !self.excluded.contains(g))
    }

    /// Renderer mask expression, e.g. `!a && !b`.
    pub fn to_expression(&self) -> String {
        self.excluded
            .iter()
            .map(|g| format!("!{g}"))
            .collect::<Vec<_>>()
            .join(" && ")
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

    fn registry() -> SlotRegistry {
        let mut slots = SlotRegistry::new();
        slots.register(slot(0, 0, 0));
        slots.register(slot(0, 0, 1));
        slots.register(slot(1, 1, 0));
        slots
    }

    #[test]
    fn test_excludes_every_registered_slot() {
        let mask = RenderMask::for_slot(&slot(0, 0, 0), &registry());
        assert!(mask.excludes("s0_slot0"));
        assert!(mask.excludes("s0_slot1"));
        assert!(mask.excludes("s1_slot0"));
        assert!(mask.excludes(DO_NOT_DISPLAY_GROUP));
        assert!(!mask.excludes("s5_slot5"));
    }

    #[test]
    fn test_excludes_other_platforms_only() {
        let mask = RenderMask::for_slot(&slot(0, 0, 0), &registry());
        assert!(mask.excludes("avatar_group_1"));
        assert!(mask.excludes("status_group_1"));
        assert!(mask.excludes("platform_group_1"));
        assert!(!mask.excludes("avatar_group_0"));
        assert!(mask.allows(["avatar_group_0", "scene"]));
        assert!(!mask.allows(["scene", "s0_slot1"]));
    }

    #[test]
    fn test_expression() {
        let mut mask = RenderMask::default();
        assert_eq!(mask.to_expression(), "");
        mask.exclude("b");
        mask.exclude("a");
        assert_eq!(mask.to_expression(), "!a && !b");
    }
}
