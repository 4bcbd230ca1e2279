//! Button channels of the capture device and their mapping to actions.

use std::collections::BTreeMap;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::CaptureError;

/// Number of boolean button channels the device exposes.
pub const CHANNEL_COUNT: usize = 16;

/// Semantic actions of the capture device.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaptureAction {
    /// Show the device frame outline while held.
    Focus,
    /// Capture a new portal, or drag the current one while held.
    Capture,
    /// Hide the current portal.
    Close,
    /// Re-open the last closed portal.
    Open,
    /// Previous captured portal.
    Prior,
    /// Next captured portal.
    Next,
    /// Enter or leave the gallery carousel.
    Gallery,
    /// Switch to 2D viewing.
    Mode2D,
    /// Switch to 3D viewing.
    Mode3D,
    /// Shrink the current portal's scale while held.
    Shrink,
    /// Grow the current portal's scale while held.
    Grow,
    /// Allow negative parallax.
    ParallaxOn,
    /// Clip negative parallax.
    ParallaxOff,
    /// Delete the current portal.
    Delete,
}

impl CaptureAction {
    /// All actions.
    pub const ALL: [CaptureAction; 14] = [
        Self::Focus,
        Self::Capture,
        Self::Close,
        Self::Open,
        Self::Prior,
        Self::Next,
        Self::Gallery,
        Self::Mode2D,
        Self::Mode3D,
        Self::Shrink,
        Self::Grow,
        Self::ParallaxOn,
        Self::ParallaxOff,
        Self::Delete,
    ];

    /// Name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Capture => "capture",
            Self::Close => "close",
            Self::Open => "open",
            Self::Prior => "prior",
            Self::Next => "next",
            Self::Gallery => "gallery",
            Self::Mode2D => "mode_2d",
            Self::Mode3D => "mode_3d",
            Self::Shrink => "shrink",
            Self::Grow => "grow",
            Self::ParallaxOn => "parallax_on",
            Self::ParallaxOff => "parallax_off",
            Self::Delete => "delete",
        }
    }

    /// Parses a configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

/// One sample of the device: 16 button bits and the tracked pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Button channel bits, bit `n` is channel `n`.
    pub buttons: u16,
    /// Tracked device pose in platform coordinates.
    pub pose: Mat4,
    /// World transform of the platform the device is tracked in.
    #[serde(default)]
    pub platform: Mat4,
}

impl InputFrame {
    /// A frame with no buttons held.
    pub fn at(pose: Mat4) -> Self {
        Self {
            buttons: 0,
            pose,
            platform: Mat4::IDENTITY,
        }
    }

    /// Returns a copy with `channel` held.
    pub fn with_channel(mut self, channel: usize) -> Self {
        if channel < CHANNEL_COUNT {
            self.buttons |= 1 << channel;
        }
        self
    }

    /// Returns `true` if `channel` is held.
    pub fn is_held(&self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.buttons & (1 << channel) != 0
    }
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::at(Mat4::IDENTITY)
    }
}

/// Actions whose button changed or stayed held between two frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonEdges {
    /// Actions pressed this frame, in channel order.
    pub pressed: Vec<CaptureAction>,
    /// Actions released this frame, in channel order.
    pub released: Vec<CaptureAction>,
    /// Actions held this frame.
    pub held: Vec<CaptureAction>,
}

impl ButtonEdges {
    /// Returns `true` if `action` is held.
    pub fn is_held(&self, action: CaptureAction) -> bool {
        self.held.contains(&action)
    }
}

/// Channel-to-action table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonMap {
    channels: [Option<CaptureAction>; CHANNEL_COUNT],
}

impl Default for ButtonMap {
    fn default() -> Self {
        let mut channels = [None; CHANNEL_COUNT];
        channels[0] = Some(CaptureAction::Focus);
        channels[1] = Some(CaptureAction::Capture);
        channels[2] = Some(CaptureAction::Close);
        channels[3] = Some(CaptureAction::Open);
        channels[4] = Some(CaptureAction::Prior);
        channels[5] = Some(CaptureAction::Next);
        channels[6] = Some(CaptureAction::Gallery);
        channels[7] = Some(CaptureAction::Mode2D);
        channels[8] = Some(CaptureAction::Mode3D);
        channels[9] = Some(CaptureAction::Shrink);
        channels[10] = Some(CaptureAction::Grow);
        channels[12] = Some(CaptureAction::ParallaxOn);
        channels[13] = Some(CaptureAction::ParallaxOff);
        channels[15] = Some(CaptureAction::Delete);
        Self { channels }
    }
}

impl ButtonMap {
    /// Default table with configured overrides applied. An override moves
    /// the action to the new channel and replaces whatever was bound there.
    pub fn with_overrides(overrides: &BTreeMap<String, u8>) -> Result<Self, CaptureError> {
        let mut map = Self::default();
        for (name, &channel) in overrides {
            let action = CaptureAction::from_name(name)
                .ok_or_else(|| CaptureError::UnknownAction(name.clone()))?;
            if channel as usize >= CHANNEL_COUNT {
                return Err(CaptureError::ChannelOutOfRange {
                    action: name.clone(),
                    channel,
                });
            }
            map.bind(action, channel as usize);
        }
        Ok(map)
    }

    /// Binds `action` to `channel`, unbinding it everywhere else.
    pub fn bind(&mut self, action: CaptureAction, channel: usize) {
        for slot in &mut self.channels {
            if *slot == Some(action) {
                *slot = None;
            }
        }
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = Some(action);
        }
    }

    /// Action bound to `channel`.
    pub fn action(&self, channel: usize) -> Option<CaptureAction> {
        self.channels.get(channel).copied().flatten()
    }

    /// Channel `action` is bound to.
    pub fn channel(&self, action: CaptureAction) -> Option<usize> {
        self.channels.iter().position(|slot| *slot == Some(action))
    }

    /// Compares two button snapshots.
    pub fn edges(&self, previous: u16, current: u16) -> ButtonEdges {
        let mut edges = ButtonEdges::default();
        for (channel, slot) in self.channels.iter().enumerate() {
            let Some(action) = *slot else {
                continue;
            };
            let bit = 1u16 << channel;
            let was = previous & bit != 0;
            let is = current & bit != 0;
            if is {
                edges.held.push(action);
            }
            match (was, is) {
                (false, true) => edges.pressed.push(action),
                (true, false) => edges.released.push(action),
                _ => {}
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_layout() {
        let map = ButtonMap::default();
        assert_eq!(map.action(1), Some(CaptureAction::Capture));
        assert_eq!(map.action(15), Some(CaptureAction::Delete));
        assert_eq!(map.action(11), None);
        assert_eq!(map.action(14), None);
        assert_eq!(map.channel(CaptureAction::Gallery), Some(6));
        for action in CaptureAction::ALL {
            assert!(map.channel(action).is_some(), "{action:?} unbound");
        }
    }

    #[test]
    fn test_names_round_trip() {
        for action in CaptureAction::ALL {
            assert_eq!(CaptureAction::from_name(action.name()), Some(action));
        }
        assert_eq!(CaptureAction::from_name("teleport"), None);
    }

    #[test]
    fn test_override_moves_binding() {
        let overrides = BTreeMap::from([("delete".to_string(), 14u8)]);
        let map = ButtonMap::with_overrides(&overrides).unwrap();
        assert_eq!(map.action(14), Some(CaptureAction::Delete));
        assert_eq!(map.action(15), None);
    }

    #[test]
    fn test_override_errors() {
        let unknown = BTreeMap::from([("warp".to_string(), 1u8)]);
        assert_eq!(
            ButtonMap::with_overrides(&unknown),
            Err(CaptureError::UnknownAction("warp".to_string()))
        );
        let out_of_range = BTreeMap::from([("capture".to_string(), 16u8)]);
        assert!(matches!(
            ButtonMap::with_overrides(&out_of_range),
            Err(CaptureError::ChannelOutOfRange { channel: 16, .. })
        ));
    }

    #[test]
    fn test_edges_detect_press_release_and_hold() {
        let map = ButtonMap::default();
        let previous = InputFrame::default().with_channel(1).with_channel(9);
        let current = InputFrame::default().with_channel(9).with_channel(5);
        let edges = map.edges(previous.buttons, current.buttons);
        assert_eq!(edges.pressed, vec![CaptureAction::Next]);
        assert_eq!(edges.released, vec![CaptureAction::Capture]);
        assert!(edges.is_held(CaptureAction::Shrink));
        assert!(!edges.is_held(CaptureAction::Capture));
    }

    #[test]
    fn test_unbound_channels_ignored() {
        let map = ButtonMap::default();
        let edges = map.edges(0, 1 << 11);
        assert_eq!(edges, ButtonEdges::default());
    }

    #[test]
    fn test_frame_parses_from_ron_without_platform() {
        let frame: InputFrame = ron::from_str(
            "(buttons: 2, pose: (1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0))",
        )
        .unwrap();
        assert!(frame.is_held(1));
        assert_eq!(frame.platform, Mat4::IDENTITY);
    }
}
