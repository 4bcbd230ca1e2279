//! Recorded capture-device input played back one frame per tick.

use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};

use aperture_capture::InputFrame;
use aperture_config::PortalConfig;

/// Errors loading an input script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read input script {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse input script {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// A list of input frames, one per tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputScript {
    frames: Vec<InputFrame>,
}

impl InputScript {
    pub fn new(frames: Vec<InputFrame>) -> Self {
        Self { frames }
    }

    /// Reads a RON list of [`InputFrame`]s.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let frames = ron::from_str(&text).map_err(|source| ScriptError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame for `tick`. Past the end the device rests at the last pose
    /// with every button released.
    pub fn frame(&self, tick: u64) -> InputFrame {
        let index = usize::try_from(tick).unwrap_or(usize::MAX);
        match self.frames.get(index) {
            Some(frame) => *frame,
            None => self
                .frames
                .last()
                .map(|last| InputFrame { buttons: 0, ..*last })
                .unwrap_or_default(),
        }
    }

    /// Built-in walkthrough: capture, drag, shrink, clip, capture a second
    /// portal, browse the gallery, grab the focused portal, delete it.
    pub fn demo(portal: &PortalConfig) -> Self {
        let rest = Mat4::from_translation(Vec3::new(0.0, 1.2, 0.3));
        let mut script = ScriptWriter::new(rest);

        script.idle(10);
        script.click(CAPTURE);
        script.idle(8);

        script.hold(CAPTURE, 1);
        for i in 1..=60 {
            let t = i as f32 / 60.0;
            script.pose = Mat4::from_rotation_translation(
                Quat::from_rotation_y(0.4 * t),
                Vec3::new(0.2 * t, 1.2, 0.3 - 0.5 * t),
            );
            script.hold(CAPTURE, 1);
        }
        script.idle(5);
        script.pose = rest;

        script.hold(SHRINK, 60);
        script.click(PARALLAX_OFF);
        script.click(CLOSE);
        script.idle(5);

        script.click(CAPTURE);
        script.click(MODE_2D);
        script.click(CLOSE);
        script.click(OPEN);
        script.idle(5);

        script.click(GALLERY);
        script.click(NEXT);
        script.idle(10);
        // Raise the device frame into the focused carousel slot.
        let lift = portal.gallery_magnification * portal.height - portal.height * 0.5;
        script.pose = rest * Mat4::from_translation(Vec3::new(0.0, lift, 0.0));
        script.idle(5);
        script.pose = rest;
        script.idle(5);

        script.click(DELETE);
        script.idle(10);
        Self::new(script.frames)
    }
}

const CAPTURE: usize = 1;
const CLOSE: usize = 2;
const OPEN: usize = 3;
const NEXT: usize = 5;
const GALLERY: usize = 6;
const MODE_2D: usize = 7;
const SHRINK: usize = 9;
const PARALLAX_OFF: usize = 13;
const DELETE: usize = 15;

struct ScriptWriter {
    pose: Mat4,
    frames: Vec<InputFrame>,
}

impl ScriptWriter {
    fn new(pose: Mat4) -> Self {
        Self {
            pose,
            frames: Vec::new(),
        }
    }

    fn push(&mut self, buttons: u16) {
        self.frames.push(InputFrame {
            buttons,
            pose: self.pose,
            platform: Mat4::IDENTITY,
        });
    }

    fn idle(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.push(0);
        }
    }

    fn hold(&mut self, channel: usize, ticks: usize) {
        for _ in 0..ticks {
            self.push(1 << channel);
        }
    }

    fn click(&mut self, channel: usize) {
        self.hold(channel, 1);
        self.idle(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_past_end_releases_buttons() {
        let pose = Mat4::from_translation(Vec3::X);
        let script = InputScript::new(vec![InputFrame::at(pose).with_channel(1)]);
        assert!(script.frame(0).is_held(1));
        let after = script.frame(5);
        assert_eq!(after.buttons, 0);
        assert_eq!(after.pose, pose);
        assert_eq!(InputScript::default().frame(3), InputFrame::default());
    }

    #[test]
    fn test_load_from_ron_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.ron");
        std::fs::write(
            &path,
            "[(buttons: 2, pose: (1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0))]",
        )
        .unwrap();
        let script = InputScript::load(&path).unwrap();
        assert_eq!(script.len(), 1);
        assert!(script.frame(0).is_held(1));
        assert_eq!(script.frame(0).pose.w_axis.y, 1.0);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = InputScript::load(&dir.path().join("missing.ron"));
        assert!(matches!(missing, Err(ScriptError::Read { .. })));

        let path = dir.path().join("bad.ron");
        std::fs::write(&path, "[(buttons: \"x\")]").unwrap();
        assert!(matches!(
            InputScript::load(&path),
            Err(ScriptError::Parse { .. })
        ));
    }

    #[test]
    fn test_demo_is_non_trivial() {
        let script = InputScript::demo(&PortalConfig::default());
        assert!(script.len() > 200);
        assert!(script.frame(10).is_held(CAPTURE));
    }
}
