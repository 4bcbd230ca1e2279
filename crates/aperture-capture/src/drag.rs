//! Dragging the exit pose with the device.

use glam::{Mat4, Vec3};

/// Device and exit poses latched when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    /// Device pose at drag start.
    pub device: Mat4,
    /// Exit pose at drag start.
    pub exit: Mat4,
}

/// Exit pose after the device moved from `anchor.device` to `device_now`.
///
/// The device motion `Δ = now · anchor⁻¹` is split into rotation and
/// translation; the translation is multiplied by the portal scale so that
/// a scaled-down exit scene is traversed proportionally.
pub fn drag_exit_pose(anchor: &DragAnchor, device_now: Mat4, scale: f32) -> Mat4 {
    let delta = device_now * anchor.device.inverse();
    let (_, rotation, translation) = delta.to_scale_rotation_translation();
    Mat4::from_translation(translation * scale) * Mat4::from_quat(rotation) * anchor.exit
}

/// Pose of the device frame: the device pose lifted by half the panel
/// height, so the panel's bottom edge sits on the tracked point.
pub fn device_frame(platform: Mat4, pose: Mat4, height: f32) -> Mat4 {
    platform * pose * Mat4::from_translation(Vec3::new(0.0, height * 0.5, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn test_no_motion_keeps_exit() {
        let anchor = DragAnchor {
            device: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            exit: Mat4::from_translation(Vec3::new(-4.0, 0.0, 9.0)),
        };
        assert!(approx(drag_exit_pose(&anchor, anchor.device, 3.0), anchor.exit));
    }

    #[test]
    fn test_translation_scaled_by_portal_scale() {
        let anchor = DragAnchor {
            device: Mat4::IDENTITY,
            exit: Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        };
        let moved = Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0));
        let exit = drag_exit_pose(&anchor, moved, 4.0);
        assert!(approx(exit, Mat4::from_translation(Vec3::new(10.0, 0.0, -4.0))));
    }

    #[test]
    fn test_rotation_applies_around_origin_then_exit() {
        let a = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let b = Mat4::from_quat(rotation) * a;
        let anchor = DragAnchor {
            device: a,
            exit: Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
        };
        let delta = b * a.inverse();
        let (_, r, t) = delta.to_scale_rotation_translation();
        let expected = Mat4::from_translation(t * 0.5) * Mat4::from_quat(r) * anchor.exit;
        assert!(approx(drag_exit_pose(&anchor, b, 0.5), expected));
        let origin = drag_exit_pose(&anchor, b, 0.5).transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_device_frame_lifted_by_half_height() {
        let frame = device_frame(
            Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            0.3,
        );
        let p = frame.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(5.0, 1.15, 0.0)).length() < 1e-6);
    }
}
