//! Carousel layout and grab detection for the gallery state.

use glam::{Mat4, Vec3};

/// Geometry of the carousel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryLayout {
    /// Panel width.
    pub width: f32,
    /// Panel height.
    pub height: f32,
    /// Size of gallery portals relative to the panel.
    pub magnification: f32,
    /// Horizontal gap between neighbouring portals.
    pub spacing: f32,
}

impl GalleryLayout {
    /// Entry pose of the portal at `offset` places from the focused one.
    ///
    /// `station` is the carousel anchor in platform space: portals are laid
    /// out along its local x axis, raised by one magnified panel height.
    pub fn entry_pose(&self, platform: Mat4, station: Mat4, offset: isize) -> Mat4 {
        let m = self.magnification;
        let (_, rotation, position) = station.to_scale_rotation_translation();
        let shift = Vec3::new(
            m * (self.width + self.spacing) * offset as f32,
            m * self.height,
            0.0,
        );
        platform
            * Mat4::from_translation(position)
            * Mat4::from_quat(rotation)
            * Mat4::from_translation(shift)
            * Mat4::from_scale(Vec3::new(m, m, 1.0))
    }
}

/// Half extents of the box around a gallery portal that grabs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabBox {
    /// Half extents along x, y, z.
    pub half_extents: Vec3,
}

impl GrabBox {
    /// Returns `true` if `point` lies strictly inside the box centred on
    /// `center`.
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        let d = (point - center).abs();
        d.x < self.half_extents.x && d.y < self.half_extents.y && d.z < self.half_extents.z
    }

    /// Index of the first entry pose whose box contains `point`.
    pub fn first_hit(&self, entries: &[Mat4], point: Vec3) -> Option<usize> {
        entries
            .iter()
            .position(|entry| self.contains(entry.transform_point3(Vec3::ZERO), point))
    }
}

/// Steps `index` by `step` places, wrapping around a collection of `len`.
pub fn wrap_index(index: usize, step: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as isize + step).rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> GalleryLayout {
        GalleryLayout {
            width: 0.3,
            height: 0.3,
            magnification: 1.5,
            spacing: 0.05,
        }
    }

    #[test]
    fn test_focused_portal_centered_above_station() {
        let station = Mat4::from_translation(Vec3::new(0.0, 1.0, -0.5));
        let entry = layout().entry_pose(Mat4::IDENTITY, station, 0);
        let p = entry.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 1.45, -0.5)).length() < 1e-5);
    }

    #[test]
    fn test_neighbours_spaced_by_magnified_width() {
        let entry = layout().entry_pose(Mat4::IDENTITY, Mat4::IDENTITY, -2);
        let p = entry.transform_point3(Vec3::ZERO);
        assert!((p.x - -1.05).abs() < 1e-5);
        let scale = entry.to_scale_rotation_translation().0;
        assert!((scale - Vec3::new(1.5, 1.5, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_layout_follows_station_rotation() {
        let station = Mat4::from_rotation_y(std::f32::consts::PI);
        let entry = layout().entry_pose(Mat4::IDENTITY, station, 1);
        let p = entry.transform_point3(Vec3::ZERO);
        assert!((p.x - -0.525).abs() < 1e-5);
    }

    #[test]
    fn test_grab_box_is_strict() {
        let grab = GrabBox {
            half_extents: Vec3::new(0.15, 0.1, 0.05),
        };
        assert!(grab.contains(Vec3::ZERO, Vec3::new(0.1, -0.05, 0.04)));
        assert!(!grab.contains(Vec3::ZERO, Vec3::new(0.15, 0.0, 0.0)));
        assert!(!grab.contains(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.06)));
    }

    #[test]
    fn test_first_hit_wins() {
        let grab = GrabBox {
            half_extents: Vec3::splat(1.0),
        };
        let entries = [
            Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)),
        ];
        assert_eq!(grab.first_hit(&entries, Vec3::ZERO), Some(1));
        assert_eq!(grab.first_hit(&entries, Vec3::new(0.0, 9.0, 0.0)), None);
    }

    #[test]
    fn test_wrap_index() {
        assert_eq!(wrap_index(2, 1, 3), 0);
        assert_eq!(wrap_index(0, -1, 3), 2);
        assert_eq!(wrap_index(1, 1, 3), 2);
        assert_eq!(wrap_index(0, 1, 0), 0);
    }
}
