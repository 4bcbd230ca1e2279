//! The authoritative description of one portal.

use std::fmt;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::{PortalError, PortalModes};

/// Stable portal identity, unique for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortalId(pub u64);

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal_{}", self.0)
    }
}

/// Creation parameters passed to a [`PortalManager`](crate::PortalManager).
#[derive(Debug, Clone, PartialEq)]
pub struct PortalSpec {
    /// Where the portal panel sits in the scene.
    pub entry: Mat4,
    /// The viewpoint the portal looks out from.
    pub exit: Mat4,
    /// Uniform scale of the content behind the portal.
    pub scale: f32,
    /// Panel width.
    pub width: f32,
    /// Panel height.
    pub height: f32,
    /// Initial display modes.
    pub modes: PortalModes,
}

/// One portal: entry pose, exit pose, scale, panel size, and modes.
///
/// Entry, exit, and scale together define the affine mapping from
/// portal-local space into the exit scene (see [`exit_mapping`](Self::exit_mapping)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalEntity {
    id: PortalId,
    name: String,
    /// Where the portal panel sits in the scene.
    pub entry: Mat4,
    /// The viewpoint the portal looks out from.
    pub exit: Mat4,
    scale: f32,
    /// Panel width.
    pub width: f32,
    /// Panel height.
    pub height: f32,
    /// Display modes.
    pub modes: PortalModes,
}

impl PortalEntity {
    /// Builds an entity from a creation spec. Non-positive scales fall back
    /// to 1.
    pub fn new(id: PortalId, spec: PortalSpec) -> Self {
        let scale = if is_valid_scale(spec.scale) {
            spec.scale
        } else {
            1.0
        };
        Self {
            id,
            name: id.to_string(),
            entry: spec.entry,
            exit: spec.exit,
            scale,
            width: spec.width,
            height: spec.height,
            modes: spec.modes,
        }
    }

    /// Stable identity.
    pub fn id(&self) -> PortalId {
        self.id
    }

    /// Name used for derived resources such as render target textures.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current scale factor, always finite and positive.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Sets the scale factor.
    pub fn set_scale(&mut self, scale: f32) -> Result<(), PortalError> {
        if !is_valid_scale(scale) {
            return Err(PortalError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    /// Uniform scale transform applied below the exit pose.
    pub fn scale_transform(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Maps portal-local coordinates into the exit scene.
    pub fn exit_mapping(&self) -> Mat4 {
        self.exit * self.scale_transform()
    }

    /// Shows or hides the portal.
    pub fn set_visible(&mut self, shown: bool) {
        self.modes.visibility = crate::Visibility::from_shown(shown);
    }
}

fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}
