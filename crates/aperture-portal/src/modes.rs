//! Portal mode record: five orthogonal settings, any combination is legal.

use serde::{Deserialize, Serialize};

/// Whether the portal view follows the observer's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewingMode {
    /// Fixed mono viewpoint in front of the exit pose.
    TwoD,
    /// The exit-space viewpoint follows the observer's eyes.
    ThreeD,
}

/// Projection of the camera rendering the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Perspective projection.
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// Whether content may appear in front of the portal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegativeParallax {
    /// Content may protrude in front of the portal surface.
    Enabled,
    /// Content in front of the portal surface is clipped away.
    Disabled,
}

/// Material drawn around the portal panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderMaterial {
    /// No border is drawn.
    Hidden,
    /// Border drawn with the given material path.
    Material(String),
}

/// Whether the portal is displayed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Displayed.
    Shown,
    /// Not displayed; per-view pipelines are disabled.
    Hidden,
}

/// Display settings of one portal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalModes {
    /// Viewing mode.
    pub viewing: ViewingMode,
    /// Camera projection.
    pub projection: ProjectionMode,
    /// Negative parallax.
    pub parallax: NegativeParallax,
    /// Border material.
    pub border: BorderMaterial,
    /// Visibility.
    pub visibility: Visibility,
}

impl ViewingMode {
    /// The other viewing mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::TwoD => Self::ThreeD,
            Self::ThreeD => Self::TwoD,
        }
    }
}

impl ProjectionMode {
    /// The other projection.
    pub fn toggled(self) -> Self {
        match self {
            Self::Perspective => Self::Orthographic,
            Self::Orthographic => Self::Perspective,
        }
    }
}

impl NegativeParallax {
    /// The other parallax setting.
    pub fn toggled(self) -> Self {
        match self {
            Self::Enabled => Self::Disabled,
            Self::Disabled => Self::Enabled,
        }
    }

    /// Returns `true` if a clipping plane must be applied.
    pub fn clips(self) -> bool {
        self == Self::Disabled
    }
}

impl Visibility {
    /// Maps a boolean "shown" flag to a visibility.
    pub fn from_shown(shown: bool) -> Self {
        if shown { Self::Shown } else { Self::Hidden }
    }

    /// Returns `true` for [`Visibility::Shown`].
    pub fn is_shown(self) -> bool {
        self == Self::Shown
    }
}

impl BorderMaterial {
    /// Material path, `None` when the border is hidden.
    pub fn material(&self) -> Option<&str> {
        match self {
            Self::Hidden => None,
            Self::Material(path) => Some(path),
        }
    }
}

impl Default for PortalModes {
    fn default() -> Self {
        Self {
            viewing: ViewingMode::ThreeD,
            projection: ProjectionMode::Perspective,
            parallax: NegativeParallax::Enabled,
            border: BorderMaterial::Material("data/materials/ShadelessBlue.gmd".to_string()),
            visibility: Visibility::Shown,
        }
    }
}

impl PortalModes {
    /// Flips between 2D and 3D viewing.
    pub fn switch_viewing_mode(&mut self) {
        self.viewing = self.viewing.toggled();
    }

    /// Flips between perspective and orthographic projection.
    pub fn switch_projection_mode(&mut self) {
        self.projection = self.projection.toggled();
    }

    /// Flips negative parallax on/off.
    pub fn switch_negative_parallax(&mut self) {
        self.parallax = self.parallax.toggled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_are_independent() {
        let mut modes = PortalModes::default();
        modes.switch_viewing_mode();
        assert_eq!(modes.viewing, ViewingMode::TwoD);
        assert_eq!(modes.projection, ProjectionMode::Perspective);
        assert_eq!(modes.parallax, NegativeParallax::Enabled);

        modes.switch_negative_parallax();
        modes.switch_projection_mode();
        assert_eq!(modes.viewing, ViewingMode::TwoD);
        assert_eq!(modes.projection, ProjectionMode::Orthographic);
        assert!(modes.parallax.clips());
        assert!(modes.visibility.is_shown());
    }

    #[test]
    fn test_hidden_border_has_no_material() {
        assert_eq!(BorderMaterial::Hidden.material(), None);
        assert_eq!(
            BorderMaterial::Material("a.gmd".to_string()).material(),
            Some("a.gmd")
        );
    }

    #[test]
    fn test_modes_serialize_as_tagged_enums() {
        let json = serde_json::to_string(&PortalModes::default()).unwrap();
        assert!(json.contains("\"viewing\":\"ThreeD\""));
        assert!(json.contains("\"visibility\":\"Shown\""));
    }
}
