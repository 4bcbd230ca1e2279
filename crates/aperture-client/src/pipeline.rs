//! Render parameters handed to the external renderer for one portal view.

use glam::{UVec2, Vec4};

use aperture_config::{RenderConfig, ViewerPipelineConfig};
use aperture_portal::ProjectionMode;

use crate::RenderMask;

/// Render configuration of one portal view.
///
/// Cloned from the owning viewer's pipeline with ambient occlusion forced
/// off and a fixed output resolution, so that nested portal passes stay
/// cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalPipeline {
    /// Bloom, copied from the viewer.
    pub bloom: bool,
    /// Bloom intensity, copied from the viewer.
    pub bloom_intensity: f32,
    /// Bloom radius, copied from the viewer.
    pub bloom_radius: f32,
    /// Always `false` for portal pipelines.
    pub ssao: bool,
    /// Back-face culling, copied from the viewer.
    pub backface_culling: bool,
    /// Frustum culling, copied from the viewer.
    pub frustum_culling: bool,
    /// FXAA, copied from the viewer.
    pub fxaa: bool,
    /// Output resolution in pixels.
    pub resolution: UVec2,
    /// Render both eyes.
    pub stereo: bool,
    /// Sky map drawn behind the exit scene.
    pub background_texture: String,
    /// Whether the renderer should run this pipeline this frame.
    pub enabled: bool,
    /// World-space plane `(normal, offset)` clipping geometry in front of
    /// the portal surface.
    pub clipping_plane: Option<Vec4>,
    /// Name of the texture this pipeline renders into.
    pub output_texture: String,
}

impl PortalPipeline {
    /// Clones the viewer's settings for a portal view rendering into
    /// `output_texture`.
    pub fn from_viewer(
        viewer: &ViewerPipelineConfig,
        render: &RenderConfig,
        stereo: bool,
        output_texture: impl Into<String>,
    ) -> Self {
        let [width, height] = render.portal_resolution;
        Self {
            bloom: viewer.bloom,
            bloom_intensity: viewer.bloom_intensity,
            bloom_radius: viewer.bloom_radius,
            ssao: false,
            backface_culling: viewer.backface_culling,
            frustum_culling: viewer.frustum_culling,
            fxaa: viewer.fxaa,
            resolution: UVec2::new(width, height),
            stereo,
            background_texture: render.background_texture.clone(),
            enabled: false,
            clipping_plane: None,
            output_texture: output_texture.into(),
        }
    }
}

/// Camera of one portal view. Screen and eye references are scene paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalCamera {
    /// Projection mode, refreshed from the portal every tick.
    pub projection: ProjectionMode,
    /// Screen node path for the left eye.
    pub left_screen: String,
    /// Screen node path for the right eye.
    pub right_screen: String,
    /// Left eye node path.
    pub left_eye: String,
    /// Right eye node path.
    pub right_eye: String,
    /// Groups this camera does not draw.
    pub mask: RenderMask,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_clones_viewer_without_ssao() {
        let render = RenderConfig::default();
        let viewer = ViewerPipelineConfig {
            bloom: true,
            ssao: true,
            fxaa: false,
            ..ViewerPipelineConfig::default()
        };
        let pipeline = PortalPipeline::from_viewer(&viewer, &render, true, "portal_1_s0_slot0");
        assert!(pipeline.bloom);
        assert!(!pipeline.ssao);
        assert!(!pipeline.fxaa);
        assert!(pipeline.frustum_culling);
        assert_eq!(pipeline.resolution, UVec2::new(1024, 1024));
        assert_eq!(pipeline.background_texture, "data/textures/sky.jpg");
        assert!(!pipeline.enabled);
        assert_eq!(pipeline.clipping_plane, None);
    }
}
