//! Per-view portal renderer: one camera, pipeline, and output texture per
//! (mirror, observation slot) pair.

use glam::{DVec3, Mat4, Vec3, Vec4};
use tracing::{debug, trace};

use aperture_config::RenderConfig;
use aperture_portal::{BorderMaterial, PortalId, ViewingMode};
use aperture_scene::{
    BoundValue, DO_NOT_DISPLAY_GROUP, NodeId, NodeKind, SceneError, SceneGraph, SubscriptionId,
};

use crate::{
    ClientBindings, ClientUpstream, ObservationSlot, PortalCamera, PortalMirror, PortalPipeline,
    RenderMask,
};

/// Viewer position used by the 2D viewing mode, in front of the exit pose.
const MONO_VIEWPOINT: Vec3 = Vec3::new(0.0, 0.0, 0.5);

/// Angle in degrees between the eye-to-panel vector and the panel's view
/// axis. `None` when either vector has zero length.
pub fn view_angle(eye: DVec3, panel: DVec3, axis: DVec3) -> Option<f64> {
    let to_panel = panel - eye;
    let lengths = to_panel.length() * axis.length();
    if lengths <= f64::EPSILON {
        return None;
    }
    let cos = (to_panel.dot(axis) / lengths).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Returns `true` if a viewer at `eye` sees the front of a panel at
/// `panel` whose world view axis is `axis` (the panel's local -Z).
pub fn faces_viewer(eye: DVec3, panel: DVec3, axis: DVec3) -> bool {
    view_angle(eye, panel, axis).is_some_and(|angle| angle < 90.0)
}

/// Clipping plane `(normal, offset)` for an exit frame world transform.
///
/// The normal is the frame's -Z axis rotated into world space; the offset
/// is the z component of the rotated frame position.
pub fn clipping_plane(exit_world: Mat4) -> Vec4 {
    let (_, rotation, translation) = exit_world.to_scale_rotation_translation();
    let normal = rotation * Vec3::NEG_Z;
    let offset = (rotation * translation).z;
    normal.extend(offset)
}

/// Output texture name, `{portal}_s{screen}_slot{slot}`.
pub fn texture_name(portal: &str, slot: &ObservationSlot) -> String {
    format!("{}_{}", portal, slot.group_name())
}

/// Renderer serving one mirror for one observation slot.
#[derive(Debug)]
pub struct PortalView {
    portal: PortalId,
    slot: ObservationSlot,
    placeholder: String,
    viewer: NodeId,
    left_eye: NodeId,
    right_eye: NodeId,
    quad: NodeId,
    border: NodeId,
    subscriptions: Vec<SubscriptionId>,
    camera: PortalCamera,
    pipeline: PortalPipeline,
    facing: bool,
}

impl PortalView {
    /// Builds the viewer-in-exit-space frame, the textured panel, the
    /// border, the camera, and the pipeline.
    pub fn new(
        mirror: &PortalMirror,
        slot: ObservationSlot,
        mask: RenderMask,
        render: &RenderConfig,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Result<Self, SceneError> {
        let group = slot.group_name();
        let texture = texture_name(mirror.name(), &slot);

        let viewer = scene.create_child(mirror.scale_node(), group.as_str(), NodeKind::Transform)?;
        let left_eye = scene.create_child(viewer, "eyeL", NodeKind::Transform)?;
        let right_eye = scene.create_child(viewer, "eyeR", NodeKind::Transform)?;

        let (width, height) = match scene.kind(mirror.screen_node()) {
            Some(NodeKind::Screen { width, height }) => (*width, *height),
            _ => return Err(SceneError::UnknownNode(mirror.screen_node())),
        };
        let quad = scene.create_child(
            mirror.entry_node(),
            texture.as_str(),
            NodeKind::TexturedQuad {
                texture: render.placeholder_texture.clone(),
                width,
                height,
                stereo: slot.stereo,
            },
        )?;
        scene.add_group(quad, &group)?;
        let border = scene.create_child(
            mirror.entry_node(),
            format!("{group}_border"),
            NodeKind::Geometry { material: None },
        )?;
        scene.add_group(border, &group)?;

        let subscriptions = Self::subscribe(
            mirror.id(),
            slot,
            [viewer, left_eye, right_eye, quad],
            scene,
            bindings,
        );

        let screen = scene.path(mirror.screen_node())?;
        let camera = PortalCamera {
            projection: mirror.modes().projection,
            left_screen: screen.clone(),
            right_screen: screen,
            left_eye: scene.path(left_eye)?,
            right_eye: scene.path(right_eye)?,
            mask,
        };
        let pipeline = PortalPipeline::from_viewer(&render.viewer, render, slot.stereo, texture);

        debug!(portal = %mirror.id(), slot = %slot, texture = %pipeline.output_texture, "view created");
        Ok(Self {
            portal: mirror.id(),
            slot,
            placeholder: render.placeholder_texture.clone(),
            viewer,
            left_eye,
            right_eye,
            quad,
            border,
            subscriptions,
            camera,
            pipeline,
            facing: false,
        })
    }

    fn subscribe(
        portal: PortalId,
        slot: ObservationSlot,
        [viewer, left_eye, right_eye, quad]: [NodeId; 4],
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Vec<SubscriptionId> {
        vec![
            bindings.subscribe(scene, viewer, move |up: &ClientUpstream| {
                let p = up.snapshot.get(portal)?;
                let pose = up.slot_pose(&slot)?;
                Some(BoundValue::Transform(match p.modes.viewing {
                    ViewingMode::ThreeD => p.entry.inverse() * pose.world,
                    ViewingMode::TwoD => Mat4::from_translation(MONO_VIEWPOINT),
                }))
            }),
            bindings.subscribe(scene, left_eye, move |up: &ClientUpstream| {
                let p = up.snapshot.get(portal)?;
                let pose = up.slot_pose(&slot)?;
                Some(BoundValue::Transform(match p.modes.viewing {
                    ViewingMode::ThreeD => pose.left_eye,
                    ViewingMode::TwoD => Mat4::IDENTITY,
                }))
            }),
            bindings.subscribe(scene, right_eye, move |up: &ClientUpstream| {
                let p = up.snapshot.get(portal)?;
                let pose = up.slot_pose(&slot)?;
                Some(BoundValue::Transform(match p.modes.viewing {
                    ViewingMode::ThreeD => pose.right_eye,
                    ViewingMode::TwoD => Mat4::IDENTITY,
                }))
            }),
            bindings.subscribe(scene, quad, move |up: &ClientUpstream| {
                up.snapshot.get(portal).map(|p| BoundValue::Size {
                    width: p.width,
                    height: p.height,
                })
            }),
        ]
    }

    /// Portal this view renders.
    pub fn portal(&self) -> PortalId {
        self.portal
    }

    /// Slot this view renders for.
    pub fn slot(&self) -> &ObservationSlot {
        &self.slot
    }

    /// Camera rendering the exit scene.
    pub fn camera(&self) -> &PortalCamera {
        &self.camera
    }

    /// Render settings and output texture.
    pub fn pipeline(&self) -> &PortalPipeline {
        &self.pipeline
    }

    /// Textured panel node.
    pub fn quad_node(&self) -> NodeId {
        self.quad
    }

    /// Border node.
    pub fn border_node(&self) -> NodeId {
        self.border
    }

    /// Viewer-in-exit-space node.
    pub fn viewer_node(&self) -> NodeId {
        self.viewer
    }

    /// Replaces the camera's render mask after the slot set changed.
    pub fn set_mask(&mut self, mask: RenderMask) {
        self.camera.mask = mask;
    }

    /// Whether the viewer faced the panel on the last evaluation.
    pub fn is_facing(&self) -> bool {
        self.facing
    }

    /// Per-tick update; bindings must have been propagated already.
    pub fn evaluate(
        &mut self,
        mirror: &PortalMirror,
        upstream: &ClientUpstream,
        scene: &mut SceneGraph,
    ) -> Result<(), SceneError> {
        let modes = mirror.modes();
        self.camera.projection = modes.projection;

        self.pipeline.clipping_plane = if modes.parallax.clips() {
            Some(clipping_plane(scene.world_transform(mirror.exit_node())?))
        } else {
            None
        };

        let panel = scene.world_transform(self.quad)?;
        self.facing = match upstream.slot_pose(&self.slot) {
            Some(pose) => faces_viewer(
                pose.world.w_axis.truncate().as_dvec3(),
                panel.w_axis.truncate().as_dvec3(),
                panel.transform_vector3(Vec3::NEG_Z).as_dvec3(),
            ),
            None => false,
        };

        let shown = modes.visibility.is_shown();
        self.pipeline.enabled = shown && self.facing;
        let texture = if self.pipeline.enabled {
            self.pipeline.output_texture.clone()
        } else {
            self.placeholder.clone()
        };
        if let Some(NodeKind::TexturedQuad {
            width,
            height,
            stereo,
            ..
        }) = scene.kind(self.quad).cloned()
        {
            scene.set_kind(
                self.quad,
                NodeKind::TexturedQuad {
                    texture,
                    width,
                    height,
                    stereo,
                },
            )?;
        }

        if shown {
            scene.remove_group(self.quad, DO_NOT_DISPLAY_GROUP)?;
        } else {
            scene.add_group(self.quad, DO_NOT_DISPLAY_GROUP)?;
        }
        match (&modes.border, shown) {
            (BorderMaterial::Material(material), true) => {
                scene.set_kind(
                    self.border,
                    NodeKind::Geometry {
                        material: Some(material.clone()),
                    },
                )?;
                scene.remove_group(self.border, DO_NOT_DISPLAY_GROUP)?;
            }
            _ => scene.add_group(self.border, DO_NOT_DISPLAY_GROUP)?,
        }

        trace!(
            portal = %self.portal,
            slot = %self.slot,
            enabled = self.pipeline.enabled,
            facing = self.facing,
            "view evaluated"
        );
        Ok(())
    }

    /// Disables the pipeline, severs bindings, removes panel and border,
    /// releases camera and pipeline, then removes the viewer frame.
    pub fn teardown(
        mut self,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Result<(), SceneError> {
        self.pipeline.enabled = false;
        bindings.unsubscribe_all(scene, &self.subscriptions);
        let quad = scene.remove(self.quad);
        let border = scene.remove(self.border);
        let Self {
            camera,
            pipeline,
            viewer,
            portal,
            slot,
            ..
        } = self;
        drop(camera);
        drop(pipeline);
        let viewer = scene.remove(viewer);
        debug!(portal = %portal, slot = %slot, "view torn down");
        quad.and(border).and(viewer).map(|_| ())
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
