//! View owner: the set of portal views serving one observation slot.

use tracing::{debug, warn};

use aperture_config::RenderConfig;
use aperture_portal::PortalId;
use aperture_scene::{SceneError, SceneGraph};

use crate::{
    ClientBindings, ClientUpstream, MirrorObserver, ObservationSlot, PortalCamera, PortalMirror,
    PortalPipeline, PortalView, RenderMask,
};

/// Creates a [`PortalView`] for every mirror and renders it for one slot.
#[derive(Debug)]
pub struct ClientView {
    slot: ObservationSlot,
    mask: RenderMask,
    render: RenderConfig,
    views: Vec<PortalView>,
}

impl ClientView {
    /// View owner for `slot`; views are added as mirrors are announced.
    pub fn new(slot: ObservationSlot, mask: RenderMask, render: RenderConfig) -> Self {
        Self {
            slot,
            mask,
            render,
            views: Vec::new(),
        }
    }

    /// Slot served by this owner.
    pub fn slot(&self) -> &ObservationSlot {
        &self.slot
    }

    /// Render mask shared by every camera of this owner.
    pub fn mask(&self) -> &RenderMask {
        &self.mask
    }

    /// Replaces the render mask of this owner and of all its cameras.
    pub fn set_mask(&mut self, mask: RenderMask) {
        for view in &mut self.views {
            view.set_mask(mask.clone());
        }
        self.mask = mask;
    }

    /// Views in mirror creation order.
    pub fn views(&self) -> &[PortalView] {
        &self.views
    }

    /// View of `portal`.
    pub fn view(&self, portal: PortalId) -> Option<&PortalView> {
        self.views.iter().find(|v| v.portal() == portal)
    }

    /// Evaluates every view. Returns how many pipelines are enabled.
    pub fn evaluate(
        &mut self,
        mirrors: &[PortalMirror],
        upstream: &ClientUpstream,
        scene: &mut SceneGraph,
    ) -> usize {
        let mut enabled = 0;
        for view in &mut self.views {
            let Some(mirror) = mirrors.iter().find(|m| m.matches(view.portal())) else {
                warn!(portal = %view.portal(), slot = %self.slot, "view without mirror");
                continue;
            };
            if let Err(error) = view.evaluate(mirror, upstream, scene) {
                warn!(portal = %view.portal(), slot = %self.slot, %error, "view evaluation failed");
                continue;
            }
            if view.pipeline().enabled {
                enabled += 1;
            }
        }
        enabled
    }

    /// Tears down every view in creation order. Keeps going past a failed
    /// teardown and returns the first error.
    pub fn teardown(
        self,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Result<(), SceneError> {
        let slot = self.slot;
        let count = self.views.len();
        let mut result = Ok(());
        for view in self.views {
            let portal = view.portal();
            if let Err(error) = view.teardown(scene, bindings) {
                warn!(%portal, %slot, %error, "view teardown incomplete");
                result = result.and(Err(error));
            }
        }
        debug!(%slot, views = count, "slot views torn down");
        result
    }

    /// Cameras and pipelines the renderer should run this frame.
    pub fn pre_render(&self) -> impl Iterator<Item = (&PortalCamera, &PortalPipeline)> {
        self.views
            .iter()
            .filter(|v| v.pipeline().enabled)
            .map(|v| (v.camera(), v.pipeline()))
    }
}

impl MirrorObserver for ClientView {
    fn notify_added(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) {
        if self.view(mirror.id()).is_some() {
            return;
        }
        match PortalView::new(
            mirror,
            self.slot,
            self.mask.clone(),
            &self.render,
            scene,
            bindings,
        ) {
            Ok(view) => self.views.push(view),
            Err(error) => warn!(portal = %mirror.id(), slot = %self.slot, %error, "failed to create view"),
        }
    }

    fn notify_removed(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) {
        let Some(index) = self.views.iter().position(|v| v.portal() == mirror.id()) else {
            return;
        };
        let view = self.views.remove(index);
        if let Err(error) = view.teardown(scene, bindings) {
            warn!(portal = %mirror.id(), slot = %self.slot, %error, "view teardown incomplete");
        }
    }
}
