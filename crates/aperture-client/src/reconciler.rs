//! Per-frame diff of the replicated portal group against the local mirrors.

use aperture_portal::{PortalGroupSnapshot, PortalId};
use aperture_scene::{NodeId, NodeKind, SceneError, SceneGraph};
use tracing::{debug, info, warn};

use crate::{ClientBindings, PortalMirror};

/// Name of the group node holding every mirror.
pub const LOCAL_PORTAL_GROUP: &str = "local_portal_group";

/// Receives mirror lifecycle notifications. Implemented by the per-slot
/// view owners.
pub trait MirrorObserver {
    /// A mirror was created this tick, before any view renders it.
    fn notify_added(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    );

    /// A mirror is about to be torn down.
    fn notify_removed(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    );
}

/// Mirrors created and destroyed by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `true` if the upstream group was unavailable and nothing changed.
    pub skipped: bool,
    /// Portals that gained a mirror.
    pub added: Vec<PortalId>,
    /// Portals whose mirror was torn down.
    pub removed: Vec<PortalId>,
}

/// Keeps one [`PortalMirror`] per replicated portal.
#[derive(Debug)]
pub struct PortalReconciler {
    group: NodeId,
    mirrors: Vec<PortalMirror>,
}

impl PortalReconciler {
    /// Creates the local portal group under the scene root.
    pub fn new(scene: &mut SceneGraph) -> Result<Self, SceneError> {
        let group = scene.create_child(scene.root(), LOCAL_PORTAL_GROUP, NodeKind::Transform)?;
        Ok(Self {
            group,
            mirrors: Vec::new(),
        })
    }

    /// Group node the mirrors hang under.
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Live mirrors in creation order.
    pub fn mirrors(&self) -> &[PortalMirror] {
        &self.mirrors
    }

    /// Mirror of `id`.
    pub fn mirror(&self, id: PortalId) -> Option<&PortalMirror> {
        self.mirrors.iter().find(|m| m.matches(id))
    }

    /// Number of live mirrors.
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// Returns `true` if there are no mirrors.
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Brings the mirror set in line with `upstream`. A missing upstream
    /// group skips the tick.
    pub fn reconcile<O: MirrorObserver>(
        &mut self,
        upstream: Option<&PortalGroupSnapshot>,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
        observers: &mut [O],
    ) -> ReconcileReport {
        let Some(upstream) = upstream else {
            debug!("portal group not replicated yet, skipping reconcile");
            return ReconcileReport {
                skipped: true,
                ..ReconcileReport::default()
            };
        };

        let mut report = ReconcileReport::default();
        let mut matched = vec![false; self.mirrors.len()];

        for portal in &upstream.portals {
            if let Some(index) = self.mirrors.iter().position(|m| m.matches(portal.id())) {
                matched[index] = true;
                self.mirrors[index].refresh(portal);
                continue;
            }
            let mirror = match PortalMirror::build(portal, self.group, scene, bindings) {
                Ok(mirror) => mirror,
                Err(error) => {
                    warn!(portal = %portal.id(), %error, "failed to build mirror");
                    continue;
                }
            };
            for observer in observers.iter_mut() {
                observer.notify_added(&mirror, scene, bindings);
            }
            info!(portal = %mirror.id(), "mirror added");
            report.added.push(mirror.id());
            self.mirrors.push(mirror);
            matched.push(true);
        }

        for index in (0..matched.len()).rev() {
            if matched[index] {
                continue;
            }
            let mirror = self.mirrors.remove(index);
            report.removed.push(mirror.id());
            Self::destroy(mirror, scene, bindings, observers);
        }
        report.removed.reverse();
        report
    }

    fn destroy<O: MirrorObserver>(
        mirror: PortalMirror,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
        observers: &mut [O],
    ) {
        for observer in observers.iter_mut() {
            observer.notify_removed(&mirror, scene, bindings);
        }
        let id = mirror.id();
        match mirror.teardown(scene, bindings) {
            Ok(()) => info!(portal = %id, "mirror removed"),
            Err(error) => warn!(portal = %id, %error, "mirror teardown incomplete"),
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
