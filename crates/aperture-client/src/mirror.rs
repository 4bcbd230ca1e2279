//! Client-local, render-ready replica of one portal.

use aperture_portal::{PortalEntity, PortalId, PortalModes};
use aperture_scene::{BoundValue, NodeId, NodeKind, SceneError, SceneGraph, SubscriptionId};
use tracing::debug;

use crate::ClientBindings;

/// Node subtree mirroring one replicated portal.
///
/// ```text
/// portal_N
/// ├── portal_matrix        entry pose
/// └── scene_matrix         exit pose
///     └── scale_matrix     uniform scale
///         └── portal_screen  width × height
/// ```
///
/// Every node is bound one way to the matching portal attribute. The
/// bindings must be severed with [`teardown`](Self::teardown) before the
/// nodes go away.
#[derive(Debug)]
pub struct PortalMirror {
    id: PortalId,
    name: String,
    modes: PortalModes,
    root: NodeId,
    entry: NodeId,
    exit: NodeId,
    scale: NodeId,
    screen: NodeId,
    subscriptions: Vec<SubscriptionId>,
}

impl PortalMirror {
    /// Builds the subtree for `portal` under `group` and subscribes its
    /// bindings.
    pub fn build(
        portal: &PortalEntity,
        group: NodeId,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Result<Self, SceneError> {
        let root = scene.create_child(group, portal.name(), NodeKind::Transform)?;
        let entry = scene.create_child(root, "portal_matrix", NodeKind::Transform)?;
        let exit = scene.create_child(root, "scene_matrix", NodeKind::Transform)?;
        let scale = scene.create_child(exit, "scale_matrix", NodeKind::Transform)?;
        let screen = scene.create_child(
            scale,
            "portal_screen",
            NodeKind::Screen {
                width: portal.width,
                height: portal.height,
            },
        )?;

        let id = portal.id();
        let subscriptions = vec![
            bindings.subscribe(scene, entry, move |up| {
                up.snapshot.get(id).map(|p| BoundValue::Transform(p.entry))
            }),
            bindings.subscribe(scene, exit, move |up| {
                up.snapshot.get(id).map(|p| BoundValue::Transform(p.exit))
            }),
            bindings.subscribe(scene, scale, move |up| {
                up.snapshot
                    .get(id)
                    .map(|p| BoundValue::Transform(p.scale_transform()))
            }),
            bindings.subscribe(scene, screen, move |up| {
                up.snapshot.get(id).map(|p| BoundValue::Size {
                    width: p.width,
                    height: p.height,
                })
            }),
        ];

        scene.set_transform(entry, portal.entry)?;
        scene.set_transform(exit, portal.exit)?;
        scene.set_transform(scale, portal.scale_transform())?;

        debug!(portal = %id, ?root, "mirror built");
        Ok(Self {
            id,
            name: portal.name().to_string(),
            modes: portal.modes.clone(),
            root,
            entry,
            exit,
            scale,
            screen,
            subscriptions,
        })
    }

    /// Returns `true` if this mirror replicates `id`.
    pub fn matches(&self, id: PortalId) -> bool {
        self.id == id
    }

    /// Identity of the mirrored portal.
    pub fn id(&self) -> PortalId {
        self.id
    }

    /// Name of the mirrored portal.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modes as of the last [`refresh`](Self::refresh).
    pub fn modes(&self) -> &PortalModes {
        &self.modes
    }

    /// `portal_N` node, parent of the whole subtree.
    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// `portal_matrix` node, bound to the entry pose.
    pub fn entry_node(&self) -> NodeId {
        self.entry
    }

    /// `scene_matrix` node, bound to the exit pose.
    pub fn exit_node(&self) -> NodeId {
        self.exit
    }

    /// `scale_matrix` node; per-slot viewer frames hang below it.
    pub fn scale_node(&self) -> NodeId {
        self.scale
    }

    /// `portal_screen` node cameras project onto.
    pub fn screen_node(&self) -> NodeId {
        self.screen
    }

    /// Copies the non-spatial attributes of the upstream portal.
    pub fn refresh(&mut self, portal: &PortalEntity) {
        if self.modes != portal.modes {
            debug!(portal = %self.id, modes = ?portal.modes, "modes changed");
            self.modes = portal.modes.clone();
        }
    }

    /// Severs every binding, then removes the subtree.
    pub fn teardown(
        self,
        scene: &mut SceneGraph,
        bindings: &mut ClientBindings,
    ) -> Result<(), SceneError> {
        bindings.unsubscribe_all(scene, &self.subscriptions);
        let removed = scene.remove(self.root)?;
        debug!(portal = %self.id, nodes = removed, "mirror torn down");
        Ok(())
    }
}
