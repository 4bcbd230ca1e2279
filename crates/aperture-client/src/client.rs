//! Per-tick driver of one rendering client.

use tracing::{debug, info, warn};

use aperture_config::RenderConfig;
use aperture_portal::PortalGroupSnapshot;
use aperture_scene::{SceneError, SceneGraph};

use crate::{
    ClientBindings, ClientUpstream, ClientView, MirrorObserver, ObservationSlot,
    PortalReconciler, ReconcileReport, RenderMask, SlotPose, SlotRegistry,
};

/// Outcome of one [`PortalClient::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientTick {
    /// Mirror changes made by the reconciler.
    pub reconcile: ReconcileReport,
    /// Pipelines enabled across all slots.
    pub enabled_views: usize,
}

/// Mirrors the replicated portal group and renders it for every
/// registered observation slot.
#[derive(Debug)]
pub struct PortalClient {
    scene: SceneGraph,
    bindings: ClientBindings,
    reconciler: PortalReconciler,
    render: RenderConfig,
    slots: SlotRegistry,
    views: Vec<ClientView>,
    upstream: ClientUpstream,
}

impl PortalClient {
    /// Creates a client and registers every slot in `slots`.
    pub fn new(render: &RenderConfig, slots: SlotRegistry) -> Result<Self, SceneError> {
        let mut scene = SceneGraph::new();
        let reconciler = PortalReconciler::new(&mut scene)?;
        let mut client = Self {
            scene,
            bindings: ClientBindings::new(),
            reconciler,
            render: render.clone(),
            slots: SlotRegistry::new(),
            views: Vec::new(),
            upstream: ClientUpstream::default(),
        };
        for slot in slots.iter() {
            client.register_slot(*slot);
        }
        Ok(client)
    }

    /// Client-local scene holding mirrors and views.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mirror set of the replicated portal group.
    pub fn reconciler(&self) -> &PortalReconciler {
        &self.reconciler
    }

    /// Slots currently served.
    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    /// View owners, one per registered slot.
    pub fn views(&self) -> &[ClientView] {
        &self.views
    }

    /// Number of live binding edges.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Starts serving `slot`: creates a view of every live mirror for it
    /// and widens every camera mask by its group. Returns `false` if the
    /// registry refused the slot.
    pub fn register_slot(&mut self, slot: ObservationSlot) -> bool {
        if !self.slots.register(slot) {
            return false;
        }
        self.upstream.slot_poses.insert(slot, SlotPose::default());

        let mut owner = ClientView::new(slot, RenderMask::default(), self.render.clone());
        for mirror in self.reconciler.mirrors() {
            owner.notify_added(mirror, &mut self.scene, &mut self.bindings);
        }
        self.views.push(owner);
        self.refresh_masks();
        info!(%slot, mirrors = self.reconciler.len(), "slot registered");
        true
    }

    /// Stops serving `slot`: tears its views down in creation order, then
    /// forgets its pose. Returns `false` if it was not registered.
    pub fn unregister_slot(&mut self, slot: &ObservationSlot) -> bool {
        if !self.slots.unregister(slot) {
            return false;
        }
        if let Some(index) = self.views.iter().position(|owner| owner.slot() == slot) {
            let owner = self.views.remove(index);
            if let Err(error) = owner.teardown(&mut self.scene, &mut self.bindings) {
                warn!(%slot, %error, "slot teardown incomplete");
            }
        }
        self.upstream.slot_poses.remove(slot);
        self.refresh_masks();
        info!(%slot, "slot unregistered");
        true
    }

    fn refresh_masks(&mut self) {
        for owner in &mut self.views {
            let mask = RenderMask::for_slot(owner.slot(), &self.slots);
            owner.set_mask(mask);
        }
    }

    /// Records the tracked pose of a registered slot for the next tick.
    pub fn set_slot_pose(&mut self, slot: &ObservationSlot, pose: SlotPose) -> bool {
        match self.upstream.slot_poses.get_mut(slot) {
            Some(current) => {
                *current = pose;
                true
            }
            None => false,
        }
    }

    /// Runs one tick: reconcile, propagate bindings, evaluate every view.
    ///
    /// A `None` snapshot means the portal group was not replicated this
    /// tick. The reconciler skips and the views keep rendering the last
    /// known group with fresh slot poses.
    pub fn tick(&mut self, snapshot: Option<PortalGroupSnapshot>) -> ClientTick {
        let fresh = snapshot.is_some();
        if let Some(snapshot) = snapshot {
            self.upstream.snapshot = snapshot;
        }

        let reconcile = self.reconciler.reconcile(
            fresh.then_some(&self.upstream.snapshot),
            &mut self.scene,
            &mut self.bindings,
            &mut self.views,
        );

        // Mirrors match this snapshot and views go before their slot pose,
        // so every edge still has its upstream here.
        let propagation = self.bindings.propagate(&self.upstream, &mut self.scene);
        debug_assert!(propagation.is_clean(), "stale bindings: {propagation:?}");
        debug!(applied = propagation.applied, "bindings propagated");

        let enabled_views: usize = self
            .views
            .iter_mut()
            .map(|view| view.evaluate(self.reconciler.mirrors(), &self.upstream, &mut self.scene))
            .sum();

        ClientTick {
            reconcile,
            enabled_views,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_portal::{PortalManager, PortalModes, PortalRegistry, PortalSpec, replication};
    use glam::{Mat4, Vec3};

    fn slot(screen: u32) -> ObservationSlot {
        ObservationSlot {
            platform: 0,
            screen,
            slot: 0,
            stereo: true,
        }
    }

    fn client() -> PortalClient {
        let mut slots = SlotRegistry::new();
        slots.register(slot(0));
        slots.register(slot(1));
        let mut client = PortalClient::new(&RenderConfig::default(), slots).unwrap();
        for screen in 0..2 {
            let pose = SlotPose::mono(Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)));
            assert!(client.set_slot_pose(&slot(screen), pose));
        }
        client
    }

    fn spec() -> PortalSpec {
        PortalSpec {
            entry: Mat4::from_translation(Vec3::new(0.0, 1.5, -1.0)),
            exit: Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            scale: 1.0,
            width: 0.3,
            height: 0.3,
            modes: PortalModes::default(),
        }
    }

    #[test]
    fn test_tick_creates_views_for_every_slot() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        let a = registry.add_portal(spec());

        let tick = client.tick(Some(registry.snapshot(1)));
        assert_eq!(tick.reconcile.added, vec![a]);
        assert_eq!(tick.enabled_views, 2);
        for view in client.views() {
            assert!(view.view(a).is_some());
            assert_eq!(view.pre_render().count(), 1);
        }
        assert_eq!(client.binding_count(), 4 + 2 * 4);
    }

    #[test]
    fn test_removed_portal_releases_views() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        let a = registry.add_portal(spec());
        client.tick(Some(registry.snapshot(1)));
        let nodes = client.scene().len();

        registry.remove_portal(a);
        let tick = client.tick(Some(registry.snapshot(2)));
        assert_eq!(tick.reconcile.removed, vec![a]);
        assert_eq!(client.binding_count(), 0);
        assert!(client.views().iter().all(|v| v.views().is_empty()));
        assert!(client.scene().len() < nodes);
    }

    #[test]
    fn test_missing_snapshot_skips_tick() {
        let mut client = client();
        let tick = client.tick(None);
        assert!(tick.reconcile.skipped);
        assert!(client.reconciler().is_empty());
    }

    #[test]
    fn test_missing_snapshot_keeps_last_group_rendering() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        let a = registry.add_portal(spec());
        client.tick(Some(registry.snapshot(1)));

        let behind = SlotPose::mono(Mat4::from_translation(Vec3::new(0.0, 1.5, -2.0)));
        assert!(client.set_slot_pose(&slot(1), behind));
        let tick = client.tick(None);
        assert!(tick.reconcile.skipped);
        assert!(client.reconciler().mirror(a).is_some());
        assert_eq!(tick.enabled_views, 1);
    }

    #[test]
    fn test_slot_registered_later_gets_views_for_live_mirrors() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        let a = registry.add_portal(spec());
        let b = registry.add_portal(spec());
        client.tick(Some(registry.snapshot(1)));
        let bindings = client.binding_count();

        assert!(client.register_slot(slot(2)));
        assert!(!client.register_slot(slot(2)));
        assert_eq!(client.views().len(), 3);
        let late = &client.views()[2];
        assert!(late.view(a).is_some());
        assert!(late.view(b).is_some());
        assert_eq!(client.binding_count(), bindings + 2 * 4);
        for owner in client.views() {
            assert!(owner.mask().excludes("s2_slot0"));
            assert!(
                owner
                    .views()
                    .iter()
                    .all(|view| view.camera().mask.excludes("s2_slot0"))
            );
        }

        let pose = SlotPose::mono(Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)));
        assert!(client.set_slot_pose(&slot(2), pose));
        let tick = client.tick(Some(registry.snapshot(2)));
        assert_eq!(tick.enabled_views, 6);
    }

    #[test]
    fn test_unregistered_slot_releases_its_views() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        let a = registry.add_portal(spec());
        client.tick(Some(registry.snapshot(1)));
        let nodes = client.scene().len();

        assert!(client.unregister_slot(&slot(1)));
        assert!(!client.unregister_slot(&slot(1)));
        assert_eq!(client.views().len(), 1);
        assert_eq!(client.binding_count(), 4 + 4);
        assert_eq!(client.scene().len(), nodes - 5);
        assert!(!client.set_slot_pose(&slot(1), SlotPose::default()));

        let remaining = &client.views()[0];
        assert!(!remaining.mask().excludes("s1_slot0"));
        assert!(!remaining.view(a).unwrap().camera().mask.excludes("s1_slot0"));

        let tick = client.tick(Some(registry.snapshot(2)));
        assert_eq!(tick.enabled_views, 1);
        assert!(client.reconciler().mirror(a).is_some());
    }

    #[test]
    fn test_decoded_snapshot_drives_client() {
        let mut client = client();
        let mut registry = PortalRegistry::new();
        registry.add_portal(spec());
        registry.add_portal(spec());
        let bytes = replication::encode(&registry.snapshot(3)).unwrap();
        let snapshot = replication::decode(&bytes).unwrap();

        client.tick(Some(snapshot));
        assert_eq!(client.reconciler().len(), 2);
    }

    #[test]
    fn test_unregistered_slot_pose_rejected() {
        let mut client = client();
        assert!(!client.set_slot_pose(&slot(9), SlotPose::default()));
    }

    #[test]
    fn test_portal_views_do_not_see_portal_quads() {
        let client = client();
        for view in client.views() {
            assert!(view.mask().excludes("s0_slot0"));
            assert!(view.mask().excludes("s1_slot0"));
        }
    }
}
