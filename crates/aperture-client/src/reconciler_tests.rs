use std::collections::BTreeSet;

use glam::Mat4;

use aperture_portal::{PortalManager, PortalModes, PortalRegistry, PortalSpec};

use super::*;

#[derive(Default)]
struct Recorder {
    events: Vec<(&'static str, PortalId)>,
    subtree_alive_on_remove: Vec<bool>,
}

impl MirrorObserver for Recorder {
    fn notify_added(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        _bindings: &mut ClientBindings,
    ) {
        assert!(scene.contains(mirror.screen_node()));
        self.events.push(("added", mirror.id()));
    }

    fn notify_removed(
        &mut self,
        mirror: &PortalMirror,
        scene: &mut SceneGraph,
        _bindings: &mut ClientBindings,
    ) {
        self.subtree_alive_on_remove
            .push(scene.contains(mirror.root_node()));
        self.events.push(("removed", mirror.id()));
    }
}

struct Rig {
    registry: PortalRegistry,
    scene: SceneGraph,
    bindings: ClientBindings,
    reconciler: PortalReconciler,
    observers: Vec<Recorder>,
    tick: u64,
}

impl Rig {
    fn new() -> Self {
        let mut scene = SceneGraph::new();
        let reconciler = PortalReconciler::new(&mut scene).unwrap();
        Self {
            registry: PortalRegistry::new(),
            scene,
            bindings: ClientBindings::new(),
            reconciler,
            observers: vec![Recorder::default(), Recorder::default()],
            tick: 0,
        }
    }

    fn add(&mut self) -> PortalId {
        self.registry.add_portal(PortalSpec {
            entry: Mat4::IDENTITY,
            exit: Mat4::IDENTITY,
            scale: 1.0,
            width: 0.3,
            height: 0.3,
            modes: PortalModes::default(),
        })
    }

    fn reconcile(&mut self) -> ReconcileReport {
        self.tick += 1;
        let snapshot = self.registry.snapshot(self.tick);
        self.reconcile_with(&snapshot)
    }

    fn reconcile_with(&mut self, snapshot: &PortalGroupSnapshot) -> ReconcileReport {
        self.reconciler.reconcile(
            Some(snapshot),
            &mut self.scene,
            &mut self.bindings,
            &mut self.observers,
        )
    }

    fn assert_settled(&self) {
        let upstream: BTreeSet<_> = self.registry.iter().map(|p| p.id()).collect();
        let local: Vec<_> = self.reconciler.mirrors().iter().map(|m| m.id()).collect();
        let local_set: BTreeSet<_> = local.iter().copied().collect();
        assert_eq!(local.len(), local_set.len(), "duplicate mirrors");
        assert_eq!(local_set, upstream);
        assert_eq!(self.bindings.len(), 4 * local.len());
    }
}

#[test]
fn test_mirror_set_tracks_upstream_over_a_sequence() {
    let mut rig = Rig::new();
    let a = rig.add();
    rig.reconcile();
    rig.assert_settled();

    let b = rig.add();
    let c = rig.add();
    rig.reconcile();
    rig.assert_settled();

    rig.registry.remove_portal(a);
    rig.registry.remove_portal(c);
    let d = rig.add();
    let report = rig.reconcile();
    rig.assert_settled();
    assert_eq!(report.added, vec![d]);
    assert_eq!(report.removed, vec![a, c]);

    rig.registry.remove_portal(b);
    rig.registry.remove_portal(d);
    rig.reconcile();
    rig.assert_settled();
    assert!(rig.reconciler.is_empty());
}

#[test]
fn test_redelivered_portal_is_not_mirrored_twice() {
    let mut rig = Rig::new();
    let a = rig.add();
    let first = rig.reconcile();
    let second = rig.reconcile();
    assert_eq!(first.added, vec![a]);
    assert!(second.added.is_empty());
    assert!(second.removed.is_empty());

    let mut duplicated = rig.registry.snapshot(99);
    duplicated.portals.push(duplicated.portals[0].clone());
    rig.reconcile_with(&duplicated);
    assert_eq!(rig.reconciler.len(), 1);
    rig.assert_settled();
}

#[test]
fn test_missing_upstream_skips_tick() {
    let mut rig = Rig::new();
    rig.add();
    rig.reconcile();

    let report = rig.reconciler.reconcile(
        None,
        &mut rig.scene,
        &mut rig.bindings,
        &mut rig.observers,
    );
    assert!(report.skipped);
    assert_eq!(rig.reconciler.len(), 1);
}

#[test]
fn test_observers_notified_in_order_with_live_subtree() {
    let mut rig = Rig::new();
    let a = rig.add();
    rig.reconcile();
    rig.registry.remove_portal(a);
    rig.reconcile();

    for observer in &rig.observers {
        assert_eq!(observer.events, vec![("added", a), ("removed", a)]);
        assert_eq!(observer.subtree_alive_on_remove, vec![true]);
    }
}

#[test]
fn test_modes_refreshed_on_match() {
    let mut rig = Rig::new();
    let a = rig.add();
    rig.reconcile();

    rig.registry.portal_mut(a).unwrap().modes.switch_viewing_mode();
    rig.reconcile();
    assert_eq!(
        rig.reconciler.mirror(a).unwrap().modes().viewing,
        aperture_portal::ViewingMode::TwoD
    );
}
