//! One-way bindings from an upstream value onto scene nodes.
//!
//! Every subscription edge is an entity in the scene world. A propagation
//! system, run once per tick by the graph's [`Schedule`], reads the
//! upstream resource and writes through to the target node components.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::Mat4;
use tracing::trace;

use crate::{LocalTransform, NodeId, NodeKind, SceneGraph};

/// A value a binding writes into its target node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundValue {
    /// Replaces the node's local transform.
    Transform(Mat4),
    /// Replaces the width/height of a screen or textured quad.
    Size {
        /// New width.
        width: f32,
        /// New height.
        height: f32,
    },
}

/// Handle to one subscription edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(Entity);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub{}", self.0.index())
    }
}

type ComputeFn<U> = Box<dyn Fn(&U) -> Option<BoundValue> + Send + Sync>;

#[derive(Component)]
struct Binding<U: Send + Sync + 'static> {
    target: Entity,
    compute: ComputeFn<U>,
}

#[derive(Resource)]
struct Upstream<U: Send + Sync + 'static>(U);

/// Outcome of one [`BindingGraph::propagate`] pass.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Number of edges whose value was written.
    pub applied: usize,
    /// Edges whose upstream value no longer exists.
    pub lost: Vec<SubscriptionId>,
    /// Edges whose target node no longer exists.
    pub dangling: Vec<SubscriptionId>,
}

impl PropagationReport {
    /// Returns `true` when every edge was applied.
    pub fn is_clean(&self) -> bool {
        self.lost.is_empty() && self.dangling.is_empty()
    }
}

/// Writes every binding's value into its target. Equal values leave the
/// target untouched so `Changed<T>` only fires on real updates.
fn propagate_bindings<U: Send + Sync + 'static>(
    upstream: Res<Upstream<U>>,
    mut report: ResMut<PropagationReport>,
    bindings: Query<(Entity, &Binding<U>)>,
    mut nodes: Query<(&mut LocalTransform, &mut NodeKind)>,
) {
    for (edge, binding) in &bindings {
        let id = SubscriptionId(edge);
        let Ok((mut transform, mut kind)) = nodes.get_mut(binding.target) else {
            report.dangling.push(id);
            continue;
        };
        let Some(value) = (binding.compute)(&upstream.0) else {
            report.lost.push(id);
            continue;
        };
        match value {
            BoundValue::Transform(value) => {
                transform.set_if_neq(LocalTransform(value));
            }
            BoundValue::Size { width, height } => {
                let resized = match kind.bypass_change_detection() {
                    NodeKind::Screen {
                        width: w,
                        height: h,
                    }
                    | NodeKind::TexturedQuad {
                        width: w,
                        height: h,
                        ..
                    } => {
                        let resized = (*w, *h) != (width, height);
                        *w = width;
                        *h = height;
                        resized
                    }
                    NodeKind::Transform | NodeKind::Geometry { .. } => {
                        trace!(edge = %id, "size binding on unsized node");
                        false
                    }
                };
                if resized {
                    kind.set_changed();
                }
            }
        }
        report.applied += 1;
    }
}

/// Set of one-way subscription edges evaluated against an upstream value
/// of type `U`.
pub struct BindingGraph<U: Send + Sync + 'static> {
    schedule: Schedule,
    edges: BTreeSet<SubscriptionId>,
    upstream: PhantomData<fn(&U)>,
}

impl<U: Send + Sync + 'static> BindingGraph<U> {
    /// Creates an empty binding graph with its propagation schedule.
    pub fn new() -> Self {
        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(propagate_bindings::<U>);
        Self {
            schedule,
            edges: BTreeSet::new(),
            upstream: PhantomData,
        }
    }

    /// Number of live edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` when there are no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns `true` if `id` is still subscribed.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.edges.contains(&id)
    }

    /// Spawns an edge writing `compute(upstream)` into `target` on every
    /// propagation. `compute` returns `None` when its upstream value is gone.
    pub fn subscribe(
        &mut self,
        scene: &mut SceneGraph,
        target: NodeId,
        compute: impl Fn(&U) -> Option<BoundValue> + Send + Sync + 'static,
    ) -> SubscriptionId {
        let edge = scene
            .world_mut()
            .spawn(Binding::<U> {
                target,
                compute: Box::new(compute),
            })
            .id();
        let id = SubscriptionId(edge);
        self.edges.insert(id);
        id
    }

    /// Despawns one edge. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, scene: &mut SceneGraph, id: SubscriptionId) -> bool {
        if !self.edges.remove(&id) {
            return false;
        }
        scene.world_mut().despawn(id.0)
    }

    /// Despawns every edge in `ids`, returning how many were live.
    pub fn unsubscribe_all(&mut self, scene: &mut SceneGraph, ids: &[SubscriptionId]) -> usize {
        ids.iter()
            .filter(|&&id| self.unsubscribe(scene, id))
            .count()
    }

    /// Runs the propagation schedule against `upstream`. Edges are not
    /// removed here; the owner decides what to do with lost or dangling
    /// edges.
    pub fn propagate(&mut self, upstream: &U, scene: &mut SceneGraph) -> PropagationReport
    where
        U: Clone,
    {
        let world = scene.world_mut();
        world.insert_resource(Upstream(upstream.clone()));
        world.insert_resource(PropagationReport::default());
        self.schedule.run(world);
        world.remove_resource::<Upstream<U>>();
        world
            .remove_resource::<PropagationReport>()
            .unwrap_or_default()
    }
}

impl<U: Send + Sync + 'static> Default for BindingGraph<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Send + Sync + 'static> fmt::Debug for BindingGraph<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingGraph")
            .field("edges", &self.edges.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::collections::HashMap;

    type Poses = HashMap<&'static str, Mat4>;

    #[derive(Resource, Default)]
    struct Moved(Vec<Entity>);

    fn bound(key: &'static str) -> impl Fn(&Poses) -> Option<BoundValue> + Send + Sync {
        move |up: &Poses| up.get(key).copied().map(BoundValue::Transform)
    }

    #[test]
    fn test_propagate_writes_transforms() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(scene.root(), "entry", NodeKind::Transform)
            .unwrap();
        let mut bindings = BindingGraph::<Poses>::new();
        bindings.subscribe(&mut scene, node, bound("entry"));

        let moved = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let upstream = HashMap::from([("entry", moved)]);
        let report = bindings.propagate(&upstream, &mut scene);

        assert_eq!(report.applied, 1);
        assert!(report.is_clean());
        assert_eq!(scene.transform(node), Some(moved));
    }

    #[test]
    fn test_size_binding_updates_screen() {
        let mut scene = SceneGraph::new();
        let screen = scene
            .create_child(
                scene.root(),
                "screen",
                NodeKind::Screen {
                    width: 1.0,
                    height: 1.0,
                },
            )
            .unwrap();
        let mut bindings = BindingGraph::<(f32, f32)>::new();
        bindings.subscribe(&mut scene, screen, |&(width, height)| {
            Some(BoundValue::Size { width, height })
        });
        bindings.propagate(&(0.3, 0.4), &mut scene);

        assert_eq!(
            scene.kind(screen),
            Some(&NodeKind::Screen {
                width: 0.3,
                height: 0.4
            })
        );
    }

    #[test]
    fn test_unchanged_values_do_not_mark_nodes_changed() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(scene.root(), "entry", NodeKind::Transform)
            .unwrap();
        let mut bindings = BindingGraph::<Poses>::new();
        bindings.subscribe(&mut scene, node, bound("entry"));

        let mut detect = Schedule::default();
        detect.add_systems(
            |mut moved: ResMut<Moved>, query: Query<Entity, Changed<LocalTransform>>| {
                moved.0 = query.iter().collect();
            },
        );
        scene.world_mut().insert_resource(Moved::default());

        let upstream = HashMap::from([("entry", Mat4::from_translation(Vec3::X))]);
        bindings.propagate(&upstream, &mut scene);
        detect.run(scene.world_mut());
        assert!(scene.world_mut().resource::<Moved>().0.contains(&node));

        bindings.propagate(&upstream, &mut scene);
        detect.run(scene.world_mut());
        assert!(scene.world_mut().resource::<Moved>().0.is_empty());

        let upstream = HashMap::from([("entry", Mat4::from_translation(Vec3::Y))]);
        bindings.propagate(&upstream, &mut scene);
        detect.run(scene.world_mut());
        assert_eq!(scene.world_mut().resource::<Moved>().0, vec![node]);
    }

    #[test]
    fn test_lost_upstream_reported_and_value_kept() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(scene.root(), "exit", NodeKind::Transform)
            .unwrap();
        let mut bindings = BindingGraph::<Poses>::new();
        let id = bindings.subscribe(&mut scene, node, bound("exit"));

        let report = bindings.propagate(&HashMap::new(), &mut scene);
        assert_eq!(report.lost, vec![id]);
        assert_eq!(scene.transform(node), Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_dangling_target_reported() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(scene.root(), "gone", NodeKind::Transform)
            .unwrap();
        let mut bindings = BindingGraph::<Poses>::new();
        let id = bindings.subscribe(&mut scene, node, bound("gone"));
        scene.remove(node).unwrap();

        let report = bindings.propagate(&HashMap::from([("gone", Mat4::IDENTITY)]), &mut scene);
        assert_eq!(report.dangling, vec![id]);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_unsubscribe_despawns_edges() {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(scene.root(), "entry", NodeKind::Transform)
            .unwrap();
        let nodes = scene.len();
        let mut bindings = BindingGraph::<Poses>::new();
        let a = bindings.subscribe(&mut scene, node, bound("entry"));
        let b = bindings.subscribe(&mut scene, node, bound("entry"));
        assert_eq!(scene.len(), nodes);

        assert!(bindings.unsubscribe(&mut scene, a));
        assert!(!bindings.unsubscribe(&mut scene, a));
        assert_eq!(bindings.unsubscribe_all(&mut scene, &[a, b]), 1);
        assert!(bindings.is_empty());
        assert!(!bindings.contains(b));

        let upstream = HashMap::from([("entry", Mat4::from_scale(Vec3::splat(3.0)))]);
        let report = bindings.propagate(&upstream, &mut scene);
        assert_eq!(report.applied, 0);
        assert_eq!(scene.transform(node), Some(Mat4::IDENTITY));
    }
}
