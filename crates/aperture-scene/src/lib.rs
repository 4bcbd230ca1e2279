//! Client-local scene graph on a `bevy_ecs` world, plus the one-way binding
//! graph that mirrors replicated attributes onto nodes.
//!
//! Nodes are entities; despawning one invalidates every handle to it.
//! Bindings are subscription entities. [`BindingGraph::propagate`] runs the
//! propagation system synchronously at the start of a tick, before any
//! component logic reads the graph, and edges are despawned only through
//! an explicit unsubscribe.

mod binding;
mod error;
mod graph;

pub use binding::{BindingGraph, BoundValue, PropagationReport, SubscriptionId};
pub use error::SceneError;
pub use graph::{
    Groups, LocalTransform, NodeId, NodeKind, NodeName, SceneChildren, SceneGraph, SceneParent,
};

/// Group name that hides a node from every camera.
pub const DO_NOT_DISPLAY_GROUP: &str = "do_not_display_group";
