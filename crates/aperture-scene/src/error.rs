//! Scene graph error types.

use crate::NodeId;

/// Errors returned by structural scene graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The node was removed or never existed.
    #[error("unknown or stale node {0:?}")]
    UnknownNode(NodeId),

    /// Attaching would make a node its own ancestor.
    #[error("attaching {child:?} below {parent:?} would create a cycle")]
    Cycle {
        /// Requested parent.
        parent: NodeId,
        /// Requested child.
        child: NodeId,
    },

    /// The root node cannot be detached or removed.
    #[error("the scene root cannot be detached or removed")]
    RootImmutable,
}
