//! Client scene stored in a `bevy_ecs` [`World`]: every node is an entity
//! carrying name, transform, kind, group, and hierarchy components.

use std::collections::BTreeSet;
use std::fmt;

use bevy_ecs::prelude::*;
use glam::Mat4;

use crate::SceneError;

/// Handle to a node in a [`SceneGraph`].
///
/// Entity generations keep a handle to a despawned node from aliasing a
/// node spawned later in the same slot.
pub type NodeId = Entity;

/// Name used to build the node path.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct NodeName(pub String);

/// Transform relative to the parent node.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform(pub Mat4);

impl Default for LocalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// What a node represents to the renderer.
#[derive(Component, Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform/grouping node.
    Transform,
    /// A screen rectangle cameras project onto.
    Screen {
        /// Width in local units.
        width: f32,
        /// Height in local units.
        height: f32,
    },
    /// A quad textured with a named render target.
    TexturedQuad {
        /// Name of the texture sampled by the quad.
        texture: String,
        /// Width in local units.
        width: f32,
        /// Height in local units.
        height: f32,
        /// Whether the texture holds a left/right stereo pair.
        stereo: bool,
    },
    /// Loaded geometry with an optional material override.
    Geometry {
        /// Material path, `None` for the loader's default.
        material: Option<String>,
    },
}

/// Group names used by camera render masks.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups(pub BTreeSet<String>);

/// Parent link, `None` for the root and for detached nodes.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneParent(pub Option<Entity>);

/// Children in insertion order.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneChildren(pub Vec<Entity>);

#[derive(Bundle)]
struct NodeBundle {
    name: NodeName,
    transform: LocalTransform,
    kind: NodeKind,
    groups: Groups,
    parent: SceneParent,
    children: SceneChildren,
}

/// Scene hierarchy with a single root, backed by an ECS world.
pub struct SceneGraph {
    world: World,
    root: Entity,
}

impl SceneGraph {
    /// Creates a graph containing only the root node.
    pub fn new() -> Self {
        let mut world = World::new();
        let root = world.spawn(Self::bundle("", NodeKind::Transform)).id();
        Self { world, root }
    }

    fn bundle(name: impl Into<String>, kind: NodeKind) -> NodeBundle {
        NodeBundle {
            name: NodeName(name.into()),
            transform: LocalTransform::default(),
            kind,
            groups: Groups::default(),
            parent: SceneParent::default(),
            children: SceneChildren::default(),
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.world
            .iter_entities()
            .filter(|entity| entity.contains::<NodeName>())
            .count()
    }

    /// Returns `true` if only the root exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Spawns a detached node.
    pub fn create(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.world.spawn(Self::bundle(name, kind)).id()
    }

    /// Spawns a node and attaches it below `parent`.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, SceneError> {
        self.require(parent)?;
        let child = self.create(name, kind);
        self.attach(parent, child)?;
        Ok(child)
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.world.get::<NodeName>(id).is_some()
    }

    fn require(&self, id: NodeId) -> Result<(), SceneError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(SceneError::UnknownNode(id))
        }
    }

    /// Node name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.world.get::<NodeName>(id).map(|name| name.0.as_str())
    }

    /// Local transform of a node.
    pub fn transform(&self, id: NodeId) -> Option<Mat4> {
        self.world.get::<LocalTransform>(id).map(|t| t.0)
    }

    /// Renderer-facing kind of a node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.world.get::<NodeKind>(id)
    }

    /// Replaces the kind of a node. Writing an equal value leaves the
    /// component unchanged.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) -> Result<(), SceneError> {
        let mut current = self
            .world
            .get_mut::<NodeKind>(id)
            .ok_or(SceneError::UnknownNode(id))?;
        current.set_if_neq(kind);
        Ok(())
    }

    /// Parent node, `None` for the root, detached, and unknown nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.world.get::<SceneParent>(id).and_then(|link| link.0)
    }

    /// Children in insertion order; empty for unknown nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.world
            .get::<SceneChildren>(id)
            .map(|children| children.0.as_slice())
            .unwrap_or_default()
    }

    /// Attaches `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.require(parent)?;
        self.require(child)?;
        if child == self.root {
            return Err(SceneError::RootImmutable);
        }

        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(SceneError::Cycle { parent, child });
            }
            cursor = self.parent(ancestor);
        }

        self.detach(child)?;
        if let Some(mut children) = self.world.get_mut::<SceneChildren>(parent) {
            children.0.push(child);
        }
        if let Some(mut link) = self.world.get_mut::<SceneParent>(child) {
            link.0 = Some(parent);
        }
        Ok(())
    }

    /// Detaches `child` from its parent. A no-op for already detached nodes.
    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootImmutable);
        }
        self.require(child)?;
        let Some(parent) = self.parent(child) else {
            return Ok(());
        };
        if let Some(mut children) = self.world.get_mut::<SceneChildren>(parent) {
            children.0.retain(|&c| c != child);
        }
        if let Some(mut link) = self.world.get_mut::<SceneParent>(child) {
            link.0 = None;
        }
        Ok(())
    }

    /// Detaches and despawns `id` and its whole subtree. Returns the number
    /// of nodes despawned.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, SceneError> {
        self.detach(id)?;

        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(current) = stack.pop() {
            if let Some(children) = self.world.get::<SceneChildren>(current) {
                stack.extend(children.0.iter().copied());
            }
            if self.world.despawn(current) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Sets the local transform of a node.
    pub fn set_transform(&mut self, id: NodeId, transform: Mat4) -> Result<(), SceneError> {
        let mut local = self
            .world
            .get_mut::<LocalTransform>(id)
            .ok_or(SceneError::UnknownNode(id))?;
        local.set_if_neq(LocalTransform(transform));
        Ok(())
    }

    /// Composes local transforms from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut world = self.transform(id).ok_or(SceneError::UnknownNode(id))?;
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            let local = self.transform(parent).ok_or(SceneError::UnknownNode(parent))?;
            world = local * world;
            cursor = self.parent(parent);
        }
        Ok(world)
    }

    /// Slash-separated path from the root, e.g. `/portals/portal_1/entry`.
    pub fn path(&self, id: NodeId) -> Result<String, SceneError> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            names.push(self.name(node).ok_or(SceneError::UnknownNode(node))?);
            current = self.parent(node);
        }
        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }

    /// Adds `group` to the node's group names.
    pub fn add_group(&mut self, id: NodeId, group: &str) -> Result<(), SceneError> {
        let mut groups = self
            .world
            .get_mut::<Groups>(id)
            .ok_or(SceneError::UnknownNode(id))?;
        if !groups.0.contains(group) {
            groups.0.insert(group.to_string());
        }
        Ok(())
    }

    /// Removes `group` from the node's group names.
    pub fn remove_group(&mut self, id: NodeId, group: &str) -> Result<(), SceneError> {
        let mut groups = self
            .world
            .get_mut::<Groups>(id)
            .ok_or(SceneError::UnknownNode(id))?;
        if groups.0.contains(group) {
            groups.0.remove(group);
        }
        Ok(())
    }

    /// Returns `true` if the node exists and carries `group`.
    pub fn has_group(&self, id: NodeId, group: &str) -> bool {
        self.world
            .get::<Groups>(id)
            .is_some_and(|groups| groups.0.contains(group))
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("root", &self.root)
            .field("nodes", &self.len())
            .finish()
    }
}
