use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Affine3A;

use crate::scene::transform::Transform;

/// Shared handle to a scene node. Renderables only keep a [`Weak`] to it.
pub type NodeRef = Rc<RefCell<Node>>;

/// A scene-graph node carrying a transform and its cached world matrix.
///
/// # Change tracking
///
/// Every time the world matrix is recomputed `world_version` is bumped.
/// Children remember the parent version they were built against, so a node is
/// dirty when its own TRS changed, when an ancestor is dirty, or when the
/// parent's world matrix moved on since the last update. Observers such as
/// renderables compare the version with the one they last synced to.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,

    parent: Option<Weak<RefCell<Node>>>,
    world_matrix: Affine3A,
    world_version: u64,
    parent_version: u64,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::new(),
            parent: None,
            world_matrix: Affine3A::IDENTITY,
            world_version: 0,
            parent_version: 0,
        }
    }

    #[must_use]
    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    /// Re-parents `child`. The child is rebuilt on its next update.
    pub fn set_parent(child: &NodeRef, parent: Option<&NodeRef>) {
        let mut child = child.borrow_mut();
        child.parent = parent.map(Rc::downgrade);
        child.transform.mark_dirty();
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Whether the world matrix is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        if self.transform.is_dirty() {
            return true;
        }
        match self.parent() {
            Some(parent) => {
                let parent = parent.borrow();
                parent.is_dirty() || parent.world_version != self.parent_version
            }
            // A dropped parent leaves the node built against stale data.
            None => self.parent_version != 0,
        }
    }

    /// Brings ancestors and then this node up to date.
    /// Returns whether this node's world matrix changed.
    pub fn update_world_transform(&mut self) -> bool {
        let (parent_world, parent_version) = match self.parent() {
            Some(parent) => {
                let mut parent = parent.borrow_mut();
                parent.update_world_transform();
                (parent.world_matrix, parent.world_version)
            }
            None => (Affine3A::IDENTITY, 0),
        };

        let local_changed = self.transform.update_local_matrix();
        if !local_changed && parent_version == self.parent_version {
            return false;
        }

        self.world_matrix = parent_world * *self.transform.local_matrix();
        self.parent_version = parent_version;
        self.world_version = self.world_version.wrapping_add(1);
        true
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_version(&self) -> u64 {
        self.world_version
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn new_node_is_dirty_until_updated() {
        let mut node = Node::new("n");
        assert!(node.is_dirty());
        assert!(node.update_world_transform());
        assert!(!node.is_dirty());
        assert!(!node.update_world_transform());
        assert_eq!(node.world_version(), 1);
    }

    #[test]
    fn child_follows_parent() {
        let parent = Node::new("parent").into_ref();
        let child = Node::new("child").into_ref();
        Node::set_parent(&child, Some(&parent));

        parent.borrow_mut().transform.position = Vec3::new(1.0, 0.0, 0.0);
        child.borrow_mut().transform.position = Vec3::new(0.0, 1.0, 0.0);
        child.borrow_mut().update_world_transform();

        let translation = Vec3::from(child.borrow().world_matrix().translation);
        assert!((translation - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
        assert!(!child.borrow().is_dirty());

        parent.borrow_mut().transform.position = Vec3::new(5.0, 0.0, 0.0);
        assert!(child.borrow().is_dirty());
        assert!(child.borrow_mut().update_world_transform());
        let translation = Vec3::from(child.borrow().world_matrix().translation);
        assert!((translation - Vec3::new(5.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn sibling_update_of_parent_marks_child_stale() {
        let parent = Node::new("parent").into_ref();
        let child = Node::new("child").into_ref();
        Node::set_parent(&child, Some(&parent));
        child.borrow_mut().update_world_transform();

        // Someone else refreshes the parent first.
        parent.borrow_mut().transform.position = Vec3::ONE;
        parent.borrow_mut().update_world_transform();

        assert!(!parent.borrow().is_dirty());
        assert!(child.borrow().is_dirty());
    }

    #[test]
    fn dropped_parent_falls_back_to_identity() {
        let child = Node::new("child").into_ref();
        {
            let parent = Node::new("parent").into_ref();
            parent.borrow_mut().transform.position = Vec3::splat(2.0);
            Node::set_parent(&child, Some(&parent));
            child.borrow_mut().update_world_transform();
        }
        assert!(child.borrow().is_dirty());
        child.borrow_mut().update_world_transform();
        assert_eq!(Vec3::from(child.borrow().world_matrix().translation), Vec3::ZERO);
    }
}
