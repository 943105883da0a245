//! Nodes in a `dirvol` hierarchy.

use derive_more::Display;
use dirvol_storage::{NodeName, NodePath};

/// The kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    /// A group.
    #[display("group")]
    Group,
    /// A dataset.
    #[display("dataset")]
    Dataset,
}

/// A child of a group, as returned by [`Group::children`](crate::group::Group::children).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    name: NodeName,
    path: NodePath,
    kind: NodeKind,
}

impl Node {
    pub(crate) fn new(name: NodeName, path: NodePath, kind: NodeKind) -> Self {
        Self { name, path, kind }
    }

    /// Return the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Return the node path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}
