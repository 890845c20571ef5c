//! Filtered tree stored as an arena of nodes indexed by `NodeId`

use crate::FileCategory;
use serde::Serialize;

/// Index of a node in a `TableTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// A node that survived filtering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    /// Path segment (directory or file name)
    pub name: String,
    /// Slash-joined path from the logical root
    pub path: String,
    /// True only for actual files
    pub is_leaf: bool,
    /// Extension class (leaves only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    /// Children in input order (empty for leaves)
    pub children: Vec<NodeId>,
    /// Number of leaf rows this node covers
    pub span: usize,
}

/// Immutable filtered tree. Rebuilt from scratch on every render cycle.
#[derive(Debug, Clone)]
pub struct TableTree {
    nodes: Vec<TableNode>,
    root: NodeId,
}

impl TableTree {
    pub(crate) fn from_parts(nodes: Vec<TableNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// The logical root (never rendered as a cell)
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TableNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level branches, each emitted as its own block of rows
    pub fn top_level(&self) -> &[NodeId] {
        &self.node(self.root).children
    }

    /// Leaves below `id` in traversal order (`id` itself if it is a leaf)
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.is_leaf {
            out.push(id);
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }

    /// Look a node up by its full path
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.path == path)
            .map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TableNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}
