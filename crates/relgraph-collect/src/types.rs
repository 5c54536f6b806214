//! Core types for graph collection.

use relgraph_core::{EntityId, ModelKey, NodeId};

// Node

/// Display options of a node.
///
/// `label` is always present; `attrs` are passed through to the renderer in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    pub label: String,
    pub attrs: Vec<(String, String)>,
}

impl NodeOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }
}

/// A collected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub key: ModelKey,
    pub options: NodeOptions,
}

/// Instances grouped on one DOT rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankGroup {
    pub rank: String,
    pub members: Vec<NodeId>,
}

// Keys

/// One end of a bidirectional relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndKey {
    /// The relation attribute `attribute` declared on `entity`.
    Named { entity: EntityId, attribute: String },
    /// Far end of a relation that has no declared inverse, named after the
    /// owning side.
    Anonymous { owner: EntityId, attribute: String },
}

/// Dedup key of a stored relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKey {
    /// Directly declared relation; endpoint order does not matter.
    Pair {
        low: NodeId,
        high: NodeId,
        label: Option<String>,
    },
    /// Both ends of one bidirectional relation, keyed by end surrogates.
    Dual { low: u32, high: u32 },
}

impl RelationKey {
    pub fn pair(a: NodeId, b: NodeId, label: Option<String>) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        RelationKey::Pair { low, high, label }
    }

    pub fn dual(a: u32, b: u32) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        RelationKey::Dual { low, high }
    }
}

// Edges

/// Edge as handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge<'a> {
    Plain {
        from: NodeId,
        to: NodeId,
        label: Option<&'a str>,
    },
    Parent {
        child: NodeId,
        parent: NodeId,
    },
    /// Merged bidirectional relation. Each label names the role of the node
    /// at its end.
    DualPaired {
        from: NodeId,
        to: NodeId,
        label_from: Option<&'a str>,
        label_to: Option<&'a str>,
    },
}
