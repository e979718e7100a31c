//! The node model: one arena entry per document tree element.
//!
//! Every node carries the shared merge metadata (id, timestamps, last
//! action, element name, parent back-reference) plus a closed [`NodeKind`]
//! union over the four structural variants. All per-kind behavior in this
//! crate pattern-matches `NodeKind` exhaustively, so adding a variant is a
//! compiler-checked exercise.

use std::collections::BTreeMap;

use vaultsync_types::{Action, NodeId, Timestamp};

/// Index of a node within its owning [`Tree`](crate::Tree) arena.
///
/// Only meaningful for the tree that produced it; indices are never reused
/// and never shared between trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIdx(pub(crate) usize);

/// One element of the document tree.
#[derive(Clone, Debug)]
pub struct Node {
    /// Identity within the document; the structural merge key.
    pub(crate) id: NodeId,
    /// Creation timestamp. `last_modified` is always >= this.
    pub(crate) created: Timestamp,
    /// Timestamp of the last mutation or merge win; only moves forward.
    pub(crate) last_modified: Timestamp,
    /// Tri-state action tag; `Delete` marks a tombstone.
    pub(crate) last_action: Action,
    /// The structural tag used for serialization. Never empty.
    pub(crate) element_name: String,
    /// Back-reference to the parent arena slot; `None` for the root.
    pub(crate) parent: Option<NodeIdx>,
    /// Variant payload.
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Returns `true` if this node is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.last_action == Action::Delete
    }

    /// The variant name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// The closed set of node variants.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Leaf holding a single string value.
    Scalar(Scalar),
    /// A node whose only content is an independently-merged name.
    Named(Named),
    /// Fixed-schema record of named scalar fields.
    Record(Record),
    /// Id-ordered, dynamically-sized set of heterogeneous children.
    Collection(Collection),
}

impl NodeKind {
    /// The variant name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Scalar(_) => "scalar",
            NodeKind::Named(_) => "named",
            NodeKind::Record(_) => "record",
            NodeKind::Collection(_) => "collection",
        }
    }

    /// The name sub-node slot, if this variant has one.
    pub(crate) fn name_slot(&self) -> Option<NodeIdx> {
        match self {
            NodeKind::Scalar(_) => None,
            NodeKind::Named(n) => n.name,
            NodeKind::Record(r) => r.name,
            NodeKind::Collection(c) => c.name,
        }
    }

    /// Mutable access to the name sub-node slot.
    pub(crate) fn name_slot_mut(&mut self) -> Option<&mut Option<NodeIdx>> {
        match self {
            NodeKind::Scalar(_) => None,
            NodeKind::Named(n) => Some(&mut n.name),
            NodeKind::Record(r) => Some(&mut r.name),
            NodeKind::Collection(c) => Some(&mut c.name),
        }
    }
}

/// Payload of a leaf node: a single string value, merged atomically.
#[derive(Clone, Debug, Default)]
pub struct Scalar {
    /// The value. Cleared (not dropped) on delete.
    pub(crate) content: String,
}

/// Payload of a plain named node.
#[derive(Clone, Debug, Default)]
pub struct Named {
    /// The name sub-node: a full scalar node with its own id and
    /// timestamps, merged independently of the host.
    pub(crate) name: Option<NodeIdx>,
}

/// Payload of a record node: a fixed set of named scalar fields.
///
/// The key set is schema, not data: it is declared once at construction
/// time by the concrete record type. Keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct Record {
    pub(crate) name: Option<NodeIdx>,
    pub(crate) fields: BTreeMap<String, NodeIdx>,
}

/// Payload of a collection node: children keyed (and ordered) by their id.
///
/// Tombstoned children stay in the map so a later merge can still see the
/// deletion; they are excluded from externally visible iteration.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub(crate) name: Option<NodeIdx>,
    pub(crate) children: BTreeMap<NodeId, NodeIdx>,
}
