//! Pairwise merge of two independently edited copies of one document.
//!
//! The merge is driven entirely by per-node `last_modified` timestamps and
//! id-based structural matching; there is no coordinator and no causal
//! history. The base rule: the strictly newer node wins wholesale, and on
//! an exact timestamp tie the *argument* (`other`) wins. The tie-break is
//! load-bearing: every derived merge preserves it, which is what makes
//! `merge(a, b)` and `merge(b, a)` each deterministic.
//!
//! Deep-copy discipline: the result is a fresh arena sharing nothing with
//! either input, so both inputs remain independently usable and a failed
//! merge mutates nothing.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use vaultsync_types::{partition, NodeId};

use crate::error::{TreeError, TreeResult};
use crate::node::{Collection, Named, Node, NodeIdx, NodeKind, Record, Scalar};
use crate::tree::{Tree, CURRENT_VERSION};

impl Tree {
    /// Merge this document with another copy of the same logical document.
    ///
    /// Both trees should describe the same document (matching node ids);
    /// merging structurally incompatible nodes fails with
    /// [`TreeError::IncompatibleMerge`]. Neither input is mutated; the
    /// result is an independent tree carrying the current schema version
    /// and this tree's clock and id source.
    pub fn merge(&self, other: &Tree) -> TreeResult<Tree> {
        debug!(
            left = %self.node(self.root).id,
            right = %other.node(other.root).id,
            "merging documents"
        );
        let mut out = Tree {
            nodes: Vec::new(),
            root: NodeIdx(0),
            version: CURRENT_VERSION,
            clock: self.clock.clone(),
            ids: self.ids.clone(),
        };
        let root = merge_nodes(self, self.root, other, other.root, &mut out, None)?;
        out.root = root;
        Ok(out)
    }
}

/// Merge one matching node pair into the output arena.
fn merge_nodes(
    a: &Tree,
    ia: NodeIdx,
    b: &Tree,
    ib: NodeIdx,
    out: &mut Tree,
    parent: Option<NodeIdx>,
) -> TreeResult<NodeIdx> {
    let na = a.node(ia);
    let nb = b.node(ib);

    // Strictly newer `self` wins; an exact tie goes to `other`.
    let self_wins = na.last_modified > nb.last_modified;
    let (winner_tree, winner_idx) = if self_wins { (a, ia) } else { (b, ib) };
    let winner = winner_tree.node(winner_idx);
    trace!(
        id = %winner.id,
        action = %winner.last_action,
        from_self = self_wins,
        "selected merge survivor"
    );

    let out_idx = push_meta(out, winner, parent);

    let kind = match (&na.kind, &nb.kind) {
        (NodeKind::Scalar(sa), NodeKind::Scalar(sb)) => {
            // Content is atomic; the survivor's value is taken wholesale.
            let content = if self_wins { &sa.content } else { &sb.content };
            NodeKind::Scalar(Scalar {
                content: content.clone(),
            })
        }

        (NodeKind::Named(_), NodeKind::Named(_)) => NodeKind::Named(Named {
            name: merge_name(a, ia, b, ib, winner_tree, winner_idx, out, out_idx)?,
        }),

        (NodeKind::Record(ra), NodeKind::Record(rb)) => {
            let name = merge_name(a, ia, b, ib, winner_tree, winner_idx, out, out_idx)?;
            let mut fields = std::collections::BTreeMap::new();
            if !winner.is_deleted() {
                // The field set is the union of both sides' keys; each
                // field merges independently of its siblings.
                let keys: BTreeSet<&String> =
                    ra.fields.keys().chain(rb.fields.keys()).collect();
                for key in keys {
                    let merged = match (ra.fields.get(key), rb.fields.get(key)) {
                        (Some(fa), Some(fb)) => {
                            merge_nodes(a, *fa, b, *fb, out, Some(out_idx))?
                        }
                        (Some(fa), None) => copy_subtree(a, *fa, out, Some(out_idx)),
                        (None, Some(fb)) => copy_subtree(b, *fb, out, Some(out_idx)),
                        (None, None) => continue,
                    };
                    fields.insert(key.clone(), merged);
                }
            }
            NodeKind::Record(Record { name, fields })
        }

        (NodeKind::Collection(ca), NodeKind::Collection(cb)) => {
            let name = merge_name(a, ia, b, ib, winner_tree, winner_idx, out, out_idx)?;
            let mut children = std::collections::BTreeMap::new();
            if !winner.is_deleted() {
                let ids_a: BTreeSet<NodeId> = ca.children.keys().copied().collect();
                let ids_b: BTreeSet<NodeId> = cb.children.keys().copied().collect();
                let split = partition(&ids_a, &ids_b);

                for id in &split.both {
                    let merged = merge_nodes(
                        a,
                        ca.children[id],
                        b,
                        cb.children[id],
                        out,
                        Some(out_idx),
                    )?;
                    children.insert(*id, merged);
                }
                for id in &split.only_a {
                    children.insert(*id, copy_subtree(a, ca.children[id], out, Some(out_idx)));
                }
                for id in &split.only_b {
                    children.insert(*id, copy_subtree(b, cb.children[id], out, Some(out_idx)));
                }
            }
            NodeKind::Collection(Collection { name, children })
        }

        _ => {
            return Err(TreeError::IncompatibleMerge {
                left: na.kind_name(),
                right: nb.kind_name(),
            });
        }
    };

    out.node_mut(out_idx).kind = kind;
    Ok(out_idx)
}

/// Merge the name sub-property of two named nodes.
///
/// The name is a full node of its own and merges independently of the
/// host's other content — unless the surviving host is a tombstone, in
/// which case no sub-merge happens and the survivor keeps whatever name it
/// carries itself (normally none).
#[allow(clippy::too_many_arguments)]
fn merge_name(
    a: &Tree,
    ia: NodeIdx,
    b: &Tree,
    ib: NodeIdx,
    winner_tree: &Tree,
    winner_idx: NodeIdx,
    out: &mut Tree,
    host: NodeIdx,
) -> TreeResult<Option<NodeIdx>> {
    let winner = winner_tree.node(winner_idx);
    let own_name = winner.kind.name_slot();

    if winner.is_deleted() {
        return Ok(own_name.map(|n| copy_subtree(winner_tree, n, out, Some(host))));
    }
    match (a.node(ia).kind.name_slot(), b.node(ib).kind.name_slot()) {
        (Some(name_a), Some(name_b)) => {
            Ok(Some(merge_nodes(a, name_a, b, name_b, out, Some(host))?))
        }
        // Only one side has a name: the survivor keeps its own, if any.
        _ => Ok(own_name.map(|n| copy_subtree(winner_tree, n, out, Some(host)))),
    }
}

/// Deep-copy a subtree from a source arena into the output arena.
fn copy_subtree(src: &Tree, idx: NodeIdx, out: &mut Tree, parent: Option<NodeIdx>) -> NodeIdx {
    let node = src.node(idx);
    let out_idx = push_meta(out, node, parent);

    let kind = match &node.kind {
        NodeKind::Scalar(scalar) => NodeKind::Scalar(scalar.clone()),
        NodeKind::Named(named) => NodeKind::Named(Named {
            name: named.name.map(|n| copy_subtree(src, n, out, Some(out_idx))),
        }),
        NodeKind::Record(record) => NodeKind::Record(Record {
            name: record.name.map(|n| copy_subtree(src, n, out, Some(out_idx))),
            fields: record
                .fields
                .iter()
                .map(|(key, field)| {
                    (key.clone(), copy_subtree(src, *field, out, Some(out_idx)))
                })
                .collect(),
        }),
        NodeKind::Collection(collection) => NodeKind::Collection(Collection {
            name: collection
                .name
                .map(|n| copy_subtree(src, n, out, Some(out_idx))),
            children: collection
                .children
                .iter()
                .map(|(id, child)| (*id, copy_subtree(src, *child, out, Some(out_idx))))
                .collect(),
        }),
    };
    out.node_mut(out_idx).kind = kind;
    out_idx
}

/// Push a node with the given metadata and a placeholder payload; the
/// caller fills in the real payload once sub-nodes are built.
fn push_meta(out: &mut Tree, from: &Node, parent: Option<NodeIdx>) -> NodeIdx {
    let idx = NodeIdx(out.nodes.len());
    out.nodes.push(Node {
        id: from.id,
        created: from.created,
        last_modified: from.last_modified,
        last_action: from.last_action,
        element_name: from.element_name.clone(),
        parent,
        kind: NodeKind::Scalar(Scalar::default()),
    });
    idx
}
