//! The arena-based document tree and its mutation operations.
//!
//! Nodes live in a `Vec` and address each other by [`NodeIdx`]; each node
//! stores its parent's index, so "a child changed" notifications are an
//! iterative walk up the parent chain rather than recursion. Ownership
//! edges (record fields, collection children, name sub-nodes) always point
//! away from the root, so no cycles are possible.
//!
//! # Invariants
//!
//! - `last_modified >= created` on every node, and `last_modified` never
//!   moves backward.
//! - A tombstone (`last_action == Delete`) has no content, fields,
//!   children, or name.
//! - Every non-root node's parent index resolves to the node that owns it.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use vaultsync_types::wire::NAME_TAG;
use vaultsync_types::{
    Action, Clock, IdSource, NodeId, RandomIdSource, SystemClock, Timestamp,
};

use crate::error::{TreeError, TreeResult};
use crate::node::{Collection, Named, Node, NodeIdx, NodeKind, Record, Scalar};
use crate::resolver::NodeTemplate;

/// Schema version of documents written before names became child nodes.
pub const LEGACY_VERSION: u32 = 1;

/// The schema version written by this implementation.
pub const CURRENT_VERSION: u32 = 2;

/// A versioned document tree of typed nodes.
///
/// A tree is born either *fresh* ([`Tree::new`]) or *hydrated* from a
/// serialized document ([`Tree::from_wire`]). All mutation goes through the
/// tree handle, addressed by [`NodeIdx`]; every successful mutation stamps
/// the touched node and cascades an `Update` to its ancestors.
///
/// Node indices are only valid for the tree that issued them. Accessors
/// panic on an index from another tree; that is a caller defect, not a
/// recoverable condition.
#[derive(Clone)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeIdx,
    pub(crate) version: u32,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdSource>,
}

impl Tree {
    /// Create a fresh single-node document from a template.
    ///
    /// The root gets a fresh id, `Create` action, and both timestamps set
    /// to the clock's current time. Named variants are born with an empty
    /// name sub-node; records with one fresh scalar per declared field.
    pub fn new(
        tag: &str,
        template: &NodeTemplate,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> TreeResult<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeIdx(0),
            version: CURRENT_VERSION,
            clock,
            ids,
        };
        let root = tree.create_node(tag, template, None)?;
        tree.root = root;
        Ok(tree)
    }

    /// [`Tree::new`] with the production clock and id source.
    pub fn with_defaults(tag: &str, template: &NodeTemplate) -> TreeResult<Self> {
        Self::new(
            tag,
            template,
            Arc::new(SystemClock::new()),
            Arc::new(RandomIdSource::new()),
        )
    }

    /// Replace the clock. Intended for tests that drive time manually.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Replace the id source. Intended for tests.
    pub fn set_id_source(&mut self, ids: Arc<dyn IdSource>) {
        self.ids = ids;
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The root node's index.
    pub fn root(&self) -> NodeIdx {
        self.root
    }

    /// The document schema version. Meaningful at the root; all nodes of a
    /// tree share it.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The node's id.
    pub fn id(&self, idx: NodeIdx) -> NodeId {
        self.node(idx).id
    }

    /// The node's creation timestamp.
    pub fn created(&self, idx: NodeIdx) -> Timestamp {
        self.node(idx).created
    }

    /// The node's last-modification timestamp.
    pub fn last_modified(&self, idx: NodeIdx) -> Timestamp {
        self.node(idx).last_modified
    }

    /// The node's last action.
    pub fn last_action(&self, idx: NodeIdx) -> Action {
        self.node(idx).last_action
    }

    /// Returns `true` if the node is a tombstone.
    pub fn is_deleted(&self, idx: NodeIdx) -> bool {
        self.node(idx).is_deleted()
    }

    /// The node's element name (serialization tag).
    pub fn element_name(&self, idx: NodeIdx) -> &str {
        &self.node(idx).element_name
    }

    /// The node's parent, or `None` for the root.
    pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.node(idx).parent
    }

    /// A scalar node's content.
    pub fn content(&self, idx: NodeIdx) -> TreeResult<&str> {
        match &self.node(idx).kind {
            NodeKind::Scalar(s) => Ok(&s.content),
            other => Err(TreeError::InvalidArgument(format!(
                "content requested on a {} node",
                other.name()
            ))),
        }
    }

    /// The name sub-node of a named/record/collection node, if present.
    pub fn name_node(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.node(idx).kind.name_slot()
    }

    /// The node's name value, if it has a name sub-node.
    pub fn name(&self, idx: NodeIdx) -> Option<&str> {
        let name_idx = self.name_node(idx)?;
        match &self.node(name_idx).kind {
            NodeKind::Scalar(s) => Some(&s.content),
            // Name sub-nodes are always scalars by construction.
            _ => None,
        }
    }

    /// A record's field node.
    ///
    /// Fails with [`TreeError::AlreadyDeleted`] on a tombstoned record and
    /// with [`TreeError::InvalidArgument`] for an undeclared field.
    pub fn field(&self, idx: NodeIdx, key: &str) -> TreeResult<NodeIdx> {
        let node = self.node(idx);
        let NodeKind::Record(record) = &node.kind else {
            return Err(TreeError::InvalidArgument(format!(
                "field requested on a {} node",
                node.kind_name()
            )));
        };
        if node.is_deleted() {
            return Err(TreeError::AlreadyDeleted(node.id));
        }
        record
            .fields
            .get(key)
            .copied()
            .ok_or_else(|| TreeError::InvalidArgument(format!("unknown field `{key}`")))
    }

    /// The declared field keys of a record, in key order.
    pub fn field_keys(&self, idx: NodeIdx) -> TreeResult<Vec<String>> {
        match &self.node(idx).kind {
            NodeKind::Record(record) => Ok(record.fields.keys().cloned().collect()),
            other => Err(TreeError::InvalidArgument(format!(
                "field keys requested on a {} node",
                other.name()
            ))),
        }
    }

    /// The visible (non-tombstoned) children of a collection, in ascending
    /// id order. A tombstoned collection has no visible children.
    pub fn visible_children(&self, idx: NodeIdx) -> TreeResult<Vec<NodeIdx>> {
        let collection = self.collection(idx)?;
        Ok(collection
            .children
            .values()
            .copied()
            .filter(|child| !self.node(*child).is_deleted())
            .collect())
    }

    /// Look up a visible collection child by id.
    pub fn visible_child_by_id(&self, idx: NodeIdx, id: NodeId) -> TreeResult<Option<NodeIdx>> {
        let collection = self.collection(idx)?;
        Ok(collection
            .children
            .get(&id)
            .copied()
            .filter(|child| !self.node(*child).is_deleted()))
    }

    /// All collection entries including tombstones, in ascending id order.
    ///
    /// Privileged raw access: exposes tombstoned children. Used by this
    /// crate's own tests and serialization only.
    pub(crate) fn raw_children(&self, idx: NodeIdx) -> TreeResult<Vec<(NodeId, NodeIdx)>> {
        let collection = self.collection(idx)?;
        Ok(collection.children.iter().map(|(id, i)| (*id, *i)).collect())
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Set a scalar node's content.
    ///
    /// A no-op (no timestamp bump, no ancestor notification) when the new
    /// value equals the current one, to avoid spurious merge churn.
    pub fn set_content(&mut self, idx: NodeIdx, value: &str) -> TreeResult<()> {
        let node = self.node(idx);
        let NodeKind::Scalar(scalar) = &node.kind else {
            return Err(TreeError::InvalidArgument(format!(
                "set_content on a {} node",
                node.kind_name()
            )));
        };
        if node.is_deleted() {
            return Err(TreeError::AlreadyDeleted(node.id));
        }
        if scalar.content == value {
            return Ok(());
        }

        if let NodeKind::Scalar(scalar) = &mut self.node_mut(idx).kind {
            scalar.content = value.to_string();
        }
        self.touch(idx)
    }

    /// Set the name of a named/record/collection node.
    ///
    /// A node hydrated without a name sub-node grows a fresh one on first
    /// use. Same-value writes are no-ops, like [`Tree::set_content`].
    pub fn set_name(&mut self, idx: NodeIdx, value: &str) -> TreeResult<()> {
        let node = self.node(idx);
        if matches!(node.kind, NodeKind::Scalar(_)) {
            return Err(TreeError::InvalidArgument(
                "set_name on a scalar node".to_string(),
            ));
        }
        if node.is_deleted() {
            return Err(TreeError::AlreadyDeleted(node.id));
        }

        let name_idx = match self.name_node(idx) {
            Some(existing) => existing,
            None => {
                let fresh = self.create_node(NAME_TAG, &NodeTemplate::Scalar, Some(idx))?;
                if let Some(slot) = self.node_mut(idx).kind.name_slot_mut() {
                    *slot = Some(fresh);
                }
                fresh
            }
        };
        self.set_content(name_idx, value)
    }

    /// Create and insert a fresh child into a collection.
    ///
    /// The child gets a fresh id and `Create` state; the collection (and
    /// every ancestor) is stamped `Update`.
    pub fn add_child(
        &mut self,
        idx: NodeIdx,
        tag: &str,
        template: &NodeTemplate,
    ) -> TreeResult<NodeIdx> {
        let node = self.node(idx);
        if !matches!(node.kind, NodeKind::Collection(_)) {
            return Err(TreeError::InvalidArgument(format!(
                "add_child on a {} node",
                node.kind_name()
            )));
        }
        if node.is_deleted() {
            return Err(TreeError::AlreadyDeleted(node.id));
        }
        if tag == NAME_TAG {
            return Err(TreeError::InvalidArgument(format!(
                "`{NAME_TAG}` is a reserved tag"
            )));
        }

        let child = self.create_node(tag, template, Some(idx))?;
        let child_id = self.node(child).id;
        if let NodeKind::Collection(collection) = &mut self.node_mut(idx).kind {
            collection.children.insert(child_id, child);
        }
        self.touch(idx)?;
        debug!(id = %child_id, tag, "added collection child");
        Ok(child)
    }

    /// Tombstone a collection child in place.
    ///
    /// The child stays in the map as a tombstone (so the deletion survives
    /// future merges); the collection itself is stamped `Update`.
    pub fn remove_child(&mut self, idx: NodeIdx, id: NodeId) -> TreeResult<()> {
        let collection = self.collection(idx)?;
        let child = collection
            .children
            .get(&id)
            .copied()
            .ok_or_else(|| TreeError::InvalidArgument(format!("no child with id {id}")))?;
        self.delete(child)
    }

    /// Delete a node: mark it as a tombstone and clear everything it owns.
    ///
    /// Only this node becomes a tombstone; ancestors are stamped `Update`.
    /// Cleared content and children are gone, not hidden.
    pub fn delete(&mut self, idx: NodeIdx) -> TreeResult<()> {
        let now = self.clock.now();
        let node = self.node_mut(idx);
        node.last_action = Action::Delete;
        node.last_modified = node.last_modified.max(now);
        match &mut node.kind {
            NodeKind::Scalar(scalar) => scalar.content.clear(),
            NodeKind::Named(named) => named.name = None,
            NodeKind::Record(record) => {
                record.name = None;
                record.fields.clear();
            }
            NodeKind::Collection(collection) => {
                collection.name = None;
                collection.children.clear();
            }
        }
        debug!(id = %self.node(idx).id, "deleted node");

        match self.node(idx).parent {
            Some(parent) => self.touch(parent),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // Internal
    // ---------------------------------------------------------------

    pub(crate) fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.0]
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIdx) -> &mut Node {
        &mut self.nodes[idx.0]
    }

    fn collection(&self, idx: NodeIdx) -> TreeResult<&Collection> {
        match &self.node(idx).kind {
            NodeKind::Collection(collection) => Ok(collection),
            other => Err(TreeError::InvalidArgument(format!(
                "collection operation on a {} node",
                other.name()
            ))),
        }
    }

    /// Stamp `Update` on the node and every ancestor, iteratively.
    ///
    /// Tombstones are never modified post mortem; hitting one fails the
    /// whole operation.
    pub(crate) fn touch(&mut self, idx: NodeIdx) -> TreeResult<()> {
        let now = self.clock.now();
        let mut current = Some(idx);
        while let Some(i) = current {
            let node = self.node_mut(i);
            if node.is_deleted() {
                return Err(TreeError::AlreadyDeleted(node.id));
            }
            node.last_action = Action::Update;
            node.last_modified = node.last_modified.max(now);
            current = node.parent;
        }
        Ok(())
    }

    /// Allocate a fresh node (and its owned sub-nodes) from a template.
    ///
    /// Does not attach the node to any parent's child map and does not
    /// cascade notifications; callers do both.
    pub(crate) fn create_node(
        &mut self,
        tag: &str,
        template: &NodeTemplate,
        parent: Option<NodeIdx>,
    ) -> TreeResult<NodeIdx> {
        let idx = self.push_fresh(tag, parent)?;

        let kind = match template {
            NodeTemplate::Scalar => NodeKind::Scalar(Scalar::default()),
            NodeTemplate::Named => NodeKind::Named(Named {
                name: Some(self.push_fresh(NAME_TAG, Some(idx))?),
            }),
            NodeTemplate::Record { fields } => {
                let mut record = Record {
                    name: Some(self.push_fresh(NAME_TAG, Some(idx))?),
                    ..Record::default()
                };
                for key in fields {
                    if key == NAME_TAG {
                        return Err(TreeError::InvalidArgument(format!(
                            "`{NAME_TAG}` is a reserved field key"
                        )));
                    }
                    let field = self.push_fresh(key, Some(idx))?;
                    record.fields.insert(key.clone(), field);
                }
                NodeKind::Record(record)
            }
            NodeTemplate::Collection => NodeKind::Collection(Collection {
                name: Some(self.push_fresh(NAME_TAG, Some(idx))?),
                ..Collection::default()
            }),
        };
        self.node_mut(idx).kind = kind;
        Ok(idx)
    }

    /// Push a fresh scalar-shaped node with `Create` state. The caller
    /// rewrites `kind` when building a non-scalar.
    fn push_fresh(&mut self, tag: &str, parent: Option<NodeIdx>) -> TreeResult<NodeIdx> {
        validate_tag(tag)?;
        let now = self.clock.now();
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(Node {
            id: self.ids.next_id(),
            created: now,
            last_modified: now,
            last_action: Action::Create,
            element_name: tag.to_string(),
            parent,
            kind: NodeKind::Scalar(Scalar::default()),
        });
        Ok(idx)
    }
}

/// Element names must contain at least one non-whitespace character.
pub(crate) fn validate_tag(tag: &str) -> TreeResult<()> {
    if tag.trim().is_empty() {
        return Err(TreeError::InvalidArgument(
            "element name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("version", &self.version)
            .finish()
    }
}
