//! Hydration: build a [`Tree`] from its serialized [`WireNode`] form.
//!
//! All attributes except `version` are required; a missing or malformed
//! one fails the parse with a typed error and no partial tree. The
//! `version` attribute distinguishes the legacy attribute-based name
//! encoding (v1) from the current child-node encoding (v2); v1 documents
//! are migrated transparently while hydrating.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use vaultsync_types::wire::{attr, NAME_TAG};
use vaultsync_types::{
    Action, Clock, IdSource, NodeId, RandomIdSource, SystemClock, Timestamp, TypeError, WireNode,
};

use crate::error::{TreeError, TreeResult};
use crate::node::{Collection, Named, Node, NodeIdx, NodeKind, Record, Scalar};
use crate::resolver::{NodeResolver, NodeTemplate};
use crate::tree::{validate_tag, Tree, LEGACY_VERSION};

impl Tree {
    /// Hydrate a document tree from its serialized form.
    ///
    /// The root's node variant — and that of every collection child — is
    /// chosen by `resolver` from the tag name.
    pub fn from_wire(
        wire: &WireNode,
        resolver: &dyn NodeResolver,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> TreeResult<Self> {
        let template = resolver
            .resolve(&wire.tag)
            .ok_or_else(|| TreeError::UnresolvableRoot(wire.tag.clone()))?;

        let version = match wire.attr(attr::VERSION) {
            Some(raw) => raw.parse::<u32>().map_err(|e| TreeError::MalformedAttribute {
                tag: wire.tag.clone(),
                source: TypeError::InvalidVersion(format!("{raw}: {e}")),
            })?,
            // Files written before versioning carry no version attribute.
            None => LEGACY_VERSION,
        };
        debug!(tag = %wire.tag, version, "hydrating document");

        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeIdx(0),
            version,
            clock,
            ids,
        };
        let root = hydrate_node(&mut tree, wire, &template, None, resolver)?;
        tree.root = root;
        Ok(tree)
    }

    /// [`Tree::from_wire`] with the production clock and id source.
    pub fn from_wire_with_defaults(
        wire: &WireNode,
        resolver: &dyn NodeResolver,
    ) -> TreeResult<Self> {
        Self::from_wire(
            wire,
            resolver,
            Arc::new(SystemClock::new()),
            Arc::new(RandomIdSource::new()),
        )
    }
}

fn hydrate_node(
    tree: &mut Tree,
    wire: &WireNode,
    template: &NodeTemplate,
    parent: Option<NodeIdx>,
    resolver: &dyn NodeResolver,
) -> TreeResult<NodeIdx> {
    let idx = hydrate_meta(tree, wire, parent)?;
    let deleted = tree.node(idx).is_deleted();

    let kind = match template {
        NodeTemplate::Scalar => NodeKind::Scalar(Scalar {
            // A tombstone carries no content; stale text in the file is
            // dropped on load.
            content: if deleted {
                String::new()
            } else {
                wire.text.clone().unwrap_or_default()
            },
        }),
        NodeTemplate::Named => NodeKind::Named(Named {
            name: hydrate_name(tree, wire, idx, resolver)?,
        }),
        NodeTemplate::Record { fields } => {
            let name = hydrate_name(tree, wire, idx, resolver)?;
            let fields = if deleted {
                // A tombstone carries no fields.
                Default::default()
            } else {
                hydrate_fields(tree, wire, fields, idx, resolver)?
            };
            NodeKind::Record(Record { name, fields })
        }
        NodeTemplate::Collection => {
            let name = hydrate_name(tree, wire, idx, resolver)?;
            let children = if deleted {
                Default::default()
            } else {
                hydrate_children(tree, wire, idx, resolver)?
            };
            NodeKind::Collection(Collection { name, children })
        }
    };
    tree.node_mut(idx).kind = kind;
    Ok(idx)
}

/// Parse the required metadata attributes and push the bare node.
fn hydrate_meta(tree: &mut Tree, wire: &WireNode, parent: Option<NodeIdx>) -> TreeResult<NodeIdx> {
    validate_tag(&wire.tag)?;

    let created = parse_attr::<Timestamp>(wire, attr::CREATED)?;
    let last_modified = parse_attr::<Timestamp>(wire, attr::LAST_MODIFIED)?;
    let id = parse_attr::<NodeId>(wire, attr::ID)?;
    let last_action = parse_attr::<Action>(wire, attr::LAST_ACTION)?;

    let idx = NodeIdx(tree.nodes.len());
    tree.nodes.push(Node {
        id,
        created,
        last_modified,
        last_action,
        element_name: wire.tag.clone(),
        parent,
        kind: NodeKind::Scalar(Scalar::default()),
    });
    Ok(idx)
}

/// Resolve the name sub-node of a named/record/collection node.
///
/// Legacy (v1) documents store the name as a plain attribute; it is
/// migrated into a synthesized name sub-node. Current documents store it
/// as a child node with the reserved `name` tag.
fn hydrate_name(
    tree: &mut Tree,
    wire: &WireNode,
    host: NodeIdx,
    resolver: &dyn NodeResolver,
) -> TreeResult<Option<NodeIdx>> {
    // A tombstone carries no name, whatever the serialized form still has.
    if tree.node(host).is_deleted() {
        return Ok(None);
    }
    if tree.version() == LEGACY_VERSION {
        if let Some(legacy) = wire.attr(attr::NAME) {
            trace!(tag = %wire.tag, "migrating legacy name attribute");
            return Ok(Some(synthesize_legacy_name(tree, legacy, host)));
        }
    }
    match wire.children_tagged(NAME_TAG).next() {
        Some(child) => Ok(Some(hydrate_node(
            tree,
            child,
            &NodeTemplate::Scalar,
            Some(host),
            resolver,
        )?)),
        None => Ok(None),
    }
}

/// Build the synthetic name node for a migrated v1 document.
///
/// The name inherits the host's created/last_modified/last_action exactly;
/// it only becomes independently mergeable from the migration onward.
/// Known approximation for documents mixing v1 and v2 replicas.
fn synthesize_legacy_name(tree: &mut Tree, value: &str, host: NodeIdx) -> NodeIdx {
    let meta = tree.node(host);
    let node = Node {
        id: tree.ids.next_id(),
        created: meta.created,
        last_modified: meta.last_modified,
        last_action: meta.last_action,
        element_name: NAME_TAG.to_string(),
        parent: Some(host),
        kind: NodeKind::Scalar(Scalar {
            content: value.to_string(),
        }),
    };
    let idx = NodeIdx(tree.nodes.len());
    tree.nodes.push(node);
    idx
}

/// Hydrate a record's declared fields.
///
/// Every declared field starts as a fresh node, then fields found in the
/// serialized form overwrite the fresh ones. A field absent from an old
/// file therefore still exists (freshly created) after hydration.
fn hydrate_fields(
    tree: &mut Tree,
    wire: &WireNode,
    declared: &[String],
    host: NodeIdx,
    resolver: &dyn NodeResolver,
) -> TreeResult<std::collections::BTreeMap<String, NodeIdx>> {
    let mut fields = std::collections::BTreeMap::new();
    for key in declared {
        if key == NAME_TAG {
            return Err(TreeError::InvalidArgument(format!(
                "`{NAME_TAG}` is a reserved field key"
            )));
        }
        let fresh = tree.create_node(key, &NodeTemplate::Scalar, Some(host))?;
        fields.insert(key.clone(), fresh);
    }
    for child in &wire.children {
        if child.tag == NAME_TAG {
            continue;
        }
        if fields.contains_key(&child.tag) {
            let idx = hydrate_node(tree, child, &NodeTemplate::Scalar, Some(host), resolver)?;
            fields.insert(child.tag.clone(), idx);
        } else {
            trace!(tag = %child.tag, "ignoring undeclared record child");
        }
    }
    Ok(fields)
}

/// Hydrate a collection's children, choosing each child's variant via the
/// document resolver. Unknown tags are skipped with a warning.
fn hydrate_children(
    tree: &mut Tree,
    wire: &WireNode,
    host: NodeIdx,
    resolver: &dyn NodeResolver,
) -> TreeResult<std::collections::BTreeMap<NodeId, NodeIdx>> {
    let mut children = std::collections::BTreeMap::new();
    for child in &wire.children {
        if child.tag == NAME_TAG {
            // Already handled as the name sub-node.
            continue;
        }
        match resolver.resolve(&child.tag) {
            Some(template) => {
                let idx = hydrate_node(tree, child, &template, Some(host), resolver)?;
                children.insert(tree.node(idx).id, idx);
            }
            None => {
                warn!(tag = %child.tag, "skipping unresolvable collection child");
            }
        }
    }
    Ok(children)
}

fn parse_attr<T>(wire: &WireNode, name: &str) -> TreeResult<T>
where
    T: FromStr<Err = TypeError>,
{
    let raw = wire.attr(name).ok_or_else(|| TreeError::MissingAttribute {
        tag: wire.tag.clone(),
        attr: name.to_string(),
    })?;
    raw.parse::<T>().map_err(|source| TreeError::MalformedAttribute {
        tag: wire.tag.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_types::{ManualClock, SequentialIdSource};

    use crate::resolver::ScalarResolver;

    const T0: &str = "2008-09-21T15:51:30.346+02:00";

    struct TableResolver;

    impl NodeResolver for TableResolver {
        fn resolve(&self, tag: &str) -> Option<NodeTemplate> {
            match tag {
                "table" => Some(NodeTemplate::Collection),
                "entry" => Some(NodeTemplate::Record {
                    fields: vec!["user".to_string(), "password".to_string()],
                }),
                "profile" => Some(NodeTemplate::Named),
                "child" => Some(NodeTemplate::Scalar),
                _ => None,
            }
        }
    }

    fn wire(tag: &str, id: u64, action: &str) -> WireNode {
        let mut node = WireNode::new(tag);
        node.set_attr(attr::CREATED, T0);
        node.set_attr(attr::LAST_MODIFIED, T0);
        node.set_attr(attr::ID, id.to_string());
        node.set_attr(attr::LAST_ACTION, action);
        node
    }

    fn hydrate(root: &WireNode, resolver: &dyn NodeResolver) -> TreeResult<Tree> {
        Tree::from_wire(
            root,
            resolver,
            Arc::new(ManualClock::starting_at(Timestamp::parse(T0).unwrap())),
            Arc::new(SequentialIdSource::starting_at(1_000)),
        )
    }

    #[test]
    fn missing_required_attribute_fails_the_parse() {
        for missing in [attr::ID, attr::CREATED, attr::LAST_MODIFIED, attr::LAST_ACTION] {
            let mut node = wire("child", 1, "CREATE");
            node.attrs.retain(|(k, _)| k != missing);
            let err = hydrate(&node, &ScalarResolver).unwrap_err();
            assert!(
                matches!(err, TreeError::MissingAttribute { ref attr, .. } if attr == missing),
                "expected missing `{missing}`, got {err}"
            );
        }
    }

    #[test]
    fn malformed_attributes_fail_the_parse() {
        let mut node = wire("child", 1, "CREATE");
        node.set_attr(attr::LAST_MODIFIED, "yesterday-ish");
        assert!(matches!(
            hydrate(&node, &ScalarResolver),
            Err(TreeError::MalformedAttribute { .. })
        ));

        let mut node = wire("child", 1, "CREATE");
        node.set_attr(attr::LAST_ACTION, "created");
        assert!(matches!(
            hydrate(&node, &ScalarResolver),
            Err(TreeError::MalformedAttribute { .. })
        ));

        let mut node = wire("child", 1, "CREATE");
        node.set_attr(attr::ID, "-3");
        assert!(matches!(
            hydrate(&node, &ScalarResolver),
            Err(TreeError::MalformedAttribute { .. })
        ));

        let mut node = wire("table", 1, "CREATE");
        node.set_attr(attr::VERSION, "two");
        assert!(matches!(
            hydrate(&node, &TableResolver),
            Err(TreeError::MalformedAttribute { .. })
        ));
    }

    #[test]
    fn scalar_content_comes_from_text() {
        let mut node = wire("child", 7, "UPDATE");
        node.text = Some("hunter2".to_string());
        let tree = hydrate(&node, &ScalarResolver).unwrap();
        assert_eq!(tree.content(tree.root()).unwrap(), "hunter2");
        assert_eq!(tree.id(tree.root()), NodeId::new(7));

        // Absent text hydrates as empty content.
        let node = wire("child", 8, "CREATE");
        let tree = hydrate(&node, &ScalarResolver).unwrap();
        assert_eq!(tree.content(tree.root()).unwrap(), "");
    }

    #[test]
    fn version_defaults_to_legacy_when_absent() {
        let node = wire("table", 1, "CREATE");
        let tree = hydrate(&node, &TableResolver).unwrap();
        assert_eq!(tree.version(), LEGACY_VERSION);

        let mut node = wire("table", 1, "CREATE");
        node.set_attr(attr::VERSION, "2");
        let tree = hydrate(&node, &TableResolver).unwrap();
        assert_eq!(tree.version(), 2);
    }

    #[test]
    fn legacy_name_attribute_becomes_a_name_node() {
        let mut node = wire("table", 1, "UPDATE");
        node.set_attr(attr::NAME, "my accounts");

        let tree = hydrate(&node, &TableResolver).unwrap();
        let root = tree.root();
        assert_eq!(tree.name(root), Some("my accounts"));

        // The synthetic name inherits the host's timestamps and action.
        let name = tree.name_node(root).unwrap();
        assert_eq!(tree.created(name), tree.created(root));
        assert_eq!(tree.last_modified(name), tree.last_modified(root));
        assert_eq!(tree.last_action(name), tree.last_action(root));
        assert_ne!(tree.id(name), tree.id(root));
    }

    #[test]
    fn current_version_reads_name_from_child_node() {
        let mut node = wire("table", 1, "UPDATE");
        node.set_attr(attr::VERSION, "2");
        let mut name = wire("name", 2, "UPDATE");
        name.text = Some("my accounts".to_string());
        node.push_child(name);

        let tree = hydrate(&node, &TableResolver).unwrap();
        assert_eq!(tree.name(tree.root()), Some("my accounts"));
        // In a v2 document a `name` attribute is not a name source.
        let name_idx = tree.name_node(tree.root()).unwrap();
        assert_eq!(tree.id(name_idx), NodeId::new(2));
    }

    #[test]
    fn unknown_collection_children_are_skipped() {
        let mut node = wire("table", 1, "UPDATE");
        node.set_attr(attr::VERSION, "2");
        node.push_child(wire("child", 2, "CREATE"));
        node.push_child(wire("mystery", 3, "CREATE"));

        let tree = hydrate(&node, &TableResolver).unwrap();
        let children = tree.visible_children(tree.root()).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.id(children[0]), NodeId::new(2));
    }

    #[test]
    fn record_fields_absent_from_the_file_hydrate_fresh() {
        let mut entry = wire("entry", 2, "UPDATE");
        entry.set_attr(attr::VERSION, "2");
        let mut user = wire("user", 3, "UPDATE");
        user.text = Some("alice".to_string());
        entry.push_child(user);
        // `password` is declared by the schema but missing from the file.

        let tree = hydrate(&entry, &TableResolver).unwrap();
        let root = tree.root();
        let user = tree.field(root, "user").unwrap();
        assert_eq!(tree.content(user).unwrap(), "alice");
        assert_eq!(tree.id(user), NodeId::new(3));

        let password = tree.field(root, "password").unwrap();
        assert_eq!(tree.content(password).unwrap(), "");
        assert_eq!(tree.last_action(password), Action::Create);
    }

    #[test]
    fn named_children_hydrate_with_an_optional_name() {
        let mut table = wire("table", 1, "UPDATE");
        table.set_attr(attr::VERSION, "2");
        let mut titled = wire("profile", 2, "UPDATE");
        let mut name = wire("name", 3, "UPDATE");
        name.text = Some("mine".to_string());
        titled.push_child(name);
        table.push_child(titled);
        table.push_child(wire("profile", 4, "UPDATE"));

        let tree = hydrate(&table, &TableResolver).unwrap();
        let children = tree.visible_children(tree.root()).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(tree.name(children[0]), Some("mine"));
        assert_eq!(tree.name(children[1]), None);
    }

    #[test]
    fn deleted_nodes_hydrate_without_content_or_name() {
        // Stale scalar text on a tombstone is dropped on load.
        let mut node = wire("child", 1, "DELETE");
        node.text = Some("hunter2".to_string());
        let tree = hydrate(&node, &ScalarResolver).unwrap();
        assert!(tree.is_deleted(tree.root()));
        assert_eq!(tree.content(tree.root()).unwrap(), "");

        // So is a name child on a deleted v2 node.
        let mut table = wire("table", 1, "DELETE");
        table.set_attr(attr::VERSION, "2");
        let mut name = wire("name", 2, "UPDATE");
        name.text = Some("my accounts".to_string());
        table.push_child(name);
        let tree = hydrate(&table, &TableResolver).unwrap();
        assert!(tree.is_deleted(tree.root()));
        assert_eq!(tree.name_node(tree.root()), None);
    }

    #[test]
    fn legacy_tombstones_drop_their_name_attribute() {
        let mut table = wire("table", 1, "DELETE");
        table.set_attr(attr::NAME, "my accounts");

        let tree = hydrate(&table, &TableResolver).unwrap();
        assert!(tree.is_deleted(tree.root()));
        assert_eq!(tree.name(tree.root()), None);
        assert_eq!(tree.name_node(tree.root()), None);
    }

    #[test]
    fn deleted_nodes_hydrate_without_children() {
        let mut table = wire("table", 1, "UPDATE");
        table.set_attr(attr::VERSION, "2");
        table.push_child(wire("entry", 2, "DELETE"));

        let tree = hydrate(&table, &TableResolver).unwrap();
        let root = tree.root();
        assert!(tree.visible_children(root).unwrap().is_empty());
        let (id, entry) = tree.raw_children(root).unwrap()[0];
        assert_eq!(id, NodeId::new(2));
        assert!(tree.is_deleted(entry));
        assert!(matches!(
            tree.field(entry, "user"),
            Err(TreeError::AlreadyDeleted(_))
        ));
    }

    #[test]
    fn unresolvable_root_tag_is_an_error() {
        let node = wire("mystery", 1, "CREATE");
        assert!(matches!(
            hydrate(&node, &TableResolver),
            Err(TreeError::UnresolvableRoot(_))
        ));
    }

    #[test]
    fn empty_tag_is_an_invalid_argument() {
        let node = wire("  ", 1, "CREATE");
        assert!(matches!(
            hydrate(&node, &ScalarResolver),
            Err(TreeError::InvalidArgument(_))
        ));
    }
}
