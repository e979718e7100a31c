//! Serialization: turn a [`Tree`] back into its [`WireNode`] form.
//!
//! Attribute order is canonical (`created`, `lastModified`, `id`,
//! `lastAction`, then `version` on the root). The name sub-node serializes
//! first among children; record fields follow in field-name order and
//! collection children in ascending id order, tombstones included.

use vaultsync_types::wire::attr;
use vaultsync_types::WireNode;

use crate::node::{NodeIdx, NodeKind};
use crate::tree::{Tree, CURRENT_VERSION};

impl Tree {
    /// Serialize the whole document.
    ///
    /// The root always carries the current schema version, regardless of
    /// the version the document was hydrated with: writing is upgrading.
    pub fn to_wire(&self) -> WireNode {
        self.node_to_wire(self.root, true)
    }

    fn node_to_wire(&self, idx: NodeIdx, is_root: bool) -> WireNode {
        let node = self.node(idx);
        let mut wire = WireNode::new(node.element_name.clone());
        wire.set_attr(attr::CREATED, node.created.to_rfc3339());
        wire.set_attr(attr::LAST_MODIFIED, node.last_modified.to_rfc3339());
        wire.set_attr(attr::ID, node.id.to_string());
        wire.set_attr(attr::LAST_ACTION, node.last_action.as_str());
        if is_root {
            wire.set_attr(attr::VERSION, CURRENT_VERSION.to_string());
        }

        match &node.kind {
            NodeKind::Scalar(scalar) => {
                wire.text = Some(scalar.content.clone());
            }
            NodeKind::Named(named) => {
                self.push_name(&mut wire, named.name);
            }
            NodeKind::Record(record) => {
                self.push_name(&mut wire, record.name);
                for field in record.fields.values() {
                    wire.push_child(self.node_to_wire(*field, false));
                }
            }
            NodeKind::Collection(collection) => {
                self.push_name(&mut wire, collection.name);
                for child in collection.children.values() {
                    wire.push_child(self.node_to_wire(*child, false));
                }
            }
        }
        wire
    }

    fn push_name(&self, wire: &mut WireNode, name: Option<NodeIdx>) {
        if let Some(name) = name {
            wire.push_child(self.node_to_wire(name, false));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vaultsync_types::{ManualClock, SequentialIdSource, Timestamp};

    use super::*;
    use crate::resolver::{NodeResolver, NodeTemplate};

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
                "note" => Some(NodeTemplate::Scalar),
                _ => None,
            }
        }
    }

    fn fresh(tag: &str, template: &NodeTemplate) -> (Tree, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(Timestamp::parse(T0).unwrap()));
        let tree = Tree::new(
            tag,
            template,
            clock.clone(),
            Arc::new(SequentialIdSource::default()),
        )
        .unwrap();
        (tree, clock)
    }

    #[test]
    fn attributes_are_canonical_and_version_is_root_only() {
        let (mut tree, _) = fresh("table", &NodeTemplate::Collection);
        let root = tree.root();
        tree.add_child(root, "note", &NodeTemplate::Scalar).unwrap();

        let wire = tree.to_wire();
        let names: Vec<&str> = wire.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                attr::CREATED,
                attr::LAST_MODIFIED,
                attr::ID,
                attr::LAST_ACTION,
                attr::VERSION
            ]
        );
        assert_eq!(wire.attr(attr::VERSION), Some("2"));

        for child in &wire.children {
            assert_eq!(child.attr(attr::VERSION), None, "<{}>", child.tag);
        }
    }

    #[test]
    fn name_serializes_before_other_children() {
        let (mut tree, _) = fresh(
            "entry",
            &NodeTemplate::Record {
                fields: vec!["user".to_string(), "password".to_string()],
            },
        );
        tree.set_name(tree.root(), "mail account").unwrap();

        let wire = tree.to_wire();
        let tags: Vec<&str> = wire.children.iter().map(|c| c.tag.as_str()).collect();
        // Name first, then fields in key order.
        assert_eq!(tags, vec!["name", "password", "user"]);
        assert_eq!(wire.children[0].text.as_deref(), Some("mail account"));
        assert_eq!(wire.text, None);
    }

    #[test]
    fn tombstones_serialize_without_children() {
        let (mut tree, clock) = fresh("table", &NodeTemplate::Collection);
        let root = tree.root();
        let entry = tree
            .add_child(
                root,
                "entry",
                &NodeTemplate::Record {
                    fields: vec!["user".to_string(), "password".to_string()],
                },
            )
            .unwrap();
        let entry_id = tree.id(entry);

        clock.advance_millis(1_000);
        tree.remove_child(root, entry_id).unwrap();

        let wire = tree.to_wire();
        let tombstone = wire
            .children
            .iter()
            .find(|c| c.attr(attr::ID) == Some(entry_id.to_string().as_str()))
            .unwrap();
        assert_eq!(tombstone.attr(attr::LAST_ACTION), Some("DELETE"));
        assert!(tombstone.children.is_empty());
        assert_eq!(tombstone.text, None);
    }

    #[test]
    fn round_trip_preserves_structure_and_timestamps() {
        let (mut tree, clock) = fresh("table", &NodeTemplate::Collection);
        let root = tree.root();
        tree.set_name(root, "accounts").unwrap();

        let entry = tree
            .add_child(root, "entry", &TableResolver.resolve("entry").unwrap())
            .unwrap();
        tree.set_name(entry, "mail").unwrap();
        let user = tree.field(entry, "user").unwrap();
        tree.set_content(user, "alice").unwrap();

        clock.advance_millis(5_000);
        let note = tree.add_child(root, "note", &NodeTemplate::Scalar).unwrap();
        tree.set_content(note, "remember the milk").unwrap();
        let profile = tree.add_child(root, "profile", &NodeTemplate::Named).unwrap();
        tree.set_name(profile, "me").unwrap();

        clock.advance_millis(5_000);
        let gone = tree.add_child(root, "note", &NodeTemplate::Scalar).unwrap();
        let gone_id = tree.id(gone);
        tree.remove_child(root, gone_id).unwrap();

        let first = tree.to_wire();
        let back = Tree::from_wire(
            &first,
            &TableResolver,
            Arc::new(ManualClock::starting_at(Timestamp::parse(T0).unwrap())),
            Arc::new(SequentialIdSource::starting_at(10_000)),
        )
        .unwrap();
        let second = back.to_wire();
        assert_eq!(second, first);
    }
}
