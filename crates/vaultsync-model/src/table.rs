//! The password-store document: a named collection of password entries.
//!
//! [`PasswordTable`] binds the generic document tree to the concrete
//! password schema: the root is a collection tagged `table`, its children
//! are records tagged `entry` with the fields declared in
//! [`field`](crate::entry::field). All merge and persistence behavior comes
//! from the tree; this layer only adds typed access.

use std::sync::Arc;

use tracing::debug;

use vaultsync_tree::{NodeResolver, NodeTemplate, Tree};
use vaultsync_types::{Clock, IdSource, NodeId, Timestamp, WireNode};

use crate::entry::{field, PasswordEntry};
use crate::error::ModelResult;

/// Element tag of the document root.
pub const TABLE_TAG: &str = "table";

/// Element tag of one password entry.
pub const ENTRY_TAG: &str = "entry";

fn entry_template() -> NodeTemplate {
    NodeTemplate::Record {
        fields: field::ALL.iter().map(|key| (*key).to_string()).collect(),
    }
}

/// Tag-to-template policy for password documents.
#[derive(Debug, Default)]
pub struct PasswordResolver;

impl NodeResolver for PasswordResolver {
    fn resolve(&self, tag: &str) -> Option<NodeTemplate> {
        match tag {
            TABLE_TAG => Some(NodeTemplate::Collection),
            ENTRY_TAG => Some(entry_template()),
            _ => None,
        }
    }
}

/// A password store: the typed facade over one document tree.
#[derive(Clone, Debug)]
pub struct PasswordTable {
    tree: Tree,
}

impl PasswordTable {
    /// Create an empty table with the production clock and id source.
    pub fn new() -> ModelResult<Self> {
        Ok(Self {
            tree: Tree::with_defaults(TABLE_TAG, &NodeTemplate::Collection)?,
        })
    }

    /// Create an empty table on an explicit clock and id source.
    pub fn new_with(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>) -> ModelResult<Self> {
        Ok(Self {
            tree: Tree::new(TABLE_TAG, &NodeTemplate::Collection, clock, ids)?,
        })
    }

    /// Hydrate a table from its serialized form.
    pub fn from_wire(wire: &WireNode) -> ModelResult<Self> {
        Ok(Self {
            tree: Tree::from_wire_with_defaults(wire, &PasswordResolver)?,
        })
    }

    /// [`PasswordTable::from_wire`] on an explicit clock and id source.
    pub fn from_wire_with(
        wire: &WireNode,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> ModelResult<Self> {
        Ok(Self {
            tree: Tree::from_wire(wire, &PasswordResolver, clock, ids)?,
        })
    }

    /// Serialize the table.
    pub fn to_wire(&self) -> WireNode {
        self.tree.to_wire()
    }

    /// Merge with another copy of this table. Neither input is mutated.
    pub fn merge(&self, other: &PasswordTable) -> ModelResult<PasswordTable> {
        Ok(Self {
            tree: self.tree.merge(&other.tree)?,
        })
    }

    /// The underlying document tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    // ---------------------------------------------------------------
    // Table-level access
    // ---------------------------------------------------------------

    /// The table's name, if one has been set.
    pub fn name(&self) -> Option<&str> {
        self.tree.name(self.tree.root())
    }

    /// Rename the table.
    pub fn set_name(&mut self, value: &str) -> ModelResult<()> {
        Ok(self.tree.set_name(self.tree.root(), value)?)
    }

    /// Timestamp of the last change anywhere in the document.
    pub fn last_modified(&self) -> Timestamp {
        self.tree.last_modified(self.tree.root())
    }

    // ---------------------------------------------------------------
    // Entries
    // ---------------------------------------------------------------

    /// Create a fresh, empty entry.
    pub fn add_entry(&mut self) -> ModelResult<PasswordEntry> {
        let idx = self
            .tree
            .add_child(self.tree.root(), ENTRY_TAG, &entry_template())?;
        debug!(id = %self.tree.id(idx), "added password entry");
        Ok(PasswordEntry { idx })
    }

    /// The visible entries, in ascending id order.
    pub fn entries(&self) -> ModelResult<Vec<PasswordEntry>> {
        Ok(self
            .tree
            .visible_children(self.tree.root())?
            .into_iter()
            .map(|idx| PasswordEntry { idx })
            .collect())
    }

    /// Look up a visible entry by id.
    pub fn entry_by_id(&self, id: NodeId) -> ModelResult<Option<PasswordEntry>> {
        Ok(self
            .tree
            .visible_child_by_id(self.tree.root(), id)?
            .map(|idx| PasswordEntry { idx }))
    }

    /// The entry's id, stable across merges and serialization.
    pub fn entry_id(&self, entry: PasswordEntry) -> NodeId {
        self.tree.id(entry.idx)
    }

    /// Timestamp of the entry's last change.
    pub fn entry_last_modified(&self, entry: PasswordEntry) -> Timestamp {
        self.tree.last_modified(entry.idx)
    }

    /// Delete an entry. It stays behind as a tombstone so the deletion
    /// survives merging with copies that still carry it.
    pub fn remove_entry(&mut self, id: NodeId) -> ModelResult<()> {
        Ok(self.tree.remove_child(self.tree.root(), id)?)
    }

    // ---------------------------------------------------------------
    // Entry fields
    // ---------------------------------------------------------------

    /// The entry's display name, if set.
    pub fn entry_name(&self, entry: PasswordEntry) -> Option<&str> {
        self.tree.name(entry.idx)
    }

    /// Rename an entry.
    pub fn set_entry_name(&mut self, entry: PasswordEntry, value: &str) -> ModelResult<()> {
        Ok(self.tree.set_name(entry.idx, value)?)
    }

    pub fn user(&self, entry: PasswordEntry) -> ModelResult<&str> {
        self.field_value(entry, field::USER)
    }

    pub fn set_user(&mut self, entry: PasswordEntry, value: &str) -> ModelResult<()> {
        self.set_field(entry, field::USER, value)
    }

    pub fn password(&self, entry: PasswordEntry) -> ModelResult<&str> {
        self.field_value(entry, field::PASSWORD)
    }

    pub fn set_password(&mut self, entry: PasswordEntry, value: &str) -> ModelResult<()> {
        self.set_field(entry, field::PASSWORD, value)
    }

    pub fn url(&self, entry: PasswordEntry) -> ModelResult<&str> {
        self.field_value(entry, field::URL)
    }

    pub fn set_url(&mut self, entry: PasswordEntry, value: &str) -> ModelResult<()> {
        self.set_field(entry, field::URL, value)
    }

    pub fn remark(&self, entry: PasswordEntry) -> ModelResult<&str> {
        self.field_value(entry, field::REMARK)
    }

    pub fn set_remark(&mut self, entry: PasswordEntry, value: &str) -> ModelResult<()> {
        self.set_field(entry, field::REMARK, value)
    }

    fn field_value(&self, entry: PasswordEntry, key: &str) -> ModelResult<&str> {
        let idx = self.tree.field(entry.idx, key)?;
        Ok(self.tree.content(idx)?)
    }

    fn set_field(&mut self, entry: PasswordEntry, key: &str, value: &str) -> ModelResult<()> {
        let idx = self.tree.field(entry.idx, key)?;
        Ok(self.tree.set_content(idx, value)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vaultsync_types::{ManualClock, SequentialIdSource, Timestamp};

    use super::*;

    const T0: &str = "2008-09-21T15:51:30.346+02:00";
    const T1: &str = "2008-09-21T16:51:30.346+02:00";
    const T2: &str = "2008-09-21T18:00:00.346+02:00";

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    fn fresh_table() -> (PasswordTable, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(ts(T0)));
        let table = PasswordTable::new_with(
            clock.clone(),
            Arc::new(SequentialIdSource::default()),
        )
        .unwrap();
        (table, clock)
    }

    #[test]
    fn new_entry_starts_blank() {
        let (mut table, _) = fresh_table();
        let entry = table.add_entry().unwrap();

        // Entries are born with an empty name sub-node.
        assert_eq!(table.entry_name(entry), Some(""));
        assert_eq!(table.user(entry).unwrap(), "");
        assert_eq!(table.password(entry).unwrap(), "");
        assert_eq!(table.url(entry).unwrap(), "");
        assert_eq!(table.remark(entry).unwrap(), "");
        assert_eq!(table.entries().unwrap(), vec![entry]);
    }

    #[test]
    fn fields_store_what_was_written() {
        let (mut table, _) = fresh_table();
        table.set_name("private").unwrap();
        let entry = table.add_entry().unwrap();
        table.set_entry_name(entry, "mail").unwrap();
        table.set_user(entry, "alice").unwrap();
        table.set_password(entry, "hunter2").unwrap();
        table.set_url(entry, "https://mail.example.com").unwrap();
        table.set_remark(entry, "work account").unwrap();

        assert_eq!(table.name(), Some("private"));
        assert_eq!(table.entry_name(entry), Some("mail"));
        assert_eq!(table.user(entry).unwrap(), "alice");
        assert_eq!(table.password(entry).unwrap(), "hunter2");
        assert_eq!(table.url(entry).unwrap(), "https://mail.example.com");
        assert_eq!(table.remark(entry).unwrap(), "work account");
    }

    #[test]
    fn removed_entries_disappear_from_listing() {
        let (mut table, clock) = fresh_table();
        let keep = table.add_entry().unwrap();
        let gone = table.add_entry().unwrap();
        let gone_id = table.entry_id(gone);

        clock.advance_millis(1_000);
        table.remove_entry(gone_id).unwrap();

        assert_eq!(table.entries().unwrap(), vec![keep]);
        assert_eq!(table.entry_by_id(gone_id).unwrap(), None);
        assert!(table.user(gone).is_err());
    }

    #[test]
    fn divergent_field_edits_both_survive_a_merge() {
        let (mut left, clock) = fresh_table();
        let entry = left.add_entry().unwrap();
        let entry_id = left.entry_id(entry);
        let mut right = left.clone();

        clock.set(ts(T1));
        left.set_user(entry, "alice").unwrap();
        clock.set(ts(T2));
        right.set_password(entry, "hunter2").unwrap();

        let merged = left.merge(&right).unwrap();
        let mentry = merged.entry_by_id(entry_id).unwrap().unwrap();
        assert_eq!(merged.user(mentry).unwrap(), "alice");
        assert_eq!(merged.password(mentry).unwrap(), "hunter2");
    }

    #[test]
    fn a_newer_delete_wins_over_a_stale_edit() {
        let (mut left, clock) = fresh_table();
        let entry = left.add_entry().unwrap();
        let entry_id = left.entry_id(entry);
        let mut right = left.clone();

        clock.set(ts(T1));
        left.set_user(entry, "mallory").unwrap();
        clock.set(ts(T2));
        right.remove_entry(entry_id).unwrap();

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.entry_by_id(entry_id).unwrap(), None);
        assert!(merged.entries().unwrap().is_empty());
    }

    #[test]
    fn wire_round_trip_preserves_the_table() {
        let (mut table, clock) = fresh_table();
        table.set_name("private").unwrap();
        let entry = table.add_entry().unwrap();
        table.set_entry_name(entry, "mail").unwrap();
        table.set_user(entry, "alice").unwrap();
        clock.advance_millis(1_000);
        table.set_password(entry, "hunter2").unwrap();

        let wire = table.to_wire();
        let back = PasswordTable::from_wire_with(
            &wire,
            Arc::new(ManualClock::starting_at(ts(T0))),
            Arc::new(SequentialIdSource::starting_at(10_000)),
        )
        .unwrap();

        assert_eq!(back.name(), Some("private"));
        let entry_id = table.entry_id(entry);
        let bentry = back.entry_by_id(entry_id).unwrap().unwrap();
        assert_eq!(back.entry_name(bentry), Some("mail"));
        assert_eq!(back.user(bentry).unwrap(), "alice");
        assert_eq!(back.password(bentry).unwrap(), "hunter2");
        assert_eq!(back.to_wire(), wire);
    }
}
