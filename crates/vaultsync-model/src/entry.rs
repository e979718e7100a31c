//! Handle and field schema for one password entry.

use vaultsync_tree::NodeIdx;

/// Field keys of a password entry record. Each key doubles as the field's
/// element tag in the serialized form.
pub mod field {
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "password";
    pub const URL: &str = "url";
    pub const REMARK: &str = "remark";

    /// The full declared schema.
    pub const ALL: [&str; 4] = [USER, PASSWORD, URL, REMARK];
}

/// Handle to one entry inside a [`PasswordTable`](crate::PasswordTable).
///
/// Like the node index it wraps, a handle is only valid for the table that
/// produced it; after a merge, look entries up again by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordEntry {
    pub(crate) idx: NodeIdx,
}
