//! Typed password-store schema over the VaultSync document tree.
//!
//! [`PasswordTable`] is the concrete document: a named collection of
//! password entries, each a fixed-schema record of credential fields. The
//! generic tree supplies identity, timestamps, tombstones, and the pairwise
//! merge; this crate pins down the tags and fields and exposes a typed
//! surface so callers never touch node indices or templates directly.

pub mod entry;
pub mod error;
pub mod table;

pub use entry::{field, PasswordEntry};
pub use error::{ModelError, ModelResult};
pub use table::{PasswordResolver, PasswordTable, ENTRY_TAG, TABLE_TAG};
