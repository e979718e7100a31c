//! Versioned node-tree model and pairwise merge for VaultSync documents.
//!
//! A document is a tree of typed nodes — scalars, named nodes, fixed-schema
//! records, and id-ordered collections — each carrying its own identity and
//! wall-clock timestamps. Two independently edited copies of the same
//! document merge without a coordinator: per node, the newer side wins, and
//! deletions leave tombstones that can still out-rank stale concurrent
//! edits.
//!
//! # Structure
//!
//! - [`Tree`] — arena of nodes addressed by [`NodeIdx`]; all construction,
//!   mutation, and query goes through the tree handle
//! - [`NodeKind`] — the closed union of node variants
//! - [`NodeResolver`] / [`NodeTemplate`] — the per-document "load child by
//!   tag" policy
//! - [`Tree::from_wire`] / [`Tree::to_wire`] — the serialized-node boundary
//! - [`Tree::merge`] — the pairwise, deep-copying merge
//!
//! The crate does no I/O and never touches serialized text; outer drivers
//! exchange [`WireNode`](vaultsync_types::WireNode) trees with it.

pub mod error;
pub mod node;
pub mod resolver;

mod hydrate;
mod merge;
mod serialize;
mod tree;

pub use error::{TreeError, TreeResult};
pub use node::{Node, NodeIdx, NodeKind};
pub use resolver::{NodeResolver, NodeTemplate, ScalarResolver};
pub use tree::{Tree, CURRENT_VERSION, LEGACY_VERSION};
