//! Foundation types for VaultSync.
//!
//! This crate provides the identity, temporal, and boundary types used
//! throughout the VaultSync system. Every other VaultSync crate depends on
//! `vaultsync-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] — 64-bit node identity, the merge key within a document
//! - [`Timestamp`] — wall-clock timestamp with offset, RFC-3339 encoded
//! - [`Action`] — the last-action tag (`CREATE` / `UPDATE` / `DELETE`)
//! - [`Clock`] / [`IdSource`] — injected sources of "now" and fresh ids
//! - [`WireNode`] — the serialized-node representation exchanged with drivers
//! - [`partition`] — the set-partition helper driving collection merges

pub mod action;
pub mod clock;
pub mod error;
pub mod id;
pub mod partition;
pub mod timestamp;
pub mod wire;

pub use action::Action;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TypeError;
pub use id::{IdSource, NodeId, RandomIdSource, SequentialIdSource};
pub use partition::{partition, Partition};
pub use timestamp::Timestamp;
pub use wire::WireNode;
