//! Error types for the tree crate.

use vaultsync_types::{NodeId, TypeError};

/// Errors that can occur while constructing, mutating, parsing, or merging
/// a document tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A required value was empty or malformed at construction or mutation
    /// time. Recoverable by the caller; never retried internally.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two nodes of different kinds were merged.
    #[error("cannot merge a {left} node with a {right} node")]
    IncompatibleMerge {
        left: &'static str,
        right: &'static str,
    },

    /// A content-mutating operation was attempted on a tombstone.
    #[error("node {0} already deleted")]
    AlreadyDeleted(NodeId),

    /// A serialized node is missing a required attribute.
    #[error("missing required attribute `{attr}` on <{tag}>")]
    MissingAttribute { tag: String, attr: String },

    /// A serialized attribute value could not be parsed.
    #[error("malformed attribute on <{tag}>: {source}")]
    MalformedAttribute {
        tag: String,
        #[source]
        source: TypeError,
    },

    /// No template is known for the given root tag.
    #[error("unresolvable root tag <{0}>")]
    UnresolvableRoot(String),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
