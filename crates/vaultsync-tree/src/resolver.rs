//! The "load child by tag" policy.
//!
//! A collection holds heterogeneous children; when one is hydrated from its
//! serialized form, the concrete node variant is chosen by the document's
//! [`NodeResolver`] from the child's tag. Document schemas (e.g. the
//! password model) implement their own resolver; the default treats every
//! tag as a scalar.

/// Blueprint for constructing one node variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTemplate {
    /// A string leaf.
    Scalar,
    /// A node with only an independently-merged name.
    Named,
    /// A record with the given fixed field schema.
    Record {
        /// Field names, which double as the fields' element tags.
        fields: Vec<String>,
    },
    /// An id-ordered collection of children.
    Collection,
}

/// Maps a tag name to the template used to build or hydrate a node.
pub trait NodeResolver {
    /// The template for the given tag, or `None` if the tag is unknown.
    /// Unknown children are skipped (with a warning) during hydration.
    fn resolve(&self, tag: &str) -> Option<NodeTemplate>;
}

/// Default policy: every tag is a scalar.
#[derive(Debug, Default)]
pub struct ScalarResolver;

impl NodeResolver for ScalarResolver {
    fn resolve(&self, _tag: &str) -> Option<NodeTemplate> {
        Some(NodeTemplate::Scalar)
    }
}
