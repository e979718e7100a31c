use serde::{Deserialize, Serialize};

/// Attribute names used on every serialized node.
pub mod attr {
    /// Node id, decimal unsigned 64-bit.
    pub const ID: &str = "id";
    /// Creation timestamp, RFC 3339.
    pub const CREATED: &str = "created";
    /// Last-modification timestamp, RFC 3339.
    pub const LAST_MODIFIED: &str = "lastModified";
    /// Last action, one of `CREATE` / `UPDATE` / `DELETE`.
    pub const LAST_ACTION: &str = "lastAction";
    /// Document schema version, present on the root only.
    pub const VERSION: &str = "version";
    /// Legacy (schema v1) inline name.
    pub const NAME: &str = "name";
}

/// The reserved tag of the name sub-node (schema v2 encoding).
pub const NAME_TAG: &str = "name";

/// One node of the serialized document tree.
///
/// This is the boundary contract between the merge core and the outer
/// driver: the driver turns decrypted file text into a `WireNode` tree and
/// back, the core consumes and produces `WireNode`s and never touches text
/// or files itself. Attributes and children keep their order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    /// The structural tag (element name).
    pub tag: String,
    /// Ordered attribute pairs.
    pub attrs: Vec<(String, String)>,
    /// Ordered child nodes.
    pub children: Vec<WireNode>,
    /// Text content; only leaf (scalar) nodes carry any.
    pub text: Option<String>,
}

impl WireNode {
    /// Create an empty node with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Look up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value of the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(pair) => pair.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Append a child node.
    pub fn push_child(&mut self, child: WireNode) {
        self.children.push(child);
    }

    /// Iterate over children with the given tag.
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a WireNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}
