use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The last action applied to a node.
///
/// `Delete` marks a tombstone: the node is logically gone but its id and
/// timestamps are retained so that the deletion can still out-rank a stale
/// concurrent edit in a later merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// The node was created and not touched since.
    Create,
    /// The node (or one of its descendants) was modified.
    Update,
    /// The node was deleted; only the tombstone remains.
    Delete,
}

impl Action {
    /// The wire encoding of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Action::Create),
            "UPDATE" => Ok(Action::Update),
            "DELETE" => Ok(Action::Delete),
            other => Err(TypeError::InvalidAction(other.to_string())),
        }
    }
}
