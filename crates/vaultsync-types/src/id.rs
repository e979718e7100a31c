use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of one node within a document tree.
///
/// Assigned once at creation (from an [`IdSource`]) or parsed from the
/// serialized form, never changed afterwards. Two replicas of the same
/// document use equal ids to mean "the same logical node", which makes the
/// id the structural matching key during a merge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw 64-bit id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw 64-bit value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Source of fresh node ids.
///
/// Injected wherever nodes are created so that tests can use a predictable
/// counter while production draws random 64-bit values. Uniqueness is only
/// required within a single document tree.
pub trait IdSource: Send + Sync {
    /// Draw the next fresh id.
    fn next_id(&self) -> NodeId;
}

/// Production id source backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandomIdSource;

impl RandomIdSource {
    /// Create a new random id source.
    pub fn new() -> Self {
        Self
    }
}

impl IdSource for RandomIdSource {
    fn next_id(&self) -> NodeId {
        NodeId::new(rand::random::<u64>())
    }
}

/// Deterministic id source for tests: 1, 2, 3, ...
#[derive(Debug)]
pub struct SequentialIdSource {
    next: AtomicU64,
}

impl SequentialIdSource {
    /// Create a counter starting at the given value.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdSource {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> NodeId {
        NodeId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
