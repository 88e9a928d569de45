//! Serialized Leaf Snapshots
//!
//! Captures the raw leaf-hash list of a settled tree so claim-time proof
//! generation can rebuild the exact tree that produced the committed root.
//! Snapshots are JSON documents persisted by the reward store; the
//! on-chain root at any time corresponds to the latest snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::leaf::Leaf;
use crate::core::merkle::RewardTree;

/// Persisted leaf set of a settled tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSnapshot {
    /// Leaf hashes in canonical order (post-encoding, pre-combination).
    pub leaves: Vec<Leaf>,
    /// When this snapshot was captured.
    pub modified_date: DateTime<Utc>,
}

impl LeafSnapshot {
    /// Capture the leaf set of a tree, stamped now.
    pub fn capture(tree: &RewardTree) -> Self {
        Self {
            leaves: tree.leaves().to_vec(),
            modified_date: Utc::now(),
        }
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the persisted JSON form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Number of committed leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }
}

impl RewardTree {
    /// Rebuild the tree a snapshot was captured from.
    ///
    /// Runs the same sorted-pair construction, so the rebuilt root is
    /// bit-identical to the root of the original tree.
    pub fn from_snapshot(snapshot: &LeafSnapshot) -> Self {
        RewardTree::build(snapshot.leaves.clone())
    }
}
