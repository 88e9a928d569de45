//! Sorted-Pair Merkle Tree
//!
//! Commits a reward leaf set to a single root. Construction is a pure
//! function of the leaf *set*: leaf hashes are sorted before building and
//! sibling pairs are hashed in lexicographic order, so any permutation of
//! the same leaves - and any later rebuild from a persisted snapshot -
//! produces a bit-identical root. The commutative pair ordering matches
//! the reward vault contract's proof fold.

use alloy::primitives::{keccak256, B256};
use thiserror::Error;

use crate::core::leaf::Leaf;

/// Root committed for an empty leaf set.
pub const EMPTY_ROOT: B256 = B256::ZERO;

/// Merkle tree errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// The requested leaf is not part of this tree.
    #[error("leaf {0} not found in tree")]
    LeafNotFound(Leaf),
}

/// Hash two nodes in lexicographic order.
///
/// The lower value always goes left, which is what makes proof
/// verification independent of sibling position.
pub fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_slice());
    data[32..].copy_from_slice(right.as_slice());
    keccak256(data)
}

/// Merkle tree over a reward leaf set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardTree {
    /// Leaf hashes in canonical (sorted) order.
    leaves: Vec<Leaf>,
    /// All levels, leaves first, root level last.
    levels: Vec<Vec<B256>>,
}

impl RewardTree {
    /// Build a tree from leaf hashes.
    ///
    /// Input order does not matter; leaves are sorted into canonical
    /// order first. An odd node at any level is promoted unhashed.
    pub fn build(mut leaves: Vec<Leaf>) -> Self {
        leaves.sort_unstable();

        let mut levels = vec![leaves.clone()];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => next.push(hash_pair(left, right)),
                    [lone] => next.push(*lone),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                }
            }
            levels.push(next);
        }

        Self { leaves, levels }
    }

    /// The committed root. [`EMPTY_ROOT`] for an empty leaf set; a single
    /// leaf is its own root.
    pub fn root(&self) -> B256 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(EMPTY_ROOT)
    }

    /// Leaf hashes in canonical order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree commits the given leaf.
    pub fn contains(&self, leaf: &Leaf) -> bool {
        self.leaves.binary_search(leaf).is_ok()
    }

    /// Generate the inclusion proof for a leaf.
    pub fn proof(&self, leaf: Leaf) -> Result<MerkleProof, MerkleError> {
        let mut index = self
            .leaves
            .binary_search(&leaf)
            .map_err(|_| MerkleError::LeafNotFound(leaf))?;

        let mut steps = Vec::new();
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
            if sibling < level.len() {
                steps.push(ProofStep {
                    hash: level[sibling],
                    left: sibling < index,
                });
            }
            index /= 2;
        }

        Ok(MerkleProof { leaf, steps })
    }
}

/// One sibling along a proof path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    /// Sibling hash.
    pub hash: B256,
    /// Whether the sibling sits to the left of the path.
    pub left: bool,
}

/// Inclusion proof: the ordered sibling path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The leaf this proof is for.
    pub leaf: Leaf,
    /// Siblings from the leaf level upward.
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Sibling hashes in path order, the shape `claimTokens` expects.
    pub fn siblings(&self) -> Vec<B256> {
        self.steps.iter().map(|step| step.hash).collect()
    }
}

/// Verify an inclusion proof against a root.
///
/// Folds with the same lexicographic pair ordering as construction,
/// mirroring the contract-side verifier.
pub fn verify_proof(root: &B256, leaf: &Leaf, siblings: &[B256]) -> bool {
    let folded = siblings
        .iter()
        .fold(*leaf, |acc, sibling| hash_pair(&acc, sibling));
    folded == *root
}
