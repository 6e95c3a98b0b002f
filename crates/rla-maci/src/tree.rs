//! Fixed-depth append-only Merkle tree over field-element leaves.
//!
//! MACI merges the on-chain signup/message accumulators into fixed-depth
//! sparse trees before replay (§4.1 step 2). The exact hash function used by
//! the real MACI circuits (Poseidon) is circuit-specific and out of scope
//! (Non-goals: "full MACI circuit definitions"); this tree uses sha256 to
//! combine child hashes, reduced into the field, while preserving the
//! fixed-depth, zero-subtree-caching shape a sparse Merkle tree needs.

use rla_field::FieldElement;
use sha2::{Digest, Sha256};

fn hash_pair(left: &FieldElement, right: &FieldElement) -> FieldElement {
    let mut hasher = Sha256::new();
    hasher.update(left.to_bytes_be());
    hasher.update(right.to_bytes_be());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    FieldElement::from_bytes_be(&bytes)
}

/// A fixed-depth binary Merkle tree. Unfilled leaves are the zero element;
/// zero subtrees at every level are cached once so appends stay O(depth).
pub struct FixedDepthTree {
    depth: usize,
    zero_hashes: Vec<FieldElement>,
    leaves: Vec<FieldElement>,
}

impl FixedDepthTree {
    pub fn new(depth: usize) -> Self {
        let mut zero_hashes = vec![FieldElement::zero()];
        for i in 0..depth {
            let prev = zero_hashes[i];
            zero_hashes.push(hash_pair(&prev, &prev));
        }
        Self {
            depth,
            zero_hashes,
            leaves: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        1usize << self.depth
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn push(&mut self, leaf: FieldElement) {
        assert!(
            self.leaves.len() < self.capacity(),
            "fixed-depth tree of depth {} is full",
            self.depth
        );
        self.leaves.push(leaf);
    }

    /// Recomputes the root from the current leaf set, padding the rest of
    /// the tree with cached zero subtrees.
    pub fn root(&self) -> FieldElement {
        let mut level = self.leaves.clone();
        for d in 0..self.depth {
            let zero = self.zero_hashes[d];
            let mut next = Vec::with_capacity(level.len().div_ceil(2).max(1));
            let mut i = 0;
            while i < level.len() {
                let left = level[i];
                let right = level.get(i + 1).copied().unwrap_or(zero);
                next.push(hash_pair(&left, &right));
                i += 2;
            }
            if next.is_empty() {
                next.push(self.zero_hashes[d + 1]);
            }
            level = next;
        }
        level[0]
    }
}
