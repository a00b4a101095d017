use pod_types::Digest;
use serde::{Deserialize, Serialize};

use crate::hasher::ContentHasher;

/// Binary Merkle tree over an ordered list of digests.
///
/// Leaf order is significant: it fixes each item's proof index. A level with
/// an odd number of nodes pairs its last node with itself. Parents are
/// `hash(left || right)` through the content hasher.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    hasher: ContentHasher,
    /// The root hash of the tree.
    root: Digest,
    /// All tree nodes stored level by level.
    /// Level 0 = leaves, last level = `[root]`.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree with the content hasher.
    ///
    /// An empty list produces a null root. A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        Self::with_hasher(ContentHasher::CONTENT, leaves)
    }

    /// Build a tree with an explicit hasher.
    pub fn with_hasher(hasher: ContentHasher, leaves: Vec<Digest>) -> Self {
        if leaves.is_empty() {
            return Self {
                hasher,
                root: Digest::null(),
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<Digest>> = vec![leaves];

        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hasher.hash_pair(left, right),
                    [odd] => hasher.hash_pair(odd, odd),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Self {
            hasher,
            root,
            levels,
        }
    }

    /// The root hash of the tree.
    pub fn root(&self) -> Digest {
        self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Leaves in their original order.
    pub fn leaves(&self) -> &[Digest] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of levels including leaves and root.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Generate the inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = idx ^ 1;
            // Odd level: the last node is its own sibling.
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            siblings.push(sibling);
            idx /= 2;
        }

        Some(MerkleProof {
            index,
            leaf: self.levels[0][index],
            siblings,
            root: self.root,
        })
    }

    /// Proofs for every leaf, indexed positionally.
    pub fn proofs(&self) -> Vec<MerkleProof> {
        (0..self.leaf_count()).filter_map(|i| self.proof(i)).collect()
    }

    /// The hasher this tree was built with.
    pub fn hasher(&self) -> ContentHasher {
        self.hasher
    }
}

/// Merkle inclusion proof.
///
/// The side of each sibling is implied by the bits of `index`: at level `k`,
/// bit `k` set means the running node is a right child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Leaf position in the batch.
    pub index: usize,
    /// The leaf being proven.
    pub leaf: Digest,
    /// Sibling hashes from leaf level up to just below the root.
    pub siblings: Vec<Digest>,
    /// Expected root hash.
    pub root: Digest,
}

impl MerkleProof {
    /// Recompute the root from the leaf and the sibling path.
    pub fn compute_root(&self, hasher: &ContentHasher) -> Digest {
        let mut current = self.leaf;
        let mut idx = self.index;
        for sibling in &self.siblings {
            current = if idx % 2 == 0 {
                hasher.hash_pair(&current, sibling)
            } else {
                hasher.hash_pair(sibling, &current)
            };
            idx /= 2;
        }
        current
    }

    /// Verify the proof with the content hasher.
    pub fn verify(&self) -> bool {
        self.verify_with(&ContentHasher::CONTENT)
    }

    /// Verify the proof with an explicit hasher.
    pub fn verify_with(&self, hasher: &ContentHasher) -> bool {
        self.compute_root(hasher) == self.root
    }

    /// Returns `true` if this proof shows `leaf` is in a tree rooted at `root`.
    pub fn proves(&self, leaf: &Digest, root: &Digest) -> bool {
        self.leaf == *leaf && self.root == *root && self.verify()
    }
}
