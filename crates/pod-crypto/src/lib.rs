//! Cryptographic primitives for the PoD commitment core.
//!
//! Provides the single content hasher used for both content digests and
//! Merkle parents, canonical JSON encoding for structured payloads, the
//! binary Merkle tree with positional inclusion proofs, and deterministic
//! address derivation.
//!
//! All crypto operations wrap BLAKE3; there are no custom primitives.

pub mod address;
pub mod canonical;
pub mod hasher;
pub mod merkle;

pub use address::{AddressDeriver, DeriveError, MAX_SEEDS, MAX_SEED_LEN};
pub use canonical::{canonical_json, canonicalize};
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{MerkleProof, MerkleTree};
