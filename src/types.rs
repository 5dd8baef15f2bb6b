//! Shared identifier types: content hashes and inodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width every hash is zero-padded to when mixed into a commit hash.
pub const HASH_PAD_WIDTH: usize = 64;

/// Process-unique, hash-independent node identifier.
pub type Inode = u64;

/// A content hash.
///
/// Stored as raw bytes so the rest of the system stays agnostic of the
/// digest length. An empty hash stands for "absent" (e.g. the parent of the
/// very first commit).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(Vec<u8>);

impl Hash {
    pub fn empty() -> Self {
        Hash(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Hash(bytes.into())
    }

    /// BLAKE3 digest of `data`.
    pub fn sum(data: &[u8]) -> Self {
        Hash(blake3::hash(data).as_bytes().to_vec())
    }

    /// BLAKE3 digest over several byte slices, fed in order.
    pub fn sum_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Hash(hasher.finalize().as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// XOR `other` into `self`. The shorter operand is treated as zero-extended.
    pub fn xor_in(&mut self, other: &Hash) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (dst, src) in self.0.iter_mut().zip(other.0.iter()) {
            *dst ^= *src;
        }
    }

    /// Zero-padded fixed-width copy. Longer hashes are truncated.
    pub fn padded(&self) -> [u8; HASH_PAD_WIDTH] {
        let mut out = [0u8; HASH_PAD_WIDTH];
        let n = self.0.len().min(HASH_PAD_WIDTH);
        out[..n].copy_from_slice(&self.0[..n]);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(Hash)
    }

    /// First eight hex characters, for log output.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        full.chars().take(8).collect()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.to_hex())
        }
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}
