//! 256-bit content digests.
//!
//! Everything the ledger knows about an entity is a digest: the entity key,
//! each version's content, vector clocks, merge results. The all-zero value
//! is reserved as the "absent" sentinel (no common ancestor, unresolved merge).

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// A 256-bit digest.
///
/// Ordering compares the bytes left to right, which is the same as comparing
/// both values as big-endian unsigned integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The zero digest, used as the "absent" sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hashes arbitrary bytes with SHA-256.
    #[must_use]
    pub fn of(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true for the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Returns `None` for the zero sentinel, `Some(self)` otherwise.
    #[must_use]
    pub fn non_zero(self) -> Option<Self> {
        if self.is_zero() { None } else { Some(self) }
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|e| crate::Error::InvalidDigest(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| crate::Error::InvalidDigest(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
