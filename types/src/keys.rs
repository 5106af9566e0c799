//! Validator identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading key bytes shown when a key is printed.
const TRIMMED_KEY_BYTES: usize = 6;

/// A validator's public key (BLS identity, opaque to the consensus core).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for PublicKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

/// Prints a trimmed hex prefix, suffixed with `…` when the key is longer.
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(TRIMMED_KEY_BYTES);
        write!(f, "{}", hex::encode(&self.0[..shown]))?;
        if self.0.len() > TRIMMED_KEY_BYTES {
            write!(f, "\u{2026}")?;
        }
        Ok(())
    }
}
