//! Byte strings as they appear in run configuration.

use alloy_primitives::{Bytes, hex};
use derive_more::Deref;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

/// A key or key prefix given in configuration.
///
/// Parsed from a string: a `0x`-prefixed value is decoded as hex, anything else is taken
/// as its raw ASCII bytes. `0x` alone is the empty byte string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deref)]
pub struct KeyBytes(Bytes);

impl KeyBytes {
    /// Wraps raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Borrows the raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` if the bytes form printable ASCII that cannot be mistaken for hex.
    fn is_plain_ascii(&self) -> bool {
        !self.0.is_empty() &&
            !self.0.starts_with(b"0x") &&
            self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
    }
}

impl From<&[u8]> for KeyBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for KeyBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for KeyBytes {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl FromStr for KeyBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x") {
            Some(digits) => Ok(Self(hex::decode(digits)?.into())),
            None => Ok(Self::from(s)),
        }
    }
}

impl fmt::Display for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain_ascii() {
            // Checked above: every byte is printable ASCII.
            f.write_str(&String::from_utf8_lossy(&self.0))
        } else {
            f.write_str(&hex::encode_prefixed(&self.0))
        }
    }
}

impl Serialize for KeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e| de::Error::custom(format!("invalid byte string {s:?}: {e}")))
    }
}
