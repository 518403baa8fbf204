//! Block record key layouts.
//!
//! Stores written by different chain client generations address the same block records
//! under different keys. Each supported convention is a [`KeyLayout`]; a [`KeyScheme`]
//! pairs a layout with an optional namespace prefix and is chosen once per run.
//!
//! | Kind          | `byte-prefix`        | `ascii-number-first`      | `ascii-hash-first`        |
//! |---------------|----------------------|---------------------------|---------------------------|
//! | header        | `0x30 num hash`      | `h num hash`              | `h hash num`              |
//! | body          | `0x31 num hash`      | `b num hash`              | `b hash num`              |
//! | canonical     | `0x32 num`           | `h num n`                 | `H num`                   |
//! | hash → number | `0x33 hash`          | `H hash`                  | `n hash`                  |
//! | receipts      | `0x34 num hash`      | `r num hash`              | `r hash num`              |
//! | TD            | `0x35 num hash`      | `h num hash t`            | `h hash num t`            |
//!
//! Block numbers are always 8-byte big-endian so keys sort by height.

use crate::KeyBytes;
use alloy_primitives::{B256, Bytes};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const NUMBER_LEN: usize = 8;
const HASH_LEN: usize = 32;

/// A named key layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum KeyLayout {
    /// Single-byte markers `0x30..=0x35`, number before hash.
    #[display("byte-prefix")]
    BytePrefix,
    /// ASCII markers, number before hash, `n`/`t` suffixes for canonical and TD keys.
    #[display("ascii-number-first")]
    AsciiNumberFirst,
    /// ASCII markers, hash before number, `H` for canonical mappings.
    #[display("ascii-hash-first")]
    AsciiHashFirst,
}

impl KeyLayout {
    /// Every supported layout.
    pub const ALL: [Self; 3] = [Self::BytePrefix, Self::AsciiNumberFirst, Self::AsciiHashFirst];

    const fn marker(self, kind: KeyKind) -> u8 {
        match (self, kind) {
            (Self::BytePrefix, KeyKind::Header) => 0x30,
            (Self::BytePrefix, KeyKind::Body) => 0x31,
            (Self::BytePrefix, KeyKind::Canonical) => 0x32,
            (Self::BytePrefix, KeyKind::HashToNumber) => 0x33,
            (Self::BytePrefix, KeyKind::Receipts) => 0x34,
            (Self::BytePrefix, KeyKind::TotalDifficulty) => 0x35,
            (_, KeyKind::Header | KeyKind::TotalDifficulty) => b'h',
            (_, KeyKind::Body) => b'b',
            (_, KeyKind::Receipts) => b'r',
            (Self::AsciiNumberFirst, KeyKind::Canonical) => b'h',
            (Self::AsciiNumberFirst, KeyKind::HashToNumber) => b'H',
            (Self::AsciiHashFirst, KeyKind::Canonical) => b'H',
            (Self::AsciiHashFirst, KeyKind::HashToNumber) => b'n',
        }
    }

    const fn suffix(self, kind: KeyKind) -> Option<u8> {
        match (self, kind) {
            (Self::BytePrefix, _) => None,
            (Self::AsciiNumberFirst, KeyKind::Canonical) => Some(b'n'),
            (_, KeyKind::TotalDifficulty) => Some(b't'),
            _ => None,
        }
    }

    const fn hash_first(self) -> bool {
        matches!(self, Self::AsciiHashFirst)
    }

    /// Length of a key of `kind` once the namespace is stripped.
    const fn key_len(self, kind: KeyKind) -> usize {
        let fields = match kind {
            KeyKind::Canonical => NUMBER_LEN,
            KeyKind::HashToNumber => HASH_LEN,
            _ => NUMBER_LEN + HASH_LEN,
        };
        1 + fields + if self.suffix(kind).is_some() { 1 } else { 0 }
    }
}

impl FromStr for KeyLayout {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|layout| layout.to_string() == s)
            .ok_or_else(|| KeyError::UnknownLayout(s.to_string()))
    }
}

/// The kind of record a block key addresses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// Encoded block header.
    #[display("header")]
    Header,
    /// Encoded block body.
    #[display("body")]
    Body,
    /// Encoded block receipts.
    #[display("receipts")]
    Receipts,
    /// Total difficulty at the block.
    #[display("td")]
    TotalDifficulty,
    /// Canonical number → hash mapping.
    #[display("canonical")]
    Canonical,
    /// Hash → number lookup.
    #[display("hash-to-number")]
    HashToNumber,
}

impl KeyKind {
    /// Every kind.
    pub const ALL: [Self; 6] = [
        Self::Header,
        Self::Body,
        Self::Receipts,
        Self::TotalDifficulty,
        Self::Canonical,
        Self::HashToNumber,
    ];

    /// The sub-records keyed by `(number, hash)` that make up a block.
    pub const BLOCK_RECORDS: [Self; 4] =
        [Self::Header, Self::Body, Self::Receipts, Self::TotalDifficulty];
}

/// Errors raised while encoding or decoding keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key does not start with the scheme's namespace.
    #[error("key {key} lies outside namespace {namespace}")]
    OutsideNamespace {
        /// The offending key.
        key: Bytes,
        /// The expected namespace.
        namespace: KeyBytes,
    },
    /// The key carries no marker byte after the namespace.
    #[error("key {0} is empty after its namespace")]
    Empty(Bytes),
    /// The marker byte is not used by the layout.
    #[error("unknown {layout} marker {marker:#04x} in key {key}")]
    UnknownMarker {
        /// Layout used for decoding.
        layout: KeyLayout,
        /// The unrecognised marker.
        marker: u8,
        /// The offending key.
        key: Bytes,
    },
    /// The marker is known but the length or suffix matches no kind.
    #[error("malformed {layout} key {key}")]
    Malformed {
        /// Layout used for decoding.
        layout: KeyLayout,
        /// The offending key.
        key: Bytes,
    },
    /// A layout name did not match any supported layout.
    #[error("unknown key layout {0:?}, expected one of byte-prefix, ascii-number-first, ascii-hash-first")]
    UnknownLayout(String),
}

/// A key decoded back into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedKey {
    /// What the key addresses.
    pub kind: KeyKind,
    /// Block number, absent for hash → number keys.
    pub number: Option<u64>,
    /// Block hash, absent for canonical mapping keys.
    pub hash: Option<B256>,
}

/// A key layout plus the namespace every block key is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyScheme {
    /// The key layout.
    pub layout: KeyLayout,
    /// Bytes prepended to every block key. Empty for most stores.
    #[serde(default)]
    pub namespace: KeyBytes,
}

impl KeyScheme {
    /// Creates a scheme without a namespace.
    pub fn new(layout: KeyLayout) -> Self {
        Self { layout, namespace: KeyBytes::default() }
    }

    /// Sets the namespace prepended to every block key.
    pub fn with_namespace(mut self, namespace: impl Into<KeyBytes>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Encodes the key for `kind`.
    ///
    /// `hash` is ignored for canonical keys and `number` for hash → number keys.
    pub fn encode(&self, kind: KeyKind, number: u64, hash: &B256) -> Vec<u8> {
        let layout = self.layout;
        let mut key = Vec::with_capacity(self.namespace.len() + layout.key_len(kind));
        key.extend_from_slice(&self.namespace);
        key.push(layout.marker(kind));
        match kind {
            KeyKind::Canonical => key.extend_from_slice(&number.to_be_bytes()),
            KeyKind::HashToNumber => key.extend_from_slice(hash.as_slice()),
            _ if layout.hash_first() => {
                key.extend_from_slice(hash.as_slice());
                key.extend_from_slice(&number.to_be_bytes());
            }
            _ => {
                key.extend_from_slice(&number.to_be_bytes());
                key.extend_from_slice(hash.as_slice());
            }
        }
        if let Some(suffix) = layout.suffix(kind) {
            key.push(suffix);
        }
        key
    }

    /// Key of the canonical hash at `number`.
    pub fn canonical_key(&self, number: u64) -> Vec<u8> {
        self.encode(KeyKind::Canonical, number, &B256::ZERO)
    }

    /// Key of the number lookup for `hash`.
    pub fn hash_to_number_key(&self, hash: &B256) -> Vec<u8> {
        self.encode(KeyKind::HashToNumber, 0, hash)
    }

    /// Shortest prefix shared by every canonical mapping key.
    ///
    /// Other kinds may live under the same prefix (`ascii-number-first` stores headers and
    /// TD under `h` too), so scanners must decode what they find.
    pub fn canonical_scan_prefix(&self) -> Vec<u8> {
        let mut prefix = self.namespace.to_vec();
        prefix.push(self.layout.marker(KeyKind::Canonical));
        prefix
    }

    /// Decodes a key produced by [`KeyScheme::encode`].
    pub fn decode(&self, key: &[u8]) -> Result<DecodedKey, KeyError> {
        let layout = self.layout;
        let body = key.strip_prefix(self.namespace.as_slice()).ok_or_else(|| {
            KeyError::OutsideNamespace {
                key: Bytes::copy_from_slice(key),
                namespace: self.namespace.clone(),
            }
        })?;
        let (&marker, _) = body.split_first().ok_or_else(|| KeyError::Empty(Bytes::copy_from_slice(key)))?;

        let mut candidates = KeyKind::ALL.into_iter().filter(|kind| layout.marker(*kind) == marker).peekable();
        if candidates.peek().is_none() {
            return Err(KeyError::UnknownMarker { layout, marker, key: Bytes::copy_from_slice(key) });
        }
        let kind = candidates
            .find(|kind| {
                body.len() == layout.key_len(*kind) &&
                    layout.suffix(*kind).is_none_or(|suffix| body.last() == Some(&suffix))
            })
            .ok_or_else(|| KeyError::Malformed { layout, key: Bytes::copy_from_slice(key) })?;

        let fields = &body[1..];
        let read_number = |at: usize| {
            let mut buf = [0u8; NUMBER_LEN];
            buf.copy_from_slice(&fields[at..at + NUMBER_LEN]);
            u64::from_be_bytes(buf)
        };
        let read_hash = |at: usize| B256::from_slice(&fields[at..at + HASH_LEN]);

        let decoded = match kind {
            KeyKind::Canonical => DecodedKey { kind, number: Some(read_number(0)), hash: None },
            KeyKind::HashToNumber => DecodedKey { kind, number: None, hash: Some(read_hash(0)) },
            _ if layout.hash_first() => {
                DecodedKey { kind, number: Some(read_number(HASH_LEN)), hash: Some(read_hash(0)) }
            }
            _ => DecodedKey { kind, number: Some(read_number(0)), hash: Some(read_hash(NUMBER_LEN)) },
        };
        Ok(decoded)
    }
}
