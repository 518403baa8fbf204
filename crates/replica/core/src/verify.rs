//! Post-copy verification of the destination store.
//!
//! The verifier spot-checks a handful of heights and head pointers. Failures are
//! reported, never raised: only an I/O failure while reading aborts verification.

use crate::{KeyBytes, KeyKind, KeyScheme, Metrics, ReplicaError};
use alloy_primitives::B256;
use derive_more::Display;
use ferry_store::StoreReader;
use tracing::{info, warn};

/// A failed check at one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum VerifyFailure {
    /// No canonical mapping exists.
    #[display("no canonical hash")]
    NoCanonicalHash,
    /// The canonical mapping is not a 32-byte hash.
    #[display("canonical hash is {_0} bytes")]
    MalformedHash(usize),
    /// The header is missing.
    #[display("no header")]
    NoHeader,
    /// The total difficulty entry is missing.
    #[display("no total difficulty")]
    NoTd,
    /// The hash lookup points at another height.
    #[display("hash lookup points at block {found}")]
    NumberMismatch {
        /// The number stored in the lookup.
        found: u64,
    },
    /// The hash lookup is not an 8-byte number.
    #[display("hash lookup is {_0} bytes")]
    MalformedNumber(usize),
}

/// Outcome of checking one height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeightCheck {
    /// The height checked.
    pub number: u64,
    /// Canonical hash, when one was found and well formed.
    pub hash: Option<B256>,
    /// Whether a body exists. Empty blocks may legitimately lack one.
    pub body_present: bool,
    /// Failed checks; empty on success.
    pub failures: Vec<VerifyFailure>,
}

impl HeightCheck {
    /// Returns `true` if every check passed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of checking a head pointer.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum PointerOutcome {
    /// The pointer holds the expected hash.
    #[display("ok")]
    Match,
    /// The pointer key is absent.
    #[display("missing")]
    Missing,
    /// The pointer holds another value.
    #[display("points at {found}")]
    Mismatch {
        /// The stored value.
        found: KeyBytes,
    },
}

/// A head pointer checked against the canonical hash of the tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerCheck {
    /// The pointer key.
    pub key: KeyBytes,
    /// The check result.
    pub outcome: PointerOutcome,
}

/// Everything a [`Verifier`] run found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Per-height checks, in the order requested.
    pub heights: Vec<HeightCheck>,
    /// Head pointer checks.
    pub pointers: Vec<PointerCheck>,
}

impl VerificationReport {
    /// Returns `true` if every height and pointer check passed.
    pub fn passed(&self) -> bool {
        self.heights.iter().all(HeightCheck::passed) &&
            self.pointers.iter().all(|pointer| pointer.outcome == PointerOutcome::Match)
    }

    /// Number of failed checks.
    pub fn failure_count(&self) -> u64 {
        let heights: usize = self.heights.iter().map(|check| check.failures.len()).sum();
        let pointers =
            self.pointers.iter().filter(|pointer| pointer.outcome != PointerOutcome::Match).count();
        (heights + pointers) as u64
    }
}

/// Genesis, `end`, then any extra heights, without duplicates.
pub fn verify_heights(end: u64, extra: &[u64]) -> Vec<u64> {
    let mut heights = vec![0];
    for number in std::iter::once(end).chain(extra.iter().copied()) {
        if !heights.contains(&number) {
            heights.push(number);
        }
    }
    heights
}

/// Spot-checks block records in a store.
#[derive(Debug)]
pub struct Verifier<'a, S: ?Sized> {
    store: &'a S,
    scheme: &'a KeyScheme,
}

impl<'a, S> Verifier<'a, S>
where
    S: StoreReader + ?Sized,
{
    /// Creates a verifier reading `store` with `scheme`.
    pub const fn new(store: &'a S, scheme: &'a KeyScheme) -> Self {
        Self { store, scheme }
    }

    /// Checks every height in `heights` and every pointer in `pointers` against the
    /// canonical hash at `tip`.
    pub fn verify(
        &self,
        heights: &[u64],
        tip: u64,
        pointers: &[KeyBytes],
    ) -> Result<VerificationReport, ReplicaError> {
        let heights =
            heights.iter().map(|number| self.check_height(*number)).collect::<Result<Vec<_>, _>>()?;
        let pointers = if pointers.is_empty() {
            Vec::new()
        } else {
            let expected = self.canonical_hash(tip)?;
            pointers
                .iter()
                .map(|key| self.check_pointer(key, expected.as_ref()))
                .collect::<Result<Vec<_>, _>>()?
        };

        let report = VerificationReport { heights, pointers };
        let failures = report.failure_count();
        Metrics::record_verify_failures(failures);
        if failures == 0 {
            info!(target: "ferry::verify", heights = report.heights.len(), "Verification passed");
        } else {
            warn!(target: "ferry::verify", failures, "Verification found problems");
        }
        Ok(report)
    }

    /// Checks the records of a single height.
    pub fn check_height(&self, number: u64) -> Result<HeightCheck, ReplicaError> {
        let mut check = HeightCheck { number, hash: None, body_present: false, failures: Vec::new() };

        let Some(canonical) = self.read(&self.scheme.canonical_key(number))? else {
            check.failures.push(VerifyFailure::NoCanonicalHash);
            warn!(target: "ferry::verify", number, "Missing canonical hash");
            return Ok(check);
        };
        let Ok(hash) = B256::try_from(canonical.as_slice()) else {
            check.failures.push(VerifyFailure::MalformedHash(canonical.len()));
            warn!(target: "ferry::verify", number, len = canonical.len(), "Malformed canonical hash");
            return Ok(check);
        };
        check.hash = Some(hash);

        if self.read(&self.scheme.encode(KeyKind::Header, number, &hash))?.is_none() {
            check.failures.push(VerifyFailure::NoHeader);
        }
        if self.read(&self.scheme.encode(KeyKind::TotalDifficulty, number, &hash))?.is_none() {
            check.failures.push(VerifyFailure::NoTd);
        }
        check.body_present =
            self.read(&self.scheme.encode(KeyKind::Body, number, &hash))?.is_some();

        if let Some(found) = self.read(&self.scheme.hash_to_number_key(&hash))? {
            match <[u8; 8]>::try_from(found.as_slice()) {
                Ok(bytes) => {
                    let found = u64::from_be_bytes(bytes);
                    if found != number {
                        check.failures.push(VerifyFailure::NumberMismatch { found });
                    }
                }
                Err(_) => check.failures.push(VerifyFailure::MalformedNumber(found.len())),
            }
        }

        for failure in &check.failures {
            warn!(target: "ferry::verify", number, %hash, %failure, "Verification check failed");
        }
        Ok(check)
    }

    fn check_pointer(
        &self,
        key: &KeyBytes,
        expected: Option<&B256>,
    ) -> Result<PointerCheck, ReplicaError> {
        let outcome = match self.read(key)? {
            None => PointerOutcome::Missing,
            Some(value) if expected.is_some_and(|hash| hash.as_slice() == value.as_slice()) => {
                PointerOutcome::Match
            }
            Some(value) => PointerOutcome::Mismatch { found: value.into() },
        };
        if outcome != PointerOutcome::Match {
            warn!(target: "ferry::verify", %key, %outcome, "Head pointer check failed");
        }
        Ok(PointerCheck { key: key.clone(), outcome })
    }

    fn canonical_hash(&self, number: u64) -> Result<Option<B256>, ReplicaError> {
        Ok(self
            .read(&self.scheme.canonical_key(number))?
            .and_then(|value| B256::try_from(value.as_slice()).ok()))
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ReplicaError> {
        self.store.get(key).map_err(ReplicaError::Verify)
    }
}
