//! Best-effort classification of unknown stores.
//!
//! Nothing here is consulted when copying. The classifier only helps an operator pick
//! the right [`KeyLayout`] and bulk prefixes for a store they have never seen.

use crate::{KeyKind, KeyLayout, KeyScheme};
use derive_more::Display;
use ferry_store::{StoreError, StoreReader};
use std::collections::BTreeMap;
use tracing::debug;

/// Length of a content hash used as a key.
const HASH_KEY_LEN: usize = 32;

/// Smallest RLP list header byte.
const RLP_LIST_OFFSET: u8 = 0xc0;

/// A guess at what a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum KeyClass {
    /// A block record under one of the supported layouts.
    #[display("block {kind}")]
    Block {
        /// The record kind.
        kind: KeyKind,
    },
    /// A hash-keyed RLP list, most likely a state trie node.
    #[display("trie node")]
    TrieNode,
    /// A `c`-prefixed hash key, most likely contract code.
    #[display("code")]
    Code,
    /// A printable ASCII key.
    #[display("metadata")]
    Metadata,
    /// Anything else.
    #[display("unknown")]
    Unknown,
}

/// Classifies a single entry, returning the class and every layout that decodes the key.
///
/// Keys shaped like block records may decode under more than one layout; the class
/// reflects the first match in [`KeyLayout::ALL`].
pub fn classify(key: &[u8], value: &[u8], namespace: &[u8]) -> (KeyClass, Vec<KeyLayout>) {
    let decoded: Vec<_> = KeyLayout::ALL
        .into_iter()
        .filter_map(|layout| {
            KeyScheme::new(layout)
                .with_namespace(namespace)
                .decode(key)
                .ok()
                .map(|decoded| (layout, decoded.kind))
        })
        .collect();
    if let Some((_, kind)) = decoded.first() {
        let layouts = decoded.iter().map(|(layout, _)| *layout).collect();
        return (KeyClass::Block { kind: *kind }, layouts);
    }

    let class = match key {
        [b'c', hash @ ..] if hash.len() == HASH_KEY_LEN => KeyClass::Code,
        _ if key.len() == HASH_KEY_LEN && value.first().is_some_and(|b| *b >= RLP_LIST_OFFSET) => {
            KeyClass::TrieNode
        }
        _ if !key.is_empty() && key.iter().all(u8::is_ascii_graphic) => KeyClass::Metadata,
        _ => KeyClass::Unknown,
    };
    (class, Vec::new())
}

/// Counts produced by [`survey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Survey {
    /// Entries examined.
    pub scanned: u64,
    /// Entries per class.
    pub classes: BTreeMap<KeyClass, u64>,
    /// Block record keys each layout decodes.
    pub layout_hits: BTreeMap<KeyLayout, u64>,
}

impl Survey {
    /// The layout decoding the most block record keys, if any decoded at all.
    pub fn likely_layout(&self) -> Option<KeyLayout> {
        self.layout_hits
            .iter()
            .max_by_key(|(layout, hits)| (**hits, std::cmp::Reverse(**layout)))
            .map(|(layout, _)| *layout)
    }

    fn record(&mut self, class: KeyClass, layouts: &[KeyLayout]) {
        self.scanned += 1;
        *self.classes.entry(class).or_default() += 1;
        for layout in layouts {
            *self.layout_hits.entry(*layout).or_default() += 1;
        }
    }
}

/// Classifies the entries of `store` in key order, stopping after `limit` entries.
pub fn survey<S>(store: &S, namespace: &[u8], limit: Option<u64>) -> Result<Survey, StoreError>
where
    S: StoreReader + ?Sized,
{
    let mut survey = Survey::default();
    for entry in store.iter_prefix(&[])? {
        if limit.is_some_and(|limit| survey.scanned >= limit) {
            break;
        }
        let (key, value) = entry?;
        let (class, layouts) = classify(&key, &value, namespace);
        survey.record(class, &layouts);
    }
    debug!(target: "ferry::store", scanned = survey.scanned, "Surveyed store");
    Ok(survey)
}
