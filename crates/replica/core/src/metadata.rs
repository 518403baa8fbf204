//! Chain metadata copy.

use crate::{KeyBytes, Metrics, ReplicaError, metrics::timed_flush};
use ferry_store::{BatchWriter, StoreReader, StoreWriter};
use tracing::{debug, info};

/// Counters produced by a [`MetadataCopier`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataStats {
    /// Singleton keys found and copied.
    pub singletons: u64,
    /// Singleton keys absent from the source.
    pub singletons_missing: u64,
    /// Entries copied from metadata prefixes.
    pub prefix_entries: u64,
}

impl MetadataStats {
    /// Total entries copied.
    pub const fn total(&self) -> u64 {
        self.singletons + self.prefix_entries
    }
}

/// Copies head pointers and chain configuration entries.
///
/// Metadata is small, so everything goes out in a single batch.
#[derive(Debug)]
pub struct MetadataCopier<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    dest: &'a D,
}

impl<'a, S, D> MetadataCopier<'a, S, D>
where
    S: StoreReader + ?Sized,
    D: StoreWriter + ?Sized,
{
    /// Creates a metadata copier.
    pub const fn new(source: &'a S, dest: &'a D) -> Self {
        Self { source, dest }
    }

    /// Copies each of `keys` that exists plus every entry under each of `prefixes`.
    pub fn copy(
        &self,
        keys: &[KeyBytes],
        prefixes: &[KeyBytes],
    ) -> Result<MetadataStats, ReplicaError> {
        let mut writer = BatchWriter::new(self.dest);
        let mut stats = MetadataStats::default();

        for key in keys {
            match self.source.get(key).map_err(ReplicaError::Metadata)? {
                Some(value) => {
                    writer.put(key.to_vec(), value);
                    stats.singletons += 1;
                }
                None => {
                    debug!(target: "ferry::metadata", %key, "Metadata key missing from source");
                    stats.singletons_missing += 1;
                }
            }
        }

        for prefix in prefixes {
            let mut copied = 0u64;
            for entry in self.source.iter_prefix(prefix).map_err(ReplicaError::Metadata)? {
                let (key, value) = entry.map_err(ReplicaError::Metadata)?;
                writer.put(key, value);
                copied += 1;
            }
            debug!(target: "ferry::metadata", %prefix, copied, "Copied metadata prefix");
            stats.prefix_entries += copied;
        }

        timed_flush(&mut writer, "metadata").map_err(ReplicaError::Metadata)?;
        Metrics::record_metadata_entries(stats.total());
        info!(
            target: "ferry::metadata",
            singletons = stats.singletons,
            missing = stats.singletons_missing,
            prefix_entries = stats.prefix_entries,
            "Copied chain metadata"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_store::MemoryStore;

    fn keys(names: &[&str]) -> Vec<KeyBytes> {
        names.iter().map(|name| KeyBytes::from(*name)).collect()
    }

    #[test]
    fn test_copies_present_keys_and_prefixes() {
        let source = MemoryStore::from_iter([
            (b"LastBlock".to_vec(), vec![0xaa; 32]),
            (b"LastHeader".to_vec(), vec![0xbb; 32]),
            (b"ethereum-config-genesis".to_vec(), b"{}".to_vec()),
            (b"ethereum-config-fork".to_vec(), b"{}".to_vec()),
            (b"ethereum-configx".to_vec(), b"{}".to_vec()),
        ]);
        let dest = MemoryStore::new();

        let stats = MetadataCopier::new(&source, &dest)
            .copy(&keys(&["LastBlock", "LastHeader", "LastFast"]), &keys(&["ethereum-config-"]))
            .unwrap();

        assert_eq!(
            stats,
            MetadataStats { singletons: 2, singletons_missing: 1, prefix_entries: 2 }
        );
        assert_eq!(dest.len(), 4);
        assert_eq!(dest.get(b"LastFast").unwrap(), None);
        assert_eq!(dest.get(b"ethereum-configx").unwrap(), None);
        assert_eq!(dest.write_count(), 1);
    }

    #[test]
    fn test_nothing_to_copy() {
        let source = MemoryStore::new();
        let dest = MemoryStore::new();
        let stats =
            MetadataCopier::new(&source, &dest).copy(&keys(&["LastBlock"]), &keys(&["eth-config-"])).unwrap();
        assert_eq!(stats.total(), 0);
        assert_eq!(dest.write_count(), 0);
    }
}
