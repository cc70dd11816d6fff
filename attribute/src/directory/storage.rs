//! A [super::Directory] backed by a [commonware_runtime::Storage] partition.
//!
//! # Layout
//!
//! Each generation of an attribute is a single blob holding its header and data, named after the
//! serial number it was flushed at:
//!
//! ```text
//! <partition>/
//!   snapshot-120/<name>.dat
//!   snapshot-250/<name>.dat
//! ```
//!
//! A generation is only usable once its blob holds data. Empty blobs (for example, a flush
//! interrupted by a crash right after the blob was created) still count as persisted generations
//! but are never chosen as the most recent flush. Blobs of other attributes may share the
//! partition and are ignored.
//!
//! The partition is scanned once, during [Directory::init]. Afterwards the directory only answers
//! queries and may be shared freely between readers.

use super::{base_name, SNAPSHOT_PREFIX};
use crate::header::data_name;
use commonware_runtime::{Error as RError, Storage};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when scanning a [Directory].
#[derive(Debug, Error)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] RError),
}

/// Configuration for a [Directory].
#[derive(Clone, Debug)]
pub struct Config {
    /// Storage partition holding the generations of the attribute.
    pub partition: String,

    /// Name of the attribute (used as the base file name inside each snapshot).
    pub name: String,
}

/// Generations of one attribute found in storage.
pub struct Directory {
    cfg: Config,

    // Serial number of every generation, mapped to whether its blob holds data.
    snapshots: BTreeMap<u64, bool>,
}

impl Directory {
    /// Scan the generations of the attribute described by `cfg`.
    ///
    /// A missing partition is treated as one without any generations.
    pub async fn init<E: Storage>(context: &E, cfg: Config) -> Result<Self, Error> {
        let stored_blobs = match context.scan(&cfg.partition).await {
            Ok(blobs) => blobs,
            Err(RError::PartitionMissing(_)) => {
                debug!(partition = %cfg.partition, "attribute partition missing");
                Vec::new()
            }
            Err(err) => return Err(Error::Runtime(err)),
        };

        let mut snapshots = BTreeMap::new();
        for name in stored_blobs {
            let Some(serial) = std::str::from_utf8(&name)
                .ok()
                .and_then(|name| parse_snapshot(name, &cfg.name))
            else {
                debug!(blob = ?name, "ignoring blob");
                continue;
            };
            let (_, len) = context.open(&cfg.partition, &name).await?;
            let valid = len > 0;
            if !valid {
                warn!(serial, "snapshot is empty");
            }
            snapshots.insert(serial, valid);
        }
        debug!(
            name = %cfg.name,
            snapshots = snapshots.len(),
            "scanned attribute partition"
        );

        Ok(Self { cfg, snapshots })
    }

    /// Serial numbers of all generations found, in ascending order.
    pub fn snapshots(&self) -> impl Iterator<Item = u64> + '_ {
        self.snapshots.keys().copied()
    }
}

impl super::Directory for Directory {
    fn partition(&self) -> &str {
        &self.cfg.partition
    }

    fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn flushed_serial(&self) -> u64 {
        self.snapshots
            .iter()
            .rev()
            .find_map(|(serial, valid)| valid.then_some(*serial))
            .unwrap_or(0)
    }

    fn file_name(&self, serial: u64) -> String {
        base_name(&self.cfg.name, serial)
    }
}

/// Parse the serial number out of the data blob name of attribute `name`.
fn parse_snapshot(blob: &str, name: &str) -> Option<u64> {
    let (serial, file) = blob.strip_prefix(SNAPSHOT_PREFIX)?.split_once('/')?;
    if file != data_name(name) {
        return None;
    }
    // Reject forms u64::from_str accepts but we never write (e.g. "+5")
    if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    serial.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::{BasicType, CollectionType, Descriptor},
        directory::Directory as _,
        header::Header,
    };
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Blob as _, Runner};

    const PARTITION: &str = "test_partition";

    fn config() -> Config {
        Config {
            partition: PARTITION.to_string(),
            name: "price".to_string(),
        }
    }

    async fn flush(context: &deterministic::Context, cfg: &Config, serial: u64) {
        let name = data_name(&base_name(&cfg.name, serial));
        let (blob, _) = context
            .open(&cfg.partition, name.as_bytes())
            .await
            .unwrap();
        Header::new(
            Descriptor::new(BasicType::Int32, CollectionType::Single),
            serial,
        )
        .write(&blob, &[])
        .await
        .unwrap();
    }

    #[test_traced]
    fn test_missing_partition_is_empty() {
        let executor = deterministic::Runner::default();
        executor.start(|context| async move {
            let directory = Directory::init(&context, config()).await.unwrap();
            assert!(directory.is_empty());
            assert_eq!(directory.flushed_serial(), 0);
            assert_eq!(directory.partition(), PARTITION);
            assert_eq!(directory.file_name(0), "snapshot-0/price");
        });
    }

    #[test_traced]
    fn test_picks_latest_valid_snapshot() {
        let executor = deterministic::Runner::default();
        executor.start(|context| async move {
            let cfg = config();
            flush(&context, &cfg, 50).await;
            flush(&context, &cfg, 120).await;

            // Interrupted flush: blob created but never written
            context
                .open(PARTITION, b"snapshot-300/price.dat")
                .await
                .unwrap();

            // Noise
            let noise: [&[u8]; 6] = [
                b"snapshot-abc/price.dat",
                b"snapshot-+7/price.dat",
                b"snapshot-400/volume.dat",
                b"snapshot-500/price",
                b"meta-info",
                &[0xFF, 0xFE],
            ];
            for name in noise {
                let (blob, _) = context.open(PARTITION, name).await.unwrap();
                blob.write_at(b"noise".to_vec(), 0).await.unwrap();
                blob.sync().await.unwrap();
            }

            let directory = Directory::init(&context, cfg).await.unwrap();
            assert!(!directory.is_empty());
            assert_eq!(directory.snapshots().collect::<Vec<_>>(), vec![50, 120, 300]);
            assert_eq!(directory.flushed_serial(), 120);
            assert_eq!(directory.file_name(120), "snapshot-120/price");
        });
    }

    #[test_traced]
    fn test_only_empty_snapshots() {
        let executor = deterministic::Runner::default();
        executor.start(|context| async move {
            context
                .open(PARTITION, b"snapshot-10/price.dat")
                .await
                .unwrap();

            let directory = Directory::init(&context, config()).await.unwrap();
            assert!(!directory.is_empty());
            assert_eq!(directory.flushed_serial(), 0);
        });
    }

    #[test]
    fn test_parse_snapshot() {
        assert_eq!(parse_snapshot("snapshot-0/price.dat", "price"), Some(0));
        assert_eq!(
            parse_snapshot("snapshot-18446744073709551615/price.dat", "price"),
            Some(u64::MAX)
        );
        assert_eq!(
            parse_snapshot("snapshot-18446744073709551616/price.dat", "price"),
            None
        );
        assert_eq!(parse_snapshot("snapshot-/price.dat", "price"), None);
        assert_eq!(parse_snapshot("snapshot--1/price.dat", "price"), None);
        assert_eq!(parse_snapshot("snapshot-1/price", "price"), None);
        assert_eq!(parse_snapshot("snapshot-1/volume.dat", "price"), None);
        assert_eq!(parse_snapshot("snap-1/price.dat", "price"), None);
    }
}
