//! Track the persisted generations of an attribute.
//!
//! Every flush of an attribute produces a new generation, named after the serial number it was
//! flushed at. A [Directory] answers whether any generation was ever persisted, which serial
//! number the most recent durable flush has, and where the blobs of a given generation live.
//!
//! [storage::Directory] implements this on top of a [commonware_runtime::Storage] partition.

pub mod storage;

pub use storage::{Config, Error};

/// Prefix of the base file name of every generation.
pub const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Base file name of the generation of attribute `name` flushed at `serial`.
pub fn base_name(name: &str, serial: u64) -> String {
    format!("{SNAPSHOT_PREFIX}{serial}/{name}")
}

/// Naming and flush bookkeeping for the generations of one attribute.
pub trait Directory {
    /// Storage partition holding the generations.
    fn partition(&self) -> &str;

    /// Returns true if no generation was ever persisted.
    fn is_empty(&self) -> bool;

    /// Serial number of the most recent durable flush (0 if none is usable).
    fn flushed_serial(&self) -> u64;

    /// Base file name of the generation flushed at `serial`.
    ///
    /// The attribute's data lives in the blob named by [crate::header::data_name].
    fn file_name(&self, serial: u64) -> String;
}

impl<D: Directory + ?Sized> Directory for &D {
    fn partition(&self) -> &str {
        (**self).partition()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn flushed_serial(&self) -> u64 {
        (**self).flushed_serial()
    }

    fn file_name(&self, serial: u64) -> String {
        (**self).file_name(serial)
    }
}
