//! Recover persisted attributes against the current log position.
//!
//! An attribute is a columnar store of one field of every document, persisted independently of
//! the documents themselves. Every flush of an attribute produces a new generation named after
//! the serial number (position in the write-ahead log) it was flushed at. When a node starts, each
//! attribute must be brought back into memory before the write-ahead log is replayed from the
//! caller's current serial number.
//!
//! [Initializer] decides how. Given the attribute's [Directory], the [Descriptor] the attribute
//! must have and the current serial number, it either:
//!
//! - loads the most recent flush and commits it at the serial number it was flushed at,
//! - discards the most recent flush (because it was created after the current serial number or
//!   has a descriptor that is not accepted) and returns an empty attribute committed at the
//!   serial number of the discarded flush,
//! - returns an empty, uncommitted attribute because nothing usable was persisted, or
//! - fails, because persisted data that passed every check could not be read.
//!
//! Corrupt data is never silently replaced by an empty attribute: the caller decides what to do.
//!
//! # Example
//!
//! ```rust
//! use commonware_attribute::{
//!     descriptor::{BasicType, CollectionType, Descriptor},
//!     mocks, Config, Initializer, Outcome, Traced,
//! };
//! use commonware_runtime::{deterministic, Runner};
//!
//! let executor = deterministic::Runner::default();
//! executor.start(|context| async move {
//!     // Nothing was ever flushed for this attribute
//!     let directory = mocks::Directory::empty("attributes", "price");
//!     let factory = mocks::Factory::new("price");
//!
//!     // Recover it
//!     let initializer = Initializer::new(context, directory, factory, Traced, Config {
//!         sub_db: "ready".to_string(),
//!         descriptor: Descriptor::new(BasicType::Int32, CollectionType::Single),
//!         current: 100,
//!     }).unwrap();
//!     let outcome = initializer.init().await.unwrap();
//!     assert!(matches!(outcome, Outcome::Created(_)));
//! });
//! ```
//!
//! # Status
//!
//! `commonware-attribute` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

use thiserror::Error;

pub mod descriptor;
pub mod directory;
pub mod factory;
pub mod header;
mod initializer;
pub mod mocks;
pub mod report;

pub use descriptor::Descriptor;
pub use directory::Directory;
pub use factory::{Attribute, Factory};
pub use header::Header;
pub use initializer::{Config, Initializer, Outcome};
pub use report::{Event, Reporter, Traced};

/// Errors that can occur when recovering an attribute.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid descriptor: {0}")]
    Descriptor(#[from] descriptor::Error),
    #[error("runtime error: {0}")]
    Runtime(#[from] commonware_runtime::Error),
    #[error("header error: {0}")]
    Header(#[from] header::Error),
    #[error("could not load attribute {file}: {reason}")]
    Load { file: String, reason: String },
}
