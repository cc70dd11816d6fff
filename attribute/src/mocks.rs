//! Mock implementations of the collaborators of [crate::Initializer].
//!
//! These record every interaction so the recovery decision can be checked without a real
//! attribute implementation.

use crate::{descriptor::Descriptor, directory::base_name, report::Event};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// A fixed [crate::Directory] in `partition`.
#[derive(Clone, Debug)]
pub struct Directory {
    pub partition: String,
    pub name: String,

    /// Whether any generation was persisted.
    pub empty: bool,

    /// Serial number of the most recent flush.
    pub flushed: u64,
}

impl Directory {
    /// A directory without any persisted generation.
    pub fn empty(partition: &str, name: &str) -> Self {
        Self {
            partition: partition.to_string(),
            name: name.to_string(),
            empty: true,
            flushed: 0,
        }
    }

    /// A directory whose most recent flush is at `flushed`.
    pub fn flushed(partition: &str, name: &str, flushed: u64) -> Self {
        Self {
            partition: partition.to_string(),
            name: name.to_string(),
            empty: false,
            flushed,
        }
    }
}

impl crate::Directory for Directory {
    fn partition(&self) -> &str {
        &self.partition
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn flushed_serial(&self) -> u64 {
        self.flushed
    }

    fn file_name(&self, serial: u64) -> String {
        base_name(&self.name, serial)
    }
}

/// Error returned by [Attribute::load](crate::Attribute::load) when told to fail.
#[derive(Debug, Error)]
#[error("corrupt attribute data")]
pub struct Corrupt;

/// An [crate::Attribute] that records what was done to it.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: String,
    pub file: String,
    pub descriptor: Descriptor,

    /// Whether the attribute reports data to load.
    pub can_load: bool,

    /// Whether [crate::Attribute::load] fails.
    pub fail_load: bool,

    /// Whether [crate::Attribute::load] succeeded.
    pub loaded: bool,

    /// Serial number passed to the last `setup_empty`.
    pub empty: Option<u64>,

    /// Every commit, in order.
    pub commits: Vec<(u64, u64)>,
}

impl Attribute {
    /// The last commit (if any).
    pub fn committed(&self) -> Option<(u64, u64)> {
        self.commits.last().copied()
    }
}

impl crate::Attribute for Attribute {
    type Error = Corrupt;

    fn name(&self) -> &str {
        &self.name
    }

    fn base_file_name(&self) -> &str {
        &self.file
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn can_load(&self) -> bool {
        self.can_load
    }

    fn load(&mut self) -> Result<(), Corrupt> {
        if self.fail_load {
            return Err(Corrupt);
        }
        self.loaded = true;
        Ok(())
    }

    fn commit(&mut self, write: u64, read: u64) {
        self.commits.push((write, read));
    }
}

/// A [crate::Factory] producing [Attribute]s.
#[derive(Clone, Debug)]
pub struct Factory {
    pub name: String,

    /// Whether created attributes report data to load.
    pub can_load: bool,

    /// Whether loading created attributes fails.
    pub fail_load: bool,

    /// Base file name of every attribute created.
    pub created: Arc<Mutex<Vec<String>>>,

    /// Serial number of every `setup_empty` call.
    pub setups: Arc<Mutex<Vec<u64>>>,
}

impl Factory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            can_load: true,
            fail_load: false,
            created: Arc::new(Mutex::new(Vec::new())),
            setups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A factory whose attributes fail to load.
    pub fn failing(name: &str) -> Self {
        Self {
            fail_load: true,
            ..Self::new(name)
        }
    }
}

impl crate::Factory for Factory {
    type Attribute = Attribute;

    fn create(&self, file: &str, descriptor: &Descriptor) -> Attribute {
        self.created.lock().unwrap().push(file.to_string());
        Attribute {
            name: self.name.clone(),
            file: file.to_string(),
            descriptor: descriptor.clone(),
            can_load: self.can_load,
            fail_load: self.fail_load,
            loaded: false,
            empty: None,
            commits: Vec::new(),
        }
    }

    fn setup_empty(&self, attribute: &mut Attribute, serial: u64) {
        self.setups.lock().unwrap().push(serial);
        attribute.loaded = false;
        attribute.empty = Some(serial);
    }
}

/// A [crate::Reporter] that keeps every [Event].
#[derive(Clone, Debug, Default)]
pub struct Reporter {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events reported so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::Reporter for Reporter {
    fn report(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}
