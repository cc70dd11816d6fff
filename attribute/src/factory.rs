//! Construct attribute instances.
//!
//! The storage format of an attribute is not known to this crate. Instead, a [Factory] binds an
//! [Attribute] to a [Descriptor] and a base file name, and can reset it to a typed, empty state.

use crate::descriptor::Descriptor;

/// An in-memory attribute.
pub trait Attribute {
    /// The type of error returned when loading fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name of the attribute.
    fn name(&self) -> &str;

    /// Base file name the attribute was created with.
    fn base_file_name(&self) -> &str;

    /// Descriptor the attribute was created with.
    fn descriptor(&self) -> &Descriptor;

    /// Whether there is persisted data to [Attribute::load] from.
    fn can_load(&self) -> bool;

    /// Populate the attribute from the data persisted at its base file name.
    fn load(&mut self) -> Result<(), Self::Error>;

    /// Mark the attribute as representing exactly the given log position.
    fn commit(&mut self, write: u64, read: u64);
}

/// Creates [Attribute]s of a single implementation.
pub trait Factory {
    type Attribute: Attribute;

    /// Create an attribute bound to the base file name `file` and `descriptor` without populating it.
    fn create(&self, file: &str, descriptor: &Descriptor) -> Self::Attribute;

    /// Reset `attribute` to an empty state at `serial`.
    fn setup_empty(&self, attribute: &mut Self::Attribute, serial: u64);
}

impl<F: Factory + ?Sized> Factory for &F {
    type Attribute = F::Attribute;

    fn create(&self, file: &str, descriptor: &Descriptor) -> Self::Attribute {
        (**self).create(file, descriptor)
    }

    fn setup_empty(&self, attribute: &mut Self::Attribute, serial: u64) {
        (**self).setup_empty(attribute, serial)
    }
}
