//! Describe the shape of an attribute.
//!
//! A [Descriptor] pairs a [BasicType] with a [CollectionType] and, for the kinds that need one,
//! an extra payload: the tensor type specification of a tensor attribute or the [PredicateParams]
//! of a predicate attribute.
//!
//! The descriptor persisted in an attribute's header is compared against the descriptor the
//! caller wants with [Descriptor::accepts] before any persisted data is trusted.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when validating a [Descriptor].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("tensor attribute is missing a tensor type")]
    MissingTensorType,
    #[error("tensor attribute has an empty tensor type")]
    EmptyTensorType,
    #[error("tensor type provided for {0} attribute")]
    UnexpectedTensorType(BasicType),
    #[error("predicate params provided for {0} attribute")]
    UnexpectedPredicateParams(BasicType),
}

/// The scalar kind stored for each document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicType {
    None,
    String,
    Bool,
    Uint2,
    Uint4,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Predicate,
    Tensor,
    Reference,
    Raw,
}

impl BasicType {
    const ALL: [BasicType; 15] = [
        Self::None,
        Self::String,
        Self::Bool,
        Self::Uint2,
        Self::Uint4,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float,
        Self::Double,
        Self::Predicate,
        Self::Tensor,
        Self::Reference,
        Self::Raw,
    ];

    /// Code used to persist the type.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Resolve a persisted code (if known).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Uint2 => "uint2",
            Self::Uint4 => "uint4",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Predicate => "predicate",
            Self::Tensor => "tensor",
            Self::Reference => "reference",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many values of the [BasicType] a document holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionType {
    Single,
    Array,
    WeightedSet,
    Map,
}

impl CollectionType {
    const ALL: [CollectionType; 4] = [Self::Single, Self::Array, Self::WeightedSet, Self::Map];

    /// Code used to persist the type.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Resolve a persisted code (if known).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Array => "array",
            Self::WeightedSet => "weightedset",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a predicate index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PredicateParams {
    pub arity: u32,
    pub lower_bound: i64,
    pub upper_bound: i64,
}

impl Default for PredicateParams {
    fn default() -> Self {
        Self {
            arity: 8,
            lower_bound: i64::MIN,
            upper_bound: i64::MAX,
        }
    }
}

impl fmt::Display for PredicateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arity={},lower_bound={},upper_bound={}",
            self.arity, self.lower_bound, self.upper_bound
        )
    }
}

/// The shape of an attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub basic: BasicType,
    pub collection: CollectionType,

    /// Tensor type specification (e.g. `tensor(x[128])`), only for [BasicType::Tensor].
    pub tensor: Option<String>,

    /// Predicate index parameters, only for [BasicType::Predicate].
    ///
    /// When absent, [PredicateParams::default] applies.
    pub predicate: Option<PredicateParams>,
}

impl Descriptor {
    pub fn new(basic: BasicType, collection: CollectionType) -> Self {
        Self {
            basic,
            collection,
            tensor: None,
            predicate: None,
        }
    }

    pub fn with_tensor(mut self, spec: impl Into<String>) -> Self {
        self.tensor = Some(spec.into());
        self
    }

    pub fn with_predicate(mut self, params: PredicateParams) -> Self {
        self.predicate = Some(params);
        self
    }

    /// The predicate params in effect (recorded or default).
    pub fn predicate_params(&self) -> PredicateParams {
        self.predicate.unwrap_or_default()
    }

    /// Render the extra payload of the descriptor (empty if the kind carries none).
    pub fn extra(&self) -> String {
        match self.basic {
            BasicType::Tensor => self.tensor.clone().unwrap_or_default(),
            BasicType::Predicate => self.predicate_params().to_string(),
            _ => String::new(),
        }
    }

    /// Ensure the extra payload matches the basic kind.
    pub fn validate(&self) -> Result<(), Error> {
        match (self.basic, &self.tensor) {
            (BasicType::Tensor, None) => return Err(Error::MissingTensorType),
            // Encoded the same as a missing tensor type
            (BasicType::Tensor, Some(spec)) if spec.is_empty() => {
                return Err(Error::EmptyTensorType)
            }
            (BasicType::Tensor, Some(_)) | (_, None) => {}
            (basic, Some(_)) => return Err(Error::UnexpectedTensorType(basic)),
        }
        if self.predicate.is_some() && self.basic != BasicType::Predicate {
            return Err(Error::UnexpectedPredicateParams(self.basic));
        }
        Ok(())
    }

    /// Returns true if data persisted with the `persisted` descriptor may be loaded into an
    /// attribute described by `self`.
    ///
    /// Basic and collection kinds must match exactly. The extra payload is only compared for the
    /// kinds that carry one, and predicate params that were never recorded are not a conflict.
    pub fn accepts(&self, persisted: &Descriptor) -> bool {
        if self.basic != persisted.basic || self.collection != persisted.collection {
            return false;
        }
        match self.basic {
            BasicType::Tensor => self.tensor == persisted.tensor,
            BasicType::Predicate => match persisted.predicate {
                Some(recorded) => recorded == self.predicate_params(),
                None => true,
            },
            _ => true,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.basic, self.collection, self.extra())
    }
}
