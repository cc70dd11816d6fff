//! Decode the header persisted at the start of an attribute's data blob.
//!
//! # Format
//!
//! Every data blob begins with a header that records the [Descriptor] of the attribute and the
//! serial number at which the attribute was created (first given its current type and layout).
//! The attribute's data immediately follows the header and is not interpreted here:
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 |    ...    |   |   |   |   |...|
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! |     Magic     |Version| Len(Body) u32 |   Body    |  CRC32 (u32)  |Data
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//!
//! Body:
//! +-------+------------+--------------+-------------+--------+------+-------------+------------+------------+
//! | Basic | Collection | Created(u64) | Len(Tensor) | Tensor | Flag | Arity (u32) | Lower(i64) | Upper(i64) |
//! +-------+------------+--------------+-------------+--------+------+-------------+------------+------------+
//!
//! Arity, Lower and Upper are only present when Flag is 1.
//! ```
//!
//! All integers are big endian. The CRC32 covers every byte before it, so a partially written
//! header is detected before any of it is relied on.

use crate::descriptor::{BasicType, CollectionType, Descriptor, PredicateParams};
use bytes::{Buf, BufMut};
use commonware_runtime::Blob;
use thiserror::Error;

/// Suffix of the blob holding an attribute's header and data.
pub const DATA_SUFFIX: &str = ".dat";

const MAGIC: [u8; 4] = *b"ATRB";
const VERSION: u16 = 1;
const PREFIX_SIZE: usize = MAGIC.len() + 2 + 4;
const CHECKSUM_SIZE: usize = 4;

/// Size of the body before the tensor type and the predicate params.
const FIXED_BODY_SIZE: usize = 1 + 1 + 8 + 4 + 1;
const PREDICATE_SIZE: usize = 4 + 8 + 8;

/// Largest body written or accepted (guards against allocating for a corrupt length).
const MAX_BODY_SIZE: usize = 1 << 20;

/// Errors that can occur when reading or writing a [Header].
#[derive(Debug, Error)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] commonware_runtime::Error),
    #[error("header missing")]
    Missing,
    #[error("bad magic: {0:?}")]
    BadMagic([u8; 4]),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),
    #[error("header truncated")]
    Truncated,
    #[error("header body too large: {0}")]
    BodyTooLarge(usize),
    #[error("checksum mismatch: stored={stored} computed={computed}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("unknown basic type: {0}")]
    UnknownBasicType(u8),
    #[error("unknown collection type: {0}")]
    UnknownCollectionType(u8),
    #[error("invalid predicate flag: {0}")]
    InvalidPredicateFlag(u8),
    #[error("tensor type is not valid utf-8")]
    InvalidTensorType,
    #[error("trailing bytes in header body: {0}")]
    TrailingBytes(usize),
}

/// Name of the blob holding the data of the attribute stored at `base`.
pub fn data_name(base: &str) -> String {
    format!("{base}{DATA_SUFFIX}")
}

/// Metadata persisted at the start of an attribute's data blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Descriptor the attribute was persisted with.
    pub descriptor: Descriptor,

    /// Serial number at which the attribute was created.
    pub created: u64,
}

impl Header {
    pub fn new(descriptor: Descriptor, created: u64) -> Self {
        Self {
            descriptor,
            created,
        }
    }

    /// Whether predicate params were recorded when the attribute was persisted.
    pub fn predicate_recorded(&self) -> bool {
        self.descriptor.predicate.is_some()
    }

    /// Read the header from the start of `blob` (of length `len`).
    ///
    /// Only the header is read; any data that follows is left untouched.
    pub async fn read<B: Blob>(blob: &B, len: u64) -> Result<Self, Error> {
        if len == 0 {
            return Err(Error::Missing);
        }
        if len < PREFIX_SIZE as u64 {
            return Err(Error::Truncated);
        }

        // Read fixed prefix
        let prefix = blob.read_at(vec![0u8; PREFIX_SIZE], 0).await?;
        let mut cursor = prefix.as_ref();
        let mut magic = [0u8; 4];
        cursor.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let version = cursor.get_u16();
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let size = cursor.get_u32() as usize;
        if size > MAX_BODY_SIZE {
            return Err(Error::BodyTooLarge(size));
        }
        if len < (PREFIX_SIZE + size + CHECKSUM_SIZE) as u64 {
            return Err(Error::Truncated);
        }

        // Read body and checksum
        let rest = blob
            .read_at(vec![0u8; size + CHECKSUM_SIZE], PREFIX_SIZE as u64)
            .await?;
        let (body, mut trailer) = rest.as_ref().split_at(size);
        let stored = trailer.get_u32();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(prefix.as_ref());
        hasher.update(body);
        let computed = hasher.finalize();
        if stored != computed {
            return Err(Error::ChecksumMismatch { stored, computed });
        }

        Self::decode_body(body)
    }

    fn decode_body(mut buf: &[u8]) -> Result<Self, Error> {
        if buf.remaining() < FIXED_BODY_SIZE - 1 {
            return Err(Error::Truncated);
        }
        let code = buf.get_u8();
        let basic = BasicType::from_code(code).ok_or(Error::UnknownBasicType(code))?;
        let code = buf.get_u8();
        let collection =
            CollectionType::from_code(code).ok_or(Error::UnknownCollectionType(code))?;
        let created = buf.get_u64();

        // Tensor type (empty means none was recorded)
        let len = buf.get_u32() as usize;
        if buf.remaining() < len + 1 {
            return Err(Error::Truncated);
        }
        let tensor = if len == 0 {
            None
        } else {
            let spec = std::str::from_utf8(&buf[..len]).map_err(|_| Error::InvalidTensorType)?;
            Some(spec.to_string())
        };
        buf.advance(len);

        // Predicate params
        let predicate = match buf.get_u8() {
            0 => None,
            1 => {
                if buf.remaining() < PREDICATE_SIZE {
                    return Err(Error::Truncated);
                }
                Some(PredicateParams {
                    arity: buf.get_u32(),
                    lower_bound: buf.get_i64(),
                    upper_bound: buf.get_i64(),
                })
            }
            flag => return Err(Error::InvalidPredicateFlag(flag)),
        };
        if buf.has_remaining() {
            return Err(Error::TrailingBytes(buf.remaining()));
        }

        Ok(Self {
            descriptor: Descriptor {
                basic,
                collection,
                tensor,
                predicate,
            },
            created,
        })
    }

    /// Encode the header (including its checksum).
    ///
    /// Fails if the body would be larger than [Header::read] accepts.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let tensor = self.descriptor.tensor.as_deref().unwrap_or_default();
        let size = FIXED_BODY_SIZE
            + tensor.len()
            + self.descriptor.predicate.map_or(0, |_| PREDICATE_SIZE);
        if size > MAX_BODY_SIZE {
            return Err(Error::BodyTooLarge(size));
        }

        let mut buf = Vec::with_capacity(PREFIX_SIZE + size + CHECKSUM_SIZE);
        buf.put_slice(&MAGIC);
        buf.put_u16(VERSION);
        buf.put_u32(size as u32);
        buf.put_u8(self.descriptor.basic.code());
        buf.put_u8(self.descriptor.collection.code());
        buf.put_u64(self.created);
        buf.put_u32(tensor.len() as u32);
        buf.put_slice(tensor.as_bytes());
        match self.descriptor.predicate {
            Some(params) => {
                buf.put_u8(1);
                buf.put_u32(params.arity);
                buf.put_i64(params.lower_bound);
                buf.put_i64(params.upper_bound);
            }
            None => buf.put_u8(0),
        }
        let checksum = crc32fast::hash(&buf);
        buf.put_u32(checksum);
        Ok(buf)
    }

    /// Replace the contents of `blob` with the header followed by `data`.
    pub async fn write<B: Blob>(&self, blob: &B, data: &[u8]) -> Result<(), Error> {
        let mut buf = self.encode()?;
        buf.extend_from_slice(data);
        let len = buf.len() as u64;
        blob.write_at(buf, 0).await?;
        blob.resize(len).await?;
        blob.sync().await?;
        Ok(())
    }
}
