//! # bitwire
//!
//! A schema-driven binary codec toolkit.
//!
//! - Every registered type gets a deterministic binary layout: a nullability bitset
//!   followed by its fields in declaration order, fixed-width little-endian primitives,
//!   `-1`-sentinel length-prefixed strings and collections
//! - Codecs are synthesized at compile time by the [`Encode`]/[`Decode`] derives, or
//!   emitted as source files by [`codegen::generate`] from an explicit type manifest
//! - A [`dispatch::Registry`] maps each type to a one-byte tag (`0` is reserved for null)
//!   and offers a single polymorphic serialize/deserialize entry point
//! - [`pool::ObjectPool`] and [`pool::BufferPool`] make repeated decoding allocation-free
//!
//! ## Wire layout
//!
//! ```text
//! top-level value : [tag: u8][payload]            tag 0 => null, no payload
//! payload         : [bitset: ceil(nullable/8)][field 1]..[field N]
//! string          : [len: i32][utf-8 bytes]       len -1 => null
//! list / array    : [count: i32][elements]        count -1 => null
//! map             : [count: i32][(key, value)..]  count -1 => null
//! ```
//!
//! ## Attribute Macros
//!
//! - `#[wire(skip)]`: The field is neither written nor read. On decode it is set to `Default::default()`.
//! - `#[wire(tag = N)]`: With `#[derive(Schema)]`, requests dispatch tag `N` for the type.
//!
//! ## Feature Flags
//!
//! - `chrono`: `chrono::DateTime<Utc>` as 8-byte nanoseconds since the Unix epoch.
//! - `uuid`: `uuid::Uuid` as 16 bytes.
//! - `ulid`: `ulid::Ulid` as 16 bytes.
//! - `rust_decimal`: `rust_decimal::Decimal` as its 16-byte serialized form.
//! - `indexmap`: `IndexMap` as an insertion-ordered map.
//! - `fxhash`: `FxHashMap` (covered by the generic `HashMap<K, V, S>` codec).
//! - `ahash`: `AHashMap`.
//! - `smol_str`: `SmolStr` with the string encoding.

extern crate self as bitwire;

pub mod bitset;
pub mod codegen;
pub mod collection;
pub mod core;
pub mod dispatch;
mod features;
pub mod pool;
pub mod schema;

pub use crate::core::*;
pub use bitwire_derive::{Decode, Encode, Schema};

use bytes::{Bytes, BytesMut};

/// Errors that can occur during serialization or deserialization.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The destination buffer cannot hold the bytes about to be written.
    #[error("Buffer too small: need {needed} bytes at offset {offset}, {available} available")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        offset: usize,
    },
    /// The source buffer ended before a declared value or length.
    #[error("Insufficient data: need {needed} bytes at offset {offset}, {available} available")]
    InsufficientData {
        needed: usize,
        available: usize,
        offset: usize,
    },
    /// A decoded length prefix is neither `-1` nor a non-negative count.
    #[error("Invalid length {length} at offset {offset}")]
    InvalidLength { length: i32, offset: usize },
    /// A null sentinel was read where the static type does not admit null.
    #[error("Unexpected null for non-nullable {type_name}")]
    UnexpectedNull { type_name: &'static str },
    /// The value could not be encoded (e.g., a length or timestamp out of range).
    #[error("Encode error: {0}")]
    Encode(String),
    /// The value could not be decoded (e.g., invalid UTF-8 or a bad presence marker).
    #[error("Decode error: {0}")]
    Decode(String),
    /// Tag dispatch error
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Enum-specific decode error
    #[error(transparent)]
    EnumDecode(#[from] EnumDecodeError),
}

/// The result type used throughout this crate for runtime codec operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised by the type dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown type tag: {tag}")]
    UnknownTag { tag: u8 },
    #[error("Type {type_name} is not registered")]
    UnregisteredType { type_name: &'static str },
    #[error("Type mismatch for tag {tag}: expected {expected}, got {actual}")]
    TypeMismatch {
        tag: u8,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Derive-specific error types for enum operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnumDecodeError {
    #[error("Unknown discriminant {value} for enum {enum_name}")]
    UnknownDiscriminant { value: i64, enum_name: &'static str },
}

/// Trait for types that can be written in the bitwire binary format.
///
/// Most users should use `#[derive(Encode)]` instead of a manual implementation.
pub trait Encoder {
    /// Encoded size when it does not depend on the value.
    const FIXED_SIZE: Option<usize> = None;

    /// Exact number of bytes [`Encoder::serialize`] will write for this value.
    fn size(&self) -> usize;

    /// Write the value at `buf[*cursor..]` and advance the cursor.
    ///
    /// # Errors
    /// Returns [`WireError::BufferTooSmall`] before writing a value that does not fit.
    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()>;

    /// Size of a value in a nullable element position (inside a collection).
    ///
    /// The default layout is a one-byte presence marker followed by the value.
    fn option_size(value: Option<&Self>) -> usize
    where
        Self: Sized,
    {
        1 + value.map_or(0, |v| v.size())
    }

    /// Write a value in a nullable element position.
    fn serialize_option(value: Option<&Self>, buf: &mut [u8], cursor: &mut usize) -> Result<()>
    where
        Self: Sized,
    {
        match value {
            Some(v) => {
                write_u8(buf, cursor, PRESENT)?;
                v.serialize(buf, cursor)
            }
            None => write_u8(buf, cursor, ABSENT),
        }
    }
}

/// Trait for types that can be read from the bitwire binary format.
///
/// Most users should use `#[derive(Decode)]` instead of a manual implementation.
pub trait Decoder: Sized {
    /// Read a value from `buf[*cursor..]` and advance the cursor.
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self>;

    /// Overwrite `self` with the value at the cursor.
    ///
    /// Implementations reuse the allocations already owned by `self`; this is what
    /// makes decoding into pooled instances allocation-free.
    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        *self = Self::deserialize(buf, cursor)?;
        Ok(())
    }

    /// Read a value written by [`Encoder::serialize_option`].
    fn deserialize_option(buf: &[u8], cursor: &mut usize) -> Result<Option<Self>> {
        let offset = *cursor;
        match read_u8(buf, cursor)? {
            ABSENT => Ok(None),
            PRESENT => Ok(Some(Self::deserialize(buf, cursor)?)),
            other => Err(WireError::Decode(format!(
                "Expected presence marker ({} or {}) at offset {}, got {}",
                ABSENT, PRESENT, offset, other
            ))),
        }
    }
}

/// Convenience function to encode a value into a freshly allocated buffer.
///
/// The buffer is sized with [`Encoder::size`]; a value whose writer disagrees with its
/// own size is reported as [`WireError::Encode`].
///
/// # Example
/// ```rust
/// use bitwire::{encode, decode, Encode, Decode};
///
/// #[derive(Encode, Decode, PartialEq, Debug, Default)]
/// struct MyStruct {
///     id: u32,
///     name: Option<String>,
/// }
///
/// let value = MyStruct { id: 42, name: Some("hello".to_string()) };
/// let buf = encode(&value).unwrap();
/// let decoded: MyStruct = decode(&buf).unwrap();
/// assert_eq!(value, decoded);
/// ```
pub fn encode<T: Encoder>(value: &T) -> Result<Bytes> {
    let size = value.size();
    let mut writer = BytesMut::zeroed(size);
    let mut cursor = 0;
    value.serialize(&mut writer, &mut cursor)?;
    if cursor != size {
        return Err(WireError::Encode(format!(
            "{} reported size {} but wrote {} bytes",
            std::any::type_name::<T>(),
            size,
            cursor
        )));
    }
    Ok(writer.freeze())
}

/// Convenience function to decode a value from the start of `reader`.
pub fn decode<T: Decoder>(reader: &[u8]) -> Result<T> {
    let mut cursor = 0;
    T::deserialize(reader, &mut cursor)
}

/// Decode into an existing value, reusing its allocations.
pub fn decode_into<T: Decoder>(value: &mut T, reader: &[u8]) -> Result<()> {
    let mut cursor = 0;
    value.deserialize_in_place(reader, &mut cursor)
}
