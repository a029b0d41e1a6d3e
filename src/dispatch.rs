//! Runtime type-tag dispatch.
//!
//! A [`Registry`] is built once from an explicit list of types and is immutable
//! afterwards; share it by reference or `Arc`. Each registered type owns a one-byte
//! tag (`0` means null) and a row of type-erased codec functions indexed by that tag.
//!
//! ```rust
//! use bitwire::dispatch::RegistryBuilder;
//! use bitwire::{Decode, Encode};
//!
//! #[derive(Encode, Decode, Debug, PartialEq, Default)]
//! struct Ping { seq: u32 }
//!
//! let registry = RegistryBuilder::new().register::<Ping>().unwrap().build();
//! let bytes = registry.encode(Some(&Ping { seq: 7 })).unwrap();
//! assert_eq!(bytes[0], registry.tag_of::<Ping>().unwrap());
//!
//! let mut cursor = 0;
//! let decoded = registry.deserialize::<Ping>(&bytes, &mut cursor).unwrap();
//! assert_eq!(decoded, Some(Ping { seq: 7 }));
//! ```

use crate::pool::{ObjectPool, PoolGuard};
use crate::schema::{SchemaError, TypeRegistry};
use crate::*;
use bytes::{Bytes, BytesMut};
use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Tag written for a null top-level value.
pub const NULL_TAG: u8 = 0;

type SizeFn = fn(&dyn Any) -> Option<usize>;
type SerializeFn = fn(&dyn Any, &mut [u8], &mut usize) -> Option<Result<()>>;
type DeserializeFn = fn(&[u8], &mut usize) -> Result<Box<dyn Any + Send>>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    size: SizeFn,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl Entry {
    fn of<T: Encoder + Decoder + Send + 'static>() -> Self {
        Entry {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            size: |value| value.downcast_ref::<T>().map(T::size),
            serialize: |value, buf, cursor| {
                value
                    .downcast_ref::<T>()
                    .map(|value| value.serialize(buf, cursor))
            },
            deserialize: |buf, cursor| Ok(Box::new(T::deserialize(buf, cursor)?)),
        }
    }
}

/// Collects the registered types; tags follow registration order unless given.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tags: TypeRegistry<TypeId>,
    entries: Vec<(u8, Entry)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` with the next free tag.
    pub fn register<T: Encoder + Decoder + Send + 'static>(
        mut self,
    ) -> std::result::Result<Self, SchemaError> {
        let tag = self.tags.register(TypeId::of::<T>(), type_name::<T>())?;
        self.push::<T>(tag);
        Ok(self)
    }

    /// Registers `T` with an explicit tag; `0` and tags already taken are errors.
    pub fn register_with_tag<T: Encoder + Decoder + Send + 'static>(
        mut self,
        tag: u8,
    ) -> std::result::Result<Self, SchemaError> {
        let tag = self
            .tags
            .register_with_tag(TypeId::of::<T>(), tag, type_name::<T>())?;
        self.push::<T>(tag);
        Ok(self)
    }

    fn push<T: Encoder + Decoder + Send + 'static>(&mut self, tag: u8) {
        if self.entries.iter().any(|(existing, _)| *existing == tag) {
            return;
        }
        tracing::debug!(tag, type_name = type_name::<T>(), "registered type");
        self.entries.push((tag, Entry::of::<T>()));
    }

    pub fn build(self) -> Registry {
        let len = self
            .entries
            .iter()
            .map(|(tag, _)| usize::from(*tag) + 1)
            .max()
            .unwrap_or(1);
        let mut slots = vec![None; len];
        for (tag, entry) in self.entries {
            slots[usize::from(tag)] = Some(entry);
        }
        Registry {
            tags: self.tags,
            slots,
        }
    }
}

/// Immutable tag ↔ codec table.
pub struct Registry {
    tags: TypeRegistry<TypeId>,
    slots: Vec<Option<Entry>>,
}

impl Registry {
    fn entry(&self, tag: u8) -> Option<&Entry> {
        self.slots.get(usize::from(tag))?.as_ref()
    }

    fn lookup(&self, tag: u8) -> std::result::Result<&Entry, DispatchError> {
        self.entry(tag).ok_or(DispatchError::UnknownTag { tag })
    }

    fn tag_of_id(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> std::result::Result<u8, DispatchError> {
        self.tags
            .tag_of(&type_id)
            .ok_or(DispatchError::UnregisteredType { type_name })
    }

    /// Tag of `T`, or [`DispatchError::UnregisteredType`].
    pub fn tag_of<T: 'static>(&self) -> std::result::Result<u8, DispatchError> {
        self.tag_of_id(TypeId::of::<T>(), type_name::<T>())
    }

    /// Name of the type registered under `tag`.
    pub fn type_name_of(&self, tag: u8) -> Option<&'static str> {
        self.entry(tag).map(|entry| entry.type_name)
    }

    /// Registered `(tag, type name)` pairs in tag order.
    pub fn types(&self) -> impl Iterator<Item = (u8, &'static str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(tag, entry)| Some((tag as u8, entry.as_ref()?.type_name)))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Encoded size of a top-level value: 1 for null, else the tag plus the payload.
    pub fn size<T: Encoder + 'static>(&self, value: Option<&T>) -> Result<usize> {
        match value {
            None => Ok(1),
            Some(value) => {
                self.tag_of::<T>()?;
                Ok(1 + value.size())
            }
        }
    }

    /// Writes the tag (`0` for null) and the payload.
    pub fn serialize<T: Encoder + 'static>(
        &self,
        value: Option<&T>,
        buf: &mut [u8],
        cursor: &mut usize,
    ) -> Result<()> {
        match value {
            None => write_u8(buf, cursor, NULL_TAG),
            Some(value) => {
                let tag = self.tag_of::<T>()?;
                write_u8(buf, cursor, tag)?;
                value.serialize(buf, cursor)
            }
        }
    }

    /// Serializes a top-level value into a buffer of exactly [`Registry::size`] bytes.
    pub fn encode<T: Encoder + 'static>(&self, value: Option<&T>) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.size(value)?);
        let mut cursor = 0;
        self.serialize(value, &mut buf, &mut cursor)?;
        Ok(buf.freeze())
    }

    /// [`Registry::size`] for a value whose type is only known at run time.
    pub fn size_any(&self, value: Option<&dyn Any>) -> Result<usize> {
        let Some(value) = value else {
            return Ok(1);
        };
        let entry = self.entry_for(value)?;
        let size = (entry.size)(value).ok_or_else(|| self.mismatch(entry))?;
        Ok(1 + size)
    }

    /// [`Registry::serialize`] for a value whose type is only known at run time.
    pub fn serialize_any(
        &self,
        value: Option<&dyn Any>,
        buf: &mut [u8],
        cursor: &mut usize,
    ) -> Result<()> {
        let Some(value) = value else {
            return write_u8(buf, cursor, NULL_TAG);
        };
        let entry = self.entry_for(value)?;
        let tag = self.tag_of_id(entry.type_id, entry.type_name)?;
        write_u8(buf, cursor, tag)?;
        (entry.serialize)(value, buf, cursor).ok_or_else(|| self.mismatch(entry))?
    }

    fn entry_for(&self, value: &dyn Any) -> Result<&Entry> {
        let type_id = value.type_id();
        let tag = self
            .tags
            .tag_of(&type_id)
            .ok_or(DispatchError::UnregisteredType {
                type_name: "<dyn Any>",
            })?;
        Ok(self.lookup(tag)?)
    }

    fn mismatch(&self, entry: &Entry) -> WireError {
        let tag = self.tags.tag_of(&entry.type_id).unwrap_or(NULL_TAG);
        DispatchError::TypeMismatch {
            tag,
            expected: entry.type_name,
            actual: "<dyn Any>",
        }
        .into()
    }

    /// Decodes the payload of the type registered under `tag`.
    ///
    /// The tag byte has already been consumed. `0` is not a type and is rejected.
    pub fn deserialize_by_tag(
        &self,
        tag: u8,
        buf: &[u8],
        cursor: &mut usize,
    ) -> Result<Box<dyn Any + Send>> {
        let entry = self.lookup(tag)?;
        (entry.deserialize)(buf, cursor)
    }

    /// Reads a tag and its payload; `None` for the null tag.
    pub fn deserialize_any(
        &self,
        buf: &[u8],
        cursor: &mut usize,
    ) -> Result<Option<Box<dyn Any + Send>>> {
        match read_u8(buf, cursor)? {
            NULL_TAG => Ok(None),
            tag => self.deserialize_by_tag(tag, buf, cursor).map(Some),
        }
    }

    /// Reads a tag, checks it names `T`, then decodes the payload.
    pub fn deserialize<T: Decoder + 'static>(
        &self,
        buf: &[u8],
        cursor: &mut usize,
    ) -> Result<Option<T>> {
        if !self.read_tag_for::<T>(buf, cursor)? {
            return Ok(None);
        }
        T::deserialize(buf, cursor).map(Some)
    }

    /// Like [`Registry::deserialize`], but populates an instance taken from `pool`.
    pub fn deserialize_pooled<'p, T: Decoder + 'static>(
        &self,
        pool: &'p ObjectPool<T>,
        buf: &[u8],
        cursor: &mut usize,
    ) -> Result<Option<PoolGuard<'p, T>>> {
        if !self.read_tag_for::<T>(buf, cursor)? {
            return Ok(None);
        }
        pool.decode(buf, cursor).map(Some)
    }

    /// Consumes the tag byte; `false` for null.
    fn read_tag_for<T: 'static>(&self, buf: &[u8], cursor: &mut usize) -> Result<bool> {
        let tag = read_u8(buf, cursor)?;
        if tag == NULL_TAG {
            return Ok(false);
        }
        let entry = self.lookup(tag)?;
        if entry.type_id != TypeId::of::<T>() {
            return Err(DispatchError::TypeMismatch {
                tag,
                expected: type_name::<T>(),
                actual: entry.type_name,
            }
            .into());
        }
        Ok(true)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.types()).finish()
    }
}
