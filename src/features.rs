#[cfg(feature = "ahash")]
use ahash::AHashMap;
#[cfg(feature = "chrono")]
use chrono::{DateTime, Utc};
#[cfg(feature = "indexmap")]
use indexmap::IndexMap;
#[cfg(feature = "rust_decimal")]
use rust_decimal::Decimal;
#[cfg(feature = "smol_str")]
use smol_str::SmolStr;
#[cfg(feature = "ulid")]
use ulid::Ulid;
#[cfg(feature = "uuid")]
use uuid::Uuid;

#[allow(unused_imports)]
use crate::collection::*;
#[allow(unused_imports)]
use crate::*;

// --- IndexMap ---
#[cfg(feature = "indexmap")]
impl<K, V, S> CollectionSink<(K, V)> for IndexMap<K, V, S>
where
    K: Eq + std::hash::Hash,
    S: std::hash::BuildHasher,
{
    fn reserve_batch(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn put(&mut self, (k, v): (K, V)) {
        self.insert(k, v);
    }
}
/// Encodes an `IndexMap` in insertion order.
#[cfg(feature = "indexmap")]
impl<K: Encoder, V: Encoder, S> Encoder for IndexMap<K, V, S> {
    fn size(&self) -> usize {
        entries_size(self.len(), self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_entries(self.len(), self, buf, cursor)
    }

    collection_null_layout!();
}
#[cfg(feature = "indexmap")]
fn index_map_body<K, V, S>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<IndexMap<K, V, S>>
where
    K: Decoder + Eq + std::hash::Hash,
    V: Decoder,
    S: std::hash::BuildHasher + Default,
{
    let mut map = IndexMap::with_capacity_and_hasher(initial_capacity(len), S::default());
    deserialize_entries(len, buf, cursor, &mut map)?;
    Ok(map)
}
#[cfg(feature = "indexmap")]
impl<K, V, S> Decoder for IndexMap<K, V, S>
where
    K: Decoder + Eq + std::hash::Hash,
    V: Decoder,
    S: std::hash::BuildHasher + Default,
{
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "IndexMap")?;
        index_map_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "IndexMap")?;
        self.clear();
        deserialize_entries(len, buf, cursor, self)
    }

    collection_null_layout!(decode index_map_body);
}

// --- AHashMap ---
/// `AHashMap` is a newtype over `HashMap`; it shares the `HashMap` layout.
#[cfg(feature = "ahash")]
impl<K: Encoder, V: Encoder> Encoder for AHashMap<K, V> {
    fn size(&self) -> usize {
        entries_size(self.len(), self.iter())
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_entries(self.len(), self.iter(), buf, cursor)
    }

    collection_null_layout!();
}
#[cfg(feature = "ahash")]
fn ahash_map_body<K, V>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<AHashMap<K, V>>
where
    K: Decoder + Eq + std::hash::Hash,
    V: Decoder,
{
    let mut map = AHashMap::with_capacity(initial_capacity(len));
    deserialize_entries(len, buf, cursor, &mut *map)?;
    Ok(map)
}
#[cfg(feature = "ahash")]
impl<K: Decoder + Eq + std::hash::Hash, V: Decoder> Decoder for AHashMap<K, V> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "AHashMap")?;
        ahash_map_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        (**self).deserialize_in_place(buf, cursor)
    }

    collection_null_layout!(decode ahash_map_body);
}

// --- DateTime<Utc> ---
/// Encodes a `DateTime<Utc>` as 8 bytes of nanoseconds since the Unix epoch.
///
/// # Errors
/// Instants outside 1677-09-21..2262-04-11 do not fit in `i64` nanoseconds.
#[cfg(feature = "chrono")]
impl Encoder for DateTime<Utc> {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn size(&self) -> usize {
        8
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        let nanos = self.timestamp_nanos_opt().ok_or_else(|| {
            WireError::Encode(format!("DateTime {} out of nanosecond range", self))
        })?;
        write_i64(buf, cursor, nanos)
    }
}
#[cfg(feature = "chrono")]
impl Decoder for DateTime<Utc> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(DateTime::from_timestamp_nanos(read_i64(buf, cursor)?))
    }
}

// --- Decimal ---
/// Encodes a `Decimal` as its 16-byte serialized representation.
#[cfg(feature = "rust_decimal")]
impl Encoder for Decimal {
    const FIXED_SIZE: Option<usize> = Some(16);

    fn size(&self) -> usize {
        16
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_bytes(buf, cursor, &Decimal::serialize(self))
    }
}
#[cfg(feature = "rust_decimal")]
impl Decoder for Decimal {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(read_bytes(buf, cursor, 16)?);
        Ok(Decimal::deserialize(bytes))
    }
}

// --- UUID ---
/// Encodes a `Uuid` as a 16-byte little-endian `u128`.
#[cfg(feature = "uuid")]
impl Encoder for Uuid {
    const FIXED_SIZE: Option<usize> = Some(16);

    fn size(&self) -> usize {
        16
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_u128(buf, cursor, self.as_u128())
    }
}
#[cfg(feature = "uuid")]
impl Decoder for Uuid {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(Uuid::from_u128(read_u128(buf, cursor)?))
    }
}

// --- ULID ---
/// Encodes a `Ulid` as a 16-byte little-endian `u128`, the same layout as `Uuid`.
#[cfg(feature = "ulid")]
impl Encoder for Ulid {
    const FIXED_SIZE: Option<usize> = Some(16);

    fn size(&self) -> usize {
        16
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_u128(buf, cursor, u128::from(*self))
    }
}
#[cfg(feature = "ulid")]
impl Decoder for Ulid {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(Ulid::from(read_u128(buf, cursor)?))
    }
}

// --- SmolStr ---
/// Encodes a `SmolStr` exactly like `String`.
#[cfg(feature = "smol_str")]
impl Encoder for SmolStr {
    fn size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.len()
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_str(buf, cursor, self)
    }

    collection_null_layout!();
}
#[cfg(feature = "smol_str")]
fn smol_str_body(len: usize, buf: &[u8], cursor: &mut usize) -> Result<SmolStr> {
    Ok(SmolStr::new(read_str(buf, cursor, len)?))
}
#[cfg(feature = "smol_str")]
impl Decoder for SmolStr {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "SmolStr")?;
        smol_str_body(len, buf, cursor)
    }

    collection_null_layout!(decode smol_str_body);
}
