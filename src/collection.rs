//! List, array and map codecs.
//!
//! Every collection is `[count: i32][elements]`, with `-1` standing for a null
//! collection in nullable positions. Maps write `key, value` per entry in iteration
//! order. Element and key codecs are the element types' own [`Encoder`]/[`Decoder`]
//! impls, so collections of collections compose recursively.

use crate::*;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};

/// Counts above this are decoded in batches of [`BATCH_SIZE`].
pub const BATCH_THRESHOLD: usize = 64;
/// Elements decoded per batch.
pub const BATCH_SIZE: usize = 64;

/// Destination of decoded elements.
///
/// Capacity is reserved one batch at a time, so a corrupt count fails on the missing
/// data instead of allocating for elements that are not there.
pub trait CollectionSink<T> {
    fn reserve_batch(&mut self, _additional: usize) {}
    fn put(&mut self, item: T);
}

impl<T> CollectionSink<T> for Vec<T> {
    fn reserve_batch(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn put(&mut self, item: T) {
        self.push(item);
    }
}

impl<T> CollectionSink<T> for VecDeque<T> {
    fn reserve_batch(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn put(&mut self, item: T) {
        self.push_back(item);
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> CollectionSink<(K, V)> for HashMap<K, V, S> {
    fn reserve_batch(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn put(&mut self, (k, v): (K, V)) {
        self.insert(k, v);
    }
}

impl<K: Ord, V> CollectionSink<(K, V)> for BTreeMap<K, V> {
    fn put(&mut self, (k, v): (K, V)) {
        self.insert(k, v);
    }
}

/// Initial capacity for a collection announced with `len` elements.
#[inline]
pub fn initial_capacity(len: usize) -> usize {
    len.min(BATCH_THRESHOLD)
}

/// Decodes `len` items with `decode_one` into `sink`.
pub fn deserialize_into<T, C, F>(
    len: usize,
    buf: &[u8],
    cursor: &mut usize,
    sink: &mut C,
    mut decode_one: F,
) -> Result<()>
where
    C: CollectionSink<T>,
    F: FnMut(&[u8], &mut usize) -> Result<T>,
{
    if len <= BATCH_THRESHOLD {
        sink.reserve_batch(len);
        for _ in 0..len {
            sink.put(decode_one(buf, cursor)?);
        }
        return Ok(());
    }
    let mut remaining = len;
    while remaining > 0 {
        let batch = remaining.min(BATCH_SIZE);
        sink.reserve_batch(batch);
        for _ in 0..batch {
            sink.put(decode_one(buf, cursor)?);
        }
        remaining -= batch;
    }
    Ok(())
}

/// Decodes `len` elements of `T` into `sink`.
#[inline]
pub fn deserialize_elements<T: Decoder, C: CollectionSink<T>>(
    len: usize,
    buf: &[u8],
    cursor: &mut usize,
    sink: &mut C,
) -> Result<()> {
    deserialize_into(len, buf, cursor, sink, T::deserialize)
}

/// Decodes `len` key/value entries into `sink`.
#[inline]
pub fn deserialize_entries<K: Decoder, V: Decoder, C: CollectionSink<(K, V)>>(
    len: usize,
    buf: &[u8],
    cursor: &mut usize,
    sink: &mut C,
) -> Result<()> {
    deserialize_into(len, buf, cursor, sink, |buf, cursor| {
        let k = K::deserialize(buf, cursor)?;
        let v = V::deserialize(buf, cursor)?;
        Ok((k, v))
    })
}

/// Encoded size of a non-null list of `len` elements.
pub fn elements_size<'a, T, I>(len: usize, items: I) -> usize
where
    T: Encoder + 'a,
    I: IntoIterator<Item = &'a T>,
{
    LENGTH_PREFIX_SIZE
        + match T::FIXED_SIZE {
            Some(k) => len * k,
            None => items.into_iter().map(|item| item.size()).sum(),
        }
}

/// Writes the count, then every element in iteration order.
pub fn serialize_elements<'a, T, I>(
    len: usize,
    items: I,
    buf: &mut [u8],
    cursor: &mut usize,
) -> Result<()>
where
    T: Encoder + 'a,
    I: IntoIterator<Item = &'a T>,
{
    write_length(buf, cursor, len)?;
    for item in items {
        item.serialize(buf, cursor)?;
    }
    Ok(())
}

/// Encoded size of a non-null map of `len` entries.
pub fn entries_size<'a, K, V, I>(len: usize, entries: I) -> usize
where
    K: Encoder + 'a,
    V: Encoder + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    LENGTH_PREFIX_SIZE
        + match (K::FIXED_SIZE, V::FIXED_SIZE) {
            (Some(k), Some(v)) => len * (k + v),
            _ => entries.into_iter().map(|(k, v)| k.size() + v.size()).sum(),
        }
}

/// Writes the count, then `key, value` for every entry in iteration order.
pub fn serialize_entries<'a, K, V, I>(
    len: usize,
    entries: I,
    buf: &mut [u8],
    cursor: &mut usize,
) -> Result<()>
where
    K: Encoder + 'a,
    V: Encoder + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    write_length(buf, cursor, len)?;
    for (k, v) in entries {
        k.serialize(buf, cursor)?;
        v.serialize(buf, cursor)?;
    }
    Ok(())
}

/// Size of a collection in a nullable element position: `-1` when absent.
#[inline]
pub fn nullable_size<T: Encoder>(value: Option<&T>) -> usize {
    value.map_or(LENGTH_PREFIX_SIZE, |v| v.size())
}

/// Writes a collection in a nullable element position.
#[inline]
pub fn serialize_nullable<T: Encoder>(
    value: Option<&T>,
    buf: &mut [u8],
    cursor: &mut usize,
) -> Result<()> {
    match value {
        Some(v) => v.serialize(buf, cursor),
        None => write_null_length(buf, cursor),
    }
}

/// Implements the `-1` null layout for a collection type in nullable element positions.
///
/// The decoder side needs `$body(len, buf, cursor)` to decode the body after the count.
macro_rules! collection_null_layout {
    () => {
        fn option_size(value: Option<&Self>) -> usize {
            nullable_size(value)
        }

        fn serialize_option(
            value: Option<&Self>,
            buf: &mut [u8],
            cursor: &mut usize,
        ) -> Result<()> {
            serialize_nullable(value, buf, cursor)
        }
    };
    (decode $body:expr) => {
        fn deserialize_option(buf: &[u8], cursor: &mut usize) -> Result<Option<Self>> {
            match read_length(buf, cursor)? {
                None => Ok(None),
                Some(len) => Ok(Some($body(len, buf, cursor)?)),
            }
        }
    };
}
#[allow(unused_imports)] // only the feature-gated codecs in `features` import it
pub(crate) use collection_null_layout;

// --- Vec<T> ---
/// Encodes a `Vec<T>` as a length-prefixed list.
impl<T: Encoder> Encoder for Vec<T> {
    fn size(&self) -> usize {
        elements_size(self.len(), self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_elements(self.len(), self, buf, cursor)
    }

    collection_null_layout!();
}

fn vec_body<T: Decoder>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<Vec<T>> {
    let mut vec = Vec::with_capacity(initial_capacity(len));
    deserialize_elements(len, buf, cursor, &mut vec)?;
    Ok(vec)
}

/// Decodes a `Vec<T>`; decoding in place reuses both the buffer and the existing elements.
impl<T: Decoder> Decoder for Vec<T> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "Vec")?;
        vec_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "Vec")?;
        self.truncate(len);
        for item in self.iter_mut() {
            item.deserialize_in_place(buf, cursor)?;
        }
        let reused = self.len();
        deserialize_elements(len - reused, buf, cursor, self)
    }

    collection_null_layout!(decode vec_body);
}

// --- VecDeque<T> ---
/// Encodes a `VecDeque<T>` as a list in front-to-back order.
impl<T: Encoder> Encoder for VecDeque<T> {
    fn size(&self) -> usize {
        elements_size(self.len(), self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_elements(self.len(), self, buf, cursor)
    }

    collection_null_layout!();
}

fn deque_body<T: Decoder>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<VecDeque<T>> {
    let mut deque = VecDeque::with_capacity(initial_capacity(len));
    deserialize_elements(len, buf, cursor, &mut deque)?;
    Ok(deque)
}

impl<T: Decoder> Decoder for VecDeque<T> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "VecDeque")?;
        deque_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "VecDeque")?;
        self.clear();
        deserialize_elements(len, buf, cursor, self)
    }

    collection_null_layout!(decode deque_body);
}

// --- Box<[T]> ---
/// Encodes a boxed slice as an array: count, then elements in index order.
impl<T: Encoder> Encoder for Box<[T]> {
    fn size(&self) -> usize {
        elements_size(self.len(), self.iter())
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_elements(self.len(), self.iter(), buf, cursor)
    }

    collection_null_layout!();
}

fn boxed_slice_body<T: Decoder>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<Box<[T]>> {
    Ok(vec_body(len, buf, cursor)?.into_boxed_slice())
}

/// Decodes a boxed slice; in place only when the length is unchanged.
impl<T: Decoder> Decoder for Box<[T]> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "Box<[T]>")?;
        boxed_slice_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "Box<[T]>")?;
        if len != self.len() {
            *self = boxed_slice_body(len, buf, cursor)?;
            return Ok(());
        }
        for item in self.iter_mut() {
            item.deserialize_in_place(buf, cursor)?;
        }
        Ok(())
    }

    collection_null_layout!(decode boxed_slice_body);
}

// --- [T; N] ---
/// Encodes a fixed-size array with the same count prefix as any other array.
impl<T: Encoder, const N: usize> Encoder for [T; N] {
    const FIXED_SIZE: Option<usize> = match T::FIXED_SIZE {
        Some(k) => Some(LENGTH_PREFIX_SIZE + N * k),
        None => None,
    };

    fn size(&self) -> usize {
        elements_size(N, self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_elements(N, self, buf, cursor)
    }

    collection_null_layout!();
}

fn array_body<T: Decoder, const N: usize>(
    len: usize,
    buf: &[u8],
    cursor: &mut usize,
) -> Result<[T; N]> {
    if len != N {
        return Err(WireError::Decode(format!(
            "Array length mismatch: expected {}, got {}",
            N, len
        )));
    }
    let mut items = Vec::with_capacity(N);
    deserialize_elements(N, buf, cursor, &mut items)?;
    items
        .try_into()
        .map_err(|_| WireError::Decode("Failed to convert Vec to array".to_string()))
}

/// Decodes a fixed-size array; a count other than `N` is an error.
impl<T: Decoder, const N: usize> Decoder for [T; N] {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "array")?;
        array_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "array")?;
        if len != N {
            return Err(WireError::Decode(format!(
                "Array length mismatch: expected {}, got {}",
                N, len
            )));
        }
        for item in self.iter_mut() {
            item.deserialize_in_place(buf, cursor)?;
        }
        Ok(())
    }

    collection_null_layout!(decode array_body);
}

// --- HashMap<K, V, S> ---
/// Encodes a hash map as count plus `key, value` pairs in iteration order.
///
/// Generic over the hasher, so `FxHashMap` and other `HashMap` aliases share this codec.
impl<K: Encoder, V: Encoder, S> Encoder for HashMap<K, V, S> {
    fn size(&self) -> usize {
        entries_size(self.len(), self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_entries(self.len(), self, buf, cursor)
    }

    collection_null_layout!();
}

fn hash_map_body<K, V, S>(len: usize, buf: &[u8], cursor: &mut usize) -> Result<HashMap<K, V, S>>
where
    K: Decoder + Eq + Hash,
    V: Decoder,
    S: BuildHasher + Default,
{
    let mut map = HashMap::with_capacity_and_hasher(initial_capacity(len), S::default());
    deserialize_entries(len, buf, cursor, &mut map)?;
    Ok(map)
}

impl<K, V, S> Decoder for HashMap<K, V, S>
where
    K: Decoder + Eq + Hash,
    V: Decoder,
    S: BuildHasher + Default,
{
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "HashMap")?;
        hash_map_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "HashMap")?;
        self.clear();
        deserialize_entries(len, buf, cursor, self)
    }

    collection_null_layout!(decode hash_map_body);
}

// --- BTreeMap<K, V> ---
/// Encodes a `BTreeMap` in key order.
impl<K: Encoder, V: Encoder> Encoder for BTreeMap<K, V> {
    fn size(&self) -> usize {
        entries_size(self.len(), self)
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        serialize_entries(self.len(), self, buf, cursor)
    }

    collection_null_layout!();
}

fn btree_map_body<K: Decoder + Ord, V: Decoder>(
    len: usize,
    buf: &[u8],
    cursor: &mut usize,
) -> Result<BTreeMap<K, V>> {
    let mut map = BTreeMap::new();
    deserialize_entries(len, buf, cursor, &mut map)?;
    Ok(map)
}

impl<K: Decoder + Ord, V: Decoder> Decoder for BTreeMap<K, V> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "BTreeMap")?;
        btree_map_body(len, buf, cursor)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "BTreeMap")?;
        self.clear();
        deserialize_entries(len, buf, cursor, self)
    }

    collection_null_layout!(decode btree_map_body);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Encoder + Decoder>(value: &T) -> (T, usize) {
        let mut buf = vec![0u8; value.size()];
        let mut cursor = 0;
        value.serialize(&mut buf, &mut cursor).unwrap();
        assert_eq!(cursor, buf.len());
        let mut read = 0;
        let decoded = T::deserialize(&buf, &mut read).unwrap();
        assert_eq!(read, cursor);
        (decoded, cursor)
    }

    #[test]
    fn fixed_element_list_size_is_arithmetic() {
        let v = vec![1u64, 2, 3];
        assert_eq!(v.size(), 4 + 3 * 8);
        assert_eq!(<[u16; 5] as Encoder>::FIXED_SIZE, Some(4 + 10));
    }

    #[test]
    fn batched_decode_preserves_order() {
        let v: Vec<u32> = (0..1000).collect();
        let (decoded, written) = roundtrip(&v);
        assert_eq!(decoded, v);
        assert_eq!(written, 4 + 4000);
    }

    #[test]
    fn corrupt_count_fails_on_missing_data() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&i32::MAX.to_le_bytes());
        buf.extend_from_slice(&[1, 0, 0, 0]);
        let mut cursor = 0;
        let err = Vec::<u32>::deserialize(&buf, &mut cursor).unwrap_err();
        assert!(matches!(err, WireError::InsufficientData { .. }));
    }

    #[test]
    fn in_place_reuses_existing_elements() {
        let source = vec!["alpha".to_string(), "beta".to_string()];
        let mut buf = vec![0u8; source.size()];
        let mut cursor = 0;
        source.serialize(&mut buf, &mut cursor).unwrap();

        let mut target: Vec<String> = (0..3).map(|_| String::with_capacity(64)).collect();
        let first_ptr = target[0].as_ptr();
        let mut read = 0;
        target.deserialize_in_place(&buf, &mut read).unwrap();
        assert_eq!(target, source);
        assert_eq!(target[0].as_ptr(), first_ptr);
    }

    #[test]
    fn array_length_mismatch() {
        let v = vec![1u8, 2];
        let mut buf = vec![0u8; v.size()];
        let mut cursor = 0;
        v.serialize(&mut buf, &mut cursor).unwrap();
        let mut read = 0;
        assert!(<[u8; 3]>::deserialize(&buf, &mut read).is_err());
    }
}
