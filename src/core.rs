use crate::*;
use bytes::{Buf, BufMut};
use std::sync::Arc;
use std::time::Duration;

/// Byte values and sentinels used in the bitwire binary format.
///
/// - Nullable elements (inside collections) carry a one-byte presence marker.
/// - Strings and collections use a `-1` length instead of the marker.
/// - These values are stable and part of the wire format.

///< Nullable element is absent
pub const ABSENT: u8 = 0;
///< Nullable element is present, value follows
pub const PRESENT: u8 = 1;
///< Length prefix of a null string or collection
pub const NULL_LENGTH: i32 = -1;
///< Size of every length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

// --- Bounds checks ---
/// Fails with [`WireError::BufferTooSmall`] unless `needed` bytes fit at `cursor`.
#[inline]
pub fn ensure_writable(buf: &[u8], cursor: usize, needed: usize) -> Result<()> {
    let available = buf.len().saturating_sub(cursor);
    if available < needed {
        return Err(WireError::BufferTooSmall {
            needed,
            available,
            offset: cursor,
        });
    }
    Ok(())
}

/// Fails with [`WireError::InsufficientData`] unless `needed` bytes remain at `cursor`.
#[inline]
pub fn ensure_readable(buf: &[u8], cursor: usize, needed: usize) -> Result<()> {
    let available = buf.len().saturating_sub(cursor);
    if available < needed {
        return Err(WireError::InsufficientData {
            needed,
            available,
            offset: cursor,
        });
    }
    Ok(())
}

/// Copies `src` verbatim to the cursor.
#[inline]
pub fn write_bytes(buf: &mut [u8], cursor: &mut usize, src: &[u8]) -> Result<()> {
    ensure_writable(buf, *cursor, src.len())?;
    buf[*cursor..*cursor + src.len()].copy_from_slice(src);
    *cursor += src.len();
    Ok(())
}

/// Borrows `len` bytes at the cursor.
#[inline]
pub fn read_bytes<'a>(buf: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    ensure_readable(buf, *cursor, len)?;
    let bytes = &buf[*cursor..*cursor + len];
    *cursor += len;
    Ok(bytes)
}

// --- Fixed-width primitives ---
/// Implements raw little-endian accessors and the codec traits for a fixed-width number.
macro_rules! impl_fixed_width {
    ($ty:ty, $size:expr, $write:ident, $read:ident, $put:ident, $get:ident) => {
        #[doc = concat!("Writes a `", stringify!($ty), "` as ", stringify!($size), " little-endian bytes.")]
        #[inline]
        pub fn $write(buf: &mut [u8], cursor: &mut usize, value: $ty) -> Result<()> {
            ensure_writable(buf, *cursor, $size)?;
            (&mut buf[*cursor..]).$put(value);
            *cursor += $size;
            Ok(())
        }

        #[doc = concat!("Reads a little-endian `", stringify!($ty), "`.")]
        #[inline]
        pub fn $read(buf: &[u8], cursor: &mut usize) -> Result<$ty> {
            ensure_readable(buf, *cursor, $size)?;
            let value = (&buf[*cursor..]).$get();
            *cursor += $size;
            Ok(value)
        }

        impl Encoder for $ty {
            const FIXED_SIZE: Option<usize> = Some($size);

            #[inline]
            fn size(&self) -> usize {
                $size
            }

            #[inline]
            fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
                $write(buf, cursor, *self)
            }
        }

        impl Decoder for $ty {
            #[inline]
            fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
                $read(buf, cursor)
            }
        }
    };
}

impl_fixed_width!(u8, 1, write_u8, read_u8, put_u8, get_u8);
impl_fixed_width!(i8, 1, write_i8, read_i8, put_i8, get_i8);
impl_fixed_width!(u16, 2, write_u16, read_u16, put_u16_le, get_u16_le);
impl_fixed_width!(i16, 2, write_i16, read_i16, put_i16_le, get_i16_le);
impl_fixed_width!(u32, 4, write_u32, read_u32, put_u32_le, get_u32_le);
impl_fixed_width!(i32, 4, write_i32, read_i32, put_i32_le, get_i32_le);
impl_fixed_width!(u64, 8, write_u64, read_u64, put_u64_le, get_u64_le);
impl_fixed_width!(i64, 8, write_i64, read_i64, put_i64_le, get_i64_le);
impl_fixed_width!(u128, 16, write_u128, read_u128, put_u128_le, get_u128_le);
impl_fixed_width!(i128, 16, write_i128, read_i128, put_i128_le, get_i128_le);
impl_fixed_width!(f32, 4, write_f32, read_f32, put_f32_le, get_f32_le);
impl_fixed_width!(f64, 8, write_f64, read_f64, put_f64_le, get_f64_le);

// --- bool ---
/// Encodes a `bool` as a single byte: `0` for `false`, `1` for `true`.
impl Encoder for bool {
    const FIXED_SIZE: Option<usize> = Some(1);

    fn size(&self) -> usize {
        1
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_u8(buf, cursor, u8::from(*self))
    }
}
/// Decodes a `bool` from a single byte.
///
/// # Errors
/// Returns an error if the byte is neither `0` nor `1`.
impl Decoder for bool {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let offset = *cursor;
        match read_u8(buf, cursor)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::Decode(format!(
                "Expected bool (0 or 1) at offset {}, got {}",
                offset, other
            ))),
        }
    }
}

// --- char ---
/// Encodes a `char` as its 4-byte Unicode scalar value.
impl Encoder for char {
    const FIXED_SIZE: Option<usize> = Some(4);

    fn size(&self) -> usize {
        4
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_u32(buf, cursor, u32::from(*self))
    }
}
impl Decoder for char {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let scalar = read_u32(buf, cursor)?;
        char::from_u32(scalar)
            .ok_or_else(|| WireError::Decode(format!("Invalid char scalar value: {:#X}", scalar)))
    }
}

// --- usize / isize ---
/// Encodes `usize` as 8 bytes regardless of the platform's pointer width.
impl Encoder for usize {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn size(&self) -> usize {
        8
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_u64(buf, cursor, *self as u64)
    }
}
impl Decoder for usize {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let v = read_u64(buf, cursor)?;
        usize::try_from(v)
            .map_err(|_| WireError::Decode(format!("Value {} too large for usize", v)))
    }
}
impl Encoder for isize {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn size(&self) -> usize {
        8
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_i64(buf, cursor, *self as i64)
    }
}
impl Decoder for isize {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let v = read_i64(buf, cursor)?;
        isize::try_from(v)
            .map_err(|_| WireError::Decode(format!("Value {} out of range for isize", v)))
    }
}

// --- Duration ---
/// Encodes a `Duration` as 8 bytes of whole nanoseconds.
///
/// # Errors
/// Durations longer than `u64::MAX` nanoseconds (about 584 years) cannot be encoded.
impl Encoder for Duration {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn size(&self) -> usize {
        8
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        let nanos = u64::try_from(self.as_nanos()).map_err(|_| {
            WireError::Encode(format!("Duration {:?} exceeds u64 nanoseconds", self))
        })?;
        write_u64(buf, cursor, nanos)
    }
}
impl Decoder for Duration {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(Duration::from_nanos(read_u64(buf, cursor)?))
    }
}

// --- Length prefixes ---
/// Writes a non-null length prefix.
///
/// # Errors
/// Lengths above `i32::MAX` cannot be represented.
#[inline]
pub fn write_length(buf: &mut [u8], cursor: &mut usize, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| WireError::Encode(format!("Length {} exceeds i32::MAX", len)))?;
    write_i32(buf, cursor, len)
}

/// Writes the `-1` null sentinel.
#[inline]
pub fn write_null_length(buf: &mut [u8], cursor: &mut usize) -> Result<()> {
    write_i32(buf, cursor, NULL_LENGTH)
}

/// Reads a length prefix: `None` for the null sentinel, `Some(len)` otherwise.
///
/// # Errors
/// Any negative length other than `-1` is [`WireError::InvalidLength`].
#[inline]
pub fn read_length(buf: &[u8], cursor: &mut usize) -> Result<Option<usize>> {
    let offset = *cursor;
    match read_i32(buf, cursor)? {
        NULL_LENGTH => Ok(None),
        len if len >= 0 => Ok(Some(len as usize)),
        length => Err(WireError::InvalidLength { length, offset }),
    }
}

/// Reads a length prefix in a position that does not admit null.
#[inline]
pub fn read_required_length(
    buf: &[u8],
    cursor: &mut usize,
    type_name: &'static str,
) -> Result<usize> {
    read_length(buf, cursor)?.ok_or(WireError::UnexpectedNull { type_name })
}

// --- String ---
/// Decodes `len` bytes at the cursor as UTF-8.
pub fn read_str<'a>(buf: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a str> {
    let offset = *cursor;
    let bytes = read_bytes(buf, cursor, len)?;
    std::str::from_utf8(bytes)
        .map_err(|e| WireError::Decode(format!("Invalid UTF-8 at offset {}: {}", offset, e)))
}

/// Writes a string body with its byte-length prefix.
#[inline]
pub fn write_str(buf: &mut [u8], cursor: &mut usize, value: &str) -> Result<()> {
    write_length(buf, cursor, value.len())?;
    write_bytes(buf, cursor, value.as_bytes())
}

/// Encodes a `String` as `[byte length: i32][UTF-8 bytes]`; `None` in element position is `-1`.
impl Encoder for String {
    fn size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.len()
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        write_str(buf, cursor, self)
    }

    fn option_size(value: Option<&Self>) -> usize {
        value.map_or(LENGTH_PREFIX_SIZE, |v| v.size())
    }

    fn serialize_option(value: Option<&Self>, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        match value {
            Some(v) => v.serialize(buf, cursor),
            None => write_null_length(buf, cursor),
        }
    }
}
/// Decodes a `String`; the `-1` sentinel is rejected outside nullable positions.
impl Decoder for String {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let len = read_required_length(buf, cursor, "String")?;
        Ok(read_str(buf, cursor, len)?.to_owned())
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        let len = read_required_length(buf, cursor, "String")?;
        let s = read_str(buf, cursor, len)?;
        self.clear();
        self.push_str(s);
        Ok(())
    }

    fn deserialize_option(buf: &[u8], cursor: &mut usize) -> Result<Option<Self>> {
        match read_length(buf, cursor)? {
            None => Ok(None),
            Some(len) => Ok(Some(read_str(buf, cursor, len)?.to_owned())),
        }
    }
}

// --- Option ---
/// Encodes an `Option<T>` in element position using `T`'s null layout.
///
/// Struct fields of type `Option<T>` do not go through this impl: their presence is
/// recorded in the owning type's nullability bitset.
impl<T: Encoder> Encoder for Option<T> {
    fn size(&self) -> usize {
        T::option_size(self.as_ref())
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        T::serialize_option(self.as_ref(), buf, cursor)
    }
}
impl<T: Decoder> Decoder for Option<T> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        T::deserialize_option(buf, cursor)
    }
}

/// Decodes a present nullable field into `slot`, reusing the existing value when there is one.
pub fn deserialize_present_in_place<T: Decoder>(
    slot: &mut Option<T>,
    buf: &[u8],
    cursor: &mut usize,
) -> Result<()> {
    match slot {
        Some(value) => value.deserialize_in_place(buf, cursor),
        None => {
            *slot = Some(T::deserialize(buf, cursor)?);
            Ok(())
        }
    }
}

/// Sums field sizes at compile time; `None` as soon as one of them is variable.
pub const fn sum_fixed_sizes(sizes: &[Option<usize>]) -> Option<usize> {
    let mut total = 0;
    let mut i = 0;
    while i < sizes.len() {
        match sizes[i] {
            Some(n) => total += n,
            None => return None,
        }
        i += 1;
    }
    Some(total)
}

// --- Box<T> ---
/// Encodes a `Box<T>` exactly like `T`.
impl<T: Encoder> Encoder for Box<T> {
    const FIXED_SIZE: Option<usize> = T::FIXED_SIZE;

    fn size(&self) -> usize {
        (**self).size()
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        (**self).serialize(buf, cursor)
    }

    fn option_size(value: Option<&Self>) -> usize {
        T::option_size(value.map(|v| &**v))
    }

    fn serialize_option(value: Option<&Self>, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        T::serialize_option(value.map(|v| &**v), buf, cursor)
    }
}
/// Decodes a `Box<T>` by decoding the inner value and wrapping it in a Box.
impl<T: Decoder> Decoder for Box<T> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(Box::new(T::deserialize(buf, cursor)?))
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        (**self).deserialize_in_place(buf, cursor)
    }

    fn deserialize_option(buf: &[u8], cursor: &mut usize) -> Result<Option<Self>> {
        Ok(T::deserialize_option(buf, cursor)?.map(Box::new))
    }
}

// --- Arc<T> ---
/// Encodes an `Arc<T>` exactly like `T`.
impl<T: Encoder> Encoder for Arc<T> {
    const FIXED_SIZE: Option<usize> = T::FIXED_SIZE;

    fn size(&self) -> usize {
        (**self).size()
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        (**self).serialize(buf, cursor)
    }

    fn option_size(value: Option<&Self>) -> usize {
        T::option_size(value.map(|v| &**v))
    }

    fn serialize_option(value: Option<&Self>, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        T::serialize_option(value.map(|v| &**v), buf, cursor)
    }
}
/// Decodes an `Arc<T>`; a uniquely owned `Arc` is overwritten in place.
impl<T: Decoder> Decoder for Arc<T> {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Ok(Arc::new(T::deserialize(buf, cursor)?))
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> Result<()> {
        match Arc::get_mut(self) {
            Some(inner) => inner.deserialize_in_place(buf, cursor),
            None => {
                *self = Arc::new(T::deserialize(buf, cursor)?);
                Ok(())
            }
        }
    }

    fn deserialize_option(buf: &[u8], cursor: &mut usize) -> Result<Option<Self>> {
        Ok(T::deserialize_option(buf, cursor)?.map(Arc::new))
    }
}
