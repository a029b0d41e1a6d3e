//! Nullability bitset: one bit per nullable field of a value, written before any field bytes.
//!
//! Slots are numbered from 1 in declaration order over nullable fields only; slot `s`
//! lives in bit `(s - 1) % 8` of byte `(s - 1) / 8`. A set bit means the field is null.

use crate::*;

/// Number of bytes needed for `nullable_fields` bits.
pub const fn bitset_size(nullable_fields: usize) -> usize {
    nullable_fields.div_ceil(8)
}

/// A fixed-size nullability bitset of `N` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullBitset<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Default for NullBitset<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NullBitset<N> {
    /// Size of the bitset on the wire.
    pub const SIZE: usize = N;

    /// An all-clear (every field present) bitset.
    pub const fn new() -> Self {
        Self { bytes: [0; N] }
    }

    #[inline]
    fn position(slot: u16) -> (usize, u8) {
        debug_assert!(slot >= 1, "nullable slot 0 is reserved");
        debug_assert!((slot as usize) <= N * 8, "nullable slot {} out of range", slot);
        let bit = (slot - 1) as usize;
        (bit / 8, 1 << (bit % 8))
    }

    /// Marks the field in `slot` as null.
    #[inline]
    pub fn set_null(&mut self, slot: u16) {
        let (byte, mask) = Self::position(slot);
        self.bytes[byte] |= mask;
    }

    /// Marks the field in `slot` as present.
    #[inline]
    pub fn clear(&mut self, slot: u16) {
        let (byte, mask) = Self::position(slot);
        self.bytes[byte] &= !mask;
    }

    /// Sets or clears `slot` according to `is_null`.
    #[inline]
    pub fn set(&mut self, slot: u16, is_null: bool) {
        if is_null {
            self.set_null(slot);
        } else {
            self.clear(slot);
        }
    }

    #[inline]
    pub fn is_null(&self, slot: u16) -> bool {
        let (byte, mask) = Self::position(slot);
        self.bytes[byte] & mask != 0
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Copies the bitset verbatim to the cursor; an empty bitset writes nothing.
    #[inline]
    pub fn write(&self, buf: &mut [u8], cursor: &mut usize) -> Result<()> {
        if N == 0 {
            return Ok(());
        }
        write_bytes(buf, cursor, &self.bytes)
    }

    /// Mirror of [`NullBitset::write`].
    #[inline]
    pub fn read(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let mut bytes = [0u8; N];
        if N > 0 {
            bytes.copy_from_slice(read_bytes(buf, cursor, N)?);
        }
        Ok(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rounds_up() {
        assert_eq!(bitset_size(0), 0);
        assert_eq!(bitset_size(1), 1);
        assert_eq!(bitset_size(8), 1);
        assert_eq!(bitset_size(9), 2);
        assert_eq!(bitset_size(17), 3);
    }

    #[test]
    fn slots_map_to_bits() {
        let mut bits = NullBitset::<2>::new();
        bits.set_null(1);
        bits.set_null(9);
        assert_eq!(bits.as_bytes(), &[0b0000_0001, 0b0000_0001]);
        assert!(bits.is_null(1));
        assert!(!bits.is_null(2));
        assert!(bits.is_null(9));
        bits.clear(1);
        assert!(!bits.is_null(1));
    }

    #[test]
    fn write_then_read() {
        let mut bits = NullBitset::<1>::new();
        bits.set(3, true);
        bits.set(8, true);
        let mut buf = [0u8; 1];
        let mut cursor = 0;
        bits.write(&mut buf, &mut cursor).unwrap();
        assert_eq!(cursor, 1);
        let mut cursor = 0;
        let decoded = NullBitset::<1>::read(&buf, &mut cursor).unwrap();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn empty_bitset_touches_nothing() {
        let bits = NullBitset::<0>::new();
        let mut buf = [0u8; 0];
        let mut cursor = 0;
        bits.write(&mut buf, &mut cursor).unwrap();
        assert_eq!(cursor, 0);
        assert_eq!(NullBitset::<0>::read(&buf, &mut cursor).unwrap(), bits);
    }

    #[test]
    fn truncated_bitset_fails() {
        let buf = [0u8; 1];
        let mut cursor = 0;
        assert!(matches!(
            NullBitset::<2>::read(&buf, &mut cursor),
            Err(WireError::InsufficientData { needed: 2, .. })
        ));
    }
}
