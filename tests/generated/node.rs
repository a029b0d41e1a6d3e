// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

#![allow(unused_imports)]

use super::*;
use bitwire::bitset::NullBitset;
use bitwire::{Decoder as _, Encoder as _};

/// Dispatch tag 10.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub value: i32,
    pub next: Option<Box<Node>>,
}

impl bitwire::Encoder for Node {
    fn size(&self) -> usize {
        let mut size = 1;
        size += self.value.size();
        if let Some(value) = &self.next {
            size += value.size();
        }
        size
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
        let mut bitset = NullBitset::<1>::new();
        bitset.set(1, self.next.is_none());
        bitset.write(buf, cursor)?;
        self.value.serialize(buf, cursor)?;
        if let Some(value) = &self.next {
            value.serialize(buf, cursor)?;
        }
        Ok(())
    }
}

impl bitwire::Decoder for Node {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
        let mut value = Self::default();
        value.deserialize_in_place(buf, cursor)?;
        Ok(value)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> bitwire::Result<()> {
        let bitset = NullBitset::<1>::read(buf, cursor)?;
        self.value.deserialize_in_place(buf, cursor)?;
        if bitset.is_null(1) {
            self.next = None;
        } else {
            bitwire::deserialize_present_in_place(&mut self.next, buf, cursor)?;
        }
        Ok(())
    }
}
