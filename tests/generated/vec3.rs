// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

#![allow(unused_imports)]

use super::*;
use bitwire::bitset::NullBitset;
use bitwire::{Decoder as _, Encoder as _};

/// Dispatch tag 2.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl bitwire::Encoder for Vec3 {
    const FIXED_SIZE: Option<usize> = bitwire::sum_fixed_sizes(&[<f32 as bitwire::Encoder>::FIXED_SIZE, <f32 as bitwire::Encoder>::FIXED_SIZE, <f32 as bitwire::Encoder>::FIXED_SIZE]);

    fn size(&self) -> usize {
        if let Some(size) = Self::FIXED_SIZE {
            return size;
        }
        self.x.size() + self.y.size() + self.z.size()
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
        self.x.serialize(buf, cursor)?;
        self.y.serialize(buf, cursor)?;
        self.z.serialize(buf, cursor)?;
        Ok(())
    }
}

impl bitwire::Decoder for Vec3 {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
        let mut value = Self::default();
        value.deserialize_in_place(buf, cursor)?;
        Ok(value)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> bitwire::Result<()> {
        self.x.deserialize_in_place(buf, cursor)?;
        self.y.deserialize_in_place(buf, cursor)?;
        self.z.deserialize_in_place(buf, cursor)?;
        Ok(())
    }
}
