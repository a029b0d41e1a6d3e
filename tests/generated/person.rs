// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

#![allow(unused_imports)]

use super::*;
use bitwire::bitset::NullBitset;
use bitwire::{Decoder as _, Encoder as _};

/// Dispatch tag 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Person {
    pub id: i32,
    pub name: Option<String>,
    pub position: Vec3,
    pub tags: Option<Vec<Option<String>>>,
    pub scores: std::collections::HashMap<String, i32>,
    pub color: Color,
    pub r#type: u8,
    pub readings: Box<[Option<Vec<u16>>]>,
}

impl bitwire::Encoder for Person {
    fn size(&self) -> usize {
        let mut size = 1;
        size += self.id.size();
        if let Some(value) = &self.name {
            size += value.size();
        }
        size += self.position.size();
        if let Some(value) = &self.tags {
            size += value.size();
        }
        size += self.scores.size();
        size += self.color.size();
        size += self.r#type.size();
        size += self.readings.size();
        size
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
        let mut bitset = NullBitset::<1>::new();
        bitset.set(1, self.name.is_none());
        bitset.set(2, self.tags.is_none());
        bitset.write(buf, cursor)?;
        self.id.serialize(buf, cursor)?;
        if let Some(value) = &self.name {
            value.serialize(buf, cursor)?;
        }
        self.position.serialize(buf, cursor)?;
        if let Some(value) = &self.tags {
            value.serialize(buf, cursor)?;
        }
        self.scores.serialize(buf, cursor)?;
        self.color.serialize(buf, cursor)?;
        self.r#type.serialize(buf, cursor)?;
        self.readings.serialize(buf, cursor)?;
        Ok(())
    }
}

impl bitwire::Decoder for Person {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
        let mut value = Self::default();
        value.deserialize_in_place(buf, cursor)?;
        Ok(value)
    }

    fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> bitwire::Result<()> {
        let bitset = NullBitset::<1>::read(buf, cursor)?;
        self.id.deserialize_in_place(buf, cursor)?;
        if bitset.is_null(1) {
            self.name = None;
        } else {
            bitwire::deserialize_present_in_place(&mut self.name, buf, cursor)?;
        }
        self.position.deserialize_in_place(buf, cursor)?;
        if bitset.is_null(2) {
            self.tags = None;
        } else {
            bitwire::deserialize_present_in_place(&mut self.tags, buf, cursor)?;
        }
        self.scores.deserialize_in_place(buf, cursor)?;
        self.color.deserialize_in_place(buf, cursor)?;
        self.r#type.deserialize_in_place(buf, cursor)?;
        self.readings.deserialize_in_place(buf, cursor)?;
        Ok(())
    }
}
