// @generated by bitwire-gen from a type manifest.
// Existing files are kept on regeneration unless --force is given.

#![allow(unused_imports)]

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Color {
    #[default]
    Red = 1,
    Green = 2,
}

impl bitwire::Encoder for Color {
    const FIXED_SIZE: Option<usize> = Some(1);

    fn size(&self) -> usize {
        1
    }

    fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()> {
        bitwire::write_u8(buf, cursor, *self as u8)
    }
}

impl bitwire::Decoder for Color {
    fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self> {
        match bitwire::read_u8(buf, cursor)? {
            1 => Ok(Self::Red),
            2 => Ok(Self::Green),
            value => Err(bitwire::EnumDecodeError::UnknownDiscriminant {
                value: value as i64,
                enum_name: "Color",
            }
            .into()),
        }
    }
}
