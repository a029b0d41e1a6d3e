use super::{IntRepr, Primitive};
use crate::bitset::bitset_size;

/// How a value is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecKind {
    Primitive(Primitive),
    Enum {
        name: String,
        repr: IntRepr,
    },
    /// Another registered struct, encoded inline (no tag).
    ///
    /// `recursive` is set when the nested type can reach the owning type again through
    /// direct fields, which requires indirection in the emitted type.
    Nested {
        name: String,
        recursive: bool,
    },
    List(Box<ElementPlan>),
    Map {
        key: Box<ElementPlan>,
        value: Box<ElementPlan>,
    },
    Array(Box<ElementPlan>),
}

impl CodecKind {
    /// `Primitive`, `Enum`, `NestedSerializable`, `List`, `Map` or `Array`.
    pub fn label(&self) -> &'static str {
        match self {
            CodecKind::Primitive(_) => "Primitive",
            CodecKind::Enum { .. } => "Enum",
            CodecKind::Nested { .. } => "NestedSerializable",
            CodecKind::List(_) => "List",
            CodecKind::Map { .. } => "Map",
            CodecKind::Array(_) => "Array",
        }
    }

    /// Encoded size when it never depends on the value.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            CodecKind::Primitive(p) => p.fixed_size(),
            CodecKind::Enum { repr, .. } => Some(repr.size()),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            CodecKind::List(_) | CodecKind::Map { .. } | CodecKind::Array(_)
        )
    }
}

/// Element, key or value of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPlan {
    pub kind: CodecKind,
    /// Encoded in the element's nullable layout (`-1` length or presence byte).
    pub is_nullable: bool,
}

/// Codec plan for one serializable member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCodecPlan {
    pub name: String,
    pub kind: CodecKind,
    pub is_nullable: bool,
    /// Bitset slot, assigned from 1 over nullable fields in declaration order.
    pub nullable_slot: Option<u16>,
}

/// Analyzed layout of one registered struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub name: String,
    /// Wire order.
    pub fields: Vec<FieldCodecPlan>,
    pub nullable_field_count: usize,
    pub bitset_byte_size: usize,
    pub type_tag: u8,
    /// Size of every value when all fields are non-nullable and fixed-width.
    ///
    /// Only primitive and enum fields count; nested structs make the size unknown
    /// at analysis time even if their own layout is fixed.
    pub fixed_size: Option<usize>,
}

impl TypeSchema {
    pub(crate) fn new(name: String, fields: Vec<FieldCodecPlan>, type_tag: u8) -> Self {
        let nullable_field_count = fields.iter().filter(|f| f.is_nullable).count();
        let fixed_size = if nullable_field_count == 0 {
            fields.iter().try_fold(0, |total, field| {
                Some(total + field.kind.fixed_size()?)
            })
        } else {
            None
        };
        TypeSchema {
            name,
            nullable_field_count,
            bitset_byte_size: bitset_size(nullable_field_count),
            fields,
            type_tag,
            fixed_size,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldCodecPlan> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn nullable_fields(&self) -> impl Iterator<Item = &FieldCodecPlan> + '_ {
        self.fields.iter().filter(|f| f.is_nullable)
    }
}
