use crate::schema::{CodecKind, EnumDecl, IntRepr, TypeSchema};

/// One step of a struct codec, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Writes (reads) the nullability bitset: `(field, slot)` for every nullable field.
    Bitset { bytes: usize, slots: Vec<(String, u16)> },
    /// Writes (reads) one field, skipped when its bitset slot is set.
    Field {
        name: String,
        kind: CodecKind,
        slot: Option<u16>,
    },
}

/// Back-end independent description of one struct codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeIr {
    pub name: String,
    pub tag: u8,
    pub ops: Vec<Op>,
    pub fixed_size: Option<usize>,
}

impl TypeIr {
    /// Lowers an analyzed schema: one bitset op (when any field is nullable), then one op
    /// per field.
    pub fn lower(schema: &TypeSchema) -> Self {
        let mut ops = Vec::with_capacity(schema.fields.len() + 1);
        if schema.bitset_byte_size > 0 {
            ops.push(Op::Bitset {
                bytes: schema.bitset_byte_size,
                slots: schema
                    .fields
                    .iter()
                    .filter_map(|f| Some((f.name.clone(), f.nullable_slot?)))
                    .collect(),
            });
        }
        ops.extend(schema.fields.iter().map(|f| Op::Field {
            name: f.name.clone(),
            kind: f.kind.clone(),
            slot: f.nullable_slot,
        }));
        TypeIr {
            name: schema.name.clone(),
            tag: schema.type_tag,
            ops,
            fixed_size: schema.fixed_size,
        }
    }

    pub fn bitset_bytes(&self) -> usize {
        self.ops
            .iter()
            .find_map(|op| match op {
                Op::Bitset { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CodecKind, Option<u16>)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Field { name, kind, slot } => Some((name.as_str(), kind, *slot)),
            Op::Bitset { .. } => None,
        })
    }
}

/// A fieldless enum codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumIr {
    pub name: String,
    pub repr: IntRepr,
    pub variants: Vec<(String, i64)>,
}

impl EnumIr {
    pub fn lower(decl: &EnumDecl) -> Self {
        EnumIr {
            name: decl.name.clone(),
            repr: decl.repr,
            variants: decl
                .variants
                .iter()
                .map(|v| (v.name.clone(), v.value))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub tag: u8,
    pub name: String,
    pub module: String,
}

/// The dispatch table and registry listing: every registered struct in tag order,
/// plus the enums that only get a module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchIr {
    pub entries: Vec<DispatchEntry>,
    pub enums: Vec<DispatchEntry>,
}
