//! Explicit schema description and analysis.
//!
//! A closed set of [`TypeDecl`]s (written by hand in a JSON manifest or produced by
//! `#[derive(Schema)]`) is the input to [`analyze`], which classifies every field into
//! a [`FieldCodecPlan`] and assigns nullability slots. The resulting [`TypeSchema`] is
//! what the code generator lowers and emits.

mod analyzer;
mod describe;
mod plan;
mod registry;

pub use analyzer::{analyze, validate_enum, KnownType, KnownTypes};
pub use describe::{Describe, DescribeType};
pub use plan::{CodecKind, ElementPlan, FieldCodecPlan, TypeSchema};
pub use registry::{TypeRegistry, MAX_TYPES};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised while building registries or analyzing declarations.
///
/// These are generation-time errors: nothing has been emitted when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Tag 0 is reserved for null and cannot be assigned to {type_name}")]
    ReservedTag { type_name: String },
    #[error("Tag {tag} requested by {type_name} is already assigned to {existing}")]
    DuplicateTag {
        tag: u8,
        type_name: String,
        existing: String,
    },
    #[error("{type_name} is already registered with tag {existing}, cannot re-register with tag {requested}")]
    ConflictingTag {
        type_name: String,
        existing: u8,
        requested: u8,
    },
    #[error("Cannot register {type_name}: all {} tags are in use", MAX_TYPES)]
    TooManyTypes { type_name: String },
    #[error("Type {name} is declared more than once")]
    DuplicateType { name: String },
    #[error("{type_name} has more than {} nullable fields", u16::MAX)]
    TooManyNullableFields { type_name: String },
    #[error("{type_name} would generate {generated}, which already belongs to {owner}")]
    NameCollision {
        type_name: String,
        generated: String,
        owner: String,
    },
    #[error("Field {type_name}.{field} is declared more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("Unsupported field type {ty} for {type_name}.{field}: {reason}")]
    UnsupportedType {
        type_name: String,
        field: String,
        ty: String,
        reason: String,
    },
    #[error("Field {type_name}.{field} references unknown type {referenced}")]
    UnknownType {
        type_name: String,
        field: String,
        referenced: String,
    },
    #[error("{type_name} contains itself through non-nullable field {field} and has no finite encoding")]
    InfinitelySized { type_name: String, field: String },
    #[error("Enum {enum_name} is invalid: {reason}")]
    InvalidEnum { enum_name: String, reason: String },
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("Invalid type reference {input:?}: {reason}")]
    InvalidTypeRef { input: String, reason: String },
}

/// Leaf types with a built-in wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    F32,
    F64,
    Char,
    String,
    Duration,
    Uuid,
    Ulid,
    Decimal,
    DateTime,
}

impl Primitive {
    pub const ALL: [Primitive; 20] = [
        Primitive::Bool,
        Primitive::U8,
        Primitive::I8,
        Primitive::U16,
        Primitive::I16,
        Primitive::U32,
        Primitive::I32,
        Primitive::U64,
        Primitive::I64,
        Primitive::U128,
        Primitive::I128,
        Primitive::F32,
        Primitive::F64,
        Primitive::Char,
        Primitive::String,
        Primitive::Duration,
        Primitive::Uuid,
        Primitive::Ulid,
        Primitive::Decimal,
        Primitive::DateTime,
    ];

    /// Name used in manifests.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::U8 => "u8",
            Primitive::I8 => "i8",
            Primitive::U16 => "u16",
            Primitive::I16 => "i16",
            Primitive::U32 => "u32",
            Primitive::I32 => "i32",
            Primitive::U64 => "u64",
            Primitive::I64 => "i64",
            Primitive::U128 => "u128",
            Primitive::I128 => "i128",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
            Primitive::String => "string",
            Primitive::Duration => "duration",
            Primitive::Uuid => "uuid",
            Primitive::Ulid => "ulid",
            Primitive::Decimal => "decimal",
            Primitive::DateTime => "datetime",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Encoded width, or `None` for the length-prefixed string.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::U8 | Primitive::I8 => Some(1),
            Primitive::U16 | Primitive::I16 => Some(2),
            Primitive::U32 | Primitive::I32 | Primitive::F32 | Primitive::Char => Some(4),
            Primitive::U64
            | Primitive::I64
            | Primitive::F64
            | Primitive::Duration
            | Primitive::DateTime => Some(8),
            Primitive::U128
            | Primitive::I128
            | Primitive::Uuid
            | Primitive::Ulid
            | Primitive::Decimal => Some(16),
            Primitive::String => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Underlying integer width of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntRepr {
    U8,
    I8,
    U16,
    I16,
    U32,
    #[default]
    I32,
    U64,
    I64,
}

impl IntRepr {
    pub fn name(self) -> &'static str {
        match self {
            IntRepr::U8 => "u8",
            IntRepr::I8 => "i8",
            IntRepr::U16 => "u16",
            IntRepr::I16 => "i16",
            IntRepr::U32 => "u32",
            IntRepr::I32 => "i32",
            IntRepr::U64 => "u64",
            IntRepr::I64 => "i64",
        }
    }

    pub fn size(self) -> usize {
        match self {
            IntRepr::U8 | IntRepr::I8 => 1,
            IntRepr::U16 | IntRepr::I16 => 2,
            IntRepr::U32 | IntRepr::I32 => 4,
            IntRepr::U64 | IntRepr::I64 => 8,
        }
    }

    /// Whether `value` is representable at this width.
    pub fn contains(self, value: i64) -> bool {
        let (min, max): (i128, i128) = match self {
            IntRepr::U8 => (0, u8::MAX.into()),
            IntRepr::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntRepr::U16 => (0, u16::MAX.into()),
            IntRepr::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntRepr::U32 => (0, u32::MAX.into()),
            IntRepr::I32 => (i32::MIN.into(), i32::MAX.into()),
            IntRepr::U64 => (0, u64::MAX.into()),
            IntRepr::I64 => (i64::MIN.into(), i64::MAX.into()),
        };
        (min..=max).contains(&i128::from(value))
    }
}

/// A field type: a primitive, a declared type, a collection, or a nullable wrapper.
///
/// Written in manifests as `i32`, `Point`, `list<string?>`, `map<string, i64>`,
/// `array<f32>`, with a trailing `?` for nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(Primitive),
    Named(String),
    List(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Array(Box<TypeRef>),
    Optional(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Optional(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{}", p),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(element) => write!(f, "list<{}>", element),
            TypeRef::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            TypeRef::Array(element) => write!(f, "array<{}>", element),
            TypeRef::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

impl From<Primitive> for TypeRef {
    fn from(p: Primitive) -> Self {
        TypeRef::Primitive(p)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for TypeRef {
    type Err = SchemaError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeRefParser { input, pos: 0 };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error(format!("unexpected {:?}", &input[parser.pos..])));
        }
        Ok(ty)
    }
}

struct TypeRefParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeRefParser<'a> {
    fn error(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidTypeRef {
            input: self.input.to_owned(),
            reason: reason.into(),
        }
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), SchemaError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}' at offset {}", c, self.pos)))
        }
    }

    fn ident(&mut self) -> Result<&'a str, SchemaError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let ident = &rest[..len];
        match ident.chars().next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.pos += len;
                Ok(ident)
            }
            _ => Err(self.error(format!("expected a type name at offset {}", self.pos))),
        }
    }

    fn parse_type(&mut self) -> Result<TypeRef, SchemaError> {
        let ident = self.ident()?;
        let mut ty = match ident {
            "list" | "array" => {
                let ctor = ident == "list";
                self.expect('<')?;
                let element = self.parse_type()?;
                self.expect('>')?;
                if ctor {
                    TypeRef::list(element)
                } else {
                    TypeRef::array(element)
                }
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                TypeRef::map(key, value)
            }
            name => match Primitive::from_name(name) {
                Some(p) => TypeRef::Primitive(p),
                None => TypeRef::named(name),
            },
        };
        while self.eat('?') {
            ty = TypeRef::optional(ty);
        }
        Ok(ty)
    }
}

/// A struct field: its name and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        FieldDecl {
            name: name.into(),
            ty,
        }
    }
}

/// A serializable record type; fields are in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    /// Explicit dispatch tag; assigned in declaration order when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u8>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    pub value: i64,
}

/// A fieldless enumeration encoded as its discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub repr: IntRepr,
    pub variants: Vec<VariantDecl>,
}

/// One entry of a type manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDecl {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Struct(s) => &s.name,
            TypeDecl::Enum(e) => &e.name,
        }
    }
}

/// A JSON type manifest: `{ "types": [ ... ] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub types: Vec<TypeDecl>,
}

impl Manifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
