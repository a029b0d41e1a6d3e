use super::*;
use std::collections::{HashMap, HashSet};

/// What a declared name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownType {
    /// A struct and the declared types of its fields.
    Struct(Vec<TypeRef>),
    Enum(IntRepr),
}

/// The closed set of declared types a schema may reference.
#[derive(Debug, Clone, Default)]
pub struct KnownTypes {
    types: HashMap<String, KnownType>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every declaration; names must be unique.
    pub fn from_decls<'a>(
        decls: impl IntoIterator<Item = &'a TypeDecl>,
    ) -> Result<Self, SchemaError> {
        let mut known = KnownTypes::new();
        for decl in decls {
            known.insert(decl)?;
        }
        Ok(known)
    }

    pub fn insert(&mut self, decl: &TypeDecl) -> Result<(), SchemaError> {
        check_name(decl.name())?;
        if RESERVED_TYPE_NAMES.contains(&decl.name()) {
            return Err(SchemaError::InvalidName {
                name: decl.name().to_owned(),
                reason: "shadows a type used by generated code".into(),
            });
        }
        let entry = match decl {
            TypeDecl::Struct(s) => {
                KnownType::Struct(s.fields.iter().map(|f| f.ty.clone()).collect())
            }
            TypeDecl::Enum(e) => KnownType::Enum(e.repr),
        };
        if Primitive::from_name(decl.name()).is_some() || self.types.contains_key(decl.name()) {
            return Err(SchemaError::DuplicateType {
                name: decl.name().to_owned(),
            });
        }
        self.types.insert(decl.name().to_owned(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&KnownType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether `from` reaches `to` through direct struct fields.
    ///
    /// With `nullable_edges == false`, only non-nullable fields are followed.
    fn reaches(&self, from: &str, to: &str, nullable_edges: bool) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(KnownType::Struct(fields)) = self.types.get(name) else {
                continue;
            };
            for ty in fields {
                let Some(target) = direct_struct_target(ty, nullable_edges) else {
                    continue;
                };
                if target == to {
                    return true;
                }
                stack.push(target);
            }
        }
        false
    }
}

/// Type names the generated code refers to unqualified.
///
/// Clashes between generated module files are checked by `codegen::render`.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Self",
    "Option",
    "Box",
    "Vec",
    "String",
    "Result",
    "AnyValue",
    "Registered",
];

/// Checks that `name` is a plain identifier: `[A-Za-z_][A-Za-z0-9_]*`.
fn check_name(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason: "expected an identifier".into(),
        })
    }
}

/// Name of the struct a field holds inline (not through a collection).
fn direct_struct_target(ty: &TypeRef, nullable_edges: bool) -> Option<&str> {
    match ty {
        TypeRef::Named(name) => Some(name),
        TypeRef::Optional(inner) if nullable_edges => direct_struct_target(inner, nullable_edges),
        _ => None,
    }
}

struct FieldContext<'a> {
    type_name: &'a str,
    field: &'a str,
    ty: &'a TypeRef,
}

impl FieldContext<'_> {
    fn unsupported(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::UnsupportedType {
            type_name: self.type_name.to_owned(),
            field: self.field.to_owned(),
            ty: self.ty.to_string(),
            reason: reason.into(),
        }
    }
}

/// Builds the [`TypeSchema`] of `decl`.
///
/// Fields keep declaration order. Nullable fields (declared with a trailing `?`)
/// get bitset slots 1, 2, 3, ... in the order they appear.
pub fn analyze(
    decl: &StructDecl,
    known: &KnownTypes,
    type_tag: u8,
) -> Result<TypeSchema, SchemaError> {
    let mut names = HashSet::new();
    let mut fields = Vec::with_capacity(decl.fields.len());
    let mut nullable_count: usize = 0;

    for field in &decl.fields {
        check_name(&field.name)?;
        if !names.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                type_name: decl.name.clone(),
                field: field.name.clone(),
            });
        }
        let cx = FieldContext {
            type_name: &decl.name,
            field: &field.name,
            ty: &field.ty,
        };
        let (is_nullable, inner) = unwrap_optional(&cx, &field.ty)?;
        let mut kind = classify(&cx, inner, known)?;

        if let CodecKind::Nested { name, recursive } = &mut kind {
            if !is_nullable && (*name == decl.name || known.reaches(name, &decl.name, false)) {
                return Err(SchemaError::InfinitelySized {
                    type_name: decl.name.clone(),
                    field: field.name.clone(),
                });
            }
            *recursive = *name == decl.name || known.reaches(name, &decl.name, true);
        }

        let nullable_slot = if is_nullable {
            nullable_count += 1;
            let slot = u16::try_from(nullable_count).map_err(|_| {
                SchemaError::TooManyNullableFields {
                    type_name: decl.name.clone(),
                }
            })?;
            Some(slot)
        } else {
            None
        };
        fields.push(FieldCodecPlan {
            name: field.name.clone(),
            kind,
            is_nullable,
            nullable_slot,
        });
    }

    Ok(TypeSchema::new(decl.name.clone(), fields, type_tag))
}

fn unwrap_optional<'a>(
    cx: &FieldContext<'_>,
    ty: &'a TypeRef,
) -> Result<(bool, &'a TypeRef), SchemaError> {
    match ty {
        TypeRef::Optional(inner) if inner.is_optional() => {
            Err(cx.unsupported("nested optionals cannot be told apart on the wire"))
        }
        TypeRef::Optional(inner) => Ok((true, inner)),
        other => Ok((false, other)),
    }
}

fn classify(
    cx: &FieldContext<'_>,
    ty: &TypeRef,
    known: &KnownTypes,
) -> Result<CodecKind, SchemaError> {
    match ty {
        TypeRef::Primitive(p) => Ok(CodecKind::Primitive(*p)),
        TypeRef::Named(name) => match known.get(name) {
            Some(KnownType::Enum(repr)) => Ok(CodecKind::Enum {
                name: name.clone(),
                repr: *repr,
            }),
            Some(KnownType::Struct(_)) => Ok(CodecKind::Nested {
                name: name.clone(),
                recursive: false,
            }),
            None => Err(SchemaError::UnknownType {
                type_name: cx.type_name.to_owned(),
                field: cx.field.to_owned(),
                referenced: name.clone(),
            }),
        },
        TypeRef::List(element) => Ok(CodecKind::List(Box::new(element_plan(cx, element, known)?))),
        TypeRef::Array(element) => {
            Ok(CodecKind::Array(Box::new(element_plan(cx, element, known)?)))
        }
        TypeRef::Map(key, value) => {
            let key = element_plan(cx, key, known)?;
            if key.is_nullable {
                return Err(cx.unsupported("map keys cannot be nullable"));
            }
            match &key.kind {
                CodecKind::Primitive(p) if p.is_float() => {
                    return Err(cx.unsupported(format!("{} map keys have no total equality", p)));
                }
                CodecKind::Primitive(_) | CodecKind::Enum { .. } => {}
                other => {
                    return Err(cx.unsupported(format!(
                        "map keys must be primitives or enums, found {}",
                        other.label()
                    )));
                }
            }
            let value = element_plan(cx, value, known)?;
            Ok(CodecKind::Map {
                key: Box::new(key),
                value: Box::new(value),
            })
        }
        TypeRef::Optional(_) => {
            Err(cx.unsupported("nested optionals cannot be told apart on the wire"))
        }
    }
}

fn element_plan(
    cx: &FieldContext<'_>,
    ty: &TypeRef,
    known: &KnownTypes,
) -> Result<ElementPlan, SchemaError> {
    let (is_nullable, inner) = unwrap_optional(cx, ty)?;
    Ok(ElementPlan {
        kind: classify(cx, inner, known)?,
        is_nullable,
    })
}

/// Checks that an enum has variants with unique names and representable, unique values.
pub fn validate_enum(decl: &EnumDecl) -> Result<(), SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidEnum {
        enum_name: decl.name.clone(),
        reason,
    };
    if decl.variants.is_empty() {
        return Err(invalid("no variants".into()));
    }
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    for variant in &decl.variants {
        check_name(&variant.name)?;
        if !names.insert(variant.name.as_str()) {
            return Err(invalid(format!("variant {} is declared twice", variant.name)));
        }
        if !values.insert(variant.value) {
            return Err(invalid(format!("value {} is used twice", variant.value)));
        }
        if !decl.repr.contains(variant.value) {
            return Err(invalid(format!(
                "value {} of {} does not fit in {}",
                variant.value,
                variant.name,
                decl.repr.name()
            )));
        }
    }
    Ok(())
}
