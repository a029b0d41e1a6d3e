//! Rust back end: renders the IR as modules that depend on the `bitwire` runtime.

use super::ir::{DispatchEntry, DispatchIr, EnumIr, Op, TypeIr};
use super::writer::CodeWriter;
use super::Emitter;
use crate::schema::{CodecKind, ElementPlan, Primitive};

const HEADER: &[&str] = &[
    "// @generated by bitwire-gen from a type manifest.",
    "// Existing files are kept on regeneration unless --force is given.",
];

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Emits one module per type, `dispatch.rs` and `mod.rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

impl Emitter for RustEmitter {
    fn type_file(&self, type_name: &str) -> String {
        // `mod r#type;` lives in `type.rs`; `mod self_;` in `self_.rs`.
        let module = ident(&snake_case(type_name));
        format!("{}.rs", module.trim_start_matches("r#"))
    }

    fn dispatch_file(&self) -> &str {
        "dispatch.rs"
    }

    fn registry_file(&self) -> &str {
        "mod.rs"
    }

    fn tag_const(&self, type_name: &str) -> String {
        tag_const(type_name)
    }

    fn null_tag_const(&self) -> &str {
        "NULL_TAG"
    }

    fn emit_struct(&self, ir: &TypeIr) -> String {
        let mut w = module_prelude();
        w.line("use bitwire::bitset::NullBitset;");
        w.line("use bitwire::{Decoder as _, Encoder as _};");
        w.blank();
        w.doc(format!("Dispatch tag {}.", ir.tag));
        w.line("#[derive(Debug, Clone, PartialEq, Default)]");
        w.block(format!("pub struct {}", ir.name), |w| {
            for (name, kind, slot) in ir.fields() {
                w.line(format!("pub {}: {},", ident(name), field_type(kind, slot.is_some())));
            }
        });
        w.blank();
        emit_encoder(&mut w, ir);
        w.blank();
        emit_decoder(&mut w, ir);
        w.finish()
    }

    fn emit_enum(&self, ir: &EnumIr) -> String {
        let mut w = module_prelude();
        let repr = ir.repr.name();
        w.blank();
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]");
        w.line(format!("#[repr({})]", repr));
        w.block(format!("pub enum {}", ir.name), |w| {
            for (i, (variant, value)) in ir.variants.iter().enumerate() {
                if i == 0 {
                    w.line("#[default]");
                }
                w.line(format!("{} = {},", ident(variant), value));
            }
        });
        w.blank();
        w.block(format!("impl bitwire::Encoder for {}", ir.name), |w| {
            w.line(format!(
                "const FIXED_SIZE: Option<usize> = Some({});",
                ir.repr.size()
            ));
            w.blank();
            w.block("fn size(&self) -> usize", |w| {
                w.line(ir.repr.size().to_string());
            });
            w.blank();
            w.block(
                "fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()>",
                |w| {
                    w.line(format!("bitwire::write_{}(buf, cursor, *self as {})", repr, repr));
                },
            );
        });
        w.blank();
        w.block(format!("impl bitwire::Decoder for {}", ir.name), |w| {
            w.block(
                "fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self>",
                |w| {
                    w.block(format!("match bitwire::read_{}(buf, cursor)?", repr), |w| {
                        for (variant, value) in &ir.variants {
                            w.line(format!("{} => Ok(Self::{}),", value, ident(variant)));
                        }
                        w.line("value => Err(bitwire::EnumDecodeError::UnknownDiscriminant {");
                        w.line("    value: value as i64,");
                        w.line(format!("    enum_name: \"{}\",", ir.name));
                        w.line("}");
                        w.line(".into()),");
                    });
                },
            );
        });
        w.finish()
    }

    fn emit_dispatch(&self, ir: &DispatchIr) -> String {
        let mut w = module_prelude();
        w.line("use bitwire::{Decoder as _, Encoder as _};");
        w.blank();
        w.doc("Tag of a null top-level value.");
        w.line("pub const NULL_TAG: u8 = 0;");
        for entry in &ir.entries {
            w.line(format!(
                "pub const {}: u8 = {};",
                tag_const(&entry.name),
                entry.tag
            ));
        }
        w.blank();

        w.doc("A value of any registered type.");
        w.line("#[derive(Debug, Clone, PartialEq)]");
        w.block("pub enum AnyValue", |w| {
            for entry in &ir.entries {
                w.line(format!("{0}({0}),", entry.name));
            }
        });
        w.blank();

        let empty = ir.entries.is_empty();
        w.block("impl AnyValue", |w| {
            w.block("pub fn tag(&self) -> u8", |w| {
                match_any(w, &ir.entries, |w, name| {
                    w.line(format!("AnyValue::{}(_) => {},", name, tag_const(name)));
                });
            });
            w.blank();
            w.block("pub fn type_name(&self) -> &'static str", |w| {
                match_any(w, &ir.entries, |w, name| {
                    w.line(format!("AnyValue::{0}(_) => \"{0}\",", name));
                });
            });
        });
        w.blank();

        w.doc("Implemented by every registered type.");
        w.block(
            "pub trait Registered: bitwire::Encoder + bitwire::Decoder + Sized",
            |w| {
                w.line("const TAG: u8;");
                w.line("const NAME: &'static str;");
                w.blank();
                w.line("fn into_any(self) -> AnyValue;");
                w.line("fn from_any(value: AnyValue) -> Result<Self, AnyValue>;");
            },
        );
        for entry in &ir.entries {
            w.blank();
            w.block(format!("impl Registered for {}", entry.name), |w| {
                w.line(format!("const TAG: u8 = {};", tag_const(&entry.name)));
                w.line(format!("const NAME: &'static str = \"{}\";", entry.name));
                w.blank();
                w.block("fn into_any(self) -> AnyValue", |w| {
                    w.line(format!("AnyValue::{}(self)", entry.name));
                });
                w.blank();
                w.line("#[allow(unreachable_patterns)]");
                w.block("fn from_any(value: AnyValue) -> Result<Self, AnyValue>", |w| {
                    w.block("match value", |w| {
                        w.line(format!("AnyValue::{}(value) => Ok(value),", entry.name));
                        w.line("other => Err(other),");
                    });
                });
            });
            w.blank();
            w.block(format!("impl From<{0}> for AnyValue", entry.name), |w| {
                w.block(format!("fn from(value: {}) -> Self", entry.name), |w| {
                    w.line(format!("AnyValue::{}(value)", entry.name));
                });
            });
        }
        w.blank();

        w.block("pub fn tag_of<T: Registered>() -> u8", |w| {
            w.line("T::TAG");
        });
        w.blank();
        w.doc("Tag registered for a type name.");
        w.block("pub fn tag_of_name(name: &str) -> Option<u8>", |w| {
            w.block("match name", |w| {
                for entry in &ir.entries {
                    w.line(format!("\"{}\" => Some({}),", entry.name, tag_const(&entry.name)));
                }
                w.line("_ => None,");
            });
        });
        w.blank();
        w.block("pub fn type_name_of(tag: u8) -> Option<&'static str>", |w| {
            w.block("match tag", |w| {
                for entry in &ir.entries {
                    w.line(format!("{} => Some(\"{}\"),", tag_const(&entry.name), entry.name));
                }
                w.line("_ => None,");
            });
        });
        w.blank();

        w.doc("Encoded size of a top-level value: 1 for null, else the tag plus the payload.");
        w.block("pub fn size(value: Option<&AnyValue>) -> usize", |w| {
            w.block("match value", |w| {
                w.line("None => 1,");
                if empty {
                    w.line("Some(value) => match *value {},");
                }
                for entry in &ir.entries {
                    w.line(format!("Some(AnyValue::{}(value)) => 1 + value.size(),", entry.name));
                }
            });
        });
        w.blank();
        w.block(
            "pub fn serialize(value: Option<&AnyValue>, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()>",
            |w| {
                w.block("match value", |w| {
                    w.line("None => bitwire::write_u8(buf, cursor, NULL_TAG),");
                    if empty {
                        w.line("Some(value) => match *value {},");
                    }
                    for entry in &ir.entries {
                        w.block(format!("Some(AnyValue::{}(value)) =>", entry.name), |w| {
                            w.line(format!(
                                "bitwire::write_u8(buf, cursor, {})?;",
                                tag_const(&entry.name)
                            ));
                            w.line("value.serialize(buf, cursor)");
                        });
                    }
                });
            },
        );
        w.blank();
        w.block("pub fn size_of<T: Registered>(value: Option<&T>) -> usize", |w| {
            w.line("value.map_or(1, |value| 1 + value.size())");
        });
        w.blank();
        w.block(
            "pub fn serialize_typed<T: Registered>(value: Option<&T>, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()>",
            |w| {
                w.block("match value", |w| {
                    w.line("None => bitwire::write_u8(buf, cursor, NULL_TAG),");
                    w.block("Some(value) =>", |w| {
                        w.line("bitwire::write_u8(buf, cursor, T::TAG)?;");
                        w.line("value.serialize(buf, cursor)");
                    });
                });
            },
        );
        w.blank();

        w.doc("Decodes the payload of `tag`; the tag byte has already been read.");
        w.block(
            "pub fn deserialize_by_tag(tag: u8, buf: &[u8], cursor: &mut usize) -> bitwire::Result<AnyValue>",
            |w| {
                w.block("match tag", |w| {
                    for entry in &ir.entries {
                        w.line(format!(
                            "{} => Ok(AnyValue::{}({}::deserialize(buf, cursor)?)),",
                            tag_const(&entry.name),
                            entry.name,
                            entry.name
                        ));
                    }
                    w.line("tag => Err(bitwire::DispatchError::UnknownTag { tag }.into()),");
                });
            },
        );
        w.blank();
        w.block(
            "pub fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Option<AnyValue>>",
            |w| {
                w.block("match bitwire::read_u8(buf, cursor)?", |w| {
                    w.line("NULL_TAG => Ok(None),");
                    w.line("tag => deserialize_by_tag(tag, buf, cursor).map(Some),");
                });
            },
        );
        w.blank();
        w.doc("Reads a top-level value that must be a `T` (or null).");
        w.block(
            "pub fn deserialize_as<T: Registered>(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Option<T>>",
            |w| {
                w.line("let tag = bitwire::read_u8(buf, cursor)?;");
                w.block("if tag == NULL_TAG", |w| {
                    w.line("return Ok(None);");
                });
                w.block("if tag != T::TAG", |w| {
                    w.block_with("return Err(match type_name_of(tag)", ".into());", |w| {
                        w.line("Some(actual) => bitwire::DispatchError::TypeMismatch {");
                        w.line("    tag,");
                        w.line("    expected: T::NAME,");
                        w.line("    actual,");
                        w.line("},");
                        w.line("None => bitwire::DispatchError::UnknownTag { tag },");
                    });
                });
                w.line("T::deserialize(buf, cursor).map(Some)");
            },
        );
        w.finish()
    }

    fn emit_registry(&self, ir: &DispatchIr) -> String {
        let mut w = CodeWriter::new();
        for line in HEADER {
            w.line(*line);
        }
        w.blank();
        let mut modules: Vec<(&str, &str)> = ir
            .entries
            .iter()
            .chain(&ir.enums)
            .map(|e| (e.module.as_str(), e.name.as_str()))
            .collect();
        modules.sort_unstable();
        w.line("pub mod dispatch;");
        for (module, _) in &modules {
            w.line(format!("pub mod {};", ident(module)));
        }
        w.blank();
        w.line("pub use dispatch::{AnyValue, Registered};");
        for (module, name) in &modules {
            w.line(format!("pub use {}::{};", ident(module), name));
        }
        w.blank();
        w.doc("Every registered struct as `(tag, name)`, in tag order.");
        w.line("pub const REGISTERED_TYPES: &[(u8, &str)] = &[");
        for entry in &ir.entries {
            w.line(format!("    ({}, \"{}\"),", entry.tag, entry.name));
        }
        w.line("];");
        w.finish()
    }
}

fn module_prelude() -> CodeWriter {
    let mut w = CodeWriter::new();
    for line in HEADER {
        w.line(*line);
    }
    w.blank();
    w.line("#![allow(unused_imports)]");
    w.blank();
    w.line("use super::*;");
    w
}

fn emit_encoder(w: &mut CodeWriter, ir: &TypeIr) {
    let bitset = ir.bitset_bytes();
    w.block(format!("impl bitwire::Encoder for {}", ir.name), |w| {
        if bitset == 0 {
            let sizes: Vec<String> = ir
                .fields()
                .map(|(_, kind, _)| {
                    format!("<{} as bitwire::Encoder>::FIXED_SIZE", rust_type(kind))
                })
                .collect();
            w.line(format!(
                "const FIXED_SIZE: Option<usize> = bitwire::sum_fixed_sizes(&[{}]);",
                sizes.join(", ")
            ));
            w.blank();
        }

        w.block("fn size(&self) -> usize", |w| {
            if bitset == 0 {
                w.block("if let Some(size) = Self::FIXED_SIZE", |w| {
                    w.line("return size;");
                });
                let terms: Vec<String> = ir
                    .fields()
                    .map(|(name, _, _)| format!("self.{}.size()", ident(name)))
                    .collect();
                if terms.is_empty() {
                    w.line("0");
                } else {
                    w.line(terms.join(" + "));
                }
                return;
            }
            w.line(format!("let mut size = {};", bitset));
            for (name, _, slot) in ir.fields() {
                if slot.is_some() {
                    w.block(format!("if let Some(value) = &self.{}", ident(name)), |w| {
                        w.line("size += value.size();");
                    });
                } else {
                    w.line(format!("size += self.{}.size();", ident(name)));
                }
            }
            w.line("size");
        });
        w.blank();

        w.block(
            "fn serialize(&self, buf: &mut [u8], cursor: &mut usize) -> bitwire::Result<()>",
            |w| {
                for op in &ir.ops {
                    match op {
                        Op::Bitset { bytes, slots } => {
                            w.line(format!("let mut bitset = NullBitset::<{}>::new();", bytes));
                            for (name, slot) in slots {
                                w.line(format!(
                                    "bitset.set({}, self.{}.is_none());",
                                    slot,
                                    ident(name)
                                ));
                            }
                            w.line("bitset.write(buf, cursor)?;");
                        }
                        Op::Field {
                            name,
                            slot: Some(_),
                            ..
                        } => {
                            w.block(format!("if let Some(value) = &self.{}", ident(name)), |w| {
                                w.line("value.serialize(buf, cursor)?;");
                            });
                        }
                        Op::Field { name, slot: None, .. } => {
                            w.line(format!("self.{}.serialize(buf, cursor)?;", ident(name)));
                        }
                    }
                }
                if ir.ops.is_empty() {
                    w.line("let _ = (buf, cursor);");
                }
                w.line("Ok(())");
            },
        );
    });
}

fn emit_decoder(w: &mut CodeWriter, ir: &TypeIr) {
    w.block(format!("impl bitwire::Decoder for {}", ir.name), |w| {
        w.block(
            "fn deserialize(buf: &[u8], cursor: &mut usize) -> bitwire::Result<Self>",
            |w| {
                w.line("let mut value = Self::default();");
                w.line("value.deserialize_in_place(buf, cursor)?;");
                w.line("Ok(value)");
            },
        );
        w.blank();
        w.block(
            "fn deserialize_in_place(&mut self, buf: &[u8], cursor: &mut usize) -> bitwire::Result<()>",
            |w| {
                for op in &ir.ops {
                    match op {
                        Op::Bitset { bytes, .. } => {
                            w.line(format!(
                                "let bitset = NullBitset::<{}>::read(buf, cursor)?;",
                                bytes
                            ));
                        }
                        Op::Field {
                            name,
                            slot: Some(slot),
                            ..
                        } => {
                            let field = ident(name);
                            w.block_else(
                                format!("if bitset.is_null({})", slot),
                                |w| {
                                    w.line(format!("self.{} = None;", field));
                                },
                                |w| {
                                    w.line(format!(
                                        "bitwire::deserialize_present_in_place(&mut self.{}, buf, cursor)?;",
                                        field
                                    ));
                                },
                            );
                        }
                        Op::Field { name, slot: None, .. } => {
                            w.line(format!(
                                "self.{}.deserialize_in_place(buf, cursor)?;",
                                ident(name)
                            ));
                        }
                    }
                }
                if ir.ops.is_empty() {
                    w.line("let _ = (buf, cursor);");
                }
                w.line("Ok(())");
            },
        );
    });
}

/// Writes `match self { .. }` with one arm per registered struct.
fn match_any(w: &mut CodeWriter, entries: &[DispatchEntry], arm: impl Fn(&mut CodeWriter, &str)) {
    if entries.is_empty() {
        w.line("match *self {}");
        return;
    }
    w.block("match self", |w| {
        for entry in entries {
            arm(w, &entry.name);
        }
    });
}

/// Rust type of a struct field.
pub fn field_type(kind: &CodecKind, nullable: bool) -> String {
    wrap_option(rust_type(kind), nullable)
}

/// Rust type of a value of `kind`, collections spelled out to the leaves.
pub fn rust_type(kind: &CodecKind) -> String {
    match kind {
        CodecKind::Primitive(p) => primitive_type(*p).to_owned(),
        CodecKind::Enum { name, .. } => name.clone(),
        CodecKind::Nested {
            name,
            recursive: true,
        } => format!("Box<{}>", name),
        CodecKind::Nested { name, .. } => name.clone(),
        CodecKind::List(element) => format!("Vec<{}>", element_type(element)),
        CodecKind::Array(element) => format!("Box<[{}]>", element_type(element)),
        CodecKind::Map { key, value } => format!(
            "std::collections::HashMap<{}, {}>",
            element_type(key),
            element_type(value)
        ),
    }
}

fn element_type(element: &ElementPlan) -> String {
    wrap_option(rust_type(&element.kind), element.is_nullable)
}

fn wrap_option(ty: String, nullable: bool) -> String {
    if nullable {
        format!("Option<{}>", ty)
    } else {
        ty
    }
}

fn primitive_type(p: Primitive) -> &'static str {
    match p {
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
        Primitive::String => "String",
        Primitive::Duration => "std::time::Duration",
        Primitive::Uuid => "uuid::Uuid",
        Primitive::Ulid => "ulid::Ulid",
        Primitive::Decimal => "rust_decimal::Decimal",
        Primitive::DateTime => "chrono::DateTime<chrono::Utc>",
    }
}

/// `HttpServer` → `http_server`, `HTTPServer` → `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn tag_const(type_name: &str) -> String {
    format!("{}_TAG", snake_case(type_name).to_ascii_uppercase())
}

/// Escapes keywords as raw identifiers.
fn ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" => format!("{}_", name),
        _ if KEYWORDS.contains(&name) => format!("r#{}", name),
        _ => name.to_owned(),
    }
}
