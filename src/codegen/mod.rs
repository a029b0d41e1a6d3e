//! Source generation from explicit type declarations.
//!
//! [`generate`] runs the whole pipeline: register tags, analyze every struct, lower
//! to [`TypeIr`], render through an [`Emitter`] and write the artifacts:
//!
//! - one file per declared type (kept if it already exists, unless `force`)
//! - one dispatch table covering every registered struct
//! - one registry listing (module declarations, re-exports, tag table)
//!
//! Shared artifacts are only rewritten when their content changes, so running twice
//! leaves every file byte-identical.

mod ir;
mod rust;
mod writer;

pub use ir::{DispatchEntry, DispatchIr, EnumIr, Op, TypeIr};
pub use rust::{rust_type, snake_case, RustEmitter};
pub use writer::CodeWriter;

use crate::schema::{analyze, validate_enum, KnownTypes, SchemaError, TypeDecl, TypeRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Renders IR into source text for one target language.
pub trait Emitter {
    /// File name of the artifact for `type_name`.
    fn type_file(&self, type_name: &str) -> String;
    fn dispatch_file(&self) -> &str;
    fn registry_file(&self) -> &str;
    /// Name of the tag constant emitted for a registered struct.
    fn tag_const(&self, type_name: &str) -> String;
    fn null_tag_const(&self) -> &str;

    fn emit_struct(&self, ir: &TypeIr) -> String;
    fn emit_enum(&self, ir: &EnumIr) -> String;
    fn emit_dispatch(&self, ir: &DispatchIr) -> String;
    fn emit_registry(&self, ir: &DispatchIr) -> String;
}

/// Generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub output_dir: PathBuf,
    /// Overwrite per-type artifacts that already exist.
    pub force: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            output_dir: PathBuf::from("generated"),
            force: false,
        }
    }
}

impl GenConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        GenConfig {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a generation run did to each artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Created or overwritten.
    pub written: Vec<PathBuf>,
    /// Per-type artifacts left alone because they already existed.
    pub skipped: Vec<PathBuf>,
    /// Shared artifacts whose content was already up to date.
    pub unchanged: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} written, {} skipped, {} unchanged",
            self.written.len(),
            self.skipped.len(),
            self.unchanged.len()
        )
    }
}

/// A fully rendered artifact, not yet on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
    /// Per-type artifacts are protected from overwriting; shared ones are not.
    pub per_type: bool,
}

/// Generates Rust sources for `decls` into `config.output_dir`.
pub fn generate(
    decls: &[TypeDecl],
    config: &GenConfig,
) -> Result<GenerationReport, GenerateError> {
    let artifacts = render(decls, &RustEmitter)?;
    write_artifacts(&artifacts, config)
}

/// Runs registration, analysis and emission without touching the file system.
///
/// Every schema error is raised here, so a failing manifest never produces output.
pub fn render(decls: &[TypeDecl], emitter: &dyn Emitter) -> Result<Vec<Artifact>, SchemaError> {
    let known = KnownTypes::from_decls(decls)?;
    check_generated_names(decls, emitter)?;

    // Explicit tags first so automatic ones fill the gaps around them.
    let mut tags = TypeRegistry::new();
    for decl in decls {
        if let TypeDecl::Struct(s) = decl {
            if let Some(tag) = s.tag {
                tags.register_with_tag(s.name.clone(), tag, &s.name)?;
            }
        }
    }

    let mut artifacts = Vec::with_capacity(decls.len() + 2);
    let mut dispatch = DispatchIr::default();
    for decl in decls {
        let module = snake_case(decl.name());
        match decl {
            TypeDecl::Struct(s) => {
                let tag = match s.tag {
                    Some(tag) => tags.register_with_tag(s.name.clone(), tag, &s.name)?,
                    None => tags.register(s.name.clone(), &s.name)?,
                };
                let schema = analyze(s, &known, tag)?;
                tracing::debug!(
                    type_name = %s.name,
                    tag,
                    fields = schema.fields.len(),
                    nullable = schema.nullable_field_count,
                    "analyzed struct"
                );
                artifacts.push(Artifact {
                    file_name: emitter.type_file(&s.name),
                    contents: emitter.emit_struct(&TypeIr::lower(&schema)),
                    per_type: true,
                });
                dispatch.entries.push(DispatchEntry {
                    tag,
                    name: s.name.clone(),
                    module,
                });
            }
            TypeDecl::Enum(e) => {
                validate_enum(e)?;
                tracing::debug!(type_name = %e.name, repr = e.repr.name(), "analyzed enum");
                artifacts.push(Artifact {
                    file_name: emitter.type_file(&e.name),
                    contents: emitter.emit_enum(&EnumIr::lower(e)),
                    per_type: true,
                });
                dispatch.enums.push(DispatchEntry {
                    tag: 0,
                    name: e.name.clone(),
                    module,
                });
            }
        }
    }
    dispatch.entries.sort_by_key(|entry| entry.tag);

    artifacts.push(Artifact {
        file_name: emitter.dispatch_file().to_owned(),
        contents: emitter.emit_dispatch(&dispatch),
        per_type: false,
    });
    artifacts.push(Artifact {
        file_name: emitter.registry_file().to_owned(),
        contents: emitter.emit_registry(&dispatch),
        per_type: false,
    });
    Ok(artifacts)
}

/// Every file and tag constant a declaration generates must belong to it alone.
///
/// Distinct type names can still map to one module (`HttpServer`, `HTTPServer`) or to a
/// shared artifact (`Dispatch` in any casing).
fn check_generated_names(decls: &[TypeDecl], emitter: &dyn Emitter) -> Result<(), SchemaError> {
    let mut owners: HashMap<String, String> = HashMap::new();
    owners.insert(emitter.dispatch_file().to_owned(), "the dispatch table".to_owned());
    owners.insert(emitter.registry_file().to_owned(), "the registry listing".to_owned());
    owners.insert(emitter.null_tag_const().to_owned(), "the null tag".to_owned());

    for decl in decls {
        let mut generated = vec![emitter.type_file(decl.name())];
        if let TypeDecl::Struct(_) = decl {
            generated.push(emitter.tag_const(decl.name()));
        }
        for name in generated {
            if let Some(owner) = owners.get(&name) {
                return Err(SchemaError::NameCollision {
                    type_name: decl.name().to_owned(),
                    generated: name,
                    owner: owner.clone(),
                });
            }
            owners.insert(name, decl.name().to_owned());
        }
    }
    Ok(())
}

/// Writes rendered artifacts, honouring skip-if-exists for per-type files.
pub fn write_artifacts(
    artifacts: &[Artifact],
    config: &GenConfig,
) -> Result<GenerationReport, GenerateError> {
    let dir = &config.output_dir;
    fs::create_dir_all(dir).map_err(|source| GenerateError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut report = GenerationReport::new();
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        if artifact.per_type && !config.force && path.exists() {
            tracing::info!(path = %path.display(), "exists, skipping");
            report.skipped.push(path);
            continue;
        }
        if !artifact.per_type
            && read_existing(&path)?.as_deref() == Some(artifact.contents.as_str())
        {
            tracing::debug!(path = %path.display(), "up to date");
            report.unchanged.push(path);
            continue;
        }
        fs::write(&path, &artifact.contents).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote");
        report.written.push(path);
    }
    tracing::info!(dir = %dir.display(), "{}", report.summary());
    Ok(report)
}

fn read_existing(path: &Path) -> Result<Option<String>, GenerateError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(GenerateError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}
