use bitwire::codegen::{generate, render, GenConfig, GenerateError, RustEmitter};
use bitwire::schema::{Manifest, SchemaError, TypeDecl};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const MANIFEST: &str = include_str!("generated/manifest.json");

fn decls() -> Vec<TypeDecl> {
    Manifest::from_json(MANIFEST).unwrap().types
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap()
}

#[test]
fn test_generates_one_file_per_type() {
    let dir = tempdir().unwrap();
    let config = GenConfig::new(dir.path());
    let report = generate(&decls(), &config).unwrap();

    assert_eq!(report.written.len(), 6);
    assert!(report.skipped.is_empty());
    for file in ["person.rs", "vec3.rs", "node.rs", "color.rs", "dispatch.rs", "mod.rs"] {
        assert!(dir.path().join(file).exists(), "missing {}", file);
    }
}

#[test]
fn test_generated_struct_contents() {
    let dir = tempdir().unwrap();
    generate(&decls(), &GenConfig::new(dir.path())).unwrap();

    let person = read(dir.path(), "person.rs");
    assert!(person.contains("pub struct Person {"));
    assert!(person.contains("pub id: i32,"));
    assert!(person.contains("pub name: Option<String>,"));
    assert!(person.contains("pub tags: Option<Vec<Option<String>>>,"));
    assert!(person.contains("pub scores: std::collections::HashMap<String, i32>,"));
    assert!(person.contains("let mut bitset = NullBitset::<1>::new();"));
    assert!(person.contains("bitset.set(1, self.name.is_none());"));
    assert!(person.contains("bitset.set(2, self.tags.is_none());"));
    assert!(person.contains("impl bitwire::Decoder for Person"));

    let vec3 = read(dir.path(), "vec3.rs");
    assert!(vec3.contains("bitwire::sum_fixed_sizes"));
    assert!(!vec3.contains("NullBitset::<"));

    let node = read(dir.path(), "node.rs");
    assert!(node.contains("pub next: Option<Box<Node>>,"));

    let color = read(dir.path(), "color.rs");
    assert!(color.contains("#[repr(u8)]"));
    assert!(color.contains("Green = 2,"));
    assert!(color.contains("enum_name: \"Color\""));
}

#[test]
fn test_generated_dispatch_contents() {
    let dir = tempdir().unwrap();
    generate(&decls(), &GenConfig::new(dir.path())).unwrap();

    let dispatch = read(dir.path(), "dispatch.rs");
    assert!(dispatch.contains("pub const NULL_TAG: u8 = 0;"));
    assert!(dispatch.contains("pub const PERSON_TAG: u8 = 1;"));
    assert!(dispatch.contains("pub const VEC3_TAG: u8 = 2;"));
    assert!(dispatch.contains("pub const NODE_TAG: u8 = 10;"));
    assert!(dispatch.contains("pub enum AnyValue {"));
    assert!(dispatch.contains("Person(Person),"));
    assert!(!dispatch.contains("Color(Color)"));
    assert!(dispatch.contains("pub fn deserialize_by_tag("));

    let registry = read(dir.path(), "mod.rs");
    assert!(registry.contains("pub mod dispatch;"));
    assert!(registry.contains("pub mod color;"));
    assert!(registry.contains("pub use person::Person;"));
    assert!(registry.contains("(10, \"Node\"),"));
}

#[test]
fn test_generated_sources_parse() {
    let artifacts = render(&decls(), &RustEmitter).unwrap();
    for artifact in &artifacts {
        if let Err(e) = syn::parse_file(&artifact.contents) {
            panic!("{} does not parse: {}\n{}", artifact.file_name, e, artifact.contents);
        }
    }
}

#[test]
fn test_rendered_sources_match_checked_in_modules() {
    // Regenerate with:
    // cargo run -p bitwire-gen -- tests/generated/manifest.json -o tests/generated --force
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/generated");
    let artifacts = render(&decls(), &RustEmitter).unwrap();

    let names: Vec<&str> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["person.rs", "vec3.rs", "node.rs", "color.rs", "dispatch.rs", "mod.rs"]
    );
    for artifact in &artifacts {
        assert_eq!(
            artifact.contents,
            read(&fixture, &artifact.file_name),
            "tests/generated/{} is out of date",
            artifact.file_name
        );
    }
}

#[test]
fn test_empty_manifest_parses() {
    let artifacts = render(&[], &RustEmitter).unwrap();
    assert_eq!(artifacts.len(), 2);
    for artifact in &artifacts {
        syn::parse_file(&artifact.contents).unwrap();
    }
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = tempdir().unwrap();
    let config = GenConfig::new(dir.path());
    generate(&decls(), &config).unwrap();
    let first: Vec<String> = ["person.rs", "dispatch.rs", "mod.rs"]
        .iter()
        .map(|f| read(dir.path(), f))
        .collect();

    let report = generate(&decls(), &config).unwrap();
    assert!(report.written.is_empty());
    assert_eq!(report.skipped.len(), 4);
    assert_eq!(report.unchanged.len(), 2);

    let second: Vec<String> = ["person.rs", "dispatch.rs", "mod.rs"]
        .iter()
        .map(|f| read(dir.path(), f))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_existing_files_are_kept_without_force() {
    let dir = tempdir().unwrap();
    generate(&decls(), &GenConfig::new(dir.path())).unwrap();

    let edited = "// hand edited\n";
    fs::write(dir.path().join("person.rs"), edited).unwrap();

    generate(&decls(), &GenConfig::new(dir.path())).unwrap();
    assert_eq!(read(dir.path(), "person.rs"), edited);

    let report = generate(&decls(), &GenConfig::new(dir.path()).with_force(true)).unwrap();
    assert_eq!(report.written.len(), 4);
    assert!(read(dir.path(), "person.rs").contains("pub struct Person"));
}

#[test]
fn test_reserved_tag_fails_before_writing() {
    let json = r#"{ "types": [
        { "kind": "struct", "name": "Bad", "tag": 0, "fields": [] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    let err = generate(&decls, &GenConfig::new(&out)).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Schema(SchemaError::ReservedTag { ref type_name }) if type_name == "Bad"
    ));
    assert!(!out.exists());
}

#[test]
fn test_later_schema_error_writes_nothing() {
    let json = r#"{ "types": [
        { "kind": "struct", "name": "Good", "fields": [ { "name": "id", "type": "u8" } ] },
        { "kind": "struct", "name": "Broken", "fields": [ { "name": "other", "type": "Missing" } ] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    let err = generate(&decls, &GenConfig::new(&out)).unwrap_err();
    assert!(err.to_string().contains("Broken.other"));
    assert!(!out.exists());
}

#[test]
fn test_duplicate_explicit_tags() {
    let json = r#"{ "types": [
        { "kind": "struct", "name": "A", "tag": 3, "fields": [] },
        { "kind": "struct", "name": "B", "tag": 3, "fields": [] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    let err = render(&decls, &RustEmitter).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateTag { tag: 3, .. }));
}

#[test]
fn test_automatic_tags_fill_gaps() {
    let json = r#"{ "types": [
        { "kind": "struct", "name": "A", "fields": [] },
        { "kind": "struct", "name": "B", "tag": 2, "fields": [] },
        { "kind": "struct", "name": "C", "fields": [] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    let artifacts = render(&decls, &RustEmitter).unwrap();
    let registry = artifacts
        .iter()
        .find(|a| a.file_name == "mod.rs")
        .unwrap();
    assert!(registry.contents.contains("(1, \"A\"),\n    (2, \"B\"),\n    (3, \"C\"),"));
}

fn render_err(json: &str) -> SchemaError {
    let decls = Manifest::from_json(json).unwrap().types;
    render(&decls, &RustEmitter).unwrap_err()
}

#[test]
fn test_types_sharing_a_module_are_rejected() {
    let err = render_err(
        r#"{ "types": [
        { "kind": "struct", "name": "HttpServer", "fields": [] },
        { "kind": "struct", "name": "HTTPServer", "fields": [] }
    ] }"#,
    );
    assert_eq!(
        err,
        SchemaError::NameCollision {
            type_name: "HTTPServer".to_string(),
            generated: "http_server.rs".to_string(),
            owner: "HttpServer".to_string(),
        }
    );
}

#[test]
fn test_types_shadowing_shared_artifacts_are_rejected() {
    let err = render_err(
        r#"{ "types": [ { "kind": "struct", "name": "DISPATCH", "fields": [] } ] }"#,
    );
    assert!(matches!(
        err,
        SchemaError::NameCollision { ref generated, ref owner, .. }
            if generated == "dispatch.rs" && owner == "the dispatch table"
    ));

    let err = render_err(
        r#"{ "types": [
        { "kind": "enum", "name": "MOD", "repr": "u8", "variants": [ { "name": "A", "value": 0 } ] }
    ] }"#,
    );
    assert!(matches!(
        err,
        SchemaError::NameCollision { ref generated, ref owner, .. }
            if generated == "mod.rs" && owner == "the registry listing"
    ));

    let err = render_err(
        r#"{ "types": [ { "kind": "struct", "name": "Null", "fields": [] } ] }"#,
    );
    assert!(matches!(
        err,
        SchemaError::NameCollision { ref generated, .. } if generated == "NULL_TAG"
    ));

    // An enum gets no tag constant, so `Null` is only a module name there.
    let json = r#"{ "types": [
        { "kind": "enum", "name": "Null", "repr": "u8", "variants": [ { "name": "A", "value": 0 } ] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    assert!(render(&decls, &RustEmitter).is_ok());
}

#[test]
fn test_name_collision_writes_nothing() {
    let json = r#"{ "types": [
        { "kind": "struct", "name": "Point3D", "fields": [] },
        { "kind": "struct", "name": "Point3_D", "fields": [] }
    ] }"#;
    let decls = Manifest::from_json(json).unwrap().types;
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    let err = generate(&decls, &GenConfig::new(&out)).unwrap_err();
    assert!(err.to_string().contains("Point3_D would generate point3_d.rs"));
    assert!(!out.exists());
}
