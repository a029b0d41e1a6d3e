//! bitwire-gen
//!
//! Generates Rust codec modules from a JSON type manifest.
//!
//! # Usage
//!
//! ```bash
//! # Generate into ./generated, keeping files that already exist
//! bitwire-gen types.json
//!
//! # Regenerate everything into src/wire
//! bitwire-gen types.json --output src/wire --force
//!
//! # Validate the manifest without writing anything
//! bitwire-gen types.json --check
//! ```

use anyhow::{Context, Result};
use bitwire::codegen::{self, GenConfig, RustEmitter};
use bitwire::schema::Manifest;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Generate bitwire codecs from a type manifest
#[derive(Parser, Debug)]
#[command(name = "bitwire-gen")]
#[command(about = "Generate bitwire codec sources from a JSON type manifest")]
#[command(version)]
struct Args {
    /// Manifest file (JSON)
    manifest: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "generated")]
    output: PathBuf,

    /// Overwrite per-type files that already exist
    #[arg(short, long)]
    force: bool,

    /// Only analyze the manifest; write nothing
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let json = fs::read_to_string(&args.manifest)
        .with_context(|| format!("Failed to read manifest {}", args.manifest.display()))?;
    let manifest = Manifest::from_json(&json)
        .with_context(|| format!("Failed to parse manifest {}", args.manifest.display()))?;
    tracing::debug!(types = manifest.types.len(), "loaded manifest");

    if args.check {
        let artifacts = codegen::render(&manifest.types, &RustEmitter)
            .context("Manifest rejected")?;
        println!(
            "{}: {} types OK ({} files would be generated)",
            args.manifest.display(),
            manifest.types.len(),
            artifacts.len()
        );
        return Ok(());
    }

    let config = GenConfig::new(&args.output).with_force(args.force);
    let report = codegen::generate(&manifest.types, &config).context("Generation failed")?;
    println!("{}: {}", config.output_dir.display(), report.summary());
    Ok(())
}
