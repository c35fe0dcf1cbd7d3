//! CLI for `openapi-transform`.
//!
//! # Subcommands
//!
//! ```text
//! # Rewrite every source spec for the SDK generators
//! openapi-transform transform --input-dir source_specs --output-dir generated_specs
//!
//! # Migrate the code samples of a merged spec in place
//! openapi-transform samples --input generated_specs/client_rest.yaml
//!
//! # Report object schemas missing additionalProperties
//! openapi-transform audit --dir generated_specs --csv openapi-object-audit.csv
//!
//! # Check that every client SDK release was built from the same commits
//! openapi-transform check-releases
//!
//! # HTML diff of the published source spec against the local copy
//! openapi-transform diff --open
//! ```

#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use openapi_transform::diff::{self, DiffOptions};
use openapi_transform::{release, samples, Auditor, GhCli, Outcome, Pipeline, ProjectConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// OpenAPI spec rewriting, auditing and release checks for the SDK pipeline.
#[derive(Parser)]
#[command(name = "openapi-transform", version, about)]
enum Cli {
    /// Rewrite every spec in a directory and write the results to another.
    Transform(TransformArgs),

    /// Rewrite the code samples embedded in one spec file.
    Samples(SamplesArgs),

    /// Audit object schemas for explicit `additionalProperties`.
    Audit(AuditArgs),

    /// Compare the commit stamps of the latest client SDK releases.
    ///
    /// Requires the GitHub CLI (`gh`) to be installed and authenticated.
    CheckReleases(ConfigArgs),

    /// Generate an HTML diff of the published source spec against the local
    /// copy. Requires `openapi-changes` to be installed.
    Diff(DiffArgs),
}

#[derive(Parser)]
struct ConfigArgs {
    /// Path to a project config YAML file. Built-in defaults apply when
    /// omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
struct TransformArgs {
    /// Directory holding the source specs.
    #[arg(long, default_value = "source_specs")]
    input_dir: PathBuf,

    /// Directory the transformed specs are written to (created if missing).
    #[arg(long, default_value = "generated_specs")]
    output_dir: PathBuf,

    /// Commit identifier recorded in each transformed spec.
    #[arg(long, env = "OPEN_API_COMMIT_SHA")]
    commit_sha: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser)]
struct SamplesArgs {
    /// Spec file whose code samples are rewritten.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path. Defaults to overwriting `--input`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Server URL injected into client constructors.
    /// Overrides `code_samples.server_url` from the config file.
    #[arg(long)]
    server_url: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser)]
struct AuditArgs {
    /// Directory holding the specs to audit.
    #[arg(long, default_value = "generated_specs")]
    dir: PathBuf,

    /// Also write the findings as CSV to this path.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Parser)]
struct DiffArgs {
    /// Open the HTML report after generation.
    #[arg(short, long)]
    open: bool,

    /// Custom location for the report (default: a temporary directory).
    #[arg(long)]
    report_file: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse() {
        Cli::Transform(args) => run_transform(&args),
        Cli::Samples(args) => run_samples(&args),
        Cli::Audit(args) => run_audit(&args),
        Cli::CheckReleases(args) => run_check_releases(&args),
        Cli::Diff(args) => run_diff(&args),
    }
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<ProjectConfig> {
    match &args.config {
        Some(path) => ProjectConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ProjectConfig::default()),
    }
}

fn run_transform(args: &TransformArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let pipeline = Pipeline::new(&config);

    let results = pipeline
        .transform_dir(&args.input_dir, &args.output_dir, args.commit_sha.as_deref())
        .with_context(|| format!("Failed to transform {}", args.input_dir.display()))?;

    let mut failed = 0;
    for file in &results {
        let name = file.input.display();
        match &file.result {
            Ok((Outcome::Transformed(_), output)) => {
                eprintln!("✅ {name} → {}", output.display());
            }
            Ok((Outcome::Unchanged { reason, .. }, output)) => {
                eprintln!("⚠️  {name} → {} (unchanged: {reason})", output.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("❌ {name}: {e}");
            }
        }
    }

    eprintln!(
        "\nProcessed {} file(s): {} ok, {failed} failed",
        results.len(),
        results.len() - failed
    );
    if failed > 0 {
        bail!("{failed} spec file(s) failed to transform");
    }
    Ok(())
}

fn run_samples(args: &SamplesArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?.code_samples;
    if let Some(url) = &args.server_url {
        config.server_url = Some(url.clone());
    }

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let filename = file_name(&args.input);
    let output = samples::transform(&content, &filename, &config)
        .with_context(|| format!("Failed to rewrite code samples in {}", args.input.display()))?;

    let output_path = args.output.as_ref().unwrap_or(&args.input);
    fs::write(output_path, output)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    eprintln!("✅ Code samples written to {}", output_path.display());
    Ok(())
}

fn run_audit(args: &AuditArgs) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        bail!("Directory {} does not exist", args.dir.display());
    }
    eprintln!("🔍 Auditing directory: {}", args.dir.display());

    let mut auditor = Auditor::new();
    auditor
        .audit_dir(&args.dir)
        .with_context(|| format!("Failed to list {}", args.dir.display()))?;
    let report = auditor.finish();

    println!("{}", openapi_transform::render_console(&report));

    if let Some(csv_path) = &args.csv {
        fs::write(csv_path, openapi_transform::render_csv(&report))
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        eprintln!("✅ CSV report generated: {}", csv_path.display());
    }

    if !report.errors.is_empty() {
        bail!("{} spec file(s) could not be audited", report.errors.len());
    }
    Ok(())
}

fn run_check_releases(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args)?.releases;
    eprintln!("Checking latest releases in API client repositories...\n");

    let report = release::check(&GhCli::new(&config), &config);
    println!("{report}");

    if report.is_in_sync() {
        println!("🎉 Ready to trigger generate-code-samples.yml workflow!");
        Ok(())
    } else {
        bail!("client releases are not in sync")
    }
}

fn run_diff(args: &DiffArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?.diff;
    let options = DiffOptions {
        report_file: args.report_file.clone(),
        open: args.open,
    };

    eprintln!("📥 Downloading {} ...", config.remote_url);
    let report = diff::generate_report(&config, &options).context("Failed to generate diff report")?;

    eprintln!("✨ Process finished successfully");
    eprintln!("📄 Report written to: {}", report.report_file.display());
    if args.open && !report.opened {
        eprintln!("ℹ️  Could not auto-open report; open it manually.");
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
