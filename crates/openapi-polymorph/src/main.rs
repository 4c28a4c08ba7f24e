//! CLI for `openapi-polymorph`.
//!
//! ```text
//! # Rewrite in place of stdout
//! openapi-polymorph --input openapi.yaml > openapi.poly.yaml
//!
//! # Project config plus overrides, JSON output inferred from the extension
//! openapi-polymorph \
//!   --input openapi.yaml \
//!   --output openapi.json \
//!   --config api/openapi/polymorph.yaml \
//!   --merge-nested --deny-warnings
//! ```

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use openapi_polymorph::{Format, ProjectConfig, Report, TransformOptions};
use tracing::level_filters::LevelFilter;

/// Rewrite `allOf` + `discriminator` inheritance into `oneOf` union wrappers.
#[derive(Parser)]
#[command(name = "openapi-polymorph", version, about)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input `OpenAPI` document (YAML or JSON).
    #[arg(short, long)]
    input: PathBuf,

    /// Path to the output document. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a project config YAML file.
    ///
    /// CLI flags override values from the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format. Inferred from `--output`, then `--input`, else YAML.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Wrapper name suffix. Overrides `wrapper_suffix` from the config file.
    #[arg(long)]
    suffix: Option<String>,

    /// Do not add `const` discriminator tags to concrete children.
    #[arg(long)]
    no_const: bool,

    /// Do not wrap base schemas with a single specialization.
    #[arg(long)]
    ignore_single: bool,

    /// Inline referenced pure unions into their referring union.
    #[arg(long)]
    merge_nested: bool,

    /// Remove schemas that nothing references after the rewrite.
    #[arg(long)]
    prune_unused: bool,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit with an error when the run produced warnings.
    #[arg(long)]
    deny_warnings: bool,

    /// Enable verbose logging (sets log level to debug).
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Format::Yaml,
            OutputFormat::Json => Format::Json,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for the document
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let project = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading config");
            ProjectConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => ProjectConfig::default(),
    };

    let options = TransformOptions::new().with_project_config(&project);
    let options = apply_cli_overrides(options, cli);
    let format = resolve_format(cli.format, cli.output.as_deref(), &cli.input);

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input: {}", cli.input.display()))?;

    let processed = openapi_polymorph::process(&input, &options, format)
        .with_context(|| format!("Failed to transform {}", cli.input.display()))?;

    match &cli.output {
        Some(path) => fs::write(path, &processed.output)
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(processed.output.as_bytes())
            .context("Failed to write output to stdout")?,
    }

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&processed.report)
            .context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    eprintln!("{}", summary(&processed.report));

    if cli.deny_warnings && !processed.report.is_clean() {
        bail!(
            "{} warning(s) reported and --deny-warnings is set",
            processed.report.warnings.len()
        );
    }
    Ok(())
}

/// Apply CLI flags that override config file values.
fn apply_cli_overrides(mut options: TransformOptions, cli: &Cli) -> TransformOptions {
    if let Some(suffix) = &cli.suffix {
        options = options.wrapper_suffix(suffix);
    }

    // One-directional: flags can only switch behavior on or off relative to defaults
    if cli.no_const {
        options = options.add_discriminator_const(false);
    }
    if cli.ignore_single {
        options = options.ignore_single_specialization(true);
    }
    if cli.merge_nested {
        options = options.merge_nested_one_of(true);
    }
    if cli.prune_unused {
        options = options.remove_unused_schemas(true);
    }

    options
}

/// Explicit flag, then output extension, then input extension, else YAML.
fn resolve_format(explicit: Option<OutputFormat>, output: Option<&Path>, input: &Path) -> Format {
    explicit
        .map(Format::from)
        .or_else(|| output.and_then(Format::from_path))
        .or_else(|| Format::from_path(input))
        .unwrap_or_default()
}

fn summary(report: &Report) -> String {
    format!(
        "Created {} schema(s), removed {}, stripped {} discriminator(s), {} warning(s)",
        report.created.len(),
        report.removed.len(),
        report.stripped_discriminators.len(),
        report.warnings.len(),
    )
}
