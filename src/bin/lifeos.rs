//! LifeOS CLI - Command-line interface for LifeOS dimension scoring
//!
//! Commands:
//! - score: Derive dimension snapshots from an atom export
//! - validate: Check atom timestamps and metadata
//! - doctor: Diagnose configuration and store health
//! - schema: Print input, output or configuration schema

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use tracing_subscriber::prelude::*;

use lifeos_dimensions::metadata;
use lifeos_dimensions::store::{parse_atoms_json, parse_atoms_ndjson};
use lifeos_dimensions::types::parse_timestamp;
use lifeos_dimensions::{
    refresh, Atom, AtomType, BehavioralProvider, DimensionConfig, DimensionError,
    InMemoryAtomStore, ReflectionProvider, PRODUCER_NAME, VERSION,
};

/// LifeOS - On-device scoring engine for life-tracking dashboards
#[derive(Parser)]
#[command(name = "lifeos")]
#[command(version = VERSION)]
#[command(about = "Derive dimension dashboards from LifeOS atoms", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive dimension snapshots from an atom export
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Dimension to score
        #[arg(long, default_value = "all")]
        dimension: Dimension,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Local UTC offset in minutes, overriding the configuration
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<i32>,

        /// Anchor time (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },

    /// Check atom timestamps and metadata
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and store health
    Doctor {
        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Atom export to check (.json, .ndjson or .jsonl)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of atoms
    Json,
    /// Newline-delimited JSON (one atom per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Dimension {
    Behavioral,
    Reflection,
    All,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Atom input record
    Input,
    /// Score output document
    Output,
    /// Default configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "lifeos_dimensions=debug"
    } else {
        "lifeos_dimensions=warn"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    // stdout carries the JSON output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), LifeosCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            input_format,
            output_format,
            dimension,
            config,
            utc_offset,
            now,
        } => cmd_score(
            &input,
            &output,
            input_format,
            output_format,
            dimension,
            config.as_deref(),
            utc_offset,
            now.as_deref(),
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            config,
            store,
            json,
        } => cmd_doctor(config.as_deref(), store.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_score(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    dimension: Dimension,
    config_path: Option<&Path>,
    utc_offset: Option<i32>,
    now: Option<&str>,
) -> Result<(), LifeosCliError> {
    let mut config = match config_path {
        Some(path) => DimensionConfig::load(path)?,
        None => DimensionConfig::default(),
    };
    if let Some(minutes) = utc_offset {
        config.utc_offset_minutes = minutes;
    }
    config.validate()?;

    let now: DateTime<Utc> = match now {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let atoms = read_atoms(input, &input_format)?;
    if atoms.is_empty() {
        return Err(LifeosCliError::NoAtoms);
    }
    let store = InMemoryAtomStore::from_atoms(atoms);

    let mut document = serde_json::Map::new();
    document.insert("producer".to_string(), PRODUCER_NAME.into());
    document.insert("version".to_string(), VERSION.into());
    document.insert("computedAt".to_string(), serde_json::to_value(now)?);

    if matches!(dimension, Dimension::Behavioral | Dimension::All) {
        let snapshot = refresh(&BehavioralProvider::new(&config)?, &store, now);
        document.insert("behavioral".to_string(), serde_json::to_value(snapshot)?);
    }
    if matches!(dimension, Dimension::Reflection | Dimension::All) {
        let snapshot = refresh(&ReflectionProvider::new(&config)?, &store, now);
        document.insert("reflection".to_string(), serde_json::to_value(snapshot)?);
    }

    let document = serde_json::Value::Object(document);
    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&document)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&document)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), LifeosCliError> {
    let atoms = read_atoms(input, &input_format)?;

    let mut by_type: BTreeMap<AtomType, usize> = BTreeMap::new();
    let mut errors: Vec<ValidationErrorDetail> = Vec::new();
    let mut deleted = 0;

    for (index, atom) in atoms.iter().enumerate() {
        *by_type.entry(atom.atom_type).or_insert(0) += 1;
        if atom.is_deleted {
            deleted += 1;
        }
        if let Err(e) = parse_timestamp(&atom.created_at) {
            errors.push(ValidationErrorDetail {
                index,
                atom_id: atom.id.clone(),
                error: e.to_string(),
            });
        }
        if let Err(e) = metadata::validate(atom) {
            errors.push(ValidationErrorDetail {
                index,
                atom_id: atom.id.clone(),
                error: e.to_string(),
            });
        }
    }

    let invalid_atoms = errors
        .iter()
        .map(|e| e.index)
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    let report = ValidationReport {
        total_atoms: atoms.len(),
        valid_atoms: atoms.len() - invalid_atoms,
        invalid_atoms,
        deleted_atoms: deleted,
        atoms_by_type: by_type,
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total atoms:   {}", report.total_atoms);
        println!("Valid atoms:   {}", report.valid_atoms);
        println!("Invalid atoms: {}", report.invalid_atoms);
        println!("Deleted atoms: {}", report.deleted_atoms);

        println!("\nBy type:");
        for (atom_type, count) in &report.atoms_by_type {
            println!("  {:?}: {}", atom_type, count);
        }

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Atom {} (index {}): {}", err.atom_id, err.index, err.error);
            }
        }
    }

    // Invalid atoms degrade gracefully when scored, but validation still fails
    if report.invalid_atoms > 0 {
        Err(LifeosCliError::ValidationFailed(report.invalid_atoms))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, store: Option<&Path>, json: bool) -> Result<(), LifeosCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    match config {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Configuration file does not exist, defaults apply".to_string(),
        }),
        Some(path) => checks.push(match DimensionConfig::load(path) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Configuration valid (UTC offset {} min, trend threshold {})",
                    config.utc_offset_minutes, config.trend_threshold
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid configuration: {}", e),
            },
        }),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "No configuration file, defaults apply".to_string(),
        }),
    }

    if let Some(path) = store {
        checks.push(match InMemoryAtomStore::load(path) {
            Ok(store) if store.is_empty() => DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Warning,
                message: "Atom export is empty".to_string(),
            },
            Ok(store) => DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Ok,
                message: format!("Atom export loaded ({} atoms)", store.len()),
            },
            Err(e) => DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot load atom export: {}", e),
            },
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use --input - to score it)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("LifeOS Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LifeosCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), LifeosCliError> {
    match schema_type {
        SchemaType::Input => println!("{}", input_json_schema()),
        SchemaType::Config => println!("{}", DimensionConfig::default().to_json()?),
        SchemaType::Output => {
            println!("Score output document:");
            println!();
            println!("- producer, version, computedAt");
            println!("- behavioral: {{ index, components, streaks, predictions, unimplementedMetrics }}");
            println!("- reflection: {{ index, components, streaks, themes, moodTimeline, moodBuckets,");
            println!("                grailInsights, predictions }}");
            println!();
            println!("index: {{ score 0-100, confidence 0-1, trend rising|stable|falling,");
            println!("         subScores {{ name: 0-100 }}, dataAgeSeconds }}");
            println!("components[]: {{ name, currentScore, trend, status, reading }}");
            println!("streaks[]: {{ name, category, currentDays, personalBest, daysToNextMilestone,");
            println!("             isEndangered, xpPerDay, milestoneXP }}");
        }
    }

    Ok(())
}

// Helper functions

fn read_atoms(input: &Path, format: &InputFormat) -> Result<Vec<Atom>, LifeosCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let atoms = match format {
        InputFormat::Json => parse_atoms_json(&input_data)?,
        InputFormat::Ndjson => parse_atoms_ndjson(&input_data)?,
    };
    Ok(atoms)
}

fn input_json_schema() -> String {
    let types: Vec<serde_json::Value> = AtomType::ALL
        .iter()
        .filter_map(|t| serde_json::to_value(t).ok())
        .collect();

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "lifeos.atom",
        "description": "LifeOS atom record",
        "type": "object",
        "required": ["id", "type", "createdAt"],
        "properties": {
            "id": { "type": "string" },
            "type": { "type": "string", "enum": types },
            "title": { "type": "string" },
            "body": { "type": ["string", "null"] },
            "metadata": { "type": ["object", "null"] },
            "createdAt": { "type": "string", "format": "date-time" },
            "isDeleted": { "type": "boolean", "default": false }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum LifeosCliError {
    Io(io::Error),
    Dimension(DimensionError),
    Json(serde_json::Error),
    NoAtoms,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for LifeosCliError {
    fn from(e: io::Error) -> Self {
        LifeosCliError::Io(e)
    }
}

impl From<DimensionError> for LifeosCliError {
    fn from(e: DimensionError) -> Self {
        LifeosCliError::Dimension(e)
    }
}

impl From<serde_json::Error> for LifeosCliError {
    fn from(e: serde_json::Error) -> Self {
        LifeosCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LifeosCliError> for CliError {
    fn from(e: LifeosCliError) -> Self {
        match e {
            LifeosCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LifeosCliError::Dimension(e) => {
                let (code, hint) = match &e {
                    DimensionError::InvalidConfig(_) | DimensionError::InvalidTimezone(_) => {
                        ("CONFIG_ERROR", "Run 'lifeos schema config' for the defaults")
                    }
                    DimensionError::DateParseError(_) => {
                        ("DATE_ERROR", "Use an RFC 3339 timestamp, e.g. 2024-06-10T08:00:00Z")
                    }
                    _ => ("PARSE_ERROR", "Run 'lifeos validate' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            LifeosCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LifeosCliError::NoAtoms => CliError {
                code: "NO_ATOMS".to_string(),
                message: "No atoms found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            LifeosCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} atoms failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            LifeosCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_atoms: usize,
    valid_atoms: usize,
    invalid_atoms: usize,
    deleted_atoms: usize,
    atoms_by_type: BTreeMap<AtomType, usize>,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    atom_id: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
