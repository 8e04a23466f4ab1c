//! `trajectory`: build and query disease-trajectory graphs.
//!
//! Usage:
//!   trajectory --config trajectory.toml build
//!   trajectory --config trajectory.toml ingest-visits
//!   trajectory --config trajectory.toml resolve "diabetes"
//!   trajectory --config trajectory.toml complications E11 --max-years 5
//!   trajectory --config trajectory.toml ask "I have diabetes. What could happen within 5 years?"
//!   trajectory --config trajectory.toml fingerprint

mod store;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trajectory_config::TrajectoryConfig;
use trajectory_contracts::{
    diagnosis::DiagnosisCode,
    error::{TrajectoryError, TrajectoryResult},
    policy::IngestionMode,
    query::{Answer, Resolution},
};
use trajectory_core::{CodeDictionary, PatientRowReader};
use trajectory_graph::Ingestor;
use trajectory_query::{ComplicationQuery, QuestionAnswerer};

use crate::store::OpenedStore;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Disease-trajectory graph builder and query tool.
#[derive(Parser)]
#[command(
    name = "trajectory",
    about = "Build and query disease-trajectory graphs",
    long_about = "Turns per-patient visit histories into a graph of diagnosis progressions\n\
                  with interval statistics, and answers questions about likely complications."
)]
struct Cli {
    /// TOML configuration file. Every setting has a default.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest patients in the mode set by `ingestion.mode`.
    Ingest(InputArgs),
    /// Clear the store and write diagnoses and progression edges.
    Build(InputArgs),
    /// Merge patients, diagnoses and visit edges into the existing store.
    IngestVisits(InputArgs),
    /// Map free text to a diagnosis code.
    Resolve {
        text: String,
    },
    /// List the conditions that follow a diagnosis.
    Complications {
        code: String,
        /// Keep only progressions whose average, median or maximum interval
        /// is within this many years.
        #[arg(long)]
        max_years: Option<u32>,
    },
    /// Answer a natural-language question.
    Ask {
        question: String,
    },
    /// Print the SHA-256 fingerprint of the memory store.
    Fingerprint,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Reference table, overriding `input.reference_table`.
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Patient file, overriding `input.patients`.
    #[arg(long)]
    patients: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(cli) {
        eprintln!("trajectory error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> TrajectoryResult<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest(args) => {
            let mode = config.ingestion.mode;
            ingest(&config, args, mode)
        }
        Command::Build(args) => ingest(&config, args, IngestionMode::Rebuild),
        Command::IngestVisits(args) => ingest(&config, args, IngestionMode::MergeVisits),
        Command::Resolve { text } => resolve(&config, &text),
        Command::Complications { code, max_years } => complications(&config, &code, max_years),
        Command::Ask { question } => ask(&config, &question),
        Command::Fingerprint => {
            let store = OpenedStore::open(&config.store)?;
            println!("{}", store.fingerprint()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> TrajectoryResult<TrajectoryConfig> {
    let config = match path {
        Some(path) => TrajectoryConfig::from_file(path)?,
        None => TrajectoryConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

fn ingest(config: &TrajectoryConfig, args: InputArgs, mode: IngestionMode) -> TrajectoryResult<()> {
    let reference = required(args.reference, &config.input.reference_table, "input.reference_table")?;
    let patients = required(args.patients, &config.input.patients, "input.patients")?;

    let dictionary = CodeDictionary::load_from_path(&reference, &config.input.reference_columns)?;
    let rows = PatientRowReader::open(&patients, &config.input.patient_columns)?;
    let strata = config.strata.scheme();
    let settings = trajectory_config::IngestionConfig {
        mode,
        ..config.ingestion.clone()
    };

    let store = OpenedStore::open(&config.store)?;
    let handle = store.handle();
    let report = Ingestor::new(handle.as_ref(), &dictionary, &strata, settings).run(rows)?;
    store.close()?;

    info!(run_id = %report.run_id, "ingestion finished");
    let summary = serde_json::to_string_pretty(&report).map_err(|e| TrajectoryError::Io {
        path: "<stdout>".to_string(),
        reason: e.to_string(),
    })?;
    println!("{}", summary);
    Ok(())
}

fn required(flag: Option<PathBuf>, configured: &Option<PathBuf>, key: &str) -> TrajectoryResult<PathBuf> {
    flag.or_else(|| configured.clone())
        .ok_or_else(|| TrajectoryError::ConfigError {
            reason: format!("{} is not set and no path was given on the command line", key),
        })
}

// ── Queries ───────────────────────────────────────────────────────────────────

fn query(config: &TrajectoryConfig) -> TrajectoryResult<ComplicationQuery> {
    let store = OpenedStore::open(&config.store)?;
    Ok(ComplicationQuery::new(store.handle(), &config.query))
}

fn resolve(config: &TrajectoryConfig, text: &str) -> TrajectoryResult<()> {
    match query(config)?.resolve_diagnosis(text)? {
        Resolution::Found(code) => println!("{}", code),
        Resolution::NotFound => println!("no diagnosis matches '{}'", text),
    }
    Ok(())
}

fn complications(config: &TrajectoryConfig, code: &str, max_years: Option<u32>) -> TrajectoryResult<()> {
    let found = query(config)?.get_complications(&DiagnosisCode::new(code), max_years)?;
    if found.is_empty() {
        println!("no complications recorded for {}", code);
        return Ok(());
    }
    println!("{:<12} {:<40} {:>9} {:>8} {:>8} {:>5} {:>5}", "CODE", "NAME", "FREQUENCY", "AVG", "MEDIAN", "MIN", "MAX");
    for c in &found {
        println!(
            "{:<12} {:<40} {:>9} {:>8} {:>8} {:>5} {:>5}",
            c.complication_code, c.name, c.frequency, c.avg_years, c.median_years, c.min_years, c.max_years
        );
    }
    Ok(())
}

fn ask(config: &TrajectoryConfig, question: &str) -> TrajectoryResult<()> {
    let answerer = QuestionAnswerer::with_defaults(query(config)?);
    match answerer.answer(question) {
        Answer::Success { response, .. } => println!("{}", response),
        Answer::Failure(failure) => println!("{}", failure),
    }
    Ok(())
}
