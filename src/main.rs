use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flight_insights::config::AppConfig;
use flight_insights::dataset::DatasetStore;
use flight_insights::dispatcher::{QueryDispatcher, QuerySettings};
use flight_insights::intent::Intent;
use flight_insights::logging::{init_logging, OperationTimer};
use flight_insights::metrics::MetricsCollector;
use flight_insights::service::QueryService;
use flight_insights::validation::InputValidator;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bookings CSV (overrides configuration)
    #[arg(long, global = true)]
    bookings: Option<PathBuf>,

    /// Failure report CSV (overrides configuration)
    #[arg(long, global = true)]
    failures: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question, e.g. "Which airline has the most flights?"
        question: String,

        /// Pretty-print the JSON envelope
        #[arg(long)]
        pretty: bool,
    },
    /// Answer every non-empty line of a file
    Batch {
        /// File with one question per line
        file: PathBuf,
    },
    /// List the questions that can be answered
    Intents,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let _guard = init_logging(
        Some(&log_level),
        config.logging.file_path.as_deref().map(Path::new),
        config.json_logs(),
    )?;
    MetricsCollector::init()?;

    info!("Starting flight-insights");

    match &cli.command {
        Commands::Intents => list_intents(),
        Commands::Ask { question, pretty } => {
            let dispatcher = build_dispatcher(&cli, &config)?;
            ask(&dispatcher, question, *pretty)?;
        },
        Commands::Batch { file } => {
            let dispatcher = build_dispatcher(&cli, &config)?;
            run_batch(dispatcher, &config, file).await?;
        },
    }

    Ok(())
}

/// Load the dataset and wire up a dispatcher
fn build_dispatcher(cli: &Cli, config: &AppConfig) -> Result<QueryDispatcher> {
    let timer = OperationTimer::new("startup");

    let bookings_path = cli
        .bookings
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.get_bookings_path()));
    InputValidator::validate_data_path(&bookings_path)?;

    let failures_path = cli
        .failures
        .clone()
        .or_else(|| config.get_failures_path().map(PathBuf::from));

    info!("Loading bookings from: {}", bookings_path.display());
    let store = DatasetStore::load(&bookings_path, failures_path.as_deref(), config.data.failures_skip_rows)
        .with_context(|| format!("Failed to load bookings from {}", bookings_path.display()))?;

    let dispatcher = QueryDispatcher::new(Arc::new(store), QuerySettings::from(&config.query))?;
    timer.finish();
    Ok(dispatcher)
}

/// Print the supported phrasings
fn list_intents() {
    for intent in Intent::all() {
        println!("{:<30} {}", intent.name(), intent.example());
    }
}

/// Answer one question and print its envelope
fn ask(dispatcher: &QueryDispatcher, question: &str, pretty: bool) -> Result<()> {
    let question = InputValidator::sanitize_text(question);
    let envelope = dispatcher.process_query(&question);

    let json = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{json}");
    Ok(())
}

/// Submit every line through the job service and print one JSON line each
async fn run_batch(dispatcher: QueryDispatcher, config: &AppConfig, file: &Path) -> Result<()> {
    let contents =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read questions from {}", file.display()))?;

    let service = QueryService::new(
        Arc::new(dispatcher),
        config.query.max_query_length,
        config.service.result_retention,
    );

    let questions: Vec<String> = contents
        .lines()
        .map(InputValidator::sanitize_text)
        .filter(|question| !question.is_empty())
        .collect();
    info!("Answering {} questions", questions.len());

    for item in service.run_batch(&questions).await {
        println!("{}", serde_json::to_string(&item)?);
    }

    Ok(())
}
