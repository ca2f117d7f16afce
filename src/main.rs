use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use fitcoach_analysis::config::AppConfig;
use fitcoach_analysis::db::Database;
use fitcoach_analysis::file_writer::write_results_to_file;
use fitcoach_analysis::logging::{init_logging, OperationTimer};
use fitcoach_analysis::models::{OutputFormat, Role};
use fitcoach_analysis::nlp::keyword_scores;
use fitcoach_analysis::repository::{IdentityResolver, MessageStore, NutritionStore, WorkoutStore};
use fitcoach_analysis::validation::InputValidator;
use fitcoach_analysis::{generate_analysis_report, AnalysisService, OpenAiCompatibleClient, SqliteRepository};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over defaults and config/ files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database
    InitDb,
    /// Register an external identity
    AddUser {
        /// Identity issued by the auth system
        #[arg(short, long)]
        external_id: String,
    },
    /// Append a chat turn for a user
    AddMessage {
        /// External identity
        #[arg(short, long)]
        user: String,

        /// user or assistant
        #[arg(short, long)]
        role: String,

        /// Message text
        #[arg(short, long)]
        content: String,
    },
    /// Analyze the latest user/assistant pair
    Analyze {
        /// External identity
        #[arg(short, long)]
        user: String,
    },
    /// Analyze the most recent messages as one window
    AnalyzeWindow {
        /// External identity
        #[arg(short, long)]
        user: String,

        /// Number of messages (defaults to analysis.window_size)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Keyword-only analysis of the latest message
    Quick {
        /// External identity
        #[arg(short, long)]
        user: String,
    },
    /// Analyze several users one after another
    Batch {
        /// Comma-separated identities (all registered users if omitted)
        #[arg(short, long, value_delimiter = ',')]
        users: Option<Vec<String>>,

        /// Write results to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (json or csv)
        #[arg(short, long, default_value = "json")]
        format: String,
    },
    /// Classify text offline by keyword
    Classify {
        /// Text to classify
        #[arg(short, long)]
        text: String,
    },
    /// Show stored workout plan and nutrition history for a user
    Show {
        /// External identity
        #[arg(short, long)]
        user: String,
    },
    /// Show row counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = init_logging(
        Some(&config.logging.level),
        &config.logging.format,
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting fitcoach-analysis");

    // Initialize database with configuration
    let database = Database::with_config(&config.database).context("Failed to open database")?;
    let repository = Arc::new(SqliteRepository::new(database.clone()));

    // Process command
    match cli.command {
        Commands::InitDb => {
            info!(path = %config.database.path, "Database initialized");
        }
        Commands::AddUser { external_id } => {
            InputValidator::validate_external_id(&external_id)?;
            let user = repository.register_user(&external_id).await?;
            emit(&user)?;
        }
        Commands::AddMessage { user, role, content } => {
            let role: Role = role.parse()?;
            let content = InputValidator::sanitize_text(&content);
            if content.is_empty() {
                return Err(anyhow!("Message content cannot be empty"));
            }
            let user_id = require_user(repository.as_ref(), &user).await?;
            let message = repository.insert_message(user_id, role, &content).await?;
            emit(&message)?;
        }
        Commands::Analyze { user } => {
            let service = build_service(&repository, &config)?;
            emit(&service.analyze_latest_pair(&user).await)?;
        }
        Commands::AnalyzeWindow { user, limit } => {
            if let Some(limit) = limit {
                InputValidator::validate_window_size(limit)?;
            }
            let service = build_service(&repository, &config)?;
            emit(&service.analyze_window(&user, limit).await)?;
        }
        Commands::Quick { user } => {
            let service = build_service(&repository, &config)?;
            emit(&service.quick_analysis(&user).await)?;
        }
        Commands::Batch { users, output, format } => {
            run_batch(&repository, &config, users, output.as_deref(), &format).await?;
        }
        Commands::Classify { text } => {
            let scores = keyword_scores(&text);
            emit(&serde_json::json!({
                "classification": scores.label(),
                "workoutScore": scores.workout,
                "nutritionScore": scores.nutrition,
            }))?;
        }
        Commands::Show { user } => {
            let user_id = require_user(repository.as_ref(), &user).await?;
            let workouts = repository.workout_changes(user_id).await?;
            let nutrition = repository.nutrition_history(user_id).await?;
            emit(&serde_json::json!({
                "userId": user_id,
                "workoutChanges": workouts,
                "nutritionHistory": nutrition,
            }))?;
        }
        Commands::Stats => {
            emit(&database.get_tracking_stats()?)?;
        }
    }

    Ok(())
}

fn build_service(repository: &Arc<SqliteRepository>, config: &AppConfig) -> Result<AnalysisService> {
    if config.llm.api_key.is_empty() {
        warn!("No LLM API key configured; model calls will likely fail and fall back");
    }
    let client = OpenAiCompatibleClient::new(&config.llm)?;
    Ok(AnalysisService::from_repository(
        repository.clone(),
        Arc::new(client),
        config,
    )?)
}

async fn run_batch(
    repository: &Arc<SqliteRepository>,
    config: &AppConfig,
    users: Option<Vec<String>>,
    output: Option<&Path>,
    format: &str,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    if let Some(path) = output {
        InputValidator::validate_file_path(path)?;
    }

    let identities = match users {
        Some(users) => users
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect(),
        None => repository
            .list_users()
            .await?
            .into_iter()
            .map(|u| u.external_id)
            .collect::<Vec<_>>(),
    };
    info!(users = identities.len(), "Starting batch analysis");

    let timer = OperationTimer::new("batch_analysis");
    let service = build_service(repository, config)?;
    let results = service.batch_analysis(&identities).await;
    let report = generate_analysis_report(&results);
    timer.finish();

    if let Some(path) = output {
        write_results_to_file(&results, &report, format, path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!(path = %path.display(), "Results written");
    }

    emit(&report)
}

async fn require_user(resolver: &dyn IdentityResolver, external_id: &str) -> Result<i64> {
    resolver
        .resolve(external_id)
        .await?
        .ok_or_else(|| anyhow!("User not found: {external_id}"))
}

/// Print a value as pretty JSON on stdout
#[allow(clippy::print_stdout)]
fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
