//! Fitcoach Analysis - Conversation Analysis and Routing
//!
//! A Rust library that turns fitness-coaching chat conversations into
//! structured tracking records.
//!
//! # Features
//!
//! - Classify a conversation as workout, nutrition or neutral (LLM, with an
//!   offline bilingual keyword fallback)
//! - Extract workout plan changes and nutrition entries as validated records
//! - Upsert workout changes and append nutrition entries to SQLite
//! - Pair, window, quick and batch analysis workflows with a summary report
//! - Every model call bounded by a timeout and retry budget

/// Conversation lookups with soft failure
pub mod accessor;
/// Conversation classification
pub mod classifier;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Workout and nutrition extraction
pub mod extractors;
/// Result file output
pub mod file_writer;
/// Text-completion client and guarded calls
pub mod llm;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Keyword scoring
pub mod nlp;
/// Batch report generation
pub mod report;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Analysis orchestration
pub mod service;
/// JSON island extraction
pub mod utils;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use classifier::Classifier;
pub use db::Database;
pub use error::{PipelineError, Result};
pub use extractors::{Extraction, NutritionExtractor, WorkoutExtractor};
pub use llm::{CompletionClient, LlmGateway, LlmReply, OpenAiCompatibleClient};
pub use models::{AnalysisResult, ClassificationLabel, Message, OutputFormat, Role};
pub use report::{generate_analysis_report, AnalysisReport};
pub use repository::SqliteRepository;
pub use service::AnalysisService;
