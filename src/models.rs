//! Data models for conversation analysis and tracking storage
//!
//! This module contains the data structures shared by the pipeline:
//! chat messages, routing labels, the tracking records extracted from a
//! conversation, their database rows, and the per-run analysis result.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the end user
    User,
    /// Reply produced by the coaching assistant
    Assistant,
}

impl Role {
    /// Storage and prompt representation of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Speaker name used when rendering a transcript
    #[must_use]
    pub const fn speaker(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(PipelineError::InvalidRole(other.to_string())),
        }
    }
}

/// One stored turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Database primary key
    pub id: i64,
    /// Internal id of the owning user
    pub user_id: i64,
    /// Who wrote the message
    pub role: Role,
    /// Message text content
    pub content: String,
    /// Timestamp when the message was created
    pub created_at: NaiveDateTime,
}

/// Data for appending a new message
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Internal id of the owning user
    pub user_id: i64,
    /// Who wrote the message
    pub role: Role,
    /// Message text content
    pub content: String,
    /// Creation time (optional, defaults to now)
    pub created_at: Option<NaiveDateTime>,
}

/// Database representation of a user identity mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbUser {
    /// Internal user id
    pub id: i64,
    /// Identity issued by the external auth system
    pub external_id: String,
    /// Registration time
    pub created_at: NaiveDateTime,
}

/// The most recent user/assistant messages of a conversation.
///
/// Only the two newest messages are considered. When both share a role the
/// other slot stays empty.
#[derive(Debug, Clone, Default)]
pub struct LastPair {
    /// Most recent user message among the two newest messages
    pub user_message: Option<Message>,
    /// Most recent assistant message among the two newest messages
    pub assistant_message: Option<Message>,
    /// Internal user id, when the identity resolved
    pub user_id: Option<i64>,
}

impl LastPair {
    /// Both roles are present, so there is an exchange to analyze
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.user_message.is_some() && self.assistant_message.is_some()
    }
}

/// Routing decision for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationLabel {
    /// Conversation proposes a change to the exercise plan
    Workout,
    /// Conversation reports or plans food intake
    Nutrition,
    /// Nothing to track
    #[default]
    Neutral,
}

impl ClassificationLabel {
    /// All labels, in reporting order
    pub const ALL: [Self; 3] = [Self::Workout, Self::Nutrition, Self::Neutral];

    /// Lowercase label name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::Nutrition => "nutrition",
            Self::Neutral => "neutral",
        }
    }

    /// Map a free-text model reply onto the closed label set.
    ///
    /// The reply is trimmed and lowercased; anything other than an exact
    /// label name (including an empty reply) becomes `Neutral`.
    #[must_use]
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim().to_lowercase().as_str() {
            "workout" => Self::Workout,
            "nutrition" => Self::Nutrition,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workout change as the model emitted it, before validation.
///
/// Numeric fields are kept as raw JSON so numeric strings and integral
/// floats can be coerced during validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawWorkoutChange {
    /// Day label such as "Monday" or "Leg day"
    #[serde(default)]
    pub workout_day_name: Option<String>,
    /// Exercise name
    #[serde(default)]
    pub exercise_name: Option<String>,
    /// Planned sets
    #[serde(default)]
    pub required_sets: Option<Value>,
    /// Planned reps per set
    #[serde(default)]
    pub required_reps: Option<Value>,
    /// Planned resistance, unit included
    #[serde(default)]
    pub required_weight: Option<Value>,
    /// Suggested rest between sets, in seconds
    #[serde(default)]
    pub rest_seconds: Option<Value>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default)]
    pub workout_date: Option<String>,
}

/// A validated update to a user's exercise plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutChangeRecord {
    /// Day label such as "Monday"
    pub workout_day_name: String,
    /// Exercise name
    pub exercise_name: String,
    /// Planned sets (0-100)
    pub required_sets: Option<u32>,
    /// Planned reps (0-1000)
    pub required_reps: Option<u32>,
    /// Planned resistance, unit included
    pub required_weight: Option<String>,
    /// Rest between sets in seconds (0-3600)
    pub rest_seconds: Option<u32>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Calendar date the change applies to
    pub workout_date: NaiveDate,
}

/// Stored workout plan row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbWorkoutChange {
    /// Database primary key
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// The record as last written
    #[serde(flatten)]
    pub record: WorkoutChangeRecord,
    /// First insertion time
    pub created_at: NaiveDateTime,
    /// Last overwrite time
    pub updated_at: NaiveDateTime,
}

/// Nutrition entry as the model emitted it, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawNutritionChange {
    /// Calories eaten
    #[serde(default)]
    pub calories_consumed: Option<Value>,
    /// Daily calorie target
    #[serde(default)]
    pub calories_required: Option<Value>,
    /// Protein eaten, grams
    #[serde(default)]
    pub protein_consumed: Option<Value>,
    /// Protein target, grams
    #[serde(default)]
    pub protein_required: Option<Value>,
    /// Carbohydrates eaten, grams
    #[serde(default)]
    pub carbs_consumed: Option<Value>,
    /// Carbohydrate target, grams
    #[serde(default)]
    pub carbs_required: Option<Value>,
    /// Fat eaten, grams
    #[serde(default)]
    pub fat_consumed: Option<Value>,
    /// Fat target, grams
    #[serde(default)]
    pub fat_required: Option<Value>,
}

/// A validated nutrition tracking entry; every field is independent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionChangeRecord {
    /// Calories eaten (0-10,000)
    pub calories_consumed: Option<f64>,
    /// Daily calorie target (0-10,000)
    pub calories_required: Option<f64>,
    /// Protein eaten, grams (0-1,000)
    pub protein_consumed: Option<f64>,
    /// Protein target, grams (0-1,000)
    pub protein_required: Option<f64>,
    /// Carbohydrates eaten, grams (0-2,000)
    pub carbs_consumed: Option<f64>,
    /// Carbohydrate target, grams (0-2,000)
    pub carbs_required: Option<f64>,
    /// Fat eaten, grams (0-1,000)
    pub fat_consumed: Option<f64>,
    /// Fat target, grams (0-1,000)
    pub fat_required: Option<f64>,
}

impl NutritionChangeRecord {
    /// No field carries a value
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.calories_consumed.is_none()
            && self.calories_required.is_none()
            && self.protein_consumed.is_none()
            && self.protein_required.is_none()
            && self.carbs_consumed.is_none()
            && self.carbs_required.is_none()
            && self.fat_consumed.is_none()
            && self.fat_required.is_none()
    }
}

/// Stored nutrition log row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbNutritionEntry {
    /// Database primary key
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// The logged values
    #[serde(flatten)]
    pub record: NutritionChangeRecord,
    /// Store-assigned insertion time
    pub recorded_at: NaiveDateTime,
}

/// Entry point that produced an [`AnalysisResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// Last user/assistant pair, LLM classified
    Pair,
    /// Last N messages, LLM classified
    Window,
    /// Last message, keyword classified
    Quick,
}

impl Workflow {
    /// Name used in logs and metric labels
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "pair",
            Self::Window => "window",
            Self::Quick => "quick",
        }
    }
}

/// Uniform outcome of one analysis run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// External identity the run was requested for
    pub identity: String,
    /// The analysis itself completed
    pub success: bool,
    /// Routing decision
    pub classification: ClassificationLabel,
    /// Outcome of the workout extractor, if it ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_changes_saved: Option<bool>,
    /// Outcome of the nutrition extractor, if it ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_changes_saved: Option<bool>,
    /// Number of messages fed to the classifier
    pub messages_analyzed: usize,
    /// Resolved internal user id
    pub user_id: Option<i64>,
    /// Failure description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent, in milliseconds
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    /// A successful run with nothing to analyze
    #[must_use]
    pub fn nothing_to_analyze(identity: &str, user_id: Option<i64>) -> Self {
        Self {
            identity: identity.to_string(),
            success: true,
            classification: ClassificationLabel::Neutral,
            workout_changes_saved: None,
            nutrition_changes_saved: None,
            messages_analyzed: 0,
            user_id,
            error: None,
            processing_time_ms: 0,
        }
    }

    /// A run that could not complete
    #[must_use]
    pub fn failed(identity: &str, error: impl Into<String>) -> Self {
        Self {
            identity: identity.to_string(),
            success: false,
            classification: ClassificationLabel::Neutral,
            workout_changes_saved: None,
            nutrition_changes_saved: None,
            messages_analyzed: 0,
            user_id: None,
            error: Some(error.into()),
            processing_time_ms: 0,
        }
    }
}

/// Output format for written analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(PipelineError::Other(format!("Unsupported output format: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_reply_normalizes_case_and_whitespace() {
        assert_eq!(ClassificationLabel::from_reply("  Workout\n"), ClassificationLabel::Workout);
        assert_eq!(ClassificationLabel::from_reply("NUTRITION"), ClassificationLabel::Nutrition);
        assert_eq!(ClassificationLabel::from_reply("neutral"), ClassificationLabel::Neutral);
    }

    #[test]
    fn test_label_from_reply_collapses_unknown_to_neutral() {
        assert_eq!(ClassificationLabel::from_reply(""), ClassificationLabel::Neutral);
        assert_eq!(ClassificationLabel::from_reply("workout."), ClassificationLabel::Neutral);
        assert_eq!(ClassificationLabel::from_reply("workout, nutrition"), ClassificationLabel::Neutral);
        assert_eq!(ClassificationLabel::from_reply("I think this is about diet"), ClassificationLabel::Neutral);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().ok(), Some(Role::User));
        assert_eq!(" Assistant ".parse::<Role>().ok(), Some(Role::Assistant));
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn test_empty_nutrition_record() {
        assert!(NutritionChangeRecord::default().is_empty());
        let record = NutritionChangeRecord {
            fat_required: Some(70.0),
            ..NutritionChangeRecord::default()
        };
        assert!(!record.is_empty());
    }

    #[test]
    fn test_analysis_result_serializes_camel_case() {
        let result = AnalysisResult::nothing_to_analyze("user_123", Some(4));
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["classification"], "neutral");
        assert_eq!(json["messagesAnalyzed"], 0);
        assert!(json.get("workoutChangesSaved").is_none());
    }
}
