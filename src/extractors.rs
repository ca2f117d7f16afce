//! Domain extractors: turn a conversation into validated tracking records.
//!
//! Both extractors send the same transcript the classifier saw, with a
//! domain-specific prompt asking for JSON. The reply goes through
//! [`JsonIslandExtractor`], then [`InputValidator`], and only then to the
//! store. Workout changes are upserted; nutrition entries are appended.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classifier::{render_messages, render_transcript};
use crate::llm::{CompletionRequest, LlmGateway, LlmReply};
use crate::metrics::PipelineMetrics;
use crate::models::{Message, RawNutritionChange, RawWorkoutChange, Role};
use crate::repository::{NutritionStore, WorkoutStore};
use crate::utils::{preview, JsonIslandExtractor, JsonShape};
use crate::validation::InputValidator;

const WORKOUT_DOMAIN: &str = "workout";
const NUTRITION_DOMAIN: &str = "nutrition";

const WORKOUT_PROMPT: &str = r#"You extract workout plan changes from a fitness-coaching conversation.
Return ONLY a JSON array. Each element describes one exercise that was added or changed:
{
  "workout_day_name": "day label, e.g. Monday or Leg day (required)",
  "exercise_name": "exercise name (required)",
  "required_sets": integer or null,
  "required_reps": integer or null,
  "required_weight": "weight with unit, e.g. 100kg, or null",
  "rest_seconds": integer or null,
  "notes": "short note or null",
  "workout_date": "YYYY-MM-DD or null"
}
Only include changes the assistant agreed to. If there are none, return [].
The conversation may be in English or Arabic; keep names in the language used."#;

const NUTRITION_PROMPT: &str = r#"You extract nutrition tracking data from a fitness-coaching conversation.
Return ONLY a JSON object with these fields, using null for anything not mentioned:
{
  "calories_consumed": number or null,
  "calories_required": number or null,
  "protein_consumed": grams or null,
  "protein_required": grams or null,
  "carbs_consumed": grams or null,
  "carbs_required": grams or null,
  "fat_consumed": grams or null,
  "fat_required": grams or null
}
"consumed" is food the user reports eating; "required" is a daily target. Numbers only, no units.
The conversation may be in English or Arabic."#;

/// Tagged outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    /// The model produced usable data
    Records(T),
    /// The model found nothing to record
    Empty,
    /// The reply held no usable JSON of the expected shape
    ParseError(String),
    /// The model could not be reached
    Unavailable(String),
}

impl<T> Extraction<T> {
    /// Metric label for the outcome
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Records(_) => "records",
            Self::Empty => "empty",
            Self::ParseError(_) => "parse_error",
            Self::Unavailable(_) => "unavailable",
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Extraction<U> {
        match self {
            Self::Records(value) => Extraction::Records(f(value)),
            Self::Empty => Extraction::Empty,
            Self::ParseError(reason) => Extraction::ParseError(reason),
            Self::Unavailable(reason) => Extraction::Unavailable(reason),
        }
    }
}

/// Prompt plus JSON-island handling shared by both extractors
#[derive(Clone)]
struct JsonPrompter {
    gateway: LlmGateway,
    json: JsonIslandExtractor,
}

impl JsonPrompter {
    async fn ask(&self, domain: &'static str, system_prompt: String, transcript: String, shape: JsonShape) -> Extraction<Value> {
        let request = CompletionRequest::new(system_prompt, transcript);

        let reply = match self.gateway.complete(&request).await {
            LlmReply::Text(reply) => reply,
            LlmReply::Empty => return Extraction::Empty,
            LlmReply::Unavailable(reason) => {
                warn!(domain, %reason, "Extractor unavailable");
                return Extraction::Unavailable(reason);
            }
        };

        match self.json.extract(&reply, shape) {
            Some(value) => Extraction::Records(value),
            None => {
                // Bare object where an array was asked for
                if shape == JsonShape::Array {
                    if let Some(object) = self.json.extract(&reply, JsonShape::Object) {
                        return Extraction::Records(Value::Array(vec![object]));
                    }
                }
                info!(domain, reply = %preview(&reply), "No JSON found in extractor reply");
                Extraction::ParseError(format!("no JSON {shape:?} in reply"))
            }
        }
    }
}

fn dated_prompt(prompt: &str, today: NaiveDate) -> String {
    format!("{prompt}\n\nToday's date is {}.", today.format("%Y-%m-%d"))
}

fn pair_transcript(user_text: &str, assistant_text: &str) -> String {
    render_transcript([(Role::User, user_text), (Role::Assistant, assistant_text)])
}

fn decode<T: DeserializeOwned>(domain: &'static str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!(domain, error = %e, "Skipping malformed extracted item");
            None
        }
    }
}

/// Extracts workout plan changes and upserts them
#[derive(Clone)]
pub struct WorkoutExtractor {
    prompter: JsonPrompter,
    store: Arc<dyn WorkoutStore>,
}

impl WorkoutExtractor {
    /// Create an extractor writing to `store`
    pub fn new(gateway: LlmGateway, json: JsonIslandExtractor, store: Arc<dyn WorkoutStore>) -> Self {
        Self {
            prompter: JsonPrompter { gateway, json },
            store,
        }
    }

    /// Extract raw workout changes from one exchange
    pub async fn extract(&self, user_text: &str, assistant_text: &str) -> Extraction<Vec<RawWorkoutChange>> {
        self.extract_transcript(pair_transcript(user_text, assistant_text), Local::now().date_naive())
            .await
    }

    /// Extract raw workout changes from a window ordered oldest first
    pub async fn extract_window(&self, messages: &[Message]) -> Extraction<Vec<RawWorkoutChange>> {
        self.extract_transcript(render_messages(messages), Local::now().date_naive())
            .await
    }

    /// Extract, validate and upsert; `false` only when the store write fails
    pub async fn extract_and_save(&self, user_text: &str, assistant_text: &str, user_id: i64) -> bool {
        let today = Local::now().date_naive();
        let extraction = self
            .extract_transcript(pair_transcript(user_text, assistant_text), today)
            .await;
        self.save(extraction, user_id, today).await
    }

    /// Window variant of [`Self::extract_and_save`]
    pub async fn extract_and_save_window(&self, messages: &[Message], user_id: i64) -> bool {
        let today = Local::now().date_naive();
        let extraction = self.extract_transcript(render_messages(messages), today).await;
        self.save(extraction, user_id, today).await
    }

    async fn extract_transcript(&self, transcript: String, today: NaiveDate) -> Extraction<Vec<RawWorkoutChange>> {
        let extraction = self
            .prompter
            .ask(WORKOUT_DOMAIN, dated_prompt(WORKOUT_PROMPT, today), transcript, JsonShape::Array)
            .await
            .map(|value| match value {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| decode::<RawWorkoutChange>(WORKOUT_DOMAIN, item))
                    .collect::<Vec<_>>(),
                _ => Vec::new(),
            });

        let extraction = match extraction {
            Extraction::Records(items) if items.is_empty() => Extraction::Empty,
            other => other,
        };
        PipelineMetrics::record_extraction(WORKOUT_DOMAIN, extraction.outcome());
        extraction
    }

    async fn save(&self, extraction: Extraction<Vec<RawWorkoutChange>>, user_id: i64, today: NaiveDate) -> bool {
        let Extraction::Records(raw_changes) = extraction else {
            return true;
        };

        let total = raw_changes.len();
        let records: Vec<_> = raw_changes
            .iter()
            .filter_map(|raw| match InputValidator::validate_workout_change(raw, today) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(user_id, error = %e, "Rejected workout change");
                    None
                }
            })
            .collect();
        let rejected = total - records.len();

        if records.is_empty() {
            PipelineMetrics::record_records(WORKOUT_DOMAIN, 0, rejected);
            return true;
        }

        match self.store.upsert_workout_changes(user_id, &records).await {
            Ok(saved) => {
                PipelineMetrics::record_records(WORKOUT_DOMAIN, saved, rejected);
                info!(user_id, saved, rejected, "Workout changes saved");
                true
            }
            Err(e) => {
                PipelineMetrics::record_persistence_error(WORKOUT_DOMAIN);
                warn!(user_id, error = %e, "Failed to save workout changes");
                false
            }
        }
    }
}

/// Extracts nutrition data and appends it to the log
#[derive(Clone)]
pub struct NutritionExtractor {
    prompter: JsonPrompter,
    store: Arc<dyn NutritionStore>,
}

impl NutritionExtractor {
    /// Create an extractor writing to `store`
    pub fn new(gateway: LlmGateway, json: JsonIslandExtractor, store: Arc<dyn NutritionStore>) -> Self {
        Self {
            prompter: JsonPrompter { gateway, json },
            store,
        }
    }

    /// Extract a raw nutrition entry from one exchange
    pub async fn extract(&self, user_text: &str, assistant_text: &str) -> Extraction<RawNutritionChange> {
        self.extract_transcript(pair_transcript(user_text, assistant_text)).await
    }

    /// Extract a raw nutrition entry from a window ordered oldest first
    pub async fn extract_window(&self, messages: &[Message]) -> Extraction<RawNutritionChange> {
        self.extract_transcript(render_messages(messages)).await
    }

    /// Extract, validate and append; `false` only when the store write fails
    pub async fn extract_and_save(&self, user_text: &str, assistant_text: &str, user_id: i64) -> bool {
        let extraction = self.extract(user_text, assistant_text).await;
        self.save(extraction, user_id).await
    }

    /// Window variant of [`Self::extract_and_save`]
    pub async fn extract_and_save_window(&self, messages: &[Message], user_id: i64) -> bool {
        let extraction = self.extract_window(messages).await;
        self.save(extraction, user_id).await
    }

    async fn extract_transcript(&self, transcript: String) -> Extraction<RawNutritionChange> {
        let today = Local::now().date_naive();
        let extraction = match self
            .prompter
            .ask(NUTRITION_DOMAIN, dated_prompt(NUTRITION_PROMPT, today), transcript, JsonShape::Object)
            .await
        {
            Extraction::Records(value) => match decode::<RawNutritionChange>(NUTRITION_DOMAIN, value) {
                Some(raw) => Extraction::Records(raw),
                None => Extraction::ParseError("nutrition object has unexpected field types".to_string()),
            },
            Extraction::Empty => Extraction::Empty,
            Extraction::ParseError(reason) => Extraction::ParseError(reason),
            Extraction::Unavailable(reason) => Extraction::Unavailable(reason),
        };

        PipelineMetrics::record_extraction(NUTRITION_DOMAIN, extraction.outcome());
        extraction
    }

    async fn save(&self, extraction: Extraction<RawNutritionChange>, user_id: i64) -> bool {
        let Extraction::Records(raw) = extraction else {
            return true;
        };

        let validated = InputValidator::validate_nutrition_change(&raw);
        let rejected = validated.dropped_fields.len();
        if validated.record.is_empty() {
            debug!(user_id, "No nutrition values to record");
            PipelineMetrics::record_records(NUTRITION_DOMAIN, 0, rejected);
            return true;
        }

        match self.store.append_nutrition(user_id, &validated.record).await {
            Ok(entry) => {
                PipelineMetrics::record_records(NUTRITION_DOMAIN, 1, rejected);
                info!(user_id, entry_id = entry.id, "Nutrition entry saved");
                true
            }
            Err(e) => {
                PipelineMetrics::record_persistence_error(NUTRITION_DOMAIN);
                warn!(user_id, error = %e, "Failed to save nutrition entry");
                false
            }
        }
    }
}
