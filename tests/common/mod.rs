#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use fitcoach_analysis::config::AppConfig;
use fitcoach_analysis::error::{PipelineError, Result};
use fitcoach_analysis::llm::{CompletionClient, CompletionRequest};
use fitcoach_analysis::models::{
    DbNutritionEntry, DbUser, DbWorkoutChange, Message, NutritionChangeRecord, Role, WorkoutChangeRecord,
};
use fitcoach_analysis::repository::{IdentityResolver, MessageStore, NutritionStore, WorkoutStore};
use fitcoach_analysis::SqliteRepository;

/// Canned replies keyed by which prompt is being answered
#[derive(Default)]
pub struct ScriptedClient {
    pub classification: String,
    pub workout: String,
    pub nutrition: String,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(classification: &str, workout: &str, nutrition: &str) -> Self {
        Self {
            classification: classification.to_string(),
            workout: workout.to_string(),
            nutrition: nutrition.to_string(),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());

        let prompt = &request.system_prompt;
        if prompt.contains("workout plan changes") {
            Ok(self.workout.clone())
        } else if prompt.contains("nutrition tracking data") {
            Ok(self.nutrition.clone())
        } else {
            Ok(self.classification.clone())
        }
    }
}

/// A model that is always down
pub struct FailingClient;

#[async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(PipelineError::Llm("503 Service Unavailable".to_string()))
    }
}

/// Panics whenever the transcript mentions `trigger`, otherwise answers like `inner`
pub struct PanickingClient {
    pub trigger: String,
    pub inner: ScriptedClient,
}

#[async_trait]
impl CompletionClient for PanickingClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if request.messages.iter().any(|m| m.content.contains(&self.trigger)) {
            panic!("model exploded");
        }
        self.inner.complete(request).await
    }
}

/// A store where every call fails
pub struct FailingStore;

fn outage<T>() -> Result<T> {
    Err(PipelineError::Other("store offline".to_string()))
}

#[async_trait]
impl IdentityResolver for FailingStore {
    async fn resolve(&self, _external_id: &str) -> Result<Option<i64>> {
        outage()
    }
}

#[async_trait]
impl MessageStore for FailingStore {
    async fn recent_messages(&self, _user_id: i64, _limit: usize) -> Result<Vec<Message>> {
        outage()
    }

    async fn insert_message(&self, _user_id: i64, _role: Role, _content: &str) -> Result<Message> {
        outage()
    }
}

#[async_trait]
impl WorkoutStore for FailingStore {
    async fn upsert_workout_changes(&self, _user_id: i64, _records: &[WorkoutChangeRecord]) -> Result<usize> {
        outage()
    }

    async fn workout_changes(&self, _user_id: i64) -> Result<Vec<DbWorkoutChange>> {
        outage()
    }
}

#[async_trait]
impl NutritionStore for FailingStore {
    async fn append_nutrition(&self, _user_id: i64, _record: &NutritionChangeRecord) -> Result<DbNutritionEntry> {
        outage()
    }

    async fn nutrition_history(&self, _user_id: i64) -> Result<Vec<DbNutritionEntry>> {
        outage()
    }
}

/// Reads go to a real database; tracking writes always fail
pub struct WriteFailingStore {
    pub inner: Arc<SqliteRepository>,
}

#[async_trait]
impl IdentityResolver for WriteFailingStore {
    async fn resolve(&self, external_id: &str) -> Result<Option<i64>> {
        self.inner.resolve(external_id).await
    }
}

#[async_trait]
impl MessageStore for WriteFailingStore {
    async fn recent_messages(&self, user_id: i64, limit: usize) -> Result<Vec<Message>> {
        self.inner.recent_messages(user_id, limit).await
    }

    async fn insert_message(&self, user_id: i64, role: Role, content: &str) -> Result<Message> {
        self.inner.insert_message(user_id, role, content).await
    }
}

#[async_trait]
impl WorkoutStore for WriteFailingStore {
    async fn upsert_workout_changes(&self, _user_id: i64, _records: &[WorkoutChangeRecord]) -> Result<usize> {
        outage()
    }

    async fn workout_changes(&self, user_id: i64) -> Result<Vec<DbWorkoutChange>> {
        self.inner.workout_changes(user_id).await
    }
}

#[async_trait]
impl NutritionStore for WriteFailingStore {
    async fn append_nutrition(&self, _user_id: i64, _record: &NutritionChangeRecord) -> Result<DbNutritionEntry> {
        outage()
    }

    async fn nutrition_history(&self, user_id: i64) -> Result<Vec<DbNutritionEntry>> {
        self.inner.nutrition_history(user_id).await
    }
}

/// Fresh database in a temp directory; keep the `TempDir` alive for the test
pub fn temp_repository() -> (TempDir, Arc<SqliteRepository>) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("fitcoach.db");
    let repository = SqliteRepository::open(&path.to_string_lossy()).expect("Failed to create database");
    (dir, Arc::new(repository))
}

/// Defaults tuned for tests: no batch delay, fast timeouts, no retries
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.analysis.batch_delay_ms = 0;
    config.llm.timeout_secs = 2;
    config.llm.max_retries = 0;
    config.llm.retry_backoff_ms = 1;
    config
}

/// Register `external_id` and append `turns` in order
pub async fn seed_conversation(repository: &SqliteRepository, external_id: &str, turns: &[(Role, &str)]) -> DbUser {
    let user = repository
        .register_user(external_id)
        .await
        .expect("Failed to register user");
    for (role, content) in turns {
        repository
            .insert_message(user.id, *role, content)
            .await
            .expect("Failed to insert message");
    }
    user
}
