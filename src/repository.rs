//! Repository pattern for the pipeline's external stores.
//!
//! The pipeline only sees these async traits. [`SqliteRepository`] backs all
//! of them with the pooled [`Database`], running each blocking call on
//! tokio's blocking thread pool.

use async_trait::async_trait;
use tokio::task;

use crate::db::Database;
use crate::error::Result;
use crate::models::{DbNutritionEntry, DbUser, DbWorkoutChange, Message, NewMessage, NutritionChangeRecord, Role, WorkoutChangeRecord};

/// Maps external session identities to internal user ids
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `None` when the identity has never been registered
    async fn resolve(&self, external_id: &str) -> Result<Option<i64>>;
}

/// Read/append access to the chat history
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Up to `limit` messages of a user, newest first
    async fn recent_messages(&self, user_id: i64, limit: usize) -> Result<Vec<Message>>;

    /// Append one chat turn
    async fn insert_message(&self, user_id: i64, role: Role, content: &str) -> Result<Message>;
}

/// Workout plan storage, upsert keyed by (user, day, exercise, date)
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Insert or overwrite `records`, returning how many rows were written
    async fn upsert_workout_changes(&self, user_id: i64, records: &[WorkoutChangeRecord]) -> Result<usize>;

    /// Stored plan rows for a user
    async fn workout_changes(&self, user_id: i64) -> Result<Vec<DbWorkoutChange>>;
}

/// Append-only nutrition log
#[async_trait]
pub trait NutritionStore: Send + Sync {
    /// Append one entry; the store assigns the timestamp
    async fn append_nutrition(&self, user_id: i64, record: &NutritionChangeRecord) -> Result<DbNutritionEntry>;

    /// Logged entries for a user, oldest first
    async fn nutrition_history(&self, user_id: i64) -> Result<Vec<DbNutritionEntry>>;
}

/// SQLite-backed implementation of every store trait
#[derive(Clone)]
pub struct SqliteRepository {
    database: Database,
}

impl SqliteRepository {
    /// Wrap an open database
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Open the database at `path` with default pool settings
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(Database::new(path)?))
    }

    /// Underlying database handle
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Register an external identity
    pub async fn register_user(&self, external_id: &str) -> Result<DbUser> {
        let external_id = external_id.to_string();
        self.run(move |db| db.register_user(&external_id)).await
    }

    /// Every registered identity
    pub async fn list_users(&self) -> Result<Vec<DbUser>> {
        self.run(|db| db.list_users()).await
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        task::spawn_blocking(move || op(&database)).await?
    }
}

#[async_trait]
impl IdentityResolver for SqliteRepository {
    async fn resolve(&self, external_id: &str) -> Result<Option<i64>> {
        let external_id = external_id.to_string();
        self.run(move |db| db.find_user_id(&external_id)).await
    }
}

#[async_trait]
impl MessageStore for SqliteRepository {
    async fn recent_messages(&self, user_id: i64, limit: usize) -> Result<Vec<Message>> {
        self.run(move |db| db.get_recent_messages(user_id, limit)).await
    }

    async fn insert_message(&self, user_id: i64, role: Role, content: &str) -> Result<Message> {
        let new_message = NewMessage {
            user_id,
            role,
            content: content.to_string(),
            created_at: None,
        };
        self.run(move |db| db.add_message(new_message)).await
    }
}

#[async_trait]
impl WorkoutStore for SqliteRepository {
    async fn upsert_workout_changes(&self, user_id: i64, records: &[WorkoutChangeRecord]) -> Result<usize> {
        let records = records.to_vec();
        self.run(move |db| db.upsert_workout_changes(user_id, &records)).await
    }

    async fn workout_changes(&self, user_id: i64) -> Result<Vec<DbWorkoutChange>> {
        self.run(move |db| db.get_workout_changes(user_id)).await
    }
}

#[async_trait]
impl NutritionStore for SqliteRepository {
    async fn append_nutrition(&self, user_id: i64, record: &NutritionChangeRecord) -> Result<DbNutritionEntry> {
        let record = record.clone();
        self.run(move |db| db.append_nutrition_entry(user_id, &record)).await
    }

    async fn nutrition_history(&self, user_id: i64) -> Result<Vec<DbNutritionEntry>> {
        self.run(move |db| db.get_nutrition_history(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repository() -> (TempDir, SqliteRepository) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("repo.db");
        let repo = SqliteRepository::open(&path.to_string_lossy()).expect("open");
        (dir, repo)
    }

    #[tokio::test]
    async fn test_resolve_unknown_identity() {
        let (_dir, repo) = repository();
        assert_eq!(repo.resolve("nobody").await.expect("resolve"), None);
    }

    #[tokio::test]
    async fn test_message_round_trip_through_traits() {
        let (_dir, repo) = repository();
        let user = repo.register_user("user_1").await.expect("register");
        assert_eq!(repo.resolve("user_1").await.expect("resolve"), Some(user.id));

        repo.insert_message(user.id, Role::User, "hi").await.expect("insert");
        repo.insert_message(user.id, Role::Assistant, "hello").await.expect("insert");

        let recent = repo.recent_messages(user.id, 10).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].role, Role::Assistant);
    }
}
