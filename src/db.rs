use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{PipelineError, Result};
use crate::models::{
    DbNutritionEntry, DbUser, DbWorkoutChange, Message, NewMessage, NutritionChangeRecord, WorkoutChangeRecord,
};
use crate::schema::{messages, nutrition_tracking, users, workout_tracking};

// Type alias for the database connection pool
/// Pooled SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;
/// One connection checked out of the pool
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `database_url` with default pool settings.
    ///
    /// Accepts a plain path or a `sqlite:`/`sqlite://` prefixed URL.
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_config(&DatabaseConfig {
            path: database_url.to_string(),
            ..DatabaseConfig::default()
        })
    }

    /// Open (or create) the database described by `config`
    pub fn with_config(config: &DatabaseConfig) -> Result<Self> {
        let path = Self::normalize_path(&config.path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        info!(path = %path.display(), "Database ready");

        Ok(Self { pool })
    }

    fn normalize_path(database_url: &str) -> PathBuf {
        let trimmed = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);
        Path::new(trimmed).to_path_buf()
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-10-01-000000_create_tables/up.sql"))?;
        conn.execute_batch(include_str!(
            "../migrations/2026-10-01-000001_create_tracking_tables/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Register an external identity, returning the existing row if already known
    pub fn register_user(&self, external_id: &str) -> Result<DbUser> {
        let conn = self.get_connection()?;

        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
                users::TABLE,
                users::EXTERNAL_ID,
                users::CREATED_AT
            ),
            params![external_id, Utc::now().naive_utc()],
        )?;

        conn.query_row(
            &format!("SELECT * FROM {} WHERE {} = ?1", users::TABLE, users::EXTERNAL_ID),
            params![external_id],
            Self::map_db_user,
        )
        .map_err(PipelineError::from)
    }

    /// Resolve an external identity to the internal user id
    pub fn find_user_id(&self, external_id: &str) -> Result<Option<i64>> {
        let conn = self.get_connection()?;

        let id = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE {} = ?1", users::ID, users::TABLE, users::EXTERNAL_ID),
                params![external_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(id)
    }

    /// All registered users, oldest first
    pub fn list_users(&self) -> Result<Vec<DbUser>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY {} ASC", users::TABLE, users::ID))?;
        let rows = stmt.query_map([], Self::map_db_user)?;

        let mut results = Vec::new();
        for user in rows {
            results.push(user?);
        }

        Ok(results)
    }

    /// Append a message to a user's conversation
    pub fn add_message(&self, new_message: NewMessage) -> Result<Message> {
        let conn = self.get_connection()?;
        let created_at = new_message.created_at.unwrap_or_else(|| Utc::now().naive_utc());

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                messages::TABLE,
                messages::USER_ID,
                messages::ROLE,
                messages::CONTENT,
                messages::CREATED_AT
            ),
            params![new_message.user_id, new_message.role.as_str(), new_message.content, created_at],
        )?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            user_id: new_message.user_id,
            role: new_message.role,
            content: new_message.content,
            created_at,
        })
    }

    /// Up to `limit` most recent messages for a user, newest first
    pub fn get_recent_messages(&self, user_id: i64, limit: usize) -> Result<Vec<Message>> {
        let conn = self.get_connection()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} DESC, {} DESC LIMIT ?2",
            messages::TABLE,
            messages::USER_ID,
            messages::CREATED_AT,
            messages::ID
        ))?;
        let rows = stmt.query_map(params![user_id, limit], Self::map_message)?;

        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }

        Ok(results)
    }

    /// Insert or overwrite workout plan rows keyed on (user, day, exercise, date).
    ///
    /// All records are written in one transaction. Returns the number of rows written.
    pub fn upsert_workout_changes(&self, user_id: i64, records: &[WorkoutChangeRecord]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let now = Utc::now().naive_utc();

        let sql = format!(
            "INSERT INTO {table} ({user}, {day}, {exercise}, {sets}, {reps}, {weight}, {rest}, {notes}, {date}, {created}, {updated}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) \
             ON CONFLICT ({user}, {day}, {exercise}, {date}) DO UPDATE SET \
             {sets} = excluded.{sets}, {reps} = excluded.{reps}, {weight} = excluded.{weight}, \
             {rest} = excluded.{rest}, {notes} = excluded.{notes}, {updated} = excluded.{updated}",
            table = workout_tracking::TABLE,
            user = workout_tracking::USER_ID,
            day = workout_tracking::WORKOUT_DAY_NAME,
            exercise = workout_tracking::EXERCISE_NAME,
            sets = workout_tracking::REQUIRED_SETS,
            reps = workout_tracking::REQUIRED_REPS,
            weight = workout_tracking::REQUIRED_WEIGHT,
            rest = workout_tracking::REST_SECONDS,
            notes = workout_tracking::NOTES,
            date = workout_tracking::WORKOUT_DATE,
            created = workout_tracking::CREATED_AT,
            updated = workout_tracking::UPDATED_AT,
        );

        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                written += stmt.execute(params![
                    user_id,
                    record.workout_day_name,
                    record.exercise_name,
                    record.required_sets,
                    record.required_reps,
                    record.required_weight,
                    record.rest_seconds,
                    record.notes,
                    record.workout_date,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        debug!(user_id, written, "Upserted workout changes");
        Ok(written)
    }

    /// Stored workout plan for a user, ordered by date then day and exercise
    pub fn get_workout_changes(&self, user_id: i64) -> Result<Vec<DbWorkoutChange>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} ASC, {} ASC, {} ASC",
            workout_tracking::TABLE,
            workout_tracking::USER_ID,
            workout_tracking::WORKOUT_DATE,
            workout_tracking::WORKOUT_DAY_NAME,
            workout_tracking::EXERCISE_NAME
        ))?;
        let rows = stmt.query_map(params![user_id], Self::map_workout_change)?;

        let mut results = Vec::new();
        for change in rows {
            results.push(change?);
        }

        Ok(results)
    }

    /// Append a nutrition log entry.
    ///
    /// `recorded_at` is assigned here and is strictly increasing per user.
    pub fn append_nutrition_entry(&self, user_id: i64, record: &NutritionChangeRecord) -> Result<DbNutritionEntry> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let last: Option<NaiveDateTime> = tx.query_row(
            &format!(
                "SELECT MAX({}) FROM {} WHERE {} = ?1",
                nutrition_tracking::RECORDED_AT,
                nutrition_tracking::TABLE,
                nutrition_tracking::USER_ID
            ),
            params![user_id],
            |row| row.get(0),
        )?;

        let mut recorded_at = Utc::now().naive_utc();
        if let Some(last) = last {
            if recorded_at <= last {
                recorded_at = last + chrono::Duration::microseconds(1);
            }
        }

        tx.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                nutrition_tracking::TABLE,
                nutrition_tracking::USER_ID,
                nutrition_tracking::CALORIES_CONSUMED,
                nutrition_tracking::CALORIES_REQUIRED,
                nutrition_tracking::PROTEIN_CONSUMED,
                nutrition_tracking::PROTEIN_REQUIRED,
                nutrition_tracking::CARBS_CONSUMED,
                nutrition_tracking::CARBS_REQUIRED,
                nutrition_tracking::FAT_CONSUMED,
                nutrition_tracking::FAT_REQUIRED,
                nutrition_tracking::RECORDED_AT
            ),
            params![
                user_id,
                record.calories_consumed,
                record.calories_required,
                record.protein_consumed,
                record.protein_required,
                record.carbs_consumed,
                record.carbs_required,
                record.fat_consumed,
                record.fat_required,
                recorded_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(DbNutritionEntry {
            id,
            user_id,
            record: record.clone(),
            recorded_at,
        })
    }

    /// Nutrition log for a user, oldest first
    pub fn get_nutrition_history(&self, user_id: i64) -> Result<Vec<DbNutritionEntry>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} ASC, {} ASC",
            nutrition_tracking::TABLE,
            nutrition_tracking::USER_ID,
            nutrition_tracking::RECORDED_AT,
            nutrition_tracking::ID
        ))?;
        let rows = stmt.query_map(params![user_id], Self::map_nutrition_entry)?;

        let mut results = Vec::new();
        for entry in rows {
            results.push(entry?);
        }

        Ok(results)
    }

    /// Row counts across all tables
    pub fn get_tracking_stats(&self) -> Result<TrackingStats> {
        let conn = self.get_connection()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        Ok(TrackingStats {
            users: count(users::TABLE)?,
            messages: count(messages::TABLE)?,
            workout_changes: count(workout_tracking::TABLE)?,
            nutrition_entries: count(nutrition_tracking::TABLE)?,
        })
    }

    /// Map a database row to a `DbUser`
    fn map_db_user(row: &Row) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(users::ID)?,
            external_id: row.get(users::EXTERNAL_ID)?,
            created_at: row.get(users::CREATED_AT)?,
        })
    }

    /// Map a database row to a `Message`
    fn map_message(row: &Row) -> rusqlite::Result<Message> {
        let role: String = row.get(messages::ROLE)?;
        let role = role.parse().map_err(|e: PipelineError| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Message {
            id: row.get(messages::ID)?,
            user_id: row.get(messages::USER_ID)?,
            role,
            content: row.get(messages::CONTENT)?,
            created_at: row.get(messages::CREATED_AT)?,
        })
    }

    /// Map a database row to a `DbWorkoutChange`
    fn map_workout_change(row: &Row) -> rusqlite::Result<DbWorkoutChange> {
        Ok(DbWorkoutChange {
            id: row.get(workout_tracking::ID)?,
            user_id: row.get(workout_tracking::USER_ID)?,
            record: WorkoutChangeRecord {
                workout_day_name: row.get(workout_tracking::WORKOUT_DAY_NAME)?,
                exercise_name: row.get(workout_tracking::EXERCISE_NAME)?,
                required_sets: row.get(workout_tracking::REQUIRED_SETS)?,
                required_reps: row.get(workout_tracking::REQUIRED_REPS)?,
                required_weight: row.get(workout_tracking::REQUIRED_WEIGHT)?,
                rest_seconds: row.get(workout_tracking::REST_SECONDS)?,
                notes: row.get(workout_tracking::NOTES)?,
                workout_date: row.get(workout_tracking::WORKOUT_DATE)?,
            },
            created_at: row.get(workout_tracking::CREATED_AT)?,
            updated_at: row.get(workout_tracking::UPDATED_AT)?,
        })
    }

    /// Map a database row to a `DbNutritionEntry`
    fn map_nutrition_entry(row: &Row) -> rusqlite::Result<DbNutritionEntry> {
        Ok(DbNutritionEntry {
            id: row.get(nutrition_tracking::ID)?,
            user_id: row.get(nutrition_tracking::USER_ID)?,
            record: NutritionChangeRecord {
                calories_consumed: row.get(nutrition_tracking::CALORIES_CONSUMED)?,
                calories_required: row.get(nutrition_tracking::CALORIES_REQUIRED)?,
                protein_consumed: row.get(nutrition_tracking::PROTEIN_CONSUMED)?,
                protein_required: row.get(nutrition_tracking::PROTEIN_REQUIRED)?,
                carbs_consumed: row.get(nutrition_tracking::CARBS_CONSUMED)?,
                carbs_required: row.get(nutrition_tracking::CARBS_REQUIRED)?,
                fat_consumed: row.get(nutrition_tracking::FAT_CONSUMED)?,
                fat_required: row.get(nutrition_tracking::FAT_REQUIRED)?,
            },
            recorded_at: row.get(nutrition_tracking::RECORDED_AT)?,
        })
    }
}

/// Row counts across the tracking database
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TrackingStats {
    /// Registered identities
    pub users: usize,
    /// Stored chat messages
    pub messages: usize,
    /// Workout plan rows
    pub workout_changes: usize,
    /// Nutrition log rows
    pub nutrition_entries: usize,
}
