//! Database schema definitions
//!
//! Constants for table and column names used with rusqlite. The tables
//! themselves are created by the SQL files under `migrations/`.

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// External identity column
    pub const EXTERNAL_ID: &str = "external_id";
    /// Registration timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Role column (`user` or `assistant`)
    pub const ROLE: &str = "role";
    /// Message text content column
    pub const CONTENT: &str = "content";
    /// Message creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Workout tracking table schema
pub mod workout_tracking {
    /// Table name
    pub const TABLE: &str = "workout_tracking";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Day label column
    pub const WORKOUT_DAY_NAME: &str = "workout_day_name";
    /// Exercise name column
    pub const EXERCISE_NAME: &str = "exercise_name";
    /// Planned sets column
    pub const REQUIRED_SETS: &str = "required_sets";
    /// Planned reps column
    pub const REQUIRED_REPS: &str = "required_reps";
    /// Planned weight column
    pub const REQUIRED_WEIGHT: &str = "required_weight";
    /// Rest seconds column
    pub const REST_SECONDS: &str = "rest_seconds";
    /// Notes column
    pub const NOTES: &str = "notes";
    /// Calendar date column
    pub const WORKOUT_DATE: &str = "workout_date";
    /// First insertion timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Last overwrite timestamp column
    pub const UPDATED_AT: &str = "updated_at";
}

/// Nutrition tracking table schema
pub mod nutrition_tracking {
    /// Table name
    pub const TABLE: &str = "nutrition_tracking";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Calories eaten column
    pub const CALORIES_CONSUMED: &str = "calories_consumed";
    /// Calorie target column
    pub const CALORIES_REQUIRED: &str = "calories_required";
    /// Protein eaten column
    pub const PROTEIN_CONSUMED: &str = "protein_consumed";
    /// Protein target column
    pub const PROTEIN_REQUIRED: &str = "protein_required";
    /// Carbohydrates eaten column
    pub const CARBS_CONSUMED: &str = "carbs_consumed";
    /// Carbohydrate target column
    pub const CARBS_REQUIRED: &str = "carbs_required";
    /// Fat eaten column
    pub const FAT_CONSUMED: &str = "fat_consumed";
    /// Fat target column
    pub const FAT_REQUIRED: &str = "fat_required";
    /// Store-assigned insertion timestamp column
    pub const RECORDED_AT: &str = "recorded_at";
}
