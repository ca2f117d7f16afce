use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::models::{NutritionChangeRecord, RawNutritionChange, RawWorkoutChange, WorkoutChangeRecord};

/// Planned sets per exercise
pub const SETS_RANGE: RangeInclusive<u32> = 0..=100;
/// Planned reps per set
pub const REPS_RANGE: RangeInclusive<u32> = 0..=1000;
/// Rest between sets, seconds
pub const REST_SECONDS_RANGE: RangeInclusive<u32> = 0..=3600;
/// Calories, consumed or required
pub const CALORIES_RANGE: RangeInclusive<f64> = 0.0..=10_000.0;
/// Protein grams
pub const PROTEIN_RANGE: RangeInclusive<f64> = 0.0..=1_000.0;
/// Carbohydrate grams
pub const CARBS_RANGE: RangeInclusive<f64> = 0.0..=2_000.0;
/// Fat grams
pub const FAT_RANGE: RangeInclusive<f64> = 0.0..=1_000.0;

const MAX_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 2_000;
const MAX_WINDOW_SIZE: usize = 200;

/// A numeric JSON field after lenient coercion
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Absent,
    Number(f64),
    Invalid,
}

impl Numeric {
    /// Accept numbers and numeric strings; null and blank strings are absent
    fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Invalid, Self::Number),
            Some(Value::String(s)) if s.trim().is_empty() => Self::Absent,
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Self::Number(n),
                _ => Self::Invalid,
            },
            Some(_) => Self::Invalid,
        }
    }
}

/// Outcome of nutrition validation: the kept fields plus the names of dropped ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedNutrition {
    /// Fields that passed their range check
    pub record: NutritionChangeRecord,
    /// Fields that were present but unusable
    pub dropped_fields: Vec<&'static str>,
}

/// Validation utilities for input sanitization and extracted records
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate an identity issued by the external auth system
    pub fn validate_external_id(external_id: &str) -> Result<()> {
        if external_id.trim().is_empty() {
            return Err(anyhow!("External id cannot be empty"));
        }

        if external_id.len() > 255 {
            return Err(anyhow!("External id too long (max 255 characters)"));
        }

        if external_id.chars().any(char::is_control) {
            return Err(anyhow!("External id contains invalid characters"));
        }

        Ok(())
    }

    /// Validate output file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        // Check for path traversal attempts
        if path_str.contains("..") || path_str.contains('~') {
            return Err(anyhow!("File path contains potentially dangerous characters"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate the number of messages fed to window analysis
    pub fn validate_window_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(anyhow!("Window size must be greater than 0"));
        }

        if size > MAX_WINDOW_SIZE {
            return Err(anyhow!("Window size too large (max {MAX_WINDOW_SIZE})"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Validate one extracted workout change.
    ///
    /// Day label and exercise name are mandatory. Any numeric field that is
    /// present but outside its range (or not a whole number) rejects the
    /// whole record. A missing or unparseable date becomes `default_date`.
    pub fn validate_workout_change(raw: &RawWorkoutChange, default_date: NaiveDate) -> Result<WorkoutChangeRecord> {
        let workout_day_name = Self::required_name("workout_day_name", raw.workout_day_name.as_deref())?;
        let exercise_name = Self::required_name("exercise_name", raw.exercise_name.as_deref())?;

        let required_sets = Self::bounded_count("required_sets", raw.required_sets.as_ref(), &SETS_RANGE)?;
        let required_reps = Self::bounded_count("required_reps", raw.required_reps.as_ref(), &REPS_RANGE)?;
        let rest_seconds = Self::bounded_count("rest_seconds", raw.rest_seconds.as_ref(), &REST_SECONDS_RANGE)?;
        let required_weight = Self::weight(raw.required_weight.as_ref())?;

        let notes = raw
            .notes
            .as_deref()
            .map(Self::sanitize_text)
            .filter(|n| !n.is_empty())
            .map(|n| n.chars().take(MAX_NOTES_LEN).collect());

        let workout_date = match raw.workout_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap_or_else(|_| {
                tracing::debug!(date, "Unparseable workout_date, using analysis date");
                default_date
            }),
            _ => default_date,
        };

        Ok(WorkoutChangeRecord {
            workout_day_name,
            exercise_name,
            required_sets,
            required_reps,
            required_weight,
            rest_seconds,
            notes,
            workout_date,
        })
    }

    /// Validate one extracted nutrition entry, dropping bad fields individually
    #[must_use]
    pub fn validate_nutrition_change(raw: &RawNutritionChange) -> ValidatedNutrition {
        let mut dropped_fields = Vec::new();
        let mut keep = |field: &'static str, value: Option<&Value>, range: &RangeInclusive<f64>| {
            match Numeric::from_json(value) {
                Numeric::Absent => None,
                Numeric::Number(n) if range.contains(&n) => Some(n),
                _ => {
                    dropped_fields.push(field);
                    None
                }
            }
        };

        let record = NutritionChangeRecord {
            calories_consumed: keep("calories_consumed", raw.calories_consumed.as_ref(), &CALORIES_RANGE),
            calories_required: keep("calories_required", raw.calories_required.as_ref(), &CALORIES_RANGE),
            protein_consumed: keep("protein_consumed", raw.protein_consumed.as_ref(), &PROTEIN_RANGE),
            protein_required: keep("protein_required", raw.protein_required.as_ref(), &PROTEIN_RANGE),
            carbs_consumed: keep("carbs_consumed", raw.carbs_consumed.as_ref(), &CARBS_RANGE),
            carbs_required: keep("carbs_required", raw.carbs_required.as_ref(), &CARBS_RANGE),
            fat_consumed: keep("fat_consumed", raw.fat_consumed.as_ref(), &FAT_RANGE),
            fat_required: keep("fat_required", raw.fat_required.as_ref(), &FAT_RANGE),
        };

        if !dropped_fields.is_empty() {
            tracing::warn!(fields = ?dropped_fields, "Dropped out-of-range nutrition fields");
        }

        ValidatedNutrition { record, dropped_fields }
    }

    fn required_name(field: &str, value: Option<&str>) -> Result<String> {
        let cleaned = value.map(Self::sanitize_text).unwrap_or_default();
        if cleaned.is_empty() {
            return Err(anyhow!("{field} is required"));
        }
        if cleaned.chars().count() > MAX_NAME_LEN {
            return Err(anyhow!("{field} too long (max {MAX_NAME_LEN} characters)"));
        }
        Ok(cleaned)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bounded_count(field: &str, value: Option<&Value>, range: &RangeInclusive<u32>) -> Result<Option<u32>> {
        match Numeric::from_json(value) {
            Numeric::Absent => Ok(None),
            Numeric::Number(n) if n.fract() == 0.0 && n >= f64::from(*range.start()) && n <= f64::from(*range.end()) => {
                Ok(Some(n as u32))
            }
            Numeric::Number(n) => Err(anyhow!(
                "{field} = {n} outside {}..={}",
                range.start(),
                range.end()
            )),
            Numeric::Invalid => Err(anyhow!("{field} is not a number")),
        }
    }

    fn weight(value: Option<&Value>) -> Result<Option<String>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::String(s)) => {
                let cleaned = Self::sanitize_text(s);
                Ok((!cleaned.is_empty()).then_some(cleaned))
            }
            Some(_) => Err(anyhow!("required_weight must be a string or number")),
        }
    }
}
