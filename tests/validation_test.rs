use chrono::NaiveDate;
use fitcoach_analysis::models::{RawNutritionChange, RawWorkoutChange};
use fitcoach_analysis::validation::{InputValidator, CALORIES_RANGE, SETS_RANGE};
use proptest::prelude::*;
use serde_json::json;
use std::path::Path;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

fn workout(value: serde_json::Value) -> RawWorkoutChange {
    serde_json::from_value(value).expect("Failed to build raw workout change")
}

fn nutrition(value: serde_json::Value) -> RawNutritionChange {
    serde_json::from_value(value).expect("Failed to build raw nutrition change")
}

#[test]
fn test_sets_bounds() {
    let too_many = workout(json!({"workout_day_name": "Monday", "exercise_name": "Squat", "required_sets": 500}));
    assert!(InputValidator::validate_workout_change(&too_many, today()).is_err());

    let fifty = workout(json!({"workout_day_name": "Monday", "exercise_name": "Squat", "required_sets": 50}));
    let record = InputValidator::validate_workout_change(&fifty, today()).expect("50 sets is valid");
    assert_eq!(record.required_sets, Some(50));
}

#[test]
fn test_reps_and_rest_bounds() {
    let reps = workout(json!({"workout_day_name": "Monday", "exercise_name": "Jumping jacks", "required_reps": 1001}));
    assert!(InputValidator::validate_workout_change(&reps, today()).is_err());

    let rest = workout(json!({"workout_day_name": "Monday", "exercise_name": "Plank", "rest_seconds": 3601}));
    assert!(InputValidator::validate_workout_change(&rest, today()).is_err());

    let negative = workout(json!({"workout_day_name": "Monday", "exercise_name": "Plank", "rest_seconds": -1}));
    assert!(InputValidator::validate_workout_change(&negative, today()).is_err());

    let edges = workout(json!({
        "workout_day_name": "Monday",
        "exercise_name": "Plank",
        "required_sets": 0,
        "required_reps": 1000,
        "rest_seconds": 3600
    }));
    assert!(InputValidator::validate_workout_change(&edges, today()).is_ok());
}

#[test]
fn test_missing_names_are_rejected() {
    let no_exercise = workout(json!({"workout_day_name": "Monday", "required_sets": 3}));
    assert!(InputValidator::validate_workout_change(&no_exercise, today()).is_err());

    let no_day = workout(json!({"exercise_name": "Bench press", "required_sets": 3}));
    assert!(InputValidator::validate_workout_change(&no_day, today()).is_err());

    let blank_day = workout(json!({"workout_day_name": "   ", "exercise_name": "Bench press"}));
    assert!(InputValidator::validate_workout_change(&blank_day, today()).is_err());
}

#[test]
fn test_explicit_date_is_kept() {
    let raw = workout(json!({"workout_day_name": "Leg day", "exercise_name": "Lunge", "workout_date": "2026-11-02"}));
    let record = InputValidator::validate_workout_change(&raw, today()).expect("valid");
    assert_eq!(record.workout_date, NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"));

    let garbled = workout(json!({"workout_day_name": "Leg day", "exercise_name": "Lunge", "workout_date": "next tuesday"}));
    let record = InputValidator::validate_workout_change(&garbled, today()).expect("valid");
    assert_eq!(record.workout_date, today());
}

#[test]
fn test_arabic_names_pass_through() {
    let raw = workout(json!({"workout_day_name": "الاثنين", "exercise_name": "سكوات", "required_sets": "4"}));
    let record = InputValidator::validate_workout_change(&raw, today()).expect("valid");
    assert_eq!(record.exercise_name, "سكوات");
    assert_eq!(record.required_sets, Some(4));
}

#[test]
fn test_out_of_range_calories_dropped_others_kept() {
    let raw = nutrition(json!({
        "calories_consumed": 99999,
        "protein_consumed": 40,
        "carbs_consumed": 120.5,
        "fat_required": 70
    }));
    let validated = InputValidator::validate_nutrition_change(&raw);

    assert_eq!(validated.record.calories_consumed, None);
    assert_eq!(validated.record.protein_consumed, Some(40.0));
    assert_eq!(validated.record.carbs_consumed, Some(120.5));
    assert_eq!(validated.record.fat_required, Some(70.0));
    assert_eq!(validated.dropped_fields, vec!["calories_consumed"]);
    assert!(!validated.record.is_empty());
}

#[test]
fn test_nutrition_field_bounds() {
    let raw = nutrition(json!({
        "protein_required": 1000.5,
        "carbs_required": 2000,
        "fat_consumed": 1001,
        "calories_required": 10000
    }));
    let record = InputValidator::validate_nutrition_change(&raw).record;
    assert_eq!(record.protein_required, None);
    assert_eq!(record.carbs_required, Some(2000.0));
    assert_eq!(record.fat_consumed, None);
    assert_eq!(record.calories_required, Some(10000.0));
}

#[test]
fn test_all_invalid_nutrition_is_empty() {
    let raw = nutrition(json!({"calories_consumed": "a lot", "protein_consumed": -3}));
    let validated = InputValidator::validate_nutrition_change(&raw);
    assert!(validated.record.is_empty());
    assert_eq!(validated.dropped_fields.len(), 2);
}

#[test]
fn test_file_path_validation() {
    assert!(InputValidator::validate_file_path(Path::new("output/batch.json")).is_ok());
    assert!(InputValidator::validate_file_path(Path::new("../etc/passwd")).is_err());
    assert!(InputValidator::validate_file_path(Path::new("")).is_err());
}

#[test]
fn test_window_size_validation() {
    assert!(InputValidator::validate_window_size(10).is_ok());
    assert!(InputValidator::validate_window_size(0).is_err());
    assert!(InputValidator::validate_window_size(10_000).is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  hi\u{0}there \n"), "hithere");
}

proptest! {
    #[test]
    fn prop_accepted_sets_are_in_range(sets in -1000i64..1000) {
        let raw = workout(json!({"workout_day_name": "Monday", "exercise_name": "Row", "required_sets": sets}));
        match InputValidator::validate_workout_change(&raw, today()) {
            Ok(record) => {
                let kept = record.required_sets.expect("sets present");
                prop_assert!(SETS_RANGE.contains(&kept));
            }
            Err(_) => prop_assert!(!(0..=100).contains(&sets)),
        }
    }

    #[test]
    fn prop_kept_calories_are_in_range(calories in -50_000.0f64..50_000.0) {
        let raw = nutrition(json!({"calories_consumed": calories}));
        if let Some(kept) = InputValidator::validate_nutrition_change(&raw).record.calories_consumed {
            prop_assert!(CALORIES_RANGE.contains(&kept));
        }
    }
}
