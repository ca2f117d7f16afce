//! File writing utilities for analysis output.
//!
//! Batch results can be written as a JSON document (results plus report) or
//! as one CSV row per result.

use crate::error::Result;
use crate::models::{AnalysisResult, OutputFormat};
use crate::report::AnalysisReport;
use csv::Writer;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct BatchDocument<'a> {
    report: &'a AnalysisReport,
    results: &'a [AnalysisResult],
}

/// Write batch results to `file_path` in the given format.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_results_to_file(
    results: &[AnalysisResult],
    report: &AnalysisReport,
    format: OutputFormat,
    file_path: &Path,
) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    match format {
        OutputFormat::Csv => write_csv_file(results, file_path),
        OutputFormat::Json => write_json_file(results, report, file_path),
    }
}

fn optional_flag(flag: Option<bool>) -> String {
    flag.map(|saved| saved.to_string()).unwrap_or_default()
}

/// Write results to a CSV file.
///
/// Includes header row: `Identity, UserId, Success, Classification, ...`
fn write_csv_file(results: &[AnalysisResult], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "Identity",
        "UserId",
        "Success",
        "Classification",
        "WorkoutChangesSaved",
        "NutritionChangesSaved",
        "MessagesAnalyzed",
        "ProcessingTimeMs",
        "Error",
    ])?;

    for result in results {
        let user_id = result.user_id.map(|id| id.to_string()).unwrap_or_default();
        let success = result.success.to_string();
        let workout_saved = optional_flag(result.workout_changes_saved);
        let nutrition_saved = optional_flag(result.nutrition_changes_saved);
        let messages = result.messages_analyzed.to_string();
        let duration = result.processing_time_ms.to_string();

        let row: [&str; 9] = [
            &result.identity,
            &user_id,
            &success,
            result.classification.as_str(),
            &workout_saved,
            &nutrition_saved,
            &messages,
            &duration,
            result.error.as_deref().unwrap_or_default(),
        ];
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write results and their report to a pretty-printed JSON file
fn write_json_file(results: &[AnalysisResult], report: &AnalysisReport, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &BatchDocument { report, results })?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
