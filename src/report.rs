//! Summary statistics over a set of analysis results. Pure; no I/O.

use serde::Serialize;

use crate::models::{AnalysisResult, ClassificationLabel};

/// Per-label result counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    /// Results labelled `workout`
    pub workout: usize,
    /// Results labelled `nutrition`
    pub nutrition: usize,
    /// Results labelled `neutral`
    pub neutral: usize,
}

impl LabelCounts {
    fn add(&mut self, label: ClassificationLabel) {
        match label {
            ClassificationLabel::Workout => self.workout += 1,
            ClassificationLabel::Nutrition => self.nutrition += 1,
            ClassificationLabel::Neutral => self.neutral += 1,
        }
    }
}

/// Aggregate view of a batch of [`AnalysisResult`]s
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Number of results summarized
    pub total: usize,
    /// Results with `success: true`
    pub successful: usize,
    /// Results with `success: false`
    pub failed: usize,
    /// Percentage of successful results, 0-100
    pub success_rate: f64,
    /// Results per classification label
    pub label_counts: LabelCounts,
    /// Runs whose workout extraction saved (or had nothing to save)
    pub workout_saves: usize,
    /// Runs whose nutrition extraction saved (or had nothing to save)
    pub nutrition_saves: usize,
    /// Runs where an extractor reported a persistence failure
    pub save_failures: usize,
    /// Mean processing time in milliseconds, 0 for an empty batch
    pub average_processing_time_ms: f64,
}

/// Summarize `results`; an empty slice yields an all-zero report
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn generate_analysis_report(results: &[AnalysisResult]) -> AnalysisReport {
    if results.is_empty() {
        return AnalysisReport::default();
    }

    let mut report = AnalysisReport {
        total: results.len(),
        ..AnalysisReport::default()
    };
    let mut total_time_ms: u64 = 0;

    for result in results {
        if result.success {
            report.successful += 1;
        } else {
            report.failed += 1;
        }
        report.label_counts.add(result.classification);

        match result.workout_changes_saved {
            Some(true) => report.workout_saves += 1,
            Some(false) => report.save_failures += 1,
            None => {}
        }
        match result.nutrition_changes_saved {
            Some(true) => report.nutrition_saves += 1,
            Some(false) => report.save_failures += 1,
            None => {}
        }

        total_time_ms = total_time_ms.saturating_add(result.processing_time_ms);
    }

    report.success_rate = report.successful as f64 / report.total as f64 * 100.0;
    report.average_processing_time_ms = total_time_ms as f64 / report.total as f64;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_zeroed() {
        let report = generate_analysis_report(&[]);
        assert_eq!(report, AnalysisReport::default());
        assert!(report.success_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_results_count_as_neutral() {
        let report = generate_analysis_report(&[AnalysisResult::failed("u", "panic")]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.label_counts.neutral, 1);
    }
}
