//! Metric names and recording helpers for the analysis pipeline.
//!
//! Everything goes through the `metrics` facade. The library never installs
//! a recorder, so these calls are no-ops unless the embedding binary does.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::models::{ClassificationLabel, Workflow};

/// Where a classification label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// Text-completion model
    Llm,
    /// Offline keyword scorer
    Keyword,
}

impl LabelSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Keyword => "keyword",
        }
    }
}

/// Metrics collection and management
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Routing decisions by label and source
    pub const CLASSIFICATIONS_TOTAL: &'static str = "fitcoach_classifications_total";
    /// Model calls by outcome
    pub const LLM_CALLS_TOTAL: &'static str = "fitcoach_llm_calls_total";
    /// Model call latency
    pub const LLM_CALL_DURATION: &'static str = "fitcoach_llm_call_duration_seconds";
    /// Extraction outcomes by domain
    pub const EXTRACTIONS_TOTAL: &'static str = "fitcoach_extractions_total";
    /// Validated records written
    pub const RECORDS_SAVED_TOTAL: &'static str = "fitcoach_records_saved_total";
    /// Records dropped by validation
    pub const RECORDS_REJECTED_TOTAL: &'static str = "fitcoach_records_rejected_total";
    /// Failed store writes
    pub const PERSISTENCE_ERRORS_TOTAL: &'static str = "fitcoach_persistence_errors_total";
    /// End-to-end workflow latency
    pub const ANALYSIS_DURATION: &'static str = "fitcoach_analysis_duration_seconds";
    /// Finished workflows by success
    pub const ANALYSES_TOTAL: &'static str = "fitcoach_analyses_total";

    /// Record a routing decision
    pub fn record_classification(label: ClassificationLabel, source: LabelSource) {
        counter!(Self::CLASSIFICATIONS_TOTAL, "label" => label.as_str(), "source" => source.as_str()).increment(1);
    }

    /// Record the outcome of one guarded LLM call (`ok`, `empty`, `timeout`, `error`)
    pub fn record_llm_call(outcome: &'static str, duration: Duration) {
        counter!(Self::LLM_CALLS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(Self::LLM_CALL_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
    }

    /// Record the outcome of an extraction (`records`, `empty`, `parse_error`, `unavailable`)
    pub fn record_extraction(domain: &'static str, outcome: &'static str) {
        counter!(Self::EXTRACTIONS_TOTAL, "domain" => domain, "outcome" => outcome).increment(1);
    }

    /// Record records written and records dropped by validation
    pub fn record_records(domain: &'static str, saved: usize, rejected: usize) {
        counter!(Self::RECORDS_SAVED_TOTAL, "domain" => domain).increment(saved as u64);
        counter!(Self::RECORDS_REJECTED_TOTAL, "domain" => domain).increment(rejected as u64);
    }

    /// Record a failed store write
    pub fn record_persistence_error(domain: &'static str) {
        counter!(Self::PERSISTENCE_ERRORS_TOTAL, "domain" => domain).increment(1);
    }

    /// Record a finished analysis run
    pub fn record_analysis(workflow: Workflow, success: bool, duration_ms: u64) {
        let status = if success { "success" } else { "error" };
        counter!(Self::ANALYSES_TOTAL, "workflow" => workflow.as_str(), "status" => status).increment(1);
        #[allow(clippy::cast_precision_loss)]
        histogram!(Self::ANALYSIS_DURATION, "workflow" => workflow.as_str()).record(duration_ms as f64 / 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            PipelineMetrics::CLASSIFICATIONS_TOTAL,
            PipelineMetrics::LLM_CALLS_TOTAL,
            PipelineMetrics::EXTRACTIONS_TOTAL,
            PipelineMetrics::ANALYSIS_DURATION,
        ] {
            assert!(name.starts_with("fitcoach_"));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        PipelineMetrics::record_classification(ClassificationLabel::Workout, LabelSource::Keyword);
        PipelineMetrics::record_llm_call("ok", Duration::from_millis(12));
        PipelineMetrics::record_records("workout", 2, 1);
        PipelineMetrics::record_analysis(Workflow::Pair, true, 40);
    }
}
