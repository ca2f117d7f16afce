//! Analysis orchestration.
//!
//! [`AnalysisService`] wires the accessor, classifier and extractors into the
//! four workflows (pair, window, quick, batch). Every path ends in a
//! well-formed [`AnalysisResult`]; nothing here returns an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::accessor::MessageAccessor;
use crate::classifier::Classifier;
use crate::config::{AnalysisConfig, AppConfig};
use crate::error::Result;
use crate::extractors::{NutritionExtractor, WorkoutExtractor};
use crate::llm::{CompletionClient, LlmGateway};
use crate::logging::OperationTimer;
use crate::metrics::PipelineMetrics;
use crate::models::{AnalysisResult, ClassificationLabel, Message, Workflow};
use crate::repository::{IdentityResolver, MessageStore, NutritionStore, WorkoutStore};
use crate::utils::JsonIslandExtractor;

/// Orchestrates classification, routing and extraction for one user at a time
#[derive(Clone)]
pub struct AnalysisService {
    accessor: MessageAccessor,
    classifier: Classifier,
    workouts: WorkoutExtractor,
    nutrition: NutritionExtractor,
    config: AnalysisConfig,
}

impl AnalysisService {
    /// Assemble a service from already-built components
    pub const fn new(
        accessor: MessageAccessor,
        classifier: Classifier,
        workouts: WorkoutExtractor,
        nutrition: NutritionExtractor,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            accessor,
            classifier,
            workouts,
            nutrition,
            config,
        }
    }

    /// Build every component over one store implementing all four store traits
    pub fn from_repository<R>(repository: Arc<R>, client: Arc<dyn CompletionClient>, config: &AppConfig) -> Result<Self>
    where
        R: IdentityResolver + MessageStore + WorkoutStore + NutritionStore + 'static,
    {
        let gateway = LlmGateway::from_config(client, &config.llm);
        let json = JsonIslandExtractor::new(config.llm.max_reply_chars)?;

        Ok(Self::new(
            MessageAccessor::new(repository.clone(), repository.clone()),
            Classifier::new(gateway.clone()),
            WorkoutExtractor::new(gateway.clone(), json.clone(), repository.clone()),
            NutritionExtractor::new(gateway, json, repository),
            config.analysis.clone(),
        ))
    }

    /// Classify the latest user/assistant pair and route it to an extractor
    pub async fn analyze_latest_pair(&self, identity: &str) -> AnalysisResult {
        let timer = OperationTimer::new("analyze_latest_pair");
        let pair = self.accessor.get_last_pair(identity).await;

        let result = match (&pair.user_message, &pair.assistant_message) {
            (Some(user_message), Some(assistant_message)) => {
                let user_id = pair.user_id.unwrap_or(user_message.user_id);
                let label = self
                    .classifier
                    .classify_pair(&user_message.content, &assistant_message.content)
                    .await;

                let mut result = Self::analyzed(identity, user_id, label, 2);
                match label {
                    ClassificationLabel::Workout => {
                        result.workout_changes_saved = Some(
                            self.workouts
                                .extract_and_save(&user_message.content, &assistant_message.content, user_id)
                                .await,
                        );
                    }
                    ClassificationLabel::Nutrition if self.config.route_nutrition => {
                        result.nutrition_changes_saved = Some(
                            self.nutrition
                                .extract_and_save(&user_message.content, &assistant_message.content, user_id)
                                .await,
                        );
                    }
                    _ => {}
                }
                result
            }
            _ => {
                debug!(identity, user_id = ?pair.user_id, "No complete pair to analyze");
                AnalysisResult::nothing_to_analyze(identity, pair.user_id)
            }
        };

        Self::finish(Workflow::Pair, result, timer)
    }

    /// Classify the last `limit` messages (configured window size when `None`)
    pub async fn analyze_window(&self, identity: &str, limit: Option<usize>) -> AnalysisResult {
        let timer = OperationTimer::new("analyze_window");
        let limit = limit.unwrap_or(self.config.window_size);

        let Some(user_id) = self.accessor.resolve_user(identity).await else {
            return Self::finish(Workflow::Window, AnalysisResult::nothing_to_analyze(identity, None), timer);
        };

        let mut window = self.accessor.get_recent_window(identity, limit).await;
        if window.is_empty() {
            return Self::finish(
                Workflow::Window,
                AnalysisResult::nothing_to_analyze(identity, Some(user_id)),
                timer,
            );
        }
        chronological(&mut window);

        let label = self.classifier.classify_window(&window).await;
        let mut result = Self::analyzed(identity, user_id, label, window.len());
        match label {
            ClassificationLabel::Workout => {
                result.workout_changes_saved = Some(self.workouts.extract_and_save_window(&window, user_id).await);
            }
            ClassificationLabel::Nutrition if self.config.route_nutrition => {
                result.nutrition_changes_saved = Some(self.nutrition.extract_and_save_window(&window, user_id).await);
            }
            _ => {}
        }

        Self::finish(Workflow::Window, result, timer)
    }

    /// Keyword-classify the most recent message; never calls the model or extracts
    pub async fn quick_analysis(&self, identity: &str) -> AnalysisResult {
        let timer = OperationTimer::new("quick_analysis");

        let latest = self.accessor.get_recent_window(identity, 1).await;
        let result = match latest.first() {
            Some(message) => {
                let label = Classifier::classify_by_keyword(&message.content);
                Self::analyzed(identity, message.user_id, label, 1)
            }
            None => {
                let user_id = self.accessor.resolve_user(identity).await;
                AnalysisResult::nothing_to_analyze(identity, user_id)
            }
        };

        Self::finish(Workflow::Quick, result, timer)
    }

    /// Run pair analysis for each identity in order, pausing between users.
    ///
    /// Each user runs on its own task so a panic becomes a failed result for
    /// that user only.
    pub async fn batch_analysis(&self, identities: &[String]) -> Vec<AnalysisResult> {
        let delay = Duration::from_millis(self.config.batch_delay_ms);
        let mut results = Vec::with_capacity(identities.len());

        for (index, identity) in identities.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let service = self.clone();
            let owned = identity.clone();
            let result = match tokio::spawn(async move { service.analyze_latest_pair(&owned).await }).await {
                Ok(result) => result,
                Err(e) => {
                    error!(identity = %identity, error = %e, "Batch analysis task failed");
                    PipelineMetrics::record_analysis(Workflow::Pair, false, 0);
                    AnalysisResult::failed(identity, e.to_string())
                }
            };
            results.push(result);
        }

        info!(users = identities.len(), "Batch analysis complete");
        results
    }

    /// Start pair analysis in the background; the handle may be dropped
    pub fn spawn_pair_analysis(&self, identity: impl Into<String>) -> JoinHandle<AnalysisResult> {
        let service = self.clone();
        let identity = identity.into();
        tokio::spawn(async move {
            let result = service.analyze_latest_pair(&identity).await;
            info!(
                identity = %result.identity,
                label = %result.classification,
                success = result.success,
                "Background analysis finished"
            );
            result
        })
    }

    fn analyzed(identity: &str, user_id: i64, label: ClassificationLabel, messages: usize) -> AnalysisResult {
        AnalysisResult {
            classification: label,
            messages_analyzed: messages,
            ..AnalysisResult::nothing_to_analyze(identity, Some(user_id))
        }
    }

    fn finish(workflow: Workflow, mut result: AnalysisResult, timer: OperationTimer) -> AnalysisResult {
        result.processing_time_ms = timer.finish();
        PipelineMetrics::record_analysis(workflow, result.success, result.processing_time_ms);
        info!(
            workflow = workflow.as_str(),
            identity = %result.identity,
            user_id = ?result.user_id,
            label = %result.classification,
            messages = result.messages_analyzed,
            workout_saved = ?result.workout_changes_saved,
            nutrition_saved = ?result.nutrition_changes_saved,
            duration_ms = result.processing_time_ms,
            "Analysis finished"
        );
        result
    }
}

/// Newest-first store order to oldest-first prompt order
fn chronological(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
