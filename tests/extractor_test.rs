mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{seed_conversation, temp_repository, FailingClient, ScriptedClient};
use fitcoach_analysis::extractors::{Extraction, NutritionExtractor, WorkoutExtractor};
use fitcoach_analysis::llm::LlmGateway;
use fitcoach_analysis::repository::{NutritionStore, WorkoutStore};
use fitcoach_analysis::utils::JsonIslandExtractor;
use fitcoach_analysis::CompletionClient;

fn gateway(client: Arc<dyn CompletionClient>) -> LlmGateway {
    LlmGateway::new(client, Duration::from_secs(2), 0, Duration::from_millis(1))
}

fn json() -> JsonIslandExtractor {
    JsonIslandExtractor::new(32_000).expect("Failed to build JSON extractor")
}

#[tokio::test]
async fn test_workout_extraction_tolerates_prose_and_fences() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_prose", &[]).await;

    let reply = "Here is the update you asked for:\n```json\n[\n  {\"workout_day_name\": \"Wednesday\", \"exercise_name\": \"Pull-ups\", \"required_sets\": \"4\", \"required_reps\": 8.0, \"rest_seconds\": 90, \"notes\": \"bodyweight\"}\n]\n```\nGood luck!";
    let client = Arc::new(ScriptedClient::new("workout", reply, "{}"));
    let extractor = WorkoutExtractor::new(gateway(client), json(), repository.clone());

    assert!(extractor.extract_and_save("add pull-ups", "done", user.id).await);

    let stored = repository.workout_changes(user.id).await.expect("Failed to read workouts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.required_sets, Some(4));
    assert_eq!(stored[0].record.required_reps, Some(8));
    assert_eq!(stored[0].record.rest_seconds, Some(90));
    assert_eq!(stored[0].record.notes.as_deref(), Some("bodyweight"));
}

#[tokio::test]
async fn test_invalid_workout_records_filtered_valid_ones_saved() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_mixed", &[]).await;

    let reply = r#"[
        {"workout_day_name": "Monday", "exercise_name": "Squat", "required_sets": 500},
        {"workout_day_name": "Monday", "required_sets": 3},
        {"workout_day_name": "Monday", "exercise_name": "Bench press", "required_sets": 50}
    ]"#;
    let extractor = WorkoutExtractor::new(
        gateway(Arc::new(ScriptedClient::new("workout", reply, "{}"))),
        json(),
        repository.clone(),
    );

    assert!(extractor.extract_and_save("u", "a", user.id).await);

    let stored = repository.workout_changes(user.id).await.expect("Failed to read workouts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record.exercise_name, "Bench press");
    assert_eq!(stored[0].record.required_sets, Some(50));
}

#[tokio::test]
async fn test_unparseable_reply_is_empty_outcome_not_failure() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_garbled", &[]).await;

    let client = Arc::new(ScriptedClient::new("workout", "I couldn't find any changes, sorry!", "{calories: lots"));
    let workouts = WorkoutExtractor::new(gateway(client.clone()), json(), repository.clone());
    let nutrition = NutritionExtractor::new(gateway(client), json(), repository.clone());

    assert!(matches!(workouts.extract("u", "a").await, Extraction::ParseError(_)));
    assert!(workouts.extract_and_save("u", "a", user.id).await);
    assert!(nutrition.extract_and_save("u", "a", user.id).await);

    assert!(repository.workout_changes(user.id).await.expect("read").is_empty());
    assert!(repository.nutrition_history(user.id).await.expect("read").is_empty());
}

#[tokio::test]
async fn test_model_outage_is_unavailable_and_returns_true() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_outage", &[]).await;

    let extractor = NutritionExtractor::new(gateway(Arc::new(FailingClient)), json(), repository.clone());
    assert!(matches!(extractor.extract("u", "a").await, Extraction::Unavailable(_)));
    assert!(extractor.extract_and_save("u", "a", user.id).await);
}

#[tokio::test]
async fn test_two_nutrition_extractions_append_two_entries() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_meals", &[]).await;

    let client = Arc::new(ScriptedClient::new(
        "nutrition",
        "[]",
        r#"{"calories_consumed": 99999, "protein_consumed": 35, "carbs_consumed": 60}"#,
    ));
    let extractor = NutritionExtractor::new(gateway(client), json(), repository.clone());

    assert!(extractor.extract_and_save("breakfast", "noted", user.id).await);
    assert!(extractor.extract_and_save("breakfast again", "noted", user.id).await);

    let history = repository.nutrition_history(user.id).await.expect("Failed to read history");
    assert_eq!(history.len(), 2);
    assert_ne!(history[0].recorded_at, history[1].recorded_at);
    for entry in &history {
        assert_eq!(entry.record.calories_consumed, None);
        assert_eq!(entry.record.protein_consumed, Some(35.0));
        assert_eq!(entry.record.carbs_consumed, Some(60.0));
    }
}

#[tokio::test]
async fn test_prompt_carries_transcript_and_date() {
    let (_dir, repository) = temp_repository();
    let client = Arc::new(ScriptedClient::new("workout", "[]", "{}"));
    let extractor = WorkoutExtractor::new(gateway(client.clone()), json(), repository);

    assert_eq!(extractor.extract("Add squats", "Added").await, Extraction::Empty);

    let requests = client.requests.lock().expect("lock");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].system_prompt.contains("JSON array"));
    assert!(requests[0].system_prompt.contains("Today's date is"));
    assert_eq!(requests[0].messages[0].content, "User: Add squats\nAssistant: Added");
}
