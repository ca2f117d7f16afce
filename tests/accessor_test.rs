mod common;

use std::sync::Arc;

use common::{seed_conversation, temp_repository, FailingStore};
use fitcoach_analysis::accessor::MessageAccessor;
use fitcoach_analysis::models::Role;

#[tokio::test]
async fn test_zero_messages_gives_empty_pair() {
    let (_dir, repository) = temp_repository();
    let user = seed_conversation(&repository, "user_empty", &[]).await;
    let accessor = MessageAccessor::new(repository.clone(), repository);

    let pair = accessor.get_last_pair("user_empty").await;
    assert!(pair.user_message.is_none());
    assert!(pair.assistant_message.is_none());
    assert_eq!(pair.user_id, Some(user.id));
    assert!(!pair.is_complete());
}

#[tokio::test]
async fn test_unknown_identity_gives_all_null() {
    let (_dir, repository) = temp_repository();
    let accessor = MessageAccessor::new(repository.clone(), repository);

    let pair = accessor.get_last_pair("ghost").await;
    assert!(pair.user_id.is_none());
    assert!(pair.user_message.is_none());
    assert!(accessor.get_recent_window("ghost", 10).await.is_empty());
}

#[tokio::test]
async fn test_last_pair_takes_newest_of_each_role() {
    let (_dir, repository) = temp_repository();
    seed_conversation(
        &repository,
        "user_pair",
        &[
            (Role::User, "old question"),
            (Role::Assistant, "old answer"),
            (Role::User, "new question"),
            (Role::Assistant, "new answer"),
        ],
    )
    .await;
    let accessor = MessageAccessor::new(repository.clone(), repository);

    let pair = accessor.get_last_pair("user_pair").await;
    assert!(pair.is_complete());
    assert_eq!(pair.user_message.map(|m| m.content).as_deref(), Some("new question"));
    assert_eq!(pair.assistant_message.map(|m| m.content).as_deref(), Some("new answer"));
}

#[tokio::test]
async fn test_same_role_pair_does_not_search_further_back() {
    let (_dir, repository) = temp_repository();
    seed_conversation(
        &repository,
        "user_double",
        &[
            (Role::User, "question"),
            (Role::Assistant, "answer"),
            (Role::Assistant, "answer again"),
        ],
    )
    .await;
    let accessor = MessageAccessor::new(repository.clone(), repository);

    let pair = accessor.get_last_pair("user_double").await;
    assert!(pair.user_message.is_none());
    assert_eq!(pair.assistant_message.map(|m| m.content).as_deref(), Some("answer again"));
}

#[tokio::test]
async fn test_recent_window_is_newest_first_and_limited() {
    let (_dir, repository) = temp_repository();
    seed_conversation(
        &repository,
        "user_window",
        &[(Role::User, "one"), (Role::Assistant, "two"), (Role::User, "three")],
    )
    .await;
    let accessor = MessageAccessor::new(repository.clone(), repository);

    let window = accessor.get_recent_window("user_window", 2).await;
    let contents: Vec<_> = window.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["three", "two"]);
}

#[tokio::test]
async fn test_store_errors_become_empty_results() {
    let store = Arc::new(FailingStore);
    let accessor = MessageAccessor::new(store.clone(), store);

    assert!(accessor.resolve_user("user_x").await.is_none());
    let pair = accessor.get_last_pair("user_x").await;
    assert!(pair.user_id.is_none() && pair.user_message.is_none() && pair.assistant_message.is_none());
    assert!(accessor.get_recent_window("user_x", 5).await.is_empty());
}
