//! Feedback store behaviour through the public API

mod common;

use common::{create_test_config, create_test_recommender};
use fitrec_core::feedback::anonymize_user;
use fitrec_core::{
    FeedbackStore, FeedbackSubmission, FitrecError, Goal, ProfileSnapshot, Sex, SubmitOutcome,
};
use tokio_stream::StreamExt;

fn sample_submission() -> FeedbackSubmission {
    FeedbackSubmission::new(
        "maria",
        ProfileSnapshot::new(34.0, 68.0, 165.0, Sex::Female),
        "yoga-flow",
        Goal::Flexibility,
        5,
    )
    .with_comment("loved it")
}

async fn collect(store: &FeedbackStore) -> Vec<fitrec_core::FeedbackRecord> {
    let mut stream = store.load_feedback(true).await.unwrap();
    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row.unwrap());
    }
    rows
}

#[tokio::test]
async fn test_submit_then_load_returns_matching_record() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());
    let submission = sample_submission();

    let outcome = store.submit_feedback(&submission).await.unwrap();
    let recorded = match outcome {
        SubmitOutcome::Recorded(record) => record,
        other => panic!("expected Recorded, got {:?}", other),
    };

    let rows = collect(&store).await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row, &recorded);
    assert_eq!(row.user_hash, anonymize_user("", "maria"));
    assert_eq!(row.program_id, "yoga-flow");
    assert_eq!(row.recommended_goal, Goal::Flexibility);
    assert_eq!(row.corrected_goal, None);
    assert_eq!(row.rating, 5);
    assert_eq!(row.comment, "loved it");

    let expected_bmi = 68.0 / (1.65 * 1.65);
    assert!((row.bmi - expected_bmi).abs() < 1e-9);
}

#[tokio::test]
async fn test_username_never_stored() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());
    store.submit_feedback(&sample_submission()).await.unwrap();

    let raw = std::fs::read_to_string(config.feedback_path()).unwrap();
    assert!(!raw.contains("maria"));
}

#[tokio::test]
async fn test_duplicate_within_window() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());

    let first = store.submit_feedback(&sample_submission()).await.unwrap();
    let first_at = match first {
        SubmitOutcome::Recorded(record) => record.timestamp,
        other => panic!("expected Recorded, got {:?}", other),
    };

    let second = store.submit_feedback(&sample_submission()).await.unwrap();
    assert_eq!(second, SubmitOutcome::Duplicate { previous_at: first_at });
    assert_eq!(collect(&store).await.len(), 1);
}

#[tokio::test]
async fn test_rating_zero_rejected_and_nothing_stored() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());
    store.submit_feedback(&sample_submission()).await.unwrap();
    let before = store.stats().await.unwrap().count;

    let mut bad = sample_submission();
    bad.username = "someone-else".to_string();
    bad.rating = 0;

    let err = store.submit_feedback(&bad).await.unwrap_err();
    assert!(matches!(err, FitrecError::Validation(_)));
    assert_eq!(store.stats().await.unwrap().count, before);
}

#[tokio::test]
async fn test_invalid_profile_rejected() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());

    let mut bad = sample_submission();
    bad.profile.height_cm = f64::INFINITY;
    assert!(matches!(
        store.submit_feedback(&bad).await,
        Err(FitrecError::Validation(_))
    ));
    assert!(!config.feedback_path().exists());
}

#[tokio::test]
async fn test_stream_is_restartable() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());
    store.submit_feedback(&sample_submission()).await.unwrap();

    let first = collect(&store).await;
    store
        .submit_feedback(&FeedbackSubmission::new(
            "li",
            ProfileSnapshot::new(51.0, 90.0, 182.0, Sex::Male),
            "steady-cardio",
            Goal::WeightLoss,
            3,
        ))
        .await
        .unwrap();
    let second = collect(&store).await;

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(first[0], second[0]);
}

#[tokio::test]
async fn test_stats_average() {
    let (config, _dir) = create_test_config();
    let store = FeedbackStore::new(config.feedback_path(), config.feedback.clone());
    for (user, rating) in [("a", 2u8), ("b", 4), ("c", 5)] {
        let mut sub = sample_submission();
        sub.username = user.to_string();
        sub.rating = rating;
        store.submit_feedback(&sub).await.unwrap();
    }

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.count, 3);
    let avg = stats.average_rating.unwrap();
    assert!((avg - 11.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_facade_rejects_unknown_program() {
    let (recommender, _dir) = create_test_recommender().await;
    let mut sub = sample_submission();
    sub.program_id = "underwater-basket-weaving".to_string();

    let err = recommender.submit_feedback(&sub).await.unwrap_err();
    assert!(matches!(err, FitrecError::Validation(_)));
    assert_eq!(recommender.feedback_store().stats().await.unwrap().count, 0);
}
