//! Recommender facade: recommend, fallback, model info

mod common;

use common::{create_recommender_with_store, create_test_config, create_test_recommender, FailingStore};
use fitrec_core::{
    BuiltinCatalog, FeedbackSubmission, FitrecError, Goal, ManagerState, ProfileSnapshot,
    ProgramCatalog, RetrainOutcome, Sex, SkipReason, SubmitOutcome, TrainingKind,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_recommend_returns_programs_for_goal() {
    let (recommender, _dir) = create_test_recommender().await;
    let profile = ProfileSnapshot::new(41.0, 118.0, 172.0, Sex::Male);

    let rec = recommender.recommend(&profile).await.unwrap();
    let goal = rec.goal.expect("model should be available");
    assert!(!rec.is_fallback());
    assert_eq!(rec.programs, BuiltinCatalog.programs_for(goal).to_vec());
    assert!(rec.generation.is_some());
}

#[tokio::test]
async fn test_recommend_rejects_invalid_profile() {
    let (recommender, _dir) = create_test_recommender().await;
    let profile = ProfileSnapshot::new(200.0, 70.0, 175.0, Sex::Female);
    assert!(matches!(
        recommender.recommend(&profile).await,
        Err(FitrecError::Validation(_))
    ));
}

#[tokio::test]
async fn test_unavailable_model_falls_back_to_defaults() {
    let (config, _dir) = create_test_config();
    let store = Arc::new(FailingStore::new(&config));
    store.fail_load.store(true, Ordering::SeqCst);
    let recommender = create_recommender_with_store(config, store).await;

    assert_eq!(recommender.manager().state(), ManagerState::Uninitialized);

    let profile = ProfileSnapshot::new(30.0, 70.0, 175.0, Sex::Male);
    let rec = recommender.recommend(&profile).await.unwrap();
    assert!(rec.is_fallback());
    assert_eq!(rec.programs, BuiltinCatalog.default_programs().to_vec());

    // feedback is still recorded; the retrain check just skips
    let outcome = recommender
        .submit_feedback(&FeedbackSubmission::new(
            "sam",
            profile,
            "starter-mix",
            Goal::GeneralHealth,
            4,
        ))
        .await
        .unwrap();
    assert!(outcome.is_recorded());
    assert_eq!(
        recommender.retrain(true).await,
        RetrainOutcome::Skipped(SkipReason::NotInitialized)
    );
}

#[tokio::test]
async fn test_recovers_after_failed_startup_load() {
    let (config, _dir) = create_test_config();
    let store = Arc::new(FailingStore::new(&config));
    store.fail_load.store(true, Ordering::SeqCst);
    let recommender = create_recommender_with_store(config, Arc::clone(&store)).await;
    assert_eq!(recommender.manager().state(), ManagerState::Uninitialized);

    store.fail_load.store(false, Ordering::SeqCst);

    let profile = ProfileSnapshot::new(30.0, 70.0, 175.0, Sex::Male);
    let rec = recommender.recommend(&profile).await.unwrap();
    assert!(!rec.is_fallback());
    assert!(rec.generation.is_some());
    assert_eq!(recommender.manager().state(), ManagerState::Ready);
}

#[tokio::test]
async fn test_operator_retrain_recovers_uninitialized_manager() {
    let (config, _dir) = create_test_config();
    let store = Arc::new(FailingStore::new(&config));
    store.fail_load.store(true, Ordering::SeqCst);
    let recommender = create_recommender_with_store(config, Arc::clone(&store)).await;

    store.fail_load.store(false, Ordering::SeqCst);
    match recommender.retrain(true).await {
        RetrainOutcome::Retrained(summary) => assert_eq!(summary.kind, TrainingKind::Manual),
        other => panic!("expected retrain, got {:?}", other),
    }
    assert_eq!(recommender.manager().state(), ManagerState::Ready);

    let profile = ProfileSnapshot::new(30.0, 70.0, 175.0, Sex::Male);
    assert!(!recommender.recommend(&profile).await.unwrap().is_fallback());
}

#[tokio::test]
async fn test_model_info_includes_feedback_totals() {
    let (recommender, _dir) = create_test_recommender().await;
    let profile = ProfileSnapshot::new(27.0, 61.0, 168.0, Sex::Female);

    for (user, rating) in [("ana", 4u8), ("bea", 2)] {
        let outcome = recommender
            .submit_feedback(&FeedbackSubmission::new(
                user,
                profile,
                "yoga-flow",
                Goal::Flexibility,
                rating,
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Recorded(_)));
    }

    let report = recommender.model_info().await.unwrap();
    assert_eq!(report.feedback_count, 2);
    assert_eq!(report.average_rating, Some(3.0));
    assert_eq!(report.model.state, ManagerState::Ready);
    assert_eq!(report.model.feature_count, 5);
    assert_eq!(report.model.kind, Some(TrainingKind::Initial));
    assert_eq!(report.model.feedback_watermark, Some(0));
}

#[tokio::test]
async fn test_duplicate_through_facade() {
    let (recommender, _dir) = create_test_recommender().await;
    let sub = FeedbackSubmission::new(
        "kim",
        ProfileSnapshot::new(38.0, 77.0, 180.0, Sex::Male),
        "run-base",
        Goal::Endurance,
        3,
    );

    assert!(recommender.submit_feedback(&sub).await.unwrap().is_recorded());
    assert!(matches!(
        recommender.submit_feedback(&sub).await.unwrap(),
        SubmitOutcome::Duplicate { .. }
    ));
    assert_eq!(recommender.feedback_store().stats().await.unwrap().count, 1);
}
