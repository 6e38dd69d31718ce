use chrono::Duration;
use futures::future::join_all;
use pathway_backend::ids::{LearnerId, StepId};
use pathway_backend::services::{CurrentStep, EngineError};
use pathway_backend::store::ProgressStatus;

mod common;

use common::{gated_catalog, passing, step, Fixture};

#[tokio::test]
async fn end_to_end_two_step_path() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    let view = path.get_path("u1").await.unwrap();
    assert_eq!(view.steps.len(), 2);
    assert!(view.steps[0].unlocked);
    assert!(!view.steps[1].unlocked);
    assert_eq!(view.steps[0].status, ProgressStatus::Locked);
    assert_eq!(view.current_step.as_ref().unwrap().order, 1);

    let result = path.complete_step("u1", "s1", passing(90)).await.unwrap();
    assert!(result.passed);
    assert_eq!(result.required_score, 80);
    assert_eq!(result.unlocked_steps, vec![StepId::parse("s2").unwrap()]);

    let view = path.get_path("u1").await.unwrap();
    assert_eq!(view.steps[0].status, ProgressStatus::Completed);
    assert!(view.steps[1].unlocked);
    assert_eq!(view.steps[1].status, ProgressStatus::InProgress);
    assert_eq!(view.current_step.as_ref().unwrap().order, 2);
    assert_eq!(view.completed_count, 1);
}

#[tokio::test]
async fn start_requires_every_prerequisite() {
    let fx = Fixture::new(&gated_catalog(), 0).await;
    let path = fx.path();

    let err = path.start_step("u1", "s4").await.unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    path.complete_step("u1", "s1", passing(100)).await.unwrap();
    path.complete_step("u1", "s2", passing(100)).await.unwrap();
    let err = path.start_step("u1", "s4").await.unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    let done = path.complete_step("u1", "s3", passing(100)).await.unwrap();
    assert_eq!(done.unlocked_steps, vec![StepId::parse("s4").unwrap()]);
    let started = path.start_step("u1", "s4").await.unwrap();
    assert_eq!(started.progress.status, ProgressStatus::InProgress);
}

#[tokio::test]
async fn completing_without_starting_records_the_attempt() {
    let fx = Fixture::new(&gated_catalog(), 0).await;
    let result = fx
        .path()
        .complete_step("u1", "s2", passing(100))
        .await
        .unwrap();

    assert!(result.passed);
    assert_eq!(result.attempts_count, 1);
    assert!(result.attempt.passed);
    assert!(!result.attempt.is_open());
    assert!(result.unlocked_steps.is_empty());
    assert_eq!(fx.memory.progress_len(), 1);
    assert_eq!(fx.memory.attempts_len(), 1);

    let learner = LearnerId::parse("u1").unwrap();
    let progress = fx
        .stores
        .progress
        .find(&learner, &StepId::parse("s2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.status, ProgressStatus::Completed);
    assert_eq!(progress.score, 100);
    assert!(progress.completed_at.is_some());
}

#[tokio::test]
async fn duplicate_completion_keeps_one_record() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    let first = path.complete_step("u1", "s1", passing(90)).await.unwrap();
    let second = path.complete_step("u1", "s1", passing(90)).await.unwrap();
    assert_eq!(first.attempts_count, 1);
    assert_eq!(second.attempts_count, 2);
    assert_eq!(first.unlocked_steps.len(), 1);
    assert!(second.unlocked_steps.is_empty());

    // s1 completed plus s2 opened by the unlock scan
    assert_eq!(fx.memory.progress_len(), 2);
    let learner = LearnerId::parse("u1").unwrap();
    let progress = fx
        .stores
        .progress
        .find(&learner, &StepId::parse("s1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.status, ProgressStatus::Completed);
    assert_eq!(progress.attempts_count, 2);
}

#[tokio::test]
async fn concurrent_duplicate_completions_converge() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();
    path.start_step("u1", "s1").await.unwrap();

    let calls = (0..8).map(|_| {
        let path = path.clone();
        tokio::spawn(async move { path.complete_step("u1", "s1", passing(95)).await })
    });
    let results: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let unlocked: usize = results.iter().map(|r| r.unlocked_steps.len()).sum();
    assert_eq!(unlocked, 1, "s2 is reported as newly unlocked exactly once");

    let learner = LearnerId::parse("u1").unwrap();
    let progress = fx
        .stores
        .progress
        .find(&learner, &StepId::parse("s1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.attempts_count, 8);
    assert_eq!(fx.memory.progress_len(), 2);

    let attempts = fx
        .stores
        .attempts
        .list(&learner, &StepId::parse("s1").unwrap())
        .await
        .unwrap();
    assert_eq!(attempts.len(), 8);
    assert!(attempts.iter().all(|a| !a.is_open()));
}

#[tokio::test]
async fn failed_completion_keeps_progress_open() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();
    path.start_step("u1", "s1").await.unwrap();

    let result = path.complete_step("u1", "s1", passing(50)).await.unwrap();
    assert!(!result.passed);
    assert!(result.unlocked_steps.is_empty());
    assert_eq!(result.attempts_count, 1);

    let view = path.get_path("u1").await.unwrap();
    assert_eq!(view.steps[0].status, ProgressStatus::InProgress);
    assert!(view.steps[0].completed_at.is_none());
    assert_eq!(view.steps[0].attempts_count, 1);
    assert!(!view.steps[1].unlocked);
}

#[tokio::test]
async fn status_never_returns_to_locked() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    path.complete_step("u1", "s1", passing(100)).await.unwrap();
    fx.clock.advance(Duration::hours(1));
    let restarted = path.start_step("u1", "s1").await.unwrap();
    assert_eq!(restarted.progress.status, ProgressStatus::Completed);

    path.complete_step("u1", "s1", passing(10)).await.unwrap();
    let view = path.get_path("u1").await.unwrap();
    assert_eq!(view.steps[0].status, ProgressStatus::Completed);
    assert_eq!(view.steps[1].status, ProgressStatus::InProgress);
    assert!(view.steps.iter().all(|s| s.unlocked));
}

#[tokio::test]
async fn restart_keeps_first_unlock_time() {
    let fx = Fixture::new(&[step("s1", 1, &[])], 0).await;
    let path = fx.path();

    let first = path.start_step("u1", "s1").await.unwrap();
    fx.clock.advance(Duration::days(1));
    let again = path.start_step("u1", "s1").await.unwrap();
    assert_eq!(first.progress.unlocked_at, again.progress.unlocked_at);
    assert_eq!(first.attempt_id, again.attempt_id);
}

#[tokio::test]
async fn malformed_learner_reads_as_empty_progress() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    let view = path.get_path("not a key!").await.unwrap();
    assert_eq!(view.steps.len(), 2);
    assert!(view.steps.iter().all(|s| s.status == ProgressStatus::Locked));

    let err = path.start_step("not a key!", "s1").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn object_id_case_variants_share_progress() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    path.complete_step("65A1B2C3D4E5F60718293A4B", "s1", passing(90))
        .await
        .unwrap();
    let view = path.get_path("65a1b2c3d4e5f60718293a4b").await.unwrap();
    assert_eq!(view.steps[0].status, ProgressStatus::Completed);
}

#[tokio::test]
async fn current_step_walks_the_path() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();

    match path.current_step("u1").await.unwrap() {
        CurrentStep::Active { step } => assert_eq!(step.order, 1),
        other => panic!("unexpected {other:?}"),
    }

    path.complete_step("u1", "s1", passing(90)).await.unwrap();
    path.complete_step("u1", "s2", passing(90)).await.unwrap();
    assert!(matches!(
        path.current_step("u1").await.unwrap(),
        CurrentStep::AllCompleted {
            completed: 2,
            total: 2
        }
    ));
}

#[tokio::test]
async fn inactive_completed_steps_still_satisfy_prerequisites() {
    let fx = Fixture::new(&[step("s1", 1, &[]), step("s2", 2, &[1])], 0).await;
    let path = fx.path();
    path.complete_step("u1", "s1", passing(90)).await.unwrap();

    let mut retired = step("s1", 1, &[]);
    retired.active = false;
    fx.stores.curriculum.put_step(&retired).await.unwrap();
    fx.stores.curriculum.put_step(&step("s3", 3, &[1])).await.unwrap();

    let view = path.get_path("u1").await.unwrap();
    assert_eq!(view.steps.len(), 2);
    let added = &view.steps[1];
    assert_eq!(added.order, 3);
    assert_eq!(added.status, ProgressStatus::Locked);
    assert!(added.unlocked);
}
