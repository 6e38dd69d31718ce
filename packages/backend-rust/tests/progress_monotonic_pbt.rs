//! Property-based tests for progress upserts
//!
//! - Status never moves down, whatever order patches arrive in
//! - `promoted` is reported exactly when the status rank rises
//! - Attempts counter equals the sum of deltas
//! - First unlock time sticks

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use pathway_backend::ids::{LearnerId, StepId};
use pathway_backend::store::{ProgressDefaults, ProgressPatch, ProgressStatus, Stores};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_status() -> impl Strategy<Value = ProgressStatus> {
    prop_oneof![
        Just(ProgressStatus::Locked),
        Just(ProgressStatus::InProgress),
        Just(ProgressStatus::Completed),
    ]
}

fn arb_patch() -> impl Strategy<Value = ProgressPatch> {
    (
        proptest::option::of(arb_status()),
        proptest::option::of(0u8..=100),
        0u32..3,
        proptest::option::of(0i64..10_000),
        proptest::option::of(0i64..10_000),
    )
        .prop_map(|(status, score, attempts_delta, unlocked, completed)| {
            let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            ProgressPatch {
                status,
                score,
                attempts_delta,
                unlocked_at: unlocked.map(|s| base + Duration::seconds(s)),
                completed_at: completed.map(|s| base + Duration::seconds(s)),
            }
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn status_only_moves_up(patches in proptest::collection::vec(arb_patch(), 1..20)) {
        let (stores, _) = Stores::in_memory();
        let learner = LearnerId::parse("u1").unwrap();
        let step = StepId::parse("s1").unwrap();

        let outcomes = runtime().block_on(async {
            let mut outcomes = Vec::with_capacity(patches.len());
            for patch in &patches {
                let outcome = stores
                    .progress
                    .upsert(&learner, &step, patch, &ProgressDefaults::default())
                    .await
                    .unwrap();
                outcomes.push(outcome);
            }
            outcomes
        });

        let mut previous: Option<ProgressStatus> = None;
        for outcome in &outcomes {
            let status = outcome.progress.status;
            let floor = previous.unwrap_or(ProgressStatus::Locked);
            prop_assert!(status >= floor);
            let rose = match previous {
                Some(prev) => status > prev,
                None => status > ProgressStatus::Locked,
            };
            prop_assert_eq!(outcome.promoted, rose);
            previous = Some(status);
        }

        let last = &outcomes[outcomes.len() - 1].progress;
        let expected_attempts: u32 = patches.iter().map(|p| p.attempts_delta).sum();
        prop_assert_eq!(last.attempts_count, expected_attempts);

        let first_unlock = patches.iter().find_map(|p| p.unlocked_at);
        prop_assert_eq!(last.unlocked_at, first_unlock);

        let highest = patches
            .iter()
            .filter_map(|p| p.status)
            .max()
            .unwrap_or(ProgressStatus::Locked);
        prop_assert_eq!(last.status, highest);
    }

    #[test]
    fn patch_apply_matches_store(patches in proptest::collection::vec(arb_patch(), 1..12)) {
        let (stores, _) = Stores::in_memory();
        let learner = LearnerId::parse("u1").unwrap();
        let step = StepId::parse("s1").unwrap();
        let defaults = ProgressDefaults::default();

        let stored = runtime().block_on(async {
            let mut last = None;
            for patch in &patches {
                last = Some(stores.progress.upsert(&learner, &step, patch, &defaults).await.unwrap());
            }
            last.unwrap().progress
        });

        let mut model = patches[0].insert(&learner, &step, &defaults).progress;
        for patch in &patches[1..] {
            patch.apply(&mut model);
        }
        prop_assert_eq!(stored, model);
    }
}
