#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use pathway_backend::clock::ManualClock;
use pathway_backend::config::Config;
use pathway_backend::ids::{ItemId, StepId};
use pathway_backend::services::{CompleteStepInput, LearningPathService, ReviewService};
use pathway_backend::state::AppState;
use pathway_backend::store::{MemoryStore, Step, Stores, VocabularyItem};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

pub fn step(id: &str, order: u32, prerequisites: &[u32]) -> Step {
    Step {
        id: StepId::parse(id).unwrap(),
        title: format!("Step {order}"),
        order,
        category_id: "basics".to_string(),
        required_score: 80,
        prerequisite_orders: prerequisites.to_vec(),
        active: true,
    }
}

pub fn word(n: usize) -> VocabularyItem {
    VocabularyItem {
        id: ItemId::parse(&format!("w{n:03}")).unwrap(),
        word: format!("palabra{n}"),
        translation: format!("word{n}"),
        example: String::new(),
        level: "A1".to_string(),
        category_id: None,
    }
}

pub fn passing(score: u32) -> CompleteStepInput {
    CompleteStepInput {
        score,
        total_questions: 10,
        correct_answers: score / 10,
    }
}

pub struct Fixture {
    pub stores: Stores,
    pub memory: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub async fn new(steps: &[Step], words: usize) -> Self {
        let (stores, memory) = Stores::in_memory();
        seed(&stores, steps, words).await;
        Self {
            stores,
            memory,
            clock: Arc::new(ManualClock::new(start_time())),
        }
    }

    pub fn path(&self) -> LearningPathService {
        LearningPathService::new(self.stores.clone(), self.clock.clone())
    }

    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(self.stores.clone(), self.clock.clone(), 10).with_sampling_seed(42)
    }

    pub fn app(&self) -> Router {
        let state = AppState::with_clock(Config::default(), self.stores.clone(), self.clock.clone());
        pathway_backend::build_app(state)
    }
}

pub async fn seed(stores: &Stores, steps: &[Step], words: usize) {
    for s in steps {
        stores.curriculum.put_step(s).await.unwrap();
    }
    for n in 0..words {
        stores.curriculum.put_vocabulary_item(&word(n)).await.unwrap();
    }
}

/// Two-step chain plus a step gated on both 2 and 3.
pub fn gated_catalog() -> Vec<Step> {
    vec![
        step("s1", 1, &[]),
        step("s2", 2, &[1]),
        step("s3", 3, &[1]),
        step("s4", 4, &[2, 3]),
    ]
}
