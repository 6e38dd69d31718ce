//! In-process implementation of every storage collaborator.
//!
//! Each collection sits behind its own `parking_lot` lock and every trait
//! method runs inside a single critical section, which gives the same per-key
//! atomicity as the database's conditional writes. Used by tests and by
//! `DB_MODE=memory`.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use pathway_algo::ScheduledReview;

use super::{
    Attempt, AttemptLog, AttemptResult, CurriculumWriter, Progress, ProgressDefaults,
    ProgressPatch, ProgressStore, ProgressUpsert, ReviewItem, ReviewItemStore, Step, StepCatalog,
    StoreResult, VocabularyCatalog, VocabularyItem,
};
use crate::ids::{AttemptId, ItemId, LearnerId, StepId};

#[derive(Default)]
pub struct MemoryStore {
    steps: RwLock<BTreeMap<StepId, Step>>,
    vocabulary: RwLock<BTreeMap<ItemId, VocabularyItem>>,
    progress: Mutex<HashMap<(LearnerId, StepId), Progress>>,
    attempts: Mutex<Vec<Attempt>>,
    reviews: Mutex<HashMap<(LearnerId, ItemId), ReviewItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress_len(&self) -> usize {
        self.progress.lock().len()
    }

    pub fn attempts_len(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[async_trait]
impl StepCatalog for MemoryStore {
    async fn list_active_steps(&self) -> StoreResult<Vec<Step>> {
        let mut steps: Vec<Step> = self
            .steps
            .read()
            .values()
            .filter(|step| step.active)
            .cloned()
            .collect();
        steps.sort_by_key(|step| step.order);
        Ok(steps)
    }

    async fn get_step(&self, id: &StepId) -> StoreResult<Option<Step>> {
        Ok(self.steps.read().get(id).cloned())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert(
        &self,
        learner: &LearnerId,
        step: &StepId,
        patch: &ProgressPatch,
        defaults_on_insert: &ProgressDefaults,
    ) -> StoreResult<ProgressUpsert> {
        let mut guard = self.progress.lock();
        let key = (learner.clone(), step.clone());
        if let Some(existing) = guard.get_mut(&key) {
            let promoted = patch.apply(existing);
            return Ok(ProgressUpsert {
                progress: existing.clone(),
                promoted,
            });
        }
        let outcome = patch.insert(learner, step, defaults_on_insert);
        guard.insert(key, outcome.progress.clone());
        Ok(outcome)
    }

    async fn find_by_learner(&self, learner: &LearnerId) -> StoreResult<Vec<Progress>> {
        Ok(self
            .progress
            .lock()
            .values()
            .filter(|p| &p.learner_id == learner)
            .cloned()
            .collect())
    }

    async fn find(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Progress>> {
        Ok(self
            .progress
            .lock()
            .get(&(learner.clone(), step.clone()))
            .cloned())
    }
}

fn is_open_for(attempt: &Attempt, learner: &LearnerId, step: &StepId) -> bool {
    attempt.is_open() && &attempt.learner_id == learner && &attempt.step_id == step
}

#[async_trait]
impl AttemptLog for MemoryStore {
    async fn open_or_reuse(
        &self,
        learner: &LearnerId,
        step: &StepId,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt> {
        let mut guard = self.attempts.lock();
        if let Some(open) = guard.iter().find(|a| is_open_for(a, learner, step)) {
            return Ok(open.clone());
        }
        let attempt = Attempt {
            id: AttemptId::generate(),
            learner_id: learner.clone(),
            step_id: step.clone(),
            score: 0,
            total_questions: 0,
            correct_answers: 0,
            started_at: now,
            completed_at: None,
            passed: false,
        };
        guard.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_open(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Attempt>> {
        Ok(self
            .attempts
            .lock()
            .iter()
            .find(|a| is_open_for(a, learner, step))
            .cloned())
    }

    async fn close(
        &self,
        id: &AttemptId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Attempt>> {
        let mut guard = self.attempts.lock();
        let Some(attempt) = guard.iter_mut().find(|a| &a.id == id && a.is_open()) else {
            return Ok(None);
        };
        attempt.score = result.score;
        attempt.total_questions = result.total_questions;
        attempt.correct_answers = result.correct_answers;
        attempt.passed = result.passed;
        attempt.completed_at = Some(now);
        Ok(Some(attempt.clone()))
    }

    async fn append_closed(
        &self,
        learner: &LearnerId,
        step: &StepId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt> {
        let attempt = Attempt {
            id: AttemptId::generate(),
            learner_id: learner.clone(),
            step_id: step.clone(),
            score: result.score,
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            started_at: now,
            completed_at: Some(now),
            passed: result.passed,
        };
        self.attempts.lock().push(attempt.clone());
        Ok(attempt)
    }

    async fn list(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Vec<Attempt>> {
        let guard = self.attempts.lock();
        // insertion order breaks ties between equal start times
        let mut out: Vec<Attempt> = guard
            .iter()
            .filter(|a| &a.learner_id == learner && &a.step_id == step)
            .cloned()
            .collect();
        out.reverse();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(out)
    }
}

#[async_trait]
impl ReviewItemStore for MemoryStore {
    async fn find(&self, learner: &LearnerId, item: &ItemId) -> StoreResult<Option<ReviewItem>> {
        Ok(self
            .reviews
            .lock()
            .get(&(learner.clone(), item.clone()))
            .cloned())
    }

    async fn upsert(
        &self,
        learner: &LearnerId,
        item: &ItemId,
        review: &ScheduledReview,
    ) -> StoreResult<ReviewItem> {
        let record = ReviewItem::from_schedule(learner, item, review);
        self.reviews
            .lock()
            .insert((learner.clone(), item.clone()), record.clone());
        Ok(record)
    }

    async fn find_due(
        &self,
        learner: &LearnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<ReviewItem>> {
        let mut due: Vec<ReviewItem> = self
            .reviews
            .lock()
            .values()
            .filter(|r| &r.learner_id == learner && r.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn reviewed_item_ids(&self, learner: &LearnerId) -> StoreResult<HashSet<ItemId>> {
        Ok(self
            .reviews
            .lock()
            .keys()
            .filter(|(l, _)| l == learner)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

#[async_trait]
impl VocabularyCatalog for MemoryStore {
    async fn get_item(&self, id: &ItemId) -> StoreResult<Option<VocabularyItem>> {
        Ok(self.vocabulary.read().get(id).cloned())
    }

    async fn get_items(&self, ids: &[ItemId]) -> StoreResult<Vec<VocabularyItem>> {
        let guard = self.vocabulary.read();
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn list_item_ids(&self) -> StoreResult<Vec<ItemId>> {
        Ok(self.vocabulary.read().keys().cloned().collect())
    }
}

#[async_trait]
impl CurriculumWriter for MemoryStore {
    async fn put_step(&self, step: &Step) -> StoreResult<()> {
        self.steps.write().insert(step.id.clone(), step.clone());
        Ok(())
    }

    async fn put_vocabulary_item(&self, item: &VocabularyItem) -> StoreResult<()> {
        self.vocabulary.write().insert(item.id.clone(), item.clone());
        Ok(())
    }
}
