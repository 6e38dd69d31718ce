//! Storage collaborators consumed by the engine.
//!
//! Each trait is keyed the same way the database enforces uniqueness:
//! progress by `(learner, step)`, review items by `(learner, item)`, and at
//! most one open attempt per `(learner, step)`. Implementations must make
//! every method a single atomic unit against that key.

pub mod memory;
mod types;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathway_algo::ScheduledReview;

use crate::ids::{AttemptId, ItemId, LearnerId, StepId};

pub use memory::MemoryStore;
pub use types::*;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("unique key conflict: {0}")]
    Conflict(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait StepCatalog: Send + Sync {
    /// Active steps, ascending by order
    async fn list_active_steps(&self) -> StoreResult<Vec<Step>>;
    /// Lookup by id, inactive steps included
    async fn get_step(&self, id: &StepId) -> StoreResult<Option<Step>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Atomic update-or-insert keyed by `(learner, step)`.
    async fn upsert(
        &self,
        learner: &LearnerId,
        step: &StepId,
        patch: &ProgressPatch,
        defaults_on_insert: &ProgressDefaults,
    ) -> StoreResult<ProgressUpsert>;

    async fn find_by_learner(&self, learner: &LearnerId) -> StoreResult<Vec<Progress>>;

    async fn find(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Progress>>;
}

#[async_trait]
pub trait AttemptLog: Send + Sync {
    /// Returns the open attempt for the key, creating one if none exists.
    async fn open_or_reuse(
        &self,
        learner: &LearnerId,
        step: &StepId,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt>;

    async fn find_open(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Attempt>>;

    /// Closes the attempt if it is still open. `None` when it is unknown or
    /// another caller closed it first.
    async fn close(
        &self,
        id: &AttemptId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Attempt>>;

    /// Appends an attempt that is closed on creation.
    async fn append_closed(
        &self,
        learner: &LearnerId,
        step: &StepId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt>;

    /// Newest first
    async fn list(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Vec<Attempt>>;
}

#[async_trait]
pub trait ReviewItemStore: Send + Sync {
    async fn find(&self, learner: &LearnerId, item: &ItemId) -> StoreResult<Option<ReviewItem>>;

    async fn upsert(
        &self,
        learner: &LearnerId,
        item: &ItemId,
        review: &ScheduledReview,
    ) -> StoreResult<ReviewItem>;

    /// Items with `next_review_at <= now`, earliest first
    async fn find_due(
        &self,
        learner: &LearnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<ReviewItem>>;

    async fn reviewed_item_ids(&self, learner: &LearnerId) -> StoreResult<HashSet<ItemId>>;
}

#[async_trait]
pub trait VocabularyCatalog: Send + Sync {
    async fn get_item(&self, id: &ItemId) -> StoreResult<Option<VocabularyItem>>;

    /// Missing ids are skipped; output follows the input order.
    async fn get_items(&self, ids: &[ItemId]) -> StoreResult<Vec<VocabularyItem>>;

    async fn list_item_ids(&self) -> StoreResult<Vec<ItemId>>;
}

/// Loading side of the curriculum, used for seeding only.
#[async_trait]
pub trait CurriculumWriter: Send + Sync {
    async fn put_step(&self, step: &Step) -> StoreResult<()>;
    async fn put_vocabulary_item(&self, item: &VocabularyItem) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn StepCatalog>,
    pub progress: Arc<dyn ProgressStore>,
    pub attempts: Arc<dyn AttemptLog>,
    pub reviews: Arc<dyn ReviewItemStore>,
    pub vocabulary: Arc<dyn VocabularyCatalog>,
    pub curriculum: Arc<dyn CurriculumWriter>,
}

impl Stores {
    /// Wires every collaborator to one backend that implements all of them.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: StepCatalog
            + ProgressStore
            + AttemptLog
            + ReviewItemStore
            + VocabularyCatalog
            + CurriculumWriter
            + 'static,
    {
        Self {
            catalog: backend.clone(),
            progress: backend.clone(),
            attempts: backend.clone(),
            reviews: backend.clone(),
            vocabulary: backend.clone(),
            curriculum: backend,
        }
    }

    pub fn in_memory() -> (Self, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (Self::from_backend(Arc::clone(&backend)), backend)
    }
}
