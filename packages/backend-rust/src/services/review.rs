use std::collections::HashSet;
use std::sync::Arc;

use pathway_algo::{sample_without_replacement, schedule, Rating};
use serde::Serialize;

use super::{EngineError, EngineResult};
use crate::clock::Clock;
use crate::ids::{ItemId, LearnerId};
use crate::store::{ReviewItem, Stores, VocabularyItem};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeSource {
    Due,
    New,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
    #[serde(flatten)]
    pub item: VocabularyItem,
    pub source: PracticeSource,
    pub review: Option<ReviewItem>,
}

#[derive(Clone)]
pub struct ReviewService {
    stores: Stores,
    clock: Arc<dyn Clock>,
    default_batch_size: usize,
    sampling_seed: Option<u64>,
}

impl ReviewService {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, default_batch_size: usize) -> Self {
        Self {
            stores,
            clock,
            default_batch_size: default_batch_size.clamp(1, MAX_BATCH_SIZE),
            sampling_seed: None,
        }
    }

    /// Pins the backfill sample so batches are reproducible.
    pub fn with_sampling_seed(mut self, seed: u64) -> Self {
        self.sampling_seed = Some(seed);
        self
    }

    /// Applies one recall rating and stores the rescheduled item.
    pub async fn submit_rating(
        &self,
        learner_raw: &str,
        item_raw: &str,
        rating_raw: &str,
    ) -> EngineResult<ReviewItem> {
        let learner = LearnerId::parse(learner_raw)?;
        let item = ItemId::parse(item_raw)?;
        let rating: Rating = rating_raw
            .parse()
            .map_err(|err: pathway_algo::UnknownRating| EngineError::InvalidInput(err.to_string()))?;

        if self.stores.vocabulary.get_item(&item).await?.is_none() {
            return Err(EngineError::NotFound(format!("vocabulary item {item} not found")));
        }

        let prior = self.stores.reviews.find(&learner, &item).await?;
        let now = self.clock.now();
        let next = schedule(prior.as_ref().map(ReviewItem::state).as_ref(), rating, now);
        let stored = self.stores.reviews.upsert(&learner, &item, &next).await?;

        tracing::info!(
            learner = %learner,
            item = %item,
            rating = rating.as_str(),
            interval_days = stored.interval_days,
            repetitions = stored.repetitions,
            next_review_at = %stored.next_review_at,
            "review scheduled"
        );
        Ok(stored)
    }

    /// Due items first, earliest due first; the remainder is filled with items
    /// the learner has never reviewed. No item appears twice.
    pub async fn practice_batch(
        &self,
        learner_raw: &str,
        limit: Option<usize>,
    ) -> EngineResult<Vec<PracticeItem>> {
        let learner = LearnerId::parse(learner_raw)?;
        let batch_size = limit
            .unwrap_or(self.default_batch_size)
            .clamp(1, MAX_BATCH_SIZE);
        let now = self.clock.now();

        let due = self.stores.reviews.find_due(&learner, now, batch_size).await?;
        let due_ids: Vec<ItemId> = due.iter().map(|r| r.item_id.clone()).collect();
        let due_content = self.stores.vocabulary.get_items(&due_ids).await?;

        let mut batch: Vec<PracticeItem> = Vec::with_capacity(batch_size);
        let mut seen: HashSet<ItemId> = HashSet::new();
        for review in due {
            let Some(item) = due_content.iter().find(|v| v.id == review.item_id) else {
                tracing::debug!(learner = %learner, item = %review.item_id, "due item missing from vocabulary");
                continue;
            };
            if seen.insert(item.id.clone()) {
                batch.push(PracticeItem {
                    item: item.clone(),
                    source: PracticeSource::Due,
                    review: Some(review),
                });
            }
        }

        let due_count = batch.len();
        let wanted = batch_size.saturating_sub(due_count);
        if wanted > 0 {
            let reviewed = self.stores.reviews.reviewed_item_ids(&learner).await?;
            let candidates: Vec<ItemId> = self
                .stores
                .vocabulary
                .list_item_ids()
                .await?
                .into_iter()
                .filter(|id| !reviewed.contains(id) && !seen.contains(id))
                .collect();

            let seed = self.sampling_seed.unwrap_or_else(rand::random::<u64>);
            let picked = sample_without_replacement(&candidates, wanted, seed);
            for item in self.stores.vocabulary.get_items(&picked).await? {
                if seen.insert(item.id.clone()) {
                    batch.push(PracticeItem {
                        item,
                        source: PracticeSource::New,
                        review: None,
                    });
                }
            }
        }

        tracing::debug!(
            learner = %learner,
            due = due_count,
            new = batch.len() - due_count,
            batch_size,
            "practice batch assembled"
        );
        Ok(batch)
    }
}
