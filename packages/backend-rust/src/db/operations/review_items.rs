use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathway_algo::ScheduledReview;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{corrupt_id, from_ms, map_write_error, narrow, to_ms};
use crate::db::SqliteStore;
use crate::ids::{ItemId, LearnerId};
use crate::store::{ReviewItem, ReviewItemStore, StoreResult};

#[async_trait]
impl ReviewItemStore for SqliteStore {
    async fn find(&self, learner: &LearnerId, item: &ItemId) -> StoreResult<Option<ReviewItem>> {
        let row = sqlx::query(
            r#"SELECT * FROM "review_items" WHERE "learnerId" = ? AND "itemId" = ?"#,
        )
        .bind(learner.as_str())
        .bind(item.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(map_review_item).transpose()
    }

    async fn upsert(
        &self,
        learner: &LearnerId,
        item: &ItemId,
        review: &ScheduledReview,
    ) -> StoreResult<ReviewItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO "review_items" (
                "learnerId", "itemId", "intervalDays", "easeFactor", "repetitions",
                "lastReviewedAt", "nextReviewAt"
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ("learnerId", "itemId") DO UPDATE SET
                "intervalDays" = excluded."intervalDays",
                "easeFactor" = excluded."easeFactor",
                "repetitions" = excluded."repetitions",
                "lastReviewedAt" = excluded."lastReviewedAt",
                "nextReviewAt" = excluded."nextReviewAt"
            RETURNING *
            "#,
        )
        .bind(learner.as_str())
        .bind(item.as_str())
        .bind(i64::from(review.state.interval_days))
        .bind(review.state.ease_factor)
        .bind(i64::from(review.state.repetitions))
        .bind(to_ms(review.last_reviewed_at))
        .bind(to_ms(review.next_review_at))
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;
        map_review_item(&row)
    }

    async fn find_due(
        &self,
        learner: &LearnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<ReviewItem>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "review_items"
            WHERE "learnerId" = ? AND "nextReviewAt" <= ?
            ORDER BY "nextReviewAt" ASC, "itemId" ASC
            LIMIT ?
            "#,
        )
        .bind(learner.as_str())
        .bind(to_ms(now))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(map_review_item).collect()
    }

    async fn reviewed_item_ids(&self, learner: &LearnerId) -> StoreResult<HashSet<ItemId>> {
        let raw: Vec<String> =
            sqlx::query_scalar(r#"SELECT "itemId" FROM "review_items" WHERE "learnerId" = ?"#)
                .bind(learner.as_str())
                .fetch_all(self.pool())
                .await?;
        raw.iter()
            .map(|id| ItemId::parse(id).map_err(corrupt_id))
            .collect()
    }
}

fn map_review_item(row: &SqliteRow) -> StoreResult<ReviewItem> {
    let learner_id: String = row.try_get("learnerId")?;
    let item_id: String = row.try_get("itemId")?;
    Ok(ReviewItem {
        learner_id: LearnerId::parse(&learner_id).map_err(corrupt_id)?,
        item_id: ItemId::parse(&item_id).map_err(corrupt_id)?,
        interval_days: narrow("intervalDays", row.try_get::<i64, _>("intervalDays")?)?,
        ease_factor: row.try_get("easeFactor")?,
        repetitions: narrow("repetitions", row.try_get::<i64, _>("repetitions")?)?,
        last_reviewed_at: from_ms("lastReviewedAt", row.try_get("lastReviewedAt")?)?,
        next_review_at: from_ms("nextReviewAt", row.try_get("nextReviewAt")?)?,
    })
}
