use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{corrupt_id, map_write_error, narrow, opt_from_ms, opt_to_ms};
use crate::db::SqliteStore;
use crate::ids::{LearnerId, StepId};
use crate::store::{
    Progress, ProgressDefaults, ProgressPatch, ProgressStatus, ProgressStore, ProgressUpsert,
    StoreError, StoreResult,
};

const STATUS_RANK_SQL: &str =
    r#"(CASE "status" WHEN 'completed' THEN 2 WHEN 'in_progress' THEN 1 ELSE 0 END)"#;

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn upsert(
        &self,
        learner: &LearnerId,
        step: &StepId,
        patch: &ProgressPatch,
        defaults_on_insert: &ProgressDefaults,
    ) -> StoreResult<ProgressUpsert> {
        let mut tx = self.pool().begin().await?;

        // First statement writes, so the write lock is held until commit.
        let fresh = patch.insert(learner, step, defaults_on_insert);
        let inserted = sqlx::query(
            r#"
            INSERT INTO "user_progress" (
                "learnerId", "stepId", "status", "score", "attemptsCount", "unlockedAt", "completedAt"
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ("learnerId", "stepId") DO NOTHING
            "#,
        )
        .bind(learner.as_str())
        .bind(step.as_str())
        .bind(fresh.progress.status.as_str())
        .bind(i64::from(fresh.progress.score))
        .bind(i64::from(fresh.progress.attempts_count))
        .bind(opt_to_ms(fresh.progress.unlocked_at))
        .bind(opt_to_ms(fresh.progress.completed_at))
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?
        .rows_affected();

        if inserted == 1 {
            tx.commit().await?;
            return Ok(fresh);
        }

        let mut promoted = false;
        if let Some(status) = patch.status {
            let sql = format!(
                r#"UPDATE "user_progress" SET "status" = ?
                   WHERE "learnerId" = ? AND "stepId" = ? AND {STATUS_RANK_SQL} < ?"#
            );
            promoted = sqlx::query(&sql)
                .bind(status.as_str())
                .bind(learner.as_str())
                .bind(step.as_str())
                .bind(status.rank())
                .execute(&mut *tx)
                .await
                .map_err(map_write_error)?
                .rows_affected()
                > 0;
        }

        let row = sqlx::query(
            r#"
            UPDATE "user_progress" SET
                "score" = COALESCE(?, "score"),
                "attemptsCount" = "attemptsCount" + ?,
                "unlockedAt" = COALESCE("unlockedAt", ?),
                "completedAt" = COALESCE(?, "completedAt")
            WHERE "learnerId" = ? AND "stepId" = ?
            RETURNING *
            "#,
        )
        .bind(patch.score.map(i64::from))
        .bind(i64::from(patch.attempts_delta))
        .bind(opt_to_ms(patch.unlocked_at))
        .bind(opt_to_ms(patch.completed_at))
        .bind(learner.as_str())
        .bind(step.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let progress = map_progress(&row)?;
        tx.commit().await?;

        Ok(ProgressUpsert { progress, promoted })
    }

    async fn find_by_learner(&self, learner: &LearnerId) -> StoreResult<Vec<Progress>> {
        let rows = sqlx::query(r#"SELECT * FROM "user_progress" WHERE "learnerId" = ?"#)
            .bind(learner.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(map_progress).collect()
    }

    async fn find(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Progress>> {
        let row = sqlx::query(
            r#"SELECT * FROM "user_progress" WHERE "learnerId" = ? AND "stepId" = ?"#,
        )
        .bind(learner.as_str())
        .bind(step.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(map_progress).transpose()
    }
}

fn map_progress(row: &SqliteRow) -> StoreResult<Progress> {
    let learner_id: String = row.try_get("learnerId")?;
    let step_id: String = row.try_get("stepId")?;
    let status: String = row.try_get("status")?;
    Ok(Progress {
        learner_id: LearnerId::parse(&learner_id).map_err(corrupt_id)?,
        step_id: StepId::parse(&step_id).map_err(corrupt_id)?,
        status: ProgressStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown progress status {status:?}")))?,
        score: narrow("score", row.try_get::<i64, _>("score")?)?,
        attempts_count: narrow("attemptsCount", row.try_get::<i64, _>("attemptsCount")?)?,
        unlocked_at: opt_from_ms("unlockedAt", row.try_get("unlockedAt")?)?,
        completed_at: opt_from_ms("completedAt", row.try_get("completedAt")?)?,
    })
}
