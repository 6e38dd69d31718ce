use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{corrupt_id, from_ms, map_write_error, narrow, opt_from_ms, to_ms};
use crate::db::SqliteStore;
use crate::ids::{AttemptId, LearnerId, StepId};
use crate::store::{Attempt, AttemptLog, AttemptResult, StoreError, StoreResult};

#[async_trait]
impl AttemptLog for SqliteStore {
    async fn open_or_reuse(
        &self,
        learner: &LearnerId,
        step: &StepId,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt> {
        let id = AttemptId::generate();
        let mut tx = self.pool().begin().await?;

        // the partial unique index admits one open attempt per key
        sqlx::query(
            r#"
            INSERT INTO "step_attempts" ("id", "learnerId", "stepId", "startedAt")
            VALUES (?, ?, ?, ?)
            ON CONFLICT ("learnerId", "stepId") WHERE "completedAt" IS NULL DO NOTHING
            "#,
        )
        .bind(id.as_str())
        .bind(learner.as_str())
        .bind(step.as_str())
        .bind(to_ms(now))
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let row = sqlx::query(
            r#"
            SELECT * FROM "step_attempts"
            WHERE "learnerId" = ? AND "stepId" = ? AND "completedAt" IS NULL
            "#,
        )
        .bind(learner.as_str())
        .bind(step.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        match row {
            Some(row) => map_attempt(&row),
            None => Err(StoreError::Conflict(format!(
                "open attempt for {learner}/{step} vanished"
            ))),
        }
    }

    async fn find_open(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Option<Attempt>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM "step_attempts"
            WHERE "learnerId" = ? AND "stepId" = ? AND "completedAt" IS NULL
            "#,
        )
        .bind(learner.as_str())
        .bind(step.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(map_attempt).transpose()
    }

    async fn close(
        &self,
        id: &AttemptId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Attempt>> {
        let row = sqlx::query(
            r#"
            UPDATE "step_attempts" SET
                "score" = ?,
                "totalQuestions" = ?,
                "correctAnswers" = ?,
                "passed" = ?,
                "completedAt" = ?
            WHERE "id" = ? AND "completedAt" IS NULL
            RETURNING *
            "#,
        )
        .bind(i64::from(result.score))
        .bind(i64::from(result.total_questions))
        .bind(i64::from(result.correct_answers))
        .bind(result.passed)
        .bind(to_ms(now))
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_write_error)?;
        row.as_ref().map(map_attempt).transpose()
    }

    async fn append_closed(
        &self,
        learner: &LearnerId,
        step: &StepId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> StoreResult<Attempt> {
        let id = AttemptId::generate();
        let row = sqlx::query(
            r#"
            INSERT INTO "step_attempts" (
                "id", "learnerId", "stepId", "score", "totalQuestions", "correctAnswers",
                "startedAt", "completedAt", "passed"
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(id.as_str())
        .bind(learner.as_str())
        .bind(step.as_str())
        .bind(i64::from(result.score))
        .bind(i64::from(result.total_questions))
        .bind(i64::from(result.correct_answers))
        .bind(to_ms(now))
        .bind(to_ms(now))
        .bind(result.passed)
        .fetch_one(self.pool())
        .await
        .map_err(map_write_error)?;
        map_attempt(&row)
    }

    async fn list(&self, learner: &LearnerId, step: &StepId) -> StoreResult<Vec<Attempt>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "step_attempts"
            WHERE "learnerId" = ? AND "stepId" = ?
            ORDER BY "startedAt" DESC, rowid DESC
            "#,
        )
        .bind(learner.as_str())
        .bind(step.as_str())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(map_attempt).collect()
    }
}

fn map_attempt(row: &SqliteRow) -> StoreResult<Attempt> {
    let id: String = row.try_get("id")?;
    let learner_id: String = row.try_get("learnerId")?;
    let step_id: String = row.try_get("stepId")?;
    Ok(Attempt {
        id: AttemptId::parse(&id).map_err(corrupt_id)?,
        learner_id: LearnerId::parse(&learner_id).map_err(corrupt_id)?,
        step_id: StepId::parse(&step_id).map_err(corrupt_id)?,
        score: narrow("score", row.try_get::<i64, _>("score")?)?,
        total_questions: narrow("totalQuestions", row.try_get::<i64, _>("totalQuestions")?)?,
        correct_answers: narrow("correctAnswers", row.try_get::<i64, _>("correctAnswers")?)?,
        started_at: from_ms("startedAt", row.try_get("startedAt")?)?,
        completed_at: opt_from_ms("completedAt", row.try_get("completedAt")?)?,
        passed: row.try_get("passed")?,
    })
}
