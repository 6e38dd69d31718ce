use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::Row;

use super::{corrupt_id, map_write_error, narrow};
use crate::db::SqliteStore;
use crate::ids::{ItemId, StepId};
use crate::store::{
    CurriculumWriter, Step, StepCatalog, StoreResult, VocabularyCatalog, VocabularyItem,
};

#[async_trait]
impl StepCatalog for SqliteStore {
    async fn list_active_steps(&self) -> StoreResult<Vec<Step>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "learning_steps"
            WHERE "isActive" = 1
            ORDER BY "order" ASC, "id" ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(map_step).collect()
    }

    async fn get_step(&self, id: &StepId) -> StoreResult<Option<Step>> {
        let row = sqlx::query(r#"SELECT * FROM "learning_steps" WHERE "id" = ?"#)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(map_step).transpose()
    }
}

#[async_trait]
impl VocabularyCatalog for SqliteStore {
    async fn get_item(&self, id: &ItemId) -> StoreResult<Option<VocabularyItem>> {
        let row = sqlx::query(r#"SELECT * FROM "vocabulary" WHERE "id" = ?"#)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(map_vocabulary).transpose()
    }

    async fn get_items(&self, ids: &[ItemId]) -> StoreResult<Vec<VocabularyItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            r#"SELECT * FROM "vocabulary" WHERE "id" IN ("#,
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(self.pool()).await?;
        let mut found = rows
            .iter()
            .map(map_vocabulary)
            .collect::<StoreResult<Vec<_>>>()?;

        let position = |id: &ItemId| ids.iter().position(|x| x == id).unwrap_or(usize::MAX);
        found.sort_by_key(|item| position(&item.id));
        Ok(found)
    }

    async fn list_item_ids(&self) -> StoreResult<Vec<ItemId>> {
        let raw: Vec<String> = sqlx::query_scalar(r#"SELECT "id" FROM "vocabulary" ORDER BY "id""#)
            .fetch_all(self.pool())
            .await?;
        raw.iter()
            .map(|id| ItemId::parse(id).map_err(corrupt_id))
            .collect()
    }
}

#[async_trait]
impl CurriculumWriter for SqliteStore {
    async fn put_step(&self, step: &Step) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO "learning_steps" (
                "id", "title", "order", "categoryId", "requiredScore", "prerequisiteOrders", "isActive"
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ("id") DO UPDATE SET
                "title" = excluded."title",
                "order" = excluded."order",
                "categoryId" = excluded."categoryId",
                "requiredScore" = excluded."requiredScore",
                "prerequisiteOrders" = excluded."prerequisiteOrders",
                "isActive" = excluded."isActive"
            "#,
        )
        .bind(step.id.as_str())
        .bind(&step.title)
        .bind(i64::from(step.order))
        .bind(&step.category_id)
        .bind(i64::from(step.required_score))
        .bind(Json(&step.prerequisite_orders))
        .bind(step.active)
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn put_vocabulary_item(&self, item: &VocabularyItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO "vocabulary" ("id", "word", "translation", "example", "level", "categoryId")
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT ("id") DO UPDATE SET
                "word" = excluded."word",
                "translation" = excluded."translation",
                "example" = excluded."example",
                "level" = excluded."level",
                "categoryId" = excluded."categoryId"
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.word)
        .bind(&item.translation)
        .bind(&item.example)
        .bind(&item.level)
        .bind(item.category_id.as_deref())
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;
        Ok(())
    }
}

fn map_step(row: &SqliteRow) -> StoreResult<Step> {
    let id: String = row.try_get("id")?;
    let Json(prerequisite_orders): Json<Vec<u32>> = row.try_get("prerequisiteOrders")?;
    Ok(Step {
        id: StepId::parse(&id).map_err(corrupt_id)?,
        title: row.try_get("title")?,
        order: narrow("order", row.try_get::<i64, _>("order")?)?,
        category_id: row.try_get("categoryId")?,
        required_score: narrow("requiredScore", row.try_get::<i64, _>("requiredScore")?)?,
        prerequisite_orders,
        active: row.try_get("isActive")?,
    })
}

fn map_vocabulary(row: &SqliteRow) -> StoreResult<VocabularyItem> {
    let id: String = row.try_get("id")?;
    Ok(VocabularyItem {
        id: ItemId::parse(&id).map_err(corrupt_id)?,
        word: row.try_get("word")?,
        translation: row.try_get("translation")?,
        example: row.try_get("example")?,
        level: row.try_get("level")?,
        category_id: row.try_get("categoryId")?,
    })
}
