use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practice", get(practice))
        .route("/:item_id/progress", post(submit_rating))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticeQuery {
    user_id: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingRequest {
    user_id: String,
    rating: String,
}

async fn practice(
    State(state): State<AppState>,
    query: Result<Query<PracticeQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let batch = state.reviews().practice_batch(&query.user_id, query.limit).await?;
    Ok(ok(batch))
}

async fn submit_rating(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let stored = state
        .reviews()
        .submit_rating(&body.user_id, &item_id, &body.rating)
        .await?;
    Ok(ok(stored))
}
