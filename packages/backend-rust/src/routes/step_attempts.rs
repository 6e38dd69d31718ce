use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id/:step_id", get(list))
        .route("/:learner_id/:step_id/stats", get(stats))
}

async fn list(
    State(state): State<AppState>,
    Path((learner_id, step_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let attempts = state.attempts().list_attempts(&learner_id, &step_id).await?;
    Ok(ok(attempts))
}

async fn stats(
    State(state): State<AppState>,
    Path((learner_id, step_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let stats = state.attempts().attempt_stats(&learner_id, &step_id).await?;
    Ok(ok(stats))
}
