use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::CompleteStepInput;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id", get(get_path))
        .route("/:learner_id/current-step", get(current_step))
        .route("/:learner_id/steps/:step_id/start", post(start_step))
        .route("/:learner_id/steps/:step_id/complete", post(complete_step))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteStepRequest {
    score: u32,
    #[serde(default)]
    total_questions: u32,
    #[serde(default)]
    correct_answers: u32,
}

async fn get_path(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Result<Response, AppError> {
    let view = state.learning_path().get_path(&learner_id).await?;
    Ok(ok(view))
}

async fn current_step(
    State(state): State<AppState>,
    Path(learner_id): Path<String>,
) -> Result<Response, AppError> {
    let current = state.learning_path().current_step(&learner_id).await?;
    Ok(ok(current))
}

async fn start_step(
    State(state): State<AppState>,
    Path((learner_id, step_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let started = state.learning_path().start_step(&learner_id, &step_id).await?;
    Ok(ok(started))
}

async fn complete_step(
    State(state): State<AppState>,
    Path((learner_id, step_id)): Path<(String, String)>,
    payload: Result<Json<CompleteStepRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let input = CompleteStepInput {
        score: body.score,
        total_questions: body.total_questions,
        correct_answers: body.correct_answers,
    };
    let result = state
        .learning_path()
        .complete_step(&learner_id, &step_id, input)
        .await?;
    Ok(ok(result))
}
