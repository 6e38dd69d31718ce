mod catalog;
mod health;
mod learning_path;
mod step_attempts;
mod vocabulary;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/learning-path", learning_path::router())
        .nest("/api/step-attempts", step_attempts::router())
        .nest("/api/vocabulary", vocabulary::router())
        .nest("/api/catalog", catalog::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
