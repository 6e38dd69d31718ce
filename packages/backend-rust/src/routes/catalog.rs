use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/validation", get(validation))
}

async fn validation(State(state): State<AppState>) -> Result<Response, AppError> {
    let report = state.catalog().validate().await?;
    Ok(ok(report))
}
