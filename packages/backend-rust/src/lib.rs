pub mod clock;
pub mod config;
pub mod db;
pub mod ids;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::config::DbConfig;
use crate::db::DbInitError;
use crate::state::AppState;

/// Router with the standard tracing and CORS layers.
pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Builds the application from environment configuration.
pub async fn create_app() -> Result<axum::Router, DbInitError> {
    let config = Config::from_env();
    let stores = db::init_stores(&DbConfig::from_env()?).await?;
    Ok(build_app(AppState::new(config, stores)))
}
