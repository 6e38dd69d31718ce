use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

const STORAGE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    storage: &'static str,
    storage_latency_ms: Option<u64>,
    timestamp: String,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

enum StorageCheck {
    Connected { latency_ms: u64 },
    Timeout,
    Failed,
}

async fn root(State(state): State<AppState>) -> Response {
    let check = storage_check(&state).await;
    let (storage, latency, ok) = match check {
        StorageCheck::Connected { latency_ms } => ("connected", Some(latency_ms), true),
        StorageCheck::Timeout => ("timeout", None, false),
        StorageCheck::Failed => ("disconnected", None, false),
    };

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        storage,
        storage_latency_ms: latency,
        timestamp: now_iso(),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn storage_check(state: &AppState) -> StorageCheck {
    let started = Instant::now();
    let probe = state.stores().catalog.list_active_steps();
    match tokio::time::timeout(STORAGE_PROBE_TIMEOUT, probe).await {
        Ok(Ok(_)) => StorageCheck::Connected {
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "storage health probe failed");
            StorageCheck::Failed
        }
        Err(_) => StorageCheck::Timeout,
    }
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
