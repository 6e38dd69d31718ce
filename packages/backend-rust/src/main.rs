use std::process::ExitCode;

use pathway_backend::config::Config;
use pathway_backend::db::{self, config::DbConfig};
use pathway_backend::logging::init_tracing;
use pathway_backend::seed::seed_from_path;
use pathway_backend::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let db_config = match DbConfig::from_env() {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "invalid database configuration");
            return ExitCode::FAILURE;
        }
    };

    let stores = match db::init_stores(&db_config).await {
        Ok(stores) => stores,
        Err(err) => {
            tracing::error!(error = %err, "storage initialization failed");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = config.catalog_seed_path.as_deref() {
        if let Err(err) = seed_from_path(&stores, path, config.strict_catalog).await {
            tracing::error!(error = %err, path = %path.display(), "catalog seeding failed");
            return ExitCode::FAILURE;
        }
    }

    let state = AppState::new(config.clone(), stores);
    match state.catalog().validate().await {
        Ok(report) if report.valid => {
            tracing::info!(steps = report.step_count, "catalog validated");
        }
        Ok(report) => {
            tracing::warn!(
                steps = report.step_count,
                issues = report.issues.len(),
                blocking = report.blocking,
                "catalog has issues"
            );
        }
        Err(err) => {
            tracing::error!(error = %err, "catalog validation failed");
            return ExitCode::FAILURE;
        }
    }

    let app = pathway_backend::build_app(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "pathway-backend listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("graceful shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
