pub(crate) mod api;
pub(crate) mod core;
pub mod grading;
pub(crate) mod schemas;
pub mod services;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::grading::ScoringEngine;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let (resolvers, backends) = services::resolvers_from_settings(&settings)?;
    let state = AppState::new(settings, resolvers, backends, ScoringEngine::default());

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        embeddings = backends.embeddings,
        llm_feedback = backends.llm_feedback,
        worker_concurrency = state.settings().grading().worker_concurrency,
        "Deseva API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;
    tracing::info!("Server stopped");

    Ok(())
}
