pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, shutdown::ShutdownHandle, state::AppState, telemetry};
use crate::db::MemoryStore;
use crate::services::grading_engine;
use crate::services::notifier::BroadcastNotifier;
use crate::services::question_paper::PlainTextExtractor;

const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let engine = grading_engine::from_settings(&settings)?;
    let state = AppState::new(
        settings,
        Arc::new(MemoryStore::new()),
        Arc::new(BroadcastNotifier::new(NOTIFICATION_CHANNEL_CAPACITY)),
        engine,
        Arc::new(PlainTextExtractor),
    );

    let shutdown = ShutdownHandle::new();
    let workers = tasks::scheduler::spawn(&state, &shutdown);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server().host,
        port = state.settings().server().port,
        environment = %state.settings().runtime().environment.as_str(),
        "Markdesk API listening"
    );

    let server_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = core::shutdown::shutdown_signal() => server_shutdown.trigger(),
                _ = server_shutdown.wait() => {}
            }
        })
        .await;

    // Stop workers even when the server exits with an error.
    shutdown.trigger();
    tasks::scheduler::join(workers).await;
    tracing::info!("Grading workers stopped");

    result?;

    Ok(())
}
