use anyhow::Context;
use clap::Parser;
use mia_agent::{AgentService, MissionStore};
use mia_core::Settings;
use mia_knowledge::{embedder_from_settings, KnowledgeBase, VectorStore};
use mia_server::telemetry::init_tracing;
use mia_server::{create_router, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    init_tracing(settings.log_format);
    tracing::info!(version = mia_core::VERSION, "Starting MIA server");

    let audit = settings
        .sqlite_target()
        .map_err(mia_core::AuditError::from)
        .and_then(|target| MissionStore::open(&target))
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!(
                error = %e,
                "CRITICAL: audit database unavailable, continuing without it"
            );
            e.to_string()
        });

    let store = VectorStore::open(&settings.chroma_dir).with_context(|| {
        format!(
            "failed to open vector store at {}",
            settings.chroma_dir.display()
        )
    })?;
    let embedder = embedder_from_settings(&settings).context("failed to build embedder")?;
    let knowledge = KnowledgeBase::new(Arc::new(store), embedder);

    let agent = AgentService::from_settings(&settings, knowledge.clone(), audit.clone().ok())
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!(error = %e, "Agent unavailable, mission routes will fail");
            e.to_string()
        });

    let state = AppState {
        knowledge,
        audit,
        agent,
    };
    let app = create_router(state, &settings.cors_origins());

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully");
}
