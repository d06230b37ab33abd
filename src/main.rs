use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use account_service::assistant::{LoopLimits, Orchestrator};
use account_service::auth::JwtManager;
use account_service::config::{AssistantConfig, AuthConfig, ServerConfig};
use account_service::context::AppContext;
use account_service::llm::create_provider;
use account_service::server::build_router;
use account_service::store::{Database, LibSqlBackend};
use account_service::tools::builtin::builtin_registry;

/// Console logging, plus a daily rolling file when `log_dir` is set.
/// The returned guard must live as long as the process.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "account-service.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server_config = ServerConfig::from_env()?;
    let _log_guard = init_tracing(server_config.log_dir.as_deref());

    let auth_config = AuthConfig::from_env()?;
    let assistant_config = AssistantConfig::from_env()?;

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&server_config.database_path)
            .await
            .with_context(|| {
                format!(
                    "failed to open database at {}",
                    server_config.database_path.display()
                )
            })?,
    );

    // ── Assistant ────────────────────────────────────────────────────────
    let llm = create_provider(&assistant_config).context("failed to create LLM provider")?;
    let tools = builtin_registry(
        Arc::clone(&store),
        Arc::clone(&llm),
        assistant_config.final_max_tokens,
    )
    .context("failed to register assistant tools")?;
    tracing::info!(tools = tools.count(), model = %llm.model_name(), "Assistant ready");

    let orchestrator = Orchestrator::new(
        llm,
        Arc::new(tools),
        LoopLimits::from(&assistant_config),
    );

    let ctx = AppContext::new(store, JwtManager::new(&auth_config), orchestrator);
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", server_config.port))
        .await
        .with_context(|| format!("failed to bind port {}", server_config.port))?;
    tracing::info!(
        port = server_config.port,
        database = %server_config.database_path.display(),
        "Account service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
