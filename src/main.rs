// WFM Chat - HTTP entry point

use std::sync::Arc;

use anyhow::Context;
use wfm_chat::services::data_access::{server_config, McpDataAccess};
use wfm_chat::storage::ConfigService;
use wfm_chat::utils::logging::init_logging;
use wfm_chat::{
    build_router, AppState, ConversationConfig, ConversationLoop, SessionLimits, SessionStore,
};
use wfm_chat_llm::{AnthropicProvider, LlmProvider};
use wfm_chat_tools::DataAccess;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let service = ConfigService::load().context("failed to load configuration")?;
    init_logging(&service.get_config().log_filter).context("failed to initialize logging")?;
    if let Some(path) = service.config_path() {
        tracing::info!(path = %path.display(), "configuration file loaded");
    }
    let config = service.into_config();

    let provider = AnthropicProvider::new(config.provider_config())
        .context("failed to create model provider")?;
    tracing::info!(model = %provider.model(), "model provider ready");

    let shim = Arc::new(McpDataAccess::new(server_config(&config)));
    match shim.connect().await {
        Ok(count) => tracing::info!(operations = count, "data access connected"),
        Err(e) => tracing::warn!(
            error = %e,
            "data access not reachable yet, will retry on first use"
        ),
    }

    let data_access: Arc<dyn DataAccess> = shim.clone();
    let conversation_loop = ConversationLoop::new(
        Arc::new(provider),
        data_access.clone(),
        ConversationConfig::from(&config),
    );
    let state = AppState::new(
        conversation_loop,
        SessionStore::new(SessionLimits::from(&config)),
        data_access,
        config.model.clone(),
    );

    let addr = config
        .socket_addr()
        .map_err(anyhow::Error::msg)
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown requested");
        })
        .await
        .context("server error")?;

    shim.shutdown().await;
    Ok(())
}
