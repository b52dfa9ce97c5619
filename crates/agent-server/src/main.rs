//! field-agent HTTP Server
//!
//! Serves the field agent over HTTP. Turns stream back as server-sent
//! events; remote tool servers listed in `TOOL_SERVER_URLS` are connected
//! at startup and their tools registered next to the local ones.

use std::sync::Arc;

use agent_core::{AgentBuilder, LlmProvider, ToolRegistry};
use agent_runtime::OllamaProvider;
use agent_server::{AppState, ServerConfig, init_tracing, router};
use agent_transport::{TransportConnection, register_remote_tools};
use field_tools::{FIELD_AGENT_PROMPT, FieldSources, register_field_tools};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    // Initialize LLM provider
    let provider = Arc::new(OllamaProvider::from_env());
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Ollama ({})", provider.config().generation.model),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - turns will abort");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    // Local tools
    let sources = if config.mock_sources {
        tracing::info!("Using canned field data");
        FieldSources::mock()
    } else {
        FieldSources::http()?
    };
    let mut tools = ToolRegistry::new();
    register_field_tools(&mut tools, &sources, config.directory_root.clone())?;

    // Remote tool servers; one unreachable server does not stop startup
    let mut remotes = Vec::with_capacity(config.tool_servers.len());
    for url in &config.tool_servers {
        let connection = Arc::new(TransportConnection::new(config.transport(url))?);
        match register_remote_tools(&mut tools, &connection).await {
            Ok(names) => tracing::info!("✓ {} tools from {}", names.len(), url),
            Err(e) => tracing::warn!("⚠ Tool server {} unavailable: {}", url, e),
        }
        remotes.push(connection);
    }

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .instructions(FIELD_AGENT_PROMPT)
        .max_iterations(config.max_iterations)
        .busy_policy(config.busy_policy)
        .build()?;

    let app = router(AppState::new(agent).with_remotes(remotes));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 field-agent server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                  - Health check");
    tracing::info!("  GET    /api/tools               - Tool schemas");
    tracing::info!("  POST   /api/sessions            - Create session");
    tracing::info!("  GET    /api/sessions/{{id}}       - Session history");
    tracing::info!("  POST   /api/sessions/{{id}}/query - Streamed turn (SSE)");

    axum::serve(listener, app).await?;

    Ok(())
}
