//! Remote tool server
//!
//! Publishes the field tools over SSE so agents elsewhere can call them.

use std::sync::Arc;

use tower_http::trace::TraceLayer;

use agent_core::ToolRegistry;
use agent_server::{ToolServerSettings, init_tracing};
use agent_transport::{ToolServer, ToolServerConfig};
use field_tools::{FieldSources, register_field_tools, tools::ListDirectoryTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let settings = ToolServerSettings::from_env();

    let sources = if settings.mock_sources {
        FieldSources::mock()
    } else {
        FieldSources::http()?
    };
    let mut registry = ToolRegistry::new();
    register_field_tools(&mut registry, &sources, None)?;
    let directory = settings
        .directory_root
        .clone()
        .map_or_else(ListDirectoryTool::desktop, ListDirectoryTool::new);
    tracing::info!("Listing directories under {}", directory.root().display());
    registry.register(directory)?;

    let server = ToolServer::new(
        ToolServerConfig {
            name: settings.name.clone(),
            heartbeat_interval: settings.heartbeat_interval,
            ..ToolServerConfig::default()
        },
        Arc::new(registry),
    );
    let app = server.router().layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("🚀 {} serving tools on http://{}/sse", settings.name, settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
