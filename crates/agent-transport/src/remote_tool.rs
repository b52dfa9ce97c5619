//! Remote tools
//!
//! Adapts tools advertised by a tool server into the local registry. Each
//! registered tool keeps a handle to the connection it came from.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{AgentError, Result, Tool, ToolCall, ToolOrigin, ToolRegistry, ToolSchema};

use crate::connection::TransportConnection;
use crate::protocol::RemoteToolSpec;

/// A tool that executes on a remote server
pub struct RemoteTool {
    schema: ToolSchema,
    connection: Arc<TransportConnection>,
}

impl RemoteTool {
    pub fn new(spec: &RemoteToolSpec, connection: Arc<TransportConnection>) -> Self {
        Self {
            schema: spec.to_schema(),
            connection,
        }
    }

    pub fn connection(&self) -> &Arc<TransportConnection> {
        &self.connection
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value> {
        let result = self
            .connection
            .call_tool(&call.name, call.arguments.clone())
            .await?;

        if result.is_error {
            let message = match result.content {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(AgentError::ToolExecution(message));
        }
        Ok(result.content)
    }

    fn origin(&self) -> ToolOrigin {
        ToolOrigin::Remote(self.connection.clone())
    }
}

/// Connect and register every tool the server advertises.
/// Returns the registered tool names.
pub async fn register_remote_tools(
    registry: &mut ToolRegistry,
    connection: &Arc<TransportConnection>,
) -> Result<Vec<String>> {
    let specs = connection.connect().await?;
    register_declared_tools(registry, connection, &specs)
}

/// Register tools from a known declaration without connecting; the
/// connection opens on the first call.
pub fn register_declared_tools(
    registry: &mut ToolRegistry,
    connection: &Arc<TransportConnection>,
    specs: &[RemoteToolSpec],
) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(specs.len());
    for spec in specs {
        registry.register(RemoteTool::new(spec, connection.clone()))?;
        names.push(spec.name.clone());
    }
    tracing::info!(
        connection = %connection.id(),
        server = %connection.url(),
        count = names.len(),
        "Registered remote tools"
    );
    Ok(names)
}
