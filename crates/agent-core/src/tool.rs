//! Tool System
//!
//! Tools are registered at startup and invoked by the decision loop. A tool is
//! a name, a schema and an async handler; remote tools additionally carry the
//! transport they were advertised on so calls route back to the right server.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};

/// Tool arguments, keyed by parameter name
pub type Arguments = Map<String, Value>;

fn new_call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID for correlating results
    #[serde(default = "new_call_id")]
    pub id: String,

    /// Tool identifier
    #[serde(alias = "tool")]
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    /// Build a call with a fresh id. Non-object `arguments` yield an empty map.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: new_call_id(),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Result from tool execution. Always data, never a fault.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { data: Value },
    Failure { message: String },
}

impl ToolResult {
    pub const fn success(data: Value) -> Self {
        Self::Success { data }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text form shown to the model
    pub fn render(&self) -> String {
        match self {
            Self::Success { data: Value::String(s) } => s.clone(),
            Self::Success { data } => data.to_string(),
            Self::Failure { message } => message.clone(),
        }
    }
}

/// One argument that failed validation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        default: Option<Value>,
    ) -> Self {
        Self {
            required: false,
            default,
            ..Self::required(name, param_type, description)
        }
    }

    fn check(&self, value: &Value) -> Option<String> {
        let type_ok = match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        };
        if !type_ok {
            return Some(format!("expected {}, got {}", self.param_type, json_type(value)));
        }
        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                return Some(format!("must be one of {}", Value::Array(allowed.clone())));
            }
        }
        None
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Tool definition schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

impl ToolSchema {
    /// Validate arguments, collecting every violating field
    pub fn validate(&self, arguments: &Arguments) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        for param in &self.parameters {
            match arguments.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    violations.push(FieldViolation::new(&param.name, "missing required parameter"));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if let Some(reason) = param.check(value) {
                        violations.push(FieldViolation::new(&param.name, reason));
                    }
                }
            }
        }
        violations
    }

    /// JSON Schema object describing the arguments
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.param_type));
            prop.insert("description".into(), json!(param.description));
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Rebuild a schema from an advertised JSON Schema object
    pub fn from_json_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &Value,
    ) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut parameters: Vec<ParameterSchema> = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(key, prop)| ParameterSchema {
                        name: key.clone(),
                        param_type: prop
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("any")
                            .to_string(),
                        description: prop
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        required: required.contains(&key.as_str()),
                        default: prop.get("default").cloned(),
                        enum_values: prop.get("enum").and_then(Value::as_array).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        parameters.sort_by(|a, b| b.required.cmp(&a.required).then(a.name.cmp(&b.name)));

        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            category: None,
            has_side_effects: false,
        }
    }
}

/// Connection a remote tool was advertised on
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Connection identifier
    fn id(&self) -> &str;

    /// Server the connection talks to
    fn server(&self) -> &str;

    /// Release the connection and any server-side session
    async fn close(&self);
}

/// Where a tool call is executed
#[derive(Clone, Default)]
pub enum ToolOrigin {
    #[default]
    Local,
    Remote(Arc<dyn ToolTransport>),
}

impl ToolOrigin {
    pub fn label(&self) -> String {
        match self {
            Self::Local => "local".into(),
            Self::Remote(transport) => transport.server().to_string(),
        }
    }

    pub fn transport(&self) -> Option<&Arc<dyn ToolTransport>> {
        match self {
            Self::Local => None,
            Self::Remote(transport) => Some(transport),
        }
    }
}

impl fmt::Debug for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "Local"),
            Self::Remote(t) => f
                .debug_struct("Remote")
                .field("server", &t.server())
                .field("connection", &t.id())
                .finish(),
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with already-validated arguments
    async fn execute(&self, call: &ToolCall) -> Result<Value>;

    /// Where calls to this tool run
    fn origin(&self) -> ToolOrigin {
        ToolOrigin::Local
    }
}

type Handler = Arc<dyn Fn(ToolCall) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Adapts a schema plus an async closure into a [`Tool`]
pub struct FunctionTool {
    schema: ToolSchema,
    handler: Handler,
}

impl FunctionTool {
    pub fn new<F, Fut>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(ToolCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            schema,
            handler: Arc::new(move |call| handler(call).boxed()),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value> {
        (self.handler)(call.clone()).await
    }
}

struct Entry {
    tool: Arc<dyn Tool>,
    schema: ToolSchema,
}

/// Registry for available tools. Built at startup, then shared behind `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        if self.tools.contains_key(&schema.name) {
            return Err(AgentError::DuplicateName(schema.name));
        }
        tracing::debug!(tool = %schema.name, origin = %tool.origin().label(), "Registered tool");
        self.tools.insert(schema.name.clone(), Entry { tool, schema });
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|e| e.tool.clone())
    }

    /// Origin of a registered tool
    pub fn origin_of(&self, name: &str) -> Option<ToolOrigin> {
        self.tools.get(name).map(|e| e.tool.origin())
    }

    /// Invoke a tool call.
    ///
    /// Unknown names and invalid arguments are errors and never reach a
    /// handler. Handler errors and panics come back as
    /// [`ToolResult::Failure`]; only transport faults propagate, so the
    /// caller can end the turn.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        let entry = self
            .tools
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        let violations = entry.schema.validate(&call.arguments);
        if !violations.is_empty() {
            return Err(AgentError::InvalidArguments {
                tool: call.name.clone(),
                violations,
            });
        }

        match AssertUnwindSafe(entry.tool.execute(call)).catch_unwind().await {
            Ok(Ok(data)) => Ok(ToolResult::success(data)),
            Ok(Err(e)) if e.is_transport() => Err(e),
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                Ok(ToolResult::failure(e.to_string()))
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                tracing::error!(tool = %call.name, %detail, "Tool panicked");
                Ok(ToolResult::failure(format!("Tool '{}' panicked: {detail}", call.name)))
            }
        }
    }

    /// All tool schemas, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|e| e.schema.clone()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        render_tool_prompt(&self.schemas())
    }
}

/// Text description of tools for backends that take tools in the prompt
pub fn render_tool_prompt(schemas: &[ToolSchema]) -> String {
    use std::fmt::Write;

    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("Call a tool by responding with one JSON block per call:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

    for schema in schemas {
        let _ = writeln!(prompt, "### {}", schema.name);
        let _ = writeln!(prompt, "{}", schema.description);

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "- `{}` ({}){}: {}",
                    param.name, param.param_type, required, param.description
                );
            }
        }
        prompt.push('\n');
    }

    prompt
}
