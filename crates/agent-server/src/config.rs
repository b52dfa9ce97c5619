//! Server Configuration
//!
//! Read from the environment (after `.env` is loaded by the binary).

use std::path::PathBuf;
use std::time::Duration;

use agent_core::BusyPolicy;
use agent_transport::TransportConfig;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Settings for the `agent-server` binary
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Remote tool servers (`TOOL_SERVER_URLS`, comma separated)
    pub tool_servers: Vec<String>,

    pub handshake_timeout: Duration,
    pub idle_read_timeout: Duration,

    pub max_iterations: usize,
    pub busy_policy: BusyPolicy,

    /// Use canned data instead of the public APIs
    pub mock_sources: bool,

    /// Root for `list_directory`; unset disables the tool
    pub directory_root: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            tool_servers: Vec::new(),
            handshake_timeout: Duration::from_secs(30),
            idle_read_timeout: Duration::from_secs(900),
            max_iterations: agent_core::reasoning::DEFAULT_MAX_ITERATIONS,
            busy_policy: BusyPolicy::Reject,
            mock_sources: false,
            directory_root: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tool_servers = env_or("TOOL_SERVER_URLS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let busy_policy = match env_or("BUSY_POLICY", "reject").to_lowercase().as_str() {
            "queue" => BusyPolicy::Queue,
            _ => BusyPolicy::Reject,
        };

        Self {
            bind_addr: env_or("BIND_ADDR", &defaults.bind_addr),
            tool_servers,
            handshake_timeout: env_parse("TOOL_HANDSHAKE_TIMEOUT_MS")
                .map_or(defaults.handshake_timeout, Duration::from_millis),
            idle_read_timeout: env_parse("TOOL_IDLE_TIMEOUT_MS")
                .map_or(defaults.idle_read_timeout, Duration::from_millis),
            max_iterations: env_parse("MAX_ITERATIONS").unwrap_or(defaults.max_iterations),
            busy_policy,
            mock_sources: env_or("FIELD_SOURCES", "http") == "mock",
            directory_root: std::env::var_os("DIRECTORY_ROOT").map(PathBuf::from),
        }
    }

    /// Transport settings for one remote tool server
    pub fn transport(&self, url: &str) -> TransportConfig {
        TransportConfig::new(url)
            .handshake_timeout(self.handshake_timeout)
            .idle_read_timeout(self.idle_read_timeout)
    }
}

/// Settings for the `tool-server` binary
#[derive(Clone, Debug)]
pub struct ToolServerSettings {
    pub bind_addr: String,
    pub name: String,
    pub heartbeat_interval: Option<Duration>,
    pub mock_sources: bool,
    pub directory_root: Option<PathBuf>,
}

impl ToolServerSettings {
    pub fn from_env() -> Self {
        // 0 disables heartbeats
        let heartbeat_interval = match env_parse::<u64>("HEARTBEAT_INTERVAL_MS") {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(Duration::from_secs(15)),
        };
        Self {
            bind_addr: env_or("TOOL_SERVER_ADDR", "0.0.0.0:8000"),
            name: env_or("TOOL_SERVER_NAME", "field-tools"),
            heartbeat_interval,
            mock_sources: env_or("FIELD_SOURCES", "http") == "mock",
            directory_root: std::env::var_os("DIRECTORY_ROOT").map(PathBuf::from),
        }
    }
}
