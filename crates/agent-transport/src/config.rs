//! Transport Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP header sent with every request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}

/// Client side of one remote tool server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Event stream URL, e.g. `http://localhost:8000/sse`
    pub url: String,

    /// Bound on GET + endpoint + initialize + tools/list
    #[serde(with = "millis", default = "default_handshake_timeout")]
    pub handshake_timeout: Duration,

    /// Bound on the gap between events once open
    #[serde(with = "millis", default = "default_idle_read_timeout")]
    pub idle_read_timeout: Duration,

    /// Bound on the best-effort shutdown request
    #[serde(with = "millis", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,

    /// User the remote session is created for
    #[serde(default = "default_user")]
    pub user_id: String,

    /// Additional headers
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
}

const fn default_handshake_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_idle_read_timeout() -> Duration {
    Duration::from_secs(900)
}

const fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_user() -> String {
    "agent".into()
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: default_handshake_timeout(),
            idle_read_timeout: default_idle_read_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            user_id: default_user(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn idle_read_timeout(mut self, timeout: Duration) -> Self {
        self.idle_read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderConfig {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Server side of the transport
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Name reported in `initialize`
    pub name: String,

    /// Ping interval; `None` disables heartbeats
    #[serde(default = "default_heartbeat", with = "opt_millis")]
    pub heartbeat_interval: Option<Duration>,

    /// Outbound event buffer per connection
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[allow(clippy::unnecessary_wraps)]
const fn default_heartbeat() -> Option<Duration> {
    Some(Duration::from_secs(15))
}

const fn default_channel_capacity() -> usize {
    64
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            name: "tool-server".into(),
            heartbeat_interval: default_heartbeat(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_long_lived_sse_sessions() {
        let config = TransportConfig::new("http://localhost:8000/sse");
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_read_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_timeouts_deserialize_from_millis() {
        let config: TransportConfig = serde_json::from_str(
            r#"{"url": "http://x/sse", "handshake_timeout": 250, "idle_read_timeout": 1000}"#,
        )
        .unwrap();
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.user_id, "agent");
    }
}
