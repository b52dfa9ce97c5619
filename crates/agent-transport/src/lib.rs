//! # agent-transport
//!
//! Remote tool transport over server-sent events.
//!
//! - [`TransportConnection`]: client side, one per tool server, with
//!   independent handshake and idle-read timeouts
//! - [`RemoteTool`]: registers advertised tools into a local registry
//! - [`ToolServer`]: serves a registry to remote agents
//! - [`RemoteAgentClient`]: streams turns from a hosted agent

pub mod agent_client;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod remote_tool;
pub mod server;

pub use agent_client::{RemoteAgentClient, TurnEventStream};
pub use config::{HeaderConfig, ToolServerConfig, TransportConfig};
pub use connection::{ConnectionState, FailureKind, TransportConnection};
pub use error::{Result, TransportError};
pub use protocol::RemoteToolSpec;
pub use remote_tool::{RemoteTool, register_declared_tools, register_remote_tools};
pub use server::{RemoteSession, ToolServer};
