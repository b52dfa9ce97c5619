//! # agent-core
//!
//! Tool-augmented agent decision loop with a provider-agnostic inference
//! abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Agent                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Decision   │  │    Tool     │  │   LlmProvider       │  │
//! │  │    Loop     │──│  Registry   │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                │ remote tools                     │
//! │  ┌─────────────┐  ┌─────────────┐                           │
//! │  │  Session    │  │ToolTransport│                           │
//! │  │  Manager    │  │ (per server)│                           │
//! │  └─────────────┘  └─────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Agent::run_turn` yields a [`TurnStream`] of [`TurnEvent`]s ending in
//! exactly one `FinalText` or `Aborted`.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod stream;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Content, Message, Role, ToolExchange};
pub use provider::{Decision, InferenceContext, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use session::{BusyPolicy, Session, SessionId, SessionManager};
pub use stream::{AbortKind, AbortReason, TurnEvent, TurnOutcome, TurnStream};
pub use tool::{
    FunctionTool, ParameterSchema, Tool, ToolCall, ToolOrigin, ToolRegistry, ToolResult,
    ToolSchema, ToolTransport,
};
