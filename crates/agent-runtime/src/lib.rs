//! # agent-runtime
//!
//! Inference backends that turn an [`agent_core::InferenceContext`] into a
//! decision.
//!
//! Ollama (feature `ollama`, on by default) streams plain text. Tool calls
//! come back as fenced JSON blocks, split out by [`parse`]:
//!
//! ````text
//! ```tool
//! {"tool": "lookup_coordinates", "arguments": {"city": "Oslo"}}
//! ```
//! ````
//!
//! ```rust,ignore
//! let provider = OllamaProvider::new("http://localhost", 11434);
//! let agent = AgentBuilder::new().provider(Arc::new(provider)).build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod parse;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
