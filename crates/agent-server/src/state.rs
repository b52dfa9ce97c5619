//! Application State

use std::sync::Arc;

use agent_core::Agent;
use agent_transport::TransportConnection;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Decision loop, tools and sessions
    pub agent: Agent,

    /// One connection per remote tool server
    pub remotes: Arc<Vec<Arc<TransportConnection>>>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            remotes: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_remotes(mut self, remotes: Vec<Arc<TransportConnection>>) -> Self {
        self.remotes = Arc::new(remotes);
        self
    }
}
