use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How a crawl job identifies itself to the sites it loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAgent {
    pub name: String,
    pub user_agent: String,
    /// Minimum delay between two requests to the same host
    pub min_delay_ms: u64,
}

impl ClientAgent {
    pub fn new(name: impl Into<String>, user_agent: impl Into<String>, min_delay_ms: u64) -> Self {
        Self {
            name: name.into(),
            user_agent: user_agent.into(),
            min_delay_ms,
        }
    }

    /// An agent whose user-agent string is derived from its name.
    pub fn named(name: &str) -> Self {
        Self::new(name, format!("{}/1.0", name), 1000)
    }
}

/// Resolves the agent name stored in a profile to a concrete agent.
pub trait AgentRegistry: Send + Sync {
    fn agent(&self, name: &str) -> Option<ClientAgent>;
}

/// Registry backed by a fixed table, answering unknown names with a default agent.
pub struct InMemoryAgentRegistry {
    agents: HashMap<String, ClientAgent>,
    default_agent: ClientAgent,
}

impl InMemoryAgentRegistry {
    pub fn new(default_agent: ClientAgent) -> Self {
        Self {
            agents: HashMap::new(),
            default_agent,
        }
    }

    pub fn with_agent(mut self, agent: ClientAgent) -> Self {
        self.agents.insert(agent.name.clone(), agent);
        self
    }
}

impl AgentRegistry for InMemoryAgentRegistry {
    fn agent(&self, name: &str) -> Option<ClientAgent> {
        match self.agents.get(name) {
            Some(agent) => Some(agent.clone()),
            None => {
                debug!(agent = name, fallback = %self.default_agent.name, "Unknown agent, using default");
                Some(self.default_agent.clone())
            }
        }
    }
}
