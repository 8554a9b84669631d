//! Agent collaborator boundary
//!
//! The reasoning engine is a black box to the store: it receives the
//! transcript plus recalled context and returns a reply with optional
//! intermediate steps.

mod prompt;

pub use prompt::build_system_prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::store::{HistoryEntry, KnowledgeEntry, User};

/// Which tier the agent is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    #[default]
    Normal,
    Pro,
}

impl AgentMode {
    pub fn for_user(user: &User) -> Self {
        if user.is_pro { AgentMode::Pro } else { AgentMode::Normal }
    }
}

/// Everything the agent gets for one turn
#[derive(Debug, Clone, Default)]
pub struct AgentRequest {
    pub mode: AgentMode,
    /// The new user message (not yet part of `history`)
    pub prompt: String,
    /// Prior transcript, oldest first
    pub history: Vec<HistoryEntry>,
    /// Recalled user facts, newest first
    pub memory: Vec<String>,
    /// Expert modules matched against the prompt
    pub knowledge: Vec<KnowledgeEntry>,
}

/// An intermediate step reported by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub label: String,
    pub content: String,
}

impl AgentStep {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
        }
    }
}

/// The agent's answer for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub response: String,
    #[serde(default)]
    pub steps: Vec<AgentStep>,
}

impl AgentResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: AgentStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// A conversational agent
#[async_trait]
pub trait Agent: Send + Sync {
    /// Produce a reply for one turn
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse>;
}
