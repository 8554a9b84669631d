//! Chat turn workflow
//!
//! Wires the store, the quota gate and the agent together for one turn.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentMode, AgentRequest, AgentResponse};
use crate::quota::{self, FREE_REQUEST_LIMIT, QuotaDecision, UnlockCode};
use crate::store::{DEFAULT_HISTORY_LIMIT, MemoryFact, NewUser, Role, Store, User};
use crate::{Error, Result};

/// Result of a chat turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The free quota is used up; nothing was stored
    Denied { limit: u64 },
    Replied(AgentResponse),
}

/// Runs chat turns for users of one store
#[derive(Clone)]
pub struct ChatService {
    store: Store,
    agent: Arc<dyn Agent>,
    unlock_code: Option<UnlockCode>,
}

impl ChatService {
    pub fn new(store: Store, agent: Arc<dyn Agent>) -> Self {
        Self {
            store,
            agent,
            unlock_code: None,
        }
    }

    pub fn with_unlock_code(mut self, code: Option<UnlockCode>) -> Self {
        self.unlock_code = code;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch the user, creating it on first sight
    pub fn ensure_user(&self, user_id: &str, username: &str, role: &str) -> Result<User> {
        if let Some(user) = self.store.get_user(user_id)? {
            self.store.touch_user(user_id)?;
            return Ok(user);
        }
        self.store
            .create_user(NewUser::new(username).with_id(user_id).with_role(role))
    }

    pub fn open_session(&self, user_id: &str, title: &str) -> Result<String> {
        self.store.create_session(user_id, title)
    }

    /// Run one turn
    ///
    /// History is read before the prompt is stored, so the agent sees the
    /// prompt once. The request counter only moves after the agent answered.
    pub async fn send(&self, user_id: &str, session_id: &str, prompt: &str) -> Result<ChatOutcome> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        if quota::check(&user) == QuotaDecision::Deny {
            info!("User {} reached the free limit", user_id);
            return Ok(ChatOutcome::Denied {
                limit: FREE_REQUEST_LIMIT,
            });
        }

        let history = self.store.get_history(session_id, DEFAULT_HISTORY_LIMIT)?;
        self.store.add_message(session_id, Role::User, prompt)?;

        let request = AgentRequest {
            mode: AgentMode::for_user(&user),
            prompt: prompt.to_string(),
            history,
            memory: self.store.get_memory(user_id)?,
            knowledge: self.store.search(prompt)?,
        };
        debug!(
            "Running agent: history={}, memory={}, knowledge={}",
            request.history.len(),
            request.memory.len(),
            request.knowledge.len()
        );

        let reply = self.agent.run(request).await?;

        self.store
            .add_message(session_id, Role::Assistant, &reply.response)?;
        self.store.increment_request_count(user_id)?;

        Ok(ChatOutcome::Replied(reply))
    }

    pub fn remember(&self, user_id: &str, fact: &str) -> Result<MemoryFact> {
        self.store.add_memory(user_id, fact)
    }

    /// Upgrade the user to pro if `code` is the configured unlock code
    pub fn unlock(&self, user_id: &str, code: &str) -> Result<bool> {
        let Some(expected) = &self.unlock_code else {
            warn!("Unlock attempted but no unlock code is configured");
            return Ok(false);
        };
        if !expected.matches(code) {
            return Ok(false);
        }
        self.store.set_pro(user_id, true)
    }
}
