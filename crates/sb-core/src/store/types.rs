//! Record types persisted by the store

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A user of the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identity, never changes once created
    pub user_id: String,
    /// Display name (not unique)
    pub username: String,
    /// Free-form role label ("user", "cli", ...)
    pub role: String,
    /// Pro tier flag
    pub is_pro: bool,
    /// Lifetime count of agent invocations
    pub req_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Parameters for [`Store::create_user`](crate::Store::create_user)
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Identity to use; a fresh UUID is minted when `None`
    pub user_id: Option<String>,
    pub username: String,
    pub role: String,
    pub is_pro: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            role: "user".to_string(),
            is_pro: false,
        }
    }

    pub fn with_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn pro(mut self, is_pro: bool) -> Self {
        self.is_pro = is_pro;
        self
    }
}

impl Default for NewUser {
    fn default() -> Self {
        Self::new("guest")
    }
}

/// A conversation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed every time a message is appended
    pub updated_at: DateTime<Utc>,
}

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(Error::InvalidRecord(format!("unknown message role: {}", other))),
        }
    }
}

/// A stored transcript message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic surrogate key, defines order within a session
    pub id: i64,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The `{role, content}` pair handed to the agent as context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A long-term fact remembered about a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub id: i64,
    pub user_id: String,
    pub fact: String,
    pub created_at: DateTime<Utc>,
}

/// An expert module from the knowledge catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Topic name matched against queries
    pub key: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub expert_prompt: String,
}

/// A file uploaded by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}
