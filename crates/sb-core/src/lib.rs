//! sb-core: SilentBot core library
//!
//! Persistent state for a conversational assistant (users, sessions,
//! transcripts, long-term memory, files and the expert knowledge catalog),
//! the free-tier quota gate, and the agent boundary with an LLM-backed
//! implementation.

pub mod agent;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod quota;
pub mod store;

pub use agent::{Agent, AgentMode, AgentRequest, AgentResponse, AgentStep};
pub use catalog::KnowledgeCatalog;
pub use chat::{ChatOutcome, ChatService};
pub use config::{Config, LlmConfig, LlmProvider};
pub use error::{Error, Result};
pub use llm::LlmAgent;
pub use quota::{FREE_REQUEST_LIMIT, QuotaDecision, UnlockCode};
pub use store::{
    HistoryEntry, KnowledgeEntry, MemoryFact, Message, NewUser, Role, Session, Store, StoredFile,
    User,
};
