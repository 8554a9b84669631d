//! LLM API client module

mod client;
pub mod types;

pub use client::LlmAgent;
