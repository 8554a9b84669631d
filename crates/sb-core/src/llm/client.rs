//! LLM-backed agent
//!
//! Supports both the Claude API and OpenAI-compatible APIs.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentMode, AgentRequest, AgentResponse, AgentStep, build_system_prompt};
use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::*;

/// Agent that answers each turn with a single LLM completion
#[derive(Clone)]
pub struct LlmAgent {
    client: Client,
    api_key: String,
    model: String,
    pro_model: Option<String>,
    max_tokens: u64,
    base_url: String,
    provider: LlmProvider,
}

impl LlmAgent {
    /// Create a new LLM agent
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("LLM_API_KEY is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match config.provider {
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            pro_model: config.pro_model.clone(),
            max_tokens: config.max_tokens,
            base_url,
            provider: config.provider.clone(),
        })
    }

    /// Model used for the given mode
    pub fn model_for(&self, mode: AgentMode) -> &str {
        match (mode, &self.pro_model) {
            (AgentMode::Pro, Some(pro)) => pro,
            _ => &self.model,
        }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    fn build_request(&self, request: &AgentRequest) -> MessagesRequest {
        MessagesRequest::new(
            self.model_for(request.mode),
            self.max_tokens,
            build_system_prompt(request),
            &request.history,
            &request.prompt,
        )
    }

    /// Send a request to the configured provider
    pub async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        match self.provider {
            LlmProvider::Claude => self.send_claude_request(request).await,
            LlmProvider::OpenAi => self.send_openai_request(request).await,
        }
    }

    async fn send_claude_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!("Sending request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::Llm(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, body)))?;

        info!(
            "Claude API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    async fn send_openai_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to OpenAI-compatible API: {}", url);

        let openai_request = ChatCompletionRequest::from_messages_request(&request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(Error::Llm(format!("{}: {}", status, body)));
        }

        let openai_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Failed to parse response: {} - {}", e, body)))?;

        let parsed = openai_response.to_messages_response();

        info!(
            "OpenAI API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }
}

/// Turn a raw completion into an agent reply
fn into_agent_response(response: &MessagesResponse) -> Result<AgentResponse> {
    let text = response.text();
    if text.trim().is_empty() {
        return Err(Error::Llm("Empty response from model".to_string()));
    }

    let mut reply = AgentResponse::text(text);
    if response.stop_reason.as_deref() == Some("max_tokens") {
        reply = reply.with_step(AgentStep::new("stop", "Response truncated at max_tokens"));
    }
    Ok(reply)
}

#[async_trait]
impl Agent for LlmAgent {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse> {
        let api_request = self.build_request(&request);
        let response = self.messages(api_request).await?;
        into_agent_response(&response)
    }
}
