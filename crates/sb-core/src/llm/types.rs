//! Wire types for the Claude Messages API and OpenAI-compatible APIs

use serde::{Deserialize, Serialize};

use crate::store::{HistoryEntry, Role};

/// Message in a Claude conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: text.into(),
        }
    }
}

impl From<&HistoryEntry> for ChatMessage {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            role: entry.role.as_str().to_string(),
            content: entry.content.clone(),
        }
    }
}

/// Messages API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl MessagesRequest {
    /// Build a request from the transcript
    ///
    /// Claude only takes user/assistant turns; stored system messages are
    /// appended to the system prompt instead.
    pub fn new(
        model: impl Into<String>,
        max_tokens: u64,
        system: String,
        history: &[HistoryEntry],
        prompt: &str,
    ) -> Self {
        let mut system = system;
        let mut messages = Vec::with_capacity(history.len() + 1);

        for entry in history {
            match entry.role {
                Role::System => {
                    system.push_str("\n\n");
                    system.push_str(&entry.content);
                }
                _ => messages.push(ChatMessage::from(entry)),
            }
        }
        messages.push(ChatMessage::user(prompt));

        Self {
            model: model.into(),
            max_tokens,
            system: Some(system),
            messages,
        }
    }
}

/// Content block in a Messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl MessagesResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// ============================================================================
// OpenAI-compatible types
// ============================================================================

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl ChatCompletionRequest {
    /// Convert from a Claude-style request
    pub fn from_messages_request(req: &MessagesRequest) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system) = &req.system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(req.messages.iter().cloned());

        Self {
            model: req.model.clone(),
            messages,
            max_tokens: Some(req.max_tokens),
        }
    }
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessageResponse,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatCompletionResponse {
    /// Convert to a Claude-style response
    pub fn to_messages_response(&self) -> MessagesResponse {
        let choice = self.choices.first();

        let content = choice
            .and_then(|c| c.message.content.clone())
            .filter(|text| !text.is_empty())
            .map(|text| {
                vec![ContentBlock {
                    block_type: "text".to_string(),
                    text: Some(text),
                }]
            })
            .unwrap_or_default();

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_deref())
            .map(|reason| match reason {
                "stop" => "end_turn".to_string(),
                "length" => "max_tokens".to_string(),
                other => other.to_string(),
            });

        MessagesResponse {
            id: self.id.clone(),
            content,
            model: self.model.clone(),
            stop_reason,
            usage: self.usage.as_ref().map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_request_folds_system_history() {
        let history = vec![
            HistoryEntry::new(Role::System, "Be brief."),
            HistoryEntry::new(Role::User, "hi"),
            HistoryEntry::new(Role::Assistant, "hello"),
        ];

        let req = MessagesRequest::new("m", 256, "base".to_string(), &history, "how are you?");

        assert_eq!(req.system.as_deref(), Some("base\n\nBe brief."));
        assert_eq!(
            req.messages,
            vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("how are you?"),
            ]
        );
    }

    #[test]
    fn test_chat_completion_request_leads_with_system() {
        let req = MessagesRequest::new("m", 256, "base".to_string(), &[], "hi");
        let openai = ChatCompletionRequest::from_messages_request(&req);

        assert_eq!(openai.messages[0], ChatMessage::system("base"));
        assert_eq!(openai.messages[1], ChatMessage::user("hi"));
        assert_eq!(openai.max_tokens, Some(256));
    }

    #[test]
    fn test_messages_response_text_skips_other_blocks() {
        let body = r#"{
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": "there"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 3}
        }"#;

        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), "Hello\nthere");
        assert_eq!(parsed.usage.unwrap().output_tokens, 3);
    }

    #[test]
    fn test_chat_completion_response_conversion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Hi!"}, "finish_reason": "length"}
            ],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let converted = parsed.to_messages_response();

        assert_eq!(converted.text(), "Hi!");
        assert_eq!(converted.stop_reason.as_deref(), Some("max_tokens"));
        assert_eq!(converted.usage.unwrap().input_tokens, 5);
    }
}
