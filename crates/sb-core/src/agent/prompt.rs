//! System prompt assembly

use super::{AgentMode, AgentRequest};

const BASE_PROMPT: &str = "You are SilentBot, a precise and helpful assistant. \
    Answer in the same language as the user.";

const PRO_PROMPT: &str = "The user has Pro access: give thorough, production-grade answers.";

/// Build the system prompt from mode, recalled facts and expert modules
pub fn build_system_prompt(request: &AgentRequest) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    if request.mode == AgentMode::Pro {
        prompt.push_str("\n\n");
        prompt.push_str(PRO_PROMPT);
    }

    if !request.memory.is_empty() {
        prompt.push_str("\n\n## User facts\n");
        for fact in &request.memory {
            prompt.push_str("- ");
            prompt.push_str(fact);
            prompt.push('\n');
        }
    }

    if !request.knowledge.is_empty() {
        prompt.push_str("\n\n## Expert modules\n");
        for entry in &request.knowledge {
            prompt.push_str(&format!("### {}\n{}\n", entry.key, entry.expert_prompt));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KnowledgeEntry;

    #[test]
    fn test_plain_prompt() {
        let prompt = build_system_prompt(&AgentRequest::default());
        assert_eq!(prompt, BASE_PROMPT);
    }

    #[test]
    fn test_prompt_includes_context() {
        let request = AgentRequest {
            mode: AgentMode::Pro,
            prompt: "help with rust".to_string(),
            history: vec![],
            memory: vec!["prefers short answers".to_string()],
            knowledge: vec![KnowledgeEntry {
                key: "Rust".to_string(),
                category: "Languages".to_string(),
                description: String::new(),
                expert_prompt: "You are a World-Class Expert in Rust.".to_string(),
            }],
        };

        let prompt = build_system_prompt(&request);
        assert!(prompt.contains(PRO_PROMPT));
        assert!(prompt.contains("- prefers short answers"));
        assert!(prompt.contains("### Rust\nYou are a World-Class Expert in Rust."));
        assert!(prompt.find("User facts").unwrap() < prompt.find("Expert modules").unwrap());
    }
}
