//! Configuration management
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `silentbot.toml` in the working directory
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;
use crate::quota::UnlockCode;

/// Default config file name
pub const CONFIG_FILE: &str = "silentbot.toml";

/// LLM Provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude API
    #[default]
    Claude,
    /// OpenAI-compatible API
    OpenAi,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "openai" | "glm" | "zai" | "minimax" => LlmProvider::OpenAi,
            _ => LlmProvider::Claude,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,

    /// Model used for free users
    pub model: String,

    /// Model used for pro users (falls back to `model`)
    pub pro_model: Option<String>,

    pub provider: LlmProvider,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,

    pub max_tokens: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            pro_model: None,
            provider: LlmProvider::Claude,
            base_url: None,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Where state lives on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    pub db_path: String,
    /// Path to the CLI identity file
    pub identity_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            identity_path: default_identity_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Path to the JSON knowledge catalog
    pub catalog_path: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProConfig {
    /// Shared secret that unlocks pro mode
    #[serde(skip_serializing)]
    pub unlock_code: Option<String>,
}

impl std::fmt::Debug for ProConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProConfig")
            .field("unlock_code", &self.unlock_code.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Main configuration for silentbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub knowledge: KnowledgeConfig,
    pub pro: ProConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_db_path() -> String {
    "data/silentbot.db".to_string()
}

fn default_identity_path() -> String {
    "cli_user.id".to_string()
}

fn default_catalog_path() -> String {
    "data/knowledge.json".to_string()
}

/// Non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Replace `${VAR_NAME}` with the environment value
    ///
    /// Unset variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // consume '{'

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse TOML text (after env expansion) without env overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// Load from `./silentbot.toml` when present, otherwise from the environment
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let storage = toml.storage.unwrap_or_default();
        let knowledge = toml.knowledge.unwrap_or_default();
        let pro = toml.pro.unwrap_or_default();

        Config {
            llm: LlmConfig {
                api_key: llm.api_key.unwrap_or_default(),
                model: llm.model.unwrap_or_else(default_model),
                pro_model: llm.pro_model,
                provider: llm
                    .provider
                    .map(|p| LlmProvider::parse(&p))
                    .unwrap_or_default(),
                base_url: llm.base_url,
                max_tokens: llm.max_tokens.unwrap_or_else(default_max_tokens),
            },
            storage: StorageConfig {
                db_path: storage.db_path.unwrap_or_else(default_db_path),
                identity_path: storage.identity_path.unwrap_or_else(default_identity_path),
            },
            knowledge: KnowledgeConfig {
                catalog_path: knowledge.catalog_path.unwrap_or_else(default_catalog_path),
            },
            pro: ProConfig {
                unlock_code: pro.unlock_code.filter(|c| !c.is_empty()),
            },
        }
    }

    /// Environment variables take precedence over file values
    fn apply_env_overrides(&mut self) {
        if let Some(api_key) = env_var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = env_var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = env_var("LLM_PRO_MODEL") {
            self.llm.pro_model = Some(model);
        }
        if let Some(provider) = env_var("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(base_url) = env_var("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(path) = env_var("SILENTBOT_DB_PATH") {
            self.storage.db_path = path;
        }
        if let Some(path) = env_var("SILENTBOT_IDENTITY_PATH") {
            self.storage.identity_path = path;
        }
        if let Some(path) = env_var("SILENTBOT_CATALOG_PATH") {
            self.knowledge.catalog_path = path;
        }

        if let Some(code) = env_var("PRO_UNLOCK_CODE") {
            self.pro.unlock_code = Some(code);
        }
    }

    /// The configured unlock code, if any
    pub fn unlock_code(&self) -> Option<UnlockCode> {
        self.pro.unlock_code.as_deref().map(UnlockCode::new)
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    storage: Option<TomlStorageConfig>,
    knowledge: Option<TomlKnowledgeConfig>,
    pro: Option<TomlProConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// "claude" or "openai"
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    pro_model: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlStorageConfig {
    db_path: Option<String>,
    identity_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlKnowledgeConfig {
    catalog_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlProConfig {
    unlock_code: Option<String>,
}
