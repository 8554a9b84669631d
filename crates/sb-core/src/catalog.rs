//! Knowledge catalog loader
//!
//! The catalog is produced offline as a flat JSON array of
//! `{key, category, description, expert_prompt}` objects. It always carries
//! one policy record describing which tool operations the agent may use.

use std::path::Path;

use tracing::{info, warn};

use crate::store::KnowledgeEntry;
use crate::{Error, Result};

/// Key of the always-present policy record
pub const POLICY_KEY: &str = "Active Policies";

const POLICY_CATEGORY: &str = "System Policy";

const DEFAULT_POLICY_PROMPT: &str = "CRITICAL POLICIES:\n\
    1. ALLOW: glob, search_file_content, list_directory, read_file, google_web_search.\n\
    2. RESTRICT: write_file, run_shell_command (Ask User).\n\
    3. PRIORITY: Deep Search for unknown topics.";

/// The default policy record
pub fn policy_entry() -> KnowledgeEntry {
    KnowledgeEntry {
        key: POLICY_KEY.to_string(),
        category: POLICY_CATEGORY.to_string(),
        description: "Operational Rules".to_string(),
        expert_prompt: DEFAULT_POLICY_PROMPT.to_string(),
    }
}

/// An in-memory knowledge catalog, in file order
#[derive(Debug, Clone, Default)]
pub struct KnowledgeCatalog {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeCatalog {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// Parse a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<KnowledgeEntry> = serde_json::from_str(json)
            .map_err(|e| Error::Catalog(format!("Failed to parse catalog: {}", e)))?;
        Ok(Self::new(entries))
    }

    /// Read a catalog file; a missing file yields the policy record alone
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Knowledge catalog not found at {}, using policy only", path.display());
            return Ok(Self::default().with_policy());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Catalog(format!("Failed to read {}: {}", path.display(), e)))?;
        let catalog = Self::from_json_str(&content)?;
        info!("Read {} knowledge modules from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Ensure the policy record is present, appending the default if not
    pub fn with_policy(mut self) -> Self {
        if !self.entries.iter().any(|e| e.key == POLICY_KEY) {
            self.entries.push(policy_entry());
        }
        self
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"[
        {
            "key": "Rust",
            "category": "Languages",
            "description": "Expert knowledge module for Rust",
            "expert_prompt": "You are a World-Class Expert in Rust."
        },
        {
            "key": "Kubernetes",
            "category": "Cloud & DevOps",
            "description": "Expert knowledge module for Kubernetes",
            "expert_prompt": "You are a World-Class Expert in Kubernetes."
        }
    ]"#;

    #[test]
    fn test_parse_keeps_file_order() {
        let catalog = KnowledgeCatalog::from_json_str(SAMPLE).unwrap();
        let keys: Vec<_> = catalog.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["Rust", "Kubernetes"]);
        assert_eq!(catalog.entries()[1].category, "Cloud & DevOps");
    }

    #[test]
    fn test_with_policy_appends_once() {
        let catalog = KnowledgeCatalog::from_json_str(SAMPLE)
            .unwrap()
            .with_policy()
            .with_policy();

        assert_eq!(catalog.len(), 3);
        let last = catalog.entries().last().unwrap();
        assert_eq!(last.key, POLICY_KEY);
        assert!(last.expert_prompt.contains("RESTRICT"));
    }

    #[test]
    fn test_existing_policy_is_kept() {
        let json = r#"[{"key": "Active Policies", "category": "System Policy",
                        "description": "custom", "expert_prompt": "ALLOW: nothing"}]"#;
        let catalog = KnowledgeCatalog::from_json_str(json).unwrap().with_policy();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].expert_prompt, "ALLOW: nothing");
    }

    #[test]
    fn test_missing_file_holds_only_policy() {
        let dir = TempDir::new().unwrap();
        let catalog = KnowledgeCatalog::from_json_file(dir.path().join("none.json")).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].key, POLICY_KEY);
        assert_eq!(catalog.clone().with_policy().len(), 1);
    }

    #[test]
    fn test_malformed_json_is_catalog_error() {
        let err = KnowledgeCatalog::from_json_str("{\"key\": 1}").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_read_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knowledge.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = KnowledgeCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
