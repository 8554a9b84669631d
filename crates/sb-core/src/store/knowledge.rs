//! Knowledge index over the expert-module catalog

use rusqlite::params;
use tracing::{debug, info};

use super::{KnowledgeEntry, Store};
use crate::{Error, Result};

impl Store {
    /// Replace the catalog with `entries`, keeping their order
    ///
    /// Runs in one transaction, so a failed load leaves the previous catalog
    /// in place.
    pub fn load_knowledge(&self, entries: &[KnowledgeEntry]) -> Result<usize> {
        if let Some(pos) = entries.iter().position(|e| e.key.trim().is_empty()) {
            return Err(Error::Catalog(format!("entry {} has an empty key", pos)));
        }

        self.with_conn("load_knowledge", |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM knowledge", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO knowledge (key, category, description, expert_prompt)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for entry in entries {
                    stmt.execute(params![
                        entry.key,
                        entry.category,
                        entry.description,
                        entry.expert_prompt,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;

        info!("Loaded {} knowledge modules", entries.len());
        Ok(entries.len())
    }

    /// All catalog entries in load order
    pub fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        self.with_conn("list_knowledge", |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, category, description, expert_prompt FROM knowledge ORDER BY id ASC",
            )?;
            let entries = stmt
                .query_map([], |row| {
                    Ok(KnowledgeEntry {
                        key: row.get(0)?,
                        category: row.get(1)?,
                        description: row.get(2)?,
                        expert_prompt: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Entries whose key occurs anywhere in the query, ignoring case
    ///
    /// Plain substring containment, no tokenization or ranking. Results keep
    /// catalog order.
    pub fn search(&self, query: &str) -> Result<Vec<KnowledgeEntry>> {
        let query = query.to_lowercase();
        let hits: Vec<KnowledgeEntry> = self
            .list_knowledge()?
            .into_iter()
            .filter(|entry| query.contains(&entry.key.to_lowercase()))
            .collect();

        debug!("Knowledge search matched {} modules", hits.len());
        Ok(hits)
    }

    /// Number of catalog entries
    pub fn knowledge_count(&self) -> Result<usize> {
        self.with_conn("knowledge_count", |conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM knowledge", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_store;

    fn entry(key: &str, category: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            key: key.to_string(),
            category: category.to_string(),
            description: format!("Expert knowledge module for {}", key),
            expert_prompt: format!("You are a World-Class Expert in {}.", key),
        }
    }

    fn sample_catalog() -> Vec<KnowledgeEntry> {
        vec![
            entry("Python", "Languages"),
            entry("Rust", "Languages"),
            entry("Docker", "Cloud & DevOps"),
            entry("PostgreSQL", "Database"),
        ]
    }

    #[test]
    fn test_search_finds_key_in_query() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();

        let hits = store.search("I need help with Python generics").unwrap();
        assert!(hits.iter().any(|e| e.key == "Python"));
        assert_eq!(hits[0].category, "Languages");
    }

    #[test]
    fn test_search_without_match_is_empty() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();

        assert!(store.search("asdkjasd not a real topic").unwrap().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_and_keeps_catalog_order() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();

        let hits = store
            .search("postgresql in DOCKER, then some python")
            .unwrap();
        let keys: Vec<_> = hits.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["Python", "Docker", "PostgreSQL"]);
    }

    #[test]
    fn test_search_requires_whole_key() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();

        // "Pyth" is in the key, not the other way round
        assert!(store.search("pyth").unwrap().is_empty());
    }

    #[test]
    fn test_reload_replaces_catalog() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();
        store.load_knowledge(&sample_catalog()).unwrap();
        assert_eq!(store.knowledge_count().unwrap(), 4);

        store.load_knowledge(&[entry("Go", "Languages")]).unwrap();
        let keys: Vec<_> = store
            .list_knowledge()
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, ["Go"]);
    }

    #[test]
    fn test_empty_key_is_rejected_and_catalog_kept() {
        let (_dir, store) = temp_store();
        store.load_knowledge(&sample_catalog()).unwrap();

        let err = store
            .load_knowledge(&[entry("Kotlin", "Languages"), entry("  ", "Broken")])
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
        assert_eq!(store.knowledge_count().unwrap(), 4);
    }
}
