//! Per-user long-term memory facts

use rusqlite::params;
use tracing::debug;

use super::{MemoryFact, Store, encode_time, now};
use crate::Result;

/// Facts recalled per prompt; kept small to bound the injected context
pub const MEMORY_RECALL_LIMIT: usize = 5;

impl Store {
    /// Append a fact to the user's memory log
    pub fn add_memory(&self, user_id: &str, fact: &str) -> Result<MemoryFact> {
        let created_at = now();
        let encoded = encode_time(&created_at);

        let id = self.with_conn("add_memory", |conn| {
            conn.execute(
                "INSERT INTO memory (user_id, fact, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, fact, encoded],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Saved memory {} for user {}", id, user_id);
        Ok(MemoryFact {
            id,
            user_id: user_id.to_string(),
            fact: fact.to_string(),
            created_at,
        })
    }

    /// The most recent facts for a user, newest first
    pub fn get_memory(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn("get_memory", |conn| {
            let mut stmt = conn.prepare(
                "SELECT fact FROM memory WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )?;
            let facts = stmt
                .query_map(params![user_id, MEMORY_RECALL_LIMIT as i64], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(facts)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::store::test_support::temp_store;
    use super::MEMORY_RECALL_LIMIT;

    #[test]
    fn test_get_memory_returns_newest_five() {
        let (_dir, store) = temp_store();

        for i in 1..=8 {
            store.add_memory("u1", &format!("fact {}", i)).unwrap();
        }

        let facts = store.get_memory("u1").unwrap();
        assert_eq!(facts.len(), MEMORY_RECALL_LIMIT);
        assert_eq!(facts, ["fact 8", "fact 7", "fact 6", "fact 5", "fact 4"]);
    }

    #[test]
    fn test_memory_is_per_user_and_not_deduplicated() {
        let (_dir, store) = temp_store();

        store.add_memory("u1", "likes tea").unwrap();
        store.add_memory("u1", "likes tea").unwrap();
        store.add_memory("u2", "likes coffee").unwrap();

        assert_eq!(store.get_memory("u1").unwrap(), ["likes tea", "likes tea"]);
        assert_eq!(store.get_memory("u2").unwrap(), ["likes coffee"]);
        assert!(store.get_memory("u3").unwrap().is_empty());
    }

    #[test]
    fn test_add_memory_returns_stored_fact() {
        let (_dir, store) = temp_store();

        let first = store.add_memory("u1", "speaks French").unwrap();
        let second = store.add_memory("u1", "lives in Lyon").unwrap();

        assert_eq!(first.fact, "speaks French");
        assert_eq!(first.user_id, "u1");
        assert!(second.id > first.id);
    }

    #[test]
    fn test_memory_for_unknown_user_is_accepted() {
        let (_dir, store) = temp_store();

        let fact = store.add_memory("ghost", "prefers dark mode").unwrap();
        assert_eq!(fact.user_id, "ghost");
        assert_eq!(store.get_memory("ghost").unwrap(), ["prefers dark mode"]);
        assert!(store.get_user("ghost").unwrap().is_none());
    }
}
