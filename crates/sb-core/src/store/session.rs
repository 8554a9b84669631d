//! Sessions and message transcripts

use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info, warn};

use super::{HistoryEntry, Message, Role, Session, Store, decode_time, encode_time, now};
use crate::Result;

/// Number of messages handed to the agent when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Title given to a session created with a blank title
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(Session {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: decode_time(3, &created_at)?,
        updated_at: decode_time(4, &updated_at)?,
    })
}

impl Store {
    /// Start a new conversation for a user and return its id
    ///
    /// The user is expected to exist; this is not enforced by the database.
    pub fn create_session(&self, user_id: &str, title: &str) -> Result<String> {
        let title = if title.trim().is_empty() {
            DEFAULT_SESSION_TITLE
        } else {
            title
        };
        let session_id = uuid::Uuid::new_v4().to_string();
        let created_at = encode_time(&now());

        self.with_conn("create_session", |conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![session_id, user_id, title, created_at],
            )?;
            Ok(())
        })?;

        info!("Created session {} for user {}", session_id, user_id);
        Ok(session_id)
    }

    /// Load a session by id
    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.with_conn("get_session", |conn| {
            let session = conn
                .query_row(
                    "SELECT session_id, user_id, title, created_at, updated_at
                     FROM sessions WHERE session_id = ?1",
                    params![session_id],
                    session_from_row,
                )
                .optional()?;
            Ok(session)
        })
    }

    /// All sessions of a user, most recently active first
    pub fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.with_conn("list_sessions", |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, user_id, title, created_at, updated_at FROM sessions
                 WHERE user_id = ?1 ORDER BY updated_at DESC, rowid DESC",
            )?;
            let sessions = stmt
                .query_map(params![user_id], session_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
    }

    /// Append a message and bump the session's `updated_at` to its timestamp
    ///
    /// Both writes share one transaction.
    pub fn add_message(&self, session_id: &str, role: Role, content: &str) -> Result<Message> {
        let timestamp = now();
        let encoded = encode_time(&timestamp);

        let id = self.with_conn("add_message", |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (session_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, role, content, encoded],
            )?;
            let id = tx.last_insert_rowid();
            let touched = tx.execute(
                "UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2",
                params![encoded, session_id],
            )?;
            tx.commit()?;

            if touched == 0 {
                warn!("Message {} appended to unknown session {}", id, session_id);
            }
            Ok(id)
        })?;

        debug!("Appended {} message {} to session {}", role, id, session_id);
        Ok(Message {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    /// The first `limit` messages of a session in insertion order
    pub fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.with_conn("get_history", |conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM messages WHERE session_id = ?1 ORDER BY id ASC LIMIT ?2",
            )?;
            let history = stmt
                .query_map(params![session_id, limit as i64], |row| {
                    Ok(HistoryEntry {
                        role: row.get(0)?,
                        content: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(history)
        })
    }

    /// Full stored messages of a session in insertion order
    pub fn get_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        self.with_conn("get_messages", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, timestamp FROM messages
                 WHERE session_id = ?1 ORDER BY id ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id], |row| {
                    let timestamp: String = row.get(4)?;
                    Ok(Message {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        role: row.get(2)?,
                        content: row.get(3)?,
                        timestamp: decode_time(4, &timestamp)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(messages)
        })
    }

    /// Count messages in a session
    pub fn message_count(&self, session_id: &str) -> Result<usize> {
        self.with_conn("message_count", |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewUser;
    use crate::store::test_support::temp_store;

    fn store_with_user() -> (tempfile::TempDir, Store) {
        let (dir, store) = temp_store();
        store.create_user(NewUser::new("alice").with_id("u1")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_fresh_session_scenario() {
        let (_dir, store) = store_with_user();

        let sid = store.create_session("u1", "chat").unwrap();
        store.add_message(&sid, Role::User, "hi").unwrap();

        let history = store.get_history(&sid, 50).unwrap();
        assert_eq!(history, vec![HistoryEntry::new(Role::User, "hi")]);
    }

    #[test]
    fn test_new_session_timestamps_match() {
        let (_dir, store) = store_with_user();

        let sid = store.create_session("u1", "chat").unwrap();
        let session = store.get_session(&sid).unwrap().unwrap();

        assert_eq!(session.user_id, "u1");
        assert_eq!(session.title, "chat");
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_blank_title_gets_default() {
        let (_dir, store) = store_with_user();

        let sid = store.create_session("u1", "  ").unwrap();
        let session = store.get_session(&sid).unwrap().unwrap();
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn test_history_preserves_insertion_order_and_updates_session() {
        let (_dir, store) = store_with_user();
        let sid = store.create_session("u1", "chat").unwrap();

        let mut last = None;
        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            last = Some(store.add_message(&sid, role, &format!("msg {}", i)).unwrap());
        }

        let history = store.get_history(&sid, 6).unwrap();
        let contents: Vec<_> = history.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4", "msg 5"]);
        assert_eq!(history[1].role, Role::Assistant);

        let session = store.get_session(&sid).unwrap().unwrap();
        assert_eq!(session.updated_at, last.unwrap().timestamp);
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn test_message_ids_are_monotonic() {
        let (_dir, store) = store_with_user();
        let sid = store.create_session("u1", "chat").unwrap();

        let a = store.add_message(&sid, Role::User, "a").unwrap();
        let b = store.add_message(&sid, Role::Assistant, "b").unwrap();
        assert!(b.id > a.id);

        let stored = store.get_messages(&sid).unwrap();
        assert_eq!(stored, vec![a, b]);
    }

    #[test]
    fn test_history_limit_keeps_oldest() {
        let (_dir, store) = store_with_user();
        let sid = store.create_session("u1", "chat").unwrap();
        for i in 0..5 {
            store.add_message(&sid, Role::User, &format!("m{}", i)).unwrap();
        }

        let history = store.get_history(&sid, 3).unwrap();
        let contents: Vec<_> = history.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, ["m0", "m1", "m2"]);
        assert_eq!(store.message_count(&sid).unwrap(), 5);
    }

    #[test]
    fn test_history_is_scoped_to_session() {
        let (_dir, store) = store_with_user();
        let first = store.create_session("u1", "one").unwrap();
        let second = store.create_session("u1", "two").unwrap();

        store.add_message(&first, Role::User, "for one").unwrap();
        store.add_message(&second, Role::User, "for two").unwrap();

        let history = store.get_history(&first, DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "for one");
    }

    #[test]
    fn test_list_sessions_most_recent_first() {
        let (_dir, store) = store_with_user();
        let older = store.create_session("u1", "older").unwrap();
        let newer = store.create_session("u1", "newer").unwrap();
        store.create_session("someone-else", "other").unwrap();

        let listed: Vec<_> = store
            .list_sessions("u1")
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(listed, vec![newer.clone(), older.clone()]);

        // Writing to the older session moves it to the front
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.add_message(&older, Role::User, "bump").unwrap();
        let listed: Vec<_> = store
            .list_sessions("u1")
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(listed, vec![older, newer]);
    }

    #[test]
    fn test_unknown_session_lookups() {
        let (_dir, store) = store_with_user();
        assert!(store.get_session("missing").unwrap().is_none());
        assert!(store.get_history("missing", 10).unwrap().is_empty());
        assert_eq!(store.message_count("missing").unwrap(), 0);
    }

    #[test]
    fn test_session_for_unknown_user_is_accepted() {
        let (_dir, store) = temp_store();

        let sid = store.create_session("ghost", "chat").unwrap();
        let session = store.get_session(&sid).unwrap().unwrap();
        assert_eq!(session.user_id, "ghost");
        assert_eq!(store.list_sessions("ghost").unwrap().len(), 1);
    }

    #[test]
    fn test_append_to_unknown_session_is_accepted() {
        let (_dir, store) = temp_store();

        let message = store
            .add_message("no-such-session", Role::User, "hello")
            .unwrap();
        assert_eq!(message.session_id, "no-such-session");

        assert!(store.get_session("no-such-session").unwrap().is_none());
        assert_eq!(store.message_count("no-such-session").unwrap(), 1);
        assert_eq!(
            store.get_history("no-such-session", 10).unwrap(),
            vec![HistoryEntry::new(Role::User, "hello")]
        );
    }
}
