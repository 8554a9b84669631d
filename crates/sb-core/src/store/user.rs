//! User directory

use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info, warn};

use super::{NewUser, Store, User, decode_time, encode_time, now};
use crate::{Error, Result};

const USER_COLUMNS: &str = "user_id, username, role, is_pro, req_count, created_at, last_active";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(5)?;
    let last_active: String = row.get(6)?;
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        role: row.get(2)?,
        is_pro: row.get(3)?,
        req_count: row.get(4)?,
        created_at: decode_time(5, &created_at)?,
        last_active: decode_time(6, &last_active)?,
    })
}

impl Store {
    /// Look up a user by identity
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn("get_user", |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
                    params![user_id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Look up a user by display name
    ///
    /// Usernames are not unique. When several users share a name the one
    /// inserted first is returned.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn("get_user_by_username", |conn| {
            let user = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM users WHERE username = ?1 ORDER BY rowid ASC LIMIT 1",
                        USER_COLUMNS
                    ),
                    params![username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Create a user unless the identity already exists
    ///
    /// The first write wins: an existing user is returned unchanged, later
    /// calls never overwrite its username or role.
    pub fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user_id = new_user
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let created_at = encode_time(&now());

        let inserted = self.with_conn("create_user", |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (user_id, username, role, is_pro, req_count, created_at, last_active)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                params![user_id, new_user.username, new_user.role, new_user.is_pro, created_at],
            )?;
            Ok(inserted)
        })?;

        if inserted > 0 {
            info!("Created user {} ({})", user_id, new_user.username);
        } else {
            debug!("User {} already exists, keeping existing record", user_id);
        }

        self.get_user(&user_id)?
            .ok_or(Error::UserNotFound(user_id))
    }

    /// Overwrite the pro flag. Returns `false` when no such user exists.
    pub fn set_pro(&self, user_id: &str, is_pro: bool) -> Result<bool> {
        let updated = self.with_conn("set_pro", |conn| {
            Ok(conn.execute(
                "UPDATE users SET is_pro = ?1 WHERE user_id = ?2",
                params![is_pro, user_id],
            )?)
        })?;

        if updated == 0 {
            warn!("set_pro: no user with id {}", user_id);
        } else {
            info!("User {} pro flag set to {}", user_id, is_pro);
        }
        Ok(updated > 0)
    }

    /// Add exactly one to the lifetime request counter
    ///
    /// A single `UPDATE` statement, so no increment is lost as long as only
    /// one process writes. Returns `false` when no such user exists.
    pub fn increment_request_count(&self, user_id: &str) -> Result<bool> {
        let last_active = encode_time(&now());
        let updated = self.with_conn("increment_request_count", |conn| {
            Ok(conn.execute(
                "UPDATE users SET req_count = req_count + 1, last_active = ?1 WHERE user_id = ?2",
                params![last_active, user_id],
            )?)
        })?;

        if updated == 0 {
            warn!("increment_request_count: no user with id {}", user_id);
        }
        Ok(updated > 0)
    }

    /// Refresh `last_active` without counting a request
    pub fn touch_user(&self, user_id: &str) -> Result<bool> {
        let last_active = encode_time(&now());
        let updated = self.with_conn("touch_user", |conn| {
            Ok(conn.execute(
                "UPDATE users SET last_active = ?1 WHERE user_id = ?2",
                params![last_active, user_id],
            )?)
        })?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::NewUser;
    use crate::store::test_support::temp_store;

    #[test]
    fn test_create_and_get_user() {
        let (_dir, store) = temp_store();

        let user = store
            .create_user(NewUser::new("alice").with_id("u1"))
            .unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, "user");
        assert!(!user.is_pro);
        assert_eq!(user.req_count, 0);
        assert_eq!(user.created_at, user.last_active);

        let fetched = store.get_user("u1").unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn test_missing_user_is_none() {
        let (_dir, store) = temp_store();
        assert!(store.get_user("nobody").unwrap().is_none());
        assert!(store.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_create_user_first_write_wins() {
        let (_dir, store) = temp_store();

        store
            .create_user(NewUser::new("alice").with_id("u1").with_role("cli"))
            .unwrap();
        let second = store
            .create_user(NewUser::new("mallory").with_id("u1").with_role("admin").pro(true))
            .unwrap();

        assert_eq!(second.username, "alice");
        assert_eq!(second.role, "cli");
        assert!(!second.is_pro);
    }

    #[test]
    fn test_create_user_mints_identity() {
        let (_dir, store) = temp_store();

        let a = store.create_user(NewUser::new("guest")).unwrap();
        let b = store.create_user(NewUser::new("guest")).unwrap();

        assert!(uuid::Uuid::parse_str(&a.user_id).is_ok());
        assert_ne!(a.user_id, b.user_id);
    }

    #[test]
    fn test_get_user_by_username_returns_first_inserted() {
        let (_dir, store) = temp_store();

        store.create_user(NewUser::new("sam").with_id("first")).unwrap();
        store.create_user(NewUser::new("sam").with_id("second")).unwrap();

        let found = store.get_user_by_username("sam").unwrap().unwrap();
        assert_eq!(found.user_id, "first");
    }

    #[test]
    fn test_set_pro_overwrites_flag() {
        let (_dir, store) = temp_store();
        store.create_user(NewUser::new("alice").with_id("u1")).unwrap();

        assert!(store.set_pro("u1", true).unwrap());
        assert!(store.get_user("u1").unwrap().unwrap().is_pro);

        assert!(store.set_pro("u1", false).unwrap());
        assert!(!store.get_user("u1").unwrap().unwrap().is_pro);

        assert!(!store.set_pro("ghost", true).unwrap());
    }

    #[test]
    fn test_increment_request_count_is_exact() {
        let (_dir, store) = temp_store();
        store.create_user(NewUser::new("alice").with_id("u1")).unwrap();

        for _ in 0..7 {
            assert!(store.increment_request_count("u1").unwrap());
        }

        let user = store.get_user("u1").unwrap().unwrap();
        assert_eq!(user.req_count, 7);
        assert!(user.last_active >= user.created_at);
    }

    #[test]
    fn test_increment_unknown_user_reports_false() {
        let (_dir, store) = temp_store();
        assert!(!store.increment_request_count("ghost").unwrap());
    }

    #[test]
    fn test_touch_user_refreshes_last_active_only() {
        let (_dir, store) = temp_store();
        let before = store.create_user(NewUser::new("alice").with_id("u1")).unwrap();

        assert!(store.touch_user("u1").unwrap());
        let after = store.get_user("u1").unwrap().unwrap();

        assert_eq!(after.req_count, before.req_count);
        assert!(after.last_active >= before.last_active);
    }
}
