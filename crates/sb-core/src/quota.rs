//! Request quota gate and pro unlock code
//!
//! Free users get a fixed lifetime budget of agent invocations; pro users are
//! unmetered. The gate only decides. Counting is done by the caller once an
//! invocation has completed, so a retried or denied turn is never counted.

use crate::store::User;

/// Lifetime agent invocations allowed for a free user
pub const FREE_REQUEST_LIMIT: u64 = 30;

/// Outcome of the quota gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allow,
    Deny,
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allow)
    }
}

/// Decide whether `user` may invoke the agent
pub fn check(user: &User) -> QuotaDecision {
    if user.is_pro || user.req_count < FREE_REQUEST_LIMIT {
        QuotaDecision::Allow
    } else {
        QuotaDecision::Deny
    }
}

/// Requests a free user has left, `None` for pro users
pub fn remaining(user: &User) -> Option<u64> {
    if user.is_pro {
        None
    } else {
        Some(FREE_REQUEST_LIMIT.saturating_sub(user.req_count))
    }
}

/// Shared secret that upgrades a user to pro
#[derive(Clone)]
pub struct UnlockCode(String);

impl UnlockCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Exact string comparison, no normalisation
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl std::fmt::Debug for UnlockCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnlockCode(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_pro: bool, req_count: u64) -> User {
        let now = Utc::now();
        User {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            role: "user".to_string(),
            is_pro,
            req_count,
            created_at: now,
            last_active: now,
        }
    }

    #[test]
    fn test_free_user_below_limit_is_allowed() {
        assert_eq!(check(&user(false, 0)), QuotaDecision::Allow);
        assert_eq!(check(&user(false, 29)), QuotaDecision::Allow);
    }

    #[test]
    fn test_free_user_at_or_above_limit_is_denied() {
        assert_eq!(check(&user(false, 30)), QuotaDecision::Deny);
        assert_eq!(check(&user(false, 500)), QuotaDecision::Deny);
        assert!(!check(&user(false, 30)).is_allowed());
    }

    #[test]
    fn test_pro_user_is_unmetered() {
        for count in [0, 29, 30, 10_000] {
            assert!(check(&user(true, count)).is_allowed());
        }
    }

    #[test]
    fn test_remaining() {
        assert_eq!(remaining(&user(false, 12)), Some(18));
        assert_eq!(remaining(&user(false, 45)), Some(0));
        assert_eq!(remaining(&user(true, 45)), None);
    }

    #[test]
    fn test_unlock_code_is_exact() {
        let code = UnlockCode::new("SILENT-2024");
        assert!(code.matches("SILENT-2024"));
        assert!(!code.matches("silent-2024"));
        assert!(!code.matches(" SILENT-2024"));
        assert!(!code.matches(""));
    }

    #[test]
    fn test_unlock_code_debug_hides_secret() {
        let code = UnlockCode::new("hunter2");
        assert!(!format!("{:?}", code).contains("hunter2"));
    }
}
