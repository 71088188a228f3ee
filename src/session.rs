//! Session identity attached to every outbound call.
//!
//! The API expects an opaque session/user pair in `X-Session-Id` /
//! `X-User-Id` headers. The pair is fixed at composition-root time and never
//! mutated afterwards - there is no ambient global.

use uuid::Uuid;

pub const SESSION_HEADER: &str = "X-Session-Id";
pub const USER_HEADER: &str = "X-User-Id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    session_id: String,
    user_id: String,
}

impl SessionContext {
    /// Build from explicit values, generating opaque ids for anything absent.
    pub fn new(session_id: Option<String>, user_id: Option<String>) -> Self {
        Self {
            session_id: session_id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: user_id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("operator-{}", &Uuid::new_v4().to_string()[..8])),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Header pairs in wire order.
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (SESSION_HEADER, self.session_id.as_str()),
            (USER_HEADER, self.user_id.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win() {
        let s = SessionContext::new(Some("sess-1".into()), Some("alice".into()));
        assert_eq!(s.session_id(), "sess-1");
        assert_eq!(s.user_id(), "alice");
    }

    #[test]
    fn blank_values_are_replaced() {
        let s = SessionContext::new(Some("  ".into()), None);
        assert!(!s.session_id().trim().is_empty());
        assert!(s.user_id().starts_with("operator-"));
    }

    #[test]
    fn headers_carry_both_ids() {
        let s = SessionContext::new(Some("sess-2".into()), Some("bob".into()));
        let h = s.headers();
        assert_eq!(h[0], (SESSION_HEADER, "sess-2"));
        assert_eq!(h[1], (USER_HEADER, "bob"));
    }
}
