//! Error taxonomy for the dashboard API surface.
//!
//! Only `Overload` is ever retried, and only by the client layer. Everything
//! else propagates to the UI, which converts it into a banner or an inline
//! affordance. Variants are `Clone` so completions can carry them through the
//! event channel.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 429 or 503 - the sole retry trigger.
    #[error("server overloaded ({status}): {detail}")]
    Overload { status: u16, detail: String },

    /// 404 - empty result for search, real error for details/invoke.
    #[error("not found: {detail}")]
    NotFound { detail: String },

    /// 400 or 422 - malformed input, server detail surfaced verbatim.
    #[error("invalid request: {detail}")]
    Validation { detail: String },

    /// Request or connect timeout. Terminal - never a retry trigger.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// No response at all (DNS, refused connection, broken transport).
    #[error("network error: {0}")]
    Network(String),

    /// 2xx with a body we could not parse.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// Any other non-2xx status.
    #[error("unexpected response ({status}): {detail}")]
    Unexpected { status: u16, detail: String },
}

impl ApiError {
    /// Map a non-2xx status plus its `detail` field into the taxonomy.
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            429 | 503 => ApiError::Overload { status, detail },
            404 => ApiError::NotFound { detail },
            400 | 422 => ApiError::Validation { detail },
            _ => ApiError::Unexpected { status, detail },
        }
    }

    pub fn is_transient_overload(&self) -> bool {
        matches!(self, ApiError::Overload { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(ApiError::from_status(429, "slow down".into()).is_transient_overload());
        assert!(ApiError::from_status(503, "maintenance".into()).is_transient_overload());
        assert!(ApiError::from_status(404, "gone".into()).is_not_found());
        assert_eq!(
            ApiError::from_status(422, "bad limit".into()),
            ApiError::Validation { detail: "bad limit".into() }
        );
        assert_eq!(
            ApiError::from_status(500, "boom".into()),
            ApiError::Unexpected { status: 500, detail: "boom".into() }
        );
    }

    #[test]
    fn detail_is_surfaced_verbatim() {
        let e = ApiError::from_status(400, "limit must be >= 1".into());
        assert!(e.to_string().contains("limit must be >= 1"));
    }
}
