//! Error types for replica reconciliation.
//!
//! Failures are a tagged value rather than a family of concrete error types:
//! callers branch on [`ErrorKind`] and read the optional upstream status hint
//! instead of downcasting.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a reconciliation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed path, body or method. Never retried.
    Client,
    /// The workload does not exist in the orchestration system.
    NotFound,
    /// Any orchestration-system or cache-store failure other than not-found.
    Upstream,
}

impl ErrorKind {
    /// HTTP status used when no upstream status is attached.
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorKind::Client => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Upstream => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Client => write!(f, "client error"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Upstream => write!(f, "upstream error"),
        }
    }
}

/// Failure surfaced by the engine or one of its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ReplicaError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Status code reported by the upstream system, when it gave one.
    pub status_hint: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl ReplicaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_hint: None,
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Client, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    /// Attach the status code the upstream system reported.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_hint = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Status to report to the caller: the upstream hint wins over the kind default.
    pub fn http_status(&self) -> u16 {
        self.status_hint
            .unwrap_or_else(|| self.kind.default_status())
    }
}

impl From<serde_json::Error> for ReplicaError {
    fn from(err: serde_json::Error) -> Self {
        ReplicaError::upstream(format!("cache record codec error: {}", err))
    }
}

/// Result type alias for reconciliation operations.
pub type ReplicaResult<T> = Result<T, ReplicaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_per_kind() {
        assert_eq!(ReplicaError::client("bad").http_status(), 400);
        assert_eq!(ReplicaError::not_found("gone").http_status(), 404);
        assert_eq!(ReplicaError::upstream("boom").http_status(), 500);
    }

    #[test]
    fn test_status_hint_overrides_kind() {
        let err = ReplicaError::upstream("forbidden").with_status(403);
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert_eq!(err.http_status(), 403);

        let err = ReplicaError::not_found("deployments.apps \"x\" not found").with_status(404);
        assert!(err.is_not_found());
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_error_display() {
        let err = ReplicaError::upstream("connection refused");
        let msg = format!("{}", err);
        assert!(msg.contains("upstream error"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_json_error_is_upstream() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: ReplicaError = match parse {
            Ok(_) => panic!("expected parse failure"),
            Err(e) => e.into(),
        };
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert!(err.status_hint.is_none());
    }
}
