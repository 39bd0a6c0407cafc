//! Error types for repository introspection
//!
//! Errors fall into two tiers. Identity failures ([`GitServiceError::InvalidUrl`],
//! [`GitServiceError::RepositoryNotFound`], [`GitServiceError::RepositoryMismatch`])
//! always reach the caller. Everything else is a query failure that the
//! [`GitService`](crate::services::git_service::GitService) absorbs into an empty
//! result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving or querying a repository
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitServiceError {
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("Unable to find repository: {0}")]
    RepositoryNotFound(String),

    #[error("Repository path {actual} does not match expected name {expected}")]
    RepositoryMismatch { expected: String, actual: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Stable tag for each error variant, suitable for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidUrl,
    RepositoryNotFound,
    RepositoryMismatch,
    RateLimited,
    Unauthorized,
    NotFound,
    Api,
    Transport,
    Decode,
    Unsupported,
    InvalidConfiguration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ErrorKind::InvalidUrl => "InvalidUrl",
            ErrorKind::RepositoryNotFound => "RepositoryNotFound",
            ErrorKind::RepositoryMismatch => "RepositoryMismatch",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Api => "Api",
            ErrorKind::Transport => "Transport",
            ErrorKind::Decode => "Decode",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::InvalidConfiguration => "InvalidConfiguration",
        };
        f.write_str(tag)
    }
}

impl GitServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitServiceError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            GitServiceError::RepositoryNotFound(_) => ErrorKind::RepositoryNotFound,
            GitServiceError::RepositoryMismatch { .. } => ErrorKind::RepositoryMismatch,
            GitServiceError::RateLimited => ErrorKind::RateLimited,
            GitServiceError::Unauthorized(_) => ErrorKind::Unauthorized,
            GitServiceError::NotFound(_) => ErrorKind::NotFound,
            GitServiceError::Api { .. } => ErrorKind::Api,
            GitServiceError::Transport(_) => ErrorKind::Transport,
            GitServiceError::Decode(_) => ErrorKind::Decode,
            GitServiceError::Unsupported(_) => ErrorKind::Unsupported,
            GitServiceError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
        }
    }

    /// True for the errors that mean the configured repository itself is wrong
    pub fn is_identity_failure(&self) -> bool {
        matches!(
            self,
            GitServiceError::InvalidUrl(_)
                | GitServiceError::RepositoryNotFound(_)
                | GitServiceError::RepositoryMismatch { .. }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GitServiceError::RateLimited)
    }
}

impl From<reqwest::Error> for GitServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GitServiceError::Decode(e.to_string())
        } else {
            GitServiceError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GitServiceError {
    fn from(e: serde_json::Error) -> Self {
        GitServiceError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let not_found = GitServiceError::RepositoryNotFound("acme/widgets".to_string());
        assert!(not_found.to_string().contains("Unable to find repository"));

        let mismatch = GitServiceError::RepositoryMismatch {
            expected: "acme/widgets".to_string(),
            actual: "Acme/Widgets".to_string(),
        };
        assert_eq!(
            mismatch.to_string(),
            "Repository path Acme/Widgets does not match expected name acme/widgets"
        );

        let rate_limit = GitServiceError::RateLimited;
        assert!(rate_limit.to_string().contains("Rate limit"));
    }

    #[test]
    fn test_identity_failures_are_tier_one() {
        assert!(GitServiceError::InvalidUrl("github".into()).is_identity_failure());
        assert!(GitServiceError::RepositoryNotFound("a/b".into()).is_identity_failure());
        assert!(GitServiceError::RepositoryMismatch {
            expected: "a/b".into(),
            actual: "a/c".into()
        }
        .is_identity_failure());

        assert!(!GitServiceError::RateLimited.is_identity_failure());
        assert!(!GitServiceError::NotFound("Dockerfile".into()).is_identity_failure());
        assert!(!GitServiceError::Transport("timeout".into()).is_identity_failure());
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            GitServiceError::InvalidUrl("x".into()).kind().to_string(),
            "InvalidUrl"
        );
        assert_eq!(
            GitServiceError::RepositoryNotFound("x".into()).kind().to_string(),
            "RepositoryNotFound"
        );
        assert_eq!(
            GitServiceError::RepositoryMismatch {
                expected: "a".into(),
                actual: "b".into()
            }
            .kind()
            .to_string(),
            "RepositoryMismatch"
        );
    }
}
