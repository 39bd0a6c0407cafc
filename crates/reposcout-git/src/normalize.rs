//! Failure classification and the degradation policy
//!
//! Provider responses are mapped onto [`GitServiceError`] here so that every
//! provider reports 404/401/403/429 the same way. Query failures are then
//! folded into empty values by [`degrade`]; identity failures never pass
//! through this module's degrade path.

use reqwest::StatusCode;
use tracing::warn;

use crate::errors::GitServiceError;
use crate::services::transport::ApiResponse;
use crate::types::{GitProviderType, RepoStatus, ResolvedProject};

const RATE_LIMIT_REMAINING_HEADERS: &[&str] = &["X-RateLimit-Remaining", "RateLimit-Remaining"];
const MAX_ERROR_BODY: usize = 200;

/// Pass successful responses through; turn anything else into a classified error
pub fn check_response(response: ApiResponse, context: &str) -> Result<ApiResponse, GitServiceError> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(classify_response(&response, context))
    }
}

pub fn classify_response(response: &ApiResponse, context: &str) -> GitServiceError {
    match response.status {
        StatusCode::NOT_FOUND => GitServiceError::NotFound(context.to_string()),
        StatusCode::TOO_MANY_REQUESTS => GitServiceError::RateLimited,
        StatusCode::FORBIDDEN if rate_limit_exhausted(response) => GitServiceError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GitServiceError::Unauthorized(format!("{}: HTTP {}", context, response.status))
        }
        status => {
            let body = String::from_utf8_lossy(&response.body);
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            GitServiceError::Api {
                status: status.as_u16(),
                message: if body.trim().is_empty() {
                    context.to_string()
                } else {
                    format!("{}: {}", context, body.trim())
                },
            }
        }
    }
}

/// GitHub and Gitea answer an exhausted quota with 403 and a zero remaining count
fn rate_limit_exhausted(response: &ApiResponse) -> bool {
    RATE_LIMIT_REMAINING_HEADERS
        .iter()
        .filter_map(|name| response.header(name))
        .any(|v| v.trim() == "0")
}

/// Map an identity lookup onto a reachability status
pub fn reachability(result: &Result<ResolvedProject, GitServiceError>) -> RepoStatus {
    match result {
        Ok(_) => RepoStatus::Reachable,
        Err(e) if e.is_rate_limited() => RepoStatus::RateLimitExceeded,
        Err(_) => RepoStatus::Unreachable,
    }
}

/// Fold a query failure into the empty value for `T`, logging what was swallowed
pub fn degrade<T: Default>(
    provider: GitProviderType,
    full_name: &str,
    operation: &str,
    result: Result<T, GitServiceError>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(
                %provider,
                repository = full_name,
                operation,
                kind = %e.kind(),
                "Query failed, returning empty result: {}",
                e
            );
            T::default()
        }
    }
}
