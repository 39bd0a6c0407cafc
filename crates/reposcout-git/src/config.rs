//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::GitProviderType;

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("reposcout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitServiceConfig {
    /// Force a provider instead of detecting it from the host
    pub provider: Option<GitProviderType>,
    /// Replaces the provider's API root, e.g. `https://git.acme.corp/api/v4`
    pub api_url: Option<String>,
    pub per_page: u32,
    /// Upper bound on pages fetched by a single paginated listing
    pub max_pages: u32,
    /// Whole-request timeout; `0` falls back to the default
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GitServiceConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_url: None,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GitServiceConfig {
    pub fn with_provider(mut self, provider: GitProviderType) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Page size clamped to what every supported provider accepts
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, 100)
    }

    pub fn page_limit(&self) -> u32 {
        self.max_pages.max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// API root override without a trailing slash
    pub fn api_root(&self) -> Option<String> {
        self.api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
    }
}
