//! Repository URL parsing
//!
//! Turns the URL a user pasted into the `{host, owner, name}` triple that every
//! provider keys its API on. Works on HTTP(S), SSH and git URLs as well as
//! scp-style `git@host:owner/name.git` remotes. No network access.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::errors::GitServiceError;
use crate::types::{GitProviderType, RepoMetadata, DEFAULT_DEVFILE_PATH, DEFAULT_DOCKERFILE_PATH};

static SCP_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^@/\s]+@)?(?P<host>[^:/\s]+):(?P<path>[^/\s][^\s]*)$")
        .expect("scp-style remote pattern is valid")
});

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ssh", "git", "git+ssh", "git+https"];

/// Third path segments that start a web view on GitHub, Gitea and Bitbucket
const WEB_VIEW_SEGMENTS: &[&str] = &["tree", "blob", "raw", "edit", "src"];

/// Host and path components of a repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    pub resource: String,
    pub owner: String,
    pub name: String,
}

impl RepoUrl {
    pub fn parse(raw: &str) -> Result<Self, GitServiceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GitServiceError::InvalidUrl("empty URL".to_string()));
        }

        let (resource, path) = if raw.contains("://") {
            let parsed =
                Url::parse(raw).map_err(|e| GitServiceError::InvalidUrl(format!("{raw}: {e}")))?;

            if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
                return Err(GitServiceError::InvalidUrl(format!(
                    "{raw}: unsupported scheme {}",
                    parsed.scheme()
                )));
            }

            let host = parsed
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| GitServiceError::InvalidUrl(format!("{raw}: missing host")))?;

            (host.to_lowercase(), parsed.path().to_string())
        } else if let Some(captures) = SCP_LIKE.captures(raw) {
            (
                captures["host"].to_lowercase(),
                captures["path"].to_string(),
            )
        } else {
            return Err(GitServiceError::InvalidUrl(raw.to_string()));
        };

        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        // GitLab web URLs: everything after `/-/` addresses a view, not the project
        if let Some(pos) = segments.iter().position(|s| s == "-") {
            segments.truncate(pos);
        }

        // Elsewhere namespaces are flat, so `owner/repo/tree/...` is a view
        if GitProviderType::detect(&resource) != GitProviderType::GitLab
            && segments.len() > 2
            && WEB_VIEW_SEGMENTS.contains(&segments[2].as_str())
        {
            segments.truncate(2);
        }

        if segments.len() < 2 {
            return Err(GitServiceError::InvalidUrl(format!(
                "{raw}: expected an owner and a repository name"
            )));
        }

        let last = segments.pop().unwrap_or_default();
        let name = last.strip_suffix(".git").unwrap_or(&last).to_string();
        if name.is_empty() {
            return Err(GitServiceError::InvalidUrl(format!(
                "{raw}: empty repository name"
            )));
        }

        Ok(Self {
            resource,
            owner: segments.join("/"),
            name,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn host(&self) -> String {
        format!("https://{}", self.resource)
    }
}

/// Resolve `raw_url` into repository metadata with default file locations
pub fn resolve_identity(raw_url: &str, context_dir: &str) -> Result<RepoMetadata, GitServiceError> {
    let parsed = RepoUrl::parse(raw_url)?;

    Ok(RepoMetadata {
        host: parsed.host(),
        full_name: parsed.full_name(),
        repo_name: parsed.name,
        owner: parsed.owner,
        resource: parsed.resource,
        context_dir: strip_leading_slash(context_dir).to_string(),
        devfile_path: DEFAULT_DEVFILE_PATH.to_string(),
        dockerfile_path: DEFAULT_DOCKERFILE_PATH.to_string(),
        default_branch: None,
    })
}

fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
