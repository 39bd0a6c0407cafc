use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::git_provider::{encode_path, project_not_found, GitProvider, ProviderClient};
use super::transport::{fetch_text, ApiAuth, HttpTransport};
use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::types::{
    GitCredential, GitProviderType, RepoMetadata, ResolvedProject, SecretType,
};

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";
const GITHUB_RAW: &str = "application/vnd.github.raw";

#[derive(Deserialize)]
struct GitHubRepo {
    id: i64,
    full_name: String,
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GitHubBranch {
    name: String,
}

#[derive(Deserialize)]
struct GitHubContentEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

/// GitHub and GitHub Enterprise Server
pub struct GitHubProvider {
    client: ProviderClient,
}

impl GitHubProvider {
    pub fn new(
        metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Self {
        let api_root = config
            .api_root()
            .unwrap_or_else(|| Self::default_api_root(metadata));

        Self {
            client: ProviderClient::new(
                transport,
                api_root,
                Self::auth(credential, token),
                config,
            ),
        }
    }

    /// github.com uses a dedicated API host; Enterprise serves it under `/api/v3`
    fn default_api_root(metadata: &RepoMetadata) -> String {
        if metadata.resource == "github.com" {
            GITHUB_API.to_string()
        } else {
            format!("{}/api/v3", metadata.host)
        }
    }

    fn auth(credential: &GitCredential, token: Option<String>) -> ApiAuth {
        match token {
            None => ApiAuth::Anonymous,
            Some(token) => match credential.secret_type {
                SecretType::OAuth => ApiAuth::Bearer(token),
                _ => ApiAuth::Token(token),
            },
        }
    }

    fn repo_path(project: &ResolvedProject) -> String {
        format!("/repos/{}", project.full_name)
    }
}

#[async_trait]
impl GitProvider for GitHubProvider {
    fn provider_type(&self) -> GitProviderType {
        GitProviderType::GitHub
    }

    async fn get_project(
        &self,
        metadata: &RepoMetadata,
    ) -> Result<ResolvedProject, GitServiceError> {
        let request = self
            .client
            .request(&format!("/repos/{}", metadata.full_name))
            .accept(GITHUB_JSON);

        let repo: GitHubRepo = self
            .client
            .get_json(request, &format!("Repository {}", metadata.full_name))
            .await
            .map_err(|e| project_not_found(e, &metadata.full_name))?;

        debug!("Resolved GitHub repository {} ({})", repo.full_name, repo.id);

        Ok(ResolvedProject {
            id: repo.id.to_string(),
            full_name: repo.full_name,
            default_branch: repo.default_branch,
            language: None,
        })
    }

    async fn list_branches(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        let branches_path = format!("{}/branches", Self::repo_path(project));

        let branches: Vec<GitHubBranch> = self
            .client
            .paginate(
                |page, per_page| {
                    self.client
                        .request(&branches_path)
                        .accept(GITHUB_JSON)
                        .query("per_page", per_page)
                        .query("page", page)
                },
                &format!("Branches for {}", project.full_name),
            )
            .await?;

        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_files(
        &self,
        project: &ResolvedProject,
        git_ref: Option<&str>,
        context_dir: &str,
    ) -> Result<Vec<String>, GitServiceError> {
        let contents_path = if context_dir.is_empty() {
            format!("{}/contents", Self::repo_path(project))
        } else {
            format!(
                "{}/contents/{}",
                Self::repo_path(project),
                encode_path(context_dir)
            )
        };

        let request = self
            .client
            .request(&contents_path)
            .accept(GITHUB_JSON)
            .query_opt("ref", git_ref);

        let entries: Vec<GitHubContentEntry> = self
            .client
            .get_json(
                request,
                &format!("Contents of {}/{}", project.full_name, context_dir),
            )
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.entry_type == "file")
            .map(|entry| entry.path)
            .collect())
    }

    async fn list_languages(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        let request = self
            .client
            .request(&format!("{}/languages", Self::repo_path(project)))
            .accept(GITHUB_JSON);

        let languages: HashMap<String, u64> = self
            .client
            .get_json(request, &format!("Languages for {}", project.full_name))
            .await?;

        Ok(languages.into_keys().collect())
    }

    async fn get_raw_file(
        &self,
        project: &ResolvedProject,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<String, GitServiceError> {
        let request = self
            .client
            .request(&format!(
                "{}/contents/{}",
                Self::repo_path(project),
                encode_path(path)
            ))
            .accept(GITHUB_RAW)
            .query_opt("ref", git_ref);

        fetch_text(self.client.transport.as_ref(), request, path).await
    }
}
