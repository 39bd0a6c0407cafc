//! Gitea / Forgejo provider
//!
//! The Gitea API mirrors GitHub's repository endpoints under `/api/v1`. The
//! differences that matter here are `limit` instead of `per_page` and a
//! dedicated `/raw/` endpoint for file content.

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

#[derive(Deserialize)]
struct GiteaRepo {
    id: i64,
    full_name: String,
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GiteaBranch {
    name: String,
}

#[derive(Deserialize)]
struct GiteaContentEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

pub struct GiteaProvider {
    client: ProviderClient,
}

impl GiteaProvider {
    pub fn new(
        metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Self {
        let api_root = config
            .api_root()
            .unwrap_or_else(|| format!("{}/api/v1", metadata.host));

        Self {
            client: ProviderClient::new(
                transport,
                api_root,
                Self::auth(credential, token),
                config,
            ),
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
impl GitProvider for GiteaProvider {
    fn provider_type(&self) -> GitProviderType {
        GitProviderType::Gitea
    }

    async fn get_project(
        &self,
        metadata: &RepoMetadata,
    ) -> Result<ResolvedProject, GitServiceError> {
        let request = self
            .client
            .request(&format!("/repos/{}", metadata.full_name));

        let repo: GiteaRepo = self
            .client
            .get_json(request, &format!("Repository {}", metadata.full_name))
            .await
            .map_err(|e| project_not_found(e, &metadata.full_name))?;

        debug!("Resolved Gitea repository {} ({})", repo.full_name, repo.id);

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

        let branches: Vec<GiteaBranch> = self
            .client
            .paginate(
                |page, per_page| {
                    self.client
                        .request(&branches_path)
                        .query("limit", per_page)
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
            .query_opt("ref", git_ref);

        let entries: Vec<GiteaContentEntry> = self
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
            .request(&format!("{}/languages", Self::repo_path(project)));

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
                "{}/raw/{}",
                Self::repo_path(project),
                encode_path(path)
            ))
            .query_opt("ref", git_ref);

        fetch_text(self.client.transport.as_ref(), request, path).await
    }
}
