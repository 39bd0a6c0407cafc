use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::git_provider::{project_not_found, GitProvider, ProviderClient};
use super::transport::{fetch_text, ApiAuth, HttpTransport};
use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::types::{
    GitCredential, GitProviderType, RepoMetadata, ResolvedProject, SecretType,
};

#[derive(Deserialize)]
struct GitLabProject {
    id: i64,
    path_with_namespace: String,
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct GitLabBranch {
    name: String,
}

#[derive(Deserialize)]
struct GitLabTreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

/// gitlab.com and self-managed GitLab instances (API v4)
pub struct GitLabProvider {
    client: ProviderClient,
}

impl GitLabProvider {
    pub fn new(
        metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Self {
        let api_root = config
            .api_root()
            .unwrap_or_else(|| format!("{}/api/v4", metadata.host));

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
            // OAuth tokens use Bearer; personal and basic-auth secrets are PATs
            Some(token) => match credential.secret_type {
                SecretType::OAuth => ApiAuth::Bearer(token),
                _ => ApiAuth::Header {
                    name: "PRIVATE-TOKEN",
                    value: token,
                },
            },
        }
    }

    fn project_path(project: &ResolvedProject) -> String {
        format!("/projects/{}", project.id)
    }
}

#[async_trait]
impl GitProvider for GitLabProvider {
    fn provider_type(&self) -> GitProviderType {
        GitProviderType::GitLab
    }

    async fn get_project(
        &self,
        metadata: &RepoMetadata,
    ) -> Result<ResolvedProject, GitServiceError> {
        let encoded_path = urlencoding::encode(&metadata.full_name);
        let request = self.client.request(&format!("/projects/{}", encoded_path));

        let project: GitLabProject = self
            .client
            .get_json(request, &format!("Project {}", metadata.full_name))
            .await
            .map_err(|e| project_not_found(e, &metadata.full_name))?;

        debug!(
            "Resolved GitLab project {} ({})",
            project.path_with_namespace, project.id
        );

        Ok(ResolvedProject {
            id: project.id.to_string(),
            full_name: project.path_with_namespace,
            default_branch: project.default_branch,
            language: None,
        })
    }

    async fn list_branches(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        let branches_path = format!("{}/repository/branches", Self::project_path(project));

        let branches: Vec<GitLabBranch> = self
            .client
            .paginate(
                |page, per_page| {
                    self.client
                        .request(&branches_path)
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
        let tree_path = format!("{}/repository/tree", Self::project_path(project));

        let entries: Vec<GitLabTreeEntry> = self
            .client
            .paginate(
                |page, per_page| {
                    self.client
                        .request(&tree_path)
                        .query_opt("path", Some(context_dir))
                        .query_opt("ref", git_ref)
                        .query("per_page", per_page)
                        .query("page", page)
                },
                &format!("File tree for {}", project.full_name),
            )
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.entry_type == "blob")
            .map(|entry| entry.path)
            .collect())
    }

    async fn list_languages(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        let request = self
            .client
            .request(&format!("{}/languages", Self::project_path(project)));

        // Values are percentages
        let languages: HashMap<String, f64> = self
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
                "{}/repository/files/{}/raw",
                Self::project_path(project),
                urlencoding::encode(path)
            ))
            .query_opt("ref", git_ref);

        fetch_text(self.client.transport.as_ref(), request, path).await
    }
}
