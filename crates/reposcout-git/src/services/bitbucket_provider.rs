use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::git_provider::{basic_username, encode_path, project_not_found, GitProvider, ProviderClient};
use super::transport::{fetch_text, ApiAuth, ApiRequest, HttpTransport};
use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::types::{
    GitCredential, GitProviderType, RepoMetadata, ResolvedProject, SecretType,
};

const BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";

/// Ref used for source listings when neither the caller nor the provider named one
const FALLBACK_REF: &str = "HEAD";

#[derive(Deserialize)]
struct BitbucketRepo {
    uuid: String,
    full_name: String,
    mainbranch: Option<BitbucketBranch>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Deserialize)]
struct BitbucketSrcEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

/// One page of a Bitbucket listing; `next` is an absolute URL
#[derive(Deserialize)]
struct BitbucketPage<T> {
    values: Vec<T>,
    next: Option<String>,
}

/// Bitbucket Cloud (REST API 2.0)
pub struct BitbucketProvider {
    client: ProviderClient,
}

impl BitbucketProvider {
    pub fn new(
        _metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Self {
        let api_root = config
            .api_root()
            .unwrap_or_else(|| BITBUCKET_API.to_string());

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
            // App passwords need the account name; access tokens are bearer tokens
            Some(token) => match credential.secret_type {
                SecretType::BasicAuth => ApiAuth::Basic {
                    username: basic_username(credential),
                    password: token,
                },
                _ => ApiAuth::Bearer(token),
            },
        }
    }

    fn repo_path(project: &ResolvedProject) -> String {
        format!("/repositories/{}", project.full_name)
    }

    /// Whether a `next` link points back into the API we were configured with
    fn is_api_link(&self, link: &str) -> bool {
        let root = self.client.api_root.as_str();
        link.strip_prefix(root)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    /// Follow `next` links until exhausted or the page limit is reached
    ///
    /// Links outside the API root are not followed, so credentials never leave it.
    async fn collect_pages<T: DeserializeOwned + Send>(
        &self,
        first: ApiRequest,
        context: &str,
    ) -> Result<Vec<T>, GitServiceError> {
        let mut all_values = Vec::new();
        let mut request = first;
        let mut pages = 1;

        loop {
            let page: BitbucketPage<T> = self.client.get_json(request, context).await?;
            all_values.extend(page.values);

            let Some(next) = page.next else {
                break;
            };

            pages += 1;
            if pages > self.client.max_pages {
                debug!("{}: stopping after {} pages", context, self.client.max_pages);
                break;
            }

            if !self.is_api_link(&next) {
                warn!("{}: ignoring next link outside {}: {}", context, self.client.api_root, next);
                break;
            }

            request = ApiRequest::get(next, &self.client.auth);
        }

        Ok(all_values)
    }
}

#[async_trait]
impl GitProvider for BitbucketProvider {
    fn provider_type(&self) -> GitProviderType {
        GitProviderType::Bitbucket
    }

    async fn get_project(
        &self,
        metadata: &RepoMetadata,
    ) -> Result<ResolvedProject, GitServiceError> {
        let request = self
            .client
            .request(&format!("/repositories/{}", metadata.full_name));

        let repo: BitbucketRepo = self
            .client
            .get_json(request, &format!("Repository {}", metadata.full_name))
            .await
            .map_err(|e| project_not_found(e, &metadata.full_name))?;

        debug!("Resolved Bitbucket repository {} {}", repo.full_name, repo.uuid);

        Ok(ResolvedProject {
            id: repo.uuid,
            full_name: repo.full_name,
            default_branch: repo.mainbranch.map(|b| b.name),
            language: repo.language.filter(|l| !l.is_empty()),
        })
    }

    async fn list_branches(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        let request = self
            .client
            .request(&format!("{}/refs/branches", Self::repo_path(project)))
            .query("pagelen", self.client.per_page);

        let branches: Vec<BitbucketBranch> = self
            .collect_pages(request, &format!("Branches for {}", project.full_name))
            .await?;

        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn list_files(
        &self,
        project: &ResolvedProject,
        git_ref: Option<&str>,
        context_dir: &str,
    ) -> Result<Vec<String>, GitServiceError> {
        let git_ref = encode_path(git_ref.unwrap_or(FALLBACK_REF));
        let src_path = if context_dir.is_empty() {
            format!("{}/src/{}/", Self::repo_path(project), git_ref)
        } else {
            format!(
                "{}/src/{}/{}/",
                Self::repo_path(project),
                git_ref,
                encode_path(context_dir)
            )
        };

        let request = self
            .client
            .request(&src_path)
            .query("pagelen", self.client.per_page);

        let entries: Vec<BitbucketSrcEntry> = self
            .collect_pages(request, &format!("Source listing for {}", project.full_name))
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.entry_type == "commit_file")
            .map(|entry| entry.path)
            .collect())
    }

    /// Bitbucket only records one language, on the repository itself
    async fn list_languages(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        Ok(project.language.iter().cloned().collect())
    }

    async fn get_raw_file(
        &self,
        project: &ResolvedProject,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<String, GitServiceError> {
        let request = self.client.request(&format!(
            "{}/src/{}/{}",
            Self::repo_path(project),
            encode_path(git_ref.unwrap_or(FALLBACK_REF)),
            encode_path(path)
        ));

        fetch_text(self.client.transport.as_ref(), request, path).await
    }
}
