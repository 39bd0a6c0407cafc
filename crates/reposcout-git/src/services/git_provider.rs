use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::services::transport::{fetch_json, ApiAuth, ApiRequest, HttpTransport};
use crate::types::{GitCredential, GitProviderType, RepoMetadata, ResolvedProject};

/// Operations every hosting platform must support
///
/// Implementations report raw outcomes; caching, the identity check and the
/// degradation policy live in [`GitService`](super::git_service::GitService).
#[async_trait]
pub trait GitProvider: Send + Sync {
    fn provider_type(&self) -> GitProviderType;

    /// Look up the project behind `metadata.full_name`
    ///
    /// A provider answering "no such project" must return
    /// [`GitServiceError::RepositoryNotFound`].
    async fn get_project(&self, metadata: &RepoMetadata)
        -> Result<ResolvedProject, GitServiceError>;

    async fn list_branches(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError>;

    /// Blob paths directly under `context_dir` (empty for the repository root)
    async fn list_files(
        &self,
        project: &ResolvedProject,
        git_ref: Option<&str>,
        context_dir: &str,
    ) -> Result<Vec<String>, GitServiceError>;

    async fn list_languages(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError>;

    async fn get_raw_file(
        &self,
        project: &ResolvedProject,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<String, GitServiceError>;
}

/// Transport, API root and credentials shared by the provider implementations
#[derive(Clone)]
pub struct ProviderClient {
    pub transport: Arc<dyn HttpTransport>,
    pub api_root: String,
    pub auth: ApiAuth,
    pub per_page: u32,
    pub max_pages: u32,
}

impl ProviderClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_root: impl Into<String>,
        auth: ApiAuth,
        config: &GitServiceConfig,
    ) -> Self {
        Self {
            transport,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            auth,
            per_page: config.page_size(),
            max_pages: config.page_limit(),
        }
    }

    pub fn request(&self, path: &str) -> ApiRequest {
        ApiRequest::get(format!("{}{}", self.api_root, path), &self.auth)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        context: &str,
    ) -> Result<T, GitServiceError> {
        fetch_json(self.transport.as_ref(), request, context).await
    }

    /// Walk a page-numbered listing until a short page or the page limit
    ///
    /// `make_request` receives the 1-based page number and the page size.
    pub async fn paginate<T, F>(
        &self,
        make_request: F,
        context: &str,
    ) -> Result<Vec<T>, GitServiceError>
    where
        T: DeserializeOwned + Send,
        F: Fn(u32, u32) -> ApiRequest + Send + Sync,
    {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let items: Vec<T> = self
                .get_json(make_request(page, self.per_page), context)
                .await?;
            let count = items.len();
            all_items.extend(items);

            if count < self.per_page as usize {
                break;
            }

            page += 1;
            if page > self.max_pages {
                debug!("{}: stopping after {} pages", context, self.max_pages);
                break;
            }
        }

        Ok(all_items)
    }
}

/// Treat a 404 on the project endpoint as a missing repository
pub fn project_not_found(error: GitServiceError, full_name: &str) -> GitServiceError {
    match error {
        GitServiceError::NotFound(_) => GitServiceError::RepositoryNotFound(full_name.to_string()),
        other => other,
    }
}

/// Username for HTTP basic auth, falling back to the token-auth convention
pub fn basic_username(credential: &GitCredential) -> String {
    credential
        .username()
        .filter(|u| !u.is_empty())
        .unwrap_or("x-token-auth")
        .to_string()
}

/// Percent-encode each segment of a repository path, keeping the separators
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Factory for creating provider instances
pub struct GitProviderFactory;

impl GitProviderFactory {
    pub fn create_provider(
        provider_type: GitProviderType,
        metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Box<dyn GitProvider> {
        match provider_type {
            GitProviderType::GitHub => {
                use crate::services::github_provider::GitHubProvider;
                Box::new(GitHubProvider::new(
                    metadata, credential, token, transport, config,
                ))
            }
            GitProviderType::GitLab => {
                use crate::services::gitlab_provider::GitLabProvider;
                Box::new(GitLabProvider::new(
                    metadata, credential, token, transport, config,
                ))
            }
            GitProviderType::Bitbucket => {
                use crate::services::bitbucket_provider::BitbucketProvider;
                Box::new(BitbucketProvider::new(
                    metadata, credential, token, transport, config,
                ))
            }
            GitProviderType::Gitea => {
                use crate::services::gitea_provider::GiteaProvider;
                Box::new(GiteaProvider::new(
                    metadata, credential, token, transport, config,
                ))
            }
            GitProviderType::Generic => {
                use crate::services::generic_provider::GenericProvider;
                Box::new(GenericProvider::new(
                    metadata, credential, token, transport, config,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::ReqwestTransport;
    use crate::types::{GitSource, SecretContent, SecretType};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_root: &str, per_page: u32, max_pages: u32) -> ProviderClient {
        let config = GitServiceConfig {
            per_page,
            max_pages,
            ..GitServiceConfig::default()
        };
        let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
        ProviderClient::new(transport, api_root, ApiAuth::Anonymous, &config)
    }

    #[derive(serde::Deserialize)]
    struct Named {
        name: String,
    }

    #[tokio::test]
    async fn test_paginate_until_short_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/branches"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "main"}, {"name": "develop"}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/branches"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "release"}])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server.uri(), 2, 10);
        let items: Vec<Named> = client
            .paginate(
                |page, per_page| {
                    client
                        .request("/branches")
                        .query("per_page", per_page)
                        .query("page", page)
                },
                "branches",
            )
            .await
            .unwrap();

        let names: Vec<_> = items.into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["main", "develop", "release"]);
    }

    #[tokio::test]
    async fn test_paginate_respects_page_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/branches"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "main"}])),
            )
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server.uri(), 1, 3);
        let items: Vec<Named> = client
            .paginate(
                |page, _| client.request("/branches").query("page", page),
                "branches",
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_project_not_found_mapping() {
        assert_eq!(
            project_not_found(GitServiceError::NotFound("project".into()), "acme/widgets"),
            GitServiceError::RepositoryNotFound("acme/widgets".into())
        );
        assert_eq!(
            project_not_found(GitServiceError::RateLimited, "acme/widgets"),
            GitServiceError::RateLimited
        );
    }

    #[test]
    fn test_basic_username() {
        let mut credential = GitCredential {
            secret_type: SecretType::BasicAuth,
            secret_content: Some(SecretContent {
                username: Some("jane".into()),
                password: "c2VjcmV0".into(),
            }),
        };
        assert_eq!(basic_username(&credential), "jane");

        credential.secret_content = None;
        assert_eq!(basic_username(&credential), "x-token-auth");
    }

    #[test]
    fn test_factory_creates_every_provider() {
        let metadata =
            RepoMetadata::from_source(&GitSource::new("https://example.com/acme/widgets")).unwrap();
        let config = GitServiceConfig::default();
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config).unwrap());

        for provider_type in [
            GitProviderType::GitHub,
            GitProviderType::GitLab,
            GitProviderType::Bitbucket,
            GitProviderType::Gitea,
            GitProviderType::Generic,
        ] {
            let provider = GitProviderFactory::create_provider(
                provider_type,
                &metadata,
                &GitCredential::anonymous(),
                None,
                transport.clone(),
                &config,
            );
            assert_eq!(provider.provider_type(), provider_type);
        }
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("app/Dockerfile"), "app/Dockerfile");
        assert_eq!(encode_path("app/my file#1.yaml"), "app/my%20file%231.yaml");
        assert_eq!(encode_path("docs/a?b"), "docs/a%3Fb");
    }
}
