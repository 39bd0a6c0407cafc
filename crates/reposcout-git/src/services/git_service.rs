use std::sync::Arc;
use tracing::{debug, info};

use super::cache::IdentityCache;
use super::git_provider::{GitProvider, GitProviderFactory};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::normalize::{degrade, reachability};
use crate::secrets::SecretResolver;
use crate::types::{
    BranchList, GitProviderType, GitSource, RepoFileList, RepoLanguageList, RepoMetadata,
    RepoStatus, ResolvedProject, Response, PACKAGE_JSON,
};

/// Provider-independent view of one repository
///
/// Only [`GitService::confirm_identity`] reports failures as errors. Every query
/// folds any failure, including a missing or renamed repository, into an empty
/// result, or into [`Response::error`] for presence checks.
pub struct GitService {
    metadata: RepoMetadata,
    provider: Box<dyn GitProvider>,
    cache: IdentityCache,
}

impl GitService {
    pub fn new(
        source: &GitSource,
        secrets: &dyn SecretResolver,
        config: &GitServiceConfig,
    ) -> Result<Self, GitServiceError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Self::with_transport(source, secrets, transport, config)
    }

    pub fn with_transport(
        source: &GitSource,
        secrets: &dyn SecretResolver,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Result<Self, GitServiceError> {
        let metadata = RepoMetadata::from_source(source)?;
        let provider_type = config
            .provider
            .unwrap_or_else(|| GitProviderType::detect(&metadata.resource));
        let token = secrets.resolve_auth(&source.credential);

        info!(
            provider = %provider_type,
            repository = %metadata.full_name,
            authenticated = token.is_some(),
            "Inspecting repository"
        );

        let provider = GitProviderFactory::create_provider(
            provider_type,
            &metadata,
            &source.credential,
            token,
            transport,
            config,
        );

        Ok(Self::with_provider(metadata, provider))
    }

    pub fn with_provider(metadata: RepoMetadata, provider: Box<dyn GitProvider>) -> Self {
        Self {
            metadata,
            provider,
            cache: IdentityCache::new(),
        }
    }

    pub fn metadata(&self) -> &RepoMetadata {
        &self.metadata
    }

    pub fn provider_type(&self) -> GitProviderType {
        self.provider.provider_type()
    }

    /// Resolve the repository on the provider, once per service
    pub async fn confirm_identity(&self) -> Result<ResolvedProject, GitServiceError> {
        self.cache.get_or_try_fetch(|| self.fetch_identity()).await
    }

    async fn fetch_identity(&self) -> Result<ResolvedProject, GitServiceError> {
        let project = self.provider.get_project(&self.metadata).await?;

        if project.full_name != self.metadata.full_name {
            return Err(GitServiceError::RepositoryMismatch {
                expected: self.metadata.full_name.clone(),
                actual: project.full_name,
            });
        }

        debug!("Confirmed {} as {}", self.metadata.full_name, project.id);
        Ok(project)
    }

    pub async fn is_repo_reachable(&self) -> RepoStatus {
        let status = reachability(&self.confirm_identity().await);
        debug!("{} is {:?}", self.metadata.full_name, status);
        status
    }

    pub async fn get_repo_branch_list(&self) -> BranchList {
        let result = async {
            let project = self.confirm_identity().await?;
            self.provider.list_branches(&project).await
        }
        .await;

        BranchList {
            branches: self.settle("list_branches", result),
        }
    }

    pub async fn get_repo_file_list(&self) -> RepoFileList {
        let result = async {
            let project = self.confirm_identity().await?;
            let git_ref = self.effective_ref(&project);
            self.provider
                .list_files(&project, git_ref.as_deref(), &self.metadata.context_dir)
                .await
        }
        .await;

        RepoFileList {
            files: self.settle("list_files", result),
        }
    }

    pub async fn get_repo_language_list(&self) -> RepoLanguageList {
        let result = async {
            let project = self.confirm_identity().await?;
            self.provider.list_languages(&project).await
        }
        .await;

        RepoLanguageList {
            languages: self
                .settle("list_languages", result)
                .into_iter()
                .collect(),
        }
    }

    /// Check that `path` can be fetched, keeping the error when it cannot
    pub async fn is_file_present(&self, path: &str) -> Response {
        match self.fetch_file(path).await {
            Ok(_) => Response::ok(),
            Err(e) => {
                debug!("{} is not present in {}: {}", path, self.metadata.full_name, e);
                Response::failed(e)
            }
        }
    }

    pub async fn get_file_content(&self, path: &str) -> Option<String> {
        let result = self.fetch_file(path).await.map(Some);
        self.settle("get_file_content", result)
    }

    /// `file` relative to the repository root, under the context directory
    pub fn file_path(&self, file: &str) -> String {
        self.metadata.file_path(file)
    }

    pub async fn is_dockerfile_present(&self) -> Response {
        self.is_file_present(&self.file_path(&self.metadata.dockerfile_path))
            .await
    }

    pub async fn get_dockerfile_content(&self) -> Option<String> {
        self.get_file_content(&self.file_path(&self.metadata.dockerfile_path))
            .await
    }

    pub async fn is_devfile_present(&self) -> Response {
        self.is_file_present(&self.file_path(&self.metadata.devfile_path))
            .await
    }

    pub async fn get_devfile_content(&self) -> Option<String> {
        self.get_file_content(&self.file_path(&self.metadata.devfile_path))
            .await
    }

    pub async fn is_package_json_present(&self) -> Response {
        self.is_file_present(&self.file_path(PACKAGE_JSON)).await
    }

    pub async fn get_package_json_content(&self) -> Option<String> {
        self.get_file_content(&self.file_path(PACKAGE_JSON)).await
    }

    async fn fetch_file(&self, path: &str) -> Result<String, GitServiceError> {
        let project = self.confirm_identity().await?;
        let git_ref = self.effective_ref(&project);
        self.provider
            .get_raw_file(&project, path, git_ref.as_deref())
            .await
    }

    /// Branch requested by the caller, otherwise the provider's default
    fn effective_ref(&self, project: &ResolvedProject) -> Option<String> {
        self.metadata
            .default_branch
            .clone()
            .or_else(|| project.default_branch.clone())
    }

    fn settle<T: Default>(&self, operation: &str, result: Result<T, GitServiceError>) -> T {
        degrade(
            self.provider.provider_type(),
            &self.metadata.full_name,
            operation,
            result,
        )
    }
}
