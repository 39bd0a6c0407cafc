pub mod bitbucket_provider;
pub mod cache;
pub mod generic_provider;
pub mod git_provider;
pub mod git_service;
pub mod gitea_provider;
pub mod github_provider;
pub mod gitlab_provider;
pub mod transport;

pub use cache::IdentityCache;
pub use git_provider::{GitProvider, GitProviderFactory};
pub use git_service::GitService;
pub use transport::{ApiAuth, ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
