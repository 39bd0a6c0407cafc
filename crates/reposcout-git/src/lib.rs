//! Repository introspection across git hosting providers
//!
//! [`GitService`] answers questions about one repository (reachability,
//! branches, files, languages, well-known file presence) without the caller
//! knowing whether it lives on GitHub, GitLab, Bitbucket, Gitea or a plain git
//! server.

pub mod config;
pub mod errors;
pub mod normalize;
pub mod secrets;
pub mod services;
pub mod types;
pub mod url;

pub use config::GitServiceConfig;
pub use errors::{ErrorKind, GitServiceError};
pub use secrets::{Base64SecretResolver, SecretResolver, StaticSecretResolver};
pub use services::{GitProvider, GitService};
pub use types::{
    BranchList, GitCredential, GitProviderType, GitSource, RepoFileList, RepoLanguageList,
    RepoMetadata, RepoStatus, ResolvedProject, Response, SecretContent, SecretType,
};
pub use url::{resolve_identity, RepoUrl};
