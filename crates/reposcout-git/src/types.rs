use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

use crate::errors::{ErrorKind, GitServiceError};
use crate::url::resolve_identity;

pub const DEFAULT_DOCKERFILE_PATH: &str = "Dockerfile";
pub const DEFAULT_DEVFILE_PATH: &str = "devfile.yaml";
pub const PACKAGE_JSON: &str = "package.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProviderType {
    GitHub,
    GitLab,
    Bitbucket,
    Gitea,
    Generic,
}

impl std::fmt::Display for GitProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitProviderType::GitHub => write!(f, "github"),
            GitProviderType::GitLab => write!(f, "gitlab"),
            GitProviderType::Bitbucket => write!(f, "bitbucket"),
            GitProviderType::Gitea => write!(f, "gitea"),
            GitProviderType::Generic => write!(f, "generic"),
        }
    }
}

impl TryFrom<&str> for GitProviderType {
    type Error = GitServiceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "github" => Ok(GitProviderType::GitHub),
            "gitlab" => Ok(GitProviderType::GitLab),
            "bitbucket" => Ok(GitProviderType::Bitbucket),
            "gitea" | "forgejo" => Ok(GitProviderType::Gitea),
            "generic" => Ok(GitProviderType::Generic),
            _ => Err(GitServiceError::InvalidConfiguration(format!(
                "Unknown provider type: {}",
                value
            ))),
        }
    }
}

impl std::str::FromStr for GitProviderType {
    type Err = GitServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GitProviderType::try_from(s)
    }
}

impl GitProviderType {
    /// Detect the provider from a bare host name such as `gitlab.example.com`
    ///
    /// Only `bitbucket.org` maps to Bitbucket: self-hosted Bitbucket servers do
    /// not expose the 2.0 REST API and are treated as generic git servers.
    pub fn detect(resource: &str) -> Self {
        let host = resource.to_lowercase();

        if host == "github.com" || host.starts_with("github.") || host.contains(".github.") {
            GitProviderType::GitHub
        } else if host == "gitlab.com" || host.starts_with("gitlab.") || host.contains(".gitlab.")
        {
            GitProviderType::GitLab
        } else if host == "bitbucket.org" {
            GitProviderType::Bitbucket
        } else if host == "codeberg.org" || host.contains("gitea") || host.contains("forgejo") {
            GitProviderType::Gitea
        } else {
            GitProviderType::Generic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecretType {
    PersonalAccessToken,
    OAuth,
    BasicAuth,
    #[default]
    None,
}

/// Credential material as handed over by the caller; `password` is base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretContent {
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCredential {
    #[serde(default)]
    pub secret_type: SecretType,
    #[serde(default)]
    pub secret_content: Option<SecretContent>,
}

impl GitCredential {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.secret_content
            .as_ref()
            .and_then(|c| c.username.as_deref())
    }
}

/// Repository the caller wants inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    pub url: String,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub context_dir: Option<String>,
    #[serde(default)]
    pub credential: GitCredential,
    #[serde(default)]
    pub devfile_path: Option<String>,
    #[serde(default)]
    pub dockerfile_path: Option<String>,
}

impl GitSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            git_ref: None,
            context_dir: None,
            credential: GitCredential::anonymous(),
            devfile_path: None,
            dockerfile_path: None,
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_context_dir(mut self, context_dir: impl Into<String>) -> Self {
        self.context_dir = Some(context_dir.into());
        self
    }

    pub fn with_credential(mut self, credential: GitCredential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_dockerfile_path(mut self, path: impl Into<String>) -> Self {
        self.dockerfile_path = Some(path.into());
        self
    }

    pub fn with_devfile_path(mut self, path: impl Into<String>) -> Self {
        self.devfile_path = Some(path.into());
        self
    }
}

/// Identity derived from a [`GitSource`] without any network access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetadata {
    pub repo_name: String,
    pub owner: String,
    /// `https://{resource}`
    pub host: String,
    /// Bare host name, without scheme or port
    pub resource: String,
    pub full_name: String,
    pub context_dir: String,
    pub devfile_path: String,
    pub dockerfile_path: String,
    pub default_branch: Option<String>,
}

impl RepoMetadata {
    pub fn from_source(source: &GitSource) -> Result<Self, GitServiceError> {
        let mut metadata =
            resolve_identity(&source.url, source.context_dir.as_deref().unwrap_or(""))?;

        metadata.default_branch = source.git_ref.clone().filter(|r| !r.is_empty());
        if let Some(path) = source.devfile_path.as_ref().filter(|p| !p.is_empty()) {
            metadata.devfile_path = path.clone();
        }
        if let Some(path) = source.dockerfile_path.as_ref().filter(|p| !p.is_empty()) {
            metadata.dockerfile_path = path.clone();
        }

        Ok(metadata)
    }

    /// Path of `file` relative to the repository root, honouring the context directory
    pub fn file_path(&self, file: &str) -> String {
        if self.context_dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.context_dir, file)
        }
    }
}

/// Provider-confirmed handle for a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProject {
    /// Provider-specific id (numeric id, uuid, or the path itself)
    pub id: String,
    /// Canonical `owner/name` as reported by the provider
    pub full_name: String,
    pub default_branch: Option<String>,
    /// Primary language, for providers that report it on the project itself
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchList {
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFileList {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLanguageList {
    pub languages: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoStatus {
    Reachable,
    Unreachable,
    RateLimitExceeded,
}

/// Outcome of a file presence check; a failed check keeps the error that caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<GitServiceError>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: true,
            error: None,
        }
    }

    pub fn failed(error: GitServiceError) -> Self {
        Self {
            status: false,
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(GitServiceError::kind)
    }
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    kind: ErrorKind,
    message: &'a str,
}

fn serialize_error<S>(error: &Option<GitServiceError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => {
            let message = e.to_string();
            ErrorReport {
                kind: e.kind(),
                message: &message,
            }
            .serialize(serializer)
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing_is_case_insensitive() {
        assert_eq!(
            GitProviderType::try_from("GitHub").unwrap(),
            GitProviderType::GitHub
        );
        assert_eq!(
            "GITLAB".parse::<GitProviderType>().unwrap(),
            GitProviderType::GitLab
        );
        assert_eq!(
            "forgejo".parse::<GitProviderType>().unwrap(),
            GitProviderType::Gitea
        );
        assert!(matches!(
            GitProviderType::try_from("svn"),
            Err(GitServiceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_provider_detection() {
        assert_eq!(GitProviderType::detect("github.com"), GitProviderType::GitHub);
        assert_eq!(
            GitProviderType::detect("github.acme.corp"),
            GitProviderType::GitHub
        );
        assert_eq!(GitProviderType::detect("gitlab.com"), GitProviderType::GitLab);
        assert_eq!(
            GitProviderType::detect("gitlab.example.com"),
            GitProviderType::GitLab
        );
        assert_eq!(
            GitProviderType::detect("bitbucket.org"),
            GitProviderType::Bitbucket
        );
        assert_eq!(
            GitProviderType::detect("bitbucket.acme.corp"),
            GitProviderType::Generic
        );
        assert_eq!(GitProviderType::detect("codeberg.org"), GitProviderType::Gitea);
        assert_eq!(
            GitProviderType::detect("git.example.com"),
            GitProviderType::Generic
        );
    }

    #[test]
    fn test_file_path_with_context_dir() {
        let source = GitSource::new("https://github.com/acme/widgets").with_context_dir("app");
        let metadata = RepoMetadata::from_source(&source).unwrap();
        assert_eq!(metadata.file_path("Dockerfile"), "app/Dockerfile");
    }

    #[test]
    fn test_file_path_without_context_dir() {
        let source = GitSource::new("https://github.com/acme/widgets").with_context_dir("");
        let metadata = RepoMetadata::from_source(&source).unwrap();
        assert_eq!(metadata.file_path("Dockerfile"), "Dockerfile");
    }

    #[test]
    fn test_file_path_keeps_duplicate_separators() {
        let source = GitSource::new("https://github.com/acme/widgets").with_context_dir("app/");
        let metadata = RepoMetadata::from_source(&source).unwrap();
        assert_eq!(metadata.file_path("Dockerfile"), "app//Dockerfile");
    }

    #[test]
    fn test_metadata_from_source() {
        let source = GitSource::new("https://gitlab.com/acme/widgets")
            .with_ref("develop")
            .with_context_dir("/server")
            .with_dockerfile_path("Containerfile");
        let metadata = RepoMetadata::from_source(&source).unwrap();

        assert_eq!(metadata.host, "https://gitlab.com");
        assert_eq!(metadata.full_name, "acme/widgets");
        assert_eq!(metadata.context_dir, "server");
        assert_eq!(metadata.default_branch.as_deref(), Some("develop"));
        assert_eq!(metadata.dockerfile_path, "Containerfile");
        assert_eq!(metadata.devfile_path, DEFAULT_DEVFILE_PATH);
    }

    #[test]
    fn test_git_source_deserialization() {
        let json = serde_json::json!({
            "url": "https://gitlab.com/acme/widgets",
            "ref": "main",
            "contextDir": "/server",
            "credential": {
                "secretType": "PersonalAccessToken",
                "secretContent": { "password": "c2VjcmV0" }
            },
            "dockerfilePath": "Dockerfile"
        });

        let source: GitSource = serde_json::from_value(json).unwrap();
        assert_eq!(source.git_ref.as_deref(), Some("main"));
        assert_eq!(source.context_dir.as_deref(), Some("/server"));
        assert_eq!(
            source.credential.secret_type,
            SecretType::PersonalAccessToken
        );
        assert!(source.devfile_path.is_none());
    }

    #[test]
    fn test_response_serialization() {
        let ok = serde_json::to_value(Response::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({ "status": true }));

        let failed = Response::failed(GitServiceError::NotFound("server/Dockerfile".into()));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], false);
        assert_eq!(json["error"]["kind"], "NotFound");
        assert_eq!(failed.error_kind(), Some(ErrorKind::NotFound));
    }
}
