//! End-to-end behaviour of `GitService` against mock provider APIs

use reposcout_git::{
    Base64SecretResolver, ErrorKind, GitCredential, GitProviderType, GitService,
    GitServiceConfig, GitServiceError, GitSource, RepoStatus, SecretContent, SecretType,
    StaticSecretResolver,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gitlab_project() -> serde_json::Value {
    serde_json::json!({
        "id": 42,
        "path_with_namespace": "acme/widgets",
        "default_branch": "main"
    })
}

async fn mount_gitlab_project(mock_server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/projects/acme%2Fwidgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gitlab_project()))
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

fn service_for(mock_server: &MockServer, source: &GitSource) -> GitService {
    let config = GitServiceConfig::default().with_api_url(mock_server.uri());
    GitService::new(source, &StaticSecretResolver::anonymous(), &config).unwrap()
}

#[tokio::test]
async fn test_missing_dockerfile_in_context_dir() {
    let mock_server = MockServer::start().await;
    mount_gitlab_project(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/projects/42/repository/files/server%2FDockerfile/raw"))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "404 File Not Found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets")
        .with_context_dir("/server")
        .with_dockerfile_path("Dockerfile");
    let service = service_for(&mock_server, &source);

    assert_eq!(service.provider_type(), GitProviderType::GitLab);
    assert_eq!(service.file_path("Dockerfile"), "server/Dockerfile");

    let response = service.is_dockerfile_present().await;
    assert!(!response.status);
    assert_eq!(response.error_kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_rate_limited_reachability() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://github.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    assert_eq!(service.is_repo_reachable().await, RepoStatus::RateLimitExceeded);
}

#[tokio::test]
async fn test_unknown_repository_is_unreachable_and_degrades() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://github.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    assert_eq!(service.is_repo_reachable().await, RepoStatus::Unreachable);
    assert!(service.get_repo_branch_list().await.branches.is_empty());
    assert_eq!(service.get_dockerfile_content().await, None);

    let response = service.is_dockerfile_present().await;
    assert!(!response.status);
    assert_eq!(response.error_kind(), Some(ErrorKind::RepositoryNotFound));

    assert_eq!(
        service.confirm_identity().await,
        Err(GitServiceError::RepositoryNotFound("acme/widgets".to_string()))
    );
}

#[tokio::test]
async fn test_renamed_repository_is_a_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 7,
            "full_name": "acme/gizmos",
            "default_branch": "main"
        })))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://github.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    let err = service.confirm_identity().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RepositoryMismatch);
    assert!(err.is_identity_failure());
    assert_eq!(
        err.to_string(),
        "Repository path acme/gizmos does not match expected name acme/widgets"
    );
}

#[tokio::test]
async fn test_identity_resolved_once_across_capabilities() {
    let mock_server = MockServer::start().await;
    mount_gitlab_project(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/projects/42/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "TypeScript": 90.0,
            "CSS": 10.0
        })))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    assert_eq!(service.is_repo_reachable().await, RepoStatus::Reachable);
    let languages = service.get_repo_language_list().await;
    service.get_repo_branch_list().await;

    assert!(languages.languages.contains("TypeScript"));
    assert!(languages.languages.contains("CSS"));
}

#[tokio::test]
async fn test_branch_failure_degrades_to_empty() {
    let mock_server = MockServer::start().await;
    mount_gitlab_project(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/projects/42/repository/branches"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    let branches = service.get_repo_branch_list().await;
    assert!(branches.branches.is_empty());
}

#[tokio::test]
async fn test_presence_and_content_agree() {
    let mock_server = MockServer::start().await;
    mount_gitlab_project(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/projects/42/repository/files/devfile.yaml/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("schemaVersion: 2.2.0"))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    assert!(service.is_devfile_present().await.status);
    assert_eq!(
        service.get_devfile_content().await.as_deref(),
        Some("schemaVersion: 2.2.0")
    );

    assert!(!service.is_package_json_present().await.status);
    assert_eq!(service.get_package_json_content().await, None);
}

#[tokio::test]
async fn test_concurrent_queries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/acme%2Fwidgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gitlab_project()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/42/repository/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "main"},
            {"name": "develop"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/42/repository/tree"))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"path": "Dockerfile", "type": "blob"},
            {"path": "src", "type": "tree"}
        ])))
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets");
    let service = service_for(&mock_server, &source);

    let (branches, files) = tokio::join!(
        service.get_repo_branch_list(),
        service.get_repo_file_list()
    );

    assert_eq!(branches.branches, vec!["main", "develop"]);
    assert_eq!(files.files, vec!["Dockerfile"]);

    let first = service.confirm_identity().await.unwrap();
    let second = service.confirm_identity().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_base64_credential_reaches_provider() {
    let mock_server = MockServer::start().await;

    // base64("glpat-secret")
    Mock::given(method("GET"))
        .and(path("/projects/acme%2Fwidgets"))
        .and(header("PRIVATE-TOKEN", "glpat-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gitlab_project()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = GitSource::new("https://gitlab.com/acme/widgets").with_credential(GitCredential {
        secret_type: SecretType::PersonalAccessToken,
        secret_content: Some(SecretContent {
            username: None,
            password: "Z2xwYXQtc2VjcmV0".to_string(),
        }),
    });
    let config = GitServiceConfig::default().with_api_url(mock_server.uri());
    let service = GitService::new(&source, &Base64SecretResolver, &config).unwrap();

    assert_eq!(service.is_repo_reachable().await, RepoStatus::Reachable);
}

#[test]
fn test_invalid_url_fails_construction() {
    let source = GitSource::new("not a repository");
    let result = GitService::new(
        &source,
        &StaticSecretResolver::anonymous(),
        &GitServiceConfig::default(),
    );

    assert!(matches!(result, Err(GitServiceError::InvalidUrl(_))));
}
