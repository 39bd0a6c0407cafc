//! Minimal HTTP surface used by the provider clients
//!
//! Providers only ever issue authenticated GET requests, so the transport is a
//! single `get` call. Non-success statuses are returned as responses, not
//! errors: status classification belongs to [`crate::normalize`].

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::normalize::check_response;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApiAuth {
    #[default]
    Anonymous,
    /// Arbitrary header, e.g. GitLab's `PRIVATE-TOKEN`
    Header { name: &'static str, value: String },
    Bearer(String),
    /// `Authorization: token ...` as used by GitHub and Gitea
    Token(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub accept: Option<&'static str>,
    pub auth: ApiAuth,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, auth: &ApiAuth) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            accept: None,
            auth: auth.clone(),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.query(key, v),
            _ => self,
        }
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GitServiceError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> Result<String, GitServiceError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| GitServiceError::Decode(format!("response is not UTF-8: {}", e)))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: ApiRequest) -> Result<ApiResponse, GitServiceError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &GitServiceConfig) -> Result<Self, GitServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                GitServiceError::InvalidConfiguration(format!(
                    "Failed to create HTTP client: {}",
                    e
                ))
            })?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: ApiRequest) -> Result<ApiResponse, GitServiceError> {
        debug!("GET {}", request.url);

        let mut builder = self.client.get(&request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }

        builder = match &request.auth {
            ApiAuth::Anonymous => builder,
            ApiAuth::Header { name, value } => builder.header(*name, value),
            ApiAuth::Bearer(token) => builder.bearer_auth(token),
            ApiAuth::Token(token) => {
                builder.header(reqwest::header::AUTHORIZATION, format!("token {}", token))
            }
            ApiAuth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!("{} -> {}", request.url, status);

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// GET `request` and decode a successful JSON body
pub async fn fetch_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    request: ApiRequest,
    context: &str,
) -> Result<T, GitServiceError> {
    let response = check_response(transport.get(request).await?, context)?;
    response.json()
}

/// GET `request` and return a successful body as text
pub async fn fetch_text(
    transport: &dyn HttpTransport,
    request: ApiRequest,
    context: &str,
) -> Result<String, GitServiceError> {
    let response = check_response(transport.get(request).await?, context)?;
    response.text()
}
