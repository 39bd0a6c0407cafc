//! Credential resolution
//!
//! Credentials arrive from the caller already stored somewhere else; this layer
//! only ever sees the decoded token. A resolver returning `None` means the
//! repository is accessed anonymously.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::types::{GitCredential, SecretType};

pub trait SecretResolver: Send + Sync {
    fn resolve_auth(&self, credential: &GitCredential) -> Option<String>;
}

/// Decodes the base64 `password` field for token-bearing secret types
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64SecretResolver;

impl SecretResolver for Base64SecretResolver {
    fn resolve_auth(&self, credential: &GitCredential) -> Option<String> {
        match credential.secret_type {
            SecretType::PersonalAccessToken | SecretType::OAuth | SecretType::BasicAuth => {}
            SecretType::None => return None,
        }

        let content = credential.secret_content.as_ref()?;
        let decoded = match STANDARD.decode(content.password.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(secret_type = ?credential.secret_type, "Ignoring undecodable secret: {}", e);
                return None;
            }
        };

        match String::from_utf8(decoded) {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                warn!(secret_type = ?credential.secret_type, "Ignoring non UTF-8 secret: {}", e);
                None
            }
        }
    }
}

/// Returns the same token regardless of the descriptor
#[derive(Debug, Default, Clone)]
pub struct StaticSecretResolver {
    token: Option<String>,
}

impl StaticSecretResolver {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl SecretResolver for StaticSecretResolver {
    fn resolve_auth(&self, _credential: &GitCredential) -> Option<String> {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretContent;

    fn credential(secret_type: SecretType, password: &str) -> GitCredential {
        GitCredential {
            secret_type,
            secret_content: Some(SecretContent {
                username: None,
                password: password.to_string(),
            }),
        }
    }

    #[test]
    fn test_decodes_token_secret_types() {
        let resolver = Base64SecretResolver;
        let encoded = STANDARD.encode("glpat-123");

        for secret_type in [
            SecretType::PersonalAccessToken,
            SecretType::OAuth,
            SecretType::BasicAuth,
        ] {
            assert_eq!(
                resolver.resolve_auth(&credential(secret_type, &encoded)),
                Some("glpat-123".to_string())
            );
        }
    }

    #[test]
    fn test_no_secret_is_anonymous() {
        let resolver = Base64SecretResolver;
        let encoded = STANDARD.encode("glpat-123");

        assert_eq!(
            resolver.resolve_auth(&credential(SecretType::None, &encoded)),
            None
        );
        assert_eq!(resolver.resolve_auth(&GitCredential::anonymous()), None);
        assert_eq!(
            resolver.resolve_auth(&GitCredential {
                secret_type: SecretType::PersonalAccessToken,
                secret_content: None,
            }),
            None
        );
    }

    #[test]
    fn test_invalid_base64_is_anonymous() {
        let resolver = Base64SecretResolver;
        assert_eq!(
            resolver.resolve_auth(&credential(SecretType::PersonalAccessToken, "not base64!")),
            None
        );
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticSecretResolver::new(Some("token".to_string()));
        assert_eq!(
            resolver.resolve_auth(&GitCredential::anonymous()),
            Some("token".to_string())
        );
        assert_eq!(
            StaticSecretResolver::new(Some(String::new())).resolve_auth(&GitCredential::anonymous()),
            None
        );
    }
}
