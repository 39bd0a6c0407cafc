//! Plain git servers without a known REST API
//!
//! Identity and branches come from the smart-HTTP ref advertisement
//! (`info/refs?service=git-upload-pack`). Anything that needs tree or blob
//! access is reported as unsupported.
//!
//! # Packet-line format
//!
//! Each line carries a 4-hex-digit length prefix that includes itself. `0000`
//! is a flush packet; the first ref line carries capabilities after a NUL.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::git_provider::{basic_username, project_not_found, GitProvider, ProviderClient};
use super::transport::{ApiAuth, HttpTransport};
use crate::config::GitServiceConfig;
use crate::errors::GitServiceError;
use crate::normalize::check_response;
use crate::types::{
    GitCredential, GitProviderType, RepoMetadata, ResolvedProject, SecretType,
};

const UPLOAD_PACK: &str = "git-upload-pack";
const HEADS_PREFIX: &str = "refs/heads/";
const HEAD_SYMREF: &str = "symref=HEAD:";

/// Refs advertised by a git server
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefAdvertisement {
    pub head: Option<String>,
    pub branches: Vec<String>,
}

/// Decode the data payloads of a packet-line stream, dropping flush packets
///
/// Stops at the first malformed length and returns what was decoded so far.
fn decode_pkt_lines(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pos = 0;

    while pos + 4 <= data.len() {
        let Some(pkt_len) = std::str::from_utf8(&data[pos..pos + 4])
            .ok()
            .and_then(|hex| usize::from_str_radix(hex, 16).ok())
        else {
            warn!(offset = pos, "invalid packet-line length");
            break;
        };

        match pkt_len {
            0..=2 => {
                trace!(offset = pos, "control packet");
                pos += 4;
            }
            3 => {
                warn!(offset = pos, "invalid packet-line length 0003");
                break;
            }
            n if pos + n > data.len() => {
                warn!(offset = pos, declared = n, "truncated packet-line");
                break;
            }
            n => {
                let payload = String::from_utf8_lossy(&data[pos + 4..pos + n]);
                lines.push(payload.trim_end_matches('\n').to_string());
                pos += n;
            }
        }
    }

    lines
}

/// Parse an `info/refs` body
///
/// Smart servers answer with packet lines; dumb servers with `<sha>\t<ref>`
/// text lines and no HEAD information.
pub fn parse_ref_advertisement(body: &[u8]) -> RefAdvertisement {
    let first_line = body.split(|b| *b == b'\n').next().unwrap_or_default();
    let is_dumb = first_line.contains(&b'\t');

    let lines: Vec<String> = if !is_dumb {
        decode_pkt_lines(body)
    } else {
        String::from_utf8_lossy(body)
            .lines()
            .map(|line| line.replace('\t', " "))
            .collect()
    };

    let mut advertisement = RefAdvertisement::default();

    for line in lines.iter().filter(|l| !l.starts_with('#')) {
        let (refs_part, capabilities) = match line.split_once('\0') {
            Some((refs, caps)) => (refs, Some(caps)),
            None => (line.as_str(), None),
        };

        if let Some(caps) = capabilities {
            advertisement.head = caps
                .split(' ')
                .find_map(|cap| cap.strip_prefix(HEAD_SYMREF))
                .and_then(|target| target.strip_prefix(HEADS_PREFIX))
                .map(str::to_string);
        }

        let Some((_sha, ref_name)) = refs_part.split_once(' ') else {
            continue;
        };
        if let Some(branch) = ref_name.trim().strip_prefix(HEADS_PREFIX) {
            advertisement.branches.push(branch.to_string());
        }
    }

    advertisement
}

pub struct GenericProvider {
    client: ProviderClient,
}

impl GenericProvider {
    pub fn new(
        metadata: &RepoMetadata,
        credential: &GitCredential,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
        config: &GitServiceConfig,
    ) -> Self {
        let api_root = config.api_root().unwrap_or_else(|| metadata.host.clone());

        Self {
            client: ProviderClient::new(
                transport,
                api_root,
                Self::auth(credential, token),
                config,
            ),
        }
    }

    /// Git over HTTP only understands basic auth; OAuth tokens go as Bearer
    fn auth(credential: &GitCredential, token: Option<String>) -> ApiAuth {
        match token {
            None => ApiAuth::Anonymous,
            Some(token) => match credential.secret_type {
                SecretType::OAuth => ApiAuth::Bearer(token),
                _ => ApiAuth::Basic {
                    username: basic_username(credential),
                    password: token,
                },
            },
        }
    }

    async fn advertisement(&self, full_name: &str) -> Result<RefAdvertisement, GitServiceError> {
        let request = self
            .client
            .request(&format!("/{}.git/info/refs", full_name))
            .query("service", UPLOAD_PACK);

        let context = format!("Refs for {}", full_name);
        let response = check_response(self.client.transport.get(request).await?, &context)?;

        Ok(parse_ref_advertisement(&response.body))
    }

    fn unsupported(&self, operation: &str) -> GitServiceError {
        GitServiceError::Unsupported(format!(
            "{} is not available on generic git servers",
            operation
        ))
    }
}

#[async_trait]
impl GitProvider for GenericProvider {
    fn provider_type(&self) -> GitProviderType {
        GitProviderType::Generic
    }

    async fn get_project(
        &self,
        metadata: &RepoMetadata,
    ) -> Result<ResolvedProject, GitServiceError> {
        let advertisement = self
            .advertisement(&metadata.full_name)
            .await
            .map_err(|e| project_not_found(e, &metadata.full_name))?;

        debug!(
            "Resolved git repository {} with {} branches",
            metadata.full_name,
            advertisement.branches.len()
        );

        // Plain git has no notion of a canonical name beyond the path itself
        Ok(ResolvedProject {
            id: metadata.full_name.clone(),
            full_name: metadata.full_name.clone(),
            default_branch: advertisement.head,
            language: None,
        })
    }

    async fn list_branches(
        &self,
        project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        Ok(self.advertisement(&project.full_name).await?.branches)
    }

    async fn list_files(
        &self,
        _project: &ResolvedProject,
        _git_ref: Option<&str>,
        _context_dir: &str,
    ) -> Result<Vec<String>, GitServiceError> {
        Err(self.unsupported("File listing"))
    }

    async fn list_languages(
        &self,
        _project: &ResolvedProject,
    ) -> Result<Vec<String>, GitServiceError> {
        Err(self.unsupported("Language detection"))
    }

    async fn get_raw_file(
        &self,
        _project: &ResolvedProject,
        path: &str,
        _git_ref: Option<&str>,
    ) -> Result<String, GitServiceError> {
        Err(self.unsupported(&format!("Reading {}", path)))
    }
}
