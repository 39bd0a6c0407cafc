use std::future::Future;
use tokio::sync::RwLock;

use crate::errors::GitServiceError;
use crate::types::ResolvedProject;

/// Single-slot memo for the provider-confirmed project
///
/// Only successes are stored. The lock is never held across the fetch, so two
/// callers racing on an empty slot may both hit the provider; both results
/// describe the same project and the last write wins.
#[derive(Debug, Default)]
pub struct IdentityCache {
    slot: RwLock<Option<ResolvedProject>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Option<ResolvedProject> {
        self.slot.read().await.clone()
    }

    pub async fn set(&self, project: ResolvedProject) {
        let mut slot = self.slot.write().await;
        *slot = Some(project);
    }

    pub async fn is_populated(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Return the cached project, or run `fetch` and remember its success
    pub async fn get_or_try_fetch<F, Fut>(&self, fetch: F) -> Result<ResolvedProject, GitServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedProject, GitServiceError>>,
    {
        if let Some(project) = self.get().await {
            return Ok(project);
        }

        let project = fetch().await?;
        self.set(project.clone()).await;
        Ok(project)
    }
}
