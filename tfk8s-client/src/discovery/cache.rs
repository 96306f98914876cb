use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tfk8s_core::{ApiGroup, SupportedVersionSet};
use tokio::time::Instant;

use super::ServerResources;
use crate::error::DiscoveryError;

/// Discovery that reuses answers for a fixed time to live
///
/// Answers are kept per group version, so a snapshot can mix entries of different ages.
/// Within the time to live, a group version that has been installed or removed on the
/// server is not noticed, and negotiation can pick a group version that no longer exists.
pub struct CachedDiscovery<D> {
    inner: D,
    ttl: Duration,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    fetched: HashMap<ApiGroup, Instant>,
    snapshot: SupportedVersionSet,
}

impl<D: ServerResources> CachedDiscovery<D> {
    /// Cache answers of `inner` for `ttl`
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: Mutex::default(),
        }
    }

    /// Forget every cached answer
    pub fn invalidate(&self) {
        *self.state.lock() = CacheState::default();
    }

    fn stale(&self, groups: &[ApiGroup]) -> Vec<ApiGroup> {
        let state = self.state.lock();
        let now = Instant::now();
        groups
            .iter()
            .copied()
            .filter(|g| match state.fetched.get(g) {
                Some(at) => now.duration_since(*at) >= self.ttl,
                None => true,
            })
            .collect()
    }
}

#[async_trait]
impl<D: ServerResources> ServerResources for CachedDiscovery<D> {
    async fn supported_versions(&self, groups: &[ApiGroup]) -> Result<SupportedVersionSet, DiscoveryError> {
        let stale = self.stale(groups);
        if !stale.is_empty() {
            tracing::debug!(?stale, "refreshing cached discovery");
            let fresh = self.inner.supported_versions(&stale).await?;
            let now = Instant::now();
            let mut state = self.state.lock();
            for g in &stale {
                state.fetched.insert(*g, now);
            }
            state.snapshot.merge(fresh);
        }

        let state = self.state.lock();
        let mut set = SupportedVersionSet::new();
        for &g in groups {
            set.insert(g, state.snapshot.kinds(g).into_iter().flatten().cloned());
        }
        Ok(set)
    }
}
