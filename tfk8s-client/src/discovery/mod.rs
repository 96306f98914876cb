//! Discovery of the group versions an api server serves
//!
//! Negotiation only ever needs to know about a handful of candidate group versions,
//! so discovery here is scoped to those candidates rather than to the whole api surface.
//!
//! - [`ClusterDiscovery`] asks the api server on every call
//! - [`CachedDiscovery`] remembers answers per group version for a fixed time
use std::collections::BTreeSet;

use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::Client;
use tfk8s_core::{ApiGroup, SupportedVersionSet};

use crate::error::DiscoveryError;

mod cache;
pub use cache::CachedDiscovery;

/// Source of discovery snapshots
#[async_trait]
pub trait ServerResources: Send + Sync {
    /// Snapshot of the resource kinds served by each of `groups`
    ///
    /// Every requested group version is covered by the result;
    /// the ones the api server does not advertise serve nothing.
    async fn supported_versions(&self, groups: &[ApiGroup]) -> Result<SupportedVersionSet, DiscoveryError>;
}

/// Uncached discovery against a live api server
#[derive(Clone)]
pub struct ClusterDiscovery {
    client: Client,
}

impl ClusterDiscovery {
    /// Discover through `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn advertised(&self, groups: &[ApiGroup]) -> Result<BTreeSet<String>, DiscoveryError> {
        let mut advertised = BTreeSet::new();
        if groups.iter().any(|g| !g.is_core()) {
            let list = self.client.list_api_groups().await.map_err(DiscoveryError::ListGroups)?;
            for g in list.groups {
                advertised.extend(g.versions.into_iter().map(|v| v.group_version));
            }
        }
        if groups.iter().any(|g| g.is_core()) {
            let core = self
                .client
                .list_core_api_versions()
                .await
                .map_err(DiscoveryError::ListGroups)?;
            advertised.extend(core.versions);
        }
        Ok(advertised)
    }
}

#[async_trait]
impl ServerResources for ClusterDiscovery {
    async fn supported_versions(&self, groups: &[ApiGroup]) -> Result<SupportedVersionSet, DiscoveryError> {
        let advertised = self.advertised(groups).await?;
        let mut set = SupportedVersionSet::new();

        let mut lookups = vec![];
        for &group in groups {
            if !advertised.contains(&group.api_version()) {
                tracing::trace!(%group, "group version not advertised");
                set.insert_unserved(group);
                continue;
            }
            let client = self.client.clone();
            lookups.push(async move {
                let list = if group.is_core() {
                    client.list_core_api_resources(group.version()).await
                } else {
                    client.list_api_group_resources(&group.api_version()).await
                };
                list.map(|l| (group, l))
                    .map_err(|source| DiscoveryError::ListResources { group, source })
            });
        }
        for (group, list) in try_join_all(lookups).await? {
            set.insert_list(group, &list);
        }
        tracing::debug!(candidates = groups.len(), advertised = advertised.len(), "discovered served resources");
        Ok(set)
    }
}

/// Version of the api server
pub async fn server_version(client: &Client) -> kube::Result<Info> {
    client.apiserver_version().await
}

/// Whether the server predates Kubernetes 1.9
///
/// Older servers only carry the `v1beta*` workload groups.
/// Distribution suffixes such as `9+` are ignored.
pub fn server_version_pre_1_9(info: &Info) -> bool {
    let minor = info
        .minor
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse::<u32>()
        .unwrap_or(u32::MAX);
    info.major == "1" && minor < 9
}
