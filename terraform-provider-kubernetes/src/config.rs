//! Provider configuration and kubernetes client construction
use std::{path::PathBuf, time::Duration};

use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    timeouts::parse_duration,
};

/// The `provider "kubernetes"` block
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Path to a kubeconfig file, `KUBECONFIG` or `~/.kube/config` when unset
    pub config_path: Option<PathBuf>,
    pub config_context: Option<String>,
    pub config_context_cluster: Option<String>,
    pub config_context_auth_info: Option<String>,
    /// Overrides the api server url of the loaded configuration
    pub host: Option<String>,
    /// Skip tls verification of the api server
    pub insecure: bool,
    /// Namespace for namespaced objects that do not set one
    pub namespace: Option<String>,
    /// Remember discovery results for this long, e.g. `30s`
    pub discovery_cache_ttl: Option<String>,
}

impl ProviderConfig {
    fn kubeconfig_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.config_context.clone(),
            cluster: self.config_context_cluster.clone(),
            user: self.config_context_auth_info.clone(),
        }
    }

    fn has_context_options(&self) -> bool {
        self.config_context.is_some()
            || self.config_context_cluster.is_some()
            || self.config_context_auth_info.is_some()
    }

    /// Resolve a kubernetes client configuration
    ///
    /// An explicit `config_path` wins, then context selection in the default kubeconfig,
    /// then the usual inference (in-cluster environment, then kubeconfig).
    pub async fn kube_config(&self) -> Result<Config> {
        let mut config = if let Some(path) = &self.config_path {
            tracing::debug!(path = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(Error::Kubeconfig)?;
            Config::from_custom_kubeconfig(kubeconfig, &self.kubeconfig_options())
                .await
                .map_err(Error::Kubeconfig)?
        } else if self.has_context_options() {
            Config::from_kubeconfig(&self.kubeconfig_options())
                .await
                .map_err(Error::Kubeconfig)?
        } else {
            Config::infer().await.map_err(Error::InferConfig)?
        };
        if let Some(host) = &self.host {
            config.cluster_url = host
                .parse::<http::Uri>()
                .map_err(|_| Error::InvalidHost(host.clone()))?;
        }
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        if let Some(ns) = &self.namespace {
            config.default_namespace = ns.clone();
        }
        Ok(config)
    }

    /// Build a client from [`ProviderConfig::kube_config`]
    pub async fn client(&self) -> Result<Client> {
        let config = self.kube_config().await?;
        Client::try_from(config).map_err(Error::Client)
    }

    /// Parsed `discovery_cache_ttl`
    pub fn discovery_cache_ttl(&self) -> Result<Option<Duration>> {
        self.discovery_cache_ttl.as_deref().map(parse_duration).transpose()
    }
}
