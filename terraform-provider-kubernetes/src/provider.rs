//! The provider: configuration, the resource table and dispatch
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use kube::Client;
use parking_lot::RwLock;
use tfk8s_client::{
    discovery::{server_version, server_version_pre_1_9},
    CachedDiscovery, ClusterDiscovery, ServerResources,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ProviderConfig,
    data::ResourceData,
    data_sources::{self, DataSource},
    error::{Error, Result},
    migrate::InstanceState,
    resources::{
        ClusterRoleBindingKind, CronJobKind, CustomResourceDefinitionKind, DaemonSetKind, DeploymentKind,
        ObjectResource, PriorityClassKind, Resource, RoleBindingKind, RoleKind, StatefulSetKind,
    },
    schema::{ProviderSchema, PROVIDER_ATTRIBUTES},
};

/// Everything an operation needs to talk to the cluster
pub struct KubeContext {
    pub client: Client,
    pub discovery: Arc<dyn ServerResources>,
    /// Namespace for objects that do not name one
    pub namespace: String,
    /// Cancelled when the provider is stopped
    pub cancel: CancellationToken,
}

impl KubeContext {
    /// Context with live discovery, cached for `cache_ttl` when set
    pub fn new(client: Client, cache_ttl: Option<Duration>, namespace: &str, cancel: CancellationToken) -> Self {
        let live = ClusterDiscovery::new(client.clone());
        let discovery: Arc<dyn ServerResources> = match cache_ttl {
            Some(ttl) => Arc::new(CachedDiscovery::new(live, ttl)),
            None => Arc::new(live),
        };
        Self {
            client,
            discovery,
            namespace: namespace.to_string(),
            cancel,
        }
    }
}

/// The kubernetes provider
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    context: RwLock<Option<Arc<KubeContext>>>,
    cancel: CancellationToken,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    /// Provider with every supported resource and data source
    pub fn new() -> Self {
        let mut provider = Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            context: RwLock::new(None),
            cancel: CancellationToken::new(),
        };
        provider.register(ObjectResource::new(ClusterRoleBindingKind));
        provider.register(ObjectResource::new(CronJobKind));
        provider.register(ObjectResource::new(CustomResourceDefinitionKind));
        provider.register(ObjectResource::new(DaemonSetKind));
        provider.register(ObjectResource::new(DeploymentKind));
        provider.register(ObjectResource::new(PriorityClassKind));
        provider.register(ObjectResource::new(RoleKind));
        provider.register(ObjectResource::new(RoleBindingKind));
        provider.register(ObjectResource::new(StatefulSetKind));
        provider.register_data_source(data_sources::deployment());
        provider.register_data_source(data_sources::service());
        provider
    }

    fn register(&mut self, resource: impl Resource + 'static) {
        self.resources.insert(resource.type_name(), Box::new(resource));
    }

    fn register_data_source(&mut self, source: impl DataSource + 'static) {
        self.data_sources.insert(source.type_name(), Box::new(source));
    }

    /// Connect to the cluster described by `cfg`
    pub async fn configure(&self, cfg: &ProviderConfig) -> Result<()> {
        let client = cfg.client().await?;
        match server_version(&client).await {
            Ok(info) => {
                tracing::info!(version = %info.git_version, "connected to kubernetes");
                if server_version_pre_1_9(&info) {
                    tracing::warn!(version = %info.git_version, "server predates 1.9, only beta workload apis are available");
                }
            }
            Err(err) => tracing::warn!(error = %err, "could not determine server version"),
        }
        self.configure_with(client, cfg)
    }

    /// Use an existing client, with the remaining settings from `cfg`
    pub fn configure_with(&self, client: Client, cfg: &ProviderConfig) -> Result<()> {
        let ttl = cfg.discovery_cache_ttl()?;
        let namespace = cfg
            .namespace
            .clone()
            .unwrap_or_else(|| client.default_namespace().to_string());
        tracing::debug!(%namespace, cache_ttl = ?ttl, "configuring provider");
        let ctx = KubeContext::new(client, ttl, &namespace, self.cancel.child_token());
        *self.context.write() = Some(Arc::new(ctx));
        Ok(())
    }

    fn context(&self) -> Result<Arc<KubeContext>> {
        self.context.read().clone().ok_or(Error::NotConfigured)
    }

    pub fn resource(&self, type_name: &str) -> Result<&dyn Resource> {
        self.resources
            .get(type_name)
            .map(|boxed| &**boxed)
            .ok_or_else(|| Error::UnknownResource(type_name.into()))
    }

    pub fn data_source(&self, type_name: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .get(type_name)
            .map(|boxed| &**boxed)
            .ok_or_else(|| Error::UnknownDataSource(type_name.into()))
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: PROVIDER_ATTRIBUTES.to_vec(),
            resources: self.resources.iter().map(|(name, r)| (*name, r.schema())).collect(),
            data_sources: self.data_sources.iter().map(|(name, s)| (*name, s.schema())).collect(),
        }
    }

    pub async fn create(&self, type_name: &str, d: &mut ResourceData) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.create(&*self.context()?, d).await
    }

    pub async fn read(&self, type_name: &str, d: &mut ResourceData) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.read(&*self.context()?, d).await
    }

    pub async fn update(&self, type_name: &str, d: &mut ResourceData) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.update(&*self.context()?, d).await
    }

    pub async fn delete(&self, type_name: &str, d: &mut ResourceData) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.delete(&*self.context()?, d).await
    }

    pub async fn exists(&self, type_name: &str, d: &ResourceData) -> Result<bool> {
        let resource = self.resource(type_name)?;
        resource.exists(&*self.context()?, d).await
    }

    pub fn import(&self, type_name: &str, id: &str) -> Result<ResourceData> {
        Ok(self.resource(type_name)?.import(id))
    }

    pub fn upgrade_state(&self, type_name: &str, version: u32, state: InstanceState) -> Result<InstanceState> {
        self.resource(type_name)?.upgrade_state(version, state)
    }

    pub async fn read_data_source(&self, type_name: &str, d: &mut ResourceData) -> Result<()> {
        let source = self.data_source(type_name)?;
        source.read(&*self.context()?, d).await
    }

    /// Cancel rollout and deletion waits, in flight or started later
    pub fn stop(&self) {
        tracing::info!("stopping provider");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::Provider;
    use crate::{
        config::ProviderConfig,
        data::ResourceData,
        mock::{discovery_reply, testcontext, timeout_after_1s},
        timeouts::Timeouts,
    };

    #[test]
    fn every_resource_is_registered() {
        let schema = Provider::new().schema();
        let names = schema.resources.keys().copied().collect::<Vec<_>>();
        assert_eq!(names, vec![
            "kubernetes_cluster_role_binding",
            "kubernetes_cron_job",
            "kubernetes_custom_resource_definition",
            "kubernetes_daemonset",
            "kubernetes_deployment",
            "kubernetes_priority_class",
            "kubernetes_role",
            "kubernetes_role_binding",
            "kubernetes_stateful_set",
        ]);
        assert_eq!(schema.resources["kubernetes_deployment"].schema_version, 2);
        assert_eq!(schema.resources["kubernetes_daemonset"].schema_version, 1);
        assert_eq!(schema.resources["kubernetes_stateful_set"].schema_version, 1);
        assert!(!schema.resources["kubernetes_priority_class"].namespaced);
        assert_eq!(schema.data_sources.keys().copied().collect::<Vec<_>>(), vec![
            "kubernetes_deployment",
            "kubernetes_service"
        ]);
    }

    #[tokio::test]
    async fn operations_need_configuration() {
        let provider = Provider::new();
        let mut d = ResourceData::default().with_id("default/web");
        let err = provider.read("kubernetes_deployment", &mut d).await.unwrap_err();
        assert_eq!(err.to_string(), "provider is not configured");
        let err = provider.read("kubernetes_pod", &mut d).await.unwrap_err();
        assert_eq!(err.to_string(), "unknown resource type kubernetes_pod");
    }

    #[test]
    fn import_takes_the_id_as_is() {
        let d = Provider::new().import("kubernetes_role", "kube-system/reader").unwrap();
        assert_eq!(d.id(), Some("kube-system/reader"));
        assert!(Provider::new().import("kubernetes_pod", "x").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_rollout_waits() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|method, path, _| {
            if let Some(reply) = discovery_reply(path, &[("apps/v1", &["deployments"])]) {
                return reply;
            }
            let deployment = json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": "web", "namespace": "apps" },
                "spec": { "replicas": 2, "selector": {}, "template": {} },
                "status": { "replicas": 0 }
            });
            match method.as_str() {
                "POST" => (201, deployment),
                "GET" => (200, deployment),
                _ => panic!("unexpected {method} {path}"),
            }
        });

        let provider = std::sync::Arc::new(Provider::new());
        let cfg = ProviderConfig {
            namespace: Some("apps".into()),
            ..ProviderConfig::default()
        };
        provider.configure_with(client, &cfg).unwrap();

        let creating = tokio::spawn({
            let provider = provider.clone();
            async move {
                let Value::Object(attrs) = json!({
                    "metadata": { "name": "web" },
                    "spec": { "replicas": 2, "selector": {}, "template": {} }
                }) else {
                    unreachable!()
                };
                let mut d = ResourceData::new(attrs).with_timeouts(Timeouts::default());
                let res = provider.create("kubernetes_deployment", &mut d).await;
                (res, d)
            }
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        provider.stop();
        let (res, d) = creating.await.unwrap();
        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "Failed to create deployment: waiting for web was cancelled");
        // the object was created before the wait, so it is tracked
        assert_eq!(d.id(), Some("apps/web"));

        drop(provider);
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn requests_after_stop_still_run_but_skip_waiting() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|method, path, _| {
            if let Some(reply) = discovery_reply(path, &[("apps/v1", &["deployments"])]) {
                return reply;
            }
            let deployment = json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": "web", "namespace": "default" },
                "spec": { "replicas": 2, "selector": {}, "template": {} },
                "status": { "replicas": 0 }
            });
            match method.as_str() {
                "POST" => (201, deployment),
                _ => panic!("unexpected {method} {path}"),
            }
        });

        let provider = Provider::new();
        provider.configure_with(client, &ProviderConfig::default()).unwrap();
        provider.stop();

        let Value::Object(attrs) = json!({
            "metadata": { "name": "web", "namespace": "default" },
            "spec": { "replicas": 2, "selector": {}, "template": {} }
        }) else {
            unreachable!()
        };
        let mut d = ResourceData::new(attrs).with_timeouts(Timeouts::default());
        let err = provider.create("kubernetes_deployment", &mut d).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to create deployment: waiting for web was cancelled");
        assert_eq!(d.id(), Some("default/web"));

        drop(provider);
        let calls = timeout_after_1s(mocksrv).await;
        assert_eq!(calls.last().unwrap().0, http::Method::POST);
    }
}
