//! Typed access to a kind through whichever group version serves it
//!
//! Callers always work with the canonical k8s-openapi type of a kind (e.g. `apps/v1` [`Deployment`]).
//! A [`NegotiatedApi`] converts objects to the negotiated group version right before a request
//! and back to the canonical type right after it.
//!
//! [`Deployment`]: k8s_openapi::api::apps::v1::Deployment
use std::{fmt::Debug, marker::PhantomData};

use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::{
    api::{Api, ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PostParams, TypeMeta},
    core::GroupVersionKind,
    Client,
};
use serde::{de::DeserializeOwned, Serialize};
use tfk8s_core::{convert, ApiGroup, ResourceKindExt, DEFAULT_NAMESPACE};

use crate::{
    discovery::ServerResources,
    error::{Error, Result},
    select::negotiate,
};

/// Whether objects of a k8s-openapi scope live in a namespace
pub trait Scope {
    /// `true` for namespaced kinds
    const NAMESPACED: bool;
}

impl Scope for NamespaceResourceScope {
    const NAMESPACED: bool = true;
}

impl Scope for ClusterResourceScope {
    const NAMESPACED: bool = false;
}

/// A canonical typed kind that can be exchanged with any group version serving it
pub trait Versioned: k8s_openapi::Resource + Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Whether the kind is namespaced
    const NAMESPACED: bool;
}

impl<K> Versioned for K
where
    K: k8s_openapi::Resource + Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static,
    K::Scope: Scope,
{
    const NAMESPACED: bool = <K::Scope as Scope>::NAMESPACED;
}

/// An api handle for `K` bound to one negotiated group version
pub struct NegotiatedApi<K> {
    api: Api<DynamicObject>,
    resource: ApiResource,
    group: ApiGroup,
    kind: PhantomData<fn() -> K>,
}

impl<K> Clone for NegotiatedApi<K> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            resource: self.resource.clone(),
            group: self.group,
            kind: PhantomData,
        }
    }
}

impl<K: Versioned> NegotiatedApi<K> {
    /// Talk to `K` through `group`
    ///
    /// `namespace` is ignored for cluster scoped kinds and defaults to `default` for namespaced ones.
    pub fn new(client: Client, group: ApiGroup, namespace: Option<&str>) -> Self {
        let gvk = GroupVersionKind::gvk(group.group(), group.version(), K::KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, K::URL_PATH_SEGMENT);
        let api = if K::NAMESPACED {
            Api::namespaced_with(client, namespace.unwrap_or(DEFAULT_NAMESPACE), &resource)
        } else {
            Api::all_with(client, &resource)
        };
        Self {
            api,
            resource,
            group,
            kind: PhantomData,
        }
    }

    /// Negotiate the most preferred of `candidates` and bind to it
    pub async fn negotiate<D>(
        client: Client,
        discovery: &D,
        candidates: &[ApiGroup],
        namespace: Option<&str>,
    ) -> Result<Self>
    where
        D: ServerResources + ?Sized,
    {
        let group = negotiate(discovery, &K::resource_kind(), candidates).await?;
        tracing::debug!(kind = K::KIND, %group, "negotiated api group");
        Ok(Self::new(client, group, namespace))
    }

    /// The negotiated group version
    pub fn group(&self) -> ApiGroup {
        self.group
    }

    /// The api resource requests are sent to
    pub fn api_resource(&self) -> &ApiResource {
        &self.resource
    }

    /// Convert a canonical object into the negotiated group version
    pub fn to_versioned(&self, obj: &K) -> Result<DynamicObject> {
        let mut versioned: DynamicObject = convert(obj)?;
        versioned.types = Some(TypeMeta {
            api_version: self.resource.api_version.clone(),
            kind: self.resource.kind.clone(),
        });
        Ok(versioned)
    }

    /// Convert an object of the negotiated group version back to the canonical type
    pub fn from_versioned(&self, mut obj: DynamicObject) -> Result<K> {
        // k8s-openapi refuses objects stamped with another apiVersion
        obj.types = Some(TypeMeta {
            api_version: K::API_VERSION.to_string(),
            kind: K::KIND.to_string(),
        });
        Ok(convert(&obj)?)
    }

    /// Get a named object
    pub async fn get(&self, name: &str) -> Result<K> {
        let obj = self.api.get(name).await?;
        self.from_versioned(obj)
    }

    /// Get a named object, `None` if it does not exist
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        match self.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a named object exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_opt(name).await?.is_some())
    }

    /// Create an object
    pub async fn create(&self, obj: &K) -> Result<K> {
        let versioned = self.to_versioned(obj)?;
        tracing::debug!(kind = K::KIND, group = %self.group, "creating object");
        let created = self.api.create(&PostParams::default(), &versioned).await?;
        self.from_versioned(created)
    }

    /// Replace a named object
    pub async fn replace(&self, name: &str, obj: &K) -> Result<K> {
        let versioned = self.to_versioned(obj)?;
        tracing::debug!(kind = K::KIND, group = %self.group, name, "replacing object");
        let replaced = self.api.replace(name, &PostParams::default(), &versioned).await?;
        self.from_versioned(replaced)
    }

    /// Apply RFC 6902 operations to a named object
    pub async fn patch_json(&self, name: &str, ops: json_patch::Patch) -> Result<K> {
        tracing::debug!(kind = K::KIND, group = %self.group, name, ops = ops.0.len(), "patching object");
        let patched = self
            .api
            .patch(name, &PatchParams::default(), &Patch::<()>::Json(ops))
            .await?;
        self.from_versioned(patched)
    }

    /// Delete a named object
    pub async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<()> {
        tracing::debug!(kind = K::KIND, group = %self.group, name, "deleting object");
        self.api.delete(name, dp).await.map_err(Error::Api)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NegotiatedApi;
    use crate::mock::{status, testcontext, timeout_after_1s};
    use assert_json_diff::assert_json_include;
    use http::Method;
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment},
        scheduling::v1::PriorityClass,
    };
    use kube::api::DeleteParams;
    use serde_json::json;
    use tfk8s_core::ApiGroup;

    fn deployment() -> Deployment {
        serde_json::from_value(json!({
            "metadata": { "name": "web", "namespace": "prod" },
            "spec": {
                "replicas": 3,
                "selector": { "matchLabels": { "app": "web" } },
                "template": { "metadata": { "labels": { "app": "web" } } }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn objects_survive_a_trip_through_a_legacy_group() {
        let (client, _) = testcontext();
        let api = NegotiatedApi::<Deployment>::new(client, ApiGroup::ExtensionsV1beta1, Some("prod"));

        let versioned = api.to_versioned(&deployment()).unwrap();
        let types = versioned.types.clone().unwrap();
        assert_eq!(types.api_version, "extensions/v1beta1");
        assert_eq!(types.kind, "Deployment");
        assert_eq!(versioned.data["spec"]["replicas"], 3);

        let back = api.from_versioned(versioned).unwrap();
        assert_eq!(back.metadata.name.as_deref(), Some("web"));
        assert_eq!(back.metadata.namespace.as_deref(), Some("prod"));
        assert_eq!(back.spec.unwrap().replicas, Some(3));
    }

    #[tokio::test]
    async fn create_posts_to_the_negotiated_group() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|method, path, body| {
            assert_eq!(*method, Method::POST);
            assert_eq!(path, "/apis/extensions/v1beta1/namespaces/default/daemonsets");
            let mut body = body.unwrap();
            assert_json_include!(actual: &body, expected: json!({ "apiVersion": "extensions/v1beta1", "kind": "DaemonSet" }));
            body["metadata"]["uid"] = json!("1234");
            (201, body)
        });

        let api = NegotiatedApi::<DaemonSet>::new(client, ApiGroup::ExtensionsV1beta1, None);
        let ds: DaemonSet = serde_json::from_value(json!({
            "metadata": { "name": "fluentd" },
            "spec": { "selector": {}, "template": {} }
        }))
        .unwrap();
        let created = api.create(&ds).await.unwrap();
        drop(api);
        assert_eq!(created.metadata.uid.as_deref(), Some("1234"));
        assert_eq!(created.metadata.name.as_deref(), Some("fluentd"));
        timeout_after_1s(mocksrv).await;
    }

    #[tokio::test]
    async fn absent_objects_read_as_none() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|_, path, _| match path {
            "/apis/apps/v1beta2/namespaces/prod/deployments/gone" => {
                (404, status(404, "deployments.apps \"gone\" not found"))
            }
            _ => (404, status(404, "the server could not find the requested resource")),
        });

        let api = NegotiatedApi::<Deployment>::new(client.clone(), ApiGroup::AppsV1beta2, Some("prod"));
        assert!(api.get_opt("gone").await.unwrap().is_none());
        assert!(!api.exists("gone").await.unwrap());

        // an unserved group version is an error, not a missing object
        let legacy = NegotiatedApi::<Deployment>::new(client, ApiGroup::AppsV1beta1, Some("prod"));
        assert!(legacy.get_opt("web").await.is_err());
        drop((api, legacy));

        let calls = timeout_after_1s(mocksrv).await;
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn patch_and_delete_cluster_scoped_objects() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|method, path, body| {
            assert_eq!(path, "/apis/scheduling.k8s.io/v1beta1/priorityclasses/high");
            let obj = json!({
                "apiVersion": "scheduling.k8s.io/v1beta1",
                "kind": "PriorityClass",
                "metadata": { "name": "high", "labels": { "tier": "gold" } },
                "value": 1000
            });
            match *method {
                Method::PATCH => {
                    assert_eq!(body.unwrap(), json!([{ "op": "add", "path": "/metadata/labels", "value": { "tier": "gold" } }]));
                    (200, obj)
                }
                Method::DELETE => (200, obj),
                _ => panic!("unexpected {method}"),
            }
        });

        let api = NegotiatedApi::<PriorityClass>::new(client, ApiGroup::SchedulingV1beta1, Some("ignored"));
        let ops = serde_json::from_value(json!([{ "op": "add", "path": "/metadata/labels", "value": { "tier": "gold" } }])).unwrap();
        let patched = api.patch_json("high", ops).await.unwrap();
        assert_eq!(patched.value, 1000);
        api.delete("high", &DeleteParams::foreground()).await.unwrap();
        drop(api);

        let calls = timeout_after_1s(mocksrv).await;
        assert_eq!(calls.iter().map(|(m, _)| m.clone()).collect::<Vec<_>>(), vec![Method::PATCH, Method::DELETE]);
    }
}
