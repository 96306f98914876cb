//! Terraform resources backed by negotiated kubernetes apis
//!
//! Each kind implements [`Kind`]: its canonical type, the group versions it can be served from and
//! the few places where it deviates from plain create / replace / delete. [`ObjectResource`] turns a
//! [`Kind`] into a [`Resource`] the provider can dispatch to.
use async_trait::async_trait;
use k8s_openapi::{apimachinery::pkg::apis::meta::v1::ObjectMeta, Metadata};
use kube::api::DeleteParams;
use serde_json::{json, Map, Value};
use tfk8s_client::{NegotiatedApi, Versioned};
use tfk8s_core::{ApiGroup, ObjectId, ParseObjectIdError};
use tfk8s_runtime::{wait_for_replicas, Replicas, RetryPolicy, WaitMode};

use crate::{
    data::{self, ResourceData},
    error::{Error, Result},
    migrate::{self, InstanceState},
    provider::KubeContext,
    schema::ResourceSchema,
    timeouts::Timeouts,
};

mod cron_job;
mod custom_resource_definition;
mod daemonset;
mod deployment;
mod priority_class;
mod rbac;
mod stateful_set;

pub use cron_job::CronJobKind;
pub use custom_resource_definition::CustomResourceDefinitionKind;
pub use daemonset::DaemonSetKind;
pub use deployment::DeploymentKind;
pub use priority_class::PriorityClassKind;
pub use rbac::{ClusterRoleBindingKind, RoleBindingKind, RoleKind};
pub use stateful_set::StatefulSetKind;

/// Attributes that only exist on the terraform side and survive a refresh
const LOCAL_ATTRS: &[&str] = &["timeouts", "wait_for_rollout"];

/// The operation that changed an object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Create,
    Update,
}

impl Op {
    fn verb(self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Update => "update",
        }
    }
}

/// How changes are sent to the api server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// RFC 6902 operations for changed labels, annotations and spec
    JsonPatch,
    /// The whole object
    Replace,
}

/// A kubernetes kind exposed as a terraform resource
#[async_trait]
pub trait Kind: Send + Sync + 'static {
    /// Canonical type the rest of the provider works with
    type Object: Versioned + Metadata<Ty = ObjectMeta>;

    /// Terraform type name, e.g. `kubernetes_deployment`
    const TYPE_NAME: &'static str;
    /// Used in log lines and error messages
    const NOUN: &'static str;
    /// Group versions serving the kind, most preferred first
    const CANDIDATES: &'static [ApiGroup];
    const SCHEMA_VERSION: u32 = 0;
    const UPDATE: UpdateStrategy = UpdateStrategy::Replace;
    /// Terraform block names that differ from the field name, as `(terraform, kubernetes)`
    const RENAMES: &'static [(&'static str, &'static str)] = &[];

    fn expand(&self, d: &ResourceData) -> Result<Self::Object> {
        data::expand(d.attrs(), Self::RENAMES, Self::NOUN)
    }

    fn flatten(&self, obj: &Self::Object) -> Result<Map<String, Value>> {
        data::flatten(obj, Self::RENAMES, Self::NOUN)
    }

    /// Wait for the cluster to act on a create or update
    async fn converge(
        &self,
        _api: &NegotiatedApi<Self::Object>,
        _name: &str,
        _op: Op,
        _ctx: &KubeContext,
        _d: &ResourceData,
    ) -> Result<()> {
        Ok(())
    }

    /// Remove the object
    async fn delete(
        &self,
        api: &NegotiatedApi<Self::Object>,
        name: &str,
        _ctx: &KubeContext,
        _d: &ResourceData,
    ) -> Result<()> {
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(Error::kube("delete", Self::NOUN))
    }

    fn upgrade_state(&self, version: u32, state: InstanceState) -> Result<InstanceState> {
        migrate::migrate_none(version, state)
    }
}

/// A terraform resource as seen by the provider
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> ResourceSchema;
    async fn create(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()>;
    /// Refresh attributes, clearing the id when the object is gone
    async fn read(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()>;
    async fn update(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()>;
    async fn delete(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()>;
    async fn exists(&self, ctx: &KubeContext, d: &ResourceData) -> Result<bool>;
    /// Start tracking an existing object; the id is taken as is
    fn import(&self, id: &str) -> ResourceData {
        ResourceData::default().with_id(id)
    }
    fn upgrade_state(&self, version: u32, state: InstanceState) -> Result<InstanceState>;
}

/// Generic [`Resource`] for any [`Kind`]
pub struct ObjectResource<T> {
    kind: T,
}

impl<T: Kind> ObjectResource<T> {
    pub fn new(kind: T) -> Self {
        Self { kind }
    }

    fn object_id(&self, d: &ResourceData) -> Result<ObjectId> {
        let id = d.id().ok_or(Error::MissingId)?;
        if <T::Object as Versioned>::NAMESPACED {
            Ok(ObjectId::parse_namespaced(id)?)
        } else {
            let parsed: ObjectId = id.parse()?;
            if parsed.namespace.is_some() {
                return Err(ParseObjectIdError(id.into()).into());
            }
            Ok(parsed)
        }
    }

    fn id_of(meta: &ObjectMeta) -> ObjectId {
        let name = meta.name.as_deref().unwrap_or_default();
        match meta.namespace.as_deref() {
            Some(ns) if <T::Object as Versioned>::NAMESPACED => ObjectId::namespaced(ns, name),
            _ => ObjectId::cluster(name),
        }
    }

    async fn api(&self, ctx: &KubeContext, namespace: Option<&str>, op: &'static str) -> Result<NegotiatedApi<T::Object>> {
        NegotiatedApi::negotiate(ctx.client.clone(), ctx.discovery.as_ref(), T::CANDIDATES, namespace)
            .await
            .map_err(Error::kube(op, T::NOUN))
    }

    /// Object built from the planned attributes, placed in `namespace` for namespaced kinds
    fn planned(&self, d: &ResourceData, namespace: &str) -> Result<T::Object> {
        let mut obj = self.kind.expand(d)?;
        let meta = obj.metadata_mut();
        if <T::Object as Versioned>::NAMESPACED {
            if meta.namespace.as_deref().is_none_or(str::is_empty) {
                meta.namespace = Some(namespace.to_string());
            }
        } else {
            meta.namespace = None;
        }
        Ok(obj)
    }

    fn patch_ops(&self, d: &ResourceData, obj: &T::Object) -> Result<json_patch::Patch> {
        let planned = serde_json::to_value(obj).map_err(|source| Error::Expand {
            noun: T::NOUN,
            source,
        })?;
        let mut ops = vec![];
        for field in ["labels", "annotations"] {
            if d.has_change(&format!("metadata.{field}")) {
                let value = planned
                    .pointer(&format!("/metadata/{field}"))
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                ops.push(json!({ "op": "add", "path": format!("/metadata/{field}"), "value": value }));
            }
        }
        if d.has_change("spec") {
            let spec = planned.get("spec").cloned().unwrap_or_else(|| json!({}));
            ops.push(json!({ "op": "replace", "path": "/spec", "value": spec }));
        }
        serde_json::from_value(Value::Array(ops)).map_err(|source| Error::Expand {
            noun: T::NOUN,
            source,
        })
    }

    async fn refresh(&self, api: &NegotiatedApi<T::Object>, id: &ObjectId, d: &mut ResourceData) -> Result<()> {
        match api.get_opt(&id.name).await.map_err(Error::kube("read", T::NOUN))? {
            Some(obj) => {
                tracing::debug!(%id, kind = T::NOUN, group = %api.group(), "received object");
                let mut attrs = self.kind.flatten(&obj)?;
                for key in LOCAL_ATTRS {
                    if let Some(v) = d.attrs().get(*key) {
                        attrs.insert(key.to_string(), v.clone());
                    }
                }
                d.set_attrs(attrs);
            }
            None => {
                tracing::warn!(%id, kind = T::NOUN, "object is gone, removing it from state");
                d.clear_id();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Kind> Resource for ObjectResource<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema {
            schema_version: T::SCHEMA_VERSION,
            importable: true,
            api_groups: T::CANDIDATES.iter().map(ToString::to_string).collect(),
            namespaced: <T::Object as Versioned>::NAMESPACED,
            timeouts: Timeouts::default().to_config(),
        }
    }

    async fn create(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()> {
        let obj = self.planned(d, &ctx.namespace)?;
        let api = self.api(ctx, obj.metadata().namespace.as_deref(), "create").await?;
        tracing::info!(kind = T::NOUN, group = %api.group(), "creating new object");
        let created = api.create(&obj).await.map_err(Error::kube("create", T::NOUN))?;
        let id = Self::id_of(created.metadata());
        tracing::info!(%id, kind = T::NOUN, "submitted new object");
        d.set_id(id.to_string());

        self.kind.converge(&api, &id.name, Op::Create, ctx, d).await?;
        self.refresh(&api, &id, d).await
    }

    async fn read(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()> {
        let id = self.object_id(d)?;
        let api = self.api(ctx, id.namespace.as_deref(), "read").await?;
        tracing::info!(%id, kind = T::NOUN, "reading object");
        self.refresh(&api, &id, d).await
    }

    async fn update(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()> {
        let id = self.object_id(d)?;
        let api = self.api(ctx, id.namespace.as_deref(), "update").await?;
        let mut obj = self.planned(d, id.namespace_or_default())?;
        match T::UPDATE {
            UpdateStrategy::JsonPatch => {
                let ops = self.patch_ops(d, &obj)?;
                if ops.0.is_empty() {
                    tracing::debug!(%id, kind = T::NOUN, "nothing to patch");
                } else {
                    api.patch_json(&id.name, ops).await.map_err(Error::kube("update", T::NOUN))?;
                }
            }
            UpdateStrategy::Replace => {
                obj.metadata_mut().name = Some(id.name.clone());
                api.replace(&id.name, &obj).await.map_err(Error::kube("update", T::NOUN))?;
            }
        }
        tracing::info!(%id, kind = T::NOUN, "submitted updated object");

        self.kind.converge(&api, &id.name, Op::Update, ctx, d).await?;
        self.refresh(&api, &id, d).await
    }

    async fn delete(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()> {
        let id = self.object_id(d)?;
        let api = self.api(ctx, id.namespace.as_deref(), "delete").await?;
        tracing::info!(%id, kind = T::NOUN, "deleting object");
        self.kind.delete(&api, &id.name, ctx, d).await?;
        tracing::info!(%id, kind = T::NOUN, "object deleted");
        d.clear_id();
        Ok(())
    }

    async fn exists(&self, ctx: &KubeContext, d: &ResourceData) -> Result<bool> {
        let id = self.object_id(d)?;
        let api = self.api(ctx, id.namespace.as_deref(), "check existence of").await?;
        tracing::info!(%id, kind = T::NOUN, "checking object");
        api.exists(&id.name).await.map_err(Error::kube("check existence of", T::NOUN))
    }

    fn upgrade_state(&self, version: u32, state: InstanceState) -> Result<InstanceState> {
        self.kind.upgrade_state(version, state)
    }
}

/// Wait until a workload has as many replicas as it wants
///
/// Waits are bounded by the create or update budget of `d` and end early on provider shutdown.
pub(crate) async fn wait_for_rollout<K>(
    api: &NegotiatedApi<K>,
    name: &str,
    noun: &'static str,
    op: Op,
    ctx: &KubeContext,
    d: &ResourceData,
) -> Result<()>
where
    K: Versioned + Replicas,
{
    let timeout = match op {
        Op::Create => d.timeouts().create,
        Op::Update => d.timeouts().update,
    };
    let policy = RetryPolicy::new(timeout);
    let progress = wait_for_replicas::<K, _>(api, name, &policy, &ctx.cancel, WaitMode::Converge)
        .await
        .map_err(Error::wait(op.verb(), noun))?;
    tracing::info!(name, kind = noun, replicas = progress.current, "rollout complete");
    Ok(())
}

/// Scale a workload to zero, wait for its pods to go away and delete it
pub(crate) async fn drain_and_delete<K>(
    api: &NegotiatedApi<K>,
    name: &str,
    noun: &'static str,
    ctx: &KubeContext,
    d: &ResourceData,
) -> Result<()>
where
    K: Versioned + Replicas,
{
    let ops = serde_json::from_value(json!([{ "op": "replace", "path": "/spec/replicas", "value": 0 }]))
        .map_err(|source| Error::Expand { noun, source })?;
    api.patch_json(name, ops).await.map_err(Error::kube("delete", noun))?;

    let policy = RetryPolicy::new(d.timeouts().delete);
    wait_for_replicas::<K, _>(api, name, &policy, &ctx.cancel, WaitMode::Drain)
        .await
        .map_err(Error::wait("delete", noun))?;

    api.delete(name, &DeleteParams::foreground())
        .await
        .map_err(Error::kube("delete", noun))
}

/// Whether terraform asked to wait for the rollout, defaults to yes
pub(crate) fn wants_rollout_wait(d: &ResourceData) -> bool {
    d.get("wait_for_rollout").and_then(Value::as_bool).unwrap_or(true)
}
