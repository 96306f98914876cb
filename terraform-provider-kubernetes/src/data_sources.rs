//! Read-only lookups of existing objects
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::{
    api::{apps::v1::Deployment, core::v1::Service},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
    Metadata,
};
use tfk8s_client::{NegotiatedApi, Versioned};
use tfk8s_core::{ApiGroup, ObjectId};

use crate::{
    data::{self, ResourceData},
    error::{Error, Result},
    provider::KubeContext,
    resources::{DeploymentKind, Kind},
    schema::DataSourceSchema,
};

/// A terraform data source as seen by the provider
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> DataSourceSchema;
    /// Look up the object named by `metadata.name` and `metadata.namespace`
    async fn read(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()>;
}

/// Data source for any namespaced kind
pub struct ObjectDataSource<K> {
    type_name: &'static str,
    noun: &'static str,
    candidates: &'static [ApiGroup],
    kind: PhantomData<fn() -> K>,
}

impl<K> ObjectDataSource<K> {
    pub const fn new(type_name: &'static str, noun: &'static str, candidates: &'static [ApiGroup]) -> Self {
        Self {
            type_name,
            noun,
            candidates,
            kind: PhantomData,
        }
    }
}

/// `data "kubernetes_deployment"`
pub fn deployment() -> ObjectDataSource<Deployment> {
    ObjectDataSource::new("kubernetes_deployment", "deployment", DeploymentKind::CANDIDATES)
}

/// `data "kubernetes_service"`
pub fn service() -> ObjectDataSource<Service> {
    ObjectDataSource::new("kubernetes_service", "service", &[ApiGroup::CoreV1])
}

#[async_trait]
impl<K> DataSource for ObjectDataSource<K>
where
    K: Versioned + Metadata<Ty = ObjectMeta>,
{
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> DataSourceSchema {
        DataSourceSchema {
            api_groups: self.candidates.iter().map(ToString::to_string).collect(),
        }
    }

    async fn read(&self, ctx: &KubeContext, d: &mut ResourceData) -> Result<()> {
        let name = d
            .get_str("metadata.name")
            .ok_or_else(|| Error::InvalidConfig(format!("{} requires metadata.name", self.type_name)))?
            .to_string();
        let namespace = d.get_str("metadata.namespace").unwrap_or(&ctx.namespace).to_string();
        let id = ObjectId::namespaced(&namespace, &name);
        tracing::info!(%id, kind = self.noun, "reading object");

        let api = NegotiatedApi::<K>::negotiate(ctx.client.clone(), ctx.discovery.as_ref(), self.candidates, Some(&namespace))
            .await
            .map_err(Error::kube("read", self.noun))?;
        let obj = api.get(&name).await.map_err(Error::kube("read", self.noun))?;
        d.set_attrs(data::flatten(&obj, &[], self.noun)?);
        d.set_id(id.to_string());
        Ok(())
    }
}
