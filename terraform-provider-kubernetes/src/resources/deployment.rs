use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use tfk8s_client::NegotiatedApi;
use tfk8s_core::ApiGroup;

use super::{drain_and_delete, wait_for_rollout, wants_rollout_wait, Kind, Op, UpdateStrategy};
use crate::{
    data::ResourceData,
    error::Result,
    migrate::{self, InstanceState},
    provider::KubeContext,
};

/// `kubernetes_deployment`
pub struct DeploymentKind;

#[async_trait]
impl Kind for DeploymentKind {
    type Object = Deployment;

    const CANDIDATES: &'static [ApiGroup] = &[
        ApiGroup::AppsV1,
        ApiGroup::AppsV1beta2,
        ApiGroup::AppsV1beta1,
        ApiGroup::ExtensionsV1beta1,
    ];
    const NOUN: &'static str = "deployment";
    const SCHEMA_VERSION: u32 = 2;
    const TYPE_NAME: &'static str = "kubernetes_deployment";
    const UPDATE: UpdateStrategy = UpdateStrategy::JsonPatch;

    async fn converge(
        &self,
        api: &NegotiatedApi<Deployment>,
        name: &str,
        op: Op,
        ctx: &KubeContext,
        d: &ResourceData,
    ) -> Result<()> {
        if !wants_rollout_wait(d) {
            return Ok(());
        }
        wait_for_rollout(api, name, Self::NOUN, op, ctx, d).await
    }

    async fn delete(
        &self,
        api: &NegotiatedApi<Deployment>,
        name: &str,
        ctx: &KubeContext,
        d: &ResourceData,
    ) -> Result<()> {
        drain_and_delete(api, name, Self::NOUN, ctx, d).await
    }

    fn upgrade_state(&self, version: u32, state: InstanceState) -> Result<InstanceState> {
        migrate::migrate_deployment(version, state)
    }
}
