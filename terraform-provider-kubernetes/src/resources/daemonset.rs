use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::api::DeleteParams;
use tfk8s_client::NegotiatedApi;
use tfk8s_core::ApiGroup;

use super::{wait_for_rollout, Kind, Op};
use crate::{
    data::ResourceData,
    error::{Error, Result},
    migrate::{self, InstanceState},
    provider::KubeContext,
};

/// `kubernetes_daemonset`
pub struct DaemonSetKind;

#[async_trait]
impl Kind for DaemonSetKind {
    type Object = DaemonSet;

    const CANDIDATES: &'static [ApiGroup] =
        &[ApiGroup::AppsV1, ApiGroup::AppsV1beta2, ApiGroup::ExtensionsV1beta1];
    const NOUN: &'static str = "daemonset";
    const SCHEMA_VERSION: u32 = 1;
    const TYPE_NAME: &'static str = "kubernetes_daemonset";

    // scheduling a new daemonset depends on the nodes, only rollouts of changes are awaited
    async fn converge(
        &self,
        api: &NegotiatedApi<DaemonSet>,
        name: &str,
        op: Op,
        ctx: &KubeContext,
        d: &ResourceData,
    ) -> Result<()> {
        match op {
            Op::Create => Ok(()),
            Op::Update => wait_for_rollout(api, name, Self::NOUN, op, ctx, d).await,
        }
    }

    async fn delete(
        &self,
        api: &NegotiatedApi<DaemonSet>,
        name: &str,
        _ctx: &KubeContext,
        _d: &ResourceData,
    ) -> Result<()> {
        api.delete(name, &DeleteParams::foreground())
            .await
            .map_err(Error::kube("delete", Self::NOUN))
    }

    fn upgrade_state(&self, version: u32, state: InstanceState) -> Result<InstanceState> {
        migrate::migrate_pod_template(version, state)
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_include;
    use http::Method;
    use serde_json::{json, Value};

    use super::DaemonSetKind;
    use crate::{
        data::ResourceData,
        mock::{context, discovery_reply, testcontext, timeout_after_1s},
        resources::{ObjectResource, Resource},
    };

    const SERVED: &[(&str, &[&str])] = &[
        ("apps/v1beta2", &["daemonsets", "deployments"]),
        ("extensions/v1beta1", &["daemonsets", "deployments"]),
    ];

    fn served(desired: i32, current: i32) -> Value {
        json!({
            "apiVersion": "apps/v1beta2",
            "kind": "DaemonSet",
            "metadata": { "name": "fluentd", "namespace": "logging" },
            "spec": {
                "selector": { "matchLabels": { "app": "fluentd" } },
                "template": { "metadata": { "labels": { "app": "fluentd" } } }
            },
            "status": {
                "currentNumberScheduled": current,
                "desiredNumberScheduled": desired,
                "numberMisscheduled": 0,
                "numberReady": current
            }
        })
    }

    fn planned() -> ResourceData {
        let Value::Object(attrs) = json!({
            "metadata": { "name": "fluentd", "namespace": "logging" },
            "spec": {
                "selector": { "match_labels": { "app": "fluentd" } },
                "template": { "metadata": { "labels": { "app": "fluentd" } } }
            }
        }) else {
            unreachable!()
        };
        ResourceData::new(attrs)
    }

    #[tokio::test]
    async fn create_does_not_wait_but_update_does() {
        let (client, fakeserver) = testcontext();
        let mocksrv = fakeserver.serve(|method, path, body| {
            if let Some(reply) = discovery_reply(path, SERVED) {
                return reply;
            }
            match (method.clone(), path) {
                (Method::POST, "/apis/apps/v1beta2/namespaces/logging/daemonsets") => (201, served(3, 0)),
                (Method::PUT, "/apis/apps/v1beta2/namespaces/logging/daemonsets/fluentd") => {
                    let body = body.unwrap();
                    assert_json_include!(actual: body, expected: json!({
                        "apiVersion": "apps/v1beta2",
                        "metadata": { "name": "fluentd", "namespace": "logging" }
                    }));
                    (200, served(3, 1))
                }
                (Method::GET, "/apis/apps/v1beta2/namespaces/logging/daemonsets/fluentd") => (200, served(3, 3)),
                (m, p) => panic!("unexpected {m} {p}"),
            }
        });

        let ctx = context(client);
        let resource = ObjectResource::new(DaemonSetKind);
        let mut d = planned();
        resource.create(&ctx, &mut d).await.unwrap();
        assert_eq!(d.id(), Some("logging/fluentd"));
        let mut d = planned().with_id("logging/fluentd");
        resource.update(&ctx, &mut d).await.unwrap();
        drop(ctx);

        let calls = timeout_after_1s(mocksrv).await;
        let methods = calls
            .into_iter()
            .filter(|(_, p)| p.contains("/namespaces/"))
            .map(|(m, _)| m)
            .collect::<Vec<_>>();
        // create + refresh, then replace + convergence poll + refresh
        assert_eq!(methods, vec![
            Method::POST,
            Method::GET,
            Method::PUT,
            Method::GET,
            Method::GET
        ]);
    }
}
