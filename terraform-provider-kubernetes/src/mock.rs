// ------------------------------------------------------------------------
// mock api server setup cruft for tests
// ------------------------------------------------------------------------
use http::{Method, Request, Response};
use http_body_util::BodyExt;
use kube::{client::Body, Client};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::provider::KubeContext;

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
pub(crate) struct ApiServerVerifier(ApiServerHandle);

pub(crate) fn testcontext() -> (Client, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    (mock_client, ApiServerVerifier(handle))
}

/// Uncached discovery, objects default to the `default` namespace
pub(crate) fn context(client: Client) -> KubeContext {
    KubeContext::new(client, None, "default", CancellationToken::new())
}

pub(crate) async fn timeout_after_1s<T>(handle: tokio::task::JoinHandle<T>) -> T {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

impl ApiServerVerifier {
    /// Answer every request through `route` until all clients are dropped
    ///
    /// The `JoinHandle` resolves to the `(method, path)` of every request seen, in order.
    pub(crate) fn serve<F>(mut self, mut route: F) -> tokio::task::JoinHandle<Vec<(Method, String)>>
    where
        F: FnMut(&Method, &str, Option<Value>) -> (u16, Value) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut seen = vec![];
            while let Some((request, send)) = self.0.next_request().await {
                let (parts, body) = request.into_parts();
                let bytes = body.collect().await.unwrap().to_bytes();
                let body = serde_json::from_slice::<Value>(&bytes).ok();
                let (status, reply) = route(&parts.method, parts.uri.path(), body);
                seen.push((parts.method.clone(), parts.uri.path().to_string()));
                send.send_response(
                    Response::builder()
                        .status(status)
                        .body(Body::from(serde_json::to_vec(&reply).unwrap()))
                        .unwrap(),
                );
            }
            seen
        })
    }
}

/// Answer discovery requests for a cluster serving `served` as `(group version, plurals)`
///
/// Returns `None` for anything that is not a discovery request.
pub(crate) fn discovery_reply(path: &str, served: &[(&str, &[&str])]) -> Option<(u16, Value)> {
    let segments = path.trim_start_matches('/').split('/').collect::<Vec<_>>();
    match segments.as_slice() {
        ["apis"] => {
            let gvs = served.iter().map(|(gv, _)| *gv).filter(|gv| gv.contains('/'));
            Some((200, api_group_list(gvs)))
        }
        ["api"] => {
            let versions = served.iter().map(|(gv, _)| *gv).filter(|gv| !gv.contains('/')).collect::<Vec<_>>();
            Some((
                200,
                json!({ "kind": "APIVersions", "versions": versions, "serverAddressByClientCIDRs": [] }),
            ))
        }
        ["apis", group, version] => {
            let gv = format!("{group}/{version}");
            Some(resource_reply(&gv, served))
        }
        ["api", version] => Some(resource_reply(version, served)),
        _ => None,
    }
}

fn resource_reply(gv: &str, served: &[(&str, &[&str])]) -> (u16, Value) {
    match served.iter().find(|(g, _)| *g == gv) {
        Some((_, plurals)) => (200, resource_list(gv, plurals)),
        None => (404, status(404, "the server could not find the requested resource")),
    }
}

fn api_group_list<'a>(group_versions: impl Iterator<Item = &'a str>) -> Value {
    let groups = group_versions
        .map(|gv| {
            let (name, version) = gv.split_once('/').unwrap();
            json!({
                "name": name,
                "versions": [{ "groupVersion": gv, "version": version }],
                "preferredVersion": { "groupVersion": gv, "version": version }
            })
        })
        .collect::<Vec<_>>();
    json!({ "kind": "APIGroupList", "apiVersion": "v1", "groups": groups })
}

fn resource_list(group_version: &str, plurals: &[&str]) -> Value {
    let resources = plurals
        .iter()
        .map(|name| json!({ "name": name, "singularName": "", "namespaced": true, "kind": "", "verbs": ["get"] }))
        .collect::<Vec<_>>();
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
}

pub(crate) fn status(code: u16, message: &str) -> Value {
    let (status, reason) = match code {
        200..=299 => ("Success", ""),
        404 => ("Failure", "NotFound"),
        409 => ("Failure", "Conflict"),
        _ => ("Failure", "InternalError"),
    };
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": status,
        "message": message,
        "reason": reason,
        "code": code
    })
}
