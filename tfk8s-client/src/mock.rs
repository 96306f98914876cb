// ------------------------------------------------------------------------
// mock api server setup cruft for tests
// ------------------------------------------------------------------------
use http::{Method, Request, Response};
use http_body_util::BodyExt;
use kube::{client::Body, Client};
use serde_json::{json, Value};

// We wrap tower_test::mock::Handle
type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
pub(crate) struct ApiServerVerifier(ApiServerHandle);

pub(crate) fn testcontext() -> (Client, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    (mock_client, ApiServerVerifier(handle))
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
    /// `route` gets the method, path and decoded json body of each request and returns a status code
    /// and json body. The `JoinHandle` resolves to the `(method, path)` of every request seen, in order.
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

pub(crate) fn api_group_list(group_versions: &[&str]) -> Value {
    let groups = group_versions
        .iter()
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

pub(crate) fn resource_list(group_version: &str, plurals: &[&str]) -> Value {
    let resources = plurals
        .iter()
        .map(|name| {
            json!({ "name": name, "singularName": "", "namespaced": true, "kind": "", "verbs": ["get"] })
        })
        .collect::<Vec<_>>();
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
}

pub(crate) fn status(code: u16, message: &str) -> Value {
    let reason = match code {
        404 => "NotFound",
        409 => "Conflict",
        _ => "InternalError",
    };
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
}
