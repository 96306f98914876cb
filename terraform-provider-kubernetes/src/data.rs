//! Terraform-side view of a resource and the mapping to Kubernetes objects
//!
//! Terraform attributes are snake_case, Kubernetes fields are camelCase. [`expand`] and
//! [`flatten`] convert between the two by renaming keys, leaving free-form maps such as
//! labels untouched, and let serde do the rest.
use k8s_openapi::Resource;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    timeouts::Timeouts,
};

/// Maps whose keys are user data rather than field names
const VERBATIM: &[&str] = &[
    "annotations",
    "data",
    "labels",
    "limits",
    "match_labels",
    "node_selector",
    "open_api_v3_schema",
    "requests",
];

/// Field names that do not follow the mechanical case mapping
const IRREGULAR: &[(&str, &str)] = &[
    ("cluster_ip", "clusterIP"),
    ("cluster_ips", "clusterIPs"),
    ("external_ips", "externalIPs"),
    ("host_ip", "hostIP"),
    ("host_ipc", "hostIPC"),
    ("host_pid", "hostPID"),
    ("load_balancer_ip", "loadBalancerIP"),
    ("open_api_v3_schema", "openAPIV3Schema"),
    ("pod_ip", "podIP"),
    ("pod_ips", "podIPs"),
    ("volume_id", "volumeID"),
];

/// Metadata fields recorded in terraform state
const METADATA_FIELDS: &[&str] = &[
    "annotations",
    "generate_name",
    "generation",
    "labels",
    "name",
    "namespace",
    "resource_version",
    "uid",
];

/// Metadata fields owned by the api server, never sent back
const SERVER_METADATA: &[&str] = &[
    "creationTimestamp",
    "deletionGracePeriodSeconds",
    "deletionTimestamp",
    "generation",
    "managedFields",
    "resourceVersion",
    "selfLink",
    "uid",
];

pub(crate) fn snake_to_camel(key: &str) -> String {
    if let Some((_, camel)) = IRREGULAR.iter().find(|(snake, _)| *snake == key) {
        return camel.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn camel_to_snake(key: &str) -> String {
    if let Some((snake, _)) = IRREGULAR.iter().find(|(_, camel)| *camel == key) {
        return snake.to_string();
    }
    let chars = key.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Whether the value under a snake_case key is a free-form map
fn is_verbatim(snake_key: &str, value: &Value) -> bool {
    if VERBATIM.contains(&snake_key) {
        return true;
    }
    // label selectors are structured, plain selectors (services) are string maps
    if snake_key == "selector" {
        if let Value::Object(map) = value {
            let structured = ["match_labels", "match_expressions", "matchLabels", "matchExpressions"];
            return !map.keys().any(|k| structured.contains(&k.as_str()));
        }
    }
    false
}

fn rename_keys(value: Value, rename: &dyn Fn(&str) -> String, to_snake: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let renamed = rename(&k);
                let snake = if to_snake { renamed.clone() } else { k };
                let v = if is_verbatim(&snake, &v) {
                    v
                } else {
                    rename_keys(v, rename, to_snake)
                };
                out.insert(renamed, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(|v| rename_keys(v, rename, to_snake)).collect()),
        other => other,
    }
}

/// Rename top level blocks, e.g. terraform's singular `rule` to Kubernetes' `rules`
fn rename_blocks(value: &mut Value, renames: &[(&str, &str)], to_kube: bool) {
    if let Value::Object(map) = value {
        for (tf, kube) in renames {
            let (from, to) = if to_kube { (tf, kube) } else { (kube, tf) };
            if let Some(v) = map.remove(*from) {
                map.insert(to.to_string(), v);
            }
        }
    }
}

/// Build a Kubernetes object from terraform attributes
///
/// Server owned metadata such as `resource_version` is dropped so that the result can be
/// sent as a create or replace body.
pub fn expand<K>(attrs: &Map<String, Value>, renames: &[(&str, &str)], noun: &'static str) -> Result<K>
where
    K: Resource + DeserializeOwned,
{
    let mut value = rename_keys(Value::Object(attrs.clone()), &snake_to_camel, false);
    rename_blocks(&mut value, renames, true);
    if let Value::Object(map) = &mut value {
        map.insert("apiVersion".into(), K::API_VERSION.into());
        map.insert("kind".into(), K::KIND.into());
        if let Some(Value::Object(meta)) = map.get_mut("metadata") {
            for field in SERVER_METADATA {
                meta.remove(*field);
            }
        }
    }
    serde_json::from_value(value).map_err(|source| Error::Expand { noun, source })
}

/// Turn a Kubernetes object into terraform attributes
///
/// Status, type information and server side metadata other than the recorded fields are dropped.
pub fn flatten<K: Serialize>(obj: &K, renames: &[(&str, &str)], noun: &'static str) -> Result<Map<String, Value>> {
    let mut value = serde_json::to_value(obj).map_err(|source| Error::Flatten { noun, source })?;
    if let Value::Object(map) = &mut value {
        map.remove("apiVersion");
        map.remove("kind");
        map.remove("status");
    }
    rename_blocks(&mut value, renames, false);
    let mut value = rename_keys(value, &camel_to_snake, true);
    if let Some(Value::Object(meta)) = value.get_mut("metadata") {
        meta.retain(|k, _| METADATA_FIELDS.contains(&k.as_str()));
    }
    match value {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Attributes, identity and budgets of one resource during one operation
#[derive(Clone, Debug, Default)]
pub struct ResourceData {
    id: Option<String>,
    attrs: Map<String, Value>,
    prior: Option<Map<String, Value>>,
    timeouts: Timeouts,
}

impl ResourceData {
    /// Data for a resource with planned attributes `attrs`
    pub fn new(attrs: Map<String, Value>) -> Self {
        Self {
            attrs,
            ..Self::default()
        }
    }

    /// Set the id of an existing resource
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Record the previous state, used by [`ResourceData::has_change`]
    #[must_use]
    pub fn with_prior(mut self, prior: Map<String, Value>) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Use specific time budgets
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn set_attrs(&mut self, attrs: Map<String, Value>) {
        self.attrs = attrs;
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Look up a dotted attribute path such as `metadata.name`
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.attrs, path)
    }

    /// A string attribute, empty strings count as unset
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Whether an attribute differs from the prior state
    ///
    /// Without prior state everything counts as changed.
    pub fn has_change(&self, path: &str) -> bool {
        match &self.prior {
            Some(prior) => lookup(prior, path) != lookup(&self.attrs, path),
            None => true,
        }
    }
}

fn lookup<'a>(attrs: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = attrs.get(parts.next()?)?;
    parts.try_fold(first, |v, key| v.get(key))
}
