//! Upgrades of flatmap state written by older schema versions
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// State as stored by terraform: an id and flattened `a.0.b` style attributes
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstanceState {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl InstanceState {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.attributes.is_empty()
    }
}

const TEMPLATE: &str = "spec.0.template.0";

/// Move pod spec attributes from `spec.0.template.0.*` to `spec.0.template.0.spec.0.*`
fn relocate_pod_template(state: &mut InstanceState) {
    let moved = state
        .attributes
        .keys()
        .filter(|k| {
            k.starts_with("spec.0.template")
                && !k.starts_with("spec.0.template.0.spec")
                && !k.starts_with("spec.0.template.0.metadata")
        })
        .cloned()
        .collect::<Vec<_>>();
    for key in moved {
        if let Some(value) = state.attributes.remove(&key) {
            let new_key = key.replacen(TEMPLATE, "spec.0.template.0.spec.0", 1);
            state.attributes.insert(new_key, value);
        }
    }
}

fn deployment_v0_to_v1(state: &mut InstanceState) {
    tracing::debug!(id = %state.id, "migrating deployment state from v0 to v1");
    // an existing metadata.0.name is left alone, together with the old key
    if !state.attributes.contains_key("metadata.0.name") {
        if let Some(name) = state.attributes.remove("name") {
            state.attributes.insert("metadata.0.name".into(), name);
        }
    }
    relocate_pod_template(state);
}

fn deployment_v1_to_v2(state: &mut InstanceState) {
    tracing::debug!(id = %state.id, "migrating deployment state from v1 to v2");
    state.attributes.insert("spec.0.paused".into(), "false".into());
    state
        .attributes
        .insert("spec.0.progress_deadline_seconds".into(), "600".into());
}

/// Upgrade deployment state from `version` to the current schema version
pub fn migrate_deployment(version: u32, mut state: InstanceState) -> Result<InstanceState> {
    if state.is_empty() {
        return Ok(state);
    }
    match version {
        0 => {
            deployment_v0_to_v1(&mut state);
            deployment_v1_to_v2(&mut state);
        }
        1 => deployment_v1_to_v2(&mut state),
        2 => {}
        _ => return Err(Error::UnexpectedSchemaVersion(version)),
    }
    Ok(state)
}

/// Upgrade daemonset or stateful set state from `version` to schema version 1
pub fn migrate_pod_template(version: u32, mut state: InstanceState) -> Result<InstanceState> {
    if state.is_empty() {
        return Ok(state);
    }
    match version {
        0 => {
            tracing::debug!(id = %state.id, "relocating pod template state");
            relocate_pod_template(&mut state);
        }
        1 => {}
        _ => return Err(Error::UnexpectedSchemaVersion(version)),
    }
    Ok(state)
}

/// For kinds that never changed their schema
pub fn migrate_none(version: u32, state: InstanceState) -> Result<InstanceState> {
    match version {
        0 => Ok(state),
        _ => Err(Error::UnexpectedSchemaVersion(version)),
    }
}
