//! Description of what the provider offers, as returned by `get_schema`
use std::collections::BTreeMap;

use serde::Serialize;

use crate::timeouts::TimeoutsConfig;

/// Attributes accepted by the provider block
pub const PROVIDER_ATTRIBUTES: &[&str] = &[
    "config_context",
    "config_context_auth_info",
    "config_context_cluster",
    "config_path",
    "discovery_cache_ttl",
    "host",
    "insecure",
    "namespace",
];

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResourceSchema {
    pub schema_version: u32,
    pub importable: bool,
    /// Group versions the resource negotiates over, most preferred first
    pub api_groups: Vec<String>,
    pub namespaced: bool,
    pub timeouts: TimeoutsConfig,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DataSourceSchema {
    pub api_groups: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ProviderSchema {
    pub provider: Vec<&'static str>,
    pub resources: BTreeMap<&'static str, ResourceSchema>,
    pub data_sources: BTreeMap<&'static str, DataSourceSchema>,
}
