//! Terraform provider for Kubernetes that negotiates api group versions
//!
//! Every resource is described by the canonical (stable) Kubernetes type of its kind. Before each
//! operation the provider asks the cluster which of the group versions that ever served the kind
//! are available, picks the most preferred one and converts objects to and from it. The same
//! configuration therefore works against clusters that only serve legacy groups such as
//! `extensions/v1beta1`.
//!
//! The [`Provider`] holds the table of resources and data sources; [`rpc::serve`] exposes it to a
//! plugin host over line delimited json.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub use config::ProviderConfig;

pub mod data;
pub use data::ResourceData;

pub mod data_sources;
pub mod error;
pub use error::{Error, Result};

pub mod migrate;
pub mod provider;
pub use provider::{KubeContext, Provider};

pub mod resources;
pub mod rpc;
pub mod schema;
pub mod timeouts;

#[cfg(test)] mod mock;
