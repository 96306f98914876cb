//! Version negotiating Kubernetes client
//!
//! Kinds such as `Deployment` or `CronJob` have been served from several group versions over the
//! lifetime of Kubernetes. This crate finds out which group versions a cluster serves, picks the
//! best one for a kind, and lets callers keep working with the canonical typed object regardless.
//!
//! ```no_run
//! use k8s_openapi::api::apps::v1::Deployment;
//! use kube::Client;
//! use tfk8s_client::{discovery::ClusterDiscovery, NegotiatedApi};
//! use tfk8s_core::ApiGroup;
//!
//! # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::try_default().await?;
//! let discovery = ClusterDiscovery::new(client.clone());
//! let candidates = [ApiGroup::AppsV1, ApiGroup::AppsV1beta2, ApiGroup::ExtensionsV1beta1];
//! let deploys = NegotiatedApi::<Deployment>::negotiate(client, &discovery, &candidates, Some("default")).await?;
//! let web = deploys.get("web").await?;
//! println!("{} served from {}", web.metadata.name.unwrap_or_default(), deploys.group());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod discovery;
pub use discovery::{CachedDiscovery, ClusterDiscovery, ServerResources};

pub mod error;
pub use error::{DiscoveryError, Error, Result};

pub mod negotiated;
pub use negotiated::{NegotiatedApi, Versioned};

pub mod select;
pub use select::{negotiate, select_highest, select_lowest, Preference};

#[cfg(test)] mod mock;
