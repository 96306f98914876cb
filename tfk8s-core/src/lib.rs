//! Client-less types for negotiating Kubernetes API group versions
//!
//! This crate models the versioned API groups a resource can be served from,
//! snapshots of what an api server serves, and the structural conversion used to move
//! an object between the schemas of two group versions.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod convert;
pub use convert::{convert, ConversionError};

pub mod discovery;
pub use discovery::SupportedVersionSet;

pub mod group;
pub use group::{ApiGroup, ParseApiGroupError, Rank};

pub mod id;
pub use id::{ObjectId, ParseObjectIdError, DEFAULT_NAMESPACE};

mod resource;
pub use resource::{ResourceKind, ResourceKindExt};
