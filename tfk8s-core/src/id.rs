//! Terraform resource ids for Kubernetes objects.
use std::{fmt, str::FromStr};

use thiserror::Error;

/// Namespace used when a namespaced object does not specify one
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unexpected ID format ({0:?}), expected namespace/name")]
/// An id that is neither `name` nor `namespace/name`.
pub struct ParseObjectIdError(pub String);

/// Identity of a Kubernetes object as recorded in terraform state
///
/// Namespaced objects use `namespace/name`, cluster scoped objects just `name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    /// Namespace, absent for cluster scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ObjectId {
    /// Id of a namespaced object
    pub fn namespaced(namespace: &str, name: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    /// Id of a cluster scoped object
    pub fn cluster(name: &str) -> Self {
        Self {
            namespace: None,
            name: name.to_string(),
        }
    }

    /// Parse an id of a namespaced object
    ///
    /// A bare `name` refers to the [`DEFAULT_NAMESPACE`].
    pub fn parse_namespaced(id: &str) -> Result<Self, ParseObjectIdError> {
        let parsed: ObjectId = id.parse()?;
        Ok(Self {
            namespace: parsed.namespace.or_else(|| Some(DEFAULT_NAMESPACE.to_string())),
            ..parsed
        })
    }

    /// The namespace, or the [`DEFAULT_NAMESPACE`]
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let parts = id.split('/').collect::<Vec<_>>();
        match *parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::cluster(name)),
            [ns, name] if !ns.is_empty() && !name.is_empty() => Ok(Self::namespaced(ns, name)),
            _ => Err(ParseObjectIdError(id.into())),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
