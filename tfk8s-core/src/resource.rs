use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

/// Plural REST name of a resource type, e.g. `deployments`
///
/// This is the name discovery reports a group version as serving,
/// and the path segment used when talking to the resource collection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(Cow<'static, str>);

impl ResourceKind {
    /// A kind from a static plural name
    pub const fn from_static(plural: &'static str) -> Self {
        Self(Cow::Borrowed(plural))
    }

    /// The plural name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names a subresource such as `deployments/scale`
    pub fn is_subresource(&self) -> bool {
        self.0.contains('/')
    }
}

impl From<String> for ResourceKind {
    fn from(plural: String) -> Self {
        Self(Cow::Owned(plural))
    }
}

impl From<&str> for ResourceKind {
    fn from(plural: &str) -> Self {
        Self(Cow::Owned(plural.to_string()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exposes the [`ResourceKind`] of a typed k8s-openapi resource
pub trait ResourceKindExt {
    /// The plural REST name of the type
    fn resource_kind() -> ResourceKind;
}

impl<K: k8s_openapi::Resource> ResourceKindExt for K {
    fn resource_kind() -> ResourceKind {
        ResourceKind::from_static(K::URL_PATH_SEGMENT)
    }
}
