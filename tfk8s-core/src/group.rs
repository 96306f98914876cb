//! Versioned API groups that a provider resource can be served from.
use std::{cmp::Ordering, fmt, str::FromStr};

use kube_core::{GroupVersion, Version};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown api group version: {0}")]
/// The group version is not one the provider negotiates over.
pub struct ParseApiGroupError(pub String);

/// A versioned API group, e.g. `apps/v1beta2`
///
/// Only the group versions that the provider knows how to talk to are represented.
/// The canonical (stable) group of every kind is listed alongside the legacy groups it replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiGroup {
    /// `apps/v1`
    AppsV1,
    /// `apps/v1beta2`
    AppsV1beta2,
    /// `apps/v1beta1`
    AppsV1beta1,
    /// `extensions/v1beta1`
    ExtensionsV1beta1,
    /// `batch/v1`
    BatchV1,
    /// `batch/v1beta1`
    BatchV1beta1,
    /// `batch/v2alpha1`
    BatchV2alpha1,
    /// `rbac.authorization.k8s.io/v1`
    RbacV1,
    /// `rbac.authorization.k8s.io/v1beta1`
    RbacV1beta1,
    /// `scheduling.k8s.io/v1`
    SchedulingV1,
    /// `scheduling.k8s.io/v1beta1`
    SchedulingV1beta1,
    /// `scheduling.k8s.io/v1alpha1`
    SchedulingV1alpha1,
    /// `apiextensions.k8s.io/v1`
    ApiextensionsV1,
    /// `apiextensions.k8s.io/v1beta1`
    ApiextensionsV1beta1,
    /// The core group, `v1`
    CoreV1,
}

impl ApiGroup {
    /// Every group version the provider negotiates over
    pub const ALL: &'static [ApiGroup] = &[
        ApiGroup::AppsV1,
        ApiGroup::AppsV1beta2,
        ApiGroup::AppsV1beta1,
        ApiGroup::ExtensionsV1beta1,
        ApiGroup::BatchV1,
        ApiGroup::BatchV1beta1,
        ApiGroup::BatchV2alpha1,
        ApiGroup::RbacV1,
        ApiGroup::RbacV1beta1,
        ApiGroup::SchedulingV1,
        ApiGroup::SchedulingV1beta1,
        ApiGroup::SchedulingV1alpha1,
        ApiGroup::ApiextensionsV1,
        ApiGroup::ApiextensionsV1beta1,
        ApiGroup::CoreV1,
    ];

    /// The API group name (empty for the core group)
    pub fn group(self) -> &'static str {
        match self {
            ApiGroup::AppsV1 | ApiGroup::AppsV1beta2 | ApiGroup::AppsV1beta1 => "apps",
            ApiGroup::ExtensionsV1beta1 => "extensions",
            ApiGroup::BatchV1 | ApiGroup::BatchV1beta1 | ApiGroup::BatchV2alpha1 => "batch",
            ApiGroup::RbacV1 | ApiGroup::RbacV1beta1 => "rbac.authorization.k8s.io",
            ApiGroup::SchedulingV1 | ApiGroup::SchedulingV1beta1 | ApiGroup::SchedulingV1alpha1 => {
                "scheduling.k8s.io"
            }
            ApiGroup::ApiextensionsV1 | ApiGroup::ApiextensionsV1beta1 => "apiextensions.k8s.io",
            ApiGroup::CoreV1 => "",
        }
    }

    /// The version within the group
    pub fn version(self) -> &'static str {
        match self {
            ApiGroup::AppsV1
            | ApiGroup::BatchV1
            | ApiGroup::RbacV1
            | ApiGroup::SchedulingV1
            | ApiGroup::ApiextensionsV1
            | ApiGroup::CoreV1 => "v1",
            ApiGroup::AppsV1beta2 => "v1beta2",
            ApiGroup::AppsV1beta1
            | ApiGroup::ExtensionsV1beta1
            | ApiGroup::BatchV1beta1
            | ApiGroup::RbacV1beta1
            | ApiGroup::SchedulingV1beta1
            | ApiGroup::ApiextensionsV1beta1 => "v1beta1",
            ApiGroup::BatchV2alpha1 => "v2alpha1",
            ApiGroup::SchedulingV1alpha1 => "v1alpha1",
        }
    }

    /// Whether this is the core (legacy, un-named) group
    pub fn is_core(self) -> bool {
        self.group().is_empty()
    }

    /// The `apiVersion` string objects of this group carry
    pub fn api_version(self) -> String {
        if self.is_core() {
            self.version().to_string()
        } else {
            format!("{}/{}", self.group(), self.version())
        }
    }

    /// The group version as a kube [`GroupVersion`]
    pub fn group_version(self) -> GroupVersion {
        GroupVersion::gv(self.group(), self.version())
    }

    /// Preference rank of this group version
    ///
    /// Stable versions outrank beta versions, which outrank alpha versions,
    /// and higher numbered versions outrank lower ones within a stability level.
    /// The `extensions` group has been superseded wholesale and ranks below every other group.
    pub fn rank(self) -> Rank {
        Rank {
            current: self.group() != "extensions",
            version: Version::parse(self.version()),
        }
    }
}

/// Total order over group versions of one resource kind; greater is more preferred
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rank {
    current: bool,
    version: Version,
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.current
            .cmp(&other.current)
            .then_with(|| self.version.priority().cmp(&other.version.priority()))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ApiGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_version())
    }
}

impl FromStr for ApiGroup {
    type Err = ParseApiGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApiGroup::ALL
            .iter()
            .copied()
            .find(|g| g.api_version() == s)
            .ok_or_else(|| ParseApiGroupError(s.into()))
    }
}
