//! Snapshot of which group versions serve which resource kinds.
use std::collections::{BTreeSet, HashMap};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;

use crate::{group::ApiGroup, resource::ResourceKind};

/// The resource kinds served by a set of queried group versions
///
/// A snapshot only covers the group versions that were asked about.
/// A group version that was queried but is not advertised by the api server serves nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SupportedVersionSet {
    served: HashMap<ApiGroup, BTreeSet<ResourceKind>>,
}

impl SupportedVersionSet {
    /// An empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record kinds served by `group`
    ///
    /// Subresources such as `deployments/status` are skipped.
    pub fn insert<I>(&mut self, group: ApiGroup, kinds: I)
    where
        I: IntoIterator<Item = ResourceKind>,
    {
        let entry = self.served.entry(group).or_default();
        entry.extend(kinds.into_iter().filter(|k| !k.is_subresource()));
    }

    /// Record the kinds of a discovery resource listing for `group`
    pub fn insert_list(&mut self, group: ApiGroup, list: &APIResourceList) {
        self.insert(group, list.resources.iter().map(|r| ResourceKind::from(r.name.as_str())));
    }

    /// Record that `group` was queried but is not served by the api server
    pub fn insert_unserved(&mut self, group: ApiGroup) {
        self.served.entry(group).or_default();
    }

    /// Whether `group` serves `kind`
    pub fn serves(&self, group: ApiGroup, kind: &ResourceKind) -> bool {
        self.served.get(&group).is_some_and(|kinds| kinds.contains(kind))
    }

    /// Whether `group` was covered by this snapshot
    pub fn contains(&self, group: ApiGroup) -> bool {
        self.served.contains_key(&group)
    }

    /// The kinds served by `group`, if it was covered
    pub fn kinds(&self, group: ApiGroup) -> Option<&BTreeSet<ResourceKind>> {
        self.served.get(&group)
    }

    /// Group versions in the snapshot that serve `kind`
    pub fn groups_serving<'a>(&'a self, kind: &'a ResourceKind) -> impl Iterator<Item = ApiGroup> + 'a {
        self.served
            .iter()
            .filter(move |(_, kinds)| kinds.contains(kind))
            .map(|(g, _)| *g)
    }

    /// Number of group versions covered
    pub fn len(&self) -> usize {
        self.served.len()
    }

    /// Whether no group version is covered
    pub fn is_empty(&self) -> bool {
        self.served.is_empty()
    }

    /// Fold another snapshot into this one, replacing overlapping group versions
    pub fn merge(&mut self, other: SupportedVersionSet) {
        self.served.extend(other.served);
    }
}
