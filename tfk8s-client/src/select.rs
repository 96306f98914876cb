//! Picking the group version to talk to for a resource kind
use std::cmp::Reverse;

use tfk8s_core::{ApiGroup, ResourceKind};

use crate::{
    discovery::ServerResources,
    error::{Error, Result},
};

/// Which end of the preference order to pick from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preference {
    /// The most preferred served group version
    Highest,
    /// The least preferred served group version
    Lowest,
}

/// The most preferred candidate that serves `kind`, if any
///
/// Issues one discovery query covering the candidates. Discovery failures are returned as is;
/// `Ok(None)` means discovery succeeded and no candidate serves the kind.
pub async fn select_highest<D>(discovery: &D, kind: &ResourceKind, candidates: &[ApiGroup]) -> Result<Option<ApiGroup>>
where
    D: ServerResources + ?Sized,
{
    select(discovery, kind, candidates, Preference::Highest).await
}

/// The least preferred candidate that serves `kind`, if any
///
/// Same contract as [`select_highest`].
pub async fn select_lowest<D>(discovery: &D, kind: &ResourceKind, candidates: &[ApiGroup]) -> Result<Option<ApiGroup>>
where
    D: ServerResources + ?Sized,
{
    select(discovery, kind, candidates, Preference::Lowest).await
}

/// Select a served candidate for `kind` at either end of the preference order
///
/// Candidates are scanned in rank order from the requested end and the first served one wins,
/// so the order of `candidates` itself does not matter.
pub async fn select<D>(
    discovery: &D,
    kind: &ResourceKind,
    candidates: &[ApiGroup],
    preference: Preference,
) -> Result<Option<ApiGroup>>
where
    D: ServerResources + ?Sized,
{
    if kind.as_str().is_empty() {
        return Err(Error::InvalidCandidates("empty resource kind".into()));
    }
    if candidates.is_empty() {
        return Err(Error::InvalidCandidates(format!("no candidate groups for {kind}")));
    }
    let served = discovery.supported_versions(candidates).await?;

    let mut ordered = candidates.to_vec();
    match preference {
        Preference::Highest => ordered.sort_by_key(|g| Reverse(g.rank())),
        Preference::Lowest => ordered.sort_by_key(|g| g.rank()),
    }
    let chosen = ordered.into_iter().find(|g| served.serves(*g, kind));
    tracing::debug!(%kind, ?preference, chosen = ?chosen.map(|g| g.to_string()), "selected api group");
    Ok(chosen)
}

/// The most preferred candidate that serves `kind`, or [`Error::NotSupported`]
pub async fn negotiate<D>(discovery: &D, kind: &ResourceKind, candidates: &[ApiGroup]) -> Result<ApiGroup>
where
    D: ServerResources + ?Sized,
{
    select_highest(discovery, kind, candidates)
        .await?
        .ok_or_else(|| Error::not_supported(kind, candidates))
}
