//! Error handling in [`tfk8s_client`][crate]
use tfk8s_core::{ApiGroup, ConversionError, ResourceKind};
use thiserror::Error;

/// Message the api server answers with when the endpoint itself does not exist
///
/// A 404 carrying this message means the group version is not served,
/// rather than the object being absent.
pub const MISSING_ENDPOINT_MESSAGE: &str = "the server could not find the requested resource";

/// Possible errors when negotiating and talking to a versioned api
#[derive(Error, Debug)]
pub enum Error {
    /// None of the candidate group versions serve the resource kind
    #[error("could not find Kubernetes API group that supports {kind} resources (tried {})", list(.candidates))]
    NotSupported {
        /// The kind that was negotiated for
        kind: String,
        /// The group versions that were tried
        candidates: Vec<ApiGroup>,
    },

    /// Querying the api server for served resources failed
    #[error("discovery failed: {0}")]
    Discovery(#[source] DiscoveryError),

    /// An object could not be moved between the canonical and negotiated schemas
    #[error("conversion failed: {0}")]
    Conversion(#[source] ConversionError),

    /// The api server rejected or failed a request
    #[error("{0}")]
    Api(#[source] kube::Error),

    /// The negotiation input was malformed
    #[error("invalid negotiation input: {0}")]
    InvalidCandidates(String),
}

fn list(groups: &[ApiGroup]) -> String {
    groups.iter().map(ApiGroup::to_string).collect::<Vec<_>>().join(", ")
}

impl Error {
    /// Whether the api server reported the object as absent
    ///
    /// A 404 for a group version that is not served at all does not count.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Api(kube::Error::Api(resp)) => resp.code == 404 && resp.message != MISSING_ENDPOINT_MESSAGE,
            _ => false,
        }
    }

    /// Whether the api server answered with `409 Conflict`
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api(kube::Error::Api(resp)) if resp.code == 409)
    }

    pub(crate) fn not_supported(kind: &ResourceKind, candidates: &[ApiGroup]) -> Self {
        Error::NotSupported {
            kind: kind.to_string(),
            candidates: candidates.to_vec(),
        }
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Error::Discovery(e)
    }
}

impl From<ConversionError> for Error {
    fn from(e: ConversionError) -> Self {
        Error::Conversion(e)
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::Api(e)
    }
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when discovering served resources
pub enum DiscoveryError {
    #[error("failed to list served api groups: {0}")]
    ListGroups(#[source] kube::Error),
    #[error("failed to list resources of {group}: {source}")]
    ListResources {
        group: ApiGroup,
        #[source]
        source: kube::Error,
    },
}

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{Error, MISSING_ENDPOINT_MESSAGE};
    use kube::core::ErrorResponse;
    use tfk8s_core::{ApiGroup, ResourceKind};

    fn api_error(code: u16, message: &str) -> Error {
        Error::Api(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: message.into(),
            reason: "NotFound".into(),
            code,
        }))
    }

    #[test]
    fn not_found_excludes_missing_endpoints() {
        assert!(api_error(404, "deployments.apps \"web\" not found").is_not_found());
        assert!(!api_error(404, MISSING_ENDPOINT_MESSAGE).is_not_found());
        assert!(!api_error(500, "boom").is_not_found());
        assert!(api_error(409, "conflict").is_conflict());
    }

    #[test]
    fn not_supported_message() {
        let err = Error::not_supported(&ResourceKind::from_static("daemonsets"), &[
            ApiGroup::AppsV1,
            ApiGroup::ExtensionsV1beta1,
        ]);
        assert_eq!(
            err.to_string(),
            "could not find Kubernetes API group that supports daemonsets resources (tried apps/v1, extensions/v1beta1)"
        );
    }
}
