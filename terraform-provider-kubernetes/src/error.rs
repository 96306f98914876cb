use thiserror::Error;

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors from provider operations
pub enum Error {
    #[error("Failed to {op} {noun}: {source}")]
    Kube {
        op: &'static str,
        noun: &'static str,
        #[source]
        source: tfk8s_client::Error,
    },

    #[error("Failed to {op} {noun}: {source}")]
    Wait {
        op: &'static str,
        noun: &'static str,
        #[source]
        source: tfk8s_runtime::wait::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid configuration for {noun}: {source}")]
    Expand {
        noun: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to flatten {noun}: {source}")]
    Flatten {
        noun: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    InvalidId(#[from] tfk8s_core::ParseObjectIdError),

    #[error("resource has no id")]
    MissingId,

    #[error("invalid timeout {value:?}: {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("unknown resource type {0}")]
    UnknownResource(String),

    #[error("unknown data source {0}")]
    UnknownDataSource(String),

    #[error("provider is not configured")]
    NotConfigured,

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[source] kube::config::KubeconfigError),

    #[error("failed to infer kubernetes configuration: {0}")]
    InferConfig(#[source] kube::config::InferConfigError),

    #[error("invalid host {0:?}")]
    InvalidHost(String),

    #[error("failed to create kubernetes client: {0}")]
    Client(#[source] kube::Error),

    #[error("Unexpected schema version: {0}")]
    UnexpectedSchemaVersion(u32),

    #[error("unknown method {0}")]
    UnknownMethod(String),

    #[error("invalid {method} request: {source}")]
    InvalidRequest {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    pub(crate) fn kube(op: &'static str, noun: &'static str) -> impl FnOnce(tfk8s_client::Error) -> Self {
        move |source| Error::Kube { op, noun, source }
    }

    pub(crate) fn wait(op: &'static str, noun: &'static str) -> impl FnOnce(tfk8s_runtime::wait::Error) -> Self {
        move |source| Error::Wait { op, noun, source }
    }
}

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
