//! Waits for workloads to reach their desired replica counts
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use tfk8s_client::{NegotiatedApi, Versioned};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::retry::{poll_until, Attempt, RetryError, RetryPolicy};

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when waiting on an object
pub enum Error {
    #[error("timed out after {elapsed:?} waiting for {name}: {current} of {desired} replicas")]
    ConvergenceTimeout {
        name: String,
        desired: i32,
        current: i32,
        elapsed: Duration,
    },
    #[error("timed out after {elapsed:?} waiting for {name} to be deleted")]
    DeletionTimeout { name: String, elapsed: Duration },
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: tfk8s_client::Error,
    },
    #[error("{name} no longer exists")]
    Gone { name: String },
    #[error("waiting for {name} was cancelled")]
    Cancelled { name: String },
}

/// Observed replica counts of a workload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicaProgress {
    /// Replicas the workload should have
    pub desired: i32,
    /// Replicas the workload has
    pub current: i32,
}

impl ReplicaProgress {
    /// Whether the workload has reached its desired count
    pub fn is_converged(&self) -> bool {
        self.current == self.desired
    }
}

/// Workloads with a replica count to converge on
pub trait Replicas {
    /// Current and desired replicas
    fn replica_progress(&self) -> ReplicaProgress;
}

impl Replicas for Deployment {
    fn replica_progress(&self) -> ReplicaProgress {
        ReplicaProgress {
            desired: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            current: self.status.as_ref().and_then(|s| s.replicas).unwrap_or(0),
        }
    }
}

impl Replicas for StatefulSet {
    fn replica_progress(&self) -> ReplicaProgress {
        ReplicaProgress {
            desired: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            current: self.status.as_ref().map_or(0, |s| s.replicas),
        }
    }
}

impl Replicas for DaemonSet {
    fn replica_progress(&self) -> ReplicaProgress {
        let status = self.status.as_ref();
        ReplicaProgress {
            desired: status.map_or(0, |s| s.desired_number_scheduled),
            current: status.map_or(0, |s| s.current_number_scheduled),
        }
    }
}

/// Something that can re-read an object by name
#[async_trait]
pub trait ObjectSource<K>: Send + Sync {
    /// The object, or `None` when it does not exist
    async fn read(&self, name: &str) -> Result<Option<K>, tfk8s_client::Error>;
}

#[async_trait]
impl<K: Versioned> ObjectSource<K> for NegotiatedApi<K> {
    async fn read(&self, name: &str) -> Result<Option<K>, tfk8s_client::Error> {
        self.get_opt(name).await
    }
}

/// What an absent object means to [`wait_for_replicas`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitMode {
    /// The object is expected to stay; disappearing is an error
    Converge,
    /// The object is being drained for deletion; disappearing counts as done
    Drain,
}

/// Wait until the named workload has as many replicas as it wants
///
/// Reads are not retried: a failed read ends the wait.
pub async fn wait_for_replicas<K, S>(
    source: &S,
    name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mode: WaitMode,
) -> Result<ReplicaProgress, Error>
where
    K: Replicas + Send,
    S: ObjectSource<K> + ?Sized,
{
    let res = poll_until(policy, cancel, move || async move {
        match source.read(name).await {
            Ok(Some(obj)) => {
                let progress = obj.replica_progress();
                tracing::debug!(name, desired = progress.desired, current = progress.current, "waiting for replicas");
                if progress.is_converged() {
                    Attempt::Ready(progress)
                } else {
                    Attempt::Pending(progress)
                }
            }
            Ok(None) if mode == WaitMode::Drain => Attempt::Ready(ReplicaProgress::default()),
            Ok(None) => Attempt::Failed(Error::Gone { name: name.into() }),
            Err(source) => Attempt::Failed(Error::Read {
                name: name.into(),
                source,
            }),
        }
    })
    .await;
    match res {
        Ok(progress) => Ok(progress),
        Err(RetryError::TimedOut { last, elapsed }) => Err(Error::ConvergenceTimeout {
            name: name.into(),
            desired: last.desired,
            current: last.current,
            elapsed,
        }),
        Err(RetryError::Failed(err)) => Err(err),
        Err(RetryError::Cancelled) => Err(Error::Cancelled { name: name.into() }),
    }
}

/// Wait until the named object no longer exists
pub async fn wait_until_gone<K, S>(
    source: &S,
    name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(), Error>
where
    K: Send,
    S: ObjectSource<K> + ?Sized,
{
    let res = poll_until(policy, cancel, move || async move {
        match source.read(name).await {
            Ok(None) => Attempt::Ready(()),
            Ok(Some(_)) => Attempt::Pending(()),
            Err(source) => Attempt::Failed(Error::Read {
                name: name.into(),
                source,
            }),
        }
    })
    .await;
    match res {
        Ok(()) => Ok(()),
        Err(RetryError::TimedOut { elapsed, .. }) => Err(Error::DeletionTimeout {
            name: name.into(),
            elapsed,
        }),
        Err(RetryError::Failed(err)) => Err(err),
        Err(RetryError::Cancelled) => Err(Error::Cancelled { name: name.into() }),
    }
}
