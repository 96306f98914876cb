//! Bounded polling for objects managed by the terraform provider
//!
//! Terraform operations are one-shot: they change an object and then wait, for a bounded time,
//! until the cluster has caught up. [`retry`] holds the generic polling loop and [`wait`] the
//! conditions the provider waits on.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod retry;
pub use retry::{poll_until, Attempt, RetryError, RetryPolicy};

pub mod wait;
pub use wait::{wait_for_replicas, wait_until_gone, ObjectSource, ReplicaProgress, Replicas, WaitMode};
