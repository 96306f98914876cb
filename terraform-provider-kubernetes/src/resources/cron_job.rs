use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::CronJob;
use kube::api::DeleteParams;
use serde_json::{Map, Value};
use tfk8s_client::NegotiatedApi;
use tfk8s_core::ApiGroup;
use tfk8s_runtime::{wait_until_gone, RetryPolicy};

use super::Kind;
use crate::{
    data::{self, ResourceData},
    error::{Error, Result},
    provider::KubeContext,
};

/// How long a deleted cron job may linger
const DELETION_WAIT: Duration = Duration::from_secs(60);

/// Labels the job controller puts on cron jobs without a manual selector
const GENERATED_LABELS: &[&str] = &["controller-uid", "cron-job-name"];

/// `kubernetes_cron_job`
pub struct CronJobKind;

fn strip_generated_labels(job: &mut CronJob) {
    let job_spec = job.spec.as_mut().and_then(|s| s.job_template.spec.as_mut());
    if job_spec.as_ref().and_then(|s| s.manual_selector).unwrap_or(false) {
        return;
    }
    if let Some(labels) = job.metadata.labels.as_mut() {
        for label in GENERATED_LABELS {
            labels.remove(*label);
        }
    }
    let selector = job_spec
        .and_then(|s| s.selector.as_mut())
        .and_then(|s| s.match_labels.as_mut());
    if let Some(labels) = selector {
        labels.remove("controller-uid");
    }
}

#[async_trait]
impl Kind for CronJobKind {
    type Object = CronJob;

    const CANDIDATES: &'static [ApiGroup] = &[ApiGroup::BatchV1, ApiGroup::BatchV1beta1, ApiGroup::BatchV2alpha1];
    const NOUN: &'static str = "cron job";
    const TYPE_NAME: &'static str = "kubernetes_cron_job";

    fn expand(&self, d: &ResourceData) -> Result<CronJob> {
        let mut job: CronJob = data::expand(d.attrs(), Self::RENAMES, Self::NOUN)?;
        let annotations = job.metadata.annotations.clone();
        if let Some(spec) = job.spec.as_mut() {
            spec.job_template.metadata.get_or_insert_with(Default::default).annotations = annotations;
        }
        Ok(job)
    }

    fn flatten(&self, obj: &CronJob) -> Result<Map<String, Value>> {
        let mut job = obj.clone();
        strip_generated_labels(&mut job);
        data::flatten(&job, Self::RENAMES, Self::NOUN)
    }

    async fn delete(&self, api: &NegotiatedApi<CronJob>, name: &str, ctx: &KubeContext, _d: &ResourceData) -> Result<()> {
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(Error::kube("delete", Self::NOUN))?;
        let policy = RetryPolicy::new(DELETION_WAIT);
        wait_until_gone::<CronJob, _>(api, name, &policy, &ctx.cancel)
            .await
            .map_err(Error::wait("delete", Self::NOUN))
    }
}
