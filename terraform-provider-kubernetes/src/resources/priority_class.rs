use k8s_openapi::api::scheduling::v1::PriorityClass;
use tfk8s_core::ApiGroup;

use super::Kind;

/// `kubernetes_priority_class`
pub struct PriorityClassKind;

impl Kind for PriorityClassKind {
    type Object = PriorityClass;

    const CANDIDATES: &'static [ApiGroup] = &[
        ApiGroup::SchedulingV1,
        ApiGroup::SchedulingV1beta1,
        ApiGroup::SchedulingV1alpha1,
    ];
    const NOUN: &'static str = "priority class";
    const TYPE_NAME: &'static str = "kubernetes_priority_class";
}
