use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, Role, RoleBinding};
use tfk8s_core::ApiGroup;

use super::Kind;

const RBAC: &[ApiGroup] = &[ApiGroup::RbacV1, ApiGroup::RbacV1beta1];

/// `kubernetes_role`
pub struct RoleKind;

impl Kind for RoleKind {
    type Object = Role;

    const CANDIDATES: &'static [ApiGroup] = RBAC;
    const NOUN: &'static str = "role";
    const RENAMES: &'static [(&'static str, &'static str)] = &[("rule", "rules")];
    const TYPE_NAME: &'static str = "kubernetes_role";
}

/// `kubernetes_role_binding`
pub struct RoleBindingKind;

impl Kind for RoleBindingKind {
    type Object = RoleBinding;

    const CANDIDATES: &'static [ApiGroup] = RBAC;
    const NOUN: &'static str = "role binding";
    const RENAMES: &'static [(&'static str, &'static str)] = &[("subject", "subjects")];
    const TYPE_NAME: &'static str = "kubernetes_role_binding";
}

/// `kubernetes_cluster_role_binding`
pub struct ClusterRoleBindingKind;

impl Kind for ClusterRoleBindingKind {
    type Object = ClusterRoleBinding;

    const CANDIDATES: &'static [ApiGroup] = RBAC;
    const NOUN: &'static str = "cluster role binding";
    const RENAMES: &'static [(&'static str, &'static str)] = &[("subject", "subjects")];
    const TYPE_NAME: &'static str = "kubernetes_cluster_role_binding";
}
