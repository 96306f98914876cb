use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use tfk8s_core::ApiGroup;

use super::Kind;

/// `kubernetes_custom_resource_definition`
///
/// Only `apiextensions.k8s.io/v1` is negotiated: the `v1beta1` schema layout differs and
/// does not convert structurally.
pub struct CustomResourceDefinitionKind;

impl Kind for CustomResourceDefinitionKind {
    type Object = CustomResourceDefinition;

    const CANDIDATES: &'static [ApiGroup] = &[ApiGroup::ApiextensionsV1];
    const NOUN: &'static str = "custom resource definition";
    const TYPE_NAME: &'static str = "kubernetes_custom_resource_definition";
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CustomResourceDefinitionKind;
    use crate::{data::ResourceData, resources::Kind};

    #[test]
    fn schemas_keep_their_field_names() {
        let Value::Object(attrs) = json!({
            "metadata": { "name": "widgets.example.com" },
            "spec": {
                "group": "example.com",
                "scope": "Namespaced",
                "names": { "kind": "Widget", "plural": "widgets", "singular": "widget", "short_names": ["wd"] },
                "versions": [{
                    "name": "v1",
                    "served": true,
                    "storage": true,
                    "schema": {
                        "open_api_v3_schema": {
                            "type": "object",
                            "properties": {
                                "spec": { "type": "object", "x-kubernetes-preserve-unknown-fields": true }
                            }
                        }
                    }
                }]
            }
        }) else {
            unreachable!()
        };
        let crd = CustomResourceDefinitionKind.expand(&ResourceData::new(attrs)).unwrap();
        assert_eq!(crd.spec.names.short_names, Some(vec!["wd".to_string()]));
        let schema = crd.spec.versions[0].schema.clone().unwrap().open_api_v3_schema.unwrap();
        let spec = &schema.properties.unwrap()["spec"];
        assert_eq!(spec.x_kubernetes_preserve_unknown_fields, Some(true));

        let flat = CustomResourceDefinitionKind.flatten(&crd).unwrap();
        let schema = &flat["spec"]["versions"][0]["schema"]["open_api_v3_schema"];
        assert_eq!(schema["properties"]["spec"]["x-kubernetes-preserve-unknown-fields"], true);
    }
}
