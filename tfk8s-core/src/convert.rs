//! Structural conversion between schema-compatible types.
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Possible errors when converting between two types
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The source value could not be encoded
    #[error("failed to serialize conversion source: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The encoded value does not fit the destination type
    #[error("conversion source does not fit destination schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Convert `source` into `D` through its JSON encoding
///
/// Fields are matched by their serialized names, so this is only meaningful for types
/// that agree on the shape of every populated field, such as the same Kubernetes kind in two
/// group versions. Fields the destination does not know are dropped. Nothing checks this
/// up front: an incompatible pair either fails with [`ConversionError::Schema`] or loses data.
///
/// ```
/// use k8s_openapi::api::apps::v1::Deployment;
/// use tfk8s_core::convert;
///
/// let value = serde_json::json!({
///     "apiVersion": "apps/v1",
///     "kind": "Deployment",
///     "metadata": { "name": "web" },
///     "spec": { "replicas": 2, "selector": {}, "template": {} }
/// });
/// let deploy: Deployment = convert(&value).unwrap();
/// assert_eq!(deploy.spec.unwrap().replicas, Some(2));
/// ```
pub fn convert<S, D>(source: &S) -> Result<D, ConversionError>
where
    S: Serialize + ?Sized,
    D: DeserializeOwned,
{
    let encoded = serde_json::to_value(source).map_err(ConversionError::Serialize)?;
    serde_json::from_value(encoded).map_err(ConversionError::Schema)
}

#[cfg(test)]
mod tests {
    use super::{convert, ConversionError};
    use assert_json_diff::assert_json_eq;
    use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Legacy {
        name: String,
        replicas: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Current {
        name: String,
        replicas: i32,
        #[serde(default)]
        paused: bool,
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque"))
        }
    }

    #[test]
    fn round_trips_compatible_types() {
        let legacy = Legacy {
            name: "web".into(),
            replicas: 3,
        };
        let current: Current = convert(&legacy).unwrap();
        assert_eq!(current.replicas, 3);
        assert!(!current.paused);

        let back: Legacy = convert(&current).unwrap();
        assert_eq!(back, legacy);
    }

    #[test]
    fn typed_resources_round_trip() {
        let deploy: Deployment = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "web", "namespace": "prod", "labels": { "app": "web" } },
            "spec": {
                "replicas": 3,
                "selector": { "matchLabels": { "app": "web" } },
                "template": { "metadata": { "labels": { "app": "web" } } }
            }
        }))
        .unwrap();
        let value: serde_json::Value = convert(&deploy).unwrap();
        let back: Deployment = convert(&value).unwrap();
        assert_eq!(back, deploy);
        assert_json_eq!(value["spec"]["selector"], json!({ "matchLabels": { "app": "web" } }));
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let err = convert::<_, Legacy>(&json!({ "name": "web", "replicas": "three" })).unwrap_err();
        assert!(matches!(err, ConversionError::Schema(_)));

        // a typed resource refuses an object of another kind
        let deploy = json!({ "apiVersion": "apps/v1", "kind": "Deployment", "metadata": {} });
        assert!(matches!(
            convert::<_, Service>(&deploy).unwrap_err(),
            ConversionError::Schema(_)
        ));
    }

    #[test]
    fn encode_failure_is_reported() {
        let err = convert::<_, Legacy>(&Unencodable).unwrap_err();
        assert!(matches!(err, ConversionError::Serialize(_)));
    }
}
