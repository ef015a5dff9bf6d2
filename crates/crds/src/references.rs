//! Object references used by build outputs
//!
//! Mirrors the subset of the Kubernetes `ObjectReference` that build outputs use
//! to point at an image stream tag (or a docker image) in a namespace.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the image a build pushes to
///
/// `kind` is usually `ImageStreamTag` (e.g. `name: "tools:latest"`) or
/// `DockerImage` (e.g. `name: "quay.io/org/tools:latest"`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// Kind of the referenced object (e.g., "ImageStreamTag")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Namespace holding the referenced object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the referenced object
    #[serde(default)]
    pub name: String,
}

impl ImageReference {
    /// Create an `ImageStreamTag` reference in the given namespace
    pub fn image_stream_tag(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: Some("ImageStreamTag".to_string()),
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// `<namespace>/<name>`, or `None` when either part is missing
    pub fn namespaced_name(&self) -> Option<String> {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() && !self.name.is_empty() => {
                Some(format!("{}/{}", ns, self.name))
            }
            _ => None,
        }
    }

    /// Copy of this reference with `-<suffix>` appended to the name
    pub fn with_name_suffix(&self, suffix: &str) -> Self {
        Self {
            name: format!("{}-{}", self.name, suffix),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_name() {
        let reference = ImageReference::image_stream_tag("ci", "tools");
        assert_eq!(reference.namespaced_name().as_deref(), Some("ci/tools"));
    }

    #[test]
    fn test_namespaced_name_requires_namespace() {
        let reference = ImageReference {
            kind: None,
            namespace: None,
            name: "tools".to_string(),
        };
        assert_eq!(reference.namespaced_name(), None);

        let empty_name = ImageReference::image_stream_tag("ci", "");
        assert_eq!(empty_name.namespaced_name(), None);
    }

    #[test]
    fn test_with_name_suffix_keeps_namespace() {
        let reference = ImageReference::image_stream_tag("ci", "tools");
        let suffixed = reference.with_name_suffix("arm64");
        assert_eq!(suffixed.name, "tools-arm64");
        assert_eq!(suffixed.namespace.as_deref(), Some("ci"));
        assert_eq!(suffixed.kind.as_deref(), Some("ImageStreamTag"));
    }
}
