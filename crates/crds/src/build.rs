//! Build resource (build.openshift.io/v1)
//!
//! Models the OpenShift `Build` object closely enough for the controller to
//! create one Build per architecture and read its phase back. The CRD itself
//! belongs to the OpenShift build system, so no schema is generated for it.
//! Sub-objects the controller never inspects (source, strategy, resources, ...)
//! are kept as raw JSON so copying a build template never drops fields.

use crate::references::ImageReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema for opaque sub-objects: any object, unknown fields preserved
pub(crate) fn preserve_unknown_fields(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Schema for opaque lists of objects
pub(crate) fn preserve_unknown_fields_list(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "array",
        "items": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true
        }
    })
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[kube(
    group = "build.openshift.io",
    version = "v1",
    kind = "Build",
    namespaced,
    status = "BuildStatus",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Shared build description (inlined on the wire)
    #[serde(flatten)]
    pub common_spec: CommonSpec,

    /// Causes that triggered this build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<Vec<serde_json::Value>>,
}

/// Build description shared by `BuildConfig` and `Build`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommonSpec {
    /// Service account used to run the build pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    /// Input sources (git, dockerfile, images, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub source: Option<serde_json::Value>,

    /// Source revision information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub revision: Option<serde_json::Value>,

    /// Build strategy (docker, source, custom, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub strategy: Option<serde_json::Value>,

    /// Where the resulting image is pushed
    #[serde(default)]
    pub output: BuildOutput,

    /// Compute resources for the build pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub resources: Option<serde_json::Value>,

    /// Post-commit hook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub post_commit: Option<serde_json::Value>,

    /// Maximum build duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_deadline_seconds: Option<i64>,

    /// Node selector for the build pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    /// Mount the cluster trusted CA bundle into the build
    #[serde(
        default,
        rename = "mountTrustedCA",
        skip_serializing_if = "Option::is_none"
    )]
    pub mount_trusted_ca: Option<bool>,
}

/// Build output target
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    /// Image the build pushes to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ImageReference>,

    /// Secret used to push the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub push_secret: Option<serde_json::Value>,

    /// Labels applied to the resulting image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields_list")]
    pub image_labels: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Lifecycle phase, owned by the build system
    #[serde(default)]
    pub phase: BuildPhase,

    /// Machine readable reason for the phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human readable detail for the phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Pull spec of the pushed image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_docker_image_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// Build lifecycle phase
///
/// Serializes as PascalCase, exactly as the build system writes it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BuildPhase {
    /// Created, not yet scheduled
    #[default]
    New,
    /// Waiting for resources
    Pending,
    /// Build pod is running
    Running,
    /// Image built and pushed
    Complete,
    /// Build ran and failed
    Failed,
    /// Build could not run
    Error,
    /// Build was cancelled
    Cancelled,
}

impl BuildPhase {
    /// True once the build system will no longer change the phase
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildPhase::Complete | BuildPhase::Failed | BuildPhase::Error | BuildPhase::Cancelled
        )
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            BuildPhase::New => "New",
            BuildPhase::Pending => "Pending",
            BuildPhase::Running => "Running",
            BuildPhase::Complete => "Complete",
            BuildPhase::Failed => "Failed",
            BuildPhase::Error => "Error",
            BuildPhase::Cancelled => "Cancelled",
        };
        f.write_str(phase)
    }
}

impl Build {
    /// Current phase, `New` when the build system has not written status yet
    pub fn phase(&self) -> BuildPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Value of a metadata label
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }
}
