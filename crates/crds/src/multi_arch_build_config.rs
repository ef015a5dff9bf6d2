//! MultiArchBuildConfig CRD
//!
//! Describes one image that must be built on every supported architecture and
//! published as a single manifest list, optionally mirrored to external
//! registries.

use crate::build::{preserve_unknown_fields, Build, CommonSpec};
use crate::conditions::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the owning MultiArchBuildConfig name on every Build
pub const MULTI_ARCH_BUILD_CONFIG_NAME_LABEL: &str = "multiarchbuildconfigs.ci.openshift.io/name";

/// Label carrying the target architecture on every Build
pub const MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL: &str = "multiarchbuildconfigs.ci.openshift.io/arch";

/// Well-known node label used to pin a build to an architecture
pub const NODE_ARCHITECTURE_LABEL: &str = "kubernetes.io/arch";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "ci.openshift.io",
    version = "v1",
    kind = "MultiArchBuildConfig",
    plural = "multiarchbuildconfigs",
    shortname = "mabc",
    namespaced,
    status = "MultiArchBuildConfigStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct MultiArchBuildConfigSpec {
    /// Build template shared by every architecture. Node selector and output
    /// name are overridden per architecture.
    pub build_spec: BuildConfigSpec,

    /// Additional registries the final manifest list is mirrored to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_registries: Vec<String>,
}

/// BuildConfig template (common build spec inlined)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigSpec {
    #[serde(flatten)]
    pub common_spec: CommonSpec,

    /// Run policy carried over from BuildConfig, unused by the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct MultiArchBuildConfigStatus {
    /// Terminal outcome; empty while in progress
    #[serde(default)]
    pub state: MultiArchBuildConfigState,

    /// Step markers, one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Last observed Builds keyed by `<namespace>/<name>`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[schemars(schema_with = "builds_schema")]
    pub builds: BTreeMap<String, Build>,
}

fn builds_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    let item = preserve_unknown_fields(generator);
    schemars::json_schema!({
        "type": "object",
        "additionalProperties": item
    })
}

/// Overall outcome of a MultiArchBuildConfig
///
/// `""` while in progress; `success` and `failure` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum MultiArchBuildConfigState {
    #[default]
    #[serde(rename = "")]
    InProgress,

    #[serde(rename = "success")]
    Success,

    #[serde(rename = "failure")]
    Failure,
}

impl MultiArchBuildConfigState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MultiArchBuildConfigState::InProgress)
    }
}

impl std::fmt::Display for MultiArchBuildConfigState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiArchBuildConfigState::InProgress => f.write_str("in progress"),
            MultiArchBuildConfigState::Success => f.write_str("success"),
            MultiArchBuildConfigState::Failure => f.write_str("failure"),
        }
    }
}

impl MultiArchBuildConfig {
    /// Status, or an empty one when the controller has not written it yet
    pub fn status_or_default(&self) -> MultiArchBuildConfigStatus {
        self.status.clone().unwrap_or_default()
    }

    /// Current state, in progress when no status exists
    pub fn state(&self) -> MultiArchBuildConfigState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }

    /// Conditions recorded so far
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// `<namespace>/<name>` of the manifest list image (un-suffixed output)
    pub fn target_image_ref(&self) -> Option<String> {
        self.spec
            .build_spec
            .common_spec
            .output
            .to
            .as_ref()
            .and_then(|to| to.namespaced_name())
    }
}
