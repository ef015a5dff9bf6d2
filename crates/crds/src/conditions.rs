//! Status conditions
//!
//! Conditions are the durable step-completion markers of a
//! `MultiArchBuildConfig`. A condition type appears at most once in a status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The manifest list has been pushed (or the push failed)
pub const PUSH_IMAGE_MANIFEST_DONE: &str = "PushManifestDone";
pub const PUSH_MANIFEST_SUCCESS_REASON: &str = "PushManifestSuccess";
pub const PUSH_MANIFEST_ERROR_REASON: &str = "PushManifestError";

/// The image has been mirrored to external registries (or the mirror failed)
pub const MIRROR_IMAGE_MANIFEST_DONE: &str = "ImageMirrorDone";
pub const IMAGE_MIRROR_SUCCESS_REASON: &str = "ImageMirrorSuccess";
pub const IMAGE_MIRROR_ERROR_REASON: &str = "ImageMirrorError";

/// Condition status values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// A typed observation attached to a resource status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, unique within a status
    #[serde(rename = "type")]
    pub type_: String,

    /// True, False or Unknown
    pub status: ConditionStatus,

    /// CamelCase reason for the last transition
    #[serde(default)]
    pub reason: String,

    /// Human readable detail
    #[serde(default)]
    pub message: String,

    /// When the condition last changed
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// New condition stamped with the current time
    pub fn new(
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// First condition of the given type
pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// First condition matching type, reason and status
pub fn get_condition_with<'a>(
    conditions: &'a [Condition],
    type_: &str,
    reason: &str,
    status: ConditionStatus,
) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|c| c.type_ == type_ && c.reason == reason && c.status == status)
}

/// Overwrite the condition of the same type in place, or append it
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}
