//! Where a MultiArchBuildConfig stands in its pipeline.
//!
//! The pipeline is fan-out, wait, push the manifest list, optionally mirror,
//! finalize. [`ReconcilePhase::observe`] derives the phase from the object and
//! the Builds currently labelled with its name. The derivation is total: every
//! combination of inputs maps to exactly one phase, and each phase names the
//! single action the reconciler takes for it.

use crds::{
    get_condition, Build, BuildPhase, ConditionStatus, MultiArchBuildConfig,
    MultiArchBuildConfigState, IMAGE_MIRROR_SUCCESS_REASON, MIRROR_IMAGE_MANIFEST_DONE,
    MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL, PUSH_IMAGE_MANIFEST_DONE, PUSH_MANIFEST_SUCCESS_REASON,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePhase {
    /// State is success or failure; nothing left to do
    Terminal(MultiArchBuildConfigState),
    /// Object is being deleted; garbage collection handles the Builds
    Deleting,
    /// Output target lacks a namespace or a name
    InvalidSpec(String),
    /// Builds for these architectures do not exist yet
    CreatingBuilds(Vec<String>),
    /// At least one Build has not finished
    AwaitingBuilds,
    /// Every Build finished and these did not complete
    BuildsFailed(Vec<String>),
    /// Builds complete, manifest list not pushed yet
    PushingManifest,
    /// Manifest push recorded as failed
    PushFailed,
    /// Manifest pushed, external registries not mirrored yet
    Mirroring,
    /// Mirror recorded as failed
    MirrorFailed,
    /// Every step succeeded
    Success,
}

impl ReconcilePhase {
    /// Phases decided by the object alone, before any Build is looked at
    pub fn observe_object(mabc: &MultiArchBuildConfig) -> Option<Self> {
        if mabc.metadata.deletion_timestamp.is_some() {
            return Some(Self::Deleting);
        }

        let state = mabc.state();
        if state.is_terminal() {
            return Some(Self::Terminal(state));
        }

        if mabc.target_image_ref().is_none() {
            return Some(Self::InvalidSpec(
                "build_spec.output.to must name a namespace and an image".to_string(),
            ));
        }

        None
    }

    /// Phase of `mabc` given the Builds labelled with its name
    pub fn observe(mabc: &MultiArchBuildConfig, builds: &[Build], architectures: &[String]) -> Self {
        if let Some(phase) = Self::observe_object(mabc) {
            return phase;
        }

        let missing = missing_architectures(builds, architectures);
        if !missing.is_empty() {
            return Self::CreatingBuilds(missing);
        }

        if builds.iter().any(|b| !b.phase().is_terminal()) {
            return Self::AwaitingBuilds;
        }

        let failed: Vec<String> = builds
            .iter()
            .filter(|b| b.phase() != BuildPhase::Complete)
            .map(|b| b.metadata.name.clone().unwrap_or_default())
            .collect();
        if !failed.is_empty() {
            return Self::BuildsFailed(failed);
        }

        let conditions = mabc.conditions();
        match get_condition(conditions, PUSH_IMAGE_MANIFEST_DONE) {
            None => return Self::PushingManifest,
            Some(c) if !step_succeeded(c.status, &c.reason, PUSH_MANIFEST_SUCCESS_REASON) => {
                return Self::PushFailed;
            }
            Some(_) => {}
        }

        if mabc.spec.external_registries.is_empty() {
            return Self::Success;
        }

        match get_condition(conditions, MIRROR_IMAGE_MANIFEST_DONE) {
            None => Self::Mirroring,
            Some(c) if !step_succeeded(c.status, &c.reason, IMAGE_MIRROR_SUCCESS_REASON) => {
                Self::MirrorFailed
            }
            Some(_) => Self::Success,
        }
    }
}

fn step_succeeded(status: ConditionStatus, reason: &str, success_reason: &str) -> bool {
    status == ConditionStatus::True && reason == success_reason
}

/// Configured architectures without a Build carrying the matching arch label
///
/// Keeps the configured order.
pub fn missing_architectures(builds: &[Build], architectures: &[String]) -> Vec<String> {
    architectures
        .iter()
        .filter(|arch| {
            !builds
                .iter()
                .any(|b| b.label(MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL) == Some(arch.as_str()))
        })
        .cloned()
        .collect()
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(state) => write!(f, "Terminal({})", state),
            Self::Deleting => f.write_str("Deleting"),
            Self::InvalidSpec(_) => f.write_str("InvalidSpec"),
            Self::CreatingBuilds(archs) => write!(f, "CreatingBuilds({})", archs.join(",")),
            Self::AwaitingBuilds => f.write_str("AwaitingBuilds"),
            Self::BuildsFailed(names) => write!(f, "BuildsFailed({})", names.join(",")),
            Self::PushingManifest => f.write_str("PushingManifest"),
            Self::PushFailed => f.write_str("PushFailed"),
            Self::Mirroring => f.write_str("Mirroring"),
            Self::MirrorFailed => f.write_str("MirrorFailed"),
            Self::Success => f.write_str("Success"),
        }
    }
}
