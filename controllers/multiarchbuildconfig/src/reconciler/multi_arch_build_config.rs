//! MultiArchBuildConfig reconciler.
//!
//! Each tick reads the object and its Builds fresh, derives the
//! [`ReconcilePhase`], performs the single action mapped to it and records the
//! outcome in status. Every side effect (Build creation, manifest push,
//! mirror) is guarded by an observation that it has not happened yet, so
//! ticks can be repeated or interleaved with crashes at any point.

use super::fan_out::create_builds;
use super::phase::ReconcilePhase;
use super::Reconciler;
use crate::client::ObjectKey;
use crate::error::ControllerError;
use crds::{
    set_condition, Build, Condition, ConditionStatus, MultiArchBuildConfig,
    MultiArchBuildConfigState, IMAGE_MIRROR_ERROR_REASON, IMAGE_MIRROR_SUCCESS_REASON,
    MIRROR_IMAGE_MANIFEST_DONE, PUSH_IMAGE_MANIFEST_DONE, PUSH_MANIFEST_ERROR_REASON,
    PUSH_MANIFEST_SUCCESS_REASON,
};
use image_tools::image_mirror_args;
use tracing::{debug, error, info, warn};

impl Reconciler {
    /// Advances the MultiArchBuildConfig at `key` by one step.
    ///
    /// Returns the phase that was acted on, `None` when the object is gone.
    pub async fn reconcile_multi_arch_build_config(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<ReconcilePhase>, ControllerError> {
        let Some(mabc) = self.client.get_multi_arch_build_config(key).await? else {
            debug!("MultiArchBuildConfig {} not found, nothing to do", key);
            return Ok(None);
        };

        let mut builds = Vec::new();
        let phase = match ReconcilePhase::observe_object(&mabc) {
            Some(phase) => phase,
            None => {
                builds = self.client.list_builds(&key.namespace, &key.name).await?;
                ReconcilePhase::observe(&mabc, &builds, &self.architectures)
            }
        };

        info!(namespace = %key.namespace, name = %key.name, phase = %phase, "Reconciling MultiArchBuildConfig");

        match &phase {
            ReconcilePhase::Terminal(_) | ReconcilePhase::Deleting | ReconcilePhase::AwaitingBuilds => {}
            ReconcilePhase::InvalidSpec(reason) => {
                warn!("MultiArchBuildConfig {} is invalid: {}", key, reason);
                self.set_state(key, MultiArchBuildConfigState::Failure).await?;
            }
            ReconcilePhase::CreatingBuilds(missing) => {
                self.handle_create_builds(key, &mabc, missing).await?;
            }
            ReconcilePhase::BuildsFailed(failed) => {
                info!("MultiArchBuildConfig {}: builds {} did not complete", key, failed.join(","));
                self.set_state(key, MultiArchBuildConfigState::Failure).await?;
            }
            ReconcilePhase::PushingManifest => {
                self.handle_push_image_with_manifest(key, &mabc, &builds).await?;
            }
            ReconcilePhase::Mirroring => {
                self.handle_mirror_image(key, &mabc).await?;
            }
            ReconcilePhase::PushFailed | ReconcilePhase::MirrorFailed => {
                self.set_state(key, MultiArchBuildConfigState::Failure).await?;
            }
            ReconcilePhase::Success => {
                info!("MultiArchBuildConfig {} succeeded", key);
                self.set_state(key, MultiArchBuildConfigState::Success).await?;
            }
        }

        Ok(Some(phase))
    }

    async fn handle_create_builds(
        &self,
        key: &ObjectKey,
        mabc: &MultiArchBuildConfig,
        missing: &[String],
    ) -> Result<(), ControllerError> {
        let Err(err) = create_builds(self.client.as_ref(), mabc, missing).await else {
            return Ok(());
        };

        error!("MultiArchBuildConfig {}: {}", key, err);
        if let Err(mark_err) = self.set_state(key, MultiArchBuildConfigState::Failure).await {
            error!("Failed to mark MultiArchBuildConfig {} as failed: {}", key, mark_err);
        }
        Err(err)
    }

    async fn handle_push_image_with_manifest(
        &self,
        key: &ObjectKey,
        mabc: &MultiArchBuildConfig,
        builds: &[Build],
    ) -> Result<(), ControllerError> {
        let target_image_ref = target_image_ref(key, mabc)?;

        let condition = match self
            .manifest_pusher
            .push_image_with_manifest(builds, &target_image_ref)
            .await
        {
            Ok(()) => {
                info!("Pushed manifest list {} for {}", target_image_ref, key);
                Condition::new(
                    PUSH_IMAGE_MANIFEST_DONE,
                    ConditionStatus::True,
                    PUSH_MANIFEST_SUCCESS_REASON,
                    "",
                )
            }
            Err(e) => {
                error!("Failed to push manifest list {} for {}: {}", target_image_ref, key, e);
                Condition::new(
                    PUSH_IMAGE_MANIFEST_DONE,
                    ConditionStatus::False,
                    PUSH_MANIFEST_ERROR_REASON,
                    e.to_string(),
                )
            }
        };

        self.record_step(key, condition).await
    }

    async fn handle_mirror_image(
        &self,
        key: &ObjectKey,
        mabc: &MultiArchBuildConfig,
    ) -> Result<(), ControllerError> {
        let source = format!("{}/{}", self.registry_url, target_image_ref(key, mabc)?);
        let images = image_mirror_args(&source, &mabc.spec.external_registries);

        let condition = match self.image_mirrorer.mirror(&images).await {
            Ok(()) => {
                info!("Mirrored {} to {} registries for {}", source, images.len() - 1, key);
                Condition::new(
                    MIRROR_IMAGE_MANIFEST_DONE,
                    ConditionStatus::True,
                    IMAGE_MIRROR_SUCCESS_REASON,
                    "",
                )
            }
            Err(e) => {
                error!("Failed to mirror {} for {}: {}", source, key, e);
                Condition::new(
                    MIRROR_IMAGE_MANIFEST_DONE,
                    ConditionStatus::False,
                    IMAGE_MIRROR_ERROR_REASON,
                    format!("oc image mirror: {}", e),
                )
            }
        };

        self.record_step(key, condition).await
    }

    /// Store a step outcome; a failed step also makes the object terminal
    async fn record_step(&self, key: &ObjectKey, condition: Condition) -> Result<(), ControllerError> {
        let failed = !condition.is_true();
        self.update_status(key, |status| {
            set_condition(&mut status.conditions, condition.clone());
            if failed {
                status.state = MultiArchBuildConfigState::Failure;
            }
        })
        .await?;
        Ok(())
    }
}

fn target_image_ref(key: &ObjectKey, mabc: &MultiArchBuildConfig) -> Result<String, ControllerError> {
    mabc.target_image_ref().ok_or_else(|| {
        ControllerError::InvalidResource(format!("MultiArchBuildConfig {} has no output target", key))
    })
}
