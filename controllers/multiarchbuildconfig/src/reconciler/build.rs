//! Build reconciler.
//!
//! Keeps `status.builds` of the owning MultiArchBuildConfig in sync with the
//! Builds it spawned. Only copies objects; decisions based on build phases
//! stay with the primary reconciler.

use super::Reconciler;
use crate::client::ObjectKey;
use crate::error::ControllerError;
use crds::MULTI_ARCH_BUILD_CONFIG_NAME_LABEL;
use tracing::debug;

impl Reconciler {
    /// Upserts the Build at `key` into its owner's `status.builds`.
    pub async fn reconcile_build(&self, key: &ObjectKey) -> Result<(), ControllerError> {
        let Some(mut build) = self.client.get_build(key).await? else {
            debug!("Build {} not found, nothing to do", key);
            return Ok(());
        };

        let Some(mabc_name) = build.label(MULTI_ARCH_BUILD_CONFIG_NAME_LABEL).map(str::to_string) else {
            debug!("Build {} has no {} label, skipping", key, MULTI_ARCH_BUILD_CONFIG_NAME_LABEL);
            return Ok(());
        };
        let mabc_key = ObjectKey::new(key.namespace.clone(), mabc_name);

        // Bookkeeping of the API server, not worth storing twice
        build.metadata.managed_fields = None;

        let build_key = key.to_string();
        let result = self
            .update_status(&mabc_key, |status| {
                status.builds.insert(build_key.clone(), build.clone());
            })
            .await;

        match result {
            Ok(_) => {
                debug!("Recorded Build {} on MultiArchBuildConfig {}", key, mabc_key);
                Ok(())
            }
            Err(ControllerError::NotFound(_)) => {
                debug!("MultiArchBuildConfig {} of Build {} is gone", mabc_key, key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
