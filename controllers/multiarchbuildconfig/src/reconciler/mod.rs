//! Reconciliation logic for MultiArchBuildConfigs and their Builds.
//!
//! - `multi_arch_build_config`: the primary state machine, one step per tick
//! - `build`: mirrors owned Build objects into the owner's status
//! - `phase`: derives the next step from observed state
//! - `fan_out`: per-architecture Build creation

pub mod build;
pub mod fan_out;
pub mod multi_arch_build_config;
pub mod phase;

use crate::backoff::{FibonacciBackoff, RetryConfig};
use crate::client::{ClusterClientTrait, ObjectKey};
use crate::error::ControllerError;
use crate::status::update_multi_arch_build_config;
use crds::{MultiArchBuildConfig, MultiArchBuildConfigState, MultiArchBuildConfigStatus};
use image_tools::{ImageMirrorer, ManifestPusher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Reconciles MultiArchBuildConfig resources and their Builds.
pub struct Reconciler {
    pub(crate) client: Box<dyn ClusterClientTrait>,
    pub(crate) manifest_pusher: Box<dyn ManifestPusher>,
    pub(crate) image_mirrorer: Box<dyn ImageMirrorer>,
    /// Architectures every MultiArchBuildConfig is built for
    pub(crate) architectures: Vec<String>,
    /// In-cluster registry holding the pushed manifest list
    pub(crate) registry_url: String,
    pub(crate) status_retry: RetryConfig,
    /// Requeue backoff per object (kind/namespace/name -> backoff)
    backoff_states: Arc<Mutex<HashMap<String, FibonacciBackoff>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        client: Box<dyn ClusterClientTrait>,
        manifest_pusher: Box<dyn ManifestPusher>,
        image_mirrorer: Box<dyn ImageMirrorer>,
        architectures: Vec<String>,
        registry_url: String,
        status_retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            manifest_pusher,
            image_mirrorer,
            architectures,
            registry_url: registry_url.trim_end_matches('/').to_string(),
            status_retry,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Status write through the conflict-retrying chokepoint
    pub(crate) async fn update_status<F>(
        &self,
        key: &ObjectKey,
        mutate: F,
    ) -> Result<MultiArchBuildConfig, ControllerError>
    where
        F: FnMut(&mut MultiArchBuildConfigStatus) + Send,
    {
        update_multi_arch_build_config(self.client.as_ref(), key, &self.status_retry, mutate).await
    }

    /// Set the terminal state and nothing else
    pub(crate) async fn set_state(
        &self,
        key: &ObjectKey,
        state: MultiArchBuildConfigState,
    ) -> Result<(), ControllerError> {
        self.update_status(key, |status| status.state = state).await?;
        Ok(())
    }

    /// Delay before retrying a failed reconcile of `resource`
    pub(crate) fn next_requeue_delay(&self, resource: &str) -> Duration {
        let mut states = match self.backoff_states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        states.entry(resource.to_string()).or_default().next_backoff()
    }

    /// Restart the backoff of `resource` after a successful reconcile
    pub(crate) fn reset_backoff(&self, resource: &str) {
        let mut states = match self.backoff_states.lock() {
            Ok(states) => states,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(backoff) = states.get_mut(resource) {
            backoff.reset();
            debug!("Reset backoff for {}", resource);
        }
    }
}
