//! The single writer for MultiArchBuildConfig status.
//!
//! Every status change in the controller goes through
//! [`update_multi_arch_build_config`]: fetch the latest object, apply the
//! mutation to a copy of its status, write it back guarded by
//! `resourceVersion`, and start over from a fresh read when the write loses a
//! race with another writer.

use crate::backoff::{ConflictBackoff, RetryConfig};
use crate::client::{ClusterClientTrait, ObjectKey};
use crate::error::ControllerError;
use crds::{MultiArchBuildConfig, MultiArchBuildConfigStatus};
use tracing::{debug, warn};

/// Apply `mutate` to the status of the MultiArchBuildConfig at `key`
///
/// The mutation may run more than once, always against the freshest copy.
/// Returns the object as stored after the write, or unchanged when the
/// mutation was a no-op. A missing object yields [`ControllerError::NotFound`];
/// conflicts beyond `retry.attempts` are returned as
/// [`ControllerError::Conflict`].
pub async fn update_multi_arch_build_config<F>(
    client: &dyn ClusterClientTrait,
    key: &ObjectKey,
    retry: &RetryConfig,
    mut mutate: F,
) -> Result<MultiArchBuildConfig, ControllerError>
where
    F: FnMut(&mut MultiArchBuildConfigStatus) + Send,
{
    let mut backoff = ConflictBackoff::new(retry);

    loop {
        let current = client
            .get_multi_arch_build_config(key)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("MultiArchBuildConfig {}", key)))?;

        let mut status = current.status_or_default();
        mutate(&mut status);
        if current.status.as_ref() == Some(&status) {
            debug!("MultiArchBuildConfig {} status unchanged, skipping write", key);
            return Ok(current);
        }

        let mut updated = current;
        updated.status = Some(status);

        match client.update_multi_arch_build_config_status(&updated).await {
            Ok(written) => return Ok(written),
            Err(ControllerError::Conflict(message)) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "Conflict updating MultiArchBuildConfig {} status, retrying in {:?}: {}",
                        key, delay, message
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(ControllerError::Conflict(message)),
            },
            Err(e) => return Err(e),
        }
    }
}
