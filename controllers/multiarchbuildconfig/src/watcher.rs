//! Kubernetes resource watchers.
//!
//! Both watchers run on `kube_runtime::Controller`, which handles
//! reconnection, queueing and de-duplication of events per object. A generic
//! `watch_resource()` helper carries the shared logging, requeue backoff and
//! concurrency settings.

use crate::client::ObjectKey;
use crate::error::ControllerError;
use crate::reconciler::phase::ReconcilePhase;
use crate::reconciler::Reconciler;
use crds::{Build, MultiArchBuildConfig, MULTI_ARCH_BUILD_CONFIG_NAME_LABEL};
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Safety-net requeue for objects still in flight
const IN_PROGRESS_RESYNC: Duration = Duration::from_secs(300);

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Runs `controller` until it stops, one reconcile at a time.
///
/// Failed reconciles are requeued after a per-object Fibonacci backoff that
/// resets on the next success.
async fn watch_resource<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, ObjectKey) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = ObjectKey::from_resource(obj.as_ref());
        let delay = ctx.next_requeue_delay(&format!("{}/{}", resource_name, key));
        error!(
            "Reconciliation error for {} {}, retrying in {:?}: {}",
            resource_name, key, delay, error
        );
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = ObjectKey::from_resource(obj.as_ref());
            debug!("Reconciling {} {}", resource_name, key);

            let action = reconcile_fn(ctx.clone(), key.clone()).await?;
            ctx.reset_backoff(&format!("{}/{}", resource_name, key));
            Ok::<Action, ControllerError>(action)
        }
    };

    controller
        .with_config(ControllerConfig::default().concurrency(1))
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {} {}", resource_name, obj),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}

/// Watches MultiArchBuildConfigs and the Builds they own.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    mabc_api: Api<MultiArchBuildConfig>,
    build_api: Api<Build>,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        mabc_api: Api<MultiArchBuildConfig>,
        build_api: Api<Build>,
    ) -> Self {
        Self {
            reconciler,
            mabc_api,
            build_api,
        }
    }

    /// Drives the primary state machine.
    ///
    /// Owned Builds map back to their MultiArchBuildConfig, so a Build
    /// finishing triggers the next tick of its owner.
    pub async fn watch_multi_arch_build_configs(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.mabc_api.clone(), watcher::Config::default())
            .owns(self.build_api.clone(), watcher::Config::default());

        watch_resource(
            controller,
            self.reconciler.clone(),
            |reconciler, key| {
                Box::pin(async move {
                    let phase = reconciler.reconcile_multi_arch_build_config(&key).await?;
                    Ok(next_action(phase.as_ref()))
                })
            },
            "MultiArchBuildConfig",
        )
        .await
    }

    /// Keeps `status.builds` of every owner up to date.
    pub async fn watch_builds(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(
            self.build_api.clone(),
            watcher::Config::default().labels(MULTI_ARCH_BUILD_CONFIG_NAME_LABEL),
        );

        watch_resource(
            controller,
            self.reconciler.clone(),
            |reconciler, key| {
                Box::pin(async move {
                    reconciler.reconcile_build(&key).await?;
                    Ok(Action::await_change())
                })
            },
            "Build",
        )
        .await
    }
}

/// Terminal and vanished objects wait for changes; the rest resync periodically
fn next_action(phase: Option<&ReconcilePhase>) -> Action {
    match phase {
        None | Some(ReconcilePhase::Terminal(_)) | Some(ReconcilePhase::Deleting) => Action::await_change(),
        Some(_) => Action::requeue(IN_PROGRESS_RESYNC),
    }
}
