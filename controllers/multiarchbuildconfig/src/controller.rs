//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the reconciler to
//! the cluster and the image tools and runs both watchers.

use crate::client::KubeClusterClient;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::{Build, MultiArchBuildConfig};
use image_tools::{ManifestToolPusher, OcImageMirrorer};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for MultiArchBuildConfig management.
pub struct Controller {
    mabc_watcher: JoinHandle<Result<(), ControllerError>>,
    build_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing MultiArchBuildConfig Controller");

        let kube_client = Client::try_default().await?;

        let (mabc_api, build_api): (Api<MultiArchBuildConfig>, Api<Build>) = match config.namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(kube_client.clone(), ns),
                Api::namespaced(kube_client.clone(), ns),
            ),
            None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
        };

        let reconciler = Arc::new(Reconciler::new(
            Box::new(KubeClusterClient::new(kube_client)),
            Box::new(ManifestToolPusher::new(
                config.manifest_tool_bin.clone(),
                config.registry_url.clone(),
                config.docker_config_path.clone(),
            )),
            Box::new(OcImageMirrorer::new(
                config.oc_bin.clone(),
                config.docker_config_path.clone(),
            )),
            config.architectures.clone(),
            config.registry_url.clone(),
            config.status_retry.clone(),
        ));

        let mabc_watcher_instance = Watcher::new(reconciler.clone(), mabc_api.clone(), build_api.clone());
        let build_watcher_instance = Watcher::new(reconciler, mabc_api, build_api);

        let mabc_watcher = tokio::spawn(async move {
            mabc_watcher_instance.watch_multi_arch_build_configs().await
        });

        let build_watcher = tokio::spawn(async move {
            build_watcher_instance.watch_builds().await
        });

        Ok(Self {
            mabc_watcher,
            build_watcher,
        })
    }

    /// Runs the controller until either watcher stops.
    ///
    /// Both watchers shut down gracefully on SIGTERM or ctrl-c.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("MultiArchBuildConfig Controller running");

        tokio::select! {
            result = &mut self.mabc_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MultiArchBuildConfig watcher panicked: {}", e)))??;
                self.build_watcher.abort();
            }
            result = &mut self.build_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Build watcher panicked: {}", e)))??;
                self.mabc_watcher.abort();
            }
        }

        info!("MultiArchBuildConfig Controller stopped");
        Ok(())
    }
}
