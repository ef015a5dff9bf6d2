//! MultiArchBuildConfig Controller
//!
//! Builds one image on every configured architecture and publishes the
//! results as a single manifest list.
//!
//! For every `MultiArchBuildConfig` the controller creates one `Build` per
//! architecture, waits for them to finish, pushes the manifest list with
//! `manifest-tool` and optionally mirrors it to external registries with
//! `oc image mirror`. Progress is recorded as status conditions; `success`
//! and `failure` are terminal.

mod backoff;
mod client;
mod config;
mod controller;
mod error;
#[cfg(test)]
mod mock;
mod reconciler;
mod status;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting MultiArchBuildConfig Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Architectures: {}", config.architectures.join(","));
    info!("  Registry: {}", config.registry_url);
    info!("  Docker config: {}", config.docker_config_path);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
