//! Manifest list publishing via `manifest-tool`
//!
//! Takes the per-architecture images produced by the builds of a
//! `MultiArchBuildConfig` and pushes one manifest list that fans out to them.

use crate::command;
use crate::error::ImageToolError;
use crds::{Build, MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL};
use tracing::info;

/// Pushes a multi-architecture manifest list
#[async_trait::async_trait]
pub trait ManifestPusher: Send + Sync {
    /// Combine the images of `builds` into `target_image_ref` (`<namespace>/<name>`)
    async fn push_image_with_manifest(
        &self,
        builds: &[Build],
        target_image_ref: &str,
    ) -> Result<(), ImageToolError>;
}

/// `manifest-tool` backed pusher
#[derive(Debug, Clone)]
pub struct ManifestToolPusher {
    binary: String,
    registry_url: String,
    docker_cfg_path: String,
}

impl ManifestToolPusher {
    /// Create a pusher for images living in `registry_url`
    pub fn new(
        binary: impl Into<String>,
        registry_url: impl Into<String>,
        docker_cfg_path: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            docker_cfg_path: docker_cfg_path.into(),
        }
    }

    /// Argument list for `manifest-tool`
    ///
    /// One `--platforms linux/<arch> --template <image>` pair per build carrying
    /// the arch label, in input order, then `--target` for the manifest list.
    pub fn args(&self, builds: &[Build], target_image_ref: &str) -> Result<Vec<String>, ImageToolError> {
        let mut args = vec![
            "--debug".to_string(),
            "--insecure".to_string(),
            "--docker-cfg".to_string(),
            self.docker_cfg_path.clone(),
            "push".to_string(),
            "from-args".to_string(),
        ];

        let mut platforms = 0;
        for build in builds {
            let Some(arch) = build.label(MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL) else {
                continue;
            };
            let image = build
                .spec
                .common_spec
                .output
                .to
                .as_ref()
                .and_then(|to| to.namespaced_name())
                .ok_or_else(|| {
                    ImageToolError::InvalidInput(format!(
                        "build {} has no output image",
                        build.metadata.name.as_deref().unwrap_or("<unknown>")
                    ))
                })?;

            args.push("--platforms".to_string());
            args.push(format!("linux/{}", arch));
            args.push("--template".to_string());
            args.push(format!("{}/{}", self.registry_url, image));
            platforms += 1;
        }

        if platforms == 0 {
            return Err(ImageToolError::InvalidInput(format!(
                "no architecture builds to assemble into {}",
                target_image_ref
            )));
        }

        args.push("--target".to_string());
        args.push(format!("{}/{}", self.registry_url, target_image_ref));
        Ok(args)
    }
}

#[async_trait::async_trait]
impl ManifestPusher for ManifestToolPusher {
    async fn push_image_with_manifest(
        &self,
        builds: &[Build],
        target_image_ref: &str,
    ) -> Result<(), ImageToolError> {
        let args = self.args(builds, target_image_ref)?;
        command::run(&self.binary, &args).await?;
        info!(
            target = %target_image_ref,
            builds = builds.len(),
            "Pushed manifest list"
        );
        Ok(())
    }
}
