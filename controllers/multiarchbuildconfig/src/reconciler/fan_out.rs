//! One Build per architecture.

use crate::client::{ClusterClientTrait, ObjectKey};
use crate::error::ControllerError;
use crds::{
    Build, BuildSpec, MultiArchBuildConfig, MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL,
    MULTI_ARCH_BUILD_CONFIG_NAME_LABEL, NODE_ARCHITECTURE_LABEL,
};
use kube::Resource;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Build for `arch` derived from the MultiArchBuildConfig template
///
/// The template is copied as is except for the node selector, which pins the
/// build to `arch`, and the output name, which gets `-<arch>` appended. The
/// Build is labelled with the owner name and the architecture and is owned
/// by the MultiArchBuildConfig.
pub fn build_for_architecture(mabc: &MultiArchBuildConfig, arch: &str) -> Result<Build, ControllerError> {
    let key = ObjectKey::from_resource(mabc);
    let owner = mabc.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::InvalidResource(format!("MultiArchBuildConfig {} has no uid", key))
    })?;

    let mut common_spec = mabc.spec.build_spec.common_spec.clone();
    common_spec.node_selector = Some(BTreeMap::from([(
        NODE_ARCHITECTURE_LABEL.to_string(),
        arch.to_string(),
    )]));
    common_spec.output.to = common_spec.output.to.map(|to| to.with_name_suffix(arch));

    let mut build = Build::new(
        &format!("{}-{}", key.name, arch),
        BuildSpec {
            common_spec,
            ..Default::default()
        },
    );
    build.metadata.namespace = Some(key.namespace);
    build.metadata.labels = Some(BTreeMap::from([
        (MULTI_ARCH_BUILD_CONFIG_NAME_LABEL.to_string(), key.name),
        (MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL.to_string(), arch.to_string()),
    ]));
    build.metadata.owner_references = Some(vec![owner]);
    Ok(build)
}

/// Whether `build` is the `arch` Build this MultiArchBuildConfig fans out to
///
/// Requires both labels and a controller owner reference carrying the
/// object's uid.
pub fn is_owned_build(build: &Build, mabc: &MultiArchBuildConfig, arch: &str) -> bool {
    let Some(uid) = mabc.metadata.uid.as_deref() else {
        return false;
    };

    build.label(MULTI_ARCH_BUILD_CONFIG_NAME_LABEL) == mabc.metadata.name.as_deref()
        && build.label(MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL) == Some(arch)
        && build
            .metadata
            .owner_references
            .iter()
            .flatten()
            .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}

/// Create the Builds for `architectures`, stopping at the first failure
///
/// A Build that already exists counts as created only when it is ours: the
/// label listing the caller decided from may lag behind the API server. A
/// foreign Build holding the name is a creation failure.
pub async fn create_builds(
    client: &dyn ClusterClientTrait,
    mabc: &MultiArchBuildConfig,
    architectures: &[String],
) -> Result<(), ControllerError> {
    let creation_error = |reason: String| ControllerError::BuildCreation {
        architectures: architectures.join(","),
        reason,
    };

    for arch in architectures {
        let build = build_for_architecture(mabc, arch).map_err(|e| creation_error(e.to_string()))?;
        let key = ObjectKey::from_resource(&build);

        match client.create_build(&build).await {
            Ok(_) => info!("Created Build {} for architecture {}", key, arch),
            Err(ControllerError::AlreadyExists(_)) => match client.get_build(&key).await {
                Ok(Some(existing)) if is_owned_build(&existing, mabc, arch) => {
                    debug!("Build {} already exists", key)
                }
                Ok(_) => {
                    return Err(creation_error(format!(
                        "couldn't create build {}: a build with that name exists and is not owned by this MultiArchBuildConfig",
                        key
                    )));
                }
                Err(e) => return Err(creation_error(format!("couldn't create build {}: {}", key, e))),
            },
            Err(e) => return Err(creation_error(format!("couldn't create build {}: {}", key, e))),
        }
    }

    Ok(())
}
