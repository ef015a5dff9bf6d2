//! Cluster access used by the reconcilers.
//!
//! Reconcilers never touch `kube::Api` directly. They go through
//! [`ClusterClientTrait`], which the controller backs with the API server and
//! the unit tests back with an in-memory store.

use crate::error::ControllerError;
use crds::{Build, MultiArchBuildConfig, MULTI_ARCH_BUILD_CONFIG_NAME_LABEL};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Namespace and name of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of any namespaced object, `default` namespace when unset
    pub fn from_resource<K: ResourceExt>(obj: &K) -> Self {
        Self::new(
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Operations the reconcilers need from the cluster
///
/// Absent objects are `Ok(None)`. A status write against a stale
/// `resourceVersion` fails with [`ControllerError::Conflict`]; creating an
/// object that exists fails with [`ControllerError::AlreadyExists`].
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    async fn get_multi_arch_build_config(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MultiArchBuildConfig>, ControllerError>;

    /// Writes `mabc.status` guarded by `mabc.metadata.resourceVersion`
    async fn update_multi_arch_build_config_status(
        &self,
        mabc: &MultiArchBuildConfig,
    ) -> Result<MultiArchBuildConfig, ControllerError>;

    /// Builds labelled with the given MultiArchBuildConfig name
    async fn list_builds(&self, namespace: &str, mabc_name: &str) -> Result<Vec<Build>, ControllerError>;

    async fn get_build(&self, key: &ObjectKey) -> Result<Option<Build>, ControllerError>;

    async fn create_build(&self, build: &Build) -> Result<Build, ControllerError>;
}

/// API server backed client
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn mabc_api(&self, namespace: &str) -> Api<MultiArchBuildConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn build_api(&self, namespace: &str) -> Api<Build> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_multi_arch_build_config(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MultiArchBuildConfig>, ControllerError> {
        Ok(self.mabc_api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update_multi_arch_build_config_status(
        &self,
        mabc: &MultiArchBuildConfig,
    ) -> Result<MultiArchBuildConfig, ControllerError> {
        let key = ObjectKey::from_resource(mabc);

        // resourceVersion in a merge patch turns the write into a
        // compare-and-swap: the API server answers 409 when it is stale
        let status_patch = json!({
            "metadata": { "resourceVersion": mabc.metadata.resource_version },
            "status": mabc.status,
        });

        debug!("Patching MultiArchBuildConfig {} status", key);
        self.mabc_api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await
            .map_err(|e| ControllerError::from_api(e, format!("MultiArchBuildConfig {}", key)))
    }

    async fn list_builds(&self, namespace: &str, mabc_name: &str) -> Result<Vec<Build>, ControllerError> {
        let params = ListParams::default()
            .labels(&format!("{}={}", MULTI_ARCH_BUILD_CONFIG_NAME_LABEL, mabc_name));
        Ok(self.build_api(namespace).list(&params).await?.items)
    }

    async fn get_build(&self, key: &ObjectKey) -> Result<Option<Build>, ControllerError> {
        Ok(self.build_api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_build(&self, build: &Build) -> Result<Build, ControllerError> {
        let key = ObjectKey::from_resource(build);
        match self.build_api(&key.namespace).create(&PostParams::default(), build).await {
            Ok(created) => Ok(created),
            // A create can only conflict with an existing object
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                Err(ControllerError::AlreadyExists(format!("Build {}: {}", key, ae.message)))
            }
            Err(e) => Err(ControllerError::from_api(e, format!("Build {}", key))),
        }
    }
}
