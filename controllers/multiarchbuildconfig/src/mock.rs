//! In-memory cluster for unit testing reconcilers
//!
//! Keeps MultiArchBuildConfigs and Builds in maps and enforces
//! resourceVersion checks on status writes the way the API server does.

use crate::client::{ClusterClientTrait, ObjectKey};
use crate::error::ControllerError;
use crds::{Build, BuildPhase, BuildStatus, MultiArchBuildConfig, MULTI_ARCH_BUILD_CONFIG_NAME_LABEL};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    mabcs: BTreeMap<ObjectKey, MultiArchBuildConfig>,
    builds: BTreeMap<ObjectKey, Build>,
    resource_version: u64,
    /// Status writes to reject with a conflict before letting one through
    pending_conflicts: u32,
    /// Build names whose creation fails with the given message
    create_failures: BTreeMap<String, String>,
    status_writes: u32,
    create_calls: u32,
}

impl State {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// Mock ClusterClientTrait sharing its store between clones
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    state: Arc<Mutex<State>>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a MultiArchBuildConfig as if a user applied it
    pub fn add_multi_arch_build_config(&self, mut mabc: MultiArchBuildConfig) -> ObjectKey {
        let mut state = self.state.lock().unwrap();
        let key = ObjectKey::from_resource(&mabc);
        mabc.metadata.resource_version = Some(state.next_resource_version());
        state.mabcs.insert(key.clone(), mabc);
        key
    }

    pub fn multi_arch_build_config(&self, key: &ObjectKey) -> Option<MultiArchBuildConfig> {
        self.state.lock().unwrap().mabcs.get(key).cloned()
    }

    /// Store a Build as if it already existed
    pub fn add_build(&self, mut build: Build) -> ObjectKey {
        let mut state = self.state.lock().unwrap();
        let key = ObjectKey::from_resource(&build);
        build.metadata.resource_version = Some(state.next_resource_version());
        state.builds.insert(key.clone(), build);
        key
    }

    pub fn builds(&self) -> Vec<Build> {
        self.state.lock().unwrap().builds.values().cloned().collect()
    }

    /// Move a stored Build to `phase`, as the build system would
    pub fn set_build_phase(&self, key: &ObjectKey, phase: BuildPhase) {
        let mut state = self.state.lock().unwrap();
        let resource_version = state.next_resource_version();
        if let Some(build) = state.builds.get_mut(key) {
            build.metadata.resource_version = Some(resource_version);
            build.status.get_or_insert_with(BuildStatus::default).phase = phase;
        }
    }

    /// Reject the next `count` status writes with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().unwrap().pending_conflicts = count;
    }

    /// Fail creation of the Build called `name`
    pub fn fail_build_create(&self, name: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .create_failures
            .insert(name.to_string(), message.to_string());
    }

    /// Successful status writes so far
    pub fn status_writes(&self) -> u32 {
        self.state.lock().unwrap().status_writes
    }

    /// Build creations attempted so far
    pub fn create_calls(&self) -> u32 {
        self.state.lock().unwrap().create_calls
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_multi_arch_build_config(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<MultiArchBuildConfig>, ControllerError> {
        Ok(self.multi_arch_build_config(key))
    }

    async fn update_multi_arch_build_config_status(
        &self,
        mabc: &MultiArchBuildConfig,
    ) -> Result<MultiArchBuildConfig, ControllerError> {
        let mut state = self.state.lock().unwrap();
        let key = ObjectKey::from_resource(mabc);

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            // Somebody else wrote in between
            let resource_version = state.next_resource_version();
            if let Some(stored) = state.mabcs.get_mut(&key) {
                stored.metadata.resource_version = Some(resource_version);
            }
            return Err(ControllerError::Conflict(format!("MultiArchBuildConfig {}", key)));
        }

        let stored_version = match state.mabcs.get(&key) {
            Some(stored) => stored.metadata.resource_version.clone(),
            None => return Err(ControllerError::NotFound(format!("MultiArchBuildConfig {}", key))),
        };
        if stored_version != mabc.metadata.resource_version {
            return Err(ControllerError::Conflict(format!(
                "MultiArchBuildConfig {}: resourceVersion {:?} is stale",
                key, mabc.metadata.resource_version
            )));
        }

        let resource_version = state.next_resource_version();
        let written = {
            let stored = state
                .mabcs
                .get_mut(&key)
                .ok_or_else(|| ControllerError::NotFound(key.to_string()))?;
            stored.status = mabc.status.clone();
            stored.metadata.resource_version = Some(resource_version);
            stored.clone()
        };
        state.status_writes += 1;
        Ok(written)
    }

    async fn list_builds(&self, namespace: &str, mabc_name: &str) -> Result<Vec<Build>, ControllerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .builds
            .iter()
            .filter(|(key, build)| {
                key.namespace == namespace && build.label(MULTI_ARCH_BUILD_CONFIG_NAME_LABEL) == Some(mabc_name)
            })
            .map(|(_, build)| build.clone())
            .collect())
    }

    async fn get_build(&self, key: &ObjectKey) -> Result<Option<Build>, ControllerError> {
        Ok(self.state.lock().unwrap().builds.get(key).cloned())
    }

    async fn create_build(&self, build: &Build) -> Result<Build, ControllerError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;

        let key = ObjectKey::from_resource(build);
        if let Some(message) = state.create_failures.get(&key.name) {
            return Err(ControllerError::InvalidResource(message.clone()));
        }
        if state.builds.contains_key(&key) {
            return Err(ControllerError::AlreadyExists(format!("Build {}", key)));
        }

        let mut created = build.clone();
        created.metadata.resource_version = Some(state.next_resource_version());
        created.metadata.uid = Some(format!("uid-{}", key.name));
        state.builds.insert(key, created.clone());
        Ok(created)
    }
}
