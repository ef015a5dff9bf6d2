//! Test utilities for unit testing reconcilers
//!
//! Helpers for creating test resources and wiring a reconciler to mocks.

use crate::backoff::RetryConfig;
use crate::mock::MockClusterClient;
use crate::reconciler::Reconciler;
use crds::{
    Build, BuildPhase, BuildSpec, BuildStatus, ImageReference, MultiArchBuildConfig,
    MultiArchBuildConfigSpec, MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL, MULTI_ARCH_BUILD_CONFIG_NAME_LABEL,
};
use image_tools::{MockImageMirrorer, MockManifestPusher};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::BTreeMap;
use std::time::Duration;

pub const TEST_REGISTRY_URL: &str = "image-registry.openshift-image-registry.svc:5000";

/// MultiArchBuildConfig pushing to the `<name>:latest` image stream tag of its namespace
pub fn create_test_mabc(name: &str, namespace: &str) -> MultiArchBuildConfig {
    let mut spec = MultiArchBuildConfigSpec::default();
    spec.build_spec.common_spec.output.to =
        Some(ImageReference::image_stream_tag(namespace, format!("{}:latest", name)));
    spec.build_spec.common_spec.strategy = Some(serde_json::json!({"type": "Docker"}));

    let mut mabc = MultiArchBuildConfig::new(name, spec);
    mabc.metadata.namespace = Some(namespace.to_string());
    mabc.metadata.uid = Some(format!("uid-{}", name));
    mabc
}

/// Build as the fan-out would have created it, in the given phase
pub fn create_test_build(mabc_name: &str, namespace: &str, arch: &str, phase: BuildPhase) -> Build {
    let mut spec = BuildSpec::default();
    spec.common_spec.output.to = Some(ImageReference::image_stream_tag(
        namespace,
        format!("{}:latest-{}", mabc_name, arch),
    ));

    let mut build = Build::new(&format!("{}-{}", mabc_name, arch), spec);
    build.metadata.namespace = Some(namespace.to_string());
    build.metadata.labels = Some(BTreeMap::from([
        (MULTI_ARCH_BUILD_CONFIG_NAME_LABEL.to_string(), mabc_name.to_string()),
        (MULTI_ARCH_BUILD_CONFIG_ARCH_LABEL.to_string(), arch.to_string()),
    ]));
    build.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "ci.openshift.io/v1".to_string(),
        kind: "MultiArchBuildConfig".to_string(),
        name: mabc_name.to_string(),
        uid: format!("uid-{}", mabc_name),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]);
    build.status = Some(BuildStatus {
        phase,
        ..Default::default()
    });
    build
}

/// Status retry without noticeable sleeps
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        attempts: 4,
        initial_delay: Duration::from_millis(1),
        factor: 1.0,
        jitter: 0.0,
    }
}

/// Mocks behind a reconciler, kept so tests can drive and inspect them
pub struct TestHarness {
    pub client: MockClusterClient,
    pub pusher: MockManifestPusher,
    pub mirrorer: MockImageMirrorer,
    pub reconciler: Reconciler,
}

/// Reconciler for `amd64,arm64` backed by fresh mocks
pub fn create_test_reconciler() -> TestHarness {
    let client = MockClusterClient::new();
    let pusher = MockManifestPusher::new();
    let mirrorer = MockImageMirrorer::new();

    let reconciler = Reconciler::new(
        Box::new(client.clone()),
        Box::new(pusher.clone()),
        Box::new(mirrorer.clone()),
        vec!["amd64".to_string(), "arm64".to_string()],
        TEST_REGISTRY_URL.to_string(),
        fast_retry(),
    );

    TestHarness {
        client,
        pusher,
        mirrorer,
        reconciler,
    }
}
