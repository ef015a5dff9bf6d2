//! Controller configuration loaded from environment variables.

use crate::backoff::RetryConfig;
use crate::error::ControllerError;
use std::env;

pub const DEFAULT_ARCHITECTURES: &[&str] = &["amd64", "arm64"];
pub const DEFAULT_REGISTRY_URL: &str = "image-registry.openshift-image-registry.svc:5000";
pub const DEFAULT_MANIFEST_TOOL_BIN: &str = "manifest-tool";
pub const DEFAULT_OC_BIN: &str = "oc";

/// Runtime settings of the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Architectures every MultiArchBuildConfig is built for, in order
    pub architectures: Vec<String>,
    /// Registry credentials handed to manifest-tool and oc
    pub docker_config_path: String,
    /// In-cluster registry the per-architecture images land in
    pub registry_url: String,
    pub manifest_tool_bin: String,
    pub oc_bin: String,
    /// Namespace to watch, all namespaces when unset
    pub namespace: Option<String>,
    pub status_retry: RetryConfig,
}

impl ControllerConfig {
    /// Reads the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ARCHITECTURES` | `amd64,arm64` |
    /// | `DOCKER_CONFIG_PATH` | required |
    /// | `REGISTRY_URL` | in-cluster OpenShift registry |
    /// | `MANIFEST_TOOL_BIN` | `manifest-tool` |
    /// | `OC_BIN` | `oc` |
    /// | `WATCH_NAMESPACE` | all namespaces |
    /// | `STATUS_UPDATE_RETRIES` | `4` |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let architectures = match non_empty("ARCHITECTURES") {
            Some(raw) => parse_architectures(&raw)?,
            None => DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect(),
        };

        let docker_config_path = non_empty("DOCKER_CONFIG_PATH").ok_or_else(|| {
            ControllerError::InvalidConfig(
                "DOCKER_CONFIG_PATH environment variable is required".to_string(),
            )
        })?;

        let mut status_retry = RetryConfig::default();
        if let Some(raw) = non_empty("STATUS_UPDATE_RETRIES") {
            status_retry.attempts = raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "STATUS_UPDATE_RETRIES must be a positive integer, got {:?}",
                    raw
                ))
            })?;
        }

        Ok(Self {
            architectures,
            docker_config_path,
            registry_url: non_empty("REGISTRY_URL").unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
            manifest_tool_bin: non_empty("MANIFEST_TOOL_BIN")
                .unwrap_or_else(|| DEFAULT_MANIFEST_TOOL_BIN.to_string()),
            oc_bin: non_empty("OC_BIN").unwrap_or_else(|| DEFAULT_OC_BIN.to_string()),
            namespace: non_empty("WATCH_NAMESPACE"),
            status_retry,
        })
    }
}

/// Comma separated list, blanks and duplicates dropped
fn parse_architectures(raw: &str) -> Result<Vec<String>, ControllerError> {
    let mut architectures: Vec<String> = Vec::new();
    for arch in raw.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !architectures.iter().any(|a| a == arch) {
            architectures.push(arch.to_string());
        }
    }

    if architectures.is_empty() {
        return Err(ControllerError::InvalidConfig(format!(
            "ARCHITECTURES does not name any architecture: {:?}",
            raw
        )));
    }
    Ok(architectures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DOCKER_CONFIG_PATH", "/etc/docker/config.json")]).unwrap();
        assert_eq!(config.architectures, vec!["amd64", "arm64"]);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.manifest_tool_bin, "manifest-tool");
        assert_eq!(config.oc_bin, "oc");
        assert_eq!(config.namespace, None);
        assert_eq!(config.status_retry.attempts, 4);
    }

    #[test]
    fn test_docker_config_path_is_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));

        let err = config_from(&[("DOCKER_CONFIG_PATH", "  ")]).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_architectures_parsing() {
        let config = config_from(&[
            ("DOCKER_CONFIG_PATH", "/cfg"),
            ("ARCHITECTURES", " arm64, ,amd64,arm64,s390x "),
        ])
        .unwrap();
        assert_eq!(config.architectures, vec!["arm64", "amd64", "s390x"]);

        let err = config_from(&[("DOCKER_CONFIG_PATH", "/cfg"), ("ARCHITECTURES", " , ,")]).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DOCKER_CONFIG_PATH", "/cfg"),
            ("REGISTRY_URL", "registry.local:5000"),
            ("MANIFEST_TOOL_BIN", "/usr/local/bin/manifest-tool"),
            ("OC_BIN", "/usr/bin/oc"),
            ("WATCH_NAMESPACE", "ci"),
            ("STATUS_UPDATE_RETRIES", "7"),
        ])
        .unwrap();
        assert_eq!(config.registry_url, "registry.local:5000");
        assert_eq!(config.manifest_tool_bin, "/usr/local/bin/manifest-tool");
        assert_eq!(config.oc_bin, "/usr/bin/oc");
        assert_eq!(config.namespace.as_deref(), Some("ci"));
        assert_eq!(config.status_retry.attempts, 7);
    }

    #[test]
    fn test_invalid_retry_count() {
        for raw in ["0", "-1", "many"] {
            let err = config_from(&[("DOCKER_CONFIG_PATH", "/cfg"), ("STATUS_UPDATE_RETRIES", raw)])
                .unwrap_err();
            assert!(matches!(err, ControllerError::InvalidConfig(_)), "{raw}");
        }
    }
}
