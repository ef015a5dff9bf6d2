//! Controller-specific error types.
//!
//! Errors raised by the MultiArchBuildConfig controller that are not covered
//! by upstream library errors.

use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the MultiArchBuildConfig Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Write rejected because the object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object to create exists already
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Object vanished between read and write
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object is missing data the controller relies on
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// One or more per-architecture builds could not be created
    #[error("couldn't create builds for architectures: {architectures}: {reason}")]
    BuildCreation { architectures: String, reason: String },

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Maps an API error status onto the variants the reconcilers branch on
    pub fn from_api(err: KubeError, what: impl std::fmt::Display) -> Self {
        match err {
            KubeError::Api(ae) if ae.code == 409 => {
                ControllerError::Conflict(format!("{}: {}", what, ae.message))
            }
            KubeError::Api(ae) if ae.code == 404 => {
                ControllerError::NotFound(format!("{}: {}", what, ae.message))
            }
            other => ControllerError::Kube(other),
        }
    }
}
