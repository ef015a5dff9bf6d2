//! CI build CRD Definitions
//!
//! Kubernetes resource definitions shared by the multi-arch build controller:
//! the `MultiArchBuildConfig` custom resource and the OpenShift `Build`
//! objects it fans out to.

pub mod build;
pub mod conditions;
pub mod multi_arch_build_config;
pub mod references;

pub use build::*;
pub use conditions::*;
pub use multi_arch_build_config::*;
pub use references::*;
