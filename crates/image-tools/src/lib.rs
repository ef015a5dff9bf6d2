//! Multi-arch image publishing tools
//!
//! Thin wrappers around the external binaries the multi-arch build controller
//! shells out to:
//!
//! - [`ManifestToolPusher`]: `manifest-tool push from-args`, assembling the
//!   per-architecture build outputs into one manifest list
//! - [`OcImageMirrorer`]: `oc image mirror`, copying the manifest list to
//!   external registries
//!
//! Both sit behind traits so the controller can be tested without the binaries.
//! Enable the `test-util` feature for recording mocks.

pub mod command;
pub mod error;
pub mod image_mirror;
pub mod manifest_pusher;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use command::CommandOutput;
pub use error::ImageToolError;
pub use image_mirror::{image_mirror_args, ImageMirrorer, OcImageMirrorer};
pub use manifest_pusher::{ManifestPusher, ManifestToolPusher};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockImageMirrorer, MockManifestPusher, PushCall};
