//! Recording image tool mocks for unit testing
//!
//! These mocks never spawn a process. They record every call and return
//! either success or a configured failure message.

use crate::error::ImageToolError;
use crate::image_mirror::ImageMirrorer;
use crate::manifest_pusher::ManifestPusher;
use crds::Build;
use std::sync::{Arc, Mutex};

/// One recorded `push_image_with_manifest` call
#[derive(Debug, Clone, PartialEq)]
pub struct PushCall {
    /// Names of the builds handed to the pusher
    pub build_names: Vec<String>,
    pub target_image_ref: String,
}

/// Mock ManifestPusher
#[derive(Debug, Clone, Default)]
pub struct MockManifestPusher {
    calls: Arc<Mutex<Vec<PushCall>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl MockManifestPusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose pushes fail with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.set_error(Some(message.into()));
        mock
    }

    /// Change the outcome of subsequent calls
    pub fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap() = message;
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<PushCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ManifestPusher for MockManifestPusher {
    async fn push_image_with_manifest(
        &self,
        builds: &[Build],
        target_image_ref: &str,
    ) -> Result<(), ImageToolError> {
        self.calls.lock().unwrap().push(PushCall {
            build_names: builds
                .iter()
                .map(|b| b.metadata.name.clone().unwrap_or_default())
                .collect(),
            target_image_ref: target_image_ref.to_string(),
        });
        match self.error.lock().unwrap().clone() {
            Some(message) => Err(ImageToolError::InvalidInput(message)),
            None => Ok(()),
        }
    }
}

/// Mock ImageMirrorer
#[derive(Debug, Clone, Default)]
pub struct MockImageMirrorer {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl MockImageMirrorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose mirrors fail with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.set_error(Some(message.into()));
        mock
    }

    pub fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap() = message;
    }

    /// Image lists passed to every call so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ImageMirrorer for MockImageMirrorer {
    async fn mirror(&self, images: &[String]) -> Result<(), ImageToolError> {
        self.calls.lock().unwrap().push(images.to_vec());
        match self.error.lock().unwrap().clone() {
            Some(message) => Err(ImageToolError::InvalidInput(message)),
            None => Ok(()),
        }
    }
}
