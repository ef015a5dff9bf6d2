//! Image mirroring via `oc image mirror`

use crate::command;
use crate::error::ImageToolError;
use tracing::info;

/// Copies an image (manifest lists included) to other registries
#[async_trait::async_trait]
pub trait ImageMirrorer: Send + Sync {
    /// `images[0]` is the source, every following entry a destination
    async fn mirror(&self, images: &[String]) -> Result<(), ImageToolError>;
}

/// Source followed by destinations, duplicates removed keeping first-seen order
pub fn image_mirror_args(src: &str, destinations: &[String]) -> Vec<String> {
    let mut images = Vec::with_capacity(destinations.len() + 1);
    images.push(src.to_string());
    for destination in destinations {
        if !images[1..].contains(destination) {
            images.push(destination.clone());
        }
    }
    images
}

/// `oc image mirror` backed mirrorer
#[derive(Debug, Clone)]
pub struct OcImageMirrorer {
    binary: String,
    registry_config: String,
}

impl OcImageMirrorer {
    pub fn new(binary: impl Into<String>, registry_config: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            registry_config: registry_config.into(),
        }
    }

    /// Full argument list passed to `oc`
    pub fn args(&self, images: &[String]) -> Result<Vec<String>, ImageToolError> {
        if images.len() < 2 {
            return Err(ImageToolError::InvalidInput(format!(
                "image mirror needs a source and at least one destination, got {:?}",
                images
            )));
        }

        let mut args = vec![
            "image".to_string(),
            "mirror".to_string(),
            "--insecure=true".to_string(),
            "--keep-manifest-list=true".to_string(),
            format!("--registry-config={}", self.registry_config),
        ];
        args.extend(images.iter().cloned());
        Ok(args)
    }
}

#[async_trait::async_trait]
impl ImageMirrorer for OcImageMirrorer {
    async fn mirror(&self, images: &[String]) -> Result<(), ImageToolError> {
        let args = self.args(images)?;
        command::run(&self.binary, &args).await?;
        info!(source = %images[0], destinations = images.len() - 1, "Mirrored image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_image_mirror_args() {
        let cases = [
            (
                "one destination",
                strings(&["dst-registry.com/dst-image:latest"]),
                strings(&["src-registry.com/src-image:latest", "dst-registry.com/dst-image:latest"]),
            ),
            (
                "multiple destinations",
                strings(&["dst-registry.com/dst-image-1:latest", "dst-registry.com/dst-image-2:latest"]),
                strings(&[
                    "src-registry.com/src-image:latest",
                    "dst-registry.com/dst-image-1:latest",
                    "dst-registry.com/dst-image-2:latest",
                ]),
            ),
            (
                "duplicate destinations",
                strings(&[
                    "dst-registry.com/dst-image-1:latest",
                    "dst-registry.com/dst-image-2:latest",
                    "dst-registry.com/dst-image-2:latest",
                ]),
                strings(&[
                    "src-registry.com/src-image:latest",
                    "dst-registry.com/dst-image-1:latest",
                    "dst-registry.com/dst-image-2:latest",
                ]),
            ),
        ];

        for (name, destinations, want) in cases {
            assert_eq!(
                image_mirror_args("src-registry.com/src-image:latest", &destinations),
                want,
                "{name}"
            );
        }
    }

    #[test]
    fn test_image_mirror_args_keep_first_seen_order() {
        let destinations = strings(&["z.io/img", "a.io/img", "z.io/img", "m.io/img", "a.io/img"]);
        assert_eq!(
            image_mirror_args("src", &destinations),
            strings(&["src", "z.io/img", "a.io/img", "m.io/img"])
        );
    }

    #[test]
    fn test_image_mirror_args_destination_equal_to_source_is_kept() {
        assert_eq!(image_mirror_args("src", &strings(&["src"])), strings(&["src", "src"]));
    }

    #[test]
    fn test_oc_args() {
        let mirrorer = OcImageMirrorer::new("oc", "/etc/docker/config.json");
        let args = mirrorer.args(&strings(&["src", "dst"])).unwrap();
        assert_eq!(
            args,
            strings(&[
                "image",
                "mirror",
                "--insecure=true",
                "--keep-manifest-list=true",
                "--registry-config=/etc/docker/config.json",
                "src",
                "dst",
            ])
        );
    }

    #[test]
    fn test_oc_args_need_destination() {
        let mirrorer = OcImageMirrorer::new("oc", "/etc/docker/config.json");
        assert!(matches!(
            mirrorer.args(&strings(&["src"])),
            Err(ImageToolError::InvalidInput(_))
        ));
    }
}
