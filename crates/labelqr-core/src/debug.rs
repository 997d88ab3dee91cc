//! Optional dumping of intermediate images for troubleshooting crops.

use std::path::PathBuf;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::models::config::DebugConfig;

/// Writes intermediate images as PNG when enabled. Failures are logged only.
#[derive(Debug, Clone)]
pub struct DebugDumper {
    dir: Option<PathBuf>,
}

impl DebugDumper {
    pub fn from_config(config: &DebugConfig) -> Self {
        Self {
            dir: config.dump_images.then(|| config.dump_dir.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Save `image` as `<prefix>_<name>.png` in the dump directory.
    pub fn dump(&self, prefix: &str, name: &str, image: &DynamicImage) {
        let Some(dir) = &self.dir else {
            return;
        };

        if image.width() == 0 || image.height() == 0 {
            debug!("Skipping empty debug image {}_{}", prefix, name);
            return;
        }

        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Cannot create debug dir {}: {}", dir.display(), e);
            return;
        }

        let path = dir.join(format!("{}_{}.png", prefix, name));
        match image.save(&path) {
            Ok(()) => debug!("Wrote {}", path.display()),
            Err(e) => warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = DebugConfig {
            dump_images: false,
            dump_dir: dir.path().join("dump"),
        };
        let dumper = DebugDumper::from_config(&config);

        dumper.dump("page1", "crop", &DynamicImage::new_luma8(4, 4));
        assert!(!dumper.is_enabled());
        assert!(!config.dump_dir.exists());
    }

    #[test]
    fn test_enabled_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let config = DebugConfig {
            dump_images: true,
            dump_dir: dir.path().join("dump"),
        };
        let dumper = DebugDumper::from_config(&config);

        dumper.dump("page2", "crop_fallback", &DynamicImage::new_luma8(4, 4));
        dumper.dump("page2", "empty", &DynamicImage::new_luma8(0, 3));

        assert!(config.dump_dir.join("page2_crop_fallback.png").exists());
        assert!(!config.dump_dir.join("page2_empty.png").exists());
    }
}
