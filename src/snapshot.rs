//! Camera snapshot for the image pane.

use crate::errors::AssetError;
use image::imageops::FilterType;
use image::RgbImage;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Where the pane's pixels came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(PathBuf),
    Placeholder,
}

/// Image for the pane next to the readouts, always exactly the configured size.
///
/// The terminal panel prints a summary of it (size and source) rather than
/// the pixels; `image` holds the resized frame for frontends that draw it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub image: RgbImage,
    pub source: SnapshotSource,
}

impl Snapshot {
    /// Solid black image of the given size.
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
            source: SnapshotSource::Placeholder,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == SnapshotSource::Placeholder
    }
}

/// Opens `path` and resizes it to exactly `width` x `height`.
pub fn try_load_snapshot(path: &Path, width: u32, height: u32) -> Result<RgbImage, AssetError> {
    let img = image::open(path).map_err(|e| AssetError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8())
}

/// Loads the snapshot, substituting a black placeholder when no path is
/// configured or the file cannot be read. Never fails.
pub fn load_snapshot(path: Option<&Path>, width: u32, height: u32) -> Snapshot {
    let Some(path) = path else {
        info!("No camera image configured, using {}x{} placeholder", width, height);
        return Snapshot::placeholder(width, height);
    };

    match try_load_snapshot(path, width, height) {
        Ok(image) => {
            info!("Loaded camera image {} ({}x{})", path.display(), width, height);
            Snapshot {
                image,
                source: SnapshotSource::File(path.to_path_buf()),
            }
        }
        Err(e) => {
            warn!("{}. Using {}x{} placeholder instead.", e, width, height);
            Snapshot::placeholder(width, height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn all_black(image: &RgbImage) -> bool {
        image.pixels().all(|p| *p == Rgb([0, 0, 0]))
    }

    #[test]
    fn test_missing_file_gives_black_placeholder() {
        let snapshot = load_snapshot(Some(Path::new("/no/such/dir/cam_image.jpg")), 400, 500);
        assert!(snapshot.is_placeholder());
        assert_eq!(snapshot.dimensions(), (400, 500));
        assert!(all_black(&snapshot.image));
    }

    #[test]
    fn test_no_path_gives_placeholder() {
        let snapshot = load_snapshot(None, 40, 50);
        assert_eq!(snapshot.source, SnapshotSource::Placeholder);
        assert_eq!(snapshot.dimensions(), (40, 50));
    }

    #[test]
    fn test_undecodable_file_gives_placeholder() {
        let path = std::env::temp_dir().join(format!("sensor_dashboard_garbage_{}.png", std::process::id()));
        std::fs::write(&path, b"not an image").unwrap();
        let snapshot = load_snapshot(Some(&path), 400, 500);
        std::fs::remove_file(&path).ok();
        assert!(snapshot.is_placeholder());
        assert!(matches!(
            try_load_snapshot(Path::new("/no/such/file.png"), 1, 1),
            Err(AssetError::Open { .. })
        ));
    }

    #[test]
    fn test_existing_image_is_resized_to_target() {
        let path = std::env::temp_dir().join(format!("sensor_dashboard_cam_{}.png", std::process::id()));
        RgbImage::from_pixel(16, 9, Rgb([200, 120, 40])).save(&path).unwrap();

        let snapshot = load_snapshot(Some(&path), 400, 500);
        std::fs::remove_file(&path).ok();

        assert_eq!(snapshot.source, SnapshotSource::File(path.clone()));
        assert_eq!(snapshot.dimensions(), (400, 500));
        assert!(!all_black(&snapshot.image));
    }
}
