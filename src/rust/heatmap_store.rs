use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::session::{ClassificationResult, HeatmapError};

/// Saves decoded Grad-CAM heat maps to disk so they can be opened outside the terminal.
#[derive(Debug, Clone)]
pub struct HeatmapStore {
    heatmaps_dir: PathBuf,
}

impl HeatmapStore {
    /// Returns the default heat-map directory path
    pub fn get_default_heatmaps_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("DENTASCAN_CACHE") {
            return PathBuf::from(path).join("heatmaps");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("dentascan").join("heatmaps");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("dentascan").join("heatmaps");
        }

        env::temp_dir().join("dentascan").join("heatmaps")
    }

    pub fn new<P: AsRef<Path>>(heatmaps_dir: P) -> std::io::Result<Self> {
        let heatmaps_dir = heatmaps_dir.as_ref().to_path_buf();
        fs::create_dir_all(&heatmaps_dir)?;
        Ok(Self { heatmaps_dir })
    }

    /// Writes the result's heat map as `<sha256 prefix>.png` and returns its path.
    ///
    /// Returns `Ok(None)` when the result carries no heat map. Identical
    /// heat maps map to the same file.
    pub fn save(&self, result: &ClassificationResult) -> Result<Option<PathBuf>, HeatmapError> {
        let Some(decoded) = result.decode_heatmap() else {
            return Ok(None);
        };
        let heatmap = decoded?;

        let mut hasher = Sha256::new();
        hasher.update(&heatmap.png);
        let hash = format!("{:x}", hasher.finalize());
        let path = self.heatmaps_dir.join(format!("{}.png", &hash[..16]));

        if !path.exists() {
            log::info!("Writing {} byte heatmap to {:?}", heatmap.png.len(), path);
            fs::write(&path, &heatmap.png)?;
        } else {
            log::debug!("Heatmap already stored at {:?}", path);
        }
        Ok(Some(path))
    }

    /// Saves into the default directory, creating it only when there is a heat map to write.
    pub fn save_default(result: &ClassificationResult) -> Result<Option<PathBuf>, HeatmapError> {
        Self::save_in(Self::get_default_heatmaps_dir(), result)
    }

    /// Saves into `heatmaps_dir`, creating it only when there is a heat map to write.
    pub fn save_in<P: AsRef<Path>>(
        heatmaps_dir: P,
        result: &ClassificationResult,
    ) -> Result<Option<PathBuf>, HeatmapError> {
        if result.heatmap_image.is_none() {
            return Ok(None);
        }
        Self::new(heatmaps_dir)?.save(result)
    }

    /// Writes the result's heat map to an explicit location.
    ///
    /// Does not touch the cache directory, so it works without a store.
    pub fn save_to<P: AsRef<Path>>(
        result: &ClassificationResult,
        path: P,
    ) -> Result<Option<PathBuf>, HeatmapError> {
        let Some(decoded) = result.decode_heatmap() else {
            return Ok(None);
        };
        let heatmap = decoded?;
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        log::info!("Writing {} byte heatmap to {:?}", heatmap.png.len(), path);
        fs::write(path, &heatmap.png)?;
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ClassificationResult;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{ImageBuffer, ImageFormat, Luma};
    use std::io::Cursor;

    fn result_with_heatmap() -> ClassificationResult {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Luma([200]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        ClassificationResult {
            predicted_disease: "Caries".into(),
            condition: "Severe".into(),
            confidence: "97%".into(),
            advice: "See a dentist".into(),
            heatmap_image: Some(STANDARD.encode(png)),
        }
    }

    #[test]
    fn test_save_heatmap() -> Result<(), Box<dyn std::error::Error>> {
        let store = HeatmapStore::new(env::temp_dir().join("dentascan-test").join("heatmaps"))?;
        let result = result_with_heatmap();

        let path = store.save(&result)?.expect("heatmap present");
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(store.save(&result)?, Some(path.clone()));

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_save_without_heatmap() -> Result<(), Box<dyn std::error::Error>> {
        let store = HeatmapStore::new(env::temp_dir().join("dentascan-test").join("heatmaps"))?;
        let mut result = result_with_heatmap();
        result.heatmap_image = None;
        assert_eq!(store.save(&result)?, None);
        Ok(())
    }

    #[test]
    fn test_save_in_unwritable_dir() -> Result<(), Box<dyn std::error::Error>> {
        let root = env::temp_dir().join("dentascan-test");
        fs::create_dir_all(&root)?;
        let blocker = root.join("not-a-dir");
        fs::write(&blocker, b"file")?;

        let err = HeatmapStore::save_in(blocker.join("heatmaps"), &result_with_heatmap()).unwrap_err();
        assert!(matches!(err, HeatmapError::Io(_)));

        let mut result = result_with_heatmap();
        result.heatmap_image = None;
        assert_eq!(HeatmapStore::save_in(blocker.join("heatmaps"), &result)?, None);
        Ok(())
    }

    #[test]
    fn test_save_to_explicit_path() -> Result<(), Box<dyn std::error::Error>> {
        let target = env::temp_dir().join("dentascan-test").join("out").join("gradcam.png");
        let written = HeatmapStore::save_to(&result_with_heatmap(), &target)?;
        assert_eq!(written.as_deref(), Some(target.as_path()));
        assert!(fs::read(&target)?.starts_with(&[0x89, b'P', b'N', b'G']));
        fs::remove_file(&target)?;
        Ok(())
    }

    #[test]
    fn test_default_heatmaps_dir() {
        env::set_var("DENTASCAN_CACHE", "/tmp/dentascan-cache");
        let path = HeatmapStore::get_default_heatmaps_dir();
        assert!(path.to_str().unwrap().contains("/tmp/dentascan-cache/heatmaps"));
        env::remove_var("DENTASCAN_CACHE");

        let path = HeatmapStore::get_default_heatmaps_dir();
        assert!(path.to_str().unwrap().contains("dentascan"));
    }
}
