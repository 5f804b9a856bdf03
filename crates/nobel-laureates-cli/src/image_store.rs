//! Portrait persistence on the local filesystem.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::PathBuf;
use url::Url;

use nobel_laureates::{HarvestError, HarvestResult, ImageStore, StorageRef};

/// Subdirectory of the store root holding full-size images.
const FULL_DIR: &str = "full";

const JPEG_QUALITY: u8 = 90;

/// Writes each image as an RGB JPEG named after the SHA-256 of its source
/// URL, so the same source always lands at the same path.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Relative path for an image fetched from `source`.
pub fn relative_path(source: &Url) -> String {
    let digest = Sha256::digest(source.as_str().as_bytes());
    format!("{FULL_DIR}/{}.jpg", hex::encode(digest))
}

/// Convert to RGB. Images with an alpha channel are composited over white
/// so transparent regions do not come out black.
fn flatten(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let over_white = |c: u8| {
            let (c, a) = (u16::from(c), u16::from(a));
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

/// Decode any supported format and re-encode as JPEG.
fn transcode(bytes: &[u8]) -> HarvestResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| HarvestError::Image(format!("undecodable image: {e}")))?;
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), JPEG_QUALITY);
    flatten(img)
        .write_with_encoder(encoder)
        .map_err(|e| HarvestError::Image(format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, bytes: &[u8], source: &Url) -> HarvestResult<StorageRef> {
        let owned = bytes.to_vec();
        let jpeg = tokio::task::spawn_blocking(move || transcode(&owned))
            .await
            .map_err(|e| HarvestError::Image(format!("transcode task failed: {e}")))??;

        let relative = relative_path(source);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, jpeg).await?;
        tracing::debug!("stored {source} at {}", path.display());

        Ok(StorageRef(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb([200, 10, 10]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn rgba_png(pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 4, pixel);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn close_to(actual: Rgb<u8>, expected: [u8; 3]) -> bool {
        actual
            .0
            .iter()
            .zip(expected)
            .all(|(a, e)| a.abs_diff(e) <= 4)
    }

    #[test]
    fn test_relative_path_is_stable_hash() {
        let url = Url::parse("https://upload.wikimedia.org/a.jpg").unwrap();
        let path = relative_path(&url);
        assert_eq!(path, relative_path(&url));
        assert!(path.starts_with("full/"));
        assert!(path.ends_with(".jpg"));
        assert_eq!(path.len(), "full/".len() + 64 + ".jpg".len());
    }

    #[tokio::test]
    async fn test_store_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let url = Url::parse("https://upload.wikimedia.org/a.png").unwrap();

        let reference = store.store(&png_bytes(), &url).await.unwrap();
        assert_eq!(reference.as_str(), relative_path(&url));

        let written = std::fs::read(dir.path().join(reference.as_str())).unwrap();
        assert_eq!(
            image::guess_format(&written).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_flatten_blends_alpha_over_white() {
        let transparent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(*flatten(transparent).get_pixel(0, 0), Rgb([255, 255, 255]));

        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(*flatten(opaque).get_pixel(0, 0), Rgb([10, 20, 30]));

        let half = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        assert_eq!(*flatten(half).get_pixel(0, 0), Rgb([127, 127, 127]));
    }

    #[tokio::test]
    async fn test_transparent_png_stored_on_white() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let url = Url::parse("https://upload.wikimedia.org/clear.png").unwrap();

        let reference = store.store(&rgba_png(Rgba([0, 0, 0, 0])), &url).await.unwrap();
        let written = std::fs::read(dir.path().join(reference.as_str())).unwrap();
        let decoded = image::load_from_memory(&written).unwrap().to_rgb8();
        let pixel = *decoded.get_pixel(1, 1);
        assert!(close_to(pixel, [255, 255, 255]), "got {pixel:?}");
    }

    #[tokio::test]
    async fn test_undecodable_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let url = Url::parse("https://upload.wikimedia.org/a.jpg").unwrap();

        let result = store.store(b"not an image", &url).await;
        assert!(matches!(result, Err(HarvestError::Image(_))));
        assert!(!dir.path().join(relative_path(&url)).exists());
    }
}
