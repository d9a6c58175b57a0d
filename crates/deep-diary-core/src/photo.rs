//! Photo loading and PNG re-encoding for the caption upload.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use tracing::debug;

use crate::error::{DiaryError, Result};

/// Thumbnails are fit inside this many pixels on each side.
pub const THUMBNAIL_SIZE: u32 = 64;

/// Image types the uploader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}

/// Raw photo bytes as picked by the user, plus the declared type.
///
/// Only lives until it has been re-encoded and handed to the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// What the UI keeps around to show the most recent photo.
#[derive(Debug, Clone)]
pub struct PhotoPreview {
    pub file_name: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub thumbnail: RgbImage,
}

/// A decoded photo ready to be displayed and sent.
#[derive(Debug, Clone)]
pub struct PreparedPhoto {
    pub preview: PhotoPreview,
    pub png: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, kind: ImageKind, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            bytes,
        }
    }

    /// Read a photo from disk, taking the declared type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let kind = ImageKind::from_extension(ext)
            .ok_or_else(|| DiaryError::UnsupportedImage(path.display().to_string()))?;

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(file_name, kind, bytes))
    }

    /// The declared type only gates what is accepted; the format is sniffed from the bytes.
    fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }

    /// Decode once, then produce both the preview and the canonical PNG stream.
    pub fn prepare(&self) -> Result<PreparedPhoto> {
        debug!(
            file = %self.file_name,
            mime = self.kind.mime(),
            bytes = self.bytes.len(),
            "re-encoding photo as png"
        );
        let img = self.decode()?;
        let (width, height) = img.dimensions();

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

        let thumbnail = img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgb8();

        Ok(PreparedPhoto {
            preview: PhotoPreview {
                file_name: self.file_name.clone(),
                kind: self.kind,
                width,
                height,
                thumbnail,
            },
            png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(ImageKind::from_extension("JPG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_extension("gif"), None);
        assert_eq!(ImageKind::Png.mime(), "image/png");
    }

    #[test]
    fn test_jpeg_is_reencoded_as_png() {
        let upload = UploadedImage::new(
            "today.jpg",
            ImageKind::Jpeg,
            encoded(10, 6, ImageOutputFormat::Jpeg(90)),
        );
        let prepared = upload.prepare().unwrap();

        assert!(prepared.png.starts_with(&PNG_SIGNATURE));
        assert_eq!((prepared.preview.width, prepared.preview.height), (10, 6));
        assert_eq!(prepared.preview.file_name, "today.jpg");
    }

    #[test]
    fn test_thumbnail_fits_bounds() {
        let upload = UploadedImage::new(
            "wide.png",
            ImageKind::Png,
            encoded(256, 128, ImageOutputFormat::Png),
        );
        let preview = upload.prepare().unwrap().preview;

        assert!(preview.thumbnail.width() <= THUMBNAIL_SIZE);
        assert!(preview.thumbnail.height() <= THUMBNAIL_SIZE);
        assert_eq!((preview.width, preview.height), (256, 128));
    }

    #[test]
    fn test_png_named_jpg_is_decoded_from_contents() {
        let upload = UploadedImage::new(
            "actually_png.jpg",
            ImageKind::Jpeg,
            encoded(5, 4, ImageOutputFormat::Png),
        );
        let prepared = upload.prepare().unwrap();

        assert!(prepared.png.starts_with(&PNG_SIGNATURE));
        assert_eq!((prepared.preview.width, prepared.preview.height), (5, 4));
        assert_eq!(prepared.preview.kind, ImageKind::Jpeg);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let upload = UploadedImage::new("fake.png", ImageKind::Png, b"not an image".to_vec());
        assert!(matches!(upload.prepare(), Err(DiaryError::Image(_))));
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = UploadedImage::from_path(&path).unwrap_err();
        assert!(matches!(err, DiaryError::UnsupportedImage(_)));
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.PNG");
        std::fs::write(&path, encoded(3, 3, ImageOutputFormat::Png)).unwrap();

        let upload = UploadedImage::from_path(&path).unwrap();
        assert_eq!(upload.kind, ImageKind::Png);
        assert_eq!(upload.file_name, "photo.PNG");
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadedImage::from_path(dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, DiaryError::Io(_)));
    }
}
