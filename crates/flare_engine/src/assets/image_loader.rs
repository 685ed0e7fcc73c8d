//! Image loading utilities for texture data
//!
//! Decodes PNG and JPEG files with the `image` crate. Channel layout is kept
//! as close to the file as possible: images with alpha decode to RGBA, the
//! rest to RGB.

use super::AssetError;
use std::path::{Path, PathBuf};

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Tightly packed 8-bit pixel rows, top row first
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                AssetError::NotFound(path_ref.display().to_string())
            }
            other => AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), other)),
        })?;
        Ok(Self::from_dynamic(img))
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;
        Ok(Self::from_dynamic(img))
    }

    fn from_dynamic(img: image::DynamicImage) -> Self {
        if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                data: rgba.into_raw(),
                width,
                height,
                channels: 4,
            }
        } else {
            let rgb = img.to_rgb8();
            let (width, height) = rgb.dimensions();
            Self {
                data: rgb.into_raw(),
                width,
                height,
                channels: 3,
            }
        }
    }

    /// Create a solid color RGBA image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
            channels: 4,
        }
    }

    /// Reverse the row order in place
    pub fn flip_vertically(&mut self) {
        let row = self.row_bytes();
        if row == 0 {
            return;
        }
        let rows = self.height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (head, tail) = self.data.split_at_mut(bottom * row);
            head[top * row..(top + 1) * row].swap_with_slice(&mut tail[..row]);
        }
    }

    /// Bytes in one pixel row
    pub fn row_bytes(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Pixel data length matches the declared dimensions
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.row_bytes() * self.height as usize
    }
}

/// Provider of decoded images by name
pub trait ImageSource {
    /// Decode the named image
    fn load_image(&self, name: &str) -> Result<ImageData, AssetError>;
}

/// Decodes images from a directory prefix
#[derive(Debug, Clone)]
pub struct FileImageSource {
    base_path: PathBuf,
}

impl FileImageSource {
    /// Decode files below `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl ImageSource for FileImageSource {
    fn load_image(&self, name: &str) -> Result<ImageData, AssetError> {
        ImageData::from_file(self.base_path.join(name))
    }
}

/// Pre-decoded images keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: std::collections::HashMap<String, ImageData>,
}

impl MemoryImageSource {
    /// Empty image set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an image
    pub fn with_image(mut self, name: impl Into<String>, image: ImageData) -> Self {
        self.images.insert(name.into(), image);
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn load_image(&self, name: &str) -> Result<ImageData, AssetError> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}
