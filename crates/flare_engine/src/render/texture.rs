//! # 2D Textures
//!
//! Decoded through an [`ImageSource`], uploaded with repeat wrapping, linear
//! filtering and a full mipmap chain. The CPU copy of the pixels is dropped
//! as soon as the upload is done.

use crate::assets::{AssetError, ImageSource};
use crate::render::device::{
    DeviceError, DeviceRef, PixelFormat, TextureFilter, TextureId, TextureUpload, TextureWrap,
};
use thiserror::Error;

/// Texture errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The image could not be decoded
    #[error("texture {name} could not be decoded: {source}")]
    Decode {
        /// Texture name
        name: String,
        /// Underlying asset error
        source: AssetError,
    },

    /// The image has a channel count with no pixel format
    #[error("texture {name} has {channels} channels, expected 1 to 4")]
    UnsupportedChannels {
        /// Texture name
        name: String,
        /// Channel count found
        channels: u8,
    },

    /// Pixel data does not match the declared dimensions
    #[error("texture {0} pixel data does not match its dimensions")]
    InvalidData(String),

    /// The device refused to allocate a texture
    #[error("texture allocation failed: {0}")]
    Device(#[from] DeviceError),
}

/// GPU texture loaded from a named image
pub struct Texture {
    device: DeviceRef,
    name: String,
    id: Option<TextureId>,
    width: u32,
    height: u32,
}

impl Texture {
    /// Create an unloaded texture for the image called `name`
    pub fn new(device: DeviceRef, name: impl Into<String>) -> Self {
        Self {
            device,
            name: name.into(),
            id: None,
            width: 0,
            height: 0,
        }
    }

    /// Decode and upload the image
    ///
    /// # Arguments
    /// * `images` - Where to decode the image from
    /// * `flip` - Reverse row order so the first row is the bottom, as GL samples it
    ///
    /// On error the texture stays unloaded and nothing is allocated.
    pub fn load(&mut self, images: &dyn ImageSource, flip: bool) -> Result<(), TextureError> {
        let mut image = images.load_image(&self.name).map_err(|source| {
            log::error!("Failed to load texture {}: {}", self.name, source);
            TextureError::Decode {
                name: self.name.clone(),
                source,
            }
        })?;

        let format = PixelFormat::from_channels(image.channels).ok_or_else(|| TextureError::UnsupportedChannels {
            name: self.name.clone(),
            channels: image.channels,
        })?;
        if !image.is_consistent() {
            return Err(TextureError::InvalidData(self.name.clone()));
        }
        if flip {
            image.flip_vertically();
        }

        let id = self.device.create_texture()?;
        self.device.upload_texture_2d(
            id,
            &TextureUpload {
                width: image.width,
                height: image.height,
                format,
                pixels: &image.data,
                wrap: TextureWrap::Repeat,
                filter: TextureFilter::Linear,
                generate_mipmaps: true,
            },
        );

        self.unload();
        self.id = Some(id);
        self.width = image.width;
        self.height = image.height;
        log::info!("Loaded texture {} ({}x{}, {:?})", self.name, self.width, self.height, format);
        Ok(())
    }

    /// Select texture unit `slot`
    pub fn activate_slot(&self, slot: u32) {
        self.device.active_texture_unit(slot);
    }

    /// Bind to texture unit `slot`
    ///
    /// # Panics
    /// If the texture has not been loaded.
    pub fn bind(&self, slot: u32) {
        let Some(id) = self.id else {
            panic!("texture '{}' bound before a successful load", self.name);
        };
        self.activate_slot(slot);
        self.device.bind_texture_2d(Some(id));
    }

    /// Release the GPU texture; safe to call repeatedly
    pub fn unload(&mut self) {
        if let Some(id) = self.id.take() {
            self.device.delete_texture(id);
            log::debug!("Texture {} unloaded", self.name);
        }
    }

    /// Image name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device handle, absent until loaded
    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    /// A texture is resident
    pub fn is_loaded(&self) -> bool {
        self.id.is_some()
    }

    /// Width in pixels of the loaded image
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels of the loaded image
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.unload();
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageData, MemoryImageSource};
    use crate::render::device::HeadlessDevice;
    use std::rc::Rc;

    fn rgb(width: u32, height: u32) -> ImageData {
        ImageData {
            data: vec![128; (width * height * 3) as usize],
            width,
            height,
            channels: 3,
        }
    }

    #[test]
    fn test_load_uploads_with_sampling_state() {
        let device = Rc::new(HeadlessDevice::new());
        let images = MemoryImageSource::new().with_image("container.png", rgb(4, 2));
        let mut texture = Texture::new(device.clone(), "container.png");
        texture.load(&images, true).unwrap();

        let id = texture.id().unwrap();
        let info = device.texture_info(id).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        assert_eq!(info.format, PixelFormat::Rgb);
        assert_eq!(info.wrap, TextureWrap::Repeat);
        assert_eq!(info.filter, TextureFilter::Linear);
        assert!(info.mipmaps);
        assert_eq!(info.bytes, 24);
        assert_eq!((texture.width(), texture.height()), (4, 2));
    }

    #[test]
    fn test_rgba_images_use_rgba_format() {
        let device = Rc::new(HeadlessDevice::new());
        let images = MemoryImageSource::new().with_image("face.png", ImageData::solid_color(2, 2, [1, 2, 3, 4]));
        let mut texture = Texture::new(device.clone(), "face.png");
        texture.load(&images, false).unwrap();
        assert_eq!(device.texture_info(texture.id().unwrap()).unwrap().format, PixelFormat::Rgba);
    }

    #[test]
    fn test_decode_failure_leaves_texture_unloaded() {
        let device = Rc::new(HeadlessDevice::new());
        let mut texture = Texture::new(device.clone(), "missing.png");
        let err = texture.load(&MemoryImageSource::new(), true).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
        assert!(!texture.is_loaded());
        assert!(device.live_textures().is_empty());
    }

    #[test]
    fn test_unsupported_channel_count() {
        let device = Rc::new(HeadlessDevice::new());
        let odd = ImageData {
            data: vec![0; 5],
            width: 1,
            height: 1,
            channels: 5,
        };
        let images = MemoryImageSource::new().with_image("odd", odd);
        let mut texture = Texture::new(device, "odd");
        assert!(matches!(
            texture.load(&images, true),
            Err(TextureError::UnsupportedChannels { channels: 5, .. })
        ));
    }

    #[test]
    fn test_bind_activates_slot_then_binds() {
        let device = Rc::new(HeadlessDevice::new());
        let images = MemoryImageSource::new().with_image("a", rgb(1, 1));
        let mut texture = Texture::new(device.clone(), "a");
        texture.load(&images, true).unwrap();
        texture.bind(3);
        assert_eq!(device.bound_texture(3), texture.id());
    }

    #[test]
    #[should_panic(expected = "bound before a successful load")]
    fn test_bind_unloaded_fails_fast() {
        let device = Rc::new(HeadlessDevice::new());
        Texture::new(device, "a").bind(0);
    }

    #[test]
    fn test_unload_is_idempotent_and_drop_releases() {
        let device = Rc::new(HeadlessDevice::new());
        let images = MemoryImageSource::new().with_image("a", rgb(1, 1));
        let mut texture = Texture::new(device.clone(), "a");
        texture.load(&images, true).unwrap();
        texture.unload();
        texture.unload();
        assert!(device.live_textures().is_empty());

        texture.load(&images, true).unwrap();
        assert_eq!(device.live_textures().len(), 1);
        drop(texture);
        assert!(device.live_textures().is_empty());
    }
}
