//! Asset boundary
//!
//! Shaders and textures never touch the filesystem directly; they read
//! through [`ShaderSource`] and [`ImageSource`] so tests and embedders can
//! supply data from memory.

pub mod image_loader;
pub mod shader_source;

pub use image_loader::{FileImageSource, ImageData, ImageSource, MemoryImageSource};
pub use shader_source::{FileShaderSource, MemorySource, ShaderSource};

use thiserror::Error;

/// Asset errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
