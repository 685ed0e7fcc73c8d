//! # Core Engine Module
//!
//! Engine-wide settings shared by the window layer, the asset boundary and
//! the frame loop.

pub mod config;

pub use config::{
    AssetConfig, CameraControlConfig, Config, ConfigError, ContextConfig, EngineConfig,
    ProjectionConfig, TimingConfig, WindowConfig,
};
