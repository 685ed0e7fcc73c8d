//! # Engine Configuration
//!
//! Every section has sensible defaults and the whole tree can be persisted
//! through [`Config`] as TOML or RON. Missing fields in a file fall back to
//! their defaults.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
pub use crate::foundation::time::DeltaMode;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial window settings
    pub window: WindowConfig,
    /// Graphics context requirements
    pub context: ContextConfig,
    /// Asset search paths
    pub assets: AssetConfig,
    /// Frame timing behaviour
    pub timing: TimingConfig,
    /// Clip planes used whenever the engine refreshes the camera projection
    pub projection: ProjectionConfig,
    /// Which input the engine routes to the camera
    pub camera: CameraControlConfig,
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Replace the window section
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the asset section
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Use the given delta mode
    pub fn with_delta_mode(mut self, delta: DeltaMode) -> Self {
        self.timing.delta = delta;
        self
    }

    /// Request a debug context or not
    pub fn with_debug_context(mut self, debug: bool) -> Self {
        self.context.debug = debug;
        self
    }
}

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title, also the key the engine stores the window under
    pub title: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Wait for vertical sync on swap
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "flare".to_string(),
            width: 1280,
            height: 720,
            vsync: false,
        }
    }
}

impl WindowConfig {
    /// Window with the given title and size
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Default::default()
        }
    }
}

/// OpenGL context requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Major GL version
    pub major: u32,
    /// Minor GL version
    pub minor: u32,
    /// Create a debug context and route driver messages to the log
    pub debug: bool,
    /// Depth buffer bits
    pub depth_bits: u32,
    /// Stencil buffer bits
    pub stencil_bits: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            major: 4,
            minor: 6,
            debug: cfg!(debug_assertions),
            depth_bits: 24,
            stencil_bits: 8,
        }
    }
}

/// Where shader sources and texture images are loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory prefix for `.vs` / `.fs` files
    pub shader_path: String,
    /// Directory prefix for texture images
    pub texture_path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            shader_path: "./assets/shaders/".to_string(),
            texture_path: "./assets/textures/".to_string(),
        }
    }
}

impl AssetConfig {
    /// Set the shader directory
    pub fn with_shader_path(mut self, path: impl Into<String>) -> Self {
        self.shader_path = path.into();
        self
    }

    /// Set the texture directory
    pub fn with_texture_path(mut self, path: impl Into<String>) -> Self {
        self.texture_path = path.into();
        self
    }
}

/// Frame timing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Raw or smoothed frame delta
    pub delta: DeltaMode,
    /// Seconds between frame-rate trace lines
    pub fps_log_interval: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            delta: DeltaMode::default(),
            fps_log_interval: 1.0,
        }
    }
}

/// Clip planes for engine-driven projection updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { near: 0.1, far: 100.0 }
    }
}

/// Camera input routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraControlConfig {
    /// Feed mouse motion into the camera's yaw and pitch
    pub mouse_look: bool,
}

impl Default for CameraControlConfig {
    fn default() -> Self {
        Self { mouse_look: true }
    }
}
