//! Application trait and lifecycle management

use crate::assets::AssetError;
use crate::engine::{EngineError, FrameContext};
use crate::render::{PrimitiveError, ShaderError, TextureError};
use crate::window::WindowError;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive the engine's frame loop. Every hook gets a
/// [`FrameContext`] with the camera, input state, graphics device and
/// windows of the running engine.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once from [`Engine::run`](crate::Engine::run) before the first
    /// frame, with the graphics device available. Load shaders, textures and
    /// meshes here.
    fn initialize(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        Ok(())
    }

    /// Update the application
    ///
    /// Called every frame after input events were processed and before
    /// rendering. Edge queries (`was_up` / `was_down`) see this frame's
    /// transitions here.
    ///
    /// # Arguments
    /// * `ctx` - Engine state for this frame
    /// * `delta_time` - Frame time in seconds, raw or smoothed per config
    fn update(&mut self, ctx: &mut FrameContext<'_>, delta_time: f32) -> Result<(), AppError>;

    /// Render the application
    ///
    /// Called after update with the default window current.
    fn render(&mut self, ctx: &mut FrameContext<'_>, delta_time: f32) -> Result<(), AppError>;

    /// Cleanup the application
    ///
    /// Called once when the loop ends, also when a hook failed. GPU objects
    /// still owned by the application should be released here, while the
    /// context is alive.
    fn cleanup(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Shader failed to load or compile
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Texture failed to load
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    /// Mesh could not be built or uploaded
    #[error("Primitive error: {0}")]
    Primitive(#[from] PrimitiveError),

    /// Window operation failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}

/// Per-frame callback taking the frame context and the delta time
pub type FrameCallback = Box<dyn FnMut(&mut FrameContext<'_>, f32)>;

/// [`Application`] built from a render and an update closure
///
/// This is what [`Engine::init_with_callbacks`](crate::Engine::init_with_callbacks)
/// installs.
pub struct FnApplication {
    render: FrameCallback,
    update: FrameCallback,
}

impl FnApplication {
    /// Wrap two closures
    pub fn new(
        render: impl FnMut(&mut FrameContext<'_>, f32) + 'static,
        update: impl FnMut(&mut FrameContext<'_>, f32) + 'static,
    ) -> Self {
        Self {
            render: Box::new(render),
            update: Box::new(update),
        }
    }
}

impl Application for FnApplication {
    fn update(&mut self, ctx: &mut FrameContext<'_>, delta_time: f32) -> Result<(), AppError> {
        (self.update)(ctx, delta_time);
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>, delta_time: f32) -> Result<(), AppError> {
        (self.render)(ctx, delta_time);
        Ok(())
    }
}

impl std::fmt::Debug for FnApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnApplication").finish_non_exhaustive()
    }
}
