//! # Flare Engine
//!
//! A small OpenGL rendering framework: windows with their graphics
//! contexts, double-buffered input, a fly camera, shaders, textures and
//! meshes, tied together by a single-threaded frame loop.
//!
//! ## Features
//!
//! - **Frame loop**: fixed event → update → render → present ordering
//! - **Input**: level and edge queries over per-frame snapshots
//! - **GPU wrappers**: shaders with reflected uniforms, textures, primitives
//!   sharing vertex buffers, materials and lights
//! - **Headless testing**: scripted platform and recording device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flare_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn update(&mut self, ctx: &mut FrameContext<'_>, _delta_time: f32) -> Result<(), AppError> {
//!         if ctx.input().was_down(Key::Escape) {
//!             ctx.exit_now();
//!         }
//!         Ok(())
//!     }
//!
//!     fn render(&mut self, ctx: &mut FrameContext<'_>, _delta_time: f32) -> Result<(), AppError> {
//!         clear_screen(ctx.device().as_ref(), 0.1, 0.1, 0.1);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let platform = GlfwPlatform::new(&config.context, &config.window);
//!     let mut engine = Engine::new(config, Box::new(platform));
//!     engine.init(Camera::at(Vec3::new(0.0, 0.0, 3.0)), MyApp)?;
//!     engine.create_window("Sandbox", 1280, 720)?;
//!     engine.run()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod assets;
pub mod config;
pub mod foundation;
pub mod input;
pub mod render;
pub mod window;

mod application;
mod engine;

pub use application::{AppError, Application, FnApplication, FrameCallback};
pub use engine::{Engine, EngineError, FrameContext};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{FileImageSource, FileShaderSource, ImageSource, ShaderSource},
        core::EngineConfig,
        foundation::math::{Mat4, Vec2, Vec3, Vec4},
        input::{InputEvent, Key, MouseButton},
        render::{
            bind_material, clear_screen, Camera, CameraMovement, ColorMaterial, DeviceRef, LightColor,
            Material, PointLight, Primitive, RenderItem, Shader, Texture, VertexLayout,
        },
        window::{GlfwPlatform, HeadlessPlatform},
        AppError, Application, Engine, EngineError, FrameContext,
    };
}
