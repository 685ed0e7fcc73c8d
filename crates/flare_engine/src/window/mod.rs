//! Window management subsystem
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │     Engine / Application        │
//! └─────────────┬───────────────────┘
//!               │ owns
//!         ┌─────▼─────┐
//!         │  Display  │ ← windows by title, default and current window
//!         └─────┬─────┘
//!               │ drives
//!      ┌────────▼────────┐
//!      │ Platform trait  │ ← native windows, contexts, event queue
//!      └────────┬────────┘
//!               │ implemented by
//!   ┌───────────▼───────────┐
//!   │ GlfwPlatform          │ ← OpenGL core contexts through GLFW
//!   │ HeadlessPlatform      │ ← scripted events for tests
//!   └───────────────────────┘
//! ```
//!
//! # Context Rules
//!
//! Exactly one window's context is current at a time. Creating a window
//! makes it current; switching windows presents the outgoing one if it was
//! drawn.
//! The graphics device is created once, from the first window's context.

mod context;
mod display;
mod glfw_platform;
mod headless;
mod platform;

pub use context::Window;
pub use display::Display;
pub use glfw_platform::GlfwPlatform;
pub use headless::{HeadlessPlatform, PlatformCall};
pub use platform::Platform;

use crate::render::device::DeviceError;
use thiserror::Error;

/// Platform-assigned window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWindowId(pub u32);

/// Window management errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The windowing subsystem has not been initialized
    #[error("windowing subsystem not initialized")]
    NotInitialized,

    /// The windowing subsystem failed to start
    #[error("windowing subsystem initialization failed: {0}")]
    InitializationFailed(String),

    /// The platform could not create a window or its context
    #[error("failed to create window '{title}': {reason}")]
    CreationFailed {
        /// Requested title
        title: String,
        /// Platform explanation
        reason: String,
    },

    /// A live window already uses this title
    #[error("a window titled '{0}' already exists")]
    DuplicateTitle(String),

    /// No window with this title
    #[error("no window titled '{0}'")]
    UnknownWindow(String),

    /// The graphics device could not be created from a context
    #[error("graphics device creation failed: {0}")]
    Device(#[from] DeviceError),
}
