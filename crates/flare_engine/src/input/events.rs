//! Platform-neutral events delivered by the windowing layer

use super::keys::{Key, MouseButton};
use crate::window::NativeWindowId;

/// One event drained from the platform queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The application was asked to quit
    Quit,
    /// The user asked to close a specific window
    WindowClose(NativeWindowId),
    /// A window's drawable area changed size
    Resized {
        /// Affected window
        window: NativeWindowId,
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// A key went down
    KeyDown(Key),
    /// A key went up
    KeyUp(Key),
    /// The cursor moved
    MouseMove {
        /// New cursor x
        x: f32,
        /// New cursor y
        y: f32,
        /// Horizontal motion since the last move event
        rel_x: f32,
        /// Vertical motion since the last move event
        rel_y: f32,
    },
    /// A mouse button went down
    MouseButtonDown(MouseButton),
    /// A mouse button went up
    MouseButtonUp(MouseButton),
    /// Vertical wheel motion
    MouseWheel(f32),
}
