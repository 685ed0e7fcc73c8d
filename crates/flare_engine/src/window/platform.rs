//! Windowing boundary

use super::{NativeWindowId, WindowError};
use crate::input::InputEvent;
use crate::render::device::DeviceRef;

/// Native windows, their graphics contexts and the event queue
///
/// Implementations are driven from a single thread. Every method taking a
/// [`NativeWindowId`] ignores ids it does not know.
pub trait Platform {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Start the windowing subsystem
    fn init(&mut self) -> Result<(), WindowError>;

    /// `init` succeeded and `shutdown` has not run since
    fn is_initialized(&self) -> bool;

    /// Open a window with its own graphics context and make that context current
    fn create_window(&mut self, title: &str, width: u32, height: u32) -> Result<NativeWindowId, WindowError>;

    /// Make a window's context current
    fn make_current(&mut self, window: NativeWindowId);

    /// Present a window's back buffer
    fn swap(&mut self, window: NativeWindowId);

    /// Release a window's context, then the window
    fn destroy_window(&mut self, window: NativeWindowId);

    /// Next pending event
    ///
    /// Drain style: returns events until the queue is empty, then `None`
    /// once. The following call collects a fresh batch from the system.
    fn poll_event(&mut self) -> Option<InputEvent>;

    /// Load the graphics device from a window's context
    fn create_device(&mut self, window: NativeWindowId) -> Result<DeviceRef, WindowError>;

    /// Hide and capture the cursor, or release it
    fn set_cursor_locked(&mut self, window: NativeWindowId, locked: bool);

    /// Stop the windowing subsystem; windows still open are closed
    fn shutdown(&mut self);
}
