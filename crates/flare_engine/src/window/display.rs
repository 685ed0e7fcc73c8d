//! All windows of one engine, keyed by title
//!
//! The display is the single owner of the platform and of every window, so
//! "which context is current" is plain state here rather than a
//! process-wide global. The first window created becomes the default
//! window; the current window is whichever was created or activated last.
//!
//! A window is only swapped when it may have been drawn since its last
//! swap, that is after it became current or after [`Display::begin_frame`].
//! Switching away from such a window presents it; [`Display::present`]
//! presents the current one. Each drawn window is therefore swapped exactly
//! once, however the frame hops between windows.

use super::{NativeWindowId, Platform, Window, WindowError};
use crate::input::InputEvent;
use crate::render::device::DeviceRef;

/// Owner of the windowing platform and its windows
pub struct Display {
    platform: Box<dyn Platform>,
    windows: Vec<Window>,
    default_window: Option<String>,
    current_window: Option<String>,
    needs_swap: bool,
}

impl Display {
    /// Wrap a platform; nothing is initialized yet
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            platform,
            windows: Vec::new(),
            default_window: None,
            current_window: None,
            needs_swap: false,
        }
    }

    /// Start the windowing subsystem
    pub fn init(&mut self) -> Result<(), WindowError> {
        self.platform.init().map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        log::info!("Windowing initialized ({})", self.platform.name());
        Ok(())
    }

    /// Windowing subsystem is running
    pub fn is_initialized(&self) -> bool {
        self.platform.is_initialized()
    }

    /// Open a window and make it current
    ///
    /// Titles are unique: a second window with a live title is rejected.
    pub fn create_window(&mut self, title: &str, width: u32, height: u32) -> Result<&Window, WindowError> {
        if self.window(title).is_some() {
            log::warn!("Window '{}' already exists", title);
            return Err(WindowError::DuplicateTitle(title.to_string()));
        }
        if self.needs_swap {
            if let Some(outgoing) = self.current_index() {
                self.windows[outgoing].swap(self.platform.as_mut());
            }
        }
        let window = Window::create(self.platform.as_mut(), title, width, height)?;
        self.needs_swap = false;
        if self.default_window.is_none() {
            self.default_window = Some(title.to_string());
        }
        self.current_window = Some(title.to_string());
        self.windows.push(window);
        Ok(&self.windows[self.windows.len() - 1])
    }

    /// Destroy a window by title; returns whether it existed
    ///
    /// When the default window goes, the oldest remaining window becomes
    /// the default. When the current window goes, the default becomes
    /// current.
    pub fn destroy_window(&mut self, title: &str) -> bool {
        let Some(index) = self.windows.iter().position(|w| w.title() == title) else {
            return false;
        };
        let mut window = self.windows.remove(index);
        window.destroy(self.platform.as_mut());

        if self.default_window.as_deref() == Some(title) {
            self.default_window = self.windows.first().map(|w| w.title().to_string());
        }
        if self.current_window.as_deref() == Some(title) {
            self.current_window = None;
            self.needs_swap = false;
            if let Some(default) = self.default_window.clone() {
                if let Some(next) = self.windows.iter().find(|w| w.title() == default) {
                    next.activate(self.platform.as_mut());
                }
                self.current_window = Some(default);
            }
        }
        true
    }

    /// Make a window current, presenting the outgoing one first if it was
    /// drawn
    ///
    /// Activating the window that is already current does nothing.
    pub fn activate_window(&mut self, title: &str) -> Result<(), WindowError> {
        if self.current_window.as_deref() == Some(title) {
            return Ok(());
        }
        let Some(target) = self.windows.iter().position(|w| w.title() == title) else {
            return Err(WindowError::UnknownWindow(title.to_string()));
        };
        self.swap_current();
        self.windows[target].activate(self.platform.as_mut());
        self.current_window = Some(title.to_string());
        self.needs_swap = true;
        Ok(())
    }

    /// Mark the current window as about to be drawn
    pub fn begin_frame(&mut self) {
        self.needs_swap = self.current_index().is_some();
    }

    /// End-of-frame swap of the current window, if it was drawn
    pub fn present(&mut self) {
        self.swap_current();
    }

    fn swap_current(&mut self) {
        if !self.needs_swap {
            return;
        }
        if let Some(current) = self.current_index() {
            self.windows[current].swap(self.platform.as_mut());
        }
        self.needs_swap = false;
    }

    fn current_index(&self) -> Option<usize> {
        let title = self.current_window.as_deref()?;
        self.windows.iter().position(|w| w.title() == title)
    }

    /// Destroy the window the platform asked to close; returns its title
    pub fn handle_close(&mut self, native: NativeWindowId) -> Option<String> {
        let title = self.window_by_native(native)?.title().to_string();
        self.destroy_window(&title);
        Some(title)
    }

    /// Record a window's new drawable size
    pub fn handle_resize(&mut self, native: NativeWindowId, width: u32, height: u32) -> Option<&Window> {
        let window = self.windows.iter_mut().find(|w| w.native() == native)?;
        window.set_size(width, height);
        log::debug!("Window '{}' resized to {}x{}", window.title(), width, height);
        Some(window)
    }

    /// Next pending platform event, drain style
    pub fn poll_event(&mut self) -> Option<InputEvent> {
        self.platform.poll_event()
    }

    /// Load the graphics device from the current window's context
    pub fn create_device(&mut self) -> Result<DeviceRef, WindowError> {
        let Some(index) = self.current_index() else {
            return Err(WindowError::NotInitialized);
        };
        let native = self.windows[index].native();
        self.platform.create_device(native)
    }

    /// Capture or release the cursor in the current window
    pub fn set_cursor_locked(&mut self, locked: bool) {
        if let Some(index) = self.current_index() {
            let native = self.windows[index].native();
            self.platform.set_cursor_locked(native, locked);
        }
    }

    /// Window by title
    pub fn window(&self, title: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.title() == title)
    }

    /// Window by platform id
    pub fn window_by_native(&self, native: NativeWindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.native() == native)
    }

    /// Live windows in creation order
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Number of live windows
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Title of the default window
    pub fn default_window(&self) -> Option<&str> {
        self.default_window.as_deref()
    }

    /// Title of the current window
    pub fn current_window(&self) -> Option<&str> {
        self.current_window.as_deref()
    }

    /// The current window
    pub fn current(&self) -> Option<&Window> {
        self.current_index().map(|index| &self.windows[index])
    }

    /// Destroy every window and stop the platform; safe to call repeatedly
    pub fn shutdown(&mut self) {
        for window in &mut self.windows {
            window.destroy(self.platform.as_mut());
        }
        self.windows.clear();
        self.needs_swap = false;
        self.default_window = None;
        self.current_window = None;
        if self.platform.is_initialized() {
            self.platform.shutdown();
            log::info!("Windowing shut down");
        }
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("platform", &self.platform.name())
            .field("windows", &self.windows)
            .field("default_window", &self.default_window)
            .field("current_window", &self.current_window)
            .finish()
    }
}
