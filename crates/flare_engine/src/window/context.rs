//! One native window and its graphics context

use super::{NativeWindowId, Platform, WindowError};

/// A window with its own graphics context
///
/// A `Window` does not hold its platform; every operation takes it. The
/// [`Display`](super::Display) owning both makes sure they match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    title: String,
    width: u32,
    height: u32,
    alive: bool,
    native: NativeWindowId,
}

impl Window {
    /// Open a window and make its context current
    ///
    /// Fails when the platform is not initialized or cannot open the window.
    pub fn create(platform: &mut dyn Platform, title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
        if !platform.is_initialized() {
            log::error!("Cannot create window '{}': windowing not initialized", title);
            return Err(WindowError::NotInitialized);
        }
        let native = platform.create_window(title, width, height).map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        platform.make_current(native);
        log::info!("Created window '{}' ({}x{}) on {}", title, width, height, platform.name());

        Ok(Self {
            title: title.to_string(),
            width,
            height,
            alive: true,
            native,
        })
    }

    /// Make this window's context current; no-op once destroyed
    pub fn activate(&self, platform: &mut dyn Platform) {
        if self.alive {
            platform.make_current(self.native);
        }
    }

    /// Present the back buffer; no-op once destroyed or after the platform
    /// shut down
    pub fn swap(&self, platform: &mut dyn Platform) {
        if self.alive && platform.is_initialized() {
            platform.swap(self.native);
        }
    }

    /// Release the context and the window; safe to call repeatedly
    pub fn destroy(&mut self, platform: &mut dyn Platform) {
        if !self.alive {
            return;
        }
        if platform.is_initialized() {
            platform.destroy_window(self.native);
        }
        self.alive = false;
        log::info!("Destroyed window '{}'", self.title);
    }

    /// Record a new drawable size
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Width over height, 1 for a zero-height window
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Title, unique among live windows
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Drawable width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Drawable height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Not yet destroyed
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Platform id
    pub fn native(&self) -> NativeWindowId {
        self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{HeadlessPlatform, PlatformCall};
    use approx::assert_relative_eq;

    #[test]
    fn test_create_requires_initialized_platform() {
        let mut platform = HeadlessPlatform::new();
        assert_eq!(
            Window::create(&mut platform, "T", 800, 600),
            Err(WindowError::NotInitialized)
        );
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_create_makes_context_current() {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        let window = Window::create(&mut platform, "T", 800, 600).unwrap();
        assert!(window.is_alive());
        assert_eq!(platform.current(), Some(window.native()));
        assert_relative_eq!(window.aspect_ratio(), 800.0 / 600.0);
    }

    #[test]
    fn test_platform_failure_is_reported() {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        platform.fail_window_creation(true);
        assert!(matches!(
            Window::create(&mut platform, "T", 800, 600),
            Err(WindowError::CreationFailed { .. })
        ));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        let mut window = Window::create(&mut platform, "T", 800, 600).unwrap();
        window.destroy(&mut platform);
        window.destroy(&mut platform);
        let destroys = platform
            .calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::DestroyWindow(_)))
            .count();
        assert_eq!(destroys, 1);
        assert!(!window.is_alive());

        // Dead windows neither swap nor activate
        platform.clear_calls();
        window.swap(&mut platform);
        window.activate(&mut platform);
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_zero_height_aspect() {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        let mut window = Window::create(&mut platform, "T", 800, 600).unwrap();
        window.set_size(640, 0);
        assert_relative_eq!(window.aspect_ratio(), 1.0);
    }
}
