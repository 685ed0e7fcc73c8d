use super::events::InputEvent;
use super::keys::{Key, MouseButton, KEY_COUNT, MOUSE_BUTTON_COUNT};
use crate::foundation::math::Vec2;

/// Keyboard and mouse state at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSnapshot {
    keys: [bool; KEY_COUNT],
    buttons: [bool; MOUSE_BUTTON_COUNT],
    position: Vec2,
    scroll: f32,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            keys: [false; KEY_COUNT],
            buttons: [false; MOUSE_BUTTON_COUNT],
            position: Vec2::zeros(),
            scroll: 0.0,
        }
    }
}

impl InputSnapshot {
    /// Key held in this snapshot
    pub fn key(&self, key: Key) -> bool {
        self.keys[key.index()]
    }

    /// Button held in this snapshot
    pub fn button(&self, button: MouseButton) -> bool {
        self.buttons[button.index()]
    }

    /// Cursor position in this snapshot
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Last wheel delta recorded in this snapshot
    pub fn scroll(&self) -> f32 {
        self.scroll
    }
}

/// Double-buffered input store
///
/// A frame looks like this:
///
/// 1. the event pump calls [`InputManager::process`] for each drained event
/// 2. [`InputManager::begin_frame`] closes intake and opens queries
/// 3. callbacks query `is_*` / `was_*`
/// 4. [`InputManager::end_frame`] copies current into previous
///
/// `was_down` means *released this frame* (up now, down before) and `was_up`
/// means *pressed this frame* (down now, up before).
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    current: InputSnapshot,
    previous: InputSnapshot,
    in_frame: bool,
    cursor_locked: bool,
}

impl InputManager {
    /// Create a new input manager with everything released
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the current snapshot
    ///
    /// Events that carry no input state (quit, close, resize) are ignored.
    pub fn process(&mut self, event: &InputEvent) {
        debug_assert!(!self.in_frame, "input event processed while a frame is open for queries");
        match *event {
            InputEvent::KeyDown(key) => self.current.keys[key.index()] = true,
            InputEvent::KeyUp(key) => self.current.keys[key.index()] = false,
            InputEvent::MouseButtonDown(button) => self.current.buttons[button.index()] = true,
            InputEvent::MouseButtonUp(button) => self.current.buttons[button.index()] = false,
            InputEvent::MouseMove { x, y, .. } => self.current.position = Vec2::new(x, y),
            InputEvent::MouseWheel(delta) => self.current.scroll = delta,
            InputEvent::Quit | InputEvent::WindowClose(_) | InputEvent::Resized { .. } => {}
        }
    }

    /// Advance one frame: the current snapshot becomes the previous one
    pub fn update(&mut self) {
        self.previous = self.current;
    }

    /// Close event intake and open the snapshot for queries
    pub fn begin_frame(&mut self) {
        debug_assert!(!self.in_frame, "begin_frame called twice without end_frame");
        self.in_frame = true;
    }

    /// Close queries and advance the snapshots
    pub fn end_frame(&mut self) {
        debug_assert!(self.in_frame, "end_frame called without begin_frame");
        self.in_frame = false;
        self.update();
    }

    /// Key held now
    pub fn is_down(&self, key: Key) -> bool {
        self.current.key(key)
    }

    /// Key not held now
    pub fn is_up(&self, key: Key) -> bool {
        !self.current.key(key)
    }

    /// Key released this frame
    pub fn was_down(&self, key: Key) -> bool {
        !self.current.key(key) && self.previous.key(key)
    }

    /// Key pressed this frame
    pub fn was_up(&self, key: Key) -> bool {
        self.current.key(key) && !self.previous.key(key)
    }

    /// Button held now
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.current.button(button)
    }

    /// Button not held now
    pub fn is_button_up(&self, button: MouseButton) -> bool {
        !self.current.button(button)
    }

    /// Button released this frame
    pub fn was_button_down(&self, button: MouseButton) -> bool {
        !self.current.button(button) && self.previous.button(button)
    }

    /// Button pressed this frame
    pub fn was_button_up(&self, button: MouseButton) -> bool {
        self.current.button(button) && !self.previous.button(button)
    }

    /// Cursor position now
    pub fn position(&self) -> Vec2 {
        self.current.position
    }

    /// Cursor position at the end of the previous frame
    pub fn previous_position(&self) -> Vec2 {
        self.previous.position
    }

    /// Last wheel delta received
    pub fn scroll(&self) -> f32 {
        self.current.scroll
    }

    /// Current snapshot
    pub fn current(&self) -> &InputSnapshot {
        &self.current
    }

    /// Previous snapshot
    pub fn previous(&self) -> &InputSnapshot {
        &self.previous
    }

    /// Whether the cursor is captured by the window
    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    /// Record the cursor capture state; the engine forwards it to the platform
    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.cursor_locked = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(input: &mut InputManager, events: &[InputEvent]) {
        for event in events {
            input.process(event);
        }
        input.begin_frame();
    }

    #[test]
    fn test_press_edge_is_visible_for_one_frame() {
        let mut input = InputManager::new();
        frame(&mut input, &[InputEvent::KeyDown(Key::W)]);
        assert!(input.is_down(Key::W));
        assert!(input.was_up(Key::W));
        assert!(!input.was_down(Key::W));
        input.end_frame();

        frame(&mut input, &[]);
        assert!(input.is_down(Key::W));
        assert!(!input.was_up(Key::W));
        input.end_frame();
    }

    #[test]
    fn test_release_edge() {
        let mut input = InputManager::new();
        frame(&mut input, &[InputEvent::KeyDown(Key::Space)]);
        input.end_frame();
        frame(&mut input, &[InputEvent::KeyUp(Key::Space)]);
        assert!(input.is_up(Key::Space));
        assert!(input.was_down(Key::Space));
        assert!(!input.was_up(Key::Space));
        input.end_frame();
        frame(&mut input, &[]);
        assert!(!input.was_down(Key::Space));
    }

    #[test]
    fn test_press_and_release_in_one_frame_leaves_no_edge() {
        let mut input = InputManager::new();
        frame(&mut input, &[InputEvent::KeyDown(Key::E), InputEvent::KeyUp(Key::E)]);
        assert!(input.is_up(Key::E));
        assert!(!input.was_up(Key::E));
        assert!(!input.was_down(Key::E));
    }

    #[test]
    fn test_update_makes_snapshots_equal() {
        let mut input = InputManager::new();
        input.process(&InputEvent::KeyDown(Key::A));
        input.process(&InputEvent::MouseButtonDown(MouseButton::Right));
        input.process(&InputEvent::MouseMove { x: 3.0, y: 4.0, rel_x: 3.0, rel_y: 4.0 });
        input.update();
        assert_eq!(input.current(), input.previous());
    }

    #[test]
    fn test_mouse_buttons_and_position() {
        let mut input = InputManager::new();
        frame(
            &mut input,
            &[
                InputEvent::MouseButtonDown(MouseButton::Left),
                InputEvent::MouseMove { x: 10.0, y: 20.0, rel_x: 10.0, rel_y: 20.0 },
                InputEvent::MouseWheel(-1.5),
            ],
        );
        assert!(input.is_button_down(MouseButton::Left));
        assert!(input.was_button_up(MouseButton::Left));
        assert!(input.is_button_up(MouseButton::Middle));
        assert_relative_eq!(input.position(), Vec2::new(10.0, 20.0));
        assert_relative_eq!(input.previous_position(), Vec2::zeros());
        assert_relative_eq!(input.scroll(), -1.5);
        input.end_frame();

        frame(&mut input, &[InputEvent::MouseButtonUp(MouseButton::Left)]);
        assert!(input.was_button_down(MouseButton::Left));
        assert_relative_eq!(input.previous_position(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_non_input_events_are_ignored() {
        let mut input = InputManager::new();
        let before = *input.current();
        input.process(&InputEvent::Quit);
        input.process(&InputEvent::Resized {
            window: crate::window::NativeWindowId(1),
            width: 10,
            height: 10,
        });
        assert_eq!(*input.current(), before);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "while a frame is open")]
    fn test_processing_inside_open_frame_is_rejected() {
        let mut input = InputManager::new();
        input.begin_frame();
        input.process(&InputEvent::KeyDown(Key::Q));
    }
}
