//! Window management using GLFW
//!
//! Provides OpenGL core-profile windows and translates GLFW's per-window
//! event queues into [`InputEvent`]s.

use super::{NativeWindowId, Platform, WindowError};
use crate::core::{ContextConfig, WindowConfig};
use crate::input::{InputEvent, Key, MouseButton};
use crate::render::device::{DeviceRef, GlDevice};
use glfw::Context;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

struct GlfwWindow {
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

/// GLFW windows with OpenGL contexts
pub struct GlfwPlatform {
    context: ContextConfig,
    vsync: bool,
    glfw: Option<glfw::Glfw>,
    windows: BTreeMap<NativeWindowId, GlfwWindow>,
    next_id: u32,
    pending: VecDeque<InputEvent>,
    draining: bool,
    last_cursor: Option<(f64, f64)>,
}

impl GlfwPlatform {
    /// Platform creating contexts per `context`, swapping per `window.vsync`
    pub fn new(context: &ContextConfig, window: &WindowConfig) -> Self {
        Self {
            context: context.clone(),
            vsync: window.vsync,
            glfw: None,
            windows: BTreeMap::new(),
            next_id: 0,
            pending: VecDeque::new(),
            draining: false,
            last_cursor: None,
        }
    }

    fn collect_events(&mut self) {
        let Some(glfw) = self.glfw.as_mut() else {
            return;
        };
        glfw.poll_events();
        for (&id, native) in &self.windows {
            for (_, event) in glfw::flush_messages(&native.events) {
                if let Some(event) = translate_event(id, event, &mut self.last_cursor) {
                    self.pending.push_back(event);
                }
            }
        }
    }
}

fn translate_event(
    window: NativeWindowId,
    event: glfw::WindowEvent,
    last_cursor: &mut Option<(f64, f64)>,
) -> Option<InputEvent> {
    match event {
        glfw::WindowEvent::Key(key, _, glfw::Action::Press, _) => map_key(key).map(InputEvent::KeyDown),
        glfw::WindowEvent::Key(key, _, glfw::Action::Release, _) => map_key(key).map(InputEvent::KeyUp),
        glfw::WindowEvent::CursorPos(x, y) => {
            let (last_x, last_y) = last_cursor.unwrap_or((x, y));
            *last_cursor = Some((x, y));
            Some(InputEvent::MouseMove {
                x: x as f32,
                y: y as f32,
                rel_x: (x - last_x) as f32,
                rel_y: (y - last_y) as f32,
            })
        }
        glfw::WindowEvent::MouseButton(button, action, _) => {
            let button = map_button(button)?;
            match action {
                glfw::Action::Press => Some(InputEvent::MouseButtonDown(button)),
                glfw::Action::Release => Some(InputEvent::MouseButtonUp(button)),
                glfw::Action::Repeat => None,
            }
        }
        glfw::WindowEvent::Scroll(_, y) => Some(InputEvent::MouseWheel(y as f32)),
        glfw::WindowEvent::Close => Some(InputEvent::WindowClose(window)),
        glfw::WindowEvent::FramebufferSize(width, height) => Some(InputEvent::Resized {
            window,
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }),
        _ => None,
    }
}

fn map_button(button: glfw::MouseButton) -> Option<MouseButton> {
    match button {
        glfw::MouseButton::Button1 => Some(MouseButton::Left),
        glfw::MouseButton::Button2 => Some(MouseButton::Right),
        glfw::MouseButton::Button3 => Some(MouseButton::Middle),
        _ => None,
    }
}

fn map_key(key: glfw::Key) -> Option<Key> {
    use glfw::Key as G;
    let key = match key {
        G::A => Key::A,
        G::B => Key::B,
        G::C => Key::C,
        G::D => Key::D,
        G::E => Key::E,
        G::F => Key::F,
        G::G => Key::G,
        G::H => Key::H,
        G::I => Key::I,
        G::J => Key::J,
        G::K => Key::K,
        G::L => Key::L,
        G::M => Key::M,
        G::N => Key::N,
        G::O => Key::O,
        G::P => Key::P,
        G::Q => Key::Q,
        G::R => Key::R,
        G::S => Key::S,
        G::T => Key::T,
        G::U => Key::U,
        G::V => Key::V,
        G::W => Key::W,
        G::X => Key::X,
        G::Y => Key::Y,
        G::Z => Key::Z,
        G::Num0 => Key::Num0,
        G::Num1 => Key::Num1,
        G::Num2 => Key::Num2,
        G::Num3 => Key::Num3,
        G::Num4 => Key::Num4,
        G::Num5 => Key::Num5,
        G::Num6 => Key::Num6,
        G::Num7 => Key::Num7,
        G::Num8 => Key::Num8,
        G::Num9 => Key::Num9,
        G::Enter => Key::Return,
        G::Escape => Key::Escape,
        G::Backspace => Key::Backspace,
        G::Tab => Key::Tab,
        G::Space => Key::Space,
        G::Minus => Key::Minus,
        G::Equal => Key::Equals,
        G::LeftBracket => Key::LeftBracket,
        G::RightBracket => Key::RightBracket,
        G::Backslash => Key::Backslash,
        G::Semicolon => Key::Semicolon,
        G::Apostrophe => Key::Apostrophe,
        G::GraveAccent => Key::Grave,
        G::Comma => Key::Comma,
        G::Period => Key::Period,
        G::Slash => Key::Slash,
        G::CapsLock => Key::CapsLock,
        G::F1 => Key::F1,
        G::F2 => Key::F2,
        G::F3 => Key::F3,
        G::F4 => Key::F4,
        G::F5 => Key::F5,
        G::F6 => Key::F6,
        G::F7 => Key::F7,
        G::F8 => Key::F8,
        G::F9 => Key::F9,
        G::F10 => Key::F10,
        G::F11 => Key::F11,
        G::F12 => Key::F12,
        G::PrintScreen => Key::PrintScreen,
        G::ScrollLock => Key::ScrollLock,
        G::Pause => Key::Pause,
        G::Insert => Key::Insert,
        G::Home => Key::Home,
        G::PageUp => Key::PageUp,
        G::Delete => Key::Delete,
        G::End => Key::End,
        G::PageDown => Key::PageDown,
        G::Right => Key::Right,
        G::Left => Key::Left,
        G::Down => Key::Down,
        G::Up => Key::Up,
        G::NumLock => Key::NumLock,
        G::KpDivide => Key::KpDivide,
        G::KpMultiply => Key::KpMultiply,
        G::KpSubtract => Key::KpMinus,
        G::KpAdd => Key::KpPlus,
        G::KpEnter => Key::KpEnter,
        G::Kp0 => Key::Kp0,
        G::Kp1 => Key::Kp1,
        G::Kp2 => Key::Kp2,
        G::Kp3 => Key::Kp3,
        G::Kp4 => Key::Kp4,
        G::Kp5 => Key::Kp5,
        G::Kp6 => Key::Kp6,
        G::Kp7 => Key::Kp7,
        G::Kp8 => Key::Kp8,
        G::Kp9 => Key::Kp9,
        G::KpDecimal => Key::KpPeriod,
        G::KpEqual => Key::KpEquals,
        G::Menu => Key::Menu,
        G::LeftControl => Key::LeftCtrl,
        G::LeftShift => Key::LeftShift,
        G::LeftAlt => Key::LeftAlt,
        G::LeftSuper => Key::LeftSuper,
        G::RightControl => Key::RightCtrl,
        G::RightShift => Key::RightShift,
        G::RightAlt => Key::RightAlt,
        G::RightSuper => Key::RightSuper,
        _ => return None,
    };
    Some(key)
}

impl Platform for GlfwPlatform {
    fn name(&self) -> &'static str {
        "glfw"
    }

    fn init(&mut self) -> Result<(), WindowError> {
        if self.glfw.is_some() {
            return Ok(());
        }
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(self.context.major, self.context.minor));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::OpenGlDebugContext(self.context.debug));
        glfw.window_hint(glfw::WindowHint::DepthBits(Some(self.context.depth_bits)));
        glfw.window_hint(glfw::WindowHint::StencilBits(Some(self.context.stencil_bits)));
        glfw.window_hint(glfw::WindowHint::DoubleBuffer(true));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        self.glfw = Some(glfw);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.glfw.is_some()
    }

    fn create_window(&mut self, title: &str, width: u32, height: u32) -> Result<NativeWindowId, WindowError> {
        let glfw = self.glfw.as_mut().ok_or(WindowError::NotInitialized)?;
        // Later windows share the first context's objects
        let created = match self.windows.values().next() {
            Some(first) => first.window.create_shared(width, height, title, glfw::WindowMode::Windowed),
            None => glfw.create_window(width, height, title, glfw::WindowMode::Windowed),
        };
        let (mut window, events) = created
            .ok_or_else(|| WindowError::CreationFailed {
                title: title.to_string(),
                reason: format!(
                    "no OpenGL {}.{} core context",
                    self.context.major, self.context.minor
                ),
            })?;

        window.make_current();
        glfw.set_swap_interval(if self.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        window.set_key_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        self.next_id += 1;
        let id = NativeWindowId(self.next_id);
        self.windows.insert(id, GlfwWindow { window, events });
        Ok(id)
    }

    fn make_current(&mut self, window: NativeWindowId) {
        if let Some(native) = self.windows.get_mut(&window) {
            native.window.make_current();
        }
    }

    fn swap(&mut self, window: NativeWindowId) {
        if let Some(native) = self.windows.get_mut(&window) {
            native.window.swap_buffers();
        }
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        // Dropping the PWindow destroys the context and then the window
        self.windows.remove(&window);
    }

    fn poll_event(&mut self) -> Option<InputEvent> {
        if !self.draining {
            self.collect_events();
            self.draining = true;
        }
        let event = self.pending.pop_front();
        if event.is_none() {
            self.draining = false;
        }
        event
    }

    fn create_device(&mut self, window: NativeWindowId) -> Result<DeviceRef, WindowError> {
        let native = self.windows.get_mut(&window).ok_or(WindowError::NotInitialized)?;
        native.window.make_current();
        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| native.window.get_proc_address(symbol) as *const _)
        };
        let device = GlDevice::new(gl, self.context.debug);
        log::info!("OpenGL device ready ({}.{} core)", self.context.major, self.context.minor);
        Ok(Rc::new(device))
    }

    fn set_cursor_locked(&mut self, window: NativeWindowId, locked: bool) {
        if let Some(native) = self.windows.get_mut(&window) {
            native.window.set_cursor_mode(if locked {
                glfw::CursorMode::Disabled
            } else {
                glfw::CursorMode::Normal
            });
        }
        self.last_cursor = None;
    }

    fn shutdown(&mut self) {
        self.windows.clear();
        self.pending.clear();
        // Dropping the last Glfw handle terminates the library
        self.glfw = None;
    }
}
