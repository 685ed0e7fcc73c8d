//! Input management system
//!
//! [`InputManager`] keeps two snapshots of keyboard and mouse state. Events
//! mutate the current one; once per frame the current snapshot is copied into
//! the previous one so edge queries can compare the two.

pub mod events;
pub mod keys;
mod manager;

pub use events::InputEvent;
pub use keys::{InvalidKeyCode, Key, MouseButton, KEY_COUNT, MOUSE_BUTTON_COUNT};
pub use manager::{InputManager, InputSnapshot};
