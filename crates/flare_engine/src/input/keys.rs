//! Key and mouse button identifiers
//!
//! Key discriminants are USB HID usage IDs, the same numbering most platform
//! layers call "scancodes". They index directly into the input snapshot
//! arrays, so every value is below [`KEY_COUNT`].

/// Size of the per-snapshot key array
pub const KEY_COUNT: usize = 512;

/// Number of tracked mouse buttons
pub const MOUSE_BUTTON_COUNT: usize = 3;

macro_rules! keys {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// Physical keyboard key
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Key {
            $($(#[$doc])* $name = $code,)*
        }

        impl Key {
            /// Every key, in scancode order
            pub const ALL: &'static [Key] = &[$(Key::$name,)*];

            /// Look up a key by scancode; unknown codes yield `None`
            pub fn from_scancode(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Key::$name),)*
                    _ => None,
                }
            }
        }
    };
}

keys! {
    A = 4, B = 5, C = 6, D = 7, E = 8, F = 9, G = 10, H = 11, I = 12, J = 13,
    K = 14, L = 15, M = 16, N = 17, O = 18, P = 19, Q = 20, R = 21, S = 22, T = 23,
    U = 24, V = 25, W = 26, X = 27, Y = 28, Z = 29,
    Num1 = 30, Num2 = 31, Num3 = 32, Num4 = 33, Num5 = 34,
    Num6 = 35, Num7 = 36, Num8 = 37, Num9 = 38, Num0 = 39,
    Return = 40, Escape = 41, Backspace = 42, Tab = 43, Space = 44,
    Minus = 45, Equals = 46, LeftBracket = 47, RightBracket = 48, Backslash = 49,
    Semicolon = 51, Apostrophe = 52, Grave = 53, Comma = 54, Period = 55, Slash = 56,
    CapsLock = 57,
    F1 = 58, F2 = 59, F3 = 60, F4 = 61, F5 = 62, F6 = 63,
    F7 = 64, F8 = 65, F9 = 66, F10 = 67, F11 = 68, F12 = 69,
    PrintScreen = 70, ScrollLock = 71, Pause = 72, Insert = 73, Home = 74, PageUp = 75,
    Delete = 76, End = 77, PageDown = 78,
    Right = 79, Left = 80, Down = 81, Up = 82,
    NumLock = 83, KpDivide = 84, KpMultiply = 85, KpMinus = 86, KpPlus = 87, KpEnter = 88,
    Kp1 = 89, Kp2 = 90, Kp3 = 91, Kp4 = 92, Kp5 = 93,
    Kp6 = 94, Kp7 = 95, Kp8 = 96, Kp9 = 97, Kp0 = 98, KpPeriod = 99,
    KpEquals = 103, Menu = 118,
    LeftCtrl = 224, LeftShift = 225, LeftAlt = 226, LeftSuper = 227,
    RightCtrl = 228, RightShift = 229, RightAlt = 230, RightSuper = 231,
}

impl Key {
    /// Scancode of this key
    pub fn scancode(self) -> u16 {
        self as u16
    }

    /// Index into a snapshot key array
    pub fn index(self) -> usize {
        usize::from(self.scancode())
    }
}

impl TryFrom<u16> for Key {
    type Error = InvalidKeyCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Key::from_scancode(code).ok_or(InvalidKeyCode(code))
    }
}

/// A scancode with no [`Key`] mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid key code {0}")]
pub struct InvalidKeyCode(pub u16);

/// Mouse buttons tracked by the input store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left = 0,
    /// Secondary button
    Right = 1,
    /// Wheel button
    Middle = 2,
}

impl MouseButton {
    /// Index into a snapshot button array
    pub fn index(self) -> usize {
        self as usize
    }
}
