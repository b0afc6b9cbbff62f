//! Named logical buttons over raw keyboard state.
//!
//! Scripts register a button name against an ordered list of raw key codes
//! (`KEYBOARD_OFFSET + key index`) and query it as:
//!
//! - **down**: any mapped key is held now.
//! - **pressed**: any mapped key is held now and was not held in the previous
//!   snapshot.
//! - **released**: any mapped key was held in the previous snapshot and is
//!   not held now.
//!
//! Edges are evaluated key by key against the snapshot taken at the last
//! [`Input::update`], not against a per-button history. For a button mapped
//! to several keys, swapping from one held key to another within a frame
//! reports a press for the new key even though the button never went up.
//!
//! The engine feeds [`Input::refresh`] with the backend's keyboard right
//! after events are polled, and calls [`Input::update`] once per tick after
//! all gameplay code has run.

use std::collections::HashMap;

/// First raw code of the keyboard range. Key `i` has code `KEYBOARD_OFFSET + i`.
pub const KEYBOARD_OFFSET: usize = 1000;

/// Errors raised by button queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// The button name was never registered.
    #[error("unable to find input: {0}")]
    UnknownButton(String),
}

macro_rules! keys {
    ($($key:ident),* $(,)?) => {
        /// Keyboard keys, in raw code order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $($key),*
        }

        impl Key {
            /// Every key, in code order.
            pub const ALL: &'static [Key] = &[$(Key::$key),*];
        }
    };
}

keys! {
    A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Escape, LControl, LShift, LAlt, LSystem, RControl, RShift, RAlt, RSystem,
    Menu, LBracket, RBracket, Semicolon, Comma, Period, Quote, Slash, Backslash,
    Tilde, Equal, Dash, Space, Return, Backspace, Tab, PageUp, PageDown, End,
    Home, Insert, Delete, Add, Subtract, Multiply, Divide,
    Left, Right, Up, Down,
    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4, Numpad5, Numpad6, Numpad7,
    Numpad8, Numpad9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12, F13, F14, F15,
    Pause,
}

/// Number of keyboard keys.
pub const KEY_COUNT: usize = Key::ALL.len();

impl Key {
    /// Raw code of this key.
    pub fn code(self) -> usize {
        KEYBOARD_OFFSET + self as usize
    }

    /// Key for a raw code, if the code is in the keyboard range.
    pub fn from_code(code: usize) -> Option<Self> {
        code.checked_sub(KEYBOARD_OFFSET)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Name used by the scripting bridges (`"A"`, `"NUM_0"`, `"L_SHIFT"`, ...).
    pub fn name(self) -> String {
        let debug = format!("{self:?}");
        let mut out = String::with_capacity(debug.len() + 2);
        let mut prev: Option<char> = None;
        for ch in debug.chars() {
            let boundary = match prev {
                Some(p) => ch.is_ascii_uppercase() || (ch.is_ascii_digit() && p.is_ascii_lowercase()),
                None => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(ch.to_ascii_uppercase());
            prev = Some(ch);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// KeyboardState
// ---------------------------------------------------------------------------

/// Snapshot of which keys are held, one bit per [`Key`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardState(u128);

impl KeyboardState {
    /// Nothing held.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns `true` if `key` is held.
    pub fn is_down(self, key: Key) -> bool {
        self.0 & (1u128 << key as u32) != 0
    }

    /// Mark `key` held or not.
    pub fn set(&mut self, key: Key, down: bool) {
        if down {
            self.0 |= 1u128 << key as u32;
        } else {
            self.0 &= !(1u128 << key as u32);
        }
    }

    /// Builder form of [`set`](Self::set) with `down = true`.
    pub fn with(mut self, key: Key) -> Self {
        self.set(key, true);
        self
    }

    fn is_code_down(self, code: usize) -> bool {
        Key::from_code(code).is_some_and(|key| self.is_down(key))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Named button registry with current and previous keyboard snapshots.
#[derive(Debug, Default)]
pub struct Input {
    buttons: HashMap<String, Vec<usize>>,
    current: KeyboardState,
    previous: KeyboardState,
}

impl Input {
    /// Create an input registry with no buttons and nothing held.
    pub fn new() -> Self {
        tracing::info!("input initialized");
        Self::default()
    }

    /// Map `name` to `codes`, replacing any earlier mapping of the same name.
    ///
    /// Codes outside the keyboard range never count as held.
    pub fn register_button(&mut self, name: &str, codes: Vec<usize>) {
        for code in &codes {
            if Key::from_code(*code).is_none() {
                tracing::warn!(button = name, code, "raw code is not a keyboard key");
            }
        }
        tracing::debug!(button = name, ?codes, "button registered");
        self.buttons.insert(name.to_owned(), codes);
    }

    /// Convenience form of [`register_button`](Self::register_button).
    pub fn register_keys(&mut self, name: &str, keys: &[Key]) {
        self.register_button(name, keys.iter().map(|k| k.code()).collect());
    }

    /// Returns `true` if `name` has been registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.buttons.contains_key(name)
    }

    /// Replace the current snapshot with the device state.
    pub fn refresh(&mut self, keyboard: KeyboardState) {
        self.current = keyboard;
    }

    /// Store the current snapshot as the previous one. Call once per tick,
    /// after gameplay code has read this frame's edges.
    pub fn update(&mut self) {
        self.previous = self.current;
    }

    /// Any mapped key is held.
    pub fn button_down(&self, name: &str) -> Result<bool, InputError> {
        let codes = self.codes(name)?;
        Ok(codes.iter().any(|&c| self.current.is_code_down(c)))
    }

    /// Any mapped key is held now and was not held at the last update.
    pub fn button_pressed(&self, name: &str) -> Result<bool, InputError> {
        let codes = self.codes(name)?;
        Ok(codes
            .iter()
            .any(|&c| !self.previous.is_code_down(c) && self.current.is_code_down(c)))
    }

    /// Any mapped key was held at the last update and is not held now.
    pub fn button_released(&self, name: &str) -> Result<bool, InputError> {
        let codes = self.codes(name)?;
        Ok(codes
            .iter()
            .any(|&c| self.previous.is_code_down(c) && !self.current.is_code_down(c)))
    }

    /// The current snapshot.
    pub fn keyboard(&self) -> KeyboardState {
        self.current
    }

    fn codes(&self, name: &str) -> Result<&[usize], InputError> {
        self.buttons
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| InputError::UnknownButton(name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn jump_input() -> Input {
        let mut input = Input::new();
        input.register_keys("jump", &[Key::Space]);
        input
    }

    #[test]
    fn key_codes_follow_offset() {
        assert_eq!(Key::A.code(), 1000);
        assert_eq!(Key::Z.code(), 1025);
        assert_eq!(Key::Num0.code(), 1026);
        assert_eq!(Key::Escape.code(), 1036);
        assert_eq!(Key::Pause.code(), KEYBOARD_OFFSET + KEY_COUNT - 1);
        assert_eq!(Key::from_code(1057), Some(Key::Space));
        assert_eq!(Key::from_code(999), None);
        assert_eq!(Key::from_code(KEYBOARD_OFFSET + KEY_COUNT), None);
        assert!(KEY_COUNT <= 128, "KeyboardState packs keys into a u128");
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::A.name(), "A");
        assert_eq!(Key::Num0.name(), "NUM_0");
        assert_eq!(Key::LShift.name(), "L_SHIFT");
        assert_eq!(Key::PageUp.name(), "PAGE_UP");
        assert_eq!(Key::Numpad7.name(), "NUMPAD_7");
        assert_eq!(Key::F12.name(), "F12");
    }

    #[test]
    fn edge_detection_across_updates() {
        let mut input = jump_input();
        let held = KeyboardState::new().with(Key::Space);

        // Frame 1: unpressed -> pressed.
        input.refresh(held);
        assert!(input.button_pressed("jump").unwrap());
        assert!(input.button_down("jump").unwrap());
        assert!(!input.button_released("jump").unwrap());
        input.update();

        // Frame 2: still held.
        input.refresh(held);
        assert!(!input.button_pressed("jump").unwrap());
        assert!(input.button_down("jump").unwrap());
        input.update();

        // Frame 3: released.
        input.refresh(KeyboardState::new());
        assert!(input.button_released("jump").unwrap());
        assert!(!input.button_down("jump").unwrap());
        input.update();

        // Frame 4: released only once.
        input.refresh(KeyboardState::new());
        assert!(!input.button_released("jump").unwrap());
    }

    #[test]
    fn any_mapped_key_satisfies_button() {
        let mut input = Input::new();
        input.register_keys("left", &[Key::A, Key::Left]);
        input.refresh(KeyboardState::new().with(Key::Left));
        assert!(input.button_down("left").unwrap());
        input.refresh(KeyboardState::new().with(Key::A));
        assert!(input.button_down("left").unwrap());
    }

    #[test]
    fn swapping_keys_in_one_button_reports_a_press() {
        let mut input = Input::new();
        input.register_keys("left", &[Key::A, Key::Left]);
        input.refresh(KeyboardState::new().with(Key::A));
        input.update();
        // A released and Left pressed in the same frame: the button stayed
        // down, yet both edges fire.
        input.refresh(KeyboardState::new().with(Key::Left));
        assert!(input.button_pressed("left").unwrap());
        assert!(input.button_released("left").unwrap());
        assert!(input.button_down("left").unwrap());
    }

    #[test]
    fn unregistered_name_is_an_error() {
        let input = Input::new();
        assert_eq!(
            input.button_down("fire"),
            Err(InputError::UnknownButton("fire".to_owned()))
        );
        assert!(input.button_pressed("fire").is_err());
        assert!(input.button_released("fire").is_err());
    }

    #[test]
    fn re_registering_replaces_mapping() {
        let mut input = jump_input();
        input.register_keys("jump", &[Key::W]);
        input.refresh(KeyboardState::new().with(Key::Space));
        assert!(!input.button_down("jump").unwrap());
    }

    #[test]
    fn out_of_range_codes_never_hold() {
        let mut input = Input::new();
        input.register_button("odd", vec![5, 99_999]);
        input.refresh(KeyboardState::new().with(Key::A));
        assert!(!input.button_down("odd").unwrap());
    }
}
