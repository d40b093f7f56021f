use std::collections::HashSet;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Numeric key code as written in world files (`onKeyPress(69)`): GLFW numbering,
/// printable keys use their uppercase ASCII value.
pub type KeyId = i32;

pub mod keys {
    use super::KeyId;

    pub const SPACE: KeyId = 32;
    pub const APOSTROPHE: KeyId = 39;
    pub const COMMA: KeyId = 44;
    pub const MINUS: KeyId = 45;
    pub const PERIOD: KeyId = 46;
    pub const SLASH: KeyId = 47;
    pub const DIGIT_0: KeyId = 48;
    pub const SEMICOLON: KeyId = 59;
    pub const EQUAL: KeyId = 61;
    pub const A: KeyId = 65;
    pub const D: KeyId = 68;
    pub const E: KeyId = 69;
    pub const Q: KeyId = 81;
    pub const S: KeyId = 83;
    pub const W: KeyId = 87;
    pub const ESCAPE: KeyId = 256;
    pub const ENTER: KeyId = 257;
    pub const TAB: KeyId = 258;
    pub const BACKSPACE: KeyId = 259;
    pub const RIGHT: KeyId = 262;
    pub const LEFT: KeyId = 263;
    pub const DOWN: KeyId = 264;
    pub const UP: KeyId = 265;
    pub const F1: KeyId = 290;
    pub const LEFT_SHIFT: KeyId = 340;
    pub const LEFT_CONTROL: KeyId = 341;
    pub const LEFT_ALT: KeyId = 342;
    pub const RIGHT_SHIFT: KeyId = 344;
    pub const RIGHT_CONTROL: KeyId = 345;
    pub const RIGHT_ALT: KeyId = 346;

    /// Parses a config-file key name (`"w"`, `"space"`, `"left_shift"`) or a raw numeric code.
    pub fn from_name(raw: &str) -> Option<KeyId> {
        let normalized = raw.trim().to_lowercase();
        if let Ok(code) = normalized.parse::<KeyId>() {
            return Some(code);
        }
        let mut chars = normalized.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphanumeric() {
                return Some(ch.to_ascii_uppercase() as KeyId);
            }
        }
        match normalized.as_str() {
            "space" => Some(SPACE),
            "escape" | "esc" => Some(ESCAPE),
            "enter" | "return" => Some(ENTER),
            "tab" => Some(TAB),
            "up" => Some(UP),
            "down" => Some(DOWN),
            "left" => Some(LEFT),
            "right" => Some(RIGHT),
            "shift" | "left_shift" => Some(LEFT_SHIFT),
            "right_shift" => Some(RIGHT_SHIFT),
            "ctrl" | "control" | "left_ctrl" => Some(LEFT_CONTROL),
            "right_ctrl" => Some(RIGHT_CONTROL),
            "alt" | "left_alt" => Some(LEFT_ALT),
            "right_alt" => Some(RIGHT_ALT),
            _ => None,
        }
    }
}

/// Live key-down state consulted by movement and key-based trigger checkers.
pub trait KeyState {
    fn key_down(&self, key: KeyId) -> bool;
}

/// A fixed set of held keys; useful for headless runs and scripted frames.
#[derive(Debug, Clone, Default)]
pub struct HeldKeys(pub HashSet<KeyId>);

impl HeldKeys {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(keys: impl IntoIterator<Item = KeyId>) -> Self {
        Self(keys.into_iter().collect())
    }

    pub fn press(&mut self, key: KeyId) {
        self.0.insert(key);
    }

    pub fn release(&mut self, key: KeyId) {
        self.0.remove(&key);
    }
}

impl KeyState for HeldKeys {
    fn key_down(&self, key: KeyId) -> bool {
        self.0.contains(&key)
    }
}

pub enum InputEvent {
    Key { code: KeyCode, pressed: bool },
    Focus(bool),
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    InputEvent::Key { code, pressed: event.state == ElementState::Pressed }
                }
                PhysicalKey::Unidentified(_) => InputEvent::Other,
            },
            WindowEvent::Focused(focused) => InputEvent::Focus(*focused),
            _ => InputEvent::Other,
        }
    }
}

/// Tracks which keys are down from the window event stream.
#[derive(Debug, Default)]
pub struct Input {
    held: HeldKeys,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { code, pressed } => match key_id(code) {
                Some(key) if pressed => self.held.press(key),
                Some(key) => self.held.release(key),
                None => log::debug!("[input] no key code mapping for {code:?}"),
            },
            // Key-up events are lost while unfocused.
            InputEvent::Focus(false) => self.held.0.clear(),
            InputEvent::Focus(true) | InputEvent::Other => {}
        }
    }

    pub fn held_count(&self) -> usize {
        self.held.0.len()
    }
}

impl KeyState for Input {
    fn key_down(&self, key: KeyId) -> bool {
        self.held.key_down(key)
    }
}

/// Maps a physical winit key to the world-file key numbering.
pub fn key_id(code: KeyCode) -> Option<KeyId> {
    use KeyCode::*;
    let letter = |offset: i32| Some(keys::A + offset);
    let digit = |offset: i32| Some(keys::DIGIT_0 + offset);
    match code {
        KeyA => letter(0),
        KeyB => letter(1),
        KeyC => letter(2),
        KeyD => letter(3),
        KeyE => letter(4),
        KeyF => letter(5),
        KeyG => letter(6),
        KeyH => letter(7),
        KeyI => letter(8),
        KeyJ => letter(9),
        KeyK => letter(10),
        KeyL => letter(11),
        KeyM => letter(12),
        KeyN => letter(13),
        KeyO => letter(14),
        KeyP => letter(15),
        KeyQ => letter(16),
        KeyR => letter(17),
        KeyS => letter(18),
        KeyT => letter(19),
        KeyU => letter(20),
        KeyV => letter(21),
        KeyW => letter(22),
        KeyX => letter(23),
        KeyY => letter(24),
        KeyZ => letter(25),
        Digit0 => digit(0),
        Digit1 => digit(1),
        Digit2 => digit(2),
        Digit3 => digit(3),
        Digit4 => digit(4),
        Digit5 => digit(5),
        Digit6 => digit(6),
        Digit7 => digit(7),
        Digit8 => digit(8),
        Digit9 => digit(9),
        Space => Some(keys::SPACE),
        Quote => Some(keys::APOSTROPHE),
        Comma => Some(keys::COMMA),
        Minus => Some(keys::MINUS),
        Period => Some(keys::PERIOD),
        Slash => Some(keys::SLASH),
        Semicolon => Some(keys::SEMICOLON),
        Equal => Some(keys::EQUAL),
        Escape => Some(keys::ESCAPE),
        Enter => Some(keys::ENTER),
        Tab => Some(keys::TAB),
        Backspace => Some(keys::BACKSPACE),
        ArrowRight => Some(keys::RIGHT),
        ArrowLeft => Some(keys::LEFT),
        ArrowDown => Some(keys::DOWN),
        ArrowUp => Some(keys::UP),
        F1 => Some(keys::F1),
        ShiftLeft => Some(keys::LEFT_SHIFT),
        ControlLeft => Some(keys::LEFT_CONTROL),
        AltLeft => Some(keys::LEFT_ALT),
        ShiftRight => Some(keys::RIGHT_SHIFT),
        ControlRight => Some(keys::RIGHT_CONTROL),
        AltRight => Some(keys::RIGHT_ALT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_digits_use_ascii_codes() {
        assert_eq!(key_id(KeyCode::KeyE), Some(69));
        assert_eq!(key_id(KeyCode::KeyW), Some(keys::W));
        assert_eq!(key_id(KeyCode::Digit7), Some(55));
        assert_eq!(key_id(KeyCode::Space), Some(32));
    }

    #[test]
    fn key_names_parse_from_config() {
        assert_eq!(keys::from_name("w"), Some(keys::W));
        assert_eq!(keys::from_name(" Space "), Some(keys::SPACE));
        assert_eq!(keys::from_name("left_shift"), Some(keys::LEFT_SHIFT));
        assert_eq!(keys::from_name("290"), Some(keys::F1));
        assert_eq!(keys::from_name("hyper"), None);
    }

    #[test]
    fn input_tracks_press_release_and_focus_loss() {
        let mut input = Input::new();
        input.push(InputEvent::Key { code: KeyCode::KeyE, pressed: true });
        input.push(InputEvent::Key { code: KeyCode::KeyQ, pressed: true });
        assert!(input.key_down(keys::E));
        input.push(InputEvent::Key { code: KeyCode::KeyE, pressed: false });
        assert!(!input.key_down(keys::E));
        assert!(input.key_down(keys::Q));
        input.push(InputEvent::Focus(false));
        assert_eq!(input.held_count(), 0);
    }
}
