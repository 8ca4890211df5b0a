//! Key events and their normalized representation.
//!
//! Invariants:
//! * A printable key is always `Key::Rune` with the character in
//!   `rune`; there are no dedicated variants for printable characters.
//! * Control runes are normalized at construction: `0x01..=0x1a`
//!   becomes the corresponding lowercase letter with `CTRL` set, so a
//!   raw `0x07` and an explicit Ctrl-g construct equal events.
//!   Backspace, Tab, Escape and Enter keep their named keys with no
//!   implied modifier; `0x7f` is `Backspace2`.

use crate::ModMask;
use std::time::Instant;

/// Logical, terminal-independent key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character; the character itself travels in
    /// [`KeyEvent::rune`].
    Rune,
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Enter,
    Backspace,
    /// DEL (`0x7f`), reported by terminals that send it for the
    /// backspace key.
    Backspace2,
    Tab,
    Backtab,
    Esc,
    F(u8),
}

impl Key {
    fn name(&self) -> String {
        match self {
            Key::Rune => "Rune".to_string(),
            Key::Up => "Up".to_string(),
            Key::Down => "Down".to_string(),
            Key::Right => "Right".to_string(),
            Key::Left => "Left".to_string(),
            Key::Home => "Home".to_string(),
            Key::End => "End".to_string(),
            Key::PageUp => "PgUp".to_string(),
            Key::PageDown => "PgDn".to_string(),
            Key::Insert => "Insert".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Enter => "Enter".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Backspace2 => "Backspace2".to_string(),
            Key::Tab => "Tab".to_string(),
            Key::Backtab => "Backtab".to_string(),
            Key::Esc => "Esc".to_string(),
            Key::F(n) => format!("F{n}"),
        }
    }
}

/// A single key press, after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub when: Instant,
    pub key: Key,
    pub rune: char,
    pub mods: ModMask,
}

impl KeyEvent {
    /// Build a key event, normalizing control runes (see module docs).
    pub fn new(key: Key, rune: char, mods: ModMask) -> Self {
        let (key, rune, mods) = normalize(key, rune, mods);
        Self {
            when: Instant::now(),
            key,
            rune,
            mods,
        }
    }

    /// Human-readable name, e.g. `"Ctrl+Rune[ ]"` or `"Shift+F3"`.
    pub fn name(&self) -> String {
        let base = match self.key {
            Key::Rune => format!("Rune[{}]", self.rune),
            other => other.name(),
        };
        let mut parts = Vec::new();
        if self.mods.contains(ModMask::SHIFT) {
            parts.push("Shift");
        }
        if self.mods.contains(ModMask::ALT) {
            parts.push("Alt");
        }
        if self.mods.contains(ModMask::META) {
            parts.push("Meta");
        }
        if self.mods.contains(ModMask::CTRL) {
            parts.push("Ctrl");
        }
        if parts.is_empty() {
            base
        } else {
            format!("{}+{}", parts.join("+"), base)
        }
    }
}

fn normalize(key: Key, rune: char, mods: ModMask) -> (Key, char, ModMask) {
    if key != Key::Rune {
        return (key, rune, mods);
    }
    match rune {
        '\x08' => (Key::Backspace, rune, mods),
        '\t' => (Key::Tab, rune, mods),
        '\r' | '\n' => (Key::Enter, rune, mods),
        '\x1b' => (Key::Esc, rune, mods),
        '\x7f' => (Key::Backspace2, rune, mods),
        '\0' => (Key::Rune, ' ', mods | ModMask::CTRL),
        c if c < ' ' => {
            let b = c as u8;
            let plain = if (1..=26).contains(&b) {
                (b'a' + b - 1) as char
            } else {
                // 0x1c..=0x1f: FS GS RS US, typed as Ctrl+\ ] ^ _
                (b + 0x40) as char
            };
            (Key::Rune, plain, mods | ModMask::CTRL)
        }
        c => (Key::Rune, c, mods),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_space_name() {
        let ev = KeyEvent::new(Key::Rune, ' ', ModMask::CTRL);
        assert_eq!(ev.name(), "Ctrl+Rune[ ]");
    }

    #[test]
    fn control_rune_normalizes_to_letter() {
        // BEL is Ctrl-g on the wire.
        let ev = KeyEvent::new(Key::Rune, '\x07', ModMask::empty());
        assert_eq!(ev.key, Key::Rune);
        assert_eq!(ev.rune, 'g');
        assert!(ev.mods.contains(ModMask::CTRL));
        assert_eq!(ev.name(), "Ctrl+Rune[g]");
    }

    #[test]
    fn typeable_controls_stay_unmodified() {
        for (rune, key) in [
            ('\x08', Key::Backspace),
            ('\t', Key::Tab),
            ('\r', Key::Enter),
            ('\x1b', Key::Esc),
        ] {
            let ev = KeyEvent::new(Key::Rune, rune, ModMask::empty());
            assert_eq!(ev.key, key);
            assert!(ev.mods.is_empty(), "{key:?} must not imply Ctrl");
        }
        let del = KeyEvent::new(Key::Rune, '\x7f', ModMask::empty());
        assert_eq!(del.key, Key::Backspace2);
    }

    #[test]
    fn function_key_names() {
        let ev = KeyEvent::new(Key::F(3), '\0', ModMask::SHIFT);
        assert_eq!(ev.name(), "Shift+F3");
    }

    #[test]
    fn named_keys_pass_through() {
        let ev = KeyEvent::new(Key::PageUp, '\0', ModMask::empty());
        assert_eq!(ev.key, Key::PageUp);
        assert_eq!(ev.name(), "PgUp");
    }
}
