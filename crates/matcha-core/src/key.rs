use std::fmt;

/// Identity of a pressed key.
///
/// Printable input arrives as [`Key::Char`]; everything the terminal encodes
/// as a control byte or escape sequence arrives as a named variant.  Control
/// characters that have a conventional name of their own (`enter`, `tab`,
/// `backspace`) use it instead of their `ctrl+` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (including space).
    Char(char),
    /// Carriage return (0x0D).
    Enter,
    /// Horizontal tab (0x09).
    Tab,
    /// Shift+Tab (`CSI Z`).
    BackTab,
    /// DEL (0x7F).
    Backspace,
    /// A bare escape key.
    Esc,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Insert.
    Insert,
    /// Delete (forward).
    Delete,
    /// Function key `F1`..`F12`.
    F(u8),
    /// A control chord, e.g. `Ctrl('c')` for 0x03.
    Ctrl(char),
    /// NUL (0x00).
    Null,
}

/// A decoded keyboard message.
///
/// `alt` is set when the key was prefixed with a lone ESC (the terminal's
/// encoding of the Alt/Meta modifier).  `paste` is set for keys decoded while
/// inside a bracketed-paste region, letting applications distinguish typed
/// input from pasted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub key: Key,
    /// Alt/Meta modifier (ESC-prefixed).
    pub alt: bool,
    /// True when this key arrived inside a bracketed paste.
    pub paste: bool,
}

impl KeyEvent {
    /// A plain key press without modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            alt: false,
            paste: false,
        }
    }

    pub(crate) fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub(crate) fn with_paste(mut self) -> Self {
        self.paste = true;
        self
    }

    /// True if this is the plain (unmodified, non-paste) character `c`.
    pub fn is_char(&self, c: char) -> bool {
        self.key == Key::Char(c) && !self.alt && !self.paste
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        KeyEvent::new(key)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt {
            write!(f, "alt+{}", self.key)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => write!(f, "enter"),
            Key::Tab => write!(f, "tab"),
            Key::BackTab => write!(f, "shift+tab"),
            Key::Backspace => write!(f, "backspace"),
            Key::Esc => write!(f, "esc"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::Left => write!(f, "left"),
            Key::Right => write!(f, "right"),
            Key::Home => write!(f, "home"),
            Key::End => write!(f, "end"),
            Key::PageUp => write!(f, "pgup"),
            Key::PageDown => write!(f, "pgdown"),
            Key::Insert => write!(f, "insert"),
            Key::Delete => write!(f, "delete"),
            Key::F(n) => write!(f, "f{n}"),
            Key::Ctrl(c) => write!(f, "ctrl+{c}"),
            Key::Null => write!(f, "null"),
        }
    }
}

/// Map a C0 control byte (or DEL) to its key, per the fixed control table.
///
/// ESC (0x1B) is excluded: the decoder treats it as the start of an escape
/// sequence and only delivers a bare `esc` when nothing follows.
pub(crate) fn control_key(byte: u8) -> Option<Key> {
    let key = match byte {
        0x00 => Key::Null,
        0x09 => Key::Tab,
        0x0D => Key::Enter,
        0x7F => Key::Backspace,
        0x1B => return None,
        0x01..=0x1A => Key::Ctrl((b'a' + (byte - 0x01)) as char),
        0x1C => Key::Ctrl('\\'),
        0x1D => Key::Ctrl(']'),
        0x1E => Key::Ctrl('^'),
        0x1F => Key::Ctrl('_'),
        _ => return None,
    };
    Some(key)
}

/// Map a complete CSI sequence (numeric parameters plus final byte) to a key.
///
/// The second parameter, when present, is the xterm modifier encoding
/// (value - 1 is a bitmask: 1 shift, 2 alt, 4 ctrl); only the alt bit is
/// representable on [`KeyEvent`], the rest are ignored.  Returns `None` for
/// sequences that do not name a key — the decoder drops those silently.
pub(crate) fn csi_key(params: &[u16], final_byte: u8) -> Option<KeyEvent> {
    let key = match final_byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'Z' => Key::BackTab,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => Key::Home,
            2 => Key::Insert,
            3 => Key::Delete,
            4 | 8 => Key::End,
            5 => Key::PageUp,
            6 => Key::PageDown,
            n @ 11..=15 => Key::F((n - 10) as u8),
            n @ 17..=21 => Key::F((n - 11) as u8),
            n @ 23..=24 => Key::F((n - 12) as u8),
            _ => return None,
        },
        _ => return None,
    };

    let mut event = KeyEvent::new(key);
    if let Some(modifier) = params.get(1) {
        if modifier.saturating_sub(1) & 0x2 != 0 {
            event = event.with_alt();
        }
    }
    Some(event)
}

/// Map an SS3 (`ESC O`) final byte to a key (application-mode arrows, F1-F4).
pub(crate) fn ss3_key(byte: u8) -> Option<Key> {
    let key = match byte {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_table_named_keys() {
        assert_eq!(control_key(0x0D), Some(Key::Enter));
        assert_eq!(control_key(0x09), Some(Key::Tab));
        assert_eq!(control_key(0x7F), Some(Key::Backspace));
        assert_eq!(control_key(0x00), Some(Key::Null));
    }

    #[test]
    fn control_table_ctrl_letters() {
        assert_eq!(control_key(0x01), Some(Key::Ctrl('a')));
        assert_eq!(control_key(0x03), Some(Key::Ctrl('c')));
        assert_eq!(control_key(0x1A), Some(Key::Ctrl('z')));
        assert_eq!(control_key(0x1F), Some(Key::Ctrl('_')));
    }

    #[test]
    fn control_table_excludes_esc() {
        assert_eq!(control_key(0x1B), None);
    }

    #[test]
    fn csi_arrows_and_tilde_keys() {
        assert_eq!(csi_key(&[], b'A'), Some(KeyEvent::new(Key::Up)));
        assert_eq!(csi_key(&[5], b'~'), Some(KeyEvent::new(Key::PageUp)));
        assert_eq!(csi_key(&[15], b'~'), Some(KeyEvent::new(Key::F(5))));
        assert_eq!(csi_key(&[24], b'~'), Some(KeyEvent::new(Key::F(12))));
    }

    #[test]
    fn csi_modifier_alt_bit() {
        let event = csi_key(&[1, 3], b'A').unwrap();
        assert_eq!(event.key, Key::Up);
        assert!(event.alt);

        // shift-only modifier leaves alt unset
        let event = csi_key(&[1, 2], b'A').unwrap();
        assert!(!event.alt);
    }

    #[test]
    fn csi_unknown_final_is_none() {
        assert_eq!(csi_key(&[], b'y'), None);
        assert_eq!(csi_key(&[99], b'~'), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(KeyEvent::new(Key::Ctrl('c')).to_string(), "ctrl+c");
        assert_eq!(KeyEvent::new(Key::Char('a')).with_alt().to_string(), "alt+a");
        assert_eq!(KeyEvent::new(Key::PageUp).to_string(), "pgup");
        assert_eq!(KeyEvent::new(Key::Char(' ')).to_string(), "space");
    }
}
