use std::fmt;

/// Which physical button a mouse report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// No button (motion-only reports, or a release in older encodings).
    None,
    /// Left button.
    Left,
    /// Middle button.
    Middle,
    /// Right button.
    Right,
    /// Scroll wheel up.
    WheelUp,
    /// Scroll wheel down.
    WheelDown,
}

/// What happened to the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    /// Button pressed.  Wheel events are always presses — terminals never
    /// report a wheel release.
    Press,
    /// Button released.
    Release,
    /// Pointer moved (only reported in a motion-tracking mode).
    Motion,
}

/// A decoded mouse message.
///
/// Coordinates are zero-based terminal cells, `(0, 0)` at the top left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// Zero-based column.
    pub x: u16,
    /// Zero-based row.
    pub y: u16,
    /// Button involved, if any.
    pub button: MouseButton,
    /// Press, release, or motion.
    pub action: MouseAction,
    /// Shift was held.
    pub shift: bool,
    /// Alt/Meta was held.
    pub alt: bool,
    /// Ctrl was held.
    pub ctrl: bool,
}

impl fmt::Display for MouseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            MouseAction::Press => "press",
            MouseAction::Release => "release",
            MouseAction::Motion => "motion",
        };
        let button = match self.button {
            MouseButton::None => "none",
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
            MouseButton::WheelUp => "wheel-up",
            MouseButton::WheelDown => "wheel-down",
        };
        write!(f, "{button} {action} ({}, {})", self.x, self.y)
    }
}

// SGR (xterm 1006) button-code bitfield layout.
const BTN_MASK: u16 = 0b0011;
const MOD_SHIFT: u16 = 0b0000_0100;
const MOD_ALT: u16 = 0b0000_1000;
const MOD_CTRL: u16 = 0b0001_0000;
const MOTION_BIT: u16 = 0b0010_0000;
const WHEEL_BIT: u16 = 0b0100_0000;

/// Decode an SGR mouse report from its numeric parameters and final byte.
///
/// The caller has already matched `ESC [ <` and split the three `;`-separated
/// parameters; `final_byte` is `M` (press) or `m` (release).  Columns and
/// rows arrive 1-based and are converted to 0-based.  Returns `None` for
/// parameter combinations outside the encoding.
pub(crate) fn decode_sgr(params: &[u16], final_byte: u8) -> Option<MouseEvent> {
    if params.len() != 3 {
        return None;
    }
    let code = params[0];
    let x = params[1].checked_sub(1)?;
    let y = params[2].checked_sub(1)?;

    let (button, action) = if code & WHEEL_BIT != 0 {
        let button = match code & BTN_MASK {
            0 => MouseButton::WheelUp,
            1 => MouseButton::WheelDown,
            _ => return None,
        };
        // Wheel reports have no release counterpart.
        (button, MouseAction::Press)
    } else {
        let button = match code & BTN_MASK {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::None,
        };
        let action = if code & MOTION_BIT != 0 {
            MouseAction::Motion
        } else if final_byte == b'm' {
            MouseAction::Release
        } else {
            MouseAction::Press
        };
        (button, action)
    };

    Some(MouseEvent {
        x,
        y,
        button,
        action,
        shift: code & MOD_SHIFT != 0,
        alt: code & MOD_ALT != 0,
        ctrl: code & MOD_CTRL != 0,
    })
}
