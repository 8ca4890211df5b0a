//! Mouse events: button masks and the synthesized motion state.

use crate::ModMask;
use std::time::Instant;

bitflags::bitflags! {
    /// Mouse buttons and wheel impulses reported by the terminal.
    ///
    /// Buttons follow the X11 numbering: 1 is the primary button,
    /// 2 the middle, 3 the secondary.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ButtonMask: u16 {
        const BUTTON1 = 1 << 0;
        const BUTTON2 = 1 << 1;
        const BUTTON3 = 1 << 2;
        const BUTTON4 = 1 << 3;
        const BUTTON5 = 1 << 4;
        const BUTTON6 = 1 << 5;
        const BUTTON7 = 1 << 6;
        const BUTTON8 = 1 << 7;
        const WHEEL_UP    = 1 << 8;
        const WHEEL_DOWN  = 1 << 9;
        const WHEEL_LEFT  = 1 << 10;
        const WHEEL_RIGHT = 1 << 11;
    }
}

impl ButtonMask {
    /// The pressed-button bits, with wheel impulses masked out.
    pub fn buttons(self) -> ButtonMask {
        self & !(ButtonMask::WHEEL_UP
            | ButtonMask::WHEEL_DOWN
            | ButtonMask::WHEEL_LEFT
            | ButtonMask::WHEEL_RIGHT)
    }

    /// The wheel bits alone.
    pub fn wheel(self) -> ButtonMask {
        self & (ButtonMask::WHEEL_UP
            | ButtonMask::WHEEL_DOWN
            | ButtonMask::WHEEL_LEFT
            | ButtonMask::WHEEL_RIGHT)
    }
}

/// State tag synthesized from the raw button/position stream.
///
/// `DragStart` is emitted on the first motion with a button held,
/// `DragMove` on subsequent motion, and `DragStop` when the drag ends,
/// whether by release or by a different button arriving mid-drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseState {
    None,
    Move,
    ButtonPress,
    ButtonRelease,
    WheelImpulse,
    DragStart,
    DragMove,
    DragStop,
}

/// A decoded mouse record with its synthesized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub when: Instant,
    pub x: i32,
    pub y: i32,
    pub buttons: ButtonMask,
    pub mods: ModMask,
    pub state: MouseState,
}

impl MouseEvent {
    pub fn new(x: i32, y: i32, buttons: ButtonMask, mods: ModMask, state: MouseState) -> Self {
        Self {
            when: Instant::now(),
            x,
            y,
            buttons,
            mods,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_and_buttons_split() {
        let m = ButtonMask::BUTTON1 | ButtonMask::WHEEL_DOWN;
        assert_eq!(m.buttons(), ButtonMask::BUTTON1);
        assert_eq!(m.wheel(), ButtonMask::WHEEL_DOWN);
    }
}
