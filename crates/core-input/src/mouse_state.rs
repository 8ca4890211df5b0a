//! Mouse state synthesis.
//!
//! Terminals report raw button masks and positions; applications want
//! press/release/drag semantics. A single-slot prior record is enough:
//! given the previous mask, the current mask and the position delta,
//! the state tag is fully determined.
//!
//! A different button arriving mid-drag terminates the drag: the
//! record emits `DragStop` and forgets the held mask, so the very next
//! record reports `ButtonPress` for the new button.

use core_events::{ButtonMask, ModMask, MouseEvent, MouseState};

#[derive(Debug, Default)]
pub struct MouseSynth {
    buttons: ButtonMask,
    x: i32,
    y: i32,
    dragging: bool,
}

impl MouseSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw record into the prior state, returning the event
    /// to deliver (or `None` when the record changes nothing).
    pub fn note(
        &mut self,
        x: i32,
        y: i32,
        buttons: ButtonMask,
        mods: ModMask,
    ) -> Option<MouseEvent> {
        let wheel = buttons.wheel();
        let pressed = buttons.buttons();
        let prior = self.buttons;
        let moved = x != self.x || y != self.y;

        let state = if pressed.is_empty() && !wheel.is_empty() {
            self.x = x;
            self.y = y;
            return Some(MouseEvent::new(x, y, buttons, mods, MouseState::WheelImpulse));
        } else if prior.is_empty() && !pressed.is_empty() {
            self.dragging = false;
            MouseState::ButtonPress
        } else if !prior.is_empty() && pressed == prior {
            if !moved {
                self.x = x;
                self.y = y;
                return None;
            }
            if self.dragging {
                MouseState::DragMove
            } else {
                self.dragging = true;
                MouseState::DragStart
            }
        } else if !prior.is_empty() && pressed.is_empty() {
            let state = if self.dragging {
                MouseState::DragStop
            } else {
                MouseState::ButtonRelease
            };
            self.dragging = false;
            state
        } else if !prior.is_empty() && pressed != prior {
            // Another button mid-interaction. End any drag now and
            // forget the mask; the next record presses the new button.
            let was_dragging = self.dragging;
            self.dragging = false;
            self.buttons = ButtonMask::empty();
            self.x = x;
            self.y = y;
            let state = if was_dragging {
                MouseState::DragStop
            } else {
                MouseState::ButtonPress
            };
            if !was_dragging {
                self.buttons = pressed;
            }
            return Some(MouseEvent::new(x, y, buttons, mods, state));
        } else {
            if !moved {
                return None;
            }
            MouseState::Move
        };

        self.buttons = pressed;
        self.x = x;
        self.y = y;
        Some(MouseEvent::new(x, y, buttons, mods, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const B1: ButtonMask = ButtonMask::BUTTON1;
    const B3: ButtonMask = ButtonMask::BUTTON3;
    const NONE: ButtonMask = ButtonMask::empty();
    const M: ModMask = ModMask::empty();

    fn states(records: &[(i32, i32, ButtonMask)]) -> Vec<MouseState> {
        let mut synth = MouseSynth::new();
        records
            .iter()
            .filter_map(|&(x, y, b)| synth.note(x, y, b, M))
            .map(|ev| ev.state)
            .collect()
    }

    #[test]
    fn click_without_motion_is_press_release() {
        assert_eq!(
            states(&[(4, 4, B1), (4, 4, NONE)]),
            vec![MouseState::ButtonPress, MouseState::ButtonRelease]
        );
    }

    #[test]
    fn drag_lifecycle() {
        assert_eq!(
            states(&[(1, 1, B1), (2, 1, B1), (3, 1, B1), (3, 1, NONE)]),
            vec![
                MouseState::ButtonPress,
                MouseState::DragStart,
                MouseState::DragMove,
                MouseState::DragStop,
            ]
        );
    }

    #[test]
    fn motion_without_buttons_moves() {
        assert_eq!(
            states(&[(1, 1, NONE), (2, 2, NONE)]),
            vec![MouseState::Move, MouseState::Move]
        );
    }

    #[test]
    fn wheel_reports_impulse_regardless_of_motion() {
        assert_eq!(
            states(&[(5, 5, ButtonMask::WHEEL_DOWN), (5, 5, ButtonMask::WHEEL_UP)]),
            vec![MouseState::WheelImpulse, MouseState::WheelImpulse]
        );
    }

    #[test]
    fn second_button_mid_drag_stops_then_presses() {
        assert_eq!(
            states(&[(1, 1, B1), (2, 1, B1), (2, 1, B1 | B3), (2, 1, B1 | B3)]),
            vec![
                MouseState::ButtonPress,
                MouseState::DragStart,
                MouseState::DragStop,
                MouseState::ButtonPress,
            ]
        );
    }

    #[test]
    fn duplicate_record_is_silent() {
        assert_eq!(
            states(&[(1, 1, B1), (1, 1, B1), (1, 1, NONE)]),
            vec![MouseState::ButtonPress, MouseState::ButtonRelease]
        );
    }
}
