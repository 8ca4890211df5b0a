//! Core event types and the runtime error boundary for hexes.
//!
//! Events are produced by a screen's input machinery and consumed by the
//! display loop; every variant carries the monotonic instant at which it
//! was observed. The error enum lives here (rather than next to the
//! screen) because `Event::Error` must be able to carry it without a
//! dependency cycle.

mod error;
mod key;
mod mouse;

pub use error::{Error, Result};
pub use key::{Key, KeyEvent};
pub use mouse::{ButtonMask, MouseEvent, MouseState};

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

bitflags::bitflags! {
    /// Keyboard modifier state attached to key and mouse events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModMask: u8 {
        const SHIFT = 0b0000_0001;
        const CTRL  = 0b0000_0010;
        const ALT   = 0b0000_0100;
        const META  = 0b0000_1000;
    }
}

/// Terminal geometry change, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub when: Instant,
    pub width: usize,
    pub height: usize,
}

impl ResizeEvent {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            when: Instant::now(),
            width,
            height,
        }
    }
}

/// Bracketed-paste frame marker. Runes between a `start` and its
/// matching end marker arrive as ordinary key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteEvent {
    pub when: Instant,
    pub start: bool,
}

impl PasteEvent {
    pub fn new(start: bool) -> Self {
        Self {
            when: Instant::now(),
            start,
        }
    }
}

/// A failure surfaced through the event stream instead of killing the
/// worker that observed it.
#[derive(Debug)]
pub struct ErrorEvent {
    pub when: Instant,
    pub error: Error,
}

impl ErrorEvent {
    pub fn new(error: Error) -> Self {
        Self {
            when: Instant::now(),
            error,
        }
    }
}

/// Out-of-band wakeup posted by the application (or by the Ctrl-C
/// capture path). The payload is opaque to the runtime.
pub struct InterruptEvent {
    pub when: Instant,
    pub payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl InterruptEvent {
    pub fn new(payload: Option<Arc<dyn Any + Send + Sync>>) -> Self {
        Self {
            when: Instant::now(),
            payload,
        }
    }
}

impl fmt::Debug for InterruptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptEvent")
            .field("when", &self.when)
            .field("payload", &self.payload.as_ref().map(|_| "<opaque>"))
            .finish()
    }
}

/// Top-level event enum delivered to the application.
#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(ResizeEvent),
    Paste(PasteEvent),
    Error(ErrorEvent),
    Interrupt(InterruptEvent),
}

/// Discriminant used by the display loop's buffer compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Key,
    Mouse,
    Resize,
    Paste,
    Error,
    Interrupt,
}

impl Event {
    pub fn when(&self) -> Instant {
        match self {
            Event::Key(e) => e.when,
            Event::Mouse(e) => e.when,
            Event::Resize(e) => e.when,
            Event::Paste(e) => e.when,
            Event::Error(e) => e.when,
            Event::Interrupt(e) => e.when,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Key(_) => EventKind::Key,
            Event::Mouse(_) => EventKind::Mouse,
            Event::Resize(_) => EventKind::Resize,
            Event::Paste(_) => EventKind::Paste,
            Event::Error(_) => EventKind::Error,
            Event::Interrupt(_) => EventKind::Interrupt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_discriminate() {
        let k = Event::Key(KeyEvent::new(Key::Rune, 'x', ModMask::empty()));
        let r = Event::Resize(ResizeEvent::new(80, 25));
        assert_eq!(k.kind(), EventKind::Key);
        assert_eq!(r.kind(), EventKind::Resize);
        assert_ne!(k.kind(), r.kind());
    }

    #[test]
    fn interrupt_debug_is_opaque() {
        let ev = InterruptEvent::new(Some(Arc::new(42usize)));
        let s = format!("{ev:?}");
        assert!(s.contains("<opaque>"));
        assert!(!s.contains("42"));
    }
}
