//! Screen abstraction: a cell grid bound to a terminal.
//!
//! [`TtyScreen`] owns a real TTY (raw mode, capability-driven output,
//! decoded input, SIGWINCH). [`OffscreenScreen`] satisfies the same
//! trait against an in-memory front buffer with externally injected
//! events, for deterministic tests. Code above this crate holds a
//! `Box<dyn Screen>` and cannot tell them apart.

mod acs;
mod offscreen;
mod screen;
mod tty;

pub use offscreen::{OffscreenScreen, SimCell};
pub use screen::TtyScreen;

use core_events::{Error, Event, Key, Result};
use core_render::Style;
use crossbeam_channel::Receiver;
use std::fs::File;
use std::io;

/// Closure run on the released TTY by [`Screen::call`]; the two files
/// are duplicated handles usable as the child's stdin and stdout.
pub type CallClosure = Box<dyn FnOnce(&mut File, &mut File) -> io::Result<()> + Send>;

bitflags::bitflags! {
    /// Which classes of mouse traffic to request from the terminal.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MouseFlags: u8 {
        /// Press and release reports (xterm mode 1000).
        const BUTTONS = 1 << 0;
        /// Motion while a button is held (mode 1002).
        const DRAG = 1 << 1;
        /// All motion (mode 1003).
        const MOTION = 1 << 2;
    }
}

/// The terminal surface contract shared by the live and offscreen
/// screens.
///
/// Lifecycle: a screen starts uninitialized; `init` captures the
/// terminal; `close` finalizes exactly once and is safe to repeat.
pub trait Screen: Send {
    /// Capture the terminal: raw mode, alternate screen, size query,
    /// worker startup.
    fn init(&mut self) -> Result<()>;

    /// Release everything `init` acquired. Idempotent.
    fn close(&mut self);

    /// Set the ambient style used for cells carrying the default
    /// style sentinel.
    fn set_style(&mut self, style: Style);

    fn set_content(&mut self, x: usize, y: usize, ch: char, comb: &[char], style: Style);

    /// Current state of a cell; out-of-bounds reads width `-1`.
    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style, isize);

    fn fill(&mut self, ch: char, style: Style);

    /// `fill(' ', ambient)`.
    fn clear(&mut self);

    fn size(&self) -> (usize, usize);

    /// Colors the terminal supports; 0 for monochrome.
    fn colors(&self) -> usize;

    /// Whether `ch` is representable, optionally consulting the
    /// alternate-charset and user fallback tables.
    fn can_display(&self, ch: char, check_fallbacks: bool) -> bool;

    /// Whether the terminal can report this key at all.
    fn has_key(&self, key: Key) -> bool;

    /// Diff-render: converge the terminal toward the grid, flushing
    /// once.
    fn show(&mut self) -> Result<()>;

    /// Full repaint: clear, invalidate, then `show`.
    fn sync(&mut self) -> Result<()>;

    fn set_cursor(&mut self, x: usize, y: usize);
    fn hide_cursor(&mut self);

    fn enable_mouse(&mut self, flags: MouseFlags) -> Result<()>;
    fn disable_mouse(&mut self) -> Result<()>;
    fn enable_paste(&mut self) -> Result<()>;
    fn disable_paste(&mut self) -> Result<()>;

    /// Block until the next event. `None` after close.
    fn poll_event(&self) -> Option<Event>;

    /// Inject an event into the queue; `QueueFull` when saturated.
    fn post_event(&self, ev: Event) -> Result<()>;

    /// The channel the display loop drains; shares the queue with
    /// `poll_event`.
    fn event_channel(&self) -> Receiver<Event>;

    fn beep(&mut self) -> Result<()>;

    /// Override the byte string emitted when the terminal's encoding
    /// cannot represent `ch`.
    fn register_rune_fallback(&mut self, ch: char, replacement: &str);
    fn unregister_rune_fallback(&mut self, ch: char);

    /// Write the string to the terminal's clipboard via OSC-52.
    fn copy_to_clipboard(&mut self, s: &str) -> Result<()>;

    /// Release the terminal, run `f` with duplicated handles, then
    /// re-capture and repaint.
    fn call(&mut self, f: CallClosure) -> Result<()>;

    /// Do not close the underlying file handle on finalize.
    fn keep_file_handle(&mut self, keep: bool);

    /// Translate Ctrl-C into an `Interrupt` event instead of
    /// delivering it as a key.
    fn set_capture_ctrl_c(&mut self, capture: bool);

    /// Name of the active character set, e.g. `"UTF-8"`.
    fn charset(&self) -> &'static str;
}

/// Shared helper: keys every terminal can produce regardless of its
/// capability record.
pub(crate) fn universal_key(key: Key) -> bool {
    matches!(
        key,
        Key::Rune
            | Key::Enter
            | Key::Tab
            | Key::Backspace
            | Key::Backspace2
            | Key::Esc
    )
}

pub(crate) fn queue_error(e: crossbeam_channel::TrySendError<Event>) -> Error {
    match e {
        crossbeam_channel::TrySendError::Full(_) => Error::QueueFull,
        crossbeam_channel::TrySendError::Disconnected(_) => Error::NotCaptured,
    }
}
