//! The display loop: a multi-thread scheduler around one screen.
//!
//! Four cooperating workers run after startup: the input reader
//! (draining the screen's event channel), the event coalescer
//! (ordered buffering with optional compression), the request
//! coalescer (deduplicated Draw/Show/Sync/Func/Quit execution), and
//! the main task, which runs on the caller's thread inside [`Display::run`].
//!
//! Cancellation is cooperative: a single `done` channel is closed
//! exactly once and every worker selects on it.

mod display;
mod signal;
mod timer;

pub use display::{Display, DisplayConfig, DisplayHandle, MainFn, ScreenFn};
pub use signal::{Flow, ListenerId, Signal};
pub use timer::TimerId;
