//! Boundary errors surfaced by the runtime.

use std::io;

/// Error kinds visible at the runtime's public edges.
///
/// Worker-internal I/O failures are wrapped in `Io` and posted as
/// `Event::Error`; they never terminate a worker on their own.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `$TERM` has no capability record, or the record lacks absolute
    /// cursor addressing.
    #[error("terminal type not found or unusable")]
    TermNotFound,

    /// No usable TTY device.
    #[error("no usable display device")]
    NoDisplay,

    /// The locale resolves to a character set the runtime cannot
    /// transcode.
    #[error("character set {0:?} is not supported")]
    NoCharset(String),

    /// The bounded event queue was saturated on `post_event`.
    #[error("event queue full")]
    QueueFull,

    /// A display-loop call primitive was invoked while the loop was
    /// not active.
    #[error("display loop is not running")]
    NotRunning,

    /// A screen operation requiring the captured terminal was invoked
    /// before startup completed (or after release).
    #[error("screen has not captured the terminal")]
    NotCaptured,

    /// External-command support was disabled at build time.
    #[error("external command support disabled at build time")]
    CallDisabled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_wrap() {
        let e: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn display_strings_are_stable() {
        assert_eq!(Error::QueueFull.to_string(), "event queue full");
        assert_eq!(
            Error::NoCharset("EBCDIC".into()).to_string(),
            "character set \"EBCDIC\" is not supported"
        );
    }
}
