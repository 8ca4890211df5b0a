//! Low-level TTY device handling: raw mode, geometry, input pushback.

use core_events::{Error, Result};
use nix::sys::termios::{self, SetArg, Termios};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, libc::winsize);
nix::ioctl_write_ptr_bad!(tiocsti_ioctl, libc::TIOCSTI, libc::c_char);

/// An owned terminal device in a known mode.
///
/// The saved termios is captured on the first switch to raw mode and
/// restored on `restore`; opening a non-TTY fails with `NoDisplay`
/// (probed via `tcgetattr`, which only succeeds on terminals).
pub(crate) struct Tty {
    file: File,
    saved: Termios,
}

impl Tty {
    pub fn open_default() -> Result<Tty> {
        Self::open_path(Path::new("/dev/tty"))
    }

    pub fn open_path(path: &Path) -> Result<Tty> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| Error::NoDisplay)?;
        Self::from_handle(file)
    }

    pub fn from_handle(file: File) -> Result<Tty> {
        let saved = termios::tcgetattr(&file).map_err(|_| Error::NoDisplay)?;
        Ok(Tty { file, saved })
    }

    /// Switch the device to raw mode (no echo, no line buffering, no
    /// signal generation).
    pub fn raw(&mut self) -> Result<()> {
        let mut raw = self.saved.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&self.file, SetArg::TCSAFLUSH, &raw)
            .map_err(|e| Error::Io(io::Error::other(e)))?;
        Ok(())
    }

    /// Restore the mode saved at open.
    pub fn restore(&mut self) -> Result<()> {
        termios::tcsetattr(&self.file, SetArg::TCSAFLUSH, &self.saved)
            .map_err(|e| Error::Io(io::Error::other(e)))?;
        Ok(())
    }

    /// Kernel-reported window size in cells, if the ioctl succeeds
    /// with a nonzero geometry.
    pub fn window_size(&self) -> Option<(usize, usize)> {
        let mut ws = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let ok = unsafe { tiocgwinsz(self.file.as_raw_fd(), &mut ws) }.is_ok();
        if ok && ws.ws_col > 0 && ws.ws_row > 0 {
            Some((ws.ws_col as usize, ws.ws_row as usize))
        } else {
            None
        }
    }

    /// Push one byte into the device's input queue, unblocking a
    /// reader stuck in a blocking read. Fails on kernels that compile
    /// out `TIOCSTI`; callers must tolerate that.
    pub fn push_input_byte(&self, b: u8) -> io::Result<()> {
        let c = b as libc::c_char;
        unsafe { tiocsti_ioctl(self.file.as_raw_fd(), &c) }
            .map(|_| ())
            .map_err(io::Error::other)
    }

    /// Duplicate handle for a dedicated reader thread or a released
    /// child process.
    pub fn duplicate(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

/// Read a chunk from the duplicated reader handle, honoring a poll
/// timeout so deadlines and shutdown flags get a chance to run.
/// Returns `Ok(None)` on timeout.
pub(crate) fn read_chunk(
    file: &mut File,
    buf: &mut [u8],
    timeout_ms: u16,
) -> io::Result<Option<usize>> {
    use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
    use std::os::fd::AsFd;

    let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
    let n = poll(&mut fds, PollTimeout::from(timeout_ms)).map_err(io::Error::other)?;
    if n == 0 {
        return Ok(None);
    }
    match file.read(buf) {
        Ok(0) => Err(io::ErrorKind::UnexpectedEof.into()),
        Ok(n) => Ok(Some(n)),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e),
    }
}
