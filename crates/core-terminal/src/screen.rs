//! The live TTY screen.
//!
//! Owns the terminal device exclusively: raw mode and the saved
//! termios, the cell grid, cursor state, the input decoder (on its
//! reader thread) and the output writer. Rendering is a diff pass
//! over the grid, emitting only what changed since the last flush.
//!
//! Worker threads:
//! * reader — blocking reads on a duplicated handle, feeding the
//!   decoder; decode errors and I/O failures become `Event::Error`
//!   posts, never thread death.
//! * signal watcher — SIGWINCH via signal-hook, posting `Resize` and
//!   flagging the grid for reallocation on the next render.

use crate::tty::{read_chunk, Tty};
use crate::{acs, universal_key, CallClosure, MouseFlags, Screen};
use core_encoding::Charset;
use core_events::{
    Error, ErrorEvent, Event, InterruptEvent, Key, ModMask, ResizeEvent, Result,
};
use core_input::Decoder;
use core_render::{find_color, standard_palette, AttrMask, CellBuffer, Color, Style};
use core_terminfo::Terminfo;
use crossbeam_channel::{bounded, Receiver, Sender};
use signal_hook::consts::signal::SIGWINCH;
use signal_hook::iterator::Signals;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Bounded event queue depth; `post_event` fails once saturated.
const EVENT_QUEUE_CAP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Captured,
    Released,
    Finalized,
}

enum Device {
    Default,
    Path(PathBuf),
    Handle(Option<File>),
}

pub struct TtyScreen {
    ti: &'static Terminfo,
    charset: Charset,
    device: Device,
    tty: Option<Tty>,
    state: State,
    cb: CellBuffer,
    ambient: Style,
    /// Style currently live on the wire, if known.
    wire_style: Option<Style>,
    /// Wire cursor position; `None` after operations that leave it
    /// unknown.
    wire_cursor: Option<(usize, usize)>,
    cursor: (usize, usize),
    cursor_visible: bool,
    palette: Vec<Color>,
    truecolor: bool,
    fallbacks: HashMap<char, String>,
    mouse_flags: MouseFlags,
    paste_enabled: bool,
    keep_handle: bool,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    stop: Arc<AtomicBool>,
    winch: Arc<AtomicBool>,
    released: Arc<(Mutex<bool>, Condvar)>,
    capture_ctrl_c: Arc<AtomicBool>,
    signal_handle: Option<signal_hook::iterator::Handle>,
    workers: Vec<JoinHandle<()>>,
}

impl TtyScreen {
    /// Screen on the controlling terminal (`/dev/tty`).
    pub fn new() -> Result<TtyScreen> {
        Self::build(Device::Default)
    }

    /// Screen on an explicit device path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<TtyScreen> {
        Self::build(Device::Path(path.into()))
    }

    /// Screen on an already-open terminal handle.
    pub fn with_handle(file: File) -> Result<TtyScreen> {
        Self::build(Device::Handle(Some(file)))
    }

    fn build(device: Device) -> Result<TtyScreen> {
        let term = std::env::var("TERM").unwrap_or_default();
        let ti = core_terminfo::lookup(&term).map_err(|_| Error::TermNotFound)?;
        if ti.set_cursor.is_empty() {
            return Err(Error::TermNotFound);
        }
        let label = core_encoding::charset_from_env();
        let charset = Charset::from_label(&label).ok_or(Error::NoCharset(label))?;
        let truecolor = core_terminfo::truecolor(ti, std::env::var("COLORTERM").ok().as_deref());
        let (tx, rx) = bounded(EVENT_QUEUE_CAP);
        Ok(TtyScreen {
            ti,
            charset,
            device,
            tty: None,
            state: State::Uninitialized,
            cb: CellBuffer::default(),
            ambient: Style::default(),
            wire_style: None,
            wire_cursor: None,
            cursor: (0, 0),
            cursor_visible: false,
            palette: standard_palette(ti.colors),
            truecolor,
            fallbacks: HashMap::new(),
            mouse_flags: MouseFlags::empty(),
            paste_enabled: false,
            keep_handle: false,
            tx,
            rx,
            stop: Arc::new(AtomicBool::new(false)),
            winch: Arc::new(AtomicBool::new(false)),
            released: Arc::new((Mutex::new(false), Condvar::new())),
            capture_ctrl_c: Arc::new(AtomicBool::new(false)),
            signal_handle: None,
            workers: Vec::new(),
        })
    }

    fn open_device(&mut self) -> Result<Tty> {
        match &mut self.device {
            Device::Default => Tty::open_default(),
            Device::Path(p) => {
                let path = p.clone();
                Tty::open_path(&path)
            }
            Device::Handle(h) => match h.take() {
                Some(file) => Tty::from_handle(file),
                None => Err(Error::NoDisplay),
            },
        }
    }

    fn env_geometry() -> Option<(usize, usize)> {
        let cols = std::env::var("COLUMNS").ok()?.parse().ok()?;
        let lines = std::env::var("LINES").ok()?.parse().ok()?;
        Some((cols, lines))
    }

    fn initial_size(&self) -> (usize, usize) {
        self.tty
            .as_ref()
            .and_then(Tty::window_size)
            .or_else(Self::env_geometry)
            .unwrap_or((self.ti.columns, self.ti.lines))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match self.tty.as_mut() {
            Some(tty) => tty.write_all(bytes).map_err(Error::Io),
            None => Err(Error::NotCaptured),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.tty.as_mut() {
            Some(tty) => tty.flush().map_err(Error::Io),
            None => Err(Error::NotCaptured),
        }
    }

    fn spawn_reader(&mut self) -> Result<()> {
        let tty = self.tty.as_ref().ok_or(Error::NotCaptured)?;
        let mut file = tty.duplicate().map_err(Error::Io)?;
        let mut decoder = Decoder::new(self.ti, self.charset);
        let tx = self.tx.clone();
        let stop = self.stop.clone();
        let released = self.released.clone();
        let capture = self.capture_ctrl_c.clone();
        let handle = std::thread::Builder::new()
            .name("hexes-input".into())
            .spawn(move || {
                reader_loop(&mut file, &mut decoder, &tx, &stop, &released, &capture)
            })
            .map_err(Error::Io)?;
        self.workers.push(handle);
        Ok(())
    }

    fn spawn_signal_watcher(&mut self) -> Result<()> {
        let tty = self.tty.as_ref().ok_or(Error::NotCaptured)?;
        let sized = Tty::from_handle(tty.duplicate().map_err(Error::Io)?)?;
        let mut signals = Signals::new([SIGWINCH]).map_err(Error::Io)?;
        self.signal_handle = Some(signals.handle());
        let tx = self.tx.clone();
        let stop = self.stop.clone();
        let winch = self.winch.clone();
        let handle = std::thread::Builder::new()
            .name("hexes-signals".into())
            .spawn(move || {
                for _ in signals.forever() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some((w, h)) = sized.window_size() {
                        winch.store(true, Ordering::SeqCst);
                        debug!(target: "screen.signal", w, h, "window size changed");
                        // Best effort: the winch flag carries the
                        // resize even if the queue is momentarily full.
                        match tx.try_send(Event::Resize(ResizeEvent::new(w, h))) {
                            Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => {}
                            Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                        }
                    }
                }
            })
            .map_err(Error::Io)?;
        self.workers.push(handle);
        Ok(())
    }

    /// Apply a pending SIGWINCH: reallocate the grid and repaint from
    /// scratch on the next pass.
    fn check_resize(&mut self) {
        if !self.winch.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some((w, h)) = self.tty.as_ref().and_then(Tty::window_size) {
            self.cb.resize(w, h);
            self.cb.invalidate();
            self.wire_cursor = None;
            self.wire_style = None;
        }
    }

    fn emit_style(&self, out: &mut Vec<u8>, style: Style) {
        let ti = self.ti;
        out.extend_from_slice(ti.attr_off.as_bytes());
        let attrs = style.attrs;
        for (bit, cap) in [
            (AttrMask::BOLD, ti.bold),
            (AttrMask::UNDERLINE, ti.underline),
            (AttrMask::REVERSE, ti.reverse),
            (AttrMask::BLINK, ti.blink),
            (AttrMask::DIM, ti.dim),
            (AttrMask::ITALIC, ti.italic),
            (AttrMask::STRIKETHROUGH, ti.strikethrough),
        ] {
            if attrs.contains(bit) && !cap.is_empty() {
                out.extend_from_slice(cap.as_bytes());
            }
        }
        if self.ti.colors == 0 {
            return;
        }
        if style.fg.is_reset() || style.bg.is_reset() {
            out.extend_from_slice(ti.reset_fg_bg.as_bytes());
        }
        if let Some((r, g, b)) = style.fg.components() {
            if style.fg.is_rgb() && self.truecolor {
                out.extend_from_slice(ti.fg_rgb(r, g, b).as_bytes());
            } else if let Some(i) = find_color(style.fg, &self.palette).index() {
                out.extend_from_slice(ti.fg(i).as_bytes());
            }
        }
        if let Some((r, g, b)) = style.bg.components() {
            if style.bg.is_rgb() && self.truecolor {
                out.extend_from_slice(ti.bg_rgb(r, g, b).as_bytes());
            } else if let Some(i) = find_color(style.bg, &self.palette).index() {
                out.extend_from_slice(ti.bg(i).as_bytes());
            }
        }
    }

    /// Encode one cell's runes, falling back through the alternate
    /// charset, the user table, then `"?"`.
    fn encode_cell(&self, out: &mut Vec<u8>, ch: char, comb: &[char]) {
        if self.charset.encode_char(ch, out) {
            for &c in comb {
                // Unencodable combining marks are dropped silently.
                let _ = self.charset.encode_char(c, out);
            }
            return;
        }
        if !self.ti.enter_acs.is_empty() {
            if let Some(b) = acs::acs_byte(ch) {
                out.extend_from_slice(self.ti.enter_acs.as_bytes());
                out.push(b);
                out.extend_from_slice(self.ti.exit_acs.as_bytes());
                return;
            }
        }
        if let Some(replacement) = self
            .fallbacks
            .get(&ch)
            .map(String::as_str)
            .or_else(|| acs::ascii_fallback(ch))
        {
            for c in replacement.chars() {
                if !self.charset.encode_char(c, out) {
                    out.push(b'?');
                }
            }
            return;
        }
        out.push(b'?');
    }

    /// Diff pass: walk the grid, emit escapes for dirty cells only,
    /// then restore the application cursor. One flush at the end.
    fn draw(&mut self) -> Result<()> {
        let (w, h) = self.cb.size();
        let mut out: Vec<u8> = Vec::new();
        if !self.ti.hide_cursor.is_empty() {
            out.extend_from_slice(self.ti.hide_cursor.as_bytes());
        }
        let mut cells = 0usize;
        for y in 0..h {
            let mut x = 0usize;
            while x < w {
                if !self.cb.dirty(x, y) {
                    x += self.cb.advance_width(x, y);
                    continue;
                }
                if self.wire_cursor != Some((x, y)) {
                    out.extend_from_slice(self.ti.goto(x, y).as_bytes());
                }
                let (ch, comb, style, width) = self.cb.get_content(x, y);
                let comb = comb.to_vec();
                let style = if style == Style::default() {
                    self.ambient
                } else {
                    style
                };
                if self.wire_style != Some(style) {
                    self.emit_style(&mut out, style);
                    self.wire_style = Some(style);
                }
                let mut width = width.max(1) as usize;
                if width == 2 && x == w - 1 {
                    // A double-width glyph cannot straddle the edge.
                    out.push(b' ');
                    width = 1;
                } else {
                    self.encode_cell(&mut out, ch, &comb);
                    if width == 2 && x + 1 < w {
                        // The covered cell must repaint if the wide
                        // glyph ever goes away.
                        self.cb.set_dirty(x + 1, y, true);
                    }
                }
                self.cb.set_dirty(x, y, false);
                self.wire_cursor = Some((x + width, y));
                cells += 1;
                x += width;
            }
        }
        self.restore_cursor(&mut out);
        trace!(target: "screen.render", cells, bytes = out.len(), "diff pass");
        self.write(&out)?;
        self.flush()
    }

    fn restore_cursor(&mut self, out: &mut Vec<u8>) {
        let (x, y) = self.cursor;
        let (w, h) = self.cb.size();
        if self.cursor_visible && x < w && y < h {
            out.extend_from_slice(self.ti.goto(x, y).as_bytes());
            out.extend_from_slice(self.ti.show_cursor.as_bytes());
            self.wire_cursor = Some((x, y));
        } else if !self.ti.hide_cursor.is_empty() {
            out.extend_from_slice(self.ti.hide_cursor.as_bytes());
        }
    }

    fn engage_modes(&mut self) -> Result<()> {
        let mut out = Vec::new();
        out.extend_from_slice(self.ti.enter_ca.as_bytes());
        out.extend_from_slice(self.ti.enter_keypad.as_bytes());
        out.extend_from_slice(self.ti.hide_cursor.as_bytes());
        out.extend_from_slice(self.ti.attr_off.as_bytes());
        out.extend_from_slice(self.ti.clear.as_bytes());
        self.write(&out)?;
        self.flush()
    }

    fn release_modes(&mut self) {
        let mut out = Vec::new();
        out.extend_from_slice(self.ti.attr_off.as_bytes());
        if self.mouse_flags != MouseFlags::empty() {
            out.extend_from_slice(mouse_mode_bytes(self.mouse_flags, false).as_bytes());
        }
        if self.paste_enabled {
            out.extend_from_slice(self.paste_cap(false).as_bytes());
        }
        out.extend_from_slice(self.ti.exit_keypad.as_bytes());
        out.extend_from_slice(self.ti.exit_ca.as_bytes());
        out.extend_from_slice(self.ti.show_cursor.as_bytes());
        let _ = self.write(&out);
        let _ = self.flush();
    }

    fn paste_cap(&self, enable: bool) -> &'static str {
        if enable {
            if self.ti.enable_paste.is_empty() {
                "\x1b[?2004h"
            } else {
                self.ti.enable_paste
            }
        } else if self.ti.disable_paste.is_empty() {
            "\x1b[?2004l"
        } else {
            self.ti.disable_paste
        }
    }

    fn require_captured(&self) -> Result<()> {
        if self.state == State::Captured {
            Ok(())
        } else {
            Err(Error::NotCaptured)
        }
    }
}

/// `CSI ? mode h/l` strings for the requested tracking classes, always
/// paired with SGR extended reporting (1006).
fn mouse_mode_bytes(flags: MouseFlags, enable: bool) -> String {
    let suffix = if enable { 'h' } else { 'l' };
    let mut s = String::new();
    if flags.contains(MouseFlags::BUTTONS) {
        s.push_str(&format!("\x1b[?1000{suffix}"));
    }
    if flags.contains(MouseFlags::DRAG) {
        s.push_str(&format!("\x1b[?1002{suffix}"));
    }
    if flags.contains(MouseFlags::MOTION) {
        s.push_str(&format!("\x1b[?1003{suffix}"));
    }
    s.push_str(&format!("\x1b[?1006{suffix}"));
    s
}

fn reader_loop(
    file: &mut File,
    decoder: &mut Decoder,
    tx: &Sender<Event>,
    stop: &AtomicBool,
    released: &(Mutex<bool>, Condvar),
    capture_ctrl_c: &AtomicBool,
) {
    info!(target: "screen.input", "reader started");
    let mut buf = [0u8; 256];
    let mut sink: Vec<Event> = Vec::new();
    let mut errored = false;
    let mut reengaged = false;
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        // Park while the terminal is released to a child process.
        {
            let (lock, cvar) = released;
            let mut parked = lock.lock().unwrap();
            while *parked && !stop.load(Ordering::SeqCst) {
                let (next, _) = cvar
                    .wait_timeout(parked, Duration::from_millis(200))
                    .unwrap();
                parked = next;
            }
            if stop.load(Ordering::SeqCst) {
                break;
            }
        }
        let timeout_ms: u16 = match decoder.deadline() {
            Some(d) => d
                .saturating_duration_since(Instant::now())
                .as_millis()
                .min(500) as u16,
            None => 500,
        };
        match read_chunk(file, &mut buf, timeout_ms) {
            Ok(Some(n)) => {
                errored = false;
                if *released.0.lock().unwrap() {
                    // Bytes read during release belong to the child
                    // (or are the wakeup sentinel); drop them.
                    continue;
                }
                decoder.feed(&buf[..n], &mut sink);
            }
            Ok(None) => {
                decoder.expire(Instant::now(), &mut sink);
            }
            Err(e) => {
                if !reengaged {
                    // One recovery attempt: force the device back to
                    // raw in case something external reset it.
                    reengaged = true;
                    if let Ok(clone) = file.try_clone() {
                        if let Ok(mut t) = Tty::from_handle(clone) {
                            let _ = t.raw();
                        }
                    }
                    continue;
                }
                if !errored {
                    errored = true;
                    warn!(target: "screen.input", error = %e, "read failed");
                    let _ = tx.send(Event::Error(ErrorEvent::new(Error::Io(e))));
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        }
        for ev in sink.drain(..) {
            let ev = match ev {
                Event::Key(k)
                    if k.key == Key::Rune
                        && k.rune == 'c'
                        && k.mods.contains(ModMask::CTRL)
                        && capture_ctrl_c.load(Ordering::SeqCst) =>
                {
                    Event::Interrupt(InterruptEvent::new(None))
                }
                other => other,
            };
            if !send_with_backpressure(tx, stop, ev) {
                info!(target: "screen.input", "reader stopping: queue closed");
                return;
            }
        }
    }
    info!(target: "screen.input", "reader stopped");
}

/// Blocking send that stays responsive to the stop flag; a consumer
/// that never drains cannot wedge shutdown.
fn send_with_backpressure(tx: &Sender<Event>, stop: &AtomicBool, ev: Event) -> bool {
    let mut ev = ev;
    loop {
        match tx.try_send(ev) {
            Ok(()) => return true,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => return false,
            Err(crossbeam_channel::TrySendError::Full(back)) => {
                if stop.load(Ordering::SeqCst) {
                    return false;
                }
                ev = back;
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

impl Screen for TtyScreen {
    fn init(&mut self) -> Result<()> {
        if self.state != State::Uninitialized {
            return Ok(());
        }
        let mut tty = self.open_device()?;
        tty.raw()?;
        self.tty = Some(tty);
        let (w, h) = self.initial_size();
        self.cb.resize(w, h);
        self.cb.invalidate();
        self.engage_modes()?;
        self.spawn_reader()?;
        self.spawn_signal_watcher()?;
        self.state = State::Captured;
        info!(
            target: "screen",
            term = self.ti.name,
            charset = self.charset.name(),
            w,
            h,
            "captured terminal"
        );
        Ok(())
    }

    fn close(&mut self) {
        if self.state == State::Finalized || self.state == State::Uninitialized {
            return;
        }
        self.state = State::Finalized;
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.signal_handle.take() {
            handle.close();
        }
        // Unpark a released reader so it can observe the stop flag.
        {
            let (lock, cvar) = &*self.released;
            *lock.lock().unwrap() = false;
            cvar.notify_all();
        }
        self.release_modes();
        if let Some(tty) = self.tty.as_mut() {
            let _ = tty.restore();
            // Best effort: pushes the reader out of a blocked read on
            // kernels that still allow TIOCSTI.
            let _ = tty.push_input_byte(0);
        }
        // Free a reader blocked on a saturated queue so it can see
        // the stop flag.
        while self.rx.try_recv().is_ok() {}
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        if let Some(tty) = self.tty.take() {
            if self.keep_handle {
                // Caller asked to retain the descriptor.
                std::mem::forget(tty.into_file());
            }
        }
        info!(target: "screen", "finalized");
    }

    fn set_style(&mut self, style: Style) {
        self.ambient = style;
    }

    fn set_content(&mut self, x: usize, y: usize, ch: char, comb: &[char], style: Style) {
        self.cb.set_content(x, y, ch, comb, style);
    }

    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style, isize) {
        let (ch, comb, style, width) = self.cb.get_content(x, y);
        (ch, comb.to_vec(), style, width)
    }

    fn fill(&mut self, ch: char, style: Style) {
        self.cb.fill(ch, style);
    }

    fn clear(&mut self) {
        self.cb.fill(' ', self.ambient);
    }

    fn size(&self) -> (usize, usize) {
        self.cb.size()
    }

    fn colors(&self) -> usize {
        if self.truecolor {
            1 << 24
        } else {
            self.ti.colors
        }
    }

    fn can_display(&self, ch: char, check_fallbacks: bool) -> bool {
        let mut scratch = Vec::new();
        if self.charset.encode_char(ch, &mut scratch) {
            return true;
        }
        if !check_fallbacks {
            return false;
        }
        (!self.ti.enter_acs.is_empty() && acs::acs_byte(ch).is_some())
            || self.fallbacks.contains_key(&ch)
            || acs::ascii_fallback(ch).is_some()
    }

    fn has_key(&self, key: Key) -> bool {
        universal_key(key) || self.ti.keys.iter().any(|&(k, _)| k == key)
    }

    fn show(&mut self) -> Result<()> {
        self.require_captured()?;
        self.check_resize();
        self.draw()
    }

    fn sync(&mut self) -> Result<()> {
        self.require_captured()?;
        self.check_resize();
        let clear = self.ti.clear.as_bytes().to_vec();
        self.write(&clear)?;
        self.wire_cursor = Some((0, 0));
        self.wire_style = None;
        self.cb.invalidate();
        self.draw()
    }

    fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor = (x, y);
        self.cursor_visible = true;
    }

    fn hide_cursor(&mut self) {
        self.cursor_visible = false;
    }

    fn enable_mouse(&mut self, flags: MouseFlags) -> Result<()> {
        self.require_captured()?;
        if self.ti.mouse.is_empty() {
            return Ok(());
        }
        self.mouse_flags = if flags.is_empty() {
            MouseFlags::BUTTONS
        } else {
            flags
        };
        let s = mouse_mode_bytes(self.mouse_flags, true);
        self.write(s.as_bytes())?;
        self.flush()
    }

    fn disable_mouse(&mut self) -> Result<()> {
        self.require_captured()?;
        if self.ti.mouse.is_empty() || self.mouse_flags.is_empty() {
            return Ok(());
        }
        let s = mouse_mode_bytes(self.mouse_flags, false);
        self.mouse_flags = MouseFlags::empty();
        self.write(s.as_bytes())?;
        self.flush()
    }

    fn enable_paste(&mut self) -> Result<()> {
        self.require_captured()?;
        self.paste_enabled = true;
        let cap = self.paste_cap(true);
        self.write(cap.as_bytes())?;
        self.flush()
    }

    fn disable_paste(&mut self) -> Result<()> {
        self.require_captured()?;
        self.paste_enabled = false;
        let cap = self.paste_cap(false);
        self.write(cap.as_bytes())?;
        self.flush()
    }

    fn poll_event(&self) -> Option<Event> {
        self.rx.recv().ok()
    }

    fn post_event(&self, ev: Event) -> Result<()> {
        self.tx.try_send(ev).map_err(crate::queue_error)
    }

    fn event_channel(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    fn beep(&mut self) -> Result<()> {
        let bell = self.ti.bell.as_bytes().to_vec();
        self.write(&bell)?;
        self.flush()
    }

    fn register_rune_fallback(&mut self, ch: char, replacement: &str) {
        self.fallbacks.insert(ch, replacement.to_string());
    }

    fn unregister_rune_fallback(&mut self, ch: char) {
        self.fallbacks.remove(&ch);
    }

    fn copy_to_clipboard(&mut self, s: &str) -> Result<()> {
        use base64::Engine;
        self.require_captured()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(s);
        let seq = format!("\x1b]52;c;{encoded}\x07");
        self.write(seq.as_bytes())?;
        self.flush()
    }

    fn call(&mut self, f: CallClosure) -> Result<()> {
        #[cfg(not(feature = "subshell"))]
        {
            let _ = f;
            return Err(Error::CallDisabled);
        }
        #[cfg(feature = "subshell")]
        {
            self.require_captured()?;
            self.state = State::Released;
            // Park the reader before the child starts consuming input.
            {
                let (lock, cvar) = &*self.released;
                *lock.lock().unwrap() = true;
                cvar.notify_all();
            }
            self.release_modes();
            if let Some(tty) = self.tty.as_mut() {
                let _ = tty.restore();
                let _ = tty.push_input_byte(0);
            }
            let result = {
                let tty = self.tty.as_ref().ok_or(Error::NoDisplay)?;
                let mut child_in = tty.duplicate().map_err(Error::Io)?;
                let mut child_out = tty.duplicate().map_err(Error::Io)?;
                f(&mut child_in, &mut child_out)
            };
            // Unwedge any read the child left blocked, then resume.
            if let Some(tty) = self.tty.as_mut() {
                let _ = tty.push_input_byte(0);
                let _ = tty.raw();
            }
            {
                let (lock, cvar) = &*self.released;
                *lock.lock().unwrap() = false;
                cvar.notify_all();
            }
            self.state = State::Captured;
            self.engage_modes()?;
            if !self.mouse_flags.is_empty() {
                let s = mouse_mode_bytes(self.mouse_flags, true);
                self.write(s.as_bytes())?;
            }
            if self.paste_enabled {
                let cap = self.paste_cap(true);
                self.write(cap.as_bytes())?;
            }
            self.sync()?;
            result.map_err(Error::Io)
        }
    }

    fn keep_file_handle(&mut self, keep: bool) {
        self.keep_handle = keep;
    }

    fn set_capture_ctrl_c(&mut self, capture: bool) {
        self.capture_ctrl_c.store(capture, Ordering::SeqCst);
    }

    fn charset(&self) -> &'static str {
        self.charset.name()
    }
}

impl Drop for TtyScreen {
    fn drop(&mut self) {
        self.close();
    }
}
