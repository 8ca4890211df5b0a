//! Deterministic in-memory screen for tests.
//!
//! Satisfies the full [`Screen`] contract with no TTY behind it: the
//! "physical" terminal is a front buffer recording, per cell, the
//! runes, encoded bytes and style of what a render pass would have
//! put on the wire. Input is injected by the test instead of read
//! from a device, travelling through the same decoder as live bytes.

use crate::{acs, universal_key, CallClosure, MouseFlags, Screen};
use core_encoding::Charset;
use core_events::{
    ButtonMask, Error, Event, Key, KeyEvent, ModMask, ResizeEvent, Result,
};
use core_input::{Decoder, MouseSynth};
use core_render::{CellBuffer, Style};
use core_terminfo::Terminfo;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

const EVENT_QUEUE_CAP: usize = 128;

/// One committed front-buffer cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCell {
    pub runes: Vec<char>,
    pub bytes: Vec<u8>,
    pub style: Style,
}

impl Default for SimCell {
    fn default() -> Self {
        SimCell {
            runes: vec![' '],
            bytes: vec![b' '],
            style: Style::default(),
        }
    }
}

pub struct OffscreenScreen {
    ti: &'static Terminfo,
    charset: Charset,
    cb: CellBuffer,
    front: Vec<SimCell>,
    front_size: (usize, usize),
    ambient: Style,
    cursor: (usize, usize),
    cursor_visible: bool,
    fallbacks: HashMap<char, String>,
    decoder: Decoder,
    mouse_synth: MouseSynth,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    closed: AtomicBool,
    mouse_flags: MouseFlags,
    paste_enabled: bool,
    last_flush_cells: usize,
}

impl OffscreenScreen {
    /// UTF-8 offscreen screen at the default 80x25 geometry.
    pub fn new() -> OffscreenScreen {
        Self::with_charset("UTF-8").expect("UTF-8 is always available")
    }

    /// Offscreen screen with an explicit charset label.
    pub fn with_charset(label: &str) -> Result<OffscreenScreen> {
        let charset = Charset::from_label(label).ok_or_else(|| Error::NoCharset(label.into()))?;
        let ti = core_terminfo::lookup("offscreen").map_err(|_| Error::TermNotFound)?;
        let (w, h) = (ti.columns, ti.lines);
        let mut cb = CellBuffer::new(w, h);
        cb.invalidate();
        let (tx, rx) = bounded(EVENT_QUEUE_CAP);
        Ok(OffscreenScreen {
            ti,
            charset,
            cb,
            front: vec![SimCell::default(); w * h],
            front_size: (w, h),
            ambient: Style::default(),
            cursor: (0, 0),
            cursor_visible: false,
            fallbacks: HashMap::new(),
            decoder: Decoder::new(ti, charset),
            mouse_synth: MouseSynth::new(),
            tx,
            rx,
            closed: AtomicBool::new(false),
            mouse_flags: MouseFlags::empty(),
            paste_enabled: false,
            last_flush_cells: 0,
        })
    }

    /// Enqueue a synthetic key event, as if decoded from the reader.
    pub fn inject_key(&mut self, key: Key, rune: char, mods: ModMask) -> Result<()> {
        self.post_event(Event::Key(KeyEvent::new(key, rune, mods)))
    }

    /// Enqueue a synthetic mouse record; drag states are synthesized
    /// exactly as for live input.
    pub fn inject_mouse(
        &mut self,
        x: i32,
        y: i32,
        buttons: ButtonMask,
        mods: ModMask,
    ) -> Result<()> {
        if let Some(ev) = self.mouse_synth.note(x, y, buttons, mods) {
            self.post_event(Event::Mouse(ev))?;
        }
        Ok(())
    }

    /// Run raw bytes through the input decoder, as if read from the
    /// TTY. The chunk is treated as a complete burst: a trailing lone
    /// ESC is delivered rather than left pending.
    pub fn inject_key_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut sink = Vec::new();
        self.decoder.feed(bytes, &mut sink);
        if let Some(deadline) = self.decoder.deadline() {
            self.decoder.expire(deadline, &mut sink);
        }
        for ev in sink {
            self.post_event(ev)?;
        }
        Ok(())
    }

    /// Resize without a SIGWINCH, posting a synthetic `Resize`.
    pub fn set_size(&mut self, w: usize, h: usize) {
        self.cb.resize(w, h);
        self.cb.invalidate();
        self.front = vec![SimCell::default(); w * h];
        self.front_size = (w, h);
        let _ = self.post_event(Event::Resize(ResizeEvent::new(w, h)));
    }

    /// Committed front buffer with its dimensions.
    pub fn get_contents(&self) -> (Vec<SimCell>, usize, usize) {
        let (w, h) = self.front_size;
        (self.front.clone(), w, h)
    }

    pub fn get_cursor(&self) -> (usize, usize, bool) {
        (self.cursor.0, self.cursor.1, self.cursor_visible)
    }

    /// Cells committed by the most recent `show`/`sync`.
    pub fn last_flush_count(&self) -> usize {
        self.last_flush_cells
    }

    fn encode_front(&self, ch: char, comb: &[char]) -> (Vec<char>, Vec<u8>) {
        let mut bytes = Vec::new();
        if self.charset.encode_char(ch, &mut bytes) {
            let mut runes = vec![ch];
            for &c in comb {
                if self.charset.encode_char(c, &mut bytes) {
                    runes.push(c);
                }
            }
            return (runes, bytes);
        }
        let replacement = self
            .fallbacks
            .get(&ch)
            .map(String::as_str)
            .or_else(|| acs::ascii_fallback(ch))
            .unwrap_or("?");
        let mut bytes = Vec::new();
        for c in replacement.chars() {
            if !self.charset.encode_char(c, &mut bytes) {
                bytes.push(b'?');
            }
        }
        (replacement.chars().collect(), bytes)
    }
}

impl Default for OffscreenScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen for OffscreenScreen {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
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
        self.ti.colors
    }

    fn can_display(&self, ch: char, check_fallbacks: bool) -> bool {
        let mut scratch = Vec::new();
        if self.charset.encode_char(ch, &mut scratch) {
            return true;
        }
        check_fallbacks
            && (self.fallbacks.contains_key(&ch) || acs::ascii_fallback(ch).is_some())
    }

    fn has_key(&self, key: Key) -> bool {
        universal_key(key) || self.ti.keys.iter().any(|&(k, _)| k == key)
    }

    fn show(&mut self) -> Result<()> {
        let (w, h) = self.cb.size();
        let mut committed = 0usize;
        for y in 0..h {
            let mut x = 0usize;
            while x < w {
                if !self.cb.dirty(x, y) {
                    x += self.cb.advance_width(x, y);
                    continue;
                }
                let (ch, comb, style, width) = self.cb.get_content(x, y);
                let comb = comb.to_vec();
                let style = if style == Style::default() {
                    self.ambient
                } else {
                    style
                };
                let mut width = width.max(1) as usize;
                let (runes, bytes) = if width == 2 && x == w - 1 {
                    width = 1;
                    (vec![' '], vec![b' '])
                } else {
                    if width == 2 && x + 1 < w {
                        self.cb.set_dirty(x + 1, y, true);
                    }
                    self.encode_front(ch, &comb)
                };
                self.front[y * w + x] = SimCell {
                    runes,
                    bytes,
                    style,
                };
                self.cb.set_dirty(x, y, false);
                committed += 1;
                x += width;
            }
        }
        self.last_flush_cells = committed;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.cb.invalidate();
        self.show()
    }

    fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor = (x, y);
        self.cursor_visible = true;
    }

    fn hide_cursor(&mut self) {
        self.cursor_visible = false;
    }

    fn enable_mouse(&mut self, flags: MouseFlags) -> Result<()> {
        self.mouse_flags = if flags.is_empty() {
            MouseFlags::BUTTONS
        } else {
            flags
        };
        Ok(())
    }

    fn disable_mouse(&mut self) -> Result<()> {
        self.mouse_flags = MouseFlags::empty();
        Ok(())
    }

    fn enable_paste(&mut self) -> Result<()> {
        self.paste_enabled = true;
        Ok(())
    }

    fn disable_paste(&mut self) -> Result<()> {
        self.paste_enabled = false;
        Ok(())
    }

    fn poll_event(&self) -> Option<Event> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.recv().ok()
    }

    fn post_event(&self, ev: Event) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NotCaptured);
        }
        self.tx.try_send(ev).map_err(crate::queue_error)
    }

    fn event_channel(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    fn beep(&mut self) -> Result<()> {
        Ok(())
    }

    fn register_rune_fallback(&mut self, ch: char, replacement: &str) {
        self.fallbacks.insert(ch, replacement.to_string());
    }

    fn unregister_rune_fallback(&mut self, ch: char) {
        self.fallbacks.remove(&ch);
    }

    fn copy_to_clipboard(&mut self, _s: &str) -> Result<()> {
        Ok(())
    }

    fn call(&mut self, _f: CallClosure) -> Result<()> {
        Err(Error::CallDisabled)
    }

    fn keep_file_handle(&mut self, _keep: bool) {}

    fn set_capture_ctrl_c(&mut self, _capture: bool) {}

    fn charset(&self) -> &'static str {
        self.charset.name()
    }
}
