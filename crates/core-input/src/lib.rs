//! Input decoding: raw TTY bytes to high-level events.
//!
//! The decoder is a pure state machine: callers feed it byte chunks
//! and it drains decoded events into a sink, so both the live screen
//! and the offscreen simulation drive it the same way. Partial escape
//! sequences survive across chunks.
//!
//! Parse precedence per pass: paste bracket, SGR mouse, legacy X11
//! mouse, function-key sequences (terminfo plus xterm modifier
//! variants), then runes. A lone ESC is ambiguous against the prefix
//! of a longer sequence; it sits behind a short deadline, after which
//! it is delivered as a key. When more bytes do arrive and rule out
//! every sequence, the ESC turns into an Alt modifier on the next key.

mod keymap;
mod mouse_state;

pub use mouse_state::MouseSynth;

use core_encoding::{Charset, DecodeStep};
use core_events::{ButtonMask, Event, Key, KeyEvent, ModMask, PasteEvent};
use core_terminfo::Terminfo;
use keymap::KeyPattern;
use std::time::{Duration, Instant};
use tracing::trace;

/// How long a lone ESC may sit before it is delivered as a key.
pub const ESC_TIMEOUT: Duration = Duration::from_millis(50);

const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

pub struct Decoder {
    keys: Vec<KeyPattern>,
    charset: Charset,
    rune_decoder: core_encoding::ByteDecoder,
    buf: Vec<u8>,
    pending_alt: bool,
    deadline: Option<Instant>,
    mouse: MouseSynth,
}

enum Parse {
    /// Consumed input (events may or may not have been emitted).
    Consumed,
    /// The buffer holds a proper prefix of this form; wait for more.
    Partial,
    /// This form cannot apply to the buffer head.
    No,
}

impl Decoder {
    pub fn new(ti: &Terminfo, charset: Charset) -> Self {
        Self {
            keys: keymap::build(ti),
            charset,
            rune_decoder: charset.decoder(),
            buf: Vec::new(),
            pending_alt: false,
            deadline: None,
            mouse: MouseSynth::new(),
        }
    }

    /// Feed one chunk of TTY bytes, draining decoded events into
    /// `sink` in decode order.
    pub fn feed(&mut self, bytes: &[u8], sink: &mut Vec<Event>) {
        self.buf.extend_from_slice(bytes);
        self.scan(sink);
    }

    /// The instant at which a pending lone ESC expires, if one is
    /// buffered. Callers use this to bound their next blocking read.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True while an incomplete sequence is buffered.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() || self.rune_decoder.in_progress()
    }

    /// Deliver a deadline-expired ESC as a key and reparse the rest.
    pub fn expire(&mut self, now: Instant, sink: &mut Vec<Event>) {
        let due = match self.deadline {
            Some(d) => d <= now,
            None => return,
        };
        if !due {
            return;
        }
        self.deadline = None;
        if self.buf.first() == Some(&0x1b) {
            self.buf.remove(0);
            self.emit_key(Key::Esc, '\x1b', ModMask::empty(), sink);
            self.scan(sink);
        }
    }

    fn scan(&mut self, sink: &mut Vec<Event>) {
        loop {
            if self.buf.is_empty() {
                self.deadline = None;
                return;
            }
            let parsers: [fn(&mut Self, &mut Vec<Event>) -> Parse; 5] = [
                Self::parse_paste,
                Self::parse_sgr_mouse,
                Self::parse_x11_mouse,
                Self::parse_fn_key,
                Self::parse_rune,
            ];
            let mut partial = false;
            let mut consumed = false;
            for parse in parsers {
                match parse(self, sink) {
                    Parse::Consumed => {
                        consumed = true;
                        break;
                    }
                    Parse::Partial => partial = true,
                    Parse::No => {}
                }
            }
            if consumed {
                continue;
            }
            if partial {
                if self.buf.first() == Some(&0x1b) {
                    if self.deadline.is_none() {
                        self.deadline = Some(Instant::now() + ESC_TIMEOUT);
                    }
                } else {
                    self.deadline = None;
                }
                return;
            }
            // Nothing claims the head byte. A well-formed CSI sequence
            // the key tables don't know is consumed whole and dropped;
            // anything else degrades byte by byte.
            if self.buf[0] == 0x1b && self.buf.get(1) == Some(&b'[') {
                match csi_end(&self.buf[2..]) {
                    CsiScan::Complete(len) => {
                        let total = 2 + len;
                        trace!(
                            target: "input.decode",
                            bytes = total,
                            "dropping unrecognized csi sequence"
                        );
                        self.buf.drain(..total);
                        continue;
                    }
                    CsiScan::Incomplete => {
                        if self.deadline.is_none() {
                            self.deadline = Some(Instant::now() + ESC_TIMEOUT);
                        }
                        return;
                    }
                    CsiScan::NotCsi => {}
                }
            }
            let b = self.buf.remove(0);
            if b == 0x1b {
                // ESC followed by bytes that rule out every sequence:
                // the next decoded key carries Alt.
                self.pending_alt = true;
            } else {
                trace!(target: "input.decode", byte = b, "dropping undecodable byte");
            }
        }
    }

    fn emit_key(&mut self, key: Key, rune: char, mods: ModMask, sink: &mut Vec<Event>) {
        let mut mods = mods;
        if self.pending_alt {
            mods |= ModMask::ALT;
            self.pending_alt = false;
        }
        sink.push(Event::Key(KeyEvent::new(key, rune, mods)));
    }

    fn parse_paste(&mut self, sink: &mut Vec<Event>) -> Parse {
        for (marker, start) in [(PASTE_START, true), (PASTE_END, false)] {
            if self.buf.starts_with(marker) {
                self.buf.drain(..marker.len());
                trace!(target: "input.paste", start, "paste bracket");
                sink.push(Event::Paste(PasteEvent::new(start)));
                return Parse::Consumed;
            }
            if marker.starts_with(&self.buf) {
                return Parse::Partial;
            }
        }
        Parse::No
    }

    /// `ESC [ < btn ; x ; y (M|m)`, coordinates one-based.
    fn parse_sgr_mouse(&mut self, sink: &mut Vec<Event>) -> Parse {
        const PREFIX: &[u8] = b"\x1b[<";
        if !self.buf.starts_with(PREFIX) {
            return if PREFIX.starts_with(&self.buf) {
                Parse::Partial
            } else {
                Parse::No
            };
        }
        let mut fields = [0i64; 3];
        let mut field = 0usize;
        let mut digits = false;
        let mut i = PREFIX.len();
        loop {
            match self.buf.get(i) {
                None => return Parse::Partial,
                Some(b @ b'0'..=b'9') => {
                    fields[field] = fields[field] * 10 + (*b - b'0') as i64;
                    digits = true;
                    i += 1;
                }
                Some(b';') if field < 2 && digits => {
                    field += 1;
                    digits = false;
                    i += 1;
                }
                Some(b'M') | Some(b'm') if field == 2 && digits => {
                    let press = self.buf[i] == b'M';
                    self.buf.drain(..=i);
                    self.deliver_mouse(fields[0], fields[1] - 1, fields[2] - 1, press, sink);
                    return Parse::Consumed;
                }
                Some(_) => return Parse::No,
            }
        }
    }

    /// Legacy `ESC [ M btn x y`, each payload byte offset by 32
    /// (coordinates additionally by one).
    fn parse_x11_mouse(&mut self, sink: &mut Vec<Event>) -> Parse {
        const PREFIX: &[u8] = b"\x1b[M";
        if !self.buf.starts_with(PREFIX) {
            return if PREFIX.starts_with(&self.buf) {
                Parse::Partial
            } else {
                Parse::No
            };
        }
        if self.buf.len() < 6 {
            return Parse::Partial;
        }
        let btn = self.buf[3] as i64 - 32;
        let x = self.buf[4] as i64 - 33;
        let y = self.buf[5] as i64 - 33;
        self.buf.drain(..6);
        // Release is encoded in the button field, not a terminator.
        let press = btn & 0x3 != 3;
        self.deliver_mouse(btn, x, y, press, sink);
        Parse::Consumed
    }

    fn deliver_mouse(&mut self, btn: i64, x: i64, y: i64, press: bool, sink: &mut Vec<Event>) {
        let mut mods = ModMask::empty();
        if btn & 4 != 0 {
            mods |= ModMask::SHIFT;
        }
        if btn & 8 != 0 {
            mods |= ModMask::ALT;
        }
        if btn & 16 != 0 {
            mods |= ModMask::CTRL;
        }
        let low = btn & 0x3;
        let buttons = if btn & 64 != 0 {
            match low {
                0 => ButtonMask::WHEEL_UP,
                1 => ButtonMask::WHEEL_DOWN,
                2 => ButtonMask::WHEEL_LEFT,
                _ => ButtonMask::WHEEL_RIGHT,
            }
        } else if !press || low == 3 {
            ButtonMask::empty()
        } else {
            match low {
                0 => ButtonMask::BUTTON1,
                1 => ButtonMask::BUTTON2,
                _ => ButtonMask::BUTTON3,
            }
        };
        if let Some(ev) = self.mouse.note(x as i32, y as i32, buttons, mods) {
            sink.push(Event::Mouse(ev));
        }
    }

    fn parse_fn_key(&mut self, sink: &mut Vec<Event>) -> Parse {
        let mut partial = false;
        let mut matched: Option<(usize, Key, ModMask)> = None;
        for pat in &self.keys {
            if self.buf.len() >= pat.bytes.len() {
                if self.buf.starts_with(&pat.bytes) {
                    matched = Some((pat.bytes.len(), pat.key, pat.mods));
                    break; // longest-first order: first hit is longest
                }
            } else if pat.bytes.starts_with(&self.buf) {
                partial = true;
            }
        }
        if let Some((len, key, mods)) = matched {
            self.buf.drain(..len);
            self.emit_key(key, '\0', mods, sink);
            return Parse::Consumed;
        }
        if partial {
            Parse::Partial
        } else {
            Parse::No
        }
    }

    fn parse_rune(&mut self, sink: &mut Vec<Event>) -> Parse {
        let b = match self.buf.first() {
            Some(&b) => b,
            None => return Parse::No,
        };
        match b {
            0x1b => Parse::No,
            0x00..=0x1f | 0x7f => {
                self.buf.remove(0);
                self.emit_key(Key::Rune, b as char, ModMask::empty(), sink);
                Parse::Consumed
            }
            0x20..=0x7e => {
                self.buf.remove(0);
                self.emit_key(Key::Rune, b as char, ModMask::empty(), sink);
                Parse::Consumed
            }
            _ => {
                self.buf.remove(0);
                match self.rune_decoder.push(b) {
                    DecodeStep::Char(c) => {
                        self.emit_key(Key::Rune, c, ModMask::empty(), sink);
                    }
                    DecodeStep::Pending => {}
                    DecodeStep::Invalid => {
                        trace!(target: "input.decode", "invalid byte for charset");
                    }
                }
                Parse::Consumed
            }
        }
    }

    /// The charset this decoder accumulates runes in.
    pub fn charset(&self) -> Charset {
        self.charset
    }
}

enum CsiScan {
    /// Byte count after `ESC [` up to and including the final byte.
    Complete(usize),
    Incomplete,
    NotCsi,
}

/// Scan a CSI body: parameter and intermediate bytes (`0x20..=0x3F`)
/// terminated by a final byte (`0x40..=0x7E`).
fn csi_end(body: &[u8]) -> CsiScan {
    for (i, &b) in body.iter().enumerate() {
        match b {
            0x20..=0x3F => {}
            0x40..=0x7E => return CsiScan::Complete(i + 1),
            _ => return CsiScan::NotCsi,
        }
    }
    CsiScan::Incomplete
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> Decoder {
        Decoder::new(core_terminfo::lookup("xterm").unwrap(), Charset::Utf8)
    }

    fn feed_all(dec: &mut Decoder, bytes: &[u8]) -> Vec<Event> {
        let mut sink = Vec::new();
        dec.feed(bytes, &mut sink);
        sink
    }

    #[test]
    fn printable_ascii_decodes_directly() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"hi");
        assert_eq!(evs.len(), 2);
        match &evs[0] {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Rune);
                assert_eq!(k.rune, 'h');
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn control_bytes_become_ctrl_keys() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"\x01");
        match &evs[0] {
            Event::Key(k) => {
                assert_eq!(k.rune, 'a');
                assert!(k.mods.contains(ModMask::CTRL));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn function_key_with_modifier_suffix() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"\x1b[1;5C");
        match &evs[0] {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Right);
                assert_eq!(k.mods, ModMask::CTRL);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn escape_sequence_split_across_chunks() {
        let mut dec = decoder();
        assert!(feed_all(&mut dec, b"\x1b[").is_empty());
        assert!(dec.has_pending());
        let evs = feed_all(&mut dec, b"A");
        match &evs[0] {
            Event::Key(k) => assert_eq!(k.key, Key::Up),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(!dec.has_pending());
    }

    #[test]
    fn lone_escape_expires_to_key() {
        let mut dec = decoder();
        assert!(feed_all(&mut dec, b"\x1b").is_empty());
        let due = dec.deadline().expect("deadline armed for lone ESC");
        let mut sink = Vec::new();
        dec.expire(due + Duration::from_millis(1), &mut sink);
        match &sink[0] {
            Event::Key(k) => assert_eq!(k.key, Key::Esc),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(dec.deadline(), None);
    }

    #[test]
    fn escape_then_plain_byte_is_alt_key() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"\x1bx");
        assert_eq!(evs.len(), 1);
        match &evs[0] {
            Event::Key(k) => {
                assert_eq!(k.rune, 'x');
                assert!(k.mods.contains(ModMask::ALT));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn utf8_runes_accumulate() {
        let mut dec = decoder();
        let mut evs = feed_all(&mut dec, "é".as_bytes());
        assert_eq!(evs.len(), 1);
        evs.extend(feed_all(&mut dec, "語".as_bytes()));
        match &evs[1] {
            Event::Key(k) => assert_eq!(k.rune, '語'),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sgr_wheel_is_an_impulse() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"\x1b[<64;10;4M");
        match &evs[0] {
            Event::Mouse(m) => {
                assert_eq!(m.buttons, ButtonMask::WHEEL_UP);
                assert_eq!((m.x, m.y), (9, 3));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn x11_mouse_click() {
        let mut dec = decoder();
        // btn 0 pressed at (1,1) one-based: 32+0, 33+1, 33+1.
        let evs = feed_all(&mut dec, &[0x1b, b'[', b'M', 32, 34, 34]);
        match &evs[0] {
            Event::Mouse(m) => {
                assert_eq!(m.buttons, ButtonMask::BUTTON1);
                assert_eq!((m.x, m.y), (1, 1));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_sgr_is_dropped_without_stalling() {
        let mut dec = decoder();
        let evs = feed_all(&mut dec, b"\x1b[<64;;Mx");
        // The malformed record is discarded whole; only the trailing
        // rune arrives.
        assert_eq!(evs.len(), 1);
        match evs.last() {
            Some(Event::Key(k)) => assert_eq!(k.rune, 'x'),
            other => panic!("unexpected tail: {other:?}"),
        }
    }

    #[test]
    fn unknown_csi_sequences_are_swallowed() {
        let mut dec = decoder();
        // Private-mode reports the key tables don't carry.
        let evs = feed_all(&mut dec, b"\x1b[?1049hq");
        assert_eq!(evs.len(), 1);
        match &evs[0] {
            Event::Key(k) => assert_eq!(k.rune, 'q'),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
