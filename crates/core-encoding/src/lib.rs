//! Character-set resolution and transcoding between the process's
//! code points and the terminal's declared encoding.
//!
//! UTF-8 and US-ASCII are handled directly (encoding_rs has no pure
//! ASCII encoding, and UTF-8 input needs incremental accumulation);
//! everything else goes through encoding_rs, restricted to single-byte
//! encodings so the input side can decode byte-at-a-time.

/// Resolve the terminal charset from the standard locale variables.
///
/// Precedence is `LC_ALL`, `LC_CTYPE`, `LANG`; the winning value is
/// parsed as `lang[.charset][@modifier]`. `POSIX` and `C` resolve to
/// US-ASCII; an unset or charset-less locale defaults to UTF-8.
pub fn charset_from_locale(
    lc_all: Option<&str>,
    lc_ctype: Option<&str>,
    lang: Option<&str>,
) -> String {
    fn nonempty(v: Option<&str>) -> Option<&str> {
        v.filter(|s| !s.is_empty())
    }
    let locale = nonempty(lc_all)
        .or(nonempty(lc_ctype))
        .or(nonempty(lang))
        .unwrap_or("");
    if locale.is_empty() {
        return "UTF-8".to_string();
    }
    if locale == "POSIX" || locale == "C" {
        return "US-ASCII".to_string();
    }
    let without_modifier = locale.split('@').next().unwrap_or(locale);
    match without_modifier.split_once('.') {
        Some((_, charset)) if !charset.is_empty() => charset.to_string(),
        _ => "UTF-8".to_string(),
    }
}

/// Resolve the charset from the process environment.
pub fn charset_from_env() -> String {
    charset_from_locale(
        std::env::var("LC_ALL").ok().as_deref(),
        std::env::var("LC_CTYPE").ok().as_deref(),
        std::env::var("LANG").ok().as_deref(),
    )
}

/// A terminal character set the runtime can transcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
    Single(&'static encoding_rs::Encoding),
}

impl Charset {
    /// Look a charset up by label. Returns `None` for labels that are
    /// unknown or that name a multi-byte encoding other than UTF-8.
    pub fn from_label(label: &str) -> Option<Charset> {
        let norm = label.trim().to_ascii_uppercase();
        match norm.as_str() {
            "UTF-8" | "UTF8" => return Some(Charset::Utf8),
            "US-ASCII" | "ASCII" | "ANSI_X3.4-1968" | "646" => return Some(Charset::Ascii),
            _ => {}
        }
        let enc = encoding_rs::Encoding::for_label(label.as_bytes())?;
        if enc == encoding_rs::UTF_8 {
            Some(Charset::Utf8)
        } else if enc.is_single_byte() {
            Some(Charset::Single(enc))
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Single(enc) => enc.name(),
        }
    }

    /// Encode one code point into terminal bytes, appending to `out`.
    /// Returns false (appending nothing) when the charset cannot
    /// represent the character.
    pub fn encode_char(&self, ch: char, out: &mut Vec<u8>) -> bool {
        match self {
            Charset::Utf8 => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                true
            }
            Charset::Ascii => {
                if ch.is_ascii() {
                    out.push(ch as u8);
                    true
                } else {
                    false
                }
            }
            Charset::Single(enc) => {
                let mut buf = [0u8; 4];
                let s = ch.encode_utf8(&mut buf);
                let (bytes, _, unmappable) = enc.encode(s);
                if unmappable {
                    false
                } else {
                    out.extend_from_slice(&bytes);
                    true
                }
            }
        }
    }

    pub fn decoder(&self) -> ByteDecoder {
        ByteDecoder {
            charset: *self,
            pending: Vec::new(),
            need: 0,
        }
    }
}

/// Outcome of feeding one byte to a [`ByteDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// A complete code point.
    Char(char),
    /// More bytes are required.
    Pending,
    /// The byte (or accumulated sequence) is not valid in this
    /// charset; pending state has been discarded.
    Invalid,
}

/// Incremental byte-to-code-point decoder for the input path.
#[derive(Debug, Clone)]
pub struct ByteDecoder {
    charset: Charset,
    pending: Vec<u8>,
    need: usize,
}

impl ByteDecoder {
    pub fn push(&mut self, b: u8) -> DecodeStep {
        match self.charset {
            Charset::Ascii => {
                if b < 0x80 {
                    DecodeStep::Char(b as char)
                } else {
                    DecodeStep::Invalid
                }
            }
            Charset::Single(enc) => {
                let bytes = [b];
                let (s, _) = enc.decode_without_bom_handling(&bytes);
                match s.chars().next() {
                    Some(c) => DecodeStep::Char(c),
                    None => DecodeStep::Invalid,
                }
            }
            Charset::Utf8 => self.push_utf8(b),
        }
    }

    /// True while a multi-byte sequence is in flight.
    pub fn in_progress(&self) -> bool {
        !self.pending.is_empty()
    }

    fn push_utf8(&mut self, b: u8) -> DecodeStep {
        if self.pending.is_empty() {
            match b {
                0x00..=0x7F => return DecodeStep::Char(b as char),
                0xC2..=0xDF => self.need = 2,
                0xE0..=0xEF => self.need = 3,
                0xF0..=0xF4 => self.need = 4,
                _ => return DecodeStep::Invalid,
            }
            self.pending.push(b);
            return DecodeStep::Pending;
        }
        if b & 0xC0 != 0x80 {
            self.pending.clear();
            return DecodeStep::Invalid;
        }
        self.pending.push(b);
        if self.pending.len() < self.need {
            return DecodeStep::Pending;
        }
        let step = match std::str::from_utf8(&self.pending) {
            Ok(s) => match s.chars().next() {
                Some(c) => DecodeStep::Char(c),
                None => DecodeStep::Invalid,
            },
            Err(_) => DecodeStep::Invalid,
        };
        self.pending.clear();
        step
    }
}
