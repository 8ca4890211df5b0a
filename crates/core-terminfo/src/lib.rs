//! Terminal capability records and escape-sequence formatting.
//!
//! Records are compiled in and keyed by `$TERM` (system terminfo
//! databases are frequently hashed or relocated, which defeats
//! portable lookup; the records here cover the terminals the runtime
//! targets). Capability strings use the terminfo parameter language
//! and are formatted through [`expand`].

mod db;
mod param;

pub use param::expand;

use core_events::Key;

/// Capability record for one terminal family.
///
/// Empty strings mean "capability absent". `keys` maps escape
/// sequences to the logical keys they produce; both normal and
/// application cursor-mode variants are listed where terminals emit
/// either.
#[derive(Clone, Copy, Debug)]
pub struct Terminfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub columns: usize,
    pub lines: usize,
    pub colors: usize,
    pub bell: &'static str,
    pub clear: &'static str,
    pub enter_ca: &'static str,
    pub exit_ca: &'static str,
    pub show_cursor: &'static str,
    pub hide_cursor: &'static str,
    pub attr_off: &'static str,
    pub bold: &'static str,
    pub underline: &'static str,
    pub reverse: &'static str,
    pub blink: &'static str,
    pub dim: &'static str,
    pub italic: &'static str,
    pub strikethrough: &'static str,
    pub enter_acs: &'static str,
    pub exit_acs: &'static str,
    pub set_fg: &'static str,
    pub set_bg: &'static str,
    pub reset_fg_bg: &'static str,
    pub set_fg_rgb: &'static str,
    pub set_bg_rgb: &'static str,
    pub set_cursor: &'static str,
    pub enter_keypad: &'static str,
    pub exit_keypad: &'static str,
    pub enable_paste: &'static str,
    pub disable_paste: &'static str,
    pub mouse: &'static str,
    pub keys: &'static [(Key, &'static str)],
}

impl Terminfo {
    /// Absolute cursor addressing for a 0-based `(x, y)` position.
    pub fn goto(&self, x: usize, y: usize) -> String {
        expand(self.set_cursor, &[y as i64, x as i64])
    }

    pub fn fg(&self, index: u32) -> String {
        expand(self.set_fg, &[index as i64])
    }

    pub fn bg(&self, index: u32) -> String {
        expand(self.set_bg, &[index as i64])
    }

    /// Direct-color foreground. Records without RGB setters fall back
    /// to the de-facto standard `CSI 38;2` form, for terminals that
    /// advertise truecolor only through `$COLORTERM`.
    pub fn fg_rgb(&self, r: u8, g: u8, b: u8) -> String {
        if self.set_fg_rgb.is_empty() {
            format!("\x1b[38;2;{r};{g};{b}m")
        } else {
            expand(self.set_fg_rgb, &[r as i64, g as i64, b as i64])
        }
    }

    pub fn bg_rgb(&self, r: u8, g: u8, b: u8) -> String {
        if self.set_bg_rgb.is_empty() {
            format!("\x1b[48;2;{r};{g};{b}m")
        } else {
            expand(self.set_bg_rgb, &[r as i64, g as i64, b as i64])
        }
    }

    /// True when the record itself carries RGB setters.
    pub fn has_truecolor(&self) -> bool {
        !self.set_fg_rgb.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TerminfoError {
    #[error("no capability record for terminal {0:?}")]
    NotFound(String),
}

/// Look up the capability record for a terminal name.
///
/// Unknown names fall back by repeatedly trimming a trailing
/// `-variant` segment, so `xterm-kitty` resolves to `xterm`.
pub fn lookup(term: &str) -> Result<&'static Terminfo, TerminfoError> {
    if term.is_empty() {
        return Err(TerminfoError::NotFound(String::new()));
    }
    if let Some(ti) = db::find(term) {
        return Ok(ti);
    }
    let mut name = term;
    while let Some(pos) = name.rfind('-') {
        name = &name[..pos];
        // Preserve the color depth of the requested variant when the
        // base family has a -256color record.
        if term.ends_with("-256color") {
            let widened = format!("{name}-256color");
            if let Some(ti) = db::find(&widened) {
                return Ok(ti);
            }
        }
        if let Some(ti) = db::find(name) {
            return Ok(ti);
        }
    }
    Err(TerminfoError::NotFound(term.to_string()))
}

/// Whether the session should emit 24-bit color: either the record
/// advertises RGB setters or `$COLORTERM` requests them.
pub fn truecolor(ti: &Terminfo, colorterm: Option<&str>) -> bool {
    if ti.has_truecolor() {
        return true;
    }
    matches!(colorterm, Some("truecolor") | Some("24bit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_terminals_resolve() {
        for term in [
            "xterm",
            "xterm-256color",
            "screen",
            "screen-256color",
            "tmux-256color",
            "linux",
            "vt100",
            "vt220",
            "rxvt-unicode-256color",
            "alacritty",
            "ansi",
        ] {
            let ti = lookup(term).unwrap_or_else(|_| panic!("{term} must resolve"));
            assert!(!ti.set_cursor.is_empty(), "{term} must carry cup");
        }
    }

    #[test]
    fn unknown_variant_falls_back_to_family() {
        let ti = lookup("xterm-kitty").expect("family fallback");
        assert_eq!(ti.name, "xterm");
        let ti = lookup("quartz-256color").err();
        assert!(ti.is_some(), "unknown family must not resolve");
    }

    #[test]
    fn wide_variant_keeps_color_depth() {
        let ti = lookup("xterm-fancy-256color").expect("fallback");
        assert_eq!(ti.colors, 256);
    }

    #[test]
    fn goto_is_one_based_on_the_wire() {
        let ti = lookup("xterm").unwrap();
        assert_eq!(ti.goto(5, 3), "\x1b[4;6H");
        assert_eq!(ti.goto(0, 0), "\x1b[1;1H");
    }

    #[test]
    fn color_setters_expand() {
        let ti = lookup("xterm-256color").unwrap();
        assert_eq!(ti.fg(2), "\x1b[32m");
        assert_eq!(ti.fg(9), "\x1b[91m");
        assert_eq!(ti.fg(200), "\x1b[38;5;200m");
        assert_eq!(ti.bg(4), "\x1b[44m");
        assert_eq!(ti.fg_rgb(1, 2, 3), "\x1b[38;2;1;2;3m");
    }

    #[test]
    fn truecolor_detection() {
        let plain = lookup("xterm").unwrap();
        let wide = lookup("xterm-256color").unwrap();
        assert!(!truecolor(plain, None));
        assert!(truecolor(plain, Some("truecolor")));
        assert!(truecolor(wide, None), "record carries RGB setters");
    }
}
