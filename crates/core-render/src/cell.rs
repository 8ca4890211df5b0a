//! One grid position: current state plus the last-flushed snapshot.

use crate::Style;
use unicode_width::UnicodeWidthChar;

/// A single character cell.
///
/// `width` is the rendered width in columns as stored (0 for control
/// and combining-only primaries); readers clamp it to 1. The `last_*`
/// fields hold the state most recently flushed to the terminal; a zero
/// `last_ch` forces the cell dirty.
#[derive(Clone, Debug)]
pub struct Cell {
    pub(crate) ch: char,
    pub(crate) comb: Vec<char>,
    pub(crate) style: Style,
    pub(crate) width: u8,
    pub(crate) last_ch: char,
    pub(crate) last_comb: Vec<char>,
    pub(crate) last_style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            comb: Vec::new(),
            style: Style::default(),
            width: 1,
            last_ch: '\0',
            last_comb: Vec::new(),
            last_style: Style::default(),
        }
    }
}

impl Cell {
    pub(crate) fn set(&mut self, ch: char, comb: &[char], style: Style) {
        if ch != self.ch {
            self.width = UnicodeWidthChar::width(ch).unwrap_or(0) as u8;
        }
        self.ch = ch;
        // Defensive copy: callers may reuse their combining scratch.
        self.comb = comb.to_vec();
        self.style = style;
    }

    pub(crate) fn dirty(&self) -> bool {
        self.last_ch == '\0'
            || self.last_ch != self.ch
            || self.last_style != self.style
            || self.last_comb != self.comb
    }

    /// Snapshot current state as flushed, promoting a zero primary to
    /// space so the cell does not re-dirty itself.
    pub(crate) fn mark_clean(&mut self) {
        if self.ch == '\0' {
            self.ch = ' ';
        }
        self.last_ch = self.ch;
        self.last_comb = self.comb.clone();
        self.last_style = self.style;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.last_ch = '\0';
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cell_is_dirty() {
        assert!(Cell::default().dirty());
    }

    #[test]
    fn clean_then_mutate_redirties() {
        let mut c = Cell::default();
        c.mark_clean();
        assert!(!c.dirty());
        c.set('x', &[], Style::default());
        assert!(c.dirty());
        c.mark_clean();
        c.set('x', &['\u{0301}'], Style::default());
        assert!(c.dirty(), "combining change must dirty the cell");
    }

    #[test]
    fn width_follows_primary() {
        let mut c = Cell::default();
        c.set('語', &[], Style::default());
        assert_eq!(c.width, 2);
        c.set('a', &[], Style::default());
        assert_eq!(c.width, 1);
        c.set('\x07', &[], Style::default());
        assert_eq!(c.width, 0);
    }
}
