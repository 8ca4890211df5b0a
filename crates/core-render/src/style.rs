//! Cell display styles.

use crate::Color;

bitflags::bitflags! {
    /// Text attribute bits applied when rendering a cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrMask: u8 {
        const BOLD          = 1 << 0;
        const BLINK         = 1 << 1;
        const REVERSE       = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const DIM           = 1 << 4;
        const ITALIC        = 1 << 5;
        const STRIKETHROUGH = 1 << 6;
    }
}

/// Foreground color, background color and attribute bits.
///
/// The default value is the ambient-style sentinel: both colors are
/// [`Color::DEFAULT`], meaning "use the screen's ambient style at
/// render time".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: AttrMask,
}

impl Style {
    pub fn foreground(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    pub fn background(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    pub fn attributes(mut self, attrs: AttrMask) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn bold(mut self, on: bool) -> Self {
        self.attrs.set(AttrMask::BOLD, on);
        self
    }

    pub fn reverse(mut self, on: bool) -> Self {
        self.attrs.set(AttrMask::REVERSE, on);
        self
    }

    pub fn underline(mut self, on: bool) -> Self {
        self.attrs.set(AttrMask::UNDERLINE, on);
        self
    }

    /// True if this is the ambient-style sentinel with no attributes.
    pub fn is_default(&self) -> bool {
        self.fg.is_default() && self.bg.is_default() && self.attrs.is_empty()
    }
}
