//! Row-major cell grid with snapshot-based dirty tracking.
//!
//! Invariants:
//! * `cells.len() == width * height` at all times.
//! * Out-of-range coordinates are silently ignored on writes and
//!   answered with the sentinel `('\0', [], default, -1)` on reads.
//! * `resize` preserves the current state of overlapping cells and
//!   leaves every cell dirty.

use crate::{Cell, Style};

#[derive(Debug, Default)]
pub struct CellBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let mut cb = Self::default();
        cb.resize(width, height);
        cb
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Write one cell's current state. Ignored out of bounds.
    pub fn set_content(&mut self, x: usize, y: usize, ch: char, comb: &[char], style: Style) {
        if let Some(i) = self.index(x, y) {
            self.cells[i].set(ch, comb, style);
        }
    }

    /// Read one cell's current state as `(primary, combining, style,
    /// width)`. A stored width of zero or a control primary reads as a
    /// single-width space; out of bounds reads as width `-1`.
    pub fn get_content(&self, x: usize, y: usize) -> (char, &[char], Style, isize) {
        match self.index(x, y) {
            None => ('\0', &[], Style::default(), -1),
            Some(i) => {
                let c = &self.cells[i];
                if c.width == 0 || c.ch < ' ' {
                    (' ', &c.comb, c.style, 1)
                } else {
                    (c.ch, &c.comb, c.style, c.width as isize)
                }
            }
        }
    }

    /// Set every cell to `ch` with `style`, width 1, no combining.
    pub fn fill(&mut self, ch: char, style: Style) {
        for c in &mut self.cells {
            c.ch = ch;
            c.comb.clear();
            c.style = style;
            c.width = 1;
        }
    }

    pub fn dirty(&self, x: usize, y: usize) -> bool {
        self.index(x, y).is_some_and(|i| self.cells[i].dirty())
    }

    pub fn set_dirty(&mut self, x: usize, y: usize, dirty: bool) {
        if let Some(i) = self.index(x, y) {
            if dirty {
                self.cells[i].mark_dirty();
            } else {
                self.cells[i].mark_clean();
            }
        }
    }

    /// Force every cell dirty so the next render repaints everything.
    pub fn invalidate(&mut self) {
        for c in &mut self.cells {
            c.mark_dirty();
        }
    }

    /// Change dimensions, preserving the current state of overlapping
    /// cells. Every cell of the new grid is dirty. A zero dimension
    /// empties the grid.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        if width == 0 || height == 0 {
            self.cells.clear();
            self.width = width;
            self.height = height;
            return;
        }
        let mut next = vec![Cell::default(); width * height];
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                let old = &self.cells[y * self.width + x];
                let cell = &mut next[y * width + x];
                cell.ch = old.ch;
                cell.comb = old.comb.clone();
                cell.style = old.style;
                cell.width = old.width;
                // last_ch stays '\0': the whole grid repaints.
            }
        }
        self.cells = next;
        self.width = width;
        self.height = height;
    }

    /// Stored width of the cell, for cursor advancement during a
    /// render pass. Clamped to 1 for control/zero-width primaries.
    pub fn advance_width(&self, x: usize, y: usize) -> usize {
        match self.index(x, y) {
            None => 1,
            Some(i) => {
                let c = &self.cells[i];
                if c.width == 0 || c.ch < ' ' {
                    1
                } else {
                    c.width as usize
                }
            }
        }
    }
}
