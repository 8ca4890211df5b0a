//! Render data model: the cell grid a screen converges the terminal
//! toward, plus styles and colors.
//!
//! Dirtiness is tracked per cell by comparing current state against a
//! last-flushed snapshot rather than a boolean flag, so buffer
//! mutations and render flushes can interleave freely; the snapshot is
//! authoritative.

mod buffer;
mod cell;
mod color;
mod style;

pub use buffer::CellBuffer;
pub use cell::Cell;
pub use color::{find_color, standard_palette, Color};
pub use style::{AttrMask, Style};
