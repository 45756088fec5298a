//! Terminal backend abstraction: a cell grid, concrete colors/attributes,
//! key events, and two adapters — crossterm (the reference backend) and a
//! minimal raw VT-100 emitter useful for debugging and environments without
//! terminfo.

use anyhow::Result;
use bitflags::bitflags;

mod backend;
mod keys;
mod vt100;

pub use backend::{CrosstermBackend, TerminalGuard, size};
pub use keys::{InputEvent, Key, KeyEvent, Mods, decode, read_key};
pub use vt100::Vt100Backend;

/// A concrete terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const REVERSE = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

/// One grid cell: up to four bytes of UTF-8 and a resolved style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    bytes: [u8; 4],
    len: u8,
    pub width: u8,
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(" ", 1, CellStyle::default())
    }
}

impl Cell {
    pub fn new(text: &str, width: u8, style: CellStyle) -> Self {
        let mut bytes = [0u8; 4];
        // Stay on a char boundary when the cluster overflows the cell.
        let take = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end <= 4)
            .last()
            .unwrap_or(0);
        bytes[..take].copy_from_slice(&text.as_bytes()[..take]);
        Self {
            bytes,
            len: take as u8,
            width,
            style,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or(" ")
    }
}

/// Screen-sized cell matrix. The renderer fills it, a backend blits it.
#[derive(Debug, Clone)]
pub struct CellGrid {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Cell::default(); cols * rows];
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = cell;
        }
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }
}

/// Drawing capability a terminal adapter provides. `save`/`restore` bracket
/// the alternate screen; `suspend`/`resume` bracket job control.
pub trait Backend {
    fn save(&mut self) -> Result<()>;
    fn restore(&mut self) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn resize(&mut self, cols: usize, rows: usize) -> Result<()>;
    /// Draw the whole grid; position (and show) the cursor if given.
    fn blit(&mut self, grid: &CellGrid, cursor: Option<(usize, usize)>) -> Result<()>;
    fn suspend(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
}
