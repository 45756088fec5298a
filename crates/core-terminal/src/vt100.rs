//! Raw VT-100 adapter.
//!
//! The simplest possible drawing backend for VT-100 compatible terminals;
//! no damage tracking, every blit repaints the grid. Sequences used:
//! DECSET/DECRST 1049 (alternate screen), DECTCEM (cursor visibility),
//! ED (erase display), CUP (cursor position) and SGR for attributes with
//! 38;2/48;2 for RGB colors.

use crate::{Attrs, Backend, CellGrid, CellStyle, Color};
use anyhow::Result;
use std::io::Write;

pub struct Vt100Backend<W: Write> {
    out: W,
    buf: Vec<u8>,
}

impl<W: Write> Vt100Backend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(4096),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        self.buf.clear();
        Ok(())
    }

    fn sgr(&mut self, style: &CellStyle) {
        self.buf.extend_from_slice(b"\x1b[0");
        for (flag, code) in [
            (Attrs::BOLD, "1"),
            (Attrs::DIM, "2"),
            (Attrs::ITALIC, "3"),
            (Attrs::UNDERLINE, "4"),
            (Attrs::BLINK, "5"),
            (Attrs::REVERSE, "7"),
        ] {
            if style.attrs.contains(flag) {
                self.buf.push(b';');
                self.buf.extend_from_slice(code.as_bytes());
            }
        }
        self.color(style.fg, false);
        self.color(style.bg, true);
        self.buf.push(b'm');
    }

    fn color(&mut self, color: Color, background: bool) {
        let base: u16 = if background { 40 } else { 30 };
        match color {
            Color::Default => {
                self.emit_code(base + 9);
            }
            Color::Indexed(i) if i < 8 => {
                self.emit_code(base + i as u16);
            }
            Color::Indexed(i) if i < 16 => {
                self.emit_code(base + 60 + (i - 8) as u16);
            }
            Color::Indexed(i) => {
                self.buf
                    .extend_from_slice(format!(";{};5;{}", base + 8, i).as_bytes());
            }
            Color::Rgb(r, g, b) => {
                self.buf
                    .extend_from_slice(format!(";{};2;{r};{g};{b}", base + 8).as_bytes());
            }
        }
    }

    fn emit_code(&mut self, code: u16) {
        self.buf.extend_from_slice(format!(";{code}").as_bytes());
    }

    fn cursor_to(&mut self, row: usize, col: usize) {
        self.buf
            .extend_from_slice(format!("\x1b[{};{}H", row + 1, col + 1).as_bytes());
    }
}

impl<W: Write> Backend for Vt100Backend<W> {
    fn save(&mut self) -> Result<()> {
        self.buf.extend_from_slice(b"\x1b[?1049h\x1b[?25l");
        self.flush_buf()
    }

    fn restore(&mut self) -> Result<()> {
        self.buf.extend_from_slice(b"\x1b[0m\x1b[?1049l\x1b[?25h");
        self.flush_buf()
    }

    fn clear(&mut self) -> Result<()> {
        self.buf.extend_from_slice(b"\x1b[H\x1b[J");
        self.flush_buf()
    }

    fn resize(&mut self, _cols: usize, _rows: usize) -> Result<()> {
        self.clear()
    }

    fn blit(&mut self, grid: &CellGrid, cursor: Option<(usize, usize)>) -> Result<()> {
        self.buf.extend_from_slice(b"\x1b[?25l");
        let mut style: Option<CellStyle> = None;
        for row in 0..grid.rows() {
            self.cursor_to(row, 0);
            for col in 0..grid.cols() {
                let cell = grid.cell(row, col);
                if cell.width == 0 {
                    continue;
                }
                if style != Some(cell.style) {
                    self.sgr(&cell.style);
                    style = Some(cell.style);
                }
                self.buf.extend_from_slice(cell.as_str().as_bytes());
            }
        }
        self.buf.extend_from_slice(b"\x1b[0m");
        if let Some((row, col)) = cursor {
            self.cursor_to(row, col);
            self.buf.extend_from_slice(b"\x1b[?25h");
        }
        self.flush_buf()
    }

    fn suspend(&mut self) -> Result<()> {
        self.restore()
    }

    fn resume(&mut self) -> Result<()> {
        self.save()?;
        self.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cell;

    fn rendered(grid: &CellGrid, cursor: Option<(usize, usize)>) -> String {
        let mut backend = Vt100Backend::new(Vec::new());
        backend.blit(grid, cursor).unwrap();
        String::from_utf8(backend.into_inner()).unwrap()
    }

    #[test]
    fn save_and_restore_switch_screens() {
        let mut backend = Vt100Backend::new(Vec::new());
        backend.save().unwrap();
        backend.restore().unwrap();
        let out = String::from_utf8(backend.into_inner()).unwrap();
        assert!(out.contains("\x1b[?1049h"));
        assert!(out.contains("\x1b[?1049l"));
    }

    #[test]
    fn blit_positions_rows_and_writes_content() {
        let mut grid = CellGrid::new(3, 2);
        grid.set(0, 0, Cell::new("h", 1, CellStyle::default()));
        grid.set(1, 0, Cell::new("i", 1, CellStyle::default()));
        let out = rendered(&grid, None);
        assert!(out.contains("\x1b[1;1H"));
        assert!(out.contains("\x1b[2;1H"));
        assert!(out.contains('h'));
        assert!(out.contains('i'));
    }

    #[test]
    fn styles_emit_sgr_once_per_run() {
        let mut grid = CellGrid::new(2, 1);
        let bold_red = CellStyle {
            fg: Color::Indexed(1),
            bg: Color::Default,
            attrs: Attrs::BOLD,
        };
        grid.set(0, 0, Cell::new("a", 1, bold_red));
        grid.set(0, 1, Cell::new("b", 1, bold_red));
        let out = rendered(&grid, None);
        assert_eq!(out.matches("\x1b[0;1;31;49m").count(), 1);
    }

    #[test]
    fn rgb_colors_use_direct_sgr() {
        let mut grid = CellGrid::new(1, 1);
        let style = CellStyle {
            fg: Color::Rgb(1, 2, 3),
            ..Default::default()
        };
        grid.set(0, 0, Cell::new("x", 1, style));
        let out = rendered(&grid, None);
        assert!(out.contains(";38;2;1;2;3"));
    }

    #[test]
    fn cursor_is_positioned_and_shown() {
        let grid = CellGrid::new(2, 2);
        let out = rendered(&grid, Some((1, 1)));
        assert!(out.ends_with("\x1b[2;2H\x1b[?25h"));
    }
}
