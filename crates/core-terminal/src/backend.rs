//! Crossterm reference adapter.

use crate::{Attrs, Backend, CellGrid, Color};
use anyhow::Result;
use crossterm::style::{
    Attribute, Attributes, Print, ResetColor, SetAttributes, SetBackgroundColor,
    SetForegroundColor,
};
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{cursor, execute, queue};
use std::io::{Write, stdout};

/// Current terminal dimensions as `(cols, rows)`.
pub fn size() -> Result<(usize, usize)> {
    let (cols, rows) = crossterm::terminal::size()?;
    Ok((cols as usize, rows as usize))
}

pub struct CrosstermBackend {
    entered: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that restores the terminal on drop, even on
    /// an early return or panic.
    pub fn guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.save()?;
        Ok(TerminalGuard { backend: self })
    }
}

/// RAII wrapper around the alternate screen.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl TerminalGuard<'_> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        self.backend
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.restore();
    }
}

fn term_color(color: Color) -> crossterm::style::Color {
    match color {
        Color::Default => crossterm::style::Color::Reset,
        Color::Indexed(i) => crossterm::style::Color::AnsiValue(i),
        Color::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
    }
}

fn term_attrs(attrs: Attrs) -> Attributes {
    let mut out = Attributes::default();
    for (flag, attr) in [
        (Attrs::BOLD, Attribute::Bold),
        (Attrs::DIM, Attribute::Dim),
        (Attrs::ITALIC, Attribute::Italic),
        (Attrs::UNDERLINE, Attribute::Underlined),
        (Attrs::BLINK, Attribute::SlowBlink),
        (Attrs::REVERSE, Attribute::Reverse),
    ] {
        if attrs.contains(flag) {
            out.set(attr);
        }
    }
    out
}

impl Backend for CrosstermBackend {
    fn save(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, cursor::Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        execute!(stdout(), Clear(ClearType::All))?;
        Ok(())
    }

    fn resize(&mut self, _cols: usize, _rows: usize) -> Result<()> {
        // The terminal owns its size; the next blit redraws everything.
        self.clear()
    }

    fn blit(&mut self, grid: &CellGrid, cursor_at: Option<(usize, usize)>) -> Result<()> {
        let mut out = stdout();
        queue!(out, cursor::Hide)?;
        for row in 0..grid.rows() {
            queue!(out, cursor::MoveTo(0, row as u16))?;
            let mut style = None;
            for col in 0..grid.cols() {
                let cell = grid.cell(row, col);
                if cell.width == 0 {
                    // Continuation column of a wide cell.
                    continue;
                }
                if style != Some(cell.style) {
                    queue!(
                        out,
                        ResetColor,
                        SetAttributes(Attributes::default()),
                        SetForegroundColor(term_color(cell.style.fg)),
                        SetBackgroundColor(term_color(cell.style.bg)),
                        SetAttributes(term_attrs(cell.style.attrs)),
                    )?;
                    style = Some(cell.style);
                }
                queue!(out, Print(cell.as_str()))?;
            }
        }
        queue!(out, ResetColor)?;
        if let Some((row, col)) = cursor_at {
            queue!(
                out,
                cursor::MoveTo(col as u16, row as u16),
                cursor::Show
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        self.restore()
    }

    fn resume(&mut self) -> Result<()> {
        self.save()?;
        self.clear()
    }
}
