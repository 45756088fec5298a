//! The interactive editor value: one buffer, one view, the selection set,
//! registers, and a deliberately small modal layer whose job is to route
//! keys into the core crates. The full keybinding surface lives outside
//! this workspace; what is here is enough to type, navigate, run structural
//! commands, and exercise registers with multiple cursors.

use crate::config::Config;
use anyhow::Result;
use core_command::CommandContext;
use core_register::{RegisterName, RegisterTable};
use core_selection::SelectionSet;
use core_selection::jumps::JumpRing;
use core_terminal::{
    Attrs, Backend, Cell, CellGrid, CellStyle, Color, InputEvent, Key, KeyEvent, Mods,
};
use core_text::Text;
use core_view::{CellFlags, NoHighlight, View};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Insert,
    Command,
}

pub struct Editor {
    text: Text,
    selections: SelectionSet,
    registers: RegisterTable,
    path: Option<PathBuf>,
    view: View,
    grid: CellGrid,
    mode: Mode,
    command_line: String,
    status: Option<String>,
    interrupt: AtomicBool,
    jumps: JumpRing,
    pending_register: Option<(RegisterName, bool)>,
    register_prefix: bool,
    quit: Option<i32>,
}

/// One status row below the text rows.
const STATUS_ROWS: usize = 1;

impl Editor {
    pub fn new(text: Text, path: Option<PathBuf>, cols: usize, rows: usize, config: &Config) -> Self {
        let text_rows = rows.saturating_sub(STATUS_ROWS).max(1);
        let mut view = View::new(cols, text_rows);
        view.set_tabwidth(config.editor.tabwidth);
        view.set_wrap(config.wrap_mode());
        Self {
            text,
            selections: SelectionSet::new(0),
            registers: RegisterTable::new(),
            path,
            view,
            grid: CellGrid::new(cols, rows),
            mode: Mode::Normal,
            command_line: String::new(),
            status: None,
            interrupt: AtomicBool::new(false),
            jumps: JumpRing::default(),
            pending_register: None,
            register_prefix: false,
            quit: None,
        }
    }

    pub fn jump_to_line(&mut self, lineno: usize) {
        if let Ok(start) = self.text.line_start(lineno) {
            self.selections = SelectionSet::new(start);
        }
    }

    pub fn quit_code(&self) -> Option<i32> {
        self.quit
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn modified(&self) -> bool {
        self.text.modified()
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.grid.resize(cols, rows);
        self.view
            .resize(cols, rows.saturating_sub(STATUS_ROWS).max(1));
    }

    // ---------------- movement helpers ----------------

    fn prev_char(&self, pos: usize) -> usize {
        if pos == 0 {
            return 0;
        }
        let mut p = pos - 1;
        while p > 0 && is_continuation(self.text.byte_at(p)) {
            p -= 1;
        }
        p
    }

    fn next_char(&self, pos: usize) -> usize {
        let size = self.text.size();
        if pos >= size {
            return size;
        }
        let mut p = pos + 1;
        while p < size && is_continuation(self.text.byte_at(p)) {
            p += 1;
        }
        p
    }

    fn move_cursors(&mut self, f: impl Fn(&Self, usize) -> usize) {
        let targets: Vec<usize> = self
            .selections
            .iter()
            .map(|sel| f(self, sel.cursor))
            .collect();
        self.selections
            .set_ranges(targets.into_iter().map(core_text::ByteRange::at));
    }

    fn vertical(&self, pos: usize, down: bool) -> usize {
        let begin = self.text.line_begin(pos);
        let col = pos - begin;
        let target_begin = if down {
            let next = self.text.line_next(begin);
            if next >= self.text.size() {
                return pos;
            }
            next
        } else {
            if begin == 0 {
                return pos;
            }
            self.text.line_begin(begin - 1)
        };
        let target_end = {
            let end = self.text.line_next(target_begin);
            // Rest on the line, not on its newline.
            if end > target_begin && self.text.byte_at(end - 1) == Some(b'\n') {
                end - 1
            } else {
                end
            }
        };
        (target_begin + col).min(target_end)
    }

    // ---------------- editing helpers ----------------

    fn insert_at_cursors(&mut self, s: &str) {
        let cursors: Vec<usize> = self.selections.iter().map(|sel| sel.cursor).collect();
        for (i, pos) in cursors.iter().enumerate().rev() {
            if self.text.insert(*pos, s.as_bytes()).is_err() {
                continue;
            }
            self.selections.apply_edit(*pos, 0, s.len(), Some(i));
        }
    }

    fn backspace_at_cursors(&mut self) {
        let cursors: Vec<usize> = self.selections.iter().map(|sel| sel.cursor).collect();
        for pos in cursors.iter().rev() {
            let from = self.prev_char(*pos);
            if from == *pos {
                continue;
            }
            if self.text.delete(from, pos - from).is_err() {
                continue;
            }
            self.selections.apply_edit(from, pos - from, 0, None);
        }
    }

    fn delete_selections(&mut self, into_register: bool) {
        self.text.snapshot();
        let name = self.take_register();
        if into_register {
            let reg = self.registers.get_mut(name);
            reg.resize(self.selections.len());
            for (i, sel) in self.selections.iter().enumerate() {
                let _ = reg.slot_put_range(i, &self.text, sel.range());
            }
        }
        let ranges: Vec<core_text::ByteRange> =
            self.selections.iter().map(|s| s.range()).collect();
        for r in ranges.iter().rev() {
            let len = if r.is_empty() {
                // A bare cursor deletes the character under it.
                self.next_char(r.start) - r.start
            } else {
                r.len()
            };
            if len == 0 || self.text.delete(r.start, len).is_err() {
                continue;
            }
            self.selections.apply_edit(r.start, len, 0, None);
        }
        self.text.snapshot();
    }

    fn yank_selections(&mut self) {
        let name = self.take_register();
        let reg = self.registers.get_mut(name);
        reg.resize(self.selections.len());
        let mut failed = false;
        for (i, sel) in self.selections.iter().enumerate() {
            if reg.slot_put_range(i, &self.text, sel.range()).is_err() {
                failed = true;
            }
        }
        if failed {
            self.status = Some("yank failed".to_string());
        }
    }

    fn paste_after(&mut self) {
        let name = self.take_register();
        // Clipboard and blackhole have no slots; fall back to the full value.
        let fallback = match self.registers.get(name).get(&self.interrupt) {
            Ok(data) => data,
            Err(err) => {
                warn!(target: "editor", error = %err, "register read failed");
                self.status = Some(err.to_string());
                return;
            }
        };
        self.text.snapshot();
        let cursors: Vec<usize> = self.selections.iter().map(|sel| sel.cursor).collect();
        for (i, pos) in cursors.iter().enumerate().rev() {
            let reg = self.registers.get(name);
            let slot_count = reg.slot_count();
            let data: Vec<u8> = if slot_count > 0 {
                reg.slot_get(i % slot_count).unwrap_or_default().to_vec()
            } else {
                fallback.clone()
            };
            if data.is_empty() {
                continue;
            }
            let at = self.next_char(*pos);
            if self.text.insert(at, &data).is_err() {
                continue;
            }
            self.selections.apply_edit(at, 0, data.len(), Some(i));
        }
        self.text.snapshot();
    }

    fn take_register(&mut self) -> RegisterName {
        match self.pending_register.take() {
            Some((name, append)) => {
                self.registers.get_mut(name).append = append;
                name
            }
            None => {
                self.registers.get_mut(RegisterName::Default).append = false;
                RegisterName::Default
            }
        }
    }

    // ---------------- key handling ----------------

    pub fn handle(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Resize(cols, rows) => self.resize(cols, rows),
            InputEvent::Key(key) => match self.mode {
                Mode::Normal => self.handle_normal(key),
                Mode::Insert => self.handle_insert(key),
                Mode::Command => self.handle_command(key),
            },
        }
    }

    fn handle_normal(&mut self, ev: KeyEvent) {
        self.status = None;
        if self.register_prefix {
            self.register_prefix = false;
            if let Key::Char(c) = ev.key {
                match core_register::RegisterName::parse(c) {
                    Some(pending) => self.pending_register = Some(pending),
                    None => self.status = Some(format!("no register `{c}`")),
                }
            }
            return;
        }
        match (ev.key, ev.mods) {
            (Key::Char('r'), m) if m.contains(Mods::CTRL) => {
                if let Some(pos) = self.text.redo() {
                    self.selections = SelectionSet::new(pos.min(self.text.size()));
                }
            }
            (Key::Char('o'), m) if m.contains(Mods::CTRL) => {
                let cur = self.selections.primary().cursor;
                if let Some(pos) = self.jumps.backward(cur) {
                    self.selections = SelectionSet::new(pos.min(self.text.size()));
                }
            }
            (Key::Char(':'), _) => {
                self.mode = Mode::Command;
                self.command_line.clear();
            }
            (Key::Char('"'), _) => self.register_prefix = true,
            (Key::Char('h'), _) | (Key::Left, _) => self.move_cursors(|e, p| e.prev_char(p)),
            (Key::Char('l'), _) | (Key::Right, _) => self.move_cursors(|e, p| e.next_char(p)),
            (Key::Char('j'), _) | (Key::Down, _) => self.move_cursors(|e, p| e.vertical(p, true)),
            (Key::Char('k'), _) | (Key::Up, _) => self.move_cursors(|e, p| e.vertical(p, false)),
            (Key::Char('g'), _) => {
                self.jumps.push(self.selections.primary().cursor);
                self.selections = SelectionSet::new(0);
            }
            (Key::Char('G'), _) => {
                self.jumps.push(self.selections.primary().cursor);
                self.selections = SelectionSet::new(self.text.size());
            }
            (Key::Tab, _) => {
                if let Some(pos) = self.jumps.forward() {
                    self.selections = SelectionSet::new(pos.min(self.text.size()));
                }
            }
            (Key::Char('i'), _) => {
                self.text.snapshot();
                self.mode = Mode::Insert;
            }
            (Key::Char('a'), _) => {
                self.text.snapshot();
                self.move_cursors(|e, p| e.next_char(p));
                self.mode = Mode::Insert;
            }
            (Key::Char('x'), _) | (Key::Delete, _) => self.delete_selections(true),
            (Key::Char('d'), _) => self.delete_selections(true),
            (Key::Char('c'), _) => {
                self.delete_selections(true);
                self.mode = Mode::Insert;
            }
            (Key::Char('y'), _) => self.yank_selections(),
            (Key::Char('p'), _) => self.paste_after(),
            (Key::Char('u'), _) => {
                if let Some(pos) = self.text.undo() {
                    self.selections = SelectionSet::new(pos.min(self.text.size()));
                }
            }
            (Key::PageDown, _) => {
                let rows = self.view.rows() as isize;
                self.view.scroll(&self.text, rows);
            }
            (Key::PageUp, _) => {
                let rows = self.view.rows() as isize;
                self.view.scroll(&self.text, -rows);
            }
            (Key::Escape, _) => self.selections.clear_all(),
            _ => {}
        }
    }

    fn handle_insert(&mut self, ev: KeyEvent) {
        match ev.key {
            Key::Escape => {
                self.text.snapshot();
                self.mode = Mode::Normal;
            }
            Key::Enter => self.insert_at_cursors("\n"),
            Key::Backspace => self.backspace_at_cursors(),
            Key::Tab => self.insert_at_cursors("\t"),
            Key::Char(c) if !ev.mods.contains(Mods::CTRL) => {
                let mut buf = [0u8; 4];
                self.insert_at_cursors(c.encode_utf8(&mut buf));
            }
            _ => {}
        }
    }

    fn handle_command(&mut self, ev: KeyEvent) {
        match ev.key {
            Key::Escape => {
                self.mode = Mode::Normal;
                self.command_line.clear();
            }
            Key::Enter => {
                let line = std::mem::take(&mut self.command_line);
                self.mode = Mode::Normal;
                self.run_command(&line);
            }
            Key::Backspace => {
                if self.command_line.pop().is_none() {
                    self.mode = Mode::Normal;
                }
            }
            Key::Char(c) => self.command_line.push(c),
            _ => {}
        }
    }

    pub fn run_command(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let mut printed: Vec<u8> = Vec::new();
        let mut ctx = CommandContext::new(
            &mut self.text,
            &mut self.selections,
            &mut self.path,
            &mut printed,
            &self.interrupt,
        );
        match core_command::run(&mut ctx, line) {
            Ok(result) => {
                let mut messages = std::mem::take(&mut ctx.messages);
                if result.quit {
                    self.quit = Some(0);
                }
                if !printed.is_empty() {
                    let text = String::from_utf8_lossy(&printed);
                    messages.push(text.trim_end().to_string());
                }
                self.status = messages.pop();
            }
            Err(err) => {
                // Errors are transient status-line messages, never fatal.
                self.status = Some(err.to_string());
            }
        }
    }

    // ---------------- drawing ----------------

    pub fn draw(&mut self, backend: &mut dyn Backend) -> Result<()> {
        let primary = self.selections.primary().cursor;
        self.view.ensure_visible(&self.text, primary);
        self.view.layout(&self.text, &self.selections, &NoHighlight);
        self.grid.clear();

        for (row, line) in self.view.lines().iter().enumerate() {
            let mut col = 0usize;
            for cell in &line.cells {
                if col >= self.grid.cols() {
                    break;
                }
                let style = style_of(cell, primary);
                let term_cell = if cell.flags.contains(CellFlags::CONTINUATION) {
                    Cell::new("", 0, style)
                } else {
                    Cell::new(cell.as_str(), cell.width, style)
                };
                self.grid.set(row, col, term_cell);
                col += 1;
            }
        }
        self.draw_status();

        let cursor = self
            .view
            .pos_to_cell(primary)
            .filter(|_| self.mode != Mode::Command);
        backend.blit(&self.grid, cursor)
    }

    fn draw_status(&mut self) {
        let row = self.grid.rows().saturating_sub(1);
        let line = if self.mode == Mode::Command {
            format!(":{}", self.command_line)
        } else if let Some(status) = &self.status {
            status.clone()
        } else {
            let name = self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "[no name]".to_string());
            let flag = if self.text.modified() { " [+]" } else { "" };
            let pos = self.selections.primary().cursor;
            let lineno = self.text.byte_to_line(pos);
            let mode = match self.mode {
                Mode::Insert => "-- INSERT -- ",
                _ => "",
            };
            format!(
                "{mode}{name}{flag}  {lineno},{col}  {n} sel",
                col = pos - self.text.line_begin(pos),
                n = self.selections.len()
            )
        };
        let style = CellStyle {
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attrs::REVERSE,
        };
        let mut col = 0;
        for c in line.chars().chain(std::iter::repeat(' ')) {
            if col >= self.grid.cols() {
                break;
            }
            let mut buf = [0u8; 4];
            self.grid
                .set(row, col, Cell::new(c.encode_utf8(&mut buf), 1, style));
            col += 1;
        }
    }
}

fn style_of(cell: &core_view::Cell, primary_cursor: usize) -> CellStyle {
    let mut style = CellStyle::default();
    if cell.flags.contains(CellFlags::SELECTED) {
        style.attrs |= Attrs::REVERSE;
    }
    if cell.flags.contains(CellFlags::CURSOR) && cell.offset != primary_cursor {
        // Secondary cursors render underlined; the primary uses the real
        // terminal cursor.
        style.attrs |= Attrs::UNDERLINE;
    }
    if cell.flags.contains(CellFlags::TRUNCATED) {
        style.fg = Color::Indexed(4);
    }
    style
}

fn is_continuation(byte: Option<u8>) -> bool {
    matches!(byte, Some(b) if b & 0xC0 == 0x80)
}
