//! View / line model: projects a byte range of the buffer onto a grid of
//! cells for a `(cols, rows)` viewport.
//!
//! Layout is lazy: only the current viewport's worth of lines is computed,
//! and the cache is rebuilt on edit, scroll, or resize. Tabs expand to the
//! next multiple of the tab width, wide graphemes occupy two cells, zero
//! width clusters fold away, and a line wider than the viewport either wraps
//! onto continuation rows (sharing the source line number) or is clipped
//! with a marker, depending on the wrap mode.

mod cell;

pub use cell::{Cell, CellFlags, Line, StyleId};

use core_selection::SelectionSet;
use core_text::{ByteRange, Text};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal column width of one grapheme cluster. The single authority for
/// width decisions in this workspace; callers must not consult
/// `unicode_width` directly.
pub fn egc_width(g: &str) -> u8 {
    UnicodeWidthStr::width(g).min(2) as u8
}

/// Syntax styling capability. Queried once per source line; returns
/// non-overlapping `(range, style)` runs in ascending order. Cursor and
/// selection overlays are applied on top by the view.
pub trait Styler {
    fn style_range(&self, text: &Text, range: ByteRange) -> Vec<(ByteRange, StyleId)>;
}

/// Leaves everything in the default style.
#[derive(Debug, Default)]
pub struct NoHighlight;

impl Styler for NoHighlight {
    fn style_range(&self, _text: &Text, _range: ByteRange) -> Vec<(ByteRange, StyleId)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Wrap,
    Truncate,
}

pub const DEFAULT_TABWIDTH: usize = 8;

/// A viewport over a buffer. Owns the layout cache; the buffer, selections
/// and styler are borrowed per `layout` call.
#[derive(Debug)]
pub struct View {
    /// Byte offset of the first displayed line's start.
    top: usize,
    cols: usize,
    rows: usize,
    tabwidth: usize,
    wrap: WrapMode,
    lines: Vec<Line>,
}

impl View {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            top: 0,
            cols: cols.max(1),
            rows: rows.max(1),
            tabwidth: DEFAULT_TABWIDTH,
            wrap: WrapMode::Wrap,
            lines: Vec::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self.lines.clear();
    }

    pub fn set_tabwidth(&mut self, width: usize) {
        self.tabwidth = width.clamp(1, 32);
        self.lines.clear();
    }

    pub fn set_wrap(&mut self, wrap: WrapMode) {
        self.wrap = wrap;
        self.lines.clear();
    }

    /// Laid-out lines from the last `layout` call.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Recompute the cell grid for the current viewport.
    pub fn layout(
        &mut self,
        text: &Text,
        selections: &SelectionSet,
        styler: &dyn Styler,
    ) -> &[Line] {
        self.lines.clear();
        self.top = text.line_begin(self.top.min(text.size()));
        let mut line_start = self.top;
        let mut lineno = text.byte_to_line(self.top);
        loop {
            if self.lines.len() >= self.rows {
                break;
            }
            let line_end = text.line_next(line_start);
            let range = ByteRange::new(line_start, line_end);
            let raw = text.content(range).unwrap_or_default();
            let content = String::from_utf8_lossy(&raw);
            let styles = styler.style_range(text, range);
            self.layout_line(&content, line_start, lineno, &styles, selections);
            if line_end >= text.size() {
                break;
            }
            line_start = line_end;
            lineno += 1;
        }
        &self.lines
    }

    fn layout_line(
        &mut self,
        content: &str,
        start: usize,
        lineno: usize,
        styles: &[(ByteRange, StyleId)],
        selections: &SelectionSet,
    ) {
        let mut cells: Vec<Cell> = Vec::with_capacity(self.cols);
        let mut col = 0usize;
        let mut clipped = false;
        let mut eol_offset = start + content.len();

        for (i, g) in content.grapheme_indices(true) {
            let offset = start + i;
            if g == "\n" {
                eol_offset = offset;
                break;
            }
            if clipped {
                continue;
            }
            if g == "\t" {
                let span = self.tabwidth - (col % self.tabwidth);
                for _ in 0..span {
                    if col >= self.cols {
                        break;
                    }
                    cells.push(self.decorated(" ", 1, offset, styles, selections));
                    col += 1;
                }
                if col >= self.cols {
                    self.wrap_or_clip(&mut cells, &mut col, &mut clipped, lineno, offset);
                }
                continue;
            }
            let width = egc_width(g) as usize;
            if width == 0 {
                // Stray zero-width cluster; nothing to display.
                continue;
            }
            if col + width > self.cols {
                self.wrap_or_clip(&mut cells, &mut col, &mut clipped, lineno, offset);
                if clipped {
                    continue;
                }
            }
            cells.push(self.decorated(g, width as u8, offset, styles, selections));
            if width == 2 {
                cells.push(Cell::continuation(offset));
            }
            col += width;
        }

        if self.lines.len() >= self.rows {
            return;
        }
        // Terminator cell: where a cursor at end-of-line (or end-of-file)
        // rests.
        if !clipped {
            if col >= self.cols {
                self.push_row(&mut cells, &mut col, lineno);
                if self.lines.len() >= self.rows {
                    return;
                }
            }
            cells.push(self.decorated(" ", 1, eol_offset, styles, selections));
            col += 1;
        }
        self.lines.push(Line {
            lineno,
            cells,
            end_col: col.saturating_sub(1),
        });
    }

    fn wrap_or_clip(
        &mut self,
        cells: &mut Vec<Cell>,
        col: &mut usize,
        clipped: &mut bool,
        lineno: usize,
        offset: usize,
    ) {
        match self.wrap {
            WrapMode::Wrap => self.push_row(cells, col, lineno),
            WrapMode::Truncate => {
                if let Some(last) = cells.last_mut() {
                    let mut marker = Cell::new(">", 1, offset);
                    marker.flags = CellFlags::TRUNCATED;
                    *last = marker;
                }
                *clipped = true;
            }
        }
    }

    fn push_row(&mut self, cells: &mut Vec<Cell>, col: &mut usize, lineno: usize) {
        let row = std::mem::take(cells);
        let end = *col;
        if self.lines.len() < self.rows {
            self.lines.push(Line {
                lineno,
                cells: row,
                end_col: end.saturating_sub(1),
            });
        }
        *col = 0;
    }

    fn decorated(
        &self,
        g: &str,
        width: u8,
        offset: usize,
        styles: &[(ByteRange, StyleId)],
        selections: &SelectionSet,
    ) -> Cell {
        let mut cell = Cell::new(g, width, offset);
        cell.style = styles
            .iter()
            .find(|(r, _)| r.contains(offset))
            .map(|(_, s)| *s)
            .unwrap_or(0);
        for sel in selections.iter() {
            if sel.cursor == offset {
                cell.flags |= CellFlags::CURSOR;
            }
            if sel.range().contains(offset) {
                cell.flags |= CellFlags::SELECTED;
            }
        }
        cell
    }

    // ---------------- coordinate mapping ----------------

    /// Screen coordinates of a byte offset within the rendered range.
    pub fn pos_to_cell(&self, pos: usize) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (row, line) in self.lines.iter().enumerate() {
            for (col, cell) in line.cells.iter().enumerate() {
                if cell.flags.contains(CellFlags::CONTINUATION) {
                    continue;
                }
                if cell.offset == pos {
                    return Some((row, col));
                }
                if cell.offset < pos {
                    best = Some((row, col));
                } else {
                    return best;
                }
            }
        }
        best.filter(|_| {
            // Only report positions actually covered by the rendered cells.
            self.lines
                .last()
                .and_then(|l| l.cells.last())
                .is_some_and(|c| pos <= c.offset)
        })
    }

    /// Nearest byte offset for screen coordinates.
    pub fn cell_to_pos(&self, row: usize, col: usize) -> usize {
        let Some(line) = self.lines.get(row.min(self.lines.len().saturating_sub(1))) else {
            return self.top;
        };
        if line.cells.is_empty() {
            return self.top;
        }
        let mut i = col.min(line.cells.len() - 1);
        while i > 0 && line.cells[i].flags.contains(CellFlags::CONTINUATION) {
            i -= 1;
        }
        line.cells[i].offset
    }

    // ---------------- scrolling ----------------

    /// Scroll by `delta` source lines (positive = down), snapping to line
    /// starts even in wrap mode.
    pub fn scroll(&mut self, text: &Text, delta: isize) {
        if delta >= 0 {
            for _ in 0..delta {
                let next = text.line_next(self.top);
                if next >= text.size() {
                    break;
                }
                self.top = next;
            }
        } else {
            for _ in 0..delta.unsigned_abs() {
                if self.top == 0 {
                    break;
                }
                self.top = text.line_begin(self.top - 1);
            }
        }
        self.lines.clear();
    }

    /// Center the viewport around `pos` (as far as the file start allows).
    pub fn scroll_to(&mut self, text: &Text, pos: usize) {
        let mut top = text.line_begin(pos.min(text.size()));
        for _ in 0..self.rows / 2 {
            if top == 0 {
                break;
            }
            top = text.line_begin(top - 1);
        }
        self.top = top;
        self.lines.clear();
    }

    /// Minimal scroll bringing `pos` into the viewport. Wrap-mode rows may
    /// still push the target off screen for pathologically long lines; the
    /// next `ensure_visible` after layout converges.
    pub fn ensure_visible(&mut self, text: &Text, pos: usize) {
        let pos = pos.min(text.size());
        let target = text.line_begin(pos);
        if target < self.top {
            self.top = target;
            self.lines.clear();
            return;
        }
        let mut at = self.top;
        let mut rows_between = 0usize;
        while at < target && rows_between < self.rows {
            at = text.line_next(at);
            rows_between += 1;
        }
        if rows_between >= self.rows {
            let mut top = target;
            for _ in 0..self.rows.saturating_sub(1) {
                if top == 0 {
                    break;
                }
                top = text.line_begin(top - 1);
            }
            self.top = top;
            self.lines.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(content: &str) -> Text {
        let mut t = Text::new();
        t.insert(0, content.as_bytes()).unwrap();
        t.snapshot();
        t
    }

    fn render(view: &mut View, text: &Text) -> Vec<String> {
        let sels = SelectionSet::new(0);
        view.layout(text, &sels, &NoHighlight)
            .iter()
            .map(|l| {
                l.cells
                    .iter()
                    .filter(|c| !c.flags.contains(CellFlags::CONTINUATION))
                    .map(|c| c.as_str())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn simple_lines_fill_rows() {
        let t = text_of("one\ntwo\nthree\n");
        let mut v = View::new(20, 5);
        let rows = render(&mut v, &t);
        // Trailing terminator cell renders as a space.
        assert_eq!(rows, vec!["one ", "two ", "three "]);
        assert_eq!(v.lines()[0].lineno, 1);
        assert_eq!(v.lines()[2].lineno, 3);
    }

    #[test]
    fn long_line_wraps_sharing_lineno() {
        let t = text_of("abcdefghij\n");
        let mut v = View::new(4, 5);
        let rows = render(&mut v, &t);
        assert_eq!(rows, vec!["abcd", "efgh", "ij "]);
        assert!(v.lines().iter().all(|l| l.lineno == 1));
    }

    #[test]
    fn truncate_mode_clips_with_marker() {
        let t = text_of("abcdefghij\nshort\n");
        let mut v = View::new(4, 5);
        v.set_wrap(WrapMode::Truncate);
        let sels = SelectionSet::new(0);
        let lines = v.layout(&t, &sels, &NoHighlight);
        assert_eq!(lines.len(), 2);
        let marker = lines[0].cells.last().unwrap();
        assert_eq!(marker.as_str(), ">");
        assert!(marker.flags.contains(CellFlags::TRUNCATED));
        assert_eq!(lines[1].lineno, 2);
    }

    #[test]
    fn tabs_expand_to_tabstop() {
        let t = text_of("a\tb\n");
        let mut v = View::new(20, 2);
        v.set_tabwidth(4);
        let rows = render(&mut v, &t);
        assert_eq!(rows, vec!["a   b "]);
        // Every fill cell points back at the tab's source offset.
        let tab_cells: Vec<_> = v.lines()[0]
            .cells
            .iter()
            .filter(|c| c.offset == 1)
            .collect();
        assert_eq!(tab_cells.len(), 3);
    }

    #[test]
    fn wide_grapheme_occupies_two_cells() {
        let t = text_of("a漢b\n");
        let mut v = View::new(10, 2);
        let sels = SelectionSet::new(0);
        let line = &v.layout(&t, &sels, &NoHighlight)[0];
        assert_eq!(line.cells[1].as_str(), "漢");
        assert_eq!(line.cells[1].width, 2);
        assert!(line.cells[2].flags.contains(CellFlags::CONTINUATION));
        assert_eq!(line.cells[3].as_str(), "b");
    }

    #[test]
    fn combining_mark_folds_into_cluster() {
        let t = text_of("e\u{301}x\n");
        let mut v = View::new(10, 2);
        let sels = SelectionSet::new(0);
        let line = &v.layout(&t, &sels, &NoHighlight)[0];
        assert_eq!(line.cells[0].as_str(), "e\u{301}");
        assert_eq!(line.cells[1].as_str(), "x");
    }

    #[test]
    fn cursor_and_selection_flags() {
        let t = text_of("hello\n");
        let mut v = View::new(10, 2);
        let mut sels = SelectionSet::new(0);
        sels.get_mut(0).unwrap().set(core_text::ByteRange::new(1, 4));
        v.layout(&t, &sels, &NoHighlight);
        let line = &v.lines()[0];
        assert!(!line.cells[0].flags.contains(CellFlags::SELECTED));
        assert!(line.cells[1].flags.contains(CellFlags::SELECTED));
        assert!(line.cells[3].flags.contains(CellFlags::SELECTED));
        assert!(line.cells[4].flags.contains(CellFlags::CURSOR));
        assert!(!line.cells[4].flags.contains(CellFlags::SELECTED));
    }

    #[test]
    fn position_cell_round_trip() {
        let t = text_of("alpha\nbeta\n");
        let mut v = View::new(10, 4);
        let sels = SelectionSet::new(0);
        v.layout(&t, &sels, &NoHighlight);
        assert_eq!(v.pos_to_cell(0), Some((0, 0)));
        assert_eq!(v.pos_to_cell(7), Some((1, 1)));
        assert_eq!(v.cell_to_pos(1, 1), 7);
        // Column past the content snaps to the nearest cell.
        assert_eq!(v.cell_to_pos(0, 99), 5);
    }

    #[test]
    fn scrolling_moves_by_source_lines() {
        let t = text_of("1\n2\n3\n4\n5\n");
        let mut v = View::new(10, 2);
        let sels = SelectionSet::new(0);
        v.layout(&t, &sels, &NoHighlight);
        v.scroll(&t, 2);
        v.layout(&t, &sels, &NoHighlight);
        assert_eq!(v.lines()[0].lineno, 3);
        v.scroll(&t, -1);
        v.layout(&t, &sels, &NoHighlight);
        assert_eq!(v.lines()[0].lineno, 2);
        v.scroll_to(&t, t.size());
        v.layout(&t, &sels, &NoHighlight);
        assert_eq!(v.lines()[0].lineno, 5);
    }

    #[test]
    fn ensure_visible_scrolls_down_minimally() {
        let t = text_of("1\n2\n3\n4\n5\n6\n");
        let mut v = View::new(10, 3);
        let sels = SelectionSet::new(0);
        v.layout(&t, &sels, &NoHighlight);
        // Line 5 starts at byte 8.
        v.ensure_visible(&t, 8);
        v.layout(&t, &sels, &NoHighlight);
        assert_eq!(v.lines()[0].lineno, 3);
        assert_eq!(v.lines().last().unwrap().lineno, 5);
    }

    #[test]
    fn empty_buffer_still_renders_a_cursor_cell() {
        let t = Text::new();
        let mut v = View::new(10, 2);
        let sels = SelectionSet::new(0);
        let lines = v.layout(&t, &sels, &NoHighlight);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].cells.len(), 1);
        assert!(lines[0].cells[0].flags.contains(CellFlags::CURSOR));
    }

    struct MarkFirstByte;

    impl Styler for MarkFirstByte {
        fn style_range(&self, _text: &Text, range: ByteRange) -> Vec<(ByteRange, StyleId)> {
            vec![(ByteRange::new(range.start, range.start + 1), 7)]
        }
    }

    #[test]
    fn styler_runs_land_on_cells() {
        let t = text_of("ab\ncd\n");
        let mut v = View::new(10, 3);
        let sels = SelectionSet::new(0);
        v.layout(&t, &sels, &MarkFirstByte);
        assert_eq!(v.lines()[0].cells[0].style, 7);
        assert_eq!(v.lines()[0].cells[1].style, 0);
        assert_eq!(v.lines()[1].cells[0].style, 7);
    }
}
