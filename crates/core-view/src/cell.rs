//! Screen cells and lines.

use bitflags::bitflags;

/// Style identifier handed out by a styler; 0 is the default style.
pub type StyleId = u16;

bitflags! {
    /// Per-cell overlay bits, applied on top of the syntax style.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// A selection cursor sits on this cell.
        const CURSOR = 1 << 0;
        /// The cell is inside a selection.
        const SELECTED = 1 << 1;
        /// Second column of a wide grapheme; carries no bytes of its own.
        const CONTINUATION = 1 << 2;
        /// Clip marker of a truncated line.
        const TRUNCATED = 1 << 3;
    }
}

/// One terminal cell: up to four UTF-8 bytes of a grapheme cluster, its
/// column width, the byte offset it began at, and styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    bytes: [u8; 4],
    len: u8,
    pub width: u8,
    /// Source byte offset the cell began at.
    pub offset: usize,
    pub style: StyleId,
    pub flags: CellFlags,
}

impl Cell {
    pub fn new(grapheme: &str, width: u8, offset: usize) -> Self {
        // Clusters longer than four bytes keep their leading scalar; trailing
        // combining bytes beyond the cell capacity are display-only loss.
        let mut bytes = [0u8; 4];
        let take = grapheme
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|end| *end <= 4)
            .last()
            .unwrap_or(0);
        bytes[..take].copy_from_slice(&grapheme.as_bytes()[..take]);
        Self {
            bytes,
            len: take as u8,
            width,
            offset,
            style: 0,
            flags: CellFlags::empty(),
        }
    }

    /// Placeholder occupying the second column of a wide cluster.
    pub fn continuation(offset: usize) -> Self {
        let mut cell = Cell::new("", 0, offset);
        cell.flags = CellFlags::CONTINUATION;
        cell
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.len == 0
    }
}

/// One screen row: the source line number it belongs to, its cells, and the
/// column the line's content ended at (where the terminator would render).
#[derive(Debug, Clone)]
pub struct Line {
    pub lineno: usize,
    pub cells: Vec<Cell>,
    pub end_col: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_cell_round_trips() {
        let c = Cell::new("a", 1, 10);
        assert_eq!(c.as_str(), "a");
        assert_eq!(c.width, 1);
        assert_eq!(c.offset, 10);
    }

    #[test]
    fn multibyte_cluster_fits() {
        let c = Cell::new("é", 1, 0);
        assert_eq!(c.as_str(), "é");
    }

    #[test]
    fn oversized_cluster_keeps_leading_scalar() {
        // Family emoji is far larger than four bytes; the cell keeps the
        // first scalar only.
        let c = Cell::new("👨\u{200d}👩\u{200d}👧", 2, 0);
        assert_eq!(c.as_str(), "👨");
    }

    #[test]
    fn continuation_is_blank() {
        let c = Cell::continuation(4);
        assert!(c.is_blank());
        assert!(c.flags.contains(CellFlags::CONTINUATION));
    }
}
