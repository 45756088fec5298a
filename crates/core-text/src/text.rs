//! The buffer itself: splice-based editing over the piece chain plus the
//! public undo/redo, mark, and read surfaces.

use crate::block::{Block, BlockId};
use crate::history::{ActionId, Change, History};
use crate::iter::{Chunks, ChunksBack};
use crate::mark::MarkSet;
use crate::piece::{self, HEAD, Piece, PieceId, Pieces, Span, TAIL};
use crate::{ByteRange, Result, TextError};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Remembers the piece produced by the latest insertion so a follow-up
/// insertion that continues at the same text position and the arena tail can
/// grow it in place. Invalidated by `snapshot()`, deletions, undo and redo.
#[derive(Debug, Clone, Copy)]
struct EditCache {
    piece: PieceId,
    /// Text position just past the cached piece.
    end: usize,
}

pub struct Text {
    pub(crate) blocks: Vec<Block>,
    pub(crate) pieces: Pieces,
    /// The arena block new insertions append to.
    add: BlockId,
    size: usize,
    history: History,
    marks: MarkSet,
    cache: Option<EditCache>,
    /// History node at the last successful save; None = original state.
    saved_node: Option<ActionId>,
    pub(crate) mapped_path: Option<PathBuf>,
}

impl Default for Text {
    fn default() -> Self {
        Self::new()
    }
}

impl Text {
    /// Empty buffer backed only by a fresh arena block.
    pub fn new() -> Self {
        Self::with_content(None, None)
    }

    pub(crate) fn with_content(initial: Option<Block>, mapped_path: Option<PathBuf>) -> Self {
        let mut blocks = Vec::new();
        let mut pieces = Pieces::new();
        let mut size = 0;
        if let Some(block) = initial {
            let len = block.len();
            if len > 0 {
                let id = BlockId(0);
                blocks.push(block);
                let p = pieces.alloc(Piece {
                    prev: HEAD,
                    next: TAIL,
                    block: id,
                    off: 0,
                    len,
                });
                pieces.link(HEAD, p);
                pieces.link(p, TAIL);
                size = len;
            }
        }
        let add = BlockId(blocks.len() as u32);
        blocks.push(Block::Arena(Vec::new()));
        Self {
            blocks,
            pieces,
            add,
            size,
            history: History::new(),
            marks: MarkSet::new(),
            cache: None,
            saved_node: None,
            mapped_path,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True when the buffer differs from the state recorded at the last
    /// successful save (or from the loaded state if never saved).
    pub fn modified(&self) -> bool {
        self.history.has_pending() || self.history.current() != self.saved_node
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved_node = self.history.current();
    }

    // ---------------- reads ----------------

    /// Locate the piece containing `pos` and the offset within it. A boundary
    /// position resolves to the start of the following piece; `pos == size`
    /// resolves to the tail sentinel.
    pub(crate) fn locate(&self, pos: usize) -> (PieceId, usize) {
        let mut at = 0usize;
        let mut id = self.pieces.get(HEAD).next;
        while id != TAIL {
            let len = self.pieces.get(id).len;
            if pos < at + len {
                return (id, pos - at);
            }
            at += len;
            id = self.pieces.get(id).next;
        }
        (TAIL, 0)
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        if pos >= self.size {
            return None;
        }
        let (id, off) = self.locate(pos);
        let p = self.pieces.get(id);
        Some(self.blocks[p.block.idx()].slice(p.off + off, 1)[0])
    }

    /// Copy `dst.len()` bytes starting at `pos` into `dst`.
    pub fn bytes_copy(&self, pos: usize, dst: &mut [u8]) -> Result<()> {
        let end = pos
            .checked_add(dst.len())
            .ok_or(TextError::OutOfRange)?;
        if end > self.size {
            return Err(TextError::OutOfRange);
        }
        let mut written = 0;
        for chunk in self.chunks(pos) {
            if written == dst.len() {
                break;
            }
            let take = chunk.len().min(dst.len() - written);
            dst[written..written + take].copy_from_slice(&chunk[..take]);
            written += take;
        }
        debug_assert_eq!(written, dst.len());
        Ok(())
    }

    /// Owned copy of a range.
    pub fn content(&self, range: ByteRange) -> Result<Vec<u8>> {
        if range.end > self.size {
            return Err(TextError::OutOfRange);
        }
        let mut out = vec![0u8; range.len()];
        self.bytes_copy(range.start, &mut out)?;
        Ok(out)
    }

    /// Owned copy of the whole buffer.
    pub fn bytes(&self) -> Vec<u8> {
        self.content(ByteRange::new(0, self.size))
            .expect("full range is always valid")
    }

    /// Forward byte stream in piece-sized slices starting at `pos`.
    pub fn chunks(&self, pos: usize) -> Chunks<'_> {
        let pos = pos.min(self.size);
        let (piece, off) = self.locate(pos);
        Chunks::new(self, piece, off)
    }

    /// Backward byte stream; slices end just before `pos` and walk toward the
    /// start of the buffer.
    pub fn chunks_back(&self, pos: usize) -> ChunksBack<'_> {
        let pos = pos.min(self.size);
        let (piece, off) = self.locate(pos);
        ChunksBack::new(self, piece, off)
    }

    // ---------------- line arithmetic ----------------

    /// Number of lines. A trailing newline does not open a new line; an empty
    /// buffer has zero lines.
    pub fn lines(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        let mut nl = 0usize;
        for chunk in self.chunks(0) {
            nl += chunk.iter().filter(|b| **b == b'\n').count();
        }
        if self.byte_at(self.size - 1) == Some(b'\n') {
            nl
        } else {
            nl + 1
        }
    }

    /// Byte range of 1-based line `lineno`, newline included. Line 0 is the
    /// empty range before the first line.
    pub fn line_range(&self, lineno: usize) -> Result<ByteRange> {
        if lineno == 0 {
            return Ok(ByteRange::at(0));
        }
        let start = self.line_start(lineno)?;
        Ok(ByteRange::new(start, self.line_next(start)))
    }

    /// Start offset of 1-based line `lineno`.
    pub fn line_start(&self, lineno: usize) -> Result<usize> {
        if lineno == 0 {
            return Ok(0);
        }
        if lineno == 1 {
            return Ok(0);
        }
        let mut seen = 1usize;
        let mut pos = 0usize;
        for chunk in self.chunks(0) {
            for (i, b) in chunk.iter().enumerate() {
                if *b == b'\n' {
                    seen += 1;
                    if seen == lineno {
                        let start = pos + i + 1;
                        return if start < self.size {
                            Ok(start)
                        } else {
                            Err(TextError::OutOfRange)
                        };
                    }
                }
            }
            pos += chunk.len();
        }
        Err(TextError::OutOfRange)
    }

    /// 1-based line containing `pos` (`pos == size` counts into the last
    /// line's successor only when the buffer ends in a newline).
    pub fn byte_to_line(&self, pos: usize) -> usize {
        let pos = pos.min(self.size);
        let mut nl = 0usize;
        let mut seen = 0usize;
        for chunk in self.chunks(0) {
            let take = chunk.len().min(pos - seen);
            nl += chunk[..take].iter().filter(|b| **b == b'\n').count();
            seen += take;
            if seen == pos {
                break;
            }
        }
        nl + 1
    }

    /// Start offset of the line containing `pos`.
    pub fn line_begin(&self, pos: usize) -> usize {
        let pos = pos.min(self.size);
        let mut at = pos;
        for chunk in self.chunks_back(pos) {
            if let Some(i) = chunk.iter().rposition(|b| *b == b'\n') {
                return at - (chunk.len() - 1 - i);
            }
            at -= chunk.len();
        }
        0
    }

    /// Offset just past the newline terminating the line containing `pos`
    /// (or `size` for an unterminated final line).
    pub fn line_next(&self, pos: usize) -> usize {
        let pos = pos.min(self.size);
        let mut at = pos;
        for chunk in self.chunks(pos) {
            if let Some(i) = chunk.iter().position(|b| *b == b'\n') {
                return at + i + 1;
            }
            at += chunk.len();
        }
        self.size
    }

    // ---------------- edits ----------------

    /// Insert `data` at `pos`. Contiguous insertions between two snapshots
    /// coalesce into a single piece and a single recorded change.
    pub fn insert(&mut self, pos: usize, data: &[u8]) -> Result<()> {
        if pos > self.size {
            return Err(TextError::OutOfRange);
        }
        if data.is_empty() {
            return Ok(());
        }
        if self.try_coalesce(pos, data) {
            return Ok(());
        }
        self.splice(pos, 0, data)
    }

    /// Delete `len` bytes starting at `pos`.
    pub fn delete(&mut self, pos: usize, len: usize) -> Result<()> {
        self.splice(pos, len, &[])
    }

    /// Replace `len` bytes at `pos` with `data` as one change.
    pub fn replace(&mut self, pos: usize, len: usize, data: &[u8]) -> Result<()> {
        self.splice(pos, len, data)
    }

    fn try_coalesce(&mut self, pos: usize, data: &[u8]) -> bool {
        let Some(cache) = self.cache else {
            return false;
        };
        if cache.end != pos || !self.history.has_pending() {
            return false;
        }
        let p = *self.pieces.get(cache.piece);
        if p.block != self.add || p.off + p.len != self.blocks[self.add.idx()].len() {
            return false;
        }
        let continues = self
            .history
            .last_pending_mut()
            .is_some_and(|c| c.ins.last == cache.piece);
        if !continues {
            return false;
        }
        let n = data.len();
        self.blocks[self.add.idx()].append(data);
        self.pieces.get_mut(cache.piece).len += n;
        if let Some(c) = self.history.last_pending_mut() {
            c.ins.len += n;
            c.new_len += n;
        }
        self.size += n;
        self.marks.adjust(pos, 0, n);
        self.cache = Some(EditCache {
            piece: cache.piece,
            end: pos + n,
        });
        true
    }

    fn splice(&mut self, pos: usize, del_len: usize, data: &[u8]) -> Result<()> {
        let end = pos.checked_add(del_len).ok_or(TextError::OutOfRange)?;
        if end > self.size {
            return Err(TextError::OutOfRange);
        }
        if del_len == 0 && data.is_empty() {
            return Ok(());
        }
        self.cache = None;

        // Bytes land in the arena before the chain is touched, so a failure
        // up to this point leaves the buffer untouched.
        let ins_off = if data.is_empty() {
            0
        } else {
            self.blocks[self.add.idx()].append(data)
        };

        let (pstart, off_s) = self.locate(pos);
        let (pend, off_e) = self.locate(end);

        // Excised span: every piece the edit touches, split halves included.
        let old = if del_len == 0 && off_s == 0 {
            Span::EMPTY
        } else {
            let first = pstart;
            let last = if off_e > 0 {
                pend
            } else {
                self.pieces.get(pend).prev
            };
            let mut len = 0;
            let mut id = first;
            loop {
                len += self.pieces.get(id).len;
                if id == last {
                    break;
                }
                id = self.pieces.get(id).next;
            }
            Span { first, last, len }
        };

        let (anchor_prev, anchor_next) = if old.is_empty() {
            (self.pieces.get(pstart).prev, pstart)
        } else {
            (
                self.pieces.get(old.first).prev,
                self.pieces.get(old.last).next,
            )
        };

        // Surviving prefix, inserted bytes, surviving suffix.
        let mut parts: [Option<(BlockId, usize, usize)>; 3] = [None, None, None];
        if off_s > 0 {
            let p = self.pieces.get(pstart);
            parts[0] = Some((p.block, p.off, off_s));
        }
        let mut ins_piece = PieceId::INVALID;
        if !data.is_empty() {
            parts[1] = Some((self.add, ins_off, data.len()));
        }
        if off_e > 0 {
            let p = self.pieces.get(pend);
            parts[2] = Some((p.block, p.off + off_e, p.len - off_e));
        }

        let mut new = Span::EMPTY;
        let mut prev = anchor_prev;
        for (slot, part) in parts.iter().enumerate() {
            let Some((block, off, len)) = *part else {
                continue;
            };
            let id = self.pieces.alloc(Piece {
                prev,
                next: anchor_next,
                block,
                off,
                len,
            });
            if slot == 1 {
                ins_piece = id;
            }
            if new.is_empty() {
                new.first = id;
            } else {
                self.pieces.get_mut(prev).next = id;
            }
            new.last = id;
            new.len += len;
            prev = id;
        }

        piece::swap(&mut self.pieces, &old, &new);
        self.size = self.size - del_len + data.len();
        self.marks.adjust(pos, del_len, data.len());
        self.history.record(Change {
            pos,
            old_len: del_len,
            new_len: data.len(),
            del: old,
            ins: new,
        });
        if ins_piece != PieceId::INVALID {
            self.cache = Some(EditCache {
                piece: ins_piece,
                end: pos + data.len(),
            });
        }
        trace!(target: "text.edit", pos, del = del_len, ins = data.len(), size = self.size, "splice");
        Ok(())
    }

    // ---------------- history ----------------

    /// Seal the current action; the next edit starts a new undo step.
    pub fn snapshot(&mut self) {
        self.cache = None;
        self.history.seal();
    }

    fn revert_action(&mut self, a: ActionId) {
        self.cache = None;
        for i in (0..self.history.change_count(a)).rev() {
            let ch = self.history.change(a, i);
            piece::swap(&mut self.pieces, &ch.ins, &ch.del);
            self.size = self.size + ch.old_len - ch.new_len;
            self.marks.adjust(ch.pos, ch.new_len, ch.old_len);
        }
    }

    fn apply_action(&mut self, a: ActionId) {
        self.cache = None;
        for i in 0..self.history.change_count(a) {
            let ch = self.history.change(a, i);
            piece::swap(&mut self.pieces, &ch.del, &ch.ins);
            self.size = self.size - ch.old_len + ch.new_len;
            self.marks.adjust(ch.pos, ch.old_len, ch.new_len);
        }
    }

    /// Undo the current action. Returns the cursor position before it was
    /// applied, or None at the original state.
    pub fn undo(&mut self) -> Option<usize> {
        self.snapshot();
        let a = self.history.current()?;
        self.revert_action(a);
        self.history.set_current(self.history.action(a).parent);
        trace!(target: "text.history", seq = self.history.action(a).seq, "undo");
        Some(self.history.action(a).pre)
    }

    /// Redo onto the most recently created child branch. Returns the cursor
    /// position after the action, or None when there is nothing to redo.
    pub fn redo(&mut self) -> Option<usize> {
        self.snapshot();
        let a = self.history.redo_target()?;
        self.apply_action(a);
        self.history.set_current(Some(a));
        trace!(target: "text.history", seq = self.history.action(a).seq, "redo");
        Some(self.history.action(a).post)
    }

    /// Redo onto an explicit sibling branch (`n` indexes the current node's
    /// children oldest-first).
    pub fn redo_sibling(&mut self, n: usize) -> Option<usize> {
        self.snapshot();
        let a = self.history.redo_candidates().get(n).copied()?;
        self.apply_action(a);
        self.history.set_current(Some(a));
        Some(self.history.action(a).post)
    }

    /// Jump to the state sealed as sequence number `seq` (0 = the original
    /// state): undo up to the common ancestor, then redo down the target's
    /// branch. Returns the resulting cursor hint.
    pub fn jump_to(&mut self, seq: u64) -> Option<usize> {
        self.snapshot();
        let target = if seq == 0 {
            None
        } else {
            Some(self.history.find_seq(seq)?)
        };
        let path = match target {
            Some(t) => self.history.path_from_root(t),
            None => Vec::new(),
        };
        loop {
            match self.history.current() {
                None => break,
                Some(cur) if path.contains(&cur) => break,
                Some(cur) => {
                    self.revert_action(cur);
                    self.history.set_current(self.history.action(cur).parent);
                }
            }
        }
        let start = match self.history.current() {
            None => 0,
            Some(cur) => path.iter().position(|x| *x == cur).expect("on path") + 1,
        };
        for &a in &path[start..] {
            self.apply_action(a);
            self.history.set_current(Some(a));
        }
        Some(match self.history.current() {
            Some(a) => self.history.action(a).post,
            None => 0,
        })
    }

    /// Step to the action sealed immediately before the current one in
    /// global (time) order, crossing branches if needed.
    pub fn earlier(&mut self) -> Option<usize> {
        self.snapshot();
        let seq = self.history.seq_of(self.history.current());
        if seq == 0 {
            return None;
        }
        self.jump_to(seq - 1)
    }

    /// Step to the action sealed immediately after the current one in global
    /// order.
    pub fn later(&mut self) -> Option<usize> {
        self.snapshot();
        let seq = self.history.seq_of(self.history.current());
        self.jump_to(seq + 1)
    }

    /// Sequence number of the current history node (0 = original state).
    pub fn current_seq(&self) -> u64 {
        self.history.seq_of(self.history.current())
    }

    /// Number of sealed actions in the whole tree.
    pub fn action_count(&self) -> usize {
        self.history.len()
    }

    /// Sequence numbers of a depth-first walk over the undo tree.
    pub fn history_dfs(&self) -> Vec<u64> {
        self.history
            .dfs()
            .into_iter()
            .map(|id| self.history.action(id).seq)
            .collect()
    }

    // ---------------- marks ----------------

    pub fn mark_set(&mut self, name: char, pos: usize) -> Result<()> {
        if pos > self.size {
            return Err(TextError::OutOfRange);
        }
        if self.marks.set(name, pos) {
            Ok(())
        } else {
            Err(TextError::OutOfRange)
        }
    }

    pub fn mark_get(&self, name: char) -> Option<usize> {
        self.marks.get(name)
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub(crate) fn path_of_mapping(&self) -> Option<&Path> {
        self.mapped_path.as_deref()
    }

    // ---------------- diagnostics ----------------

    /// Walk the live chain verifying the structural invariants. Panics on
    /// corruption; meant for tests and debug builds.
    pub fn check_invariants(&self) {
        let mut sum = 0usize;
        let mut id = self.pieces.get(HEAD).next;
        let mut prev = HEAD;
        while id != TAIL {
            let p = self.pieces.get(id);
            assert!(p.len > 0, "live piece with zero length");
            assert_eq!(p.prev, prev, "broken back link");
            assert!(
                p.off + p.len <= self.blocks[p.block.idx()].len(),
                "piece span outside its block"
            );
            sum += p.len;
            prev = id;
            id = p.next;
        }
        assert_eq!(self.pieces.get(TAIL).prev, prev, "broken tail link");
        assert_eq!(sum, self.size, "piece lengths disagree with size");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &Text) -> String {
        String::from_utf8(text.bytes()).unwrap()
    }

    fn filled(content: &str) -> Text {
        let mut t = Text::new();
        t.insert(0, content.as_bytes()).unwrap();
        t.snapshot();
        t
    }

    #[test]
    fn insert_delete_replace_roundtrip() {
        let mut t = Text::new();
        t.insert(0, b"hello world").unwrap();
        assert_eq!(s(&t), "hello world");
        t.delete(5, 6).unwrap();
        assert_eq!(s(&t), "hello");
        t.replace(0, 5, b"goodbye").unwrap();
        assert_eq!(s(&t), "goodbye");
        t.check_invariants();
    }

    #[test]
    fn out_of_range_edits_leave_state_untouched() {
        let mut t = filled("abc");
        assert!(matches!(
            t.insert(4, b"x"),
            Err(TextError::OutOfRange)
        ));
        assert!(matches!(t.delete(1, 5), Err(TextError::OutOfRange)));
        assert_eq!(s(&t), "abc");
        t.check_invariants();
    }

    #[test]
    fn insert_middle_splits_piece() {
        let mut t = filled("abcdef");
        t.insert(3, b"XY").unwrap();
        assert_eq!(s(&t), "abcXYdef");
        t.check_invariants();
    }

    #[test]
    fn delete_across_pieces() {
        let mut t = Text::new();
        t.insert(0, b"aaa").unwrap();
        t.snapshot();
        t.insert(3, b"bbb").unwrap();
        t.snapshot();
        t.insert(6, b"ccc").unwrap();
        t.snapshot();
        t.delete(1, 7).unwrap();
        assert_eq!(s(&t), "ac");
        t.check_invariants();
    }

    #[test]
    fn coalescing_keeps_one_change_per_run() {
        let mut t = Text::new();
        for (i, b) in b"hello".iter().enumerate() {
            t.insert(i, &[*b]).unwrap();
        }
        t.snapshot();
        assert_eq!(t.action_count(), 1);
        assert_eq!(s(&t), "hello");
        // One undo removes the whole run.
        t.undo();
        assert_eq!(s(&t), "");
    }

    #[test]
    fn coalescing_stops_at_snapshot() {
        let mut t = Text::new();
        t.insert(0, b"ab").unwrap();
        t.snapshot();
        t.insert(2, b"cd").unwrap();
        t.snapshot();
        assert_eq!(t.action_count(), 2);
        t.undo();
        assert_eq!(s(&t), "ab");
    }

    #[test]
    fn typing_then_undo_scenario() {
        let mut t = Text::new();
        for (i, b) in b"hello".iter().enumerate() {
            t.insert(i, &[*b]).unwrap();
        }
        t.snapshot();
        for (i, b) in b" world".iter().enumerate() {
            t.insert(5 + i, &[*b]).unwrap();
        }
        t.snapshot();
        assert_eq!(s(&t), "hello world");
        t.undo();
        assert_eq!(s(&t), "hello");
        t.undo();
        assert_eq!(s(&t), "");
        t.redo();
        assert_eq!(s(&t), "hello");
        t.redo();
        assert_eq!(s(&t), "hello world");
    }

    #[test]
    fn undo_branches_and_navigation() {
        let mut t = Text::new();
        t.insert(0, b"base").unwrap();
        t.snapshot(); // seq 1
        t.insert(4, b"-one").unwrap();
        t.snapshot(); // seq 2
        t.undo();
        assert_eq!(s(&t), "base");
        t.insert(4, b"-two").unwrap();
        t.snapshot(); // seq 3, sibling of seq 2
        assert_eq!(s(&t), "base-two");
        // Default redo after undo picks the newest branch.
        t.undo();
        t.redo();
        assert_eq!(s(&t), "base-two");
        // Explicit sibling selection reaches the older branch.
        t.undo();
        t.redo_sibling(0);
        assert_eq!(s(&t), "base-one");
        // Time navigation crosses branches.
        t.jump_to(3);
        assert_eq!(s(&t), "base-two");
        t.earlier();
        assert_eq!(s(&t), "base-one");
        t.earlier();
        assert_eq!(s(&t), "base");
        t.later();
        assert_eq!(s(&t), "base-one");
        t.check_invariants();
    }

    #[test]
    fn marks_track_edits_and_survive_undo() {
        let mut t = filled("0123456789");
        t.mark_set('a', 6).unwrap();
        t.insert(2, b"xx").unwrap();
        assert_eq!(t.mark_get('a'), Some(8));
        t.snapshot();
        t.delete(0, 4).unwrap();
        assert_eq!(t.mark_get('a'), Some(4));
        t.snapshot();
        t.undo();
        assert_eq!(t.mark_get('a'), Some(8));
        t.undo();
        assert_eq!(t.mark_get('a'), Some(6));
        t.redo();
        assert_eq!(t.mark_get('a'), Some(8));
    }

    #[test]
    fn line_arithmetic() {
        let t = filled("one\ntwo\nthree\n");
        assert_eq!(t.lines(), 3);
        assert_eq!(t.line_range(1).unwrap(), ByteRange::new(0, 4));
        assert_eq!(t.line_range(2).unwrap(), ByteRange::new(4, 8));
        assert_eq!(t.line_range(3).unwrap(), ByteRange::new(8, 14));
        assert!(t.line_range(4).is_err());
        assert_eq!(t.line_range(0).unwrap(), ByteRange::at(0));
        assert_eq!(t.byte_to_line(0), 1);
        assert_eq!(t.byte_to_line(5), 2);
        assert_eq!(t.line_begin(6), 4);
        assert_eq!(t.line_next(4), 8);
    }

    #[test]
    fn line_arithmetic_without_trailing_newline() {
        let t = filled("a\nbb");
        assert_eq!(t.lines(), 2);
        assert_eq!(t.line_range(2).unwrap(), ByteRange::new(2, 4));
        let empty = Text::new();
        assert_eq!(empty.lines(), 0);
        assert_eq!(empty.line_range(0).unwrap(), ByteRange::at(0));
    }

    #[test]
    fn modified_tracks_history_node() {
        let mut t = Text::new();
        assert!(!t.modified());
        t.insert(0, b"x").unwrap();
        assert!(t.modified());
        t.snapshot();
        assert!(t.modified());
        t.mark_saved();
        assert!(!t.modified());
        t.undo();
        assert!(t.modified());
        t.redo();
        assert!(!t.modified());
    }
}
