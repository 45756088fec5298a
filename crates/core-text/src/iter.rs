//! Zero-copy byte streams over the piece chain.
//!
//! Consumers that scan (regex search, line counting, file writers) get the
//! buffer as a sequence of piece-sized `&[u8]` slices instead of one large
//! copy.

use crate::piece::{HEAD, PieceId, TAIL};
use crate::text::Text;

/// Forward chunk stream starting at an arbitrary position.
pub struct Chunks<'a> {
    text: &'a Text,
    piece: PieceId,
    off: usize,
}

impl<'a> Chunks<'a> {
    pub(crate) fn new(text: &'a Text, piece: PieceId, off: usize) -> Self {
        Self { text, piece, off }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.piece == TAIL {
            return None;
        }
        let p = self.text.pieces.get(self.piece);
        let slice = self.text.blocks[p.block.idx()].slice(p.off + self.off, p.len - self.off);
        self.piece = p.next;
        self.off = 0;
        Some(slice)
    }
}

/// Backward chunk stream; slices end just before the start position and walk
/// toward offset zero.
pub struct ChunksBack<'a> {
    text: &'a Text,
    /// Piece whose prefix is yielded next; HEAD once exhausted.
    piece: PieceId,
    /// Length of the prefix of `piece` still to yield.
    take: usize,
}

impl<'a> ChunksBack<'a> {
    pub(crate) fn new(text: &'a Text, piece: PieceId, off: usize) -> Self {
        if off > 0 {
            Self {
                text,
                piece,
                take: off,
            }
        } else {
            // Start position sits on a boundary; begin with the previous
            // piece in full.
            let prev = text.pieces.get(piece).prev;
            let take = if prev == HEAD {
                0
            } else {
                text.pieces.get(prev).len
            };
            Self {
                text,
                piece: prev,
                take,
            }
        }
    }
}

impl<'a> Iterator for ChunksBack<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.piece == HEAD {
            return None;
        }
        let p = self.text.pieces.get(self.piece);
        let slice = self.text.blocks[p.block.idx()].slice(p.off, self.take);
        let prev = p.prev;
        self.take = if prev == HEAD {
            0
        } else {
            self.text.pieces.get(prev).len
        };
        self.piece = prev;
        Some(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragmented() -> Text {
        // Snapshots between inserts defeat coalescing, producing one piece
        // per insert.
        let mut t = Text::new();
        for part in ["ab", "cde", "f"] {
            let at = t.size();
            t.insert(at, part.as_bytes()).unwrap();
            t.snapshot();
        }
        t
    }

    #[test]
    fn forward_chunks_cover_the_tail() {
        let t = fragmented();
        let got: Vec<u8> = t.chunks(1).flat_map(|c| c.to_vec()).collect();
        assert_eq!(got, b"bcdef");
    }

    #[test]
    fn forward_chunks_at_end_are_empty() {
        let t = fragmented();
        assert_eq!(t.chunks(t.size()).count(), 0);
    }

    #[test]
    fn backward_chunks_cover_the_prefix() {
        let t = fragmented();
        let mut got = Vec::new();
        for c in t.chunks_back(4) {
            let mut chunk = c.to_vec();
            chunk.extend(got);
            got = chunk;
        }
        assert_eq!(got, b"abcd");
    }

    #[test]
    fn backward_chunks_at_start_are_empty() {
        let t = fragmented();
        assert_eq!(t.chunks_back(0).count(), 0);
    }
}
