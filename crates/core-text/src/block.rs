//! Byte storage blocks.
//!
//! A block is a contiguous byte region pieces point into. Mapped blocks come
//! from `mmap(2)` and are immutable; arena blocks grow by appending only.
//! Existing bytes are never rewritten, so a `(block, offset, length)` span
//! stays valid for the lifetime of the buffer.

use memmap2::Mmap;

/// Index into the buffer's block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub(crate) const INVALID: BlockId = BlockId(u32::MAX);

    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

pub(crate) enum Block {
    /// Read-only mapping of a source file.
    Mapped(Mmap),
    /// Growable in-memory arena; insertions append here.
    Arena(Vec<u8>),
}

impl Block {
    pub(crate) fn len(&self) -> usize {
        match self {
            Block::Mapped(m) => m.len(),
            Block::Arena(v) => v.len(),
        }
    }

    pub(crate) fn slice(&self, off: usize, len: usize) -> &[u8] {
        match self {
            Block::Mapped(m) => &m[off..off + len],
            Block::Arena(v) => &v[off..off + len],
        }
    }

    /// Append bytes, returning the offset they landed at. Only valid for
    /// arena blocks; mapped blocks are immutable by construction.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> usize {
        match self {
            Block::Arena(v) => {
                let off = v.len();
                v.extend_from_slice(bytes);
                off
            }
            Block::Mapped(_) => unreachable!("append into a mapped block"),
        }
    }
}
