//! Named marks.
//!
//! A mark names a byte offset that tracks edits: an insertion at or before it
//! shifts it right, a deletion spanning it collapses it to the deletion
//! start, and a replacement covering it sticks to the replacement start.
//! Undo and redo route through the same adjustment with the spans swapped,
//! so marks survive history navigation.

const MARK_COUNT: usize = 26;

#[derive(Debug, Clone, Default)]
pub struct MarkSet {
    slots: [Option<usize>; MARK_COUNT],
}

fn slot(name: char) -> Option<usize> {
    name.is_ascii_lowercase()
        .then(|| (name as u8 - b'a') as usize)
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set mark `name` (`'a'..='z'`) to `pos`. Returns false for any other
    /// name.
    pub fn set(&mut self, name: char, pos: usize) -> bool {
        match slot(name) {
            Some(i) => {
                self.slots[i] = Some(pos);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: char) -> Option<usize> {
        slot(name).and_then(|i| self.slots[i])
    }

    pub fn clear(&mut self, name: char) {
        if let Some(i) = slot(name) {
            self.slots[i] = None;
        }
    }

    /// Shift all marks for an edit at `pos` replacing `old_len` bytes with
    /// `new_len` bytes.
    pub fn adjust(&mut self, pos: usize, old_len: usize, new_len: usize) {
        for m in self.slots.iter_mut().flatten() {
            *m = shift(*m, pos, old_len, new_len);
        }
    }

    /// Non-empty marks as `(name, offset)` pairs, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (char, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.map(|pos| ((b'a' + i as u8) as char, pos)))
    }
}

/// Canonical single-offset shift for an edit `(pos, old_len, new_len)`.
pub fn shift(mark: usize, pos: usize, old_len: usize, new_len: usize) -> usize {
    if mark < pos {
        mark
    } else if mark >= pos + old_len {
        mark - old_len + new_len
    } else {
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_shifts_right() {
        let mut marks = MarkSet::new();
        marks.set('a', 5);
        marks.adjust(2, 0, 3);
        assert_eq!(marks.get('a'), Some(8));
    }

    #[test]
    fn insert_at_mark_shifts_with_content() {
        let mut marks = MarkSet::new();
        marks.set('a', 5);
        marks.adjust(5, 0, 3);
        assert_eq!(marks.get('a'), Some(8));
    }

    #[test]
    fn spanning_delete_collapses() {
        let mut marks = MarkSet::new();
        marks.set('m', 6);
        marks.adjust(4, 5, 0);
        assert_eq!(marks.get('m'), Some(4));
    }

    #[test]
    fn edit_round_trip_restores_mark() {
        // An edit followed by its inverse (how undo routes through adjust)
        // must land the mark where it started.
        let mut marks = MarkSet::new();
        marks.set('q', 10);
        marks.adjust(3, 2, 7);
        marks.adjust(3, 7, 2);
        assert_eq!(marks.get('q'), Some(10));
    }

    #[test]
    fn rejects_non_lowercase_names() {
        let mut marks = MarkSet::new();
        assert!(!marks.set('A', 0));
        assert!(!marks.set('1', 0));
        assert_eq!(marks.get('A'), None);
    }
}
