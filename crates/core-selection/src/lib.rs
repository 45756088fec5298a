//! Multi-selection engine.
//!
//! A view owns an ordered list of directed selections. Either end of a
//! selection may lead: `anchor` is where it was opened, `cursor` is the end
//! that moves. After every buffer edit the set is re-shifted, re-sorted and
//! overlaps are merged, so consumers can rely on the set being sorted and
//! pairwise disjoint between edits.

use core_text::ByteRange;

pub mod jumps;

/// Whether a selection covers characters or whole lines when handed to an
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    Charwise,
    Linewise,
}

/// Directed byte range. `anchor == cursor` is a bare cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub cursor: usize,
    pub kind: SelectionKind,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            cursor: pos,
            kind: SelectionKind::Charwise,
        }
    }

    pub fn from_range(range: ByteRange) -> Self {
        Self {
            anchor: range.start,
            cursor: range.end,
            kind: SelectionKind::Charwise,
        }
    }

    /// Undirected extent.
    pub fn range(&self) -> ByteRange {
        ByteRange::new(
            self.anchor.min(self.cursor),
            self.anchor.max(self.cursor),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.cursor
    }

    /// Move the cursor end, leaving the anchor in place.
    pub fn extend(&mut self, pos: usize) {
        self.cursor = pos;
    }

    /// Replace the extent, anchor at the start.
    pub fn set(&mut self, range: ByteRange) {
        self.anchor = range.start;
        self.cursor = range.end;
    }
}

/// Canonical shift of a single bound for an edit at `pos` replacing
/// `old_len` bytes with `new_len`. Bounds inside the replaced span collapse
/// to its start, or to its new end when `to_end` is set (the cursor of the
/// selection that owns the edit).
pub fn shift_bound(bound: usize, pos: usize, old_len: usize, new_len: usize, to_end: bool) -> usize {
    if bound < pos {
        bound
    } else if bound >= pos + old_len {
        bound - old_len + new_len
    } else if to_end {
        pos + new_len
    } else {
        pos
    }
}

/// Ordered, disjoint selection list with one primary member.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    sels: Vec<Selection>,
    primary: usize,
}

impl SelectionSet {
    pub fn new(pos: usize) -> Self {
        Self {
            sels: vec![Selection::caret(pos)],
            primary: 0,
        }
    }

    /// Build a set from undirected ranges; the last one becomes primary.
    /// Ranges are sorted and merged; an empty input collapses to a caret at
    /// zero so a set is never empty.
    pub fn from_ranges(ranges: impl IntoIterator<Item = ByteRange>) -> Self {
        let sels: Vec<Selection> = ranges.into_iter().map(Selection::from_range).collect();
        if sels.is_empty() {
            return Self::new(0);
        }
        let primary = sels.len() - 1;
        let mut set = Self { sels, primary };
        set.normalize();
        set
    }

    pub fn len(&self) -> usize {
        self.sels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.sels.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Selection> {
        self.sels.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut Selection> {
        self.sels.get_mut(i)
    }

    pub fn primary(&self) -> &Selection {
        &self.sels[self.primary]
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn set_primary(&mut self, i: usize) {
        if i < self.sels.len() {
            self.primary = i;
        }
    }

    /// Add a selection; returns its index after normalization.
    pub fn add(&mut self, sel: Selection) -> usize {
        self.sels.push(sel);
        self.primary = self.sels.len() - 1;
        self.normalize();
        self.primary
    }

    /// Drop everything but the primary selection.
    pub fn clear_all(&mut self) {
        let keep = self.sels[self.primary];
        self.sels.clear();
        self.sels.push(keep);
        self.primary = 0;
    }

    /// Remove the selection at `i` (the set never becomes empty; removing
    /// the last member leaves a caret at its cursor).
    pub fn remove(&mut self, i: usize) {
        if i >= self.sels.len() {
            return;
        }
        if self.sels.len() == 1 {
            let pos = self.sels[0].cursor;
            self.sels[0] = Selection::caret(pos);
            return;
        }
        self.sels.remove(i);
        if self.primary >= self.sels.len() {
            self.primary = self.sels.len() - 1;
        }
    }

    /// Replace the whole set with undirected ranges.
    pub fn set_ranges(&mut self, ranges: impl IntoIterator<Item = ByteRange>) {
        *self = Self::from_ranges(ranges);
    }

    /// Canonical order: ascending by range start.
    pub fn sort(&mut self) {
        let primary = self.sels[self.primary];
        self.sels
            .sort_by_key(|s| (s.range().start, s.range().end));
        self.primary = self
            .sels
            .iter()
            .position(|s| *s == primary)
            .unwrap_or(self.sels.len() - 1);
    }

    /// Coalesce overlapping selections, keeping the earliest anchor and the
    /// latest cursor of each overlapping run. Requires sorted input; `sort`
    /// + `merge_overlaps` together form `normalize`.
    pub fn merge_overlaps(&mut self) {
        if self.sels.len() < 2 {
            return;
        }
        let primary = self.sels[self.primary];
        let mut merged: Vec<Selection> = Vec::with_capacity(self.sels.len());
        for sel in self.sels.drain(..) {
            match merged.last_mut() {
                Some(last) if overlaps(last, &sel) => {
                    let anchor = last.anchor.min(sel.anchor);
                    let cursor = last.cursor.max(sel.cursor);
                    last.anchor = anchor;
                    last.cursor = cursor;
                }
                _ => merged.push(sel),
            }
        }
        self.sels = merged;
        self.primary = self
            .sels
            .iter()
            .position(|s| s.range().contains(primary.range().start) || *s == primary)
            .unwrap_or(self.sels.len() - 1);
    }

    pub fn normalize(&mut self) {
        self.sort();
        self.merge_overlaps();
    }

    /// React to a buffer edit replacing `[pos, pos+old_len)` with `new_len`
    /// bytes. `owner` names the selection whose cursor tracks the new end of
    /// the edit (the one the edit was performed for).
    pub fn apply_edit(&mut self, pos: usize, old_len: usize, new_len: usize, owner: Option<usize>) {
        for (i, sel) in self.sels.iter_mut().enumerate() {
            let owns = owner == Some(i);
            sel.anchor = shift_bound(sel.anchor, pos, old_len, new_len, false);
            sel.cursor = shift_bound(sel.cursor, pos, old_len, new_len, owns);
        }
        self.normalize();
    }

    /// Clamp every bound into `[0, max]` (used after load/undo jumps).
    pub fn clamp(&mut self, max: usize) {
        for sel in &mut self.sels {
            sel.anchor = sel.anchor.min(max);
            sel.cursor = sel.cursor.min(max);
        }
        self.normalize();
    }
}

fn overlaps(a: &Selection, b: &Selection) -> bool {
    let (ra, rb) = (a.range(), b.range());
    debug_assert!(ra.start <= rb.start, "merge requires sorted input");
    rb.start < ra.end || rb.start == ra.start
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranges(set: &SelectionSet) -> Vec<(usize, usize)> {
        set.iter().map(|s| (s.range().start, s.range().end)).collect()
    }

    #[test]
    fn sorted_and_disjoint_after_add() {
        let mut set = SelectionSet::new(10);
        set.add(Selection::from_range(ByteRange::new(0, 4)));
        set.add(Selection::from_range(ByteRange::new(2, 6)));
        assert_eq!(ranges(&set), vec![(0, 6), (10, 10)]);
    }

    #[test]
    fn duplicate_carets_merge() {
        let mut set = SelectionSet::new(3);
        set.add(Selection::caret(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn adjacent_selections_stay_separate() {
        let mut set = SelectionSet::from_ranges([ByteRange::new(0, 2), ByteRange::new(2, 4)]);
        set.normalize();
        assert_eq!(ranges(&set), vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn clear_all_keeps_primary() {
        let mut set = SelectionSet::from_ranges([
            ByteRange::new(0, 1),
            ByteRange::new(5, 6),
            ByteRange::new(9, 12),
        ]);
        set.set_primary(1);
        set.clear_all();
        assert_eq!(ranges(&set), vec![(5, 6)]);
    }

    #[test]
    fn edit_shifts_following_selections() {
        let mut set = SelectionSet::from_ranges([ByteRange::new(2, 4), ByteRange::new(10, 12)]);
        // Replace [0,1) with 3 bytes: everything shifts right by 2.
        set.apply_edit(0, 1, 3, None);
        assert_eq!(ranges(&set), vec![(4, 6), (12, 14)]);
    }

    #[test]
    fn edit_inside_collapses_non_owner() {
        let mut set = SelectionSet::from_ranges([ByteRange::new(2, 8)]);
        set.apply_edit(3, 4, 1, None);
        // Anchor at 2 is untouched, cursor at 8 shifts by -3.
        assert_eq!(ranges(&set), vec![(2, 5)]);
        let mut inside = SelectionSet::from_ranges([ByteRange::new(4, 6)]);
        inside.apply_edit(3, 5, 0, None);
        assert_eq!(ranges(&inside), vec![(3, 3)]);
    }

    #[test]
    fn owner_cursor_tracks_replacement_end() {
        let mut set = SelectionSet::from_ranges([ByteRange::new(4, 6)]);
        set.apply_edit(4, 2, 5, Some(0));
        assert_eq!(ranges(&set), vec![(4, 9)]);
    }

    proptest! {
        #[test]
        fn shift_matches_componentwise_rule(
            bound in 0usize..64,
            pos in 0usize..64,
            old_len in 0usize..16,
            new_len in 0usize..16,
        ) {
            let shifted = shift_bound(bound, pos, old_len, new_len, false);
            if bound < pos {
                prop_assert_eq!(shifted, bound);
            } else if bound >= pos + old_len {
                prop_assert_eq!(shifted, bound - old_len + new_len);
            } else {
                prop_assert_eq!(shifted, pos);
            }
        }

        #[test]
        fn set_stays_sorted_and_disjoint_under_edits(
            starts in proptest::collection::vec((0usize..100, 0usize..10), 1..6),
            edits in proptest::collection::vec((0usize..100, 0usize..8, 0usize..8), 0..8),
        ) {
            let mut set = SelectionSet::from_ranges(
                starts.iter().map(|(s, l)| ByteRange::new(*s, s + l)),
            );
            for (pos, old_len, new_len) in edits {
                set.apply_edit(pos, old_len, new_len, None);
                let rs = ranges(&set);
                for pair in rs.windows(2) {
                    prop_assert!(pair[0].1 <= pair[1].0, "overlap after edit: {:?}", rs);
                    prop_assert!(pair[0].0 < pair[1].0, "unsorted after edit: {:?}", rs);
                }
            }
        }
    }
}
