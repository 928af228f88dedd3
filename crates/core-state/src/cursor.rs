//! Cursor and selection model, single and multi-cursor.
//!
//! A cursor is a (row, column) pair in cell coordinates plus a selection
//! anchor; the selection range is normalized at query time so start <= end.
//! Multi-cursor mode keeps an ordered set with one primary cursor that
//! drives scrolling. Edits apply per cursor in position order, with later
//! cursors remapped by the shifts of earlier edits.

/// Upper bound on simultaneous cursors.
pub const MAX_CURSORS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub anchor_row: usize,
    pub anchor_col: usize,
    pub has_selection: bool,
    /// Column goal preserved across vertical motion.
    pub goal_col: usize,
}

impl Cursor {
    pub fn at(row: usize, col: usize) -> Cursor {
        Cursor {
            row,
            col,
            anchor_row: row,
            anchor_col: col,
            has_selection: false,
            goal_col: col,
        }
    }

    pub fn pos(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn anchor(&self) -> (usize, usize) {
        (self.anchor_row, self.anchor_col)
    }

    /// Normalized selection span `[start, end)`, `None` when empty or
    /// inactive.
    pub fn selection(&self) -> Option<((usize, usize), (usize, usize))> {
        if !self.has_selection || self.pos() == self.anchor() {
            return None;
        }
        let (a, b) = (self.anchor(), self.pos());
        Some(if b < a { (b, a) } else { (a, b) })
    }

    /// Drop the anchor at the current position (before a shifted motion).
    pub fn start_selection(&mut self) {
        if !self.has_selection {
            self.anchor_row = self.row;
            self.anchor_col = self.col;
            self.has_selection = true;
        }
    }

    pub fn clear_selection(&mut self) {
        self.has_selection = false;
        self.anchor_row = self.row;
        self.anchor_col = self.col;
    }

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }
}

/// The cursor set. Index 0 always exists; `primary` drives scrolling.
#[derive(Debug, Clone)]
pub struct Cursors {
    list: Vec<Cursor>,
    primary: usize,
}

impl Default for Cursors {
    fn default() -> Self {
        Cursors::new()
    }
}

impl Cursors {
    pub fn new() -> Cursors {
        Cursors {
            list: vec![Cursor::at(0, 0)],
            primary: 0,
        }
    }

    pub fn primary(&self) -> &Cursor {
        &self.list[self.primary]
    }

    pub fn primary_mut(&mut self) -> &mut Cursor {
        &mut self.list[self.primary]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cursor> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cursor> {
        self.list.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_multi(&self) -> bool {
        self.list.len() > 1
    }

    /// Add a cursor; ignored beyond the cap or when the position is
    /// already occupied. The new cursor becomes primary.
    pub fn add(&mut self, row: usize, col: usize) {
        if self.list.len() >= MAX_CURSORS {
            return;
        }
        if self.list.iter().any(|c| c.pos() == (row, col)) {
            return;
        }
        self.list.push(Cursor::at(row, col));
        self.primary = self.list.len() - 1;
    }

    /// Collapse back to the primary cursor only.
    pub fn collapse(&mut self) {
        let primary = self.list[self.primary];
        self.list.clear();
        self.list.push(primary);
        self.primary = 0;
    }

    /// Indices of cursors sorted by buffer position, ascending. Edits
    /// iterate this order so earlier shifts can remap later cursors.
    pub fn order(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.list.len()).collect();
        idx.sort_by_key(|&i| self.list[i].pos());
        idx
    }

    pub fn get(&self, i: usize) -> &Cursor {
        &self.list[i]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut Cursor {
        &mut self.list[i]
    }
}

// ---- position remapping ----------------------------------------------------
//
// Pure coordinate maps describing how one edit moves any later position.
// Multi-cursor edits fold these over the remaining cursors.

/// After inserting `cols` cells at `at`.
pub fn map_after_insert(p: (usize, usize), at: (usize, usize), cols: usize) -> (usize, usize) {
    if p.0 == at.0 && p.1 >= at.1 {
        (p.0, p.1 + cols)
    } else {
        p
    }
}

/// After splitting `at.0` at column `at.1`.
pub fn map_after_newline(p: (usize, usize), at: (usize, usize)) -> (usize, usize) {
    if p.0 == at.0 && p.1 >= at.1 {
        (p.0 + 1, p.1 - at.1)
    } else if p.0 > at.0 {
        (p.0 + 1, p.1)
    } else {
        p
    }
}

/// After deleting the span `[s, e)` (single or multi row).
pub fn map_after_delete(p: (usize, usize), s: (usize, usize), e: (usize, usize)) -> (usize, usize) {
    if p < s {
        return p;
    }
    if p < e {
        return s;
    }
    if p.0 == e.0 {
        (s.0, s.1 + (p.1 - e.1))
    } else {
        (p.0 - (e.0 - s.0), p.1)
    }
}

/// After joining line `row + 1` (of length irrelevant) onto `row`, whose
/// length before the join was `row_len`.
pub fn map_after_join(p: (usize, usize), row: usize, row_len: usize) -> (usize, usize) {
    if p.0 == row + 1 {
        (row, row_len + p.1)
    } else if p.0 > row + 1 {
        (p.0 - 1, p.1)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_normalizes() {
        let mut c = Cursor::at(2, 5);
        c.start_selection();
        c.move_to(1, 3);
        assert_eq!(c.selection(), Some(((1, 3), (2, 5))));
        c.move_to(2, 5);
        assert_eq!(c.selection(), None); // empty: anchor == cursor
    }

    #[test]
    fn add_respects_cap_and_duplicates() {
        let mut cs = Cursors::new();
        cs.add(0, 0); // duplicate of the initial cursor
        assert_eq!(cs.len(), 1);
        for i in 1..MAX_CURSORS + 20 {
            cs.add(i, 0);
        }
        assert_eq!(cs.len(), MAX_CURSORS);
    }

    #[test]
    fn order_sorts_by_position() {
        let mut cs = Cursors::new();
        cs.primary_mut().move_to(5, 2);
        cs.add(1, 7);
        cs.add(5, 0);
        let order = cs.order();
        let sorted: Vec<(usize, usize)> = order.iter().map(|&i| cs.get(i).pos()).collect();
        assert_eq!(sorted, vec![(1, 7), (5, 0), (5, 2)]);
    }

    #[test]
    fn delete_map_collapses_span() {
        let s = (1, 2);
        let e = (3, 4);
        assert_eq!(map_after_delete((0, 9), s, e), (0, 9));
        assert_eq!(map_after_delete((2, 0), s, e), (1, 2)); // inside
        assert_eq!(map_after_delete((3, 6), s, e), (1, 4)); // tail of end row
        assert_eq!(map_after_delete((5, 1), s, e), (3, 1)); // below
    }

    #[test]
    fn newline_and_join_maps_invert() {
        let at = (2, 3);
        let p = (2, 7);
        let split = map_after_newline(p, at);
        assert_eq!(split, (3, 4));
        assert_eq!(map_after_join(split, 2, 3), p);
        let below = (4, 1);
        assert_eq!(map_after_join(map_after_newline(below, at), 2, 3), below);
    }
}
