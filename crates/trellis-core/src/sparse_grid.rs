//! Sparse two-dimensional grid keyed by `(row, column)`.
//!
//! Entries are kept in row-major order in a B-tree, so iterating a rectangular window
//! visits only stored cells. Row and column insertion/removal shift the keys of the
//! following entries.

use std::collections::BTreeMap;

/// A sparse row-major grid.
#[derive(Debug, Clone)]
pub struct SparseGrid<T> {
    cells: BTreeMap<(i32, i32), T>,
}

impl<T> Default for SparseGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseGrid<T> {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// The entry at `(row, column)`.
    pub fn get(&self, row: i32, column: i32) -> Option<&T> {
        self.cells.get(&(row, column))
    }

    /// Mutable access to the entry at `(row, column)`.
    pub fn get_mut(&mut self, row: i32, column: i32) -> Option<&mut T> {
        self.cells.get_mut(&(row, column))
    }

    /// Store `entry` at `(row, column)`, returning the previous entry.
    pub fn set(&mut self, row: i32, column: i32, entry: T) -> Option<T> {
        self.cells.insert((row, column), entry)
    }

    /// Remove and return the entry at `(row, column)`.
    pub fn remove(&mut self, row: i32, column: i32) -> Option<T> {
        self.cells.remove(&(row, column))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid stores no entry.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Shift every entry at or below `row` down by `count` rows.
    pub fn insert_rows(&mut self, row: i32, count: i32) {
        if count > 0 {
            self.rekey(|r, c| Some(if r >= row { (r + count, c) } else { (r, c) }));
        }
    }

    /// Shift every entry at or right of `column` by `count` columns.
    pub fn insert_columns(&mut self, column: i32, count: i32) {
        if count > 0 {
            self.rekey(|r, c| Some(if c >= column { (r, c + count) } else { (r, c) }));
        }
    }

    /// Drop entries in rows `row..row + count` and shift the following rows up.
    pub fn remove_rows(&mut self, row: i32, count: i32) {
        if count > 0 {
            self.rekey(|r, c| {
                if r < row {
                    Some((r, c))
                } else if r < row + count {
                    None
                } else {
                    Some((r - count, c))
                }
            });
        }
    }

    /// Drop entries in columns `column..column + count` and shift the following columns left.
    pub fn remove_columns(&mut self, column: i32, count: i32) {
        if count > 0 {
            self.rekey(|r, c| {
                if c < column {
                    Some((r, c))
                } else if c < column + count {
                    None
                } else {
                    Some((r, c - count))
                }
            });
        }
    }

    fn rekey(&mut self, mut f: impl FnMut(i32, i32) -> Option<(i32, i32)>) {
        let old = std::mem::take(&mut self.cells);
        self.cells = old
            .into_iter()
            .filter_map(|((r, c), v)| f(r, c).map(|key| (key, v)))
            .collect();
    }

    /// Entries inside the inclusive window, in row-major order.
    pub fn iter_window(
        &self,
        start_row: i32,
        start_column: i32,
        end_row: i32,
        end_column: i32,
    ) -> impl Iterator<Item = (i32, i32, &T)> + '_ {
        self.cells
            .range((start_row, start_column)..)
            .take_while(move |((r, _), _)| *r <= end_row)
            .filter(move |((_, c), _)| *c >= start_column && *c <= end_column)
            .map(|(&(r, c), v)| (r, c, v))
    }

    /// Remove and return the entries inside the inclusive window.
    pub fn drain_window(
        &mut self,
        start_row: i32,
        start_column: i32,
        end_row: i32,
        end_column: i32,
    ) -> Vec<(i32, i32, T)> {
        let keys: Vec<(i32, i32)> = self
            .iter_window(start_row, start_column, end_row, end_column)
            .map(|(r, c, _)| (r, c))
            .collect();
        keys.into_iter()
            .filter_map(|(r, c)| self.cells.remove(&(r, c)).map(|v| (r, c, v)))
            .collect()
    }

    /// All entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &T)> + '_ {
        self.cells.iter().map(|(&(r, c), v)| (r, c, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SparseGrid<&'static str> {
        let mut g = SparseGrid::new();
        g.set(0, 0, "a");
        g.set(1, 2, "b");
        g.set(3, 1, "c");
        g.set(5, 0, "d");
        g
    }

    #[test]
    fn test_window_iteration_is_row_major() {
        let g = grid();
        let hits: Vec<_> = g.iter_window(1, 0, 4, 1).map(|(_, _, v)| *v).collect();
        assert_eq!(hits, vec!["c"]);
        let hits: Vec<_> = g.iter_window(0, 0, 5, 5).map(|(_, _, v)| *v).collect();
        assert_eq!(hits, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_insert_rows_shifts_following() {
        let mut g = grid();
        g.insert_rows(1, 2);
        assert_eq!(g.get(0, 0), Some(&"a"));
        assert_eq!(g.get(3, 2), Some(&"b"));
        assert_eq!(g.get(7, 0), Some(&"d"));
        assert_eq!(g.get(1, 2), None);
    }

    #[test]
    fn test_remove_rows_drops_and_shifts() {
        let mut g = grid();
        g.remove_rows(1, 3);
        assert_eq!(g.len(), 2);
        assert_eq!(g.get(2, 0), Some(&"d"));
    }

    #[test]
    fn test_columns() {
        let mut g = grid();
        g.insert_columns(1, 1);
        assert_eq!(g.get(1, 3), Some(&"b"));
        assert_eq!(g.get(3, 2), Some(&"c"));
        g.remove_columns(2, 1);
        assert_eq!(g.get(3, 2), None);
        assert_eq!(g.get(1, 2), Some(&"b"));
    }

    #[test]
    fn test_drain_window() {
        let mut g = grid();
        let drained = g.drain_window(0, 0, 3, 0);
        assert_eq!(drained, vec![(0, 0, "a")]);
        assert_eq!(g.len(), 3);
    }
}
