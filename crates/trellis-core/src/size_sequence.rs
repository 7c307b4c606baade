//! Prefix-sum sequence of sizes.
//!
//! [`SizeSequence`] stores the sizes of consecutive items (table rows, columns) in an
//! implicit binary tree: every slot holds the sum of its own size and its left subtree.
//! Position ↔ index lookups and single-size updates are `O(log n)`; insertion and removal
//! rebuild the tree in `O(n)`.

const INITIAL_CAPACITY: usize = 64;

/// A sequence of non-negative sizes with fast position lookup.
#[derive(Debug, Clone)]
pub struct SizeSequence {
    table: Vec<i32>,
    size: usize,
    default_value: i32,
}

impl Default for SizeSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeSequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty sequence with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: vec![0; capacity],
            size: 0,
            default_value: 0,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Size used for items created by [`insert`](Self::insert) and
    /// [`initialize_all`](Self::initialize_all).
    pub fn set_default_value(&mut self, value: i32) {
        self.default_value = value;
    }

    /// The default item size.
    pub fn default_value(&self) -> i32 {
        self.default_value
    }

    /// Start position of item `index`. `index == len()` yields the end position.
    pub fn position(&self, index: usize) -> i32 {
        let (mut low, mut high) = (0, self.size);
        let mut result = 0;
        while low < high {
            let mid = (low + high) >> 1;
            if index <= mid {
                high = mid;
            } else {
                result += self.table[mid];
                low = mid + 1;
            }
        }
        result
    }

    /// Sum of all sizes.
    pub fn end_position(&self) -> i32 {
        let (mut low, high) = (0, self.size);
        let mut result = 0;
        while low < high {
            let mid = (low + high) >> 1;
            result += self.table[mid];
            low = mid + 1;
        }
        result
    }

    /// Index of the item containing `position`; `len()` if past the end.
    pub fn index(&self, mut position: i32) -> usize {
        let (mut low, mut high) = (0, self.size);
        while low < high {
            let mid = (low + high) >> 1;
            let pos = self.table[mid];
            if position < pos {
                high = mid;
            } else {
                low = mid + 1;
                position -= pos;
            }
        }
        low
    }

    /// Size of item `index`.
    pub fn size(&self, index: usize) -> i32 {
        self.position(index + 1) - self.position(index)
    }

    /// Set the size of item `index`. Returns `true` if it changed.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set_size(&mut self, index: usize, size: i32) -> bool {
        assert!(index < self.size, "index {index} out of range 0..{}", self.size);
        let delta = size - self.size(index);
        if delta != 0 {
            self.adjust_size(index, delta);
            true
        } else {
            false
        }
    }

    fn adjust_size(&mut self, index: usize, delta: i32) {
        let (mut low, mut high) = (0, self.size);
        while low < high {
            let mid = (low + high) >> 1;
            if index <= mid {
                self.table[mid] += delta;
                high = mid;
            } else {
                low = mid + 1;
            }
        }
    }

    /// Convert the tree slots `low..high` into plain sizes (in place via `dst`).
    fn to_sizes(table: &[i32], low: usize, high: usize, dst: &mut [i32]) -> i32 {
        let (mut low, high) = (low, high);
        let mut sub_result = 0;
        while low < high {
            let mid = (low + high) >> 1;
            let pos = table[mid];
            dst[mid] = pos - Self::to_sizes(table, low, mid, dst);
            sub_result += pos;
            low = mid + 1;
        }
        sub_result
    }

    fn from_sizes(table: &mut [i32], low: usize, high: usize) -> i32 {
        let (mut low, high) = (low, high);
        let mut sub_result = 0;
        while low < high {
            let mid = (low + high) >> 1;
            let pos = table[mid] + Self::from_sizes(table, low, mid);
            table[mid] = pos;
            sub_result += pos;
            low = mid + 1;
        }
        sub_result
    }

    fn plain_sizes(&self) -> Vec<i32> {
        let mut sizes = vec![0; self.size];
        Self::to_sizes(&self.table, 0, self.size, &mut sizes);
        sizes
    }

    /// All sizes in item order.
    pub fn to_vec(&self) -> Vec<i32> {
        self.plain_sizes()
    }

    /// Insert `count` items of the default size before `index`.
    pub fn insert(&mut self, index: usize, count: usize) {
        let default_value = self.default_value;
        self.insert_with(index, count, |_| default_value);
    }

    /// Insert `count` items before `index`, sizing each with `init(item_index)`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_with(&mut self, index: usize, count: usize, mut init: impl FnMut(usize) -> i32) {
        assert!(index <= self.size, "index {index} out of range 0..={}", self.size);
        let mut sizes = self.plain_sizes();
        let tail = sizes.split_off(index);
        sizes.extend((index..index + count).map(&mut init));
        sizes.extend(tail);
        self.rebuild(sizes);
    }

    /// Remove `count` items starting at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the sequence.
    pub fn remove(&mut self, index: usize, count: usize) {
        assert!(
            index + count <= self.size,
            "range {index}..{} out of range 0..{}",
            index + count,
            self.size
        );
        let mut sizes = self.plain_sizes();
        sizes.drain(index..index + count);
        self.rebuild(sizes);
    }

    /// Replace the contents with `count` items of the default size.
    pub fn initialize_all(&mut self, count: usize) {
        let default_value = self.default_value;
        self.initialize_all_with(count, |_| default_value);
    }

    /// Replace the contents with `count` items sized by `init(item_index)`.
    pub fn initialize_all_with(&mut self, count: usize, init: impl FnMut(usize) -> i32) {
        self.rebuild((0..count).map(init).collect());
    }

    fn rebuild(&mut self, mut sizes: Vec<i32>) {
        let count = sizes.len();
        if sizes.len() < self.table.len() {
            sizes.resize(self.table.len(), 0);
        }
        Self::from_sizes(&mut sizes, 0, count);
        self.table = sizes;
        self.size = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(sizes: &[i32]) -> SizeSequence {
        let mut s = SizeSequence::new();
        s.initialize_all_with(sizes.len(), |i| sizes[i]);
        s
    }

    #[test]
    fn test_positions_and_indices() {
        let s = seq(&[10, 20, 30, 40]);
        assert_eq!(s.position(0), 0);
        assert_eq!(s.position(2), 30);
        assert_eq!(s.position(4), 100);
        assert_eq!(s.end_position(), 100);
        assert_eq!(s.index(0), 0);
        assert_eq!(s.index(29), 1);
        assert_eq!(s.index(30), 2);
        assert_eq!(s.index(1000), 4);
        assert_eq!(s.size(3), 40);
    }

    #[test]
    fn test_set_size_reports_change() {
        let mut s = seq(&[5, 5, 5]);
        assert!(s.set_size(1, 8));
        assert!(!s.set_size(1, 8));
        assert_eq!(s.to_vec(), vec![5, 8, 5]);
        assert_eq!(s.position(2), 13);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut s = seq(&[1, 2, 3]);
        s.set_default_value(7);
        s.insert(1, 2);
        assert_eq!(s.to_vec(), vec![1, 7, 7, 2, 3]);
        s.remove(0, 3);
        assert_eq!(s.to_vec(), vec![2, 3]);
        assert_eq!(s.end_position(), 5);
    }

    #[test]
    fn test_large_sequence_grows_past_capacity() {
        let mut s = SizeSequence::with_capacity(2);
        s.set_default_value(3);
        s.initialize_all(100);
        s.insert_with(100, 50, |_| 1);
        assert_eq!(s.len(), 150);
        assert_eq!(s.end_position(), 350);
        assert_eq!(s.index(299), 99);
        assert_eq!(s.index(300), 100);
    }
}
