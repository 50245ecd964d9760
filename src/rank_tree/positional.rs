use core::ops::Index;

use super::RankTree;
use crate::Pos;
use crate::raw::{value_mut, value_ref};

impl<T> RankTree<T> {
    /// Inserts `value` so that exactly `before` existing elements precede
    /// it; `before` greater than the current length is clamped, making the
    /// operation total. `insert_at(0, v)` prepends, `insert_at(len, v)`
    /// appends.
    ///
    /// This is the positional surface: no ordering on `T` is consulted, so
    /// the tree acts as a balanced sequence. Using the sorted operations on
    /// a tree whose sequence positional insertion has left unsorted is a
    /// logic error (see the [type docs](RankTree)).
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut line = RankTree::new();
    /// line.insert_at(0, "world");
    /// line.insert_at(0, "hello");
    /// line.insert_at(100, "!");
    ///
    /// assert_eq!(line.iter().copied().collect::<Vec<_>>(), ["hello", "world", "!"]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert_at(&mut self, before: usize, value: T) {
        self.raw.insert_at(before, value);
    }

    /// Inserts `value` as the new first element.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// tree.push_front(2);
    /// tree.push_front(1);
    /// assert_eq!(tree.first(), Some(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn push_front(&mut self, value: T) {
        self.raw.insert_at(0, value);
    }

    /// Inserts `value` as the new last element.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// tree.push_back(1);
    /// tree.push_back(2);
    /// assert_eq!(tree.last(), Some(&2));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn push_back(&mut self, value: T) {
        let len = self.raw.len();
        self.raw.insert_at(len, value);
    }

    /// Removes and returns the element at position `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds (`Pos(0)`, or past the end).
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let mut tree = RankTree::from([10, 20, 30]);
    /// assert_eq!(tree.erase_at(Pos(2)), 20);
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [10, 30]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn erase_at(&mut self, pos: Pos) -> T {
        match self.raw.erase_at(pos.0) {
            Some(value) => value,
            None => panic!("`RankTree::erase_at()` - `pos` out of bounds!"),
        }
    }

    /// Returns a reference to the element at position `pos`, or `None` if
    /// `pos` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let tree = RankTree::from([10, 20, 30]);
    /// assert_eq!(tree.get(Pos(2)), Some(&20));
    /// assert!(tree.get(Pos(4)).is_none());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn get(&self, pos: Pos) -> Option<&T> {
        self.raw.find_at(pos.0).map(|node| unsafe { value_ref(node) })
    }

    /// Returns a mutable reference to the element at position `pos`, or
    /// `None` if `pos` is out of bounds.
    ///
    /// Modifying the element so that its ordering relative to any other
    /// element changes is a logic error if the sorted operations are used
    /// afterwards (see the [type docs](RankTree)).
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let mut tree = RankTree::new();
    /// tree.push_back("a");
    /// *tree.get_mut(Pos(1)).unwrap() = "b";
    /// assert_eq!(tree[Pos(1)], "b");
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut T> {
        self.raw.find_at(pos.0).map(|node| unsafe { value_mut(node) })
    }
}

/// Indexes into the tree by ordinal position.
///
/// # Panics
///
/// Panics if `pos` is out of bounds.
///
/// # Examples
///
/// ```
/// use tavl_tree::{Pos, RankTree};
///
/// let tree = RankTree::from([10, 20, 30]);
/// assert_eq!(tree[Pos(2)], 20);
/// ```
impl<T> Index<Pos> for RankTree<T> {
    type Output = T;

    fn index(&self, pos: Pos) -> &Self::Output {
        self.get(pos).expect("index out of bounds")
    }
}
