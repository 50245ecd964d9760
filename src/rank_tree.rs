use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::Pos;
use crate::raw::{Node, RawRankTree, step_next, step_prev, value_ref};

mod positional;

/// An ordered sequence container backed by a threaded, ranked AVL tree.
///
/// Every element occupies a one-based ordinal position, and the tree can be
/// driven through either of two complementary surfaces over the same nodes:
///
/// - **Sorted access** ([`search_or_insert`], [`contains`], [`remove`], ...)
///   places and finds elements by [`Ord`] comparison, like a `BTreeSet`.
/// - **Positional access** ([`insert_at`], [`erase_at`], [`get`], ...) places
///   and finds elements purely by ordinal position, like a `Vec`, with no
///   ordering requirement on `T` at all.
///
/// Mixing the two on one tree is allowed but the sorted operations only
/// behave meaningfully while the sequence is actually sorted; positional
/// insertion at an arbitrary position can break that. The structure itself
/// (balance, positions, iteration) stays valid either way.
///
/// It is likewise a logic error for an element to be modified (through
/// [`get_mut`], [`Cell`], or similar) such that its ordering relative to any
/// other element changes while the sorted surface is in use. The behavior
/// resulting from either logic error is not specified, but is encapsulated to
/// the tree that observed it and cannot result in undefined behavior.
///
/// Iterators returned by [`iter`] and [`into_iter`] produce elements in
/// order and take worst-case logarithmic and amortized constant time per
/// element returned, with no recursion and no auxiliary stack: each node
/// that lacks a child in the iteration direction instead stores a thread
/// directly to its in-order neighbor.
///
/// [`search_or_insert`]: RankTree::search_or_insert
/// [`contains`]: RankTree::contains
/// [`remove`]: RankTree::remove
/// [`insert_at`]: RankTree::insert_at
/// [`erase_at`]: RankTree::erase_at
/// [`get`]: RankTree::get
/// [`get_mut`]: RankTree::get_mut
/// [`iter`]: RankTree::iter
/// [`into_iter`]: RankTree#method.into_iter
/// [`Cell`]: core::cell::Cell
///
/// # Examples
///
/// ```
/// use tavl_tree::RankTree;
///
/// let mut primes = RankTree::new();
///
/// for p in [5, 2, 7, 3] {
///     primes.search_or_insert(p);
/// }
///
/// assert!(primes.contains(&3));
/// assert_eq!(primes.iter().copied().collect::<Vec<_>>(), [2, 3, 5, 7]);
/// ```
///
/// A `RankTree` with a known list of elements can be initialized from an
/// array:
///
/// ```
/// use tavl_tree::RankTree;
///
/// let tree = RankTree::from([1, 2, 3]);
/// ```
pub struct RankTree<T> {
    raw: RawRankTree<T>,
}

/// An iterator over the elements of a `RankTree`.
///
/// This `struct` is created by the [`iter`] method on [`RankTree`].
/// See its documentation for more.
///
/// # Examples
///
/// ```
/// use tavl_tree::RankTree;
///
/// let tree = RankTree::from([3, 1, 2]);
/// let mut iter = tree.iter();
/// assert_eq!(iter.next(), Some(&1));
/// assert_eq!(iter.next_back(), Some(&3));
/// assert_eq!(iter.next(), Some(&2));
/// ```
///
/// [`iter`]: RankTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T: 'a> {
    front: NonNull<Node<T>>,
    back: NonNull<Node<T>>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

unsafe impl<T: Sync> Send for Iter<'_, T> {}
unsafe impl<T: Sync> Sync for Iter<'_, T> {}

/// An owning iterator over the elements of a `RankTree` in order.
///
/// This `struct` is created by the [`into_iter`] method on [`RankTree`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// # Examples
///
/// ```
/// use tavl_tree::RankTree;
///
/// let tree = RankTree::from([1, 2, 3]);
/// let mut iter = tree.into_iter();
/// assert_eq!(iter.next(), Some(1));
/// assert_eq!(iter.next_back(), Some(3));
/// assert_eq!(iter.next(), Some(2));
/// ```
///
/// [`into_iter`]: RankTree#method.into_iter
pub struct IntoIter<T> {
    raw: RawRankTree<T>,
}

impl<T> RankTree<T> {
    /// Makes a new, empty `RankTree`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    ///
    /// // elements can now be inserted into the empty tree
    /// tree.search_or_insert(1);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn new() -> RankTree<T> {
        RankTree {
            raw: RawRankTree::new(),
        }
    }

    /// Returns the number of elements in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// assert_eq!(tree.len(), 0);
    /// tree.search_or_insert(1);
    /// assert_eq!(tree.len(), 1);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) - the count is recovered by summing the stored left-subtree
    /// ranks down one spine; no per-tree counter is kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// assert!(tree.is_empty());
    /// tree.search_or_insert(1);
    /// assert!(!tree.is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the tree, removing all elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::from([1, 2, 3]);
    /// tree.clear();
    /// assert!(tree.is_empty());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Adds a value to the tree in sorted order, unless an equal value is
    /// already present.
    ///
    /// Returns the value's one-based ordinal position and whether an equal
    /// value already existed:
    ///
    /// - If the tree did not previously contain an equal value, it is
    ///   inserted and `(position, false)` is returned.
    /// - If it did, nothing is modified, `value` is dropped, and
    ///   `(position, true)` reports the existing element. Re-running the
    ///   same call is therefore idempotent.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let mut tree = RankTree::new();
    ///
    /// assert_eq!(tree.search_or_insert(20), (Pos(1), false));
    /// assert_eq!(tree.search_or_insert(10), (Pos(1), false));
    /// assert_eq!(tree.search_or_insert(20), (Pos(2), true));
    /// assert_eq!(tree.len(), 2);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn search_or_insert(&mut self, value: T) -> (Pos, bool)
    where
        T: Ord,
    {
        let (_, found, pos) = self.raw.search_or_insert(value);
        (Pos(pos), found)
    }

    /// Returns `true` if the tree contains a value equal to the given one.
    ///
    /// The value may be any borrowed form of the tree's element type, but
    /// the ordering on the borrowed form *must* match the ordering on the
    /// element type.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let tree = RankTree::from([1, 2, 3]);
    /// assert_eq!(tree.contains(&1), true);
    /// assert_eq!(tree.contains(&4), false);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.raw.search(value).is_some()
    }

    /// Returns the one-based ordinal position of the element equal to
    /// `value`, or `None` if no such element exists.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let tree = RankTree::from([10, 20, 30]);
    ///
    /// assert_eq!(tree.position_of(&20), Some(Pos(2)));
    /// assert_eq!(tree.position_of(&15), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) - the position falls out of the same descent that finds the
    /// element, by summing ranks over right turns.
    #[must_use]
    pub fn position_of<Q>(&self, value: &Q) -> Option<Pos>
    where
        T: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.raw.search(value).map(|(_, pos)| Pos(pos))
    }

    /// Searches for `value`, falling forward to its successor on a miss.
    ///
    /// Returns the element equal to `value` if present, otherwise the
    /// smallest element strictly greater than `value`, together with its
    /// position. Returns `None` only when no element is greater than or
    /// equal to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::{Pos, RankTree};
    ///
    /// let tree = RankTree::from([10, 20, 30]);
    ///
    /// assert_eq!(tree.successor_of(&20), Some((Pos(2), &20)));
    /// assert_eq!(tree.successor_of(&15), Some((Pos(2), &20)));
    /// assert_eq!(tree.successor_of(&31), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn successor_of<Q>(&self, value: &Q) -> Option<(Pos, &T)>
    where
        T: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.raw
            .search_next(value)
            .map(|(node, pos)| (Pos(pos), unsafe { value_ref(node) }))
    }

    /// If the tree contains an element equal to the value, removes it and
    /// drops it. Returns whether such an element was present.
    ///
    /// The value may be any borrowed form of the tree's element type, but
    /// the ordering on the borrowed form *must* match the ordering on the
    /// element type.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// tree.search_or_insert(2);
    /// assert_eq!(tree.remove(&2), true);
    /// assert_eq!(tree.remove(&2), false);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.raw.remove(value).is_some()
    }

    /// Removes and returns the element equal to the given value, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// tree.search_or_insert(2);
    /// assert_eq!(tree.take(&2), Some(2));
    /// assert_eq!(tree.take(&2), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.raw.remove(value)
    }

    /// Returns the first element of the tree, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// assert_eq!(tree.first(), None);
    /// tree.search_or_insert(2);
    /// assert_eq!(tree.first(), Some(&2));
    /// tree.search_or_insert(1);
    /// assert_eq!(tree.first(), Some(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.raw.first().map(|node| unsafe { value_ref(node) })
    }

    /// Returns the last element of the tree, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::new();
    /// assert_eq!(tree.last(), None);
    /// tree.search_or_insert(1);
    /// assert_eq!(tree.last(), Some(&1));
    /// tree.search_or_insert(2);
    /// assert_eq!(tree.last(), Some(&2));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.raw.last().map(|node| unsafe { value_ref(node) })
    }

    /// Removes and returns the first element of the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::from([1, 2]);
    /// assert_eq!(tree.pop_first(), Some(1));
    /// assert_eq!(tree.pop_first(), Some(2));
    /// assert_eq!(tree.pop_first(), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_first(&mut self) -> Option<T> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element of the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut tree = RankTree::from([1, 2]);
    /// assert_eq!(tree.pop_last(), Some(2));
    /// assert_eq!(tree.pop_last(), Some(1));
    /// assert_eq!(tree.pop_last(), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn pop_last(&mut self) -> Option<T> {
        self.raw.pop_last()
    }

    /// Gets an iterator over the elements of the tree, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let tree = RankTree::from([3, 2, 1]);
    ///
    /// let first = tree.iter().next().unwrap();
    /// assert_eq!(*first, 1);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) to create the iterator; each step is O(1) amortized via the
    /// predecessor/successor threads, with no recursion or explicit stack.
    pub fn iter(&self) -> Iter<'_, T> {
        let remaining = self.len();
        match (self.raw.first(), self.raw.last()) {
            (Some(front), Some(back)) => Iter {
                front,
                back,
                remaining,
                marker: PhantomData,
            },
            _ => Iter::default(),
        }
    }

    /// Calls `visitor` on every element, in order, without consuming the
    /// tree. Unlike [`iter`](RankTree::iter) this traverses child links
    /// recursively (O(log n) depth).
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let tree = RankTree::from([2, 1, 3]);
    /// let mut sum = 0;
    /// tree.walk(|&v| sum += v);
    /// assert_eq!(sum, 6);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn walk<F: FnMut(&T)>(&self, mut visitor: F) {
        self.raw.walk(&mut visitor);
    }

    /// Appends every element of `other` after the elements of `self`,
    /// consuming `other`.
    ///
    /// This is positional concatenation, not a merge: `other`'s elements
    /// keep their relative order and follow all of `self`'s. The caller is
    /// responsible for every element of `self` ordering before every element
    /// of `other` if the sorted operations are to be used afterwards; this
    /// is **not checked**. The structure itself remains valid either way.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut a = RankTree::from([1, 2, 3]);
    /// let b = RankTree::from([4, 5]);
    ///
    /// a.concat(b);
    ///
    /// assert_eq!(a.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) - one boundary element is removed and re-spliced where the
    /// two heights meet; no per-element work.
    pub fn concat(&mut self, other: RankTree<T>) {
        let RankTree { raw } = other;
        self.raw.concat(raw);
    }

    /// Splits the tree into two at the given position. Returns a new tree
    /// containing every element after the first `pos`, leaving the first
    /// `pos` elements in `self`.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let mut a = RankTree::from([1, 2, 3, 4, 5]);
    /// let b = a.split_off(2);
    ///
    /// assert_eq!(a.iter().copied().collect::<Vec<_>>(), [1, 2]);
    /// assert_eq!(b.iter().copied().collect::<Vec<_>>(), [3, 4, 5]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) - both result trees are rebuilt from the O(log n) subtrees
    /// hanging off the descent to the split point.
    #[allow(clippy::return_self_not_must_use)]
    pub fn split_off(&mut self, pos: usize) -> Self {
        RankTree {
            raw: self.raw.split_off(pos),
        }
    }
}

impl<T> Default for RankTree<T> {
    fn default() -> Self {
        RankTree::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RankTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone> Clone for RankTree<T> {
    /// Deep-copies the tree, preserving its exact shape: every node's
    /// position, balance factor, and rank carry over, so the clone behaves
    /// identically and shares no storage with the original.
    fn clone(&self) -> Self {
        RankTree {
            raw: self.raw.deep_clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for RankTree<T> {
    fn eq(&self, other: &RankTree<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for RankTree<T> {}

impl<T: Hash> Hash for RankTree<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T: Ord> FromIterator<T> for RankTree<T> {
    /// Collects into a sorted tree; duplicate values are dropped.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = RankTree::new();
        tree.extend(iter);
        tree
    }
}

impl<T: Ord> Extend<T> for RankTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.search_or_insert(value);
        }
    }
}

impl<'a, T: 'a + Ord + Copy> Extend<&'a T> for RankTree<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for &value in iter {
            self.search_or_insert(value);
        }
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for RankTree<T> {
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T> IntoIterator for RankTree<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    /// Gets an iterator for moving out the `RankTree`'s elements in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use tavl_tree::RankTree;
    ///
    /// let tree = RankTree::from([1, 2, 3, 4]);
    ///
    /// let v: Vec<_> = tree.into_iter().collect();
    /// assert_eq!(v, [1, 2, 3, 4]);
    /// ```
    fn into_iter(self) -> IntoIter<T> {
        let RankTree { raw } = self;
        IntoIter { raw }
    }
}

impl<'a, T> IntoIterator for &'a RankTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front;
        if self.remaining > 1 {
            self.front = unsafe { step_next(node) };
        }
        self.remaining -= 1;
        Some(unsafe { value_ref(node) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn last(mut self) -> Option<&'a T> {
        self.next_back()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back;
        if self.remaining > 1 {
            self.back = unsafe { step_prev(node) };
        }
        self.remaining -= 1;
        Some(unsafe { value_ref(node) })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<T> Default for Iter<'_, T> {
    /// Creates an empty `rank_tree::Iter`.
    ///
    /// ```
    /// # use tavl_tree::rank_tree;
    /// let iter: rank_tree::Iter<'_, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        Iter {
            // Never dereferenced while `remaining` is 0.
            front: NonNull::dangling(),
            back: NonNull::dangling(),
            remaining: 0,
            marker: PhantomData,
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.raw.len();
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.raw.pop_last()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.raw.len()
    }
}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").finish_non_exhaustive()
    }
}

impl<T> Default for IntoIter<T> {
    /// Creates an empty `rank_tree::IntoIter`.
    ///
    /// ```
    /// # use tavl_tree::rank_tree;
    /// let iter: rank_tree::IntoIter<u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        IntoIter {
            raw: RawRankTree::new(),
        }
    }
}
