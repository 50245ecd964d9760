/// A one-based ordinal position into the in-order sequence of a tree.
///
/// `Pos(1)` is the first element and `Pos(len)` the last. `Pos(0)` never
/// refers to an element; lookups with it return `None`.
///
/// # Examples
///
/// ```
/// use tavl_tree::{Pos, RankTree};
///
/// let mut tree = RankTree::new();
/// tree.search_or_insert("a");
/// tree.search_or_insert("b");
///
/// assert_eq!(tree[Pos(1)], "a");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pos(pub usize);
