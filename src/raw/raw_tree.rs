use core::borrow::Borrow;
use core::cmp::Ordering;
use core::marker::PhantomData;
use core::ptr::NonNull;

use alloc::boxed::Box;
use smallvec::SmallVec;

use super::node::{Balance, Dir, Link, Node};

/// Root-to-site trail recorded during a descent: each entry is a node and the
/// direction the descent took out of it. Mutations retrace this stack
/// iteratively instead of unwinding recursion.
type Path<T> = SmallVec<[(NonNull<Node<T>>, Dir); 16]>;

/// A detached, balanced subtree together with its height and node count,
/// passed between the concatenate/split surgery and the join primitive.
struct Piece<T> {
    root: Option<NonNull<Node<T>>>,
    height: usize,
    size: usize,
}

impl<T> Clone for Piece<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Piece<T> {}

impl<T> Piece<T> {
    const EMPTY: Piece<T> = Piece {
        root: None,
        height: 0,
        size: 0,
    };
}

/// The threaded, ranked AVL tree backing `RankTree`.
///
/// Owns one head sentinel node. The head's left slot is a real child (the
/// root) exactly when the tree is non-empty; its right slot always threads
/// back to the head itself. The leftmost node's predecessor thread and the
/// rightmost node's successor thread both terminate at the head, which is how
/// iteration detects either end.
pub(crate) struct RawRankTree<T> {
    head: NonNull<Node<T>>,
    marker: PhantomData<Box<Node<T>>>,
}

unsafe impl<T: Send> Send for RawRankTree<T> {}
unsafe impl<T: Sync> Sync for RawRankTree<T> {}

/// Descends to the leftmost node of the subtree rooted at `node`.
pub(crate) unsafe fn leftmost<T>(mut node: NonNull<Node<T>>) -> NonNull<Node<T>> {
    unsafe {
        while let Link::Child(left) = (*node.as_ptr()).left {
            node = left;
        }
    }
    node
}

/// Descends to the rightmost node of the subtree rooted at `node`.
pub(crate) unsafe fn rightmost<T>(mut node: NonNull<Node<T>>) -> NonNull<Node<T>> {
    unsafe {
        while let Link::Child(right) = (*node.as_ptr()).right {
            node = right;
        }
    }
    node
}

/// Advances to the in-order successor without checking for the head sentinel:
/// either a direct thread jump or the leftmost node of the right subtree.
///
/// # Safety
///
/// `node` must not be the last node of its tree.
pub(crate) unsafe fn step_next<T>(node: NonNull<Node<T>>) -> NonNull<Node<T>> {
    unsafe {
        match (*node.as_ptr()).right {
            Link::Child(right) => leftmost(right),
            Link::Thread(succ) => succ,
        }
    }
}

/// Mirror of [`step_next`]: the in-order predecessor.
///
/// # Safety
///
/// `node` must not be the first node of its tree.
pub(crate) unsafe fn step_prev<T>(node: NonNull<Node<T>>) -> NonNull<Node<T>> {
    unsafe {
        match (*node.as_ptr()).left {
            Link::Child(left) => rightmost(left),
            Link::Thread(pred) => pred,
        }
    }
}

/// Borrows the value stored in a data node.
///
/// # Safety
///
/// `node` must be a live data node (never the head sentinel), and the caller
/// must bound the returned lifetime by the borrow of the owning tree.
pub(crate) unsafe fn value_ref<'a, T>(node: NonNull<Node<T>>) -> &'a T {
    unsafe { (*node.as_ptr()).value.assume_init_ref() }
}

/// Mutable counterpart of [`value_ref`].
///
/// # Safety
///
/// As [`value_ref`], with the owning tree borrowed mutably.
pub(crate) unsafe fn value_mut<'a, T>(node: NonNull<Node<T>>) -> &'a mut T {
    unsafe { (*node.as_ptr()).value.assume_init_mut() }
}

impl<T> RawRankTree<T> {
    /// Creates an empty tree: a lone head sentinel threaded to itself.
    pub(crate) fn new() -> Self {
        Self {
            head: Node::alloc_head(),
            marker: PhantomData,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        unsafe { (*self.head.as_ptr()).left.is_thread() }
    }

    fn root(&self) -> Option<NonNull<Node<T>>> {
        unsafe { (*self.head.as_ptr()).left.as_child() }
    }

    /// Returns the number of stored values in O(log n): every node's rank
    /// already counts itself plus its left subtree, so summing ranks down the
    /// rightmost child spine covers the whole tree.
    pub(crate) fn len(&self) -> usize {
        let mut count = 0;
        let mut link = unsafe { (*self.head.as_ptr()).left };
        while let Link::Child(node) = link {
            unsafe {
                count += (*node.as_ptr()).rank;
                link = (*node.as_ptr()).right;
            }
        }
        count
    }

    /// Returns the exact height of the data subtree by descending the taller
    /// side per the stored balance factors.
    fn height(&self) -> usize {
        let mut height = 0;
        let mut link = unsafe { (*self.head.as_ptr()).left };
        while let Link::Child(node) = link {
            height += 1;
            unsafe {
                link = if (*node.as_ptr()).balance == Balance::RightHigh {
                    (*node.as_ptr()).right
                } else {
                    (*node.as_ptr()).left
                };
            }
        }
        height
    }

    /// Drops every stored value and resets the tree to the empty state.
    pub(crate) fn clear(&mut self) {
        if let Some(root) = self.root() {
            unsafe {
                (*self.head.as_ptr()).left = Link::Thread(self.head);
                Self::drop_subtree(root);
            }
        }
    }

    unsafe fn drop_subtree(node: NonNull<Node<T>>) {
        unsafe {
            if let Link::Child(left) = (*node.as_ptr()).left {
                Self::drop_subtree(left);
            }
            if let Link::Child(right) = (*node.as_ptr()).right {
                Self::drop_subtree(right);
            }
            drop(Node::dealloc(node));
        }
    }

    pub(crate) fn first(&self) -> Option<NonNull<Node<T>>> {
        self.root().map(|root| unsafe { leftmost(root) })
    }

    pub(crate) fn last(&self) -> Option<NonNull<Node<T>>> {
        self.root().map(|root| unsafe { rightmost(root) })
    }

    /// In-order successor of `node`, or `None` once the head is reached.
    ///
    /// # Safety
    ///
    /// `node` must be a live data node of this tree.
    pub(crate) unsafe fn next(&self, node: NonNull<Node<T>>) -> Option<NonNull<Node<T>>> {
        let succ = unsafe { step_next(node) };
        (succ != self.head).then_some(succ)
    }

    /// In-order predecessor of `node`, or `None` once the head is reached.
    ///
    /// # Safety
    ///
    /// `node` must be a live data node of this tree.
    pub(crate) unsafe fn prev(&self, node: NonNull<Node<T>>) -> Option<NonNull<Node<T>>> {
        let pred = unsafe { step_prev(node) };
        (pred != self.head).then_some(pred)
    }

    /// Recursive in-order traversal. Depth is bounded by the balance
    /// invariant, so the recursion stays within O(log n) frames.
    pub(crate) fn walk<F: FnMut(&T)>(&self, f: &mut F) {
        if let Some(root) = self.root() {
            unsafe { Self::walk_node(root, f) };
        }
    }

    unsafe fn walk_node<F: FnMut(&T)>(node: NonNull<Node<T>>, f: &mut F) {
        unsafe {
            if let Link::Child(left) = (*node.as_ptr()).left {
                Self::walk_node(left, f);
            }
            f(value_ref(node));
            if let Link::Child(right) = (*node.as_ptr()).right {
                Self::walk_node(right, f);
            }
        }
    }

    // ─── Rotation primitives ─────────────────────────────────────────────

    /// Left rotation about `a`; `a.right` must be a real child. Relinks the
    /// two nodes, folds `a`'s rank into the new subtree root's rank (the
    /// rotation moves `a` and its left subtree under it), and restores the
    /// thread that the rotation exposes when the pivot had no left child.
    /// Returns the new subtree root.
    unsafe fn rotate_left(a: NonNull<Node<T>>) -> NonNull<Node<T>> {
        unsafe {
            let b = (*a.as_ptr()).right.target();
            match (*b.as_ptr()).left {
                Link::Child(inner) => (*a.as_ptr()).right = Link::Child(inner),
                // b was a's immediate successor; now a borders b directly.
                Link::Thread(_) => (*a.as_ptr()).right = Link::Thread(b),
            }
            (*b.as_ptr()).left = Link::Child(a);
            (*b.as_ptr()).rank += (*a.as_ptr()).rank;
            b
        }
    }

    /// Mirror of [`Self::rotate_left`].
    unsafe fn rotate_right(a: NonNull<Node<T>>) -> NonNull<Node<T>> {
        unsafe {
            let b = (*a.as_ptr()).left.target();
            match (*b.as_ptr()).right {
                Link::Child(inner) => (*a.as_ptr()).left = Link::Child(inner),
                Link::Thread(_) => (*a.as_ptr()).left = Link::Thread(b),
            }
            (*b.as_ptr()).right = Link::Child(a);
            (*a.as_ptr()).rank -= (*b.as_ptr()).rank;
            b
        }
    }

    /// Rebalances `a` after its left subtree grew one level. Returns the
    /// subtree root after any rotation and whether the height delta still
    /// propagates upward.
    unsafe fn left_grew(a: NonNull<Node<T>>) -> (NonNull<Node<T>>, bool) {
        unsafe {
            match (*a.as_ptr()).balance {
                Balance::RightHigh => {
                    (*a.as_ptr()).balance = Balance::Even;
                    (a, false)
                }
                Balance::Even => {
                    (*a.as_ptr()).balance = Balance::LeftHigh;
                    (a, true)
                }
                Balance::LeftHigh => {
                    let b = (*a.as_ptr()).left.target();
                    match (*b.as_ptr()).balance {
                        Balance::LeftHigh => {
                            (*a.as_ptr()).balance = Balance::Even;
                            (*b.as_ptr()).balance = Balance::Even;
                            (Self::rotate_right(a), false)
                        }
                        // Only reachable when a whole subtree was attached
                        // (concatenate/split), never from a single insertion.
                        Balance::Even => {
                            (*a.as_ptr()).balance = Balance::LeftHigh;
                            (*b.as_ptr()).balance = Balance::RightHigh;
                            (Self::rotate_right(a), true)
                        }
                        Balance::RightHigh => {
                            let c = (*b.as_ptr()).right.target();
                            (*a.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::LeftHigh => Balance::RightHigh,
                                _ => Balance::Even,
                            };
                            (*b.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::RightHigh => Balance::LeftHigh,
                                _ => Balance::Even,
                            };
                            (*c.as_ptr()).balance = Balance::Even;
                            (*a.as_ptr()).left = Link::Child(Self::rotate_left(b));
                            (Self::rotate_right(a), false)
                        }
                    }
                }
            }
        }
    }

    /// Mirror of [`Self::left_grew`] for a right subtree that grew.
    unsafe fn right_grew(a: NonNull<Node<T>>) -> (NonNull<Node<T>>, bool) {
        unsafe {
            match (*a.as_ptr()).balance {
                Balance::LeftHigh => {
                    (*a.as_ptr()).balance = Balance::Even;
                    (a, false)
                }
                Balance::Even => {
                    (*a.as_ptr()).balance = Balance::RightHigh;
                    (a, true)
                }
                Balance::RightHigh => {
                    let b = (*a.as_ptr()).right.target();
                    match (*b.as_ptr()).balance {
                        Balance::RightHigh => {
                            (*a.as_ptr()).balance = Balance::Even;
                            (*b.as_ptr()).balance = Balance::Even;
                            (Self::rotate_left(a), false)
                        }
                        Balance::Even => {
                            (*a.as_ptr()).balance = Balance::RightHigh;
                            (*b.as_ptr()).balance = Balance::LeftHigh;
                            (Self::rotate_left(a), true)
                        }
                        Balance::LeftHigh => {
                            let c = (*b.as_ptr()).left.target();
                            (*a.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::RightHigh => Balance::LeftHigh,
                                _ => Balance::Even,
                            };
                            (*b.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::LeftHigh => Balance::RightHigh,
                                _ => Balance::Even,
                            };
                            (*c.as_ptr()).balance = Balance::Even;
                            (*a.as_ptr()).right = Link::Child(Self::rotate_right(b));
                            (Self::rotate_left(a), false)
                        }
                    }
                }
            }
        }
    }

    /// Rebalances `a` after its left subtree shrank one level. Returns the
    /// subtree root and whether the subtree as a whole lost height (which
    /// keeps the retrace going).
    unsafe fn left_shrank(a: NonNull<Node<T>>) -> (NonNull<Node<T>>, bool) {
        unsafe {
            match (*a.as_ptr()).balance {
                Balance::LeftHigh => {
                    (*a.as_ptr()).balance = Balance::Even;
                    (a, true)
                }
                Balance::Even => {
                    (*a.as_ptr()).balance = Balance::RightHigh;
                    (a, false)
                }
                Balance::RightHigh => {
                    let b = (*a.as_ptr()).right.target();
                    match (*b.as_ptr()).balance {
                        Balance::RightHigh => {
                            (*a.as_ptr()).balance = Balance::Even;
                            (*b.as_ptr()).balance = Balance::Even;
                            (Self::rotate_left(a), true)
                        }
                        Balance::Even => {
                            (*a.as_ptr()).balance = Balance::RightHigh;
                            (*b.as_ptr()).balance = Balance::LeftHigh;
                            (Self::rotate_left(a), false)
                        }
                        Balance::LeftHigh => {
                            let c = (*b.as_ptr()).left.target();
                            (*a.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::RightHigh => Balance::LeftHigh,
                                _ => Balance::Even,
                            };
                            (*b.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::LeftHigh => Balance::RightHigh,
                                _ => Balance::Even,
                            };
                            (*c.as_ptr()).balance = Balance::Even;
                            (*a.as_ptr()).right = Link::Child(Self::rotate_right(b));
                            (Self::rotate_left(a), true)
                        }
                    }
                }
            }
        }
    }

    /// Mirror of [`Self::left_shrank`] for a right subtree that shrank.
    unsafe fn right_shrank(a: NonNull<Node<T>>) -> (NonNull<Node<T>>, bool) {
        unsafe {
            match (*a.as_ptr()).balance {
                Balance::RightHigh => {
                    (*a.as_ptr()).balance = Balance::Even;
                    (a, true)
                }
                Balance::Even => {
                    (*a.as_ptr()).balance = Balance::LeftHigh;
                    (a, false)
                }
                Balance::LeftHigh => {
                    let b = (*a.as_ptr()).left.target();
                    match (*b.as_ptr()).balance {
                        Balance::LeftHigh => {
                            (*a.as_ptr()).balance = Balance::Even;
                            (*b.as_ptr()).balance = Balance::Even;
                            (Self::rotate_right(a), true)
                        }
                        Balance::Even => {
                            (*a.as_ptr()).balance = Balance::LeftHigh;
                            (*b.as_ptr()).balance = Balance::RightHigh;
                            (Self::rotate_right(a), false)
                        }
                        Balance::RightHigh => {
                            let c = (*b.as_ptr()).right.target();
                            (*a.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::LeftHigh => Balance::RightHigh,
                                _ => Balance::Even,
                            };
                            (*b.as_ptr()).balance = match (*c.as_ptr()).balance {
                                Balance::RightHigh => Balance::LeftHigh,
                                _ => Balance::Even,
                            };
                            (*c.as_ptr()).balance = Balance::Even;
                            (*a.as_ptr()).left = Link::Child(Self::rotate_left(b));
                            (Self::rotate_right(a), true)
                        }
                    }
                }
            }
        }
    }

    /// Retraces `path` after the subtree below its last entry grew one level,
    /// rewriting parent slots whenever a rotation replaces a subtree root.
    /// `root` is the root of the region the path descends from. Returns true
    /// if the region as a whole gained a level.
    unsafe fn retrace_grow(path: &mut Path<T>, root: &mut NonNull<Node<T>>) -> bool {
        unsafe {
            while let Some((node, dir)) = path.pop() {
                let (new_root, grew) = match dir {
                    Dir::Left => Self::left_grew(node),
                    Dir::Right => Self::right_grew(node),
                };
                if new_root != node {
                    match path.last() {
                        Some(&(parent, pdir)) => (*parent.as_ptr()).set_child(pdir, new_root),
                        None => *root = new_root,
                    }
                }
                if !grew {
                    return false;
                }
            }
        }
        true
    }

    /// Shrink-side counterpart of [`Self::retrace_grow`].
    unsafe fn retrace_shrink(path: &mut Path<T>, root: &mut NonNull<Node<T>>) {
        unsafe {
            while let Some((node, dir)) = path.pop() {
                let (new_root, shrank) = match dir {
                    Dir::Left => Self::left_shrank(node),
                    Dir::Right => Self::right_shrank(node),
                };
                if new_root != node {
                    match path.last() {
                        Some(&(parent, pdir)) => (*parent.as_ptr()).set_child(pdir, new_root),
                        None => *root = new_root,
                    }
                }
                if !shrank {
                    return;
                }
            }
        }
    }

    // ─── Insertion plumbing ──────────────────────────────────────────────

    /// Inserts the very first node of an empty tree.
    unsafe fn insert_first(&mut self, value: T) -> NonNull<Node<T>> {
        let node = Node::alloc(value);
        unsafe {
            (*node.as_ptr()).left = Link::Thread(self.head);
            (*node.as_ptr()).right = Link::Thread(self.head);
            (*self.head.as_ptr()).left = Link::Child(node);
        }
        node
    }

    /// Converts the `dir` thread slot of `parent` into a real child holding
    /// `value`, wiring the new node's own threads to its in-order neighbors.
    /// Ancestors that gained a node in their left subtree get their rank
    /// bumped, then the grow-side retrace restores the balance invariant.
    unsafe fn insert_leaf(
        &mut self,
        mut path: Path<T>,
        parent: NonNull<Node<T>>,
        dir: Dir,
        value: T,
    ) -> NonNull<Node<T>> {
        let node = Node::alloc(value);
        unsafe {
            match dir {
                Dir::Left => {
                    (*node.as_ptr()).left = (*parent.as_ptr()).left;
                    (*node.as_ptr()).right = Link::Thread(parent);
                    (*parent.as_ptr()).left = Link::Child(node);
                }
                Dir::Right => {
                    (*node.as_ptr()).right = (*parent.as_ptr()).right;
                    (*node.as_ptr()).left = Link::Thread(parent);
                    (*parent.as_ptr()).right = Link::Child(node);
                }
            }
            path.push((parent, dir));
            for &(ancestor, d) in &path {
                if d == Dir::Left {
                    (*ancestor.as_ptr()).rank += 1;
                }
            }
            let mut root = (*self.head.as_ptr()).left.target();
            Self::retrace_grow(&mut path, &mut root);
            (*self.head.as_ptr()).left = Link::Child(root);
        }
        node
    }

    // ─── Sorted operations ───────────────────────────────────────────────

    /// Descends by three-way comparison; inserts `value` at the thread slot
    /// the descent lands on if no equal value exists. Returns the node,
    /// whether the value was already present (in which case `value` is
    /// dropped and nothing is mutated), and its 1-based ordinal position.
    pub(crate) fn search_or_insert(&mut self, value: T) -> (NonNull<Node<T>>, bool, usize)
    where
        T: Ord,
    {
        let Some(root) = self.root() else {
            return (unsafe { self.insert_first(value) }, false, 1);
        };
        let mut path = Path::new();
        let mut cur = root;
        let mut pos = 0;
        loop {
            unsafe {
                match value.cmp(value_ref(cur)) {
                    Ordering::Equal => return (cur, true, pos + (*cur.as_ptr()).rank),
                    Ordering::Less => match (*cur.as_ptr()).left {
                        Link::Child(left) => {
                            path.push((cur, Dir::Left));
                            cur = left;
                        }
                        Link::Thread(_) => {
                            // The new node slides in just before `cur` and
                            // takes over its current ordinal position.
                            let at = pos + (*cur.as_ptr()).rank;
                            return (self.insert_leaf(path, cur, Dir::Left, value), false, at);
                        }
                    },
                    Ordering::Greater => {
                        pos += (*cur.as_ptr()).rank;
                        match (*cur.as_ptr()).right {
                            Link::Child(right) => {
                                path.push((cur, Dir::Right));
                                cur = right;
                            }
                            Link::Thread(_) => {
                                return (
                                    self.insert_leaf(path, cur, Dir::Right, value),
                                    false,
                                    pos + 1,
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    /// Pure descent. The returned position is the running sum of the ranks of
    /// every node the descent moved right from, plus the match's own rank.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<(NonNull<Node<T>>, usize)>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut cur = self.root()?;
        let mut pos = 0;
        loop {
            unsafe {
                match key.cmp(value_ref(cur).borrow()) {
                    Ordering::Equal => return Some((cur, pos + (*cur.as_ptr()).rank)),
                    Ordering::Less => cur = (*cur.as_ptr()).left.as_child()?,
                    Ordering::Greater => {
                        pos += (*cur.as_ptr()).rank;
                        cur = (*cur.as_ptr()).right.as_child()?;
                    }
                }
            }
        }
    }

    /// Like [`Self::search`], but a miss yields the smallest value strictly
    /// greater than `key`; `None` only when no such value exists.
    pub(crate) fn search_next<Q>(&self, key: &Q) -> Option<(NonNull<Node<T>>, usize)>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut cur = self.root()?;
        let mut pos = 0;
        let mut after = None;
        loop {
            unsafe {
                match key.cmp(value_ref(cur).borrow()) {
                    Ordering::Equal => return Some((cur, pos + (*cur.as_ptr()).rank)),
                    Ordering::Less => {
                        after = Some((cur, pos + (*cur.as_ptr()).rank));
                        match (*cur.as_ptr()).left.as_child() {
                            Some(left) => cur = left,
                            None => return after,
                        }
                    }
                    Ordering::Greater => {
                        pos += (*cur.as_ptr()).rank;
                        match (*cur.as_ptr()).right.as_child() {
                            Some(right) => cur = right,
                            None => return after,
                        }
                    }
                }
            }
        }
    }

    /// Removes the value equal to `key`, if present, and returns it.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut cur = self.root()?;
        let mut path = Path::new();
        loop {
            unsafe {
                match key.cmp(value_ref(cur).borrow()) {
                    Ordering::Equal => {
                        let node = self.unlink(path, cur);
                        return Some(Node::dealloc(node));
                    }
                    Ordering::Less => {
                        path.push((cur, Dir::Left));
                        cur = (*cur.as_ptr()).left.as_child()?;
                    }
                    Ordering::Greater => {
                        path.push((cur, Dir::Right));
                        cur = (*cur.as_ptr()).right.as_child()?;
                    }
                }
            }
        }
    }

    // ─── Positional operations ───────────────────────────────────────────

    /// Inserts `value` so that exactly `min(pos, len)` existing values
    /// precede it. Rank-guided: no ordering on `T` is consulted.
    pub(crate) fn insert_at(&mut self, pos: usize, value: T) -> NonNull<Node<T>> {
        let Some(root) = self.root() else {
            return unsafe { self.insert_first(value) };
        };
        let mut before = pos.min(self.len());
        let mut path = Path::new();
        let mut cur = root;
        loop {
            unsafe {
                if before < (*cur.as_ptr()).rank {
                    match (*cur.as_ptr()).left {
                        Link::Child(left) => {
                            path.push((cur, Dir::Left));
                            cur = left;
                        }
                        Link::Thread(_) => {
                            return self.insert_leaf(path, cur, Dir::Left, value);
                        }
                    }
                } else {
                    before -= (*cur.as_ptr()).rank;
                    match (*cur.as_ptr()).right {
                        Link::Child(right) => {
                            path.push((cur, Dir::Right));
                            cur = right;
                        }
                        Link::Thread(_) => {
                            return self.insert_leaf(path, cur, Dir::Right, value);
                        }
                    }
                }
            }
        }
    }

    /// Finds the node at 1-based ordinal `pos` by the same rank-guided
    /// descent as search, comparing against accumulated rank instead of
    /// value order. `None` if `pos` is 0 or past the end.
    pub(crate) fn find_at(&self, pos: usize) -> Option<NonNull<Node<T>>> {
        if pos == 0 {
            return None;
        }
        let mut cur = self.root()?;
        let mut remaining = pos;
        loop {
            unsafe {
                match remaining.cmp(&(*cur.as_ptr()).rank) {
                    Ordering::Equal => return Some(cur),
                    Ordering::Less => cur = (*cur.as_ptr()).left.as_child()?,
                    Ordering::Greater => {
                        remaining -= (*cur.as_ptr()).rank;
                        cur = (*cur.as_ptr()).right.as_child()?;
                    }
                }
            }
        }
    }

    /// Removes and returns the value at 1-based ordinal `pos`, or `None` if
    /// `pos` is 0 or past the end.
    pub(crate) fn erase_at(&mut self, pos: usize) -> Option<T> {
        if pos == 0 {
            return None;
        }
        let mut cur = self.root()?;
        let mut remaining = pos;
        let mut path = Path::new();
        loop {
            unsafe {
                match remaining.cmp(&(*cur.as_ptr()).rank) {
                    Ordering::Equal => {
                        let node = self.unlink(path, cur);
                        return Some(Node::dealloc(node));
                    }
                    Ordering::Less => {
                        path.push((cur, Dir::Left));
                        cur = (*cur.as_ptr()).left.as_child()?;
                    }
                    Ordering::Greater => {
                        remaining -= (*cur.as_ptr()).rank;
                        path.push((cur, Dir::Right));
                        cur = (*cur.as_ptr()).right.as_child()?;
                    }
                }
            }
        }
    }

    pub(crate) fn pop_first(&mut self) -> Option<T> {
        self.root()?;
        unsafe {
            let node = self.pop_first_node();
            Some(Node::dealloc(node))
        }
    }

    pub(crate) fn pop_last(&mut self) -> Option<T> {
        self.root()?;
        unsafe {
            let node = self.pop_last_node();
            Some(Node::dealloc(node))
        }
    }

    /// Unlinks and returns the leftmost node.
    ///
    /// # Safety
    ///
    /// The tree must be non-empty.
    unsafe fn pop_first_node(&mut self) -> NonNull<Node<T>> {
        unsafe {
            let mut cur = (*self.head.as_ptr()).left.target();
            let mut path = Path::new();
            while let Link::Child(left) = (*cur.as_ptr()).left {
                path.push((cur, Dir::Left));
                cur = left;
            }
            self.unlink(path, cur)
        }
    }

    /// Unlinks and returns the rightmost node.
    ///
    /// # Safety
    ///
    /// The tree must be non-empty.
    unsafe fn pop_last_node(&mut self) -> NonNull<Node<T>> {
        unsafe {
            let mut cur = (*self.head.as_ptr()).left.target();
            let mut path = Path::new();
            while let Link::Child(right) = (*cur.as_ptr()).right {
                path.push((cur, Dir::Right));
                cur = right;
            }
            self.unlink(path, cur)
        }
    }

    // ─── Removal plumbing ────────────────────────────────────────────────

    fn slot_of(&self, path: &Path<T>) -> (NonNull<Node<T>>, Dir) {
        path.last().copied().unwrap_or((self.head, Dir::Left))
    }

    /// Unlinks `target` from the tree; `path` holds the descent entries
    /// above it. A node with two real children is replaced by its structural
    /// predecessor (the rightmost node of its left subtree) rather than by a
    /// value move, so every other node reference stays valid. Repairs the
    /// threads exposed at the splice points, decrements the rank of every
    /// ancestor that lost a node from its left subtree, and retraces with the
    /// shrink-side rotations. The returned node's links are stale.
    unsafe fn unlink(&mut self, mut path: Path<T>, target: NonNull<Node<T>>) -> NonNull<Node<T>> {
        unsafe {
            for &(ancestor, dir) in &path {
                if dir == Dir::Left {
                    (*ancestor.as_ptr()).rank -= 1;
                }
            }
            match ((*target.as_ptr()).left, (*target.as_ptr()).right) {
                (Link::Thread(pred), Link::Thread(succ)) => {
                    // Leaf: the parent slot reverts to a thread.
                    let (parent, dir) = self.slot_of(&path);
                    match dir {
                        Dir::Left => (*parent.as_ptr()).left = Link::Thread(pred),
                        Dir::Right => (*parent.as_ptr()).right = Link::Thread(succ),
                    }
                }
                (Link::Thread(pred), Link::Child(right)) => {
                    let (parent, dir) = self.slot_of(&path);
                    (*parent.as_ptr()).set_child(dir, right);
                    (*leftmost(right).as_ptr()).left = Link::Thread(pred);
                }
                (Link::Child(left), Link::Thread(succ)) => {
                    let (parent, dir) = self.slot_of(&path);
                    (*parent.as_ptr()).set_child(dir, left);
                    (*rightmost(left).as_ptr()).right = Link::Thread(succ);
                }
                (Link::Child(left), Link::Child(right)) => {
                    // Two children: splice the structural predecessor into
                    // `target`'s place, keeping its node identity.
                    let spliced_at = path.len();
                    path.push((target, Dir::Left));
                    let mut pred = left;
                    while let Link::Child(next) = (*pred.as_ptr()).right {
                        path.push((pred, Dir::Right));
                        pred = next;
                    }
                    if pred != left {
                        // The predecessor's old parent takes over its left
                        // subtree; an empty one collapses into a thread.
                        let &(pred_parent, _) = path.last().unwrap();
                        match (*pred.as_ptr()).left {
                            Link::Child(inner) => {
                                (*pred_parent.as_ptr()).right = Link::Child(inner);
                            }
                            Link::Thread(_) => {
                                (*pred_parent.as_ptr()).right = Link::Thread(pred);
                            }
                        }
                        (*pred.as_ptr()).left = Link::Child(left);
                    }
                    (*pred.as_ptr()).right = Link::Child(right);
                    (*pred.as_ptr()).balance = (*target.as_ptr()).balance;
                    (*pred.as_ptr()).rank = (*target.as_ptr()).rank - 1;
                    path[spliced_at] = (pred, Dir::Left);
                    (*leftmost(right).as_ptr()).left = Link::Thread(pred);
                    let (parent, dir) = if spliced_at == 0 {
                        (self.head, Dir::Left)
                    } else {
                        path[spliced_at - 1]
                    };
                    (*parent.as_ptr()).set_child(dir, pred);
                }
            }
            if let Link::Child(mut root) = (*self.head.as_ptr()).left {
                Self::retrace_shrink(&mut path, &mut root);
                (*self.head.as_ptr()).left = Link::Child(root);
            }
            target
        }
    }

    // ─── Deep copy ───────────────────────────────────────────────────────

    /// Structure-preserving deep clone in two passes: the first clones every
    /// real node and its scalar fields, pointing thread slots at the new head
    /// as placeholders; the second walks the clone in order and rewires each
    /// placeholder to the neighbor it stands for. One pass cannot do it: a
    /// thread may reference a node the traversal has not reached yet.
    pub(crate) fn deep_clone(&self) -> Self
    where
        T: Clone,
    {
        let clone = Self::new();
        if let Some(root) = self.root() {
            unsafe {
                let cloned = Self::clone_subtree(root, clone.head);
                (*clone.head.as_ptr()).left = Link::Child(cloned);
                let mut prev = clone.head;
                Self::wire_threads(cloned, &mut prev, clone.head);
            }
        }
        clone
    }

    unsafe fn clone_subtree(src: NonNull<Node<T>>, head: NonNull<Node<T>>) -> NonNull<Node<T>>
    where
        T: Clone,
    {
        unsafe {
            let node = Node::alloc(value_ref::<T>(src).clone());
            (*node.as_ptr()).rank = (*src.as_ptr()).rank;
            (*node.as_ptr()).balance = (*src.as_ptr()).balance;
            (*node.as_ptr()).left = match (*src.as_ptr()).left {
                Link::Child(left) => Link::Child(Self::clone_subtree(left, head)),
                Link::Thread(_) => Link::Thread(head),
            };
            (*node.as_ptr()).right = match (*src.as_ptr()).right {
                Link::Child(right) => Link::Child(Self::clone_subtree(right, head)),
                Link::Thread(_) => Link::Thread(head),
            };
            node
        }
    }

    unsafe fn wire_threads(
        node: NonNull<Node<T>>,
        prev: &mut NonNull<Node<T>>,
        head: NonNull<Node<T>>,
    ) {
        unsafe {
            if let Link::Child(left) = (*node.as_ptr()).left {
                Self::wire_threads(left, prev, head);
            } else {
                (*node.as_ptr()).left = Link::Thread(*prev);
            }
            if *prev != head && (*prev.as_ptr()).right.is_thread() {
                (*prev.as_ptr()).right = Link::Thread(node);
            }
            *prev = node;
            if let Link::Child(right) = (*node.as_ptr()).right {
                Self::wire_threads(right, prev, head);
            }
            // The last node's right slot keeps its head placeholder, which is
            // exactly the boundary thread it needs.
        }
    }

    // ─── Concatenate & split ─────────────────────────────────────────────

    /// Detaches the whole data subtree, leaving this tree empty.
    fn take_piece(&mut self) -> Piece<T> {
        let piece = Piece {
            root: self.root(),
            height: self.height(),
            size: self.len(),
        };
        unsafe { (*self.head.as_ptr()).left = Link::Thread(self.head) };
        piece
    }

    /// Joins `left`, the bridge node `mid`, and `right` into one balanced
    /// piece by splicing the bridge onto the taller side's spine where the
    /// heights meet, then retracing upward with the grow-side rotations.
    ///
    /// Boundary threads inside the pieces must already reference `mid` where
    /// they border it. `left_thread`/`right_thread` supply the thread target
    /// for `mid`'s slot when the corresponding piece is empty and `mid` ends
    /// up on the spine rather than above it; an empty piece deep-attached as
    /// a leaf threads to its spine parent instead.
    unsafe fn join(
        left: Piece<T>,
        left_thread: NonNull<Node<T>>,
        mid: NonNull<Node<T>>,
        right: Piece<T>,
        right_thread: NonNull<Node<T>>,
    ) -> Piece<T> {
        unsafe {
            let size = left.size + right.size + 1;
            if left.height.abs_diff(right.height) <= 1 {
                (*mid.as_ptr()).left = match left.root {
                    Some(root) => Link::Child(root),
                    None => Link::Thread(left_thread),
                };
                (*mid.as_ptr()).right = match right.root {
                    Some(root) => Link::Child(root),
                    None => Link::Thread(right_thread),
                };
                (*mid.as_ptr()).rank = left.size + 1;
                (*mid.as_ptr()).balance = match left.height.cmp(&right.height) {
                    Ordering::Greater => Balance::LeftHigh,
                    Ordering::Equal => Balance::Even,
                    Ordering::Less => Balance::RightHigh,
                };
                return Piece {
                    root: Some(mid),
                    height: left.height.max(right.height) + 1,
                    size,
                };
            }
            if left.height > right.height {
                // Splice down the right spine of the left piece.
                let root = left.root.unwrap();
                let mut path = Path::new();
                let mut cur = root;
                let mut h = left.height;
                let mut sz = left.size;
                loop {
                    let hr = match (*cur.as_ptr()).balance {
                        Balance::LeftHigh => h - 2,
                        _ => h - 1,
                    };
                    let sr = sz - (*cur.as_ptr()).rank;
                    if hr > right.height + 1 {
                        path.push((cur, Dir::Right));
                        h = hr;
                        sz = sr;
                        cur = (*cur.as_ptr()).right.target();
                        continue;
                    }
                    (*mid.as_ptr()).left = match (*cur.as_ptr()).right {
                        Link::Child(sub) => Link::Child(sub),
                        Link::Thread(_) => Link::Thread(cur),
                    };
                    (*mid.as_ptr()).right = match right.root {
                        Some(root) => Link::Child(root),
                        None => Link::Thread(right_thread),
                    };
                    (*mid.as_ptr()).rank = sr + 1;
                    (*mid.as_ptr()).balance = match hr.cmp(&right.height) {
                        Ordering::Greater => Balance::LeftHigh,
                        Ordering::Equal => Balance::Even,
                        Ordering::Less => Balance::RightHigh,
                    };
                    (*cur.as_ptr()).right = Link::Child(mid);
                    path.push((cur, Dir::Right));
                    let mut new_root = root;
                    let grew = Self::retrace_grow(&mut path, &mut new_root);
                    return Piece {
                        root: Some(new_root),
                        height: left.height + usize::from(grew),
                        size,
                    };
                }
            }
            // Mirror: splice down the left spine of the right piece. Every
            // spine node gains the left piece plus the bridge in its left
            // subtree, so ranks are bumped on the way down.
            let root = right.root.unwrap();
            let mut path = Path::new();
            let mut cur = root;
            let mut h = right.height;
            loop {
                let hl = match (*cur.as_ptr()).balance {
                    Balance::RightHigh => h - 2,
                    _ => h - 1,
                };
                (*cur.as_ptr()).rank += left.size + 1;
                if hl > left.height + 1 {
                    path.push((cur, Dir::Left));
                    h = hl;
                    cur = (*cur.as_ptr()).left.target();
                    continue;
                }
                (*mid.as_ptr()).right = match (*cur.as_ptr()).left {
                    Link::Child(sub) => Link::Child(sub),
                    Link::Thread(_) => Link::Thread(cur),
                };
                (*mid.as_ptr()).left = match left.root {
                    Some(root) => Link::Child(root),
                    None => Link::Thread(left_thread),
                };
                (*mid.as_ptr()).rank = left.size + 1;
                (*mid.as_ptr()).balance = match left.height.cmp(&hl) {
                    Ordering::Greater => Balance::LeftHigh,
                    Ordering::Equal => Balance::Even,
                    Ordering::Less => Balance::RightHigh,
                };
                (*cur.as_ptr()).left = Link::Child(mid);
                path.push((cur, Dir::Left));
                let mut new_root = root;
                let grew = Self::retrace_grow(&mut path, &mut new_root);
                return Piece {
                    root: Some(new_root),
                    height: right.height + usize::from(grew),
                    size,
                };
            }
        }
    }

    /// Appends every value of `other`, consuming it.
    ///
    /// Assumes, without checking, that every value of `self` orders before
    /// every value of `other`; violating that leaves the tree unsorted for
    /// the sorted operations (the structure itself stays valid). Removes the
    /// boundary node of the side whose tree is taller or equal as the bridge,
    /// descends the taller tree until the heights meet, splices the bridge
    /// there, and rebalances back up. O(log n).
    pub(crate) fn concat(&mut self, mut other: RawRankTree<T>) {
        unsafe {
            let Some(other_root) = other.root() else {
                return;
            };
            if self.root().is_none() {
                // Steal the whole subtree; only its boundary threads still
                // reference the old head.
                (*leftmost(other_root).as_ptr()).left = Link::Thread(self.head);
                (*rightmost(other_root).as_ptr()).right = Link::Thread(self.head);
                (*self.head.as_ptr()).left = Link::Child(other_root);
                (*other.head.as_ptr()).left = Link::Thread(other.head);
                return;
            }
            let bridge = if self.height() >= other.height() {
                self.pop_last_node()
            } else {
                other.pop_first_node()
            };
            let left = self.take_piece();
            let right = other.take_piece();
            if let Some(root) = left.root {
                (*rightmost(root).as_ptr()).right = Link::Thread(bridge);
            }
            if let Some(root) = right.root {
                (*leftmost(root).as_ptr()).left = Link::Thread(bridge);
                (*rightmost(root).as_ptr()).right = Link::Thread(self.head);
            }
            let joined = Self::join(left, self.head, bridge, right, self.head);
            if let Some(root) = joined.root {
                (*self.head.as_ptr()).left = Link::Child(root);
            }
        }
    }

    /// Splits off everything after the first `pos` values into a new tree.
    /// Inverse of [`Self::concat`]: both root-to-split paths are rebuilt
    /// bottom-up by rejoining the O(log n) subtrees hanging off the descent,
    /// reusing the bridge technique. O(log n).
    ///
    /// # Panics
    ///
    /// Panics if `pos > len`.
    pub(crate) fn split_off(&mut self, pos: usize) -> RawRankTree<T> {
        let len = self.len();
        assert!(pos <= len, "split position {pos} out of bounds (len {len})");
        let other = Self::new();
        if pos == len {
            return other;
        }
        unsafe {
            if pos == 0 {
                if let Some(root) = self.root() {
                    (*leftmost(root).as_ptr()).left = Link::Thread(other.head);
                    (*rightmost(root).as_ptr()).right = Link::Thread(other.head);
                    (*other.head.as_ptr()).left = Link::Child(root);
                    (*self.head.as_ptr()).left = Link::Thread(self.head);
                }
                return other;
            }
            // 1 <= pos < len. Record, for every step of the rank-guided
            // descent to the node at ordinal `pos`, the subtree hanging off
            // the untaken side along with its height and size.
            let root = (*self.head.as_ptr()).left.target();
            let old_rightmost = rightmost(root);
            let mut path: SmallVec<[(NonNull<Node<T>>, Dir, Piece<T>); 16]> = SmallVec::new();
            let mut cur = root;
            let mut h = self.height();
            let mut sz = len;
            let mut remaining = pos;
            let (left_h, right_h) = loop {
                let hl = match (*cur.as_ptr()).balance {
                    Balance::RightHigh => h - 2,
                    _ => h - 1,
                };
                let hr = match (*cur.as_ptr()).balance {
                    Balance::LeftHigh => h - 2,
                    _ => h - 1,
                };
                let rank = (*cur.as_ptr()).rank;
                match remaining.cmp(&rank) {
                    Ordering::Equal => break (hl, hr),
                    Ordering::Less => {
                        let off = Piece {
                            root: (*cur.as_ptr()).right.as_child(),
                            height: hr,
                            size: sz - rank,
                        };
                        path.push((cur, Dir::Left, off));
                        h = hl;
                        sz = rank - 1;
                        cur = (*cur.as_ptr()).left.target();
                    }
                    Ordering::Greater => {
                        let off = Piece {
                            root: (*cur.as_ptr()).left.as_child(),
                            height: hl,
                            size: rank - 1,
                        };
                        path.push((cur, Dir::Right, off));
                        remaining -= rank;
                        h = hr;
                        sz -= rank;
                        cur = (*cur.as_ptr()).right.target();
                    }
                }
            };
            let split = cur;
            // Predecessor thread of the split node's successor; it crosses
            // into the new tree and is repaired at the end.
            let succ_leftmost = (*split.as_ptr()).right.as_child().map(|r| leftmost(r));
            let before = Piece {
                root: (*split.as_ptr()).left.as_child(),
                height: left_h,
                size: (*split.as_ptr()).rank - 1,
            };
            let mut lower = Piece {
                root: (*split.as_ptr()).right.as_child(),
                height: right_h,
                size: sz - (*split.as_ptr()).rank,
            };
            // The split node becomes the last value of the retained tree, so
            // its successor thread must terminate at this tree's head.
            let mut upper = Self::join(
                before,
                (*split.as_ptr()).left.target(),
                split,
                Piece::EMPTY,
                self.head,
            );
            for &(node, dir, off) in path.iter().rev() {
                match dir {
                    // `node` and its left piece precede the split point.
                    Dir::Right => {
                        upper = Self::join(
                            off,
                            (*node.as_ptr()).left.target(),
                            node,
                            upper,
                            self.head,
                        );
                    }
                    Dir::Left => {
                        lower = Self::join(
                            lower,
                            other.head,
                            node,
                            off,
                            (*node.as_ptr()).right.target(),
                        );
                    }
                }
            }
            if let Some(root) = upper.root {
                (*self.head.as_ptr()).left = Link::Child(root);
            }
            if let Some(root) = lower.root {
                (*other.head.as_ptr()).left = Link::Child(root);
            }
            if let Some(node) = succ_leftmost {
                (*node.as_ptr()).left = Link::Thread(other.head);
            }
            (*old_rightmost.as_ptr()).right = Link::Thread(other.head);
        }
        other
    }
}

impl<T> Drop for RawRankTree<T> {
    fn drop(&mut self) {
        self.clear();
        unsafe { Node::dealloc_head(self.head) };
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    impl<T> RawRankTree<T> {
        /// Validates every structural invariant: the sentinel's slots, each
        /// node's balance factor against the real subtree heights, each
        /// node's rank against the real left-subtree size, and every thread
        /// against the actual in-order neighbor. Panics with a descriptive
        /// message on any violation. Intended for tests.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();
            let mut order: Vec<NonNull<Node<T>>> = Vec::new();
            unsafe {
                match (*self.head.as_ptr()).right {
                    Link::Thread(target) if target == self.head => {}
                    _ => errors.push("head right slot must thread back to head".into()),
                }
                match (*self.head.as_ptr()).left {
                    Link::Thread(target) => {
                        if target != self.head {
                            errors.push("empty tree's head left slot must thread to head".into());
                        }
                    }
                    Link::Child(root) => {
                        Self::check_node(root, &mut order, &mut errors);
                    }
                }
                for (i, &node) in order.iter().enumerate() {
                    if let Link::Thread(pred) = (*node.as_ptr()).left {
                        let expected = if i == 0 { self.head } else { order[i - 1] };
                        if pred != expected {
                            errors.push(format!("left thread of node {i} misses its predecessor"));
                        }
                    }
                    if let Link::Thread(succ) = (*node.as_ptr()).right {
                        let expected = if i + 1 == order.len() { self.head } else { order[i + 1] };
                        if succ != expected {
                            errors.push(format!("right thread of node {i} misses its successor"));
                        }
                    }
                }
            }
            if self.len() != order.len() {
                errors.push(format!(
                    "len mismatch: len()={}, actual count={}",
                    self.len(),
                    order.len()
                ));
            }
            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns (height, size) of the subtree at `node`, collecting the
        /// in-order node sequence and any violations.
        unsafe fn check_node(
            node: NonNull<Node<T>>,
            order: &mut Vec<NonNull<Node<T>>>,
            errors: &mut Vec<String>,
        ) -> (usize, usize) {
            unsafe {
                let (left_height, left_size) = match (*node.as_ptr()).left {
                    Link::Child(left) => Self::check_node(left, order, errors),
                    Link::Thread(_) => (0, 0),
                };
                let at = order.len();
                order.push(node);
                let (right_height, right_size) = match (*node.as_ptr()).right {
                    Link::Child(right) => Self::check_node(right, order, errors),
                    Link::Thread(_) => (0, 0),
                };
                if (*node.as_ptr()).rank != left_size + 1 {
                    errors.push(format!(
                        "rank mismatch at node {at}: stored={}, left subtree size={left_size}",
                        (*node.as_ptr()).rank
                    ));
                }
                if left_height.abs_diff(right_height) > 1 {
                    errors.push(format!(
                        "balance violated at node {at}: heights {left_height} and {right_height}"
                    ));
                }
                let expected = match left_height.cmp(&right_height) {
                    Ordering::Greater => Balance::LeftHigh,
                    Ordering::Equal => Balance::Even,
                    Ordering::Less => Balance::RightHigh,
                };
                if (*node.as_ptr()).balance != expected {
                    errors.push(format!(
                        "balance factor wrong at node {at}: stored={:?}, heights {left_height}/{right_height}",
                        (*node.as_ptr()).balance
                    ));
                }
                (left_height.max(right_height) + 1, left_size + right_size + 1)
            }
        }
    }

    fn collect<T: Copy>(tree: &RawRankTree<T>) -> Vec<T> {
        let mut values = Vec::new();
        tree.walk(&mut |&v| values.push(v));
        values
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1000).prop_map(Op::Insert),
            1 => (0i32..1000).prop_map(Op::Remove),
        ]
    }

    #[derive(Clone, Debug)]
    enum SeqOp {
        InsertAt(usize, i32),
        EraseAt(usize),
    }

    fn seq_op_strategy() -> impl Strategy<Value = SeqOp> {
        prop_oneof![
            2 => (0usize..600, 0i32..1000).prop_map(|(at, v)| SeqOp::InsertAt(at, v)),
            1 => (0usize..600).prop_map(SeqOp::EraseAt),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn invariants_maintained_after_sorted_operations(ops in prop::collection::vec(op_strategy(), 0..500)) {
            let mut tree: RawRankTree<i32> = RawRankTree::new();
            let mut model: BTreeSet<i32> = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Insert(value) => {
                        let (_, found, _) = tree.search_or_insert(value);
                        prop_assert_eq!(found, !model.insert(value));
                    }
                    Op::Remove(value) => {
                        prop_assert_eq!(tree.remove(&value).is_some(), model.remove(&value));
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }
            prop_assert_eq!(collect(&tree), model.iter().copied().collect::<Vec<_>>());
        }

        #[test]
        fn search_reports_sorted_positions(values in prop::collection::btree_set(0i32..1000, 1..200)) {
            let mut tree: RawRankTree<i32> = RawRankTree::new();
            for &value in &values {
                tree.search_or_insert(value);
            }

            for (i, &value) in values.iter().enumerate() {
                let (node, pos) = tree.search(&value).expect("inserted value must be found");
                prop_assert_eq!(unsafe { *value_ref(node) }, value);
                prop_assert_eq!(pos, i + 1, "wrong position for {}", value);
                prop_assert_eq!(tree.find_at(i + 1), Some(node));
            }
            prop_assert!(tree.find_at(0).is_none());
            prop_assert!(tree.find_at(values.len() + 1).is_none());
        }

        #[test]
        fn invariants_maintained_after_positional_operations(ops in prop::collection::vec(seq_op_strategy(), 0..300)) {
            let mut tree: RawRankTree<i32> = RawRankTree::new();
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    SeqOp::InsertAt(at, value) => {
                        tree.insert_at(at, value);
                        model.insert(at.min(model.len()), value);
                    }
                    SeqOp::EraseAt(at) => {
                        if model.is_empty() {
                            prop_assert!(tree.erase_at(at).is_none());
                        } else {
                            let pos = at % model.len() + 1;
                            prop_assert_eq!(tree.erase_at(pos), Some(model.remove(pos - 1)));
                        }
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }
            prop_assert_eq!(collect(&tree), model);
        }

        #[test]
        fn split_concat_roundtrip(len in 0usize..200, cut in 0usize..200) {
            let mut tree: RawRankTree<i32> = RawRankTree::new();
            for i in 0..len as i32 {
                tree.search_or_insert(i);
            }
            let cut = cut.min(len);

            let rest = tree.split_off(cut);
            tree.validate_invariants();
            rest.validate_invariants();
            prop_assert_eq!(tree.len(), cut);
            prop_assert_eq!(rest.len(), len - cut);
            prop_assert_eq!(collect(&tree), (0..cut as i32).collect::<Vec<_>>());
            prop_assert_eq!(collect(&rest), (cut as i32..len as i32).collect::<Vec<_>>());

            tree.concat(rest);
            tree.validate_invariants();
            prop_assert_eq!(collect(&tree), (0..len as i32).collect::<Vec<_>>());
        }

        #[test]
        fn deep_clone_is_independent(values in prop::collection::btree_set(0i32..1000, 0..100)) {
            let mut tree: RawRankTree<i32> = RawRankTree::new();
            for &value in &values {
                tree.search_or_insert(value);
            }

            let copy = tree.deep_clone();
            copy.validate_invariants();
            prop_assert_eq!(collect(&copy), collect(&tree));

            tree.clear();
            copy.validate_invariants();
            prop_assert_eq!(copy.len(), values.len());
        }
    }

    #[test]
    fn empty_tree_operations() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        tree.validate_invariants();

        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.search(&0).is_none());
        assert!(tree.search_next(&0).is_none());
        assert!(tree.remove(&0).is_none());
        assert!(tree.find_at(1).is_none());
        assert!(tree.erase_at(1).is_none());
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());

        let other = tree.split_off(0);
        tree.validate_invariants();
        other.validate_invariants();
        assert!(other.is_empty());
    }

    #[test]
    fn ascending_insertions_stay_balanced() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        for i in 1..=13 {
            tree.search_or_insert(i);
            tree.validate_invariants();
        }

        assert_eq!(collect(&tree), (1..=13).collect::<Vec<_>>());
        // Rotations must have pulled the midpoint up to the root.
        let root = tree.root().expect("non-empty");
        unsafe {
            assert_eq!(*value_ref(root), 8);
            assert_eq!((*root.as_ptr()).rank, 8);
        }
        assert!(tree.height() <= 5);
    }

    #[test]
    fn search_next_falls_forward_to_successor() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        for value in [10, 20, 30, 40] {
            tree.search_or_insert(value);
        }

        let (node, pos) = tree.search_next(&20).expect("exact hit");
        assert_eq!((unsafe { *value_ref(node) }, pos), (20, 2));

        let (node, pos) = tree.search_next(&25).expect("successor exists");
        assert_eq!((unsafe { *value_ref(node) }, pos), (30, 3));

        let (node, pos) = tree.search_next(&5).expect("successor exists");
        assert_eq!((unsafe { *value_ref(node) }, pos), (10, 1));

        assert!(tree.search_next(&40).is_some());
        assert!(tree.search_next(&41).is_none());
    }

    #[test]
    fn thread_walk_covers_both_directions() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        for value in [5, 3, 8, 1, 4, 7, 9] {
            tree.search_or_insert(value);
        }

        let mut forward = Vec::new();
        let mut cursor = tree.first();
        while let Some(node) = cursor {
            forward.push(unsafe { *value_ref(node) });
            cursor = unsafe { tree.next(node) };
        }
        assert_eq!(forward, [1, 3, 4, 5, 7, 8, 9]);

        let mut backward = Vec::new();
        let mut cursor = tree.last();
        while let Some(node) = cursor {
            backward.push(unsafe { *value_ref(node) });
            cursor = unsafe { tree.prev(node) };
        }
        backward.reverse();
        assert_eq!(backward, forward);
    }

    #[test]
    fn two_child_removal_splices_predecessor() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        for i in 1..=7 {
            tree.search_or_insert(i);
        }
        // The root (4) has two children; removing it exercises the splice.
        assert_eq!(tree.remove(&4), Some(4));
        tree.validate_invariants();
        assert_eq!(collect(&tree), [1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn concat_onto_empty_and_of_empty() {
        let mut tree: RawRankTree<i32> = RawRankTree::new();
        let mut other: RawRankTree<i32> = RawRankTree::new();
        for i in 0..10 {
            other.search_or_insert(i);
        }

        tree.concat(other);
        tree.validate_invariants();
        assert_eq!(tree.len(), 10);

        tree.concat(RawRankTree::new());
        tree.validate_invariants();
        assert_eq!(collect(&tree), (0..10).collect::<Vec<_>>());
    }
}
