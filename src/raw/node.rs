use core::mem::MaybeUninit;
use core::ptr::NonNull;

use alloc::boxed::Box;

/// One edge slot of a node.
///
/// A slot either holds a real child or, when the subtree in that direction is
/// empty, a thread to the in-order neighbor: the left slot threads to the
/// predecessor, the right slot to the successor. Boundary nodes thread to the
/// tree's head sentinel.
pub(crate) enum Link<T> {
    Child(NonNull<Node<T>>),
    Thread(NonNull<Node<T>>),
}

// Derived Copy/Clone would require `T: Copy`.
impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Link<T> {}

impl<T> Link<T> {
    /// Returns true if this slot holds a real child.
    pub(crate) fn is_child(self) -> bool {
        matches!(self, Link::Child(_))
    }

    /// Returns true if this slot holds a thread.
    pub(crate) fn is_thread(self) -> bool {
        matches!(self, Link::Thread(_))
    }

    /// Returns the child pointer, or `None` for a thread.
    pub(crate) fn as_child(self) -> Option<NonNull<Node<T>>> {
        match self {
            Link::Child(child) => Some(child),
            Link::Thread(_) => None,
        }
    }

    /// Returns the pointed-to node regardless of the slot's tag.
    pub(crate) fn target(self) -> NonNull<Node<T>> {
        match self {
            Link::Child(node) | Link::Thread(node) => node,
        }
    }
}

/// Which child subtree of a node is the taller one, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Balance {
    LeftHigh,
    Even,
    RightHigh,
}

/// Direction taken out of a node during a descent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Dir {
    Left,
    Right,
}

/// A tree node.
///
/// `rank` is 1 plus the number of nodes in this node's own left subtree; it is
/// local to the node and global ordinal positions are recovered by summing
/// ranks over the right turns of a descent. The head sentinel is the one node
/// whose `value` is never initialized.
pub(crate) struct Node<T> {
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
    pub(crate) balance: Balance,
    pub(crate) rank: usize,
    pub(crate) value: MaybeUninit<T>,
}

impl<T> Node<T> {
    /// Boxes a new data node. Both slots are placeholder threads until the
    /// caller wires the node into a tree.
    pub(crate) fn alloc(value: T) -> NonNull<Node<T>> {
        let node = Box::new(Node {
            left: Link::Thread(NonNull::dangling()),
            right: Link::Thread(NonNull::dangling()),
            balance: Balance::Even,
            rank: 1,
            value: MaybeUninit::new(value),
        });
        NonNull::from(Box::leak(node))
    }

    /// Boxes a head sentinel whose slots thread back to itself, the empty
    /// tree state.
    pub(crate) fn alloc_head() -> NonNull<Node<T>> {
        let node = Box::new(Node {
            left: Link::Thread(NonNull::dangling()),
            right: Link::Thread(NonNull::dangling()),
            balance: Balance::Even,
            rank: 0,
            value: MaybeUninit::uninit(),
        });
        let ptr = NonNull::from(Box::leak(node));
        unsafe {
            (*ptr.as_ptr()).left = Link::Thread(ptr);
            (*ptr.as_ptr()).right = Link::Thread(ptr);
        }
        ptr
    }

    /// Frees a data node and returns its value.
    ///
    /// # Safety
    ///
    /// `node` must have been produced by [`Node::alloc`], must not be the head
    /// sentinel, and must not be reachable from any tree afterwards.
    pub(crate) unsafe fn dealloc(node: NonNull<Node<T>>) -> T {
        let boxed = unsafe { Box::from_raw(node.as_ptr()) };
        unsafe { boxed.value.assume_init() }
    }

    /// Frees a head sentinel without touching its (uninitialized) value.
    ///
    /// # Safety
    ///
    /// `head` must have been produced by [`Node::alloc_head`] and must not be
    /// referenced by any remaining node.
    pub(crate) unsafe fn dealloc_head(head: NonNull<Node<T>>) {
        drop(unsafe { Box::from_raw(head.as_ptr()) });
    }

    /// Points the slot in the given direction at a real child.
    pub(crate) fn set_child(&mut self, dir: Dir, child: NonNull<Node<T>>) {
        match dir {
            Dir::Left => self.left = Link::Child(child),
            Dir::Right => self.right = Link::Child(child),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    // Both variants carry a payload, so a slot is a tag word plus a pointer.
    assert_eq_size!(Link<u64>, [usize; 2]);
    assert_eq_size!(Balance, u8);

    #[test]
    fn alloc_dealloc_roundtrip() {
        let node = Node::alloc(7_u32);
        assert!(unsafe { node.as_ref() }.left.is_thread());
        assert_eq!(unsafe { node.as_ref() }.rank, 1);
        assert_eq!(unsafe { Node::dealloc(node) }, 7);
    }

    #[test]
    fn fresh_head_threads_to_itself() {
        let head = Node::<u8>::alloc_head();
        assert_eq!(unsafe { head.as_ref() }.left.target(), head);
        assert_eq!(unsafe { head.as_ref() }.right.target(), head);
        unsafe { Node::dealloc_head(head) };
    }
}
