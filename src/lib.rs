//! A threaded, ranked AVL tree for Rust.
//!
//! This crate provides [`RankTree`], a height-balanced binary search tree in
//! which every element has a one-based ordinal position, usable through two
//! surfaces over the same structure:
//!
//! - **Sorted access** - [`search_or_insert`](RankTree::search_or_insert),
//!   [`contains`](RankTree::contains), [`remove`](RankTree::remove), driven
//!   by [`Ord`] comparison like a `BTreeSet`.
//! - **Positional access** - [`insert_at`](RankTree::insert_at),
//!   [`erase_at`](RankTree::erase_at), indexing by [`Pos`], driven purely by
//!   ordinal position like a `Vec`, with no ordering requirement on the
//!   element type.
//!
//! # Example
//!
//! ```
//! use tavl_tree::{Pos, RankTree};
//!
//! let mut scores = RankTree::new();
//! scores.search_or_insert(85);
//! scores.search_or_insert(100);
//! scores.search_or_insert(92);
//!
//! // Sorted operations (O(log n))
//! assert!(scores.contains(&92));
//! assert_eq!(scores.position_of(&100), Some(Pos(3)));
//!
//! // Positional operations (O(log n))
//! assert_eq!(scores[Pos(2)], 92); // the median
//!
//! // Whole-tree surgery (O(log n))
//! let top = scores.split_off(2);
//! assert_eq!(top.iter().copied().collect::<Vec<_>>(), [100]);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library
//!   dependency
//! - **O(log n) positional operations** - Each node stores the size of its
//!   left subtree as a local rank, so positions need no global recount
//! - **Stack-free iteration** - Empty child slots hold threads to the
//!   in-order neighbor, giving O(1) amortized iteration steps with no
//!   recursion and no auxiliary stack
//! - **O(log n) concatenation and splitting** - Whole trees are joined and
//!   divided by splicing at the height where they meet, never per element
//!
//! # Implementation
//!
//! The tree is a classic AVL tree (per-node balance factor, single/double
//! rotations) over individually owned nodes. Every empty child slot is a
//! thread: a tagged pointer to the in-order predecessor (left slots) or
//! successor (right slots). A per-tree head sentinel terminates both ends of
//! the thread chain and anchors the root, so the tree's first and last
//! elements are reachable without special cases.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: We have to allow unsafe code - the threads make the structure a
// general graph, which rules out safe owned links.
// #![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod position;
mod raw;

pub mod rank_tree;

pub use position::Pos;
pub use rank_tree::RankTree;
