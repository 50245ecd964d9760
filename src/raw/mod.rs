mod node;
mod raw_tree;

pub(crate) use node::Node;
pub(crate) use raw_tree::{RawRankTree, step_next, step_prev, value_mut, value_ref};
