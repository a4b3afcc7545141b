//! Containers shared by the rating engine and the consensus bracket.
//!
//! - [`Tally`]: associative table kept in descending order of value
//! - [`NaryTree`]: arena-backed n-ary tree with bounded fan-out

pub mod tally;
pub mod tree;

pub use tally::{Frequency, Split, Tally, Weighting};
pub use tree::{NaryTree, NodeId, TreeError};
