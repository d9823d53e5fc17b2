//! KD-tree nearest-neighbor matching between labeled 3D point sets.
//!
//! Given two lists of `(id, x, y, z)` points, this crate builds a k-d tree
//! over the smaller list and assigns each point of the larger list to its
//! closest counterpart, resolving contested assignments with one of two
//! policies: best-wins ([`match_unique`]) or first-come, first-served
//! ([`match_exclusive`]). Both yield an injective mapping into the smaller
//! set.

pub mod error;
pub mod io;
pub mod kdtree;
pub mod matching;
pub mod point;

pub use error::MatchError;
pub use kdtree::KdTree;
pub use matching::greedy::match_unique;
pub use matching::sequential::match_exclusive;
pub use matching::{Match, RoleAssignment};
pub use point::{Point, PointSet};
