//! Injective matching of two point sets via nearest-neighbor queries.
//!
//! Two alternative conflict-resolution policies share the same k-d tree
//! primitive: [`greedy::match_unique`] runs one query batch and keeps the
//! globally closest claimant per contested point, while
//! [`sequential::match_exclusive`] hands out claims first-come,
//! first-served in input order and never revisits them.

pub mod greedy;
pub mod sequential;

use serde::{Deserialize, Serialize};

/// One matched pair of ids and the Euclidean distance between the points.
///
/// `id_a` always refers to the caller's first point set and `id_b` to the
/// second, regardless of which set was internally treated as the larger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "ID_A")]
    pub id_a: i64,
    #[serde(rename = "ID_B")]
    pub id_b: i64,
    #[serde(rename = "Distance")]
    pub distance: f64,
}

/// Which argument of [`greedy::match_unique`] was treated as the larger set.
///
/// The role decides which set gets indexed (the smaller) and which gets
/// queried (the larger); modeling it explicitly keeps the output column-swap
/// auditable instead of hiding it in a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAssignment {
    /// The first set is queried against an index over the second. Equal
    /// sizes take this branch: ties go to argument position, not content.
    FirstLarger,
    /// The second set is strictly larger and gets queried; the id columns of
    /// every match are swapped back so output stays in (first, second) order.
    SecondLarger,
}

impl RoleAssignment {
    pub fn from_sizes(first: usize, second: usize) -> Self {
        if first >= second {
            RoleAssignment::FirstLarger
        } else {
            RoleAssignment::SecondLarger
        }
    }
}
