//! Best-wins matching: one nearest-neighbor query per larger-set point,
//! then a global minimum-distance filter per contested smaller-set point.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::MatchError;
use crate::kdtree::KdTree;
use crate::matching::{Match, RoleAssignment};
use crate::point::PointSet;

/// Match every point of the larger set to its nearest neighbor in the
/// smaller set, keeping at most one match per smaller-set point.
///
/// The larger set is chosen by size, with equal sizes treating `a` as larger
/// (see [`RoleAssignment::from_sizes`]). When a smaller-set point is the
/// nearest neighbor of several larger-set points, only the claimant with the
/// minimum distance survives; exact-distance ties keep the earliest claimant
/// in the larger set's input order. Output rows appear in order of each
/// winning smaller-set id's first appearance in that same query order, and
/// `id_a`/`id_b` always follow the (first, second) argument orientation.
///
/// Duplicate ids within one set make the grouping ambiguous; the CSV loader
/// rejects them, and programmatically built sets should avoid them.
///
/// # Errors
/// * `MatchError::EmptyInput` - if either set is empty.
pub fn match_unique(a: &PointSet, b: &PointSet) -> Result<Vec<Match>, MatchError> {
    if a.is_empty() {
        return Err(MatchError::EmptyInput("first point set"));
    }
    if b.is_empty() {
        return Err(MatchError::EmptyInput("second point set"));
    }

    let role = RoleAssignment::from_sizes(a.len(), b.len());
    let (larger, smaller) = match role {
        RoleAssignment::FirstLarger => (a, b),
        RoleAssignment::SecondLarger => (b, a),
    };

    let tree = KdTree::build(smaller)?;

    // One-shot query batch: every larger-set point claims its nearest
    // neighbor, duplicates allowed for now.
    let mut candidates = Vec::with_capacity(larger.len());
    for point in larger {
        let (index, distance) = tree.nearest(&point.position);
        candidates.push(Match {
            id_a: point.id,
            id_b: smaller[index].id,
            distance,
        });
    }

    // Per contested smaller-set id, remember the candidate with the minimum
    // distance. Strict `<` keeps the first-encountered candidate on ties.
    let mut best: HashMap<i64, usize> = HashMap::with_capacity(smaller.len());
    for (i, candidate) in candidates.iter().enumerate() {
        match best.entry(candidate.id_b) {
            Entry::Occupied(mut entry) => {
                if candidate.distance < candidates[*entry.get()].distance {
                    entry.insert(i);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(i);
            }
        }
    }
    debug!(
        "{} candidates collapsed to {} unique matches",
        candidates.len(),
        best.len()
    );

    // Emit winners in order of first appearance, restoring the caller's
    // column orientation if the second set was the larger one.
    let mut seen: HashSet<i64> = HashSet::with_capacity(best.len());
    let mut matches = Vec::with_capacity(best.len());
    for candidate in &candidates {
        if seen.insert(candidate.id_b) {
            let winner = candidates[best[&candidate.id_b]];
            matches.push(match role {
                RoleAssignment::FirstLarger => winner,
                RoleAssignment::SecondLarger => Match {
                    id_a: winner.id_b,
                    id_b: winner.id_a,
                    distance: winner.distance,
                },
            });
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;
    use approx::assert_relative_eq;

    #[test]
    fn empty_inputs_are_rejected() {
        let empty = PointSet::default();
        let set = PointSet::new(vec![Point::new(1, 0.0, 0.0, 0.0)]);
        assert!(matches!(
            match_unique(&empty, &set),
            Err(MatchError::EmptyInput("first point set"))
        ));
        assert!(matches!(
            match_unique(&set, &empty),
            Err(MatchError::EmptyInput("second point set"))
        ));
    }

    #[test]
    fn distinct_nearest_neighbors_all_survive() {
        let a = PointSet::new(vec![
            Point::new(1, 0.0, 0.0, 0.0),
            Point::new(2, 10.0, 0.0, 0.0),
        ]);
        let b = PointSet::new(vec![
            Point::new(1, 0.0, 0.0, 1.0),
            Point::new(2, 10.0, 0.0, 1.0),
        ]);

        let matches = match_unique(&a, &b).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].id_a, matches[0].id_b), (1, 1));
        assert_eq!((matches[1].id_a, matches[1].id_b), (2, 2));
        assert_relative_eq!(matches[0].distance, 1.0);
        assert_relative_eq!(matches[1].distance, 1.0);
    }

    #[test]
    fn contested_point_keeps_closest_claimant() {
        // Both points of A are nearest to B's only point; the closer one wins
        // and the other is dropped entirely.
        let a = PointSet::new(vec![
            Point::new(1, 0.0, 0.0, 0.0),
            Point::new(2, 0.0, 0.0, 0.1),
        ]);
        let b = PointSet::new(vec![Point::new(1, 0.0, 0.0, 5.0)]);

        let matches = match_unique(&a, &b).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].id_a, matches[0].id_b), (2, 1));
        assert_relative_eq!(matches[0].distance, 4.9, max_relative = 1e-12);
    }

    #[test]
    fn exact_distance_tie_keeps_first_claimant() {
        // Both A points are exactly 1.0 from B's only point.
        let a = PointSet::new(vec![
            Point::new(10, 0.0, 0.0, 1.0),
            Point::new(20, 0.0, 0.0, -1.0),
        ]);
        let b = PointSet::new(vec![Point::new(1, 0.0, 0.0, 0.0)]);

        let matches = match_unique(&a, &b).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id_a, 10);
    }

    #[test]
    fn swapped_arguments_restore_column_order() {
        // |A| < |B|, so B is queried internally; output must still read
        // (id from A, id from B).
        let a = PointSet::new(vec![Point::new(7, 0.0, 0.0, 0.0)]);
        let b = PointSet::new(vec![
            Point::new(1, 0.0, 0.0, 2.0),
            Point::new(2, 50.0, 0.0, 0.0),
        ]);

        let matches = match_unique(&a, &b).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].id_a, matches[0].id_b), (7, 1));
        assert_relative_eq!(matches[0].distance, 2.0);
    }
}
