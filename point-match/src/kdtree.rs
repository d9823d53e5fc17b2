//! Balanced k-d tree over a fixed set of 3D points.
//!
//! Built once per matching run and queried read-only afterward. Construction
//! is O(n log n) via median splits on the cycling axis; nearest and k-nearest
//! queries prune subtrees by the splitting-plane distance, giving O(log n)
//! expected query cost for well-distributed point clouds.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Point3;

use crate::error::MatchError;
use crate::point::PointSet;

struct Node {
    /// Index of the pivot point in the source [`PointSet`].
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Read-only spatial index over a [`PointSet`].
///
/// Borrows the point data immutably; the set must outlive every query.
/// Exactly-equidistant candidates are resolved deterministically in favor of
/// the point earlier in the input order, so identical inputs always produce
/// identical query results.
pub struct KdTree<'a> {
    points: &'a PointSet,
    nodes: Vec<Node>,
    root: usize,
}

/// A k-nearest heap entry ordered worst-first: farther distance is greater,
/// and at equal distance the later input position is greater.
#[derive(Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> KdTree<'a> {
    /// Build a balanced tree over `points`.
    ///
    /// # Errors
    /// * `MatchError::EmptyInput` - nearest-neighbor queries are undefined on
    ///   an empty index, so zero points are rejected up front.
    pub fn build(points: &'a PointSet) -> Result<Self, MatchError> {
        if points.is_empty() {
            return Err(MatchError::EmptyInput("spatial index input"));
        }

        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = build_subtree(points, &mut order, 0, &mut nodes);

        Ok(Self {
            points,
            nodes,
            root,
        })
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return the index of the closest point and its Euclidean distance.
    ///
    /// Ties between exactly equidistant points go to the point earlier in
    /// the input order.
    pub fn nearest(&self, query: &Point3<f64>) -> (usize, f64) {
        let mut best = Candidate {
            dist_sq: f64::INFINITY,
            index: usize::MAX,
        };
        self.nearest_in(self.root, query, &mut best);
        (best.index, best.dist_sq.sqrt())
    }

    fn nearest_in(&self, node_index: usize, query: &Point3<f64>, best: &mut Candidate) {
        let node = &self.nodes[node_index];
        let position = &self.points[node.point].position;

        let candidate = Candidate {
            dist_sq: (position - query).norm_squared(),
            index: node.point,
        };
        if candidate < *best {
            *best = candidate;
        }

        let delta = query[node.axis] - position[node.axis];
        let (near, far) = if delta <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.nearest_in(near, query, best);
        }
        // The far subtree can only hold a closer point (or an equidistant one
        // with a lower index) when the splitting plane is within the current
        // best distance.
        if let Some(far) = far {
            if delta * delta <= best.dist_sq {
                self.nearest_in(far, query, best);
            }
        }
    }

    /// Return up to `k` closest points as `(index, distance)` pairs, sorted
    /// ascending by distance with the input-order tie-break of [`nearest`].
    ///
    /// The result length is `min(k, self.len())`.
    ///
    /// # Errors
    /// * `MatchError::InvalidNeighborCount` - if `k` is zero.
    ///
    /// [`nearest`]: KdTree::nearest
    pub fn k_nearest(
        &self,
        query: &Point3<f64>,
        k: usize,
    ) -> Result<Vec<(usize, f64)>, MatchError> {
        if k == 0 {
            return Err(MatchError::InvalidNeighborCount);
        }

        // Max-heap of the k best candidates seen so far, worst on top.
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        self.k_nearest_in(self.root, query, k, &mut heap);

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.index, c.dist_sq.sqrt()))
            .collect())
    }

    fn k_nearest_in(
        &self,
        node_index: usize,
        query: &Point3<f64>,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_index];
        let position = &self.points[node.point].position;

        let candidate = Candidate {
            dist_sq: (position - query).norm_squared(),
            index: node.point,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.push(candidate);
                heap.pop();
            }
        }

        let delta = query[node.axis] - position[node.axis];
        let (near, far) = if delta <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.k_nearest_in(near, query, k, heap);
        }
        if let Some(far) = far {
            let prune = heap.len() == k
                && heap
                    .peek()
                    .is_some_and(|worst| delta * delta > worst.dist_sq);
            if !prune {
                self.k_nearest_in(far, query, k, heap);
            }
        }
    }
}

/// Recursively build the subtree covering `order`, returning its node index.
///
/// The median is selected with a total order (coordinate, then input index)
/// so that duplicate coordinates still produce one canonical tree shape.
fn build_subtree(
    points: &PointSet,
    order: &mut [usize],
    depth: usize,
    nodes: &mut Vec<Node>,
) -> usize {
    let axis = depth % 3;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        points[a].position[axis]
            .total_cmp(&points[b].position[axis])
            .then(a.cmp(&b))
    });

    let (left_half, rest) = order.split_at_mut(mid);
    let (pivot, right_half) = rest.split_first_mut().expect("median split is non-empty");

    let left = if left_half.is_empty() {
        None
    } else {
        Some(build_subtree(points, left_half, depth + 1, nodes))
    };
    let right = if right_half.is_empty() {
        None
    } else {
        Some(build_subtree(points, right_half, depth + 1, nodes))
    };

    nodes.push(Node {
        point: *pivot,
        axis,
        left,
        right,
    });
    nodes.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_set(rng: &mut ChaCha8Rng, n: usize) -> PointSet {
        let points = (0..n)
            .map(|i| {
                Point::new(
                    i as i64,
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                )
            })
            .collect();
        PointSet::new(points)
    }

    /// Brute-force nearest with the same (distance, index) tie-break.
    fn brute_nearest(points: &PointSet, query: &Point3<f64>) -> (usize, f64) {
        let mut best_index = 0;
        let mut best_dist_sq = f64::INFINITY;
        for (i, p) in points.iter().enumerate() {
            let d = (p.position - query).norm_squared();
            if d < best_dist_sq {
                best_dist_sq = d;
                best_index = i;
            }
        }
        (best_index, best_dist_sq.sqrt())
    }

    #[test]
    fn empty_set_is_rejected() {
        let empty = PointSet::default();
        assert!(matches!(
            KdTree::build(&empty),
            Err(MatchError::EmptyInput(_))
        ));
    }

    #[test]
    fn zero_neighbors_is_rejected() {
        let set = PointSet::new(vec![Point::new(1, 0.0, 0.0, 0.0)]);
        let tree = KdTree::build(&set).unwrap();
        assert!(matches!(
            tree.k_nearest(&Point3::origin(), 0),
            Err(MatchError::InvalidNeighborCount)
        ));
    }

    #[test]
    fn nearest_on_single_point() {
        let set = PointSet::new(vec![Point::new(7, 1.0, 2.0, 3.0)]);
        let tree = KdTree::build(&set).unwrap();
        let (index, dist) = tree.nearest(&Point3::new(1.0, 2.0, 4.0));
        assert_eq!(index, 0);
        assert_relative_eq!(dist, 1.0);
    }

    #[test]
    fn nearest_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let set = random_set(&mut rng, 200);
        let tree = KdTree::build(&set).unwrap();

        for _ in 0..500 {
            let query = Point3::new(
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
            );
            let (index, dist) = tree.nearest(&query);
            let (expected_index, expected_dist) = brute_nearest(&set, &query);
            assert_eq!(index, expected_index);
            assert_relative_eq!(dist, expected_dist, max_relative = 1e-12);
        }
    }

    #[test]
    fn k_nearest_is_sorted_and_complete() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let set = random_set(&mut rng, 50);
        let tree = KdTree::build(&set).unwrap();
        let query = Point3::new(0.5, -0.5, 0.25);

        let ranked = tree.k_nearest(&query, 50).unwrap();
        assert_eq!(ranked.len(), 50);

        // Ascending distances, every index present exactly once.
        for pair in ranked.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
        let mut indices: Vec<usize> = ranked.iter().map(|&(i, _)| i).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn k_nearest_matches_brute_force_prefix() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let set = random_set(&mut rng, 80);
        let tree = KdTree::build(&set).unwrap();

        for _ in 0..100 {
            let query = Point3::new(
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
            );
            let ranked = tree.k_nearest(&query, 5).unwrap();
            let full = tree.k_nearest(&query, 80).unwrap();
            assert_eq!(ranked, full[..5].to_vec());
            assert_eq!(full[0].0, tree.nearest(&query).0);
        }
    }

    #[test]
    fn k_larger_than_set_is_clamped() {
        let set = PointSet::new(vec![
            Point::new(1, 0.0, 0.0, 0.0),
            Point::new(2, 1.0, 0.0, 0.0),
        ]);
        let tree = KdTree::build(&set).unwrap();
        let ranked = tree.k_nearest(&Point3::origin(), 10).unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn equidistant_tie_goes_to_earlier_input_position() {
        // Two points mirrored about the query; the first in input order wins.
        let set = PointSet::new(vec![
            Point::new(5, 1.0, 0.0, 0.0),
            Point::new(3, -1.0, 0.0, 0.0),
        ]);
        let tree = KdTree::build(&set).unwrap();
        let (index, dist) = tree.nearest(&Point3::origin());
        assert_eq!(index, 0);
        assert_relative_eq!(dist, 1.0);

        // Same rule inside the ranked list.
        let ranked = tree.k_nearest(&Point3::origin(), 2).unwrap();
        assert_eq!(ranked[0].0, 0);
        assert_eq!(ranked[1].0, 1);
    }
}
