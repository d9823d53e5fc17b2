//! First-come, first-served matching: points claim neighbors in input order
//! and claims are never revisited.

use std::collections::HashSet;

use log::debug;

use crate::error::MatchError;
use crate::kdtree::KdTree;
use crate::matching::Match;
use crate::point::PointSet;

/// Walk `first` in input order and let each point claim its closest
/// still-unclaimed neighbor in `second`.
///
/// Each point ranks the full second set by distance and takes the first
/// candidate nobody claimed before it. Once every second-set point is
/// claimed, the remaining first-set points simply produce no match; that is
/// the expected terminal state when `first` outnumbers `second`, not an
/// error. Unlike [`match_unique`], an early claim is kept even if a later
/// point would have been a strictly closer claimant; the policy is
/// deliberately myopic in exchange for a single ordered pass.
///
/// The claimed-neighbor set is local to this call, so repeated or
/// interleaved runs never observe each other's claims.
///
/// # Errors
/// * `MatchError::EmptyInput` - if `second` is empty. An empty `first` is
///   fine and yields an empty match list.
///
/// [`match_unique`]: crate::matching::greedy::match_unique
pub fn match_exclusive(first: &PointSet, second: &PointSet) -> Result<Vec<Match>, MatchError> {
    if second.is_empty() {
        return Err(MatchError::EmptyInput("second point set"));
    }
    if first.is_empty() {
        return Ok(Vec::new());
    }

    let tree = KdTree::build(second)?;

    let mut claimed: HashSet<usize> = HashSet::with_capacity(second.len());
    let mut matches = Vec::with_capacity(first.len().min(second.len()));
    for point in first {
        let ranked = tree.k_nearest(&point.position, second.len())?;
        if let Some(&(index, distance)) = ranked.iter().find(|(index, _)| !claimed.contains(index))
        {
            claimed.insert(index);
            matches.push(Match {
                id_a: point.id,
                id_b: second[index].id,
                distance,
            });
        }
    }
    debug!(
        "{} of {} points claimed a neighbor",
        matches.len(),
        first.len()
    );

    Ok(matches)
}
