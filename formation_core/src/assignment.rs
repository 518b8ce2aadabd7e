// formation_core/src/assignment.rs

//! Greedy pairing of agents to target positions.
//!
//! All pairwise distances are sorted ascending and the cheapest pair whose
//! agent and target are both still free is committed, over and over, until
//! everyone is matched. This is a heuristic: it is not a minimum-total-distance
//! matching, but it never leaves an agent without a target.

use nalgebra::{distance, Point2};

use crate::error::{FormationError, Result};

/// One agent matched to one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentPair {
    pub initial_index: usize,
    pub target_index: usize,
    pub initial: Point2<f64>,
    pub target: Point2<f64>,
    pub distance: f64,
}

/// Pairs every initial point with a distinct target point.
///
/// The result is ordered by `initial_index`. Equal distances are resolved in
/// favour of the lower initial index, then the lower target index.
pub fn assign(initial: &[Point2<f64>], targets: &[Point2<f64>]) -> Result<Vec<AssignmentPair>> {
    if initial.len() != targets.len() {
        return Err(FormationError::DimensionMismatch {
            context: "assignment targets",
            expected: initial.len(),
            actual: targets.len(),
        });
    }
    let n = initial.len();

    // Generated in (i, j) order; the stable sort keeps that order among ties.
    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(n * n);
    for (i, start) in initial.iter().enumerate() {
        for (j, goal) in targets.iter().enumerate() {
            candidates.push((distance(start, goal), i, j));
        }
    }
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut target_of: Vec<Option<(usize, f64)>> = vec![None; n];
    let mut target_used = vec![false; n];
    let mut matched = 0;
    for (d, i, j) in candidates {
        if matched == n {
            break;
        }
        if target_of[i].is_none() && !target_used[j] {
            target_of[i] = Some((j, d));
            target_used[j] = true;
            matched += 1;
        }
    }

    target_of
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            let (j, d) = slot.ok_or(FormationError::DimensionMismatch {
                context: "assignment pairs",
                expected: n,
                actual: matched,
            })?;
            Ok(AssignmentPair {
                initial_index: i,
                target_index: j,
                initial: initial[i],
                target: targets[j],
                distance: d,
            })
        })
        .collect()
}

/// Sum of the travel distances of all pairs.
pub fn total_distance(pairs: &[AssignmentPair]) -> f64 {
    pairs.iter().map(|p| p.distance).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point2<f64>> {
        raw.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn nearest_pairs_are_chosen() {
        let initial = pts(&[(0.0, 0.0), (10.0, 10.0)]);
        let targets = pts(&[(1.0, 1.0), (9.0, 9.0)]);
        let pairs = assign(&initial, &targets).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].initial, Point2::new(0.0, 0.0));
        assert_eq!(pairs[0].target, Point2::new(1.0, 1.0));
        assert_eq!(pairs[1].initial, Point2::new(10.0, 10.0));
        assert_eq!(pairs[1].target, Point2::new(9.0, 9.0));
        assert_abs_diff_eq!(total_distance(&pairs), 2.0 * 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn every_point_is_used_exactly_once() {
        let initial = pts(&[(0.0, 0.0), (5.0, 1.0), (2.0, 7.0), (9.0, 9.0), (4.0, 4.0)]);
        let targets = pts(&[(4.5, 4.5), (0.5, 0.0), (1.0, 1.0), (8.0, 2.0), (3.0, 6.0)]);
        let pairs = assign(&initial, &targets).unwrap();

        assert_eq!(pairs.len(), 5);
        let mut seen_initial = [false; 5];
        let mut seen_target = [false; 5];
        for p in &pairs {
            assert!(!seen_initial[p.initial_index]);
            assert!(!seen_target[p.target_index]);
            seen_initial[p.initial_index] = true;
            seen_target[p.target_index] = true;
            assert_eq!(p.initial, initial[p.initial_index]);
            assert_eq!(p.target, targets[p.target_index]);
        }
        assert!(seen_initial.iter().all(|&s| s));
        assert!(seen_target.iter().all(|&s| s));
        assert!(pairs.windows(2).all(|w| w[0].initial_index < w[1].initial_index));
    }

    #[test]
    fn greedy_can_miss_the_optimum() {
        let initial = pts(&[(0.0, 0.0), (2.0, 0.0)]);
        let targets = pts(&[(1.1, 0.0), (3.0, 0.0)]);
        let pairs = assign(&initial, &targets).unwrap();
        // Greedy takes (2,0)-(1.1,0) first (0.9), leaving agent 0 a 3.0 trip.
        assert_eq!(pairs[1].target_index, 0);
        assert_abs_diff_eq!(total_distance(&pairs), 3.9, epsilon = 1e-12);
    }

    #[test]
    fn ties_prefer_lower_indices() {
        let initial = pts(&[(0.0, 0.0), (0.0, 0.0)]);
        let targets = pts(&[(1.0, 0.0), (0.0, 1.0)]);
        let pairs = assign(&initial, &targets).unwrap();
        assert_eq!(pairs[0].target_index, 0);
        assert_eq!(pairs[1].target_index, 1);
    }

    #[test]
    fn mismatched_counts_fail_fast() {
        let initial = pts(&[(0.0, 0.0), (1.0, 1.0)]);
        let targets = pts(&[(0.0, 0.0)]);
        assert_eq!(
            assign(&initial, &targets),
            Err(FormationError::DimensionMismatch {
                context: "assignment targets",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn empty_input_yields_no_pairs() {
        assert!(assign(&[], &[]).unwrap().is_empty());
    }
}
