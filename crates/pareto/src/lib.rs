//! Multi-objective Pareto dominance filter.
//!
//! Points are rows of an `(n, k)` matrix. Each column carries a [`Sense`]; after
//! flipping minimized columns every axis reads "larger is better", and a point
//! survives only if no other point is at least as good everywhere.

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// Optimization sense for one objective axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Larger values are better.
    Maximize,
    /// Smaller values are better.
    Minimize,
}

impl Sense {
    /// Sign that maps the axis onto "larger is better".
    pub fn sign(self) -> f64 {
        match self {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParetoError {
    #[error("expected {expected} objective senses, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Indices of the non-dominated rows of `points`, in input order.
///
/// Each pass takes the next surviving candidate and keeps only the rows that beat it
/// strictly on at least one axis, plus the candidate itself. Rows equal to a candidate
/// on every axis therefore collapse onto the earliest of them.
pub fn frontier(points: ArrayView2<'_, f64>, senses: &[Sense]) -> Result<Vec<usize>, ParetoError> {
    let (_, k) = points.dim();
    if senses.len() != k {
        return Err(ParetoError::DimensionMismatch {
            expected: k,
            actual: senses.len(),
        });
    }

    let scores = normalized(points, senses);
    let mut survivors: Vec<usize> = (0..scores.nrows()).collect();
    let mut cursor = 0;
    while cursor < survivors.len() {
        let candidate = survivors[cursor];
        let reference = scores.row(candidate);
        let mut kept_before = 0;
        let mut next = Vec::with_capacity(survivors.len());
        for (position, &idx) in survivors.iter().enumerate() {
            let keep = idx == candidate
                || scores
                    .row(idx)
                    .iter()
                    .zip(reference.iter())
                    .any(|(value, limit)| value > limit);
            if keep {
                if position < cursor {
                    kept_before += 1;
                }
                next.push(idx);
            }
        }
        survivors = next;
        cursor = kept_before + 1;
    }
    Ok(survivors)
}

/// Convenience wrapper for row-major slices of equal-length points.
pub fn frontier_of_rows(rows: &[Vec<f64>], senses: &[Sense]) -> Result<Vec<usize>, ParetoError> {
    let k = senses.len();
    if let Some(row) = rows.iter().find(|row| row.len() != k) {
        return Err(ParetoError::DimensionMismatch {
            expected: row.len(),
            actual: k,
        });
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let points = Array2::from_shape_vec((rows.len(), k), flat)
        .map_err(|_| ParetoError::DimensionMismatch {
            expected: k,
            actual: senses.len(),
        })?;
    frontier(points.view(), senses)
}

/// True when `a` is at least as good as `b` on every axis and strictly better on one.
pub fn dominates(a: &[f64], b: &[f64], senses: &[Sense]) -> bool {
    let mut strictly_better = false;
    for ((x, y), sense) in a.iter().zip(b).zip(senses) {
        let (x, y) = (x * sense.sign(), y * sense.sign());
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

fn normalized(points: ArrayView2<'_, f64>, senses: &[Sense]) -> Array2<f64> {
    let mut scores = points.to_owned();
    for (mut column, sense) in scores.columns_mut().into_iter().zip(senses) {
        column.mapv_inplace(|v| v * sense.sign());
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn keeps_tradeoff_front_for_minimization() {
        let points = array![[1.0, 5.0], [2.0, 3.0], [3.0, 4.0], [4.0, 1.0], [2.0, 6.0]];
        let kept = frontier(points.view(), &[Sense::Minimize, Sense::Minimize]).unwrap();
        assert_eq!(kept, vec![0, 1, 3]);
    }

    #[test]
    fn direction_flip_changes_front() {
        let points = array![[1.0, 1.0], [2.0, 2.0], [3.0, 0.5]];
        let max = frontier(points.view(), &[Sense::Maximize, Sense::Maximize]).unwrap();
        assert_eq!(max, vec![1, 2]);
        let mixed = frontier(points.view(), &[Sense::Maximize, Sense::Minimize]).unwrap();
        assert_eq!(mixed, vec![2]);
        let min = frontier(points.view(), &[Sense::Minimize, Sense::Minimize]).unwrap();
        assert_eq!(min, vec![0, 2]);
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let points = array![[2.0, 2.0], [1.0, 3.0], [2.0, 2.0]];
        let kept = frontier(points.view(), &[Sense::Maximize, Sense::Maximize]).unwrap();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn partial_ties_are_resolved_by_the_better_axis() {
        let points = array![[1.0, 2.0], [1.0, 3.0]];
        let kept = frontier(points.view(), &[Sense::Maximize, Sense::Maximize]).unwrap();
        assert_eq!(kept, vec![1]);
    }

    #[test]
    fn empty_input_yields_empty_front() {
        let points = Array2::<f64>::zeros((0, 2));
        let kept = frontier(points.view(), &[Sense::Minimize, Sense::Minimize]).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn rejects_mismatched_senses() {
        let points = array![[1.0, 2.0, 3.0]];
        let err = frontier(points.view(), &[Sense::Minimize]).unwrap_err();
        assert_eq!(
            err,
            ParetoError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn dominance_predicate_matches_senses() {
        let senses = [Sense::Minimize, Sense::Maximize];
        assert!(dominates(&[1.0, 5.0], &[2.0, 5.0], &senses));
        assert!(!dominates(&[1.0, 5.0], &[1.0, 5.0], &senses));
        assert!(!dominates(&[1.0, 4.0], &[2.0, 5.0], &senses));
    }
}
