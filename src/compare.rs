// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Distribution Comparison

use crate::distribution::CompletionDistribution;

/// `P(A > B)` for independent completion-time distributions.
pub fn prob_greater(a: &CompletionDistribution, b: &CompletionDistribution) -> f64 {
    prob_greater_sorted(a.iter(), b.iter())
}

/// `P(A > B)` over `(outcome, probability)` sequences sorted ascending.
///
/// Two-pointer sweep: for each outcome of A, accumulate all B mass strictly
/// below it. Equal outcomes count as "not greater". Unsorted input gives a
/// meaningless result.
pub fn prob_greater_sorted<T, A, B>(a: A, b: B) -> f64
where
    T: PartialOrd,
    A: IntoIterator<Item = (T, f64)>,
    B: IntoIterator<Item = (T, f64)>,
{
    let mut b = b.into_iter().peekable();
    let mut below = 0.0;
    let mut total = 0.0;
    for (outcome_a, prob_a) in a {
        while let Some((_, prob_b)) = b.next_if(|(outcome_b, _)| *outcome_b < outcome_a) {
            below += prob_b;
        }
        total += prob_a * below;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Elapsed;
    use rust_decimal_macros::dec;

    #[test]
    fn test_strictly_greater_point_masses() {
        let a = [(2.0, 1.0)];
        let b = [(1.0, 1.0)];
        assert_eq!(prob_greater_sorted(a, b), 1.0);
        assert_eq!(prob_greater_sorted(b, a), 0.0);
    }

    #[test]
    fn test_ties_are_not_greater() {
        let a = [(1.0, 0.5), (2.0, 0.5)];
        assert_eq!(prob_greater_sorted(a, a), 0.25);
        let point = [(3.0, 1.0)];
        assert_eq!(prob_greater_sorted(point, point), 0.0);
    }

    #[test]
    fn test_interleaved() {
        // A: {1: .5, 3: .5}, B: {2: .5, 4: .5}
        let a = [(1.0, 0.5), (3.0, 0.5)];
        let b = [(2.0, 0.5), (4.0, 0.5)];
        assert!((prob_greater_sorted(a, b) - 0.25).abs() < 1e-15);
        assert!((prob_greater_sorted(b, a) - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_both_directions_never_exceed_one() {
        let a = [(1.0, 0.2), (2.0, 0.3), (5.0, 0.4)];
        let b = [(2.0, 0.5), (3.0, 0.1), (5.0, 0.3)];
        let sum = prob_greater_sorted(a, b) + prob_greater_sorted(b, a);
        assert!(sum <= 0.9 * 0.9 + 1e-12);
    }

    #[test]
    fn test_empty_inputs() {
        let empty: [(f64, f64); 0] = [];
        assert_eq!(prob_greater_sorted(empty, [(1.0, 1.0)]), 0.0);
        assert_eq!(prob_greater_sorted([(1.0, 1.0)], empty), 0.0);
    }

    #[test]
    fn test_completion_distributions() {
        let a = CompletionDistribution::from_pairs([(Elapsed(dec!(1.5)), 0.4), (Elapsed(dec!(3.0)), 0.6)]);
        let b = CompletionDistribution::from_pairs([(Elapsed(dec!(1.50)), 1.0)]);
        // Only A's 3.0 outcome beats B
        assert!((prob_greater(&a, &b) - 0.6).abs() < 1e-15);
        assert_eq!(prob_greater(&b, &a), 0.0);
    }
}
