//! Property-based tests for removal selection.

use super::*;
use crate::scoring::RankOrder;
use ndarray::Array2;
use proptest::prelude::*;

/// Score grids with few distinct values so ties are common.
fn score_grid() -> impl Strategy<Value = Array2<f32>> {
    (1usize..5, 1usize..12).prop_flat_map(|(layers, units)| {
        prop::collection::vec(0i32..6, layers * units).prop_map(move |v| {
            Array2::from_shape_vec((layers, units), v.into_iter().map(|x| x as f32 * 0.5).collect())
                .expect("shape matches length")
        })
    })
}

fn subset(small: &Array2<bool>, large: &Array2<bool>) -> bool {
    small.iter().zip(large.iter()).all(|(&s, &l)| !s || l)
}

proptest! {
    /// A larger fraction removes a superset of a smaller one
    #[test]
    fn global_selection_monotonic(scores in score_grid(), a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let small = top_fraction(scores.view(), lo, RankOrder::Ascending).unwrap();
        let large = top_fraction(scores.view(), hi, RankOrder::Ascending).unwrap();
        prop_assert!(subset(&small.criteria, &large.criteria));
    }

    #[test]
    fn per_layer_selection_monotonic(scores in score_grid(), a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let small = top_fraction_per_layer(scores.view(), lo, RankOrder::Descending).unwrap();
        let large = top_fraction_per_layer(scores.view(), hi, RankOrder::Descending).unwrap();
        prop_assert!(subset(&small.criteria, &large.criteria));
    }

    /// Fraction 0 selects nothing, fraction 1 selects everything
    #[test]
    fn selection_edges(scores in score_grid()) {
        let none = top_fraction(scores.view(), 0.0, RankOrder::Ascending).unwrap();
        prop_assert_eq!(none.count(), 0);
        prop_assert_eq!(none.threshold, 0.0);

        let all = top_fraction(scores.view(), 1.0, RankOrder::Ascending).unwrap();
        prop_assert_eq!(all.count(), scores.len());
    }

    /// Selected count is floor(frac * n) and every kept score is on the safe
    /// side of the threshold
    #[test]
    fn selection_count_and_threshold(scores in score_grid(), frac in 0.0f32..=1.0) {
        let sel = top_fraction(scores.view(), frac, RankOrder::Ascending).unwrap();
        prop_assert_eq!(sel.count(), selection_count(frac, scores.len()));
        if sel.count() > 0 {
            for (&s, &removed) in scores.iter().zip(sel.criteria.iter()) {
                if removed {
                    prop_assert!(s <= sel.threshold);
                } else {
                    prop_assert!(s >= sel.threshold);
                }
            }
        }
    }

    /// Identical input yields an identical mask
    #[test]
    fn selection_deterministic(scores in score_grid(), frac in 0.0f32..=1.0) {
        let first = top_fraction(scores.view(), frac, RankOrder::Descending).unwrap();
        let second = top_fraction(scores.view(), frac, RankOrder::Descending).unwrap();
        prop_assert_eq!(first, second);
    }
}
