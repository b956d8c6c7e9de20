//! Pareto dominance and non-dominated sorting.

use nalgebra::DVector;

/// `a` dominates `b`: no worse in every objective, strictly better in one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Partition `values` into non-domination fronts.
///
/// Front 0 holds the non-dominated points, front `k` the points that become
/// non-dominated once fronts `0..k` are removed. Indices within a front are
/// ascending.
pub fn non_dominated_sort(values: &[DVector<f64>]) -> Vec<Vec<usize>> {
    let n = values.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (values[i].as_slice(), values[j].as_slice());
            if dominates(a, b) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if dominates(b, a) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(std::mem::replace(&mut current, next));
    }
    fronts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vectors(points: &[[f64; 2]]) -> Vec<DVector<f64>> {
        points
            .iter()
            .map(|p| DVector::from_column_slice(p))
            .collect()
    }

    #[test]
    fn test_dominance() {
        assert!(dominates(&[1.0, 1.0], &[2.0, 2.0]));
        assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
        assert!(!dominates(&[1.0, 1.0], &[1.0, 1.0]));
        assert!(!dominates(&[1.0, 3.0], &[2.0, 2.0]));
        assert!(!dominates(&[2.0, 2.0], &[1.0, 3.0]));
    }

    #[test]
    fn test_fronts() {
        let values = vectors(&[
            [3.0, 3.0],
            [1.0, 2.0],
            [2.0, 1.0],
            [2.0, 2.0],
            [4.0, 4.0],
            [0.5, 5.0],
        ]);
        let fronts = non_dominated_sort(&values);
        assert_eq!(fronts, vec![vec![1, 2, 5], vec![3], vec![0], vec![4]]);
    }

    #[test]
    fn test_duplicates_share_a_front() {
        let values = vectors(&[[1.0, 1.0], [1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(non_dominated_sort(&values), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(non_dominated_sort(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_fronts_partition_and_order(
            points in prop::collection::vec(prop::collection::vec(0.0f64..10.0, 3), 1..40)
        ) {
            let values: Vec<DVector<f64>> =
                points.iter().map(|p| DVector::from_column_slice(p)).collect();
            let fronts = non_dominated_sort(&values);

            let mut seen: Vec<usize> = fronts.iter().flatten().copied().collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..values.len()).collect::<Vec<_>>());

            for (k, front) in fronts.iter().enumerate() {
                // Mutually non-dominated
                for &a in front {
                    for &b in front {
                        prop_assert!(!dominates(values[a].as_slice(), values[b].as_slice()));
                    }
                }
                // Every member of front k > 0 is dominated by someone in front k - 1
                if k > 0 {
                    for &b in front {
                        prop_assert!(fronts[k - 1]
                            .iter()
                            .any(|&a| dominates(values[a].as_slice(), values[b].as_slice())));
                    }
                }
            }
        }
    }
}
