//! Additive-epsilon contributions.
//!
//! The contribution of a point is the smallest additive shift any other
//! front member needs to weakly dominate it. Points that a neighbour almost
//! covers score low and are removed first.

/// Smallest `ε` such that `a - ε ≤ b` holds componentwise, i.e. `max_k (a_k - b_k)`.
pub fn additive_epsilon(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Epsilon contribution of every front member. A lone point scores `+∞`.
pub fn epsilon_contributions(front: &[&[f64]]) -> Vec<f64> {
    front
        .iter()
        .enumerate()
        .map(|(i, p)| {
            front
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, q)| additive_epsilon(q, p))
                .fold(f64::INFINITY, f64::min)
        })
        .collect()
}
