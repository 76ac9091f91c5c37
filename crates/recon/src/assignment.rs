//! Minimum-cost bipartite assignment (Hungarian method, O(n³)).
//!
//! Source-agnostic: rows and columns are just indices into a cost matrix.
//! This is the pluggable alternative to the staged greedy passes in
//! [`crate::matcher`] — a cost built from classification rank plus time
//! delta would yield a globally optimal pairing. The live pipeline keeps
//! the greedy passes; this stays available and tested but unwired.

/// Solve min-cost assignment over a rectangular `n×m` matrix.
///
/// Returns `(row, col)` pairs covering `min(n, m)` rows/columns, empty for
/// degenerate `0×k` / `k×0` input. Rows of `cost` must all have length `m`.
pub fn assign_optimal(cost: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let n = cost.len();
    let m = cost.first().map_or(0, Vec::len);
    if n == 0 || m == 0 {
        return Vec::new();
    }

    // The solver wants rows <= cols; transpose wider-than-tall input.
    if n > m {
        let transposed: Vec<Vec<f64>> = (0..m)
            .map(|j| (0..n).map(|i| cost[i][j]).collect())
            .collect();
        let mut pairs: Vec<(usize, usize)> = assign_optimal(&transposed)
            .into_iter()
            .map(|(r, c)| (c, r))
            .collect();
        pairs.sort_unstable();
        return pairs;
    }

    // Primal-dual method with row/column potentials, 1-indexed internally.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut p = vec![0usize; m + 1]; // p[j] = row matched to column j
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Walk the augmenting path back, flipping assignments.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut result: Vec<(usize, usize)> = (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect();
    result.sort_unstable();
    result
}

/// Build an `n×m` cost matrix from two slices and a pairwise cost function.
pub fn build_cost_matrix<L, R, F>(left: &[L], right: &[R], mut cost: F) -> Vec<Vec<f64>>
where
    F: FnMut(&L, &R) -> f64,
{
    left.iter()
        .map(|l| right.iter().map(|r| cost(l, r)).collect())
        .collect()
}
