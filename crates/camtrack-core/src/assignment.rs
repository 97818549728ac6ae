//! Gated minimum-cost assignment (Kuhn-Munkres with potentials, O(n²m)).
//!
//! Used by the exclusive matching policy: rows are tracks, columns are
//! detections. Non-finite costs mark forbidden pairs.

/// Dense row-major cost matrix.
#[derive(Clone, Debug)]
pub struct CostMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl CostMatrix {
    /// A matrix where every pair starts out forbidden.
    pub fn forbidden(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![f64::INFINITY; rows * cols],
            rows,
            cols,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    fn transposed(&self) -> Self {
        let mut out = Self::forbidden(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }
}

/// Stand-in cost for forbidden pairs while solving. Larger than any sum of
/// admissible costs the tracker produces.
const FORBIDDEN_COST: f64 = 1e12;

/// Solve the assignment for `cost` and return, per row, the assigned column.
///
/// Pairs with non-finite cost are never returned, so rows (or columns) may be
/// left unassigned.
pub fn solve_assignment(cost: &CostMatrix) -> Vec<Option<usize>> {
    if cost.rows == 0 || cost.cols == 0 {
        return vec![None; cost.rows];
    }

    let row_to_col = if cost.rows <= cost.cols {
        hungarian_wide(cost)
    } else {
        let col_to_row = hungarian_wide(&cost.transposed());
        let mut out = vec![None; cost.rows];
        for (c, r) in col_to_row.into_iter().enumerate() {
            if let Some(r) = r {
                out[r] = Some(c);
            }
        }
        out
    };

    row_to_col
        .into_iter()
        .enumerate()
        .map(|(r, c)| c.filter(|&c| cost.get(r, c).is_finite()))
        .collect()
}

/// Kuhn-Munkres for `rows <= cols`, 1-based internally with index 0 as the
/// virtual start column.
fn hungarian_wide(cost: &CostMatrix) -> Vec<Option<usize>> {
    let n = cost.rows;
    let m = cost.cols;
    let a = |i: usize, j: usize| {
        let c = cost.get(i - 1, j - 1);
        if c.is_finite() {
            c
        } else {
            FORBIDDEN_COST
        }
    };

    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    // p[j]: row matched to column j (0 = none); way[j]: previous column on the path.
    let mut p = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = a(i0, j) - u[i0] - v[j];
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
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![None; n];
    for j in 1..=m {
        if p[j] != 0 {
            row_to_col[p[j] - 1] = Some(j - 1);
        }
    }
    row_to_col
}
