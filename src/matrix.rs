//! Dense cost matrix and the row/column reduction used for lower bounds.
//!
//! Costs are `f64` values where `f64::INFINITY` marks an unreachable edge.
//! The diagonal is always unreachable. Infinity takes part in arithmetic
//! through IEEE semantics: `inf + x == inf`, and the reducer only ever
//! subtracts a finite minimum from a finite entry, so no NaN can appear.

use crate::error::{SolverError, SolverResult};

/// Sentinel for an edge that cannot be taken.
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Square, row-major cost matrix (row = origin, column = destination).
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    size: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Create a matrix of the given size with every edge unreachable.
    pub fn unreachable(size: usize) -> Self {
        CostMatrix {
            size,
            data: vec![UNREACHABLE; size * size],
        }
    }

    /// Build a matrix from a cost function.
    ///
    /// The diagonal is forced to infinity; NaN and negative costs returned by
    /// `cost` are treated as unreachable.
    pub fn from_fn<F>(size: usize, mut cost: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut matrix = Self::unreachable(size);
        for i in 0..size {
            for j in 0..size {
                if i == j {
                    continue;
                }
                let c = cost(i, j);
                if c.is_nan() || c < 0.0 {
                    continue;
                }
                matrix.set(i, j, c);
            }
        }
        matrix
    }

    /// Build a matrix from explicit rows, validating shape and values.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> SolverResult<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(SolverError::InvalidInstance(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            for (j, c) in row.into_iter().enumerate() {
                if c.is_nan() || c < 0.0 {
                    return Err(SolverError::InvalidInstance(format!(
                        "cost ({}, {}) = {} is not a non-negative number",
                        i, j, c
                    )));
                }
                data.push(if i == j { UNREACHABLE } else { c });
            }
        }

        Ok(CostMatrix { size, data })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    #[inline]
    pub fn set(&mut self, from: usize, to: usize, cost: f64) {
        self.data[from * self.size + to] = cost;
    }

    #[inline]
    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_finite()
    }

    /// Outgoing costs of `from`.
    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.size..(from + 1) * self.size]
    }

    /// Forbid every edge leaving `from`.
    pub fn block_row(&mut self, from: usize) {
        let n = self.size;
        self.data[from * n..(from + 1) * n].fill(UNREACHABLE);
    }

    /// Forbid every edge entering `to`.
    pub fn block_column(&mut self, to: usize) {
        for from in 0..self.size {
            self.set(from, to, UNREACHABLE);
        }
    }

    /// Reduce the matrix in place and return the amount subtracted.
    ///
    /// Every row holding at least one finite entry has its minimum subtracted
    /// from its finite entries, then the same is done column by column on the
    /// result. Fully unreachable rows and columns contribute nothing. The
    /// returned total is an admissible lower-bound increment: any tour leaves
    /// each remaining row once and enters each remaining column once.
    pub fn reduce(&mut self) -> f64 {
        let n = self.size;
        let mut total = 0.0;

        for i in 0..n {
            let row = &mut self.data[i * n..(i + 1) * n];
            let min = row.iter().cloned().fold(UNREACHABLE, f64::min);
            if !min.is_finite() || min == 0.0 {
                continue;
            }
            for c in row.iter_mut().filter(|c| c.is_finite()) {
                *c -= min;
            }
            total += min;
        }

        for j in 0..n {
            let min = (0..n).map(|i| self.get(i, j)).fold(UNREACHABLE, f64::min);
            if !min.is_finite() || min == 0.0 {
                continue;
            }
            for i in 0..n {
                let c = self.get(i, j);
                if c.is_finite() {
                    self.set(i, j, c - min);
                }
            }
            total += min;
        }

        total
    }

    /// Non-mutating form of [`CostMatrix::reduce`].
    pub fn reduced(&self) -> (CostMatrix, f64) {
        let mut matrix = self.clone();
        let total = matrix.reduce();
        (matrix, total)
    }
}

impl std::fmt::Display for CostMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.size {
            for (j, c) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                if c.is_finite() {
                    write!(f, "{:>8.2}", c)?;
                } else {
                    write!(f, "{:>8}", "inf")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    fn example() -> CostMatrix {
        CostMatrix::from_rows(vec![
            vec![INF, 10.0, 15.0, 20.0],
            vec![5.0, INF, 9.0, 10.0],
            vec![6.0, 13.0, INF, 12.0],
            vec![8.0, 8.0, 9.0, INF],
        ])
        .unwrap()
    }

    #[test]
    fn test_from_rows_forces_diagonal() {
        let m = CostMatrix::from_rows(vec![vec![0.0, 1.0], vec![2.0, 0.0]]).unwrap();
        assert_eq!(m.get(0, 0), INF);
        assert_eq!(m.get(1, 1), INF);
        assert_eq!(m.get(0, 1), 1.0);
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        assert!(CostMatrix::from_rows(vec![vec![INF, 1.0], vec![2.0]]).is_err());
        assert!(CostMatrix::from_rows(vec![vec![INF, -1.0], vec![2.0, INF]]).is_err());
        assert!(CostMatrix::from_rows(vec![vec![INF, f64::NAN], vec![2.0, INF]]).is_err());
    }

    #[test]
    fn test_reduce_example() {
        let mut m = example();
        // rows: 10 + 5 + 6 + 8 = 29, columns after that: 0 + 0 + 1 + 5 = 6
        let total = m.reduce();
        assert!((total - 35.0).abs() < 1e-9);

        for i in 0..4 {
            assert!(m.row(i).iter().any(|&c| c == 0.0), "row {} has no zero", i);
        }
        for j in 0..4 {
            assert!((0..4).any(|i| m.get(i, j) == 0.0), "column {} has no zero", j);
        }
    }

    #[test]
    fn test_reduce_is_idempotent() {
        let mut m = example();
        m.reduce();
        let once = m.clone();
        let second = m.reduce();
        assert_eq!(second, 0.0);
        assert_eq!(m, once);
    }

    #[test]
    fn test_reduce_skips_unreachable_rows_and_columns() {
        let mut m = example();
        m.block_row(0);
        m.block_column(1);
        let (reduced, total) = m.reduced();

        assert!(reduced.row(0).iter().all(|c| c.is_infinite()));
        assert!((0..4).all(|i| reduced.get(i, 1).is_infinite()));
        assert!(total.is_finite());
        // original untouched by the non-mutating form
        assert_eq!(m.get(2, 0), 6.0);
    }

    #[test]
    fn test_reduce_all_unreachable_contributes_zero() {
        let mut m = CostMatrix::unreachable(3);
        assert_eq!(m.reduce(), 0.0);
        assert_eq!(m, CostMatrix::unreachable(3));
    }

    #[test]
    fn test_from_fn_sanitizes() {
        let m = CostMatrix::from_fn(3, |i, j| if i == 0 && j == 1 { f64::NAN } else { 1.0 });
        assert!(!m.is_reachable(0, 1));
        assert!(!m.is_reachable(2, 2));
        assert!(m.is_reachable(1, 0));
    }
}
