//! The assembled system `K u = b` and its direct solvers.
//!
//! P1 elements only couple neighboring nodes, so `K` is block tridiagonal with
//! one 6×6 block per node pair.

use nalgebra::{DMatrix, DVector, Matrix6, Vector6};

use crate::{
    FemError,
    element::{ElementMatrix, ElementVector},
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockTridiagonal {
    /// `K[i, i]`
    diagonal: Vec<Matrix6<f64>>,
    /// `K[i, i + 1]`
    upper: Vec<Matrix6<f64>>,
    /// `K[i + 1, i]`
    lower: Vec<Matrix6<f64>>,
    rhs: Vec<Vector6<f64>>,
}

impl BlockTridiagonal {
    pub(crate) fn zeros(nodes: usize) -> Self {
        debug_assert!(nodes >= 2);
        Self {
            diagonal: vec![Matrix6::zeros(); nodes],
            upper: vec![Matrix6::zeros(); nodes - 1],
            lower: vec![Matrix6::zeros(); nodes - 1],
            rhs: vec![Vector6::zeros(); nodes],
        }
    }

    pub(crate) fn nodes(&self) -> usize {
        self.diagonal.len()
    }

    /// Adds element `index`, which spans nodes `index` and `index + 1`, with
    /// residual `R(u) = offset + jacobian * u`.
    pub(crate) fn add_element(
        &mut self,
        index: usize,
        jacobian: &ElementMatrix,
        offset: &ElementVector,
    ) {
        self.diagonal[index] += jacobian.fixed_view::<6, 6>(0, 0);
        self.upper[index] += jacobian.fixed_view::<6, 6>(0, 6);
        self.lower[index] += jacobian.fixed_view::<6, 6>(6, 0);
        self.diagonal[index + 1] += jacobian.fixed_view::<6, 6>(6, 6);
        self.rhs[index] -= offset.fixed_rows::<6>(0);
        self.rhs[index + 1] -= offset.fixed_rows::<6>(6);
    }

    /// Solves by block elimination without pivoting between blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if a pivot block is singular.
    pub(crate) fn solve(&self) -> Result<Vec<Vector6<f64>>, FemError> {
        let n = self.nodes();
        let mut upper = Vec::with_capacity(n - 1);
        let mut rhs = Vec::with_capacity(n);

        for i in 0..n {
            let (pivot, b) = if i == 0 {
                (self.diagonal[0], self.rhs[0])
            } else {
                let l = &self.lower[i - 1];
                (
                    self.diagonal[i] - l * upper[i - 1],
                    self.rhs[i] - l * rhs[i - 1],
                )
            };

            let lu = pivot.lu();
            let singular = FemError::SingularBlock { block: i };
            if i + 1 < n {
                upper.push(lu.solve(&self.upper[i]).ok_or(singular)?);
            }
            rhs.push(lu.solve(&b).ok_or(singular)?);
        }

        let mut solution = rhs;
        for i in (0..n - 1).rev() {
            let next = solution[i + 1];
            solution[i] -= upper[i] * next;
        }
        Ok(solution)
    }

    /// Solves the equivalent dense system with partial pivoting.
    ///
    /// # Errors
    ///
    /// Returns an error if the system is singular.
    pub(crate) fn solve_dense(&self) -> Result<Vec<Vector6<f64>>, FemError> {
        let n = self.nodes();
        let mut matrix = DMatrix::zeros(6 * n, 6 * n);
        for i in 0..n {
            matrix
                .fixed_view_mut::<6, 6>(6 * i, 6 * i)
                .copy_from(&self.diagonal[i]);
            if i + 1 < n {
                matrix
                    .fixed_view_mut::<6, 6>(6 * i, 6 * (i + 1))
                    .copy_from(&self.upper[i]);
                matrix
                    .fixed_view_mut::<6, 6>(6 * (i + 1), 6 * i)
                    .copy_from(&self.lower[i]);
            }
        }
        let rhs = DVector::from_iterator(6 * n, self.rhs.iter().flat_map(|b| b.iter().copied()));

        let solution = matrix.lu().solve(&rhs).ok_or(FemError::Singular)?;
        Ok((0..n)
            .map(|i| solution.fixed_rows::<6>(6 * i).into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    /// A diagonally dominant system with known solution.
    fn system(nodes: usize) -> (BlockTridiagonal, Vec<Vector6<f64>>) {
        let mut system = BlockTridiagonal::zeros(nodes);
        let expected: Vec<_> = (0..nodes)
            .map(|i| Vector6::from_fn(|r, _| (i * 6 + r) as f64 * 0.1 - 1.0))
            .collect();

        for i in 0..nodes {
            system.diagonal[i] = Matrix6::from_fn(|r, c| {
                if r == c {
                    8.0 + i as f64
                } else {
                    0.3 * ((r + 2 * c + i) as f64).sin()
                }
            });
        }
        for i in 0..nodes - 1 {
            system.upper[i] = Matrix6::from_fn(|r, c| 0.5 * ((r * c + i) as f64).cos());
            system.lower[i] = Matrix6::from_fn(|r, c| -0.4 * ((r + c + i) as f64).sin());
        }
        for i in 0..nodes {
            let mut b = system.diagonal[i] * expected[i];
            if i > 0 {
                b += system.lower[i - 1] * expected[i - 1];
            }
            if i + 1 < nodes {
                b += system.upper[i] * expected[i + 1];
            }
            system.rhs[i] = b;
        }
        (system, expected)
    }

    #[test]
    fn block_elimination_recovers_known_solution() {
        let (system, expected) = system(7);

        let solution = system.solve().unwrap();

        for (x, e) in solution.iter().zip(&expected) {
            assert_relative_eq!(x, e, epsilon = 1e-10);
        }
    }

    #[test]
    fn dense_and_block_solvers_agree() {
        let (system, _) = system(5);

        let block = system.solve().unwrap();
        let dense = system.solve_dense().unwrap();

        for (a, b) in block.iter().zip(&dense) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn singular_pivot_is_reported() {
        let system = BlockTridiagonal::zeros(3);

        assert_eq!(system.solve(), Err(FemError::SingularBlock { block: 0 }));
        assert_eq!(system.solve_dense(), Err(FemError::Singular));
    }

    #[test]
    fn elements_scatter_into_neighboring_blocks() {
        let mut system = BlockTridiagonal::zeros(3);
        let jacobian = ElementMatrix::from_fn(|r, c| (r * 12 + c) as f64);
        let offset = ElementVector::from_fn(|r, _| r as f64);

        system.add_element(0, &jacobian, &offset);
        system.add_element(1, &jacobian, &offset);

        assert_relative_eq!(system.upper[1][(0, 0)], 6.0);
        assert_relative_eq!(system.lower[0][(0, 0)], 72.0);
        // Node 1 is the second node of element 0 and the first of element 1.
        assert_relative_eq!(system.diagonal[1][(0, 0)], 78.0 + 0.0);
        assert_relative_eq!(system.rhs[1][0], -6.0);
    }
}
