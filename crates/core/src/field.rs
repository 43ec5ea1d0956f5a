use std::ops::Index;

use nalgebra::Vector3;
use ndarray::{Array1, Array2, ArrayView2};
use thiserror::Error;

/// A uniform grid of nodes along the reference arclength `s ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    points: usize,
}

/// Errors that can occur when constructing a [`Grid`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    #[error("a grid needs at least 2 points, got {0}")]
    TooFewPoints(usize),
}

impl Grid {
    /// Creates a grid of `points` equally spaced nodes, both ends included.
    ///
    /// # Errors
    ///
    /// Returns an error if `points < 2`.
    pub fn uniform(points: usize) -> Result<Self, GridError> {
        if points < 2 {
            return Err(GridError::TooFewPoints(points));
        }
        Ok(Self { points })
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn points(&self) -> usize {
        self.points
    }

    /// Returns the distance between neighboring nodes.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        1.0 / (self.points - 1) as f64
    }

    /// Returns the arclength of node `index`.
    #[must_use]
    pub fn arclength(&self, index: usize) -> f64 {
        index as f64 * self.spacing()
    }

    /// Returns an iterator over the arclength of every node.
    pub fn arclengths(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.points).map(|i| self.arclength(i))
    }
}

/// Errors that can occur when converting arrays into nodal fields.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("expected an array of shape {expected:?}, got {found:?}")]
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// A 3-vector at every node of a [`Grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField(Vec<Vector3<f64>>);

impl VectorField {
    /// Wraps nodal values.
    #[must_use]
    pub fn new(values: Vec<Vector3<f64>>) -> Self {
        Self(values)
    }

    /// Creates a field of `len` zero vectors.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(vec![Vector3::zeros(); len])
    }

    /// Creates a field with the same vector at every node.
    #[must_use]
    pub fn constant(len: usize, value: Vector3<f64>) -> Self {
        Self(vec![value; len])
    }

    /// Creates a field by evaluating `f` at each node index.
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> Vector3<f64>) -> Self {
        Self((0..len).map(f).collect())
    }

    /// Converts a `3×N` array (component-major) into a field.
    ///
    /// # Errors
    ///
    /// Returns an error if the array does not have exactly 3 rows.
    pub fn from_array(array: ArrayView2<'_, f64>) -> Result<Self, FieldError> {
        let (rows, cols) = array.dim();
        if rows != 3 {
            return Err(FieldError::Shape {
                expected: (3, cols),
                found: (rows, cols),
            });
        }
        Ok(Self::from_fn(cols, |j| {
            Vector3::new(array[[0, j]], array[[1, j]], array[[2, j]])
        }))
    }

    /// Returns the field as a `3×N` array (component-major).
    #[must_use]
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((3, self.len()), |(c, j)| self.0[j][c])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Vector3<f64>] {
        &self.0
    }

    /// Returns `true` if every component at every node is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.iter().all(|x| x.is_finite()))
    }

    /// Applies `f` to every nodal value.
    #[must_use]
    pub fn map(&self, f: impl FnMut(&Vector3<f64>) -> Vector3<f64>) -> Self {
        Self(self.0.iter().map(f).collect())
    }

    /// Combines two fields node by node.
    #[must_use]
    pub fn zip_map(
        &self,
        other: &Self,
        mut f: impl FnMut(&Vector3<f64>, &Vector3<f64>) -> Vector3<f64>,
    ) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Self(self.0.iter().zip(&other.0).map(|(a, b)| f(a, b)).collect())
    }

    /// Returns `weight * self + offset` node by node.
    #[must_use]
    pub fn scale_add(&self, weight: f64, offset: &Self) -> Self {
        self.zip_map(offset, |x, o| x * weight + o)
    }

    /// Returns the nodal dot product with another field.
    #[must_use]
    pub fn dot(&self, other: &Self) -> ScalarField {
        debug_assert_eq!(self.len(), other.len());
        ScalarField(self.0.iter().zip(&other.0).map(|(a, b)| a.dot(b)).collect())
    }

    /// Returns the Euclidean norm at every node.
    #[must_use]
    pub fn norm(&self) -> ScalarField {
        ScalarField(self.0.iter().map(|v| v.norm()).collect())
    }

    /// Returns the largest absolute component difference to another field.
    #[must_use]
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).amax())
            .fold(0.0, f64::max)
    }
}

impl Index<usize> for VectorField {
    type Output = Vector3<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<Vector3<f64>> for VectorField {
    fn from_iter<I: IntoIterator<Item = Vector3<f64>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A scalar at every node of a [`Grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField(Vec<f64>);

impl ScalarField {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self((0..len).map(f).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Combines two fields node by node.
    #[must_use]
    pub fn zip_map(&self, other: &Self, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Self(self.0.iter().zip(&other.0).map(|(a, b)| f(*a, *b)).collect())
    }

    #[must_use]
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(self.0.clone())
    }
}

impl Index<usize> for ScalarField {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl FromIterator<f64> for ScalarField {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn grid_spans_unit_interval() {
        let grid = Grid::uniform(5).unwrap();

        assert_eq!(grid.points(), 5);
        assert_relative_eq!(grid.spacing(), 0.25);
        let s: Vec<_> = grid.arclengths().collect();
        assert_eq!(s, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn grid_rejects_single_point() {
        assert_eq!(Grid::uniform(1), Err(GridError::TooFewPoints(1)));
    }

    #[test]
    fn array_conversion_is_component_major() {
        let field = VectorField::from_fn(2, |j| Vector3::new(j as f64, 10.0, -1.0));

        let array = field.to_array();

        assert_eq!(array, array![[0.0, 1.0], [10.0, 10.0], [-1.0, -1.0]]);
        assert_eq!(VectorField::from_array(array.view()).unwrap(), field);
    }

    #[test]
    fn from_array_rejects_wrong_row_count() {
        let array = Array2::<f64>::zeros((2, 4));

        let error = VectorField::from_array(array.view()).unwrap_err();

        assert_eq!(
            error,
            FieldError::Shape {
                expected: (3, 4),
                found: (2, 4)
            }
        );
    }

    #[test]
    fn nan_anywhere_is_not_finite() {
        let mut values = vec![Vector3::zeros(); 3];
        assert!(VectorField::new(values.clone()).is_finite());

        values[2].y = f64::NAN;
        assert!(!VectorField::new(values).is_finite());
    }

    #[test]
    fn max_abs_diff_takes_largest_component() {
        let a = VectorField::constant(2, Vector3::new(1.0, 2.0, 3.0));
        let b = VectorField::new(vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 2.0, 5.0)]);

        assert_relative_eq!(a.max_abs_diff(&b), 2.0);
    }
}
