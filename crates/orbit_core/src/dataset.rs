use nalgebra::{DMatrix, DVector, SVector};
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::slice;

/// Coordinate view of one point of a trajectory, so a dataset can be
/// consumed as a plain numeric table regardless of which system variant
/// produced it.
pub trait Point {
    fn dim(&self) -> usize;
    fn coords(&self) -> &[f64];
}

impl Point for f64 {
    fn dim(&self) -> usize {
        1
    }
    fn coords(&self) -> &[f64] {
        slice::from_ref(self)
    }
}

impl<const D: usize> Point for SVector<f64, D> {
    fn dim(&self) -> usize {
        D
    }
    fn coords(&self) -> &[f64] {
        self.as_slice()
    }
}

impl Point for DVector<f64> {
    fn dim(&self) -> usize {
        self.len()
    }
    fn coords(&self) -> &[f64] {
        self.as_slice()
    }
}

/// An ordered sequence of state points, one per discrete time step.
///
/// Point i is generated strictly before point i+1, and every point is an
/// independent copy owned by the dataset; nothing aliases the buffers of the
/// system that produced it. The table is append-only during construction and
/// not mutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset<P> {
    points: Vec<P>,
}

impl<P> Dataset<P> {
    pub fn new(points: Vec<P>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&P> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&P> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&P> {
        self.points.last()
    }

    pub fn iter(&self) -> slice::Iter<'_, P> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<P> {
        self.points
    }
}

impl<P> Index<usize> for Dataset<P> {
    type Output = P;

    fn index(&self, index: usize) -> &P {
        &self.points[index]
    }
}

impl<'a, P> IntoIterator for &'a Dataset<P> {
    type Item = &'a P;
    type IntoIter = slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<P: Point> Dataset<P> {
    /// Dimension of the points, 0 for an empty dataset.
    pub fn dimension(&self) -> usize {
        self.points.first().map(Point::dim).unwrap_or(0)
    }

    /// Exports the dataset as a matrix with one row per time step and one
    /// column per coordinate.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let rows = self.points.len();
        let cols = self.dimension();
        let mut matrix = DMatrix::zeros(rows, cols);
        for (i, point) in self.points.iter().enumerate() {
            let coords = point.coords();
            for j in 0..cols {
                matrix[(i, j)] = coords[j];
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn matrix_export_is_row_per_step() {
        let dataset = Dataset::new(vec![
            Vector2::new(1.0, 2.0),
            Vector2::new(3.0, 4.0),
            Vector2::new(5.0, 6.0),
        ]);
        let matrix = dataset.to_matrix();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 2);
        assert_eq!(matrix[(0, 1)], 2.0);
        assert_eq!(matrix[(2, 0)], 5.0);
    }

    #[test]
    fn scalar_points_export_as_single_column() {
        let dataset = Dataset::new(vec![0.2, 0.64, 0.9216]);
        assert_eq!(dataset.dimension(), 1);
        let matrix = dataset.to_matrix();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 1);
        assert_eq!(matrix[(1, 0)], 0.64);
    }

    #[test]
    fn indexing_and_iteration_preserve_order() {
        let dataset = Dataset::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(dataset[0], 1.0);
        assert_eq!(dataset.first(), Some(&1.0));
        assert_eq!(dataset.last(), Some(&3.0));
        let collected: Vec<f64> = dataset.iter().copied().collect();
        assert_eq!(collected, vec![1.0, 2.0, 3.0]);
    }
}
