//! Main Grid type

use crate::error::{Error, Result};
use crate::raster::Georef;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// Minimum number of rows and columns of a grid
pub const MIN_GRID_SIZE: usize = 3;

/// A georeferenced 2D elevation grid.
///
/// Values are `f32` stored in row-major order (row 0 is the northern edge).
/// `NaN` marks a void cell without data. The shape never changes after
/// construction; operators write into a separate grid of identical shape.
///
/// # Example
///
/// ```ignore
/// use terrashade_core::{Georef, Grid};
///
/// let mut grid = Grid::new(100, 100, Georef::new(30.0, 0.0, 0.0))?;
/// grid.set(10, 20, 42.0)?;
/// let value = grid.get(10, 20)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Values in standard (row-major) layout
    data: Array2<f32>,
    georef: Georef,
}

impl Grid {
    /// Create a new grid filled with zeros
    pub fn new(rows: usize, cols: usize, georef: Georef) -> Result<Self> {
        Self::filled(rows, cols, 0.0, georef)
    }

    /// Create a new grid filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: f32, georef: Georef) -> Result<Self> {
        validate(rows, cols, &georef)?;
        Ok(Self {
            data: Array2::from_elem((rows, cols), value),
            georef,
        })
    }

    /// Create a grid from row-major values
    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize, georef: Georef) -> Result<Self> {
        validate(rows, cols, &georef)?;
        if data.len() != rows * cols {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: data.len() / cols.max(1),
                ac: cols,
            });
        }
        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data, georef })
    }

    /// Create a grid from an ndarray
    pub fn from_array(data: Array2<f32>, georef: Georef) -> Result<Self> {
        let (rows, cols) = data.dim();
        validate(rows, cols, &georef)?;
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self { data, georef })
    }

    /// Create a grid with the same shape and georeferencing, filled with a value
    pub fn like(&self, value: f32) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), value),
            georef: self.georef,
        }
    }

    /// Replace the values, keeping shape and georeferencing.
    ///
    /// `data` must hold exactly `rows * cols` values.
    pub fn with_values(&self, data: Vec<f32>) -> Result<Self> {
        Self::from_vec(data, self.rows(), self.cols(), self.georef)
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: grids hold at least 3x3 cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `other` has the same number of rows and columns
    pub fn same_shape(&self, other: &Grid) -> bool {
        self.shape() == other.shape()
    }

    /// Error unless `other` has the same shape as this grid
    pub fn check_same_shape(&self, other: &Grid) -> Result<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            })
        }
    }

    // Georeferencing

    pub fn georef(&self) -> &Georef {
        &self.georef
    }

    pub fn cell_size(&self) -> f64 {
        self.georef.cell_size
    }

    pub fn west(&self) -> f64 {
        self.georef.west
    }

    pub fn south(&self) -> f64 {
        self.georef.south
    }

    pub fn north(&self) -> f64 {
        self.georef.north(self.rows())
    }

    pub fn east(&self) -> f64 {
        self.georef.east(self.cols())
    }

    /// Coordinates of vertex (row, col)
    pub fn vertex_to_xy(&self, row: usize, col: usize) -> (f64, f64) {
        self.georef.vertex_to_xy(row, col, self.rows())
    }

    /// Whether (x, y) lies inside the grid extent, borders included
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.west() && x <= self.east() && y >= self.south() && y <= self.north()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f32> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Value at (row, col); the caller guarantees the indices are in range
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.data[(row, col)]
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Consume the grid and return the underlying array
    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// All values in row-major order
    pub fn as_slice(&self) -> &[f32] {
        // owned arrays are kept in standard layout by every constructor
        self.data.as_slice().unwrap_or(&[])
    }

    /// All values in row-major order, mutable
    pub fn as_slice_mut(&mut self) -> &mut [f32] {
        self.data.as_slice_mut().unwrap_or(&mut [])
    }

    /// Values of one row
    pub fn row_slice(&self, row: usize) -> &[f32] {
        let cols = self.cols();
        &self.as_slice()[row * cols..(row + 1) * cols]
    }

    // Statistics

    /// Minimum and maximum of all non-void values, `None` if every cell is void
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Whether any cell is void
    pub fn has_voids(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Number of void cells
    pub fn void_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

fn validate(rows: usize, cols: usize, georef: &Georef) -> Result<()> {
    if rows < MIN_GRID_SIZE || cols < MIN_GRID_SIZE {
        return Err(Error::InvalidDimensions { rows, cols });
    }
    if !(georef.cell_size.is_finite() && georef.cell_size > 0.0) {
        return Err(Error::InvalidCellSize(georef.cell_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn georef() -> Georef {
        Georef::new(10.0, 500.0, 1000.0)
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(100, 200, georef()).unwrap();
        assert_eq!(grid.rows(), 100);
        assert_eq!(grid.cols(), 200);
        assert_eq!(grid.shape(), (100, 200));
        assert_eq!(grid.north(), 1000.0 + 99.0 * 10.0);
        assert_eq!(grid.east(), 500.0 + 199.0 * 10.0);
    }

    #[test]
    fn test_rejects_small_grid() {
        assert!(matches!(
            Grid::new(2, 10, georef()),
            Err(Error::InvalidDimensions { rows: 2, cols: 10 })
        ));
        assert!(Grid::new(3, 3, georef()).is_ok());
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        for cs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Grid::new(5, 5, Georef::new(cs, 0.0, 0.0)),
                Err(Error::InvalidCellSize(_))
            ));
        }
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let result = Grid::from_vec(vec![0.0; 10], 3, 3, georef());
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_grid_access() {
        let mut grid = Grid::new(10, 10, georef()).unwrap();
        grid.set(5, 5, 42.0).unwrap();
        assert_eq!(grid.get(5, 5).unwrap(), 42.0);
        assert_eq!(grid.row_slice(5)[5], 42.0);
        assert!(grid.get(10, 0).is_err());
        assert!(grid.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_min_max_skips_voids() {
        let mut grid = Grid::new(4, 4, georef()).unwrap();
        for (i, v) in grid.as_slice_mut().iter_mut().enumerate() {
            *v = i as f32;
        }
        grid.set(0, 0, f32::NAN).unwrap();
        assert_eq!(grid.min_max(), Some((1.0, 15.0)));
        assert!(grid.has_voids());
        assert_eq!(grid.void_count(), 1);
    }

    #[test]
    fn test_min_max_all_void() {
        let grid = Grid::filled(3, 3, f32::NAN, georef()).unwrap();
        assert_eq!(grid.min_max(), None);
    }

    #[test]
    fn test_from_array_transposed_is_standard() {
        let array = Array2::from_shape_fn((4, 3), |(r, c)| (r * 3 + c) as f32);
        let t = array.reversed_axes();
        let grid = Grid::from_array(t, georef()).unwrap();
        assert_eq!(grid.shape(), (3, 4));
        assert_eq!(grid.as_slice().len(), 12);
        assert_eq!(grid.value(1, 2), 7.0);
    }
}
