//! Generators for subset index-reference arrays.
//!
//! Subsetting services record where each pixel of a subsetted grid came
//! from in the original grid as 2-D row and column index arrays. These
//! generators build such arrays with predictable values.

/// Creates a row-major column-index array.
///
/// Every row holds `start_col, start_col + 1, ...`, so the value at (0, 0)
/// is `start_col`.
///
/// # Example
///
/// ```
/// use test_utils::column_index_grid;
///
/// let grid = column_index_grid(3, 3, 5);
/// assert_eq!(grid, vec![5.0, 6.0, 7.0, 5.0, 6.0, 7.0, 5.0, 6.0, 7.0]);
/// ```
pub fn column_index_grid(rows: usize, cols: usize, start_col: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        for col in 0..cols {
            data.push((start_col + col) as f64);
        }
    }
    data
}

/// Creates a row-major row-index array.
///
/// Every column holds `start_row, start_row + 1, ...` down the rows.
///
/// # Example
///
/// ```
/// use test_utils::row_index_grid;
///
/// let grid = row_index_grid(2, 3, 16);
/// assert_eq!(grid, vec![16.0, 16.0, 16.0, 17.0, 17.0, 17.0]);
/// ```
pub fn row_index_grid(rows: usize, cols: usize, start_row: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for _ in 0..cols {
            data.push((start_row + row) as f64);
        }
    }
    data
}
