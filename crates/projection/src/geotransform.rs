//! GDAL-style affine geotransform.
//!
//! A geotransform maps grid (column, row) indices to projected (x, y)
//! coordinates with six coefficients in GDAL order:
//!
//! - GT(0) x-coordinate of the upper-left corner of the upper-left pixel
//! - GT(1) w-e pixel resolution / pixel width
//! - GT(2) row rotation (typically zero)
//! - GT(3) y-coordinate of the upper-left corner of the upper-left pixel
//! - GT(4) column rotation (typically zero)
//! - GT(5) n-s pixel resolution / pixel height (negative for north-up)
//!
//! Coordinates are sampled at pixel centres, so `(0, 0)` maps to the centre
//! of the upper-left pixel rather than its corner.

use std::fmt;
use std::str::FromStr;

use netcdf_tree::DataType;

use crate::error::{ProjectionError, ProjectionResult};

/// Six-coefficient affine transform from grid indices to coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geotransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub top_left_y: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
}

impl Geotransform {
    pub fn new(
        top_left_x: f64,
        pixel_width: f64,
        row_rotation: f64,
        top_left_y: f64,
        column_rotation: f64,
        pixel_height: f64,
    ) -> Self {
        Self {
            top_left_x,
            pixel_width,
            row_rotation,
            top_left_y,
            column_rotation,
            pixel_height,
        }
    }

    /// Build from a configuration list in GDAL order.
    pub fn from_config(coefficients: &[f64]) -> ProjectionResult<Self> {
        match coefficients {
            [a, b, c, d, e, f] => Ok(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => Err(ProjectionError::InvalidGeotransform(format!(
                "expected 6 coefficients, got {}",
                coefficients.len()
            ))),
        }
    }

    /// Parse a GDAL `GeoTransform` attribute: six whitespace-separated numbers.
    pub fn from_gdal_string(text: &str) -> ProjectionResult<Self> {
        let coefficients = text
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    ProjectionError::InvalidGeotransform(format!("not a number: '{}'", token))
                })
            })
            .collect::<ProjectionResult<Vec<f64>>>()?;
        Self::from_config(&coefficients)
    }

    /// Coefficients in GDAL order.
    pub fn to_config(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.row_rotation,
            self.top_left_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    /// Convert a grid cell location to the x, y coordinate of its centre.
    pub fn col_row_to_xy(&self, col: usize, row: usize) -> (f64, f64) {
        let adj_col = col as f64 + 0.5;
        let adj_row = row as f64 + 0.5;

        let x = self.top_left_x + adj_col * self.pixel_width + adj_row * self.row_rotation;
        let y = self.top_left_y + adj_col * self.column_rotation + adj_row * self.pixel_height;
        (x, y)
    }

    /// Coordinate values along one axis for `size` cells starting at `start`.
    ///
    /// The x axis walks columns along row 0; the y axis walks rows along
    /// column 0. Each value is rounded through `dtype`.
    pub fn dimension_scale(
        &self,
        axis: SpatialAxis,
        start: usize,
        size: usize,
        dtype: DataType,
    ) -> ProjectionResult<Vec<f64>> {
        let end = start
            .checked_add(size)
            .ok_or(ProjectionError::IndexOutOfRange { start, size })?;

        Ok((start..end)
            .map(|index| match axis {
                SpatialAxis::X => self.col_row_to_xy(index, 0).0,
                SpatialAxis::Y => self.col_row_to_xy(0, index).1,
            })
            .map(|value| dtype.coerce(value))
            .collect())
    }
}

/// Spatial axis of a dimension variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialAxis {
    X,
    Y,
}

impl FromStr for SpatialAxis {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(SpatialAxis::X),
            "y" => Ok(SpatialAxis::Y),
            other => Err(ProjectionError::InvalidSpatialDimensionType(other.to_string())),
        }
    }
}

impl fmt::Display for SpatialAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialAxis::X => f.write_str("x"),
            SpatialAxis::Y => f.write_str("y"),
        }
    }
}

/// Compute a dimension scale from a geotransform configuration list.
///
/// `spatial_dimension_type` must be `"x"` or `"y"`.
pub fn compute_dimension_scale(
    start_index: usize,
    dim_size: usize,
    spatial_dimension_type: &str,
    dimension_value_dtype: DataType,
    geotransform_config: &[f64],
) -> ProjectionResult<Vec<f64>> {
    let axis: SpatialAxis = spatial_dimension_type.parse()?;
    let geotransform = Geotransform::from_config(geotransform_config)?;
    geotransform.dimension_scale(axis, start_index, dim_size, dimension_value_dtype)
}
