//! Buffer exchange layer
//!
//! Converts row-major arrays of 3-vectors into the flat contiguous layout the
//! delay and coherence kernels read, and back. Each allocation hands out a
//! [`BufferHandle`] carrying the row count; the buffer must be released with a
//! matching count exactly once. Dropping the buffer releases it on every other
//! exit path.

use crate::error::{Result, SlscError};
use crate::geometry::Point3;

/// Number of columns in a point array
pub const POINT_COLUMNS: usize = 3;

/// Shape metadata returned alongside an exchanged buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    pub rows: usize,
    pub cols: usize,
}

impl BufferHandle {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Owned, contiguous, row-major `rows × 3` point buffer
#[derive(Debug)]
pub struct ExchangeBuffer {
    data: Option<Vec<f64>>,
    handle: BufferHandle,
}

/// Validate that `shape` describes a rank-2 array with exactly three columns
/// holding `len` values, returning the row count.
pub fn validate_point_shape(context: &str, shape: &[usize], len: usize) -> Result<usize> {
    if shape.len() != 2 {
        return Err(SlscError::shape(
            format!("{} rank", context),
            2,
            shape.len(),
        ));
    }
    if shape[1] != POINT_COLUMNS {
        return Err(SlscError::shape(
            format!("{} columns", context),
            format!("[N, {}]", POINT_COLUMNS),
            format!("{:?}", shape),
        ));
    }
    let expected = shape[0] * shape[1];
    if expected != len {
        return Err(SlscError::size(format!("{} buffer", context), expected, len));
    }
    Ok(shape[0])
}

impl ExchangeBuffer {
    /// Copy a flat row-major array with declared `shape` into an exchange buffer.
    ///
    /// Fails with `ShapeMismatch` unless `shape` is `[N, 3]`, and with
    /// `SizeMismatch` if `data` does not hold `N * 3` values. Nothing is
    /// allocated when validation fails.
    pub fn from_flat(data: &[f64], shape: &[usize]) -> Result<Self> {
        let rows = validate_point_shape("point array", shape, data.len())?;
        Ok(Self {
            data: Some(data.to_vec()),
            handle: BufferHandle {
                rows,
                cols: POINT_COLUMNS,
            },
        })
    }

    /// Copy typed points into an exchange buffer
    pub fn from_points(points: &[Point3]) -> Self {
        let mut data = Vec::with_capacity(points.len() * POINT_COLUMNS);
        for p in points {
            data.extend_from_slice(&[p.x, p.y, p.z]);
        }
        Self {
            data: Some(data),
            handle: BufferHandle {
                rows: points.len(),
                cols: POINT_COLUMNS,
            },
        }
    }

    /// Copy nested rows into an exchange buffer, checking every row has three columns
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * POINT_COLUMNS);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != POINT_COLUMNS {
                return Err(SlscError::shape(
                    format!("point array row {}", i),
                    POINT_COLUMNS,
                    row.len(),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data: Some(data),
            handle: BufferHandle {
                rows: rows.len(),
                cols: POINT_COLUMNS,
            },
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Number of points held
    pub fn rows(&self) -> usize {
        self.handle.rows
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Flat row-major view; `StateError` once released
    pub fn as_slice(&self) -> Result<&[f64]> {
        self.data
            .as_deref()
            .ok_or_else(|| SlscError::StateError("exchange buffer already released".to_string()))
    }

    /// Point `i` of the buffer
    pub fn point(&self, i: usize) -> Result<Point3> {
        let data = self.as_slice()?;
        if i >= self.handle.rows {
            return Err(SlscError::OutOfRange {
                axis: "points".to_string(),
                index: i,
                len: self.handle.rows,
            });
        }
        let row = &data[i * POINT_COLUMNS..(i + 1) * POINT_COLUMNS];
        Ok(Point3::new(row[0], row[1], row[2]))
    }

    /// Copy back into typed points
    pub fn to_points(&self) -> Result<Vec<Point3>> {
        Ok(self
            .as_slice()?
            .chunks_exact(POINT_COLUMNS)
            .map(|row| Point3::new(row[0], row[1], row[2]))
            .collect())
    }

    /// Release the backing storage.
    ///
    /// `rows` must match the row count handed out at allocation; releasing a
    /// second time is a `StateError`.
    pub fn release(&mut self, rows: usize) -> Result<()> {
        if self.data.is_none() {
            return Err(SlscError::StateError(
                "exchange buffer released twice".to_string(),
            ));
        }
        if rows != self.handle.rows {
            return Err(SlscError::size("exchange buffer release", self.handle.rows, rows));
        }
        self.data = None;
        Ok(())
    }
}
