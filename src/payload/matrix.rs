//! Matrix - a typed 2-D buffer, usually supplied by an external caller.

use crate::core::Region;
use crate::util::{Column, Error, Result, ValueType};

/// Storage order of a matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    #[default]
    RowMajor,
    ColumnMajor,
}

/// Typed matrix with optional per-row text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matrix {
    pub n_rows: usize,
    pub n_columns: usize,
    pub shape: Shape,
    pub data: Column,
    pub text: Option<Vec<String>>,
    /// Domain when the matrix backs a raster
    pub region: Option<Region>,
}

impl Matrix {
    /// Zero-filled matrix.
    pub fn new(value_type: ValueType, n_rows: usize, n_columns: usize, shape: Shape) -> Self {
        Self {
            n_rows,
            n_columns,
            shape,
            data: Column::zeros(value_type, n_rows * n_columns),
            text: None,
            region: None,
        }
    }

    /// Wrap an existing buffer.
    pub fn from_column(data: Column, n_rows: usize, n_columns: usize, shape: Shape) -> Result<Self> {
        if data.len() < n_rows * n_columns {
            return Err(Error::DimensionMismatch(format!(
                "{} values cannot hold {n_rows}x{n_columns}",
                data.len()
            )));
        }
        Ok(Self {
            n_rows,
            n_columns,
            shape,
            data,
            text: None,
            region: None,
        })
    }

    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    /// Rows the buffer can hold at the current column count.
    pub fn row_capacity(&self) -> usize {
        if self.n_columns == 0 {
            0
        } else {
            self.data.len() / self.n_columns
        }
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        match self.shape {
            Shape::RowMajor => row * self.n_columns + col,
            Shape::ColumnMajor => col * self.n_rows + row,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.n_rows || col >= self.n_columns {
            return None;
        }
        self.data.get(self.index(row, col))
    }

    pub fn put(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows || col >= self.n_columns {
            return Err(Error::DimensionMismatch(format!("({row}, {col}) outside matrix")));
        }
        let i = self.index(row, col);
        self.data.put(i, value)
    }

    /// Row `row` widened to doubles.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.n_columns).filter_map(|c| self.get(row, c)).collect()
    }

    /// Reorder storage to `shape` in place.
    pub fn transpose_to(&mut self, shape: Shape) -> Result<()> {
        if shape == self.shape {
            return Ok(());
        }
        let mut out = Column::zeros(self.value_type(), self.n_rows * self.n_columns);
        for r in 0..self.n_rows {
            for c in 0..self.n_columns {
                let v = self.get(r, c).unwrap_or(f64::NAN);
                let i = match shape {
                    Shape::RowMajor => r * self.n_columns + c,
                    Shape::ColumnMajor => c * self.n_rows + r,
                };
                out.put(i, v)?;
            }
        }
        self.data = out;
        self.shape = shape;
        Ok(())
    }
}
