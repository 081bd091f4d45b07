//! VectorSet and CoordArray - sets of parallel column vectors.

use crate::util::{Column, Error, Result, ValueType};

/// Parallel typed columns of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorSet {
    pub columns: Vec<Column>,
    pub n_rows: usize,
    pub text: Option<Vec<String>>,
}

impl VectorSet {
    /// Empty set with one column per type.
    pub fn new(types: &[ValueType]) -> Self {
        Self {
            columns: types.iter().map(|&t| Column::with_capacity(t, 0)).collect(),
            n_rows: 0,
            text: None,
        }
    }

    /// Wrap existing columns; they must agree in length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        if columns.iter().any(|c| c.len() != n_rows) {
            return Err(Error::DimensionMismatch("vector lengths differ".into()));
        }
        Ok(Self {
            columns,
            n_rows,
            text: None,
        })
    }

    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Row `row` widened to doubles.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().filter_map(|c| c.get(row)).collect()
    }

    /// Append a row; missing values become NaN.
    pub fn push_row(&mut self, values: &[f64]) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.push(values.get(i).copied().unwrap_or(f64::NAN));
        }
        self.n_rows += 1;
    }
}

/// A coordinate array (node positions along one axis).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoordArray {
    pub values: Vec<f64>,
}

impl CoordArray {
    /// `n` evenly spaced values starting at `start`.
    pub fn linspace(start: f64, inc: f64, n: usize) -> Self {
        Self {
            values: (0..n).map(|i| start + i as f64 * inc).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_rows() {
        let mut v = VectorSet::new(&[ValueType::Float64, ValueType::Int32]);
        v.push_row(&[1.5, 2.0]);
        v.push_row(&[3.5]);
        assert_eq!(v.n_rows, 2);
        assert_eq!(v.row(0), vec![1.5, 2.0]);
        assert_eq!(v.row(1)[0], 3.5);
    }

    #[test]
    fn test_mismatched_lengths() {
        let cols = vec![Column::from_slice(&[1.0f64, 2.0]), Column::from_slice(&[1.0f64])];
        assert!(VectorSet::from_columns(cols).is_err());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(CoordArray::linspace(1.0, 0.5, 3).values, vec![1.0, 1.5, 2.0]);
    }
}
