//! Dataset - tables of segments of numeric records, with optional trailing text.

use crate::core::Geometry;
use crate::record::Record;

/// One segment: column-major numeric data plus optional per-row text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSegment {
    /// Segment header text (without the `>` marker), if one was given
    pub header: Option<String>,
    /// Column-major values, `columns[c][row]`
    pub columns: Vec<Vec<f64>>,
    /// Trailing text per row, present once any row carried text
    pub text: Option<Vec<String>>,
}

impl DataSegment {
    /// Empty segment with `n_columns` columns.
    pub fn new(n_columns: usize) -> Self {
        Self {
            header: None,
            columns: vec![Vec::new(); n_columns],
            text: None,
        }
    }

    /// Zero-filled segment of the given shape.
    pub fn with_rows(n_columns: usize, n_rows: usize) -> Self {
        Self {
            header: None,
            columns: vec![vec![0.0; n_rows]; n_columns],
            text: None,
        }
    }

    /// Build a segment from rows.
    pub fn from_rows(rows: &[&[f64]]) -> Self {
        let n_columns = rows.first().map_or(0, |r| r.len());
        let mut seg = Self::new(n_columns);
        for row in rows {
            seg.push_row(row, None);
        }
        seg
    }

    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or_else(
            || self.text.as_ref().map_or(0, |t| t.len()),
            |c| c.len(),
        )
    }

    /// Append a row; short rows are NaN-padded, long rows truncated.
    pub fn push_row(&mut self, values: &[f64], text: Option<&str>) {
        let row = self.n_rows();
        for (c, column) in self.columns.iter_mut().enumerate() {
            column.push(values.get(c).copied().unwrap_or(f64::NAN));
        }
        match (text, &mut self.text) {
            (Some(t), Some(texts)) => texts.push(t.to_string()),
            (Some(t), None) => {
                let mut texts = vec![String::new(); row];
                texts.push(t.to_string());
                self.text = Some(texts);
            }
            (None, Some(texts)) => texts.push(String::new()),
            (None, None) => {}
        }
    }

    /// Value at (`col`, `row`).
    #[inline]
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        self.columns.get(col).and_then(|c| c.get(row)).copied()
    }

    /// Row `row` as a record.
    pub fn record(&self, row: usize) -> Record {
        let values = self.columns.iter().filter_map(|c| c.get(row).copied()).collect();
        let text = self
            .text
            .as_ref()
            .and_then(|t| t.get(row))
            .filter(|t| !t.is_empty())
            .cloned();
        Record { values, text }
    }
}

/// One table: header lines and segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    pub header: Vec<String>,
    pub segments: Vec<DataSegment>,
}

impl DataTable {
    #[inline]
    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn n_records(&self) -> usize {
        self.segments.iter().map(DataSegment::n_rows).sum()
    }
}

/// A dataset: one or more tables sharing a column count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub geometry: Geometry,
    pub n_columns: usize,
    pub tables: Vec<DataTable>,
}

impl Dataset {
    /// Empty dataset.
    pub fn new(geometry: Geometry, n_columns: usize) -> Self {
        Self {
            geometry,
            n_columns,
            tables: Vec::new(),
        }
    }

    /// Zero-filled dataset of the given shape.
    pub fn with_shape(
        geometry: Geometry,
        n_tables: usize,
        n_segments: usize,
        n_rows: usize,
        n_columns: usize,
    ) -> Self {
        let table = DataTable {
            header: Vec::new(),
            segments: vec![DataSegment::with_rows(n_columns, n_rows); n_segments],
        };
        Self {
            geometry,
            n_columns,
            tables: vec![table; n_tables],
        }
    }

    /// Single-table, single-segment dataset from rows.
    pub fn from_rows(geometry: Geometry, rows: &[&[f64]]) -> Self {
        let seg = DataSegment::from_rows(rows);
        Self {
            geometry,
            n_columns: seg.n_columns(),
            tables: vec![DataTable {
                header: Vec::new(),
                segments: vec![seg],
            }],
        }
    }

    #[inline]
    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn n_segments(&self) -> usize {
        self.tables.iter().map(DataTable::n_segments).sum()
    }

    pub fn n_records(&self) -> usize {
        self.tables.iter().map(DataTable::n_records).sum()
    }

    /// Iterate all segments in table order.
    pub fn segments(&self) -> impl Iterator<Item = &DataSegment> {
        self.tables.iter().flat_map(|t| t.segments.iter())
    }

    /// Min/max of a column ignoring NaNs.
    pub fn column_range(&self, col: usize) -> Option<(f64, f64)> {
        self.segments()
            .filter_map(|s| s.columns.get(col))
            .flatten()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Append the tables of `other` (column counts must agree unless one is empty).
    pub fn append(&mut self, mut other: Dataset) {
        if self.n_columns == 0 {
            self.n_columns = other.n_columns;
        }
        self.tables.append(&mut other.tables);
    }
}
