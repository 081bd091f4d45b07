//! Record streams.
//!
//! Everything record-by-record I/O touches is expressed as a stream of
//! [`Event`]s. A [`RecordSource`] produces them from a file, a stream or an
//! in-memory container; a [`RecordSink`] consumes them into a file or into a
//! container it builds. Matrices and vector sets present themselves through
//! the same traits, which is how they stand in for datasets.

mod text;
mod binary;
mod source;
mod sink;

pub use text::{classify, format_record, parse_data_line, write_event, LineKind};
pub use binary::{read_record, write_record};
pub use source::{
    memory_source, BinarySource, DatasetSource, LineSource, MatrixSource, RecordSource,
    TextSetSource, VectorSource,
};
pub use sink::{
    drain, BinarySink, DatasetSink, MatrixSink, PendingEvents, RecordSink, TextSetSink, TextSink,
    VectorSink,
};

use smallvec::SmallVec;

/// Numeric fields kept inline for typical record widths.
pub type Values = SmallVec<[f64; 8]>;

/// One data record: leading numeric fields and optional trailing text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub values: Values,
    pub text: Option<String>,
}

impl Record {
    /// Numeric record.
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: SmallVec::from_slice(values),
            text: None,
        }
    }

    /// Numeric record with trailing text.
    pub fn with_text(values: &[f64], text: impl Into<String>) -> Self {
        Self {
            values: SmallVec::from_slice(values),
            text: Some(text.into()),
        }
    }

    /// Text-only record.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            values: SmallVec::new(),
            text: Some(text.into()),
        }
    }

    /// Number of fields (numeric columns, plus one for trailing text).
    #[inline]
    pub fn n_fields(&self) -> usize {
        self.values.len() + usize::from(self.text.is_some())
    }

    /// True if every numeric field is NaN (a segment break in raw buffers).
    pub fn is_nan_row(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|v| v.is_nan())
    }

    /// Keep only `columns`, in that order; out-of-range picks are dropped.
    pub fn select(&mut self, columns: &[usize]) {
        let picked: Values = columns.iter().filter_map(|&c| self.values.get(c).copied()).collect();
        self.values = picked;
    }

    /// The whole record as one line of text.
    pub fn as_line(&self) -> String {
        format_record(self)
    }
}

/// How a text source interprets data lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordKind {
    /// Leading numbers, then optional trailing text
    #[default]
    Numeric,
    /// Whole line is text
    Text,
}

/// One unit of record I/O.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Table header line (without the comment marker)
    TableHeader(String),
    /// Start of a segment, with its header text if any
    SegmentHeader(Option<String>),
    /// Synthesized break where a data gap was detected; also starts a segment
    Gap,
    /// A data record
    Data(Record),
    /// One source is exhausted (only reported on request)
    EndOfFile,
    /// All sources are exhausted
    EndOfStream,
}

impl Event {
    #[inline]
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// The record carried by a data event.
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Data(r) => Some(r),
            _ => None,
        }
    }

    /// Starts a new segment (explicitly or through a gap).
    #[inline]
    pub fn starts_segment(&self) -> bool {
        matches!(self, Self::SegmentHeader(_) | Self::Gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_and_select() {
        let mut r = Record::with_text(&[1.0, 2.0, 3.0], "name");
        assert_eq!(r.n_fields(), 4);
        r.select(&[2, 0, 9]);
        assert_eq!(r.values.as_slice(), &[3.0, 1.0]);
        assert!(!r.is_nan_row());
        assert!(Record::new(&[f64::NAN, f64::NAN]).is_nan_row());
        assert!(!Record::text("x").is_nan_row());
    }
}
