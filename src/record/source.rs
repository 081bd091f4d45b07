//! Record sources: files, streams and in-memory containers as event streams.

use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, Cursor, Read};
use std::path::Path;

use super::{classify, parse_data_line, read_record, Event, LineKind, Record, RecordKind};
use crate::core::BinaryLayout;
use crate::payload::{Dataset, Matrix, Payload, Shared, TextSet, VectorSet};
use crate::util::{Error, Result};

/// Anything that yields record events; `None` once exhausted.
pub trait RecordSource {
    fn next_event(&mut self) -> Result<Option<Event>>;
}

// === Text lines ===

/// Text table reader over any buffered stream.
///
/// `#` lines are table headers until the first segment or data line; later
/// ones are skipped. Blank lines are skipped.
pub struct LineSource {
    reader: Box<dyn BufRead>,
    kind: RecordKind,
    line_no: usize,
    in_body: bool,
    buf: String,
}

impl LineSource {
    pub fn new(reader: Box<dyn BufRead>, kind: RecordKind) -> Self {
        Self {
            reader,
            kind,
            line_no: 0,
            in_body: false,
            buf: String::new(),
        }
    }

    /// Lines read so far.
    #[inline]
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl RecordSource for LineSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim_end_matches(['\n', '\r']);
            match classify(line) {
                LineKind::Blank => continue,
                LineKind::Header(h) => {
                    if self.in_body {
                        continue;
                    }
                    return Ok(Some(Event::TableHeader(h.to_string())));
                }
                LineKind::Segment(h) => {
                    self.in_body = true;
                    return Ok(Some(Event::SegmentHeader(h.map(str::to_string))));
                }
                LineKind::Data(text) => {
                    self.in_body = true;
                    let rec = match self.kind {
                        RecordKind::Text => Record::text(text),
                        RecordKind::Numeric => parse_data_line(text),
                    };
                    if self.kind == RecordKind::Numeric && rec.values.is_empty() {
                        tracing::warn!(line = self.line_no, "skipping record without numeric fields");
                        continue;
                    }
                    return Ok(Some(Event::Data(rec)));
                }
            }
        }
    }
}

// === Binary records ===

/// Fixed-width binary record reader. All-NaN records become segment breaks.
pub struct BinarySource {
    reader: Box<dyn Read>,
    layout: BinaryLayout,
}

impl BinarySource {
    pub fn new(reader: Box<dyn Read>, layout: BinaryLayout) -> Self {
        Self { reader, layout }
    }

    /// Map a file into memory and read records from it.
    pub fn open(path: &Path, layout: BinaryLayout) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::open_failed(path, e))?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::new(Box::new(std::io::empty()), layout));
        }
        // SAFETY: the map is read-only and owned by this source.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(Self::new(Box::new(Cursor::new(mmap)), layout))
    }
}

impl RecordSource for BinarySource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        Ok(read_record(&mut self.reader, &self.layout)?.map(|rec| {
            if rec.is_nan_row() {
                Event::SegmentHeader(None)
            } else {
                Event::Data(rec)
            }
        }))
    }
}

// === Tables in memory ===

trait Tables {
    fn n_tables(&self) -> usize;
    fn table_header(&self, t: usize) -> &[String];
    fn n_segments(&self, t: usize) -> usize;
    fn segment_header(&self, t: usize, s: usize) -> Option<&str>;
    fn n_rows(&self, t: usize, s: usize) -> usize;
    fn record(&self, t: usize, s: usize, r: usize) -> Record;
}

impl Tables for Dataset {
    fn n_tables(&self) -> usize {
        self.tables.len()
    }
    fn table_header(&self, t: usize) -> &[String] {
        &self.tables[t].header
    }
    fn n_segments(&self, t: usize) -> usize {
        self.tables[t].segments.len()
    }
    fn segment_header(&self, t: usize, s: usize) -> Option<&str> {
        self.tables[t].segments[s].header.as_deref()
    }
    fn n_rows(&self, t: usize, s: usize) -> usize {
        self.tables[t].segments[s].n_rows()
    }
    fn record(&self, t: usize, s: usize, r: usize) -> Record {
        self.tables[t].segments[s].record(r)
    }
}

impl Tables for TextSet {
    fn n_tables(&self) -> usize {
        self.tables.len()
    }
    fn table_header(&self, t: usize) -> &[String] {
        &self.tables[t].header
    }
    fn n_segments(&self, t: usize) -> usize {
        self.tables[t].segments.len()
    }
    fn segment_header(&self, t: usize, s: usize) -> Option<&str> {
        self.tables[t].segments[s].header.as_deref()
    }
    fn n_rows(&self, t: usize, s: usize) -> usize {
        self.tables[t].segments[s].records.len()
    }
    fn record(&self, t: usize, s: usize, r: usize) -> Record {
        Record::text(self.tables[t].segments[s].records[r].as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    TableHeader,
    SegmentStart,
    Rows,
}

/// Position inside a table/segment/row hierarchy.
#[derive(Debug, Default)]
struct TableCursor {
    table: usize,
    segment: usize,
    row: usize,
    line: usize,
    stage: Stage,
}

impl TableCursor {
    fn advance<T: Tables>(&mut self, data: &T) -> Option<Event> {
        loop {
            if self.table >= data.n_tables() {
                return None;
            }
            match self.stage {
                Stage::TableHeader => {
                    let header = data.table_header(self.table);
                    if let Some(line) = header.get(self.line) {
                        self.line += 1;
                        return Some(Event::TableHeader(line.clone()));
                    }
                    self.stage = Stage::SegmentStart;
                }
                Stage::SegmentStart => {
                    if self.segment >= data.n_segments(self.table) {
                        *self = Self {
                            table: self.table + 1,
                            ..Self::default()
                        };
                        continue;
                    }
                    self.stage = Stage::Rows;
                    let header = data.segment_header(self.table, self.segment);
                    // Implicit first segment unless it must be told apart from the previous table.
                    let explicit = self.segment > 0
                        || header.is_some()
                        || (self.table > 0 && data.table_header(self.table).is_empty());
                    if explicit {
                        return Some(Event::SegmentHeader(header.map(str::to_string)));
                    }
                }
                Stage::Rows => {
                    if self.row < data.n_rows(self.table, self.segment) {
                        self.row += 1;
                        return Some(Event::Data(data.record(self.table, self.segment, self.row - 1)));
                    }
                    self.segment += 1;
                    self.row = 0;
                    self.stage = Stage::SegmentStart;
                }
            }
        }
    }
}

/// Walks a shared dataset.
pub struct DatasetSource {
    data: Shared<Dataset>,
    cursor: TableCursor,
}

impl DatasetSource {
    pub fn new(data: Shared<Dataset>) -> Self {
        Self {
            data,
            cursor: TableCursor::default(),
        }
    }
}

impl RecordSource for DatasetSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        let data = self.data.read();
        Ok(self.cursor.advance(&*data))
    }
}

/// Walks a shared text set.
pub struct TextSetSource {
    data: Shared<TextSet>,
    cursor: TableCursor,
}

impl TextSetSource {
    pub fn new(data: Shared<TextSet>) -> Self {
        Self {
            data,
            cursor: TableCursor::default(),
        }
    }
}

impl RecordSource for TextSetSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        let data = self.data.read();
        Ok(self.cursor.advance(&*data))
    }
}

// === Raw buffers standing in for datasets ===

fn row_event(values: Vec<f64>, text: Option<&String>) -> Event {
    let rec = Record {
        values: values.into_iter().collect(),
        text: text.filter(|t| !t.is_empty()).cloned(),
    };
    if rec.is_nan_row() {
        Event::SegmentHeader(None)
    } else {
        Event::Data(rec)
    }
}

/// Rows of a matrix as records; all-NaN rows are segment breaks.
pub struct MatrixSource {
    data: Shared<Matrix>,
    row: usize,
}

impl MatrixSource {
    pub fn new(data: Shared<Matrix>) -> Self {
        Self { data, row: 0 }
    }
}

impl RecordSource for MatrixSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        let m = self.data.read();
        if self.row >= m.n_rows {
            return Ok(None);
        }
        let event = row_event(m.row(self.row), m.text.as_ref().and_then(|t| t.get(self.row)));
        self.row += 1;
        Ok(Some(event))
    }
}

/// Rows of a vector set as records; all-NaN rows are segment breaks.
pub struct VectorSource {
    data: Shared<VectorSet>,
    row: usize,
}

impl VectorSource {
    pub fn new(data: Shared<VectorSet>) -> Self {
        Self { data, row: 0 }
    }
}

impl RecordSource for VectorSource {
    fn next_event(&mut self) -> Result<Option<Event>> {
        let v = self.data.read();
        if self.row >= v.n_rows {
            return Ok(None);
        }
        let event = row_event(v.row(self.row), v.text.as_ref().and_then(|t| t.get(self.row)));
        self.row += 1;
        Ok(Some(event))
    }
}

/// Record source over a record-based in-memory container.
pub fn memory_source(payload: &Payload) -> Result<Box<dyn RecordSource>> {
    Ok(match payload {
        Payload::Dataset(p) => Box::new(DatasetSource::new(p.clone())),
        Payload::TextSet(p) => Box::new(TextSetSource::new(p.clone())),
        Payload::Matrix(p) => Box::new(MatrixSource::new(p.clone())),
        Payload::VectorSet(p) => Box::new(VectorSource::new(p.clone())),
        other => {
            return Err(Error::NotSupported(format!(
                "{} cannot be read record by record",
                other.family()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Endian, Geometry};
    use crate::payload::{shared, DataSegment, DataTable, Shape};
    use crate::record::write_record;
    use crate::util::{Column, ValueType};

    fn collect(src: &mut dyn RecordSource) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(e) = src.next_event().unwrap() {
            out.push(e);
        }
        out
    }

    #[test]
    fn test_line_source_headers_and_segments() {
        let text = "# title\n# units\n> first\n1 2\n\n3 4\n# late comment\n>\n5 6 tail\n";
        let mut src = LineSource::new(Box::new(Cursor::new(text.as_bytes().to_vec())), RecordKind::Numeric);
        let events = collect(&mut src);
        assert_eq!(
            events,
            vec![
                Event::TableHeader("title".into()),
                Event::TableHeader("units".into()),
                Event::SegmentHeader(Some("first".into())),
                Event::Data(Record::new(&[1.0, 2.0])),
                Event::Data(Record::new(&[3.0, 4.0])),
                Event::SegmentHeader(None),
                Event::Data(Record::with_text(&[5.0, 6.0], "tail")),
            ]
        );
        assert_eq!(src.line_no(), 9);
    }

    #[test]
    fn test_line_source_skips_non_numeric() {
        let mut src = LineSource::new(Box::new(Cursor::new(b"abc\n7\n".to_vec())), RecordKind::Numeric);
        assert_eq!(collect(&mut src), vec![Event::Data(Record::new(&[7.0]))]);

        let mut src = LineSource::new(Box::new(Cursor::new(b"abc\n".to_vec())), RecordKind::Text);
        assert_eq!(collect(&mut src), vec![Event::Data(Record::text("abc"))]);
    }

    #[test]
    fn test_binary_source_segment_breaks() {
        let layout = BinaryLayout::new(2, ValueType::Float64, Endian::Little);
        let mut buf = Vec::new();
        write_record(&mut buf, &layout, &[1.0, 2.0]).unwrap();
        write_record(&mut buf, &layout, &[f64::NAN, f64::NAN]).unwrap();
        write_record(&mut buf, &layout, &[3.0, 4.0]).unwrap();
        let mut src = BinarySource::new(Box::new(Cursor::new(buf)), layout);
        let events = collect(&mut src);
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], Event::SegmentHeader(None));
    }

    #[test]
    fn test_dataset_source_order() {
        let mut seg2 = DataSegment::from_rows(&[&[3.0]]);
        seg2.header = Some("b".into());
        let ds = Dataset {
            geometry: Geometry::Point,
            n_columns: 1,
            tables: vec![
                DataTable {
                    header: vec!["h".into()],
                    segments: vec![DataSegment::from_rows(&[&[1.0], &[2.0]]), seg2],
                },
                DataTable {
                    header: Vec::new(),
                    segments: vec![DataSegment::from_rows(&[&[4.0]])],
                },
            ],
        };
        let mut src = DatasetSource::new(shared(ds));
        assert_eq!(
            collect(&mut src),
            vec![
                Event::TableHeader("h".into()),
                Event::Data(Record::new(&[1.0])),
                Event::Data(Record::new(&[2.0])),
                Event::SegmentHeader(Some("b".into())),
                Event::Data(Record::new(&[3.0])),
                Event::SegmentHeader(None),
                Event::Data(Record::new(&[4.0])),
            ]
        );
    }

    #[test]
    fn test_matrix_source_nan_row() {
        let m = Matrix::from_column(
            Column::from_slice(&[1.0f32, 2.0, f32::NAN, f32::NAN, 5.0, 6.0]),
            3,
            2,
            Shape::RowMajor,
        )
        .unwrap();
        let mut src = memory_source(&m.into()).unwrap();
        let events = collect(src.as_mut());
        assert_eq!(events[1], Event::SegmentHeader(None));
        assert_eq!(events[2], Event::Data(Record::new(&[5.0, 6.0])));
    }

    #[test]
    fn test_memory_source_rejects_grid() {
        let p = Payload::empty(crate::core::Family::Grid);
        assert!(matches!(memory_source(&p), Err(Error::NotSupported(_))));
    }
}
