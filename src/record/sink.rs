//! Record sinks: files, streams and containers built from event streams.

use std::collections::VecDeque;
use std::io::Write;

use super::{write_event, write_record, Event, RecordSource};
use crate::core::{AllocMode, BinaryLayout, Geometry, HeaderMode};
use crate::payload::{
    DataSegment, DataTable, Dataset, Matrix, Payload, Shape, Shared, TextSegment, TextSet,
    TextTable, VectorSet,
};
use crate::util::{Column, Error, Result, ValueType};

/// Anything that consumes record events.
pub trait RecordSink {
    fn put(&mut self, event: Event) -> Result<()>;

    /// Flush and hand back the container built, if any.
    fn finish(&mut self) -> Result<Option<Payload>>;
}

/// Feed every event of `source` into `sink`, then finish it.
pub fn drain(source: &mut dyn RecordSource, sink: &mut dyn RecordSink) -> Result<Option<Payload>> {
    while let Some(event) = source.next_event()? {
        sink.put(event)?;
    }
    sink.finish()
}

/// FIFO of events held back until they can be applied.
#[derive(Clone, Debug, Default)]
pub struct PendingEvents(VecDeque<Event>);

impl PendingEvents {
    #[inline]
    pub fn push(&mut self, event: Event) {
        self.0.push_back(event);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Event> {
        self.0.pop_front()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

// === Files and streams ===

/// Writes text table lines.
pub struct TextSink {
    writer: Box<dyn Write>,
    header: HeaderMode,
}

impl TextSink {
    pub fn new(writer: Box<dyn Write>, header: HeaderMode) -> Self {
        Self { writer, header }
    }
}

impl RecordSink for TextSink {
    fn put(&mut self, event: Event) -> Result<()> {
        if self.header == HeaderMode::Off && matches!(event, Event::TableHeader(_)) {
            return Ok(());
        }
        write_event(&mut self.writer, &event)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        self.writer.flush()?;
        Ok(None)
    }
}

/// Writes fixed-width binary records. Headers are dropped and segment
/// breaks become all-NaN records.
pub struct BinarySink {
    writer: Box<dyn Write>,
    layout: BinaryLayout,
}

impl BinarySink {
    pub fn new(writer: Box<dyn Write>, layout: BinaryLayout) -> Self {
        Self { writer, layout }
    }
}

impl RecordSink for BinarySink {
    fn put(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Data(rec) => write_record(&mut self.writer, &self.layout, &rec.values),
            Event::SegmentHeader(_) | Event::Gap => write_record(&mut self.writer, &self.layout, &[]),
            Event::TableHeader(_) | Event::EndOfFile | Event::EndOfStream => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        self.writer.flush()?;
        Ok(None)
    }
}

// === Containers ===

/// Builds a dataset.
///
/// Events are held back until the first data record fixes the column count.
/// A table header arriving after data, or anything after an end-of-file,
/// opens a new table.
#[derive(Debug, Default)]
pub struct DatasetSink {
    dataset: Dataset,
    pending: PendingEvents,
    started: bool,
    table_closed: bool,
    target: Option<Shared<Dataset>>,
}

impl DatasetSink {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            dataset: Dataset::new(geometry, 0),
            ..Self::default()
        }
    }

    /// Overwrite `target` on finish instead of returning a new container.
    pub fn into_target(geometry: Geometry, target: Shared<Dataset>) -> Self {
        Self {
            target: Some(target),
            ..Self::new(geometry)
        }
    }

    fn current_table(&mut self) -> &mut DataTable {
        let has_data = self.dataset.tables.last().is_some_and(|t| t.n_records() > 0);
        if self.dataset.tables.is_empty() || (self.table_closed && has_data) {
            self.dataset.tables.push(DataTable::default());
        }
        self.table_closed = false;
        let last = self.dataset.tables.len() - 1;
        &mut self.dataset.tables[last]
    }

    fn apply(&mut self, event: Event) {
        let n_columns = self.dataset.n_columns;
        match event {
            Event::TableHeader(h) => {
                if self.dataset.tables.last().is_some_and(|t| t.n_records() > 0) {
                    self.table_closed = true;
                }
                self.current_table().header.push(h);
            }
            Event::SegmentHeader(header) => self.start_segment(header, n_columns),
            Event::Gap => self.start_segment(None, n_columns),
            Event::Data(rec) => {
                let table = self.current_table();
                if table.segments.is_empty() {
                    table.segments.push(DataSegment::new(n_columns));
                }
                let last = table.segments.len() - 1;
                table.segments[last].push_row(&rec.values, rec.text.as_deref());
            }
            Event::EndOfFile => self.table_closed = true,
            Event::EndOfStream => {}
        }
    }

    fn start_segment(&mut self, header: Option<String>, n_columns: usize) {
        let table = self.current_table();
        match table.segments.last_mut() {
            Some(seg) if seg.n_rows() == 0 && seg.header.is_none() => seg.header = header,
            _ => {
                let mut seg = DataSegment::new(n_columns);
                seg.header = header;
                table.segments.push(seg);
            }
        }
    }

    fn flush_pending(&mut self) {
        while let Some(event) = self.pending.pop() {
            self.apply(event);
        }
    }
}

impl RecordSink for DatasetSink {
    fn put(&mut self, event: Event) -> Result<()> {
        if !self.started {
            match event.record().map(|rec| rec.values.len()) {
                Some(n_columns) => {
                    self.dataset.n_columns = n_columns;
                    self.started = true;
                    self.flush_pending();
                }
                None => {
                    self.pending.push(event);
                    return Ok(());
                }
            }
        }
        self.apply(event);
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        self.flush_pending();
        let geometry = self.dataset.geometry;
        let dataset = std::mem::replace(&mut self.dataset, Dataset::new(geometry, 0));
        self.started = false;
        Ok(Some(match &self.target {
            Some(target) => {
                *target.write() = dataset;
                Payload::Dataset(target.clone())
            }
            None => dataset.into(),
        }))
    }
}

/// Builds a text set; numeric records are stored as their text line.
#[derive(Debug, Default)]
pub struct TextSetSink {
    set: TextSet,
    table_closed: bool,
    target: Option<Shared<TextSet>>,
}

impl TextSetSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_target(target: Shared<TextSet>) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    fn current_table(&mut self) -> &mut TextTable {
        let has_data = self.set.tables.last().is_some_and(|t| t.n_records() > 0);
        if self.set.tables.is_empty() || (self.table_closed && has_data) {
            self.set.tables.push(TextTable::default());
        }
        self.table_closed = false;
        let last = self.set.tables.len() - 1;
        &mut self.set.tables[last]
    }

    fn start_segment(&mut self, header: Option<String>) {
        let table = self.current_table();
        match table.segments.last_mut() {
            Some(seg) if seg.records.is_empty() && seg.header.is_none() => seg.header = header,
            _ => table.segments.push(TextSegment {
                header,
                records: Vec::new(),
            }),
        }
    }
}

impl RecordSink for TextSetSink {
    fn put(&mut self, event: Event) -> Result<()> {
        match event {
            Event::TableHeader(h) => {
                if self.set.tables.last().is_some_and(|t| t.n_records() > 0) {
                    self.table_closed = true;
                }
                self.current_table().header.push(h);
            }
            Event::SegmentHeader(header) => self.start_segment(header),
            Event::Gap => self.start_segment(None),
            Event::Data(rec) => {
                let table = self.current_table();
                if table.segments.is_empty() {
                    table.segments.push(TextSegment::default());
                }
                let last = table.segments.len() - 1;
                table.segments[last].records.push(rec.as_line());
            }
            Event::EndOfFile => self.table_closed = true,
            Event::EndOfStream => {}
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        let set = std::mem::take(&mut self.set);
        Ok(Some(match &self.target {
            Some(target) => {
                *target.write() = set;
                Payload::TextSet(target.clone())
            }
            None => set.into(),
        }))
    }
}

/// Row-major accumulation shared by the matrix and vector sinks.
///
/// Segment breaks become all-NaN rows; leading ones wait for the first row to fix the width.
#[derive(Debug, Default)]
struct RowBuffer {
    values: Vec<f64>,
    text: Vec<String>,
    has_text: bool,
    n_columns: Option<usize>,
    /// Segment breaks seen before the first row fixed the width
    delayed: usize,
}

impl RowBuffer {
    fn put(&mut self, event: Event) {
        match event {
            Event::Data(rec) => {
                let n = match self.n_columns {
                    Some(n) => n,
                    None => {
                        let n = rec.values.len();
                        self.n_columns = Some(n);
                        for _ in 0..std::mem::take(&mut self.delayed) {
                            self.nan_row(n);
                        }
                        n
                    }
                };
                self.values
                    .extend((0..n).map(|c| rec.values.get(c).copied().unwrap_or(f64::NAN)));
                self.has_text |= rec.text.is_some();
                self.text.push(rec.text.unwrap_or_default());
            }
            Event::SegmentHeader(_) | Event::Gap => match self.n_columns {
                Some(n) => self.nan_row(n),
                None => self.delayed += 1,
            },
            Event::TableHeader(_) | Event::EndOfFile | Event::EndOfStream => {}
        }
    }

    fn nan_row(&mut self, n: usize) {
        self.values.extend(std::iter::repeat(f64::NAN).take(n));
        self.text.push(String::new());
    }

    fn n_columns(&self) -> usize {
        self.n_columns.unwrap_or(0)
    }

    fn n_rows(&self) -> usize {
        self.text.len()
    }

    fn take_text(&mut self) -> Option<Vec<String>> {
        let text = std::mem::take(&mut self.text);
        self.has_text.then_some(text)
    }
}

/// Builds a matrix of a fixed value type and storage order.
#[derive(Debug)]
pub struct MatrixSink {
    rows: RowBuffer,
    value_type: ValueType,
    shape: Shape,
    target: Option<(Shared<Matrix>, AllocMode)>,
}

impl MatrixSink {
    pub fn new(value_type: ValueType, shape: Shape) -> Self {
        Self {
            rows: RowBuffer::default(),
            value_type,
            shape,
            target: None,
        }
    }

    /// Write into `target` on finish.
    ///
    /// An external target keeps its buffer and must be large enough; an
    /// internal one is replaced.
    pub fn into_target(target: Shared<Matrix>, alloc: AllocMode) -> Self {
        let (value_type, shape) = {
            let m = target.read();
            (m.value_type(), m.shape)
        };
        Self {
            target: Some((target, alloc)),
            ..Self::new(value_type, shape)
        }
    }
}

impl RecordSink for MatrixSink {
    fn put(&mut self, event: Event) -> Result<()> {
        self.rows.put(event);
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        let n_rows = self.rows.n_rows();
        let n_columns = self.rows.n_columns();
        let values = std::mem::take(&mut self.rows.values);
        let text = self.rows.take_text();
        let mut matrix = Matrix::from_column(
            Column::from_f64(self.value_type, &values),
            n_rows,
            n_columns,
            Shape::RowMajor,
        )?;
        matrix.text = text;
        matrix.transpose_to(self.shape)?;

        let Some((target, alloc)) = &self.target else {
            return Ok(Some(matrix.into()));
        };
        let mut t = target.write();
        match alloc {
            AllocMode::External => {
                if t.data.len() < n_rows * n_columns {
                    return Err(Error::DimensionMismatch(format!(
                        "caller matrix holds {} values, {n_rows}x{n_columns} needed",
                        t.data.len()
                    )));
                }
                t.n_rows = n_rows;
                t.n_columns = n_columns;
                t.shape = matrix.shape;
                t.text = matrix.text.take();
                for r in 0..n_rows {
                    for c in 0..n_columns {
                        t.put(r, c, matrix.get(r, c).unwrap_or(f64::NAN))?;
                    }
                }
            }
            AllocMode::Internal => *t = matrix,
        }
        Ok(Some(Payload::Matrix(target.clone())))
    }
}

/// Builds a vector set, one typed column per record field.
#[derive(Debug)]
pub struct VectorSink {
    rows: RowBuffer,
    types: Vec<ValueType>,
    target: Option<Shared<VectorSet>>,
}

impl VectorSink {
    /// Column types; missing ones default to `Float64`.
    pub fn new(types: &[ValueType]) -> Self {
        Self {
            rows: RowBuffer::default(),
            types: types.to_vec(),
            target: None,
        }
    }

    pub fn into_target(target: Shared<VectorSet>) -> Self {
        let types: Vec<ValueType> = target.read().columns.iter().map(Column::value_type).collect();
        Self {
            target: Some(target),
            ..Self::new(&types)
        }
    }
}

impl RecordSink for VectorSink {
    fn put(&mut self, event: Event) -> Result<()> {
        self.rows.put(event);
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<Payload>> {
        let n_columns = self.rows.n_columns();
        let types: Vec<ValueType> = (0..n_columns)
            .map(|c| self.types.get(c).copied().unwrap_or_default())
            .collect();
        let mut set = VectorSet::new(&types);
        let values = std::mem::take(&mut self.rows.values);
        if n_columns > 0 {
            for row in values.chunks(n_columns) {
                set.push_row(row);
            }
        }
        set.text = self.rows.take_text();

        Ok(Some(match &self.target {
            Some(target) => {
                *target.write() = set;
                Payload::VectorSet(target.clone())
            }
            None => set.into(),
        }))
    }
}
