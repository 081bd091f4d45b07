//! Record-by-record I/O.
//!
//! One machine per direction. Input walks the selected objects of a family
//! in registration order, pulling events from each until it is exhausted.
//! Output writes to one object, opening its sink on the first record and
//! handing the finished container to the object on `end_io`.
//!
//! Counters (tables, segments, rows) carry across sources so segment numbers
//! stay unique in the concatenated stream.

use super::descriptor::Descriptor;
use super::{default_geometry, Resource, Session};
use crate::codec::{open_sink, open_source};
use crate::core::{AllocMode, Direction, Family, GapRule, HeaderMode, Method, ObjectId, Status};
use crate::payload::{Payload, Shape};
use crate::record::{
    memory_source, DatasetSink, Event, MatrixSink, PendingEvents, RecordKind, RecordSink,
    RecordSource, TextSetSink, VectorSink,
};
use crate::util::{Error, Result, ValueType};

/// Options for `get_record`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordMode {
    /// Return `EndOfFile` between sources instead of moving on silently
    pub report_eof: bool,
}

/// Progress of one direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordCounters {
    /// Sources opened (input) or tables started (output)
    pub tables: usize,
    /// Segments seen, explicit or implicit
    pub segments: usize,
    /// Data rows in the current segment
    pub rows: usize,
    /// Data rows overall
    pub records: usize,
    /// Table header lines
    pub headers: usize,
    /// Segments opened by gap detection
    pub gaps: usize,
}

impl RecordCounters {
    fn account(&mut self, event: &Event) {
        match event {
            Event::TableHeader(_) => self.headers += 1,
            Event::SegmentHeader(_) | Event::Gap => {
                self.segments += 1;
                self.rows = 0;
                if matches!(event, Event::Gap) {
                    self.gaps += 1;
                }
            }
            Event::Data(_) => {
                if self.segments == 0 {
                    self.segments = 1;
                }
                self.rows += 1;
                self.records += 1;
            }
            Event::EndOfFile | Event::EndOfStream => {}
        }
    }

    /// Zero-based number of the current segment.
    #[inline]
    pub fn segment_id(&self) -> Option<usize> {
        self.segments.checked_sub(1)
    }
}

#[derive(Default)]
pub(crate) struct InputState {
    enabled: bool,
    header: HeaderMode,
    queue: Vec<ObjectId>,
    current: usize,
    source: Option<Box<dyn RecordSource>>,
    /// A segment has started in the current source
    segment_open: bool,
    source_records: usize,
    last_gap_value: Option<f64>,
    pending: PendingEvents,
    counters: RecordCounters,
    columns: Option<Vec<usize>>,
}

impl InputState {
    fn emit(&mut self, event: Event) -> Event {
        self.counters.account(&event);
        if event.is_data() {
            self.source_records += 1;
        }
        event
    }

    /// Apply header mode, source boundaries, gap detection and column
    /// selection to one raw event.
    fn filter(&mut self, event: Event, gap: Option<GapRule>) -> Option<Event> {
        match event {
            Event::TableHeader(_) if self.header == HeaderMode::Off => None,
            Event::SegmentHeader(_) | Event::Gap => {
                self.segment_open = true;
                self.last_gap_value = None;
                Some(self.emit(event))
            }
            Event::Data(mut rec) => {
                let mut lead = None;
                if !self.segment_open && self.counters.segments > 0 {
                    // Keep the first segment of a later source apart from the previous one.
                    lead = Some(Event::SegmentHeader(None));
                }
                self.segment_open = true;
                if let Some(rule) = gap {
                    let value = rec.values.get(rule.column).copied();
                    if let (None, Some(prev), Some(v)) = (&lead, self.last_gap_value, value) {
                        if (v - prev).abs() > rule.max_step {
                            lead = Some(Event::Gap);
                        }
                    }
                    self.last_gap_value = value;
                }
                if let Some(columns) = &self.columns {
                    rec.select(columns);
                }
                match lead {
                    Some(lead) => {
                        self.pending.push(Event::Data(rec));
                        Some(self.emit(lead))
                    }
                    None => Some(self.emit(Event::Data(rec))),
                }
            }
            Event::TableHeader(_) => Some(self.emit(event)),
            Event::EndOfFile | Event::EndOfStream => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct OutputState {
    enabled: bool,
    header: HeaderMode,
    target: Option<ObjectId>,
    sink: Option<Box<dyn RecordSink>>,
    counters: RecordCounters,
    columns: Option<Vec<usize>>,
}

/// Sink that fills (or replaces) an in-memory output object's container.
pub(crate) fn memory_sink(d: &Descriptor, col_major: bool) -> Box<dyn RecordSink> {
    let target = if d.messenger { None } else { d.resource.clone() };
    let shape = if col_major { Shape::ColumnMajor } else { Shape::RowMajor };
    match (d.actual_family, target) {
        (Family::Matrix, Some(Payload::Matrix(m))) => Box::new(MatrixSink::into_target(m, d.alloc_mode)),
        (Family::Matrix, _) => Box::new(MatrixSink::new(ValueType::Float64, shape)),
        (Family::VectorSet, Some(Payload::VectorSet(v))) => Box::new(VectorSink::into_target(v)),
        (Family::VectorSet, _) => Box::new(VectorSink::new(&[])),
        (Family::TextSet, Some(Payload::TextSet(t))) => Box::new(TextSetSink::into_target(t)),
        (Family::TextSet, _) => Box::new(TextSetSink::new()),
        (_, Some(Payload::Dataset(ds))) => Box::new(DatasetSink::into_target(d.geometry, ds)),
        _ => Box::new(DatasetSink::new(d.geometry)),
    }
}

impl Session {
    /// Enable record I/O for `family` in one direction.
    ///
    /// Input selects every unused input of the family; finding none is only
    /// a warning. Output picks the first unused output, or registers stdout.
    pub fn begin_io(&mut self, family: Family, direction: Direction, header: HeaderMode) -> Result<()> {
        self.ensure_live()?;
        if !family.is_record_based() {
            return Err(Error::NotSupported(format!("{family} has no records")));
        }
        match direction {
            Direction::Input => {
                let ids: Vec<ObjectId> = self.registry.unused(family, Direction::Input).collect();
                for &id in &ids {
                    self.registry.find_by_id(id, Some(family), Some(Direction::Input))?.selected = true;
                }
                if ids.is_empty() {
                    tracing::warn!(%family, "no input objects registered");
                    self.report(&format!("no {family} inputs registered"));
                }
                let columns = self.input.columns.take();
                self.input = InputState {
                    enabled: true,
                    header,
                    queue: ids,
                    columns,
                    ..InputState::default()
                };
            }
            Direction::Output => {
                let id = match self.registry.first_unused(family, Direction::Output) {
                    Some(id) => id,
                    None => {
                        tracing::debug!(%family, "no output registered; writing to stdout");
                        self.register_io(
                            family,
                            Method::Stream,
                            default_geometry(family),
                            Direction::Output,
                            None,
                            Resource::Writer(Box::new(std::io::stdout())),
                        )?
                    }
                };
                self.registry.find_by_id(id, Some(family), Some(Direction::Output))?.selected = true;
                let columns = self.output.columns.take();
                self.output = OutputState {
                    enabled: true,
                    header,
                    target: Some(id),
                    columns,
                    ..OutputState::default()
                };
            }
        }
        tracing::debug!(%family, %direction, "record i/o enabled");
        Ok(())
    }

    /// Next event from the input objects.
    ///
    /// Returns `EndOfStream` once every selected object is exhausted.
    pub fn get_record(&mut self, mode: RecordMode) -> Result<Event> {
        self.ensure_live()?;
        if !self.input.enabled {
            return Err(Error::RecordIoDisabled(Direction::Input));
        }
        let report_eof = mode.report_eof || self.config.flags.log_file_boundaries;
        let gap = self.config.gap;
        loop {
            if let Some(event) = self.input.pending.pop() {
                return Ok(self.input.emit(event));
            }
            if self.input.source.is_none() {
                if self.input.current >= self.input.queue.len() {
                    return Ok(Event::EndOfStream);
                }
                self.open_input_source()?;
            }
            let next = match self.input.source.as_mut() {
                Some(source) => source.next_event()?,
                None => continue,
            };
            match next {
                Some(event) => {
                    if let Some(out) = self.input.filter(event, gap) {
                        return Ok(out);
                    }
                }
                None => {
                    self.close_input_source();
                    if report_eof {
                        return Ok(self.input.emit(Event::EndOfFile));
                    }
                }
            }
        }
    }

    fn open_input_source(&mut self) -> Result<()> {
        let id = self.input.queue[self.input.current];
        let binary = self.config.binary_input;
        let log_boundaries = self.config.flags.log_file_boundaries;
        let d = self.registry.get_mut(id)?;
        let kind = if d.family == Family::TextSet {
            RecordKind::Text
        } else {
            RecordKind::Numeric
        };
        let opened = match d.method {
            Method::File | Method::Stream | Method::Descriptor => d
                .take_transport()
                .and_then(|t| open_source(t, kind, binary.as_ref().filter(|_| kind == RecordKind::Numeric))),
            Method::Duplicate | Method::Reference => d
                .payload()
                .ok_or_else(|| Error::NotSupported(format!("object {id} has no container")))
                .and_then(memory_source),
        };
        let source = match opened {
            Ok(source) => source,
            Err(e) => {
                // Skip the broken source so the next call moves on.
                d.selected = false;
                self.input.current += 1;
                return Err(e);
            }
        };
        d.status = Status::InUse;
        let filename = d.filename.clone();
        self.input.source = Some(source);
        self.input.counters.tables += 1;
        self.input.segment_open = false;
        self.input.source_records = 0;
        self.input.last_gap_value = None;
        if log_boundaries {
            let name = filename.map_or_else(|| format!("object {id}"), |p| p.display().to_string());
            self.report(&format!("reading {name}"));
        }
        tracing::debug!(%id, "record source opened");
        Ok(())
    }

    fn close_input_source(&mut self) {
        let id = self.input.queue[self.input.current];
        self.input.source = None;
        self.input.current += 1;
        if let Ok(d) = self.registry.get_mut(id) {
            d.status = Status::Used;
            d.selected = false;
            d.rec += self.input.source_records;
        }
        tracing::debug!(%id, records = self.input.source_records, "record source exhausted");
    }

    /// Send one event to the output object.
    pub fn put_record(&mut self, event: Event) -> Result<()> {
        self.ensure_live()?;
        if !self.output.enabled {
            return Err(Error::RecordIoDisabled(Direction::Output));
        }
        let event = match event {
            Event::TableHeader(_) if self.output.header == HeaderMode::Off => return Ok(()),
            Event::Data(mut rec) => {
                if let Some(columns) = &self.output.columns {
                    rec.select(columns);
                }
                Event::Data(rec)
            }
            other => other,
        };
        if self.output.sink.is_none() {
            let id = self.output.target.ok_or(Error::RecordIoDisabled(Direction::Output))?;
            let sink = self.open_output_sink(id)?;
            self.output.sink = Some(sink);
        }
        self.output.counters.account(&event);
        if let Some(sink) = self.output.sink.as_mut() {
            sink.put(event)?;
        }
        Ok(())
    }

    fn open_output_sink(&mut self, id: ObjectId) -> Result<Box<dyn RecordSink>> {
        let header = self.output.header;
        let binary = self.config.binary_output;
        let col_major = self.config.flags.col_major;
        let d = self.registry.get_mut(id)?;
        d.status = Status::InUse;
        if d.method.is_memory() {
            Ok(memory_sink(d, col_major))
        } else {
            open_sink(d.take_destination()?, header, binary.as_ref())
        }
    }

    /// Disable record I/O in one direction.
    ///
    /// For output this finishes the sink; an in-memory object receives the
    /// finished container and becomes its owner.
    pub fn end_io(&mut self, direction: Direction) -> Result<()> {
        self.ensure_live()?;
        match direction {
            Direction::Input => {
                if !self.input.enabled {
                    return Err(Error::RecordIoDisabled(Direction::Input));
                }
                if self.input.source.is_some() {
                    self.close_input_source();
                }
                for &id in &self.input.queue {
                    if let Ok(d) = self.registry.get_mut(id) {
                        d.selected = false;
                    }
                }
                let columns = self.input.columns.take();
                self.input = InputState {
                    columns,
                    ..InputState::default()
                };
            }
            Direction::Output => {
                if !self.output.enabled {
                    return Err(Error::RecordIoDisabled(Direction::Output));
                }
                let target = self.output.target;
                let sink = self.output.sink.take();
                let columns = self.output.columns.take();
                self.output = OutputState {
                    columns,
                    ..OutputState::default()
                };
                let Some(id) = target else {
                    return Ok(());
                };
                let mut sink = match sink {
                    Some(sink) => sink,
                    None => self.open_output_sink(id)?,
                };
                let finished = sink.finish()?;
                let d = self.registry.get_mut(id)?;
                d.status = Status::Used;
                d.selected = false;
                if let (Some(payload), true) = (finished, d.method.is_memory()) {
                    let in_place = d.resource.as_ref().is_some_and(|r| r.ptr_eq(&payload));
                    if !in_place {
                        d.resource = Some(payload);
                        d.alloc_mode = AllocMode::Internal;
                    }
                    d.messenger = false;
                    tracing::debug!(%id, "record output stored");
                }
            }
        }
        tracing::debug!(%direction, "record i/o disabled");
        Ok(())
    }

    /// Pick or reorder columns on every record in `direction`; empty means all.
    pub fn set_columns(&mut self, direction: Direction, columns: &[usize]) {
        let columns = (!columns.is_empty()).then(|| columns.to_vec());
        match direction {
            Direction::Input => self.input.columns = columns,
            Direction::Output => self.output.columns = columns,
        }
    }

    /// Counters of the current (or last) record pass.
    pub fn record_counters(&self, direction: Direction) -> RecordCounters {
        match direction {
            Direction::Input => self.input.counters,
            Direction::Output => self.output.counters,
        }
    }

    #[inline]
    pub fn is_io_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input.enabled,
            Direction::Output => self.output.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Geometry, ModeFlags, SessionConfig};
    use crate::payload::{Dataset, Matrix};
    use crate::record::Record;
    use std::io::Cursor;

    fn session() -> Session {
        Session::create("records", 0, ModeFlags::default(), Some(Box::new(|_: &str| {})))
    }

    fn add_stream(s: &mut Session, text: &str) -> ObjectId {
        s.register_io(
            Family::Dataset,
            Method::Stream,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Reader(Box::new(Cursor::new(text.as_bytes().to_vec()))),
        )
        .unwrap()
    }

    fn read_all(s: &mut Session, mode: RecordMode) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            match s.get_record(mode).unwrap() {
                Event::EndOfStream => break,
                e => out.push(e),
            }
        }
        out
    }

    #[test]
    fn test_disabled_until_begin() {
        let mut s = session();
        assert!(matches!(s.get_record(RecordMode::default()), Err(Error::RecordIoDisabled(_))));
        assert!(matches!(s.end_io(Direction::Input), Err(Error::RecordIoDisabled(_))));
        // No inputs is a warning only.
        s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();
        assert_eq!(s.get_record(RecordMode::default()).unwrap(), Event::EndOfStream);
    }

    #[test]
    fn test_sources_concatenate_with_boundaries() {
        let mut s = session();
        let a = add_stream(&mut s, "# a\n1\n2\n");
        add_stream(&mut s, "3\n");
        s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();
        let events = read_all(&mut s, RecordMode { report_eof: true });
        assert_eq!(
            events,
            vec![
                Event::TableHeader("a".into()),
                Event::Data(Record::new(&[1.0])),
                Event::Data(Record::new(&[2.0])),
                Event::EndOfFile,
                Event::SegmentHeader(None),
                Event::Data(Record::new(&[3.0])),
                Event::EndOfFile,
            ]
        );
        let c = s.record_counters(Direction::Input);
        assert_eq!((c.tables, c.segments, c.records, c.headers), (2, 2, 3, 1));
        assert_eq!(c.segment_id(), Some(1));
        s.end_io(Direction::Input).unwrap();
        let info = s.object(a).unwrap();
        assert_eq!(info.status, Status::Used);
        assert_eq!(info.records, 2);
    }

    #[test]
    fn test_gap_and_column_selection() {
        let mut config = SessionConfig::new("gaps", 0, ModeFlags::default());
        config.gap = Some(GapRule { column: 0, max_step: 1.5 });
        let mut s = Session::with_config(config, Some(Box::new(|_: &str| {})));
        add_stream(&mut s, "# h\n0 10\n1 11\n5 15\n");
        s.set_columns(Direction::Input, &[1]);
        s.begin_io(Family::Dataset, Direction::Input, HeaderMode::Off).unwrap();
        let events = read_all(&mut s, RecordMode::default());
        assert_eq!(
            events,
            vec![
                Event::Data(Record::new(&[10.0])),
                Event::Data(Record::new(&[11.0])),
                Event::Gap,
                Event::Data(Record::new(&[15.0])),
            ]
        );
        assert_eq!(s.record_counters(Direction::Input).gaps, 1);
    }

    #[test]
    fn test_output_to_matrix_buffer() {
        let mut s = session();
        let m: Payload = Matrix::new(ValueType::Float32, 4, 2, Shape::RowMajor).into();
        let id = s
            .register_io(Family::Dataset, Method::Reference, Geometry::Point, Direction::Output, None, Resource::Memory(m.clone()))
            .unwrap();
        s.begin_io(Family::Dataset, Direction::Output, HeaderMode::On).unwrap();
        s.put_record(Event::SegmentHeader(None)).unwrap();
        s.put_record(Event::Data(Record::new(&[1.0, 2.0]))).unwrap();
        s.put_record(Event::SegmentHeader(Some("b".into()))).unwrap();
        s.put_record(Event::Data(Record::new(&[3.0, 4.0]))).unwrap();
        s.end_io(Direction::Output).unwrap();

        let info = s.object(id).unwrap();
        assert_eq!(info.status, Status::Used);
        assert_eq!(info.alloc_mode, AllocMode::External);
        let matrix = m.matrix().unwrap().read();
        // The leading segment break is held until the width is known, then written as NaN.
        assert_eq!(matrix.n_rows, 4);
        assert!(matrix.row(0).iter().all(|v| v.is_nan()));
        assert_eq!(matrix.row(1), vec![1.0, 2.0]);
        assert!(matrix.row(2).iter().all(|v| v.is_nan()));
        assert_eq!(matrix.row(3), vec![3.0, 4.0]);
    }

    #[test]
    fn test_output_builds_dataset() {
        let mut s = session();
        let id = s
            .register_io(Family::Dataset, Method::Duplicate, Geometry::Line, Direction::Output, None, Resource::None)
            .unwrap();
        s.begin_io(Family::Dataset, Direction::Output, HeaderMode::On).unwrap();
        s.put_record(Event::TableHeader("t".into())).unwrap();
        s.put_record(Event::Data(Record::new(&[1.0, 2.0]))).unwrap();
        s.end_io(Direction::Output).unwrap();
        let p = s.retrieve_data(id).unwrap();
        let ds: &Dataset = &p.dataset().unwrap().read();
        assert_eq!(ds.geometry, Geometry::Line);
        assert_eq!(ds.n_records(), 1);
        assert!(s.object(id).unwrap().owner);
    }
}
