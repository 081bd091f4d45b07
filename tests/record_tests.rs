//! Integration tests for record-by-record I/O.

use resio::core::{BinaryLayout, Endian};
use resio::prelude::*;
use std::io::Write;

use tempfile::NamedTempFile;

fn quiet_session(tag: &str) -> Session {
    Session::create(tag, 0, ModeFlags::default(), Some(Box::new(|_: &str| {})))
}

fn drain_input(s: &mut Session, mode: RecordMode) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        match s.get_record(mode).unwrap() {
            Event::EndOfStream => break,
            event => events.push(event),
        }
    }
    events
}

fn text_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_file_scenario() {
    let file = text_file(&["# x y", "1 2", "> first", "3 4", "5 6", "> second", "7 8"]);
    let mut s = quiet_session("scenario");
    s.register_io(
        Family::Dataset,
        Method::File,
        Geometry::Point,
        Direction::Input,
        None,
        Resource::Path(file.path().to_path_buf()),
    )
    .unwrap();
    s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();

    let events = drain_input(&mut s, RecordMode::default());
    assert_eq!(
        events,
        vec![
            Event::TableHeader("x y".into()),
            Event::Data(Record::new(&[1.0, 2.0])),
            Event::SegmentHeader(Some("first".into())),
            Event::Data(Record::new(&[3.0, 4.0])),
            Event::Data(Record::new(&[5.0, 6.0])),
            Event::SegmentHeader(Some("second".into())),
            Event::Data(Record::new(&[7.0, 8.0])),
        ]
    );
    // Exhausted input keeps answering end-of-stream.
    assert_eq!(s.get_record(RecordMode::default()).unwrap(), Event::EndOfStream);
    s.end_io(Direction::Input).unwrap();
    assert!(matches!(s.get_record(RecordMode::default()), Err(Error::RecordIoDisabled(_))));
}

#[test]
fn test_memory_round_trip() {
    let events = vec![
        Event::TableHeader("first table".into()),
        Event::SegmentHeader(Some("s1".into())),
        Event::Data(Record::new(&[1.0, 10.0])),
        Event::Data(Record::new(&[2.0, 20.0])),
        Event::SegmentHeader(Some("s2".into())),
        Event::Data(Record::new(&[3.0, 30.0])),
        Event::TableHeader("second table".into()),
        Event::SegmentHeader(Some("s3".into())),
        Event::Data(Record::new(&[4.0, 40.0])),
        Event::Data(Record::new(&[5.0, f64::MAX])),
    ];

    let mut s = quiet_session("round-trip");
    let out = s
        .register_io(Family::Dataset, Method::Duplicate, Geometry::Point, Direction::Output, None, Resource::None)
        .unwrap();
    s.begin_io(Family::Dataset, Direction::Output, HeaderMode::On).unwrap();
    for event in events.iter().cloned() {
        s.put_record(event).unwrap();
    }
    s.end_io(Direction::Output).unwrap();
    let written = s.record_counters(Direction::Output);
    assert_eq!((written.records, written.segments, written.headers), (5, 3, 2));

    let payload = s.retrieve_data(out).unwrap();
    {
        let ds = payload.dataset().unwrap().read();
        assert_eq!(ds.n_tables(), 2);
        assert_eq!(ds.n_segments(), 3);
    }
    s.register_io(
        Family::Dataset,
        Method::Reference,
        Geometry::Point,
        Direction::Input,
        None,
        Resource::Memory(payload),
    )
    .unwrap();
    s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();
    assert_eq!(drain_input(&mut s, RecordMode::default()), events);
    s.end_io(Direction::Input).unwrap();
}

#[test]
fn test_concatenation_keeps_segments_apart() {
    let a = text_file(&["# a", "1", "2"]);
    let b = text_file(&["# b", "3", "> tail", "4"]);
    let mut s = quiet_session("concat");
    for f in [&a, &b] {
        s.register_io(
            Family::Dataset,
            Method::File,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Path(f.path().to_path_buf()),
        )
        .unwrap();
    }
    let out = s
        .register_io(Family::Dataset, Method::Duplicate, Geometry::Point, Direction::Output, None, Resource::None)
        .unwrap();

    s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();
    s.begin_io(Family::Dataset, Direction::Output, HeaderMode::On).unwrap();
    let mut boundaries = 0;
    loop {
        match s.get_record(RecordMode { report_eof: true }).unwrap() {
            Event::EndOfStream => break,
            Event::EndOfFile => boundaries += 1,
            event => s.put_record(event).unwrap(),
        }
    }
    s.end_io(Direction::Input).unwrap();
    s.end_io(Direction::Output).unwrap();
    assert_eq!(boundaries, 2);

    let counters = s.record_counters(Direction::Input);
    assert_eq!((counters.tables, counters.segments, counters.records), (2, 3, 4));

    let payload = s.retrieve_data(out).unwrap();
    let ds = payload.dataset().unwrap().read();
    assert_eq!(ds.n_records(), 4);
    assert_eq!(ds.n_segments(), 3);
    assert!(s.objects().unwrap().iter().filter(|o| o.direction == Direction::Input).all(|o| o.status == Status::Used));
}

#[test]
fn test_binary_records_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pairs.bin");

    let mut config = SessionConfig::new("binary", 0, ModeFlags::default());
    let layout = BinaryLayout::new(2, ValueType::Float32, Endian::Big);
    config.binary_input = Some(layout);
    config.binary_output = Some(layout);
    let mut s = Session::with_config(config, Some(Box::new(|_: &str| {})));

    s.register_io(Family::Dataset, Method::File, Geometry::Point, Direction::Output, None, Resource::Path(path.clone()))
        .unwrap();
    s.begin_io(Family::Dataset, Direction::Output, HeaderMode::On).unwrap();
    s.put_record(Event::Data(Record::new(&[1.0, 2.0]))).unwrap();
    s.put_record(Event::SegmentHeader(None)).unwrap();
    s.put_record(Event::Data(Record::new(&[3.0, 4.5]))).unwrap();
    s.end_io(Direction::Output).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * 8);

    s.register_io(Family::Dataset, Method::File, Geometry::Point, Direction::Input, None, Resource::Path(path))
        .unwrap();
    s.begin_io(Family::Dataset, Direction::Input, HeaderMode::On).unwrap();
    assert_eq!(
        drain_input(&mut s, RecordMode::default()),
        vec![
            Event::Data(Record::new(&[1.0, 2.0])),
            Event::SegmentHeader(None),
            Event::Data(Record::new(&[3.0, 4.5])),
        ]
    );
}

#[test]
fn test_output_columns_and_headers_off() {
    let mut s = quiet_session("columns");
    let out = s
        .register_io(Family::Dataset, Method::Duplicate, Geometry::Point, Direction::Output, None, Resource::None)
        .unwrap();
    s.set_columns(Direction::Output, &[2, 0]);
    s.begin_io(Family::Dataset, Direction::Output, HeaderMode::Off).unwrap();
    s.put_record(Event::TableHeader("dropped".into())).unwrap();
    s.put_record(Event::Data(Record::new(&[1.0, 2.0, 3.0]))).unwrap();
    s.end_io(Direction::Output).unwrap();

    let payload = s.retrieve_data(out).unwrap();
    let ds = payload.dataset().unwrap().read();
    assert_eq!(ds.n_columns, 2);
    assert!(ds.tables[0].header.is_empty());
    assert_eq!(ds.column_range(0), Some((3.0, 3.0)));
    assert_eq!(ds.column_range(1), Some((1.0, 1.0)));
}

#[test]
fn test_leading_segment_headers_fill_raw_outputs() {
    let mut s = quiet_session("delayed");
    let matrix: Payload = Matrix::new(ValueType::Float64, 8, 2, Shape::RowMajor).into();
    s.register_io(
        Family::Matrix,
        Method::Reference,
        Geometry::Point,
        Direction::Output,
        None,
        Resource::Memory(matrix.clone()),
    )
    .unwrap();
    s.begin_io(Family::Matrix, Direction::Output, HeaderMode::On).unwrap();
    s.put_record(Event::SegmentHeader(Some("a".into()))).unwrap();
    s.put_record(Event::SegmentHeader(Some("b".into()))).unwrap();
    s.put_record(Event::Data(Record::new(&[1.0, 2.0]))).unwrap();
    s.end_io(Direction::Output).unwrap();
    {
        let m = matrix.matrix().unwrap().read();
        assert_eq!(m.n_rows, 3);
        assert!(m.row(0).iter().all(|v| v.is_nan()));
        assert!(m.row(1).iter().all(|v| v.is_nan()));
        assert_eq!(m.row(2), vec![1.0, 2.0]);
    }

    let vectors = s
        .register_io(Family::VectorSet, Method::Duplicate, Geometry::Point, Direction::Output, None, Resource::None)
        .unwrap();
    s.begin_io(Family::VectorSet, Direction::Output, HeaderMode::On).unwrap();
    s.put_record(Event::SegmentHeader(None)).unwrap();
    s.put_record(Event::Data(Record::new(&[7.0]))).unwrap();
    s.put_record(Event::Data(Record::new(&[8.0]))).unwrap();
    s.end_io(Direction::Output).unwrap();
    let out = s.retrieve_data(vectors).unwrap();
    assert_eq!(out.n_records(), 3);
    let v = out.vector_set().unwrap().read();
    assert!(v.row(0)[0].is_nan());
    assert_eq!(v.row(2), vec![8.0]);
}
