//! Integration tests for the registry, the collector and bulk I/O.

use resio::codec::ReleaseHook;
use resio::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::rc::Rc;

use tempfile::NamedTempFile;

/// Counts release calls per container address.
#[derive(Clone, Default)]
struct CountingHook(Rc<RefCell<HashMap<usize, usize>>>);

impl CountingHook {
    fn total(&self) -> usize {
        self.0.borrow().values().sum()
    }

    fn max_per_container(&self) -> usize {
        self.0.borrow().values().copied().max().unwrap_or(0)
    }
}

impl ReleaseHook for CountingHook {
    fn release(&mut self, _id: ObjectId, payload: &Payload) -> Result<()> {
        *self.0.borrow_mut().entry(payload.addr().0).or_default() += 1;
        Ok(())
    }
}

fn quiet_session(tag: &str) -> Session {
    Session::create(tag, 2, ModeFlags::default(), Some(Box::new(|_: &str| {})))
}

fn table_spec(rows: usize, columns: usize) -> DataSpec {
    DataSpec::Table {
        tables: 1,
        segments: 1,
        rows,
        columns,
    }
}

#[test]
fn test_ids_strictly_increase() {
    let mut s = quiet_session("ids");
    let mut seen = Vec::new();
    for round in 0..5 {
        let (id, _) = s.create_data(Family::Dataset, Geometry::Point, table_spec(1, 2)).unwrap();
        seen.push(id);
        if round % 2 == 0 {
            s.unregister_io(id, None, None).unwrap();
        }
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert!(matches!(s.object(seen[0]), Err(Error::NotAValidId(_))));
}

#[test]
fn test_alias_released_once() {
    let mut s = quiet_session("alias");
    let hook = CountingHook::default();
    s.set_release_hook(hook.clone());

    let (owner, payload) = s.create_data(Family::Dataset, Geometry::Point, table_spec(3, 2)).unwrap();
    let alias = s
        .register_io(
            Family::Dataset,
            Method::Reference,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Memory(payload.clone()),
        )
        .unwrap();
    let third = s
        .register_io(
            Family::Dataset,
            Method::Reference,
            Geometry::Point,
            Direction::Output,
            None,
            Resource::Memory(payload.clone()),
        )
        .unwrap();
    assert_ne!(owner, alias);
    assert_ne!(alias, third);

    let report = s.garbage_collect(0);
    assert_eq!(report.released, 1);
    assert_eq!(hook.total(), 1);
    assert_eq!(hook.max_per_container(), 1);
    assert!(s.find_by_pointer(&payload, None).unwrap().is_none());
    assert!(s.objects().unwrap().is_empty());
}

#[test]
fn test_collection_is_level_scoped() {
    let mut s = quiet_session("levels");
    let hook = CountingHook::default();
    s.set_release_hook(hook.clone());

    let (outer, _) = s.create_data(Family::Dataset, Geometry::Point, table_spec(1, 1)).unwrap();
    {
        let mut module = s.begin_module("outer").unwrap();
        assert_eq!(module.level(), 1);
        let (inner, _) = module.create_data(Family::Dataset, Geometry::Point, table_spec(1, 1)).unwrap();
        {
            let mut nested = module.begin_module("nested").unwrap();
            let report = nested.garbage_collect(2);
            assert_eq!(report.released, 0);
            assert!(nested.object(inner).is_ok());
        }
        assert!(module.object(inner).is_ok());
        assert_eq!(hook.total(), 0);
    }
    assert_eq!(s.level(), 0);
    assert_eq!(hook.total(), 1);
    assert!(s.object(outer).is_ok());

    let report = s.destroy().unwrap();
    assert_eq!(report.released, 1);
    assert!(matches!(s.object(outer), Err(Error::NotInitialized)));
}

#[test]
fn test_free_from_wrong_level_is_not_fatal() {
    let mut s = quiet_session("wrong-level");
    let (_, payload) = s.create_data(Family::Dataset, Geometry::Point, table_spec(1, 1)).unwrap();
    let mut module = s.begin_module("child").unwrap();
    let err = module.destroy_data(&payload).unwrap_err();
    assert!(matches!(err, Error::FreeWrongLevel { .. }));
    assert!(!err.is_fatal());
    assert!(module.find_by_pointer(&payload, None).unwrap().is_some());
}

#[test]
fn test_stream_is_read_once() {
    let mut s = quiet_session("stream");
    let id = s
        .register_io(
            Family::Dataset,
            Method::Stream,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Reader(Box::new(Cursor::new(b"1 2\n3 4\n".to_vec()))),
        )
        .unwrap();
    let data = s.import_object(id, Family::Dataset, IoMode::default()).unwrap();
    assert_eq!(data.n_records(), 2);
    assert!(matches!(s.import_object(id, Family::Dataset, IoMode::default()), Err(Error::ReadOnce(_))));
    assert!(matches!(s.import_object(id, Family::Dataset, IoMode::reset()), Err(Error::ReadOnce(_))));
}

#[test]
fn test_file_reread_after_reset() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# xyz").unwrap();
    writeln!(file, "1 2 3").unwrap();
    writeln!(file, "4 5 6").unwrap();
    file.flush().unwrap();

    let mut s = quiet_session("file");
    let id = s
        .register_io(
            Family::Dataset,
            Method::File,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Path(file.path().to_path_buf()),
        )
        .unwrap();
    let first = s.import_object(id, Family::Dataset, IoMode::default()).unwrap();
    assert!(matches!(s.import_object(id, Family::Dataset, IoMode::default()), Err(Error::ReadOnce(_))));
    let second = s.import_object(id, Family::Dataset, IoMode::reset()).unwrap();
    assert_eq!(first.n_records(), 2);
    assert_eq!(second.n_records(), 2);
    assert!(!first.ptr_eq(&second));
}

#[test]
fn test_masquerade_is_permanent() {
    let mut s = quiet_session("masquerade");
    let m: Payload = Matrix::new(ValueType::Float64, 3, 2, Shape::RowMajor).into();
    let id = s
        .register_io(
            Family::Matrix,
            Method::Reference,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Memory(m),
        )
        .unwrap();
    assert_eq!(s.lookup(id, Some(Family::Matrix), None).unwrap().family, Family::Matrix);

    let info = s.lookup(id, Some(Family::Dataset), Some(Direction::Input)).unwrap();
    assert_eq!(info.family, Family::Dataset);
    assert_eq!(info.actual_family, Family::Matrix);
    assert!(matches!(
        s.lookup(id, Some(Family::Matrix), None),
        Err(Error::WrongFamily { expected: Family::Matrix, actual: Family::Dataset })
    ));
    assert!(matches!(s.lookup(id, None, Some(Direction::Output)), Err(Error::NotOutputObject(_))));

    let ds = s.import_object(id, Family::Dataset, IoMode::default()).unwrap();
    assert_eq!(ds.family(), Family::Dataset);
    assert_eq!(ds.n_records(), 3);
}

#[test]
fn test_bad_registration() {
    let mut s = quiet_session("bad");
    assert!(matches!(
        s.register_io(Family::Grid, Method::File, Geometry::Point, Direction::Input, None, Resource::Path("g.nc".into())),
        Err(Error::BadGeometry { .. })
    ));
    assert!(matches!(
        s.register_io(Family::Dataset, Method::Stream, Geometry::Point, Direction::Input, None, Resource::None),
        Err(Error::BadMethod { .. })
    ));
    assert!(matches!(
        s.read_data(Family::Dataset, Method::File, Geometry::Point, IoMode::default(), None, None, None),
        Err(Error::NoObjects { .. })
    ));
}

#[test]
fn test_write_file_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let path_str = path.to_str().unwrap();

    let mut s = quiet_session("write");
    let data: Payload = Dataset::from_rows(Geometry::Point, &[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]).into();
    s.write_data(Family::Dataset, Method::File, Geometry::Point, IoMode::default(), None, Some(path_str), &data)
        .unwrap();

    let back = s
        .read_data(Family::Dataset, Method::File, Geometry::Point, IoMode::default(), None, Some(path_str), None)
        .unwrap();
    let ds = back.dataset().unwrap().read();
    assert_eq!(ds.n_columns, 2);
    assert_eq!(ds.n_records(), 3);
    assert_eq!(ds.column_range(1), Some((2.0, 6.0)));
}

#[test]
fn test_caller_data_survives_duplicate_read() {
    let mut s = quiet_session("caller-owned");
    let hook = CountingHook::default();
    s.set_release_hook(hook.clone());
    let caller: Payload = Dataset::from_rows(Geometry::Point, &[&[1.0, 2.0], &[3.0, 4.0]]).into();
    let id = s
        .register_io(
            Family::Dataset,
            Method::Duplicate,
            Geometry::Point,
            Direction::Input,
            None,
            Resource::Memory(caller.clone()),
        )
        .unwrap();
    {
        let mut module = s.begin_module("reader").unwrap();
        let copy = module
            .read_data(Family::Dataset, Method::Duplicate, Geometry::Point, IoMode::default(), None, None, None)
            .unwrap();
        assert!(!copy.ptr_eq(&caller));
        assert_eq!(copy.n_records(), 2);
    }
    assert_eq!(hook.total(), 1);
    assert_eq!(s.object(id).unwrap().alloc_mode, AllocMode::External);

    let report = s.garbage_collect(0);
    assert_eq!(report.released, 0);
    let report = s.destroy().unwrap();
    assert_eq!(report.released, 0);
    assert_eq!(hook.total(), 1);
    assert_eq!(hook.0.borrow().get(&caller.addr().0), None);
    assert_eq!(caller.n_records(), 2);
}

#[test]
fn test_unregister_checks_family_and_direction() {
    let mut s = quiet_session("unregister");
    let (id, _) = s.create_data(Family::Dataset, Geometry::Point, table_spec(1, 2)).unwrap();
    let direction = s.object(id).unwrap().direction;
    let other = match direction {
        Direction::Input => Direction::Output,
        Direction::Output => Direction::Input,
    };
    assert!(matches!(
        s.unregister_io(id, None, Some(other)),
        Err(Error::NotInputObject(_) | Error::NotOutputObject(_))
    ));
    assert!(matches!(
        s.unregister_io(id, Some(Family::Grid), None),
        Err(Error::WrongFamily { .. })
    ));
    assert!(s.object(id).is_ok());
    s.unregister_io(id, Some(Family::Dataset), Some(direction)).unwrap();
    assert!(matches!(s.object(id), Err(Error::NotAValidId(_))));
}
