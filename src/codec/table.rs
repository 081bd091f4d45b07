//! Built-in table codec: text (or fixed-width binary) tables for datasets and
//! text sets.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use super::{Destination, ExportRequest, Exporter, ImportRequest, Importer, Transport};
use crate::core::{BinaryLayout, Family, HeaderMode};
use crate::payload::Payload;
use crate::record::{
    drain, memory_source, BinarySink, BinarySource, DatasetSink, LineSource, RecordKind,
    RecordSink, RecordSource, TextSetSink, TextSink,
};
use crate::util::{Error, Result};

/// Record source over a transport.
pub fn open_source(
    transport: Transport,
    kind: RecordKind,
    binary: Option<&BinaryLayout>,
) -> Result<Box<dyn RecordSource>> {
    Ok(match (transport, binary) {
        (Transport::Path(path), Some(layout)) => Box::new(BinarySource::open(&path, *layout)?),
        (Transport::Path(path), None) => {
            let file = File::open(&path).map_err(|e| Error::open_failed(&path, e))?;
            Box::new(LineSource::new(Box::new(BufReader::new(file)), kind))
        }
        (Transport::Stream(reader), Some(layout)) => Box::new(BinarySource::new(Box::new(reader), *layout)),
        (Transport::Stream(reader), None) => Box::new(LineSource::new(reader, kind)),
        (Transport::Descriptor(file), Some(layout)) => {
            Box::new(BinarySource::new(Box::new(BufReader::new(file)), *layout))
        }
        (Transport::Descriptor(file), None) => {
            Box::new(LineSource::new(Box::new(BufReader::new(file)), kind))
        }
    })
}

/// Record sink over a destination.
pub fn open_sink(
    destination: Destination,
    header: HeaderMode,
    binary: Option<&BinaryLayout>,
) -> Result<Box<dyn RecordSink>> {
    let writer: Box<dyn std::io::Write> = match destination {
        Destination::Path(path) => {
            let file = File::create(&path).map_err(|e| Error::open_failed(&path, e))?;
            Box::new(BufWriter::new(file))
        }
        Destination::Stream(w) => w,
        Destination::Descriptor(file) => Box::new(BufWriter::new(file)),
    };
    Ok(match binary {
        Some(layout) => Box::new(BinarySink::new(writer, *layout)),
        None => Box::new(TextSink::new(writer, header)),
    })
}

/// Reads and writes datasets and text sets as tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct TableCodec;

impl Importer for TableCodec {
    fn import(&self, request: ImportRequest) -> Result<Payload> {
        let (kind, mut sink): (RecordKind, Box<dyn RecordSink>) = match request.family {
            Family::Dataset => (RecordKind::Numeric, Box::new(DatasetSink::new(request.geometry))),
            Family::TextSet => (RecordKind::Text, Box::new(TextSetSink::new())),
            other => {
                return Err(Error::NotSupported(format!("table codec cannot read {other}")));
            }
        };
        let binary = request.binary.as_ref().filter(|_| request.family == Family::Dataset);
        let mut source = open_source(request.transport, kind, binary)?;
        drain(source.as_mut(), sink.as_mut())?
            .ok_or_else(|| Error::other("table codec produced no container"))
    }
}

impl Exporter for TableCodec {
    fn export(&self, payload: &Payload, request: ExportRequest) -> Result<()> {
        let mut source = memory_source(payload)?;
        let binary = request.binary.as_ref().filter(|_| request.family == Family::Dataset);
        let mut sink = open_sink(request.destination, request.header, binary)?;
        drain(source.as_mut(), sink.as_mut())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Endian, Geometry};
    use crate::util::ValueType;
    use std::io::Cursor;

    fn request(family: Family, transport: Transport) -> ImportRequest {
        ImportRequest {
            family,
            geometry: Geometry::Point,
            transport,
            region: None,
            pad: 0,
            binary: None,
        }
    }

    #[test]
    fn test_import_dataset_from_stream() {
        let text = "# t\n1 2\n3 4\n";
        let payload = TableCodec
            .import(request(
                Family::Dataset,
                Transport::Stream(Box::new(Cursor::new(text.as_bytes().to_vec()))),
            ))
            .unwrap();
        let ds = payload.dataset().unwrap().read();
        assert_eq!(ds.n_records(), 2);
        assert_eq!(ds.tables[0].header, vec!["t".to_string()]);
    }

    #[test]
    fn test_binary_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pts.bin");
        let layout = BinaryLayout::new(2, ValueType::Float32, Endian::Big);
        let payload: Payload =
            crate::payload::Dataset::from_rows(Geometry::Point, &[&[1.0, 2.0], &[3.0, 4.0]]).into();
        TableCodec
            .export(
                &payload,
                ExportRequest {
                    family: Family::Dataset,
                    destination: Destination::Path(path.clone()),
                    header: HeaderMode::On,
                    region: None,
                    binary: Some(layout),
                },
            )
            .unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);

        let mut req = request(Family::Dataset, Transport::Path(path));
        req.binary = Some(layout);
        let back = TableCodec.import(req).unwrap();
        assert_eq!(back.dataset().unwrap().read().n_records(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = TableCodec
            .import(request(Family::TextSet, Transport::Path("/no/such/file.txt".into())))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
