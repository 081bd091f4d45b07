//! Error types for the resio engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::{Family, Geometry, Method, ObjectId};

/// Main error type for session and I/O operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Session was destroyed (or never set up) before the call
    #[error("Session not initialized")]
    NotInitialized,

    /// Identifier does not name a live object
    #[error("Not a valid object id: {0}")]
    NotAValidId(ObjectId),

    /// Asked to read from an output-only object
    #[error("Object {0} is not an input object")]
    NotInputObject(ObjectId),

    /// Asked to write to an input-only object
    #[error("Object {0} is not an output object")]
    NotOutputObject(ObjectId),

    /// Family filter did not match (and no masquerade applies)
    #[error("Family mismatch: expected {expected}, got {actual}")]
    WrongFamily { expected: Family, actual: Family },

    /// Geometry not allowed for the family
    #[error("Geometry {geometry} is not valid for family {family}")]
    BadGeometry { family: Family, geometry: Geometry },

    /// Method cannot carry the given resource or family
    #[error("Method {method} cannot be used with {what}")]
    BadMethod { method: Method, what: String },

    /// Container is not known to the registry
    #[error("Container {0} is not registered")]
    NotRegistered(crate::payload::PayloadAddr),

    /// Object was already read and its transport cannot be rewound
    #[error("Object {0} can only be read once")]
    ReadOnce(ObjectId),

    /// Output object already written and not reset
    #[error("Object {0} can only be written once")]
    OnlyOnce(ObjectId),

    /// Registry or payload allocation could not grow
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Name does not decode to a virtual file
    #[error("Not a valid virtual file name: {0}")]
    BadVirtualFileName(String),

    /// Virtual file payload was already handed to a reader
    #[error("Virtual file {0} has already been claimed")]
    AlreadyClaimed(String),

    /// Release requested from the wrong nesting level (non-fatal)
    #[error("Object {id} belongs to level {object_level}, not {current_level}; not freed")]
    FreeWrongLevel {
        id: ObjectId,
        object_level: u32,
        current_level: u32,
    },

    /// No collaborator is installed for the family/method pair
    #[error("No codec for {family} via {method}")]
    NoCodec { family: Family, method: Method },

    /// Requested operation is not available for this object
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// No registered objects match the request
    #[error("No {direction} objects registered for {family}")]
    NoObjects {
        family: Family,
        direction: crate::core::Direction,
    },

    /// Record-by-record access used before begin_io
    #[error("Record I/O is not enabled for {0}")]
    RecordIoDisabled(crate::core::Direction),

    /// Shapes of source and destination disagree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Subregion lies outside the object's domain
    #[error("Region outside of domain: {0}")]
    OutsideDomain(String),

    /// Malformed record
    #[error("Parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file error
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether a caller should stop on this error.
    ///
    /// Releasing from the wrong level leaves the object in place and is
    /// only worth a log line.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FreeWrongLevel { .. })
    }

    /// Map an open() failure to `FileNotFound` where that is what happened.
    pub(crate) fn open_failed(path: &std::path::Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Io(e)
        }
    }
}

/// Result type alias for resio operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::ReadOnce(ObjectId(7));
        assert!(e.to_string().contains("7"));

        let e = Error::WrongFamily {
            expected: Family::Matrix,
            actual: Family::Dataset,
        };
        assert!(e.to_string().contains("matrix"));
        assert!(e.to_string().contains("dataset"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_free_wrong_level_not_fatal() {
        let e = Error::FreeWrongLevel {
            id: ObjectId(1),
            object_level: 0,
            current_level: 2,
        };
        assert!(!e.is_fatal());
        assert!(Error::NotAValidId(ObjectId(1)).is_fatal());
    }
}
