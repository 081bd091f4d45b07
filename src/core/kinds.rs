//! Vocabulary of the registry: families, geometries, directions, methods.

use std::fmt;

/// Process-unique object identifier.
///
/// Assigned at registration, strictly increasing, never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data kind of a registered object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Tabular points/lines/polygons
    Dataset,
    /// Table of text records
    TextSet,
    /// Regular raster of floats
    Grid,
    /// Multi-band raster of bytes
    Image,
    /// Color palette
    Palette,
    /// Vector-graphics document
    PostScript,
    /// Externally shaped 2-D buffer
    Matrix,
    /// Set of column vectors
    VectorSet,
    /// Coordinate array
    Coord,
}

impl Family {
    pub const ALL: [Family; 9] = [
        Self::Dataset,
        Self::TextSet,
        Self::Grid,
        Self::Image,
        Self::Palette,
        Self::PostScript,
        Self::Matrix,
        Self::VectorSet,
        Self::Coord,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::TextSet => "textset",
            Self::Grid => "grid",
            Self::Image => "image",
            Self::Palette => "palette",
            Self::PostScript => "postscript",
            Self::Matrix => "matrix",
            Self::VectorSet => "vectorset",
            Self::Coord => "coord",
        }
    }

    /// Families that can stand in for a dataset (the masquerade rule).
    #[inline]
    pub const fn can_masquerade_as_dataset(self) -> bool {
        matches!(self, Self::Matrix | Self::VectorSet)
    }

    /// Families that the record machine can iterate.
    #[inline]
    pub const fn is_record_based(self) -> bool {
        matches!(
            self,
            Self::Dataset | Self::TextSet | Self::Matrix | Self::VectorSet
        )
    }

    /// Whether `geometry` is allowed for this family.
    pub const fn accepts(self, geometry: Geometry) -> bool {
        use Geometry as G;
        match self {
            Self::Dataset | Self::VectorSet => matches!(
                geometry,
                G::Point | G::Line | G::Polygon | G::Plp | G::NonGeographic
            ),
            Self::TextSet => matches!(
                geometry,
                G::None | G::Point | G::Line | G::Polygon | G::Plp | G::NonGeographic
            ),
            Self::Grid | Self::Image => matches!(geometry, G::Surface),
            Self::Palette | Self::PostScript | Self::Coord => matches!(geometry, G::None),
            Self::Matrix => !matches!(geometry, G::None),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Topological classification of an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Geometry {
    #[default]
    None,
    Point,
    Line,
    Polygon,
    /// Point, line or polygon
    Plp,
    Surface,
    NonGeographic,
}

impl Geometry {
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
            Self::Plp => "plp",
            Self::Surface => "surface",
            Self::NonGeographic => "non-geographic",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Data flow direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Output => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Transport used to move an object's bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// Path to a file
    File,
    /// Open stream handle
    Stream,
    /// Open file descriptor
    Descriptor,
    /// In-memory, copy semantics
    Duplicate,
    /// In-memory, alias semantics
    Reference,
}

impl Method {
    /// Stream and descriptor handles cannot be rewound.
    #[inline]
    pub const fn is_single_read(self) -> bool {
        matches!(self, Self::Stream | Self::Descriptor)
    }

    #[inline]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Duplicate | Self::Reference)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Stream => "stream",
            Self::Descriptor => "descriptor",
            Self::Duplicate => "duplicate",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Composite variant carrying a dataset through a raw external buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Via {
    #[default]
    None,
    Matrix,
    Vector,
}

impl Via {
    /// Which adapter a dataset request needs, given what was really allocated.
    pub const fn for_families(family: Family, actual: Family) -> Self {
        match (family, actual) {
            (Family::Dataset, Family::Matrix) => Self::Matrix,
            (Family::Dataset, Family::VectorSet) => Self::Vector,
            _ => Self::None,
        }
    }
}

/// Usage status; only moves forward unless a caller resets it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    #[default]
    Unused,
    InUse,
    Used,
}

/// Who allocated the underlying storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllocMode {
    /// Engine allocated; may be freed or resized
    #[default]
    Internal,
    /// Caller allocated; read only, never freed here
    External,
}

/// Whether table headers are passed through record I/O.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeaderMode {
    Off,
    #[default]
    On,
}
