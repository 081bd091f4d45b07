//! Rectangular geographic/cartesian regions used for subsets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// West/east/south/north bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Region {
    pub const fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self { west, east, south, north }
    }

    /// Non-empty and ordered.
    pub fn is_valid(&self) -> bool {
        self.west < self.east && self.south < self.north
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True if `other` lies entirely inside this region (within `tol`).
    pub fn contains(&self, other: &Region, tol: f64) -> bool {
        other.west >= self.west - tol
            && other.east <= self.east + tol
            && other.south >= self.south - tol
            && other.north <= self.north + tol
    }

    /// True if the point lies inside (edges included).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }

    /// Overlap of two regions, if any.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let r = Region::new(
            self.west.max(other.west),
            self.east.min(other.east),
            self.south.max(other.south),
            self.north.min(other.north),
        );
        r.is_valid().then_some(r)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.west, self.east, self.south, self.north)
    }
}
