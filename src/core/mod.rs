//! Core vocabulary: what an object is, where it lives, how it is read.
//!
//! - [`ObjectId`], [`Family`], [`Geometry`], [`Direction`], [`Method`] - object identity and kind
//! - [`Status`], [`AllocMode`], [`Via`] - lifecycle and ownership state
//! - [`Region`] - rectangular domain for subregion reads
//! - [`SessionConfig`] - session-wide settings

mod kinds;
mod region;
mod config;

pub use kinds::*;
pub use region::Region;
pub use config::{BinaryLayout, Endian, GapRule, ModeFlags, SessionConfig, MAX_VIRTUAL_ID};
