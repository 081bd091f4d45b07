//! Leaf types shared by every layer.
//!
//! - [`ValueType`] / [`Primitive`] - numeric element types and conversion
//! - [`Column`] - typed value buffer
//! - [`Error`] / [`Result`] - error handling

mod value;
mod column;
mod error;

pub use value::*;
pub use column::*;
pub use error::*;
