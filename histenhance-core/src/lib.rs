//! Histogram-based enhancement of 8-bit raster images: global equalization,
//! CLAHE, gamma correction, linear contrast and histogram matching.
//!
//! Everything here is a pure transform over [`Image`] values. Decoding,
//! encoding and logger setup belong to the caller.

pub mod clahe;
pub mod error;
pub mod histogram;
pub mod image;
pub mod lut;
pub mod matching;
pub mod params;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod fixtures;

pub use clahe::TileGrid;
pub use error::{EnhanceError, Result};
pub use histogram::{Cdf, Histogram};
pub use image::Image;
pub use lut::Lut;
pub use params::{EnhancementParams, Method};
pub use pipeline::enhance;
