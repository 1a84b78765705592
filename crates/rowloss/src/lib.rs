//! rowloss: lossy row quantization for PNG pre-compression.
//!
//! Given a raster image, this crate perturbs pixel values within a
//! bounded quality envelope so that a standard PNG encoder (row filters +
//! DEFLATE) produces a significantly smaller file. It does not read or
//! write PNG itself — it rewrites pixel buffers in place and can report
//! the per-row filter an adaptive encoder will choose for the result.
//!
//! # How it works
//!
//! Rows are processed top to bottom. For each row, every PNG filter
//! (None, Sub, Up, Average, Paeth) is tried: the quantizer walks the row
//! and, for each channel, picks a post-filter byte ("symbol") that has
//! already been emitted often — maximizing DEFLATE back-references and
//! Huffman savings — while staying within `strength` of the source value.
//! The color error this introduces is diffused to neighbouring pixels
//! with a Sierra-style dither so the loss shows up as texture rather than
//! banding. A candidate row is only accepted when a minimum-sum adaptive
//! encoder would rediscover the filter it was optimized for, and the
//! cheapest accepted candidate wins.
//!
//! # Quick start
//!
//! ```
//! use rowloss::{optimize_rgba, Options};
//!
//! // A 4x4 RGBA image, mid-gray.
//! let mut pixels = vec![128u8; 4 * 4 * 4];
//! let options = Options::new().strength(20);
//! optimize_rgba(&mut pixels, 4, 4, &options, None).unwrap();
//! ```
//!
//! # Packed rows and filter reporting
//!
//! Callers that already hold packed 1/2/3/4-channel rows can drive the
//! core directly and collect the per-row PNG filter ids:
//!
//! ```
//! use rowloss::{optimize_rows, Options, PixelLayout};
//!
//! let mut data = vec![0u8; 8 * 8];
//! let mut rows: Vec<&mut [u8]> = data.chunks_mut(8).collect();
//! let mut filters = vec![0u8; 8];
//! let options = Options::new();
//! optimize_rows(&mut rows, 8, 8, PixelLayout::Gray, &options, Some(&mut filters)).unwrap();
//! assert!(filters.iter().all(|&f| f <= 4));
//! ```
//!
//! # Guarantees
//!
//! - Every output byte stays within `strength` of its source value;
//!   fully transparent pixels are preserved bit-exact on all channels.
//! - `strength` 0 is a bit-exact identity.
//! - Output is deterministic for identical inputs and options.
//! - Single-threaded and allocation-free inside the per-row loop; rows
//!   carry strict causal state, so one image cannot be parallelized, but
//!   independent images can be processed on independent threads.

mod adaptive;
mod adapter;
mod delta;
mod diffuse;
mod driver;
mod error;
mod filter;
mod frequency;
mod options;
mod state;

#[cfg(test)]
mod domain_tests;

pub use adaptive::adaptive_filter_for_row;
pub use adapter::{optimize_rgba, PixelLayout};
pub use delta::{color_difference, color_distance, ColorDelta};
pub use driver::optimize_rows;
pub use error::OptimizeError;
pub use filter::RowFilter;
pub use options::Options;
