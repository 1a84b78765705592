//! pngsqueeze - lossy PNG pre-compressor.
//!
//! The CLI lives in `main.rs`; this library exposes the pipeline modules
//! for integration testing.

pub mod error;
pub mod job;
pub mod png_io;
