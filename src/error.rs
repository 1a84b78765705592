use std::path::PathBuf;
use thiserror::Error;

/// Per-file failures of the squeeze pipeline.
#[derive(Debug, Error)]
pub enum SqueezeError {
    #[error("cannot decode PNG: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("cannot encode PNG: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("unsupported PNG: {0}")]
    Unsupported(&'static str),

    #[error("optimizer failed: {0}")]
    Optimize(#[from] rowloss::OptimizeError),

    #[error("'{0}' exists; not overwriting (use --force)")]
    NotOverwriting(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
