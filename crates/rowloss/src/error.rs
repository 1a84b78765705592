//! Error type for the optimizer.

use thiserror::Error;

/// Failures the optimizer can surface to callers.
///
/// Everything else — a candidate row rejected by the adaptive gate, a
/// quantization band emptied by clamping — is handled internally and never
/// escapes.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// A working buffer could not be allocated. The image buffer must be
    /// treated as unspecified afterwards.
    #[error("out of memory allocating {what}")]
    OutOfMemory { what: &'static str },

    /// The caller-supplied geometry is inconsistent (row count, row
    /// length, or filter vector length does not match the stated
    /// dimensions). Signals a defect at the call site, not bad image data.
    #[error("internal invariant violated: {what}")]
    InternalInvariant { what: &'static str },
}

impl OptimizeError {
    pub(crate) fn oom(what: &'static str) -> Self {
        OptimizeError::OutOfMemory { what }
    }
}
