//! Cache error types

use std::collections::TryReserveError;

/// Failures a cache operation can report.
///
/// Geometry problems are deliberately not represented here: a malformed or
/// empty rectangle behaves as a non-intersecting no-op rather than an error,
/// and the cache never validates caller geometry.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A pixel buffer could not be allocated. Ingestion fails atomically for
    /// the tile it was about to populate: that tile stays stale, siblings
    /// already written are kept.
    #[error("pixel buffer allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    /// Raw bytes handed to `Pixmap::from_raw` do not match the declared
    /// dimensions.
    #[error("buffer is {actual} bytes, expected {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        actual: usize,
    },
}
