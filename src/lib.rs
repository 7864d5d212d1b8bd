//! Memory-bounded, resolution-adaptive tile cache for rendered document
//! pages.
//!
//! The cache stores opaque RGBA buffers produced by an external renderer,
//! keyed by normalized page regions, and serves the best available tiles
//! back to a painter. It never renders, never decides when to repaint, and
//! never touches the disk.

pub mod config;
pub mod error;
pub mod tiles;

pub use config::TilesConfig;
pub use error::CacheError;
pub use tiles::{
    to_display_frame, to_natural_frame, NormalizedRect, PixelRect, Pixmap, Rotation, Tile,
    TilesManager,
};
