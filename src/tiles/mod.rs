//! Quadtree tile cache infrastructure

mod arena;
mod eviction;
mod manager;
mod pixmap;
mod rect;
mod rotation;

pub use manager::{Tile, TilesManager};
pub use pixmap::Pixmap;
pub use rect::{NormalizedRect, PixelRect};
pub use rotation::{to_display_frame, to_natural_frame, Rotation};
