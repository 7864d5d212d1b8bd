//! Cache tuning knobs

use serde::{Deserialize, Serialize};

fn default_max_tile_pixels() -> u32 {
    2_000_000
}

/// Tuning parameters for a [`TilesManager`](crate::TilesManager).
///
/// All fields carry serde defaults, so an embedding application can splice a
/// partial `tiles` section into its own configuration file and omit whatever
/// it does not care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Pixel-area threshold above which a tile is subdivided instead of
    /// backed by a single buffer. Bounds the size of any one allocation.
    #[serde(default = "default_max_tile_pixels")]
    pub max_tile_pixels: u32,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            max_tile_pixels: default_max_tile_pixels(),
        }
    }
}
