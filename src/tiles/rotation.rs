//! Display rotation and the mapping between page coordinate frames
//!
//! The cache stores all geometry in the page's natural (unrotated) frame.
//! Callers work in whatever frame the page is currently displayed in, so
//! every rectangle crossing the public API boundary goes through one of the
//! two pure mappings below.

use serde::{Deserialize, Serialize};

use super::rect::NormalizedRect;

/// Clockwise display rotation of a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Maps a rectangle from the natural frame into the caller's display frame.
#[must_use]
pub fn to_display_frame(rect: NormalizedRect, rotation: Rotation) -> NormalizedRect {
    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => {
            NormalizedRect::new(1.0 - rect.bottom, rect.left, 1.0 - rect.top, rect.right)
        }
        Rotation::Deg180 => NormalizedRect::new(
            1.0 - rect.right,
            1.0 - rect.bottom,
            1.0 - rect.left,
            1.0 - rect.top,
        ),
        Rotation::Deg270 => {
            NormalizedRect::new(rect.top, 1.0 - rect.right, rect.bottom, 1.0 - rect.left)
        }
    }
}

/// Maps a caller-supplied rectangle back into the natural frame. Inverse of
/// [`to_display_frame`].
#[must_use]
pub fn to_natural_frame(rect: NormalizedRect, rotation: Rotation) -> NormalizedRect {
    match rotation {
        Rotation::Deg0 => rect,
        Rotation::Deg90 => {
            NormalizedRect::new(rect.top, 1.0 - rect.right, rect.bottom, 1.0 - rect.left)
        }
        Rotation::Deg180 => NormalizedRect::new(
            1.0 - rect.right,
            1.0 - rect.bottom,
            1.0 - rect.left,
            1.0 - rect.top,
        ),
        Rotation::Deg270 => {
            NormalizedRect::new(1.0 - rect.bottom, rect.left, 1.0 - rect.top, rect.right)
        }
    }
}
