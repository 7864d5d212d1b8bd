//! Owned RGBA pixel buffers exchanged with the renderer

use crate::error::CacheError;

use super::rect::PixelRect;

/// Raw RGBA image data, 4 bytes per pixel.
///
/// This is the only payload the cache stores or serves. It is produced
/// outside the cache by whatever renders the page, and the cache treats the
/// bytes as opaque.
#[derive(Clone)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Bytes per pixel for every buffer.
    pub const BYTES_PER_PIXEL: u64 = 4;

    /// Creates a transparent (zero-filled) buffer.
    pub fn new(width: u32, height: u32) -> Result<Self, CacheError> {
        let len = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wraps raw RGBA bytes. The buffer length must match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CacheError> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        if data.len() != expected {
            return Err(CacheError::BufferSize {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    #[must_use]
    pub fn byte_count(&self) -> u64 {
        self.pixel_count() * Self::BYTES_PER_PIXEL
    }

    /// Copies a sub-rectangle into a new buffer.
    ///
    /// The request is clamped to the source bounds, so a rectangle spilling
    /// past an edge yields only its in-bounds part. Allocation failure is
    /// reported without touching the source.
    pub fn copy(&self, rect: PixelRect) -> Result<Pixmap, CacheError> {
        let x0 = rect.x.clamp(0, i64::from(self.width));
        let y0 = rect.y.clamp(0, i64::from(self.height));
        let x1 = (rect.x + rect.width).clamp(x0, i64::from(self.width));
        let y1 = (rect.y + rect.height).clamp(y0, i64::from(self.height));

        let width = (x1 - x0) as u32;
        let height = (y1 - y0) as u32;
        let row_bytes = width as usize * Self::BYTES_PER_PIXEL as usize;

        let mut data = Vec::new();
        data.try_reserve_exact(row_bytes * height as usize)?;
        for row in 0..height as usize {
            let src_y = y0 as usize + row;
            let start = (src_y * self.width as usize + x0 as usize) * Self::BYTES_PER_PIXEL as usize;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        Ok(Pixmap {
            width,
            height,
            data,
        })
    }
}

impl std::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
