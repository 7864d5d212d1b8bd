//! The tile forest and its public cache API
//!
//! A page is partitioned into a fixed 4x4 grid of root tiles. Roots split
//! into quadrants on demand once their pixel area at the current page size
//! crosses the configured threshold, and fold back into a single buffer when
//! a later ingest finds them below it again. All tree geometry lives in the
//! natural (unrotated) page frame; rectangles are remapped at the API
//! boundary.

use std::sync::Arc;

use log::{debug, trace};

use crate::config::TilesConfig;
use crate::error::CacheError;

use super::arena::{TileArena, TileId, TileNode};
use super::eviction::{clamp_miss, rank_tiles, sort_for_eviction};
use super::pixmap::Pixmap;
use super::rect::{NormalizedRect, PixelRect};
use super::rotation::{to_display_frame, to_natural_frame, Rotation};

/// A snapshot of one cached tile, as returned by [`TilesManager::query`].
///
/// The rectangle is expressed in the caller's current display frame. The
/// pixel buffer is shared with the cache, so it stays alive for as long as
/// the snapshot does even if the cache evicts the tile in the meantime.
#[derive(Clone, Debug)]
pub struct Tile {
    pub rect: NormalizedRect,
    pub pixmap: Option<Arc<Pixmap>>,
    pub dirty: bool,
}

impl Tile {
    /// True when the buffer is present and up to date.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pixmap.is_some() && !self.dirty
    }
}

/// Memory-bounded quadtree cache for rendered page tiles.
///
/// The cache never renders anything itself: it stores buffers produced by an
/// external renderer via [`ingest`](Self::ingest), serves them back through
/// [`query`](Self::query) and [`is_covered`](Self::is_covered), and gives
/// memory back on request through [`reclaim`](Self::reclaim). All mutating
/// operations take `&mut self`; embedding the cache in a concurrent pipeline
/// requires an external lock around the whole instance.
pub struct TilesManager {
    arena: TileArena,
    roots: [TileId; 16],
    width: u32,
    height: u32,
    rotation: Rotation,
    total_pixels: u64,
    config: TilesConfig,
}

impl TilesManager {
    /// Creates a cache for a page displayed at `width` by `height` pixels.
    #[must_use]
    pub fn new(width: u32, height: u32, rotation: Rotation) -> Self {
        Self::with_config(width, height, rotation, TilesConfig::default())
    }

    /// Creates a cache with explicit tuning parameters. A zero split
    /// threshold is raised to one pixel, as splitting could otherwise
    /// recurse past the resolution of the page.
    #[must_use]
    pub fn with_config(width: u32, height: u32, rotation: Rotation, config: TilesConfig) -> Self {
        let config = TilesConfig {
            max_tile_pixels: config.max_tile_pixels.max(1),
        };
        let mut arena = TileArena::new();
        let roots = std::array::from_fn(|i| {
            const DIM: f64 = 0.25;
            let x = (i % 4) as f64;
            let y = (i / 4) as f64;
            let rect = NormalizedRect::new(x * DIM, y * DIM, (x + 1.0) * DIM, (y + 1.0) * DIM);
            arena.insert(TileNode::new(rect, None))
        });
        Self {
            arena,
            roots,
            width,
            height,
            rotation,
            total_pixels: 0,
            config,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Sets the displayed page width. Cached buffers were rendered for the
    /// old geometry, so every tile is invalidated.
    pub fn set_width(&mut self, width: u32) {
        if width == self.width {
            return;
        }
        self.width = width;
        self.invalidate_all();
    }

    /// Sets the displayed page height.
    ///
    /// Unlike a width change this is bookkeeping only: tiles keep their
    /// validity, matching the aspect-handling of the width/height pair where
    /// width is the driving dimension.
    pub fn set_height(&mut self, height: u32) {
        if height == self.height {
            return;
        }
        self.height = height;
    }

    /// Sets the display rotation. The mapping between stored geometry and
    /// pixel data changes with it, so every tile is invalidated.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        if rotation == self.rotation {
            return;
        }
        self.rotation = rotation;
        self.invalidate_all();
    }

    /// Marks every tile stale without freeing its pixels. Stale buffers are
    /// still served by [`query`](Self::query) but no longer count as
    /// coverage.
    pub fn invalidate_all(&mut self) {
        debug!("invalidating all cached tiles");
        for root in self.roots {
            self.mark_subtree_dirty(root);
        }
    }

    /// Stores a freshly rendered buffer for `region`.
    ///
    /// `region` is given in the current display frame and `pixmap` must hold
    /// the pixels for exactly that region at the current page size. Tiles
    /// fully inside the region receive their cut of the buffer, splitting or
    /// merging as the threshold dictates; an unsplit tile that only
    /// straddles the region's edge is left for a later, fully covering
    /// ingest (or for a query-triggered split).
    ///
    /// On allocation failure the tile being populated stays stale and
    /// already updated siblings are kept.
    pub fn ingest(&mut self, pixmap: &Pixmap, region: NormalizedRect) -> Result<(), CacheError> {
        let origin = region.geometry(self.width, self.height);
        let region = to_natural_frame(region, self.rotation);
        for root in self.roots {
            self.ingest_into(root, pixmap, region, origin)?;
        }
        Ok(())
    }

    /// True when `region` can be painted entirely from valid cached tiles.
    #[must_use]
    pub fn is_covered(&self, region: NormalizedRect) -> bool {
        let region = to_natural_frame(region, self.rotation);
        self.roots.iter().all(|&root| self.covered(root, region))
    }

    /// Returns the best tiles currently available for `region`.
    ///
    /// With `allow_empty` the full leaf structure under the region is
    /// enumerated, including tiles that have nothing cached yet; callers use
    /// that to schedule renders at the right granularity. Without it only
    /// buffer-holding tiles are returned, for painting. Splitting happens on
    /// demand, so the returned granularity always respects the configured
    /// tile size bound.
    pub fn query(&mut self, region: NormalizedRect, allow_empty: bool) -> Vec<Tile> {
        let region = to_natural_frame(region, self.rotation);
        let mut result = Vec::new();
        for root in self.roots {
            self.collect_tiles(root, region, allow_empty, &mut result);
        }
        result
    }

    /// Bytes currently held by cached buffers, at 4 bytes per pixel.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_pixels * Pixmap::BYTES_PER_PIXEL
    }

    /// Number of tiles currently holding a buffer.
    #[must_use]
    pub fn cached_tiles(&self) -> usize {
        fn count(arena: &TileArena, tile: TileId) -> usize {
            let node = arena.get(tile);
            let own = usize::from(node.pixmap.is_some());
            match node.children {
                Some(children) => {
                    own + children.iter().map(|&c| count(arena, c)).sum::<usize>()
                }
                None => own,
            }
        }
        self.roots.iter().map(|&r| count(&self.arena, r)).sum()
    }

    /// Frees at least `byte_budget` bytes of cached pixels if possible,
    /// least useful tiles first.
    ///
    /// Stale buffers go before valid ones; within the same class the tiles
    /// most recently passed over by queries go first. Ancestors of an
    /// evicted tile are marked stale, since they can no longer vouch for
    /// their whole subtree. Never fails: when nothing evictable remains the
    /// call simply stops short of the budget.
    pub fn reclaim(&mut self, byte_budget: u64) {
        let mut candidates = Vec::new();
        for root in self.roots {
            rank_tiles(&mut self.arena, root, 0, &mut candidates);
        }
        sort_for_eviction(&self.arena, &mut candidates);

        let mut freed = 0u64;
        for id in candidates {
            if freed >= byte_budget {
                break;
            }
            let node = self.arena.get_mut(id);
            let rect = node.rect;
            let Some(pixmap) = node.pixmap.take() else {
                continue;
            };
            node.miss = 0;
            let bytes = pixmap.byte_count();
            self.total_pixels = self.total_pixels.saturating_sub(pixmap.pixel_count());
            freed += bytes;
            trace!("evicted tile {rect:?} ({bytes} bytes)");
            self.propagate_staleness(id);
        }
        debug!("reclaim: freed {freed} of {byte_budget} requested bytes");
    }

    fn ingest_into(
        &mut self,
        tile: TileId,
        source: &Pixmap,
        region: NormalizedRect,
        origin: PixelRect,
    ) -> Result<(), CacheError> {
        let node = self.arena.get(tile);
        let tile_rect = node.rect;
        let children = node.children;

        if !tile_rect.intersects(&region) {
            return Ok(());
        }

        // The region stops inside this tile.
        if !region.contains(&tile_rect) {
            if let Some(children) = children {
                for child in children {
                    self.ingest_into(child, source, region, origin)?;
                }
                // A straddled interior tile can no longer hold a coherent
                // snapshot of its own full region.
                self.drop_pixmap(tile);
            }
            return Ok(());
        }

        let threshold = i64::from(self.config.max_tile_pixels);
        let area = tile_rect.geometry(self.width, self.height).area();
        match children {
            None if area < threshold => {
                self.store_tile_pixels(tile, source, origin)?;
            }
            None => {
                self.split(tile, region);
                if let Some(children) = self.arena.get(tile).children {
                    for child in children {
                        self.ingest_into(child, source, region, origin)?;
                    }
                    self.drop_pixmap(tile);
                    self.arena.get_mut(tile).dirty = false;
                }
            }
            Some(children) if area >= threshold => {
                for child in children {
                    self.ingest_into(child, source, region, origin)?;
                }
                self.drop_pixmap(tile);
                self.arena.get_mut(tile).dirty = false;
            }
            Some(children) => {
                // The page shrank below the split threshold: fold the whole
                // subtree back into a single buffer for this tile.
                debug!("merging tile {tile_rect:?} back into a single buffer");
                for child in children {
                    self.discard_subtree(child);
                }
                self.arena.get_mut(tile).children = None;
                self.store_tile_pixels(tile, source, origin)?;
            }
        }
        Ok(())
    }

    /// Replaces `tile`'s buffer with its cut of `source`. The tile is
    /// marked valid only once the copy has succeeded.
    fn store_tile_pixels(
        &mut self,
        tile: TileId,
        source: &Pixmap,
        origin: PixelRect,
    ) -> Result<(), CacheError> {
        let rect = self.arena.get(tile).rect;
        let target = to_display_frame(rect, self.rotation)
            .geometry(self.width, self.height)
            .translated(-origin.x, -origin.y);
        let copied = source.copy(target)?;

        self.drop_pixmap(tile);
        self.total_pixels += copied.pixel_count();
        let node = self.arena.get_mut(tile);
        node.pixmap = Some(Arc::new(copied));
        node.dirty = false;
        Ok(())
    }

    /// Subdivides `tile` into quadrants while its pixel area stays at or
    /// above the threshold, but only along the path that intersects
    /// `region`.
    fn split(&mut self, tile: TileId, region: NormalizedRect) {
        let node = self.arena.get(tile);
        if node.children.is_some() || region.is_empty() || !node.rect.intersects(&region) {
            return;
        }
        let rect = node.rect;
        if rect.geometry(self.width, self.height).area() < i64::from(self.config.max_tile_pixels) {
            return;
        }

        let h_center = (rect.left + rect.right) / 2.0;
        let v_center = (rect.top + rect.bottom) / 2.0;
        let quadrants = [
            NormalizedRect::new(rect.left, rect.top, h_center, v_center),
            NormalizedRect::new(h_center, rect.top, rect.right, v_center),
            NormalizedRect::new(rect.left, v_center, h_center, rect.bottom),
            NormalizedRect::new(h_center, v_center, rect.right, rect.bottom),
        ];
        let children = quadrants.map(|q| self.arena.insert(TileNode::new(q, Some(tile))));
        self.arena.get_mut(tile).children = Some(children);
        trace!("split tile {rect:?} into quadrants");

        for child in children {
            self.split(child, region);
        }
    }

    fn covered(&self, tile: TileId, region: NormalizedRect) -> bool {
        let node = self.arena.get(tile);
        if !node.rect.intersects(&region) {
            return true;
        }
        match node.children {
            None => node.pixmap.is_some() && !node.dirty,
            // A clean interior tile vouches for its whole subtree.
            Some(_) if !node.dirty => true,
            Some(children) => children.iter().all(|&c| self.covered(c, region)),
        }
    }

    fn collect_tiles(
        &mut self,
        tile: TileId,
        region: NormalizedRect,
        allow_empty: bool,
        result: &mut Vec<Tile>,
    ) {
        let rotation = self.rotation;
        let node = self.arena.get_mut(tile);
        if !node.rect.intersects(&region) {
            node.miss = clamp_miss(i64::from(node.miss) + 1);
            return;
        }

        self.split(tile, region);

        let node = self.arena.get_mut(tile);
        if (allow_empty && node.children.is_none())
            || (!allow_empty && node.pixmap.is_some())
        {
            node.miss = clamp_miss(i64::from(node.miss) - 1);
            result.push(Tile {
                rect: to_display_frame(node.rect, rotation),
                pixmap: node.pixmap.clone(),
                dirty: node.dirty,
            });
        } else if let Some(children) = node.children {
            for child in children {
                self.collect_tiles(child, region, allow_empty, result);
            }
        }
    }

    fn drop_pixmap(&mut self, tile: TileId) {
        if let Some(pixmap) = self.arena.get_mut(tile).pixmap.take() {
            self.total_pixels = self.total_pixels.saturating_sub(pixmap.pixel_count());
        }
    }

    /// Removes `tile` and everything below it from the arena, keeping the
    /// pixel accounting in step.
    fn discard_subtree(&mut self, tile: TileId) {
        let node = self.arena.remove(tile);
        if let Some(pixmap) = node.pixmap {
            self.total_pixels = self.total_pixels.saturating_sub(pixmap.pixel_count());
        }
        if let Some(children) = node.children {
            for child in children {
                self.discard_subtree(child);
            }
        }
    }

    fn mark_subtree_dirty(&mut self, tile: TileId) {
        let node = self.arena.get_mut(tile);
        node.dirty = true;
        if let Some(children) = node.children {
            for child in children {
                self.mark_subtree_dirty(child);
            }
        }
    }

    /// Walks clean ancestors of an evicted tile and marks them stale; a
    /// parent can only vouch for its subtree while every descendant is
    /// intact.
    fn propagate_staleness(&mut self, tile: TileId) {
        let mut current = self.arena.get(tile).parent;
        while let Some(id) = current {
            let node = self.arena.get_mut(id);
            if node.dirty {
                break;
            }
            node.dirty = true;
            current = node.parent;
        }
    }
}
