//! Relevance ranking for memory reclamation

use super::arena::{TileArena, TileId};

/// Upper clamp for a tile's relevance counter.
pub const MISS_MAX: i32 = (1 << 30) - 1;
/// Lower clamp for a tile's relevance counter.
pub const MISS_MIN: i32 = -(1 << 30);

/// Clamps an intermediate counter value back into the declared range.
#[must_use]
pub fn clamp_miss(value: i64) -> i32 {
    value.clamp(i64::from(MISS_MIN), i64::from(MISS_MAX)) as i32
}

/// Collects every buffer-holding tile under `tile` into `out`.
///
/// While walking down, each node absorbs its parent's relevance count, so a
/// branch that queries kept passing over ranks its leaves as cold. A
/// buffer-less interior node recurses instead of being listed and then
/// returns its own counter to baseline, having handed the branch's history
/// to the candidates below it.
pub fn rank_tiles(arena: &mut TileArena, tile: TileId, parent_miss: i32, out: &mut Vec<TileId>) {
    let node = arena.get_mut(tile);
    node.miss = clamp_miss(i64::from(node.miss) + i64::from(parent_miss));
    let miss = node.miss;

    if node.pixmap.is_some() {
        out.push(tile);
        return;
    }

    if let Some(children) = node.children {
        for child in children {
            rank_tiles(arena, child, miss, out);
        }
        arena.get_mut(tile).miss = 0;
    }
}

/// Orders candidates most-evictable first: stale buffers go before clean
/// ones, and within the same class a higher relevance count goes first.
pub fn sort_for_eviction(arena: &TileArena, candidates: &mut [TileId]) {
    candidates.sort_by(|&a, &b| {
        let (a, b) = (arena.get(a), arena.get(b));
        b.dirty.cmp(&a.dirty).then(b.miss.cmp(&a.miss))
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::arena::TileNode;
    use super::super::pixmap::Pixmap;
    use super::super::rect::NormalizedRect;
    use super::*;

    fn buffer_node(rect: NormalizedRect, parent: Option<TileId>) -> TileNode {
        let mut node = TileNode::new(rect, parent);
        node.pixmap = Some(Arc::new(Pixmap::new(2, 2).unwrap()));
        node.dirty = false;
        node
    }

    #[test]
    fn ranking_folds_parent_counts_into_children() {
        let mut arena = TileArena::new();
        let parent = arena.insert(TileNode::new(NormalizedRect::full(), None));
        arena.get_mut(parent).miss = 5;

        let quarter = NormalizedRect::new(0.0, 0.0, 0.5, 0.5);
        let children = std::array::from_fn(|_| arena.insert(buffer_node(quarter, Some(parent))));
        arena.get_mut(children[0]).miss = 1;
        arena.get_mut(parent).children = Some(children);

        let mut out = Vec::new();
        rank_tiles(&mut arena, parent, 0, &mut out);

        assert_eq!(out.len(), 4);
        assert_eq!(arena.get(children[0]).miss, 6);
        assert_eq!(arena.get(children[1]).miss, 5);
        // The interior node handed its history down and started over.
        assert_eq!(arena.get(parent).miss, 0);
    }

    #[test]
    fn ranking_clamps_at_bounds() {
        let mut arena = TileArena::new();
        let parent = arena.insert(TileNode::new(NormalizedRect::full(), None));
        arena.get_mut(parent).miss = MISS_MAX;

        let quarter = NormalizedRect::new(0.0, 0.0, 0.5, 0.5);
        let children = std::array::from_fn(|_| arena.insert(buffer_node(quarter, Some(parent))));
        arena.get_mut(children[0]).miss = MISS_MAX;
        arena.get_mut(children[1]).miss = MISS_MIN;
        arena.get_mut(parent).children = Some(children);

        let mut out = Vec::new();
        rank_tiles(&mut arena, parent, 0, &mut out);

        assert_eq!(arena.get(children[0]).miss, MISS_MAX);
        assert_eq!(arena.get(children[1]).miss, MISS_MIN + MISS_MAX);
    }

    #[test]
    fn buffer_holding_tile_does_not_recurse() {
        let mut arena = TileArena::new();
        let parent = arena.insert(buffer_node(NormalizedRect::full(), None));
        let quarter = NormalizedRect::new(0.0, 0.0, 0.5, 0.5);
        let children = std::array::from_fn(|_| arena.insert(buffer_node(quarter, Some(parent))));
        arena.get_mut(parent).children = Some(children);

        let mut out = Vec::new();
        rank_tiles(&mut arena, parent, 0, &mut out);
        assert_eq!(out, vec![parent]);
    }

    #[test]
    fn stale_tiles_rank_ahead_of_clean_ones() {
        let mut arena = TileArena::new();
        let rect = NormalizedRect::full();

        let cold_clean = arena.insert(buffer_node(rect, None));
        arena.get_mut(cold_clean).miss = 100;
        let warm_dirty = arena.insert(buffer_node(rect, None));
        arena.get_mut(warm_dirty).miss = -100;
        arena.get_mut(warm_dirty).dirty = true;
        let warm_clean = arena.insert(buffer_node(rect, None));
        arena.get_mut(warm_clean).miss = -100;

        let mut candidates = vec![warm_clean, cold_clean, warm_dirty];
        sort_for_eviction(&arena, &mut candidates);
        assert_eq!(candidates, vec![warm_dirty, cold_clean, warm_clean]);
    }
}
