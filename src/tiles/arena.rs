//! Index-addressed storage for quadtree tile nodes

use std::sync::Arc;

use super::pixmap::Pixmap;
use super::rect::NormalizedRect;

/// Handle to a tile record in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileId(u32);

impl TileId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One quadtree node.
///
/// Children, when present, are exactly four handles partitioning `rect`
/// into its quadrants. `parent` is a lookup-only back reference; ownership
/// runs strictly downward from the manager through `children`.
#[derive(Debug)]
pub struct TileNode {
    /// Coverage of this tile, always in the natural page frame.
    pub rect: NormalizedRect,
    /// Cached pixels for the tile's full region, if any.
    pub pixmap: Option<Arc<Pixmap>>,
    /// Stale flag. A dirty buffer must be treated as absent for coverage.
    pub dirty: bool,
    /// Relevance counter: grows when queries pass the tile over, shrinks
    /// when the tile is served.
    pub miss: i32,
    pub parent: Option<TileId>,
    pub children: Option<[TileId; 4]>,
}

impl TileNode {
    pub fn new(rect: NormalizedRect, parent: Option<TileId>) -> Self {
        Self {
            rect,
            pixmap: None,
            dirty: true,
            miss: 0,
            parent,
            children: None,
        }
    }
}

/// Slab of tile records with slot reuse.
///
/// Handles stay valid until their node is removed; a removed slot is
/// recycled by the next insertion.
#[derive(Debug, Default)]
pub struct TileArena {
    slots: Vec<Option<TileNode>>,
    free: Vec<u32>,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: TileNode) -> TileId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                TileId(slot)
            }
            None => {
                self.slots.push(Some(node));
                TileId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Removes a node, releasing its slot for reuse.
    pub fn remove(&mut self, id: TileId) -> TileNode {
        let node = self.slots[id.index()].take().expect("tile slot already vacated");
        self.free.push(id.0);
        node
    }

    pub fn get(&self, id: TileId) -> &TileNode {
        self.slots[id.index()].as_ref().expect("stale tile handle")
    }

    pub fn get_mut(&mut self, id: TileId) -> &mut TileNode {
        self.slots[id.index()].as_mut().expect("stale tile handle")
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
