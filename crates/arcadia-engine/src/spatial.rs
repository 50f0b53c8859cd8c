//! Uniform-grid broad phase.
//!
//! The grid is rebuilt from scratch every physics step: [`SpatialGrid::clear`]
//! followed by one [`insert`](SpatialGrid::insert) per collider. Queries
//! return every id filed in a cell that touches the query box, so results are
//! a superset of the true neighbours and callers must run an exact test.

use std::collections::HashMap;

use arcadia_ecs::entity::EntityId;

type CellKey = (i32, i32);

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<EntityId>>,
    len: usize,
}

impl SpatialGrid {
    /// # Panics
    ///
    /// Panics if `cell_size` is not positive and finite.
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "cell_size must be positive and finite, got {cell_size}"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    /// Empty every cell. Cell allocations are kept for the next rebuild.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.len = 0;
    }

    #[inline]
    fn cell_of(&self, x: f32, y: f32) -> CellKey {
        ((x / self.cell_size).floor() as i32, (y / self.cell_size).floor() as i32)
    }

    pub fn insert(&mut self, id: EntityId, x: f32, y: f32) {
        let key = self.cell_of(x, y);
        self.cells.entry(key).or_default().push(id);
        self.len += 1;
    }

    /// Ids in every cell intersecting `[x-r, x+r] x [y-r, y+r]`.
    pub fn query(&self, x: f32, y: f32, radius: f32) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_into(x, y, radius, &mut out);
        out
    }

    /// Like [`query`](Self::query), reusing `out` (cleared first).
    ///
    /// Cells are visited row by row, so the result order depends only on
    /// insertion order and positions.
    pub fn query_into(&self, x: f32, y: f32, radius: f32, out: &mut Vec<EntityId>) {
        out.clear();
        if !(x.is_finite() && y.is_finite()) || radius.is_nan() || self.len == 0 {
            return;
        }
        let r = radius.max(0.0);
        let (min_x, min_y) = self.cell_of(x - r, y - r);
        let (max_x, max_y) = self.cell_of(x + r, y + r);

        let span = (max_x as i64 - min_x as i64 + 1) * (max_y as i64 - min_y as i64 + 1);
        if span > self.cells.len() as i64 {
            // Huge query box: walk occupied cells instead, in row order.
            let mut keys: Vec<CellKey> = self
                .cells
                .iter()
                .filter(|(key, bucket)| {
                    let (cx, cy) = **key;
                    !bucket.is_empty() && (min_x..=max_x).contains(&cx) && (min_y..=max_y).contains(&cy)
                })
                .map(|(&key, _)| key)
                .collect();
            keys.sort_unstable_by_key(|&(cx, cy)| (cy, cx));
            for key in keys {
                out.extend_from_slice(&self.cells[&key]);
            }
            return;
        }

        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Entries inserted since the last [`clear`](Self::clear).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cells currently holding at least one id.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|b| !b.is_empty()).count()
    }
}
