//! Uniform hash grid for spatial indexing.
//!
//! Maps packed cell keys to the set of entity handles whose AABB intersects
//! that cell. The grid stores handles only; it never owns entities.

use std::collections::{HashMap, HashSet};

use crate::bounds::Aabb;
use crate::entity::EntityHandle;

/// Packed grid cell key: x cell coordinate in the high 32 bits, y in the low.
pub type CellKey = u64;

/// Pack integer cell coordinates into a key. Each axis is truncated to 32
/// bits two's-complement, so negative coordinates round-trip.
#[inline]
pub fn cell_key(cx: i32, cy: i32) -> CellKey {
    ((cx as u32 as u64) << 32) | (cy as u32 as u64)
}

/// Unpack a key back into integer cell coordinates.
#[inline]
pub fn cell_coords_of_key(key: CellKey) -> (i32, i32) {
    (((key >> 32) as u32) as i32, (key as u32) as i32)
}

/// Integer cell coordinates containing a world point.
#[inline]
pub fn cell_coords(x: f64, y: f64, cell_size: f64) -> (i32, i32) {
    ((x / cell_size).floor() as i32, (y / cell_size).floor() as i32)
}

/// Sparse uniform grid over the world plane.
///
/// Single-writer: all mutation happens on the tick task, and range queries
/// never interleave with mutation within a tick step.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, HashSet<EntityHandle>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "grid cell size must be positive");
        Self {
            cell_size,
            cells: HashMap::with_capacity(1024),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Keys of every cell the box intersects.
    pub fn cells_intersecting(&self, aabb: &Aabb) -> HashSet<CellKey> {
        let (min_cx, min_cy) = cell_coords(aabb.min_x, aabb.min_y, self.cell_size);
        let (max_cx, max_cy) = cell_coords(aabb.max_x, aabb.max_y, self.cell_size);

        let capacity = ((max_cx - min_cx + 1) as usize) * ((max_cy - min_cy + 1) as usize);
        let mut keys = HashSet::with_capacity(capacity);
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                keys.insert(cell_key(cx, cy));
            }
        }
        keys
    }

    /// Add a handle to a cell. Idempotent.
    pub fn insert(&mut self, handle: EntityHandle, key: CellKey) {
        self.cells.entry(key).or_default().insert(handle);
    }

    /// Remove a handle from a cell; cells left empty are dropped from the
    /// map. Idempotent.
    pub fn remove(&mut self, handle: &EntityHandle, key: CellKey) {
        if let Some(handles) = self.cells.get_mut(&key) {
            handles.remove(handle);
            if handles.is_empty() {
                self.cells.remove(&key);
            }
        }
    }

    /// Handles currently indexed in a cell.
    pub fn iter_cell(&self, key: CellKey) -> impl Iterator<Item = &EntityHandle> + '_ {
        self.cells.get(&key).into_iter().flatten()
    }

    /// Whether the cell has any handles.
    #[inline]
    pub fn contains_cell(&self, key: CellKey) -> bool {
        self.cells.contains_key(&key)
    }

    /// Number of occupied cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupied cells and their handle sets.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &HashSet<EntityHandle>)> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn object_handle() -> EntityHandle {
        EntityHandle::Object { id: Uuid::new_v4() }
    }

    #[test]
    fn test_key_packing_round_trips_negative_coords() {
        for &(cx, cy) in &[(0, 0), (-1, -1), (3, -7), (i32::MIN, i32::MAX)] {
            assert_eq!(cell_coords_of_key(cell_key(cx, cy)), (cx, cy));
        }
        // (-1, -1) truncates to all-ones per axis.
        assert_eq!(cell_key(-1, -1), u64::MAX);
    }

    #[test]
    fn test_cell_coords_floor_division() {
        assert_eq!(cell_coords(0.0, 0.0, 100.0), (0, 0));
        assert_eq!(cell_coords(99.9, 100.0, 100.0), (0, 1));
        assert_eq!(cell_coords(-0.1, -100.0, 100.0), (-1, -1));
    }

    #[test]
    fn test_cells_intersecting_counts() {
        let grid = SpatialGrid::new(100.0);

        // A box inside one cell.
        let one = grid.cells_intersecting(&Aabb::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(one.len(), 1);
        assert!(one.contains(&cell_key(0, 0)));

        // A box straddling the origin touches four cells.
        let four = grid.cells_intersecting(&Aabb::new(-10.0, -10.0, 10.0, 10.0));
        assert_eq!(four.len(), 4);
    }

    #[test]
    fn test_cells_intersecting_is_deterministic() {
        let grid = SpatialGrid::new(100.0);
        let aabb = Aabb::new(-250.0, -30.0, 120.0, 310.0);
        assert_eq!(grid.cells_intersecting(&aabb), grid.cells_intersecting(&aabb));
    }

    #[test]
    fn test_insert_remove_leaves_grid_unchanged() {
        let mut grid = SpatialGrid::new(100.0);
        let resident = object_handle();
        grid.insert(resident, cell_key(0, 0));

        let visitor = object_handle();
        grid.insert(visitor, cell_key(0, 0));
        grid.insert(visitor, cell_key(0, 0)); // idempotent
        grid.remove(&visitor, cell_key(0, 0));

        assert_eq!(grid.len(), 1);
        let handles: Vec<_> = grid.iter_cell(cell_key(0, 0)).copied().collect();
        assert_eq!(handles, vec![resident]);
    }

    #[test]
    fn test_empty_cells_are_dropped() {
        let mut grid = SpatialGrid::new(100.0);
        let handle = object_handle();
        grid.insert(handle, cell_key(2, 3));
        assert!(grid.contains_cell(cell_key(2, 3)));

        grid.remove(&handle, cell_key(2, 3));
        assert!(!grid.contains_cell(cell_key(2, 3)));
        assert!(grid.is_empty());

        // Removing again is a no-op.
        grid.remove(&handle, cell_key(2, 3));
        assert!(grid.is_empty());
    }
}
