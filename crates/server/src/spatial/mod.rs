//! Spatial indexing.

mod grid;

pub use grid::{cell_coords, cell_coords_of_key, cell_key, CellKey, SpatialGrid};
