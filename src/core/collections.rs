//! Collection types used throughout the mesh.
//!
//! Hash maps use the Fx hasher (fast, non-cryptographic), small per-entity
//! adjacency lists use [`SmallBuffer`], and entity storage uses slotmap arenas
//! so keys stay stable across unrelated insertions and removals.

mod aliases;
mod buffers;
pub mod chunk_grid;
mod helpers;

pub use aliases::*;
pub use buffers::*;
pub use chunk_grid::ChunkGrid;
pub use helpers::*;
