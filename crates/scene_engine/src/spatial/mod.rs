//! Spatial partitioning data structures
//!
//! Provides the quadtree used for picking and culling queries over the
//! scene's ground plane.

mod quadtree;

pub use quadtree::{Quadtree, QuadtreeConfig, QuadNodeView, SpatialError};
