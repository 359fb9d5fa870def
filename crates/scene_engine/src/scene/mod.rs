//! Scene management system
//!
//! The scene is a tree of game objects, each owning an ordered list of
//! components. The [`Scene`] manager owns every object in an arena, keeps a
//! UID lookup table and maintains the quadtree used for picking and culling.
//!
//! ## Architecture
//!
//! ```text
//! Scene (arena + UID map + quadtree)
//!   └─ GameObject (root)
//!        ├─ components: Transform, Mesh, Light, ...
//!        └─ children: GameObject, GameObject, ...
//! ```
//!
//! Parent links and component owners are arena keys, never references, so
//! structural edits cannot leave anything dangling.

mod bounds;
mod game_object;
mod scene_manager;

pub use bounds::{AABB, AABB2D, OBB};
pub use game_object::{EntityKey, GameObject};
pub use scene_manager::{InvariantViolation, Scene, SceneError};

#[cfg(test)]
mod tests;
