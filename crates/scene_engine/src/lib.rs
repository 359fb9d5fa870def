//! # Scene Engine
//!
//! Scene core of an interactive 3D editor: a tree of game objects built from
//! pluggable components, a quadtree for picking and culling, and a
//! simulation clock with play/pause/step semantics.
//!
//! ## Features
//!
//! - **Scene Tree**: arena-backed game objects with UID lookup and
//!   hierarchical transform propagation
//! - **Components**: Transform, Mesh, Material, Light, BoundingBox and
//!   Animation behind one tagged type, created by tag through a registry
//! - **Spatial Index**: bounded-depth quadtree over world bounding boxes
//! - **Simulation Clock**: real and scaled time, fixed single steps
//! - **Persistence**: save and load through a structured-value tree
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct Editor;
//!
//! impl Application for Editor {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let root = engine.scene.create_empty_scene()?;
//!         let cube = engine.scene.create_game_object(Some(root), "Cube")?;
//!         engine.scene.set_local_position(cube, Vec3::new(0.0, 1.0, 0.0))?;
//!         engine.start_game();
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         if engine.clock.time_since_startup() > 5.0 {
//!             engine.quit();
//!         }
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, _engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scene_engine::foundation::logging::init();
//!     let mut engine = Engine::new(EngineConfig::default())?;
//!     engine.run(&mut Editor)?;
//!     Ok(())
//! }
//! ```

pub mod components;
pub mod config;
pub mod core;
pub mod foundation;
pub mod persistence;
pub mod scene;
pub mod spatial;
pub mod time;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError, FrameStatus, QuitHandle};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        components::{
            AnimationComponent, AnimationController, BoundingBoxComponent, Component, ComponentKind,
            ComponentRegistry, ComponentType, LightComponent, LightType, MaterialComponent, MeshComponent,
            TransformComponent,
        },
        core::config::{Config, EngineConfig, SceneConfig},
        foundation::{
            math::{Mat4, Quat, Transform, Vec2, Vec3},
            uid::Uid,
        },
        scene::{EntityKey, GameObject, Scene, SceneError, AABB, AABB2D},
        spatial::{Quadtree, QuadtreeConfig},
        time::{ClockState, GameClock, TimeConfig},
        AppError, Application, Engine, EngineError, FrameStatus,
    };
}
