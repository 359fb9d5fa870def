//! Scenario tests spanning the scene, its components and the quadtree

mod persistence;
mod tree_integrity;

use crate::core::config::SceneConfig;
use crate::foundation::uid::UidGenerator;
use crate::scene::Scene;

fn seeded_scene(seed: u64) -> Scene {
    Scene::with_uid_generator(SceneConfig::default(), UidGenerator::with_seed(seed)).unwrap()
}
