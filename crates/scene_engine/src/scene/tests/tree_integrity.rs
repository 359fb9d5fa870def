//! Random create/destroy/reparent sequences must keep the tree consistent

use super::seeded_scene;
use crate::scene::{EntityKey, InvariantViolation, Scene, SceneError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn assert_tree_consistent(scene: &Scene) {
    let mut listed_in: HashMap<EntityKey, EntityKey> = HashMap::new();

    for (key, object) in scene.iter() {
        assert_eq!(scene.key_of(object.id()), Some(key), "UID map out of sync");
        assert!(!scene.is_descendant_of(key, key), "{key:?} is its own ancestor");

        for &child in object.children() {
            let child_object = scene.game_object(child).expect("child must be alive");
            assert_eq!(child_object.parent(), Some(key), "child does not point back");
            assert!(listed_in.insert(child, key).is_none(), "{child:?} listed by two parents");
        }

        if let Some(parent) = object.parent() {
            let siblings = scene.game_object(parent).expect("parent must be alive").children();
            assert_eq!(siblings.iter().filter(|&&k| k == key).count(), 1);
        }
    }

    if let Some(root) = scene.root() {
        assert_eq!(scene.game_object(root).unwrap().parent(), None);
        assert!(!listed_in.contains_key(&root));
    }
}

#[test]
fn test_random_edit_sequences_keep_tree_consistent() {
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = seeded_scene(seed);
        let mut keys = vec![scene.create_empty_scene().unwrap()];

        for _ in 0..400 {
            let pick = keys[rng.gen_range(0..keys.len())];
            match rng.gen_range(0..10) {
                0..=3 => {
                    let parent = if rng.gen_bool(0.9) { Some(pick) } else { None };
                    keys.push(scene.create_game_object(parent, "Node").unwrap());
                }
                4..=5 => {
                    if Some(pick) != scene.root() {
                        assert!(scene.destroy_game_object(pick));
                        keys.retain(|&k| scene.contains(k));
                    }
                }
                _ => {
                    let target = keys[rng.gen_range(0..keys.len())];
                    let new_parent = if rng.gen_bool(0.95) { Some(target) } else { None };
                    let before = scene.game_object(pick).unwrap().parent();

                    match scene.set_parent(pick, new_parent) {
                        Ok(()) => {
                            if Some(pick) != scene.root() {
                                assert_eq!(scene.game_object(pick).unwrap().parent(), new_parent);
                            }
                        }
                        Err(SceneError::InvariantViolation(
                            InvariantViolation::Cycle | InvariantViolation::RootReparent,
                        )) => {
                            assert_eq!(scene.game_object(pick).unwrap().parent(), before);
                        }
                        Err(other) => panic!("unexpected error {other}"),
                    }
                }
            }

            assert_tree_consistent(&scene);
        }

        assert!(!keys.is_empty());
        assert_eq!(scene.entity_count(), keys.len());
    }
}

#[test]
fn test_destroyed_keys_are_never_reused_for_lookups() {
    let mut scene = seeded_scene(3);
    let root = scene.create_empty_scene().unwrap();
    let doomed = scene.create_game_object(Some(root), "Doomed").unwrap();
    scene.destroy_game_object(doomed);

    let fresh = scene.create_game_object(Some(root), "Fresh").unwrap();

    assert_ne!(doomed, fresh);
    assert!(scene.game_object(doomed).is_none());
    assert!(matches!(scene.set_parent(doomed, Some(root)), Err(SceneError::EntityNotFound(k)) if k == doomed));
    assert!(!scene.destroy_game_object(doomed));
}

#[test]
fn test_destroying_the_root_allows_a_new_one() {
    let mut scene = seeded_scene(4);
    let root = scene.create_empty_scene().unwrap();
    scene.create_game_object(Some(root), "Child").unwrap();

    scene.destroy_game_object(root);
    assert_eq!(scene.root(), None);
    assert_eq!(scene.entity_count(), 0);

    let new_root = scene.create_game_object(None, "Scene").unwrap();
    assert_eq!(scene.root(), Some(new_root));
}
