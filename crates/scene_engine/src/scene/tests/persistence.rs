//! Saving and loading whole scenes

use super::seeded_scene;
use crate::components::test_support::LinearController;
use crate::components::{
    AnimationComponent, BoundingBoxComponent, ComponentKind, ComponentRegistry, ComponentType, LightComponent,
    LightType, MaterialComponent, MeshComponent, ShaderType,
};
use crate::foundation::math::{Vec2, Vec3};
use crate::foundation::uid::Uid;
use crate::persistence::PersistenceError;
use crate::scene::{EntityKey, GameObject, Scene, SceneError, AABB, AABB2D};
use crate::spatial::QuadtreeConfig;
use approx::assert_relative_eq;
use serde_json::{json, Value};

struct Saved {
    json: Value,
    lamp: Uid,
    crate_id: Uid,
    lid: Uid,
}

fn populated_scene() -> (Scene, Saved) {
    let mut scene = seeded_scene(21);
    let root = scene.create_empty_scene().unwrap();

    let lamp = scene.create_game_object(Some(root), "Lamp").unwrap();
    let mut spot = LightComponent::new(LightType::Spot);
    spot.intensity = 3.5;
    scene.add_component(lamp, ComponentKind::Light(spot)).unwrap();
    scene.set_local_position(lamp, Vec3::new(0.0, 4.0, 0.0)).unwrap();
    scene.game_object_mut(lamp).unwrap().disable();

    let crate_box = scene.create_game_object(Some(root), "Crate").unwrap();
    scene.add_component(crate_box, ComponentKind::Mesh(MeshComponent::new(Uid::from_raw(900), 1))).unwrap();
    let material = MaterialComponent { texture: Uid::from_raw(901), shader: ShaderType::Standard, ..Default::default() };
    scene.add_component(crate_box, ComponentKind::Material(material)).unwrap();
    scene
        .add_component(crate_box, ComponentKind::BoundingBox(BoundingBoxComponent::new(AABB::default())))
        .unwrap();
    scene.set_local_position(crate_box, Vec3::new(10.0, 0.0, 10.0)).unwrap();

    let lid = scene.create_game_object(Some(crate_box), "Lid").unwrap();
    scene.set_local_position(lid, Vec3::new(0.0, 1.0, 0.0)).unwrap();

    scene
        .rebuild_quadtree_with(QuadtreeConfig {
            bounds: AABB2D::new(Vec2::new(-64.0, -64.0), Vec2::new(64.0, 64.0)),
            max_depth: 6,
            elements_per_node: 2,
        })
        .unwrap();

    let id = |key: EntityKey| scene.game_object(key).unwrap().id();
    let saved = Saved { lamp: id(lamp), crate_id: id(crate_box), lid: id(lid), json: scene.save() };
    (scene, saved)
}

fn object(scene: &Scene, id: Uid) -> &GameObject {
    scene.get_game_object(id).unwrap()
}

#[test]
fn test_save_lists_parents_before_children() {
    let (scene, saved) = populated_scene();
    let objects = saved.json["GameObjects"].as_array().unwrap();

    assert_eq!(objects.len(), 4);
    assert_eq!(objects[0]["ParentId"], 0);
    assert_eq!(objects[0]["Name"], "Scene");

    let root_id = scene.game_object(scene.root().unwrap()).unwrap().id().raw();
    assert_eq!(objects[1]["ParentId"], root_id);
    assert_eq!(objects[3]["ParentId"], saved.crate_id.raw());
    assert_eq!(saved.json["Quadtree"]["MaxDepth"], 6);
}

#[test]
fn test_load_restores_tree_and_components() {
    let (original, saved) = populated_scene();
    let text = serde_json::to_string(&saved.json).unwrap();
    let json: Value = serde_json::from_str(&text).unwrap();

    let mut scene = seeded_scene(99);
    scene.load(&json, &ComponentRegistry::with_defaults()).unwrap();

    assert_eq!(scene.entity_count(), 4);
    let root = scene.root().unwrap();
    assert_eq!(scene.game_object(root).unwrap().id(), original.game_object(original.root().unwrap()).unwrap().id());

    let lamp = object(&scene, saved.lamp);
    assert!(!lamp.is_active());
    assert_eq!(lamp.parent(), Some(root));
    let light = lamp.get_component::<LightComponent>().unwrap();
    assert_eq!(light.light_type, LightType::Spot);
    assert_relative_eq!(light.intensity, 3.5);
    // Cached world data is refreshed on load.
    assert_relative_eq!(light.position(), Vec3::new(0.0, 4.0, 0.0));

    let crate_object = object(&scene, saved.crate_id);
    let types: Vec<ComponentType> = crate_object.components().iter().map(|c| c.component_type()).collect();
    assert_eq!(
        types,
        [ComponentType::Transform, ComponentType::Mesh, ComponentType::Material, ComponentType::BoundingBox]
    );
    assert_eq!(crate_object.get_component::<MeshComponent>().unwrap().mesh, Uid::from_raw(900));
    assert_eq!(crate_object.get_component::<MaterialComponent>().unwrap().shader, ShaderType::Standard);

    let lid = object(&scene, saved.lid);
    assert_eq!(lid.parent(), scene.key_of(saved.crate_id));
    assert_relative_eq!(lid.transform().unwrap().global_position(), Vec3::new(10.0, 1.0, 10.0), epsilon = 1e-5);
}

#[test]
fn test_load_restores_quadtree() {
    let (_, saved) = populated_scene();

    let mut scene = seeded_scene(5);
    scene.load(&saved.json, &ComponentRegistry::default()).unwrap();

    assert_eq!(scene.config().quadtree.max_depth, 6);
    assert_eq!(scene.quadtree().len(), 1);
    let hits = scene.quadtree_query(&AABB2D::from_point(Vec2::new(10.0, 10.0)));
    assert_eq!(hits, vec![scene.key_of(saved.crate_id).unwrap()]);
}

#[test]
fn test_animation_needs_registered_factory() {
    let mut scene = seeded_scene(8);
    let root = scene.create_empty_scene().unwrap();
    let controller = LinearController::with_joints(&["Hip"]);
    scene
        .add_component(root, ComponentKind::Animation(AnimationComponent::new(Box::new(controller))))
        .unwrap();
    let json = scene.save();

    let mut target = seeded_scene(9);
    target.create_empty_scene().unwrap();
    let result = target.load(&json, &ComponentRegistry::with_defaults());
    assert!(matches!(result, Err(SceneError::Persistence(PersistenceError::UnregisteredComponent(_)))));
    assert_eq!(target.entity_count(), 0);

    let mut registry = ComponentRegistry::with_defaults();
    registry.register_animation(|| Box::new(LinearController::with_joints(&["Hip"])));
    target.load(&json, &registry).unwrap();
    let root = target.root().unwrap();
    assert!(target.game_object(root).unwrap().has_component(ComponentType::Animation));
}

#[test]
fn test_load_rejects_inconsistent_data() {
    let registry = ComponentRegistry::with_defaults();
    let entity = |id: u64, parent: u64| json!({ "Id": id, "Name": "N", "Active": true, "ParentId": parent, "Components": [] });
    let mut scene = seeded_scene(1);

    let orphan = json!({ "GameObjects": [entity(1, 0), entity(2, 77)] });
    assert_eq!(scene.load(&orphan, &registry), Err(SceneError::UnknownParent(Uid::from_raw(77))));

    let duplicate = json!({ "GameObjects": [entity(1, 0), entity(1, 0)] });
    assert_eq!(scene.load(&duplicate, &registry), Err(SceneError::DuplicateUid(Uid::from_raw(1))));

    let unknown_type = json!({ "GameObjects": [{
        "Id": 1, "Name": "N", "Active": true, "ParentId": 0,
        "Components": [{ "Type": 17, "Active": true }]
    }] });
    assert_eq!(
        scene.load(&unknown_type, &registry),
        Err(SceneError::Persistence(PersistenceError::UnknownComponentType(17)))
    );

    assert_eq!(
        scene.load(&json!({}), &registry),
        Err(SceneError::Persistence(PersistenceError::MissingField("GameObjects")))
    );
    assert_eq!(scene.entity_count(), 0);
}
