//! Scene Manager - owner of the game object tree
//!
//! The scene keeps every game object in a generational arena, a UID lookup
//! table and the quadtree used for picking and culling. All structural edits
//! go through it so the parent/child links stay consistent in both
//! directions:
//!
//! 1. Create, destroy, duplicate and reparent game objects
//! 2. Propagate local transform edits down the subtree
//! 3. Keep quadtree entries in sync with world bounding boxes
//! 4. Drive the per-frame component update traversal
//! 5. Save and load the tree through the structured-value format

use crate::components::{
    AnimationComponent, BoundingBoxComponent, Component, ComponentKind, ComponentRegistry, ComponentType,
    JointPose, TransformComponent,
};
use crate::core::config::SceneConfig;
use crate::foundation::math::{Mat4, Quat, Transform, Vec2, Vec3};
use crate::foundation::uid::{Uid, UidGenerator};
use crate::persistence::{read_bool, read_floats, read_str, read_u64, read_uid, JsonObject, PersistenceError};
use crate::scene::game_object::{
    EntityKey, GameObject, JSON_TAG_ACTIVE, JSON_TAG_COMPONENTS, JSON_TAG_ID, JSON_TAG_NAME, JSON_TAG_PARENT_ID,
};
use crate::scene::{AABB, AABB2D};
use crate::spatial::{Quadtree, QuadtreeConfig, SpatialError};
use serde_json::Value;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const JSON_TAG_GAME_OBJECTS: &str = "GameObjects";
const JSON_TAG_QUADTREE: &str = "Quadtree";
const JSON_TAG_BOUNDS: &str = "Bounds";
const JSON_TAG_MAX_DEPTH: &str = "MaxDepth";
const JSON_TAG_ELEMENTS_PER_NODE: &str = "ElementsPerNode";

/// Broken tree consistency rule. Always reported, never ignored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// New parent is the object itself or one of its descendants
    #[error("reparenting would create a cycle")]
    Cycle,

    /// Object is missing from the child list of its recorded parent
    #[error("object is not listed among its parent's children")]
    ChildNotInParent,

    /// The scene root cannot be given a parent
    #[error("the scene root cannot be reparented")]
    RootReparent,
}

/// Scene errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Key does not refer to a live game object
    #[error("game object {0:?} not found")]
    EntityNotFound(EntityKey),

    /// Saved data references a parent that was not saved
    #[error("parent {0} of a saved game object does not exist")]
    UnknownParent(Uid),

    /// Operation needs a component the object lacks
    #[error("game object {entity} has no {component} component")]
    MissingComponent {
        /// Object that was operated on
        entity: Uid,
        /// Required component
        component: ComponentType,
    },

    /// Tree consistency rule broken
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    /// UID already registered in the scene
    #[error("UID {0} is already in use")]
    DuplicateUid(Uid),

    /// Save/load failure
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Quadtree failure
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// Scene Manager - owns game objects, their lookup table and the quadtree
pub struct Scene {
    config: SceneConfig,
    objects: SlotMap<EntityKey, GameObject>,
    ids: HashMap<Uid, EntityKey>,
    root: Option<EntityKey>,
    quadtree: Quadtree<EntityKey>,
    uids: UidGenerator,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("objects", &self.objects.len())
            .field("indexed", &self.quadtree.len())
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Create an empty scene (no root)
    pub fn new(config: SceneConfig) -> Result<Self, SceneError> {
        Self::with_uid_generator(config, UidGenerator::new())
    }

    /// Create an empty scene drawing UIDs from `uids`
    pub fn with_uid_generator(config: SceneConfig, uids: UidGenerator) -> Result<Self, SceneError> {
        Ok(Self {
            quadtree: Quadtree::new(config.quadtree)?,
            config,
            objects: SlotMap::with_key(),
            ids: HashMap::new(),
            root: None,
            uids,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Root game object
    pub fn root(&self) -> Option<EntityKey> {
        self.root
    }

    /// Number of live game objects, detached ones included
    pub fn entity_count(&self) -> usize {
        self.objects.len()
    }

    /// Whether `key` refers to a live game object
    pub fn contains(&self, key: EntityKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Game object by key
    pub fn game_object(&self, key: EntityKey) -> Option<&GameObject> {
        self.objects.get(key)
    }

    /// Mutable game object by key.
    ///
    /// Structural links are not reachable from here; use the scene's
    /// methods to reparent, and its transform setters to move objects.
    pub fn game_object_mut(&mut self, key: EntityKey) -> Option<&mut GameObject> {
        self.objects.get_mut(key)
    }

    /// Game object by UID
    pub fn get_game_object(&self, id: Uid) -> Option<&GameObject> {
        self.key_of(id).and_then(|key| self.objects.get(key))
    }

    /// Arena key of a UID
    pub fn key_of(&self, id: Uid) -> Option<EntityKey> {
        self.ids.get(&id).copied()
    }

    /// All live game objects in arena order
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &GameObject)> {
        self.objects.iter()
    }

    /// Keys reachable from the root in depth-first pre-order
    pub fn pre_order(&self) -> Vec<EntityKey> {
        self.collect_pre_order(false)
    }

    fn collect_pre_order(&self, active_only: bool) -> Vec<EntityKey> {
        let mut order = Vec::with_capacity(self.objects.len());
        let mut stack: Vec<EntityKey> = self.root.into_iter().collect();

        while let Some(key) = stack.pop() {
            let Some(object) = self.objects.get(key) else {
                continue;
            };
            if active_only && !object.is_active() {
                continue;
            }
            order.push(key);
            stack.extend(object.children.iter().rev().copied());
        }

        order
    }

    /// Whether `ancestor` lies on the parent chain of `key`
    pub fn is_descendant_of(&self, key: EntityKey, ancestor: EntityKey) -> bool {
        let mut current = self.objects.get(key).and_then(|object| object.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.objects.get(parent).and_then(|object| object.parent);
        }
        false
    }

    fn require(&self, key: EntityKey) -> Result<&GameObject, SceneError> {
        self.objects.get(key).ok_or(SceneError::EntityNotFound(key))
    }

    fn fresh_uid(&mut self) -> Uid {
        loop {
            let id = self.uids.generate();
            if !self.ids.contains_key(&id) {
                return id;
            }
        }
    }

    /// Allocate an unlinked object with a given UID
    fn spawn(&mut self, id: Uid, name: impl Into<String>) -> Result<EntityKey, SceneError> {
        if self.ids.contains_key(&id) {
            return Err(SceneError::DuplicateUid(id));
        }
        let key = self.objects.insert(GameObject::new(id, name));
        self.ids.insert(id, key);
        Ok(key)
    }

    fn attach_to(&mut self, key: EntityKey, parent: EntityKey) {
        if let Some(object) = self.objects.get_mut(key) {
            object.parent = Some(parent);
        }
        if let Some(parent) = self.objects.get_mut(parent) {
            parent.children.push(key);
        }
    }

    // --- structural edits ---

    /// Create a game object with a fresh UID and an identity transform.
    ///
    /// With a parent the object is appended to its children. Without one it
    /// becomes the root if the scene has none, and is left detached otherwise.
    pub fn create_game_object(
        &mut self,
        parent: Option<EntityKey>,
        name: impl Into<String>,
    ) -> Result<EntityKey, SceneError> {
        if let Some(parent) = parent {
            self.require(parent)?;
        }

        let id = self.fresh_uid();
        let key = self.spawn(id, name)?;
        match parent {
            Some(parent) => self.attach_to(key, parent),
            None if self.root.is_none() => self.root = Some(key),
            None => {}
        }
        self.add_component(key, ComponentKind::Transform(TransformComponent::default()))?;

        log::debug!("Created game object {id} under {parent:?}");
        Ok(key)
    }

    /// Attach a component and run its `init` hook. Returns its index.
    pub fn add_component(&mut self, key: EntityKey, kind: ComponentKind) -> Result<usize, SceneError> {
        let is_transform = kind.component_type() == ComponentType::Transform;
        let object = self.objects.get_mut(key).ok_or(SceneError::EntityNotFound(key))?;
        object.components.push(Component::new(key, kind));
        let index = object.components.len() - 1;

        if is_transform {
            self.propagate_transforms(key);
        }
        let world = self.world_matrix_of(key);
        if let Some(component) = self.objects.get_mut(key).and_then(|o| o.components.get_mut(index)) {
            component.init(&world);
        }
        Ok(index)
    }

    /// Detach and return the component at `index`.
    ///
    /// Removing the last BoundingBox drops the object from the quadtree.
    /// Removing its Transform recomputes the subtree from the parent's
    /// world matrix.
    pub fn remove_component(&mut self, key: EntityKey, index: usize) -> Result<Option<Component>, SceneError> {
        let object = self.objects.get_mut(key).ok_or(SceneError::EntityNotFound(key))?;
        let Some(removed) = object.remove_component(index) else {
            return Ok(None);
        };

        match removed.component_type() {
            ComponentType::BoundingBox if !object.has_component(ComponentType::BoundingBox) => {
                if object.in_quadtree {
                    self.remove_from_quadtree(key);
                }
            }
            ComponentType::Transform => self.propagate_transforms(key),
            _ => {}
        }
        Ok(Some(removed))
    }

    /// Destroy a game object and its whole subtree.
    ///
    /// Returns false if the key was already gone.
    pub fn destroy_game_object(&mut self, key: EntityKey) -> bool {
        let Some(object) = self.objects.get(key) else {
            return false;
        };

        if let Some(parent) = object.parent.and_then(|parent| self.objects.get_mut(parent)) {
            parent.children.retain(|&child| child != key);
        }
        if self.root == Some(key) {
            self.root = None;
        }

        let mut destroyed = 0usize;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(object) = self.objects.remove(current) else {
                continue;
            };
            self.ids.remove(&object.id());
            if object.in_quadtree {
                self.quadtree.remove(&current);
            }
            stack.extend(object.children);
            destroyed += 1;
        }

        log::debug!("Destroyed {destroyed} game objects rooted at {key:?}");
        true
    }

    /// Move `key` under `new_parent`, or detach it with `None`.
    ///
    /// The local transform is kept and world transforms are recomputed.
    pub fn set_parent(&mut self, key: EntityKey, new_parent: Option<EntityKey>) -> Result<(), SceneError> {
        let current_parent = self.require(key)?.parent;

        if self.root == Some(key) {
            return match new_parent {
                None => Ok(()),
                Some(_) => Err(InvariantViolation::RootReparent.into()),
            };
        }
        if let Some(parent) = new_parent {
            self.require(parent)?;
            if parent == key || self.is_descendant_of(parent, key) {
                return Err(InvariantViolation::Cycle.into());
            }
        }

        if let Some(old_parent) = current_parent {
            let siblings = &mut self
                .objects
                .get_mut(old_parent)
                .ok_or(InvariantViolation::ChildNotInParent)?
                .children;
            let position = siblings
                .iter()
                .position(|&child| child == key)
                .ok_or(InvariantViolation::ChildNotInParent)?;
            siblings.remove(position);
        }

        match new_parent {
            Some(parent) => self.attach_to(key, parent),
            None => {
                if let Some(object) = self.objects.get_mut(key) {
                    object.parent = None;
                }
            }
        }

        self.propagate_transforms(key);
        Ok(())
    }

    /// Deep-copy a game object and its subtree with fresh UIDs.
    ///
    /// The copy is appended to the original's parent, or left detached when
    /// the original has none. Copies of indexed objects are indexed too.
    pub fn duplicate_game_object(&mut self, key: EntityKey) -> Result<EntityKey, SceneError> {
        let parent = self.require(key)?.parent;

        let mut copy_root = None;
        let mut indexed = Vec::new();
        let mut stack = vec![(key, parent)];

        while let Some((source, copy_parent)) = stack.pop() {
            let Some(original) = self.objects.get(source) else {
                continue;
            };
            let name = original.name().to_owned();
            let active = original.is_active();
            let in_quadtree = original.in_quadtree;
            let components = original.components.clone();
            let children = original.children.clone();

            let id = self.fresh_uid();
            let copy_key = self.spawn(id, name)?;
            if let Some(copy) = self.objects.get_mut(copy_key) {
                copy.components = components.iter().map(|c| c.clone_for(copy_key)).collect();
                if !active {
                    copy.disable();
                }
            }
            if let Some(copy_parent) = copy_parent {
                self.attach_to(copy_key, copy_parent);
            }

            copy_root.get_or_insert(copy_key);
            if in_quadtree {
                indexed.push(copy_key);
            }
            stack.extend(children.iter().rev().map(|&child| (child, Some(copy_key))));
        }

        let copy_root = copy_root.ok_or(SceneError::EntityNotFound(key))?;
        self.propagate_transforms(copy_root);
        for copy in indexed {
            self.insert_into_quadtree(copy)?;
        }

        log::debug!("Duplicated {key:?} as {copy_root:?}");
        Ok(copy_root)
    }

    /// Destroy every game object and empty the quadtree
    pub fn clear_scene(&mut self) {
        self.objects.clear();
        self.ids.clear();
        self.root = None;
        self.quadtree.clear();
        log::info!("Scene cleared");
    }

    /// Clear the scene and create a root named after the configuration
    pub fn create_empty_scene(&mut self) -> Result<EntityKey, SceneError> {
        self.clear_scene();
        let name = self.config.root_name.clone();
        self.create_game_object(None, name)
    }

    // --- transforms ---

    /// Local transform of an object that has a Transform component
    pub fn local_transform(&self, key: EntityKey) -> Option<Transform> {
        self.objects.get(key)?.transform().map(|t| *t.local())
    }

    /// Local-to-world matrix, inherited from the nearest ancestor with a
    /// transform when the object has none
    pub fn world_matrix(&self, key: EntityKey) -> Option<Mat4> {
        self.objects.contains_key(key).then(|| self.world_matrix_of(key))
    }

    fn world_matrix_of(&self, key: EntityKey) -> Mat4 {
        let mut current = Some(key);
        while let Some(object) = current.and_then(|k| self.objects.get(k)) {
            if let Some(transform) = object.transform() {
                return *transform.global_matrix();
            }
            current = object.parent;
        }
        Mat4::identity()
    }

    /// Replace the local transform and propagate it through the subtree
    pub fn set_local_transform(&mut self, key: EntityKey, local: Transform) -> Result<(), SceneError> {
        self.modify_local_transform(key, |current| *current = local)
    }

    /// Move an object relative to its parent
    pub fn set_local_position(&mut self, key: EntityKey, position: Vec3) -> Result<(), SceneError> {
        self.modify_local_transform(key, |local| local.position = position)
    }

    /// Rotate an object relative to its parent
    pub fn set_local_rotation(&mut self, key: EntityKey, rotation: Quat) -> Result<(), SceneError> {
        self.modify_local_transform(key, |local| local.rotation = rotation)
    }

    /// Scale an object relative to its parent
    pub fn set_local_scale(&mut self, key: EntityKey, scale: Vec3) -> Result<(), SceneError> {
        self.modify_local_transform(key, |local| local.scale = scale)
    }

    fn modify_local_transform<F>(&mut self, key: EntityKey, edit: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut Transform),
    {
        let object = self.objects.get_mut(key).ok_or(SceneError::EntityNotFound(key))?;
        let entity = object.id();
        let transform = object
            .get_component_mut::<TransformComponent>()
            .ok_or(SceneError::MissingComponent { entity, component: ComponentType::Transform })?;

        let mut local = *transform.local();
        edit(&mut local);
        transform.set_local(local);

        self.propagate_transforms(key);
        Ok(())
    }

    /// Recompute global matrices of `start` and its subtree, notify their
    /// components and refresh their quadtree entries
    fn propagate_transforms(&mut self, start: EntityKey) {
        let parent_global = self
            .objects
            .get(start)
            .and_then(|object| object.parent)
            .map_or_else(Mat4::identity, |parent| self.world_matrix_of(parent));

        let mut stack = vec![(start, parent_global)];
        while let Some((key, parent_global)) = stack.pop() {
            let Some(object) = self.objects.get_mut(key) else {
                continue;
            };

            let global = object
                .get_component_mut::<TransformComponent>()
                .map_or(parent_global, |transform| *transform.recalculate_global(&parent_global));

            for component in &mut object.components {
                component.on_transform_update(&global);
            }

            if object.in_quadtree {
                if let Some(bound) = world_bound_2d(object, &global) {
                    if let Err(err) = self.quadtree.update(key, bound) {
                        log::warn!("Removing '{}' from the quadtree: {err}", object.name());
                        object.in_quadtree = false;
                    }
                }
            }

            stack.extend(object.children.iter().rev().map(|&child| (child, global)));
        }
    }

    /// Bring the world bounding box of an object up to date and return it.
    ///
    /// Recomputes only when the box is dirty, unless `force` is set.
    pub fn calculate_world_bounding_box(&mut self, key: EntityKey, force: bool) -> Option<AABB> {
        let world = self.world_matrix(key)?;
        let bbox = self.objects.get_mut(key)?.get_component_mut::<BoundingBoxComponent>()?;
        bbox.calculate_world_bounding_box(&world, force);
        Some(*bbox.world_aabb())
    }

    // --- spatial index ---

    /// Scene quadtree
    pub fn quadtree(&self) -> &Quadtree<EntityKey> {
        &self.quadtree
    }

    /// Index an object by its world bounding box projected onto XZ
    pub fn insert_into_quadtree(&mut self, key: EntityKey) -> Result<(), SceneError> {
        let world = self.world_matrix(key).ok_or(SceneError::EntityNotFound(key))?;
        let object = self.objects.get_mut(key).ok_or(SceneError::EntityNotFound(key))?;
        let entity = object.id();
        let bound = world_bound_2d(object, &world)
            .ok_or(SceneError::MissingComponent { entity, component: ComponentType::BoundingBox })?;

        let result = if object.in_quadtree {
            self.quadtree.update(key, bound)
        } else {
            self.quadtree.insert(key, bound)
        };
        object.in_quadtree = result.is_ok();
        result.map_err(SceneError::from)
    }

    /// Stop indexing an object. Returns false if it was not indexed.
    pub fn remove_from_quadtree(&mut self, key: EntityKey) -> bool {
        if let Some(object) = self.objects.get_mut(key) {
            object.in_quadtree = false;
        }
        self.quadtree.remove(&key)
    }

    /// Indexed objects whose bound intersects `region` (XZ plane)
    pub fn quadtree_query(&self, region: &AABB2D) -> Vec<EntityKey> {
        self.quadtree.query(region)
    }

    /// Rebuild the quadtree from every object under the root that has a
    /// bounding box, using the current settings
    pub fn rebuild_quadtree(&mut self) -> Result<(), SceneError> {
        self.rebuild_quadtree_with(self.config.quadtree)
    }

    /// Rebuild the quadtree under new settings.
    ///
    /// Objects whose bound falls outside the new root are left unindexed.
    pub fn rebuild_quadtree_with(&mut self, config: QuadtreeConfig) -> Result<(), SceneError> {
        let mut quadtree = Quadtree::new(config)?;
        for object in self.objects.values_mut() {
            object.in_quadtree = false;
        }

        for key in self.pre_order() {
            let world = self.world_matrix_of(key);
            let Some(object) = self.objects.get_mut(key) else {
                continue;
            };
            let Some(bound) = world_bound_2d(object, &world) else {
                continue;
            };
            match quadtree.insert(key, bound) {
                Ok(()) => object.in_quadtree = true,
                Err(err) => log::warn!("Leaving '{}' out of the quadtree: {err}", object.name()),
            }
        }

        log::info!(
            "Quadtree rebuilt with {} objects (max depth {}, {} per node)",
            quadtree.len(),
            config.max_depth,
            config.elements_per_node
        );
        self.quadtree = quadtree;
        self.config.quadtree = config;
        Ok(())
    }

    /// Remove every object from the quadtree
    pub fn clear_quadtree(&mut self) {
        self.quadtree.clear();
        for object in self.objects.values_mut() {
            object.in_quadtree = false;
        }
    }

    // --- per-frame ---

    /// Run one update pass over the tree.
    ///
    /// Visits active objects depth-first in pre-order, updating their active
    /// components in insertion order. Inactive objects skip their subtree.
    /// The visit order is fixed when the pass starts; objects removed during
    /// the pass are skipped.
    pub fn update(&mut self, delta_time: f32) {
        for key in self.collect_pre_order(true) {
            let Some(object) = self.objects.get_mut(key) else {
                continue;
            };

            let mut animated = false;
            for component in object.components.iter_mut().filter(|c| c.is_active()) {
                component.update(delta_time);
                animated |= component.component_type() == ComponentType::Animation;
            }

            if animated {
                self.apply_animation(key);
            }
        }
    }

    fn apply_animation(&mut self, key: EntityKey) {
        let Some(object) = self.objects.get(key) else {
            return;
        };

        let poses: Vec<JointPose> = object
            .components
            .iter()
            .filter(|component| component.is_active())
            .filter_map(Component::get::<AnimationComponent>)
            .flat_map(|animation| animation.sample_pose(self, key))
            .collect();

        for pose in poses {
            let result = self.modify_local_transform(pose.entity, |local| {
                local.position = pose.position;
                local.rotation = pose.rotation;
            });
            if let Err(err) = result {
                log::warn!("Skipping animated joint: {err}");
            }
        }
    }

    /// Fire `on_play` on every component
    pub fn notify_play(&mut self) {
        for object in self.objects.values_mut() {
            object.components.iter_mut().for_each(Component::on_play);
        }
    }

    /// Fire `on_stop` on every component
    pub fn notify_stop(&mut self) {
        for object in self.objects.values_mut() {
            object.components.iter_mut().for_each(Component::on_stop);
        }
    }

    // --- persistence ---

    /// Save every object reachable from the root, parents before children,
    /// plus the quadtree settings
    pub fn save(&self) -> Value {
        let objects: Vec<Value> = self
            .pre_order()
            .into_iter()
            .filter_map(|key| {
                let object = self.objects.get(key)?;
                let parent_id = object
                    .parent
                    .and_then(|parent| self.objects.get(parent))
                    .map_or(Uid::NONE, GameObject::id);
                Some(object.save(parent_id))
            })
            .collect();

        let config = self.quadtree.config();
        let mut quadtree = JsonObject::new();
        quadtree.insert(
            JSON_TAG_BOUNDS.into(),
            Value::from(vec![config.bounds.min.x, config.bounds.min.y, config.bounds.max.x, config.bounds.max.y]),
        );
        quadtree.insert(JSON_TAG_MAX_DEPTH.into(), config.max_depth.into());
        quadtree.insert(JSON_TAG_ELEMENTS_PER_NODE.into(), config.elements_per_node.into());

        let mut json = JsonObject::new();
        json.insert(JSON_TAG_QUADTREE.into(), Value::Object(quadtree));
        json.insert(JSON_TAG_GAME_OBJECTS.into(), Value::Array(objects));
        Value::Object(json)
    }

    /// Replace the scene with saved data.
    ///
    /// Objects keep their stored UIDs. Parents are linked once every object
    /// exists, then transforms are recomputed, components initialised and the
    /// quadtree rebuilt. On error the scene is left empty.
    pub fn load(&mut self, json: &Value, registry: &ComponentRegistry) -> Result<(), SceneError> {
        let result = self.load_objects(json, registry);
        if let Err(err) = &result {
            log::warn!("Scene load failed: {err}");
            self.clear_scene();
        }
        result
    }

    fn load_objects(&mut self, json: &Value, registry: &ComponentRegistry) -> Result<(), SceneError> {
        let quadtree_config = match json.get(JSON_TAG_QUADTREE) {
            Some(value) => read_quadtree_config(value)?,
            None => self.config.quadtree,
        };
        let entries = json
            .get(JSON_TAG_GAME_OBJECTS)
            .ok_or(PersistenceError::MissingField(JSON_TAG_GAME_OBJECTS))?
            .as_array()
            .ok_or(PersistenceError::InvalidField { field: JSON_TAG_GAME_OBJECTS, expected: "array" })?;

        self.clear_scene();

        let mut links = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = read_uid(entry, JSON_TAG_ID)?;
            if id.is_none() {
                return Err(PersistenceError::InvalidField { field: JSON_TAG_ID, expected: "non-zero UID" }.into());
            }
            let key = self.spawn(id, read_str(entry, JSON_TAG_NAME)?)?;
            let active = read_bool(entry, JSON_TAG_ACTIVE)?;
            let components = entry
                .get(JSON_TAG_COMPONENTS)
                .ok_or(PersistenceError::MissingField(JSON_TAG_COMPONENTS))?
                .as_array()
                .ok_or(PersistenceError::InvalidField { field: JSON_TAG_COMPONENTS, expected: "array" })?
                .iter()
                .map(|component| Component::load(key, component, registry))
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(object) = self.objects.get_mut(key) {
                object.components = components;
                if !active {
                    object.disable();
                }
            }
            links.push((key, read_uid(entry, JSON_TAG_PARENT_ID)?));
        }

        for &(key, parent_id) in &links {
            if parent_id.is_none() {
                if self.root.is_none() {
                    self.root = Some(key);
                }
                continue;
            }
            let parent = self.key_of(parent_id).ok_or(SceneError::UnknownParent(parent_id))?;
            if parent == key || self.is_descendant_of(parent, key) {
                return Err(InvariantViolation::Cycle.into());
            }
            self.attach_to(key, parent);
        }

        for &(key, parent_id) in &links {
            if parent_id.is_none() {
                self.propagate_transforms(key);
            }
        }
        for &(key, _) in &links {
            let world = self.world_matrix_of(key);
            if let Some(object) = self.objects.get_mut(key) {
                for component in &mut object.components {
                    component.init(&world);
                }
            }
        }

        self.rebuild_quadtree_with(quadtree_config)?;
        log::info!("Loaded scene with {} game objects", self.objects.len());
        Ok(())
    }
}

/// World AABB of an object's bounding box projected onto the XZ plane
fn world_bound_2d(object: &mut GameObject, world: &Mat4) -> Option<AABB2D> {
    let bbox = object.get_component_mut::<BoundingBoxComponent>()?;
    bbox.calculate_world_bounding_box(world, false);
    Some(bbox.world_aabb().project_xz())
}

fn read_quadtree_config(json: &Value) -> Result<QuadtreeConfig, PersistenceError> {
    let [min_x, min_y, max_x, max_y] = read_floats::<4>(json, JSON_TAG_BOUNDS)?;
    let max_depth = u32::try_from(read_u64(json, JSON_TAG_MAX_DEPTH)?)
        .map_err(|_| PersistenceError::InvalidField { field: JSON_TAG_MAX_DEPTH, expected: "32-bit depth" })?;
    let elements_per_node = usize::try_from(read_u64(json, JSON_TAG_ELEMENTS_PER_NODE)?).map_err(|_| {
        PersistenceError::InvalidField { field: JSON_TAG_ELEMENTS_PER_NODE, expected: "element count" }
    })?;

    Ok(QuadtreeConfig {
        bounds: AABB2D::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y)),
        max_depth,
        elements_per_node,
    })
}
