//! Game objects: nodes of the scene tree
//!
//! A game object owns its components and lists its children by arena key. The
//! parent link is a key as well, so structural edits never leave dangling
//! references; they are performed through [`Scene`](crate::scene::Scene),
//! which keeps both directions consistent.

use crate::components::{Component, ComponentType, ComponentVariant, TransformComponent};
use crate::foundation::uid::Uid;
use crate::persistence::JsonObject;
use serde_json::Value;

slotmap::new_key_type! {
    /// Stable handle of a game object inside its scene
    pub struct EntityKey;
}

pub(crate) const JSON_TAG_ID: &str = "Id";
pub(crate) const JSON_TAG_NAME: &str = "Name";
pub(crate) const JSON_TAG_ACTIVE: &str = "Active";
pub(crate) const JSON_TAG_PARENT_ID: &str = "ParentId";
pub(crate) const JSON_TAG_COMPONENTS: &str = "Components";

/// Entity in the scene tree
#[derive(Debug, Clone)]
pub struct GameObject {
    id: Uid,
    name: String,
    active: bool,
    pub(crate) components: Vec<Component>,
    pub(crate) children: Vec<EntityKey>,
    pub(crate) parent: Option<EntityKey>,
    pub(crate) in_quadtree: bool,
}

impl GameObject {
    pub(crate) fn new(id: Uid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            components: Vec::new(),
            children: Vec::new(),
            parent: None,
            in_quadtree: false,
        }
    }

    /// Unique identifier
    pub fn id(&self) -> Uid {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the object
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the object and its subtree take part in updates
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Include the object in updates
    pub fn enable(&mut self) {
        self.active = true;
    }

    /// Skip the object and its whole subtree during updates
    pub fn disable(&mut self) {
        self.active = false;
    }

    /// Parent, or `None` for the root and detached objects
    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    /// Children in update order
    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    /// Whether the object is tracked by the scene's quadtree
    pub fn is_in_quadtree(&self) -> bool {
        self.in_quadtree
    }

    /// Components in insertion (update) order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component at `index`
    pub fn component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Mutable component at `index`
    pub fn component_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    /// First component of type `T`
    pub fn get_component<T: ComponentVariant>(&self) -> Option<&T> {
        self.components.iter().find_map(Component::get::<T>)
    }

    /// First component of type `T`, mutably
    pub fn get_component_mut<T: ComponentVariant>(&mut self) -> Option<&mut T> {
        self.components.iter_mut().find_map(Component::get_mut::<T>)
    }

    /// All components carrying the given tag
    pub fn get_components(&self, component_type: ComponentType) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(move |component| component.component_type() == component_type)
    }

    /// Whether at least one component carries the tag
    pub fn has_component(&self, component_type: ComponentType) -> bool {
        self.get_components(component_type).next().is_some()
    }

    /// Detach and return the component at `index`
    pub(crate) fn remove_component(&mut self, index: usize) -> Option<Component> {
        (index < self.components.len()).then(|| self.components.remove(index))
    }

    /// Transform, if the object has one
    pub fn transform(&self) -> Option<&TransformComponent> {
        self.get_component::<TransformComponent>()
    }

    pub(crate) fn save(&self, parent_id: Uid) -> Value {
        let mut json = JsonObject::new();
        json.insert(JSON_TAG_ID.into(), self.id.raw().into());
        json.insert(JSON_TAG_NAME.into(), self.name.clone().into());
        json.insert(JSON_TAG_ACTIVE.into(), self.active.into());
        json.insert(JSON_TAG_PARENT_ID.into(), parent_id.raw().into());

        let components = self
            .components
            .iter()
            .map(|component| {
                let mut entry = JsonObject::new();
                component.save(&mut entry);
                Value::Object(entry)
            })
            .collect();
        json.insert(JSON_TAG_COMPONENTS.into(), Value::Array(components));

        Value::Object(json)
    }
}
