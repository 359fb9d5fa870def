//! Components attached to game objects
//!
//! The set of component kinds is closed: [`ComponentKind`] is a tagged enum and
//! every lifecycle hook dispatches on the tag. New kinds are created by tag
//! through a [`ComponentRegistry`], which is also how loading rebuilds them.
//!
//! Hooks shared by every kind:
//! - `init` once after attachment
//! - `update` once per tick while the component and its owner are active
//! - `save` / `load` through the structured-value sink
//! - `on_transform_update` when the owner's global transform changes
//! - `on_play` / `on_stop` when the game starts or stops

mod animation;
mod bounding_box;
mod light;
mod mesh;
mod transform;

pub use animation::{
    AnimationComponent, AnimationController, JointPose, CONTROL_GROUP_NAME, SKELETON_ROOT_NAME,
};
pub use bounding_box::BoundingBoxComponent;
pub use light::{LightComponent, LightType, ATTENUATION_CUTOFF};
pub use mesh::{MaterialComponent, MeshComponent, ShaderType};
pub use transform::TransformComponent;

#[cfg(test)]
pub(crate) use animation::test_support;

use crate::foundation::math::Mat4;
use crate::persistence::{read_bool, read_u64, JsonObject, PersistenceError};
use crate::scene::EntityKey;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

const JSON_TAG_TYPE: &str = "Type";
const JSON_TAG_ACTIVE: &str = "Active";

/// Static variant tag of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentType {
    /// Local/global placement
    Transform,
    /// Mesh resource reference
    Mesh,
    /// Surface description
    Material,
    /// Light source
    Light,
    /// Local and world bounding volumes
    BoundingBox,
    /// Skeletal animation driver
    Animation,
}

impl ComponentType {
    /// Every tag, in persistence order
    pub const ALL: [ComponentType; 6] = [
        Self::Transform,
        Self::Mesh,
        Self::Material,
        Self::Light,
        Self::BoundingBox,
        Self::Animation,
    ];

    /// Numeric tag written to saved scenes
    pub fn tag(self) -> u64 {
        match self {
            Self::Transform => 0,
            Self::Mesh => 1,
            Self::Material => 2,
            Self::Light => 3,
            Self::BoundingBox => 4,
            Self::Animation => 5,
        }
    }

    /// Inverse of [`tag`](Self::tag)
    pub fn from_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.tag() == tag)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Variant-specific component state
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// See [`TransformComponent`]
    Transform(TransformComponent),
    /// See [`MeshComponent`]
    Mesh(MeshComponent),
    /// See [`MaterialComponent`]
    Material(MaterialComponent),
    /// See [`LightComponent`]
    Light(LightComponent),
    /// See [`BoundingBoxComponent`]
    BoundingBox(BoundingBoxComponent),
    /// See [`AnimationComponent`]
    Animation(AnimationComponent),
}

impl ComponentKind {
    /// Tag of this variant
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Transform(_) => ComponentType::Transform,
            Self::Mesh(_) => ComponentType::Mesh,
            Self::Material(_) => ComponentType::Material,
            Self::Light(_) => ComponentType::Light,
            Self::BoundingBox(_) => ComponentType::BoundingBox,
            Self::Animation(_) => ComponentType::Animation,
        }
    }

    fn init(&mut self, world: &Mat4) {
        match self {
            Self::Light(light) => light.on_transform_update(world),
            Self::BoundingBox(bbox) => bbox.invalidate(),
            _ => {}
        }
    }

    fn update(&mut self, delta_time: f32) {
        if let Self::Animation(animation) = self {
            animation.update(delta_time);
        }
    }

    fn on_transform_update(&mut self, world: &Mat4) {
        match self {
            Self::Light(light) => light.on_transform_update(world),
            Self::BoundingBox(bbox) => bbox.invalidate(),
            _ => {}
        }
    }

    fn save(&self, json: &mut JsonObject) {
        match self {
            Self::Transform(transform) => transform.save(json),
            Self::Mesh(mesh) => mesh.save(json),
            Self::Material(material) => material.save(json),
            Self::Light(light) => light.save(json),
            Self::BoundingBox(bbox) => bbox.save(json),
            // Playback state belongs to the controller and is not persisted.
            Self::Animation(_) => {}
        }
    }

    fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        match self {
            Self::Transform(transform) => transform.load(json),
            Self::Mesh(mesh) => mesh.load(json),
            Self::Material(material) => material.load(json),
            Self::Light(light) => light.load(json),
            Self::BoundingBox(bbox) => bbox.load(json),
            Self::Animation(_) => Ok(()),
        }
    }
}

/// Typed access to one variant of [`ComponentKind`]
pub trait ComponentVariant: Sized {
    /// Tag of the variant
    const TYPE: ComponentType;

    /// Borrow the variant out of a kind
    fn from_kind(kind: &ComponentKind) -> Option<&Self>;

    /// Mutably borrow the variant out of a kind
    fn from_kind_mut(kind: &mut ComponentKind) -> Option<&mut Self>;

    /// Wrap into a kind
    fn into_kind(self) -> ComponentKind;
}

macro_rules! component_variant {
    ($ty:ty, $variant:ident) => {
        impl ComponentVariant for $ty {
            const TYPE: ComponentType = ComponentType::$variant;

            fn from_kind(kind: &ComponentKind) -> Option<&Self> {
                match kind {
                    ComponentKind::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_kind_mut(kind: &mut ComponentKind) -> Option<&mut Self> {
                match kind {
                    ComponentKind::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_kind(self) -> ComponentKind {
                ComponentKind::$variant(self)
            }
        }
    };
}

component_variant!(TransformComponent, Transform);
component_variant!(MeshComponent, Mesh);
component_variant!(MaterialComponent, Material);
component_variant!(LightComponent, Light);
component_variant!(BoundingBoxComponent, BoundingBox);
component_variant!(AnimationComponent, Animation);

/// A component attached to exactly one game object
#[derive(Debug, Clone)]
pub struct Component {
    owner: EntityKey,
    active: bool,
    kind: ComponentKind,
}

impl Component {
    pub(crate) fn new(owner: EntityKey, kind: ComponentKind) -> Self {
        Self {
            owner,
            active: true,
            kind,
        }
    }

    /// Copy of this component owned by another entity
    pub(crate) fn clone_for(&self, owner: EntityKey) -> Self {
        Self {
            owner,
            active: self.active,
            kind: self.kind.clone(),
        }
    }

    /// Owning entity, fixed at construction
    pub fn owner(&self) -> EntityKey {
        self.owner
    }

    /// Variant tag
    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }

    /// Whether the component takes part in updates
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turn the component on
    pub fn enable(&mut self) {
        self.active = true;
    }

    /// Turn the component off; the owner's own flag is unaffected
    pub fn disable(&mut self) {
        self.active = false;
    }

    /// Variant state
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Typed variant state
    pub fn get<T: ComponentVariant>(&self) -> Option<&T> {
        T::from_kind(&self.kind)
    }

    /// Typed mutable variant state. The variant itself is fixed at
    /// construction.
    pub fn get_mut<T: ComponentVariant>(&mut self) -> Option<&mut T> {
        T::from_kind_mut(&mut self.kind)
    }

    pub(crate) fn init(&mut self, world: &Mat4) {
        self.kind.init(world);
    }

    pub(crate) fn update(&mut self, delta_time: f32) {
        self.kind.update(delta_time);
    }

    pub(crate) fn on_transform_update(&mut self, world: &Mat4) {
        self.kind.on_transform_update(world);
    }

    pub(crate) fn on_play(&mut self) {
        if let ComponentKind::Animation(animation) = &mut self.kind {
            animation.on_play();
        }
    }

    pub(crate) fn on_stop(&mut self) {
        if let ComponentKind::Animation(animation) = &mut self.kind {
            animation.on_stop();
        }
    }

    /// Write tag, active flag and variant fields
    pub fn save(&self, json: &mut JsonObject) {
        json.insert(JSON_TAG_TYPE.into(), self.component_type().tag().into());
        json.insert(JSON_TAG_ACTIVE.into(), self.active.into());
        self.kind.save(json);
    }

    /// Rebuild a component from saved data using `registry` to create the variant
    pub fn load(owner: EntityKey, json: &Value, registry: &ComponentRegistry) -> Result<Self, PersistenceError> {
        let tag = read_u64(json, JSON_TAG_TYPE)?;
        let component_type = ComponentType::from_tag(tag).ok_or(PersistenceError::UnknownComponentType(tag))?;
        let active = read_bool(json, JSON_TAG_ACTIVE)?;

        let mut kind = registry.create(component_type)?;
        kind.load(json)?;

        Ok(Self { owner, active, kind })
    }
}

type ComponentFactory = Box<dyn Fn() -> ComponentKind + Send + Sync>;

/// Factories that create a fresh component of a given tag
pub struct ComponentRegistry {
    factories: HashMap<ComponentType, ComponentFactory>,
}

impl ComponentRegistry {
    /// Registry without any factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with factories for every kind that has a default state.
    ///
    /// Animation needs a controller and must be registered by the caller.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ComponentType::Transform, || ComponentKind::Transform(TransformComponent::default()));
        registry.register(ComponentType::Mesh, || ComponentKind::Mesh(MeshComponent::default()));
        registry.register(ComponentType::Material, || ComponentKind::Material(MaterialComponent::default()));
        registry.register(ComponentType::Light, || ComponentKind::Light(LightComponent::default()));
        registry.register(ComponentType::BoundingBox, || {
            ComponentKind::BoundingBox(BoundingBoxComponent::default())
        });
        registry
    }

    /// Install or replace the factory for a tag
    pub fn register<F>(&mut self, component_type: ComponentType, factory: F)
    where
        F: Fn() -> ComponentKind + Send + Sync + 'static,
    {
        self.factories.insert(component_type, Box::new(factory));
    }

    /// Install the animation factory from a controller factory
    pub fn register_animation<F>(&mut self, controller_factory: F)
    where
        F: Fn() -> Box<dyn AnimationController> + Send + Sync + 'static,
    {
        self.register(ComponentType::Animation, move || {
            ComponentKind::Animation(AnimationComponent::new(controller_factory()))
        });
    }

    /// Whether a factory exists for the tag
    pub fn is_registered(&self, component_type: ComponentType) -> bool {
        self.factories.contains_key(&component_type)
    }

    /// Create a fresh component state for the tag
    pub fn create(&self, component_type: ComponentType) -> Result<ComponentKind, PersistenceError> {
        self.factories
            .get(&component_type)
            .map(|factory| factory())
            .ok_or_else(|| PersistenceError::UnregisteredComponent(component_type.to_string()))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<_> = self.factories.keys().collect();
        registered.sort();
        f.debug_struct("ComponentRegistry").field("registered", &registered).finish()
    }
}
