//! Light component
//!
//! Stores the authoring parameters of a light plus its world position and
//! direction, refreshed whenever the owner's transform changes.

use crate::foundation::math::{Mat4, Vec3};
use crate::persistence::{read_f32, read_u64, read_vec3, write_vec3, JsonObject, PersistenceError};
use serde_json::Value;

const JSON_TAG_TYPE: &str = "LightType";
const JSON_TAG_COLOR: &str = "Color";
const JSON_TAG_INTENSITY: &str = "Intensity";
const JSON_TAG_KC: &str = "Kc";
const JSON_TAG_KL: &str = "Kl";
const JSON_TAG_KQ: &str = "Kq";
const JSON_TAG_INNER_ANGLE: &str = "InnerAngle";
const JSON_TAG_OUTER_ANGLE: &str = "OuterAngle";

/// Attenuation denominator at which a light's contribution is considered gone
pub const ATTENUATION_CUTOFF: f32 = 10.0;

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    #[default]
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

impl LightType {
    fn tag(self) -> u64 {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
            Self::Spot => 2,
        }
    }

    fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Directional),
            1 => Some(Self::Point),
            2 => Some(Self::Spot),
            _ => None,
        }
    }
}

/// Light attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    /// The type of light (directional, point, or spot)
    pub light_type: LightType,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Constant attenuation term
    pub kc: f32,
    /// Linear attenuation term
    pub kl: f32,
    /// Quadratic attenuation term
    pub kq: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_angle: f32,
    /// Outer cone angle for spot lights in radians
    pub outer_angle: f32,
    /// Whether the editor draws this light's gizmo
    pub draw_gizmos: bool,

    position: Vec3,
    direction: Vec3,
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            kc: 1.0,
            kl: 0.04,
            kq: 0.001,
            inner_angle: 15.0_f32.to_radians(),
            outer_angle: 20.0_f32.to_radians(),
            draw_gizmos: true,
            position: Vec3::zeros(),
            direction: Vec3::z(),
        }
    }
}

impl LightComponent {
    /// Light of the given type with default parameters
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            ..Default::default()
        }
    }

    /// World-space position as of the last transform update
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World-space direction (owner's +Z) as of the last transform update
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub(crate) fn on_transform_update(&mut self, world: &Mat4) {
        self.position = Vec3::new(world.m14, world.m24, world.m34);
        let forward = world.transform_vector(&Vec3::z());
        if let Some(direction) = forward.try_normalize(f32::EPSILON) {
            self.direction = direction;
        }
    }

    /// Distance at which the attenuation `kc + kl·r + kq·r²` reaches
    /// [`ATTENUATION_CUTOFF`].
    ///
    /// Used for gizmos and culling only. `None` for directional lights and
    /// for lights that never fall off.
    pub fn effective_radius(&self) -> Option<f32> {
        if self.light_type == LightType::Directional {
            return None;
        }
        if self.kc >= ATTENUATION_CUTOFF {
            return Some(0.0);
        }

        let c = self.kc - ATTENUATION_CUTOFF;
        if self.kq.abs() <= f32::EPSILON {
            return (self.kl > f32::EPSILON).then(|| -c / self.kl);
        }

        let delta = self.kl * self.kl - 4.0 * self.kq * c;
        if delta < 0.0 {
            return None;
        }
        let sqrt_delta = delta.sqrt();
        let r1 = (-self.kl + sqrt_delta) / (2.0 * self.kq);
        let r2 = (-self.kl - sqrt_delta) / (2.0 * self.kq);
        let radius = r1.max(r2);
        (radius >= 0.0).then_some(radius)
    }

    /// Base radius of a spot light's visualisation cone
    pub fn cone_radius(&self) -> Option<f32> {
        if self.light_type != LightType::Spot {
            return None;
        }
        self.effective_radius().map(|r| r * self.outer_angle.tan())
    }

    pub(crate) fn save(&self, json: &mut JsonObject) {
        json.insert(JSON_TAG_TYPE.into(), self.light_type.tag().into());
        write_vec3(json, JSON_TAG_COLOR, &self.color);
        json.insert(JSON_TAG_INTENSITY.into(), self.intensity.into());
        json.insert(JSON_TAG_KC.into(), self.kc.into());
        json.insert(JSON_TAG_KL.into(), self.kl.into());
        json.insert(JSON_TAG_KQ.into(), self.kq.into());
        json.insert(JSON_TAG_INNER_ANGLE.into(), self.inner_angle.into());
        json.insert(JSON_TAG_OUTER_ANGLE.into(), self.outer_angle.into());
    }

    pub(crate) fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        self.light_type = LightType::from_tag(read_u64(json, JSON_TAG_TYPE)?)
            .ok_or(PersistenceError::InvalidField { field: JSON_TAG_TYPE, expected: "light type 0, 1 or 2" })?;
        self.color = read_vec3(json, JSON_TAG_COLOR)?;
        self.intensity = read_f32(json, JSON_TAG_INTENSITY)?;
        // Older scenes carry no constant term.
        self.kc = match read_f32(json, JSON_TAG_KC) {
            Err(PersistenceError::MissingField(_)) => 1.0,
            kc => kc?,
        };
        self.kl = read_f32(json, JSON_TAG_KL)?;
        self.kq = read_f32(json, JSON_TAG_KQ)?;
        self.inner_angle = read_f32(json, JSON_TAG_INNER_ANGLE)?;
        self.outer_angle = read_f32(json, JSON_TAG_OUTER_ANGLE)?;
        Ok(())
    }
}
