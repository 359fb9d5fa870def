//! Transform component
//!
//! Holds the local TRS relative to the parent and the cached global matrix.
//! The scene owns propagation: local edits go through
//! [`Scene::set_local_transform`](crate::scene::Scene::set_local_transform),
//! which refreshes the global matrices of the whole subtree.

use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use crate::persistence::{read_quat, read_vec3, write_quat, write_vec3, JsonObject, PersistenceError};
use serde_json::Value;

const JSON_TAG_POSITION: &str = "Position";
const JSON_TAG_ROTATION: &str = "Rotation";
const JSON_TAG_SCALE: &str = "Scale";

/// Local and global placement of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    local: Transform,
    global: Mat4,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            local: Transform::identity(),
            global: Mat4::identity(),
        }
    }
}

impl TransformComponent {
    /// Component with the given local transform
    pub fn new(local: Transform) -> Self {
        Self {
            local,
            global: local.to_matrix(),
        }
    }

    /// Component placed at a local position
    pub fn from_position(position: Vec3) -> Self {
        Self::new(Transform::from_position(position))
    }

    /// Local transform relative to the parent
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.local.position
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Cached local-to-world matrix
    pub fn global_matrix(&self) -> &Mat4 {
        &self.global
    }

    /// World-space position taken from the global matrix
    pub fn global_position(&self) -> Vec3 {
        Vec3::new(self.global.m14, self.global.m24, self.global.m34)
    }

    /// Global matrix decomposed into world position, rotation and scale
    pub fn global_transform(&self) -> Transform {
        Transform::from_matrix(&self.global)
    }

    pub(crate) fn set_local(&mut self, local: Transform) {
        self.local = local;
    }

    /// Recompute the global matrix from the parent's
    pub(crate) fn recalculate_global(&mut self, parent_global: &Mat4) -> &Mat4 {
        self.global = parent_global * self.local.to_matrix();
        &self.global
    }

    pub(crate) fn save(&self, json: &mut JsonObject) {
        write_vec3(json, JSON_TAG_POSITION, &self.local.position);
        write_quat(json, JSON_TAG_ROTATION, &self.local.rotation);
        write_vec3(json, JSON_TAG_SCALE, &self.local.scale);
    }

    pub(crate) fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        self.local = Transform {
            position: read_vec3(json, JSON_TAG_POSITION)?,
            rotation: read_quat(json, JSON_TAG_ROTATION)?,
            scale: read_vec3(json, JSON_TAG_SCALE)?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_global_composes_parent_first() {
        let parent = Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let mut child = TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0));

        child.recalculate_global(&parent.to_matrix());

        // +X rotated a quarter turn about +Y points to -Z, then doubled.
        assert_relative_eq!(child.global_position(), Vec3::new(10.0, 0.0, -2.0), epsilon = 1e-5);
        assert_relative_eq!(child.position(), Vec3::new(1.0, 0.0, 0.0));

        let world = child.global_transform();
        assert_relative_eq!(world.scale, Vec3::new(2.0, 2.0, 2.0), epsilon = 1e-5);
        assert!(world.rotation.angle_to(&parent.rotation) < 1e-3);
    }

    #[test]
    fn test_save_then_load_restores_local() {
        let original = TransformComponent::new(Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_euler_angles(0.1, 0.2, 0.3),
            scale: Vec3::new(1.0, 4.0, 1.0),
        });
        let mut json = JsonObject::new();
        original.save(&mut json);

        let mut loaded = TransformComponent::default();
        loaded.load(&Value::Object(json)).unwrap();

        assert_relative_eq!(loaded.position(), original.position());
        assert_relative_eq!(loaded.scale(), original.scale());
        assert!(loaded.rotation().angle_to(&original.rotation()) < 1e-4);
    }
}
