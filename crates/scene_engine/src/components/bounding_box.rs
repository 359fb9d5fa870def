//! Bounding box component
//!
//! Keeps the authoring-time local AABB and lazily derived world-space boxes.
//! Transform changes only invalidate; the world boxes are recomputed on the
//! next [`calculate_world_bounding_box`](BoundingBoxComponent::calculate_world_bounding_box).

use crate::foundation::math::{Mat4, Vec3};
use crate::persistence::{read_floats, JsonObject, PersistenceError};
use crate::scene::{AABB, OBB};
use serde_json::Value;

const JSON_TAG_LOCAL_BOUNDING_BOX: &str = "LocalBoundingBox";

/// Local AABB plus cached world OBB/AABB
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxComponent {
    local_aabb: AABB,
    world_obb: OBB,
    world_aabb: AABB,
    dirty: bool,
}

impl Default for BoundingBoxComponent {
    fn default() -> Self {
        Self::new(AABB::default())
    }
}

impl BoundingBoxComponent {
    /// Component with a local box; world data is computed on first access
    pub fn new(local_aabb: AABB) -> Self {
        Self {
            local_aabb,
            world_obb: OBB::from_aabb(&local_aabb),
            world_aabb: local_aabb,
            dirty: true,
        }
    }

    /// Authoring-time box in the owner's local space
    pub fn local_bounding_box(&self) -> &AABB {
        &self.local_aabb
    }

    /// Replace the local box and invalidate world data
    pub fn set_local_bounding_box(&mut self, aabb: AABB) {
        self.local_aabb = aabb;
        self.dirty = true;
    }

    /// Mark world data stale
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Whether world data is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute the world boxes through `world` when dirty or forced
    pub fn calculate_world_bounding_box(&mut self, world: &Mat4, force: bool) {
        if self.dirty || force {
            self.world_obb = OBB::from_transformed_aabb(&self.local_aabb, world);
            self.world_aabb = self.world_obb.minimal_enclosing_aabb();
            self.dirty = false;
        }
    }

    /// World OBB as of the last calculation
    pub fn world_obb(&self) -> &OBB {
        &self.world_obb
    }

    /// World AABB as of the last calculation
    pub fn world_aabb(&self) -> &AABB {
        &self.world_aabb
    }

    pub(crate) fn save(&self, json: &mut JsonObject) {
        let (min, max) = (self.local_aabb.min, self.local_aabb.max);
        json.insert(
            JSON_TAG_LOCAL_BOUNDING_BOX.into(),
            Value::from(vec![min.x, min.y, min.z, max.x, max.y, max.z]),
        );
    }

    pub(crate) fn load(&mut self, json: &Value) -> Result<(), PersistenceError> {
        let [a, b, c, d, e, f] = read_floats::<6>(json, JSON_TAG_LOCAL_BOUNDING_BOX)?;
        self.local_aabb = AABB::new(Vec3::new(a, b, c), Vec3::new(d, e, f));
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform};
    use approx::assert_relative_eq;

    fn unit_box() -> BoundingBoxComponent {
        BoundingBoxComponent::new(AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)))
    }

    #[test]
    fn test_world_box_follows_transform() {
        let mut bbox = unit_box();
        let world = Transform::from_position(Vec3::new(10.0, 0.0, -5.0)).to_matrix();

        bbox.calculate_world_bounding_box(&world, false);

        assert!(!bbox.is_dirty());
        assert_relative_eq!(bbox.world_aabb().min, Vec3::new(9.0, -1.0, -6.0), epsilon = 1e-5);
        assert_relative_eq!(bbox.world_aabb().max, Vec3::new(11.0, 1.0, -4.0), epsilon = 1e-5);
    }

    #[test]
    fn test_clean_box_ignores_new_matrix_until_invalidated() {
        let mut bbox = unit_box();
        bbox.calculate_world_bounding_box(&Mat4::identity(), false);
        let first = *bbox.world_aabb();

        let moved = Transform::from_position(Vec3::new(50.0, 0.0, 0.0)).to_matrix();
        bbox.calculate_world_bounding_box(&moved, false);
        assert_eq!(*bbox.world_aabb(), first);

        bbox.invalidate();
        bbox.calculate_world_bounding_box(&moved, false);
        assert_relative_eq!(bbox.world_aabb().center(), Vec3::new(50.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let mut bbox = unit_box();
        let world = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_euler_angles(0.4, 1.2, -0.3),
            scale: Vec3::new(1.0, 3.0, 0.5),
        }
        .to_matrix();

        bbox.calculate_world_bounding_box(&world, true);
        let (obb, aabb) = (*bbox.world_obb(), *bbox.world_aabb());
        for _ in 0..3 {
            bbox.calculate_world_bounding_box(&world, true);
            assert_eq!(*bbox.world_obb(), obb);
            assert_eq!(*bbox.world_aabb(), aabb);
        }
    }

    #[test]
    fn test_load_marks_dirty() {
        let mut bbox = unit_box();
        bbox.calculate_world_bounding_box(&Mat4::identity(), false);

        let mut json = JsonObject::new();
        BoundingBoxComponent::new(AABB::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0))).save(&mut json);
        bbox.load(&Value::Object(json)).unwrap();

        assert!(bbox.is_dirty());
        assert_eq!(bbox.local_bounding_box().max, Vec3::new(2.0, 2.0, 2.0));
    }
}
