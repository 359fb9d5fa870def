//! Bounding volumes used by the scene and the spatial index

use crate::foundation::math::{Mat4, Point3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box in 3D
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5))
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box enclosing every point
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = first.coords;
        let mut max = first.coords;
        for point in rest {
            min = min.inf(&point.coords);
            max = max.sup(&point.coords);
        }
        Some(Self { min, max })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// The eight corners, min corner first, in x-fastest order
    pub fn corner_points(&self) -> [Point3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Project onto the ground (XZ) plane used by the quadtree
    pub fn project_xz(&self) -> AABB2D {
        AABB2D::new(Vec2::new(self.min.x, self.min.z), Vec2::new(self.max.x, self.max.z))
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// World-space center
    pub center: Vec3,
    /// Unit local axes expressed in world space
    pub axes: [Vec3; 3],
    /// Half size along each axis
    pub half_extents: Vec3,
}

impl Default for OBB {
    fn default() -> Self {
        Self::from_aabb(&AABB::default())
    }
}

impl OBB {
    /// Axis-aligned OBB covering the same volume as `aabb`
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self {
            center: aabb.center(),
            axes: [Vec3::x(), Vec3::y(), Vec3::z()],
            half_extents: aabb.extents(),
        }
    }

    /// Transform a local-space AABB into a world-space OBB.
    ///
    /// Scale on each matrix column is folded into the half extents; a
    /// degenerate (zero) column keeps the canonical axis with zero extent.
    pub fn from_transformed_aabb(aabb: &AABB, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&Point3::from(aabb.center())).coords;
        let local = aabb.extents();
        let canonical = [Vec3::x(), Vec3::y(), Vec3::z()];
        let mut axes = canonical;
        let mut half_extents = Vec3::zeros();

        for i in 0..3 {
            let column = matrix.fixed_view::<3, 1>(0, i).into_owned();
            let length = column.magnitude();
            if length > f32::EPSILON {
                axes[i] = column / length;
                half_extents[i] = local[i] * length;
            } else {
                axes[i] = canonical[i];
            }
        }

        Self {
            center,
            axes,
            half_extents,
        }
    }

    /// The eight world-space corners, in the same order as [`AABB::corner_points`]
    pub fn corner_points(&self) -> [Point3; 8] {
        let ex = self.axes[0] * self.half_extents.x;
        let ey = self.axes[1] * self.half_extents.y;
        let ez = self.axes[2] * self.half_extents.z;
        let mut corners = [Point3::origin(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = Point3::from(self.center + ex * sx + ey * sy + ez * sz);
        }
        corners
    }

    /// Smallest world AABB enclosing this box
    pub fn minimal_enclosing_aabb(&self) -> AABB {
        let extent = Vec3::new(
            (self.axes[0].x * self.half_extents.x).abs()
                + (self.axes[1].x * self.half_extents.y).abs()
                + (self.axes[2].x * self.half_extents.z).abs(),
            (self.axes[0].y * self.half_extents.x).abs()
                + (self.axes[1].y * self.half_extents.y).abs()
                + (self.axes[2].y * self.half_extents.z).abs(),
            (self.axes[0].z * self.half_extents.x).abs()
                + (self.axes[1].z * self.half_extents.y).abs()
                + (self.axes[2].z * self.half_extents.z).abs(),
        );
        AABB::from_center_extents(self.center, extent)
    }
}

/// Axis-aligned rectangle used by the quadtree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB2D {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl AABB2D {
    /// Create a rectangle from its corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Degenerate rectangle covering a single point
    pub fn from_point(point: Vec2) -> Self {
        Self { min: point, max: point }
    }

    /// Corners are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
    }

    /// Center of the rectangle
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Closed-interval overlap test
    pub fn intersects(&self, other: &AABB2D) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    /// Whether `other` lies fully inside this rectangle
    pub fn contains(&self, other: &AABB2D) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y
    }
}

impl Default for AABB2D {
    fn default() -> Self {
        Self::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0))
    }
}
