// Transform utilities for Mat4
//
// Extends glam::Mat4 with the homogeneous-transform conventions used by
// the tracer: points carry implicit w=1 (glam's transform_point3),
// directions implicit w=0.

use crate::BBox;
use glam::{Mat4, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a direction vector (applies rotation and scale, but NOT
    /// translation). Directions have an implicit w=0 component.
    fn transform_vector3(&self, vector: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_bbox(&self, bbox: &BBox) -> BBox;
}

impl Mat4Ext for Mat4 {
    fn transform_vector3(&self, vector: Vec3) -> Vec3 {
        let v4 = Vec4::new(vector.x, vector.y, vector.z, 0.0);
        let transformed = *self * v4;
        Vec3::new(transformed.x, transformed.y, transformed.z)
    }

    fn transform_bbox(&self, bbox: &BBox) -> BBox {
        let corners = bbox.corners();

        let first = self.transform_point3(corners[0]);
        let mut min = first;
        let mut max = first;

        for corner in &corners[1..] {
            let t = self.transform_point3(*corner);
            min = min.min(t);
            max = max.max(t);
        }

        BBox::new(min, max)
    }
}
