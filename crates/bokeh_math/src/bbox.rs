use crate::{Ray, Vec3, EPSILON};

const X_AXIS: usize = 0;
const Y_AXIS: usize = 1;
const Z_AXIS: usize = 2;

/// Axis-aligned bounding box used by the per-mesh k-d tree.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    min: Vec3,
    max: Vec3,
}

impl BBox {
    /// Create a new box from min/max corners. `min` must not exceed
    /// `max` on any axis.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.x <= max.x);
        debug_assert!(min.y <= max.y);
        debug_assert!(min.z <= max.z);
        Self { min, max }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn set_min_axis(&mut self, axis: usize, v: f32) {
        self.min[axis] = v;
    }

    pub fn set_max_axis(&mut self, axis: usize, v: f32) {
        self.max[axis] = v;
    }

    pub fn range(&self, axis: usize) -> f32 {
        self.max[axis] - self.min[axis]
    }

    pub fn volume(&self) -> f32 {
        self.range(X_AXIS) * self.range(Y_AXIS) * self.range(Z_AXIS)
    }

    /// Test whether the ray touches any face of the box.
    ///
    /// Each of the six face planes is intersected; the box is hit iff
    /// some intersection point falls inside the 2D slab of the other
    /// two axes. Rays nearly parallel to an axis skip that axis's
    /// planes.
    pub fn ray_intersects(&self, ray: &Ray) -> bool {
        for axis in [X_AXIS, Y_AXIS, Z_AXIS] {
            for plane in [self.min[axis], self.max[axis]] {
                if let Some(point) = ray_plane_intersect(ray, axis, plane) {
                    if self.point_within_face(point, axis) {
                        return true;
                    }
                }
            }
        }

        false
    }

    fn point_within_face(&self, point: Vec3, axis: usize) -> bool {
        let (a, b) = other_axes(axis);
        self.min[a] <= point[a]
            && point[a] <= self.max[a]
            && self.min[b] <= point[b]
            && point[b] <= self.max[b]
    }

    /// Corner points of the box, for overlay line drawing.
    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mx.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mx.z),
        ]
    }
}

fn other_axes(axis: usize) -> (usize, usize) {
    match axis {
        X_AXIS => (Y_AXIS, Z_AXIS),
        Y_AXIS => (X_AXIS, Z_AXIS),
        _ => (X_AXIS, Y_AXIS),
    }
}

fn ray_plane_intersect(ray: &Ray, axis: usize, plane: f32) -> Option<Vec3> {
    let dir_dim = ray.direction()[axis];
    if dir_dim.abs() < EPSILON {
        return None;
    }

    let t = (plane - ray.origin()[axis]) / dir_dim;
    if t < 0.0 {
        return None;
    }

    Some(ray.point_at(t))
}
