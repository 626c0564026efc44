use crate::Vec3;

/// A ray in 3D space with an origin and a unit-length direction.
///
/// The direction is normalized on construction, so `point_at(t)` walks
/// the ray in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a new ray. `direction` need not be unit length; it is
    /// normalized here.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the unit direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_creation_normalizes() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 3.0, 0.0));

        assert_eq!(ray.origin(), Vec3::new(1.0, 2.0, 3.0));
        assert!((ray.direction().length() - 1.0).abs() < 1e-5);
        assert_eq!(ray.direction(), Vec3::Y);
    }

    #[test]
    fn test_ray_point_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));

        assert_eq!(ray.point_at(0.0), Vec3::ZERO);
        assert_eq!(ray.point_at(1.0), Vec3::X);
        assert_eq!(ray.point_at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.point_at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_copy() {
        let ray1 = Ray::new(Vec3::ZERO, Vec3::Y);
        let ray2 = ray1;

        assert_eq!(ray1.origin(), ray2.origin());
        assert_eq!(ray1.point_at(1.0), ray2.point_at(1.0));
    }
}
