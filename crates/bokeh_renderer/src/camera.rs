//! Scene cameras: orbit controls, preview projections, and primary-ray
//! casting.

use bokeh_math::{Mat4, Ray, Vec3};
use rand::RngCore;

use crate::lens::LensAssembly;

pub const DEFAULT_ROTATE_SPEED: f32 = 0.2;

/// State shared by every camera model.
#[derive(Debug, Clone)]
pub struct CameraBase {
    position: Vec3,
    point_of_interest: Vec3,
    up: Vec3,
    rotate_speed: f32,
    aspect: f32,
}

impl CameraBase {
    pub fn new(position: Vec3, point_of_interest: Vec3, up: Vec3) -> Self {
        Self {
            position,
            point_of_interest,
            up: up.normalize(),
            rotate_speed: DEFAULT_ROTATE_SPEED,
            aspect: 1.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn point_of_interest(&self) -> Vec3 {
        self.point_of_interest
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn rotate_speed(&self) -> f32 {
        self.rotate_speed
    }

    /// Unit vector in the direction of view.
    pub fn direction(&self) -> Vec3 {
        (self.point_of_interest - self.position).normalize()
    }

    /// Unit vector pointing right in the camera's screen space.
    pub fn horizontal(&self) -> Vec3 {
        self.direction().cross(self.up).normalize()
    }

    /// Unit vector pointing up in the camera's screen space.
    pub fn screen_up(&self) -> Vec3 {
        self.horizontal().cross(self.direction()).normalize()
    }

    /// Move along the view direction, proportionally to the distance
    /// from the point of interest.
    pub fn dolly(&mut self, dist: f32) {
        let d = (self.position - self.point_of_interest).length();
        self.position += 0.004 * d * dist * self.direction();
    }

    /// Move perpendicular to the view direction. Both the position and
    /// the point of interest translate.
    pub fn truck(&mut self, dx: f32, dy: f32) {
        let d = (self.position - self.point_of_interest).length();
        let translate = (d * 0.0007) * (self.horizontal() * dx + self.screen_up() * dy);
        self.position += translate;
        self.point_of_interest += translate;
    }

    /// Orbit around the point of interest. The vertical orbit is
    /// clamped so the view direction stays between 5 and 175 degrees
    /// from `up`.
    pub fn rotate(&mut self, rx: f32, ry: f32) {
        let rx = rx * self.rotate_speed;
        let mut ry = ry * self.rotate_speed;

        let angle = self
            .up
            .dot(self.direction())
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees();
        // Rotating the position by +ry about `horizontal` takes the
        // up-to-direction angle to angle - ry.
        ry = angle - (angle - ry).clamp(5.0, 175.0);

        let m = Mat4::from_translation(self.point_of_interest)
            * Mat4::from_axis_angle(self.up, rx.to_radians())
            * Mat4::from_axis_angle(self.horizontal(), ry.to_radians())
            * Mat4::from_translation(-self.point_of_interest);
        self.position = m.transform_point3(self.position);
    }
}

/// A camera in the scene: one shared orbit model, three projection and
/// ray-casting variants.
#[derive(Debug, Clone)]
pub enum Camera {
    Orthographic { base: CameraBase, size: f32 },
    Perspective { base: CameraBase, angle: f32 },
    Lens {
        base: CameraBase,
        angle: f32,
        assembly: LensAssembly,
    },
}

impl Camera {
    pub fn orthographic(position: Vec3, poi: Vec3, up: Vec3, size: f32) -> Self {
        Self::Orthographic {
            base: CameraBase::new(position, poi, up),
            size,
        }
    }

    pub fn perspective(position: Vec3, poi: Vec3, up: Vec3, angle: f32) -> Self {
        Self::Perspective {
            base: CameraBase::new(position, poi, up),
            angle,
        }
    }

    pub fn lens(position: Vec3, poi: Vec3, up: Vec3, angle: f32, assembly: LensAssembly) -> Self {
        Self::Lens {
            base: CameraBase::new(position, poi, up),
            angle,
            assembly,
        }
    }

    pub fn base(&self) -> &CameraBase {
        match self {
            Self::Orthographic { base, .. } => base,
            Self::Perspective { base, .. } => base,
            Self::Lens { base, .. } => base,
        }
    }

    pub fn base_mut(&mut self) -> &mut CameraBase {
        match self {
            Self::Orthographic { base, .. } => base,
            Self::Perspective { base, .. } => base,
            Self::Lens { base, .. } => base,
        }
    }

    pub fn set_position(&mut self, pos: Vec3) {
        self.base_mut().position = pos;
    }

    pub fn set_point_of_interest(&mut self, poi: Vec3) {
        self.base_mut().point_of_interest = poi;
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.base_mut().up = up.normalize();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.base_mut().aspect = aspect;
    }

    pub fn set_rotate_speed(&mut self, rs: f32) {
        self.base_mut().rotate_speed = rs;
    }

    pub fn dolly(&mut self, dist: f32) {
        self.base_mut().dolly(dist);
    }

    pub fn truck(&mut self, dx: f32, dy: f32) {
        self.base_mut().truck(dx, dy);
    }

    pub fn rotate(&mut self, rx: f32, ry: f32) {
        self.base_mut().rotate(rx, ry);
    }

    /// Zoom in or out: orthographic cameras scale their box, the
    /// perspective models scale the field of view.
    pub fn zoom(&mut self, factor: f32) {
        match self {
            Self::Orthographic { size, .. } => {
                *size *= 1.003f32.powf(factor);
            }
            Self::Perspective { angle, .. } | Self::Lens { angle, .. } => {
                *angle = (*angle * 1.002f32.powf(factor)).clamp(5.0, 175.0);
            }
        }
    }

    /// The preview's view and projection matrices. The view matrix
    /// takes world space to camera space; the projection camera space
    /// to normalized device coordinates.
    pub fn view_projection(&self) -> (Mat4, Mat4) {
        let base = self.base();
        let view = Mat4::look_at_rh(
            base.position,
            base.point_of_interest,
            base.screen_up(),
        );

        let projection = match self {
            Self::Orthographic { base, size } => {
                let (w, h) = ortho_half_extents(*size, base.aspect);
                Mat4::orthographic_rh_gl(-w, w, -h, h, 0.1, 100.0)
            }
            Self::Perspective { base, angle } | Self::Lens { base, angle, .. } => {
                Mat4::perspective_rh_gl(angle.to_radians(), base.aspect, 0.1, 1000.0)
            }
        };

        (view, projection)
    }

    /// Cast a primary ray through normalized screen coordinates,
    /// x and y in [0, 1] with (0, 0) at the bottom-left.
    pub fn cast_ray(&self, x: f64, y: f64, rng: &mut dyn RngCore) -> Ray {
        let (x, y) = (x as f32, y as f32);
        match self {
            Self::Orthographic { base, size } => {
                let (w, h) = ortho_half_extents(*size, base.aspect);
                let origin = base.position
                    + (2.0 * x - 1.0) * w * base.horizontal()
                    + (2.0 * y - 1.0) * h * base.screen_up();
                Ray::new(origin, base.direction())
            }
            Self::Perspective { base, angle } => {
                let height = 2.0 * (angle.to_radians() / 2.0).tan();
                let width = base.aspect * height;
                let target = base.position
                    + base.direction()
                    + (x - 0.5) * width * base.horizontal()
                    + (y - 0.5) * height * base.screen_up();
                Ray::new(base.position, target - base.position)
            }
            Self::Lens {
                base,
                angle,
                assembly,
            } => {
                // Film extents from the paraxial focal length; film
                // coordinates are negated because the lens inverts the
                // image.
                let half_h = (angle.to_radians() / 2.0).tan() * assembly.focal_length().abs();
                let half_w = base.aspect * half_h;
                let fx = (0.5 - x) * 2.0 * half_w;
                let fy = (0.5 - y) * 2.0 * half_h;

                let lray = assembly.generate_ray(fx, fy, rng);

                let o = lray.origin();
                let d = lray.direction();
                let origin =
                    base.position + o.x * base.horizontal() + o.y * base.screen_up();
                let direction = d.x * base.horizontal() + d.y * base.screen_up()
                    - d.z * base.direction();

                Ray::new(origin, direction)
            }
        }
    }
}

// The larger image-plane dimension spans `size`; the other follows the
// canvas aspect.
fn ortho_half_extents(size: f32, aspect: f32) -> (f32, f32) {
    if aspect < 1.0 {
        let h = size / 2.0;
        (h * aspect, h)
    } else {
        let w = size / 2.0;
        (w, w / aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn looking_down_z() -> CameraBase {
        CameraBase::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn test_basis_vectors() {
        let base = looking_down_z();
        assert!((base.direction() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert!((base.horizontal() - Vec3::X).length() < 1e-5);
        assert!((base.screen_up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_dolly_moves_toward_poi() {
        let mut base = looking_down_z();
        base.dolly(100.0);
        assert!(base.position().z < 5.0);
        assert!(base.position().z > 0.0);
    }

    #[test]
    fn test_truck_moves_position_and_poi() {
        let mut base = looking_down_z();
        base.truck(100.0, 0.0);

        let offset = base.position() - Vec3::new(0.0, 0.0, 5.0);
        assert!(offset.length() > 0.0);
        assert!((base.point_of_interest() - offset).length() < 1e-5);
    }

    #[test]
    fn test_rotate_clamps_at_pole() {
        let mut base = looking_down_z();

        // Crank far past vertical; the view direction must stay at
        // least 5 degrees from up.
        for _ in 0..100 {
            base.rotate(0.0, 50.0);
        }

        let angle = base.up().dot(base.direction()).acos().to_degrees();
        assert!(angle >= 4.9, "angle {angle} collapsed onto the pole");

        for _ in 0..200 {
            base.rotate(0.0, -50.0);
        }
        let angle = base.up().dot(base.direction()).acos().to_degrees();
        assert!(angle <= 175.1, "angle {angle} collapsed onto the pole");
    }

    #[test]
    fn test_rotate_preserves_poi_distance() {
        let mut base = looking_down_z();
        base.rotate(37.0, 11.0);
        let d = (base.position() - base.point_of_interest()).length();
        assert!((d - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_ortho_center_ray() {
        let mut cam = Camera::orthographic(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 4.0);
        cam.set_aspect(1.0);

        let mut rng = StdRng::seed_from_u64(0);
        let ray = cam.cast_ray(0.5, 0.5, &mut rng);

        assert!((ray.origin() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
        assert!((ray.direction() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_ortho_rays_are_parallel() {
        let mut cam = Camera::orthographic(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 4.0);
        cam.set_aspect(1.0);

        let mut rng = StdRng::seed_from_u64(0);
        let a = cam.cast_ray(0.1, 0.9, &mut rng);
        let b = cam.cast_ray(0.8, 0.2, &mut rng);

        assert!((a.direction() - b.direction()).length() < 1e-6);
        assert!((a.origin() - b.origin()).length() > 1.0);
    }

    #[test]
    fn test_perspective_corner_rays_diverge() {
        let mut cam = Camera::perspective(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y, 90.0);
        cam.set_aspect(1.0);

        let mut rng = StdRng::seed_from_u64(0);
        let center = cam.cast_ray(0.5, 0.5, &mut rng);
        let corner = cam.cast_ray(1.0, 1.0, &mut rng);

        assert!((center.direction() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert!(center.direction().dot(corner.direction()) < 0.99);
        // 90 degree fov: the corner target sits one unit up and right.
        let expected = Vec3::new(1.0, 1.0, -1.0).normalize();
        assert!((corner.direction() - expected).length() < 1e-5);
    }

    #[test]
    fn test_zoom_clamps_fov() {
        let mut cam = Camera::perspective(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y, 45.0);
        cam.zoom(10_000.0);
        match cam {
            Camera::Perspective { angle, .. } => assert_eq!(angle, 175.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unit_ray_directions() {
        let mut cam = Camera::perspective(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y, 60.0);
        cam.set_aspect(2.0);

        let mut rng = StdRng::seed_from_u64(5);
        for i in 0..10 {
            for j in 0..10 {
                let ray = cam.cast_ray(i as f64 / 9.0, j as f64 / 9.0, &mut rng);
                let len = ray.direction().length();
                assert!((0.99999..=1.00001).contains(&len));
            }
        }
    }
}
