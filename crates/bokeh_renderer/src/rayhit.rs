//! A ray paired with its best intersection so far.
//!
//! Every `intersect_*` operation min-reduces the hit parameter: the
//! record only changes when a strictly nearer non-negative t is found,
//! so the operations can be applied over a collection in any order.
//! Arithmetic degeneracy (NaN, infinite, or negative t) reads as "no
//! intersection" and never aborts.

use bokeh_core::{barycentric_coords, FaceId, Mesh, MeshInstance, MeshStore, MtlId};
use bokeh_math::{Mat4, Mat4Ext, Ray, Vec3};

#[derive(Debug, Clone)]
pub struct RayHit {
    ray: Ray,
    t: f32,
    norm: Vec3,
    modelmat: Mat4,
    primitive: Option<usize>,
    mtl: MtlId,
    face: Option<FaceId>,
}

impl RayHit {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            t: f32::NAN,
            norm: Vec3::ZERO,
            modelmat: Mat4::IDENTITY,
            primitive: None,
            mtl: MtlId::NONE,
            face: None,
        }
    }

    pub fn from_to(origin: Vec3, direction: Vec3) -> Self {
        Self::new(Ray::new(origin, direction))
    }

    pub fn intersected(&self) -> bool {
        !self.t.is_nan()
    }

    pub fn intersection_point(&self) -> Vec3 {
        self.ray.point_at(self.t)
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    pub fn norm(&self) -> Vec3 {
        self.norm
    }

    pub fn modelmat(&self) -> Mat4 {
        self.modelmat
    }

    pub fn primitive_index(&self) -> Option<usize> {
        self.primitive
    }

    pub fn mtl_id(&self) -> MtlId {
        self.mtl
    }

    pub fn face(&self) -> Option<FaceId> {
        self.face
    }

    pub(crate) fn set_primitive(&mut self, index: usize, mtl: MtlId) {
        self.primitive = Some(index);
        self.mtl = mtl;
    }

    fn improves(&self, t: f32) -> bool {
        if t.is_nan() || t.is_infinite() || t < 0.0 {
            return false;
        }
        !self.intersected() || t < self.t
    }

    /// Intersect with the plane through `s` with normal `n`.
    pub fn intersect_plane(&mut self, n: Vec3, s: Vec3) -> bool {
        let t = (n.dot(s) - n.dot(self.ray.origin())) / n.dot(self.ray.direction());
        if !self.improves(t) {
            return false;
        }

        self.t = t;
        self.norm = n;
        self.face = None;

        true
    }

    /// Intersect with a sphere, accepting the smallest non-negative
    /// root that improves the record.
    pub fn intersect_sphere(&mut self, center: Vec3, radius: f32) -> bool {
        let o = self.ray.origin() - center;
        let d = self.ray.direction();

        let a = d.dot(d);
        let b = 2.0 * o.dot(d);
        let c = o.dot(o) - radius * radius;

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return false;
        }

        let sq = disc.sqrt();
        let t0 = (-b - sq) / (2.0 * a);
        let t1 = (-b + sq) / (2.0 * a);
        let t = if t0 >= 0.0 {
            t0
        } else if t1 >= 0.0 {
            t1
        } else {
            return false;
        };

        if !self.improves(t) {
            return false;
        }

        self.t = t;
        self.norm = (self.ray.point_at(t) - center).normalize();
        self.face = None;

        true
    }

    /// Intersect with one mesh face under a model matrix. On success the
    /// smoothing normal is interpolated barycentrically and carried to
    /// world space.
    pub fn intersect_face(&mut self, mesh: &Mesh, face: FaceId, modelmat: &Mat4) -> bool {
        let [a, b, c] = mesh
            .face_verts(face)
            .map(|v| modelmat.transform_point3(v));
        let n = modelmat.transform_vector3(mesh.face_normal(face));

        let t = (n.dot(a) - n.dot(self.ray.origin())) / n.dot(self.ray.direction());
        if !self.improves(t) {
            return false;
        }

        let r = self.ray.point_at(t);
        let (alpha, beta, gamma) = barycentric_coords(r, a, b, c);
        if alpha < 0.0 || beta < 0.0 || gamma < 0.0 {
            return false;
        }

        let [na, nb, nc] = mesh.face_vert_normals(face);
        let smooth = alpha * na + beta * nb + gamma * nc;

        self.t = t;
        self.norm = modelmat.transform_vector3(smooth).normalize();
        self.modelmat = *modelmat;
        self.face = Some(face);

        true
    }

    /// Intersect with a mesh instance: the instance's k-d tree culls
    /// candidate faces and only those are tested.
    pub fn intersect_instance(
        &mut self,
        index: usize,
        instance: &MeshInstance,
        meshes: &MeshStore,
    ) -> bool {
        let mesh = meshes.get(instance.mesh_id());
        let modelmat = instance.modelmat();

        let mut intersected = false;
        match mesh.kdtree() {
            Some(tree) => {
                for face in tree.collect_possible_faces(&self.ray, &modelmat) {
                    intersected |= self.intersect_face(mesh, face, &modelmat);
                }
            }
            None => {
                for face in mesh.face_ids() {
                    intersected |= self.intersect_face(mesh, face, &modelmat);
                }
            }
        }

        if intersected {
            self.set_primitive(index, instance.mtl_id());
        }

        intersected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_hit_and_miss() {
        // Toward the plane
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(hit.intersect_plane(Vec3::Z, Vec3::ZERO));
        assert_eq!(hit.t(), 5.0);
        assert_eq!(hit.norm(), Vec3::Z);

        // Away from the plane: t would be negative
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!hit.intersect_plane(Vec3::Z, Vec3::ZERO));
        assert!(!hit.intersected());
    }

    #[test]
    fn test_plane_parallel_is_degenerate() {
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::X);
        assert!(!hit.intersect_plane(Vec3::Z, Vec3::ZERO));
    }

    #[test]
    fn test_sphere_from_outside() {
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(hit.intersect_sphere(Vec3::ZERO, 1.0));
        assert!((hit.t() - 4.0).abs() < 1e-5);
        assert!((hit.intersection_point() - Vec3::Z).length() < 1e-5);
        assert!((hit.norm() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_from_inside_uses_far_root() {
        let mut hit = RayHit::from_to(Vec3::ZERO, Vec3::Z);
        assert!(hit.intersect_sphere(Vec3::ZERO, 1.0));
        assert!((hit.t() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_min_reduction_is_order_independent() {
        let spheres = [
            (Vec3::new(0.0, 0.0, -3.0), 1.0),
            (Vec3::new(0.0, 0.0, -8.0), 1.0),
            (Vec3::new(0.0, 0.0, -5.0), 0.5),
        ];

        let mut forward = RayHit::from_to(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        for (c, r) in spheres {
            forward.intersect_sphere(c, r);
        }

        let mut reverse = RayHit::from_to(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        for (c, r) in spheres.iter().rev() {
            reverse.intersect_sphere(c.to_owned(), *r);
        }

        assert_eq!(forward.t(), reverse.t());
        assert!((forward.t() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_face_hit_interpolates_normal() {
        let mut mesh = Mesh::new();
        mesh.add_vert(Vec3::new(-1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(0.0, 1.0, 0.0));
        let face = mesh.add_tri(0, 1, 2).unwrap();
        mesh.compute_vert_norms();

        let modelmat = Mat4::IDENTITY;
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(hit.intersect_face(&mesh, face, &modelmat));
        assert!((hit.t() - 5.0).abs() < 1e-5);
        assert!((hit.norm() - Vec3::Z).length() < 1e-5);
        assert_eq!(hit.face(), Some(face));
    }

    #[test]
    fn test_face_miss_outside_triangle() {
        let mut mesh = Mesh::new();
        mesh.add_vert(Vec3::new(-1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(0.0, 1.0, 0.0));
        let face = mesh.add_tri(0, 1, 2).unwrap();
        mesh.compute_vert_norms();

        let mut hit = RayHit::from_to(Vec3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!hit.intersect_face(&mesh, face, &Mat4::IDENTITY));
        assert!(!hit.intersected());
    }

    #[test]
    fn test_face_respects_model_matrix() {
        let mut mesh = Mesh::new();
        mesh.add_vert(Vec3::new(-1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(1.0, -1.0, 0.0));
        mesh.add_vert(Vec3::new(0.0, 1.0, 0.0));
        let face = mesh.add_tri(0, 1, 2).unwrap();
        mesh.compute_vert_norms();

        let modelmat = Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0));
        let mut hit = RayHit::from_to(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(hit.intersect_face(&mesh, face, &modelmat));
        assert!((hit.t() - 7.0).abs() < 1e-5);
    }
}
