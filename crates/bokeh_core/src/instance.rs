//! A placed copy of a shared mesh.

use bokeh_math::{Mat4, Vec3};

use crate::registry::{MeshId, MtlId};

/// A mesh instance: a non-owning reference to a registered mesh plus an
/// affine transform and a material id.
///
/// The model matrix is always composed as translate * rotate * scale,
/// applied to column vectors.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    mesh: MeshId,
    mtl: MtlId,
    translate: Vec3,
    rotate: Mat4,
    scale: Vec3,
}

impl MeshInstance {
    pub fn new(mesh: MeshId) -> Self {
        Self {
            mesh,
            mtl: MtlId::NONE,
            translate: Vec3::ZERO,
            rotate: Mat4::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn mesh_id(&self) -> MeshId {
        self.mesh
    }

    pub fn mtl_id(&self) -> MtlId {
        self.mtl
    }

    pub fn set_mtl(&mut self, mtl: MtlId) {
        self.mtl = mtl;
    }

    pub fn modelmat(&self) -> Mat4 {
        Mat4::from_translation(self.translate) * self.rotate * Mat4::from_scale(self.scale)
    }

    pub fn set_translate(&mut self, v: Vec3) {
        self.translate = v;
    }

    /// Compose onto the existing translation.
    pub fn translate(&mut self, v: Vec3) {
        self.translate += v;
    }

    pub fn set_rotate(&mut self, angle: f32, axis: Vec3) {
        self.rotate = Mat4::from_axis_angle(axis.normalize(), angle);
    }

    /// Compose onto the existing rotation.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        self.rotate = Mat4::from_axis_angle(axis.normalize(), angle) * self.rotate;
    }

    pub fn set_scale(&mut self, v: Vec3) {
        self.scale = v;
    }

    /// Compose onto the existing scale.
    pub fn scale(&mut self, v: Vec3) {
        self.scale *= v;
    }
}
