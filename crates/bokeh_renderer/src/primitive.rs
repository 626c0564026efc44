//! Scene primitives: mesh instances and analytic spheres.

use bokeh_core::{sphere_mesh, MeshError, MeshInstance, MeshStore, Stores};
use bokeh_math::Vec3;

use crate::rayhit::RayHit;

/// Registry name of the shared tessellated sphere mesh.
const SPHERE_MESH_NAME: &str = "__primitive_sphere";

/// Something a ray can hit. A sphere keeps a tessellated mesh instance
/// for the preview and k-d overlay but intersects analytically.
#[derive(Debug, Clone)]
pub enum Primitive {
    Sphere {
        center: Vec3,
        radius: f32,
        instance: MeshInstance,
    },
    Mesh(MeshInstance),
}

impl Primitive {
    /// Build an analytic sphere, registering the shared sphere mesh on
    /// first use.
    pub fn sphere(center: Vec3, radius: f32, stores: &mut Stores) -> Result<Self, MeshError> {
        let mesh_id = match stores.meshes.id(SPHERE_MESH_NAME) {
            Some(id) => id,
            None => stores.meshes.add(SPHERE_MESH_NAME, sphere_mesh(8, 16)?),
        };

        let mut instance = MeshInstance::new(mesh_id);
        instance.set_scale(Vec3::splat(radius));
        instance.set_translate(center);

        Ok(Self::Sphere {
            center,
            radius,
            instance,
        })
    }

    pub fn mesh(instance: MeshInstance) -> Self {
        Self::Mesh(instance)
    }

    pub fn instance(&self) -> &MeshInstance {
        match self {
            Self::Sphere { instance, .. } => instance,
            Self::Mesh(instance) => instance,
        }
    }

    pub fn instance_mut(&mut self) -> &mut MeshInstance {
        match self {
            Self::Sphere { instance, .. } => instance,
            Self::Mesh(instance) => instance,
        }
    }

    /// Intersect `hit` with this primitive, recording `index` as the
    /// hit primitive on success.
    pub fn intersect(&self, hit: &mut RayHit, index: usize, meshes: &MeshStore) -> bool {
        match self {
            Self::Sphere {
                center,
                radius,
                instance,
            } => {
                if hit.intersect_sphere(*center, *radius) {
                    hit.set_primitive(index, instance.mtl_id());
                    true
                } else {
                    false
                }
            }
            Self::Mesh(instance) => hit.intersect_instance(index, instance, meshes),
        }
    }
}
