//! Mesh and material registries.
//!
//! These are the process-scoped stores of the tracer: populated while a
//! scene loads (single-threaded), read-only for its lifetime, and
//! shared into render workers behind an `Arc`. Ids are stable vector
//! indices.

use std::collections::HashMap;

use crate::material::Material;
use crate::mesh::Mesh;

/// Handle to a mesh in a `MeshStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

/// Handle to a material in a `MaterialStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MtlId(usize);

impl MtlId {
    /// The built-in all-zero material every instance starts with.
    pub const NONE: MtlId = MtlId(0);
}

impl Default for MtlId {
    fn default() -> Self {
        MtlId::NONE
    }
}

#[derive(Debug, Default)]
pub struct MeshStore {
    meshes: Vec<Mesh>,
    names: HashMap<String, MeshId>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn id(&self, name: &str) -> Option<MeshId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[derive(Debug)]
pub struct MaterialStore {
    materials: Vec<Material>,
    names: HashMap<String, MtlId>,
}

impl Default for MaterialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialStore {
    /// Slot 0 is reserved for the "none" material so unassigned
    /// instances shade to black instead of dangling.
    pub fn new() -> Self {
        Self {
            materials: vec![Material::default()],
            names: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: &str, material: Material) -> MtlId {
        let id = MtlId(self.materials.len());
        self.materials.push(material);
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: MtlId) -> &Material {
        &self.materials[id.0]
    }

    pub fn id(&self, name: &str) -> Option<MtlId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }
}

/// The registries a loaded scene hangs on to.
#[derive(Debug, Default)]
pub struct Stores {
    pub meshes: MeshStore,
    pub materials: MaterialStore,
}

impl Stores {
    pub fn new() -> Self {
        Self::default()
    }
}
