//! Scene-side core for the bokeh ray tracer: the half-edge triangle
//! mesh, the per-mesh k-d tree, materials, the mesh/material registries,
//! and the `.obj`/`.mtl` loaders that populate them.

mod instance;
mod kdtree;
pub mod loader;
mod material;
mod mesh;
mod registry;

pub use instance::MeshInstance;
pub use kdtree::KdTree;
pub use material::{illum_from_code, IllumModes, Material};
pub use mesh::{barycentric_coords, sphere_mesh, EdgeId, FaceId, Mesh, MeshError};
pub use registry::{MaterialStore, MeshId, MeshStore, MtlId, Stores};
