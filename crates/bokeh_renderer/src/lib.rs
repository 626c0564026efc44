//! Bokeh renderer - progressive CPU ray tracing.
//!
//! Casts primary rays through one of three camera models (including a
//! thick-lens assembly for depth of field), shades direct illumination
//! from area lights with mirror-reflection recursion, and drives the
//! output image either coarse-to-fine on one thread or full-resolution
//! across a worker pool.

mod camera;
mod image;
mod lens;
mod primitive;
mod progressive;
mod rayhit;
mod raytree;
mod sampler;
mod scene;

pub use camera::{Camera, CameraBase, DEFAULT_ROTATE_SPEED};
pub use image::{Image, PixelColor};
pub use lens::{Cardinal, LensAssembly, LensSurface};
pub use primitive::Primitive;
pub use progressive::{default_divs, render_threaded, ProgressiveRender};
pub use rayhit::RayHit;
pub use raytree::{NodeId, RayTree};
pub use sampler::{CmjSampler2D, DistrFn};
pub use scene::{RayKind, Scene};

/// Re-export the math and core types the API surfaces.
pub use bokeh_core::{Material, MeshInstance, MtlId, Stores};
pub use bokeh_math::{Mat4, Ray, Vec3, EPSILON};

use rand::RngCore;

/// Generate a random f32 in [0, 1) from an RngCore.
///
/// Object-safe counterpart of `Rng::gen::<f32>()` so sampling code can
/// take `&mut dyn RngCore`.
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    let bits = rng.next_u32();
    (bits >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}
