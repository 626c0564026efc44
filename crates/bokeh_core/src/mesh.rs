//! Half-edge triangle mesh.
//!
//! The cyclic half-edge graph is arena-allocated: vertices, edges, and
//! faces live in flat vectors and reference each other by index, so
//! `next`, `opposite`, `vert`, and `face` are all O(1) table lookups and
//! no fix-up is needed when a `Mesh` moves.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::hash::{Hash, Hasher};

use bokeh_math::Vec3;
use rand::RngCore;
use thiserror::Error;

use crate::kdtree::KdTree;

/// Index of an edge within its mesh's edge arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) u32);

/// Index of a face within its mesh's face arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceId(pub(crate) u32);

/// Errors raised while building a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("vertex index {0} out of range")]
    VertexOutOfRange(usize),

    #[error("duplicate directed edge {0} -> {1}")]
    DuplicateEdge(usize, usize),
}

/// One directed half of an edge, belonging to a single face.
#[derive(Debug, Clone)]
struct Edge {
    /// Destination vertex index.
    vert: u32,
    /// Origin (root) vertex index.
    root: u32,
    /// CCW successor around the face.
    next: EdgeId,
    /// The other half, absent on boundaries.
    opposite: Option<EdgeId>,
    face: FaceId,
    /// Smoothing normal at the destination vertex.
    normal: Option<Vec3>,
}

#[derive(Debug, Clone)]
struct Face {
    edge: EdgeId,
}

/// Key for the directed-edge lookup map.
///
/// Two pairs are equal iff both vertex indices match; the hash
/// interleaves the two indices and finishes with a PJW-style fold of
/// the high bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertPair {
    root: u32,
    vert: u32,
}

impl Hash for VertPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(interleave_mix(self.root, self.vert));
    }
}

fn interleave_mix(a: u32, b: u32) -> u64 {
    let mut h: u64 = 0;
    for i in 0..32 {
        h |= (((a >> i) & 1) as u64) << (2 * i);
        h |= (((b >> i) & 1) as u64) << (2 * i + 1);
    }

    let high = h & 0xf800_0000_0000_0000;
    if high != 0 {
        h ^= high >> 48;
        h &= !high;
    }

    h
}

/// A triangle mesh with half-edge adjacency and an optional k-d tree
/// over its faces.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    verts: Vec<Vec3>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    edge_map: HashMap<VertPair, EdgeId>,
    kdtree: Option<KdTree>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex; its index is its identity within this mesh.
    pub fn add_vert(&mut self, position: Vec3) -> usize {
        self.verts.push(position);
        self.verts.len() - 1
    }

    pub fn vert(&self, i: usize) -> Vec3 {
        self.verts[i]
    }

    pub fn verts_len(&self) -> usize {
        self.verts.len()
    }

    pub fn edges_len(&self) -> usize {
        self.edges.len()
    }

    pub fn faces_len(&self) -> usize {
        self.faces.len()
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> {
        (0..self.faces.len() as u32).map(FaceId)
    }

    /// Add a triangle from three vertex indices in CCW order.
    pub fn add_tri(&mut self, v1: usize, v2: usize, v3: usize) -> Result<FaceId, MeshError> {
        for v in [v1, v2, v3] {
            if v >= self.verts.len() {
                return Err(MeshError::VertexOutOfRange(v));
            }
        }

        let face = FaceId(self.faces.len() as u32);
        let ea = self.add_edge(v1, v2, face)?;
        let eb = self.add_edge(v2, v3, face)?;
        let ec = self.add_edge(v3, v1, face)?;

        self.edges[ea.0 as usize].next = eb;
        self.edges[eb.0 as usize].next = ec;
        self.edges[ec.0 as usize].next = ea;

        self.faces.push(Face { edge: ea });

        Ok(face)
    }

    /// Add a quadrilateral as two triangles sharing the (v1,v3) diagonal.
    pub fn add_quad(
        &mut self,
        v1: usize,
        v2: usize,
        v3: usize,
        v4: usize,
    ) -> Result<(FaceId, FaceId), MeshError> {
        let f1 = self.add_tri(v1, v2, v3)?;
        let f2 = self.add_tri(v1, v3, v4)?;
        Ok((f1, f2))
    }

    /// Create the half-edge root -> vert. Errors if that directed edge
    /// already exists; links opposite pointers with a pre-existing
    /// (vert -> root) half.
    fn add_edge(&mut self, root: usize, vert: usize, face: FaceId) -> Result<EdgeId, MeshError> {
        let key = VertPair {
            root: root as u32,
            vert: vert as u32,
        };
        if self.edge_map.contains_key(&key) {
            return Err(MeshError::DuplicateEdge(root, vert));
        }

        let id = EdgeId(self.edges.len() as u32);
        let opposite = self.edge_map.get(&VertPair {
            root: vert as u32,
            vert: root as u32,
        });
        let opposite = opposite.copied();

        self.edges.push(Edge {
            vert: vert as u32,
            root: root as u32,
            next: id,
            opposite,
            face,
            normal: None,
        });

        if let Some(opp) = opposite {
            self.edges[opp.0 as usize].opposite = Some(id);
        }

        self.edge_map.insert(key, id);

        Ok(id)
    }

    pub fn edge_vert(&self, e: EdgeId) -> usize {
        self.edges[e.0 as usize].vert as usize
    }

    pub fn edge_root(&self, e: EdgeId) -> usize {
        self.edges[e.0 as usize].root as usize
    }

    pub fn edge_next(&self, e: EdgeId) -> EdgeId {
        self.edges[e.0 as usize].next
    }

    pub fn edge_opposite(&self, e: EdgeId) -> Option<EdgeId> {
        self.edges[e.0 as usize].opposite
    }

    pub fn edge_face(&self, e: EdgeId) -> FaceId {
        self.edges[e.0 as usize].face
    }

    pub fn edge(&self, root: usize, vert: usize) -> Option<EdgeId> {
        self.edge_map
            .get(&VertPair {
                root: root as u32,
                vert: vert as u32,
            })
            .copied()
    }

    /// Rotate clockwise around this edge's destination vertex.
    pub fn next_cw(&self, e: EdgeId) -> Option<EdgeId> {
        self.edge_opposite(self.edge_next(e))
    }

    /// Rotate counter-clockwise around this edge's destination vertex.
    pub fn next_ccw(&self, e: EdgeId) -> Option<EdgeId> {
        let opp = self.edge_opposite(e)?;
        Some(self.edge_next(self.edge_next(opp)))
    }

    /// The three edges of a face, starting from the face's anchor edge.
    pub fn face_edges(&self, f: FaceId) -> [EdgeId; 3] {
        let e0 = self.faces[f.0 as usize].edge;
        let e1 = self.edge_next(e0);
        let e2 = self.edge_next(e1);
        [e0, e1, e2]
    }

    /// The three vertex indices of a face in CCW order.
    pub fn face_vert_indices(&self, f: FaceId) -> [usize; 3] {
        let [e0, e1, e2] = self.face_edges(f);
        [self.edge_root(e0), self.edge_root(e1), self.edge_root(e2)]
    }

    /// The three vertex positions of a face in CCW order.
    pub fn face_verts(&self, f: FaceId) -> [Vec3; 3] {
        let [a, b, c] = self.face_vert_indices(f);
        [self.verts[a], self.verts[b], self.verts[c]]
    }

    pub fn face_normal(&self, f: FaceId) -> Vec3 {
        let [a, b, c] = self.face_verts(f);
        (b - a).cross(c - a).normalize()
    }

    pub fn face_centroid(&self, f: FaceId) -> Vec3 {
        let [a, b, c] = self.face_verts(f);
        (a + b + c) / 3.0
    }

    pub fn face_area(&self, f: FaceId) -> f32 {
        let [a, b, c] = self.face_verts(f);
        0.5 * (b - a).cross(c - a).length()
    }

    /// The smoothing normals at the face's three corners, ordered to
    /// match `face_verts`.
    pub fn face_vert_normals(&self, f: FaceId) -> [Vec3; 3] {
        let flat = self.face_normal(f);
        let mut out = [flat; 3];

        let corners = self.face_vert_indices(f);
        for e in self.face_edges(f) {
            if let Some(n) = self.edges[e.0 as usize].normal {
                let dest = self.edge_vert(e);
                for (i, &corner) in corners.iter().enumerate() {
                    if corner == dest {
                        out[i] = n;
                    }
                }
            }
        }

        out
    }

    /// The point at barycentric coordinates (alpha, beta, gamma).
    pub fn face_point_at(&self, f: FaceId, alpha: f32, beta: f32, gamma: f32) -> Vec3 {
        let [a, b, c] = self.face_verts(f);
        alpha * a + beta * b + gamma * c
    }

    /// A face chosen uniformly over the face list.
    pub fn random_face(&self, rng: &mut dyn RngCore) -> Option<FaceId> {
        if self.faces.is_empty() {
            return None;
        }
        let idx = (gen_f32(rng) * self.faces.len() as f32) as usize;
        Some(FaceId(idx.min(self.faces.len() - 1) as u32))
    }

    /// A uniformly distributed random point on the face.
    pub fn face_random_point(&self, f: FaceId, rng: &mut dyn RngCore) -> Vec3 {
        let r1 = gen_f32(rng);
        let sqrt_r2 = gen_f32(rng).sqrt();

        let alpha = 1.0 - sqrt_r2;
        let beta = sqrt_r2 * (1.0 - r1);
        let gamma = r1 * sqrt_r2;

        self.face_point_at(f, alpha, beta, gamma)
    }

    /// Record a supplied smoothing normal at the corner of `f` whose
    /// vertex index is `vert`.
    pub fn set_corner_normal(&mut self, f: FaceId, vert: usize, normal: Vec3) {
        for e in self.face_edges(f) {
            if self.edge_vert(e) == vert {
                self.edges[e.0 as usize].normal = Some(normal);
            }
        }
    }

    /// Fill in smoothing normals for every edge left without one.
    ///
    /// For each such edge the faces around its destination vertex are
    /// visited by walking CW until a boundary or the starting edge,
    /// then CCW from the start, and their face normals averaged.
    pub fn compute_vert_norms(&mut self) {
        for id in 0..self.edges.len() {
            if self.edges[id].normal.is_some() {
                continue;
            }

            let e = EdgeId(id as u32);
            let mut sum = self.face_normal(self.edge_face(e));
            let mut full_cycle = false;

            let mut cur = e;
            while let Some(next) = self.next_cw(cur) {
                if next == e {
                    full_cycle = true;
                    break;
                }
                sum += self.face_normal(self.edge_face(next));
                cur = next;
            }

            if !full_cycle {
                let mut cur = e;
                while let Some(next) = self.next_ccw(cur) {
                    if next == e {
                        break;
                    }
                    sum += self.face_normal(self.edge_face(next));
                    cur = next;
                }
            }

            self.edges[id].normal = Some(sum.normalize());
        }
    }

    /// Build (or rebuild) the k-d tree over this mesh's faces.
    pub fn build_kdtree(&mut self) {
        let tree = KdTree::build(self);
        log::debug!(
            "built k-d tree over {} faces ({} verts)",
            self.faces.len(),
            self.verts.len()
        );
        self.kdtree = Some(tree);
    }

    pub fn kdtree(&self) -> Option<&KdTree> {
        self.kdtree.as_ref()
    }
}

/// Generate a random f32 in [0, 1) from an RngCore.
///
/// Object-safe counterpart of `Rng::gen::<f32>()` so sampling code can
/// take `&mut dyn RngCore`.
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    let bits = rng.next_u32();
    (bits >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Barycentric coordinates of `point` with respect to triangle (a,b,c).
///
/// Each coordinate is a signed sub-triangle area over the full area, so
/// the three corners map to (1,0,0), (0,1,0), (0,0,1), points on an
/// edge produce a zero component, and points outside the triangle a
/// negative one.
pub fn barycentric_coords(point: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let n = (b - a).cross(c - a);
    let two_area = n.length();
    let n = n / two_area;

    let abr = (b - a).cross(point - a);
    let bcr = (c - b).cross(point - b);
    let car = (a - c).cross(point - c);

    let sgn = |v: Vec3| if n.dot(v) < 0.0 { -1.0 } else { 1.0 };

    let alpha = sgn(bcr) * bcr.length() / two_area;
    let beta = sgn(car) * car.length() / two_area;
    let gamma = sgn(abr) * abr.length() / two_area;

    (alpha, beta, gamma)
}

/// Tessellate a unit sphere at the origin: triangle fans at the poles
/// and quad bands between `latdivs` latitude rings of `londivs`
/// segments.
pub fn sphere_mesh(latdivs: usize, londivs: usize) -> Result<Mesh, MeshError> {
    let mut m = Mesh::new();

    m.add_vert(Vec3::new(0.0, 0.0, 1.0));

    for i in 1..latdivs {
        for j in 0..londivs {
            let theta = j as f32 * 2.0 * PI / londivs as f32;
            let phi = i as f32 * PI / latdivs as f32;
            m.add_vert(Vec3::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ));
        }
    }

    m.add_vert(Vec3::new(0.0, 0.0, -1.0));

    // Top fan
    for i in 0..londivs {
        m.add_tri(0, i + 1, (i + 1) % londivs + 1)?;
    }

    // Bottom fan
    for i in 0..londivs {
        let last = m.verts_len() - 1;
        m.add_tri(
            last,
            last - londivs + (i + 1) % londivs,
            last - londivs + i,
        )?;
    }

    // Bands
    for i in 0..latdivs.saturating_sub(2) {
        for j in 0..londivs {
            let a = 1 + i * londivs + j;
            let b = 1 + (i + 1) * londivs + j;
            let c = 1 + (i + 1) * londivs + (j + 1) % londivs;
            let d = 1 + i * londivs + (j + 1) % londivs;
            m.add_quad(a, b, c, d)?;
        }
    }

    m.compute_vert_norms();
    m.build_kdtree();

    Ok(m)
}
