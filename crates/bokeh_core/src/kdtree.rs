//! Axis-aligned k-d tree over a mesh's faces.
//!
//! One tree is built per mesh, in object space; the instance transform
//! is applied at query time by inverse-transforming the ray. Interior
//! nodes keep the faces that straddle their split plane, so every face
//! lives at exactly one node.

use std::collections::HashSet;

use bokeh_math::{BBox, Mat4, Mat4Ext, Ray, Vec3, EPSILON};

use crate::mesh::{FaceId, Mesh};

/// A node becomes a leaf at or below this many faces.
const MAX_LEAF_FACES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SplitSide {
    Left,
    Right,
    Neither,
}

#[derive(Debug, Clone)]
pub struct KdTree {
    root: KdNode,
}

#[derive(Debug, Clone)]
struct KdNode {
    bbox: BBox,
    /// Leaf faces, or faces straddling the split plane.
    faces: Vec<FaceId>,
    split: Option<KdSplit>,
}

#[derive(Debug, Clone)]
struct KdSplit {
    axis: usize,
    plane: f32,
    children: Box<[KdNode; 2]>,
}

/// The three face lists, each sorted by centroid coordinate on one
/// axis. Kept in lockstep so the median split is O(1) and each level's
/// re-partition is O(n).
struct SortedFaces {
    by_axis: [Vec<FaceId>; 3],
}

impl SortedFaces {
    fn len(&self) -> usize {
        self.by_axis[0].len()
    }
}

impl KdTree {
    pub fn build(mesh: &Mesh) -> Self {
        let faces: Vec<FaceId> = mesh.face_ids().collect();

        if faces.is_empty() {
            return Self {
                root: KdNode {
                    bbox: BBox::new(Vec3::ZERO, Vec3::ZERO),
                    faces: Vec::new(),
                    split: None,
                },
            };
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &f in &faces {
            for v in mesh.face_verts(f) {
                min = min.min(v);
                max = max.max(v);
            }
        }

        let mut sorted = SortedFaces {
            by_axis: [faces.clone(), faces.clone(), faces],
        };
        for axis in 0..3 {
            sorted.by_axis[axis].sort_by(|&a, &b| {
                let ca = mesh.face_centroid(a)[axis];
                let cb = mesh.face_centroid(b)[axis];
                ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let bbox = BBox::new(min - Vec3::splat(EPSILON), max + Vec3::splat(EPSILON));

        Self {
            root: construct(mesh, sorted, bbox),
        }
    }

    /// Candidate faces for a world-space ray against an instance with
    /// the given model matrix. The ray is taken to object space and
    /// every node whose box it touches contributes its faces.
    pub fn collect_possible_faces(&self, ray: &Ray, modelmat: &Mat4) -> HashSet<FaceId> {
        let inv = modelmat.inverse();
        let obj_ray = Ray::new(
            inv.transform_point3(ray.origin()),
            inv.transform_vector3(ray.direction()),
        );

        let mut set = HashSet::new();
        self.root.add_intersecting(&obj_ray, &mut set);
        set
    }

    /// Bounding boxes of every leaf, for the debug overlay.
    pub fn leaf_bboxes(&self) -> Vec<BBox> {
        let mut out = Vec::new();
        self.root.collect_leaf_bboxes(&mut out);
        out
    }
}

impl KdNode {
    fn add_intersecting(&self, ray: &Ray, set: &mut HashSet<FaceId>) {
        if !self.bbox.ray_intersects(ray) {
            return;
        }

        set.extend(self.faces.iter().copied());

        if let Some(split) = &self.split {
            split.children[0].add_intersecting(ray, set);
            split.children[1].add_intersecting(ray, set);
        }
    }

    fn collect_leaf_bboxes(&self, out: &mut Vec<BBox>) {
        match &self.split {
            None => out.push(self.bbox),
            Some(split) => {
                split.children[0].collect_leaf_bboxes(out);
                split.children[1].collect_leaf_bboxes(out);
            }
        }
    }
}

fn face_split(mesh: &Mesh, f: FaceId, axis: usize, plane: f32) -> SplitSide {
    let mut right = 0;
    for v in mesh.face_verts(f) {
        if v[axis] >= plane {
            right += 1;
        }
    }

    match right {
        0 => SplitSide::Left,
        3 => SplitSide::Right,
        _ => SplitSide::Neither,
    }
}

fn construct(mesh: &Mesh, sorted: SortedFaces, bbox: BBox) -> KdNode {
    let n = sorted.len();
    if n <= MAX_LEAF_FACES {
        return KdNode {
            bbox,
            faces: sorted.by_axis[0].clone(),
            split: None,
        };
    }

    let centroid = |f: FaceId, axis: usize| mesh.face_centroid(f)[axis];

    let range = |axis: usize| {
        let list = &sorted.by_axis[axis];
        centroid(list[n - 1], axis) - centroid(list[0], axis)
    };

    let (rx, ry, rz) = (range(0), range(1), range(2));
    let axis = if rx >= ry && rx >= rz {
        0
    } else if ry >= rx && ry >= rz {
        1
    } else {
        2
    };

    let list = &sorted.by_axis[axis];
    let mid1 = centroid(list[n / 2 - 1], axis);
    let mid2 = centroid(list[n / 2], axis);
    let plane = 0.5 * (mid1 + mid2);

    let mut bbox1 = bbox;
    let mut bbox2 = bbox;
    bbox1.set_max_axis(axis, plane);
    bbox2.set_min_axis(axis, plane);

    if bbox1.volume() < EPSILON || bbox2.volume() < EPSILON {
        return KdNode {
            bbox,
            faces: sorted.by_axis[0].clone(),
            split: None,
        };
    }

    let mut straddlers = Vec::new();
    let mut left = SortedFaces {
        by_axis: [Vec::new(), Vec::new(), Vec::new()],
    };
    let mut right = SortedFaces {
        by_axis: [Vec::new(), Vec::new(), Vec::new()],
    };

    for list_axis in 0..3 {
        for &f in &sorted.by_axis[list_axis] {
            match face_split(mesh, f, axis, plane) {
                SplitSide::Left => left.by_axis[list_axis].push(f),
                SplitSide::Right => right.by_axis[list_axis].push(f),
                SplitSide::Neither => {
                    if list_axis == 0 {
                        straddlers.push(f);
                    }
                }
            }
        }
    }

    let children = Box::new([
        construct(mesh, left, bbox1),
        construct(mesh, right, bbox2),
    ]);

    KdNode {
        bbox,
        faces: straddlers,
        split: Some(KdSplit {
            axis,
            plane,
            children,
        }),
    }
}
