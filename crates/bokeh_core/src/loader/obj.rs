//! Wavefront OBJ mesh loader: triangles and quads only.

use std::path::Path;

use bokeh_math::Vec3;

use super::{read_file, significant_lines, LineCtx, LoadResult};
use crate::mesh::{FaceId, Mesh};

/// One `f`-directive corner: vertex index plus optional normal index.
struct Corner {
    vert: usize,
    normal: Option<usize>,
}

/// Load an OBJ file into a finished mesh: supplied normals attached,
/// missing ones computed, k-d tree built.
pub fn load_obj(path: &Path) -> LoadResult<Mesh> {
    let content = read_file(path)?;

    let mut mesh = Mesh::new();
    let mut normals: Vec<Vec3> = Vec::new();

    for (ctx, tokens) in significant_lines(path, &content) {
        match tokens[0] {
            "v" => {
                ctx.arity("v", &tokens[1..], 3)?;
                mesh.add_vert(ctx.vec3(&tokens[1..])?);
            }
            "vn" => {
                ctx.arity("vn", &tokens[1..], 3)?;
                normals.push(ctx.vec3(&tokens[1..])?.normalize());
            }
            "vt" => {
                // Accepted, ignored: no texturing.
            }
            "f" => {
                add_face(&mut mesh, &normals, &ctx, &tokens[1..])?;
            }
            other => {
                return Err(ctx.err(format!("unrecognized directive '{other}' in OBJ")));
            }
        }
    }

    mesh.compute_vert_norms();
    mesh.build_kdtree();

    log::info!(
        "{}: {} verts, {} faces",
        path.display(),
        mesh.verts_len(),
        mesh.faces_len()
    );

    Ok(mesh)
}

fn add_face(mesh: &mut Mesh, normals: &[Vec3], ctx: &LineCtx, tokens: &[&str]) -> LoadResult<()> {
    let corners: Vec<Corner> = tokens
        .iter()
        .map(|&tok| parse_corner(mesh, normals, ctx, tok))
        .collect::<LoadResult<_>>()?;

    let faces: Vec<(FaceId, [usize; 3])> = match corners.len() {
        3 => {
            let f = mesh.add_tri(corners[0].vert, corners[1].vert, corners[2].vert)?;
            vec![(f, [0, 1, 2])]
        }
        4 => {
            let (f1, f2) = mesh.add_quad(
                corners[0].vert,
                corners[1].vert,
                corners[2].vert,
                corners[3].vert,
            )?;
            vec![(f1, [0, 1, 2]), (f2, [0, 2, 3])]
        }
        n => {
            return Err(ctx.err(format!("faces must have 3 or 4 vertices, got {n}")));
        }
    };

    for (face, slots) in faces {
        for slot in slots {
            let corner = &corners[slot];
            if let Some(ni) = corner.normal {
                mesh.set_corner_normal(face, corner.vert, normals[ni]);
            }
        }
    }

    Ok(())
}

/// Parse `v`, `v/t`, `v//n`, or `v/t/n`, resolving negative indices
/// relative to the current list lengths.
fn parse_corner(mesh: &Mesh, normals: &[Vec3], ctx: &LineCtx, token: &str) -> LoadResult<Corner> {
    let mut parts = token.split('/');

    let vert_tok = parts.next().unwrap_or("");
    let _tex_tok = parts.next();
    let norm_tok = parts.next();

    if parts.next().is_some() {
        return Err(ctx.err(format!("malformed face corner '{token}'")));
    }

    let vert = resolve_index(ctx, vert_tok, mesh.verts_len())?;

    let normal = match norm_tok {
        None | Some("") => None,
        Some(tok) => Some(resolve_index(ctx, tok, normals.len())?),
    };

    Ok(Corner { vert, normal })
}

fn resolve_index(ctx: &LineCtx, token: &str, len: usize) -> LoadResult<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| ctx.err(format!("malformed index '{token}'")))?;

    let idx = if raw < 0 {
        len as i64 + raw
    } else {
        raw - 1 // OBJ indices are one-based
    };

    if idx < 0 || idx as usize >= len {
        return Err(ctx.err(format!("index '{token}' out of range")));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_triangle() {
        let path = write_temp(
            "bokeh_obj_tri.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        );
        let mesh = load_obj(&path).unwrap();

        assert_eq!(mesh.verts_len(), 3);
        assert_eq!(mesh.faces_len(), 1);
        assert!(mesh.kdtree().is_some());

        // No vn lines: normals computed from the face.
        let f = mesh.face_ids().next().unwrap();
        for n in mesh.face_vert_normals(f) {
            assert!((n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_load_quad_with_normals() {
        let path = write_temp(
            "bokeh_obj_quad.obj",
            concat!(
                "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n",
                "vn 0 0 1\n",
                "vt 0 0\n",
                "f 1/1/1 2/1/1 3/1/1 4/1/1\n",
            ),
        );
        let mesh = load_obj(&path).unwrap();

        assert_eq!(mesh.faces_len(), 2);
        for f in mesh.face_ids() {
            for n in mesh.face_vert_normals(f) {
                assert!((n - Vec3::Z).length() < 1e-5);
            }
        }
    }

    #[test]
    fn test_negative_indices() {
        let path = write_temp(
            "bokeh_obj_neg.obj",
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n",
        );
        let mesh = load_obj(&path).unwrap();
        assert_eq!(mesh.faces_len(), 1);
        assert_eq!(mesh.face_vert_indices(mesh.face_ids().next().unwrap()), [0, 1, 2]);
    }

    #[test]
    fn test_unknown_directive_fatal() {
        let path = write_temp("bokeh_obj_bad.obj", "o object\nv 0 0 0\n");
        let err = load_obj(&path).unwrap_err();
        assert!(err.to_string().contains("unrecognized directive 'o'"));
    }

    #[test]
    fn test_ngon_rejected() {
        let path = write_temp(
            "bokeh_obj_ngon.obj",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv -1 1 0\nf 1 2 3 4 5\n",
        );
        assert!(load_obj(&path).is_err());
    }
}
