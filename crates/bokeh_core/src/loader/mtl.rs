//! OBJ-MTL material loader (the subset the shader understands).

use std::path::Path;

use super::{read_file, significant_lines, LoadResult};
use crate::material::{illum_from_code, Material};
use crate::registry::{MaterialStore, MtlId};

/// Parse an MTL file into the store. Returns the ids of the materials
/// added, in file order.
pub fn load_mtl(path: &Path, store: &mut MaterialStore) -> LoadResult<Vec<MtlId>> {
    let content = read_file(path)?;

    let mut ids = Vec::new();
    let mut current: Option<(String, Material)> = None;

    for (ctx, tokens) in significant_lines(path, &content) {
        if tokens[0] == "newmtl" {
            ctx.arity("newmtl", &tokens[1..], 1)?;
            if let Some((name, mtl)) = current.take() {
                ids.push(store.add(&name, mtl));
            }
            current = Some((tokens[1].to_string(), Material::default()));
            continue;
        }

        let (_, mtl) = current
            .as_mut()
            .ok_or_else(|| ctx.err("material properties listed before material name"))?;

        match tokens[0] {
            "Ka" => mtl.set_ambient(ctx.vec3(&tokens[1..])?),
            "Kd" => mtl.set_diffuse(ctx.vec3(&tokens[1..])?),
            "Ks" => mtl.set_specular(ctx.vec3(&tokens[1..])?),
            "Ns" => {
                ctx.arity("Ns", &tokens[1..], 1)?;
                mtl.set_shiny(ctx.f32(tokens[1])?);
            }
            "Ke" => mtl.set_emitted(ctx.vec3(&tokens[1..])?),
            "Ne" => {
                ctx.arity("Ne", &tokens[1..], 1)?;
                mtl.set_emittance_power(ctx.f32(tokens[1])?);
            }
            "illum" => {
                ctx.arity("illum", &tokens[1..], 1)?;
                let code = ctx.u32(tokens[1])?;
                let modes = illum_from_code(code)
                    .ok_or_else(|| ctx.err(format!("unsupported illumination mode {code}")))?;
                mtl.set_illum(modes);
            }
            other => {
                return Err(ctx.err(format!("unsupported material property '{other}'")));
            }
        }
    }

    if let Some((name, mtl)) = current {
        ids.push(store.add(&name, mtl));
    }

    log::info!("{}: {} materials", path.display(), ids.len());

    Ok(ids)
}
