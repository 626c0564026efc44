//! Phong material parameters and direct-illumination shading.

use bitflags::bitflags;
use bokeh_math::Vec3;

bitflags! {
    /// Independent illumination-mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IllumModes: u32 {
        const AMBIENT = 0x1;
        const REFLECT = 0x2;
        const REFRACT = 0x4;
    }
}

/// Map an MTL `illum` code to the flag set. Codes outside {0, 1, 3, 6}
/// are not supported and yield `None` (a fatal parse error upstream).
pub fn illum_from_code(code: u32) -> Option<IllumModes> {
    match code {
        0 => Some(IllumModes::empty()),
        1 => Some(IllumModes::AMBIENT),
        3 => Some(IllumModes::AMBIENT | IllumModes::REFLECT),
        6 => Some(IllumModes::AMBIENT | IllumModes::REFRACT),
        _ => None,
    }
}

/// Phong material: colors, shininess exponent, emission, and the
/// illumination-mode flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    diffuse: Vec3,
    ambient: Vec3,
    specular: Vec3,
    shiny: f32,
    emitted: Vec3,
    emittance_power: f32,
    illum: IllumModes,
}

impl Material {
    pub fn diffuse(&self) -> Vec3 {
        self.diffuse
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn specular(&self) -> Vec3 {
        self.specular
    }

    pub fn shiny(&self) -> f32 {
        self.shiny
    }

    pub fn emitted(&self) -> Vec3 {
        self.emitted
    }

    pub fn emittance_power(&self) -> f32 {
        self.emittance_power
    }

    pub fn set_diffuse(&mut self, v: Vec3) {
        self.diffuse = v;
    }

    pub fn set_ambient(&mut self, v: Vec3) {
        self.ambient = v;
    }

    pub fn set_specular(&mut self, v: Vec3) {
        self.specular = v;
    }

    pub fn set_shiny(&mut self, s: f32) {
        self.shiny = s;
    }

    pub fn set_emitted(&mut self, v: Vec3) {
        self.emitted = v;
    }

    pub fn set_emittance_power(&mut self, p: f32) {
        self.emittance_power = p;
    }

    pub fn set_illum(&mut self, modes: IllumModes) {
        self.illum = modes;
    }

    pub fn ambient_on(&self) -> bool {
        self.illum.contains(IllumModes::AMBIENT)
    }

    pub fn reflect_on(&self) -> bool {
        self.illum.contains(IllumModes::REFLECT)
    }

    pub fn refract_on(&self) -> bool {
        self.illum.contains(IllumModes::REFRACT)
    }

    /// Phong contribution of one light sample.
    ///
    /// `norm` is the surface normal, `eye` the unit vector back toward
    /// the viewer, `light` the unit vector toward the light sample, and
    /// `light_color` the light material's emitted color.
    pub fn shade(&self, norm: Vec3, eye: Vec3, light: Vec3, light_color: Vec3) -> Vec3 {
        let mut color = self.emitted;

        let dot_nl = norm.dot(light).max(0.0);
        color += light_color * self.diffuse * dot_nl;

        let reflect = (2.0 * dot_nl * norm - light).normalize();
        let dot_er = eye.dot(reflect).max(0.0);
        color += light_color * self.specular * dot_er.powf(self.shiny) * dot_nl;

        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illum_mapping() {
        assert_eq!(illum_from_code(0), Some(IllumModes::empty()));
        assert_eq!(illum_from_code(1), Some(IllumModes::AMBIENT));
        assert_eq!(
            illum_from_code(3),
            Some(IllumModes::AMBIENT | IllumModes::REFLECT)
        );
        assert_eq!(
            illum_from_code(6),
            Some(IllumModes::AMBIENT | IllumModes::REFRACT)
        );
        assert_eq!(illum_from_code(2), None);
        assert_eq!(illum_from_code(7), None);
    }

    #[test]
    fn test_shade_head_on() {
        let mut m = Material::default();
        m.set_diffuse(Vec3::new(0.5, 0.5, 0.5));

        // Light straight down the normal, viewer likewise.
        let c = m.shade(Vec3::Z, Vec3::Z, Vec3::Z, Vec3::ONE);
        assert!((c - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_shade_backlit_is_black() {
        let mut m = Material::default();
        m.set_diffuse(Vec3::ONE);
        m.set_specular(Vec3::ONE);
        m.set_shiny(8.0);

        let c = m.shade(Vec3::Z, Vec3::Z, -Vec3::Z, Vec3::ONE);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn test_shade_specular_highlight() {
        let mut m = Material::default();
        m.set_specular(Vec3::ONE);
        m.set_shiny(32.0);

        // Mirror geometry: light and eye mirrored about the normal puts
        // the full highlight in view.
        let light = Vec3::new(1.0, 0.0, 1.0).normalize();
        let eye = Vec3::new(-1.0, 0.0, 1.0).normalize();
        let c = m.shade(Vec3::Z, eye, light, Vec3::ONE);

        let expected = light.dot(Vec3::Z);
        assert!((c.x - expected).abs() < 1e-4);
    }
}
