//! Compound-lens assembly: paraxial analysis and sampled ray
//! generation through the element stack.
//!
//! Coordinates: all surfaces sit on the optical z-axis. The `.la` file
//! is walked top to bottom with z starting at 0 and decreasing by each
//! surface's thickness, so the first listed surface is the sensor-side
//! element: generated rays start on the film plane at positive z and
//! travel toward the scene at negative z, crossing the surfaces in
//! list order. `gaps[i]` is the refractive index before surface i in
//! that traversal; `gaps[0]` and the last entry are air.

use std::f32::consts::PI;
use std::path::Path;

use bokeh_core::loader::{read_file, significant_lines, LoadResult};
use bokeh_math::{Ray, Vec3, EPSILON};
use rand::RngCore;

use crate::gen_f32;

/// Samples rejected before giving up on refining one film point.
const MAX_SAMPLE_ATTEMPTS: usize = 256;

/// One spherical cap on the optical axis.
#[derive(Debug, Clone, Copy)]
pub struct LensSurface {
    /// Axial position of the surface vertex.
    vertex: f32,
    /// Signed radius of curvature; the sphere center is at vertex + radius.
    radius: f32,
    /// Refractive index of the glass after this surface (film-to-scene
    /// traversal order).
    index: f32,
    /// Aperture radius.
    aperture: f32,
}

impl LensSurface {
    pub fn new(vertex: f32, radius: f32, index: f32, aperture: f32) -> Self {
        Self {
            vertex,
            radius,
            index,
            aperture,
        }
    }

    pub fn vertex_position(&self) -> f32 {
        self.vertex
    }

    pub fn radius_of_curvature(&self) -> f32 {
        self.radius
    }

    pub fn index_of_refraction(&self) -> f32 {
        self.index
    }

    pub fn aperture_radius(&self) -> f32 {
        self.aperture
    }

    pub fn is_planar(&self) -> bool {
        self.radius.abs() < EPSILON
    }

    /// Center of the curvature sphere on the z-axis.
    pub fn center(&self) -> f32 {
        self.vertex + self.radius
    }

    pub fn curvature(&self) -> f32 {
        if self.is_planar() {
            0.0
        } else {
            1.0 / self.radius
        }
    }
}

/// Cardinal points of a surface subrange, in absolute z coordinates.
///
/// "Front" is the film side (greater z), "back" the scene side. The
/// focal length is measured on the film side and is positive for a
/// converging subsystem.
#[derive(Debug, Clone, Copy)]
pub struct Cardinal {
    pub front_principal: f32,
    pub back_principal: f32,
    pub front_focal: f32,
    pub back_focal: f32,
    pub focal_length: f32,
}

/// An ordered stack of lens surfaces plus the derived paraxial data.
#[derive(Debug, Clone)]
pub struct LensAssembly {
    surfaces: Vec<LensSurface>,
    /// Refractive index per inter-surface gap; len = surfaces + 1.
    gaps: Vec<f32>,
    /// Film-to-front-principal-plane distance.
    dist: f32,
    stop: usize,
    cardinal: Option<Cardinal>,
    exit_pupil_pos: f32,
    exit_pupil_rad: f32,
}

impl LensAssembly {
    pub fn new(dist: f32, surfaces: Vec<LensSurface>) -> Self {
        let mut gaps = Vec::with_capacity(surfaces.len() + 1);
        gaps.push(1.0);
        for s in &surfaces {
            gaps.push(s.index_of_refraction());
        }

        let mut assembly = Self {
            surfaces,
            gaps,
            dist,
            stop: 0,
            cardinal: None,
            exit_pupil_pos: 0.0,
            exit_pupil_rad: 0.0,
        };
        assembly.analyze();
        assembly
    }

    /// Parse a `.la` file: a film distance line plus one line per
    /// surface, walked top to bottom with z decreasing by each
    /// thickness.
    pub fn from_la(path: &Path) -> LoadResult<Self> {
        let content = read_file(path)?;

        let mut dist = 0.0;
        let mut surfaces = Vec::new();
        let mut z = 0.0f32;

        for (ctx, tokens) in significant_lines(path, &content) {
            match tokens[0] {
                "lens_assembly" => {
                    ctx.arity("lens_assembly", &tokens[1..], 1)?;
                    dist = ctx.f32(tokens[1])?;
                }
                "lens_surface" => {
                    ctx.arity("lens_surface", &tokens[1..], 4)?;
                    let r = ctx.f32(tokens[1])?;
                    let t = ctx.f32(tokens[2])?;
                    let n = ctx.f32(tokens[3])?;
                    let a = ctx.f32(tokens[4])?;

                    surfaces.push(LensSurface::new(z, r, n, a / 2.0));
                    z -= t;
                }
                other => {
                    return Err(ctx.err(format!("unrecognized directive '{other}' in LA")));
                }
            }
        }

        log::info!("{}: {} lens surfaces", path.display(), surfaces.len());

        Ok(Self::new(dist, surfaces))
    }

    pub fn surfaces(&self) -> &[LensSurface] {
        &self.surfaces
    }

    pub fn dist(&self) -> f32 {
        self.dist
    }

    pub fn set_dist(&mut self, dist: f32) {
        self.dist = dist;
    }

    pub fn aperture_stop(&self) -> usize {
        self.stop
    }

    pub fn cardinal(&self) -> Option<&Cardinal> {
        self.cardinal.as_ref()
    }

    /// The whole system's film-side focal length, 1.0 when degenerate.
    pub fn focal_length(&self) -> f32 {
        match self.cardinal {
            Some(c) if c.focal_length.is_finite() && c.focal_length.abs() > EPSILON => {
                c.focal_length
            }
            _ => 1.0,
        }
    }

    pub fn exit_pupil(&self) -> (f32, f32) {
        (self.exit_pupil_pos, self.exit_pupil_rad)
    }

    fn analyze(&mut self) {
        if self.surfaces.is_empty() {
            self.cardinal = None;
            self.stop = 0;
            self.exit_pupil_pos = 0.0;
            self.exit_pupil_rad = 0.0;
            return;
        }

        self.cardinal = self.reduce(0, self.surfaces.len() - 1);
        self.stop = self.find_stop();
        self.find_pupil();

        log::debug!(
            "lens: stop at surface {}, exit pupil z={:.4} r={:.4}, f={:.4}",
            self.stop,
            self.exit_pupil_pos,
            self.exit_pupil_rad,
            self.focal_length()
        );
    }

    /// Optical power of surface i between its two gap media.
    fn optical_power(&self, i: usize) -> f32 {
        (self.gaps[i + 1] - self.gaps[i]) * self.surfaces[i].curvature()
    }

    /// Refraction at surface i for a ray traversing film to scene.
    fn paraxial_refract(&self, i: usize, y: f32, u: f32) -> f32 {
        (self.gaps[i] * u - y * self.optical_power(i)) / self.gaps[i + 1]
    }

    /// Refraction at surface i for the reverse (scene to film) traversal.
    fn paraxial_refract_rev(&self, i: usize, y: f32, u: f32) -> f32 {
        (self.gaps[i + 1] * u + y * self.optical_power(i)) / self.gaps[i]
    }

    /// Reduce surfaces [lo, hi] to their cardinal points by tracing the
    /// parallel ray (y=1, u=0) through the range forwards and
    /// backwards.
    fn reduce(&self, lo: usize, hi: usize) -> Option<Cardinal> {
        let v = |i: usize| self.surfaces[i].vertex_position();

        // Film -> scene.
        let (mut y, mut u) = (1.0f32, 0.0f32);
        for i in lo..=hi {
            u = self.paraxial_refract(i, y, u);
            if i < hi {
                y += u * (v(i + 1) - v(i));
            }
        }
        if u.abs() < EPSILON {
            return None; // afocal
        }
        let back_focal = v(hi) - y / u;
        let back_principal = v(hi) + (1.0 - y) / u;

        // Scene -> film.
        let (mut y, mut u) = (1.0f32, 0.0f32);
        for i in (lo..=hi).rev() {
            u = self.paraxial_refract_rev(i, y, u);
            if i > lo {
                y += u * (v(i - 1) - v(i));
            }
        }
        if u.abs() < EPSILON {
            return None;
        }
        let front_focal = v(lo) - y / u;
        let front_principal = v(lo) + (1.0 - y) / u;

        Some(Cardinal {
            front_principal,
            back_principal,
            front_focal,
            back_focal,
            focal_length: front_focal - front_principal,
        })
    }

    /// Locate the aperture stop: trace a paraxial probe from the
    /// scene-side surface toward the film; the stop is the surface
    /// where |aperture / height| is smallest.
    fn find_stop(&self) -> usize {
        let v = |i: usize| self.surfaces[i].vertex_position();

        let (mut y, mut u) = (0.1f32, 0.1f32);
        let mut best = 0usize;
        let mut max_ratio = 0.0f32;

        for i in (0..self.surfaces.len()).rev() {
            u = self.paraxial_refract_rev(i, y, u);

            let ratio = (y / self.surfaces[i].aperture_radius()).abs();
            if ratio > max_ratio {
                max_ratio = ratio;
                best = i;
            }

            if i > 0 {
                y += u * (v(i - 1) - v(i));
            }
        }

        best
    }

    /// Image the stop through the film-side subsystem to get the exit
    /// pupil. With no surfaces between the stop and the film, the stop
    /// is its own pupil.
    fn find_pupil(&mut self) {
        let z_stop = self.surfaces[self.stop].vertex_position();
        let a_stop = self.surfaces[self.stop].aperture_radius();

        self.exit_pupil_pos = z_stop;
        self.exit_pupil_rad = a_stop;

        if self.stop == 0 {
            return;
        }

        let Some(sub) = self.reduce(0, self.stop - 1) else {
            return;
        };

        // Thin-system imaging toward the film: object distance from the
        // scene-side principal plane, image distance from the film-side
        // one, magnification scales the stop radius.
        let f = sub.focal_length;
        let o = sub.back_principal - z_stop;
        let denom = o - f;
        if !f.is_finite() || denom.abs() < EPSILON || o.abs() < EPSILON {
            return;
        }

        let i = f * o / denom;
        self.exit_pupil_pos = sub.front_principal + i;
        self.exit_pupil_rad = (i / o).abs() * a_stop;
    }

    /// Axial position of the film plane.
    pub fn film_z(&self) -> f32 {
        let front = self
            .cardinal
            .map(|c| c.front_principal)
            .unwrap_or_else(|| {
                self.surfaces
                    .first()
                    .map(|s| s.vertex_position())
                    .unwrap_or(0.0)
            });
        front + self.dist
    }

    /// Generate a scene-bound ray for film point (x, y).
    ///
    /// A point on the exit pupil disk is sampled and the film ray is
    /// refracted through every surface in order; a sample that misses a
    /// surface cap or suffers total internal reflection is rejected and
    /// redrawn for the same film point. The emerging ray is re-anchored
    /// to film plane z = 0.
    pub fn generate_ray(&self, x: f32, y: f32, rng: &mut dyn RngCore) -> Ray {
        let origin = Vec3::new(x, y, self.film_z());
        let pupil_center = Vec3::new(0.0, 0.0, self.exit_pupil_pos);

        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let theta = 2.0 * PI * gen_f32(rng);
            let r = gen_f32(rng).sqrt() * self.exit_pupil_rad;
            let target = Vec3::new(r * theta.cos(), r * theta.sin(), self.exit_pupil_pos);

            if let Some(ray) = self.trace_through(origin, target - origin) {
                return ray;
            }
        }

        // Degenerate assembly: fall back to the unrefracted chief ray
        // rather than looping forever.
        log::debug!("lens sampling attempts exhausted at film ({x:.3}, {y:.3})");
        Ray::new(Vec3::new(x, y, 0.0), pupil_center - origin)
    }

    fn trace_through(&self, origin: Vec3, direction: Vec3) -> Option<Ray> {
        let mut ray = Ray::new(origin, direction);
        let mut index_a = 1.0f32;

        for s in &self.surfaces {
            let (point, mut n) = intersect_surface(&ray, s)?;

            // Orient the normal against the ray so the refracted
            // direction keeps travelling toward the scene.
            if s.radius_of_curvature() > 0.0 {
                n = -n;
            }

            let index_b = s.index_of_refraction();
            let eta = index_a / index_b;
            let cos_in = -ray.direction().dot(n);
            let det = 1.0 - eta * eta * (1.0 - cos_in * cos_in);
            if det < 0.0 {
                return None; // total internal reflection
            }

            let refracted = eta * ray.direction() + (eta * cos_in - det.sqrt()) * n;
            ray = Ray::new(point, refracted);
            index_a = index_b;
        }

        let o = ray.origin();
        Some(Ray::new(Vec3::new(o.x, o.y, 0.0), ray.direction()))
    }
}

/// Intersect a film-to-scene ray with one surface cap, returning the
/// hit point and the outward sphere normal.
///
/// The cap hugs the vertex: a positive-radius surface curves away from
/// the incoming ray, so its far quadratic root is the physical one;
/// a negative radius takes the near root. Hits outside the aperture
/// radius are misses.
fn intersect_surface(ray: &Ray, s: &LensSurface) -> Option<(Vec3, Vec3)> {
    if s.is_planar() {
        let dz = ray.direction().z;
        if dz.abs() < EPSILON {
            return None;
        }
        let t = (s.vertex_position() - ray.origin().z) / dz;
        if t < 0.0 {
            return None;
        }
        let point = ray.point_at(t);
        if point.x * point.x + point.y * point.y > s.aperture_radius() * s.aperture_radius() {
            return None;
        }
        return Some((point, Vec3::Z));
    }

    let center = Vec3::new(0.0, 0.0, s.center());
    let radius = s.radius_of_curvature().abs();

    let o = ray.origin() - center;
    let d = ray.direction();
    let b = 2.0 * o.dot(d);
    let c = o.dot(o) - radius * radius;

    let disc = b * b - 4.0 * c;
    if disc < 0.0 {
        return None;
    }

    let sq = disc.sqrt();
    let t = if s.radius_of_curvature() > 0.0 {
        (-b + sq) / 2.0
    } else {
        (-b - sq) / 2.0
    };
    if t < 0.0 {
        return None;
    }

    let point = ray.point_at(t);
    if point.x * point.x + point.y * point.y > s.aperture_radius() * s.aperture_radius() {
        return None;
    }

    Some((point, (point - center) / radius))
}
