//! Render drivers: coarse-to-fine progressive refinement on the driver
//! thread, and a full-resolution worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::image::{color_to_pixel, Image};
use crate::scene::Scene;

/// The starting refinement grid: roughly H/20 tiles on each axis.
pub fn default_divs(width: u32, height: u32) -> (u32, u32) {
    let d = (height / 20).max(1);
    (d.min(width), d.min(height))
}

/// Integer tile bounds: cell i of n over extent len. Consecutive cells
/// tile the extent exactly.
fn cell_bounds(i: u32, n: u32, len: u32) -> (u32, u32) {
    (i * len / n, (i + 1) * len / n)
}

/// Coarse-to-fine single-threaded renderer.
///
/// Each call to `trace_next_pixel` renders one tile of the current
/// grid by a single cell-centered ray and paints the whole tile; when
/// a grid is complete the resolution doubles (capped at the image
/// dimensions) until every native pixel has been traced.
pub struct ProgressiveRender<'a> {
    scene: &'a Scene,
    image: Image,
    x_divs: u32,
    y_divs: u32,
    next_cell: u32,
    done: bool,
    dirty: bool,
}

impl<'a> ProgressiveRender<'a> {
    pub fn new(scene: &'a Scene, width: u32, height: u32) -> Self {
        let (x_divs, y_divs) = default_divs(width, height);
        Self::with_divs(scene, width, height, x_divs, y_divs)
    }

    pub fn with_divs(scene: &'a Scene, width: u32, height: u32, x_divs: u32, y_divs: u32) -> Self {
        Self {
            scene,
            image: Image::new(width, height),
            x_divs: x_divs.clamp(1, width),
            y_divs: y_divs.clamp(1, height),
            next_cell: 0,
            done: false,
            dirty: false,
        }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    /// True when the image changed since the flag was last taken.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.x_divs, self.y_divs)
    }

    /// Restart from the coarsest grid.
    pub fn reset(&mut self) {
        let (x_divs, y_divs) = default_divs(self.image.width(), self.image.height());
        self.x_divs = x_divs;
        self.y_divs = y_divs;
        self.next_cell = 0;
        self.done = false;
        self.image.clear_to_color([0, 0, 0, 0]);
    }

    /// Trace one tile. Returns false once every pixel at native
    /// resolution has been visited.
    pub fn trace_next_pixel(&mut self, rng: &mut dyn RngCore) -> bool {
        if self.done {
            return false;
        }

        let (w, h) = (self.image.width(), self.image.height());
        let i = self.next_cell % self.x_divs;
        let j = self.next_cell / self.x_divs;

        let (x0, x1) = cell_bounds(i, self.x_divs, w);
        let (y0, y1) = cell_bounds(j, self.y_divs, h);

        let cx = (x0 + x1) as f64 * 0.5;
        let cy = (y0 + y1) as f64 * 0.5;

        let color = self.scene.trace_pixel(cx, cy, w, h, rng);
        self.image
            .set_pixel_range(x0, y0, x1 - x0, y1 - y0, color_to_pixel(color));
        self.dirty = true;

        self.next_cell += 1;
        if self.next_cell == self.x_divs * self.y_divs {
            if self.x_divs >= w && self.y_divs >= h {
                self.done = true;
                return false;
            }
            self.x_divs = (self.x_divs * 2).min(w);
            self.y_divs = (self.y_divs * 2).min(h);
            self.next_cell = 0;
            log::debug!("progressive refinement -> {}x{}", self.x_divs, self.y_divs);
        }

        true
    }
}

/// Render the full image across a pool of worker threads.
///
/// The image is split into the coarse grid's rectangular sections;
/// workers claim section indices from a mutex-guarded counter and
/// render each section into a local buffer with a per-section seeded
/// RNG (so the output does not depend on worker scheduling), then blit
/// it under the image lock. The stop flag is observed per pixel.
pub fn render_threaded(
    scene: &Scene,
    width: u32,
    height: u32,
    workers: usize,
    seed: u64,
    stop: &AtomicBool,
) -> Image {
    let (x_divs, y_divs) = default_divs(width, height);
    let total = x_divs * y_divs;

    let image = Mutex::new(Image::new(width, height));
    let counter = Mutex::new(0u32);

    std::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            scope.spawn(|| loop {
                if stop.load(Ordering::Relaxed) {
                    break;
                }

                let section = {
                    let mut next = counter.lock().unwrap();
                    let s = *next;
                    *next += 1;
                    s
                };
                if section >= total {
                    break;
                }

                let mut rng =
                    StdRng::seed_from_u64(seed ^ (section as u64).wrapping_mul(0x9e3779b97f4a7c15));

                let (x0, x1) = cell_bounds(section % x_divs, x_divs, width);
                let (y0, y1) = cell_bounds(section / x_divs, y_divs, height);

                let mut local = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
                let mut cancelled = false;
                'section: for y in y0..y1 {
                    for x in x0..x1 {
                        if stop.load(Ordering::Relaxed) {
                            cancelled = true;
                            break 'section;
                        }
                        let color = scene.trace_pixel(
                            x as f64 + 0.5,
                            y as f64 + 0.5,
                            width,
                            height,
                            &mut rng,
                        );
                        local.push(color_to_pixel(color));
                    }
                }

                if cancelled {
                    break;
                }

                let mut img = image.lock().unwrap();
                let mut it = local.into_iter();
                for y in y0..y1 {
                    for x in x0..x1 {
                        if let Some(px) = it.next() {
                            img.set_pixel(x, y, px);
                        }
                    }
                }
            });
        }
    });

    image.into_inner().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::primitive::Primitive;
    use bokeh_core::Stores;
    use bokeh_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// A deterministic scene: sphere on a colored background, one lens
    /// sample, no lights, so pixel values depend only on geometry.
    fn sphere_scene() -> Scene {
        let mut stores = Stores::new();
        let sphere = Primitive::sphere(Vec3::ZERO, 1.0, &mut stores).unwrap();

        let camera = Camera::orthographic(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 4.0);
        let mut scene = Scene::new(camera, Arc::new(stores));
        scene.set_bg_color(Vec3::new(0.2, 0.4, 0.6));
        scene.add_primitive(sphere);
        scene
    }

    #[test]
    fn test_cell_bounds_tile_exactly() {
        for (n, len) in [(3u32, 10u32), (4, 10), (7, 23), (10, 10)] {
            let mut covered = 0;
            for i in 0..n {
                let (a, b) = cell_bounds(i, n, len);
                assert_eq!(a, covered, "cells must be contiguous");
                assert!(b > a, "cells must be non-empty when n <= len");
                covered = b;
            }
            assert_eq!(covered, len);
        }
    }

    #[test]
    fn test_progressive_visits_every_pixel() {
        let scene = sphere_scene();
        let mut prog = ProgressiveRender::with_divs(&scene, 16, 16, 2, 2);
        let mut rng = StdRng::seed_from_u64(0);

        let mut steps = 0;
        while prog.trace_next_pixel(&mut rng) {
            steps += 1;
            assert!(steps < 10_000, "progressive render failed to terminate");
        }

        // 2x2 + 4x4 + 8x8 + 16x16 cells, counting the final returning
        // call as well.
        assert_eq!(steps + 1, 4 + 16 + 64 + 256);

        // Every pixel was painted: background or sphere, never the
        // initial transparent black.
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(prog.image().pixel(x, y)[3], 255);
            }
        }
    }

    #[test]
    fn test_progressive_converges_to_single_pass() {
        let scene = sphere_scene();
        let (w, h) = (16u32, 16u32);

        let mut prog = ProgressiveRender::with_divs(&scene, w, h, 2, 2);
        let mut rng = StdRng::seed_from_u64(0);
        while prog.trace_next_pixel(&mut rng) {}

        // Reference: direct full-resolution pass.
        let mut reference = Image::new(w, h);
        let mut rng = StdRng::seed_from_u64(0);
        for y in 0..h {
            for x in 0..w {
                let c = scene.trace_pixel(x as f64 + 0.5, y as f64 + 0.5, w, h, &mut rng);
                reference.set_pixel(x, y, color_to_pixel(c));
            }
        }

        assert_eq!(prog.image().as_bytes(), reference.as_bytes());
    }

    #[test]
    fn test_threaded_matches_reference_and_is_deterministic() {
        let scene = sphere_scene();
        // 48x60 gives a 3x3 section grid, so scheduling matters.
        let (w, h) = (48u32, 60u32);
        let stop = AtomicBool::new(false);

        let a = render_threaded(&scene, w, h, 4, 123, &stop);
        let b = render_threaded(&scene, w, h, 2, 123, &stop);

        // Per-section seeding makes the result independent of the
        // worker count.
        assert_eq!(a.as_bytes(), b.as_bytes());

        let mut rng = StdRng::seed_from_u64(99);
        let c = scene.trace_pixel(16.5, 12.5, w, h, &mut rng);
        let px = a.pixel(16, 12);
        // Deterministic scene: the threaded pixel equals a direct
        // trace.
        assert_eq!(px, color_to_pixel(c));
    }

    #[test]
    fn test_threaded_stop_flag_halts() {
        let scene = sphere_scene();
        let stop = AtomicBool::new(true);

        // Pre-set stop: workers exit before painting anything.
        let img = render_threaded(&scene, 16, 16, 4, 0, &stop);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(img.pixel(x, y), [0, 0, 0, 0]);
            }
        }
    }

    #[test]
    fn test_default_divs_floor() {
        assert_eq!(default_divs(200, 200), (10, 10));
        assert_eq!(default_divs(200, 10), (1, 1));
        // Narrow images cap the x grid at the width.
        assert_eq!(default_divs(4, 200), (4, 10));
    }
}
