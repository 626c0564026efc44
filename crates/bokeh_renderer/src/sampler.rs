//! Correlated multi-jittered 2D sampling.
//!
//! Deterministic stratified samples built from Andrew Kensler's
//! permute/rand-float bit-mixing kernels ("Correlated Multi-Jittered
//! Sampling", Pixar tech memo 13-01). A sampler with a fixed
//! permutation seed always yields the same pattern; `jitter` draws a
//! fresh seed to decorrelate successive passes.

use std::f64::consts::PI;

use rand::RngCore;

/// Monotonic distribution applied to one sample axis.
pub type DistrFn = fn(f64) -> f64;

fn full_arcsin(y: f64) -> f64 {
    (2.0 * y - 1.0).asin()
}

fn times_two_pi(y: f64) -> f64 {
    2.0 * PI * y
}

fn permute(mut i: u32, len: u32, p: u32) -> u32 {
    let mut w = len - 1;
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;

    loop {
        i ^= p;
        i = i.wrapping_mul(0xe170893d);
        i ^= (i & w) >> 4;
        i ^= p >> 8;
        i = i.wrapping_mul(0x0929eb3f);
        i ^= p >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | p >> 27);
        i = i.wrapping_mul(0x6935fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dcb303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e501cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860a3df);
        i &= w;
        i ^= i >> 5;

        if i < len {
            break;
        }
    }

    (i.wrapping_add(p)) % len
}

fn rand_float(mut i: u32, p: u32) -> f64 {
    i ^= p;
    i ^= i >> 17;
    i ^= i >> 10;
    i = i.wrapping_mul(0xb36534e5);
    i ^= i >> 12;
    i ^= i >> 21;
    i = i.wrapping_mul(0x93fc4795);
    i ^= 0xdf6e307f;
    i ^= i >> 17;
    i = i.wrapping_mul(1 | p >> 18);

    i as f64 / (u32::MAX as f64 + 1.0)
}

/// A 2D correlated multi-jittered sampler over an xdivs * ydivs grid.
#[derive(Debug, Clone)]
pub struct CmjSampler2D {
    xdivs: u32,
    ydivs: u32,
    permutation: u32,
    distr_x: Option<DistrFn>,
    distr_y: Option<DistrFn>,
}

impl CmjSampler2D {
    /// Linear distribution on both axes, permutation drawn from `rng`.
    pub fn new_linear(xdivs: u32, ydivs: u32, rng: &mut dyn RngCore) -> Self {
        Self::with_seed(xdivs, ydivs, None, None, rng.next_u32())
    }

    /// Arcsine distribution on the y axis (hemispherical polar angles),
    /// linear on x.
    pub fn new_hemispherical(xdivs: u32, ydivs: u32, rng: &mut dyn RngCore) -> Self {
        Self::with_seed(xdivs, ydivs, None, Some(f64::asin), rng.next_u32())
    }

    /// Spherical distribution: azimuth on x, full arcsine polar on y.
    pub fn new_spherical(xdivs: u32, ydivs: u32, rng: &mut dyn RngCore) -> Self {
        Self::with_seed(
            xdivs,
            ydivs,
            Some(times_two_pi),
            Some(full_arcsin),
            rng.next_u32(),
        )
    }

    /// Arbitrary monotonic distributions per axis.
    pub fn new_with_distr(
        xdivs: u32,
        ydivs: u32,
        distr_x: Option<DistrFn>,
        distr_y: Option<DistrFn>,
        rng: &mut dyn RngCore,
    ) -> Self {
        Self::with_seed(xdivs, ydivs, distr_x, distr_y, rng.next_u32())
    }

    /// Fully explicit constructor for deterministic patterns.
    pub fn with_seed(
        xdivs: u32,
        ydivs: u32,
        distr_x: Option<DistrFn>,
        distr_y: Option<DistrFn>,
        seed: u32,
    ) -> Self {
        debug_assert!(xdivs > 0 && ydivs > 0);
        Self {
            xdivs,
            ydivs,
            permutation: seed,
            distr_x,
            distr_y,
        }
    }

    pub fn xdivs(&self) -> u32 {
        self.xdivs
    }

    pub fn ydivs(&self) -> u32 {
        self.ydivs
    }

    /// Re-randomize the pattern.
    pub fn jitter(&mut self, rng: &mut dyn RngCore) {
        self.permutation = rng.next_u32();
    }

    /// The sample coordinates for stratum cell (i, j).
    pub fn sample(&self, i: u32, j: u32) -> (f64, f64) {
        debug_assert!(i < self.xdivs);
        debug_assert!(j < self.ydivs);

        let s = i * self.ydivs + j;
        let sx = permute(i, self.xdivs, self.permutation.wrapping_mul(0xa511e9b3));
        let sy = permute(j, self.ydivs, self.permutation.wrapping_mul(0x63d83595));
        let jx = rand_float(s, self.permutation.wrapping_mul(0xa399d265));
        let jy = rand_float(s, self.permutation.wrapping_mul(0x711ad6a5));

        let mut x = (i as f64 + (sy as f64 + jx) / self.ydivs as f64) / self.xdivs as f64;
        let mut y = (j as f64 + (sx as f64 + jy) / self.xdivs as f64) / self.ydivs as f64;

        if let Some(d) = self.distr_x {
            x = d(x);
        }
        if let Some(d) = self.distr_y {
            y = d(y);
        }

        (x, y)
    }
}
