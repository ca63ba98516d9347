//! Four-pole ladder low-pass used by the distortion and auto-wah effects
//!
//! [`Moog`] is the Q24 integer ladder. [`MoogDist`] runs in floating point
//! with a cubic soft-clip on the last pole and can also return the band-pass
//! tap, which the XG overdrive and auto-wah use.

use crate::fixed::{fscale, imuldiv24};

/// Coefficients shared by both ladders
fn ladder_coefficients(freq: f64, res_db: f64, sample_rate: f64) -> (f64, f64, f64) {
    let res = 10f64.powf((res_db - 96.0) / 20.0);
    let fr = 2.0 * freq / sample_rate;
    let q = 1.0 - fr;
    let p = fr + 0.8 * fr * q;
    let f = p + p - 1.0;
    let q = res * (1.0 + 0.5 * q * (1.0 - q + 5.6 * q * q));
    (f, p, q)
}

#[derive(Clone, Debug, Default)]
pub struct Moog {
    /// Cutoff in Hz, clamped to `20..=rate/2` by [`Moog::calc`]
    pub freq: i32,
    /// Resonance in dB (96 = self-oscillation)
    pub res_db: f64,
    last_freq: i32,
    last_res_db: f64,
    f: i32,
    p: i32,
    q: i32,
    b: [i32; 5],
}

impl Moog {
    pub fn new(freq: i32, res_db: f64) -> Self {
        Self { freq, res_db, ..Default::default() }
    }

    pub fn calc(&mut self, sample_rate: f64) {
        self.freq = self.freq.clamp(20, (sample_rate / 2.0) as i32);
        if self.freq == self.last_freq && self.res_db == self.last_res_db {
            return;
        }
        if self.last_freq == 0 {
            self.b = [0; 5];
        }
        self.last_freq = self.freq;
        self.last_res_db = self.res_db;
        let (f, p, q) = ladder_coefficients(self.freq as f64, self.res_db, sample_rate);
        self.f = fscale(f, 24);
        self.p = fscale(p, 24);
        self.q = fscale(q, 24);
    }

    /// Returns `(low, high)` for input `x`
    #[inline]
    pub fn process(&mut self, x: i32) -> (i32, i32) {
        let (f, p, q) = (self.f, self.p, self.q);
        let [b0, mut b1, mut b2, mut b3, mut b4] = self.b;
        let t3 = x.saturating_sub(imuldiv24(q, b4));
        let t1 = b1;
        b1 = imuldiv24(t3.saturating_add(b0), p).saturating_sub(imuldiv24(b1, f));
        let t2 = b2;
        b2 = imuldiv24(b1.saturating_add(t1), p).saturating_sub(imuldiv24(b2, f));
        let t1 = b3;
        b3 = imuldiv24(b2.saturating_add(t2), p).saturating_sub(imuldiv24(b3, f));
        b4 = imuldiv24(b3.saturating_add(t1), p).saturating_sub(imuldiv24(b4, f));
        self.b = [t3, b1, b2, b3, b4];
        (b4, t3.saturating_sub(b4))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MoogDist {
    pub freq: i32,
    pub res_db: f64,
    /// Drive into the last pole's soft clip
    pub dist: f64,
    last_freq: i32,
    last_res_db: f64,
    last_dist: f64,
    f: f64,
    p: f64,
    q: f64,
    d: f64,
    b: [f64; 5],
}

impl MoogDist {
    pub fn new(freq: i32, res_db: f64, dist: f64) -> Self {
        Self { freq, res_db, dist, ..Default::default() }
    }

    pub fn calc(&mut self, sample_rate: f64) {
        self.freq = self.freq.clamp(20, (sample_rate / 2.0) as i32);
        if self.freq == self.last_freq && self.res_db == self.last_res_db && self.dist == self.last_dist {
            return;
        }
        if self.last_freq == 0 {
            self.b = [0.0; 5];
        }
        self.last_freq = self.freq;
        self.last_res_db = self.res_db;
        self.last_dist = self.dist;
        let (f, p, q) = ladder_coefficients(self.freq as f64, self.res_db, sample_rate);
        self.f = f;
        self.p = p;
        self.q = q;
        self.d = 1.0 + self.dist;
    }

    #[inline]
    fn step(&mut self, x: f64) -> (f64, f64) {
        let (f, p) = (self.f, self.p);
        let [b0, mut b1, mut b2, mut b3, mut b4] = self.b;
        let input = x - self.q * b4;
        let t1 = b1;
        b1 = (input + b0) * p - b1 * f;
        let t2 = b2;
        b2 = (b1 + t1) * p - b2 * f;
        let t1 = b3;
        b3 = (b2 + t2) * p - b3 * f;
        b4 = (b3 + t1) * p - b4 * f;
        b4 *= self.d;
        b4 -= b4 * b4 * b4 * 0.166667;
        self.b = [input, b1, b2, b3, b4];
        (input, b4)
    }

    /// Low-pass output with the clipped last pole
    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.step(x).1
    }

    /// Band-pass tap taken between the last two poles
    #[inline]
    pub fn process_band(&mut self, x: f64) -> f64 {
        self.step(x);
        3.0 * (self.b[3] - self.b[4])
    }
}
