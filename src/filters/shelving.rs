use crate::fixed::{fscale, imuldiv24};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShelfKind {
    #[default]
    Low,
    High,
}

/// Low or high shelving EQ band, Q24 fixed point
///
/// Feedback coefficients are stored negated so the loop only adds.
#[derive(Clone, Debug, Default)]
pub struct Shelving {
    pub kind: ShelfKind,
    /// Corner frequency in Hz
    pub freq: f64,
    /// Gain in dB
    pub gain: f64,
    /// Slope; 0 selects the default `sqrt(2A)` shape
    pub q: f64,
    a1: i32,
    a2: i32,
    b0: i32,
    b1: i32,
    b2: i32,
    /// `[x1, x2, y1, y2]` per stereo side
    hist: [[i32; 4]; 2],
}

impl Shelving {
    pub fn new(kind: ShelfKind) -> Self {
        Self { kind, ..Default::default() }
    }

    /// Retune the shelf and recalculate
    pub fn set(&mut self, freq: f64, gain: f64, q: f64, sample_rate: f64) {
        (self.freq, self.gain, self.q) = (freq, gain, q);
        self.calc(sample_rate);
    }

    /// Recalculate coefficients from `freq`, `gain` and `q` and clear history
    pub fn calc(&mut self, sample_rate: f64) {
        self.hist = [[0; 4]; 2];
        if self.freq < 0.0 || self.freq > sample_rate / 2.0 {
            self.b0 = fscale(1.0, 24);
            self.a1 = 0;
            self.a2 = 0;
            self.b1 = 0;
            self.b2 = 0;
            return;
        }
        let a = 10f64.powf(self.gain / 40.0);
        let omega = 2.0 * PI * self.freq / sample_rate;
        let (sn, cs) = omega.sin_cos();
        let beta = if self.q == 0.0 { (a + a).sqrt() } else { a.sqrt() / self.q };

        let (a0, a1, a2, b0, b1, b2) = match self.kind {
            ShelfKind::Low => (
                1.0 / ((a + 1.0) + (a - 1.0) * cs + beta * sn),
                2.0 * ((a - 1.0) + (a + 1.0) * cs),
                -((a + 1.0) + (a - 1.0) * cs - beta * sn),
                a * ((a + 1.0) - (a - 1.0) * cs + beta * sn),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cs),
                a * ((a + 1.0) - (a - 1.0) * cs - beta * sn),
            ),
            ShelfKind::High => (
                1.0 / ((a + 1.0) - (a - 1.0) * cs + beta * sn),
                -2.0 * ((a - 1.0) - (a + 1.0) * cs),
                -((a + 1.0) - (a - 1.0) * cs - beta * sn),
                a * ((a + 1.0) + (a - 1.0) * cs + beta * sn),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cs),
                a * ((a + 1.0) + (a - 1.0) * cs - beta * sn),
            ),
        };
        self.a1 = fscale(a1 * a0, 24);
        self.a2 = fscale(a2 * a0, 24);
        self.b0 = fscale(b0 * a0, 24);
        self.b1 = fscale(b1 * a0, 24);
        self.b2 = fscale(b2 * a0, 24);
    }

    #[inline]
    pub fn process(&mut self, x: i32, ch: usize) -> i32 {
        let [x1, x2, y1, y2] = self.hist[ch];
        let y = imuldiv24(x, self.b0)
            .saturating_add(imuldiv24(x1, self.b1))
            .saturating_add(imuldiv24(x2, self.b2))
            .saturating_add(imuldiv24(y1, self.a1))
            .saturating_add(imuldiv24(y2, self.a2));
        self.hist[ch] = [x, x1, y, y1];
        y
    }

    pub fn process_stereo(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            frame[0] = self.process(frame[0], 0);
            frame[1] = self.process(frame[1], 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc_gain(kind: ShelfKind, gain: f64) -> f64 {
        let mut shelf = Shelving::new(kind);
        shelf.freq = 1000.0;
        shelf.gain = gain;
        shelf.calc(44100.0);
        let mut y = 0;
        for _ in 0..20_000 {
            y = shelf.process(1 << 20, 0);
        }
        y as f64 / (1 << 20) as f64
    }

    #[test]
    fn test_low_shelf_boosts_dc() {
        let gain = dc_gain(ShelfKind::Low, 6.0);
        assert!((gain - 10f64.powf(6.0 / 20.0)).abs() < 0.02, "got {gain}");
    }

    #[test]
    fn test_high_shelf_leaves_dc() {
        let gain = dc_gain(ShelfKind::High, 12.0);
        assert!((gain - 1.0).abs() < 0.02, "got {gain}");
    }

    #[test]
    fn test_out_of_range_frequency_bypasses() {
        let mut shelf = Shelving::new(ShelfKind::Low);
        shelf.freq = 30_000.0;
        shelf.gain = 12.0;
        shelf.calc(44100.0);
        assert_eq!(shelf.process(4242, 0), 4242);
    }
}
