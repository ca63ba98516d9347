use crate::fixed::{fscale, imuldiv24};
use std::f64::consts::PI;

/// Peaking EQ band, Q24 fixed point
///
/// `b1` equals `a1` for a peaking filter, so one shared `ba1` term is
/// applied to `x1 - y1`.
#[derive(Clone, Debug, Default)]
pub struct Peaking {
    /// Centre frequency in Hz
    pub freq: f64,
    /// Gain in dB
    pub gain: f64,
    pub q: f64,
    ba1: i32,
    a2: i32,
    b0: i32,
    b2: i32,
    hist: [[i32; 4]; 2],
}

impl Peaking {
    /// Retune the band and recalculate
    ///
    /// # Arguments
    /// * `freq` - Centre frequency in Hz
    /// * `gain` - Gain in dB
    /// * `q` - Bandwidth; 0 bypasses the band
    /// * `sample_rate` - Output rate in Hz
    pub fn set(&mut self, freq: f64, gain: f64, q: f64, sample_rate: f64) {
        (self.freq, self.gain, self.q) = (freq, gain, q);
        self.calc(sample_rate);
    }

    /// Recalculate coefficients and clear history
    pub fn calc(&mut self, sample_rate: f64) {
        self.hist = [[0; 4]; 2];
        if self.q == 0.0 || self.freq < 0.0 || self.freq > sample_rate / 2.0 {
            self.b0 = fscale(1.0, 24);
            self.ba1 = 0;
            self.a2 = 0;
            self.b2 = 0;
            return;
        }
        let a = 10f64.powf(self.gain / 40.0);
        let omega = 2.0 * PI * self.freq / sample_rate;
        let (sn, cs) = omega.sin_cos();
        let alpha = sn / (2.0 * self.q);
        let a0 = 1.0 / (1.0 + alpha / a);

        self.ba1 = fscale(-2.0 * cs * a0, 24);
        self.a2 = fscale((1.0 - alpha / a) * a0, 24);
        self.b0 = fscale((1.0 + alpha * a) * a0, 24);
        self.b2 = fscale((1.0 - alpha * a) * a0, 24);
    }

    #[inline]
    pub fn process(&mut self, x: i32, ch: usize) -> i32 {
        let [x1, x2, y1, y2] = self.hist[ch];
        let y = imuldiv24(x, self.b0)
            .saturating_add(imuldiv24(x1.saturating_sub(y1), self.ba1))
            .saturating_add(imuldiv24(x2, self.b2))
            .saturating_sub(imuldiv24(y2, self.a2));
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

    #[test]
    fn test_peaking_is_flat_at_dc() {
        let mut eq = Peaking { freq: 2000.0, gain: 9.0, q: 1.0, ..Default::default() };
        eq.calc(44100.0);
        let mut y = 0;
        for _ in 0..20_000 {
            y = eq.process(1 << 20, 0);
        }
        let gain = y as f64 / (1 << 20) as f64;
        assert!((gain - 1.0).abs() < 0.01, "peaking band must not move DC, got {gain}");
    }

    #[test]
    fn test_zero_q_bypasses() {
        let mut eq = Peaking { freq: 2000.0, gain: 9.0, q: 0.0, ..Default::default() };
        eq.calc(44100.0);
        assert_eq!(eq.process(-99, 1), -99);
    }

    #[test]
    fn test_set_matches_field_setup() {
        let mut manual = Peaking { freq: 800.0, gain: -4.0, q: 2.0, ..Default::default() };
        manual.calc(48000.0);
        let mut eq = Peaking::default();
        eq.set(800.0, -4.0, 2.0, 48000.0);
        for n in 0..32 {
            let x = if n == 0 { 1 << 22 } else { 0 };
            assert_eq!(eq.process(x, 1), manual.process(x, 1), "sample {n}");
        }
    }
}
