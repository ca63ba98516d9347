use crate::fixed::{fscale, imuldiv24};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BiquadKind {
    #[default]
    Lowpass,
    Highpass,
}

/// Biquad low/high-pass - RBJ Audio EQ Cookbook, Q24 fixed point
///
/// The filter is symmetric (`b0 == b2`) so only `b02` and `b1` are stored.
/// Coefficients are recalculated only when `freq` or `q` changed; history
/// is cleared the first time the filter is set up.
#[derive(Clone, Debug, Default)]
pub struct Biquad {
    pub kind: BiquadKind,
    /// Cutoff in Hz
    pub freq: f64,
    pub q: f64,
    last_freq: f64,
    last_q: f64,
    a1: i32,
    a2: i32,
    b1: i32,
    b02: i32,
    bypass: bool,
    /// `[x1, x2, y1, y2]` per stereo side
    hist: [[i32; 4]; 2],
}

impl Biquad {
    /// Create a filter; call [`Biquad::calc`] before processing
    ///
    /// # Arguments
    /// * `kind` - Low- or high-pass response
    /// * `freq` - Cutoff in Hz
    /// * `q` - Quality factor; 0 bypasses the filter
    pub fn new(kind: BiquadKind, freq: f64, q: f64) -> Self {
        Self { kind, freq, q, ..Default::default() }
    }

    /// A low-pass at `freq` with Q 1, ready to process
    pub fn lowpass(freq: f64, sample_rate: f64) -> Self {
        let mut filter = Self::new(BiquadKind::Lowpass, freq, 1.0);
        filter.calc(sample_rate);
        filter
    }

    /// Move the cutoff and Q, recalculating if either changed
    pub fn set(&mut self, freq: f64, q: f64, sample_rate: f64) {
        self.freq = freq;
        self.q = q;
        self.calc(sample_rate);
    }

    pub fn reset(&mut self) {
        self.hist = [[0; 4]; 2];
    }

    /// Recalculate coefficients if the parameters moved
    pub fn calc(&mut self, sample_rate: f64) {
        if self.freq == self.last_freq && self.q == self.last_q {
            return;
        }
        if self.last_freq == 0.0 {
            self.reset();
        }
        self.last_freq = self.freq;
        self.last_q = self.q;

        self.bypass = self.q == 0.0 || self.freq < 0.0 || self.freq > sample_rate / 2.0;
        if self.bypass {
            return;
        }
        let omega = 2.0 * PI * self.freq / sample_rate;
        let (sn, cs) = omega.sin_cos();
        let alpha = sn / (2.0 * self.q);
        let a0 = 1.0 / (1.0 + alpha);

        let (b02, b1) = match self.kind {
            BiquadKind::Lowpass => ((1.0 - cs) / 2.0 * a0, (1.0 - cs) * a0),
            BiquadKind::Highpass => ((1.0 + cs) / 2.0 * a0, -(1.0 + cs) * a0),
        };
        self.b02 = fscale(b02, 24);
        self.b1 = fscale(b1, 24);
        self.a1 = fscale(-2.0 * cs * a0, 24);
        self.a2 = fscale((1.0 - alpha) * a0, 24);
    }

    /// Filter one sample of side `ch`
    #[inline]
    pub fn process(&mut self, x: i32, ch: usize) -> i32 {
        if self.bypass {
            return x;
        }
        let [x1, x2, y1, y2] = self.hist[ch];
        let y = imuldiv24(x.saturating_add(x2), self.b02)
            .saturating_add(imuldiv24(x1, self.b1))
            .saturating_sub(imuldiv24(y1, self.a1))
            .saturating_sub(imuldiv24(y2, self.a2));
        self.hist[ch] = [x, x1, y, y1];
        y
    }

    /// Filter an interleaved stereo block in place
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

    fn settle(kind: BiquadKind, input: impl Fn(usize) -> i32) -> i32 {
        let mut filter = Biquad::new(kind, 1000.0, 0.7);
        filter.calc(44100.0);
        let mut peak = 0;
        for n in 0..4000 {
            let y = filter.process(input(n), 0);
            if n > 3000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let out = settle(BiquadKind::Lowpass, |_| 1 << 20);
        assert!((out - (1 << 20)).abs() < 1 << 10, "got {out}");
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let out = settle(BiquadKind::Highpass, |_| 1 << 20);
        assert!(out < 1 << 8, "got {out}");
    }

    #[test]
    fn test_lowpass_rejects_nyquist() {
        let out = settle(BiquadKind::Lowpass, |n| if n % 2 == 0 { 1 << 20 } else { -(1 << 20) });
        assert!(out < 1 << 12, "got {out}");
    }

    #[test]
    fn test_zero_q_bypasses() {
        let mut filter = Biquad::new(BiquadKind::Lowpass, 1000.0, 0.0);
        filter.calc(44100.0);
        assert_eq!(filter.process(777, 1), 777);
    }

    #[test]
    fn test_lowpass_constructor_is_ready() {
        let mut ready = Biquad::lowpass(2000.0, 44100.0);
        let mut manual = Biquad::new(BiquadKind::Lowpass, 2000.0, 1.0);
        manual.calc(44100.0);
        for n in 0..64 {
            let x = if n % 3 == 0 { 1 << 20 } else { -(1 << 18) };
            assert_eq!(ready.process(x, 0), manual.process(x, 0), "sample {n}");
        }
    }

    #[test]
    fn test_set_negative_cutoff_bypasses() {
        let mut filter = Biquad::lowpass(2000.0, 44100.0);
        filter.set(-1.0, 1.0, 44100.0);
        assert_eq!(filter.process(555, 0), 555, "a negative cutoff switches the filter off");
    }
}
