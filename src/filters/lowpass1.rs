use crate::fixed::{fscale, imuldiv24};

/// First-order low-pass `y = x * a + y1 * (1 - a)` with Q24 coefficients.
///
/// One history slot per stereo side, so the same coefficients can run an
/// interleaved block or two independent mono streams.
#[derive(Clone, Debug, Default)]
pub struct Lowpass1 {
    /// Feed-forward amount in `0.0..=1.0`
    pub a: f64,
    ai: i32,
    iai: i32,
    x1: [i32; 2],
}

impl Lowpass1 {
    pub fn new(a: f64) -> Self {
        let mut filter = Self::default();
        filter.set(a);
        filter
    }

    /// Set the coefficient and clear history
    pub fn set(&mut self, a: f64) {
        self.a = a.min(1.0);
        self.ai = fscale(self.a, 24);
        self.iai = fscale(1.0 - self.a, 24);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.x1 = [0; 2];
    }

    /// Filter one sample of side `ch` (0 = left, 1 = right)
    #[inline]
    pub fn process(&mut self, x: i32, ch: usize) -> i32 {
        let y = imuldiv24(self.x1[ch], self.iai).saturating_add(imuldiv24(x, self.ai));
        self.x1[ch] = y;
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

    #[test]
    fn test_unity_coefficient_passes_through() {
        let mut filter = Lowpass1::new(1.0);
        assert_eq!(filter.process(12345, 0), 12345);
    }

    #[test]
    fn test_coefficient_is_capped() {
        let filter = Lowpass1::new(3.0);
        assert_eq!(filter.a, 1.0, "a above one would make the filter unstable");
    }

    #[test]
    fn test_sides_are_independent() {
        let mut filter = Lowpass1::new(0.5);
        let mut buf = [1 << 20, 0, 1 << 20, 0];
        filter.process_stereo(&mut buf);
        assert_eq!(buf[1], 0);
        assert_eq!(buf[3], 0, "silence on the right must stay silent");
        assert!(buf[2] > buf[0], "the left side converges upward");
    }
}
