//! Circular-buffer building blocks for every delay-based effect
//!
//! All buffers are owned `Vec<i32>`s. `set` replaces the buffer and clears
//! history, `clear` keeps the length and zeroes history. Feedback gains are
//! Q24 fixed point.

use crate::fixed::{fscale, imuldiv24, imuldiv8};

/// Plain delay line: read the oldest sample, write the newest
#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Vec<i32>,
    index: usize,
}

impl Default for DelayLine {
    fn default() -> Self {
        Self { buf: vec![0], index: 0 }
    }
}

impl DelayLine {
    /// Create a line of `size` samples (at least one)
    pub fn new(size: usize) -> Self {
        let mut line = Self::default();
        line.set(size);
        line
    }

    /// Reallocate to `size` samples (at least one) and clear history
    pub fn set(&mut self, size: usize) {
        self.buf = vec![0; size.max(1)];
        self.index = 0;
    }

    /// Zero the history without resizing
    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|s| *s = 0);
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write cursor
    pub fn index(&self) -> usize {
        self.index
    }

    /// Push `input`, return the sample written `len()` calls ago
    #[inline]
    pub fn process(&mut self, input: i32) -> i32 {
        let output = self.buf[self.index];
        self.buf[self.index] = input;
        self.advance();
        output
    }

    /// Sample at an absolute position, wrapped into range
    #[inline]
    pub fn at(&self, pos: usize) -> i32 {
        self.buf[pos % self.buf.len()]
    }

    /// Overwrite the slot under the write cursor without moving it
    #[inline]
    pub fn write(&mut self, input: i32) {
        self.buf[self.index] = input;
    }

    /// Move the write cursor one slot
    #[inline]
    pub fn advance(&mut self) {
        self.index += 1;
        if self.index >= self.buf.len() {
            self.index = 0;
        }
    }
}

/// Advance a read tap that runs alongside a [`DelayLine`]
#[inline]
pub fn advance_tap(tap: &mut usize, size: usize) {
    *tap += 1;
    if *tap >= size {
        *tap = 0;
    }
}

/// Delay line read at an LFO-modulated fractional position
///
/// The fractional part is resolved with first-order allpass interpolation,
/// which keeps the high end that linear interpolation would dull.
#[derive(Clone, Debug)]
pub struct ModDelay {
    buf: Vec<i32>,
    rindex: usize,
    windex: usize,
    hist: i32,
    ndelay: i32,
    depth: i32,
}

impl Default for ModDelay {
    fn default() -> Self {
        Self {
            buf: vec![0],
            rindex: 0,
            windex: 0,
            hist: 0,
            ndelay: 0,
            depth: 0,
        }
    }
}

impl ModDelay {
    /// Reallocate and clear history
    ///
    /// # Arguments
    /// * `size` - Buffer length, must exceed `ndelay + depth`
    /// * `ndelay` - Shortest delay in samples
    /// * `depth` - Modulation swing in samples
    pub fn set(&mut self, size: usize, ndelay: i32, depth: i32) {
        self.buf = vec![0; size.max(1)];
        self.rindex = 0;
        self.windex = 0;
        self.hist = 0;
        self.ndelay = ndelay.max(0);
        self.depth = depth.max(0);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Step the write cursor and return the interpolated output
    ///
    /// Must be followed by [`ModDelay::write`] for the same sample.
    ///
    /// # Arguments
    /// * `lfoval` - Modulation value, `0..=65536`
    #[inline]
    pub fn read(&mut self, lfoval: i32) -> i32 {
        let size = self.buf.len() as i32;
        self.windex += 1;
        if self.windex >= self.buf.len() {
            self.windex = 0;
        }
        let t1 = self.buf[self.rindex];
        // swing in 1/256 sample steps, `depth` samples at full scale
        let swing = imuldiv8(lfoval, self.depth);
        let r = (self.windex as i32 - self.ndelay - (swing >> 8)).rem_euclid(size);
        self.rindex = r as usize;
        let frac = 0xFF - (swing & 0xFF);
        self.hist = t1 + imuldiv8(self.buf[self.rindex] - self.hist, frac);
        self.hist
    }

    /// Store `input` under the write cursor
    #[inline]
    pub fn write(&mut self, input: i32) {
        self.buf[self.windex] = input;
    }

    /// Read then write one sample
    #[inline]
    pub fn process(&mut self, input: i32, lfoval: i32) -> i32 {
        let output = self.read(lfoval);
        self.write(input);
        output
    }
}

/// Schroeder allpass diffuser
#[derive(Clone, Debug)]
pub struct Allpass {
    buf: Vec<i32>,
    index: usize,
    feedback: i32,
}

impl Default for Allpass {
    fn default() -> Self {
        Self { buf: vec![0], index: 0, feedback: 0 }
    }
}

impl Allpass {
    /// Create a diffuser
    ///
    /// # Arguments
    /// * `size` - Delay in samples (at least one)
    /// * `feedback` - Diffusion coefficient
    pub fn new(size: usize, feedback: f64) -> Self {
        let mut ap = Self::default();
        ap.set(size, feedback);
        ap
    }

    /// Reallocate, set the coefficient and clear history
    pub fn set(&mut self, size: usize, feedback: f64) {
        self.buf = vec![0; size.max(1)];
        self.index = 0;
        self.feedback = fscale(feedback, 24);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn process(&mut self, input: i32) -> i32 {
        let bufout = self.buf[self.index];
        let output = input - imuldiv24(bufout, self.feedback);
        self.buf[self.index] = output;
        self.index += 1;
        if self.index >= self.buf.len() {
            self.index = 0;
        }
        bufout + imuldiv24(output, self.feedback)
    }
}

/// Allpass diffuser whose delay is swept by an LFO (plate reverb tank)
#[derive(Clone, Debug, Default)]
pub struct ModAllpass {
    line: ModDelay,
    feedback: i32,
}

impl ModAllpass {
    /// Reallocate and clear history
    ///
    /// # Arguments
    /// * `ndelay` - Shortest delay in samples
    /// * `depth` - Modulation swing in samples
    /// * `feedback` - Diffusion coefficient
    pub fn set(&mut self, ndelay: i32, depth: i32, feedback: f64) {
        let size = (ndelay.max(0) + depth.max(0) + 1) as usize;
        self.line.set(size, ndelay, depth);
        self.feedback = fscale(feedback, 24);
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    #[inline]
    pub fn process(&mut self, input: i32, lfoval: i32) -> i32 {
        let t3 = input + imuldiv24(self.line.hist, self.feedback);
        let hist = self.line.read(lfoval);
        self.line.write(t3);
        hist - imuldiv24(t3, self.feedback)
    }
}

/// Freeverb lowpass-feedback comb filter
#[derive(Clone, Debug)]
pub struct CombFilter {
    buf: Vec<i32>,
    index: usize,
    filterstore: i32,
    damp1: i32,
    damp2: i32,
    feedback: i32,
}

impl Default for CombFilter {
    fn default() -> Self {
        Self {
            buf: vec![0],
            index: 0,
            filterstore: 0,
            damp1: 0,
            damp2: 0,
            feedback: 0,
        }
    }
}

impl CombFilter {
    /// Resize, keeping damping and feedback. History is cleared.
    pub fn set_size(&mut self, size: usize) {
        self.buf = vec![0; size.max(1)];
        self.index = 0;
        self.filterstore = 0;
    }

    /// Set damping and loop gain
    ///
    /// # Arguments
    /// * `damp` - Weight of the previous filter state, `0.0..1.0`
    /// * `feedback` - Loop gain
    pub fn set_params(&mut self, damp: f64, feedback: f64) {
        self.damp1 = fscale(damp, 24);
        self.damp2 = fscale(1.0 - damp, 24);
        self.feedback = fscale(feedback, 24);
    }

    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|s| *s = 0);
        self.filterstore = 0;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn process(&mut self, input: i32) -> i32 {
        let output = self.buf[self.index];
        self.filterstore = imuldiv24(output, self.damp2) + imuldiv24(self.filterstore, self.damp1);
        self.buf[self.index] = input + imuldiv24(self.filterstore, self.feedback);
        self.index += 1;
        if self.index >= self.buf.len() {
            self.index = 0;
        }
        output
    }
}

/// Freeverb allpass: output is `delayed - input`
#[derive(Clone, Debug)]
pub struct FreeverbAllpass {
    buf: Vec<i32>,
    index: usize,
    feedback: i32,
}

impl Default for FreeverbAllpass {
    fn default() -> Self {
        Self { buf: vec![0], index: 0, feedback: 0 }
    }
}

impl FreeverbAllpass {
    /// Resize, keeping the coefficient. History is cleared.
    pub fn set_size(&mut self, size: usize) {
        self.buf = vec![0; size.max(1)];
        self.index = 0;
    }

    pub fn set_feedback(&mut self, feedback: f64) {
        self.feedback = fscale(feedback, 24);
    }

    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|s| *s = 0);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn process(&mut self, input: i32) -> i32 {
        let bufout = self.buf[self.index];
        self.buf[self.index] = input + imuldiv24(bufout, self.feedback);
        self.index += 1;
        if self.index >= self.buf.len() {
            self.index = 0;
        }
        bufout - input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_line_latency() {
        let mut line = DelayLine::new(3);
        let out: Vec<i32> = [1, 2, 3, 4, 5].iter().map(|&x| line.process(x)).collect();
        assert_eq!(out, vec![0, 0, 0, 1, 2], "output lags input by the line length");
    }

    #[test]
    fn test_delay_line_minimum_size() {
        let mut line = DelayLine::new(0);
        assert_eq!(line.len(), 1, "size is floored at one");
        assert_eq!(line.process(9), 0);
        assert_eq!(line.process(4), 9);
    }

    #[test]
    fn test_delay_line_clear() {
        let mut line = DelayLine::new(2);
        line.process(5);
        line.clear();
        assert_eq!(line.process(0), 0);
        assert_eq!(line.process(0), 0, "history must be gone");
    }

    #[test]
    fn test_allpass_impulse_energy() {
        let mut ap = Allpass::new(5, 0.5);
        let unit = 1 << 20;
        let mut energy = 0.0;
        for n in 0..400 {
            let y = ap.process(if n == 0 { unit } else { 0 }) as f64 / unit as f64;
            energy += y * y;
        }
        assert!((energy - 1.0).abs() < 0.01, "allpass keeps energy, got {}", energy);
    }

    #[test]
    fn test_mod_delay_static_lfo_is_integer_delay() {
        // With zero depth the read tap sits `ndelay` behind the write tap.
        let mut md = ModDelay::default();
        md.set(16, 4, 0);
        let unit = 1 << 20;
        let out: Vec<i32> = (0..12)
            .map(|n| md.process(if n == 0 { unit } else { 0 }, 32768))
            .collect();
        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| v.abs())
            .map(|(i, _)| i)
            .unwrap();
        assert!((4..=6).contains(&peak), "impulse should emerge after ~ndelay samples, got {}", peak);
    }

    #[test]
    fn test_comb_decays() {
        let mut comb = CombFilter::default();
        comb.set_size(7);
        comb.set_params(0.2, 0.7);
        let unit = 1 << 20;
        let mut last_peak = i32::MAX;
        comb.process(unit);
        for _ in 0..6 {
            let mut peak = 0;
            for _ in 0..7 {
                peak = peak.max(comb.process(0).abs());
            }
            assert!(peak <= last_peak, "each pass must be quieter");
            last_peak = peak;
        }
        assert!(last_peak < unit / 2);
    }

    #[test]
    fn test_freeverb_allpass_passes_delayed_minus_input() {
        let mut ap = FreeverbAllpass::default();
        ap.set_size(2);
        ap.set_feedback(0.5);
        assert_eq!(ap.process(100), -100);
        assert_eq!(ap.process(0), 0);
        assert_eq!(ap.process(0), 100, "delayed impulse returns after two samples");
    }
}
