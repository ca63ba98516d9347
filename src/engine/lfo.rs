//! Wavetable low frequency oscillator for modulation
//!
//! One waveform cycle is rendered into a `SINE_CYCLE_LENGTH` table when the
//! shape or phase changes; after that each step is a table read. Output is
//! unipolar Q16, `0..=65536`, centred on `32768`.

use crate::fixed::{fscale, imuldiv24, SINE_CYCLE_LENGTH};
use crate::tables::{lookup_sine, lookup_triangular};

/// Slowest rate accepted, in Hz
pub const LFO_MIN_FREQ: f64 = 0.05;

/// LFO waveform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LfoKind {
    Sine,
    Triangular,
    /// Constant mid-scale output
    Flat,
}

/// Low Frequency Oscillator for modulated delays and filters
#[derive(Clone, Debug)]
pub struct Lfo {
    buf: Vec<i32>,
    count: i32,
    cycle: i32,
    icycle: i32,
    freq: f64,
    kind: Option<LfoKind>,
    phase: f64,
}

impl Default for Lfo {
    fn default() -> Self {
        Self {
            buf: vec![0; SINE_CYCLE_LENGTH],
            count: 0,
            cycle: 1,
            icycle: 0,
            freq: LFO_MIN_FREQ,
            kind: None,
            phase: 0.0,
        }
    }
}

impl Lfo {
    /// Create an LFO that is already running
    ///
    /// # Arguments
    /// * `freq` - Rate in Hz, raised to 0.05 Hz if lower
    /// * `kind` - Waveform
    /// * `phase` - Start phase in degrees
    /// * `sample_rate` - Output rate in Hz
    pub fn new(freq: f64, kind: LfoKind, phase: f64, sample_rate: f64) -> Self {
        let mut lfo = Self::default();
        lfo.init(freq, kind, phase, sample_rate);
        lfo
    }

    /// Left and right LFOs, the right one `phase_diff` degrees ahead
    pub fn stereo(freq: f64, kind: LfoKind, phase_diff: f64, sample_rate: f64) -> [Self; 2] {
        [Self::new(freq, kind, 0.0, sample_rate), Self::new(freq, kind, phase_diff, sample_rate)]
    }

    /// Restart the oscillator at a new rate, shape and phase
    ///
    /// The table is only regenerated when the shape or phase changed.
    ///
    /// # Arguments
    /// * `freq` - Rate in Hz, raised to 0.05 Hz if lower
    /// * `kind` - Waveform
    /// * `phase` - Start phase in degrees
    /// * `sample_rate` - Output rate in Hz
    pub fn init(&mut self, freq: f64, kind: LfoKind, phase: f64, sample_rate: f64) {
        self.count = 0;
        self.freq = freq.max(LFO_MIN_FREQ);
        self.cycle = ((sample_rate / self.freq) as i32).max(1);
        let step = (SINE_CYCLE_LENGTH - 1) as f64 / self.cycle as f64;
        self.icycle = (step * (1u64 << 24) as f64 - 0.5) as i32;

        if self.kind != Some(kind) || self.phase != phase {
            let diff = (SINE_CYCLE_LENGTH as f64 * phase / 360.0) as i32;
            for (i, slot) in self.buf.iter_mut().enumerate() {
                let i = i as i32 + diff;
                let unipolar = match kind {
                    LfoKind::Sine => (lookup_sine(i) + 1.0) / 2.0,
                    LfoKind::Triangular => (lookup_triangular(i) + 1.0) / 2.0,
                    LfoKind::Flat => 0.5,
                };
                *slot = fscale(unipolar, 16);
            }
        }
        self.kind = Some(kind);
        self.phase = phase;
    }

    /// Current rate in Hz
    pub fn frequency(&self) -> f64 {
        self.freq
    }

    /// Samples per cycle
    pub fn cycle(&self) -> i32 {
        self.cycle
    }

    /// Next modulation value, `0..=65536`
    #[inline]
    pub fn next(&mut self) -> i32 {
        let index = (imuldiv24(self.count, self.icycle) as usize).min(SINE_CYCLE_LENGTH - 1);
        let val = self.buf[index];
        self.count += 1;
        if self.count >= self.cycle {
            self.count = 0;
        }
        val
    }

    /// Rewind to the start of the cycle
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
