//! Click-free level changes for voice output
//!
//! When a voice's target mix level jumps, the mixer does not step to it.
//! It walks there linearly over a short window: a ~20 ms window when the
//! jump is large, or one unit per sample when the jump is smaller than the
//! window. [`MixRamp`] holds the per-sample increment and the remaining
//! distance (offset) for one output side.

use crate::fixed::MAX_AMP_VALUE;

/// Ramp window length used to spread level changes
pub const SMOOTH_TIME_MS: f64 = 20.0;

/// Linear ramp from the previous block's level to a new target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MixRamp {
    /// Distance still to travel, always a multiple of `inc` and of opposite sign
    pub offset: i32,
    /// Per-sample step
    pub inc: i32,
}

impl MixRamp {
    /// Window length in samples for a given output rate and control ratio
    ///
    /// # Arguments
    /// * `sample_rate` - Output rate in Hz
    /// * `control_ratio` - Samples per control block
    pub fn window(sample_rate: f64, control_ratio: i32) -> i32 {
        ((sample_rate * SMOOTH_TIME_MS / 1000.0) / control_ratio.max(1) as f64) as i32
    }

    /// Plan a ramp from `old` to `target`. A zero jump keeps the current plan.
    ///
    /// # Arguments
    /// * `target` - Level the ramp must end on
    /// * `old` - Level heard at the end of the previous block
    /// * `window` - Longest ramp in samples, see [`MixRamp::window`]
    pub fn compute(&mut self, target: i32, old: i32, window: i32) {
        let delta = target - old;
        if window > 0 && delta.abs() > window {
            self.inc = delta / window;
            self.offset = self.inc * (1 - window);
        } else if delta != 0 {
            self.inc = delta.signum();
            self.offset = self.inc - delta;
        }
    }

    /// Whether samples are still being blended
    #[inline]
    pub fn is_active(&self) -> bool {
        self.offset != 0
    }

    /// First level of a segment whose target is `level`
    #[inline]
    pub fn start(&mut self, level: i32) -> i32 {
        let mut linear = level;
        if self.offset != 0 {
            linear += self.offset;
            if linear > MAX_AMP_VALUE {
                linear = MAX_AMP_VALUE;
                self.offset = 0;
            }
        }
        linear
    }

    /// Step `linear` one sample along the ramp
    #[inline]
    pub fn advance(&mut self, linear: &mut i32) {
        if self.offset != 0 {
            self.offset += self.inc;
            *linear += self.inc;
            if *linear > MAX_AMP_VALUE {
                *linear = MAX_AMP_VALUE;
                self.offset = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(ramp: &mut MixRamp, target: i32, samples: usize) -> Vec<i32> {
        let mut linear = ramp.start(target);
        let mut out = Vec::with_capacity(samples);
        for _ in 0..samples {
            out.push(linear);
            ramp.advance(&mut linear);
        }
        out
    }

    #[test]
    fn test_window_at_cd_rate() {
        assert_eq!(MixRamp::window(44100.0, 44), 20);
        assert_eq!(MixRamp::window(48000.0, 1), 960);
    }

    #[test]
    fn test_large_jump_spans_window() {
        let mut ramp = MixRamp::default();
        ramp.compute(2000, 0, 20);
        assert_eq!(ramp.inc, 100);
        let out = levels(&mut ramp, 2000, 25);
        assert_eq!(out[0], 100, "first sample moves one step");
        assert_eq!(out[18], 1900);
        assert_eq!(out[19], 2000, "target reached on the window's last sample");
        assert!(out[19..].iter().all(|&l| l == 2000));
    }

    #[test]
    fn test_small_jump_steps_by_one() {
        let mut ramp = MixRamp::default();
        ramp.compute(95, 100, 20);
        let out = levels(&mut ramp, 95, 8);
        assert_eq!(out, vec![99, 98, 97, 96, 95, 95, 95, 95]);
        assert!(!ramp.is_active());
    }

    #[test]
    fn test_zero_jump_keeps_plan() {
        let mut ramp = MixRamp { offset: -3, inc: 1 };
        ramp.compute(50, 50, 20);
        assert_eq!(ramp, MixRamp { offset: -3, inc: 1 });
    }

    #[test]
    fn test_ramp_clamps_at_max_amp() {
        let mut ramp = MixRamp { offset: 10, inc: -1 };
        assert_eq!(ramp.start(MAX_AMP_VALUE), MAX_AMP_VALUE);
        assert!(!ramp.is_active(), "clamping ends the ramp");
    }
}
