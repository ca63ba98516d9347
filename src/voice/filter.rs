//! Resonant low-pass filter run on each voice before mixing
//!
//! Two designs are available: Chamberlin's two-pole state-variable filter
//! and a four-pole Moog ladder. Coefficients are recomputed lazily, only
//! when the cutoff or resonance moved since the previous block.

use super::{ChannelState, Voice};
use crate::config::VoiceFilterMode;
use crate::fixed::{fscale, imuldiv24, RATE_SHIFT};
use crate::tables::{chamberlin_db_to_q, lookup_triangular};
use std::f64::consts::PI;

/// Chamberlin resonance is limited to keep the two-pole loop stable
const CHAMBERLIN_RESONANCE_MAX: f64 = 24.0;

/// Largest Moog feedback amount
const MOOG_RESONANCE_MAX: f64 = 0.88;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    Off,
    Chamberlin,
    Moog,
}

/// Filter parameters, Q24 coefficients and history
#[derive(Clone, Debug, Default)]
pub struct FilterCoefficients {
    pub kind: FilterKind,
    /// Cutoff in Hz from the sample, before modulation
    pub orig_freq: i32,
    pub orig_reso_db: f64,
    /// Cutoff in Hz for the next block
    pub freq: i32,
    pub last_freq: i32,
    pub reso_db: f64,
    pub last_reso_db: f64,
    pub reso_lin: f64,
    /// Output gain compensating for the resonance peak
    pub gain: f64,
    /// Set once the first block has been filtered
    pub started: bool,
    pub f: i32,
    pub q: i32,
    pub p: i32,
    pub b0: i32,
    pub b1: i32,
    pub b2: i32,
    pub b3: i32,
    pub b4: i32,
}

impl FilterCoefficients {
    /// Fresh filter state for a voice.
    ///
    /// # Arguments
    /// * `mode` - Filter design selected in the configuration
    /// * `cutoff_freq` - Sample cutoff in Hz, 0 disables the filter
    /// * `resonance` - Sample resonance in centibels
    pub fn new(mode: VoiceFilterMode, cutoff_freq: i32, resonance: i16) -> Self {
        let mut fc = FilterCoefficients::default();
        if mode == VoiceFilterMode::Off || cutoff_freq == 0 {
            return fc;
        }
        fc.orig_freq = cutoff_freq;
        fc.orig_reso_db = (resonance as f64 / 10.0 - 3.01).max(0.0);
        match mode {
            VoiceFilterMode::Moog => {
                fc.gain = 1.0;
                fc.kind = FilterKind::Moog;
            }
            VoiceFilterMode::Chamberlin => {
                fc.gain = 10f64.powf(-fc.orig_reso_db / 2.0 / 20.0);
                fc.kind = FilterKind::Chamberlin;
            }
            VoiceFilterMode::Off => {}
        }
        fc
    }

    fn recalc_resonance(&mut self) {
        if self.reso_db != self.last_reso_db || self.q == 0 {
            self.last_reso_db = self.reso_db;
            match self.kind {
                FilterKind::Chamberlin => {
                    self.q = fscale(1.0 / chamberlin_db_to_q(self.reso_db), 24).max(1);
                }
                FilterKind::Moog => {
                    self.reso_lin = (self.reso_db * MOOG_RESONANCE_MAX / 20.0).clamp(0.0, MOOG_RESONANCE_MAX);
                }
                FilterKind::Off => {}
            }
            self.last_freq = -1;
        }
    }

    fn recalc_fc(&mut self, sample_rate: f64) {
        if self.freq == self.last_freq {
            return;
        }
        match self.kind {
            FilterKind::Chamberlin => {
                let f = 2.0 * (PI * self.freq as f64 / sample_rate).sin();
                self.f = fscale(f, 24);
            }
            FilterKind::Moog => {
                let fr = 2.0 * self.freq as f64 / sample_rate;
                let q = 1.0 - fr;
                let p = fr + 0.8 * fr * q;
                let f = p + p - 1.0;
                let q = self.reso_lin * (1.0 + 0.5 * q * (1.0 - q + 5.6 * q * q));
                self.f = fscale(f, 24);
                self.p = fscale(p, 24);
                self.q = fscale(q, 24);
            }
            FilterKind::Off => {}
        }
        self.last_freq = self.freq;
    }

    /// Filter `buf` in place. Returns `false` when the filter is off and the
    /// buffer was left untouched.
    pub fn process(&mut self, buf: &mut [i32], sample_rate: f64) -> bool {
        match self.kind {
            FilterKind::Off => false,
            FilterKind::Chamberlin => {
                self.recalc_resonance();
                self.recalc_fc(sample_rate);
                let (f, q) = (self.f, self.q);
                let (mut b0, mut b1, mut b2) = (self.b0, self.b1, self.b2);
                for s in buf.iter_mut() {
                    b0 += imuldiv24(b2, f);
                    b1 = *s - b0 - imuldiv24(b2, q);
                    b2 += imuldiv24(b1, f);
                    *s = b0;
                }
                self.b0 = b0;
                self.b1 = b1;
                self.b2 = b2;
                true
            }
            FilterKind::Moog => {
                self.recalc_resonance();
                self.recalc_fc(sample_rate);
                let (f, q, p) = (self.f, self.q, self.p);
                let (mut b0, mut b1, mut b2, mut b3, mut b4) = (self.b0, self.b1, self.b2, self.b3, self.b4);
                for s in buf.iter_mut() {
                    let x = *s - imuldiv24(q, b4);
                    let t1 = b1;
                    b1 = imuldiv24(x + b0, p) - imuldiv24(b1, f);
                    let t2 = b2;
                    b2 = imuldiv24(b1 + t1, p) - imuldiv24(b2, f);
                    let t1 = b3;
                    b3 = imuldiv24(b2 + t2, p) - imuldiv24(b3, f);
                    b4 = imuldiv24(b3 + t1, p) - imuldiv24(b4, f);
                    *s = b4;
                    b0 = x;
                }
                self.b0 = b0;
                self.b1 = b1;
                self.b2 = b2;
                self.b3 = b3;
                self.b4 = b4;
                true
            }
        }
    }
}

/// Recompute the voice's cutoff and resonance from velocity, key position,
/// tremolo phase and the modulation envelope.
///
/// # Arguments
/// * `voice` - Voice whose filter is refreshed
/// * `channel` - Channel cutoff and resonance controllers
/// * `sample_rate` - Output rate in Hz
/// * `modulation_envelope` - Whether tremolo and the modulation envelope may move the cutoff
pub fn recompute_voice_filter(voice: &mut Voice, channel: &ChannelState, sample_rate: f64, modulation_envelope: bool) {
    if voice.fc.kind == FilterKind::Off {
        return;
    }
    let sp = voice.sample.clone();
    let mut coef = channel.cutoff_freq_coef;
    let mut reso = 0.0;
    let mut cent = 0.0;

    if sp.vel_to_fc != 0 {
        if voice.velocity > sp.vel_to_fc_threshold as i32 {
            cent += sp.vel_to_fc as f64 * (127 - voice.velocity) as f64 / 127.0;
        } else {
            coef += sp.vel_to_fc as f64 * (127 - sp.vel_to_fc_threshold as i32) as f64 / 127.0;
        }
    }
    if sp.vel_to_resonance != 0 {
        reso += voice.velocity as f64 * sp.vel_to_resonance as f64 / 127.0 / 10.0;
    }
    if sp.key_to_fc != 0 {
        cent += sp.key_to_fc as f64 * (voice.note - sp.key_to_fc_bpo as i32) as f64;
    }

    if modulation_envelope {
        if sp.tremolo_to_fc != 0 {
            cent += sp.tremolo_to_fc as f64 * lookup_triangular(voice.tremolo_phase >> RATE_SHIFT);
        }
        if sp.modenv_to_fc != 0 {
            cent += sp.modenv_to_fc as f64 * voice.last_modenv_volume;
        }
    }

    if cent != 0.0 {
        coef *= 2f64.powf(cent / 1200.0);
    }

    let fc = &mut voice.fc;
    let freq = (fc.orig_freq as f64 * coef).clamp(5.0, sample_rate / 2.0);
    fc.freq = freq as i32;
    fc.reso_db = (fc.orig_reso_db + channel.resonance_db + reso).clamp(0.0, 96.0);

    match fc.kind {
        FilterKind::Chamberlin => {
            let limit = (sample_rate / 6.0) as i32;
            if fc.freq > limit {
                if !fc.started {
                    fc.kind = FilterKind::Off;
                } else {
                    fc.freq = limit;
                }
            }
            if fc.reso_db > CHAMBERLIN_RESONANCE_MAX {
                fc.reso_db = CHAMBERLIN_RESONANCE_MAX;
            }
        }
        FilterKind::Moog => {
            if fc.reso_db > fc.orig_reso_db / 2.0 {
                fc.gain = 10f64.powf((fc.reso_db - fc.orig_reso_db / 2.0) / 20.0);
            }
        }
        FilterKind::Off => {}
    }
    fc.started = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::Sample;
    use std::sync::Arc;

    fn dc_response(kind: VoiceFilterMode) -> i32 {
        let mut fc = FilterCoefficients::new(kind, 1000, 0);
        fc.freq = 1000;
        let mut buf = vec![1 << 20; 4096];
        assert!(fc.process(&mut buf, 44100.0));
        buf[4095]
    }

    #[test]
    fn test_disabled_without_cutoff() {
        let fc = FilterCoefficients::new(VoiceFilterMode::Chamberlin, 0, 100);
        assert_eq!(fc.kind, FilterKind::Off);
        let mut fc = FilterCoefficients::new(VoiceFilterMode::Off, 2000, 100);
        let mut buf = [5, 6, 7];
        assert!(!fc.process(&mut buf, 44100.0), "an off filter must not touch the buffer");
        assert_eq!(buf, [5, 6, 7]);
    }

    #[test]
    fn test_chamberlin_passes_dc() {
        let out = dc_response(VoiceFilterMode::Chamberlin);
        assert!((out - (1 << 20)).abs() < (1 << 12), "low-pass must settle at DC, got {out}");
    }

    #[test]
    fn test_moog_passes_dc() {
        let out = dc_response(VoiceFilterMode::Moog);
        assert!((out - (1 << 20)).abs() < (1 << 14), "ladder must settle at DC, got {out}");
    }

    #[test]
    fn test_chamberlin_turns_off_above_sixth_of_rate() {
        let mut sample = Sample::new(vec![0; 8], 44100, 440.0);
        sample.cutoff_freq = 15000;
        let sample = Arc::new(sample);
        let mut voice = Voice::new(sample.clone(), 0, 60, 100);
        voice.fc = FilterCoefficients::new(VoiceFilterMode::Chamberlin, sample.cutoff_freq, 0);
        recompute_voice_filter(&mut voice, &ChannelState::default(), 44100.0, true);
        assert_eq!(voice.fc.kind, FilterKind::Off, "unstable cutoff disables a filter that has not started");
    }

    #[test]
    fn test_key_follow_raises_cutoff() {
        let mut sample = Sample::new(vec![0; 8], 44100, 440.0);
        sample.cutoff_freq = 1000;
        sample.key_to_fc = 100;
        sample.key_to_fc_bpo = 60;
        let sample = Arc::new(sample);
        let mut voice = Voice::new(sample.clone(), 0, 72, 100);
        voice.fc = FilterCoefficients::new(VoiceFilterMode::Moog, sample.cutoff_freq, 0);
        recompute_voice_filter(&mut voice, &ChannelState::default(), 44100.0, true);
        assert_eq!(voice.fc.freq, 2000, "twelve semitones of key follow at 100 cents each doubles the cutoff");
    }
}
