//! Voice mixer
//!
//! Turns one voice's resampled signal into an interleaved stereo block. The
//! mixer picks one of six routines from the voice's pan mode and whether its
//! envelope or tremolo is moving:
//!
//! | pan mode | moving | static |
//! |---|---|---|
//! | stereo (mystery) | [`VoiceMixer::mix_mystery_signal`] | [`VoiceMixer::mix_mystery`] |
//! | centre | [`VoiceMixer::mix_center_signal`] | [`VoiceMixer::mix_center`] |
//! | hard left / right | [`VoiceMixer::mix_single_signal`] | [`VoiceMixer::mix_single`] |
//!
//! The "signal" routines refresh the envelope every control block. All of
//! them add into the destination; hard-panned voices never write the slot
//! they do not use.

use crate::config::SynthConfig;
use crate::envelope::{update_modulation_envelope, update_signal, update_tremolo, EnvelopeContext};
use crate::fixed::{MAX_DIE_TIME, PAN_DELAY_BUF_MAX};
use crate::resample::{LinearResampler, Resampler};
use crate::utils::smoother::MixRamp;
use crate::voice::{PanMode, SampleModes, Voice, VoiceStatus};

#[inline]
fn mixation(dst: &mut i32, level: i32, s: i32) {
    *dst = dst.saturating_add(level.saturating_mul(s));
}

/// Per-voice pan-delay ring, borrowed from the voice for one routine call
struct PanDelay<'a> {
    buf: &'a mut [i32; PAN_DELAY_BUF_MAX],
    wpt: usize,
    spt: usize,
}

impl<'a> PanDelay<'a> {
    fn new(buf: &'a mut [i32; PAN_DELAY_BUF_MAX], wpt: usize, spt: usize) -> Self {
        Self { buf, wpt, spt }
    }

    /// Add the product queued `rpt` frames ago and queue the new one
    #[inline]
    fn mix(&mut self, dst: &mut i32, level: i32, s: i32) {
        *dst = dst.saturating_add(self.buf[self.spt]);
        self.spt += 1;
        if self.spt == PAN_DELAY_BUF_MAX {
            self.spt = 0;
        }
        self.buf[self.wpt] = level.saturating_mul(s);
        self.wpt += 1;
        if self.wpt == PAN_DELAY_BUF_MAX {
            self.wpt = 0;
        }
    }
}

/// Which side of a stereo voice goes through the pan delay
#[derive(Clone, Copy, PartialEq, Eq)]
enum DelayedSide {
    None,
    Left,
    Right,
}

impl DelayedSide {
    fn of(voice: &Voice) -> Self {
        if voice.pan_delay_rpt == 0 {
            DelayedSide::None
        } else if voice.panning < 64 {
            DelayedSide::Right
        } else {
            DelayedSide::Left
        }
    }
}

/// Write one stereo frame, routing the far side through the pan delay
#[inline]
fn mix_frame(frame: &mut [i32], side: DelayedSide, delay: &mut PanDelay, left: i32, right: i32, s: i32) {
    match side {
        DelayedSide::None => {
            mixation(&mut frame[0], left, s);
            mixation(&mut frame[1], right, s);
        }
        DelayedSide::Right => {
            mixation(&mut frame[0], left, s);
            delay.mix(&mut frame[1], right, s);
        }
        DelayedSide::Left => {
            delay.mix(&mut frame[0], left, s);
            mixation(&mut frame[1], right, s);
        }
    }
}

fn mystery_segment(sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
    let mut left = voice.left_ramp.start(voice.left_mix);
    let mut right = voice.right_ramp.start(voice.right_mix);
    let side = DelayedSide::of(voice);
    let mut delay = PanDelay::new(&mut voice.pan_delay_buf, voice.pan_delay_wpt, voice.pan_delay_spt);

    for (&s, frame) in sp.iter().zip(lp.chunks_exact_mut(2)) {
        mix_frame(frame, side, &mut delay, left, right, s);
        voice.left_ramp.advance(&mut left);
        voice.right_ramp.advance(&mut right);
    }

    let (wpt, spt) = (delay.wpt, delay.spt);
    voice.pan_delay_wpt = wpt;
    voice.pan_delay_spt = spt;
    voice.old_left_mix = left;
    voice.old_right_mix = right;
}

fn center_segment(sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
    let mut left = voice.left_ramp.start(voice.left_mix);
    for (&s, frame) in sp.iter().zip(lp.chunks_exact_mut(2)) {
        mixation(&mut frame[0], left, s);
        mixation(&mut frame[1], left, s);
        voice.left_ramp.advance(&mut left);
    }
    voice.old_left_mix = left;
    voice.old_right_mix = left;
}

/// `lp` starts at the voice's slot; every other sample is skipped
fn single_segment(sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
    let mut left = voice.left_ramp.start(voice.left_mix);
    for (&s, dst) in sp.iter().zip(lp.iter_mut().step_by(2)) {
        mixation(dst, left, s);
        voice.left_ramp.advance(&mut left);
    }
    voice.old_left_mix = left;
}

/// Mixes voices into a stereo block
pub struct VoiceMixer {
    resampler: Box<dyn Resampler>,
    /// Resampled and filtered signal of the voice being mixed
    buffer: Vec<i32>,
    sample_rate: f64,
    control_ratio: i32,
    /// Smoothing window in samples
    window: i32,
}

impl VoiceMixer {
    pub fn new(config: &SynthConfig) -> Self {
        let control_ratio = config.control_ratio as i32;
        Self {
            resampler: Box::new(LinearResampler::new()),
            buffer: vec![0; config.block_size],
            sample_rate: config.rate(),
            control_ratio,
            window: MixRamp::window(config.rate(), control_ratio),
        }
    }

    /// Replace the bundled linear resampler
    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = resampler;
        self
    }

    /// Smoothing window in samples
    pub fn window(&self) -> i32 {
        self.window
    }

    /// Mix `count` frames of `voice` into the interleaved stereo `buf`.
    ///
    /// A dying voice is ramped to silence over at most [`MAX_DIE_TIME`]
    /// samples and freed. A voice whose start is delayed past this block only
    /// has its modulators advanced. A one-shot voice whose sample ran out is
    /// freed after its last samples are mixed.
    ///
    /// # Arguments
    /// * `buf` - Destination of at least `2 * count` samples, added into
    /// * `voice` - Voice to render
    /// * `ctx` - Envelope context for the voice's channel
    /// * `count` - Frames to render
    pub fn mix_voice(&mut self, buf: &mut [i32], voice: &mut Voice, ctx: &EnvelopeContext, count: usize) {
        if voice.is_free() {
            return;
        }
        let mut c = count.min(buf.len() / 2);

        if voice.status == VoiceStatus::Die {
            c = c.min(MAX_DIE_TIME as usize);
            self.prepare(voice, c);
            Self::ramp_out(&self.buffer[..c], buf, voice);
            voice.free();
            return;
        }

        voice.delay_counter = c as i32;
        let mut start = 0;
        if voice.delay > 0 {
            if (c as i32) < voice.delay {
                voice.delay -= c as i32;
                if voice.tremolo_phase_increment != 0 {
                    update_tremolo(voice);
                }
                if ctx.modulation_envelope && voice.sample.modes.contains(SampleModes::ENVELOPE) {
                    update_modulation_envelope(voice, ctx);
                }
                return;
            }
            start = voice.delay as usize * 2;
            c -= voice.delay as usize;
            voice.delay = 0;
        }

        self.prepare(voice, c);
        let sp = &self.buffer[..c];
        let moving = voice.envelope_increment != 0 || voice.tremolo_phase_increment != 0;

        match voice.panned {
            PanMode::Mystery => {
                let lp = &mut buf[start..];
                if moving {
                    self.mix_mystery_signal(sp, lp, voice, ctx);
                } else {
                    self.mix_mystery(sp, lp, voice);
                }
            }
            PanMode::Center => {
                let lp = &mut buf[start..];
                if moving {
                    self.mix_center_signal(sp, lp, voice, ctx);
                } else {
                    self.mix_center(sp, lp, voice);
                }
            }
            PanMode::Left | PanMode::Right => {
                if voice.panned == PanMode::Right {
                    start += 1;
                }
                let lp = &mut buf[start..];
                if moving {
                    self.mix_single_signal(sp, lp, voice, ctx);
                } else {
                    self.mix_single(sp, lp, voice);
                }
            }
        }

        if voice.exhausted && !voice.is_free() {
            voice.free();
        }
    }

    /// Resample `c` frames into the work buffer and run the voice filter
    fn prepare(&mut self, voice: &mut Voice, c: usize) {
        if self.buffer.len() < c {
            self.buffer.resize(c, 0);
        }
        let out = &mut self.buffer[..c];
        self.resampler.resample(voice, out);
        voice.fc.process(out, self.sample_rate);
    }

    /// Fade a cut voice linearly to silence over `sp.len()` samples.
    ///
    /// Stereo voices clamp at zero and keep feeding the pan delay. The other
    /// modes stop writing as soon as the level goes negative.
    pub fn ramp_out(sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
        let c = sp.len() as i32;
        if c == 0 {
            return;
        }
        let mut left = voice.left_mix;
        let mut li = -(left / c);
        if li == 0 {
            li = -1;
        }

        match voice.panned {
            PanMode::Mystery => {
                let mut right = voice.right_mix;
                let ri = -(right / c);
                let side = DelayedSide::of(voice);
                let mut delay = PanDelay::new(&mut voice.pan_delay_buf, voice.pan_delay_wpt, voice.pan_delay_spt);
                for (&s, frame) in sp.iter().zip(lp.chunks_exact_mut(2)) {
                    left = (left + li).max(0);
                    right = (right + ri).max(0);
                    mix_frame(frame, side, &mut delay, left, right, s);
                }
                let (wpt, spt) = (delay.wpt, delay.spt);
                voice.pan_delay_wpt = wpt;
                voice.pan_delay_spt = spt;
            }
            PanMode::Center => {
                for (&s, frame) in sp.iter().zip(lp.chunks_exact_mut(2)) {
                    left += li;
                    if left < 0 {
                        return;
                    }
                    mixation(&mut frame[0], left, s);
                    mixation(&mut frame[1], left, s);
                }
            }
            PanMode::Left | PanMode::Right => {
                let offset = usize::from(voice.panned == PanMode::Right);
                for (&s, dst) in sp.iter().zip(lp[offset..].iter_mut().step_by(2)) {
                    left += li;
                    if left < 0 {
                        return;
                    }
                    mixation(dst, left, s);
                }
            }
        }
    }

    /// Plan both ramps from the previous block's levels to the current targets
    pub fn compute_mix_smoothing(&self, voice: &mut Voice) {
        voice.left_ramp.compute(voice.left_mix, voice.old_left_mix, self.window);
        voice.right_ramp.compute(voice.right_mix, voice.old_right_mix, self.window);
    }

    /// Drive `segment` over `sp` in control-block pieces, refreshing the
    /// envelope between pieces. Stops early if the voice dies.
    fn run_signal(
        &self,
        sp: &[i32],
        lp: &mut [i32],
        voice: &mut Voice,
        ctx: &EnvelopeContext,
        segment: fn(&[i32], &mut [i32], &mut Voice),
    ) {
        let mut cc = voice.control_counter;
        if cc == 0 {
            cc = self.control_ratio;
            if update_signal(voice, ctx) {
                return;
            }
        }
        self.compute_mix_smoothing(voice);

        let mut sp = sp;
        let mut lp = lp;
        loop {
            let count = sp.len();
            if (cc as usize) < count {
                let n = cc as usize;
                let (head, tail) = sp.split_at(n);
                let taken = std::mem::take(&mut lp);
                let split = (n * 2).min(taken.len());
                let (out, rest) = taken.split_at_mut(split);
                segment(head, out, voice);
                sp = tail;
                lp = rest;

                cc = self.control_ratio;
                if update_signal(voice, ctx) {
                    return;
                }
                self.compute_mix_smoothing(voice);
            } else {
                voice.control_counter = cc - count as i32;
                segment(sp, lp, voice);
                return;
            }
        }
    }

    /// Stereo voice with a moving envelope or tremolo
    pub fn mix_mystery_signal(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice, ctx: &EnvelopeContext) {
        self.run_signal(sp, lp, voice, ctx, mystery_segment);
    }

    /// Stereo voice at a steady level
    pub fn mix_mystery(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
        self.compute_mix_smoothing(voice);
        mystery_segment(sp, lp, voice);
    }

    /// Centred voice with a moving envelope or tremolo
    pub fn mix_center_signal(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice, ctx: &EnvelopeContext) {
        self.run_signal(sp, lp, voice, ctx, center_segment);
    }

    /// Centred voice at a steady level
    pub fn mix_center(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
        self.compute_mix_smoothing(voice);
        center_segment(sp, lp, voice);
    }

    /// Hard-panned voice with a moving envelope or tremolo. `lp` starts at
    /// the voice's slot.
    pub fn mix_single_signal(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice, ctx: &EnvelopeContext) {
        self.run_signal(sp, lp, voice, ctx, single_segment);
    }

    /// Hard-panned voice at a steady level
    pub fn mix_single(&self, sp: &[i32], lp: &mut [i32], voice: &mut Voice) {
        self.compute_mix_smoothing(voice);
        single_segment(sp, lp, voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{start_note, DefaultHost, NoteStart};
    use crate::fixed::OFFSET_MAX;
    use crate::voice::{ChannelState, Sample};
    use crate::config::VoiceFilterMode;
    use std::sync::Arc;

    fn config() -> SynthConfig {
        SynthConfig { block_size: 64, ..Default::default() }
    }

    fn context(channel: &ChannelState) -> EnvelopeContext<'_> {
        EnvelopeContext {
            sample_rate: 44100.0,
            control_ratio: 44,
            min_sustain_time: 0,
            modulation_envelope: false,
            channel,
            host: &DefaultHost,
        }
    }

    /// Looping constant-valued voice held at `level` with no ramp pending
    fn steady_voice(panned: PanMode, level: i32) -> Voice {
        let sample = Sample::new(vec![10; 8], 44100, 440.0).with_loop(0, 8);
        let mut voice = Voice::new(Arc::new(sample), 0, 69, 100);
        voice.status = VoiceStatus::On;
        voice.sample_increment = 1 << 12;
        voice.panned = panned;
        voice.panning = match panned {
            PanMode::Left => 0,
            PanMode::Right => 127,
            PanMode::Center => 64,
            PanMode::Mystery => 32,
        };
        voice.left_mix = level;
        voice.right_mix = level;
        voice.old_left_mix = level;
        voice.old_right_mix = level;
        voice
    }

    #[test]
    fn test_center_writes_both_slots() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let mut voice = steady_voice(PanMode::Center, 100);
        let mut buf = vec![0; 16];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 8);
        assert!(buf.iter().all(|&x| x == 1000), "got {buf:?}");
    }

    #[test]
    fn test_hard_pan_skips_other_slot() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());

        let mut left = steady_voice(PanMode::Left, 100);
        let mut buf = vec![7; 8];
        mixer.mix_voice(&mut buf, &mut left, &ctx, 4);
        assert_eq!(buf, vec![1007, 7, 1007, 7, 1007, 7, 1007, 7], "right slot must be left untouched");

        let mut right = steady_voice(PanMode::Right, 100);
        let mut buf = vec![7; 8];
        mixer.mix_voice(&mut buf, &mut right, &ctx, 4);
        assert_eq!(buf, vec![7, 1007, 7, 1007, 7, 1007, 7, 1007]);
    }

    #[test]
    fn test_mixing_is_additive() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let mut a = steady_voice(PanMode::Mystery, 100);
        let mut b = steady_voice(PanMode::Mystery, 50);
        let mut buf = vec![0; 8];
        mixer.mix_voice(&mut buf, &mut a, &ctx, 4);
        mixer.mix_voice(&mut buf, &mut b, &ctx, 4);
        assert!(buf.iter().all(|&x| x == 1500));
    }

    #[test]
    fn test_level_change_ramps_over_window() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let window = mixer.window();
        let mut voice = steady_voice(PanMode::Center, 0);
        voice.left_mix = window * 100;
        let mut buf = vec![0; 64];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 32);
        let levels: Vec<i32> = buf.iter().step_by(2).map(|x| x / 10).collect();
        assert_eq!(levels[0], 100, "first sample takes one step");
        assert_eq!(levels[window as usize - 1], window * 100, "target reached after exactly the window");
        assert!(levels.windows(2).all(|w| w[0] <= w[1]), "ramp must be monotonic");
        assert_eq!(voice.old_left_mix, window * 100);
    }

    #[test]
    fn test_dying_voice_ramps_out_and_frees() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let mut voice = steady_voice(PanMode::Center, 400);
        voice.status = VoiceStatus::Die;
        let mut buf = vec![0; 128];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 64);
        assert!(voice.is_free());
        let written = MAX_DIE_TIME as usize * 2;
        assert!(buf[written..].iter().all(|&x| x == 0), "no more than the die time is written");
        assert_eq!(buf[0], (400 - 20) * 10);
        assert!(buf[..written].windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_delayed_voice_waits() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let mut voice = steady_voice(PanMode::Center, 100);
        voice.delay = 10;
        let mut buf = vec![0; 8];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 4);
        assert!(buf.iter().all(|&x| x == 0));
        assert_eq!(voice.delay, 6);

        let mut buf = vec![0; 16];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 8);
        assert!(buf[..12].iter().all(|&x| x == 0), "start lands partway into the block");
        assert_eq!(buf[12], 1000);
        assert_eq!(voice.delay, 0);
    }

    #[test]
    fn test_exhausted_one_shot_is_freed() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let sample = Sample::new(vec![10; 3], 44100, 440.0);
        let mut voice = steady_voice(PanMode::Center, 100);
        voice.sample = Arc::new(sample);
        let mut buf = vec![0; 16];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 8);
        assert_eq!(&buf[..8], &[1000, 1000, 1000, 1000, 1000, 1000, 0, 0]);
        assert!(voice.is_free(), "a voice out of samples returns to the pool");
    }

    #[test]
    fn test_pan_delay_lags_far_side() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let mut voice = steady_voice(PanMode::Mystery, 100);
        voice.panning = 10;
        voice.init_pan_delay(true, 44100.0);
        voice.delay = 0;
        let rpt = voice.pan_delay_rpt as usize;
        assert!(rpt > 0);
        let mut buf = vec![0; 64];
        mixer.mix_voice(&mut buf, &mut voice, &ctx, 32);
        let right: Vec<i32> = buf.iter().skip(1).step_by(2).copied().collect();
        assert!(right[..rpt].iter().all(|&x| x == 0), "far ear hears nothing for {rpt} frames");
        assert_eq!(right[rpt], 1000);
        assert_eq!(buf[0], 1000, "near ear is not delayed");
    }

    #[test]
    fn test_enveloped_note_rises_from_silence() {
        let channel = ChannelState::default();
        let ctx = context(&channel);
        let mut mixer = VoiceMixer::new(&config());
        let sample = Sample::new(vec![1000; 16], 44100, 440.0).with_loop(0, 16).with_envelope(
            [OFFSET_MAX, OFFSET_MAX / 2, OFFSET_MAX / 2, 0, 0, 0],
            [1 << 22, 1 << 20, 1 << 20, 1 << 22, 1 << 22, 1 << 22],
        );
        let mut voice = Voice::new(Arc::new(sample), 0, 69, 127);
        let start = NoteStart {
            panning: 64,
            master_volume: 1.0,
            effects_active: false,
            pan_delay: false,
            filter: VoiceFilterMode::Off,
        };
        start_note(&mut voice, &ctx, &start);

        let mut first = vec![0; 128];
        mixer.mix_voice(&mut first, &mut voice, &ctx, 64);
        let mut second = vec![0; 128];
        mixer.mix_voice(&mut second, &mut voice, &ctx, 64);
        assert!(first[0] < second[0], "attack must rise: {} then {}", first[0], second[0]);
        assert_ne!(voice.control_counter, 0, "the block ended mid control period");
        assert_eq!(first[0], first[1], "centred voices are symmetric");
    }
}
