//! Overdrive and distortion stages
//!
//! Every variant splits the input with a 500 Hz ladder, drives the high
//! band through a [`Waveshaper`], smooths it with an anti-aliasing biquad
//! and adds the low band back.

use super::params::{GsInsertion, XgEffect};
use super::waveshaper::Waveshaper;
use super::{EffectContext, EffectStage};
use crate::filters::{Biquad, Moog};
use crate::fixed::{clip_int, fscale, imuldiv24, imuldiv8};
use crate::tables::EQ_FREQ_TABLE_XG;

/// Drive multiplier at full GS drive, on top of unity
const OD_DRIVE_GS: f64 = 4.0;
/// Output trim applied to GS overdrive levels
const OD_LEVEL_GS: f64 = 0.5;
/// Crossover between the clean and driven bands
const SPLIT_FREQ: i32 = 500;

/// Waveshaper gain for a 0..127 drive parameter
#[inline]
pub fn gs_drive(val: i32) -> f64 {
    OD_DRIVE_GS * val as f64 / 127.0 + 1.0
}

/// Pan a mono sample to the left output, `pan` in `0..=127`
#[inline]
pub fn left_panning(sample: i32, pan: i32) -> i32 {
    imuldiv8(sample, 256 - pan - pan)
}

/// Pan a mono sample to the right output
#[inline]
pub fn right_panning(sample: i32, pan: i32) -> i32 {
    imuldiv8(sample, pan + pan)
}

fn amp_simulator(amp_sw: i32, amp_type: i32) -> Waveshaper {
    if amp_sw == 1 && amp_type <= 3 {
        Waveshaper::Soft2
    } else {
        Waveshaper::Bypass
    }
}

fn splitter(ctx: &EffectContext) -> Moog {
    let mut svf = Moog::new(SPLIT_FREQ, 0.0);
    svf.calc(ctx.sample_rate);
    svf
}

/// GS Overdrive and Distortion: mono in, panned out
pub struct Overdrive1 {
    shaper: Waveshaper,
    pub drive: i32,
    pub amp_type: i32,
    pub amp_sw: i32,
    pub pan: i32,
    pub level: f64,
    amp_sim: Waveshaper,
    di: i32,
    leveli: i32,
    svf: Moog,
    lpf1: Biquad,
}

impl Overdrive1 {
    /// # Arguments
    /// * `shaper` - `Soft1` for overdrive, `Hard` for distortion
    pub fn new(shaper: Waveshaper) -> Self {
        Self {
            shaper,
            drive: 0,
            amp_type: 0,
            amp_sw: 0,
            pan: 0x40,
            level: 1.0,
            amp_sim: Waveshaper::Bypass,
            di: 0,
            leveli: 0,
            svf: Moog::default(),
            lpf1: Biquad::default(),
        }
    }
}

impl EffectStage for Overdrive1 {
    fn conv_gs(&mut self, params: &GsInsertion) {
        self.drive = params.p(0);
        self.amp_type = params.p(1);
        self.amp_sw = params.p(2);
        self.pan = params.p(18);
        self.level = params.p(19) as f64 / 127.0;
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.svf = splitter(ctx);
        self.amp_sim = amp_simulator(self.amp_sw, self.amp_type);
        self.di = fscale(gs_drive(self.drive), 24);
        self.leveli = fscale(self.level * OD_LEVEL_GS, 24);
        self.lpf1 = Biquad::lowpass(8000.0, ctx.sample_rate);
    }

    fn process(&mut self, buf: &mut [i32]) {
        let unity = fscale(1.0, 24);
        for frame in buf.chunks_exact_mut(2) {
            let input = self.amp_sim.apply((frame[0] >> 1) + (frame[1] >> 1), unity);
            let (low, high) = self.svf.process(input);
            let high = self.shaper.apply(high, self.di);
            let high = self.lpf1.process(high, 0);
            let out = imuldiv24(high.saturating_add(low), self.leveli);
            frame[0] = left_panning(out, self.pan);
            frame[1] = right_panning(out, self.pan);
        }
    }
}

#[derive(Clone, Debug, Default)]
struct OdSide {
    kind: i32,
    drive: i32,
    amp_type: i32,
    amp_sw: i32,
    pan: i32,
    level: f64,
    amp_sim: Waveshaper,
    shaper: Waveshaper,
    di: i32,
    leveli: i32,
    svf: Moog,
}

impl OdSide {
    fn init(&mut self, ctx: &EffectContext) {
        self.svf = splitter(ctx);
        self.amp_sim = amp_simulator(self.amp_sw, self.amp_type);
        self.shaper = if self.kind == 0 { Waveshaper::Soft1 } else { Waveshaper::Hard };
        self.di = fscale(gs_drive(self.drive), 24);
        self.leveli = fscale(self.level * OD_LEVEL_GS, 24);
    }

    #[inline]
    fn process(&mut self, input: i32, lpf: &mut Biquad, ch: usize) -> i32 {
        let input = self.amp_sim.apply(input, fscale(1.0, 24));
        let (low, high) = self.svf.process(input);
        let high = lpf.process(self.shaper.apply(high, self.di), ch);
        imuldiv24(high.saturating_add(low), self.leveli)
    }
}

/// GS OD1/OD2: independent overdrive per input side, mixed by pan
#[derive(Default)]
pub struct DualOd {
    left: OdSide,
    right: OdSide,
    pub level: f64,
    lpf1: Biquad,
}

impl EffectStage for DualOd {
    fn conv_gs(&mut self, params: &GsInsertion) {
        let p = |i| params.p(i);
        self.left.kind = p(0);
        self.left.drive = p(1);
        self.left.amp_type = p(2);
        self.left.amp_sw = p(3);
        self.right.kind = p(5);
        self.right.drive = p(6);
        self.right.amp_type = p(7);
        self.right.amp_sw = p(8);
        self.left.pan = p(15);
        self.left.level = p(16) as f64 / 127.0;
        self.right.pan = p(17);
        self.right.level = p(18) as f64 / 127.0;
        self.level = p(19) as f64 / 127.0;
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.left.init(ctx);
        self.right.init(ctx);
        self.lpf1 = Biquad::lowpass(8000.0, ctx.sample_rate);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            let inl = self.left.process(frame[0], &mut self.lpf1, 0);
            let inr = self.right.process(frame[1], &mut self.lpf1, 1);
            let (panl, panr) = (self.left.pan, self.right.pan);
            frame[0] = left_panning(inl, panl) + left_panning(inr, panr);
            frame[1] = right_panning(inl, panl) + right_panning(inr, panr);
        }
    }
}

/// XG Stereo Overdrive, Stereo Distortion and Amp Simulator
pub struct StereoOd {
    pub shaper: Waveshaper,
    /// Drive parameter, 0..127
    pub drive: i32,
    pub cutoff: f64,
    pub level: f64,
    pub dry: f64,
    pub wet: f64,
    di: i32,
    weti: i32,
    dryi: i32,
    svfl: Moog,
    svfr: Moog,
    lpf1: Biquad,
}

impl StereoOd {
    pub fn new(shaper: Waveshaper) -> Self {
        Self {
            shaper,
            drive: 0,
            cutoff: 0.0,
            level: 1.0,
            dry: 0.0,
            wet: 1.0,
            di: 0,
            weti: 0,
            dryi: 0,
            svfl: Moog::default(),
            svfr: Moog::default(),
            lpf1: Biquad::default(),
        }
    }
}

impl EffectStage for StereoOd {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.drive = params.l(0);
        // the amp simulator packs its controls one slot earlier
        let (cutoff, level) = match self.shaper {
            Waveshaper::Soft2 => (params.l(2), params.l(3)),
            _ => (params.l(3), params.l(4)),
        };
        self.cutoff = EQ_FREQ_TABLE_XG[clip_int(cutoff, 34, 60) as usize];
        self.level = level as f64 / 127.0;
        self.dry = params.calc_dry(params.l(9));
        self.wet = params.calc_wet(params.l(9));
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.svfl = splitter(ctx);
        self.svfr = splitter(ctx);
        self.lpf1 = Biquad::lowpass(self.cutoff, ctx.sample_rate);
        self.weti = fscale(self.wet * self.level, 24);
        self.dryi = fscale(self.dry * self.level, 24);
        self.di = fscale(gs_drive(self.drive), 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            for (ch, svf) in [&mut self.svfl, &mut self.svfr].into_iter().enumerate() {
                let input = frame[ch];
                let (low, high) = svf.process(input);
                let high = self.lpf1.process(self.shaper.apply(high, self.di), ch);
                frame[ch] = imuldiv24(high.saturating_add(low), self.weti) + imuldiv24(input, self.dryi);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::params::XgConnection;

    fn ctx() -> EffectContext {
        EffectContext::new(44100.0)
    }

    #[test]
    fn test_panning_law() {
        assert_eq!(left_panning(1000, 0), 1000, "hard left keeps the full sample");
        assert_eq!(right_panning(1000, 0), 0);
        assert_eq!(left_panning(1000, 64), 500, "centre gives half to each side");
        assert_eq!(right_panning(1000, 64), 500);
    }

    #[test]
    fn test_overdrive_silence_in_silence_out() {
        let mut od = Overdrive1::new(Waveshaper::Soft1);
        let mut gs = GsInsertion { type_msb: 0x01, type_lsb: 0x10, ..Default::default() };
        gs.load_preset();
        od.conv_gs(&gs);
        od.init(&ctx());
        let mut buf = vec![0; 256];
        od.process(&mut buf);
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_overdrive_centre_pan_is_balanced() {
        let mut od = Overdrive1::new(Waveshaper::Hard);
        let mut gs = GsInsertion { type_msb: 0x01, type_lsb: 0x11, ..Default::default() };
        gs.load_preset();
        gs.parameter[18] = 0x40;
        od.conv_gs(&gs);
        od.init(&ctx());
        let mut buf: Vec<i32> = (0..512).map(|i| ((i as f64 * 0.05).sin() * (1 << 24) as f64) as i32).collect();
        od.process(&mut buf);
        for frame in buf.chunks_exact(2) {
            assert!((frame[0] - frame[1]).abs() <= 1, "centre pan must give equal sides");
        }
        assert!(buf.iter().any(|&s| s != 0), "signal passes through");
    }

    #[test]
    fn test_stereo_od_amp_sim_reads_shifted_controls() {
        let mut fx = XgEffect::with_type(0x4B, XgConnection::Insertion);
        fx.load_preset();
        let mut amp = StereoOd::new(Waveshaper::Soft2);
        amp.conv_xg(&fx);
        assert_eq!(amp.cutoff, EQ_FREQ_TABLE_XG[48]);
        assert!((amp.level - 55.0 / 127.0).abs() < 1e-12);
        assert_eq!(amp.dry, 0.0, "dry/wet 127 is fully wet");
    }

    #[test]
    fn test_dual_od_sides_are_independent() {
        let mut od = DualOd::default();
        let mut gs = GsInsertion { type_msb: 0x11, type_lsb: 0x03, ..Default::default() };
        gs.load_preset();
        gs.parameter[15] = 0;
        gs.parameter[17] = 127;
        od.conv_gs(&gs);
        od.init(&ctx());
        let mut buf: Vec<i32> = (0..256).map(|i| if i % 2 == 0 { 1 << 22 } else { 0 }).collect();
        od.process(&mut buf);
        let right: i64 = buf.iter().skip(1).step_by(2).map(|&s| (s as i64).abs()).sum();
        assert!(right < 256, "left input panned hard left stays off the right side, got {}", right);
    }
}
