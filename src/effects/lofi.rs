//! Bit-reduction effects: GS Lo-Fi 1, GS Lo-Fi 2 and XG Lo-Fi
//!
//! The crusher rounds by adding half a step before masking off the low bits.
//! Lo-Fi 2 follows the crusher with an optional low- or high-pass, XG Lo-Fi
//! with a sample-rate emulation low-pass and a resonant tone filter.

use super::params::{calc_dry_gs, calc_wet_gs, GsInsertion, XgEffect};
use super::{EffectContext, EffectStage};
use crate::filters::{Biquad, BiquadKind};
use crate::fixed::{clip_int, fscale, imuldiv24, GUARD_BITS};
use crate::tables::{CUTOFF_FREQ_TABLE_GS, EQ_FREQ_TABLE_XG, LOFI_SAMPLING_FREQ_TABLE_XG};

/// Mask and rounding offset for a crusher that drops `bits` low bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitCrusher {
    mask: i32,
    level_shift: i32,
}

impl Default for BitCrusher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BitCrusher {
    pub fn new(bits: u32) -> Self {
        let mask = (!0i32).checked_shl(bits).unwrap_or(0);
        Self { mask, level_shift: !mask >> 1 }
    }

    #[inline]
    pub fn apply(&self, x: i32) -> i32 {
        x.saturating_add(self.level_shift) & self.mask
    }
}

/// GS Lo-Fi 1: crusher only
pub struct Lofi1 {
    pub pre_filter: i32,
    /// Quantisation depth 1..=9, each step drops two more bits
    pub lofi_type: i32,
    pub post_filter: i32,
    pub dry: f64,
    pub wet: f64,
    pub level: f64,
    crusher: BitCrusher,
    dryi: i32,
    weti: i32,
}

impl Default for Lofi1 {
    fn default() -> Self {
        Self {
            pre_filter: 0,
            lofi_type: 1,
            post_filter: 0,
            dry: 0.0,
            wet: 1.0,
            level: 1.0,
            crusher: BitCrusher::default(),
            dryi: 0,
            weti: 0,
        }
    }
}

impl EffectStage for Lofi1 {
    fn conv_gs(&mut self, params: &GsInsertion) {
        self.pre_filter = params.p(0);
        self.lofi_type = 1 + clip_int(params.p(1), 0, 8);
        self.post_filter = params.p(2);
        self.dry = calc_dry_gs(params.p(15) & 0x7f);
        self.wet = calc_wet_gs(params.p(15) & 0x7f);
        self.level = (params.p(19) & 0x7f) as f64 / 127.0;
    }

    fn init(&mut self, _ctx: &EffectContext) {
        self.crusher = BitCrusher::new(self.lofi_type as u32 * 2);
        self.dryi = fscale(self.dry * self.level, 24);
        self.weti = fscale(self.wet * self.level, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for x in buf.iter_mut() {
            let y = self.crusher.apply(*x);
            *x = imuldiv24(*x, self.dryi).saturating_add(imuldiv24(y, self.weti));
        }
    }
}

/// GS Lo-Fi 2: crusher followed by a selectable tone filter
///
/// The radio, record and hum noise sources are not generated; their
/// levels are still decoded so a preset round-trips.
pub struct Lofi2 {
    pub lofi_type: i32,
    /// 0 = off, 1 = low-pass, 2 = high-pass
    pub fil_type: i32,
    pub rnz_lev: f64,
    pub discnz_lev: f64,
    pub hum_level: f64,
    pub dry: f64,
    pub wet: f64,
    pub level: f64,
    fil: Biquad,
    crusher: BitCrusher,
    dryi: i32,
    weti: i32,
}

impl Default for Lofi2 {
    fn default() -> Self {
        Self {
            lofi_type: 1,
            fil_type: 0,
            rnz_lev: 0.0,
            discnz_lev: 0.0,
            hum_level: 0.0,
            dry: 0.0,
            wet: 1.0,
            level: 1.0,
            fil: Biquad::default(),
            crusher: BitCrusher::default(),
            dryi: 0,
            weti: 0,
        }
    }
}

impl EffectStage for Lofi2 {
    fn conv_gs(&mut self, params: &GsInsertion) {
        self.lofi_type = 1 + clip_int(params.p(0), 0, 5);
        self.fil_type = clip_int(params.p(1), 0, 2);
        self.fil.freq = CUTOFF_FREQ_TABLE_GS[clip_int(params.p(2), 0, 127) as usize];
        self.rnz_lev = params.p(4) as f64 / 127.0;
        self.discnz_lev = params.p(10) as f64 / 127.0;
        self.hum_level = params.p(13) as f64 / 127.0;
        self.dry = calc_dry_gs(params.p(15) & 0x7f);
        self.wet = calc_wet_gs(params.p(15) & 0x7f);
        self.level = (params.p(19) & 0x7f) as f64 / 127.0;
    }

    fn init(&mut self, ctx: &EffectContext) {
        let freq = match self.fil_type {
            1 => {
                self.fil.kind = BiquadKind::Lowpass;
                self.fil.freq
            }
            2 => {
                self.fil.kind = BiquadKind::Highpass;
                self.fil.freq
            }
            _ => -1.0,
        };
        self.fil.set(freq, 1.0, ctx.sample_rate);
        self.crusher = BitCrusher::new(self.lofi_type as u32 * 2);
        self.dryi = fscale(self.dry * self.level, 24);
        self.weti = fscale(self.wet * self.level, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            for (ch, x) in frame.iter_mut().enumerate() {
                let y = self.fil.process(self.crusher.apply(*x), ch);
                *x = imuldiv24(*x, self.dryi).saturating_add(imuldiv24(y, self.weti));
            }
        }
    }
}

/// XG Lo-Fi: crusher, sample-rate emulation low-pass, resonant low-pass
pub struct XgLofi {
    pub word_length: i32,
    /// Output gain in dB, 0..=18
    pub output_gain: i32,
    pub filter_type: i32,
    pub bit_assign: i32,
    pub emphasis: i32,
    pub dry: f64,
    pub wet: f64,
    srf: Biquad,
    lpf: Biquad,
    crusher: BitCrusher,
    dryi: i32,
    weti: i32,
}

impl Default for XgLofi {
    fn default() -> Self {
        Self {
            word_length: 0,
            output_gain: 0,
            filter_type: 0,
            bit_assign: 0,
            emphasis: 0,
            dry: 0.0,
            wet: 1.0,
            srf: Biquad::default(),
            lpf: Biquad::default(),
            crusher: BitCrusher::default(),
            dryi: 0,
            weti: 0,
        }
    }
}

impl EffectStage for XgLofi {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.srf.freq = LOFI_SAMPLING_FREQ_TABLE_XG[clip_int(params.l(0), 0, 127) as usize] / 2.0;
        self.word_length = params.l(1);
        self.output_gain = clip_int(params.l(2), 0, 18);
        self.lpf.freq = EQ_FREQ_TABLE_XG[clip_int(params.l(3), 10, 80) as usize];
        self.filter_type = params.l(4);
        self.lpf.q = clip_int(params.l(5), 10, 120) as f64 / 10.0;
        self.bit_assign = clip_int(params.l(6), 0, 6);
        self.emphasis = params.l(7);
        self.dry = params.calc_dry(params.l(9));
        self.wet = params.calc_wet(params.l(9));
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.srf.set(self.srf.freq, 1.0, ctx.sample_rate);
        self.lpf.calc(ctx.sample_rate);
        self.crusher = BitCrusher::new((self.bit_assign + 22 - GUARD_BITS) as u32);
        let gain = 10f64.powf(self.output_gain as f64 / 20.0);
        self.dryi = fscale(self.dry * gain, 24);
        self.weti = fscale(self.wet * gain, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            for (ch, x) in frame.iter_mut().enumerate() {
                let y = self.crusher.apply(*x);
                let y = self.lpf.process(self.srf.process(y, ch), ch);
                *x = imuldiv24(*x, self.dryi).saturating_add(imuldiv24(y, self.weti));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EffectContext {
        EffectContext::new(44100.0)
    }

    #[test]
    fn test_crusher_rounds_to_step() {
        let crusher = BitCrusher::new(4);
        assert_eq!(crusher.apply(0x17), 0x10, "below half a step rounds down");
        assert_eq!(crusher.apply(0x19), 0x20, "above half a step rounds up");
        assert_eq!(crusher.apply(-1), 0);
    }

    #[test]
    fn test_crusher_zero_bits_is_identity() {
        let crusher = BitCrusher::new(0);
        assert_eq!(crusher.apply(12345), 12345);
        assert_eq!(crusher.apply(-12345), -12345);
    }

    #[test]
    fn test_lofi1_quantises_wet_signal() {
        let mut params = GsInsertion::default();
        params.parameter[1] = 4;
        params.parameter[15] = 127;
        params.parameter[19] = 127;
        let mut lofi = Lofi1::default();
        lofi.conv_gs(&params);
        assert_eq!(lofi.lofi_type, 5);
        lofi.init(&ctx());

        let mut buf = [0x3ff, -0x3ff, 0x123, 0x7ff];
        lofi.process(&mut buf);
        for x in buf {
            assert_eq!(x & 0x3ff, 0, "ten low bits are dropped, got {x:#x}");
        }
    }

    #[test]
    fn test_lofi2_off_filter_bypasses() {
        let mut lofi = Lofi2 { fil_type: 0, ..Default::default() };
        lofi.init(&ctx());
        let mut buf = [1 << 20, 1 << 20];
        lofi.process(&mut buf);
        assert_eq!(buf, [1 << 20, 1 << 20], "no filter and a coarse-aligned input is unchanged");
    }

    #[test]
    fn test_xg_lofi_output_gain_boosts() {
        let mut lofi = XgLofi { output_gain: 6, dry: 1.0, wet: 0.0, ..Default::default() };
        lofi.init(&ctx());
        let mut buf = [1 << 20, 0];
        lofi.process(&mut buf);
        let expected = (1 << 20) as f64 * 10f64.powf(0.3);
        assert!((buf[0] as f64 - expected).abs() < 16.0, "6 dB nearly doubles the dry path, got {}", buf[0]);
    }
}
