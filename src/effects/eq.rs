//! Shelving and peaking EQ stages
//!
//! The same two- and three-band engines run standalone and as the built-in
//! EQ at the end of the XG delay, chorus, overdrive and auto wah chains.
//! The owning [`EffectType`] decides which parameters feed them.

use super::params::{GsInsertion, XgEffect};
use super::{EffectContext, EffectStage, EffectType};
use crate::filters::{Peaking, ShelfKind, Shelving};
use crate::fixed::{clip_int, fscale, imuldiv24};
use crate::tables::{EQ_FREQ_TABLE_GS, EQ_FREQ_TABLE_XG};

/// Q per GS Stereo-EQ mid band setting
const EQ_Q_TABLE_GS: [f64; 5] = [0.5, 1.0, 2.0, 4.0, 9.0];

#[inline]
fn gain(val: i32) -> i32 {
    clip_int(val - 64, -12, 12)
}

#[inline]
fn low_freq_xg(val: i32) -> f64 {
    EQ_FREQ_TABLE_XG[clip_int(val, 4, 40) as usize]
}

#[inline]
fn mid_freq_xg(val: i32) -> f64 {
    EQ_FREQ_TABLE_XG[clip_int(val, 14, 54) as usize]
}

#[inline]
fn high_freq_xg(val: i32) -> f64 {
    EQ_FREQ_TABLE_XG[clip_int(val, 28, 58) as usize]
}

#[inline]
fn width(val: i32) -> f64 {
    clip_int(val, 10, 120) as f64 / 10.0
}

/// Low and high shelf
pub struct Eq2 {
    kind: EffectType,
    pub low_freq: f64,
    pub high_freq: f64,
    pub low_gain: i32,
    pub high_gain: i32,
    lsf: Shelving,
    hsf: Shelving,
}

impl Eq2 {
    pub fn new(kind: EffectType) -> Self {
        Self {
            kind,
            low_freq: 0.0,
            high_freq: 0.0,
            low_gain: 0,
            high_gain: 0,
            lsf: Shelving::new(ShelfKind::Low),
            hsf: Shelving::new(ShelfKind::High),
        }
    }
}

impl EffectStage for Eq2 {
    fn conv_gs(&mut self, params: &GsInsertion) {
        self.high_freq = 4000.0;
        self.high_gain = clip_int(params.p(16) - 0x40, -12, 12);
        self.low_freq = 400.0;
        self.low_gain = clip_int(params.p(17) - 0x40, -12, 12);
    }

    fn conv_xg(&mut self, params: &XgEffect) {
        // first parameter of the four-value low/high block
        let base = match self.kind {
            EffectType::DelayEq2 => 12,
            EffectType::AutoWahEq2 => 5,
            _ => 0,
        };
        self.low_freq = low_freq_xg(params.l(base));
        self.low_gain = gain(params.l(base + 1));
        self.high_freq = high_freq_xg(params.l(base + 2));
        self.high_gain = gain(params.l(base + 3));
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.lsf.set(self.low_freq, self.low_gain as f64, 0.0, ctx.sample_rate);
        self.hsf.set(self.high_freq, self.high_gain as f64, 0.0, ctx.sample_rate);
    }

    fn process(&mut self, buf: &mut [i32]) {
        if self.low_gain != 0 {
            self.lsf.process_stereo(buf);
        }
        if self.high_gain != 0 {
            self.hsf.process_stereo(buf);
        }
    }
}

/// Low and high shelf plus one peaking band
pub struct Eq3 {
    kind: EffectType,
    pub low_freq: f64,
    pub high_freq: f64,
    pub mid_freq: f64,
    pub low_gain: i32,
    pub high_gain: i32,
    pub mid_gain: i32,
    /// Peak width in octaves-ish units; Q is its reciprocal
    pub mid_width: f64,
    lsf: Shelving,
    hsf: Shelving,
    peak: Peaking,
}

impl Eq3 {
    pub fn new(kind: EffectType) -> Self {
        Self {
            kind,
            low_freq: 0.0,
            high_freq: 0.0,
            mid_freq: 0.0,
            low_gain: 0,
            high_gain: 0,
            mid_gain: 0,
            mid_width: 1.0,
            lsf: Shelving::new(ShelfKind::Low),
            hsf: Shelving::new(ShelfKind::High),
            peak: Peaking::default(),
        }
    }
}

impl EffectStage for Eq3 {
    fn conv_xg(&mut self, params: &XgEffect) {
        let l = |i| params.l(i);
        match self.kind {
            EffectType::ChorusEq3 => {
                self.low_freq = low_freq_xg(l(5));
                self.low_gain = gain(l(6));
                self.high_freq = high_freq_xg(l(7));
                self.high_gain = gain(l(8));
                self.mid_freq = mid_freq_xg(l(10));
                self.mid_gain = gain(l(11));
                self.mid_width = width(l(12));
            }
            EffectType::OdEq3 => {
                self.low_freq = low_freq_xg(l(1));
                self.low_gain = gain(l(2));
                self.mid_freq = mid_freq_xg(l(6));
                self.mid_gain = gain(l(7));
                self.mid_width = width(l(8));
                self.high_freq = 0.0;
                self.high_gain = 0;
            }
            EffectType::AutoWahOdEq3 => {
                self.low_freq = EQ_FREQ_TABLE_XG[24];
                self.low_gain = gain(l(11));
                self.mid_freq = EQ_FREQ_TABLE_XG[41];
                self.mid_gain = gain(l(12));
                self.mid_width = 1.0;
                self.high_freq = 0.0;
                self.high_gain = 0;
            }
            _ => {
                self.low_gain = gain(l(0));
                self.mid_freq = mid_freq_xg(l(1));
                self.mid_gain = gain(l(2));
                self.mid_width = width(l(3));
                self.high_gain = gain(l(4));
                self.low_freq = low_freq_xg(l(5));
                self.high_freq = high_freq_xg(l(6));
            }
        }
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.lsf.set(self.low_freq, self.low_gain as f64, 0.0, rate);
        self.hsf.set(self.high_freq, self.high_gain as f64, 0.0, rate);
        self.peak.set(self.mid_freq, self.mid_gain as f64, 1.0 / self.mid_width, rate);
    }

    fn process(&mut self, buf: &mut [i32]) {
        if self.low_gain != 0 {
            self.lsf.process_stereo(buf);
        }
        if self.high_gain != 0 {
            self.hsf.process_stereo(buf);
        }
        if self.mid_gain != 0 {
            self.peak.process_stereo(buf);
        }
    }
}

/// GS Stereo-EQ: two shelves, two parametric mids and an output level
pub struct StereoEq {
    pub low_freq: f64,
    pub high_freq: f64,
    pub m1_freq: f64,
    pub m2_freq: f64,
    pub low_gain: i32,
    pub high_gain: i32,
    pub m1_gain: i32,
    pub m2_gain: i32,
    pub m1_q: f64,
    pub m2_q: f64,
    pub level: f64,
    leveli: i32,
    lsf: Shelving,
    hsf: Shelving,
    m1: Peaking,
    m2: Peaking,
}

impl Default for StereoEq {
    fn default() -> Self {
        Self {
            low_freq: 0.0,
            high_freq: 0.0,
            m1_freq: 0.0,
            m2_freq: 0.0,
            low_gain: 0,
            high_gain: 0,
            m1_gain: 0,
            m2_gain: 0,
            m1_q: 0.0,
            m2_q: 0.0,
            level: 1.0,
            leveli: fscale(1.0, 24),
            lsf: Shelving::new(ShelfKind::Low),
            hsf: Shelving::new(ShelfKind::High),
            m1: Peaking::default(),
            m2: Peaking::default(),
        }
    }
}

impl EffectStage for StereoEq {
    fn conv_gs(&mut self, params: &GsInsertion) {
        let p = |i| params.p(i);
        self.low_freq = if p(0) == 0 { 200.0 } else { 400.0 };
        self.low_gain = gain(p(1));
        self.high_freq = if p(2) == 0 { 4000.0 } else { 8000.0 };
        self.high_gain = gain(p(3));
        self.m1_freq = EQ_FREQ_TABLE_GS[clip_int(p(4), 0, 127) as usize];
        self.m1_q = EQ_Q_TABLE_GS[clip_int(p(5), 0, 4) as usize];
        self.m1_gain = gain(p(6));
        self.m2_freq = EQ_FREQ_TABLE_GS[clip_int(p(7), 0, 127) as usize];
        self.m2_q = EQ_Q_TABLE_GS[clip_int(p(8), 0, 4) as usize];
        self.m2_gain = gain(p(9));
        self.level = p(19) as f64 / 127.0;
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.lsf.set(self.low_freq, self.low_gain as f64, 0.0, rate);
        self.hsf.set(self.high_freq, self.high_gain as f64, 0.0, rate);
        self.m1.set(self.m1_freq, self.m1_gain as f64, self.m1_q, rate);
        self.m2.set(self.m2_freq, self.m2_gain as f64, self.m2_q, rate);
        self.leveli = fscale(self.level, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        if self.level != 1.0 {
            for s in buf.iter_mut() {
                *s = imuldiv24(*s, self.leveli);
            }
        }
        if self.low_gain != 0 {
            self.lsf.process_stereo(buf);
        }
        if self.high_gain != 0 {
            self.hsf.process_stereo(buf);
        }
        if self.m1_gain != 0 {
            self.m1.process_stereo(buf);
        }
        if self.m2_gain != 0 {
            self.m2.process_stereo(buf);
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
    fn test_flat_eq2_is_transparent() {
        let mut eq = Eq2::new(EffectType::Eq2);
        let mut gs = GsInsertion::default();
        gs.parameter[16] = 0x40;
        gs.parameter[17] = 0x40;
        eq.conv_gs(&gs);
        eq.init(&ctx());
        let mut buf: Vec<i32> = (0..64).map(|i| i * 1000 - 32000).collect();
        let orig = buf.clone();
        eq.process(&mut buf);
        assert_eq!(buf, orig, "zero gain bands are skipped");
    }

    #[test]
    fn test_delay_eq2_reads_tail_parameters() {
        let mut fx = XgEffect::with_type(0x05, XgConnection::System);
        fx.load_preset();
        fx.param_lsb[13] = 70;
        fx.param_lsb[15] = 0;
        let mut eq = Eq2::new(EffectType::DelayEq2);
        eq.conv_xg(&fx);
        assert_eq!(eq.low_gain, 6);
        assert_eq!(eq.high_gain, -12, "gain clips at -12 dB");
        assert_eq!(eq.low_freq, EQ_FREQ_TABLE_XG[28]);
    }

    #[test]
    fn test_od_eq3_has_no_high_band() {
        let mut fx = XgEffect::with_type(0x49, XgConnection::Insertion);
        fx.load_preset();
        let mut eq = Eq3::new(EffectType::OdEq3);
        eq.conv_xg(&fx);
        assert_eq!(eq.high_gain, 0);
        assert!((eq.mid_width - 1.0).abs() < 1e-12, "width 10 maps to 1.0");
    }

    #[test]
    fn test_stereo_eq_level_scales() {
        let mut eq = StereoEq::default();
        let mut gs = GsInsertion::default();
        gs.parameter = [0, 64, 0, 64, 0, 0, 64, 0, 0, 64, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        eq.conv_gs(&gs);
        eq.init(&ctx());
        let mut buf = vec![1 << 20; 8];
        eq.process(&mut buf);
        assert!(buf.iter().all(|&s| s == 0), "level 0 silences the output");
    }
}
