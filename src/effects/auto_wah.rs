//! XG Auto Wah and the overdrive stage of Auto Wah + OD
//!
//! The wah is a distorting Moog ladder read as a band-pass whose cutoff is
//! swept by a triangular LFO. The cutoff is refreshed every 44 samples
//! (scaled to the sample rate) rather than per sample.

use super::params::XgEffect;
use super::{EffectContext, EffectStage};
use crate::engine::lfo::{Lfo, LfoKind};
use crate::filters::{Biquad, BiquadKind, MoogDist};
use crate::fixed::{clip_int, fscale, imuldiv24, GUARD_BITS};
use crate::tables::{BEND_COARSE, BEND_FINE, EQ_FREQ_TABLE_XG, LFO_FREQ_TABLE_XG};

const AUTO_WAH_BITS: i32 = 32 - GUARD_BITS;
const AUTO_WAH_MAX_NEG: f64 = 1.0 / (1u32 << AUTO_WAH_BITS) as f64;

/// Cutoff for one LFO value: the offset bent up or down by up to 256 fine steps
///
/// # Arguments
/// * `lfo_val` - LFO output, `0..=65536` centred on `1 << 15`
/// * `offset_freq` - Centre frequency in Hz
/// * `depth` - LFO depth, 0..=127
pub fn auto_wah_freq(lfo_val: i32, offset_freq: f64, depth: i32) -> f64 {
    let fine = ((lfo_val - (1 << 15)) * depth) >> 7;
    let bend = |f: i32| BEND_FINE[(f & 0xff) as usize] * BEND_COARSE[((f >> 8) & 0x7f) as usize];
    if fine >= 0 {
        offset_freq * bend(fine)
    } else {
        offset_freq / bend(-fine)
    }
}

pub struct AutoWah {
    pub lfo_freq: f64,
    pub lfo_depth: i32,
    pub offset_freq: f64,
    pub resonance: f64,
    pub drive: i32,
    pub dry: f64,
    pub wet: f64,
    fil: [MoogDist; 2],
    lfo: Lfo,
    fil_count: i32,
    fil_cycle: i32,
    rate: f64,
    dryi: i32,
    weti: i32,
}

impl Default for AutoWah {
    fn default() -> Self {
        Self {
            lfo_freq: 1.0,
            lfo_depth: 0,
            offset_freq: 100.0,
            resonance: 1.0,
            drive: 0,
            dry: 0.0,
            wet: 1.0,
            fil: [MoogDist::default(), MoogDist::default()],
            lfo: Lfo::default(),
            fil_count: 0,
            fil_cycle: 1,
            rate: 44100.0,
            dryi: 0,
            weti: 0,
        }
    }
}

impl AutoWah {
    fn set_cutoff(&mut self, lfo_val: i32) {
        let freq = auto_wah_freq(lfo_val, self.offset_freq, self.lfo_depth) as i32;
        for fil in &mut self.fil {
            fil.freq = freq;
            fil.calc(self.rate);
        }
    }
}

impl EffectStage for AutoWah {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.lfo_freq = LFO_FREQ_TABLE_XG[clip_int(params.l(0), 0, 127) as usize];
        self.lfo_depth = params.l(1);
        self.offset_freq = params.l(2) as f64 * 3900.0 / 127.0 + 100.0;
        self.resonance = clip_int(params.l(3), 10, 120) as f64 / 10.0;
        self.dry = params.calc_dry(params.l(9));
        self.wet = params.calc_wet(params.l(9));
        self.drive = params.l(10);
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.rate = ctx.sample_rate;
        self.lfo.init(self.lfo_freq, LfoKind::Triangular, 0.0, self.rate);
        let res_db = (self.resonance - 1.0) * 12.0 / 11.0;
        let dist = 4.0 * (self.drive.max(0) as f64 / 127.0).sqrt();
        self.fil = [MoogDist::new(0, res_db, dist), MoogDist::new(0, res_db, dist)];
        let val = self.lfo.next();
        self.set_cutoff(val);
        self.fil_count = 0;
        self.fil_cycle = ((44.0 * self.rate / 44100.0) as i32).max(1);
        self.dryi = fscale(self.dry, 24);
        self.weti = fscale(self.wet, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            for (x, fil) in frame.iter_mut().zip(self.fil.iter_mut()) {
                let yf = fil.process_band(*x as f64 * AUTO_WAH_MAX_NEG);
                let y = fscale(yf, AUTO_WAH_BITS);
                *x = imuldiv24(*x, self.dryi).saturating_add(imuldiv24(y, self.weti));
            }
            let val = self.lfo.next();
            self.fil_count += 1;
            if self.fil_count >= self.fil_cycle {
                self.fil_count = 0;
                self.set_cutoff(val);
            }
        }
    }
}

/// Post-wah overdrive: a fixed-Q low-pass and an output level
pub struct AutoWahOd {
    pub level: f64,
    lpf: Biquad,
    leveli: i32,
}

impl Default for AutoWahOd {
    fn default() -> Self {
        Self {
            level: 1.0,
            lpf: Biquad::new(BiquadKind::Lowpass, EQ_FREQ_TABLE_XG[80], 1.0),
            leveli: 0,
        }
    }
}

impl EffectStage for AutoWahOd {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.lpf.freq = EQ_FREQ_TABLE_XG[clip_int(params.l(13), 34, 80) as usize];
        self.level = params.l(14) as f64 / 127.0;
    }

    fn init(&mut self, ctx: &EffectContext) {
        self.lpf.set(self.lpf.freq, 1.0, ctx.sample_rate);
        self.leveli = fscale(self.level, 24);
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            for (ch, x) in frame.iter_mut().enumerate() {
                *x = imuldiv24(self.lpf.process(*x, ch), self.leveli);
            }
        }
    }
}
