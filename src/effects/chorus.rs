//! Modulated-delay stages: GS Hexa-Chorus and the XG chorus family
//!
//! Both read their delay lines at LFO-swept fractional positions and
//! resolve the fraction with allpass interpolation.

use super::overdrive::{left_panning, right_panning};
use super::params::{calc_dry_gs, calc_wet_gs, GsInsertion, XgEffect};
use super::primitives::{DelayLine, ModDelay};
use super::{EffectContext, EffectStage};
use crate::engine::lfo::{Lfo, LfoKind};
use crate::fixed::{clip_int, fscale, imuldiv24, imuldiv8};
use crate::tables::{LFO_FREQ_TABLE_XG, MOD_DELAY_OFFSET_TABLE_XG, PRE_DELAY_TIME_TABLE, RATE1_TABLE};

const HEXA_CHORUS_WET_LEVEL: f64 = 0.2;
const HEXA_CHORUS_DEPTH_DEV: f64 = 1.0 / (20.0 + 1.0);
const HEXA_CHORUS_DELAY_DEV: f64 = 1.0 / (20.0 * 3.0);

/// One voice of the hexa chorus reading the shared line
#[derive(Clone, Copy, Debug, Default)]
struct HexaTap {
    pdelay: i32,
    depth: i32,
    pan: i32,
    spt: usize,
    hist: i32,
}

/// GS Hexa-Chorus: six taps with spread delays, depths and pans
pub struct HexaChorus {
    pub pdelay_ms: f64,
    pub depth_ms: f64,
    /// Base delay in samples, nominal delay minus half the depth
    pdelay: i32,
    /// Base modulation depth in samples
    depth: i32,
    pub pdelay_dev: i32,
    pub depth_dev: i32,
    pub pan_dev: i32,
    pub rate: f64,
    pub level: f64,
    pub dry: f64,
    pub wet: f64,
    dryi: i32,
    weti: i32,
    taps: [HexaTap; 6],
    line: DelayLine,
    lfo: Lfo,
}

impl Default for HexaChorus {
    fn default() -> Self {
        Self {
            pdelay_ms: 0.0,
            depth_ms: 0.0,
            pdelay: 1,
            depth: 0,
            pdelay_dev: 0,
            depth_dev: 0,
            pan_dev: 0,
            rate: 0.0,
            level: 1.0,
            dry: 1.0,
            wet: 0.0,
            dryi: 0,
            weti: 0,
            taps: [HexaTap::default(); 6],
            line: DelayLine::default(),
            lfo: Lfo::default(),
        }
    }
}

impl EffectStage for HexaChorus {
    fn conv_gs(&mut self, params: &GsInsertion) {
        let p = |i| params.p(i);
        self.level = p(19) as f64 / 127.0;
        self.pdelay_ms = PRE_DELAY_TIME_TABLE[clip_int(p(0), 0, 127) as usize];
        self.depth_ms = (p(2) + 1) as f64 / 3.2;
        self.rate = RATE1_TABLE[clip_int(p(1), 0, 127) as usize];
        self.pdelay_dev = p(3);
        self.depth_dev = p(4) - 64;
        self.pan_dev = p(5);
        self.dry = calc_dry_gs(p(15));
        self.wet = calc_wet_gs(p(15));
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        let depth = self.depth_ms * rate / 1000.0;
        self.depth = depth as i32;
        self.pdelay = ((self.pdelay_ms * rate / 1000.0 - depth / 2.0) as i32).max(1);
        self.line.set((9600.0 * rate / 44100.0) as usize);
        self.lfo.init(self.rate, LfoKind::Triangular, 0.0, rate);
        self.dryi = fscale(self.level * self.dry, 24);
        self.weti = fscale(self.level * self.wet * HEXA_CHORUS_WET_LEVEL, 24);

        let dv = (self.depth as f64 * (self.depth_dev as f64 * HEXA_CHORUS_DEPTH_DEV)) as i32;
        let d = self.depth;
        let depths = [d - dv, d, d + dv, d + dv, d, d - dv];
        let pv = (self.pdelay as f64 * (self.pdelay_dev as f64 * HEXA_CHORUS_DELAY_DEV)) as i32;
        let p = self.pdelay;
        let pdelays = [p + pv, p + pv * 2, p + pv * 3, p + pv * 3, p + pv * 2, p + pv];
        let pd = self.pan_dev;
        let pans = [64 - pd * 3, 64 - pd * 2, 64 - pd, 64 + pd, 64 + pd * 2, 64 + pd * 3];
        for (i, tap) in self.taps.iter_mut().enumerate() {
            *tap = HexaTap {
                pdelay: pdelays[i],
                depth: depths[i].max(0),
                pan: pans[i],
                spt: 0,
                hist: 0,
            };
        }
    }

    fn teardown(&mut self) {
        self.line = DelayLine::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        let size = self.line.len() as i32;
        for frame in buf.chunks_exact_mut(2) {
            let mut held = [0i32; 6];
            for (v, tap) in held.iter_mut().zip(self.taps.iter()) {
                *v = self.line.at(tap.spt);
            }
            self.line.advance();
            let index = self.line.index() as i32;
            let lfo_val = self.lfo.next();
            let (mut left, mut right) = (0i32, 0i32);
            for (tap, v) in self.taps.iter_mut().zip(held) {
                let swing = imuldiv8(lfo_val, tap.depth);
                tap.spt = (index - tap.pdelay - (swing >> 8)).rem_euclid(size) as usize;
                let frac = 0xFF - (swing & 0xFF);
                tap.hist = v + imuldiv8(self.line.at(tap.spt) - tap.hist, frac);
                left = left.saturating_add(left_panning(tap.hist, tap.pan));
                right = right.saturating_add(right_panning(tap.hist, tap.pan));
            }
            self.line.write(imuldiv24(frame[0].saturating_add(frame[1]), self.weti));
            frame[0] = left.saturating_add(imuldiv24(frame[0], self.dryi));
            frame[1] = right.saturating_add(imuldiv24(frame[1], self.dryi));
        }
    }
}

/// XG Chorus, Celeste, Flanger and Symphonic
///
/// Two modulated lines with feedback; the right LFO runs `phase_diff`
/// degrees ahead.
pub struct XgChorus {
    flavor: ChorusFlavor,
    /// LFO rate in Hz
    pub rate: f64,
    pub depth_ms: f64,
    pub feedback: f64,
    pub pdelay_ms: f64,
    pub dry: f64,
    pub wet: f64,
    pub phase_diff: f64,
    dryi: i32,
    weti: i32,
    feedbacki: i32,
    delay_l: ModDelay,
    delay_r: ModDelay,
    lfos: [Lfo; 2],
}

/// Parameter layout of an [`XgChorus`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChorusFlavor {
    Chorus,
    Flanger,
    Symphonic,
}

impl XgChorus {
    pub fn new(flavor: ChorusFlavor) -> Self {
        Self {
            flavor,
            rate: 0.0,
            depth_ms: 0.0,
            feedback: 0.0,
            pdelay_ms: 0.0,
            dry: 0.0,
            wet: 0.0,
            phase_diff: 90.0,
            dryi: 0,
            weti: 0,
            feedbacki: 0,
            delay_l: ModDelay::default(),
            delay_r: ModDelay::default(),
            lfos: Default::default(),
        }
    }
}

impl EffectStage for XgChorus {
    fn conv_xg(&mut self, params: &XgEffect) {
        let l = |i| clip_int(params.l(i), 0, 127) as usize;
        self.rate = LFO_FREQ_TABLE_XG[l(0)];
        self.depth_ms = (l(1) + 1) as f64 / 3.2 / 2.0;
        self.dry = params.calc_dry(params.l(9));
        self.wet = params.calc_wet(params.l(9));
        let feedback = (params.l(2) - 64) as f64 * (0.763 * 2.0 / 100.0);
        match self.flavor {
            ChorusFlavor::Chorus => {
                self.feedback = feedback;
                self.pdelay_ms = MOD_DELAY_OFFSET_TABLE_XG[l(3)];
                self.phase_diff = 90.0;
            }
            ChorusFlavor::Flanger => {
                self.feedback = feedback;
                self.pdelay_ms = MOD_DELAY_OFFSET_TABLE_XG[l(2)];
                self.phase_diff = (clip_int(params.l(13), 4, 124) - 64) as f64 * 3.0;
            }
            ChorusFlavor::Symphonic => {
                self.feedback = 0.0;
                self.pdelay_ms = MOD_DELAY_OFFSET_TABLE_XG[l(3)];
                self.phase_diff = 90.0;
            }
        }
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.lfos = Lfo::stereo(self.rate, LfoKind::Triangular, self.phase_diff, rate);
        let depth = (self.depth_ms * rate / 1000.0) as i32;
        let pdelay = ((self.pdelay_ms * rate / 1000.0) as i32 - depth / 2).max(1);
        let size = (pdelay + depth + 2) as usize;
        self.delay_l.set(size, pdelay, depth);
        self.delay_r.set(size, pdelay, depth);
        self.feedbacki = fscale(self.feedback, 24);
        self.dryi = fscale(self.dry, 24);
        self.weti = fscale(self.wet, 24);
    }

    fn teardown(&mut self) {
        self.delay_l = ModDelay::default();
        self.delay_r = ModDelay::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            let (lval, rval) = (self.lfos[0].next(), self.lfos[1].next());
            for (ch, (line, lfoval)) in [(&mut self.delay_l, lval), (&mut self.delay_r, rval)]
                .into_iter()
                .enumerate()
            {
                let input = frame[ch];
                let output = line.read(lfoval);
                line.write(input.saturating_add(imuldiv24(output, self.feedbacki)));
                frame[ch] = imuldiv24(input, self.dryi).saturating_add(imuldiv24(output, self.weti));
            }
        }
    }
}
