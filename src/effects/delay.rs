//! XG variation delays: Delay L,C,R, Delay L,R, Echo and Cross Delay
//!
//! Every stage feeds its taps back through a first-order damping low-pass.
//! Gains are Q24. Tap cursors run alongside the line's write cursor and are
//! placed `line_len - delay` slots ahead of it so they read `delay` samples
//! into the past.

use super::params::XgEffect;
use super::primitives::{advance_tap, DelayLine};
use super::{EffectContext, EffectStage};
use crate::filters::Lowpass1;
use crate::fixed::{clip_int, fscale, imuldiv24};

/// Longest L,C,R and L,R delay parameter, in tenths of a millisecond
const DELAY_MAX_TENTHS: i32 = 14860;
/// Longest echo and cross delay parameter, in tenths of a millisecond
const ECHO_MAX_TENTHS: i32 = 7430;

/// XG feedback parameter (`-63..=63` around 64) to a signed gain
#[inline]
fn feedback_gain(val: i32) -> f64 {
    (val - 64) as f64 * (0.763 * 2.0 / 100.0)
}

/// XG high-damp parameter (1..=10) to tenths
#[inline]
fn high_damp(val: i32) -> f64 {
    clip_int(val, 1, 10) as f64 / 10.0
}

#[inline]
fn ms_to_samples(ms: f64, rate: f64) -> usize {
    (ms * rate / 1000.0) as usize
}

/// Damping low-pass coefficient, normalised to 44.1 kHz
#[inline]
fn damping_filter(damp: f64, rate: f64) -> Lowpass1 {
    Lowpass1::new((1.0 - damp) * 44100.0 / rate)
}

/// Q24 dry and wet gains shared by every stage in this module
#[derive(Clone, Copy, Debug, Default)]
struct Mix {
    dry: f64,
    wet: f64,
    dryi: i32,
    weti: i32,
}

impl Mix {
    fn conv(&mut self, params: &XgEffect) {
        self.dry = params.calc_dry(params.l(9));
        self.wet = params.calc_wet(params.l(9));
    }

    fn init(&mut self) {
        self.dryi = fscale(self.dry, 24);
        self.weti = fscale(self.wet, 24);
    }

    #[inline]
    fn apply(&self, dry: i32, wet: i32) -> i32 {
        imuldiv24(dry, self.dryi).saturating_add(imuldiv24(wet, self.weti))
    }
}

/// Three taps (left, centre, right) over two feedback lines
#[derive(Default)]
pub struct DelayLcr {
    pub ldelay: f64,
    pub cdelay: f64,
    pub rdelay: f64,
    /// Feedback line length in milliseconds, caps the three taps
    pub fdelay: f64,
    pub feedback: f64,
    pub clevel: f64,
    pub high_damp: f64,
    mix: Mix,
    feedbacki: i32,
    cleveli: i32,
    taps: [usize; 3],
    line_l: DelayLine,
    line_r: DelayLine,
    lpf: Lowpass1,
}

impl EffectStage for DelayLcr {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.ldelay = params.delay_ms(0, DELAY_MAX_TENTHS);
        self.rdelay = params.delay_ms(1, DELAY_MAX_TENTHS);
        self.cdelay = params.delay_ms(2, DELAY_MAX_TENTHS);
        self.fdelay = params.delay_ms(3, DELAY_MAX_TENTHS);
        self.feedback = feedback_gain(params.l(4));
        self.clevel = params.l(5) as f64 / 127.0;
        self.high_damp = high_damp(params.l(6));
        self.mix.conv(params);
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        let line = ms_to_samples(self.fdelay, rate);
        let sizes = [self.ldelay, self.cdelay, self.rdelay].map(|ms| ms_to_samples(ms, rate).min(line));
        let len = line + 1;
        self.line_l.set(len);
        self.line_r.set(len);
        for (tap, size) in self.taps.iter_mut().zip(sizes) {
            *tap = len - size;
        }
        self.feedbacki = fscale(self.feedback, 24);
        self.cleveli = fscale(self.clevel, 24);
        self.mix.init();
        self.lpf = damping_filter(self.high_damp, rate);
    }

    fn teardown(&mut self) {
        self.line_l = DelayLine::default();
        self.line_r = DelayLine::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        let len = self.line_l.len();
        let [t0, t1, t2] = &mut self.taps;
        for frame in buf.chunks_exact_mut(2) {
            let x = imuldiv24(self.line_l.at(self.line_l.index()), self.feedbacki);
            let x = self.lpf.process(x, 0);
            self.line_l.write(frame[0].saturating_add(x));
            let y = self.line_l.at(*t0).saturating_add(imuldiv24(self.line_l.at(*t1), self.cleveli));
            frame[0] = self.mix.apply(frame[0], y);

            let x = imuldiv24(self.line_r.at(self.line_r.index()), self.feedbacki);
            let x = self.lpf.process(x, 1);
            self.line_r.write(frame[1].saturating_add(x));
            let y = self.line_r.at(*t2).saturating_add(imuldiv24(self.line_r.at(*t1), self.cleveli));
            frame[1] = self.mix.apply(frame[1], y);

            advance_tap(t0, len);
            advance_tap(t1, len);
            advance_tap(t2, len);
            self.line_l.advance();
            self.line_r.advance();
        }
    }
}

/// Independent left and right feedback delays
#[derive(Default)]
pub struct DelayLr {
    pub ldelay: f64,
    pub rdelay: f64,
    pub fdelay1: f64,
    pub fdelay2: f64,
    pub feedback: f64,
    pub high_damp: f64,
    mix: Mix,
    feedbacki: i32,
    taps: [usize; 2],
    line_l: DelayLine,
    line_r: DelayLine,
    lpf: Lowpass1,
}

impl EffectStage for DelayLr {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.ldelay = params.delay_ms(0, DELAY_MAX_TENTHS);
        self.rdelay = params.delay_ms(1, DELAY_MAX_TENTHS);
        self.fdelay1 = params.delay_ms(2, DELAY_MAX_TENTHS);
        self.fdelay2 = params.delay_ms(3, DELAY_MAX_TENTHS);
        self.feedback = feedback_gain(params.l(4));
        self.high_damp = high_damp(params.l(5));
        self.mix.conv(params);
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.taps[0] = set_tapped_line(&mut self.line_l, self.ldelay, self.fdelay1, rate);
        self.taps[1] = set_tapped_line(&mut self.line_r, self.rdelay, self.fdelay2, rate);
        self.feedbacki = fscale(self.feedback, 24);
        self.mix.init();
        self.lpf = damping_filter(self.high_damp, rate);
    }

    fn teardown(&mut self) {
        self.line_l = DelayLine::default();
        self.line_r = DelayLine::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        let (len_l, len_r) = (self.line_l.len(), self.line_r.len());
        for frame in buf.chunks_exact_mut(2) {
            let x = imuldiv24(self.line_l.at(self.line_l.index()), self.feedbacki);
            let x = self.lpf.process(x, 0);
            self.line_l.write(frame[0].saturating_add(x));
            frame[0] = self.mix.apply(frame[0], self.line_l.at(self.taps[0]));

            let x = imuldiv24(self.line_r.at(self.line_r.index()), self.feedbacki);
            let x = self.lpf.process(x, 1);
            self.line_r.write(frame[1].saturating_add(x));
            frame[1] = self.mix.apply(frame[1], self.line_r.at(self.taps[1]));

            advance_tap(&mut self.taps[0], len_l);
            advance_tap(&mut self.taps[1], len_r);
            self.line_l.advance();
            self.line_r.advance();
        }
    }
}

/// Size `line` for a `fdelay` ms feedback loop and return the cursor of a
/// tap `delay` ms behind the write cursor
fn set_tapped_line(line: &mut DelayLine, delay: f64, fdelay: f64, rate: f64) -> usize {
    let loop_len = ms_to_samples(fdelay, rate);
    let size = ms_to_samples(delay, rate).min(loop_len);
    let len = loop_len + 1;
    line.set(len);
    len - size
}

/// Echo: per-side feedback loops with a second, shorter tap mixed in
#[derive(Default)]
pub struct Echo {
    pub ldelay1: f64,
    pub rdelay1: f64,
    pub ldelay2: f64,
    pub rdelay2: f64,
    pub lfeedback: f64,
    pub rfeedback: f64,
    pub level: f64,
    pub high_damp: f64,
    mix: Mix,
    lfeedbacki: i32,
    rfeedbacki: i32,
    leveli: i32,
    taps: [usize; 2],
    line_l: DelayLine,
    line_r: DelayLine,
    lpf: Lowpass1,
}

impl EffectStage for Echo {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.ldelay1 = params.delay_ms(0, ECHO_MAX_TENTHS);
        self.lfeedback = feedback_gain(params.l(1));
        self.rdelay1 = params.delay_ms(2, ECHO_MAX_TENTHS);
        self.rfeedback = feedback_gain(params.l(3));
        self.high_damp = high_damp(params.l(4));
        self.ldelay2 = params.delay_ms(5, ECHO_MAX_TENTHS);
        self.rdelay2 = params.delay_ms(6, ECHO_MAX_TENTHS);
        self.level = params.l(7) as f64 / 127.0;
        self.mix.conv(params);
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.taps[0] = set_tapped_line(&mut self.line_l, self.ldelay2, self.ldelay1, rate);
        self.taps[1] = set_tapped_line(&mut self.line_r, self.rdelay2, self.rdelay1, rate);
        self.lfeedbacki = fscale(self.lfeedback, 24);
        self.rfeedbacki = fscale(self.rfeedback, 24);
        self.leveli = fscale(self.level, 24);
        self.mix.init();
        self.lpf = damping_filter(self.high_damp, rate);
    }

    fn teardown(&mut self) {
        self.line_l = DelayLine::default();
        self.line_r = DelayLine::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        let (len_l, len_r) = (self.line_l.len(), self.line_r.len());
        for frame in buf.chunks_exact_mut(2) {
            let head = self.line_l.at(self.line_l.index());
            let y = head.saturating_add(imuldiv24(self.line_l.at(self.taps[0]), self.leveli));
            let x = self.lpf.process(imuldiv24(head, self.lfeedbacki), 0);
            self.line_l.write(frame[0].saturating_add(x));
            frame[0] = self.mix.apply(frame[0], y);

            let head = self.line_r.at(self.line_r.index());
            let y = head.saturating_add(imuldiv24(self.line_r.at(self.taps[1]), self.leveli));
            let x = self.lpf.process(imuldiv24(head, self.rfeedbacki), 1);
            self.line_r.write(frame[1].saturating_add(x));
            frame[1] = self.mix.apply(frame[1], y);

            advance_tap(&mut self.taps[0], len_l);
            advance_tap(&mut self.taps[1], len_r);
            self.line_l.advance();
            self.line_r.advance();
        }
    }
}

/// Ping-pong delay: each side's feedback lands in the opposite line
#[derive(Default)]
pub struct CrossDelay {
    pub lrdelay: f64,
    pub rldelay: f64,
    pub feedback: f64,
    pub input_select: i32,
    pub high_damp: f64,
    mix: Mix,
    feedbacki: i32,
    line_l: DelayLine,
    line_r: DelayLine,
    lpf: Lowpass1,
}

impl EffectStage for CrossDelay {
    fn conv_xg(&mut self, params: &XgEffect) {
        self.lrdelay = params.delay_ms(0, ECHO_MAX_TENTHS);
        self.rldelay = params.delay_ms(1, ECHO_MAX_TENTHS);
        self.feedback = feedback_gain(params.l(2));
        self.input_select = params.l(3);
        self.high_damp = high_damp(params.l(4));
        self.mix.conv(params);
    }

    fn init(&mut self, ctx: &EffectContext) {
        let rate = ctx.sample_rate;
        self.line_l.set(ms_to_samples(self.lrdelay, rate));
        self.line_r.set(ms_to_samples(self.rldelay, rate));
        self.feedbacki = fscale(self.feedback, 24);
        self.mix.init();
        self.lpf = damping_filter(self.high_damp, rate);
    }

    fn teardown(&mut self) {
        self.line_l = DelayLine::default();
        self.line_r = DelayLine::default();
    }

    fn process(&mut self, buf: &mut [i32]) {
        for frame in buf.chunks_exact_mut(2) {
            let head_l = self.line_l.at(self.line_l.index());
            let head_r = self.line_r.at(self.line_r.index());
            let lfb = self.lpf.process(imuldiv24(head_l, self.feedbacki), 0);
            let rfb = self.lpf.process(imuldiv24(head_r, self.feedbacki), 1);
            let lout = self.mix.apply(frame[0], head_l);
            let rout = self.mix.apply(frame[1], head_r);
            self.line_l.write(frame[0].saturating_add(rfb));
            self.line_r.write(frame[1].saturating_add(lfb));
            frame[0] = lout;
            frame[1] = rout;
            self.line_l.advance();
            self.line_r.advance();
        }
    }
}
