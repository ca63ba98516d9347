//! System reverb engines
//!
//! The GS reverb character picks the engine: 5 is a plate, 6 and 7 are
//! plain and ping-pong feedback delays, everything else is a room or hall
//! rendered either by the four-tap standard network or by Freeverb,
//! depending on [`ReverbAlgorithm`]. Every engine reads the interleaved
//! reverb bus and adds its output into the mix; the caller clears the bus.

use super::status::{ReverbStatusGs, CHARACTER_DELAY, CHARACTER_PANNING_DELAY, CHARACTER_PLATE};
use crate::config::ReverbAlgorithm;
use crate::effects::primitives::{
    advance_tap, Allpass, CombFilter, DelayLine, FreeverbAllpass, ModAllpass,
};
use crate::engine::lfo::{Lfo, LfoKind};
use crate::filters::Lowpass1;
use crate::fixed::{fscale, imuldiv24, next_prime};
use crate::tables::REVERB_TIME_TABLE;

/// Reverb time for the status in seconds, before any engine scaling
fn reverb_time(status: &ReverbStatusGs) -> f64 {
    REVERB_TIME_TABLE[status.time.min(127) as usize] * status.rt_scale()
}

/// Four-tap feedback reverberator
///
/// Each side runs four prime-length lines with a high-pass on the input,
/// a low-pass in the loop and an early-reflection filter on the output.
/// The loop state is truncated to integers at every step.
#[derive(Clone, Debug)]
pub struct StandardReverb {
    lines: [[Vec<i32>; 2]; 4],
    rpt: [usize; 4],
    spt: [usize; 4],
    ta: i32,
    tb: i32,
    hpf: [i32; 2],
    lpf: [i32; 2],
    epf: [i32; 2],
    wet: f64,
}

impl StandardReverb {
    const TAP_MS: [f64; 4] = [5.3, 10.5, 44.12, 21.0];
    const FBKLEV: f64 = 0.12;
    const CMIXLEV: f64 = 0.9;
    const HPFLEV: f64 = 0.5;
    const LPFLEV: f64 = 0.45;
    const LPFINP: f64 = 0.55;
    const EPFLEV: f64 = 0.4;
    const EPFINP: f64 = 0.48;
    const WIDTH: f64 = 0.125;

    pub fn new(status: &ReverbStatusGs, sample_rate: f64) -> Self {
        let time = reverb_time(status) / REVERB_TIME_TABLE[64] * 0.8;
        let rpt = Self::TAP_MS.map(|ms| next_prime((ms * sample_rate / 1000.0 * time) as i32) as usize);
        let lines = rpt.map(|n| [vec![0; n + 1], vec![0; n + 1]]);
        Self {
            lines,
            rpt,
            spt: [0; 4],
            ta: 0,
            tb: 0,
            hpf: [0; 2],
            lpf: [0; 2],
            epf: [0; 2],
            wet: 2.0 * status.level as f64 / 127.0 * status.level_scale(),
        }
    }

    /// Prime lengths of the four lines
    pub fn tap_lengths(&self) -> [usize; 4] {
        self.rpt
    }

    pub fn process(&mut self, bus: &[i32], out: &mut [i32]) {
        let [l0, l1, l2, l3] = &mut self.lines;
        for (frame, input) in out.chunks_exact_mut(2).zip(bus.chunks_exact(2)) {
            let [s0, s1, s2, s3] = self.spt;
            for ch in 0..2 {
                let fixp = input[ch] as f64;
                let lpf = self.lpf[ch] as f64 * Self::LPFLEV
                    + (l2[ch][s2] as f64 + self.tb as f64) * Self::LPFINP
                    + self.ta as f64 * Self::WIDTH;
                self.lpf[ch] = lpf as i32;
                self.ta = l3[ch][s3];
                let s = l0[ch][s0];
                l3[ch][s3] = s;
                l0[ch][s0] = if ch == 0 { -self.lpf[ch] } else { self.lpf[ch] };

                let t = ((self.hpf[ch] as f64 + fixp) * Self::HPFLEV) as i32;
                self.hpf[ch] = t.saturating_sub(input[ch]);

                l2[ch][s2] = ((s as f64 - fixp * Self::FBKLEV) * Self::CMIXLEV) as i32;
                self.tb = l1[ch][s1];
                l1[ch][s1] = t;

                self.epf[ch] = (self.epf[ch] as f64 * Self::EPFLEV + self.ta as f64 * Self::EPFINP) as i32;
                let y = ((self.ta as f64 + self.epf[ch] as f64) * self.wet) as i32;
                frame[ch] = frame[ch].saturating_add(y);
            }
            for (spt, &rpt) in self.spt.iter_mut().zip(&self.rpt) {
                advance_tap(spt, rpt);
            }
        }
    }
}

const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [225, 341, 441, 556];
const STEREO_SPREAD: usize = 23;

/// Length of one Freeverb line: the tuning scaled by `time`, at least ten
/// samples, raised to the next prime
fn freeverb_length(tuning: usize, sample_rate: f64, time: f64) -> usize {
    let len = ((tuning as f64 * sample_rate * time / 44100.0) as i32).max(10);
    next_prime(len) as usize
}

/// Freeverb: eight damped combs in parallel, four allpasses in series, per side
///
/// Lines are allocated at the reference tunings when the engine is created
/// and resized on every [`Freeverb::update`].
#[derive(Clone, Debug)]
pub struct Freeverb {
    comb_l: [CombFilter; 8],
    comb_r: [CombFilter; 8],
    allpass_l: [FreeverbAllpass; 4],
    allpass_r: [FreeverbAllpass; 4],
    pdelay: DelayLine,
    /// Input gain applied by the send, includes the fixed gain
    pub wet: f64,
    pub roomsize: f64,
    pub damp: f64,
    wet1i: i32,
    wet2i: i32,
}

impl Freeverb {
    const FIXED_GAIN: f64 = 0.025;
    const COMB_FEEDBACK: f64 = 3.0;
    const SCALE_DAMP: f64 = 0.4;
    const INITIAL_DAMP: f64 = 0.5;
    const SCALE_ROOM: f64 = 0.28;
    const OFFSET_ROOM: f64 = 0.7;
    const INITIAL_ROOM: f64 = 0.5;
    const INITIAL_ALLPASS_FEEDBACK: f64 = 0.65;
    const ALLPASS_FEEDBACK: f64 = 0.55;
    const WIDTH: f64 = 0.5;

    pub fn new() -> Self {
        let mut rev = Self {
            comb_l: Default::default(),
            comb_r: Default::default(),
            allpass_l: Default::default(),
            allpass_r: Default::default(),
            pdelay: DelayLine::default(),
            wet: 1.0,
            roomsize: Self::INITIAL_ROOM * Self::SCALE_ROOM + Self::OFFSET_ROOM,
            damp: Self::INITIAL_DAMP * Self::SCALE_DAMP,
            wet1i: 0,
            wet2i: 0,
        };
        for (i, &tuning) in COMB_TUNINGS.iter().enumerate() {
            rev.comb_l[i].set_size(tuning);
            rev.comb_r[i].set_size(tuning + STEREO_SPREAD);
        }
        for (i, &tuning) in ALLPASS_TUNINGS.iter().enumerate() {
            rev.allpass_l[i].set_size(tuning);
            rev.allpass_r[i].set_size(tuning + STEREO_SPREAD);
            rev.allpass_l[i].set_feedback(Self::INITIAL_ALLPASS_FEEDBACK);
            rev.allpass_r[i].set_feedback(Self::INITIAL_ALLPASS_FEEDBACK);
        }
        rev
    }

    /// Line-length scale for the status: reverb time against the decay the
    /// longest comb reaches at this room size
    pub fn time_scale(status: &ReverbStatusGs) -> f64 {
        let roomsize = status.roomsize() * Self::SCALE_ROOM + Self::OFFSET_ROOM;
        let longest = COMB_TUNINGS[COMB_TUNINGS.len() - 1] as f64;
        reverb_time(status) * Self::COMB_FEEDBACK / (60.0 * longest / (-20.0 * roomsize.log10() * 44100.0))
    }

    /// Recompute gains, resize every line and clear history
    pub fn update(&mut self, status: &ReverbStatusGs, sample_rate: f64) {
        self.wet = status.level as f64 / 127.0 * status.level_scale() * Self::FIXED_GAIN;
        self.roomsize = status.roomsize() * Self::SCALE_ROOM + Self::OFFSET_ROOM;
        let wet1 = Self::WIDTH / 2.0 + 0.5;
        let wet2 = (1.0 - Self::WIDTH) / 2.0;

        let time = Self::time_scale(status);
        let rtbase = 1.0 / (44100.0 * reverb_time(status));
        for (i, &tuning) in COMB_TUNINGS.iter().enumerate() {
            let feedback = 10f64.powf(-Self::COMB_FEEDBACK * tuning as f64 * rtbase);
            for (comb, tuning) in [(&mut self.comb_l[i], tuning), (&mut self.comb_r[i], tuning + STEREO_SPREAD)] {
                comb.set_size(freeverb_length(tuning, sample_rate, time));
                comb.set_params(self.damp, feedback);
            }
        }
        for (i, &tuning) in ALLPASS_TUNINGS.iter().enumerate() {
            for (ap, tuning) in [(&mut self.allpass_l[i], tuning), (&mut self.allpass_r[i], tuning + STEREO_SPREAD)] {
                ap.set_size(freeverb_length(tuning, sample_rate, time));
                ap.set_feedback(Self::ALLPASS_FEEDBACK);
            }
        }
        self.wet1i = fscale(wet1, 24);
        self.wet2i = fscale(wet2, 24);
        self.pdelay.set((status.pre_delay_time as f64 * sample_rate / 1000.0) as usize);
    }

    /// Current comb lengths, left side first
    pub fn comb_lengths(&self) -> ([usize; 8], [usize; 8]) {
        (self.comb_l.each_ref().map(|c| c.len()), self.comb_r.each_ref().map(|c| c.len()))
    }

    pub fn process(&mut self, bus: &[i32], out: &mut [i32]) {
        for (frame, input) in out.chunks_exact_mut(2).zip(bus.chunks_exact(2)) {
            let x = self.pdelay.process(input[0].saturating_add(input[1]));
            let mut outl = 0i32;
            let mut outr = 0i32;
            for (cl, cr) in self.comb_l.iter_mut().zip(self.comb_r.iter_mut()) {
                outl = outl.saturating_add(cl.process(x));
                outr = outr.saturating_add(cr.process(x));
            }
            for (al, ar) in self.allpass_l.iter_mut().zip(self.allpass_r.iter_mut()) {
                outl = al.process(outl);
                outr = ar.process(outr);
            }
            let l = imuldiv24(outl, self.wet1i).saturating_add(imuldiv24(outr, self.wet2i));
            let r = imuldiv24(outr, self.wet1i).saturating_add(imuldiv24(outl, self.wet2i));
            frame[0] = frame[0].saturating_add(l);
            frame[1] = frame[1].saturating_add(r);
        }
    }
}

impl Default for Freeverb {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference rate of the plate delay lengths
const PLATE_SAMPLERATE: f64 = 29761.0;
const PLATE_DECAY: f64 = 0.50;
const PLATE_DECAY_DIFFUSION1: f64 = 0.70;
const PLATE_DECAY_DIFFUSION2: f64 = 0.50;
const PLATE_INPUT_DIFFUSION1: f64 = 0.750;
const PLATE_INPUT_DIFFUSION2: f64 = 0.625;
const PLATE_BANDWIDTH: f64 = 0.9955;
const PLATE_DAMPING: f64 = 0.0005;
const PLATE_WET: f64 = 0.25;

/// Output taps per side, in reference samples
const PLATE_TAPS_L: [f64; 7] = [266.0, 2974.0, 1913.0, 1996.0, 1990.0, 187.0, 1066.0];
const PLATE_TAPS_R: [f64; 7] = [353.0, 3627.0, 1228.0, 2673.0, 2111.0, 335.0, 121.0];

/// Figure-eight plate tank with input diffusion
///
/// Two half-tanks, each a modulated allpass, a delay, a damping low-pass, a
/// second allpass and a delay, feed each other. Seven taps per side are
/// summed with alternating signs into the output.
#[derive(Clone, Debug)]
pub struct PlateReverb {
    pd: DelayLine,
    input_ap: [Allpass; 4],
    ap5: ModAllpass,
    ap5d: ModAllpass,
    ap6: Allpass,
    ap6d: Allpass,
    /// `[td1, td2]` for the first half-tank, `[td1d, td2d]` for the second
    tank: [DelayLine; 2],
    tank_d: [DelayLine; 2],
    od_l: [DelayLine; 7],
    od_r: [DelayLine; 7],
    lfo1: Lfo,
    lfo1d: Lfo,
    lpf1: Lowpass1,
    lpf2: Lowpass1,
    t1: i32,
    t1d: i32,
    decayi: i32,
    pub wet: f64,
}

impl PlateReverb {
    pub fn new(status: &ReverbStatusGs, sample_rate: f64) -> Self {
        let t = REVERB_TIME_TABLE[status.time.min(127) as usize] / REVERB_TIME_TABLE[64] - 1.0;
        let t = 1.0 + t / 2.0;
        let len = |d: f64| (d * sample_rate * t / PLATE_SAMPLERATE) as usize;
        let line = |d: f64| DelayLine::new(len(d));

        let mut ap5 = ModAllpass::default();
        ap5.set(len(672.0) as i32, len(16.0) as i32, PLATE_DECAY_DIFFUSION1);
        let mut ap5d = ModAllpass::default();
        ap5d.set(len(908.0) as i32, len(16.0) as i32, PLATE_DECAY_DIFFUSION1);

        Self {
            pd: DelayLine::new(status.pre_delay_time as usize * sample_rate as usize / 1000),
            input_ap: [
                Allpass::new(len(142.0), PLATE_INPUT_DIFFUSION1),
                Allpass::new(len(107.0), PLATE_INPUT_DIFFUSION1),
                Allpass::new(len(379.0), PLATE_INPUT_DIFFUSION2),
                Allpass::new(len(277.0), PLATE_INPUT_DIFFUSION2),
            ],
            ap5,
            ap5d,
            ap6: Allpass::new(len(1800.0), PLATE_DECAY_DIFFUSION2),
            ap6d: Allpass::new(len(2656.0), PLATE_DECAY_DIFFUSION2),
            tank: [line(4453.0), line(3720.0)],
            tank_d: [line(4217.0), line(3163.0)],
            od_l: PLATE_TAPS_L.map(line),
            od_r: PLATE_TAPS_R.map(line),
            lfo1: Lfo::new(1.30, LfoKind::Sine, 0.0, sample_rate),
            lfo1d: Lfo::new(1.30, LfoKind::Sine, 0.0, sample_rate),
            lpf1: Lowpass1::new(PLATE_BANDWIDTH),
            lpf2: Lowpass1::new(1.0 - PLATE_DAMPING),
            t1: 0,
            t1d: 0,
            decayi: fscale(PLATE_DECAY, 24),
            wet: PLATE_WET * status.level as f64 / 127.0,
        }
    }

    pub fn process(&mut self, bus: &[i32], out: &mut [i32]) {
        let [od1l, od2l, od3l, od4l, od5l, od6l, od7l] = &mut self.od_l;
        let [od1r, od2r, od3r, od4r, od5r, od6r, od7r] = &mut self.od_r;
        let [td1, td2] = &mut self.tank;
        let [td1d, td2d] = &mut self.tank_d;
        for (frame, input) in out.chunks_exact_mut(2).zip(bus.chunks_exact(2)) {
            let mut outl = 0i32;
            let mut outr = 0i32;

            let mut x = (input[0] >> 1) + (input[1] >> 1);
            x = self.pd.process(x);
            x = self.lpf1.process(x, 0);
            for ap in self.input_ap.iter_mut() {
                x = ap.process(x);
            }

            let mut xd = x;
            x = x.saturating_add(imuldiv24(self.t1d, self.decayi));
            x = self.ap5.process(x, self.lfo1.next());
            outl = outl.saturating_sub(od5l.process(x));
            outr = outr.saturating_add(od1r.process(x));
            outr = outr.saturating_add(od2r.process(x));
            x = td1.process(x);
            x = self.lpf2.process(x, 0);
            outl = outl.saturating_sub(od6l.process(x));
            outr = outr.saturating_sub(od3r.process(x));
            x = imuldiv24(x, self.decayi);
            x = self.ap6.process(x);
            outl = outl.saturating_sub(od7l.process(x));
            outr = outr.saturating_add(od4r.process(x));
            self.t1 = td2.process(x);

            xd = xd.saturating_add(imuldiv24(self.t1, self.decayi));
            xd = self.ap5d.process(xd, self.lfo1d.next());
            outl = outl.saturating_add(od1l.process(xd));
            outl = outl.saturating_add(od2l.process(xd));
            outr = outr.saturating_sub(od6r.process(xd));
            xd = td1d.process(xd);
            xd = self.lpf2.process(xd, 1);
            outl = outl.saturating_sub(od3l.process(xd));
            outr = outr.saturating_sub(od5r.process(xd));
            xd = imuldiv24(xd, self.decayi);
            xd = self.ap6d.process(xd);
            outl = outl.saturating_add(od4l.process(xd));
            outr = outr.saturating_sub(od7r.process(xd));
            self.t1d = td2d.process(xd);

            frame[0] = frame[0].saturating_add(outl);
            frame[1] = frame[1].saturating_add(outr);
        }
    }
}

/// Reverb characters 6 and 7: one feedback delay per side
///
/// The panning variant crosses the feedback and swaps the outputs so the
/// repeats bounce between the speakers.
#[derive(Clone, Debug)]
pub struct ReverbDelay {
    pub panning: bool,
    line_l: DelayLine,
    line_r: DelayLine,
    tap: usize,
    leveli: i32,
    feedbacki: i32,
}

impl ReverbDelay {
    pub fn new(status: &ReverbStatusGs, panning: bool, sample_rate: f64) -> Self {
        let size = (status.time as f64 * 3.75 * sample_rate / 1000.0) as usize;
        let len = size + 1;
        let level = status.level as f64 * 1.82 / 127.0;
        let feedback = (status.delay_feedback as f64 / 127.0).sqrt() * 0.98;
        Self {
            panning,
            line_l: DelayLine::new(len),
            line_r: DelayLine::new(len),
            tap: len - size,
            leveli: fscale(level, 24),
            feedbacki: fscale(feedback, 24),
        }
    }

    pub fn process(&mut self, bus: &[i32], out: &mut [i32]) {
        let len = self.line_l.len();
        for (frame, input) in out.chunks_exact_mut(2).zip(bus.chunks_exact(2)) {
            if self.panning {
                let fb = imuldiv24(self.line_r.at(self.tap), self.feedbacki);
                self.line_l.write(input[0].saturating_add(fb));
                let l = imuldiv24(self.line_l.at(self.tap), self.leveli);
                let fb = imuldiv24(self.line_l.at(self.tap), self.feedbacki);
                self.line_r.write(input[1].saturating_add(fb));
                let r = imuldiv24(self.line_r.at(self.tap), self.leveli);
                frame[0] = frame[0].saturating_add(r);
                frame[1] = frame[1].saturating_add(l);
            } else {
                for (ch, line) in [&mut self.line_l, &mut self.line_r].into_iter().enumerate() {
                    let fb = imuldiv24(line.at(self.tap), self.feedbacki);
                    line.write(input[ch].saturating_add(fb));
                    frame[ch] = frame[ch].saturating_add(imuldiv24(line.at(self.tap), self.leveli));
                }
            }
            advance_tap(&mut self.tap, len);
            self.line_l.advance();
            self.line_r.advance();
        }
    }
}

/// The engine selected for the current reverb character
#[derive(Clone, Debug)]
pub enum ReverbEngine {
    Standard(StandardReverb),
    Freeverb(Box<Freeverb>),
    Plate(Box<PlateReverb>),
    Delay(ReverbDelay),
}

/// System reverb: engine selection plus the send gain it expects
#[derive(Clone, Debug)]
pub struct SystemReverb {
    engine: ReverbEngine,
}

impl SystemReverb {
    pub fn new(status: &ReverbStatusGs, algorithm: ReverbAlgorithm, sample_rate: f64) -> Self {
        let reverb = Self { engine: Self::build(status, algorithm, sample_rate) };
        log::debug!("system reverb: character {} -> {}", status.character, reverb.name());
        reverb
    }

    fn build(status: &ReverbStatusGs, algorithm: ReverbAlgorithm, sample_rate: f64) -> ReverbEngine {
        match (algorithm, status.character) {
            (ReverbAlgorithm::Standard, _) => ReverbEngine::Standard(StandardReverb::new(status, sample_rate)),
            (_, CHARACTER_PLATE) => ReverbEngine::Plate(Box::new(PlateReverb::new(status, sample_rate))),
            (_, CHARACTER_DELAY) => ReverbEngine::Delay(ReverbDelay::new(status, false, sample_rate)),
            (_, CHARACTER_PANNING_DELAY) => ReverbEngine::Delay(ReverbDelay::new(status, true, sample_rate)),
            _ => {
                let mut rev = Box::new(Freeverb::new());
                rev.update(status, sample_rate);
                ReverbEngine::Freeverb(rev)
            }
        }
    }

    /// Select and initialise the engine for the status
    ///
    /// A Freeverb that is already running is resized in place rather than
    /// rebuilt.
    pub fn init(&mut self, status: &ReverbStatusGs, algorithm: ReverbAlgorithm, sample_rate: f64) {
        let wants_freeverb = algorithm == ReverbAlgorithm::Freeverb
            && !matches!(status.character, CHARACTER_PLATE | CHARACTER_DELAY | CHARACTER_PANNING_DELAY);
        match &mut self.engine {
            ReverbEngine::Freeverb(rev) if wants_freeverb => rev.update(status, sample_rate),
            engine => *engine = Self::build(status, algorithm, sample_rate),
        }
        log::debug!("system reverb: character {} -> {}", status.character, self.name());
    }

    pub fn engine(&self) -> &ReverbEngine {
        &self.engine
    }

    pub fn name(&self) -> &'static str {
        match &self.engine {
            ReverbEngine::Standard(_) => "Standard Reverb",
            ReverbEngine::Freeverb(_) => "Freeverb",
            ReverbEngine::Plate(_) => "Plate Reverb",
            ReverbEngine::Delay(d) if d.panning => "Panning Delay",
            ReverbEngine::Delay(_) => "Delay",
        }
    }

    /// Gain the reverb send applies before the bus
    pub fn input_level(&self) -> f64 {
        match &self.engine {
            ReverbEngine::Freeverb(rev) => rev.wet,
            ReverbEngine::Plate(rev) => rev.wet,
            ReverbEngine::Standard(_) | ReverbEngine::Delay(_) => 1.0,
        }
    }

    /// Render the bus into `out` and clear the bus
    pub fn process(&mut self, bus: &mut [i32], out: &mut [i32]) {
        match &mut self.engine {
            ReverbEngine::Standard(rev) => rev.process(bus, out),
            ReverbEngine::Freeverb(rev) => rev.process(bus, out),
            ReverbEngine::Plate(rev) => rev.process(bus, out),
            ReverbEngine::Delay(rev) => rev.process(bus, out),
        }
        bus.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::is_prime;

    fn impulse_response(reverb: &mut SystemReverb, frames: usize) -> Vec<i32> {
        let mut bus = vec![0i32; frames * 2];
        bus[0] = 1 << 24;
        bus[1] = 1 << 24;
        let mut out = vec![0i32; frames * 2];
        reverb.process(&mut bus, &mut out);
        assert!(bus.iter().all(|&s| s == 0), "bus must be cleared after the drain");
        out
    }

    #[test]
    fn test_standard_reverb_lengths_are_prime() {
        let rev = StandardReverb::new(&ReverbStatusGs::default(), 44100.0);
        for len in rev.tap_lengths() {
            assert!(is_prime(len as i32), "{len} is not prime");
        }
    }

    #[test]
    fn test_standard_reverb_rings() {
        let mut reverb = SystemReverb::new(&ReverbStatusGs::default(), ReverbAlgorithm::Standard, 44100.0);
        let out = impulse_response(&mut reverb, 8192);
        assert!(out.iter().skip(2000).any(|&s| s != 0), "the tail must outlive the input");
    }

    #[test]
    fn test_character_selects_engine() {
        let mut status = ReverbStatusGs::default();
        for (character, name) in [(4, "Freeverb"), (5, "Plate Reverb"), (6, "Delay"), (7, "Panning Delay")] {
            status.character = character;
            let reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
            assert_eq!(reverb.name(), name);
        }
        status.character = 5;
        let reverb = SystemReverb::new(&status, ReverbAlgorithm::Standard, 44100.0);
        assert_eq!(reverb.name(), "Standard Reverb", "the standard network ignores the character");
    }

    #[test]
    fn test_freeverb_input_level_follows_status() {
        let status = ReverbStatusGs { level: 127, ..Default::default() };
        let reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
        assert!((reverb.input_level() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_freeverb_is_resized_in_place() {
        let mut status = ReverbStatusGs::default();
        let mut reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
        let before = match reverb.engine() {
            ReverbEngine::Freeverb(rev) => rev.comb_lengths().0,
            _ => unreachable!(),
        };
        status.time = 100;
        reverb.init(&status, ReverbAlgorithm::Freeverb, 44100.0);
        let after = match reverb.engine() {
            ReverbEngine::Freeverb(rev) => rev.comb_lengths().0,
            _ => unreachable!(),
        };
        assert!(after[0] > before[0], "a longer time stretches the combs");
    }

    #[test]
    fn test_reverb_delay_repeats_at_time() {
        let status = ReverbStatusGs { character: 6, time: 32, delay_feedback: 0, ..Default::default() };
        let mut reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
        let out = impulse_response(&mut reverb, 8192);
        // 32 * 3.75 ms = 120 ms = 5292 samples
        let first = out.chunks_exact(2).position(|f| f[0] != 0);
        assert_eq!(first, Some(5292));
    }

    #[test]
    fn test_panning_delay_swaps_sides() {
        let status = ReverbStatusGs { character: 7, time: 8, delay_feedback: 0, ..Default::default() };
        let mut reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
        let mut bus = vec![0i32; 4096];
        bus[0] = 1 << 24;
        let mut out = vec![0i32; 4096];
        reverb.process(&mut bus, &mut out);
        assert!(out.iter().step_by(2).all(|&s| s == 0), "a left-only input lands on the right");
        assert!(out.iter().skip(1).step_by(2).any(|&s| s != 0));
    }

    #[test]
    fn test_plate_is_silent_on_silence_and_rings_on_impulse() {
        let status = ReverbStatusGs { character: 5, ..Default::default() };
        let mut reverb = SystemReverb::new(&status, ReverbAlgorithm::Freeverb, 44100.0);
        let mut bus = vec![0i32; 2048];
        let mut out = vec![0i32; 2048];
        reverb.process(&mut bus, &mut out);
        assert!(out.iter().all(|&s| s == 0));

        let out = impulse_response(&mut reverb, 16384);
        assert!(out.chunks_exact(2).any(|f| f[0] != 0) && out.chunks_exact(2).any(|f| f[1] != 0));
    }
}
