//! GS system chorus
//!
//! One modulated delay per side, driven by triangular LFOs a quarter cycle
//! apart. The wet signal goes to the output and is sent on to the reverb
//! and delay buses.

use super::status::ChorusStatusGs;
use crate::effects::primitives::ModDelay;
use crate::engine::lfo::{Lfo, LfoKind};
use crate::fixed::{fscale, imuldiv24};
use crate::tables::CHORUS_DELAY_TIME_TABLE;

#[derive(Clone, Debug, Default)]
pub struct SystemChorus {
    lines: [ModDelay; 2],
    lfos: [Lfo; 2],
    feedbacki: i32,
    leveli: i32,
    send_reverbi: i32,
    send_delayi: i32,
}

impl SystemChorus {
    /// Rebuild the delays and LFOs for the status and reset history
    ///
    /// # Arguments
    /// * `status` - GS chorus parameters
    /// * `sample_rate` - Output rate in Hz
    /// * `reverb_input_level` - Gain the active reverb expects on its send
    pub fn init(&mut self, status: &ChorusStatusGs, sample_rate: f64, reverb_input_level: f64) {
        let lfo_freq = status.rate as f64 * 0.122;
        self.lfos = Lfo::stereo(lfo_freq, LfoKind::Triangular, 90.0, sample_rate);

        let delay_ms = CHORUS_DELAY_TIME_TABLE[(status.delay & 0x7f) as usize];
        let depth = ((status.depth as f64 + 1.0) / 3.2 * sample_rate / 1000.0) as i32;
        let pdelay = ((delay_ms * sample_rate / 1000.0) as i32 - depth / 2).max(1);
        let size = (pdelay + depth + 2) as usize;
        for line in &mut self.lines {
            line.set(size, pdelay, depth);
        }

        self.feedbacki = fscale(status.feedback as f64 * 0.763 / 100.0, 24);
        self.leveli = fscale(status.level as f64 / 127.0 * 1.7, 24);
        self.send_reverbi =
            fscale(status.send_reverb as f64 * 0.787 / 100.0 * reverb_input_level, 24);
        self.send_delayi = fscale(status.send_delay as f64 * 0.787 / 100.0, 24);
        log::debug!("system chorus: {pdelay} samples, depth {depth}, rate {lfo_freq:.2} Hz");
    }

    /// Drain the chorus bus into `out`, feed the reverb and delay buses, clear the chorus bus
    pub fn process(
        &mut self,
        bus: &mut [i32],
        out: &mut [i32],
        reverb: &mut [i32],
        delay: &mut [i32],
    ) {
        let frames = bus
            .chunks_exact(2)
            .zip(out.chunks_exact_mut(2))
            .zip(reverb.chunks_exact_mut(2).zip(delay.chunks_exact_mut(2)));
        for ((input, frame), (rev, del)) in frames {
            for ch in 0..2 {
                let lfo = self.lfos[ch].next();
                let v = self.lines[ch].read(lfo);
                self.lines[ch].write(input[ch].saturating_add(imuldiv24(v, self.feedbacki)));
                let o = imuldiv24(v, self.leveli);
                frame[ch] = frame[ch].saturating_add(o);
                rev[ch] = rev[ch].saturating_add(imuldiv24(o, self.send_reverbi));
                del[ch] = del[ch].saturating_add(imuldiv24(o, self.send_delayi));
            }
        }
        bus.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: &ChorusStatusGs, frames: usize) -> (Vec<i32>, Vec<i32>, Vec<i32>, Vec<i32>) {
        let mut chorus = SystemChorus::default();
        chorus.init(status, 44100.0, 1.0);
        let mut bus = vec![0i32; frames * 2];
        for (i, s) in bus.iter_mut().enumerate() {
            *s = if (i / 2) % 64 < 32 { 1 << 22 } else { -(1 << 22) };
        }
        let mut out = vec![0i32; frames * 2];
        let mut reverb = vec![0i32; frames * 2];
        let mut delay = vec![0i32; frames * 2];
        chorus.process(&mut bus, &mut out, &mut reverb, &mut delay);
        assert!(bus.iter().all(|&s| s == 0), "chorus bus must be cleared");
        (bus, out, reverb, delay)
    }

    #[test]
    fn test_default_chorus_produces_wet_signal() {
        let (_, out, reverb, delay) = run(&ChorusStatusGs::default(), 4096);
        assert!(out.iter().any(|&s| s != 0), "chorus output should be audible");
        assert!(reverb.iter().all(|&s| s == 0), "default macro has no reverb send");
        assert!(delay.iter().all(|&s| s == 0), "default macro has no delay send");
    }

    #[test]
    fn test_zero_level_is_silent() {
        let status = ChorusStatusGs { level: 0, ..Default::default() };
        let (_, out, _, _) = run(&status, 2048);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_sends_follow_status() {
        let status = ChorusStatusGs { send_reverb: 127, send_delay: 127, ..Default::default() };
        let (_, out, reverb, delay) = run(&status, 4096);
        let energy = |buf: &[i32]| buf.iter().map(|&s| (s as f64).abs()).sum::<f64>();
        assert!(energy(&reverb) > 0.0 && energy(&delay) > 0.0);
        assert!(energy(&delay) < energy(&out), "sends are attenuated copies of the output");
    }

    #[test]
    fn test_sides_are_decorrelated() {
        let (_, out, _, _) = run(&ChorusStatusGs::default(), 8192);
        let differs = out.chunks_exact(2).any(|f| f[0] != f[1]);
        assert!(differs, "quadrature LFOs should modulate the sides differently");
    }
}
