//! GS system delay: normal, three-tap and cross routing
//!
//! Both lines share one write cursor. The centre tap feeds back; the side
//! taps of the three-tap delay read the sum of both lines. Every output
//! sample is also sent to the reverb bus.

use super::status::{DelayKind, DelayStatusGs};
use crate::effects::primitives::{advance_tap, DelayLine};
use crate::fixed::{fscale, imuldiv24};

/// Make-up gain of the system delay output
const MASTER_DELAY_LEVEL: f64 = 3.25;

#[derive(Clone, Debug, Default)]
pub struct SystemDelay {
    pub kind: DelayKind,
    line_l: DelayLine,
    line_r: DelayLine,
    /// Read cursors for the centre, left and right taps
    taps: [usize; 3],
    leveli: [i32; 3],
    feedbacki: i32,
    send_reverbi: i32,
}

impl SystemDelay {
    /// Allocate lines for the status and reset history
    ///
    /// # Arguments
    /// * `status` - Recomputed GS delay parameters
    /// * `reverb_input_level` - Gain the active reverb expects on its send
    pub fn init(&mut self, status: &DelayStatusGs, reverb_input_level: f64) {
        self.kind = status.kind;
        let len = status.sample.iter().copied().max().unwrap_or(0) + 1;
        self.line_l.set(len);
        self.line_r.set(len);
        for (tap, size) in self.taps.iter_mut().zip(status.sample) {
            *tap = (len - size) % len;
        }
        self.leveli = status.level_ratio.map(|ratio| fscale(ratio * MASTER_DELAY_LEVEL, 24));
        self.feedbacki = fscale(status.feedback_ratio, 24);
        self.send_reverbi = fscale(status.send_reverb_ratio * reverb_input_level, 24);
    }

    /// Drain the delay bus into `out`, feed the reverb bus and clear the delay bus
    pub fn process(&mut self, bus: &mut [i32], out: &mut [i32], reverb: &mut [i32]) {
        let len = self.line_l.len();
        let frames = out
            .chunks_exact_mut(2)
            .zip(bus.chunks_exact(2))
            .zip(reverb.chunks_exact_mut(2));
        for ((frame, input), rev) in frames {
            let [t0, t1, t2] = self.taps;
            let (l, r) = match self.kind {
                DelayKind::Normal => {
                    self.feed(input, false);
                    (
                        imuldiv24(self.line_l.at(t0), self.leveli[0]),
                        imuldiv24(self.line_r.at(t0), self.leveli[0]),
                    )
                }
                DelayKind::ThreeTap => {
                    self.feed(input, false);
                    let side = |tap: usize| self.line_l.at(tap).saturating_add(self.line_r.at(tap));
                    (
                        imuldiv24(self.line_l.at(t0), self.leveli[0])
                            .saturating_add(imuldiv24(side(t1), self.leveli[1])),
                        imuldiv24(self.line_r.at(t0), self.leveli[0])
                            .saturating_add(imuldiv24(side(t2), self.leveli[2])),
                    )
                }
                DelayKind::Cross => {
                    self.feed(input, true);
                    // each line plays out of the opposite speaker
                    (
                        imuldiv24(self.line_r.at(t0), self.leveli[0]),
                        imuldiv24(self.line_l.at(t0), self.leveli[0]),
                    )
                }
            };
            frame[0] = frame[0].saturating_add(l);
            frame[1] = frame[1].saturating_add(r);
            rev[0] = rev[0].saturating_add(imuldiv24(l, self.send_reverbi));
            rev[1] = rev[1].saturating_add(imuldiv24(r, self.send_reverbi));

            for tap in self.taps.iter_mut() {
                advance_tap(tap, len);
            }
            self.line_l.advance();
            self.line_r.advance();
        }
        bus.fill(0);
    }

    /// Write one input frame plus centre-tap feedback, same side or crossed
    #[inline]
    fn feed(&mut self, input: &[i32], cross: bool) {
        let t0 = self.taps[0];
        let fb_l = imuldiv24(self.line_l.at(t0), self.feedbacki);
        let fb_r = imuldiv24(self.line_r.at(t0), self.feedbacki);
        let (fb_l, fb_r) = if cross { (fb_r, fb_l) } else { (fb_l, fb_r) };
        self.line_l.write(input[0].saturating_add(fb_l));
        self.line_r.write(input[1].saturating_add(fb_r));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(kind: DelayKind) -> DelayStatusGs {
        let mut status = DelayStatusGs { feedback: 64, level: 127, ..Default::default() };
        status.recompute(44100.0);
        status.kind = kind;
        status
    }

    fn first_nonzero(buf: &[i32], ch: usize) -> Option<usize> {
        buf.chunks_exact(2).position(|f| f[ch] != 0)
    }

    #[test]
    fn test_normal_delay_repeats_after_centre_time() {
        let status = status(DelayKind::Normal);
        let mut delay = SystemDelay::default();
        delay.init(&status, 1.0);
        let frames = status.sample[0] + 16;
        let mut bus = vec![0i32; frames * 2];
        bus[0] = 1 << 20;
        let mut out = vec![0i32; frames * 2];
        let mut reverb = vec![0i32; frames * 2];
        delay.process(&mut bus, &mut out, &mut reverb);
        assert_eq!(first_nonzero(&out, 0), Some(status.sample[0]));
        assert!(bus.iter().all(|&s| s == 0), "delay bus must be cleared");
        assert!(reverb.iter().all(|&s| s == 0), "no reverb send by default");
    }

    #[test]
    fn test_cross_delay_swaps_sides() {
        let status = status(DelayKind::Cross);
        let mut delay = SystemDelay::default();
        delay.init(&status, 1.0);
        let frames = status.sample[0] + 16;
        let mut bus = vec![0i32; frames * 2];
        bus[0] = 1 << 20;
        let mut out = vec![0i32; frames * 2];
        let mut reverb = vec![0i32; frames * 2];
        delay.process(&mut bus, &mut out, &mut reverb);
        assert_eq!(first_nonzero(&out, 0), None, "a left input with no feedback never reaches the left");
        assert_eq!(first_nonzero(&out, 1), Some(status.sample[0]));
    }

    #[test]
    fn test_reverb_send_follows_output() {
        let mut status = DelayStatusGs { send_reverb: 127, ..Default::default() };
        status.recompute(44100.0);
        let mut delay = SystemDelay::default();
        delay.init(&status, 1.0);
        let frames = status.sample[0] + 4;
        let mut bus = vec![0i32; frames * 2];
        bus[1] = 1 << 20;
        let mut out = vec![0i32; frames * 2];
        let mut reverb = vec![0i32; frames * 2];
        delay.process(&mut bus, &mut out, &mut reverb);
        assert_eq!(first_nonzero(&reverb, 1), first_nonzero(&out, 1));
    }
}
