//! Resampled-signal source consumed by the mixer
//!
//! A [`Resampler`] reads a voice's PCM at the voice's pitch and produces
//! one block of `i32` samples. The mixer does not care how; the bundled
//! [`LinearResampler`] interpolates linearly between neighbouring frames.

use crate::voice::{SampleModes, Voice, FRACTION_BITS};

const FRACTION_MASK: i64 = (1 << FRACTION_BITS) - 1;

pub trait Resampler: Send {
    /// Fill `out` with the voice's next samples and advance its cursor.
    ///
    /// Returns how many samples came from the source. When a one-shot sample
    /// runs out the rest of `out` is zeroed and `voice.exhausted` is set.
    fn resample(&mut self, voice: &mut Voice, out: &mut [i32]) -> usize;
}

/// Q12 linear-interpolating resampler with forward and ping-pong loops
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearResampler;

impl LinearResampler {
    pub fn new() -> Self {
        LinearResampler
    }

    #[inline]
    fn interpolate(data: &[i16], ofs: i64) -> i32 {
        let i = (ofs >> FRACTION_BITS) as usize;
        let v1 = data.get(i).copied().unwrap_or(0) as i64;
        let v2 = data.get(i + 1).copied().unwrap_or(v1 as i16) as i64;
        (v1 + (((v2 - v1) * (ofs & FRACTION_MASK)) >> FRACTION_BITS)) as i32
    }
}

impl Resampler for LinearResampler {
    fn resample(&mut self, voice: &mut Voice, out: &mut [i32]) -> usize {
        let sample = voice.sample.clone();
        let data = &sample.data[..];
        let looping = sample.modes.contains(SampleModes::LOOPING)
            && (sample.modes.contains(SampleModes::ENVELOPE) || voice.status.is_held())
            && sample.loop_end > sample.loop_start;
        let pingpong = looping && sample.modes.contains(SampleModes::PINGPONG);

        let mut ofs = voice.sample_offset;
        let mut incr = voice.sample_increment as i64;
        let mut produced = 0;

        for slot in out.iter_mut() {
            if looping {
                if pingpong {
                    if incr > 0 && ofs >= sample.loop_end {
                        ofs = 2 * sample.loop_end - ofs;
                        incr = -incr;
                    } else if incr < 0 && ofs <= sample.loop_start {
                        ofs = 2 * sample.loop_start - ofs;
                        incr = -incr;
                    }
                } else {
                    let span = sample.loop_end - sample.loop_start;
                    while ofs >= sample.loop_end {
                        ofs -= span;
                    }
                }
            } else if ofs >= sample.data_length || ofs < 0 {
                voice.exhausted = true;
                break;
            }
            *slot = Self::interpolate(data, ofs);
            ofs += incr;
            produced += 1;
        }
        for slot in out[produced..].iter_mut() {
            *slot = 0;
        }

        voice.sample_offset = ofs;
        voice.sample_increment = incr as i32;
        produced
    }
}
