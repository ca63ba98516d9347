//! Voice data model
//!
//! A [`Voice`] is one sounding note. It borrows its PCM from a shared
//! [`Sample`] and carries every piece of per-note state the envelope engine
//! and the mixer touch: envelope and modulation-envelope cursors, tremolo,
//! output levels and their smoothing ramps, the optional pan delay and the
//! resonant filter.
//!
//! Voices live in a pool owned by the engine. The mixer only borrows one for
//! the length of a render call.

pub mod filter;

pub use self::filter::{FilterCoefficients, FilterKind};

use crate::fixed::{fscale_neg, PAN_DELAY_BUF_MAX};
use crate::tables::{PAN_DELAY_TABLE, PAN_TABLE, PERCEIVED_VOL_TABLE};
use crate::utils::smoother::MixRamp;
use std::sync::Arc;

/// Envelope stage indices. GUS patches walk attack, decay, sustain and three
/// release stages; SoundFonts walk attack, hold, decay and release over the
/// same numbers.
pub const EG_GUS_ATTACK: usize = 0;
pub const EG_GUS_DECAY: usize = 1;
pub const EG_GUS_SUSTAIN: usize = 2;
pub const EG_GUS_RELEASE1: usize = 3;
pub const EG_GUS_RELEASE2: usize = 4;
pub const EG_GUS_RELEASE3: usize = 5;
pub const EG_SF_HOLD: usize = 1;
pub const EG_SF_DECAY: usize = 2;
pub const EG_SF_RELEASE: usize = 3;

/// Channel envelope-rate slots, indexed by the normalized stage.
pub const EG_ATTACK: usize = 0;
pub const EG_DECAY: usize = 2;
pub const EG_RELEASE: usize = 3;
pub const EG_NULL: usize = 5;

/// Number of stages in an envelope table
pub const ENVELOPE_STAGES: usize = 6;

/// Q12 fraction bits of the resampling cursor
pub const FRACTION_BITS: i32 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VoiceStatus {
    #[default]
    Free,
    On,
    Sustained,
    Off,
    Die,
}

impl VoiceStatus {
    /// Key still held, directly or by a pedal
    #[inline]
    pub fn is_held(self) -> bool {
        matches!(self, VoiceStatus::On | VoiceStatus::Sustained)
    }

    /// Eligible to be reclaimed once silent
    #[inline]
    pub fn is_releasing(self) -> bool {
        matches!(self, VoiceStatus::Off | VoiceStatus::Sustained)
    }
}

/// Panning law selected by [`Voice::apply_pan_law`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PanMode {
    /// Independent left and right levels
    #[default]
    Mystery,
    Left,
    Right,
    Center,
}

/// Patch format a sample was loaded from. The two formats number their
/// envelope stages differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstrumentKind {
    #[default]
    Gus,
    Sf2,
    Other,
}

/// Bit set of sample playback modes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SampleModes(u8);

impl SampleModes {
    pub const ENVELOPE: SampleModes = SampleModes(1);
    pub const LOOPING: SampleModes = SampleModes(1 << 1);
    pub const PINGPONG: SampleModes = SampleModes(1 << 2);

    pub const fn empty() -> Self {
        SampleModes(0)
    }

    #[inline]
    pub fn contains(self, other: SampleModes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SampleModes {
    type Output = SampleModes;

    fn bitor(self, rhs: SampleModes) -> SampleModes {
        SampleModes(self.0 | rhs.0)
    }
}

/// Decoded PCM plus the instrument parameters attached to it.
///
/// Envelope offsets are in the 30-bit envelope range, rates are envelope
/// units per control block. Positions (`loop_start`, `loop_end`,
/// `data_length`) are in Q12 frames.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    pub data: Vec<i16>,
    pub sample_rate: u32,
    /// Pitch of the recording in Hz
    pub root_freq: f64,
    pub loop_start: i64,
    pub loop_end: i64,
    pub data_length: i64,
    pub modes: SampleModes,
    pub inst_type: InstrumentKind,
    /// Linear gain, 1.0 = unity
    pub volume: f64,

    pub envelope_offset: [i32; ENVELOPE_STAGES],
    pub envelope_rate: [i32; ENVELOPE_STAGES],
    pub envelope_keyf: [i16; ENVELOPE_STAGES],
    pub envelope_velf: [i16; ENVELOPE_STAGES],
    pub envelope_velf_bpo: i32,
    pub envelope_delay: i32,

    pub modenv_offset: [i32; ENVELOPE_STAGES],
    pub modenv_rate: [i32; ENVELOPE_STAGES],
    pub modenv_keyf: [i16; ENVELOPE_STAGES],
    pub modenv_velf: [i16; ENVELOPE_STAGES],
    pub modenv_velf_bpo: i32,
    pub modenv_delay: i32,
    /// Cents of cutoff shift at full modulation envelope
    pub modenv_to_fc: i16,
    /// Cents of pitch shift at full modulation envelope
    pub modenv_to_pitch: i16,

    /// Filter cutoff in Hz, 0 = no filter
    pub cutoff_freq: i32,
    /// Filter resonance in centibels
    pub resonance: i16,
    pub key_to_fc: i16,
    pub key_to_fc_bpo: i16,
    pub vel_to_fc: i16,
    pub vel_to_fc_threshold: i16,
    pub vel_to_resonance: i16,
    pub tremolo_to_fc: i16,

    pub tremolo_depth: i32,
    pub tremolo_phase_increment: i32,
    pub tremolo_sweep_increment: i32,
    pub tremolo_delay: i32,
}

impl Sample {
    /// Wrap mono PCM recorded at `sample_rate` with root pitch `root_freq`.
    /// The sample plays once with no envelope until configured otherwise.
    pub fn new(data: Vec<i16>, sample_rate: u32, root_freq: f64) -> Self {
        let data_length = (data.len() as i64) << FRACTION_BITS;
        Self {
            data,
            sample_rate,
            root_freq,
            data_length,
            loop_end: data_length,
            volume: 1.0,
            ..Default::default()
        }
    }

    /// Loop between two frame positions
    pub fn with_loop(mut self, start: usize, end: usize) -> Self {
        self.loop_start = (start as i64) << FRACTION_BITS;
        self.loop_end = (end as i64) << FRACTION_BITS;
        self.modes = self.modes | SampleModes::LOOPING;
        self
    }

    /// Attach an amplitude envelope given as per-stage offsets and rates
    pub fn with_envelope(
        mut self,
        offsets: [i32; ENVELOPE_STAGES],
        rates: [i32; ENVELOPE_STAGES],
    ) -> Self {
        self.envelope_offset = offsets;
        self.envelope_rate = rates;
        self.modes = self.modes | SampleModes::ENVELOPE;
        self
    }
}

/// Per-channel controller state read by the envelope and mixer.
#[derive(Clone, Debug)]
pub struct ChannelState {
    /// Damper pedal depth (0-127)
    pub sustain: i32,
    pub sostenuto: bool,
    /// Seconds before a looping held note is forced to decay, 0 = never
    pub loop_timeout: i32,
    /// GS envelope-time controllers (64 = neutral) by normalized stage
    pub envelope_rate: [Option<u8>; ENVELOPE_STAGES],
    pub is_drum: bool,
    /// Drum-part envelope-time overrides by note
    pub drum_envelope_rate: Vec<Option<[Option<u8>; ENVELOPE_STAGES]>>,
    pub cutoff_freq_coef: f64,
    pub resonance_db: f64,
    /// Pitch-bend and tuning ratio applied on top of the note frequency
    pub pitch_factor: f64,
    pub volume: u8,
    pub expression: u8,
    pub reverb_level: u8,
    pub chorus_level: u8,
    pub delay_level: u8,
    /// Route through the GS channel EQ
    pub eq_gs: bool,
    /// Route through the insertion effect
    pub insertion_effect: bool,
    /// XG dry level (127 = full)
    pub dry_level: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            sustain: 0,
            sostenuto: false,
            loop_timeout: 0,
            envelope_rate: [Some(64); ENVELOPE_STAGES],
            is_drum: false,
            drum_envelope_rate: vec![None; 128],
            cutoff_freq_coef: 1.0,
            resonance_db: 0.0,
            pitch_factor: 1.0,
            volume: 100,
            expression: 127,
            reverb_level: 40,
            chorus_level: 0,
            delay_level: 0,
            eq_gs: true,
            insertion_effect: false,
            dry_level: 127,
        }
    }
}

impl ChannelState {
    /// Envelope-time controller for `eg_stage`, honouring drum-part overrides.
    /// `None` leaves the instrument's own rate untouched.
    pub fn envelope_controller(&self, note: i32, eg_stage: usize) -> Option<u8> {
        if self.is_drum {
            self.drum_envelope_rate
                .get(note as usize)
                .and_then(|part| part.as_ref())
                .and_then(|rates| rates[eg_stage])
        } else {
            self.envelope_rate[eg_stage]
        }
    }
}

/// One sounding note
#[derive(Clone, Debug)]
pub struct Voice {
    pub status: VoiceStatus,
    pub channel: usize,
    pub note: i32,
    pub velocity: i32,
    pub sample: Arc<Sample>,

    /// Read cursor into the sample, Q12 frames
    pub sample_offset: i64,
    /// Signed cursor step, Q12 frames per output sample
    pub sample_increment: i32,
    /// Note frequency in Hz before modulation
    pub orig_frequency: f64,
    pub frequency: f64,

    pub envelope_stage: usize,
    pub envelope_volume: i32,
    pub envelope_target: i32,
    pub envelope_increment: i32,
    pub envelope_scale: f64,
    pub inv_envelope_scale: i32,
    pub last_envelope_volume: f64,

    pub modenv_stage: usize,
    pub modenv_volume: i32,
    pub modenv_target: i32,
    pub modenv_increment: i32,
    pub modenv_delay: i32,
    pub last_modenv_volume: f64,

    pub tremolo_phase: i32,
    pub tremolo_phase_increment: i32,
    pub tremolo_sweep: i32,
    pub tremolo_sweep_position: i32,
    pub tremolo_depth: i32,
    pub tremolo_delay: i32,
    pub tremolo_volume: f64,

    pub left_amp: f64,
    pub right_amp: f64,
    pub left_mix: i32,
    pub right_mix: i32,
    pub old_left_mix: i32,
    pub old_right_mix: i32,
    pub left_ramp: MixRamp,
    pub right_ramp: MixRamp,
    pub panned: PanMode,
    /// MIDI pan position, 0 = hard left, 64 = centre, 127 = hard right
    pub panning: i32,

    pub pan_delay_buf: [i32; PAN_DELAY_BUF_MAX],
    pub pan_delay_rpt: i32,
    pub pan_delay_wpt: usize,
    pub pan_delay_spt: usize,

    /// Samples left in the current control block
    pub control_counter: i32,
    /// Samples to wait before the note sounds
    pub delay: i32,
    /// Length of the block being rendered
    pub delay_counter: i32,
    pub porta_control_ratio: i32,
    pub porta_control_counter: i32,

    pub fc: FilterCoefficients,
    /// Set by the resampler when a one-shot sample has run out
    pub exhausted: bool,
}

impl Voice {
    /// A free voice playing `sample` for `note` at `velocity` on `channel`.
    /// Call [`crate::envelope::start_note`] to bring it to life.
    pub fn new(sample: Arc<Sample>, channel: usize, note: i32, velocity: i32) -> Self {
        Self {
            status: VoiceStatus::Free,
            channel,
            note,
            velocity,
            sample,
            sample_offset: 0,
            sample_increment: 0,
            orig_frequency: 440.0 * 2f64.powf((note - 69) as f64 / 12.0),
            frequency: 0.0,
            envelope_stage: 0,
            envelope_volume: 0,
            envelope_target: 0,
            envelope_increment: 0,
            envelope_scale: 1.0,
            inv_envelope_scale: 1 << 16,
            last_envelope_volume: 0.0,
            modenv_stage: 0,
            modenv_volume: 0,
            modenv_target: 0,
            modenv_increment: 0,
            modenv_delay: 0,
            last_modenv_volume: 0.0,
            tremolo_phase: 0,
            tremolo_phase_increment: 0,
            tremolo_sweep: 0,
            tremolo_sweep_position: 0,
            tremolo_depth: 0,
            tremolo_delay: 0,
            tremolo_volume: 1.0,
            left_amp: 0.0,
            right_amp: 0.0,
            left_mix: 0,
            right_mix: 0,
            old_left_mix: 0,
            old_right_mix: 0,
            left_ramp: MixRamp::default(),
            right_ramp: MixRamp::default(),
            panned: PanMode::Mystery,
            panning: 64,
            pan_delay_buf: [0; PAN_DELAY_BUF_MAX],
            pan_delay_rpt: 0,
            pan_delay_wpt: 0,
            pan_delay_spt: 0,
            control_counter: 0,
            delay: 0,
            delay_counter: 0,
            porta_control_ratio: 0,
            porta_control_counter: 0,
            fc: FilterCoefficients::default(),
            exhausted: false,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.status == VoiceStatus::Free
    }

    /// Return the voice to the pool
    pub fn free(&mut self) {
        log::trace!("freeing voice on channel {} note {}", self.channel, self.note);
        self.status = VoiceStatus::Free;
        self.pan_delay_rpt = 0;
    }

    /// Amplitude before panning, about 21 bits at full scale
    ///
    /// # Arguments
    /// * `channel` - Channel volume and expression source
    /// * `master_volume` - Global gain
    /// * `effects_active` - Any send effect is running, which leaves less headroom
    pub fn base_amplitude(&self, channel: &ChannelState, master_volume: f64, effects_active: bool) -> f64 {
        let velocity = self.velocity.clamp(0, 127) as usize;
        let mut tempamp = master_volume
            * self.sample.volume
            * PERCEIVED_VOL_TABLE[velocity]
            * PERCEIVED_VOL_TABLE[channel.volume.min(127) as usize]
            * PERCEIVED_VOL_TABLE[channel.expression.min(127) as usize];

        tempamp *= if effects_active { 1.35 * 0.55 } else { 1.35 };

        if self.fc.kind != FilterKind::Off {
            tempamp *= self.fc.gain;
        }
        tempamp
    }

    /// Split `tempamp` into left/right amplitudes by the pan law.
    ///
    /// Moving between stereo and hard-right panning swaps the previous-block
    /// levels so the smoothing ramp starts from what was actually heard.
    pub fn apply_pan_law(&mut self, tempamp: f64) {
        if self.panning == 64 {
            self.panned = PanMode::Center;
            let amp = fscale_neg(tempamp * PAN_TABLE[64], 27);
            self.left_amp = amp;
            self.right_amp = amp;
        } else if self.panning < 2 {
            self.panned = PanMode::Left;
            self.left_amp = fscale_neg(tempamp, 20);
            self.right_amp = 0.0;
        } else if self.panning == 127 {
            if self.panned == PanMode::Mystery {
                self.old_left_mix = self.old_right_mix;
                self.old_right_mix = 0;
            }
            self.panned = PanMode::Right;
            self.left_amp = fscale_neg(tempamp, 20);
            self.right_amp = 0.0;
        } else {
            if self.panned == PanMode::Right {
                self.old_right_mix = self.old_left_mix;
                self.old_left_mix = 0;
            }
            let p = self.panning.clamp(0, 128) as usize;
            self.panned = PanMode::Mystery;
            self.left_amp = fscale_neg(tempamp * PAN_TABLE[128 - p], 27);
            self.right_amp = fscale_neg(tempamp * PAN_TABLE[p], 27);
        }
    }

    /// Recompute left/right amplitudes from channel state and panning
    pub fn recompute_amp(&mut self, channel: &ChannelState, master_volume: f64, effects_active: bool) {
        let tempamp = self.base_amplitude(channel, master_volume, effects_active);
        self.apply_pan_law(tempamp);
    }

    /// Set up the inter-aural pan delay. The nearer ear is delayed by the
    /// common part, the farther one additionally by the difference.
    pub fn init_pan_delay(&mut self, enabled: bool, sample_rate: f64) {
        self.pan_delay_rpt = 0;
        self.pan_delay_wpt = 0;
        self.pan_delay_spt = 0;
        self.pan_delay_buf = [0; PAN_DELAY_BUF_MAX];
        if !enabled {
            return;
        }
        let p = self.panning.clamp(0, 127) as usize;
        if p == 64 {
            self.delay += (PAN_DELAY_TABLE[64] * sample_rate / 1000.0) as i32;
        } else {
            let near = PAN_DELAY_TABLE[p].min(PAN_DELAY_TABLE[127 - p]);
            let diff = (PAN_DELAY_TABLE[p] - PAN_DELAY_TABLE[127 - p]).abs();
            self.delay += (near * sample_rate / 1000.0) as i32;
            self.pan_delay_rpt = (diff * sample_rate / 1000.0) as i32;
        }
        if self.pan_delay_rpt < 1 {
            self.pan_delay_rpt = 0;
        }
        self.pan_delay_rpt = self.pan_delay_rpt.min(PAN_DELAY_BUF_MAX as i32 - 1);
        let spt = -self.pan_delay_rpt;
        self.pan_delay_spt = if spt < 0 {
            (spt + PAN_DELAY_BUF_MAX as i32) as usize
        } else {
            spt as usize
        };
    }
}
