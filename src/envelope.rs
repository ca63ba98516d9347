//! Voice envelope engine
//!
//! Drives the amplitude envelope, the modulation envelope and tremolo of a
//! [`Voice`] once per control block, and turns the result into the integer
//! mix levels the mixer ramps towards.
//!
//! Envelope values live in `0..=OFFSET_MAX`. Each stage has a target offset
//! and a signed per-block increment; crossing the target snaps to it and
//! advances the stage. Functions returning `bool` return `true` when the
//! voice died and was freed.

use crate::config::{SynthConfig, VoiceFilterMode};
use crate::fixed::{fscale, imuldiv16, AMP_BITS, MAX_AMP_VALUE, OFFSET_MAX, RATE_SHIFT, SWEEP_SHIFT};
use crate::tables::{
    lookup_sine, ATTACK_VOL_TABLE, MODENV_VOL_TABLE, SB_VOL_TABLE, SC_EG_ATTACK_TABLE, SC_EG_DECAY_TABLE,
    SC_EG_RELEASE_TABLE, VOL_TABLE,
};
use crate::voice::filter::recompute_voice_filter;
use crate::voice::{
    ChannelState, FilterCoefficients, InstrumentKind, PanMode, SampleModes, Voice, VoiceStatus, EG_ATTACK, EG_DECAY,
    EG_GUS_ATTACK, EG_GUS_DECAY, EG_GUS_RELEASE1, EG_GUS_RELEASE3, EG_GUS_SUSTAIN, EG_NULL, EG_RELEASE, EG_SF_DECAY,
    EG_SF_RELEASE, FRACTION_BITS,
};

/// Tremolo depth scaling
const TREMOLO_AMPLITUDE_TUNING: f64 = 1.0;

/// Collaborator refreshing pitch and filter after a modulation-envelope step
pub trait VoiceHost {
    fn recompute_voice_filter(&self, voice: &mut Voice, ctx: &EnvelopeContext);
    fn recompute_freq(&self, voice: &mut Voice, ctx: &EnvelopeContext);
}

/// Host that recomputes the voice filter and the resampling increment
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHost;

impl VoiceHost for DefaultHost {
    fn recompute_voice_filter(&self, voice: &mut Voice, ctx: &EnvelopeContext) {
        recompute_voice_filter(voice, ctx.channel, ctx.sample_rate, ctx.modulation_envelope);
    }

    fn recompute_freq(&self, voice: &mut Voice, ctx: &EnvelopeContext) {
        let sample = voice.sample.clone();
        let mut cents = 0.0;
        if ctx.modulation_envelope && sample.modenv_to_pitch != 0 {
            cents += sample.modenv_to_pitch as f64 * voice.last_modenv_volume;
        }
        voice.frequency = voice.orig_frequency * ctx.channel.pitch_factor * 2f64.powf(cents / 1200.0);
        if sample.root_freq <= 0.0 {
            return;
        }
        let ratio = sample.sample_rate as f64 * voice.frequency / (sample.root_freq * ctx.sample_rate);
        let a = (ratio * (1 << FRACTION_BITS) as f64 + 0.5) as i32;
        voice.sample_increment = if voice.sample_increment < 0 { -a } else { a };
    }
}

/// Everything the envelope engine reads besides the voice itself
pub struct EnvelopeContext<'a> {
    pub sample_rate: f64,
    pub control_ratio: i32,
    /// Milliseconds a held note takes to decay; 0 disables, 1 skips sustain
    pub min_sustain_time: i32,
    pub modulation_envelope: bool,
    pub channel: &'a ChannelState,
    pub host: &'a dyn VoiceHost,
}

impl<'a> EnvelopeContext<'a> {
    /// Context for a voice on `channel` under `config`
    pub fn new(config: &SynthConfig, channel: &'a ChannelState, host: &'a dyn VoiceHost) -> Self {
        Self {
            sample_rate: config.rate(),
            control_ratio: config.control_ratio as i32,
            min_sustain_time: config.min_sustain_time,
            modulation_envelope: config.modulation_envelope,
            channel,
            host,
        }
    }
}

/// Advance every modulator by one control block and refresh the mix levels.
pub fn update_signal(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    if voice.envelope_increment != 0 && update_envelope(voice, ctx) {
        return true;
    }
    if voice.tremolo_phase_increment != 0 {
        update_tremolo(voice);
    }
    if ctx.modulation_envelope && voice.sample.modes.contains(SampleModes::ENVELOPE) {
        update_modulation_envelope(voice, ctx);
    }
    apply_envelope_to_amp(voice)
}

/// Step the amplitude envelope once
pub fn update_envelope(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    voice.envelope_volume = voice.envelope_volume.saturating_add(voice.envelope_increment);
    if (voice.envelope_increment < 0) ^ (voice.envelope_volume > voice.envelope_target) {
        voice.envelope_volume = voice.envelope_target;
        if recompute_envelope(voice, ctx) {
            return true;
        }
    }
    false
}

/// Map a stage index onto the channel's envelope-time controller slot.
pub fn get_eg_stage(voice: &Voice, stage: usize) -> usize {
    if voice.sample.inst_type == InstrumentKind::Sf2 {
        if stage >= EG_SF_RELEASE {
            return EG_RELEASE;
        }
        stage
    } else if stage == EG_GUS_DECAY {
        EG_DECAY
    } else if stage == EG_GUS_SUSTAIN {
        EG_NULL
    } else if stage >= EG_GUS_RELEASE1 {
        EG_RELEASE
    } else {
        stage
    }
}

/// Milliseconds a held note takes to fade, after pedal scaling
fn sustain_time(ctx: &EnvelopeContext) -> f64 {
    let channel = ctx.channel;
    let mut sustain_time = if channel.loop_timeout > 0 && channel.loop_timeout * 1000 < ctx.min_sustain_time {
        (channel.loop_timeout * 1000) as f64
    } else {
        ctx.min_sustain_time as f64
    };
    if !channel.sostenuto && channel.sustain > 0 {
        sustain_time *= channel.sustain as f64 / 127.0;
    }
    sustain_time
}

/// Number of control blocks spanned by `sustain_time` milliseconds
fn sustain_width(ctx: &EnvelopeContext, sustain_time: f64) -> i32 {
    ((sustain_time * ctx.sample_rate / (1000.0 * ctx.control_ratio as f64)) as i32).max(1)
}

/// Handle a finished stage: reclaim the voice, hold the sustain, or move on.
pub fn recompute_envelope(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    let stage = voice.envelope_stage;
    if stage > EG_GUS_RELEASE3 || (stage > EG_GUS_SUSTAIN && voice.envelope_volume <= 0) {
        voice.free();
        return true;
    }

    if stage == EG_GUS_RELEASE1 && voice.sample.modes.contains(SampleModes::ENVELOPE) && voice.status.is_held() {
        if voice.status == VoiceStatus::On {
            return false;
        }
        if ctx.min_sustain_time > 0 || ctx.channel.loop_timeout > 0 {
            if ctx.min_sustain_time == 1 {
                return next_stage(voice, ctx);
            }
            let width = sustain_width(ctx, sustain_time(ctx));
            let sample = voice.sample.clone();
            if sample.inst_type == InstrumentKind::Sf2 {
                voice.envelope_increment = -1;
                voice.envelope_target = (voice.envelope_volume - width).max(0);
            } else {
                voice.envelope_target = 0;
                let mut new_rate = voice.envelope_volume / width;
                let release = sample.envelope_rate[EG_GUS_RELEASE1];
                if release != 0 && release < new_rate {
                    new_rate = release;
                }
                let sustain = sample.envelope_rate[EG_GUS_SUSTAIN];
                if sample.inst_type == InstrumentKind::Gus && sustain != 0 && sustain < new_rate {
                    new_rate = sustain;
                }
                if new_rate == 0 {
                    new_rate = 1;
                }
                voice.envelope_increment = -new_rate;
            }
        }
        return false;
    }
    next_stage(voice, ctx)
}

/// Stretch a post-attack ramp so it spans at least 20 ms
fn limit_ramp(rate: f64, distance: i32, ctx: &EnvelopeContext) -> f64 {
    let mut temp = ctx.control_ratio as f64 * (distance.unsigned_abs() as f64 / (ctx.sample_rate * 0.02));
    if temp < 1.0 {
        temp = 1.0;
    }
    if rate < 0.0 {
        temp = -temp;
    }
    if temp.abs() < rate.abs() {
        temp
    } else {
        rate
    }
}

fn clamp_rate(rate: f64) -> f64 {
    let limit = OFFSET_MAX as f64;
    if rate.abs() > limit {
        limit.copysign(rate)
    } else if rate.abs() < 1.0 {
        if rate > 0.0 {
            1.0
        } else {
            -1.0
        }
    } else {
        rate
    }
}

/// Key- and velocity-follow applied to a stage's base rate
fn follow_rate(mut rate: f64, voice: &Voice, keyf: i16, velf: i16, velf_bpo: i32, key_follow: bool) -> f64 {
    if key_follow && keyf != 0 {
        rate *= 2f64.powf((voice.note - 60) as f64 * keyf as f64 / 1200.0);
    }
    if velf != 0 {
        rate *= 2f64.powf((voice.velocity - velf_bpo) as f64 * velf as f64 / 1200.0);
    }
    rate
}

/// Enter the next amplitude stage and compute its increment and target.
pub fn next_stage(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    let stage = voice.envelope_stage;
    voice.envelope_stage += 1;
    let sample = voice.sample.clone();
    let offset = sample.envelope_offset[stage];
    let mut rate = sample.envelope_rate[stage] as f64;

    if voice.envelope_volume == offset || (stage > EG_GUS_SUSTAIN && voice.envelope_volume < offset) {
        return recompute_envelope(voice, ctx);
    }
    let eg_stage = get_eg_stage(voice, stage);

    if eg_stage > EG_ATTACK {
        rate = limit_ramp(rate, voice.envelope_volume - offset, ctx);
    }

    let controller = ctx.channel.envelope_controller(voice.note, eg_stage);
    rate = follow_rate(
        rate,
        voice,
        sample.envelope_keyf[stage],
        sample.envelope_velf[stage],
        sample.envelope_velf_bpo,
        !ctx.channel.is_drum,
    );

    if stage > EG_GUS_SUSTAIN {
        if sample.envelope_offset[EG_GUS_ATTACK] != 0 {
            rate *= voice.envelope_volume as f64 / sample.envelope_offset[EG_GUS_ATTACK] as f64;
        }
        voice.envelope_scale = voice.last_envelope_volume;
        voice.inv_envelope_scale = if voice.envelope_volume > 0 {
            fscale(OFFSET_MAX as f64 / voice.envelope_volume as f64, 16)
        } else {
            1 << 16
        };
    }

    if offset < voice.envelope_volume {
        if let Some(val) = controller {
            let idx = (val & 0x7f) as usize;
            rate *= if eg_stage > EG_DECAY { SC_EG_RELEASE_TABLE[idx] } else { SC_EG_DECAY_TABLE[idx] };
            rate = clamp_rate(rate);
        }
        if stage < EG_SF_DECAY && rate > OFFSET_MAX as f64 {
            voice.envelope_volume = offset;
            return recompute_envelope(voice, ctx);
        } else if rate > (voice.envelope_volume - offset) as f64 {
            rate = (-voice.envelope_volume + offset - 1) as f64;
        } else if rate < 1.0 {
            rate = -1.0;
        } else {
            rate = -rate;
        }
    } else {
        if let Some(val) = controller {
            rate *= SC_EG_ATTACK_TABLE[(val & 0x7f) as usize];
            rate = clamp_rate(rate);
        }
        if stage < EG_SF_DECAY && rate > OFFSET_MAX as f64 {
            voice.envelope_volume = offset;
            return recompute_envelope(voice, ctx);
        } else if rate > (offset - voice.envelope_volume) as f64 {
            rate = (offset - voice.envelope_volume + 1) as f64;
        } else if rate < 1.0 {
            rate = 1.0;
        }
    }

    if eg_stage > EG_ATTACK {
        rate = limit_ramp(rate, voice.envelope_volume - offset, ctx);
    }

    voice.envelope_increment = rate as i32;
    voice.envelope_target = offset;
    false
}

/// Step tremolo phase, sweep and delay, and recompute its gain multiplier.
pub fn update_tremolo(voice: &mut Voice) {
    let mut depth = voice.tremolo_depth << 7;

    if voice.tremolo_delay > 0 {
        voice.tremolo_delay -= voice.delay_counter;
        if voice.tremolo_delay > 0 {
            voice.tremolo_volume = 1.0;
            return;
        }
        voice.tremolo_delay = 0;
    }
    if voice.tremolo_sweep != 0 {
        voice.tremolo_sweep_position += voice.tremolo_sweep;
        if voice.tremolo_sweep_position >= 1 << SWEEP_SHIFT {
            voice.tremolo_sweep = 0;
        } else {
            depth = ((depth as i64 * voice.tremolo_sweep_position as i64) >> SWEEP_SHIFT) as i32;
        }
    }
    voice.tremolo_phase = voice.tremolo_phase.wrapping_add(voice.tremolo_phase_increment);

    voice.tremolo_volume = 1.0
        + lookup_sine(voice.tremolo_phase >> RATE_SHIFT) * depth as f64 * TREMOLO_AMPLITUDE_TUNING
            / (1u32 << 17) as f64;
}

/// Current envelope gain read through the instrument's volume curve
fn envelope_gain(voice: &Voice) -> f64 {
    let table: &[f64; 1024] = if voice.sample.inst_type == InstrumentKind::Sf2 { &SB_VOL_TABLE } else { &VOL_TABLE };
    let index = |v: i32| ((v >> 20).clamp(0, 1023)) as usize;
    if voice.envelope_stage > 3 {
        table[index(imuldiv16(voice.envelope_volume, voice.inv_envelope_scale))] * voice.envelope_scale
    } else if voice.envelope_stage > 1 {
        table[index(voice.envelope_volume)]
    } else {
        ATTACK_VOL_TABLE[index(voice.envelope_volume)]
    }
}

/// Fold envelope and tremolo into the voice's target mix levels. A released
/// voice whose level reached zero is freed.
pub fn apply_envelope_to_amp(voice: &mut Voice) -> bool {
    let mut lamp = voice.left_amp;
    let has_envelope = voice.sample.modes.contains(SampleModes::ENVELOPE);

    if voice.panned == PanMode::Mystery {
        let mut ramp = voice.right_amp;
        if voice.tremolo_phase_increment != 0 {
            lamp *= voice.tremolo_volume;
            ramp *= voice.tremolo_volume;
        }
        if has_envelope {
            voice.last_envelope_volume = envelope_gain(voice);
            lamp *= voice.last_envelope_volume;
            ramp *= voice.last_envelope_volume;
        }
        let la = fscale(lamp, AMP_BITS).min(MAX_AMP_VALUE);
        let ra = fscale(ramp, AMP_BITS).min(MAX_AMP_VALUE);
        if voice.status.is_releasing() && (la | ra) <= 0 {
            voice.free();
            return true;
        }
        voice.left_mix = la;
        voice.right_mix = ra;
    } else {
        if voice.tremolo_phase_increment != 0 {
            lamp *= voice.tremolo_volume;
        }
        if has_envelope {
            voice.last_envelope_volume = envelope_gain(voice);
            lamp *= voice.last_envelope_volume;
        }
        let la = fscale(lamp, AMP_BITS).min(MAX_AMP_VALUE);
        if voice.status.is_releasing() && la <= 0 {
            voice.free();
            return true;
        }
        voice.left_mix = la;
    }
    false
}

/// Step the modulation envelope once. Returns `true` while it is still
/// delayed or has run out.
pub fn update_modulation_envelope(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    if voice.modenv_delay > 0 {
        voice.modenv_delay -= voice.delay_counter;
        if voice.modenv_delay > 0 {
            return true;
        }
        voice.modenv_delay = 0;
    }
    voice.modenv_volume = voice.modenv_volume.saturating_add(voice.modenv_increment);
    if (voice.modenv_increment < 0) ^ (voice.modenv_volume > voice.modenv_target) {
        voice.modenv_volume = voice.modenv_target;
        if recompute_modulation_envelope(voice, ctx) {
            apply_modulation_envelope(voice, ctx);
            return true;
        }
    }
    apply_modulation_envelope(voice, ctx);
    false
}

/// Push the modulation envelope into the filter cutoff and pitch.
pub fn apply_modulation_envelope(voice: &mut Voice, ctx: &EnvelopeContext) {
    if !ctx.modulation_envelope {
        return;
    }
    if voice.sample.modes.contains(SampleModes::ENVELOPE) {
        voice.last_modenv_volume = MODENV_VOL_TABLE[((voice.modenv_volume >> 20).clamp(0, 1023)) as usize];
    }
    ctx.host.recompute_voice_filter(voice, ctx);
    if !(voice.porta_control_ratio != 0 && voice.porta_control_counter == 0) {
        ctx.host.recompute_freq(voice, ctx);
    }
}

/// Enter the next modulation stage.
pub fn modenv_next_stage(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    let stage = voice.modenv_stage;
    voice.modenv_stage += 1;
    let sample = voice.sample.clone();
    let offset = sample.modenv_offset[stage];
    let mut rate = sample.modenv_rate[stage] as f64;

    if voice.modenv_volume == offset || (stage > EG_GUS_SUSTAIN && voice.modenv_volume < offset) {
        return recompute_modulation_envelope(voice, ctx);
    } else if stage < EG_SF_DECAY && rate > OFFSET_MAX as f64 {
        voice.modenv_volume = offset;
        return recompute_modulation_envelope(voice, ctx);
    }
    let eg_stage = get_eg_stage(voice, stage);
    let controller = ctx.channel.envelope_controller(voice.note, eg_stage);
    rate = follow_rate(
        rate,
        voice,
        sample.modenv_keyf[stage],
        sample.modenv_velf[stage],
        sample.modenv_velf_bpo,
        !ctx.channel.is_drum,
    );

    if stage > EG_GUS_SUSTAIN && sample.modenv_offset[EG_GUS_ATTACK] != 0 {
        rate *= voice.modenv_volume as f64 / sample.modenv_offset[EG_GUS_ATTACK] as f64;
    }

    if offset < voice.modenv_volume {
        if let Some(val) = controller {
            let idx = (val & 0x7f) as usize;
            rate *= if stage > EG_DECAY { SC_EG_RELEASE_TABLE[idx] } else { SC_EG_DECAY_TABLE[idx] };
        }
        if rate > (voice.modenv_volume - offset) as f64 {
            rate = (-voice.modenv_volume + offset - 1) as f64;
        } else if rate < 1.0 {
            rate = -1.0;
        } else {
            rate = -rate;
        }
    } else {
        if let Some(val) = controller {
            rate *= SC_EG_ATTACK_TABLE[(val & 0x7f) as usize];
        }
        if rate > (offset - voice.modenv_volume) as f64 {
            rate = (offset - voice.modenv_volume + 1) as f64;
        } else if rate < 1.0 {
            rate = 1.0;
        }
    }

    voice.modenv_increment = rate as i32;
    voice.modenv_target = offset;
    false
}

/// Handle a finished modulation stage. Returns `true` once it has run out.
pub fn recompute_modulation_envelope(voice: &mut Voice, ctx: &EnvelopeContext) -> bool {
    if !ctx.modulation_envelope {
        return false;
    }
    let stage = voice.modenv_stage;
    if stage > EG_GUS_RELEASE3 || (stage > EG_GUS_SUSTAIN && voice.modenv_volume <= 0) {
        return true;
    }

    if stage == EG_GUS_RELEASE1 && voice.sample.modes.contains(SampleModes::ENVELOPE) && voice.status.is_held() {
        if voice.status == VoiceStatus::On {
            return false;
        }
        if ctx.min_sustain_time > 0 || ctx.channel.loop_timeout > 0 {
            if ctx.min_sustain_time == 1 {
                return modenv_next_stage(voice, ctx);
            }
            let width = sustain_width(ctx, sustain_time(ctx));
            voice.modenv_increment = -1;
            voice.modenv_target = (voice.modenv_volume - width).max(0);
        }
        return false;
    }
    modenv_next_stage(voice, ctx)
}

fn init_tremolo(voice: &mut Voice) {
    let sample = voice.sample.clone();
    voice.tremolo_delay = sample.tremolo_delay;
    voice.tremolo_phase = 0;
    voice.tremolo_phase_increment = sample.tremolo_phase_increment;
    voice.tremolo_sweep = sample.tremolo_sweep_increment;
    voice.tremolo_sweep_position = 0;
    voice.tremolo_depth = sample.tremolo_depth;
}

/// Parameters fixed when a note starts
pub struct NoteStart {
    pub panning: i32,
    pub master_volume: f64,
    pub effects_active: bool,
    pub pan_delay: bool,
    pub filter: VoiceFilterMode,
}

/// Bring a voice to life: reset modulators, compute pitch, filter and
/// levels, and enter the attack stage.
pub fn start_note(voice: &mut Voice, ctx: &EnvelopeContext, start: &NoteStart) {
    let sample = voice.sample.clone();
    voice.status = VoiceStatus::On;
    voice.sample_offset = 0;
    voice.sample_increment = 0;
    voice.exhausted = false;
    voice.delay = sample.envelope_delay;
    voice.modenv_delay = sample.modenv_delay;
    voice.delay_counter = 0;

    init_tremolo(voice);
    voice.fc = FilterCoefficients::new(start.filter, sample.cutoff_freq, sample.resonance);
    voice.panning = start.panning;
    voice.init_pan_delay(start.pan_delay, ctx.sample_rate);
    voice.porta_control_ratio = 0;
    voice.porta_control_counter = 0;

    if sample.modes.contains(SampleModes::ENVELOPE) {
        voice.modenv_stage = EG_GUS_ATTACK;
        voice.modenv_volume = 0;
        recompute_modulation_envelope(voice, ctx);
    } else {
        voice.modenv_increment = 0;
    }
    apply_modulation_envelope(voice, ctx);
    ctx.host.recompute_freq(voice, ctx);
    ctx.host.recompute_voice_filter(voice, ctx);

    voice.recompute_amp(ctx.channel, start.master_volume, start.effects_active);
    if sample.modes.contains(SampleModes::ENVELOPE) {
        voice.envelope_stage = EG_GUS_ATTACK;
        voice.envelope_volume = 0;
        voice.control_counter = 0;
        recompute_envelope(voice, ctx);
    } else {
        voice.envelope_increment = 0;
    }
    apply_envelope_to_amp(voice);
}

/// Key released: move the envelopes out of sustain into release.
pub fn finish_note(voice: &mut Voice, ctx: &EnvelopeContext) {
    if voice.sample.modes.contains(SampleModes::ENVELOPE) {
        voice.status = VoiceStatus::Off;
        voice.envelope_stage = EG_GUS_RELEASE1;
        if recompute_envelope(voice, ctx) {
            return;
        }
        voice.modenv_stage = EG_GUS_RELEASE1;
        recompute_modulation_envelope(voice, ctx);
        apply_modulation_envelope(voice, ctx);
        apply_envelope_to_amp(voice);
    } else {
        voice.status = VoiceStatus::Off;
    }
}

/// Cut a voice: it ramps out over at most a few samples on its next render.
pub fn kill_note(voice: &mut Voice) {
    if !voice.is_free() {
        voice.status = VoiceStatus::Die;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::Sample;
    use std::sync::Arc;

    fn gus_sample() -> Sample {
        Sample::new(vec![1000; 64], 44100, 440.0).with_envelope(
            [OFFSET_MAX, OFFSET_MAX / 2, OFFSET_MAX / 2, 0, 0, 0],
            [1 << 24, 1 << 20, 1 << 20, 1 << 22, 1 << 22, 1 << 22],
        )
    }

    fn context<'a>(channel: &'a ChannelState, min_sustain_time: i32) -> EnvelopeContext<'a> {
        EnvelopeContext {
            sample_rate: 44100.0,
            control_ratio: 44,
            min_sustain_time,
            modulation_envelope: false,
            channel,
            host: &DefaultHost,
        }
    }

    fn started(sample: Sample, ctx: &EnvelopeContext) -> Voice {
        let mut voice = Voice::new(Arc::new(sample), 0, 69, 100);
        let start = NoteStart {
            panning: 64,
            master_volume: 1.0,
            effects_active: false,
            pan_delay: false,
            filter: crate::config::VoiceFilterMode::Off,
        };
        start_note(&mut voice, ctx, &start);
        voice
    }

    #[test]
    fn test_eg_stage_mapping() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let gus = started(gus_sample(), &ctx);
        assert_eq!(get_eg_stage(&gus, 0), EG_ATTACK);
        assert_eq!(get_eg_stage(&gus, 1), EG_DECAY);
        assert_eq!(get_eg_stage(&gus, 2), EG_NULL);
        assert_eq!(get_eg_stage(&gus, 4), EG_RELEASE);

        let mut sf2 = gus_sample();
        sf2.inst_type = InstrumentKind::Sf2;
        let sf2 = started(sf2, &ctx);
        assert_eq!(get_eg_stage(&sf2, 1), 1);
        assert_eq!(get_eg_stage(&sf2, 2), 2);
        assert_eq!(get_eg_stage(&sf2, 5), EG_RELEASE);
    }

    #[test]
    fn test_attack_rises_towards_target() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let mut voice = started(gus_sample(), &ctx);
        assert_eq!(voice.envelope_stage, 1, "start enters the attack stage");
        assert!(voice.envelope_increment > 0);
        assert_eq!(voice.envelope_target, OFFSET_MAX);

        let mut last = voice.envelope_volume;
        while voice.envelope_stage == 1 {
            assert!(!update_signal(&mut voice, &ctx));
            assert!(voice.envelope_volume >= last, "attack must not fall");
            assert!(voice.envelope_volume <= OFFSET_MAX);
            last = voice.envelope_volume;
        }
        assert_eq!(voice.envelope_stage, 2, "reaching the peak enters decay");
    }

    #[test]
    fn test_held_note_waits_in_sustain() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let mut voice = started(gus_sample(), &ctx);
        for _ in 0..20_000 {
            assert!(!update_signal(&mut voice, &ctx), "a held note must not die");
        }
        assert_eq!(voice.envelope_stage, EG_GUS_RELEASE1, "held notes park before release");
        assert_eq!(voice.envelope_volume, OFFSET_MAX / 2);
    }

    #[test]
    fn test_release_frees_voice() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let mut voice = started(gus_sample(), &ctx);
        for _ in 0..2_000 {
            update_signal(&mut voice, &ctx);
        }
        finish_note(&mut voice, &ctx);
        assert_eq!(voice.status, VoiceStatus::Off);
        let mut blocks = 0;
        while !update_signal(&mut voice, &ctx) {
            blocks += 1;
            assert!(blocks < 100_000, "released voice never died");
        }
        assert!(voice.is_free(), "death must return the voice to the pool");
    }

    #[test]
    fn test_sustained_gus_note_decays_over_min_sustain_time() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 1000);
        let mut voice = started(gus_sample(), &ctx);
        for _ in 0..20_000 {
            update_signal(&mut voice, &ctx);
        }
        voice.status = VoiceStatus::Sustained;
        assert!(!recompute_envelope(&mut voice, &ctx));
        let width = (1000.0 * 44100.0 / (1000.0 * 44.0)) as i32;
        let expected = (OFFSET_MAX / 2 / width).min(1 << 22).min(1 << 20);
        assert_eq!(voice.envelope_target, 0);
        assert_eq!(voice.envelope_increment, -expected, "the slower of sustain, release and width wins");
    }

    #[test]
    fn test_sf2_sustain_uses_bounded_target() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 1000);
        let mut sample = gus_sample();
        sample.inst_type = InstrumentKind::Sf2;
        let mut voice = started(sample, &ctx);
        for _ in 0..20_000 {
            update_signal(&mut voice, &ctx);
        }
        voice.status = VoiceStatus::Sustained;
        recompute_envelope(&mut voice, &ctx);
        assert_eq!(voice.envelope_increment, -1);
        assert_eq!(voice.envelope_target, OFFSET_MAX / 2 - 1002);
    }

    #[test]
    fn test_min_sustain_of_one_skips_sustain() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 1);
        let mut voice = started(gus_sample(), &ctx);
        for _ in 0..20_000 {
            update_signal(&mut voice, &ctx);
        }
        voice.status = VoiceStatus::Sustained;
        recompute_envelope(&mut voice, &ctx);
        assert_eq!(voice.envelope_stage, EG_GUS_RELEASE1 + 1, "sustain is skipped straight into release");
        assert!(voice.envelope_increment < 0);
    }

    #[test]
    fn test_tremolo_delay_holds_unity() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let mut sample = gus_sample();
        sample.tremolo_depth = 64;
        sample.tremolo_phase_increment = 1 << 10;
        sample.tremolo_delay = 1000;
        let mut voice = started(sample, &ctx);
        voice.delay_counter = 100;
        update_tremolo(&mut voice);
        assert_eq!(voice.tremolo_volume, 1.0, "delayed tremolo stays at unity");
        assert_eq!(voice.tremolo_delay, 900);
        voice.delay_counter = 1000;
        update_tremolo(&mut voice);
        assert_eq!(voice.tremolo_delay, 0);
        assert_ne!(voice.tremolo_phase, 0, "phase advances once the delay has passed");
    }

    #[test]
    fn test_release_ramp_respects_twenty_ms() {
        let channel = ChannelState::default();
        let ctx = context(&channel, 0);
        let mut voice = started(gus_sample(), &ctx);
        for _ in 0..20_000 {
            update_signal(&mut voice, &ctx);
        }
        finish_note(&mut voice, &ctx);
        let blocks_in_20ms = 44100.0 * 0.02 / 44.0;
        let min_blocks = (OFFSET_MAX / 2) as f64 / voice.envelope_increment.unsigned_abs() as f64;
        assert!(min_blocks >= blocks_in_20ms - 1.0, "release faster than 20 ms: {min_blocks} blocks");
    }
}
