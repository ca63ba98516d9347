//! Block renderer
//!
//! [`Engine`] owns the voice pool, the mixer and the system effects. Each
//! call to [`Engine::render_block`] first applies pending control messages,
//! then mixes every active voice into the buffer of its channel and runs the
//! channel buffers through the sends and system effects.
//!
//! Channels whose sends are all at their defaults share the output buffer
//! directly; only the others get a buffer of their own.

pub mod control;
pub mod lfo;
pub mod system;

use std::sync::Arc;

pub use self::control::{ControlMessage, ControlQueue, ControlSender};
pub use self::system::{SendBus, SystemEffects, XgSlot, DEFAULT_REVERB_SEND_LEVEL};

use crate::config::{SynthConfig, SystemMode};
use crate::effects::XgConnection;
use crate::envelope::{finish_note, kill_note, start_note, DefaultHost, EnvelopeContext, NoteStart};
use crate::error::{Result, WavemixError};
use crate::mixer::VoiceMixer;
use crate::voice::{ChannelState, Sample, Voice};

/// Number of MIDI channels
pub const MAX_CHANNELS: usize = 16;

/// Output gain that maps the internal mix to roughly `-1.0..=1.0`
const OUTPUT_SCALE: f32 = 5.0 / 2_147_483_648.0;

/// Buffer a channel's voices are mixed into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    /// Straight into the output, reverb at the default send
    Main,
    /// The shared GS insertion buffer
    Insertion,
    /// The channel's own buffer, sent individually
    Own,
}

pub struct Engine {
    config: SynthConfig,
    voices: Vec<Voice>,
    channels: Vec<ChannelState>,
    mixer: VoiceMixer,
    effects: SystemEffects,
    queue: ControlQueue,
    host: DefaultHost,
    routes: [Route; MAX_CHANNELS],
    channel_bufs: Vec<Vec<i32>>,
    insertion_buf: Vec<i32>,
    scratch: Vec<i32>,
}

impl Engine {
    /// Validate `config` and build an engine with an idle voice pool
    pub fn new(config: SynthConfig) -> Result<Self> {
        config.validate()?;
        let len = config.block_size * 2;
        let idle = Arc::new(Sample::new(Vec::new(), config.sample_rate, 440.0));
        let voices: Vec<Voice> = (0..config.max_voices).map(|_| Voice::new(idle.clone(), 0, 0, 0)).collect();
        let effects =
            SystemEffects::new(config.system_mode, config.reverb_algorithm, config.rate(), config.block_size);
        log::debug!(
            "engine: {} Hz, {} frames per block, {} voices, {:?} mode",
            config.sample_rate,
            config.block_size,
            config.max_voices,
            config.system_mode
        );
        Ok(Self {
            mixer: VoiceMixer::new(&config),
            voices,
            channels: vec![ChannelState::default(); MAX_CHANNELS],
            effects,
            queue: ControlQueue::default(),
            host: DefaultHost,
            routes: [Route::Main; MAX_CHANNELS],
            channel_bufs: vec![vec![0; len]; MAX_CHANNELS],
            insertion_buf: vec![0; len],
            scratch: vec![0; len],
            config,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Switch one system send effect on or off between blocks
    ///
    /// A disabled effect's bus is emptied every block, so switching it back
    /// on starts from silence.
    pub fn set_send_effect(&mut self, bus: SendBus, enabled: bool) {
        let toggle = match bus {
            SendBus::Reverb => &mut self.config.reverb,
            SendBus::Chorus => &mut self.config.chorus,
            SendBus::Delay => &mut self.config.delay,
        };
        *toggle = enabled;
        log::debug!("{bus:?} send effect {}", if enabled { "on" } else { "off" });
    }

    /// A producer handle for the control queue
    pub fn sender(&self) -> ControlSender {
        self.queue.sender()
    }

    pub fn effects(&self) -> &SystemEffects {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut SystemEffects {
        &mut self.effects
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelState> {
        self.channels.get(channel)
    }

    pub fn channel_mut(&mut self, channel: usize) -> Result<&mut ChannelState> {
        self.channels.get_mut(channel).ok_or(WavemixError::ChannelOutOfRange(channel))
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Number of voices that are not free
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    /// Start a note and return the index of the voice playing it
    ///
    /// With the pool full, the quietest releasing voice is reclaimed, or the
    /// quietest voice overall if none is releasing.
    ///
    /// # Arguments
    /// * `channel` - MIDI channel, below [`MAX_CHANNELS`]
    /// * `note` - MIDI note number
    /// * `velocity` - Note-on velocity, 0..=127
    /// * `sample` - PCM and instrument parameters to play
    /// * `panning` - 0 = hard left, 64 = centre, 127 = hard right
    pub fn note_on(
        &mut self,
        channel: usize,
        note: i32,
        velocity: i32,
        sample: Arc<Sample>,
        panning: i32,
    ) -> Result<usize> {
        if channel >= MAX_CHANNELS {
            return Err(WavemixError::ChannelOutOfRange(channel));
        }
        let index = match self.voices.iter().position(Voice::is_free) {
            Some(i) => i,
            None => self.reclaim_voice()?,
        };
        let voice = &mut self.voices[index];
        *voice = Voice::new(sample, channel, note, velocity);
        let ctx = EnvelopeContext::new(&self.config, &self.channels[channel], &self.host);
        let start = NoteStart {
            panning: panning.clamp(0, 127),
            master_volume: self.config.master_volume(),
            effects_active: self.config.effects_active(),
            pan_delay: self.config.pan_delay,
            filter: self.config.voice_filter,
        };
        start_note(voice, &ctx, &start);
        Ok(index)
    }

    fn reclaim_voice(&mut self) -> Result<usize> {
        let (index, voice) = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (!v.status.is_releasing(), v.envelope_volume))
            .ok_or(WavemixError::NoFreeVoice)?;
        log::trace!("reclaiming voice {index} (channel {} note {})", voice.channel, voice.note);
        self.voices[index].free();
        Ok(index)
    }

    /// Key released: move the voice into its release stage
    pub fn release_voice(&mut self, index: usize) -> Result<()> {
        let voice = self.voices.get_mut(index).ok_or(WavemixError::VoiceOutOfRange(index))?;
        if voice.is_free() {
            return Ok(());
        }
        let channel = &self.channels[voice.channel.min(MAX_CHANNELS - 1)];
        let ctx = EnvelopeContext::new(&self.config, channel, &self.host);
        finish_note(voice, &ctx);
        Ok(())
    }

    /// Cut a voice; it ramps out during the next block
    pub fn cut_voice(&mut self, index: usize) -> Result<()> {
        let voice = self.voices.get_mut(index).ok_or(WavemixError::VoiceOutOfRange(index))?;
        kill_note(voice);
        Ok(())
    }

    /// Apply one control message immediately
    pub fn apply(&mut self, msg: ControlMessage) -> Result<()> {
        let fx = &mut self.effects;
        match msg {
            ControlMessage::SetGsInsertion { msb, lsb } => fx.set_insertion_gs(msb, lsb),
            ControlMessage::SetGsInsertionParam { index, value } => fx.set_insertion_param_gs(index, value),
            ControlMessage::SetXgEffect { slot, msb, lsb } => fx.set_xg_effect(slot, msb, lsb),
            ControlMessage::SetReverbMacro { value } => {
                fx.set_reverb_macro_gs(value);
                Ok(())
            }
            ControlMessage::SetReverbMacroGm2 { value } => {
                fx.set_reverb_macro_gm2(value);
                Ok(())
            }
            ControlMessage::SetChorusMacro { value } => {
                fx.set_chorus_macro_gs(value);
                Ok(())
            }
            ControlMessage::SetDelayMacro { value } => {
                fx.set_delay_macro_gs(value);
                Ok(())
            }
            ControlMessage::SetMultiEqType { value } => {
                fx.set_multi_eq_type_xg(value);
                Ok(())
            }
            ControlMessage::SetChannelSends { channel, reverb, chorus, delay } => {
                let state = self.channel_mut(channel)?;
                if let Some(level) = reverb {
                    state.reverb_level = level.min(127);
                }
                if let Some(level) = chorus {
                    state.chorus_level = level.min(127);
                }
                if let Some(level) = delay {
                    state.delay_level = level.min(127);
                }
                Ok(())
            }
            ControlMessage::CutVoice { voice } => self.cut_voice(voice),
            ControlMessage::ReleaseVoice { voice } => self.release_voice(voice),
            ControlMessage::ResetEffects => {
                fx.init_effect_status();
                Ok(())
            }
        }
    }

    fn drain_control(&mut self) {
        while let Some(msg) = self.queue.try_recv() {
            if let Err(e) = self.apply(msg) {
                log::warn!("control message rejected: {e}");
            }
        }
    }

    /// Render interleaved stereo into `out`
    ///
    /// Pending control messages are applied first. `out` is overwritten;
    /// blocks longer than the configured block size are rendered in pieces.
    pub fn render_block(&mut self, out: &mut [i32]) {
        self.drain_control();
        let step = self.config.block_size * 2;
        for chunk in out.chunks_mut(step) {
            let n = chunk.len() & !1;
            let (frames, odd) = chunk.split_at_mut(n);
            self.render_chunk(frames);
            // half a frame cannot be rendered
            odd.fill(0);
        }
    }

    /// Render and convert to `f32` samples in about `-1.0..=1.0`
    pub fn render_to_f32(&mut self, out: &mut [f32]) {
        let step = self.config.block_size * 2;
        let mut scratch = std::mem::take(&mut self.scratch);
        for chunk in out.chunks_mut(step) {
            let buf = &mut scratch[..chunk.len()];
            self.render_block(buf);
            for (dst, &src) in chunk.iter_mut().zip(buf.iter()) {
                *dst = src as f32 * OUTPUT_SCALE;
            }
        }
        self.scratch = scratch;
    }

    /// Render `frames` frames into a 32-bit float WAV file
    #[cfg(feature = "bounce")]
    pub fn bounce_to_wav(&mut self, path: impl AsRef<std::path::Path>, frames: usize) -> anyhow::Result<()> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        let mut block = vec![0f32; self.config.block_size * 2];
        let mut left = frames;
        while left > 0 {
            let n = left.min(self.config.block_size);
            self.render_to_f32(&mut block[..n * 2]);
            for &s in &block[..n * 2] {
                writer.write_sample(s)?;
            }
            left -= n;
        }
        writer.finalize()?;
        log::debug!("bounced {frames} frames to {}", path.as_ref().display());
        Ok(())
    }

    fn assign_routes(&mut self) {
        let gs_insertion = self.config.insertion_effect && self.config.system_mode == SystemMode::Gs;
        for (ch, state) in self.channels.iter().enumerate() {
            self.routes[ch] = if gs_insertion && state.insertion_effect {
                Route::Insertion
            } else if state.eq_gs
                || state.reverb_level != DEFAULT_REVERB_SEND_LEVEL
                || state.chorus_level > 0
                || state.delay_level > 0
                || state.dry_level != 127
                || self.effects.is_insertion_part_xg(ch)
            {
                Route::Own
            } else {
                Route::Main
            };
        }
    }

    fn render_chunk(&mut self, out: &mut [i32]) {
        let n = out.len();
        let frames = n / 2;
        out.fill(0);
        let effects_active = self.config.effects_active();
        if effects_active {
            self.assign_routes();
            self.insertion_buf[..n].fill(0);
            for (buf, route) in self.channel_bufs.iter_mut().zip(self.routes) {
                if route == Route::Own {
                    buf[..n].fill(0);
                }
            }
        }

        for voice in self.voices.iter_mut().filter(|v| !v.is_free()) {
            let ch = voice.channel.min(MAX_CHANNELS - 1);
            let ctx = EnvelopeContext::new(&self.config, &self.channels[ch], &self.host);
            let dst: &mut [i32] = match (effects_active, self.routes[ch]) {
                (true, Route::Insertion) => &mut self.insertion_buf[..n],
                (true, Route::Own) => &mut self.channel_bufs[ch][..n],
                _ => &mut *out,
            };
            self.mixer.mix_voice(dst, voice, &ctx, frames);
        }

        if !effects_active {
            return;
        }
        match self.config.system_mode {
            SystemMode::Gs => self.route_gs(out),
            SystemMode::Xg => self.route_xg(out),
        }
    }

    fn route_gs(&mut self, out: &mut [i32]) {
        let n = out.len();
        let cfg = &self.config;
        let fx = &mut self.effects;

        if cfg.insertion_effect {
            let buf = &mut self.insertion_buf[..n];
            fx.do_insertion_effect_gs(buf);
            let params = fx.insertion_gs.params.clone();
            if cfg.chorus {
                fx.set_ch_chorus(buf, params.send_chorus);
            }
            if cfg.delay {
                fx.set_ch_delay(buf, params.send_delay);
            }
            if cfg.reverb {
                fx.set_ch_reverb(buf, params.send_reverb);
            }
            if params.send_eq_switch != 0 && cfg.channel_eq {
                fx.set_ch_eq(buf);
            } else {
                fx.set_dry_signal(buf);
            }
        }

        for (ch, state) in self.channels.iter().enumerate() {
            if self.routes[ch] != Route::Own {
                continue;
            }
            let buf = &self.channel_bufs[ch][..n];
            if cfg.chorus {
                fx.set_ch_chorus(buf, state.chorus_level);
            }
            if cfg.delay {
                fx.set_ch_delay(buf, state.delay_level);
            }
            if cfg.reverb {
                fx.set_ch_reverb(buf, state.reverb_level);
            }
            if cfg.channel_eq && state.eq_gs {
                fx.set_ch_eq(buf);
            } else {
                fx.set_dry_signal(buf);
            }
        }

        if cfg.reverb {
            fx.set_ch_reverb(out, DEFAULT_REVERB_SEND_LEVEL);
        }
        fx.set_dry_signal(out);
        fx.mix_dry_signal(out);
        if cfg.channel_eq {
            fx.do_ch_eq_gs(out);
        }
        if cfg.chorus {
            fx.do_ch_chorus(out);
        } else {
            fx.discard(SendBus::Chorus, n);
        }
        if cfg.delay {
            fx.do_ch_delay(out);
        } else {
            fx.discard(SendBus::Delay, n);
        }
        if cfg.reverb {
            fx.do_ch_reverb(out);
        } else {
            fx.discard(SendBus::Reverb, n);
        }
    }

    fn route_xg(&mut self, out: &mut [i32]) {
        let n = out.len();
        let cfg = &self.config;
        let fx = &mut self.effects;

        if cfg.insertion_effect {
            for i in 0..fx.insertion_xg.len() {
                let part = fx.insertion_xg[i].params.part as usize;
                if part < MAX_CHANNELS {
                    fx.do_insertion_effect_xg(&mut self.channel_bufs[part][..n], i);
                }
            }
            let part = fx.variation_xg.params.part as usize;
            if part < MAX_CHANNELS && fx.variation_xg.params.connection == XgConnection::Insertion {
                fx.do_variation_insertion_xg(&mut self.channel_bufs[part][..n]);
            }
        }

        for (ch, state) in self.channels.iter().enumerate() {
            if self.routes[ch] != Route::Own {
                continue;
            }
            let buf = &self.channel_bufs[ch][..n];
            if cfg.chorus {
                fx.set_ch_chorus(buf, state.chorus_level);
            }
            if cfg.delay {
                fx.set_ch_delay(buf, state.delay_level);
            }
            if cfg.reverb {
                fx.set_ch_reverb(buf, state.reverb_level);
            }
            if state.dry_level == 127 {
                fx.set_dry_signal(buf);
            } else {
                fx.set_dry_signal_xg(buf, state.dry_level);
            }
        }

        if cfg.reverb {
            fx.set_ch_reverb(out, DEFAULT_REVERB_SEND_LEVEL);
        }
        fx.set_dry_signal(out);
        fx.mix_dry_signal(out);
        if cfg.delay {
            fx.do_variation_effect1_xg(out);
        } else {
            fx.discard(SendBus::Delay, n);
        }
        if cfg.chorus {
            fx.do_ch_chorus_xg(out);
        } else {
            fx.discard(SendBus::Chorus, n);
        }
        if cfg.reverb {
            fx.do_ch_reverb(out);
        } else {
            fx.discard(SendBus::Reverb, n);
        }
        fx.do_multi_eq_xg(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::OFFSET_MAX;

    fn config() -> SynthConfig {
        SynthConfig { block_size: 256, max_voices: 4, ..Default::default() }
    }

    fn tone() -> Arc<Sample> {
        let data: Vec<i16> = (0..441).map(|i| ((i as f64 * 0.1).sin() * 16000.0) as i16).collect();
        Arc::new(
            Sample::new(data, 44100, 440.0)
                .with_loop(0, 441)
                .with_envelope(
                    [OFFSET_MAX, OFFSET_MAX, OFFSET_MAX, 0, 0, 0],
                    [1 << 26, 1 << 26, 1 << 26, 1 << 24, 1 << 24, 1 << 24],
                ),
        )
    }

    fn energy(buf: &[i32]) -> f64 {
        buf.iter().map(|&s| (s as f64).powi(2)).sum()
    }

    #[test]
    fn test_idle_engine_renders_silence() {
        let mut engine = Engine::new(config()).unwrap();
        let mut out = vec![123; 512];
        engine.render_block(&mut out);
        assert!(out.iter().all(|&s| s == 0), "no voices and empty buses give silence");
    }

    #[test]
    fn test_note_is_audible() {
        let mut engine = Engine::new(config()).unwrap();
        engine.note_on(0, 69, 100, tone(), 64).unwrap();
        let mut out = vec![0; 1024];
        engine.render_block(&mut out);
        engine.render_block(&mut out);
        assert!(energy(&out) > 0.0);
        assert_eq!(engine.active_voices(), 1);
    }

    #[test]
    fn test_cut_voice_through_queue() {
        let mut engine = Engine::new(config()).unwrap();
        let index = engine.note_on(0, 60, 100, tone(), 64).unwrap();
        let mut out = vec![0; 512];
        engine.render_block(&mut out);
        engine.sender().send(ControlMessage::CutVoice { voice: index }).unwrap();
        engine.render_block(&mut out);
        assert_eq!(engine.active_voices(), 0, "a cut voice is freed within one block");
    }

    #[test]
    fn test_full_pool_reclaims_releasing_voice() {
        let mut engine = Engine::new(config()).unwrap();
        for note in 0..4 {
            engine.note_on(0, 60 + note, 100, tone(), 64).unwrap();
        }
        engine.release_voice(2).unwrap();
        let index = engine.note_on(1, 72, 100, tone(), 64).unwrap();
        assert_eq!(index, 2, "the releasing voice is taken first");
        assert_eq!(engine.voice(2).map(|v| v.channel), Some(1));
    }

    #[test]
    fn test_out_of_range_arguments() {
        let mut engine = Engine::new(config()).unwrap();
        assert!(matches!(
            engine.note_on(MAX_CHANNELS, 60, 100, tone(), 64),
            Err(WavemixError::ChannelOutOfRange(16))
        ));
        assert!(matches!(engine.cut_voice(99), Err(WavemixError::VoiceOutOfRange(99))));
    }

    #[test]
    fn test_reverb_tail_outlives_voice() {
        let mut engine = Engine::new(config()).unwrap();
        let index = engine.note_on(0, 69, 127, tone(), 64).unwrap();
        let mut out = vec![0; 512];
        for _ in 0..8 {
            engine.render_block(&mut out);
        }
        engine.cut_voice(index).unwrap();
        engine.render_block(&mut out);
        engine.render_block(&mut out);
        assert_eq!(engine.active_voices(), 0);
        assert!(energy(&out) > 0.0, "reverb keeps ringing after the voice is gone");
    }

    #[test]
    fn test_dry_only_engine_skips_effects() {
        let cfg = SynthConfig {
            reverb: false,
            chorus: false,
            delay: false,
            channel_eq: false,
            insertion_effect: false,
            ..config()
        };
        let mut engine = Engine::new(cfg).unwrap();
        let index = engine.note_on(0, 69, 127, tone(), 64).unwrap();
        let mut out = vec![0; 512];
        engine.render_block(&mut out);
        engine.cut_voice(index).unwrap();
        engine.render_block(&mut out);
        engine.render_block(&mut out);
        assert!(out.iter().all(|&s| s == 0), "no tail without effects");
    }

    #[test]
    fn test_enabling_reverb_starts_from_empty_bus() {
        let cfg = SynthConfig { reverb: false, ..config() };
        let mut engine = Engine::new(cfg).unwrap();
        engine.effects_mut().chorus_status.send_reverb = 127;
        engine.effects_mut().chorus_status.send_delay = 127;
        engine.effects_mut().recompute_chorus_status_gs();
        engine.channel_mut(0).unwrap().chorus_level = 127;
        let index = engine.note_on(0, 69, 127, tone(), 64).unwrap();
        let mut out = vec![0; 512];
        for _ in 0..40 {
            engine.render_block(&mut out);
        }
        assert!(
            engine.effects().pending(SendBus::Reverb).iter().all(|&s| s == 0),
            "a disabled reverb must not collect chorus sends"
        );

        engine.cut_voice(index).unwrap();
        engine.set_send_effect(SendBus::Chorus, false);
        engine.set_send_effect(SendBus::Delay, false);
        engine.render_block(&mut out);
        engine.render_block(&mut out);

        engine.set_send_effect(SendBus::Reverb, true);
        for block in 0..8 {
            engine.render_block(&mut out);
            assert!(out.iter().all(|&s| s == 0), "stale reverb input surfaced in block {block}");
        }
    }

    #[test]
    fn test_render_to_f32_scales() {
        let mut engine = Engine::new(config()).unwrap();
        engine.note_on(0, 69, 127, tone(), 64).unwrap();
        let mut out = vec![0f32; 2048];
        engine.render_to_f32(&mut out);
        let peak = out.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.0 && peak < 4.0, "peak {peak} out of range");
    }

    #[test]
    fn test_odd_length_output_ends_silent() {
        let mut engine = Engine::new(config()).unwrap();
        engine.note_on(0, 69, 127, tone(), 64).unwrap();
        let mut loud = vec![0f32; 512];
        engine.render_to_f32(&mut loud);
        assert!(loud.iter().any(|&s| s != 0.0));

        let mut out = vec![1f32; 511];
        engine.render_to_f32(&mut out);
        assert_eq!(out[510], 0.0, "the unpaired trailing sample must be cleared");

        let mut raw = vec![i32::MAX; 3];
        engine.render_block(&mut raw);
        assert_eq!(raw[2], 0);
    }

    #[test]
    fn test_xg_engine_renders() {
        let cfg = SynthConfig { system_mode: SystemMode::Xg, ..config() };
        let mut engine = Engine::new(cfg).unwrap();
        engine.sender().send(ControlMessage::SetMultiEqType { value: 3 }).unwrap();
        engine.note_on(0, 69, 100, tone(), 20).unwrap();
        let mut out = vec![0; 1024];
        engine.render_block(&mut out);
        assert!(engine.effects().multi_eq_xg.is_valid());
        assert!(energy(&out) > 0.0);
    }
}
