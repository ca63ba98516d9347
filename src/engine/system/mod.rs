//! System effects and their send buses
//!
//! Channels do not own reverb or chorus. They add scaled copies of their
//! signal onto shared stereo buses with the `set_ch_*` operations, and once
//! per block the `do_ch_*` operations run each bus through its effect, add
//! the result to the output and clear the bus.
//!
//! GS mode renders: dry mix, channel EQ, chorus, delay, reverb. Chorus and
//! delay feed the buses later in that order. XG mode renders: dry mix,
//! variation, chorus, reverb, multi-EQ on the finished mix.

pub mod chorus;
pub mod delay;
pub mod eq;
pub mod reverb;
pub mod status;

use serde::{Deserialize, Serialize};

pub use self::chorus::SystemChorus;
pub use self::delay::SystemDelay;
pub use self::eq::{EqBandXg, MultiEqXg};
pub use self::reverb::{ReverbEngine, SystemReverb};
pub use self::status::{ChorusStatusGs, DelayKind, DelayStatusGs, EqStatusGs, ReverbStatusGs};

use crate::config::{ReverbAlgorithm, SystemMode};
use crate::effects::{EffectContext, GsInsertionEffect, XgConnection, XgEffectSlot};
use crate::error::{Result, WavemixError};
use crate::fixed::{fscale, imuldiv24};

/// Send level the main buffer uses towards the reverb
pub const DEFAULT_REVERB_SEND_LEVEL: u8 = 40;

/// Number of XG insertion blocks
pub const XG_INSERTION_EFFECT_NUM: usize = 2;

/// Addresses one XG effect block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XgSlot {
    Reverb,
    Chorus,
    Variation,
    Insertion(usize),
}

/// Shared stereo bus fed by channel sends and by other system effects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendBus {
    Reverb,
    Chorus,
    Delay,
}

/// `bus += buf * gain`, Q24 gain
#[inline]
fn send(bus: &mut [i32], buf: &[i32], gain: i32) {
    for (b, &x) in bus.iter_mut().zip(buf) {
        *b = b.saturating_add(imuldiv24(x, gain));
    }
}

/// `out += buf`
#[inline]
fn mix(out: &mut [i32], buf: &[i32]) {
    for (o, &x) in out.iter_mut().zip(buf) {
        *o = o.saturating_add(x);
    }
}

pub struct SystemEffects {
    pub mode: SystemMode,
    pub algorithm: ReverbAlgorithm,
    ctx: EffectContext,

    reverb_bus: Vec<i32>,
    chorus_bus: Vec<i32>,
    delay_bus: Vec<i32>,
    eq_bus: Vec<i32>,
    direct: Vec<i32>,

    pub reverb_status: ReverbStatusGs,
    pub chorus_status: ChorusStatusGs,
    pub delay_status: DelayStatusGs,
    pub eq_status: EqStatusGs,
    reverb: SystemReverb,
    chorus: SystemChorus,
    delay: SystemDelay,

    pub insertion_gs: GsInsertionEffect,

    pub reverb_xg: XgEffectSlot,
    pub chorus_xg: XgEffectSlot,
    pub variation_xg: XgEffectSlot,
    pub insertion_xg: [XgEffectSlot; XG_INSERTION_EFFECT_NUM],
    pub multi_eq_xg: MultiEqXg,
}

impl SystemEffects {
    /// Allocate buses for `block_size` frames and initialise every effect
    ///
    /// # Arguments
    /// * `mode` - GS or XG routing
    /// * `algorithm` - Engine used for the room and hall reverb characters
    /// * `sample_rate` - Output rate in Hz
    /// * `block_size` - Largest block in frames
    pub fn new(mode: SystemMode, algorithm: ReverbAlgorithm, sample_rate: f64, block_size: usize) -> Self {
        let len = block_size * 2;
        let reverb_status = ReverbStatusGs::default();
        let reverb = SystemReverb::new(&reverb_status, algorithm, sample_rate);
        let mut fx = Self {
            mode,
            algorithm,
            ctx: EffectContext::new(sample_rate),
            reverb_bus: vec![0; len],
            chorus_bus: vec![0; len],
            delay_bus: vec![0; len],
            eq_bus: vec![0; len],
            direct: vec![0; len],
            reverb_status,
            chorus_status: ChorusStatusGs::default(),
            delay_status: DelayStatusGs::default(),
            eq_status: EqStatusGs::default(),
            reverb,
            chorus: SystemChorus::default(),
            delay: SystemDelay::default(),
            insertion_gs: GsInsertionEffect::default(),
            reverb_xg: XgEffectSlot::default(),
            chorus_xg: XgEffectSlot::default(),
            variation_xg: XgEffectSlot::default(),
            insertion_xg: Default::default(),
            multi_eq_xg: MultiEqXg::default(),
        };
        fx.init_effect_status();
        fx
    }

    /// Context handed to insertion and variation stages
    pub fn context(&self) -> EffectContext {
        self.ctx
    }

    /// Reset every status block to its power-on value and rebuild all effects
    pub fn init_effect_status(&mut self) {
        self.reverb_status = ReverbStatusGs::default();
        self.chorus_status = ChorusStatusGs::default();
        self.delay_status = DelayStatusGs::default();
        self.eq_status = EqStatusGs::default();
        self.recompute_reverb_status_gs();
        self.recompute_chorus_status_gs();
        self.recompute_delay_status_gs();
        self.recompute_eq_status_gs();

        self.insertion_gs = GsInsertionEffect::default();
        self.insertion_gs.realloc(&self.ctx);

        self.multi_eq_xg = MultiEqXg::default();
        self.recompute_multi_eq_xg();

        if self.mode == SystemMode::Xg {
            self.reverb_xg = XgEffectSlot::new(0x01, XgConnection::SystemReverb);
            self.chorus_xg = XgEffectSlot::new(0x41, XgConnection::SystemChorus);
            self.variation_xg = XgEffectSlot::new(0x05, XgConnection::Insertion);
            self.insertion_xg = std::array::from_fn(|_| {
                let mut slot = XgEffectSlot::new(0x49, XgConnection::Insertion);
                slot.params.part = 0x7f;
                slot
            });
            let ctx = self.ctx;
            for slot in self.xg_slots_mut() {
                slot.realloc(&ctx);
            }
        }
        self.clear_buses();
        log::debug!("system effects reset ({:?}, {})", self.mode, self.reverb.name());
    }

    fn xg_slots_mut(&mut self) -> impl Iterator<Item = &mut XgEffectSlot> {
        [&mut self.reverb_xg, &mut self.chorus_xg, &mut self.variation_xg]
            .into_iter()
            .chain(self.insertion_xg.iter_mut())
    }

    fn clear_buses(&mut self) {
        for bus in [
            &mut self.reverb_bus,
            &mut self.chorus_bus,
            &mut self.delay_bus,
            &mut self.eq_bus,
            &mut self.direct,
        ] {
            bus.fill(0);
        }
    }

    /// XG block addressed by `slot`
    pub fn xg_slot_mut(&mut self, slot: XgSlot) -> Result<&mut XgEffectSlot> {
        match slot {
            XgSlot::Reverb => Ok(&mut self.reverb_xg),
            XgSlot::Chorus => Ok(&mut self.chorus_xg),
            XgSlot::Variation => Ok(&mut self.variation_xg),
            XgSlot::Insertion(i) => self
                .insertion_xg
                .get_mut(i)
                .ok_or_else(|| WavemixError::InvalidConfig(format!("no XG insertion block {i}"))),
        }
    }

    // ---- sends ----

    /// Send a channel block to the reverb bus
    ///
    /// # Arguments
    /// * `buf` - Interleaved channel block
    /// * `level` - Channel reverb send, 0..=127; 0 sends nothing
    pub fn set_ch_reverb(&mut self, buf: &[i32], level: u8) {
        if level == 0 {
            return;
        }
        let gain = fscale(level as f64 / 127.0 * self.ctx.reverb_input_level, 24);
        send(&mut self.reverb_bus, buf, gain);
    }

    pub fn set_ch_chorus(&mut self, buf: &[i32], level: u8) {
        if level == 0 {
            return;
        }
        send(&mut self.chorus_bus, buf, fscale(level as f64 / 127.0, 24));
    }

    pub fn set_ch_delay(&mut self, buf: &[i32], level: u8) {
        if level == 0 {
            return;
        }
        send(&mut self.delay_bus, buf, fscale(level as f64 / 127.0, 24));
    }

    /// Route a channel block through the GS channel EQ
    pub fn set_ch_eq(&mut self, buf: &[i32]) {
        mix(&mut self.eq_bus, buf);
    }

    /// Add a channel block to the dry mix
    pub fn set_dry_signal(&mut self, buf: &[i32]) {
        mix(&mut self.direct, buf);
    }

    /// Add a channel block to the dry mix at an XG dry level
    pub fn set_dry_signal_xg(&mut self, buf: &[i32], level: u8) {
        if level == 0 {
            return;
        }
        send(&mut self.direct, buf, fscale(level as f64 / 127.0, 24));
    }

    /// Copy the dry mix into `out` and clear it
    pub fn mix_dry_signal(&mut self, out: &mut [i32]) {
        let n = out.len();
        out.copy_from_slice(&self.direct[..n]);
        self.direct[..n].fill(0);
    }

    fn bus_mut(&mut self, bus: SendBus) -> &mut Vec<i32> {
        match bus {
            SendBus::Reverb => &mut self.reverb_bus,
            SendBus::Chorus => &mut self.chorus_bus,
            SendBus::Delay => &mut self.delay_bus,
        }
    }

    /// Samples waiting on a send bus for its next drain
    pub fn pending(&self, bus: SendBus) -> &[i32] {
        match bus {
            SendBus::Reverb => &self.reverb_bus,
            SendBus::Chorus => &self.chorus_bus,
            SendBus::Delay => &self.delay_bus,
        }
    }

    /// Drop the first `n` samples sent to a bus whose drain is switched off
    ///
    /// Chorus and delay keep sending to the reverb bus, and the XG variation
    /// to the chorus bus, even when the receiving effect is disabled.
    pub fn discard(&mut self, bus: SendBus, n: usize) {
        let buf = self.bus_mut(bus);
        let n = n.min(buf.len());
        buf[..n].fill(0);
    }

    // ---- drains ----

    /// Run the reverb bus through the system reverb into `out`
    pub fn do_ch_reverb(&mut self, out: &mut [i32]) {
        let n = out.len();
        let bus = &mut self.reverb_bus[..n];
        if self.algorithm != ReverbAlgorithm::Standard && self.reverb_status.pre_lpf != 0 {
            self.reverb_status.lpf.process_stereo(bus);
        }
        self.reverb.process(bus, out);
    }

    /// Run the chorus bus through the system chorus, feeding reverb and delay
    pub fn do_ch_chorus(&mut self, out: &mut [i32]) {
        let n = out.len();
        if self.chorus_status.pre_lpf != 0 {
            self.chorus_status.lpf.process_stereo(&mut self.chorus_bus[..n]);
        }
        self.chorus.process(
            &mut self.chorus_bus[..n],
            out,
            &mut self.reverb_bus[..n],
            &mut self.delay_bus[..n],
        );
    }

    /// Run the delay bus through the system delay, feeding reverb
    pub fn do_ch_delay(&mut self, out: &mut [i32]) {
        let n = out.len();
        if self.delay_status.pre_lpf != 0 {
            self.delay_status.lpf.process_stereo(&mut self.delay_bus[..n]);
        }
        self.delay.process(&mut self.delay_bus[..n], out, &mut self.reverb_bus[..n]);
    }

    /// Run the EQ bus through the GS channel EQ into `out`
    pub fn do_ch_eq_gs(&mut self, out: &mut [i32]) {
        let n = out.len();
        eq::drain_eq_gs(&mut self.eq_status, &mut self.eq_bus[..n], out);
    }

    /// Equalise the finished XG mix when any band is active
    pub fn do_multi_eq_xg(&mut self, out: &mut [i32]) {
        if self.multi_eq_xg.is_valid() {
            self.multi_eq_xg.process(out);
        }
    }

    pub fn do_insertion_effect_gs(&mut self, buf: &mut [i32]) {
        self.insertion_gs.process(buf);
    }

    /// Run XG insertion block `index` over a part's block
    pub fn do_insertion_effect_xg(&mut self, buf: &mut [i32], index: usize) {
        if let Some(slot) = self.insertion_xg.get_mut(index) {
            slot.process(buf);
        }
    }

    /// Run the XG variation block inline over its part's block
    pub fn do_variation_insertion_xg(&mut self, buf: &mut [i32]) {
        self.variation_xg.process(buf);
    }

    /// True when an XG insertion or variation block is assigned to `channel`
    pub fn is_insertion_part_xg(&self, channel: usize) -> bool {
        self.insertion_xg
            .iter()
            .chain(std::iter::once(&self.variation_xg))
            .any(|slot| slot.params.part as usize == channel)
    }

    /// Run the delay bus through the XG variation block when it is a system effect
    ///
    /// The delay bus doubles as the variation send bus in XG mode. It is
    /// cleared whether or not the variation is connected.
    pub fn do_variation_effect1_xg(&mut self, out: &mut [i32]) {
        let n = out.len();
        if self.variation_xg.params.connection == XgConnection::System {
            let bus = &mut self.delay_bus[..n];
            self.variation_xg.process(bus);
            mix(out, bus);
            let params = &self.variation_xg.params;
            let rev = params.send_reverb as f64 * 0.787 / 100.0 * self.ctx.reverb_input_level;
            let cho = params.send_chorus as f64 * 0.787 / 100.0;
            send(&mut self.reverb_bus[..n], bus, fscale(rev, 24));
            send(&mut self.chorus_bus[..n], bus, fscale(cho, 24));
        }
        self.delay_bus[..n].fill(0);
    }

    /// Run the chorus bus through the XG chorus block, feeding reverb
    pub fn do_ch_chorus_xg(&mut self, out: &mut [i32]) {
        let n = out.len();
        let bus = &mut self.chorus_bus[..n];
        self.chorus_xg.process(bus);
        mix(out, bus);
        let rev = self.chorus_xg.params.send_reverb as f64 * 0.787 / 100.0 * self.ctx.reverb_input_level;
        send(&mut self.reverb_bus[..n], bus, fscale(rev, 24));
        self.chorus_bus[..n].fill(0);
    }

    /// Run the reverb bus through the XG reverb block's chain
    ///
    /// XG rendering uses the GS system reverb; this drain serves hosts that
    /// load a chain into the XG reverb block directly.
    pub fn do_ch_reverb_xg(&mut self, out: &mut [i32]) {
        let n = out.len();
        let bus = &mut self.reverb_bus[..n];
        self.reverb_xg.process(bus);
        mix(out, bus);
        bus.fill(0);
    }

    // ---- parameter changes ----

    /// Reinitialise the system reverb after a status change
    ///
    /// The new engine's input level applies to sends made from now on.
    /// Chorus and delay pick it up at their next recompute.
    pub fn recompute_reverb_status_gs(&mut self) {
        self.reverb_status.recompute(self.ctx.sample_rate);
        self.reverb.init(&self.reverb_status, self.algorithm, self.ctx.sample_rate);
        self.ctx.reverb_input_level = self.reverb.input_level();
    }

    pub fn recompute_chorus_status_gs(&mut self) {
        self.chorus_status.recompute(self.ctx.sample_rate);
        self.chorus.init(&self.chorus_status, self.ctx.sample_rate, self.ctx.reverb_input_level);
    }

    pub fn recompute_delay_status_gs(&mut self) {
        self.delay_status.recompute(self.ctx.sample_rate);
        self.delay.init(&self.delay_status, self.ctx.reverb_input_level);
    }

    pub fn recompute_eq_status_gs(&mut self) {
        self.eq_status.recompute(self.ctx.sample_rate);
    }

    pub fn recompute_multi_eq_xg(&mut self) {
        self.multi_eq_xg.recompute(self.ctx.sample_rate);
    }

    pub fn set_reverb_macro_gs(&mut self, macro_no: u8) {
        self.reverb_status.set_macro(macro_no);
        self.recompute_reverb_status_gs();
    }

    pub fn set_reverb_macro_gm2(&mut self, gm2_type: u8) {
        self.reverb_status.set_macro_gm2(gm2_type);
        self.recompute_reverb_status_gs();
    }

    pub fn set_chorus_macro_gs(&mut self, macro_no: u8) {
        self.chorus_status.set_macro(macro_no);
        self.recompute_chorus_status_gs();
    }

    pub fn set_delay_macro_gs(&mut self, macro_no: u8) {
        self.delay_status.set_macro(macro_no);
        self.recompute_delay_status_gs();
    }

    pub fn set_multi_eq_type_xg(&mut self, eq_type: u8) {
        self.multi_eq_xg.set_type(eq_type);
        self.recompute_multi_eq_xg();
    }

    /// Select the GS insertion type and rebuild its chain
    ///
    /// An unsupported pair leaves an empty, pass-through chain and is
    /// reported as [`WavemixError::UnknownEffect`].
    pub fn set_insertion_gs(&mut self, msb: u8, lsb: u8) -> Result<()> {
        self.insertion_gs.params.type_msb = msb;
        self.insertion_gs.params.type_lsb = lsb;
        self.insertion_gs.realloc(&self.ctx);
        if self.insertion_gs.chain.is_empty() && (msb, lsb) != (0, 0) {
            log::warn!("GS insertion type {msb:#04x}/{lsb:#04x} unsupported, bypassed");
            return Err(WavemixError::UnknownEffect { msb, lsb });
        }
        Ok(())
    }

    /// Change one GS insertion parameter and re-run the chain conversion
    pub fn set_insertion_param_gs(&mut self, index: usize, value: i8) -> Result<()> {
        let slot = self
            .insertion_gs
            .params
            .parameter
            .get_mut(index)
            .ok_or_else(|| WavemixError::InvalidConfig(format!("GS insertion parameter {index}")))?;
        *slot = value;
        self.insertion_gs.recompute(&self.ctx);
        Ok(())
    }

    /// Select the type of an XG block and rebuild its chain
    pub fn set_xg_effect(&mut self, slot: XgSlot, msb: u8, lsb: u8) -> Result<()> {
        let ctx = self.ctx;
        let block = self.xg_slot_mut(slot)?;
        block.params.type_msb = msb;
        block.params.type_lsb = lsb;
        block.realloc(&ctx);
        if block.chain.is_empty() && msb != 0 {
            log::warn!("XG effect type {msb:#04x}/{lsb:#04x} unsupported, {slot:?} bypassed");
            return Err(WavemixError::UnknownEffect { msb, lsb });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectType;

    const RATE: f64 = 44100.0;
    const FRAMES: usize = 256;

    fn gs() -> SystemEffects {
        SystemEffects::new(SystemMode::Gs, ReverbAlgorithm::Freeverb, RATE, FRAMES)
    }

    fn impulse() -> Vec<i32> {
        let mut buf = vec![0; FRAMES * 2];
        buf[0] = 1 << 24;
        buf[1] = 1 << 24;
        buf
    }

    #[test]
    fn test_zero_send_level_is_noop() {
        let mut fx = gs();
        fx.set_ch_reverb(&impulse(), 0);
        fx.set_ch_chorus(&impulse(), 0);
        fx.set_ch_delay(&impulse(), 0);
        assert!(fx.reverb_bus.iter().all(|&s| s == 0));
        assert!(fx.chorus_bus.iter().all(|&s| s == 0));
        assert!(fx.delay_bus.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_reverb_send_uses_input_level() {
        let mut fx = gs();
        let level = fx.context().reverb_input_level;
        fx.set_ch_reverb(&impulse(), 127);
        let expected = ((1i64 << 24) as f64 * level) as i32;
        assert!((fx.reverb_bus[0] - expected).abs() <= 1, "got {}, want {expected}", fx.reverb_bus[0]);
    }

    #[test]
    fn test_dry_mix_moves_and_clears() {
        let mut fx = gs();
        fx.set_dry_signal(&impulse());
        fx.set_dry_signal(&impulse());
        let mut out = vec![7; FRAMES * 2];
        fx.mix_dry_signal(&mut out);
        assert_eq!(out[0], 2 << 24);
        assert_eq!(out[2], 0, "mix_dry_signal overwrites the output");
        assert!(fx.direct.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_every_drain_clears_its_bus() {
        let mut fx = gs();
        let buf = impulse();
        fx.set_ch_reverb(&buf, 100);
        fx.set_ch_chorus(&buf, 100);
        fx.set_ch_delay(&buf, 100);
        fx.set_ch_eq(&buf);
        let mut out = vec![0; FRAMES * 2];
        fx.do_ch_eq_gs(&mut out);
        fx.do_ch_chorus(&mut out);
        fx.do_ch_delay(&mut out);
        fx.do_ch_reverb(&mut out);
        for (name, bus) in [
            ("reverb", &fx.reverb_bus),
            ("chorus", &fx.chorus_bus),
            ("delay", &fx.delay_bus),
            ("eq", &fx.eq_bus),
        ] {
            assert!(bus.iter().all(|&s| s == 0), "{name} bus not cleared");
        }
        assert!(out.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_discard_drops_internal_sends() {
        let mut fx = gs();
        fx.chorus_status.send_reverb = 127;
        fx.chorus_status.send_delay = 127;
        fx.recompute_chorus_status_gs();
        let mut out = vec![0; FRAMES * 2];
        // long enough to get past the chorus pre-delay
        for _ in 0..40 {
            fx.set_ch_chorus(&impulse(), 127);
            fx.do_ch_chorus(&mut out);
        }
        assert!(fx.pending(SendBus::Reverb).iter().any(|&s| s != 0), "chorus feeds the reverb bus");

        fx.discard(SendBus::Reverb, FRAMES * 2);
        fx.discard(SendBus::Delay, FRAMES * 2);
        assert!(fx.pending(SendBus::Reverb).iter().all(|&s| s == 0));
        assert!(fx.pending(SendBus::Delay).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_reverb_macro_switches_engine() {
        let mut fx = gs();
        fx.set_reverb_macro_gs(5);
        assert_eq!(fx.reverb.name(), "Plate Reverb");
        fx.set_reverb_macro_gs(7);
        assert_eq!(fx.reverb.name(), "Panning Delay");
        assert_eq!(fx.context().reverb_input_level, 1.0);
    }

    #[test]
    fn test_unknown_insertion_is_bypassed() {
        let mut fx = gs();
        let err = fx.set_insertion_gs(0x7e, 0x7e).unwrap_err();
        assert!(matches!(err, WavemixError::UnknownEffect { msb: 0x7e, lsb: 0x7e }), "got {err}");
        let mut buf = impulse();
        fx.do_insertion_effect_gs(&mut buf);
        assert_eq!(buf, impulse(), "empty chain passes the block through");
    }

    #[test]
    fn test_insertion_param_out_of_range() {
        let mut fx = gs();
        assert!(fx.set_insertion_param_gs(20, 1).is_err());
        assert!(fx.set_insertion_param_gs(19, 1).is_ok());
    }

    #[test]
    fn test_xg_defaults() {
        let fx = SystemEffects::new(SystemMode::Xg, ReverbAlgorithm::Freeverb, RATE, FRAMES);
        assert_eq!(fx.chorus_xg.chain.types(), vec![EffectType::Chorus, EffectType::ChorusEq3]);
        assert_eq!(fx.variation_xg.chain.types(), vec![EffectType::DelayLcr, EffectType::DelayEq2]);
        assert_eq!(fx.insertion_xg[1].chain.types()[0], EffectType::StereoDistortion);
        assert!(!fx.multi_eq_xg.is_valid());
    }

    #[test]
    fn test_variation_as_insertion_leaves_output() {
        let mut fx = SystemEffects::new(SystemMode::Xg, ReverbAlgorithm::Freeverb, RATE, FRAMES);
        fx.set_ch_delay(&impulse(), 127);
        let mut out = vec![0; FRAMES * 2];
        fx.do_variation_effect1_xg(&mut out);
        assert!(out.iter().all(|&s| s == 0), "insertion-connected variation is not a send effect");
        assert!(fx.delay_bus.iter().all(|&s| s == 0), "the variation bus is still cleared");
    }

    #[test]
    fn test_unknown_xg_slot() {
        let mut fx = SystemEffects::new(SystemMode::Xg, ReverbAlgorithm::Freeverb, RATE, FRAMES);
        assert!(fx.set_xg_effect(XgSlot::Insertion(2), 0x49, 0).is_err());
        assert!(matches!(
            fx.set_xg_effect(XgSlot::Variation, 0x7d, 0),
            Err(WavemixError::UnknownEffect { .. })
        ));
    }
}
