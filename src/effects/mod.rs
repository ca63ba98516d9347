//! Insertion and variation effects
//!
//! Every effect algorithm implements [`EffectStage`]. A static registry maps
//! each [`EffectType`] to its display name and a factory, and an
//! [`EffectChain`] strings stages together so one interleaved stereo block
//! passes through them front to back.

pub mod auto_wah;
pub mod chorus;
pub mod delay;
pub mod eq;
pub mod lofi;
pub mod overdrive;
pub mod params;
pub mod primitives;
pub mod waveshaper;

use std::fmt;

use crate::error::WavemixError;

pub use self::params::{GsInsertion, XgConnection, XgEffect};
pub use self::waveshaper::Waveshaper;

/// Process-independent values a stage needs when it (re)initialises
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectContext {
    pub sample_rate: f64,
    /// Level the system reverb input is scaled by
    pub reverb_input_level: f64,
}

impl EffectContext {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate, reverb_input_level: 1.0 }
    }
}

/// Trait that every effect algorithm implements
///
/// The owner calls one of the conversions, then [`EffectStage::init`], then
/// any number of [`EffectStage::process`] calls. [`EffectStage::teardown`]
/// releases delay memory before the stage is dropped or re-initialised.
pub trait EffectStage: Send {
    /// Decode a GS insertion parameter block
    fn conv_gs(&mut self, _params: &GsInsertion) {}

    /// Decode an XG effect parameter block
    fn conv_xg(&mut self, _params: &XgEffect) {}

    /// Size buffers and derive fixed-point coefficients; clears history
    fn init(&mut self, ctx: &EffectContext);

    /// Process an interleaved stereo block in place
    fn process(&mut self, buf: &mut [i32]);

    fn teardown(&mut self) {}
}

/// Registered effect algorithms, tagged in registry order
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectType {
    StereoEq = 1,
    Eq2,
    Eq3,
    Overdrive1,
    Distortion1,
    DualOd,
    HexaChorus,
    Chorus,
    Flanger,
    Symphonic,
    ChorusEq3,
    StereoOverdrive,
    StereoDistortion,
    AmpSimulator,
    OdEq3,
    DelayLcr,
    DelayLr,
    Echo,
    CrossDelay,
    DelayEq2,
    Lofi,
    Lofi1,
    Lofi2,
    AutoWah,
    AutoWahEq2,
    AutoWahOd,
    AutoWahOdEq3,
}

impl EffectType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Registry row for this type
    pub fn engine(self) -> &'static EffectEngine {
        // Rows are stored in tag order starting at 1
        &EFFECT_ENGINES[self as usize - 1]
    }

    pub fn name(self) -> &'static str {
        self.engine().name
    }
}

impl TryFrom<u8> for EffectType {
    type Error = WavemixError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        EFFECT_ENGINES
            .iter()
            .find(|e| e.effect_type.tag() == tag)
            .map(|e| e.effect_type)
            .ok_or(WavemixError::UnknownEffect { msb: 0, lsb: tag })
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registry row
pub struct EffectEngine {
    pub effect_type: EffectType,
    pub name: &'static str,
    pub factory: fn(EffectType) -> Box<dyn EffectStage>,
}

impl fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectEngine")
            .field("effect_type", &self.effect_type)
            .field("name", &self.name)
            .finish()
    }
}

fn create_eq(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::StereoEq => Box::<eq::StereoEq>::default(),
        EffectType::Eq2 | EffectType::DelayEq2 | EffectType::AutoWahEq2 => Box::new(eq::Eq2::new(t)),
        _ => Box::new(eq::Eq3::new(t)),
    }
}

fn create_overdrive(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::Overdrive1 => Box::new(overdrive::Overdrive1::new(Waveshaper::Soft1)),
        EffectType::Distortion1 => Box::new(overdrive::Overdrive1::new(Waveshaper::Hard)),
        EffectType::DualOd => Box::<overdrive::DualOd>::default(),
        EffectType::StereoOverdrive => Box::new(overdrive::StereoOd::new(Waveshaper::Soft1)),
        EffectType::StereoDistortion => Box::new(overdrive::StereoOd::new(Waveshaper::Hard)),
        _ => Box::new(overdrive::StereoOd::new(Waveshaper::Soft2)),
    }
}

fn create_chorus(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::HexaChorus => Box::<chorus::HexaChorus>::default(),
        EffectType::Flanger => Box::new(chorus::XgChorus::new(chorus::ChorusFlavor::Flanger)),
        EffectType::Symphonic => Box::new(chorus::XgChorus::new(chorus::ChorusFlavor::Symphonic)),
        _ => Box::new(chorus::XgChorus::new(chorus::ChorusFlavor::Chorus)),
    }
}

fn create_delay(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::DelayLcr => Box::<delay::DelayLcr>::default(),
        EffectType::DelayLr => Box::<delay::DelayLr>::default(),
        EffectType::Echo => Box::<delay::Echo>::default(),
        _ => Box::<delay::CrossDelay>::default(),
    }
}

fn create_lofi(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::Lofi1 => Box::<lofi::Lofi1>::default(),
        EffectType::Lofi2 => Box::<lofi::Lofi2>::default(),
        _ => Box::<lofi::XgLofi>::default(),
    }
}

fn create_auto_wah(t: EffectType) -> Box<dyn EffectStage> {
    match t {
        EffectType::AutoWahOd => Box::<auto_wah::AutoWahOd>::default(),
        _ => Box::<auto_wah::AutoWah>::default(),
    }
}

macro_rules! engine {
    ($t:ident, $name:expr, $factory:ident) => {
        EffectEngine { effect_type: EffectType::$t, name: $name, factory: $factory }
    };
}

/// Every registered effect, in tag order
pub static EFFECT_ENGINES: [EffectEngine; 27] = [
    engine!(StereoEq, "Stereo-EQ", create_eq),
    engine!(Eq2, "2-Band EQ", create_eq),
    engine!(Eq3, "3-Band EQ", create_eq),
    engine!(Overdrive1, "Overdrive", create_overdrive),
    engine!(Distortion1, "Distortion", create_overdrive),
    engine!(DualOd, "OD1/OD2", create_overdrive),
    engine!(HexaChorus, "Hexa-Chorus", create_chorus),
    engine!(Chorus, "Chorus", create_chorus),
    engine!(Flanger, "Flanger", create_chorus),
    engine!(Symphonic, "Symphonic", create_chorus),
    engine!(ChorusEq3, "3-Band EQ (XG Chorus built-in)", create_eq),
    engine!(StereoOverdrive, "Stereo Overdrive", create_overdrive),
    engine!(StereoDistortion, "Stereo Distortion", create_overdrive),
    engine!(AmpSimulator, "Amp Simulator", create_overdrive),
    engine!(OdEq3, "2-Band EQ (XG OD built-in)", create_eq),
    engine!(DelayLcr, "Delay L,C,R", create_delay),
    engine!(DelayLr, "Delay L,R", create_delay),
    engine!(Echo, "Echo", create_delay),
    engine!(CrossDelay, "Cross Delay", create_delay),
    engine!(DelayEq2, "2-Band EQ (XG Delay built-in)", create_eq),
    engine!(Lofi, "Lo-Fi", create_lofi),
    engine!(Lofi1, "Lo-Fi 1", create_lofi),
    engine!(Lofi2, "Lo-Fi 2", create_lofi),
    engine!(AutoWah, "Auto Wah", create_auto_wah),
    engine!(AutoWahEq2, "2-Band EQ (Auto Wah built-in)", create_eq),
    engine!(AutoWahOd, "OD (Auto Wah built-in)", create_auto_wah),
    engine!(AutoWahOdEq3, "2-Band EQ (Auto Wah OD built-in)", create_eq),
];

struct ChainNode {
    engine: &'static EffectEngine,
    stage: Box<dyn EffectStage>,
}

/// Ordered list of stages fed the same buffer in turn
#[derive(Default)]
pub struct EffectChain {
    nodes: Vec<ChainNode>,
}

impl EffectChain {
    /// Instantiate one stage per type; stages are not initialised yet
    pub fn build(types: &[EffectType]) -> Self {
        let nodes: Vec<ChainNode> = types
            .iter()
            .map(|t| {
                let engine = t.engine();
                ChainNode { engine, stage: (engine.factory)(*t) }
            })
            .collect();
        log::debug!(
            "built effect chain [{}]",
            nodes.iter().map(|n| n.engine.name).collect::<Vec<_>>().join(", ")
        );
        Self { nodes }
    }

    /// Build from raw tags; unknown tags contribute no stage
    pub fn build_from_tags(tags: &[u8]) -> Self {
        let types: Vec<EffectType> = tags
            .iter()
            .filter_map(|&tag| match EffectType::try_from(tag) {
                Ok(t) => Some(t),
                Err(e) => {
                    log::warn!("skipping effect stage: {e}");
                    None
                }
            })
            .collect();
        Self::build(&types)
    }

    /// Tear the current stages down, then replace them
    pub fn rebuild(&mut self, types: &[EffectType]) {
        self.teardown();
        *self = Self::build(types);
    }

    /// Convert a GS block into every stage and re-initialise it
    pub fn recompute_gs(&mut self, params: &GsInsertion, ctx: &EffectContext) {
        for node in &mut self.nodes {
            node.stage.conv_gs(params);
            node.stage.init(ctx);
        }
    }

    /// Convert an XG block into every stage and re-initialise it
    pub fn recompute_xg(&mut self, params: &XgEffect, ctx: &EffectContext) {
        for node in &mut self.nodes {
            node.stage.conv_xg(params);
            node.stage.init(ctx);
        }
    }

    pub fn process(&mut self, buf: &mut [i32]) {
        for node in &mut self.nodes {
            node.stage.process(buf);
        }
    }

    /// Release every stage's buffers and empty the chain
    pub fn teardown(&mut self) {
        for node in &mut self.nodes {
            node.stage.teardown();
        }
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Types of the stages, front to back
    pub fn types(&self) -> Vec<EffectType> {
        self.nodes.iter().map(|n| n.engine.effect_type).collect()
    }
}

impl fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter().map(|n| n.engine.name)).finish()
    }
}

/// The GS insertion effect: its parameter block and live chain
#[derive(Debug, Default)]
pub struct GsInsertionEffect {
    pub params: GsInsertion,
    pub chain: EffectChain,
}

impl GsInsertionEffect {
    /// Rebuild the chain for the selected type, load its preset and initialise
    pub fn realloc(&mut self, ctx: &EffectContext) {
        let types = self.params.chain_types();
        self.chain.rebuild(&types);
        if let Some(name) = self.params.load_preset() {
            log::debug!("GS insertion effect: {name}");
        }
        self.recompute(ctx);
    }

    /// Re-run conversion and init after a parameter change
    pub fn recompute(&mut self, ctx: &EffectContext) {
        self.chain.recompute_gs(&self.params, ctx);
    }

    pub fn process(&mut self, buf: &mut [i32]) {
        self.chain.process(buf);
    }
}

/// One XG effect block (reverb, chorus, variation or insertion)
#[derive(Debug, Default)]
pub struct XgEffectSlot {
    pub params: XgEffect,
    pub chain: EffectChain,
}

impl XgEffectSlot {
    pub fn new(type_msb: u8, connection: XgConnection) -> Self {
        Self { params: XgEffect::with_type(type_msb, connection), chain: EffectChain::default() }
    }

    /// Rebuild the chain for the selected type, load its preset and initialise
    ///
    /// Unsupported types leave an empty chain and reset the type to zero.
    pub fn realloc(&mut self, ctx: &EffectContext) {
        let types = self.params.chain_types();
        if types.is_empty() {
            log::debug!("XG effect type unsupported, slot bypassed");
        }
        self.chain.rebuild(&types);
        if let Some(name) = self.params.load_preset() {
            log::debug!("XG effect: {name}");
        }
        self.recompute(ctx);
    }

    pub fn recompute(&mut self, ctx: &EffectContext) {
        self.chain.recompute_xg(&self.params, ctx);
    }

    pub fn process(&mut self, buf: &mut [i32]) {
        self.chain.process(buf);
    }
}
