//! GS and XG effect parameter blocks and their factory presets
//!
//! A control surface addresses an effect by a `(msb, lsb)` type pair plus a
//! raw parameter array. Selecting a type copies the matching preset into the
//! block; the stages of the chain then read their native fields from it in
//! `conv_gs` / `conv_xg`.

use super::EffectType;
use crate::fixed::clip_int;
use serde::{Deserialize, Serialize};

/// GS insertion effect parameter block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsInsertion {
    pub type_msb: u8,
    pub type_lsb: u8,
    /// The 20 type-specific parameters
    pub parameter: [i8; 20],
    pub send_reverb: u8,
    pub send_chorus: u8,
    pub send_delay: u8,
    /// Route the insertion output through the channel EQ
    pub send_eq_switch: u8,
}

impl Default for GsInsertion {
    fn default() -> Self {
        Self {
            type_msb: 0,
            type_lsb: 0,
            parameter: [0; 20],
            send_reverb: 0x28,
            send_chorus: 0,
            send_delay: 0,
            send_eq_switch: 0x01,
        }
    }
}

impl GsInsertion {
    /// Parameter `i` as a plain integer
    #[inline]
    pub fn p(&self, i: usize) -> i32 {
        self.parameter[i] as i32
    }

    /// Stages that make up the chain for the current type
    pub fn chain_types(&self) -> Vec<EffectType> {
        use EffectType::*;
        match (self.type_msb, self.type_lsb) {
            (0x01, 0x00) => vec![StereoEq],
            (0x01, 0x10) => vec![Eq2, Overdrive1],
            (0x01, 0x11) => vec![Eq2, Distortion1],
            (0x01, 0x40) => vec![Eq2, HexaChorus],
            (0x01, 0x72) => vec![Eq2, Lofi1],
            (0x01, 0x73) => vec![Eq2, Lofi2],
            (0x11, 0x03) => vec![DualOd],
            _ => Vec::new(),
        }
    }

    /// Copy the factory preset for the current type, if one exists
    ///
    /// Returns the preset name.
    pub fn load_preset(&mut self) -> Option<&'static str> {
        let preset = GS_PRESETS
            .iter()
            .find(|p| p.type_msb == self.type_msb && p.type_lsb == self.type_lsb)?;
        self.parameter = preset.param;
        Some(preset.name)
    }
}

/// Dry amount for a GS wet/dry parameter
#[inline]
pub fn calc_dry_gs(val: i32) -> f64 {
    (127 - val) as f64 / 127.0
}

/// Wet amount for a GS wet/dry parameter
#[inline]
pub fn calc_wet_gs(val: i32) -> f64 {
    val as f64 / 127.0
}

/// Where an XG effect block sits in the signal path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XgConnection {
    /// Inline on one part
    #[default]
    Insertion,
    /// Fed from the variation send bus
    System,
    SystemChorus,
    SystemReverb,
}

/// XG effect block (reverb, chorus, variation or insertion slot)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XgEffect {
    pub type_msb: u8,
    pub type_lsb: u8,
    pub connection: XgConnection,
    pub send_reverb: u8,
    pub send_chorus: u8,
    /// Part the insertion runs on; 0x7f is off
    pub part: u8,
    /// Return level for system connections
    pub ret: u8,
    pub pan: u8,
    pub param_lsb: [i8; 16],
    pub param_msb: [i8; 10],
    /// Delay types carry 14-bit parameters split over both arrays
    pub use_msb: bool,
}

impl Default for XgEffect {
    fn default() -> Self {
        Self {
            type_msb: 0,
            type_lsb: 0,
            connection: XgConnection::Insertion,
            send_reverb: 0,
            send_chorus: 0,
            part: 0x7f,
            ret: 0x40,
            pan: 0x40,
            param_lsb: [0; 16],
            param_msb: [0; 10],
            use_msb: false,
        }
    }
}

impl XgEffect {
    /// A block of the given type and connection, with defaults elsewhere
    pub fn with_type(type_msb: u8, connection: XgConnection) -> Self {
        Self { type_msb, connection, ..Default::default() }
    }

    /// LSB parameter `i`
    #[inline]
    pub fn l(&self, i: usize) -> i32 {
        self.param_lsb[i] as i32
    }

    /// 14-bit delay parameter `i` in milliseconds, clipped to `max` tenths
    pub fn delay_ms(&self, i: usize, max: i32) -> f64 {
        let raw = self.param_msb[i] as i32 * 128 + self.param_lsb[i] as i32;
        clip_int(raw, 1, max) as f64 / 10.0
    }

    /// Dry amount: system connections carry no dry signal
    pub fn calc_dry(&self, val: i32) -> f64 {
        match self.connection {
            XgConnection::Insertion => (127 - val) as f64 / 127.0,
            _ => 0.0,
        }
    }

    /// Wet amount: system connections use the return level instead
    pub fn calc_wet(&self, val: i32) -> f64 {
        match self.connection {
            XgConnection::Insertion => val as f64 / 127.0,
            _ => self.ret as f64 / 127.0,
        }
    }

    /// Stages for the current type
    ///
    /// Unsupported types clear the type to `0/0` and yield an empty chain.
    pub fn chain_types(&mut self) -> Vec<EffectType> {
        use EffectType::*;
        self.use_msb = matches!(self.type_msb, 0x05..=0x08);
        let types = match self.type_msb {
            0x05 => vec![DelayLcr, DelayEq2],
            0x06 => vec![DelayLr, DelayEq2],
            0x07 => vec![Echo, DelayEq2],
            0x08 => vec![CrossDelay, DelayEq2],
            0x41 | 0x42 => vec![Chorus, ChorusEq3],
            0x43 => vec![Flanger, ChorusEq3],
            0x44 => vec![Symphonic, ChorusEq3],
            0x49 => vec![StereoDistortion, OdEq3],
            0x4A => vec![StereoOverdrive, OdEq3],
            0x4B => vec![AmpSimulator],
            0x4C => vec![Eq3],
            0x4D => vec![Eq2],
            0x4E if matches!(self.type_lsb, 0x01 | 0x02) => {
                vec![AutoWah, AutoWahEq2, AutoWahOd, AutoWahOdEq3]
            }
            0x4E => vec![AutoWah, AutoWahEq2],
            0x5E => vec![Lofi],
            _ => Vec::new(),
        };
        if types.is_empty() {
            self.type_msb = 0;
            self.type_lsb = 0;
        }
        types
    }

    /// Copy the factory preset for the current type
    ///
    /// An exact match wins; otherwise a non-zero MSB falls back to the
    /// first preset sharing the LSB. Returns the preset name.
    pub fn load_preset(&mut self) -> Option<&'static str> {
        let exact = XG_PRESETS
            .iter()
            .find(|p| p.type_msb == self.type_msb && p.type_lsb == self.type_lsb);
        let preset = match exact {
            Some(p) => p,
            None if self.type_msb != 0 => XG_PRESETS.iter().find(|p| p.type_lsb == self.type_lsb)?,
            None => return None,
        };
        self.param_lsb = preset.param_lsb;
        self.param_msb = preset.param_msb;
        Some(preset.name)
    }
}

/// GS factory preset
#[derive(Clone, Copy, Debug)]
pub struct GsPreset {
    pub type_msb: u8,
    pub type_lsb: u8,
    pub name: &'static str,
    pub param: [i8; 20],
    /// Parameters driven by the two control sources, -1 for none
    pub control1: i8,
    pub control2: i8,
}

/// XG factory preset
#[derive(Clone, Copy, Debug)]
pub struct XgPreset {
    pub type_msb: u8,
    pub type_lsb: u8,
    pub name: &'static str,
    pub param_msb: [i8; 10],
    pub param_lsb: [i8; 16],
    /// Parameter driven by the control source, -1 for none
    pub control: i8,
}

pub const GS_PRESETS: [GsPreset; 7] = [
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x00,
        name: "Stereo-EQ",
        param: [1, 0x45, 1, 0x34, 0x48, 0, 0x48, 0x38, 0, 0x48, 0, 0, 0, 0, 0, 0, 0, 0, 0, 127],
        control1: 19,
        control2: -1,
    },
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x10,
        name: "Overdrive",
        param: [48, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x40, 0x40, 96],
        control1: 0,
        control2: 18,
    },
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x11,
        name: "Distortion",
        param: [76, 3, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x38, 0x40, 84],
        control1: 0,
        control2: 18,
    },
    GsPreset {
        type_msb: 0x11,
        type_lsb: 0x03,
        name: "OD1/OD2",
        param: [0, 48, 1, 1, 0, 1, 76, 3, 1, 0, 0, 0, 0, 0, 0, 0x40, 96, 0x40, 84, 127],
        control1: 1,
        control2: 6,
    },
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x40,
        name: "Hexa Chorus",
        param: [0x18, 0x08, 127, 5, 66, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x40, 0x40, 64, 112],
        control1: 1,
        control2: 15,
    },
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x72,
        name: "Lo-Fi 1",
        param: [2, 6, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 127, 0x40, 0x40, 64, 127],
        control1: 15,
        control2: 18,
    },
    GsPreset {
        type_msb: 0x01,
        type_lsb: 0x73,
        name: "Lo-Fi 2",
        param: [2, 1, 0x20, 0, 64, 1, 127, 0, 0, 127, 0, 0, 127, 0, 1, 127, 0x40, 0x40, 64, 127],
        control1: 3,
        control2: 15,
    },
];

const fn xg(
    type_msb: u8,
    type_lsb: u8,
    name: &'static str,
    param_msb: [i8; 10],
    param_lsb: [i8; 16],
    control: i8,
) -> XgPreset {
    XgPreset { type_msb, type_lsb, name, param_msb, param_lsb, control }
}

const NO_MSB: [i8; 10] = [0; 10];

pub const XG_PRESETS: [XgPreset; 34] = [
    xg(0x05, 0, "DELAY L,C,R", [0x1A, 0x0D, 0x27, 0x27, 0, 0, 0, 0, 0, 0],
        [0x05, 0x03, 0x08, 0x08, 74, 100, 10, 0, 0, 32, 0, 0, 28, 64, 46, 64], 9),
    xg(0x06, 0, "DELAY L,R", [0x13, 0x1D, 0x1D, 0x1D, 0, 0, 0, 0, 0, 0],
        [0x44, 0x26, 0x28, 0x26, 87, 10, 0, 0, 0, 32, 0, 0, 28, 64, 46, 64], 9),
    xg(0x07, 0, "ECHO", [0x0D, 0, 0x0D, 0, 0, 0x0D, 0x0D, 0, 0, 0],
        [0x24, 80, 0x74, 80, 10, 0x24, 0x74, 0, 0, 40, 0, 0, 28, 64, 46, 64], 9),
    xg(0x08, 0, "CROSS DELAY", [0x0D, 0x0D, 0, 0, 0, 0, 0, 0, 0, 0],
        [0x24, 0x56, 111, 1, 10, 0, 0, 0, 0, 32, 0, 0, 28, 64, 46, 64], 9),
    xg(0x41, 0, "CHORUS 1", NO_MSB, [6, 54, 77, 106, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 1, "CHORUS 2", NO_MSB, [8, 63, 64, 30, 0, 28, 62, 42, 58, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 2, "CHORUS 3", NO_MSB, [4, 44, 64, 110, 0, 28, 64, 46, 66, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 3, "GM CHORUS 1", NO_MSB, [9, 10, 64, 109, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 4, "GM CHORUS 2", NO_MSB, [28, 34, 67, 105, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 5, "GM CHORUS 3", NO_MSB, [9, 34, 69, 105, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 6, "GM CHORUS 4", NO_MSB, [26, 29, 75, 102, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 7, "FB CHORUS", NO_MSB, [6, 43, 107, 111, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 0, 0], 9),
    xg(0x41, 8, "CHORUS 4", NO_MSB, [9, 32, 69, 104, 0, 28, 64, 46, 64, 64, 46, 64, 10, 0, 1, 0], 9),
    xg(0x42, 0, "CELESTE 1", NO_MSB, [12, 32, 64, 0, 0, 28, 64, 46, 64, 127, 40, 68, 10, 0, 0, 0], 9),
    xg(0x42, 1, "CELESTE 2", NO_MSB, [28, 18, 90, 2, 0, 28, 62, 42, 60, 84, 40, 68, 10, 0, 0, 0], 9),
    xg(0x42, 2, "CELESTE 3", NO_MSB, [4, 63, 44, 2, 0, 28, 64, 46, 68, 127, 40, 68, 10, 0, 0, 0], 9),
    xg(0x42, 8, "CELESTE 4", NO_MSB, [8, 29, 64, 0, 0, 28, 64, 51, 66, 127, 40, 68, 10, 0, 1, 0], 9),
    xg(0x43, 0, "FLANGER 1", NO_MSB, [14, 14, 104, 2, 0, 28, 64, 46, 64, 96, 40, 64, 10, 4, 0, 0], 9),
    xg(0x43, 1, "FLANGER 2", NO_MSB, [32, 17, 26, 2, 0, 28, 64, 46, 60, 96, 40, 64, 10, 4, 0, 0], 9),
    xg(0x43, 7, "GM FLANGER", NO_MSB, [3, 21, 120, 1, 0, 28, 64, 46, 64, 96, 40, 64, 10, 4, 0, 0], 9),
    xg(0x43, 8, "FLANGER 3", NO_MSB, [4, 109, 109, 2, 0, 28, 64, 46, 64, 127, 40, 64, 10, 4, 0, 0], 9),
    xg(0x44, 0, "SYMPHONIC", NO_MSB, [12, 25, 16, 0, 0, 28, 64, 46, 64, 127, 46, 64, 10, 0, 0, 0], 9),
    xg(0x49, 0, "DISTORTION", NO_MSB, [40, 20, 72, 53, 48, 0, 43, 74, 10, 127, 120, 0, 0, 0, 0, 0], 0),
    xg(0x49, 8, "STEREO DISTORTION", NO_MSB, [18, 27, 71, 48, 84, 0, 32, 66, 10, 127, 105, 0, 0, 0, 0, 0], 0),
    xg(0x4A, 0, "OVERDRIVE", NO_MSB, [29, 24, 68, 45, 55, 0, 41, 72, 10, 127, 104, 0, 0, 0, 0, 0], 0),
    xg(0x4A, 8, "STEREO OVERDRIVE", NO_MSB, [10, 24, 69, 46, 105, 0, 41, 66, 10, 127, 104, 0, 0, 0, 0, 0], 0),
    xg(0x4B, 0, "AMP SIMULATOR", NO_MSB, [39, 1, 48, 55, 0, 0, 0, 0, 0, 127, 112, 0, 0, 0, 0, 0], 0),
    xg(0x4B, 8, "STEREO AMP SIMULATOR", NO_MSB, [16, 2, 46, 119, 0, 0, 0, 0, 0, 127, 106, 0, 0, 0, 0, 0], 0),
    xg(0x4C, 0, "3-BAND EQ", NO_MSB, [70, 34, 60, 10, 70, 28, 46, 0, 0, 127, 0, 0, 0, 0, 0, 0], -1),
    xg(0x4D, 0, "2-BAND EQ", NO_MSB, [28, 70, 46, 70, 0, 0, 0, 0, 0, 127, 0, 0, 0, 0, 0, 0], -1),
    xg(0x4E, 0, "AUTO WAH", NO_MSB, [70, 56, 39, 25, 0, 28, 66, 46, 64, 127, 0, 0, 0, 0, 0, 0], 2),
    xg(0x4E, 1, "AUTO WAH+DISTORTION", NO_MSB, [40, 73, 26, 29, 0, 28, 66, 46, 64, 127, 30, 72, 74, 53, 48, 0], 2),
    xg(0x4E, 2, "AUTO WAH+OVERDRIVE", NO_MSB, [48, 64, 32, 23, 0, 28, 66, 46, 64, 127, 29, 68, 72, 45, 55, 0], 2),
    xg(0x5E, 0, "LO-FI", NO_MSB, [2, 60, 6, 54, 5, 10, 1, 1, 0, 127, 0, 0, 0, 0, 1, 0], 9),
];
