//! GS system-effect parameter blocks
//!
//! Each block keeps the raw 7-bit GS parameters as received from SysEx and
//! the values derived from them. `recompute` refreshes the derived part for
//! a sample rate; macro setters overwrite the raw part from a preset row.

use crate::filters::{Lowpass1, ShelfKind, Shelving};
use crate::fixed::clip_int;
use crate::tables::{
    CHORUS_MACRO_PRESETS, DELAY_MACRO_PRESETS, DELAY_TIME_CENTER_TABLE, REVERB_MACRO_PRESETS,
};

/// Reverb character that selects the plate engine
pub const CHARACTER_PLATE: u8 = 5;
/// Reverb character that selects the plain feedback delay
pub const CHARACTER_DELAY: u8 = 6;
/// Reverb character that selects the ping-pong delay
pub const CHARACTER_PANNING_DELAY: u8 = 7;

/// Pre-LPF parameter (1..=7) to a one-pole coefficient
fn pre_lpf_coefficient(pre_lpf: u8, sample_rate: f64) -> f64 {
    2.0 * ((7 - pre_lpf.min(7)) as f64 / 7.0 * 16000.0 + 200.0) / sample_rate
}

/// GS reverb parameters (`40 01 30..37`)
#[derive(Clone, Debug)]
pub struct ReverbStatusGs {
    pub character: u8,
    pub pre_lpf: u8,
    pub level: u8,
    pub time: u8,
    pub delay_feedback: u8,
    /// Pre-delay in milliseconds
    pub pre_delay_time: u8,
    pub lpf: Lowpass1,
}

impl Default for ReverbStatusGs {
    fn default() -> Self {
        Self {
            character: 4,
            pre_lpf: 0,
            level: 0x40,
            time: 0x40,
            delay_feedback: 0,
            pre_delay_time: 0,
            lpf: Lowpass1::default(),
        }
    }
}

impl ReverbStatusGs {
    pub fn recompute(&mut self, sample_rate: f64) {
        if self.pre_lpf != 0 {
            self.lpf.set(pre_lpf_coefficient(self.pre_lpf, sample_rate));
        }
    }

    /// Load a GS reverb macro (0 = Room 1 .. 7 = Panning Delay)
    pub fn set_macro(&mut self, macro_no: u8) {
        let row = REVERB_MACRO_PRESETS[clip_int(macro_no as i32, 0, 7) as usize];
        self.character = row[0] as u8;
        self.pre_lpf = row[1] as u8;
        self.level = row[2] as u8;
        self.time = row[3] as u8;
        self.delay_feedback = row[4] as u8;
        self.pre_delay_time = row[5] as u8;
    }

    /// Load a GM2 reverb type
    ///
    /// GM2 types 0..=4 reuse the GS macros with their own reverb times;
    /// type 8 (Plate) maps to GS macro 5.
    pub fn set_macro_gm2(&mut self, gm2_type: u8) {
        let macro_no = if gm2_type == 8 { 5 } else { gm2_type };
        self.set_macro(macro_no);
        match gm2_type {
            0 => self.time = 44,
            1 | 8 => self.time = 50,
            2 => self.time = 56,
            3 | 4 => self.time = 64,
            _ => {}
        }
    }

    /// Room-size factor for the comb bank
    pub fn roomsize(&self) -> f64 {
        match self.character {
            0 => 1.0,
            1 => 0.94,
            2 => 0.97,
            3 => 0.90,
            4 => 0.85,
            _ => 1.0,
        }
    }

    /// Output level factor
    pub fn level_scale(&self) -> f64 {
        match self.character {
            0 => 0.744025605,
            1 => 1.224309745,
            2 => 0.858592403,
            3 => 1.0471802,
            4 => 1.0,
            5 => 0.865335496,
            _ => 1.0,
        }
    }

    /// Reverb-time factor
    pub fn rt_scale(&self) -> f64 {
        match self.character {
            0 => 0.516850262,
            1 => 1.004226004,
            2 => 0.691046825,
            3 => 0.893006004,
            4 => 1.0,
            5 => 0.538476488,
            _ => 1.0,
        }
    }
}

/// GS chorus parameters (`40 01 38..3F`)
#[derive(Clone, Debug)]
pub struct ChorusStatusGs {
    pub macro_no: u8,
    pub pre_lpf: u8,
    pub level: u8,
    pub feedback: u8,
    pub delay: u8,
    pub rate: u8,
    pub depth: u8,
    pub send_reverb: u8,
    pub send_delay: u8,
    pub lpf: Lowpass1,
}

impl Default for ChorusStatusGs {
    fn default() -> Self {
        Self {
            macro_no: 0,
            pre_lpf: 0,
            level: 0x40,
            feedback: 0x08,
            delay: 0x50,
            rate: 0x03,
            depth: 0x13,
            send_reverb: 0,
            send_delay: 0,
            lpf: Lowpass1::default(),
        }
    }
}

impl ChorusStatusGs {
    pub fn recompute(&mut self, sample_rate: f64) {
        if self.pre_lpf != 0 {
            self.lpf.set(pre_lpf_coefficient(self.pre_lpf, sample_rate));
        }
    }

    /// Load a GS chorus macro or GM2 chorus type (0 = Chorus 1 .. 7 = Flanger)
    pub fn set_macro(&mut self, macro_no: u8) {
        let index = clip_int(macro_no as i32, 0, 7) as usize;
        let row = CHORUS_MACRO_PRESETS[index];
        self.macro_no = index as u8;
        self.pre_lpf = row[0] as u8;
        self.level = row[1] as u8;
        self.feedback = row[2] as u8;
        self.delay = row[3] as u8;
        self.rate = row[4] as u8;
        self.depth = row[5] as u8;
        self.send_reverb = row[6] as u8;
        self.send_delay = row[7] as u8;
    }
}

/// Routing of the GS delay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DelayKind {
    /// Centre tap only
    #[default]
    Normal,
    /// Centre tap plus left and right taps
    ThreeTap,
    /// Centre tap with feedback crossing sides
    Cross,
}

/// GS delay parameters (`40 01 50..5A`)
#[derive(Clone, Debug)]
pub struct DelayStatusGs {
    pub kind: DelayKind,
    pub level: u8,
    pub level_center: u8,
    pub level_left: u8,
    pub level_right: u8,
    pub time_c: u8,
    /// Left time as a ratio of the centre time, in 1/24 steps
    pub time_l: u8,
    pub time_r: u8,
    pub feedback: u8,
    pub pre_lpf: u8,
    pub send_reverb: u8,
    /// Centre time in milliseconds
    pub time_center: f64,
    /// Tap lengths in samples: centre, left, right
    pub sample: [usize; 3],
    pub level_ratio: [f64; 3],
    pub feedback_ratio: f64,
    pub send_reverb_ratio: f64,
    pub lpf: Lowpass1,
}

impl Default for DelayStatusGs {
    fn default() -> Self {
        Self {
            kind: DelayKind::Normal,
            level: 0x40,
            level_center: 0x7f,
            level_left: 0,
            level_right: 0,
            time_c: 0x61,
            time_l: 0x01,
            time_r: 0x01,
            feedback: 0x50,
            pre_lpf: 0,
            send_reverb: 0,
            time_center: 0.0,
            sample: [0; 3],
            level_ratio: [0.0; 3],
            feedback_ratio: 0.0,
            send_reverb_ratio: 0.0,
            lpf: Lowpass1::default(),
        }
    }
}

impl DelayStatusGs {
    /// Derive tap lengths, levels and gains
    ///
    /// A non-zero side level promotes the normal delay to three taps; the
    /// cross delay keeps its routing.
    pub fn recompute(&mut self, sample_rate: f64) {
        self.time_center = DELAY_TIME_CENTER_TABLE[self.time_c.min(0x73) as usize];
        let centre = (self.time_center * sample_rate / 1000.0) as usize;
        self.sample = [
            centre,
            (centre as f64 * self.time_l as f64 / 24.0) as usize,
            (centre as f64 * self.time_r as f64 / 24.0) as usize,
        ];
        let level = self.level as f64;
        self.level_ratio = [self.level_center, self.level_left, self.level_right]
            .map(|side| level * side as f64 / (127.0 * 127.0));
        self.feedback_ratio = (self.feedback as f64 - 64.0) * (0.763 * 2.0 / 100.0);
        self.send_reverb_ratio = self.send_reverb as f64 * (0.787 / 100.0);

        if self.kind == DelayKind::Normal && (self.level_left != 0 || self.level_right != 0) {
            self.kind = DelayKind::ThreeTap;
        }
        if self.pre_lpf != 0 {
            self.lpf.set(pre_lpf_coefficient(self.pre_lpf, sample_rate));
        }
    }

    /// Load a GS delay macro (0 = Delay 1 .. 9 = Delay 4 ping-pong variants)
    ///
    /// Macros 4 and above are cross delays.
    pub fn set_macro(&mut self, macro_no: u8) {
        let index = clip_int(macro_no as i32, 0, 9) as usize;
        let row = DELAY_MACRO_PRESETS[index];
        self.kind = if index >= 4 { DelayKind::Cross } else { DelayKind::Normal };
        self.time_c = row[1] as u8;
        self.time_l = row[2] as u8;
        self.time_r = row[3] as u8;
        self.level_center = row[4] as u8;
        self.level_left = row[5] as u8;
        self.level_right = row[6] as u8;
        self.level = row[7] as u8;
        self.feedback = row[8] as u8;
    }
}

/// GS channel EQ parameters (`40 02 00..03`)
#[derive(Clone, Debug)]
pub struct EqStatusGs {
    /// 0 = 200 Hz, 1 = 400 Hz
    pub low_freq: u8,
    pub low_gain: u8,
    /// 0 = 3 kHz, 1 = 6 kHz
    pub high_freq: u8,
    pub high_gain: u8,
    pub lsf: Shelving,
    pub hsf: Shelving,
}

impl Default for EqStatusGs {
    fn default() -> Self {
        Self {
            low_freq: 0,
            low_gain: 0x40,
            high_freq: 0,
            high_gain: 0x40,
            lsf: Shelving::new(ShelfKind::Low),
            hsf: Shelving::new(ShelfKind::High),
        }
    }
}

impl EqStatusGs {
    /// Recalculate both shelves; a corner above Nyquist keeps the previous band
    pub fn recompute(&mut self, sample_rate: f64) {
        let low = if self.low_freq == 0 { 200.0 } else { 400.0 };
        if low < sample_rate / 2.0 {
            self.lsf.set(low, self.low_gain as f64 - 64.0, 0.0, sample_rate);
        }
        let high = if self.high_freq == 0 { 3000.0 } else { 6000.0 };
        if high < sample_rate / 2.0 {
            self.hsf.set(high, self.high_gain as f64 - 64.0, 0.0, sample_rate);
        }
    }
}
