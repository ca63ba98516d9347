//! Waveshaping curves for the overdrive and distortion effects
//!
//! Every curve scales the input by a Q24 drive first and clamps it to
//! `±WS_AMP_MAX` so the polynomial stages cannot overflow.

use crate::fixed::{fscale, imuldiv24, imuldiv28};

/// Largest magnitude fed into a shaping polynomial
pub const WS_AMP_MAX: i32 = 0x0fff_ffff;

/// Selectable waveshaping curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveshaper {
    /// Leave the sample untouched (amp simulator switched off)
    #[default]
    Bypass,
    /// Drive then clamp
    Hard,
    /// Cubic soft clip `1.5x - 0.5x^3`
    Soft1,
    /// Quadratic soft clip `2|x| - x^2`, sign restored
    Soft2,
}

impl Waveshaper {
    /// Shape one sample
    ///
    /// # Arguments
    /// * `x` - Input sample
    /// * `drive` - Q24 gain applied before shaping
    #[inline]
    pub fn apply(self, x: i32, drive: i32) -> i32 {
        match self {
            Waveshaper::Bypass => x,
            Waveshaper::Hard => hard_clipping(x, drive),
            Waveshaper::Soft1 => soft_clipping1(x, drive),
            Waveshaper::Soft2 => soft_clipping2(x, drive),
        }
    }
}

#[inline]
fn drive_and_clamp(x: i32, drive: i32) -> i32 {
    imuldiv24(x, drive).clamp(-WS_AMP_MAX, WS_AMP_MAX)
}

#[inline]
pub fn hard_clipping(x: i32, drive: i32) -> i32 {
    drive_and_clamp(x, drive)
}

#[inline]
pub fn soft_clipping1(x: i32, drive: i32) -> i32 {
    let x = drive_and_clamp(x, drive);
    let cube = imuldiv28(imuldiv28(x, x), x);
    imuldiv24(x, fscale(1.5, 24)) - imuldiv24(cube, fscale(0.5, 24))
}

#[inline]
pub fn soft_clipping2(x: i32, drive: i32) -> i32 {
    let x = drive_and_clamp(x, drive);
    x.signum() * ((x.abs() << 1) - imuldiv28(x, x))
}
