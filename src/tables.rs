//! Lookup tables shared by the voice engine and the effect processors
//!
//! Tables are built once on first use and are read-only afterwards, so the
//! audio thread only ever pays for an index.

use crate::fixed::SINE_CYCLE_LENGTH;
use once_cell::sync::Lazy;
use std::f64::consts::PI;

/// Linear interpolation through `(index, value)` breakpoints, `len` entries.
/// Indices past the last breakpoint hold its value.
fn piecewise(points: &[(usize, f64)], len: usize) -> Vec<f64> {
    let mut table = vec![0.0; len];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut value = points.last().map(|p| p.1).unwrap_or(0.0);
        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if i >= x0 && i <= x1 {
                value = y0 + (y1 - y0) * (i - x0) as f64 / (x1 - x0) as f64;
                break;
            }
        }
        *slot = value;
    }
    table
}

/// Amplitude curve for decay/release stages (GUS and generic instruments).
pub static VOL_TABLE: Lazy<[f64; 1024]> = Lazy::new(|| {
    let mut t = [0.0; 1024];
    for (i, v) in t.iter_mut().enumerate() {
        *v = (i as f64 / 1023.0).powf(1.660_964_047_44);
    }
    t
});

/// Linear amplitude curve used while attacking.
pub static ATTACK_VOL_TABLE: Lazy<[f64; 1024]> = Lazy::new(|| {
    let mut t = [0.0; 1024];
    for (i, v) in t.iter_mut().enumerate() {
        *v = i as f64 / 1023.0;
    }
    t
});

/// SoundFont amplitude curve: 96 dB over the full envelope range.
pub static SB_VOL_TABLE: Lazy<[f64; 1024]> = Lazy::new(|| {
    let mut t = [0.0; 1024];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 10f64.powf((1023 - i) as f64 * 960.0 / (1023.0 * -200.0));
    }
    t
});

/// Convex curve applied to the modulation envelope.
pub static MODENV_VOL_TABLE: Lazy<[f64; 1024]> = Lazy::new(|| {
    let mut t = [0.0; 1024];
    for (i, v) in t.iter_mut().enumerate().take(1023).skip(1) {
        let ratio = (i as f64 * i as f64) / (1023.0 * 1023.0);
        let x = (1.0 - (-20.0 / 96.0 * ratio.ln() / 10f64.ln())).max(0.0);
        *v = (x + 1.0).ln() / 2f64.ln();
    }
    t[1023] = 1.0;
    t
});

static SINE_TABLE: Lazy<[f64; SINE_CYCLE_LENGTH]> = Lazy::new(|| {
    let mut t = [0.0; SINE_CYCLE_LENGTH];
    for (i, v) in t.iter_mut().enumerate() {
        *v = (2.0 * PI * i as f64 / SINE_CYCLE_LENGTH as f64).sin();
    }
    t
});

static TRIANGULAR_TABLE: Lazy<[f64; SINE_CYCLE_LENGTH]> = Lazy::new(|| {
    let mut t = [0.0; SINE_CYCLE_LENGTH];
    for (i, v) in t.iter_mut().enumerate() {
        let x = i as f64 / SINE_CYCLE_LENGTH as f64;
        *v = if x < 0.25 {
            4.0 * x
        } else if x < 0.75 {
            2.0 - 4.0 * x
        } else {
            4.0 * x - 4.0
        };
    }
    t
});

/// One sine cycle over `SINE_CYCLE_LENGTH` steps, `-1.0..=1.0`.
#[inline]
pub fn lookup_sine(x: i32) -> f64 {
    SINE_TABLE[x.rem_euclid(SINE_CYCLE_LENGTH as i32) as usize]
}

/// One triangle cycle over `SINE_CYCLE_LENGTH` steps, starting at 0 and rising.
#[inline]
pub fn lookup_triangular(x: i32) -> f64 {
    TRIANGULAR_TABLE[x.rem_euclid(SINE_CYCLE_LENGTH as i32) as usize]
}

/// Constant-power pan law, 129 entries peaking at 128.
pub static PAN_TABLE: Lazy<[f64; 129]> = Lazy::new(|| {
    let mut t = [0.0; 129];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 128.0 * (PI / 2.0 * i as f64 / 128.0).sin();
    }
    t
});

/// Per-ear arrival delay in milliseconds for each pan position.
pub static PAN_DELAY_TABLE: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 0.6 * i as f64 / 127.0;
    }
    t
});

/// Perceived loudness curve for MIDI volume, expression and velocity.
/// Full scale is 127, so three factors multiply out to about 21 bits.
pub static PERCEIVED_VOL_TABLE: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 127.0 * (i as f64 / 127.0).powf(1.660_964_047_44);
    }
    t
});

fn sc_eg_table() -> [f64; 128] {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 2f64.powf((64.0 - i as f64) / 16.0);
    }
    t
}

/// GS attack-time controller to rate multiplier (64 = unchanged)
pub static SC_EG_ATTACK_TABLE: Lazy<[f64; 128]> = Lazy::new(sc_eg_table);

/// GS decay-time controller to rate multiplier (64 = unchanged)
pub static SC_EG_DECAY_TABLE: Lazy<[f64; 128]> = Lazy::new(sc_eg_table);

/// GS release-time controller to rate multiplier (64 = unchanged)
pub static SC_EG_RELEASE_TABLE: Lazy<[f64; 128]> = Lazy::new(sc_eg_table);

/// Chamberlin filter gain per quarter-dB of resonance.
pub static CHAMBERLIN_DB_TO_Q_TABLE: Lazy<Vec<f64>> =
    Lazy::new(|| (0..1024).map(|i| 10f64.powf(i as f64 / 4.0 / 20.0)).collect());

/// Look up the Chamberlin resonance gain for `reso_db`.
#[inline]
pub fn chamberlin_db_to_q(reso_db: f64) -> f64 {
    let idx = ((reso_db * 4.0) as i64).clamp(0, CHAMBERLIN_DB_TO_Q_TABLE.len() as i64 - 1);
    CHAMBERLIN_DB_TO_Q_TABLE[idx as usize]
}

/// Fine pitch ratio per 1/256 semitone step.
pub static BEND_FINE: Lazy<[f64; 256]> = Lazy::new(|| {
    let mut t = [0.0; 256];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 2f64.powf(i as f64 / 3072.0);
    }
    t
});

/// Coarse pitch ratio per semitone.
pub static BEND_COARSE: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 2f64.powf(i as f64 / 12.0);
    }
    t
});

/// GS reverb time parameter to seconds.
pub static REVERB_TIME_TABLE: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    let k = 24f64.ln() / 127.0;
    for (i, v) in t.iter_mut().enumerate() {
        *v = 0.41 * (i as f64 * k).exp();
    }
    t
});

/// GS delay center time parameter to milliseconds (0x00..=0x73).
pub static DELAY_TIME_CENTER_TABLE: Lazy<Vec<f64>> = Lazy::new(|| {
    piecewise(
        &[
            (0x00, 0.0),
            (0x14, 2.0),
            (0x23, 5.0),
            (0x2D, 10.0),
            (0x37, 20.0),
            (0x46, 50.0),
            (0x50, 100.0),
            (0x5A, 200.0),
            (0x69, 500.0),
            (0x73, 1000.0),
        ],
        0x74,
    )
});

/// GS/XG pre-delay parameter to milliseconds.
pub static PRE_DELAY_TIME_TABLE: Lazy<Vec<f64>> = Lazy::new(|| {
    piecewise(&[(0, 0.0), (50, 5.0), (60, 10.0), (100, 50.0), (125, 100.0)], 128)
});

/// GS chorus delay parameter to milliseconds.
pub static CHORUS_DELAY_TIME_TABLE: Lazy<Vec<f64>> = Lazy::new(|| {
    piecewise(&[(0, 0.0), (50, 5.0), (60, 10.0), (100, 50.0), (125, 100.0)], 128)
});

/// GS modulation rate parameter to Hz.
pub static RATE1_TABLE: Lazy<Vec<f64>> =
    Lazy::new(|| piecewise(&[(0, 0.05), (99, 5.0), (127, 10.0)], 128));

const EQ_FREQ_XG: [f64; 61] = [
    20.0, 22.0, 25.0, 28.0, 32.0, 36.0, 40.0, 45.0, 50.0, 56.0, 63.0, 70.0, 80.0, 90.0, 100.0,
    110.0, 125.0, 140.0, 160.0, 180.0, 200.0, 225.0, 250.0, 280.0, 315.0, 355.0, 400.0, 450.0,
    500.0, 560.0, 630.0, 700.0, 800.0, 900.0, 1000.0, 1100.0, 1200.0, 1400.0, 1600.0, 1800.0,
    2000.0, 2200.0, 2500.0, 2800.0, 3200.0, 3600.0, 4000.0, 4500.0, 5000.0, 5600.0, 6300.0,
    7000.0, 8000.0, 9000.0, 10000.0, 11000.0, 12000.0, 14000.0, 16000.0, 18000.0, 20000.0,
];

fn padded_eq_freq() -> [f64; 128] {
    let mut t = [20000.0; 128];
    t[..EQ_FREQ_XG.len()].copy_from_slice(&EQ_FREQ_XG);
    t
}

/// XG EQ frequency parameter to Hz.
pub static EQ_FREQ_TABLE_XG: Lazy<[f64; 128]> = Lazy::new(padded_eq_freq);

/// GS EQ frequency parameter to Hz.
pub static EQ_FREQ_TABLE_GS: Lazy<[f64; 128]> = Lazy::new(padded_eq_freq);

/// XG LFO frequency parameter to Hz.
pub const LFO_FREQ_TABLE_XG: [f64; 128] = [
    0.00, 0.04, 0.08, 0.13, 0.17, 0.21, 0.25, 0.29, 0.34, 0.38, 0.42, 0.46, 0.51, 0.55, 0.59, 0.63,
    0.67, 0.72, 0.76, 0.80, 0.84, 0.88, 0.93, 0.97, 1.01, 1.05, 1.09, 1.14, 1.18, 1.22, 1.26, 1.30,
    1.35, 1.39, 1.43, 1.47, 1.51, 1.56, 1.60, 1.64, 1.68, 1.72, 1.77, 1.81, 1.85, 1.89, 1.94, 1.98,
    2.02, 2.06, 2.10, 2.15, 2.19, 2.23, 2.27, 2.31, 2.36, 2.40, 2.44, 2.48, 2.52, 2.57, 2.61, 2.65,
    2.69, 2.78, 2.86, 2.94, 3.03, 3.11, 3.20, 3.28, 3.37, 3.45, 3.53, 3.62, 3.70, 3.87, 4.04, 4.21,
    4.37, 4.54, 4.71, 4.88, 5.05, 5.22, 5.38, 5.55, 5.72, 6.06, 6.39, 6.73, 7.07, 7.40, 7.74, 8.08,
    8.41, 8.75, 9.08, 9.42, 9.76, 10.1, 10.8, 11.4, 12.1, 12.8, 13.5, 14.1, 14.8, 15.5, 16.2, 16.8,
    17.5, 18.2, 19.5, 20.9, 22.2, 23.6, 24.9, 26.2, 27.6, 28.9, 30.3, 31.6, 33.0, 34.3, 37.0, 39.7,
];

/// XG modulation delay offset parameter to milliseconds.
pub static MOD_DELAY_OFFSET_TABLE_XG: Lazy<Vec<f64>> =
    Lazy::new(|| piecewise(&[(0, 0.0), (63, 6.3), (127, 50.0)], 128));

/// GS Lo-Fi filter cutoff parameter to Hz.
pub static CUTOFF_FREQ_TABLE_GS: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 250.0 * 2f64.powf(5.0 * i as f64 / 127.0);
    }
    t
});

/// GS low-pass parameter to Hz.
pub static LPF_TABLE_GS: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 125.0 * 2f64.powf(7.0 * i as f64 / 127.0);
    }
    t
});

/// XG Lo-Fi sampling frequency parameter to Hz.
pub static LOFI_SAMPLING_FREQ_TABLE_XG: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut t = [0.0; 128];
    for (i, v) in t.iter_mut().enumerate() {
        *v = 44100.0 * 2f64.powf(-6.0 * i as f64 / 127.0);
    }
    t
});

/// GS reverb macros: character, pre-LPF, level, time, delay feedback, pre-delay.
pub const REVERB_MACRO_PRESETS: [[i8; 6]; 8] = [
    [0, 3, 64, 80, 0, 0],
    [1, 4, 64, 56, 0, 0],
    [2, 0, 64, 64, 0, 0],
    [3, 4, 64, 72, 0, 0],
    [4, 0, 64, 64, 0, 0],
    [5, 0, 64, 88, 0, 0],
    [6, 0, 64, 32, 40, 0],
    [7, 0, 64, 64, 32, 0],
];

/// GS chorus macros: pre-LPF, level, feedback, delay, rate, depth, send reverb, send delay.
pub const CHORUS_MACRO_PRESETS: [[i8; 8]; 8] = [
    [0, 64, 0, 112, 3, 5, 0, 0],
    [0, 64, 5, 80, 9, 19, 0, 0],
    [0, 64, 8, 80, 3, 19, 0, 0],
    [0, 64, 16, 64, 9, 16, 0, 0],
    [0, 64, 64, 127, 2, 24, 0, 0],
    [0, 64, 112, 127, 1, 5, 0, 0],
    [0, 64, 0, 127, 0, 127, 0, 0],
    [0, 64, 80, 127, 0, 127, 0, 0],
];

/// GS delay macros: macro, time center, time ratio L, time ratio R, level center,
/// level L, level R, level, feedback, pre-LPF.
pub const DELAY_MACRO_PRESETS: [[i8; 10]; 10] = [
    [0, 97, 1, 1, 127, 0, 0, 64, 79, 0],
    [1, 106, 1, 1, 127, 0, 0, 64, 79, 0],
    [2, 115, 1, 1, 127, 0, 0, 64, 63, 0],
    [3, 83, 1, 1, 127, 0, 0, 64, 71, 0],
    [4, 90, 12, 24, 0, 125, 60, 64, 73, 0],
    [5, 109, 12, 24, 0, 125, 60, 64, 70, 0],
    [6, 115, 12, 24, 0, 120, 64, 74, 72, 0],
    [7, 93, 12, 24, 0, 120, 64, 64, 69, 0],
    [8, 109, 12, 24, 0, 114, 60, 64, 72, 0],
    [9, 110, 21, 31, 97, 127, 67, 64, 39, 0],
];

/// XG multi-EQ presets: per band gain, frequency, Q, shape.
pub const MULTI_EQ_BLOCK_TABLE_XG: [[i8; 20]; 5] = [
    // flat
    [64, 12, 7, 0, 64, 28, 7, 0, 64, 34, 7, 0, 64, 46, 7, 0, 64, 52, 7, 0],
    // jazz
    [67, 12, 7, 0, 66, 28, 7, 0, 64, 34, 7, 0, 66, 46, 7, 0, 67, 52, 7, 0],
    // pops
    [66, 12, 7, 0, 64, 28, 7, 0, 67, 34, 7, 0, 64, 46, 7, 0, 66, 52, 7, 0],
    // rock
    [70, 12, 7, 0, 67, 28, 7, 0, 62, 34, 7, 0, 67, 46, 7, 0, 70, 52, 7, 0],
    // concert
    [68, 12, 7, 0, 64, 28, 7, 0, 64, 34, 7, 0, 64, 46, 7, 0, 68, 52, 7, 0],
];
