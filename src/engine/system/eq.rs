//! System EQs: the GS two-band channel EQ and the XG five-band multi-EQ

use super::status::EqStatusGs;
use crate::filters::{Peaking, ShelfKind, Shelving};
use crate::fixed::clip_int;
use crate::tables::{EQ_FREQ_TABLE_XG, MULTI_EQ_BLOCK_TABLE_XG};

/// Run the GS EQ bus through both shelves, mix it into `out` and clear it
pub fn drain_eq_gs(status: &mut EqStatusGs, bus: &mut [i32], out: &mut [i32]) {
    status.lsf.process_stereo(bus);
    status.hsf.process_stereo(bus);
    for (o, &x) in out.iter_mut().zip(bus.iter()) {
        *o = o.saturating_add(x);
    }
    bus.fill(0);
}

/// Filter a multi-EQ band is currently realised as
#[derive(Clone, Debug)]
enum BandFilter {
    Peaking(Peaking),
    Shelving(Shelving),
}

impl BandFilter {
    fn process_stereo(&mut self, buf: &mut [i32]) {
        match self {
            BandFilter::Peaking(f) => f.process_stereo(buf),
            BandFilter::Shelving(f) => f.process_stereo(buf),
        }
    }
}

/// Raw parameters of one multi-EQ band
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EqBandXg {
    pub gain: u8,
    pub freq: u8,
    /// Q times ten
    pub q: u8,
    /// Bands 1 and 5 only: 0 = shelving, otherwise peaking
    pub shape: u8,
}

/// XG multi-EQ on the final mix
///
/// A band is active when its frequency parameter is in `1..60` and its gain
/// is off centre. The whole EQ is skipped when no band is active.
#[derive(Clone, Debug)]
pub struct MultiEqXg {
    pub eq_type: u8,
    pub bands: [EqBandXg; 5],
    filters: [BandFilter; 5],
    active: [bool; 5],
}

impl Default for MultiEqXg {
    fn default() -> Self {
        let mut eq = Self {
            eq_type: 0,
            bands: [EqBandXg { gain: 0x40, freq: 0, q: 0, shape: 0 }; 5],
            filters: std::array::from_fn(|_| BandFilter::Peaking(Peaking::default())),
            active: [false; 5],
        };
        eq.set_type(0);
        eq
    }
}

impl MultiEqXg {
    /// Load one of the five presets (flat, jazz, pops, rock, concert)
    ///
    /// Call [`MultiEqXg::recompute`] afterwards.
    pub fn set_type(&mut self, eq_type: u8) {
        let index = clip_int(eq_type as i32, 0, 4) as usize;
        let row = MULTI_EQ_BLOCK_TABLE_XG[index];
        self.eq_type = index as u8;
        for (band, chunk) in self.bands.iter_mut().zip(row.chunks_exact(4)) {
            *band = EqBandXg {
                gain: chunk[0] as u8,
                freq: chunk[1] as u8,
                q: chunk[2] as u8,
                shape: chunk[3] as u8,
            };
        }
    }

    /// Rebuild every band filter from the raw parameters
    pub fn recompute(&mut self, sample_rate: f64) {
        for (i, band) in self.bands.iter().enumerate() {
            let freq = EQ_FREQ_TABLE_XG[(band.freq & 0x7f) as usize];
            let gain = band.gain as f64 - 64.0;
            let q = band.q as f64 / 10.0;
            let shelf = match i {
                0 if band.shape == 0 => Some(ShelfKind::Low),
                4 if band.shape == 0 => Some(ShelfKind::High),
                _ => None,
            };
            self.filters[i] = match shelf {
                Some(kind) => {
                    let mut f = Shelving::new(kind);
                    f.set(freq, gain, q, sample_rate);
                    BandFilter::Shelving(f)
                }
                None => {
                    let mut f = Peaking::default();
                    f.set(freq, gain, q, sample_rate);
                    BandFilter::Peaking(f)
                }
            };
            self.active[i] = band.freq != 0 && band.freq < 60 && band.gain != 0x40;
        }
    }

    /// True when at least one band changes the signal
    pub fn is_valid(&self) -> bool {
        self.active.iter().any(|&a| a)
    }

    /// Equalise the mix in place
    pub fn process(&mut self, buf: &mut [i32]) {
        for (filter, _) in self.filters.iter_mut().zip(self.active).filter(|(_, a)| *a) {
            filter.process_stereo(buf);
        }
    }
}
