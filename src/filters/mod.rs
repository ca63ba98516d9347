//! Fixed-point filters used by the effect algorithms
//!
//! All of them take interleaved `i32` blocks or single samples and keep one
//! history per stereo side. Coefficients are recalculated by `calc` only
//! when a parameter moved.

pub mod biquad;
pub mod lowpass1;
pub mod moog;
pub mod peaking;
pub mod shelving;

pub use self::biquad::{Biquad, BiquadKind};
pub use self::lowpass1::Lowpass1;
pub use self::moog::{Moog, MoogDist};
pub use self::peaking::Peaking;
pub use self::shelving::{ShelfKind, Shelving};
