//! Utility modules shared by the mixer and the engine

pub mod logging;
pub mod smoother;

pub use logging::{init_logger, try_init_logger};
pub use smoother::{MixRamp, SMOOTH_TIME_MS};
