//! Wavetable voice mixing and GS/XG effect processing
//!
//! Voices are resampled, enveloped and panned into 32-bit interleaved stereo
//! blocks; channel blocks then pass through insertion effects and the send
//! buses of the system reverb, chorus, delay and EQ.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wavemix::{Engine, Sample, SynthConfig};
//!
//! let mut engine = Engine::new(SynthConfig::default()).unwrap();
//! let sample = Arc::new(Sample::new(vec![0; 1024], 44100, 440.0).with_loop(0, 1024));
//! engine.note_on(0, 69, 100, sample, 64).unwrap();
//! let mut block = vec![0i32; 2 * engine.config().block_size];
//! engine.render_block(&mut block);
//! ```

pub mod config;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod filters;
pub mod fixed;
pub mod mixer;
pub mod resample;
pub mod tables;
pub mod utils;
pub mod voice;

pub use config::{ReverbAlgorithm, SynthConfig, SystemMode, VoiceFilterMode};
pub use engine::{ControlMessage, ControlSender, Engine, SendBus};
pub use error::{Result, WavemixError};
pub use voice::{Sample, Voice};
