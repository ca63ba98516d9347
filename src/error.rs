//! Error types for configuration and the control boundary
//!
//! The render path itself never fails: unsupported effects degrade to
//! pass-through stages and fixed-point overflow saturates.

use thiserror::Error;

/// Errors reported outside the audio callback
#[derive(Debug, Error)]
pub enum WavemixError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown effect type {msb:#04x}/{lsb:#04x}")]
    UnknownEffect { msb: u8, lsb: u8 },

    #[error("voice index {0} is out of range")]
    VoiceOutOfRange(usize),

    #[error("channel {0} is out of range")]
    ChannelOutOfRange(usize),

    #[error("no free voice")]
    NoFreeVoice,

    #[error("control queue is full")]
    QueueFull,

    #[error("control queue is disconnected")]
    Disconnected,

    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WavemixError>;
