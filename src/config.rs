//! Engine configuration
//!
//! Loaded from JSON (or built in code) before an [`Engine`](crate::engine::Engine)
//! is created. All fields have defaults, so a partial document is valid.

use crate::error::{Result, WavemixError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which SysEx dialect drives the system effects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    #[default]
    Gs,
    Xg,
}

/// Resonant low-pass applied to voices whose sample carries a cutoff
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceFilterMode {
    Off,
    /// Two-pole state-variable filter
    #[default]
    Chamberlin,
    /// Four-pole ladder
    Moog,
}

/// Reverb engine used for the GS room and hall characters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReverbAlgorithm {
    /// Four-tap feedback network
    Standard,
    /// Comb/allpass bank; plate and delay characters still select their own engines
    #[default]
    Freeverb,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Samples per envelope update
    pub control_ratio: u32,
    /// Frames rendered per block
    pub block_size: usize,
    /// Size of the voice pool
    pub max_voices: usize,
    /// Held notes decay after this many milliseconds; 0 disables, 1 skips sustain
    pub min_sustain_time: i32,
    /// Run the modulation envelope
    pub modulation_envelope: bool,
    /// Route mystery-panned voices through the per-voice pan delay
    pub pan_delay: bool,
    pub voice_filter: VoiceFilterMode,
    pub system_mode: SystemMode,
    pub reverb_algorithm: ReverbAlgorithm,
    /// Master gain in percent
    pub amplification: u32,
    /// Per-channel reverb sends
    pub reverb: bool,
    /// Per-channel chorus sends
    pub chorus: bool,
    /// Per-channel delay (XG variation) sends
    pub delay: bool,
    /// GS channel EQ
    pub channel_eq: bool,
    pub insertion_effect: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            control_ratio: 44,
            block_size: 1024,
            max_voices: 64,
            min_sustain_time: 5000,
            modulation_envelope: true,
            pan_delay: false,
            voice_filter: VoiceFilterMode::Chamberlin,
            system_mode: SystemMode::Gs,
            reverb_algorithm: ReverbAlgorithm::Freeverb,
            amplification: 70,
            reverb: true,
            chorus: true,
            delay: true,
            channel_eq: true,
            insertion_effect: true,
        }
    }
}

impl SynthConfig {
    /// Parse a JSON document and validate it
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SynthConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 4000 {
            return Err(WavemixError::InvalidConfig(format!(
                "sample_rate {} is below 4000 Hz",
                self.sample_rate
            )));
        }
        if self.control_ratio == 0 {
            return Err(WavemixError::InvalidConfig("control_ratio must be positive".into()));
        }
        if self.block_size == 0 {
            return Err(WavemixError::InvalidConfig("block_size must be positive".into()));
        }
        if self.max_voices == 0 {
            return Err(WavemixError::InvalidConfig("max_voices must be positive".into()));
        }
        if self.amplification > 800 {
            return Err(WavemixError::InvalidConfig(format!(
                "amplification {}% is above 800%",
                self.amplification
            )));
        }
        if self.min_sustain_time < 0 {
            return Err(WavemixError::InvalidConfig("min_sustain_time must not be negative".into()));
        }
        Ok(())
    }

    /// Any per-channel send or insertion is enabled
    pub fn effects_active(&self) -> bool {
        self.reverb || self.chorus || self.delay || self.channel_eq || self.insertion_effect
    }

    /// Gain every voice is scaled by
    pub fn master_volume(&self) -> f64 {
        self.amplification as f64 / 100.0
    }

    /// Sample rate as `f64`, the form every DSP routine uses
    #[inline]
    pub fn rate(&self) -> f64 {
        self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SynthConfig::from_json(r#"{ "sample_rate": 48000, "system_mode": "xg" }"#)
            .expect("valid config");
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.system_mode, SystemMode::Xg);
        assert_eq!(config.control_ratio, 44, "missing fields fall back to defaults");
        assert_eq!(config.voice_filter, VoiceFilterMode::Chamberlin);
    }

    #[test]
    fn test_rejects_zero_control_ratio() {
        let err = SynthConfig::from_json(r#"{ "control_ratio": 0 }"#).unwrap_err();
        assert!(matches!(err, WavemixError::InvalidConfig(_)), "got {err}");
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = SynthConfig::from_json("{ sample_rate: }").unwrap_err();
        assert!(matches!(err, WavemixError::Parse(_)));
    }
}
