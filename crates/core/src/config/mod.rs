use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, TimingError};

/// Top-level configuration structure for a gameplay session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub clock: ClockConfig,
    pub judgment: JudgmentConfig,
}

impl AppConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing sections fall back to their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.clock.bpm.is_finite() && self.clock.bpm > 0.0) {
            return Err(TimingError::InvalidTempo(self.clock.bpm));
        }
        if !(self.clock.playback_rate.is_finite() && self.clock.playback_rate >= 0.0) {
            return Err(TimingError::msg(format!(
                "playback rate must be zero or positive, got {}",
                self.clock.playback_rate
            )));
        }
        Ok(())
    }
}

/// Initial tempo and playback speed of the beat clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    pub bpm: f64,
    pub playback_rate: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            playback_rate: 1.0,
        }
    }
}

/// Judgment policy knobs for the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgmentConfig {
    pub edge_policy: EdgePolicy,
}

/// What an input landing exactly on a window boundary does to the window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Fire the edge callback once and keep the window pending so a better
    /// timed input can still land before the timeout.
    ///
    /// Routing still picks the earliest window, so later boundary inputs
    /// that land on it are absorbed even when an overlapping later window
    /// would have judged them.
    #[default]
    KeepOpen,
    /// Fire the edge callback and resolve the window.
    Close,
}
