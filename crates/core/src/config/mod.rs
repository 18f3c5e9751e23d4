use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::WaveformStyle;
use crate::Result;

/// Top-level configuration structure for the player core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub heartbeat: HeartbeatConfig,
    pub engine: EngineConfig,
    pub waveform: WaveformConfig,
    pub style: WaveformStyle,
    pub plugins: PluginPreferences,
}

impl CoreConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Renderer heartbeat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_ms: 40 }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Settings for the built-in playback backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Settings for the built-in waveform backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Target number of peak pairs per file when its length is known.
    pub resolution: usize,
    /// Frames folded into one peak pair when the length is unknown.
    pub fallback_frames_per_peak: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            fallback_frames_per_peak: 1024,
        }
    }
}

impl WaveformConfig {
    pub fn frames_per_peak(&self, total_frames: Option<u64>) -> usize {
        match total_frames {
            Some(total) => (total / self.resolution.max(1) as u64).max(1) as usize,
            None => self.fallback_frames_per_peak.max(1),
        }
    }
}

/// Preferred candidate name per capability; `None` takes the first
/// compatible registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginPreferences {
    pub playback_engine: Option<String>,
    pub waveform_builder: Option<String>,
    pub tag_reader: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BlendMode;

    #[test]
    fn partial_documents_keep_defaults() {
        let config = CoreConfig::from_json(
            r#"{ "heartbeat": { "interval_ms": 16 }, "style": { "playing_blend": "Multiply" } }"#,
        )
        .unwrap();

        assert_eq!(config.heartbeat.interval(), Duration::from_millis(16));
        assert_eq!(config.engine.tick_interval_ms, 100);
        assert_eq!(config.style.playing_blend, BlendMode::Multiply);
        assert_eq!(config.style.paused_blend, BlendMode::Overlay);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            CoreConfig::from_json("{ not json"),
            Err(crate::CoreError::Settings(_))
        ));
    }

    #[test]
    fn derives_peak_width_from_length() {
        let config = WaveformConfig::default();
        assert_eq!(config.frames_per_peak(Some(2048 * 10)), 10);
        assert_eq!(config.frames_per_peak(Some(5)), 1);
        assert_eq!(config.frames_per_peak(None), 1024);
    }
}
