use serde::{Deserialize, Serialize};

use super::{BlendMode, Rgba};

/// Visual style of the waveform view. Changing it invalidates the cached
/// composites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformStyle {
    /// Corner radius of the background rectangles, in pixels.
    pub radius: u32,
    pub background: Rgba,
    pub wave_background: Rgba,
    pub wave_border: Rgba,
    pub progress_playing_background: Rgba,
    pub progress_paused_background: Rgba,
    pub playing_blend: BlendMode,
    pub paused_blend: BlendMode,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            radius: 0,
            background: Rgba::DARK_BLUE,
            wave_background: Rgba::DARK_GREEN,
            wave_border: Rgba::GREEN,
            progress_playing_background: Rgba::DARK_CYAN,
            progress_paused_background: Rgba::DARK_GRAY,
            playing_blend: BlendMode::Overlay,
            paused_blend: BlendMode::Overlay,
        }
    }
}
