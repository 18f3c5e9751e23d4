use super::{Bitmap, BlendMode, WaveformStyle};

/// The three cached composites the view paints from: the waveform over the
/// idle background, and the progress variants for playing and paused.
#[derive(Debug, Clone)]
pub struct CompositeImageSet {
    pub idle: Bitmap,
    pub playing: Bitmap,
    pub paused: Bitmap,
}

impl CompositeImageSet {
    /// Composites `wave` onto each styled background.
    pub fn compose(wave: &Bitmap, style: &WaveformStyle) -> Self {
        let layer = |background, mode| {
            let mut image = Bitmap::new(wave.width(), wave.height());
            image.fill_rounded_rect(style.radius, background);
            image.composite(wave, mode);
            image
        };
        Self {
            idle: layer(style.background, BlendMode::SourceOver),
            playing: layer(style.progress_playing_background, style.playing_blend),
            paused: layer(style.progress_paused_background, style.paused_blend),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.idle.dimensions()
    }

    /// Progress composite matching the pause state.
    pub fn progress(&self, paused: bool) -> &Bitmap {
        if paused {
            &self.paused
        } else {
            &self.playing
        }
    }
}
