use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{rasterize_envelope, Bitmap, CompositeImageSet, WaveformStyle};
use crate::scan::{self, ExtensionFilter, URI_LIST_MIME};
use crate::settings::SettingsProvider;
use crate::waveform::WaveformBuilder;

/// Resolution of the slider value, matching an integer slider range.
pub const SLIDER_MAXIMUM: u32 = 10_000;

/// Widget size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Whether the view consumed an input event or left it for an ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Accepted,
    Ignored,
}

/// Requests raised by the view for the shell to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The user picked a new playback position fraction.
    SeekRequested(f64),
    /// Files dropped onto the view, directories already expanded.
    FilesDropped(Vec<PathBuf>),
}

/// Drag-and-drop payload as delivered by the windowing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPayload {
    pub mime_type: String,
    pub data: String,
}

impl DropPayload {
    pub fn uri_list(data: impl Into<String>) -> Self {
        Self {
            mime_type: URI_LIST_MIME.to_string(),
            data: data.into(),
        }
    }

    /// Local paths carried by a `text/uri-list` payload; empty for any other
    /// MIME type.
    pub fn paths(&self) -> Vec<PathBuf> {
        if self.mime_type.eq_ignore_ascii_case(URI_LIST_MIME) {
            scan::parse_uri_list(&self.data)
        } else {
            Vec::new()
        }
    }
}

/// Geometry, peak count and build fraction the cached composites were
/// built for. The fraction is kept as raw bits so the key stays `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    size: Size,
    index: usize,
    fraction_bits: u32,
}

/// Waveform seek bar.
///
/// The envelope is rasterized only from [`heartbeat`](Self::heartbeat), when
/// the widget size, the committed peak count or the build fraction changed,
/// or the style was replaced. [`paint`](Self::paint) then only copies two column ranges out of
/// the cached composites, reading the live slider value each time.
pub struct WaveformView {
    builder: Arc<dyn WaveformBuilder>,
    settings: Arc<dyn SettingsProvider>,
    style: WaveformStyle,
    size: Size,
    value: u32,
    paused: bool,
    enabled: bool,
    needs_update: bool,
    cached: Option<CacheKey>,
    images: Option<CompositeImageSet>,
    rasterizations: u64,
}

impl WaveformView {
    pub const DEFAULT_SIZE: Size = Size::new(200, 80);

    pub fn new(
        builder: Arc<dyn WaveformBuilder>,
        settings: Arc<dyn SettingsProvider>,
        style: WaveformStyle,
    ) -> Self {
        Self {
            builder,
            settings,
            style,
            size: Self::DEFAULT_SIZE,
            value: 0,
            paused: false,
            enabled: false,
            needs_update: false,
            cached: None,
            images: None,
            rasterizations: 0,
        }
    }

    fn reset(&mut self) {
        self.cached = None;
        self.paused = false;
        self.needs_update = false;
        self.enabled = false;
    }

    /// Starts drawing `path`. A missing file leaves the view disabled and
    /// returns `false`.
    pub fn draw_file(&mut self, path: &Path) -> bool {
        self.reset();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "not drawing missing file");
            return false;
        }
        self.builder.start(path);
        self.enabled = true;
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    pub fn style(&self) -> &WaveformStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: WaveformStyle) {
        self.style = style;
        self.needs_update = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Current position fraction, quantized to the slider range.
    pub fn value(&self) -> f64 {
        f64::from(self.value) / f64::from(SLIDER_MAXIMUM)
    }

    pub fn set_value(&mut self, fraction: f64) {
        let fraction = crate::engine::clamp_unit(fraction);
        self.value = (fraction * f64::from(SLIDER_MAXIMUM)).round() as u32;
    }

    /// Number of times the envelope has been rasterized.
    pub fn rasterizations(&self) -> u64 {
        self.rasterizations
    }

    pub fn images(&self) -> Option<&CompositeImageSet> {
        self.images.as_ref()
    }

    /// Rebuilds the cached composites when the size or the committed peak
    /// count changed, or the style was replaced. Returns whether it did.
    pub fn heartbeat(&mut self) -> bool {
        let (fraction, index) = self.builder.position_and_index();
        let key = CacheKey {
            size: self.size,
            index,
            fraction_bits: fraction.to_bits(),
        };
        if self.cached != Some(key) {
            self.needs_update = true;
        }
        if !self.needs_update {
            return false;
        }

        let wave = rasterize_envelope(
            &self.builder.peaks(),
            index,
            fraction,
            self.size.width,
            self.size.height,
            self.style.wave_background,
            self.style.wave_border,
        );
        self.images = Some(CompositeImageSet::compose(&wave, &self.style));
        self.cached = Some(key);
        self.needs_update = false;
        self.rasterizations += 1;
        tracing::debug!(index, fraction, width = self.size.width, "waveform rasterized");
        true
    }

    /// Paints the view into `target`, reallocating it when its size differs
    /// from the view's.
    pub fn paint(&self, target: &mut Bitmap) {
        let Size { width, height } = self.size;
        if target.dimensions() != (width, height) {
            *target = Bitmap::new(width, height);
        }

        let images = match &self.images {
            Some(images) if self.enabled && images.dimensions() == (width, height) => images,
            _ => {
                *target = Bitmap::new(width, height);
                target.fill_rounded_rect(self.style.radius, self.style.background);
                return;
            }
        };

        let x = (self.value() * f64::from(width)).round() as u32;
        target.copy_columns(&images.idle, x..width);
        target.copy_columns(images.progress(self.paused), 0..x);
    }

    /// Maps a press at horizontal offset `x` to a seek request. Only the
    /// primary button seeks.
    pub fn pointer_press(&mut self, button: PointerButton, x: f64) -> Option<ViewEvent> {
        if !self.enabled || button != PointerButton::Primary || self.size.width == 0 {
            return None;
        }
        let fraction = crate::engine::clamp_unit(x / f64::from(self.size.width));
        self.set_value(fraction);
        Some(ViewEvent::SeekRequested(fraction))
    }

    /// Wheel input is left to an ancestor.
    pub fn wheel(&self, _delta: f64) -> EventDisposition {
        EventDisposition::Ignored
    }

    pub fn drag_enter(&self, payload: &DropPayload) -> EventDisposition {
        if payload.paths().is_empty() {
            EventDisposition::Ignored
        } else {
            EventDisposition::Accepted
        }
    }

    /// Expands a dropped URI list against the `FileFilters` allow-list and
    /// raises one bulk event. No playback decision is taken here.
    pub fn drop(&self, payload: &DropPayload) -> Option<ViewEvent> {
        if !payload.mime_type.eq_ignore_ascii_case(URI_LIST_MIME) {
            return None;
        }
        let filter = ExtensionFilter::from_settings(self.settings.as_ref());
        let files = scan::expand_drop(&payload.paths(), &filter);
        tracing::debug!(count = files.len(), "files dropped");
        Some(ViewEvent::FilesDropped(files))
    }
}

impl std::fmt::Debug for WaveformView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformView")
            .field("size", &self.size)
            .field("value", &self.value)
            .field("paused", &self.paused)
            .field("enabled", &self.enabled)
            .field("rasterizations", &self.rasterizations)
            .finish_non_exhaustive()
    }
}
