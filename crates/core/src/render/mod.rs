//! Waveform seek-bar rendering.
//!
//! The envelope is rasterized once per change into a transparent layer, then
//! composited onto three styled backgrounds. Painting a frame only copies
//! column ranges out of those cached composites.

mod bitmap;
mod blend;
mod composite;
mod raster;
mod style;
mod view;

pub use self::bitmap::{Bitmap, Rgba};
pub use self::blend::BlendMode;
pub use self::composite::CompositeImageSet;
pub use self::raster::rasterize_envelope;
pub use self::style::WaveformStyle;
pub use self::view::{
    DropPayload, EventDisposition, PointerButton, Size, ViewEvent, WaveformView, SLIDER_MAXIMUM,
};
