//! Core library for the Wavedeck audio player.
//!
//! The crate defines the contract between a shell and interchangeable
//! playback backends, binds those backends through a versioned plugin
//! registry, and renders a growing amplitude envelope as a cached seek bar.
//! Windowing, playlists and tag parsing stay outside; the shell drives the
//! view through [`PlayerSession`].

pub mod config;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod player;
pub mod plugin;
pub mod render;
pub mod scan;
pub mod settings;
pub mod tags;
pub mod waveform;

pub use config::{CoreConfig, EngineConfig, HeartbeatConfig, PluginPreferences, WaveformConfig};
pub use engine::{
    ClockEngine, EngineEvent, MediaReference, PlaybackEngine, PlaybackFailure, PlaybackState,
    Severity,
};
pub use error::{CoreError, Result};
pub use heartbeat::Heartbeat;
pub use player::PlayerSession;
pub use plugin::{CapabilityType, PluginDescriptor, PluginInstance, PluginRegistry};
pub use render::{Bitmap, BlendMode, Rgba, WaveformStyle, WaveformView};
pub use scan::ExtensionFilter;
pub use settings::{JsonSettings, SettingsProvider};
pub use tags::TagReader;
pub use waveform::{
    BuildStatus, PeakEnvelope, PeakPair, SymphoniaWaveformBuilder, WaveformBuilder,
};
