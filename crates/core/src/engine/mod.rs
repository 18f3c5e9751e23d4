//! Playback engine contract shared by every backend.
//!
//! A backend implements [`PlaybackEngine`] on top of [`EngineCore`], which owns
//! the transition table and the notification ordering so callers never have to
//! special-case a particular backend.

mod clock;
mod events;
mod probe;
mod shared;
mod state;

use std::fmt;
use std::path::Path;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

pub use self::clock::ClockEngine;
pub use self::events::EventHub;
pub use self::probe::{MediaInfo, MediaProbe, SymphoniaProbe};
pub use self::shared::{EngineCore, EngineGuard};
pub use self::state::PlaybackStateMachine;

pub(crate) use self::probe::open_format;

/// Interface string a playback backend must report to be bound.
pub const PLAYBACK_ENGINE_INTERFACE: &str = "Wavedeck/PlaybackEngine/0.7";

/// Engine-wide playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Opaque identifier of the media source currently loaded into an engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the reference as a local filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&Path> for MediaReference {
    fn from(value: &Path) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

impl From<&str> for MediaReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a backend-reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Information,
    Warning,
    Critical,
}

/// Error reported by a backend during an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl PlaybackFailure {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.severity, self.title, self.message)
    }
}

/// Outbound notifications emitted by a playback engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PositionChanged(f64),
    /// Heartbeat while playing, carrying the elapsed playback time in
    /// milliseconds.
    Tick(u64),
    StateChanged(PlaybackState),
    MediaChanged(MediaReference),
    VolumeChanged(f64),
    /// Natural end of media.
    Finished,
    Failed(PlaybackFailure),
}

/// Capability implemented by every playback backend.
///
/// All control operations are fire-and-forget: failures in the underlying
/// pipeline surface as [`EngineEvent::Failed`], never as a return value.
pub trait PlaybackEngine: Send + Sync {
    fn has_media(&self) -> bool;
    fn current_media(&self) -> Option<MediaReference>;
    fn state(&self) -> PlaybackState;

    fn volume(&self) -> f64;
    /// Playback progress relative to the duration, in `[0, 1]`.
    fn position(&self) -> f64;
    /// Duration of the current media, `None` while unknown.
    fn duration_millis(&self) -> Option<u64>;

    /// Replaces the current media, forcing the engine into
    /// [`PlaybackState::Stopped`].
    fn set_media(&self, media: MediaReference);
    fn set_volume(&self, volume: f64);
    fn set_position(&self, position: f64);
    /// Relative seek. Backends without support leave this as a no-op.
    fn jump(&self, delta_millis: i64) {
        let _ = delta_millis;
    }

    fn play(&self);
    fn pause(&self);
    fn stop(&self);

    /// Registers a new observer. Every subscriber receives every event
    /// emitted after subscription, in emission order.
    fn subscribe(&self) -> Receiver<EngineEvent>;
}

/// Clamps a volume or position value into `[0, 1]`. NaN maps to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
