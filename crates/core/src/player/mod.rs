//! UI-thread glue between a bound playback engine and the waveform view.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;

use crate::config::CoreConfig;
use crate::engine::{EngineEvent, MediaReference, PlaybackEngine, PlaybackState};
use crate::heartbeat::Heartbeat;
use crate::plugin::PluginRegistry;
use crate::render::{ViewEvent, WaveformView};
use crate::settings::SettingsProvider;
use crate::Result;

/// Owns the view and the engine subscription. Every method runs on the UI
/// thread; engine notifications only arrive through [`pump`](Self::pump).
pub struct PlayerSession {
    engine: Arc<dyn PlaybackEngine>,
    events: Receiver<EngineEvent>,
    view: WaveformView,
    heartbeat: Heartbeat,
}

impl PlayerSession {
    pub fn new(engine: Arc<dyn PlaybackEngine>, view: WaveformView, heartbeat: Heartbeat) -> Self {
        let events = engine.subscribe();
        Self {
            engine,
            events,
            view,
            heartbeat,
        }
    }

    /// Binds the engine and waveform capabilities from `registry`. Either
    /// one missing is a configuration error.
    pub fn from_registry(
        registry: &PluginRegistry,
        settings: Arc<dyn SettingsProvider>,
        config: &CoreConfig,
    ) -> Result<Self> {
        let engine = registry.playback_engine()?;
        let builder = registry.waveform_builder()?;
        let view = WaveformView::new(builder, settings, config.style.clone());
        Ok(Self::new(
            engine,
            view,
            Heartbeat::new(config.heartbeat.interval()),
        ))
    }

    pub fn engine(&self) -> &Arc<dyn PlaybackEngine> {
        &self.engine
    }

    pub fn view(&self) -> &WaveformView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut WaveformView {
        &mut self.view
    }

    /// Loads `path` into the engine. The view follows once the media change
    /// is pumped.
    pub fn open(&self, path: &Path) {
        self.engine.set_media(MediaReference::from(path));
    }

    /// Drains pending engine notifications into the view and hands them back
    /// so the shell can track what is playing.
    pub fn pump(&mut self) -> Vec<EngineEvent> {
        let events: Vec<_> = self.events.try_iter().collect();
        for event in &events {
            match event {
                EngineEvent::PositionChanged(position) => self.view.set_value(*position),
                EngineEvent::StateChanged(state) => {
                    self.view.set_paused(*state == PlaybackState::Paused);
                }
                EngineEvent::MediaChanged(media) => {
                    self.view.draw_file(media.as_path());
                    self.view.set_value(0.0);
                }
                EngineEvent::Failed(failure) => {
                    tracing::warn!(%failure, "playback failed");
                }
                EngineEvent::Tick(_) | EngineEvent::VolumeChanged(_) | EngineEvent::Finished => {}
            }
        }
        events
    }

    /// Runs the view's cache check when the heartbeat is due. Returns true
    /// when the composites were rebuilt.
    pub fn heartbeat(&mut self, now: Instant) -> bool {
        self.heartbeat.poll(now) && self.view.heartbeat()
    }

    /// Acts on a view request. Seeks go straight to the engine; dropped files
    /// are returned for the playlist to enqueue.
    pub fn handle(&self, event: ViewEvent) -> Option<Vec<PathBuf>> {
        match event {
            ViewEvent::SeekRequested(fraction) => {
                self.engine.set_position(fraction);
                None
            }
            ViewEvent::FilesDropped(files) => Some(files),
        }
    }
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("state", &self.engine.state())
            .field("view", &self.view)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}
