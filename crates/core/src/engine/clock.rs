use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use super::{
    EngineCore, EngineEvent, MediaProbe, MediaReference, PlaybackEngine, PlaybackFailure,
    PlaybackState, Severity, SymphoniaProbe,
};
use crate::Result;

/// Playback backend that advances media against a monotonic clock without
/// producing audio.
///
/// Durations come from a [`MediaProbe`]; a background ticker emits `tick` and
/// `positionChanged` while playing and `finished` once the clock passes the
/// end of the media.
pub struct ClockEngine {
    shared: Arc<ClockShared>,
    shutdown: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

struct ClockShared {
    core: EngineCore<ClockSession>,
    probe: Box<dyn MediaProbe>,
}

#[derive(Debug, Default)]
struct ClockSession {
    /// Set while playing: the instant `offset_ms` was last sampled.
    anchor: Option<Instant>,
    offset_ms: u64,
    /// Reported on the next `play()` of the current media.
    open_failure: Option<PlaybackFailure>,
}

impl ClockSession {
    fn elapsed_ms(&self, now: Instant) -> u64 {
        let running = self
            .anchor
            .map(|anchor| now.saturating_duration_since(anchor).as_millis() as u64)
            .unwrap_or(0);
        self.offset_ms + running
    }

    fn seek(&mut self, offset_ms: u64, now: Instant, playing: bool) {
        self.offset_ms = offset_ms;
        self.anchor = playing.then_some(now);
    }

    fn rewind(&mut self) {
        self.anchor = None;
        self.offset_ms = 0;
    }
}

impl ClockEngine {
    /// Creates an engine probing media with symphonia.
    pub fn new(tick_interval: Duration) -> Result<Self> {
        Self::with_probe(tick_interval, SymphoniaProbe)
    }

    pub fn with_probe(tick_interval: Duration, probe: impl MediaProbe + 'static) -> Result<Self> {
        let shared = Arc::new(ClockShared {
            core: EngineCore::new(ClockSession::default()),
            probe: Box::new(probe),
        });

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        let worker = Arc::clone(&shared);
        let ticker = thread::Builder::new()
            .name("clock-engine-ticker".to_string())
            .spawn(move || run_ticker(&worker, tick_interval, &shutdown_rx))?;

        Ok(Self {
            shared,
            shutdown: Some(shutdown_tx),
            ticker: Some(ticker),
        })
    }
}

fn run_ticker(shared: &ClockShared, interval: Duration, shutdown: &Receiver<()>) {
    let ticker = crossbeam_channel::tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => shared.advance(Instant::now()),
            recv(shutdown) -> _ => break,
        }
    }
}

impl ClockShared {
    fn advance(&self, now: Instant) {
        let mut engine = self.core.lock();
        if engine.state() != PlaybackState::Playing {
            return;
        }

        let elapsed = engine.backend().elapsed_ms(now);
        match engine.duration_ms() {
            Some(duration) if elapsed >= duration => {
                engine.finish();
                engine.backend_mut().rewind();
                engine.set_position(0.0);
            }
            Some(duration) => {
                engine.tick(elapsed);
                engine.set_position(elapsed as f64 / duration.max(1) as f64);
            }
            None => engine.tick(elapsed),
        }
    }
}

impl PlaybackEngine for ClockEngine {
    fn has_media(&self) -> bool {
        self.shared.core.lock().has_media()
    }

    fn current_media(&self) -> Option<MediaReference> {
        self.shared.core.lock().media().cloned()
    }

    fn state(&self) -> PlaybackState {
        self.shared.core.lock().state()
    }

    fn volume(&self) -> f64 {
        self.shared.core.lock().volume()
    }

    fn position(&self) -> f64 {
        self.shared.core.lock().position()
    }

    fn duration_millis(&self) -> Option<u64> {
        self.shared.core.lock().duration_ms()
    }

    fn set_media(&self, media: MediaReference) {
        // Probing touches the filesystem; keep it outside the engine lock.
        let probed = self.shared.probe.probe(&media);

        let mut engine = self.shared.core.lock();
        engine.backend_mut().rewind();
        engine.set_media(media);
        match probed {
            Ok(info) => {
                engine.backend_mut().open_failure = None;
                engine.set_duration(info.duration_ms);
            }
            Err(err) => {
                engine.backend_mut().open_failure = Some(PlaybackFailure::new(
                    Severity::Warning,
                    "Cannot open media",
                    err.to_string(),
                ));
            }
        }
    }

    fn set_volume(&self, volume: f64) {
        self.shared.core.lock().set_volume(volume);
    }

    fn set_position(&self, position: f64) {
        let now = Instant::now();
        let mut engine = self.shared.core.lock();
        if !engine.has_media() {
            return;
        }
        let position = engine.set_position(position);
        if let Some(duration) = engine.duration_ms() {
            let playing = engine.state() == PlaybackState::Playing;
            let offset = (position * duration as f64).round() as u64;
            engine.backend_mut().seek(offset, now, playing);
        }
    }

    fn jump(&self, delta_millis: i64) {
        let now = Instant::now();
        let mut engine = self.shared.core.lock();
        let Some(duration) = engine.duration_ms() else {
            return;
        };
        let elapsed = engine.backend().elapsed_ms(now) as i64;
        let target = elapsed.saturating_add(delta_millis).clamp(0, duration as i64) as u64;

        let playing = engine.state() == PlaybackState::Playing;
        engine.backend_mut().seek(target, now, playing);
        engine.set_position(target as f64 / duration.max(1) as f64);
    }

    fn play(&self) {
        let now = Instant::now();
        let mut engine = self.shared.core.lock();
        let resumed_from = engine.state();
        if !engine.play() {
            return;
        }

        if resumed_from == PlaybackState::Stopped {
            if let Some(failure) = engine.backend().open_failure.clone() {
                engine.fail(failure);
                return;
            }
        }
        engine.backend_mut().anchor = Some(now);
    }

    fn pause(&self) {
        let now = Instant::now();
        let mut engine = self.shared.core.lock();
        let elapsed = engine.backend().elapsed_ms(now);
        if engine.pause() {
            engine.backend_mut().seek(elapsed, now, false);
        }
    }

    fn stop(&self) {
        let mut engine = self.shared.core.lock();
        if engine.stop() {
            engine.backend_mut().rewind();
        }
    }

    fn subscribe(&self) -> Receiver<EngineEvent> {
        self.shared.core.subscribe()
    }
}

impl Drop for ClockEngine {
    fn drop(&mut self) {
        // Disconnecting the shutdown channel wakes the ticker.
        self.shutdown.take();
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
        }
    }
}

impl std::fmt::Debug for ClockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockEngine").finish()
    }
}
