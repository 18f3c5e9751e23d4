use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::Receiver;

use super::{
    clamp_unit, EngineEvent, EventHub, MediaReference, PlaybackFailure, PlaybackState,
    PlaybackStateMachine,
};

/// Contract mechanics shared by every backend: transition table, clamped
/// volume and position, duration bookkeeping and notification ordering.
///
/// `B` carries backend-private session state guarded by the same lock, so a
/// backend never has to coordinate two mutexes.
#[derive(Debug)]
pub struct EngineCore<B> {
    inner: Mutex<EngineInner<B>>,
    hub: EventHub<EngineEvent>,
}

#[derive(Debug)]
struct EngineInner<B> {
    machine: PlaybackStateMachine,
    media: Option<MediaReference>,
    volume: f64,
    position: f64,
    duration_ms: Option<u64>,
    backend: B,
}

impl<B> EngineCore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                machine: PlaybackStateMachine::new(),
                media: None,
                volume: 1.0,
                position: 0.0,
                duration_ms: None,
                backend,
            }),
            hub: EventHub::new(),
        }
    }

    /// Locks the engine. Events emitted through the guard are sent while the
    /// lock is held, so all subscribers observe a single total order.
    pub fn lock(&self) -> EngineGuard<'_, B> {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        EngineGuard {
            inner,
            hub: &self.hub,
        }
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.hub.subscribe()
    }
}

pub struct EngineGuard<'a, B> {
    inner: MutexGuard<'a, EngineInner<B>>,
    hub: &'a EventHub<EngineEvent>,
}

impl<B> EngineGuard<'_, B> {
    pub fn state(&self) -> PlaybackState {
        self.inner.machine.state()
    }

    pub fn has_media(&self) -> bool {
        self.inner.media.is_some()
    }

    pub fn media(&self) -> Option<&MediaReference> {
        self.inner.media.as_ref()
    }

    pub fn volume(&self) -> f64 {
        self.inner.volume
    }

    pub fn position(&self) -> f64 {
        self.inner.position
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.inner.duration_ms
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.inner.backend
    }

    pub fn set_duration(&mut self, duration_ms: Option<u64>) {
        self.inner.duration_ms = duration_ms;
    }

    /// Installs a new media reference: forces Stopped, rewinds, then emits
    /// `MediaChanged`.
    pub fn set_media(&mut self, media: MediaReference) {
        if let Some(state) = self.inner.machine.media_changed() {
            self.emit(EngineEvent::StateChanged(state));
        }
        self.inner.media = Some(media.clone());
        self.inner.position = 0.0;
        self.inner.duration_ms = None;
        self.emit(EngineEvent::MediaChanged(media));
    }

    /// Clamps, stores and announces the clamped volume.
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        let volume = clamp_unit(volume);
        self.inner.volume = volume;
        self.emit(EngineEvent::VolumeChanged(volume));
        volume
    }

    /// Clamps and stores the position, announcing it when it changed.
    pub fn set_position(&mut self, position: f64) -> f64 {
        let position = clamp_unit(position);
        if position != self.inner.position {
            self.inner.position = position;
            self.emit(EngineEvent::PositionChanged(position));
        }
        position
    }

    pub fn play(&mut self) -> bool {
        let has_media = self.has_media();
        self.transition(|machine| machine.play(has_media))
    }

    pub fn pause(&mut self) -> bool {
        self.transition(PlaybackStateMachine::pause)
    }

    /// Stops and rewinds to the start of the media.
    pub fn stop(&mut self) -> bool {
        let stopped = self.transition(PlaybackStateMachine::stop);
        if stopped {
            self.set_position(0.0);
        }
        stopped
    }

    /// Natural end of media: `Finished` is emitted before `StateChanged`.
    pub fn finish(&mut self) {
        if let Some(state) = self.inner.machine.finish() {
            self.emit(EngineEvent::Finished);
            self.emit(EngineEvent::StateChanged(state));
        }
    }

    /// Playback error: `Failed` is always emitted, and strictly before the
    /// `StateChanged(Stopped)` it may cause.
    pub fn fail(&mut self, failure: PlaybackFailure) {
        tracing::warn!(%failure, media = ?self.inner.media, "playback failed");
        let next = self.inner.machine.fail();
        self.emit(EngineEvent::Failed(failure));
        if let Some(state) = next {
            self.emit(EngineEvent::StateChanged(state));
        }
    }

    /// Heartbeat while playing.
    pub fn tick(&mut self, elapsed_ms: u64) {
        if self.state() == PlaybackState::Playing {
            self.emit(EngineEvent::Tick(elapsed_ms));
        }
    }

    fn transition(
        &mut self,
        step: impl FnOnce(&mut PlaybackStateMachine) -> Option<PlaybackState>,
    ) -> bool {
        match step(&mut self.inner.machine) {
            Some(state) => {
                self.emit(EngineEvent::StateChanged(state));
                true
            }
            None => false,
        }
    }

    fn emit(&self, event: EngineEvent) {
        self.hub.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Severity;

    fn drain(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn set_media_forces_stopped_then_announces_media() {
        let core = EngineCore::new(());
        let rx = core.subscribe();
        {
            let mut engine = core.lock();
            engine.set_media(MediaReference::new("a.flac"));
            assert!(engine.play());
            engine.set_media(MediaReference::new("b.flac"));
            assert_eq!(engine.state(), PlaybackState::Stopped);
        }

        assert_eq!(
            drain(&rx),
            vec![
                EngineEvent::MediaChanged(MediaReference::new("a.flac")),
                EngineEvent::StateChanged(PlaybackState::Playing),
                EngineEvent::StateChanged(PlaybackState::Stopped),
                EngineEvent::MediaChanged(MediaReference::new("b.flac")),
            ]
        );
    }

    #[test]
    fn volume_notification_carries_clamped_value() {
        let core = EngineCore::new(());
        let rx = core.subscribe();

        for (raw, clamped) in [(1.5, 1.0), (-3.0, 0.0), (0.4, 0.4)] {
            assert_eq!(core.lock().set_volume(raw), clamped);
            assert_eq!(core.lock().volume(), clamped);
            assert_eq!(drain(&rx), vec![EngineEvent::VolumeChanged(clamped)]);
        }
    }

    #[test]
    fn failure_is_announced_before_the_state_change() {
        let core = EngineCore::new(());
        let rx = core.subscribe();
        let failure = PlaybackFailure::new(Severity::Warning, "Playback", "device lost");
        {
            let mut engine = core.lock();
            engine.set_media(MediaReference::new("a.flac"));
            engine.play();
            engine.fail(failure.clone());
        }

        let events = drain(&rx);
        assert_eq!(
            &events[events.len() - 2..],
            &[
                EngineEvent::Failed(failure),
                EngineEvent::StateChanged(PlaybackState::Stopped),
            ]
        );
    }

    #[test]
    fn state_notifications_match_the_transition_table() {
        use PlaybackState::*;

        // 0 = play, 1 = pause, 2 = stop, 3 = load media.
        fn next(state: PlaybackState, op: usize, has_media: bool) -> PlaybackState {
            match (state, op) {
                (Stopped, 0) if has_media => Playing,
                (Paused, 0) => Playing,
                (Playing, 1) => Paused,
                (Playing | Paused, 2) => Stopped,
                (_, 3) => Stopped,
                (state, _) => state,
            }
        }

        for seq in 0..4usize.pow(5) {
            let core = EngineCore::new(());
            let rx = core.subscribe();
            let mut state = Stopped;
            let mut has_media = false;
            let mut wanted = Vec::new();
            let mut n = seq;
            for _ in 0..5 {
                let op = n % 4;
                n /= 4;
                {
                    let mut engine = core.lock();
                    match op {
                        0 => {
                            engine.play();
                        }
                        1 => {
                            engine.pause();
                        }
                        2 => {
                            engine.stop();
                        }
                        _ => engine.set_media(MediaReference::new("a.flac")),
                    }
                }
                let after = next(state, op, has_media);
                if after != state {
                    wanted.push(after);
                }
                state = after;
                has_media |= op == 3;
            }

            let seen: Vec<_> = drain(&rx)
                .into_iter()
                .filter_map(|event| match event {
                    EngineEvent::StateChanged(state) => Some(state),
                    _ => None,
                })
                .collect();
            assert_eq!(seen, wanted, "sequence #{seq}");
            assert_eq!(core.lock().state(), state);
        }
    }

    #[test]
    fn play_without_media_emits_nothing() {
        let core = EngineCore::new(());
        let rx = core.subscribe();
        assert!(!core.lock().play());
        assert!(drain(&rx).is_empty());
    }
}
