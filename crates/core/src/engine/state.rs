use super::PlaybackState;

/// Transition table shared by all playback backends.
///
/// Every operation returns the new state when a transition took place and
/// `None` when the request is illegal or leaves the state unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStateMachine {
    state: PlaybackState,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Stopped -> Playing requires media; Paused -> Playing always resumes.
    pub fn play(&mut self, has_media: bool) -> Option<PlaybackState> {
        match self.state {
            PlaybackState::Stopped if has_media => self.enter(PlaybackState::Playing),
            PlaybackState::Paused => self.enter(PlaybackState::Playing),
            _ => None,
        }
    }

    pub fn pause(&mut self) -> Option<PlaybackState> {
        match self.state {
            PlaybackState::Playing => self.enter(PlaybackState::Paused),
            _ => None,
        }
    }

    pub fn stop(&mut self) -> Option<PlaybackState> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => self.enter(PlaybackState::Stopped),
            PlaybackState::Stopped => None,
        }
    }

    /// A new media reference forces Stopped from any state.
    pub fn media_changed(&mut self) -> Option<PlaybackState> {
        self.stop()
    }

    pub fn finish(&mut self) -> Option<PlaybackState> {
        self.leave_playing()
    }

    pub fn fail(&mut self) -> Option<PlaybackState> {
        self.leave_playing()
    }

    fn leave_playing(&mut self) -> Option<PlaybackState> {
        match self.state {
            PlaybackState::Playing => self.enter(PlaybackState::Stopped),
            _ => None,
        }
    }

    fn enter(&mut self, next: PlaybackState) -> Option<PlaybackState> {
        self.state = next;
        Some(next)
    }
}
