//! Asynchronous decoding of media files into amplitude envelopes.

mod builder;
mod peaks;

use std::path::Path;

pub use self::builder::SymphoniaWaveformBuilder;
pub use self::peaks::{PeakAccumulator, PeakEnvelope, PeakPair, PeakWriter};

/// Interface string a waveform backend must report to be bound.
pub const WAVEFORM_BUILDER_INTERFACE: &str = "Wavedeck/WaveformBuilder/0.7";

/// Lifecycle of the most recent build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BuildStatus {
    #[default]
    Idle,
    Building,
    Complete,
    /// Decoding stopped early; the envelope keeps its committed prefix.
    Failed(String),
}

impl BuildStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_))
    }
}

/// Capability that turns a media file into a [`PeakEnvelope`] in the
/// background.
pub trait WaveformBuilder: Send + Sync {
    /// Starts decoding `path` into a fresh envelope and returns immediately.
    /// Any build in progress is superseded.
    fn start(&self, path: &Path);

    /// Non-blocking snapshot of the current build: the decoded fraction of
    /// the file and the number of committed peak pairs.
    fn position_and_index(&self) -> (f32, usize);

    /// Read handle on the current envelope.
    fn peaks(&self) -> PeakEnvelope;

    fn status(&self) -> BuildStatus;
}
