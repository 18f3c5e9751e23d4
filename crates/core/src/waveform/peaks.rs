use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Amplitude extremes of one slice of audio, in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakPair {
    pub positive: f32,
    pub negative: f32,
}

impl PeakPair {
    pub fn new(positive: f32, negative: f32) -> Self {
        Self { positive, negative }
    }
}

#[derive(Default)]
struct EnvelopeShared {
    pairs: RwLock<Vec<PeakPair>>,
    committed: AtomicUsize,
    complete: AtomicBool,
}

/// Read handle over an append-only peak buffer.
///
/// Only the committed prefix is ever visible: entries are published by
/// [`PeakWriter`] after they are fully written.
#[derive(Clone, Default)]
pub struct PeakEnvelope {
    shared: Arc<EnvelopeShared>,
}

impl PeakEnvelope {
    /// Creates an empty, already complete envelope.
    pub fn empty() -> Self {
        let envelope = Self::default();
        envelope.shared.complete.store(true, Ordering::Release);
        envelope
    }

    /// Number of committed peak pairs.
    pub fn committed(&self) -> usize {
        self.shared.committed.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.committed() == 0
    }

    /// True once the writer has finished; the envelope never changes again.
    pub fn is_complete(&self) -> bool {
        self.shared.complete.load(Ordering::Acquire)
    }

    /// Runs `f` over the committed prefix.
    pub fn read<R>(&self, f: impl FnOnce(&[PeakPair]) -> R) -> R {
        let pairs = self
            .shared
            .pairs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let committed = self.committed().min(pairs.len());
        f(&pairs[..committed])
    }

    pub fn get(&self, index: usize) -> Option<PeakPair> {
        self.read(|pairs| pairs.get(index).copied())
    }

    pub fn positive(&self, index: usize) -> Option<f32> {
        self.get(index).map(|pair| pair.positive)
    }

    pub fn negative(&self, index: usize) -> Option<f32> {
        self.get(index).map(|pair| pair.negative)
    }

    pub fn to_vec(&self) -> Vec<PeakPair> {
        self.read(<[PeakPair]>::to_vec)
    }

    /// True when both handles point at the same underlying buffer.
    pub fn same_envelope(&self, other: &PeakEnvelope) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for PeakEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeakEnvelope")
            .field("committed", &self.committed())
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Sole writer of a [`PeakEnvelope`].
///
/// The envelope is complete once the writer is gone, whether it was
/// finished or dropped part way; the committed prefix is then final.
pub struct PeakWriter {
    shared: Arc<EnvelopeShared>,
}

impl PeakWriter {
    pub fn new() -> (Self, PeakEnvelope) {
        let shared = Arc::new(EnvelopeShared::default());
        let envelope = PeakEnvelope {
            shared: Arc::clone(&shared),
        };
        (Self { shared }, envelope)
    }

    pub fn append(&mut self, batch: &[PeakPair]) {
        if batch.is_empty() {
            return;
        }
        let mut pairs = self
            .shared
            .pairs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pairs.extend_from_slice(batch);
        // Publish only after the entries are in place.
        self.shared.committed.store(pairs.len(), Ordering::Release);
    }

    pub fn push(&mut self, pair: PeakPair) {
        self.append(&[pair]);
    }

    pub fn committed(&self) -> usize {
        self.shared.committed.load(Ordering::Acquire)
    }

    /// Marks the envelope complete.
    pub fn finish(self) {}
}

impl Drop for PeakWriter {
    fn drop(&mut self) {
        self.shared.complete.store(true, Ordering::Release);
    }
}

impl fmt::Debug for PeakWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeakWriter")
            .field("committed", &self.committed())
            .finish()
    }
}

/// Folds interleaved samples into peak pairs of `frames_per_peak` frames,
/// taking the extremes across all channels.
#[derive(Debug, Clone)]
pub struct PeakAccumulator {
    frames_per_peak: usize,
    channels: usize,
    frames: usize,
    current: PeakPair,
}

impl PeakAccumulator {
    pub fn new(frames_per_peak: usize, channels: usize) -> Self {
        Self {
            frames_per_peak: frames_per_peak.max(1),
            channels: channels.max(1),
            frames: 0,
            current: PeakPair::default(),
        }
    }

    pub fn frames_per_peak(&self) -> usize {
        self.frames_per_peak
    }

    /// Consumes a block of interleaved samples, appending every completed
    /// pair to `out`.
    pub fn process_block(&mut self, samples: &[f32], out: &mut Vec<PeakPair>) {
        for frame in samples.chunks(self.channels) {
            for &sample in frame {
                let sample = sample.clamp(-1.0, 1.0);
                self.current.positive = self.current.positive.max(sample);
                self.current.negative = self.current.negative.min(sample);
            }
            self.frames += 1;
            if self.frames == self.frames_per_peak {
                out.push(self.take());
            }
        }
    }

    /// Emits the trailing partial slice, if any.
    pub fn flush(&mut self) -> Option<PeakPair> {
        (self.frames > 0).then(|| self.take())
    }

    fn take(&mut self) -> PeakPair {
        self.frames = 0;
        std::mem::take(&mut self.current)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn accumulates_extremes_across_channels() {
        let mut acc = PeakAccumulator::new(2, 2);
        let mut out = Vec::new();
        acc.process_block(&[0.1, -0.2, 0.5, 0.0, -0.9, 0.3], &mut out);

        assert_eq!(out, vec![PeakPair::new(0.5, -0.2)]);
        assert_eq!(acc.flush(), Some(PeakPair::new(0.3, -0.9)));
        assert_eq!(acc.flush(), None);
    }

    #[test]
    fn clamps_out_of_range_samples() {
        let mut acc = PeakAccumulator::new(1, 1);
        let mut out = Vec::new();
        acc.process_block(&[4.0, -7.5], &mut out);
        assert_eq!(out, vec![PeakPair::new(1.0, 0.0), PeakPair::new(0.0, -1.0)]);
    }

    #[test]
    fn exposes_only_the_committed_prefix() {
        let (mut writer, envelope) = PeakWriter::new();
        assert!(envelope.is_empty());
        writer.append(&[PeakPair::new(0.5, -0.5), PeakPair::new(0.25, -0.25)]);

        assert_eq!(envelope.committed(), 2);
        assert_eq!(envelope.positive(1), Some(0.25));
        assert_eq!(envelope.negative(2), None);
        assert!(!envelope.is_complete());

        writer.finish();
        assert!(envelope.is_complete());
    }

    #[test]
    fn abandoned_writers_settle_the_prefix() {
        let (mut writer, envelope) = PeakWriter::new();
        writer.append(&[PeakPair::new(0.5, -0.5), PeakPair::new(0.25, -0.25)]);
        assert!(!envelope.is_complete());

        drop(writer);
        assert!(envelope.is_complete());
        assert_eq!(envelope.committed(), 2);
    }

    #[test]
    fn reader_never_sees_past_the_commit_under_contention() {
        let (mut writer, envelope) = PeakWriter::new();
        let reader = envelope.clone();

        let producer = thread::spawn(move || {
            for i in 0..20_000 {
                let amplitude = (i % 100) as f32 / 100.0;
                writer.push(PeakPair::new(amplitude, -amplitude));
            }
            writer.finish();
        });

        let mut last = 0;
        while !reader.is_complete() {
            let index = reader.committed();
            assert!(index >= last, "committed count went backwards");
            let visible = reader.read(|pairs| pairs.len());
            assert!(index <= visible, "index {index} exceeds visible {visible}");
            last = index;
        }
        producer.join().unwrap();
        assert_eq!(reader.committed(), 20_000);
    }
}
