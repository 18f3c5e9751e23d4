use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;

use super::{BuildStatus, PeakAccumulator, PeakEnvelope, PeakWriter, WaveformBuilder};
use crate::config::WaveformConfig;
use crate::engine::open_format;
use crate::{CoreError, Result};

/// Waveform backend decoding files with symphonia on a background thread.
///
/// Every [`WaveformBuilder::start`] allocates a fresh envelope and cancels the
/// previous build, so snapshots never mix peaks from two files.
pub struct SymphoniaWaveformBuilder {
    config: WaveformConfig,
    current: Mutex<BuildSlot>,
}

struct BuildSlot {
    envelope: PeakEnvelope,
    progress: Arc<BuildProgress>,
}

#[derive(Debug, Default)]
struct BuildProgress {
    fraction_bits: AtomicU32,
    cancelled: AtomicBool,
    status: Mutex<BuildStatus>,
}

impl BuildProgress {
    fn building() -> Self {
        Self {
            status: Mutex::new(BuildStatus::Building),
            ..Default::default()
        }
    }

    fn fraction(&self) -> f32 {
        f32::from_bits(self.fraction_bits.load(Ordering::Acquire))
    }

    fn set_fraction(&self, fraction: f32) {
        self.fraction_bits
            .store(fraction.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn status(&self) -> BuildStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_status(&self, status: BuildStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }
}

impl SymphoniaWaveformBuilder {
    pub fn new(config: WaveformConfig) -> Self {
        Self {
            config,
            current: Mutex::new(BuildSlot {
                envelope: PeakEnvelope::empty(),
                progress: Arc::new(BuildProgress::default()),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, BuildSlot> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WaveformBuilder for SymphoniaWaveformBuilder {
    fn start(&self, path: &Path) {
        let (writer, envelope) = PeakWriter::new();
        let progress = Arc::new(BuildProgress::building());
        {
            let mut slot = self.slot();
            slot.progress.cancel();
            *slot = BuildSlot {
                envelope,
                progress: Arc::clone(&progress),
            };
        }

        let job = BuildJob {
            path: path.to_path_buf(),
            config: self.config.clone(),
            progress: Arc::clone(&progress),
        };
        let spawned = thread::Builder::new()
            .name("waveform-builder".to_string())
            .spawn(move || job.run(writer));
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "could not spawn waveform build");
            progress.set_status(BuildStatus::Failed(err.to_string()));
        }
    }

    fn position_and_index(&self) -> (f32, usize) {
        let slot = self.slot();
        // Count first: the matching fraction was stored before it.
        let index = slot.envelope.committed();
        (slot.progress.fraction(), index)
    }

    fn peaks(&self) -> PeakEnvelope {
        self.slot().envelope.clone()
    }

    fn status(&self) -> BuildStatus {
        self.slot().progress.status()
    }
}

impl std::fmt::Debug for SymphoniaWaveformBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot();
        f.debug_struct("SymphoniaWaveformBuilder")
            .field("config", &self.config)
            .field("envelope", &slot.envelope)
            .field("progress", &slot.progress)
            .finish()
    }
}

struct BuildJob {
    path: PathBuf,
    config: WaveformConfig,
    progress: Arc<BuildProgress>,
}

impl BuildJob {
    fn run(self, writer: PeakWriter) {
        match self.decode(writer) {
            Ok(true) => {
                self.progress.set_status(BuildStatus::Complete);
                tracing::info!(path = %self.path.display(), "waveform build complete");
            }
            Ok(false) => {
                tracing::debug!(path = %self.path.display(), "waveform build superseded");
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "waveform build failed");
                self.progress.set_status(BuildStatus::Failed(err.to_string()));
            }
        }
    }

    /// Decodes the whole file into `writer`. Returns `Ok(false)` when a newer
    /// build cancelled this one.
    fn decode(&self, mut writer: PeakWriter) -> Result<bool> {
        let path = self.path.as_path();
        let mut format = open_format(path)?;
        let track = format
            .default_track()
            .ok_or_else(|| CoreError::decode(path, "missing default audio track"))?;
        let track_id = track.id;
        let params = track.codec_params.clone();
        let total_frames = params.n_frames.filter(|&frames| frames > 0);
        let frames_per_peak = self.config.frames_per_peak(total_frames);

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|err| CoreError::decode(path, format!("decoder init failed: {err}")))?;

        let mut accumulator: Option<PeakAccumulator> = None;
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut batch = Vec::new();
        let mut decoded_frames: u64 = 0;

        loop {
            if self.progress.is_cancelled() {
                return Ok(false);
            }

            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(err) => return Err(CoreError::decode(path, err)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!(reason, "skipping undecodable packet");
                    continue;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(err) => return Err(CoreError::decode(path, err)),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = SignalSpec::new(decoded.spec().rate, decoded.spec().channels);
            let channels = spec.channels.count();
            let needed = decoded.capacity() * channels;
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            decoded_frames += decoded.frames() as u64;
            buf.copy_interleaved_ref(decoded);

            accumulator
                .get_or_insert_with(|| PeakAccumulator::new(frames_per_peak, channels))
                .process_block(buf.samples(), &mut batch);

            // The fraction goes out before the count so a reader that sees
            // the new count also sees the matching fraction.
            let fraction = match total_frames {
                Some(total) => decoded_frames as f32 / total as f32,
                None => 1.0,
            };
            self.progress.set_fraction(fraction);
            writer.append(&batch);
            batch.clear();
        }

        self.progress.set_fraction(1.0);
        if let Some(tail) = accumulator.as_mut().and_then(PeakAccumulator::flush) {
            writer.push(tail);
        }
        writer.finish();
        Ok(true)
    }
}
