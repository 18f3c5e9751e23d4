use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CodecParameters;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::MediaReference;
use crate::{CoreError, Result};

/// Stream properties a backend needs before it can start a session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaInfo {
    pub duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
}

/// Resolves a media reference into [`MediaInfo`].
pub trait MediaProbe: Send + Sync {
    fn probe(&self, media: &MediaReference) -> Result<MediaInfo>;
}

/// Probes local files through symphonia's container readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl MediaProbe for SymphoniaProbe {
    fn probe(&self, media: &MediaReference) -> Result<MediaInfo> {
        let path = media.as_path();
        let format = open_format(path)?;
        let track = format
            .default_track()
            .ok_or_else(|| CoreError::decode(path, "missing default audio track"))?;
        let params = &track.codec_params;

        Ok(MediaInfo {
            duration_ms: duration_ms(params),
            sample_rate: params.sample_rate,
            channels: params.channels.map(|channels| channels.count()),
        })
    }
}

/// Opens `path` and probes its container format, using the file extension as
/// a hint.
pub(crate) fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|err| CoreError::decode(path, err))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| CoreError::decode(path, format!("probe failed: {err}")))?;
    Ok(probed.format)
}

fn duration_ms(params: &CodecParameters) -> Option<u64> {
    let frames = params.n_frames?;
    match (params.time_base, params.sample_rate) {
        (Some(tb), _) => {
            let time = tb.calc_time(frames);
            Some((time.seconds as f64 * 1000.0 + time.frac * 1000.0).round() as u64)
        }
        (None, Some(rate)) if rate > 0 => Some(frames * 1000 / u64::from(rate)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn probes_wav_duration() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("half.wav");
        write_wav(&path, 8_000, 4_000);

        let info = SymphoniaProbe
            .probe(&MediaReference::from(path.as_path()))
            .unwrap();
        assert_eq!(info.duration_ms, Some(500));
        assert_eq!(info.sample_rate, Some(8_000));
        assert_eq!(info.channels, Some(1));
    }

    #[test]
    fn reports_missing_files_as_decode_errors() {
        let err = SymphoniaProbe
            .probe(&MediaReference::new("/definitely/not/here.ogg"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Decode { .. }));
    }
}
