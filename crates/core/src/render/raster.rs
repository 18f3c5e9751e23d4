use super::{Bitmap, BlendMode, Rgba};
use crate::waveform::{PeakEnvelope, PeakPair};

/// Rasterizes the first `count` committed peak pairs into a transparent
/// layer of `width` x `height`.
///
/// The envelope spans `build_fraction` of the width so a partial build grows
/// from the left edge. A one-pixel margin is kept on every side. Each column
/// is filled between its peak extremes with `fill` and capped with `border`.
pub fn rasterize_envelope(
    peaks: &PeakEnvelope,
    count: usize,
    build_fraction: f32,
    width: u32,
    height: u32,
    fill: Rgba,
    border: Rgba,
) -> Bitmap {
    let mut layer = Bitmap::new(width, height);
    let fraction = f64::from(build_fraction.clamp(0.0, 1.0));
    if width < 2 || height < 3 || fraction <= 0.0 {
        return layer;
    }

    peaks.read(|pairs| {
        let pairs = &pairs[..count.min(pairs.len())];
        if pairs.is_empty() {
            return;
        }
        let x_scale = f64::from(width - 1) / pairs.len() as f64 * fraction;
        let y_scale = f64::from(height - 2) / 2.0;
        let to_row = |amplitude: f32| 1.0 + (1.0 - f64::from(amplitude)) * y_scale;

        for x in 1..width {
            let Some(pair) = column_extremes(pairs, f64::from(x - 1), x_scale) else {
                continue;
            };
            let top = to_row(pair.positive).round().max(0.0) as u32;
            let bottom = to_row(pair.negative).round().max(0.0) as u32;
            let (top, bottom) = (top.min(bottom), top.max(bottom).min(height - 1));
            for y in top..=bottom {
                let colour = if y == top || y == bottom { border } else { fill };
                layer.blend_pixel(x, y, colour, BlendMode::SourceOver);
            }
        }
    });
    layer
}

/// Peak extremes covered by the column starting `offset` pixels after the
/// envelope origin, or `None` past its end.
fn column_extremes(pairs: &[PeakPair], offset: f64, x_scale: f64) -> Option<PeakPair> {
    let last = (pairs.len() - 1) as f64;
    let start = offset / x_scale;
    if start > last {
        return None;
    }

    if x_scale >= 1.0 {
        let index = start.floor() as usize;
        let next = (index + 1).min(pairs.len() - 1);
        let t = (start - index as f64) as f32;
        let (a, b) = (pairs[index], pairs[next]);
        return Some(PeakPair::new(
            a.positive + (b.positive - a.positive) * t,
            a.negative + (b.negative - a.negative) * t,
        ));
    }

    let first = start.floor() as usize;
    let end = (((offset + 1.0) / x_scale).ceil() as usize).clamp(first + 1, pairs.len());
    pairs[first..end]
        .iter()
        .copied()
        .reduce(|acc, pair| {
            PeakPair::new(
                acc.positive.max(pair.positive),
                acc.negative.min(pair.negative),
            )
        })
}
