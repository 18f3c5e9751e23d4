use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Rgba;
use crate::CoreError;

/// Porter-Duff / separable blend modes used when compositing the waveform
/// layer onto a background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Plus,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    HardLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    pub const ALL: [BlendMode; 10] = [
        BlendMode::SourceOver,
        BlendMode::Plus,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::HardLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::SourceOver => "SourceOver",
            BlendMode::Plus => "Plus",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::HardLight => "HardLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
        }
    }

    /// Composites `src` over `dst`.
    pub fn apply(self, src: Rgba, dst: Rgba) -> Rgba {
        let (sa, da) = (src.alpha_f32(), dst.alpha_f32());
        if sa == 0.0 {
            return dst;
        }
        let out_a = match self {
            BlendMode::Plus => (sa + da).min(1.0),
            _ => sa + da * (1.0 - sa),
        };
        if out_a <= 0.0 {
            return Rgba::TRANSPARENT;
        }

        let channel = |s: u8, d: u8| -> u8 {
            let (cs, cb) = (f32::from(s) / 255.0, f32::from(d) / 255.0);
            let premultiplied = match self {
                BlendMode::SourceOver => sa * cs + da * cb * (1.0 - sa),
                BlendMode::Plus => (sa * cs + da * cb).min(1.0),
                mode => {
                    let mixed = (1.0 - da) * cs + da * mode.separable(cb, cs);
                    sa * mixed + da * cb * (1.0 - sa)
                }
            };
            unit_to_byte(premultiplied / out_a)
        };

        Rgba::new(
            channel(src.r, dst.r),
            channel(src.g, dst.g),
            channel(src.b, dst.b),
            unit_to_byte(out_a),
        )
    }

    /// Separable blend function `B(backdrop, source)` on unit channels.
    fn separable(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::Multiply => cb * cs,
            BlendMode::Screen => cb + cs - cb * cs,
            BlendMode::Overlay => BlendMode::HardLight.separable(cs, cb),
            BlendMode::Darken => cb.min(cs),
            BlendMode::Lighten => cb.max(cs),
            BlendMode::HardLight => {
                if cs <= 0.5 {
                    cb * 2.0 * cs
                } else {
                    BlendMode::Screen.separable(cb, 2.0 * cs - 1.0)
                }
            }
            BlendMode::Difference => (cb - cs).abs(),
            BlendMode::Exclusion => cb + cs - 2.0 * cb * cs,
            BlendMode::SourceOver | BlendMode::Plus => cs,
        }
    }
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = CoreError;

    /// Accepts mode names case-insensitively, ignoring `_`, `-` and spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CoreError::msg(format!("unknown blend mode `{s}`")))
    }
}

impl TryFrom<String> for BlendMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlendMode> for String {
    fn from(mode: BlendMode) -> Self {
        mode.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::new(255, 0, 0, 255);
    const GREY: Rgba = Rgba::new(128, 128, 128, 255);

    #[test]
    fn parses_names_loosely() {
        assert_eq!("overlay".parse::<BlendMode>().unwrap(), BlendMode::Overlay);
        assert_eq!("hard_light".parse::<BlendMode>().unwrap(), BlendMode::HardLight);
        assert_eq!("Source-Over".parse::<BlendMode>().unwrap(), BlendMode::SourceOver);
        assert!("dodge".parse::<BlendMode>().is_err());
    }

    #[test]
    fn serializes_as_names() {
        let json = serde_json::to_string(&BlendMode::Difference).unwrap();
        assert_eq!(json, "\"Difference\"");
        let mode: BlendMode = serde_json::from_str("\"screen\"").unwrap();
        assert_eq!(mode, BlendMode::Screen);
    }

    #[test]
    fn transparent_sources_leave_the_backdrop() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.apply(Rgba::TRANSPARENT, GREY), GREY, "{mode}");
        }
    }

    #[test]
    fn opaque_source_over_replaces() {
        assert_eq!(BlendMode::SourceOver.apply(RED, GREY), RED);
    }

    #[test]
    fn separable_modes_on_opaque_pixels() {
        assert_eq!(BlendMode::Multiply.apply(RED, GREY), Rgba::new(128, 0, 0, 255));
        assert_eq!(BlendMode::Screen.apply(RED, GREY), Rgba::new(255, 128, 128, 255));
        assert_eq!(BlendMode::Darken.apply(RED, GREY), Rgba::new(128, 0, 0, 255));
        assert_eq!(BlendMode::Difference.apply(RED, GREY), Rgba::new(127, 128, 128, 255));
    }

    #[test]
    fn blending_onto_transparent_is_source_over() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.apply(RED, Rgba::TRANSPARENT), RED, "{mode}");
        }
    }
}
