//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// Inclusive HSV band in OpenCV 8-bit convention (H 0..180, S/V 0..255).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    /// Whether an HSV triple falls inside the band.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

/// Colour class of the synchronization LED seen by a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedColor {
    #[serde(rename = "Y", alias = "yellow", alias = "Yellow")]
    Yellow,
    #[serde(rename = "G", alias = "green", alias = "Green")]
    Green,
}

impl LedColor {
    /// HSV band whose pixels count towards the brightness score.
    pub fn band(&self) -> HsvBand {
        match self {
            LedColor::Yellow => HsvBand {
                lower: [20, 100, 100],
                upper: [30, 255, 255],
            },
            LedColor::Green => HsvBand {
                lower: [36, 100, 100],
                upper: [77, 255, 255],
            },
        }
    }

    /// RGB colour used to outline the ROI in diagnostic output.
    pub fn outline_rgb(&self) -> [u8; 3] {
        match self {
            LedColor::Yellow => [214, 177, 150],
            LedColor::Green => [0, 255, 0],
        }
    }

    /// CSS colour for diagnostic plots.
    pub fn plot_color(&self) -> &'static str {
        match self {
            LedColor::Yellow => "#d6b196",
            LedColor::Green => "green",
        }
    }
}

impl std::fmt::Display for LedColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedColor::Yellow => write!(f, "yellow"),
            LedColor::Green => write!(f, "green"),
        }
    }
}

/// What a synchronization unit contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Recorded trial: the LED flash is searched in every camera.
    #[default]
    Trial,
    /// Calibration clip: no LED in view, starts come from audio only.
    Calibration,
}

/// Invocation profile for the external transcoder.
///
/// Both profiles trim the same frame range; only the encoder differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscodeProfile {
    /// libx264 with a fixed quality factor.
    #[default]
    Software,
    /// CUDA upload/scale and NVENC encode.
    Hardware,
}

impl TranscodeProfile {
    /// Get the display name for this profile.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Software => "software (libx264)",
            Self::Hardware => "hardware (h264_nvenc)",
        }
    }
}

impl std::str::FromStr for TranscodeProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "software" | "sw" | "cpu" => Ok(Self::Software),
            "hardware" | "hw" | "gpu" | "nvenc" => Ok(Self::Hardware),
            other => Err(format!("unknown transcode profile '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_colors_deserialize_from_short_codes() {
        #[derive(Deserialize)]
        struct Wrapper {
            led: LedColor,
        }
        let y: Wrapper = toml::from_str("led = \"Y\"").unwrap();
        let g: Wrapper = toml::from_str("led = \"green\"").unwrap();
        assert_eq!(y.led, LedColor::Yellow);
        assert_eq!(g.led, LedColor::Green);
    }

    #[test]
    fn bands_do_not_overlap() {
        let yellow = LedColor::Yellow.band();
        let green = LedColor::Green.band();
        assert!(yellow.upper[0] < green.lower[0]);
        assert!(yellow.contains([25, 200, 200]));
        assert!(!green.contains([25, 200, 200]));
        assert!(!yellow.contains([25, 99, 200]));
    }

    #[test]
    fn profile_parses_aliases() {
        assert_eq!("gpu".parse::<TranscodeProfile>(), Ok(TranscodeProfile::Hardware));
        assert_eq!("Software".parse::<TranscodeProfile>(), Ok(TranscodeProfile::Software));
        assert!("quantum".parse::<TranscodeProfile>().is_err());
    }
}
