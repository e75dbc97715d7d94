use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const THRESHOLD_RANGE: (f32, f32) = (0.0, 1.0);
pub const CONTRAST_RANGE: (f32, f32) = (0.5, 2.0);
pub const MIDTONES_RANGE: (f32, f32) = (0.0, 1.0);
pub const HIGHLIGHTS_RANGE: (f32, f32) = (0.5, 1.5);
pub const SCALE_RANGE: (f32, f32) = (0.5, 8.0);

/// Dithering algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Bayer,
    #[serde(rename = "random")]
    RandomNoise,
    BlueNoise,
    Halftone,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Bayer,
        Algorithm::RandomNoise,
        Algorithm::BlueNoise,
        Algorithm::Halftone,
    ];

    /// Stable key used for shader file names and the command line
    pub fn key(self) -> &'static str {
        match self {
            Algorithm::Bayer => "bayer",
            Algorithm::RandomNoise => "random",
            Algorithm::BlueNoise => "blue-noise",
            Algorithm::Halftone => "halftone",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Algorithm::Bayer => 0,
            Algorithm::RandomNoise => 1,
            Algorithm::BlueNoise => 2,
            Algorithm::Halftone => 3,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown algorithm '{}' (expected one of: bayer, random, blue-noise, halftone)",
                    s
                )
            })
    }
}

/// User-facing dithering controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DitherParameters {
    pub algorithm: Algorithm,
    pub threshold: f32,
    pub contrast: f32,
    pub midtones: f32,
    pub highlights: f32,
    pub scale: f32,
    pub background_color: String,
    pub foreground_color: String,
}

impl Default for DitherParameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Bayer,
            threshold: 0.5,
            contrast: 1.0,
            midtones: 0.5,
            highlights: 1.0,
            scale: 1.0,
            background_color: "#000000".to_string(),
            foreground_color: "#ffffff".to_string(),
        }
    }
}

impl DitherParameters {
    /// Copy with every numeric field inside its documented range
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            algorithm: self.algorithm,
            threshold: clamp_or(self.threshold, THRESHOLD_RANGE, defaults.threshold),
            contrast: clamp_or(self.contrast, CONTRAST_RANGE, defaults.contrast),
            midtones: clamp_or(self.midtones, MIDTONES_RANGE, defaults.midtones),
            highlights: clamp_or(self.highlights, HIGHLIGHTS_RANGE, defaults.highlights),
            scale: clamp_or(self.scale, SCALE_RANGE, defaults.scale),
            background_color: self.background_color.clone(),
            foreground_color: self.foreground_color.clone(),
        }
    }

    /// Load a (possibly partial) preset from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(text).map_err(|e| PipelineError::Preset(e.to_string()))
    }

    /// Apply one update in place, clamping numeric values
    pub fn apply(&mut self, update: &UniformUpdate) {
        match update {
            UniformUpdate::Threshold(v) => {
                self.threshold = clamp_or(*v, THRESHOLD_RANGE, self.threshold)
            }
            UniformUpdate::Contrast(v) => self.contrast = clamp_or(*v, CONTRAST_RANGE, self.contrast),
            UniformUpdate::Midtones(v) => self.midtones = clamp_or(*v, MIDTONES_RANGE, self.midtones),
            UniformUpdate::Highlights(v) => {
                self.highlights = clamp_or(*v, HIGHLIGHTS_RANGE, self.highlights)
            }
            UniformUpdate::Scale(v) => self.scale = clamp_or(*v, SCALE_RANGE, self.scale),
            UniformUpdate::BackgroundColor(hex) => self.background_color = hex.clone(),
            UniformUpdate::ForegroundColor(hex) => self.foreground_color = hex.clone(),
        }
    }
}

/// A single cheap uniform change; never touches the texture or the program
#[derive(Debug, Clone, PartialEq)]
pub enum UniformUpdate {
    Threshold(f32),
    Contrast(f32),
    Midtones(f32),
    Highlights(f32),
    Scale(f32),
    BackgroundColor(String),
    ForegroundColor(String),
}

/// NaN keeps `fallback`; everything else is clamped into `range`
fn clamp_or(value: f32, range: (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(range.0, range.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let params = DitherParameters::default();
        assert_eq!(params.clamped(), params);
    }

    #[test]
    fn test_clamped_limits_every_field() {
        let params = DitherParameters {
            threshold: 1.7,
            contrast: 0.1,
            midtones: -3.0,
            highlights: 9.0,
            scale: 100.0,
            ..Default::default()
        }
        .clamped();

        assert_eq!(params.threshold, 1.0);
        assert_eq!(params.contrast, 0.5);
        assert_eq!(params.midtones, 0.0);
        assert_eq!(params.highlights, 1.5);
        assert_eq!(params.scale, 8.0);
    }

    #[test]
    fn test_nan_falls_back_to_default() {
        let params = DitherParameters {
            threshold: f32::NAN,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.threshold, 0.5);
    }

    #[test]
    fn test_apply_clamps_and_keeps_previous_on_nan() {
        let mut params = DitherParameters::default();
        params.apply(&UniformUpdate::Threshold(0.25));
        assert_eq!(params.threshold, 0.25);

        params.apply(&UniformUpdate::Threshold(f32::NAN));
        assert_eq!(params.threshold, 0.25);

        params.apply(&UniformUpdate::Scale(0.0));
        assert_eq!(params.scale, 0.5);

        params.apply(&UniformUpdate::BackgroundColor("#123456".into()));
        assert_eq!(params.background_color, "#123456");
    }

    #[test]
    fn test_algorithm_keys_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.key().parse::<Algorithm>(), Ok(algorithm));
        }
        assert!("floyd".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_partial_json_preset() {
        let params =
            DitherParameters::from_json(r#"{"algorithm":"blue-noise","threshold":0.3}"#).unwrap();
        assert_eq!(params.algorithm, Algorithm::BlueNoise);
        assert_eq!(params.threshold, 0.3);
        assert_eq!(params.foreground_color, "#ffffff");
    }

    #[test]
    fn test_random_serializes_with_short_key() {
        let json = serde_json::to_string(&Algorithm::RandomNoise).unwrap();
        assert_eq!(json, "\"random\"");
    }
}
