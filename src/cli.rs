// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::params::{Algorithm, DitherParameters};

#[derive(Parser, Debug, Clone)]
#[command(name = "gpu-dither")]
#[command(about = "GPU image dithering with PNG and SVG export", long_about = None)]
pub struct Cli {
    /// Source image (PNG, JPEG, GIF, BMP or WebP)
    pub input: PathBuf,

    /// bayer, random, blue-noise or halftone
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    #[arg(long)]
    pub threshold: Option<f32>,

    #[arg(long)]
    pub contrast: Option<f32>,

    #[arg(long)]
    pub midtones: Option<f32>,

    #[arg(long)]
    pub highlights: Option<f32>,

    /// Pattern scale (halftone cell size multiplier)
    #[arg(long)]
    pub scale: Option<f32>,

    /// Background color as #rrggbb
    #[arg(long)]
    pub background: Option<String>,

    /// Foreground color as #rrggbb
    #[arg(long)]
    pub foreground: Option<String>,

    /// JSON preset; explicit flags win over its values
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Directory with replacement WGSL shaders
    #[arg(long, value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Write the raster export here
    #[arg(long, value_name = "OUT")]
    pub png: Option<PathBuf>,

    /// Write the vector export here
    #[arg(long, value_name = "OUT")]
    pub svg: Option<PathBuf>,

    /// Open an interactive preview window
    #[arg(long, default_value = "false")]
    pub preview: bool,
}

impl Cli {
    /// Overlay explicit flags on `base`
    pub fn apply_overrides(&self, base: DitherParameters) -> DitherParameters {
        let mut params = base;
        if let Some(algorithm) = self.algorithm {
            params.algorithm = algorithm;
        }
        if let Some(v) = self.threshold {
            params.threshold = v;
        }
        if let Some(v) = self.contrast {
            params.contrast = v;
        }
        if let Some(v) = self.midtones {
            params.midtones = v;
        }
        if let Some(v) = self.highlights {
            params.highlights = v;
        }
        if let Some(v) = self.scale {
            params.scale = v;
        }
        if let Some(color) = &self.background {
            params.background_color = color.clone();
        }
        if let Some(color) = &self.foreground {
            params.foreground_color = color.clone();
        }
        params
    }

    /// True when nothing but the default PNG output was requested
    pub fn wants_default_output(&self) -> bool {
        self.png.is_none() && self.svg.is_none() && !self.preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["gpu-dither", "photo.jpg"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("photo.jpg"));
        assert!(cli.algorithm.is_none());
        assert!(cli.wants_default_output());
    }

    #[test]
    fn test_flags_override_preset() {
        let cli = Cli::try_parse_from([
            "gpu-dither",
            "in.png",
            "--algorithm",
            "blue-noise",
            "--threshold",
            "0.3",
            "--foreground",
            "#ff0000",
            "--svg",
            "out.svg",
        ])
        .unwrap();

        let preset = DitherParameters {
            contrast: 1.5,
            threshold: 0.9,
            ..Default::default()
        };
        let params = cli.apply_overrides(preset);
        assert_eq!(params.algorithm, Algorithm::BlueNoise);
        assert_eq!(params.threshold, 0.3);
        assert_eq!(params.contrast, 1.5);
        assert_eq!(params.foreground_color, "#ff0000");
        assert!(!cli.wants_default_output());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(Cli::try_parse_from(["gpu-dither", "in.png", "--algorithm", "floyd"]).is_err());
    }
}
