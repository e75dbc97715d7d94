use glam::Vec3;

use super::display_context::DisplayContext;
use crate::math::{is_hex_color, parse_hex_color};
use crate::params::{DitherParameters, UniformUpdate};
use crate::types::DitherUniforms;

/// CPU-side copy of the shader uniforms
///
/// Each field has its own setter so a slider tweak only touches one value;
/// [`Uniforms::to_gpu`] packs the current state for `queue.write_buffer`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniforms {
    background: Vec3,
    foreground: Vec3,
    threshold: f32,
    contrast: f32,
    midtones: f32,
    highlights: f32,
    scale: f32,
    resolution: [f32; 2],
}

impl Uniforms {
    pub fn from_params(params: &DitherParameters, target: DisplayContext) -> Self {
        let params = params.clamped();
        Self {
            background: color_uniform(&params.background_color),
            foreground: color_uniform(&params.foreground_color),
            threshold: params.threshold,
            contrast: params.contrast,
            midtones: params.midtones,
            highlights: params.highlights,
            scale: params.scale,
            resolution: [target.width as f32, target.height as f32],
        }
    }

    /// Apply an already-clamped value from `params` for the field `update` names
    pub fn apply(&mut self, update: &UniformUpdate, params: &DitherParameters) {
        match update {
            UniformUpdate::Threshold(_) => self.set_threshold(params.threshold),
            UniformUpdate::Contrast(_) => self.set_contrast(params.contrast),
            UniformUpdate::Midtones(_) => self.set_midtones(params.midtones),
            UniformUpdate::Highlights(_) => self.set_highlights(params.highlights),
            UniformUpdate::Scale(_) => self.set_scale(params.scale),
            UniformUpdate::BackgroundColor(hex) => self.set_background(hex),
            UniformUpdate::ForegroundColor(hex) => self.set_foreground(hex),
        }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn set_contrast(&mut self, contrast: f32) {
        self.contrast = contrast;
    }

    pub fn set_midtones(&mut self, midtones: f32) {
        self.midtones = midtones;
    }

    pub fn set_highlights(&mut self, highlights: f32) {
        self.highlights = highlights;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn set_background(&mut self, hex: &str) {
        self.background = color_uniform(hex);
    }

    pub fn set_foreground(&mut self, hex: &str) {
        self.foreground = color_uniform(hex);
    }

    pub fn set_resolution(&mut self, target: DisplayContext) {
        self.resolution = [target.width as f32, target.height as f32];
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn background(&self) -> Vec3 {
        self.background
    }

    pub fn foreground(&self) -> Vec3 {
        self.foreground
    }

    pub fn to_gpu(&self) -> DitherUniforms {
        DitherUniforms {
            background: self.background.extend(1.0).to_array(),
            foreground: self.foreground.extend(1.0).to_array(),
            threshold: self.threshold,
            contrast: self.contrast,
            midtones: self.midtones,
            highlights: self.highlights,
            scale: self.scale,
            _pad: 0.0,
            resolution: self.resolution,
        }
    }
}

fn color_uniform(hex: &str) -> Vec3 {
    if !is_hex_color(hex) {
        log::warn!("Malformed color '{}', missing channels default to 0", hex);
    }
    parse_hex_color(hex)
}
