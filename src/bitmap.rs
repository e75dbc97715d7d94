use crate::error::PipelineError;

/// Decoded RGBA8 bitmap owned by the caller
///
/// The pipeline only reads it to build a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(PipelineError::InvalidBuffer {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an encoded image file (PNG, JPEG, ...) from memory
    pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(width, height, decoded.into_raw())
    }

    /// Horizontal gradient from black to white, handy for previews and tests
    pub fn gradient(width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _y in 0..height {
            for x in 0..width {
                let v = if width > 1 {
                    (x as f32 / (width - 1) as f32 * 255.0).round() as u8
                } else {
                    0
                };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
