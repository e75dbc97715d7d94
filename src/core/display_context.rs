/// Widest render target the preview will allocate
pub const MAX_WIDTH: u32 = 1000;

/// Display context - render target dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayContext {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplayContext {
    /// Create new display context
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Target size for an image: width capped at [`MAX_WIDTH`], aspect ratio kept
    pub fn fit(image_width: u32, image_height: u32) -> Self {
        if image_width <= MAX_WIDTH {
            return Self::new(image_width.max(1), image_height.max(1));
        }

        let aspect_ratio = image_width as f64 / image_height.max(1) as f64;
        let height = (MAX_WIDTH as f64 / aspect_ratio).round() as u32;
        Self::new(MAX_WIDTH, height.max(1))
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total size in bytes for RGBA buffer
    pub fn buffer_size(&self) -> usize {
        self.pixel_count() * 4
    }

    /// Unpadded RGBA row length
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }

    /// Row length rounded up to the texture-to-buffer copy alignment
    pub fn padded_bytes_per_row(&self) -> u32 {
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        self.bytes_per_row().div_ceil(align) * align
    }

    /// Staging buffer size for a padded readback
    pub fn padded_buffer_size(&self) -> u64 {
        self.padded_bytes_per_row() as u64 * self.height as u64
    }

    /// Drop the per-row padding of a readback
    pub fn strip_padding(&self, padded: &[u8]) -> Vec<u8> {
        let row = self.bytes_per_row() as usize;
        let padded_row = self.padded_bytes_per_row() as usize;
        if row == padded_row {
            return padded[..self.buffer_size()].to_vec();
        }

        let mut pixels = Vec::with_capacity(self.buffer_size());
        for chunk in padded.chunks(padded_row).take(self.height as usize) {
            pixels.extend_from_slice(&chunk[..row]);
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_context_with_dimensions() {
        let ctx = DisplayContext::new(1920, 1080);
        assert_eq!(ctx.width, 1920);
        assert_eq!(ctx.height, 1080);
    }

    #[test]
    fn test_fit_keeps_small_images() {
        assert_eq!(DisplayContext::fit(640, 480), DisplayContext::new(640, 480));
        assert_eq!(DisplayContext::fit(1000, 10), DisplayContext::new(1000, 10));
    }

    #[test]
    fn test_fit_caps_width_and_keeps_aspect() {
        assert_eq!(DisplayContext::fit(2000, 1000), DisplayContext::new(1000, 500));
        // 3000 / 1999 = 1.50075..., 1000 / 1.50075 = 666.33
        assert_eq!(DisplayContext::fit(3000, 1999), DisplayContext::new(1000, 666));
    }

    #[test]
    fn test_fit_never_yields_zero_height() {
        assert_eq!(DisplayContext::fit(100_000, 1).height, 1);
        assert_eq!(DisplayContext::fit(0, 0), DisplayContext::new(1, 1));
    }

    #[test]
    fn test_buffer_size_rgba() {
        let ctx = DisplayContext::new(100, 100);
        assert_eq!(ctx.buffer_size(), 40000);
    }

    #[test]
    fn test_padded_rows_are_aligned() {
        let ctx = DisplayContext::new(3, 2);
        assert_eq!(ctx.bytes_per_row(), 12);
        assert_eq!(ctx.padded_bytes_per_row(), 256);
        assert_eq!(ctx.padded_buffer_size(), 512);

        let aligned = DisplayContext::new(64, 2);
        assert_eq!(aligned.padded_bytes_per_row(), 256);
    }

    #[test]
    fn test_strip_padding() {
        let ctx = DisplayContext::new(2, 2);
        let mut padded = vec![0u8; ctx.padded_buffer_size() as usize];
        padded[0..8].copy_from_slice(&[1, 1, 1, 1, 2, 2, 2, 2]);
        padded[256..264].copy_from_slice(&[3, 3, 3, 3, 4, 4, 4, 4]);

        let pixels = ctx.strip_padding(&padded);
        assert_eq!(
            pixels,
            vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4]
        );
    }
}
