use std::io::Cursor;

use super::{ExportArtifact, PNG_FILE_NAME, PNG_MIME};
use crate::error::PipelineError;
use crate::frame::PixelBuffer;

/// Encode the snapshot as an RGBA8 PNG at native resolution
pub fn export_raster(buffer: &PixelBuffer) -> Result<ExportArtifact, PipelineError> {
    let bytes = encode_png(buffer)?;
    log::info!(
        "Raster export: {}x{}, {} bytes",
        buffer.width(),
        buffer.height(),
        bytes.len()
    );
    Ok(ExportArtifact {
        bytes,
        mime_type: PNG_MIME,
        file_name: PNG_FILE_NAME,
    })
}

fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, buffer.width(), buffer.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
        writer
            .write_image_data(buffer.data())
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
    }
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let mut reader = decoder.read_info().unwrap();
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data).unwrap();
        data.truncate(info.buffer_size());
        (info, data)
    }

    #[test]
    fn test_png_signature_and_metadata() {
        let buffer = PixelBuffer::filled(3, 2, [0, 0, 0, 255]);
        let artifact = export_raster(&buffer).unwrap();

        assert_eq!(&artifact.bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(artifact.mime_type, "image/png");
        assert_eq!(artifact.file_name, "dithered-image.png");
    }

    #[test]
    fn test_pixels_pass_through_unchanged() {
        let mut buffer = PixelBuffer::filled(4, 3, [255, 255, 255, 255]);
        buffer.set_pixel(1, 2, [12, 34, 56, 255]);
        buffer.set_pixel(3, 0, [0, 0, 0, 0]);

        let artifact = export_raster(&buffer).unwrap();
        let (info, data) = decode(&artifact.bytes);

        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!(info.color_type, png::ColorType::Rgba);
        assert_eq!(data, buffer.data());
    }
}
