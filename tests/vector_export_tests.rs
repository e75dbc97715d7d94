use gpu_dither::export::vector::{
    coarse_factor, plan, Rect, VectorStrategy, MAX_DETAIL_DIMENSION, MAX_RECTS,
};
use gpu_dither::export::{export_vector, SVG_FILE_NAME, SVG_MIME};
use gpu_dither::math::parse_hex_color;
use gpu_dither::PixelBuffer;

const BLACK: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn svg_text(buffer: &PixelBuffer, bg: &str, fg: &str) -> String {
    String::from_utf8(export_vector(buffer, bg, fg).bytes).unwrap()
}

fn rect_count(svg: &str) -> usize {
    svg.matches("<rect ").count()
}

fn checkerboard(width: u32, height: u32) -> PixelBuffer {
    let mut buffer = PixelBuffer::filled(width, height, BLACK);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                buffer.set_pixel(x, y, WHITE);
            }
        }
    }
    buffer
}

#[cfg(test)]
mod vector_export_tests {
    use super::*;

    #[test]
    fn test_empty_foreground_exports_only_background() {
        let buffer = PixelBuffer::filled(40, 30, [0x12, 0x34, 0x56, 255]);
        let svg = svg_text(&buffer, "#123456", "#ffffff");

        assert_eq!(rect_count(&svg), 1);
        assert_eq!(
            svg,
            r##"<svg width="40" height="30" xmlns="http://www.w3.org/2000/svg"><rect x="0" y="0" width="40" height="30" fill="#123456"/></svg>"##
        );
    }

    #[test]
    fn test_empty_foreground_large_image() {
        let buffer = PixelBuffer::filled(800, 500, BLACK);
        assert_eq!(rect_count(&svg_text(&buffer, "#000000", "#ffffff")), 1);
    }

    #[test]
    fn test_artifact_metadata() {
        let artifact = export_vector(&PixelBuffer::filled(2, 2, BLACK), "#000000", "#ffffff");
        assert_eq!(artifact.mime_type, SVG_MIME);
        assert_eq!(artifact.file_name, SVG_FILE_NAME);
    }

    #[test]
    fn test_background_rect_comes_first() {
        let mut buffer = PixelBuffer::filled(10, 10, BLACK);
        buffer.set_pixel(3, 4, WHITE);
        let svg = svg_text(&buffer, "#000000", "#FFFFFF");

        let first = svg.find("<rect ").unwrap();
        assert!(svg[first..].starts_with(
            r##"<rect x="0" y="0" width="10" height="10" fill="#000000"/>"##
        ));
        assert!(svg.contains(r##"<rect x="3" y="4" width="1" height="1" fill="#ffffff"/>"##));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_merge_across_rows_in_document() {
        // Two identical runs at rows 0 and 1, a shifted run at row 2
        let mut buffer = PixelBuffer::filled(8, 3, BLACK);
        for x in 2..5 {
            buffer.set_pixel(x, 0, WHITE);
            buffer.set_pixel(x, 1, WHITE);
        }
        for x in 3..6 {
            buffer.set_pixel(x, 2, WHITE);
        }

        let plan = plan(&buffer, parse_hex_color("#000000"));
        assert_eq!(plan.strategy, VectorStrategy::Detailed);
        assert_eq!(
            plan.rects,
            vec![
                Rect { x: 2, y: 0, width: 3, height: 2 },
                Rect { x: 3, y: 2, width: 3, height: 1 },
            ]
        );
    }

    #[test]
    fn test_tolerance_absorbs_near_background_noise() {
        let mut buffer = PixelBuffer::filled(6, 6, [100, 100, 100, 255]);
        buffer.set_pixel(1, 1, [110, 95, 115, 255]);
        buffer.set_pixel(2, 2, [116, 100, 100, 255]);

        let plan = plan(&buffer, parse_hex_color("#646464"));
        assert_eq!(plan.rects, vec![Rect { x: 2, y: 2, width: 1, height: 1 }]);
    }

    #[test]
    fn test_export_is_byte_identical_across_runs() {
        let buffer = checkerboard(97, 61);
        let first = export_vector(&buffer, "#000000", "#ffffff");
        let second = export_vector(&buffer, "#000000", "#ffffff");
        assert_eq!(first.bytes, second.bytes);

        let large = checkerboard(640, 480);
        assert_eq!(
            export_vector(&large, "#000000", "#ffffff").bytes,
            export_vector(&large, "#000000", "#ffffff").bytes
        );
    }

    #[test]
    fn test_too_many_runs_are_subsampled() {
        // 150 single-pixel runs per row -> 45_000 runs
        let buffer = checkerboard(MAX_DETAIL_DIMENSION, MAX_DETAIL_DIMENSION);
        let plan = plan(&buffer, parse_hex_color("#000000"));

        assert_eq!(plan.strategy, VectorStrategy::Subsampled { stride: 5 });
        assert_eq!(plan.rects.len(), 9_000);
        assert!(plan.rects.iter().all(|r| r.height == 1 && r.width == 1));
    }

    #[test]
    fn test_rect_count_never_exceeds_max() {
        for (w, h) in [(300, 300), (301, 301), (600, 600), (1000, 1000), (1000, 40)] {
            let svg = svg_text(&checkerboard(w, h), "#000000", "#ffffff");
            assert!(rect_count(&svg) - 1 <= MAX_RECTS, "{}x{}", w, h);

            let full = PixelBuffer::filled(w, h, WHITE);
            let svg = svg_text(&full, "#000000", "#ffffff");
            assert!(rect_count(&svg) - 1 <= MAX_RECTS, "{}x{} solid", w, h);
        }
    }

    #[test]
    fn test_coarse_bound_for_large_images() {
        for (w, h) in [(301, 10), (301, 301), (599, 200), (1000, 667), (450, 1000)] {
            let factor = coarse_factor(w, h);
            let bound = ((w / factor) * (h / factor)) as usize;

            let plan = plan(&PixelBuffer::filled(w, h, WHITE), parse_hex_color("#000000"));
            assert!(matches!(plan.strategy, VectorStrategy::Coarse { .. }));
            assert!(plan.rects.len() <= bound, "{}x{}: {} > {}", w, h, plan.rects.len(), bound);
            assert!(plan.rects.len() <= MAX_RECTS);
        }
    }

    #[test]
    fn test_coarse_cells_cover_foreground_block() {
        // Right half foreground; factor 2 for a 400-wide image
        let mut buffer = PixelBuffer::filled(400, 20, BLACK);
        for y in 0..20 {
            for x in 200..400 {
                buffer.set_pixel(x, y, WHITE);
            }
        }
        let plan = plan(&buffer, parse_hex_color("#000000"));
        assert_eq!(plan.strategy, VectorStrategy::Coarse { factor: 2, stride: 1 });
        assert_eq!(plan.rects.len(), 100 * 10);
        assert!(plan.rects.iter().all(|r| r.x >= 200 && r.width == 2 && r.height == 2));
    }

    #[test]
    fn test_malformed_colors_degrade() {
        let buffer = PixelBuffer::filled(3, 3, BLACK);
        let svg = svg_text(&buffer, "#zz\"<>", "not a color");
        assert!(svg.contains(r##"fill="#000000""##));
        assert!(!svg.contains("zz"));
        assert_eq!(rect_count(&svg), 1);
    }
}
