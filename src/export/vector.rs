use std::fmt::Write as _;

use glam::Vec3;

use super::{ExportArtifact, SVG_FILE_NAME, SVG_MIME};
use crate::frame::PixelBuffer;
use crate::math::{parse_hex_color, to_hex, to_rgb8};

/// Above this edge length the exporter switches to the coarse grid
pub const MAX_DETAIL_DIMENSION: u32 = 300;
/// Upper bound on foreground rectangles in one document
pub const MAX_RECTS: usize = 10_000;
/// Per-channel difference that still counts as background (detailed path)
pub const DETAIL_TOLERANCE: u8 = 15;
/// Per-channel difference that still counts as background (coarse path)
pub const COARSE_TOLERANCE: u8 = 30;

/// Axis-aligned rectangle in source pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Single-scanline run (`height == 1`)
pub type RectRun = Rect;
/// Vertical stack of congruent runs
pub type MergedRect = Rect;

/// How the foreground rectangles were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStrategy {
    /// Runs merged vertically
    Detailed,
    /// Too many runs: every `stride`-th run, unmerged
    Subsampled { stride: usize },
    /// Large image: one rectangle per `factor`-sized foreground cell
    Coarse { factor: u32, stride: usize },
}

/// Foreground rectangles plus the strategy that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorPlan {
    pub strategy: VectorStrategy,
    pub rects: Vec<Rect>,
}

/// Per-pixel foreground flags, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl ForegroundMask {
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&[bool]]) -> Self {
        let width = rows.first().map_or(0, |row| row.len()) as u32;
        let bits: Vec<bool> = rows.iter().flat_map(|row| row.iter().copied()).collect();
        assert_eq!(bits.len(), width as usize * rows.len(), "ragged rows");
        Self {
            width,
            height: rows.len() as u32,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.bits[start..start + self.width as usize]
    }
}

/// A pixel is foreground iff any RGB channel differs from the background by
/// more than `tolerance`; alpha is ignored
pub fn is_foreground(pixel: [u8; 4], background: [u8; 3], tolerance: u8) -> bool {
    pixel[..3]
        .iter()
        .zip(background.iter())
        .any(|(&p, &b)| p.abs_diff(b) > tolerance)
}

/// Classify every pixel of `buffer` against `background`
pub fn classify(buffer: &PixelBuffer, background: Vec3, tolerance: u8) -> ForegroundMask {
    let background = to_rgb8(background);
    let bits = buffer
        .data()
        .chunks_exact(4)
        .map(|px| is_foreground([px[0], px[1], px[2], px[3]], background, tolerance))
        .collect();
    ForegroundMask {
        width: buffer.width(),
        height: buffer.height(),
        bits,
    }
}

/// Maximal foreground runs of one scanline, left to right
pub fn row_runs(row: &[bool], y: u32) -> Vec<RectRun> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (x, &foreground) in row.iter().enumerate() {
        match (foreground, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                runs.push(run(s, x, y));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(run(s, row.len(), y));
    }
    runs
}

fn run(start: usize, end: usize, y: u32) -> RectRun {
    Rect {
        x: start as u32,
        y,
        width: (end - start) as u32,
        height: 1,
    }
}

/// Runs grouped by row; `result[y]` is sorted by `x`
pub fn extract_runs(mask: &ForegroundMask) -> Vec<Vec<RectRun>> {
    (0..mask.height()).map(|y| row_runs(mask.row(y), y)).collect()
}

/// Greedy vertical merge of runs with identical `x` and `width`
///
/// Rows are visited top to bottom and runs left to right; each run is
/// consumed exactly once, so output order is deterministic.
pub fn merge_runs(rows: &[Vec<RectRun>]) -> Vec<MergedRect> {
    let mut processed: Vec<Vec<bool>> = rows.iter().map(|r| vec![false; r.len()]).collect();
    let mut merged = Vec::new();

    for y in 0..rows.len() {
        for i in 0..rows[y].len() {
            if processed[y][i] {
                continue;
            }
            processed[y][i] = true;
            let start = rows[y][i];
            let mut height = start.height;

            let mut next = y + 1;
            while next < rows.len() {
                let below = &rows[next];
                let matched = below
                    .binary_search_by_key(&start.x, |r| r.x)
                    .ok()
                    .filter(|&j| !processed[next][j] && below[j].width == start.width);
                let Some(j) = matched else {
                    break;
                };
                processed[next][j] = true;
                height += below[j].height;
                next += 1;
            }

            merged.push(Rect { height, ..start });
        }
    }
    merged
}

/// Keep every `stride`-th rectangle so at most `max` remain
pub fn subsample(rects: Vec<Rect>, max: usize) -> (Vec<Rect>, usize) {
    if rects.len() <= max {
        return (rects, 1);
    }
    let stride = rects.len().div_ceil(max.max(1));
    let sampled = rects.into_iter().step_by(stride).collect();
    (sampled, stride)
}

/// Cell edge used by the coarse path, 1 when the image is small enough
pub fn coarse_factor(width: u32, height: u32) -> u32 {
    width.max(height).div_ceil(MAX_DETAIL_DIMENSION).max(1)
}

/// One rectangle per foreground cell, classified by the cell's center pixel
///
/// Only whole cells are emitted; a strip narrower than `factor` along the
/// right or bottom edge stays background.
pub fn coarse_rects(buffer: &PixelBuffer, background: Vec3, factor: u32) -> Vec<Rect> {
    let factor = factor.max(1);
    let background = to_rgb8(background);
    let (columns, rows) = (buffer.width() / factor, buffer.height() / factor);
    let mut rects = Vec::new();

    for row in 0..rows {
        for column in 0..columns {
            let (x, y) = (column * factor, row * factor);
            let center = buffer.pixel(x + factor / 2, y + factor / 2);
            if is_foreground(center, background, COARSE_TOLERANCE) {
                rects.push(Rect {
                    x,
                    y,
                    width: factor,
                    height: factor,
                });
            }
        }
    }
    rects
}

/// Choose a strategy for `buffer` and produce its foreground rectangles
pub fn plan(buffer: &PixelBuffer, background: Vec3) -> VectorPlan {
    let (width, height) = (buffer.width(), buffer.height());

    if width.max(height) > MAX_DETAIL_DIMENSION {
        let factor = coarse_factor(width, height);
        let (rects, stride) = subsample(coarse_rects(buffer, background, factor), MAX_RECTS);
        return VectorPlan {
            strategy: VectorStrategy::Coarse { factor, stride },
            rects,
        };
    }

    let mask = classify(buffer, background, DETAIL_TOLERANCE);
    let rows = extract_runs(&mask);
    let run_count: usize = rows.iter().map(Vec::len).sum();

    if run_count > MAX_RECTS {
        let runs: Vec<Rect> = rows.into_iter().flatten().collect();
        let (rects, stride) = subsample(runs, MAX_RECTS);
        log::warn!(
            "{} runs exceed the {} rectangle budget, keeping every {}th",
            run_count,
            MAX_RECTS,
            stride
        );
        return VectorPlan {
            strategy: VectorStrategy::Subsampled { stride },
            rects,
        };
    }

    VectorPlan {
        strategy: VectorStrategy::Detailed,
        rects: merge_runs(&rows),
    }
}

/// Serialize a background fill plus foreground rectangles
pub fn render_svg(width: u32, height: u32, rects: &[Rect], background: &str, foreground: &str) -> String {
    let mut svg = String::with_capacity(128 + rects.len() * 64);
    let _ = write!(
        svg,
        r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg"><rect x="0" y="0" width="{w}" height="{h}" fill="{bg}"/>"#,
        w = width,
        h = height,
        bg = background
    );
    for rect in rects {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            rect.x, rect.y, rect.width, rect.height, foreground
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Vectorize the snapshot into an SVG of merged rectangles
///
/// Colors are written in normalized `#rrggbb` form, so malformed input
/// degrades the same way it does for the shader uniforms.
pub fn export_vector(buffer: &PixelBuffer, background: &str, foreground: &str) -> ExportArtifact {
    let background = parse_hex_color(background);
    let foreground = parse_hex_color(foreground);

    let plan = plan(buffer, background);
    log::info!(
        "Vector export: {}x{}, {} rectangles ({:?})",
        buffer.width(),
        buffer.height(),
        plan.rects.len(),
        plan.strategy
    );

    let svg = render_svg(
        buffer.width(),
        buffer.height(),
        &plan.rects,
        &to_hex(background),
        &to_hex(foreground),
    );
    ExportArtifact {
        bytes: svg.into_bytes(),
        mime_type: SVG_MIME,
        file_name: SVG_FILE_NAME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_background_is_never_foreground() {
        for tolerance in [0, 1, DETAIL_TOLERANCE, COARSE_TOLERANCE, 255] {
            assert!(!is_foreground([10, 200, 30, 255], [10, 200, 30], tolerance));
        }
    }

    #[test]
    fn test_tolerance_is_strict() {
        assert!(!is_foreground([15, 0, 0, 255], [0, 0, 0], 15));
        assert!(is_foreground([16, 0, 0, 255], [0, 0, 0], 15));
        assert!(is_foreground([0, 0, 200, 255], [0, 0, 255], 30));
    }

    #[test]
    fn test_alpha_is_ignored() {
        assert!(!is_foreground([0, 0, 0, 0], [0, 0, 0], 15));
    }

    #[test]
    fn test_row_runs_reference_row() {
        let row = [false, true, true, true, false, true, false];
        let runs = row_runs(&row, 7);
        assert_eq!(
            runs,
            vec![
                Rect { x: 1, y: 7, width: 3, height: 1 },
                Rect { x: 5, y: 7, width: 1, height: 1 },
            ]
        );
    }

    #[test]
    fn test_row_runs_touching_edges() {
        let runs = row_runs(&[true, true, false, true], 0);
        assert_eq!(runs[0], Rect { x: 0, y: 0, width: 2, height: 1 });
        assert_eq!(runs[1], Rect { x: 3, y: 0, width: 1, height: 1 });
        assert!(row_runs(&[false; 5], 0).is_empty());
        assert_eq!(row_runs(&[true; 5], 0).len(), 1);
    }

    #[test]
    fn test_merge_requires_same_x_and_width() {
        let rows = vec![
            vec![Rect { x: 2, y: 0, width: 3, height: 1 }],
            vec![Rect { x: 2, y: 1, width: 3, height: 1 }],
            vec![Rect { x: 1, y: 2, width: 3, height: 1 }],
        ];
        let merged = merge_runs(&rows);
        assert_eq!(
            merged,
            vec![
                Rect { x: 2, y: 0, width: 3, height: 2 },
                Rect { x: 1, y: 2, width: 3, height: 1 },
            ]
        );
    }

    #[test]
    fn test_merge_stops_at_gap_row() {
        let rows = vec![
            vec![Rect { x: 0, y: 0, width: 1, height: 1 }],
            vec![],
            vec![Rect { x: 0, y: 2, width: 1, height: 1 }],
        ];
        assert_eq!(merge_runs(&rows).len(), 2);
    }

    #[test]
    fn test_merge_handles_multiple_columns() {
        let mask = ForegroundMask::from_rows(&[
            &[true, false, true, true],
            &[true, false, true, true],
            &[true, false, false, true],
        ]);
        let merged = merge_runs(&extract_runs(&mask));
        assert_eq!(
            merged,
            vec![
                Rect { x: 0, y: 0, width: 1, height: 3 },
                Rect { x: 2, y: 0, width: 2, height: 2 },
                Rect { x: 3, y: 2, width: 1, height: 1 },
            ]
        );
    }

    #[test]
    fn test_subsample_bounds_count() {
        let rects: Vec<Rect> = (0..25)
            .map(|i| Rect { x: i, y: 0, width: 1, height: 1 })
            .collect();
        let (sampled, stride) = subsample(rects, 10);
        assert_eq!(stride, 3);
        assert_eq!(sampled.len(), 9);
        assert_eq!(sampled[1].x, 3);

        let few = vec![Rect { x: 0, y: 0, width: 1, height: 1 }];
        assert_eq!(subsample(few, 10).1, 1);
    }

    #[test]
    fn test_coarse_factor() {
        assert_eq!(coarse_factor(300, 200), 1);
        assert_eq!(coarse_factor(301, 10), 2);
        assert_eq!(coarse_factor(1000, 667), 4);
    }

    #[test]
    fn test_coarse_rects_samples_cell_centers() {
        // Column 4 is an edge strip; (0,2) is inside a cell but off its center
        let mut buffer = PixelBuffer::filled(5, 4, [0, 0, 0, 255]);
        buffer.set_pixel(1, 1, [255, 255, 255, 255]);
        buffer.set_pixel(0, 2, [255, 255, 255, 255]);
        buffer.set_pixel(4, 0, [255, 255, 255, 255]);

        let rects = coarse_rects(&buffer, Vec3::ZERO, 2);
        assert_eq!(rects, vec![Rect { x: 0, y: 0, width: 2, height: 2 }]);
    }

    #[test]
    fn test_render_svg_shape() {
        let svg = render_svg(
            4,
            2,
            &[Rect { x: 1, y: 0, width: 2, height: 2 }],
            "#000000",
            "#ffffff",
        );
        assert_eq!(
            svg,
            concat!(
                r#"<svg width="4" height="2" xmlns="http://www.w3.org/2000/svg">"#,
                r##"<rect x="0" y="0" width="4" height="2" fill="#000000"/>"##,
                r##"<rect x="1" y="0" width="2" height="2" fill="#ffffff"/>"##,
                "</svg>"
            )
        );
    }
}
