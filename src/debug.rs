use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{
        draw_cross_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
        draw_text_mut, text_size,
    },
    rect::Rect,
};
use rusttype::{Font, Scale};

use crate::{
    geometry::Contour,
    image_utils::{
        monospace_font, BLUE, CYAN, DARK_BLUE, DARK_GREEN, GREEN, PINK, RAINBOW, RED, WHITE_RGB,
    },
    scoring::draw_contour_outline_mut,
    types::{DetectedAnswer, Quadrilateral, QuestionGroup},
};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes images of intermediate pipeline stages next to the input image.
/// A disabled writer does nothing, and never copies the images it is given.
#[derive(Debug, Clone)]
pub struct ImageDebugWriter {
    input_path: Option<PathBuf>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf) -> Self {
        Self {
            input_path: Some(input_path),
        }
    }

    pub fn disabled() -> Self {
        Self { input_path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.input_path.is_some()
    }

    /// Draws on a copy of `base` and saves it under `label`.
    pub fn write(
        &self,
        label: &str,
        base: &RgbImage,
        draw: impl FnOnce(&mut RgbImage),
    ) -> Option<PathBuf> {
        let input_path = self.input_path.as_ref()?;
        let mut canvas = base.clone();
        draw(&mut canvas);

        let path = debug_image_path(input_path, label);
        match canvas.save(&path) {
            Ok(()) => {
                log::debug!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("unable to write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Draws every edge contour, cycling through rainbow colors.
pub fn draw_contours_debug_image_mut(canvas: &mut RgbImage, contours: &[Contour]) {
    for (i, contour) in contours.iter().enumerate() {
        draw_contour_outline_mut(canvas, contour, RAINBOW[i % RAINBOW.len()], 1);
    }
}

/// Draws the located page boundary with each side in its own color and a
/// cross on each corner.
pub fn draw_document_debug_image_mut(canvas: &mut RgbImage, quad: &Quadrilateral) {
    let quad = quad.ordered();
    let sides = [
        (quad.top_left(), quad.top_right(), GREEN),
        (quad.top_right(), quad.bottom_right(), CYAN),
        (quad.bottom_right(), quad.bottom_left(), BLUE),
        (quad.bottom_left(), quad.top_left(), RED),
    ];
    for (start, end, color) in sides {
        draw_line_segment_mut(canvas, (start.x, start.y), (end.x, end.y), color);
    }
    for corner in quad.corners {
        draw_cross_mut(canvas, PINK, corner.x.round() as i32, corner.y.round() as i32);
    }
}

/// Outlines the bounding box of every bubble candidate.
pub fn draw_bubble_candidates_debug_image_mut(canvas: &mut RgbImage, bounds: &[Rect]) {
    for (i, rect) in bounds.iter().enumerate() {
        draw_hollow_rect_mut(canvas, *rect, RAINBOW[i % RAINBOW.len()]);
    }
}

/// Labels each bubble with its fill count and outlines the bubble picked as
/// each question's answer.
pub fn draw_fill_scores_debug_image_mut(canvas: &mut RgbImage, groups: &[QuestionGroup]) {
    let font = &monospace_font();
    let scale = Scale::uniform(14.0);

    for group in groups {
        for (choice, bubble) in group.bubbles.iter().enumerate() {
            let picked = group.answer == DetectedAnswer::Marked(choice);
            draw_hollow_rect_mut(
                canvas,
                bubble.bounds,
                if picked { DARK_GREEN } else { DARK_BLUE },
            );

            let score_text = bubble.fill_count().to_string();
            let (score_text_width, _) = text_size(scale, font, &score_text);
            draw_text_with_background_mut(
                canvas,
                &score_text,
                bubble.bounds.left() + (bubble.bounds.width() as i32 - score_text_width) / 2,
                bubble.bounds.bottom() + 2,
                scale,
                font,
                DARK_GREEN,
                WHITE_RGB,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_text_with_background_mut(
    canvas: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    scale: Scale,
    font: &Font,
    text_color: Rgb<u8>,
    background_color: Rgb<u8>,
) {
    let (text_width, text_height) = text_size(scale, font, text);
    if text_width <= 0 || text_height <= 0 {
        return;
    }

    draw_filled_rect_mut(
        canvas,
        Rect::at(x, y).of_size(text_width as u32, text_height as u32),
        background_color,
    );
    draw_text_mut(canvas, text_color, x, y, scale, font, text);
}

#[cfg(test)]
mod test {
    use super::*;
    use imageproc::point::Point;

    #[test]
    fn test_debug_image_path() {
        assert_eq!(
            debug_image_path(Path::new("/scans/sheet-01.jpg"), "document"),
            PathBuf::from("/scans/sheet-01_debug_document.png")
        );
    }

    #[test]
    fn test_disabled_writer_writes_nothing() {
        let writer = ImageDebugWriter::disabled();
        assert!(!writer.is_enabled());
        let mut drawn = false;
        assert!(writer
            .write("anything", &RgbImage::new(4, 4), |_| drawn = true)
            .is_none());
        assert!(!drawn);
    }

    #[test]
    fn test_enabled_writer_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ImageDebugWriter::new(dir.path().join("scan.jpg"));
        let quad = Quadrilateral::new([
            Point::new(2.0, 2.0),
            Point::new(30.0, 3.0),
            Point::new(29.0, 30.0),
            Point::new(3.0, 28.0),
        ]);
        let path = writer
            .write("document", &RgbImage::new(40, 40), |canvas| {
                draw_document_debug_image_mut(canvas, &quad)
            })
            .unwrap();
        assert_eq!(path, dir.path().join("scan_debug_document.png"));
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (40, 40));
    }
}
