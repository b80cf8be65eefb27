use std::fmt::Display;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use logging_timer::time;
use rayon::prelude::*;

use crate::bubbles::find_bubble_candidates;
use crate::config::GradeOptions;
use crate::debug::{
    draw_bubble_candidates_debug_image_mut, draw_contours_debug_image_mut,
    draw_document_debug_image_mut, draw_fill_scores_debug_image_mut, ImageDebugWriter,
};
use crate::document::locate_document;
use crate::edges::find_edge_contours;
use crate::grouping::detect_answers;
use crate::rectify::rectify;
use crate::scoring::{score, ScoreResult};
use crate::types::{Quadrilateral, Size};

#[derive(Debug)]
pub enum GradeError {
    ImageOpen(PathBuf),
    DocumentNotFound,
    DegenerateDocument(Quadrilateral),
    EmptyBubbleSet,
    MalformedGroup {
        candidates: usize,
        choices_per_question: usize,
    },
    MissingAnswerKeyEntry {
        question: usize,
    },
    InvalidConfig(String),
}

impl Display for GradeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeError::ImageOpen(path) => write!(f, "unable to open image {}", path.display()),
            GradeError::DocumentNotFound => {
                write!(f, "no four-sided sheet boundary found among the largest contours")
            }
            GradeError::DegenerateDocument(quad) => {
                write!(f, "sheet boundary {:?} cannot be rectified", quad.corners)
            }
            GradeError::EmptyBubbleSet => write!(f, "no bubbles found on the sheet"),
            GradeError::MalformedGroup {
                candidates,
                choices_per_question,
            } => write!(
                f,
                "{} bubbles cannot be split into questions of {} choices",
                candidates, choices_per_question
            ),
            GradeError::MissingAnswerKeyEntry { question } => {
                write!(f, "answer key has no usable entry for question {}", question)
            }
            GradeError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for GradeError {}

pub type GradeResult = Result<GradedSheet, GradeError>;

/// A graded sheet: the photo as given, plus the score and annotated
/// rectified sheet.
#[derive(Debug, Clone)]
pub struct GradedSheet {
    pub original: RgbImage,
    pub rectified_size: Size<u32>,
    pub score: ScoreResult,
}

/// Grades a sheet that has already been rectified, i.e. the color and
/// grayscale images show only the sheet, viewed head-on and pixel-aligned.
#[time]
pub fn grade_rectified(
    color: &RgbImage,
    gray: &GrayImage,
    options: &GradeOptions,
    debug: &ImageDebugWriter,
) -> Result<ScoreResult, GradeError> {
    options.validate()?;

    let (binary, candidates) = find_bubble_candidates(gray, &options.bubble_filter);
    debug.write("bubble_candidates", color, |canvas| {
        let bounds = candidates.iter().map(|c| c.bounds).collect::<Vec<_>>();
        draw_bubble_candidates_debug_image_mut(canvas, &bounds)
    });

    let groups = detect_answers(
        candidates,
        &binary,
        options.choices_per_question,
        options.min_fill_ratio,
    )?;
    debug.write("fill_scores", color, |canvas| {
        draw_fill_scores_debug_image_mut(canvas, &groups)
    });

    score(&groups, &options.answer_key, color)
}

/// Runs the whole pipeline on a photo: find the sheet, straighten it, then
/// read and grade its bubbles.
#[time]
pub fn interpret_bubble_sheet(
    image: &DynamicImage,
    options: &GradeOptions,
    debug: &ImageDebugWriter,
) -> GradeResult {
    options.validate()?;

    let original = image.to_rgb8();
    let gray = image.to_luma8();

    let contours = find_edge_contours(&gray);
    debug.write("edge_contours", &original, |canvas| {
        draw_contours_debug_image_mut(canvas, &contours)
    });

    let quad = locate_document(&contours, &options.locator)?;
    debug.write("document", &original, |canvas| {
        draw_document_debug_image_mut(canvas, &quad)
    });

    let (rectified_color, rectified_gray, transform) = rectify(&quad, &original, &gray)?;
    let score = grade_rectified(&rectified_color, &rectified_gray, options, debug)?;
    log::info!(
        "graded sheet: {}/{} correct ({:.2}%)",
        score.correct,
        score.total,
        score.percentage
    );

    Ok(GradedSheet {
        original,
        rectified_size: transform.size,
        score,
    })
}

/// Loads an image from disk and grades it.
#[time]
pub fn grade_image_path(image_path: &Path, options: &GradeOptions, debug: bool) -> GradeResult {
    let image = match image::open(image_path) {
        Ok(image) => image,
        Err(e) => {
            log::debug!("unable to decode {}: {}", image_path.display(), e);
            return Err(GradeError::ImageOpen(image_path.to_path_buf()));
        }
    };

    let debug = if debug {
        ImageDebugWriter::new(image_path.to_path_buf())
    } else {
        ImageDebugWriter::disabled()
    };

    interpret_bubble_sheet(&image, options, &debug)
}

/// Grades many images in parallel. A failure only affects its own entry;
/// results come back in input order.
pub fn grade_batch(
    image_paths: &[PathBuf],
    options: &GradeOptions,
    debug: bool,
) -> Vec<(PathBuf, GradeResult)> {
    image_paths
        .par_iter()
        .map(|path| {
            let result = grade_image_path(path, options, debug);
            if let Err(e) = &result {
                log::warn!("{}: {}", path.display(), e);
            }
            (path.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::AnswerKey;
    use crate::types::DetectedAnswer;
    use image::{Luma, Rgb};
    use imageproc::{
        drawing::draw_filled_circle_mut,
        geometric_transformations::{warp_into, Interpolation, Projection},
    };

    const KEY: [usize; 5] = [1, 4, 0, 3, 1];

    /// Draws a rectified sheet with a grid of ring-shaped bubbles and one
    /// solid bubble per row at `marked[row]`.
    fn rectified_sheet(marked: &[usize], choices: usize) -> (RgbImage, GrayImage) {
        let width = 80 + choices as u32 * 60;
        let height = 120 + marked.len() as u32 * 60;
        let mut gray = GrayImage::from_pixel(width, height, Luma([250]));
        for (row, &mark) in marked.iter().enumerate() {
            for choice in 0..choices {
                let center = (70 + choice as i32 * 60, 100 + row as i32 * 60);
                draw_filled_circle_mut(&mut gray, center, 15, Luma([15]));
                if choice != mark {
                    draw_filled_circle_mut(&mut gray, center, 12, Luma([250]));
                }
            }
        }
        let color = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
        (color, gray)
    }

    #[test]
    fn test_all_correct_sheet_scores_100() {
        let (color, gray) = rectified_sheet(&KEY, 5);
        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        let result =
            grade_rectified(&color, &gray, &options, &ImageDebugWriter::disabled()).unwrap();

        assert_eq!(result.correct, 5);
        assert_eq!(result.total, 5);
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.annotated.dimensions(), color.dimensions());
    }

    #[test]
    fn test_one_wrong_answer_scores_80() {
        let mut marked = KEY;
        marked[2] = 3;
        let (color, gray) = rectified_sheet(&marked, 5);
        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        let result =
            grade_rectified(&color, &gray, &options, &ImageDebugWriter::disabled()).unwrap();

        assert_eq!(result.correct, 4);
        assert_eq!(result.total, 5);
        assert_eq!(result.percentage, 80.0);
        assert_eq!(result.questions[2].detected, DetectedAnswer::Marked(3));
        assert!(!result.questions[2].correct);
    }

    #[test]
    fn test_choice_count_is_configurable() {
        let marked = [2, 0, 3];
        let (color, gray) = rectified_sheet(&marked, 4);
        let mut options = GradeOptions::new(AnswerKey::from_choices(&marked));
        options.choices_per_question = 4;
        let result =
            grade_rectified(&color, &gray, &options, &ImageDebugWriter::disabled()).unwrap();
        assert_eq!((result.correct, result.total), (3, 3));

        options.choices_per_question = 5;
        assert!(matches!(
            grade_rectified(&color, &gray, &options, &ImageDebugWriter::disabled()),
            Err(GradeError::MalformedGroup {
                candidates: 12,
                choices_per_question: 5
            })
        ));
    }

    /// Places a sheet into a darker photo so that its corners land on
    /// `corners`, in top-left, top-right, bottom-right, bottom-left order.
    fn photograph(sheet: &GrayImage, corners: [(f32, f32); 4], size: (u32, u32)) -> RgbImage {
        let (w, h) = (sheet.width() as f32 - 1.0, sheet.height() as f32 - 1.0);
        let projection =
            Projection::from_control_points([(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)], corners)
                .unwrap();
        let mut photo = GrayImage::new(size.0, size.1);
        warp_into(
            sheet,
            &projection,
            Interpolation::Bilinear,
            Luma([30]),
            &mut photo,
        );
        DynamicImage::ImageLuma8(photo).to_rgb8()
    }

    #[test]
    fn test_skewed_photo_grades_every_row() {
        let (_, sheet) = rectified_sheet(&KEY, 5);
        let photo = photograph(
            &sheet,
            [(70.0, 50.0), (440.0, 80.0), (420.0, 500.0), (50.0, 480.0)],
            (500, 540),
        );
        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));

        let graded = interpret_bubble_sheet(
            &DynamicImage::ImageRgb8(photo),
            &options,
            &ImageDebugWriter::disabled(),
        )
        .unwrap();
        assert_eq!(graded.score.questions.len(), 5);
        assert_eq!((graded.score.correct, graded.score.total), (5, 5));
        assert_eq!(graded.score.percentage, 100.0);
    }

    #[test]
    fn test_blank_rectified_sheet_has_no_bubbles() {
        let gray = GrayImage::from_pixel(200, 200, Luma([250]));
        let color = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        assert!(matches!(
            grade_rectified(&color, &gray, &options, &ImageDebugWriter::disabled()),
            Err(GradeError::EmptyBubbleSet)
        ));
    }

    #[test]
    fn test_photo_without_sheet_is_document_not_found() {
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 90, Rgb([90, 90, 90])));
        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        assert!(matches!(
            interpret_bubble_sheet(&photo, &options, &ImageDebugWriter::disabled()),
            Err(GradeError::DocumentNotFound)
        ));
    }

    #[test]
    fn test_invalid_options_are_rejected_before_grading() {
        let photo = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let mut options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        options.choices_per_question = 0;
        assert!(matches!(
            interpret_bubble_sheet(&photo, &options, &ImageDebugWriter::disabled()),
            Err(GradeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let blank = dir.path().join("blank.png");
        RgbImage::from_pixel(60, 60, Rgb([200, 200, 200]))
            .save(&blank)
            .unwrap();
        let missing = dir.path().join("missing.png");

        let options = GradeOptions::new(AnswerKey::from_choices(&KEY));
        let results = grade_batch(
            &[broken.clone(), blank.clone(), missing.clone()],
            &options,
            false,
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, broken);
        assert!(matches!(results[0].1, Err(GradeError::ImageOpen(_))));
        assert!(matches!(results[1].1, Err(GradeError::DocumentNotFound)));
        assert!(matches!(results[2].1, Err(GradeError::ImageOpen(_))));
    }
}
