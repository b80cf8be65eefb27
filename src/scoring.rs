use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use logging_timer::time;
use rusttype::Scale;
use serde::Serialize;

use crate::{
    config::AnswerKey,
    geometry::Contour,
    image_utils::{monospace_font, GREEN, RED},
    interpret::GradeError,
    types::{DetectedAnswer, QuestionGroup},
};

pub const OUTLINE_THICKNESS: i32 = 3;
const SCORE_TEXT_SCALE: f32 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question: usize,
    pub expected: usize,
    pub detected: DetectedAnswer,
    pub correct: bool,
}

/// The result of grading one sheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub correct: usize,
    /// Number of questions in the answer key.
    pub total: usize,
    pub percentage: f64,
    pub questions: Vec<QuestionOutcome>,
    /// The rectified sheet with each correct choice outlined and the score
    /// written in the corner.
    #[serde(skip)]
    pub annotated: RgbImage,
}

/// Grades detected answers against the key. Every question's correct choice
/// is outlined on a copy of `rectified`, green when the detected answer
/// matches and red otherwise.
#[time]
pub fn score(
    groups: &[QuestionGroup],
    answer_key: &AnswerKey,
    rectified: &RgbImage,
) -> Result<ScoreResult, GradeError> {
    let (correct, questions, mut annotated) = groups.iter().enumerate().try_fold(
        (0, Vec::with_capacity(groups.len()), rectified.clone()),
        |(correct, mut questions, mut canvas), (question, group)| {
            let expected = answer_key
                .get(question)
                .filter(|&choice| choice < group.bubbles.len())
                .ok_or(GradeError::MissingAnswerKeyEntry { question })?;
            let is_correct = group.answer == DetectedAnswer::Marked(expected);

            draw_contour_outline_mut(
                &mut canvas,
                &group.bubbles[expected].contour,
                if is_correct { GREEN } else { RED },
                OUTLINE_THICKNESS,
            );
            questions.push(QuestionOutcome {
                question,
                expected,
                detected: group.answer,
                correct: is_correct,
            });
            Ok((correct + usize::from(is_correct), questions, canvas))
        },
    )?;

    let total = answer_key.len();
    let percentage = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    };
    log::debug!("score: {}/{} ({:.2}%)", correct, total, percentage);

    draw_text_mut(
        &mut annotated,
        RED,
        10,
        10,
        Scale::uniform(SCORE_TEXT_SCALE),
        &monospace_font(),
        &format!("{:.2}%", percentage),
    );

    Ok(ScoreResult {
        correct,
        total,
        percentage,
        questions,
        annotated,
    })
}

/// Draws a closed contour with lines `thickness` pixels wide.
pub fn draw_contour_outline_mut(
    canvas: &mut RgbImage,
    contour: &Contour,
    color: Rgb<u8>,
    thickness: i32,
) {
    if contour.is_empty() {
        return;
    }
    let reach = (thickness - 1) / 2;
    let next = contour.iter().cycle().skip(1);
    for (start, end) in contour.iter().zip(next) {
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                draw_line_segment_mut(
                    canvas,
                    ((start.x + dx) as f32, (start.y + dy) as f32),
                    ((end.x + dx) as f32, (end.y + dy) as f32),
                    color,
                );
            }
        }
    }
}
