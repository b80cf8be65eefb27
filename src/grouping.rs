use image::{GrayImage, Luma};
use imageproc::{drawing::draw_polygon_mut, point::Point};
use logging_timer::time;

use crate::{
    image_utils::{BLACK, WHITE},
    interpret::GradeError,
    types::{BubbleCandidate, DetectedAnswer, Fill, QuestionGroup},
};

/// Orders bubble candidates into rows of `choices_per_question`, top to
/// bottom, each sorted left to right.
#[time]
pub fn group_into_questions(
    mut candidates: Vec<BubbleCandidate>,
    choices_per_question: usize,
) -> Result<Vec<Vec<BubbleCandidate>>, GradeError> {
    if candidates.is_empty() {
        return Err(GradeError::EmptyBubbleSet);
    }
    if choices_per_question == 0 || candidates.len() % choices_per_question != 0 {
        return Err(GradeError::MalformedGroup {
            candidates: candidates.len(),
            choices_per_question,
        });
    }

    // stable, so rows sharing a top edge keep their extraction order
    candidates.sort_by_key(|candidate| candidate.bounds.top());

    let mut rows = Vec::with_capacity(candidates.len() / choices_per_question);
    let mut remaining = candidates.into_iter();
    loop {
        let mut row = remaining
            .by_ref()
            .take(choices_per_question)
            .collect::<Vec<_>>();
        if row.is_empty() {
            break;
        }
        row.sort_by_key(|candidate| candidate.bounds.left());
        rows.push(row);
    }

    log::debug!("grouped bubbles into {} questions", rows.len());
    Ok(rows)
}

/// Counts the foreground pixels of `binary` inside a candidate's contour.
pub fn measure_fill(candidate: &BubbleCandidate, binary: &GrayImage) -> Fill {
    let bounds = candidate.bounds;
    let mut mask = GrayImage::from_pixel(bounds.width(), bounds.height(), BLACK);

    let mut polygon = candidate
        .contour
        .iter()
        .map(|p| Point::new(p.x - bounds.left(), p.y - bounds.top()))
        .collect::<Vec<_>>();
    // drawing a polygon requires an open outline
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.is_empty() {
        return Fill { count: 0, area: 0 };
    }
    draw_polygon_mut(&mut mask, &polygon, WHITE);

    let (mut count, mut area) = (0, 0);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if *pixel != WHITE {
            continue;
        }
        area += 1;
        let (image_x, image_y) = (bounds.left() + x as i32, bounds.top() + y as i32);
        if image_x < 0
            || image_y < 0
            || image_x as u32 >= binary.width()
            || image_y as u32 >= binary.height()
        {
            continue;
        }
        if *binary.get_pixel(image_x as u32, image_y as u32) != Luma([0]) {
            count += 1;
        }
    }

    Fill { count, area }
}

/// Picks the bubble with the strictly greatest fill in a left-to-right row,
/// so the left-most bubble wins ties. The row is unanswered when even that
/// bubble's fill ratio is below `min_fill_ratio`.
pub fn detect_answer(row: &[BubbleCandidate], min_fill_ratio: f32) -> DetectedAnswer {
    let mut bubbled: Option<(usize, &BubbleCandidate)> = None;
    for (choice, candidate) in row.iter().enumerate() {
        match bubbled {
            Some((_, best)) if candidate.fill_count() <= best.fill_count() => {}
            _ => bubbled = Some((choice, candidate)),
        }
    }

    match bubbled {
        Some((choice, candidate)) => {
            let ratio = candidate.fill.map_or(0.0, |fill| fill.ratio());
            if ratio < min_fill_ratio {
                DetectedAnswer::Unanswered
            } else {
                DetectedAnswer::Marked(choice)
            }
        }
        None => DetectedAnswer::Unanswered,
    }
}

/// Groups candidates into questions, measures every bubble's fill against
/// `binary`, and detects each question's answer.
#[time]
pub fn detect_answers(
    candidates: Vec<BubbleCandidate>,
    binary: &GrayImage,
    choices_per_question: usize,
    min_fill_ratio: f32,
) -> Result<Vec<QuestionGroup>, GradeError> {
    let rows = group_into_questions(candidates, choices_per_question)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let bubbles = row
                .into_iter()
                .map(|mut candidate| {
                    candidate.fill = Some(measure_fill(&candidate, binary));
                    candidate
                })
                .collect::<Vec<_>>();
            let answer = detect_answer(&bubbles, min_fill_ratio);
            QuestionGroup { bubbles, answer }
        })
        .collect())
}
