use image::GrayImage;
use imageproc::rect::Rect;
use logging_timer::time;

use crate::{
    config::BubbleFilter,
    geometry::Contour,
    image_utils::{binarize_inverse_otsu, find_external_contours},
    types::BubbleCandidate,
};

/// Determines whether a rect could be a bubble based on its size and shape.
/// All bounds are inclusive.
pub fn rect_could_be_bubble(filter: &BubbleFilter, rect: &Rect) -> bool {
    let aspect_ratio = rect.width() as f64 / rect.height() as f64;
    rect.width() >= filter.min_width
        && rect.height() >= filter.min_height
        && aspect_ratio >= filter.min_aspect_ratio
        && aspect_ratio <= filter.max_aspect_ratio
}

/// Keeps the contours whose bounding boxes are large enough and close enough
/// to square to be bubbles. Order is preserved.
pub fn filter_bubble_candidates(
    contours: Vec<Contour>,
    filter: &BubbleFilter,
) -> Vec<BubbleCandidate> {
    contours
        .into_iter()
        .filter_map(BubbleCandidate::new)
        .filter(|candidate| rect_could_be_bubble(filter, &candidate.bounds))
        .collect()
}

/// Binarizes a rectified sheet and returns the binary image along with every
/// bubble-shaped region found in it.
#[time]
pub fn find_bubble_candidates(
    gray: &GrayImage,
    filter: &BubbleFilter,
) -> (GrayImage, Vec<BubbleCandidate>) {
    let binary = binarize_inverse_otsu(gray);
    let contours = find_external_contours(&binary);
    let total = contours.len();
    let candidates = filter_bubble_candidates(contours, filter);
    log::debug!(
        "{} of {} contours look like bubbles",
        candidates.len(),
        total
    );
    (binary, candidates)
}
