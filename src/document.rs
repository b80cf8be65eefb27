use imageproc::geometry::arc_length;
use logging_timer::time;

use crate::{
    config::LocatorOptions,
    geometry::{approximate_polygon, contour_area, Contour},
    interpret::GradeError,
    types::Quadrilateral,
};

/// Finds the page boundary among edge contours: the first of the largest
/// contours (by enclosed area) that simplifies to exactly four vertices.
#[time]
pub fn locate_document(
    contours: &[Contour],
    options: &LocatorOptions,
) -> Result<Quadrilateral, GradeError> {
    let mut by_area = contours
        .iter()
        .map(|contour| (contour_area(contour), contour))
        .collect::<Vec<_>>();
    by_area.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    for (rank, (area, contour)) in by_area.iter().take(options.max_candidates).enumerate() {
        let epsilon = options.epsilon_ratio * arc_length(contour, true);
        let polygon = approximate_polygon(contour, epsilon);
        log::debug!(
            "document candidate #{}: area={:.1}, vertices={}",
            rank,
            area,
            polygon.len()
        );

        if let Some(quad) = Quadrilateral::from_contour_points(&polygon) {
            return Ok(quad);
        }
    }

    Err(GradeError::DocumentNotFound)
}
