use std::cmp::Ordering;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    geometric_transformations::{warp_into, Interpolation, Projection},
    point::Point,
};
use logging_timer::time;

use crate::{
    geometry::distance_from_point_to_point, interpret::GradeError, types::Quadrilateral,
    types::Size,
};

fn corner_sum(p: &Point<f32>) -> f32 {
    p.x + p.y
}

fn corner_diff(p: &Point<f32>) -> f32 {
    p.y - p.x
}

fn compare(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Orders four corners as top-left, top-right, bottom-right, bottom-left.
///
/// The top-left corner has the smallest `x + y` and the bottom-right the
/// largest. The top-right corner has the smallest `y - x` and the bottom-left
/// the largest. Ties on one key are broken by the other, as for a page turned
/// 45 degrees. If that still names a point twice, the corners are taken
/// clockwise around their centroid starting from the top-left one. The result
/// does not depend on the order of the input.
pub fn order_points(points: [Point<f32>; 4]) -> [Point<f32>; 4] {
    fn negated_sum(p: &Point<f32>) -> f32 {
        -corner_sum(p)
    }
    fn negated_diff(p: &Point<f32>) -> f32 {
        -corner_diff(p)
    }
    // smallest `primary`, then smallest `secondary`
    let pick = |primary: fn(&Point<f32>) -> f32, secondary: fn(&Point<f32>) -> f32| {
        let mut best = points[0];
        for point in &points[1..] {
            let ordering = compare(primary(point), primary(&best))
                .then(compare(secondary(point), secondary(&best)));
            if ordering == Ordering::Less {
                best = *point;
            }
        }
        best
    };

    let ordered = [
        pick(corner_sum, corner_diff),
        pick(corner_diff, negated_sum),
        pick(negated_sum, negated_diff),
        pick(negated_diff, corner_sum),
    ];
    let distinct = (0..4).all(|i| (i + 1..4).all(|j| ordered[i] != ordered[j]));
    if distinct {
        ordered
    } else {
        order_clockwise(points, ordered[0])
    }
}

/// Sorts corners by angle around their centroid, which is clockwise in image
/// coordinates, and rotates the result to begin at `top_left`.
fn order_clockwise(points: [Point<f32>; 4], top_left: Point<f32>) -> [Point<f32>; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let angle = |p: &Point<f32>| (p.y - cy).atan2(p.x - cx);

    let mut sorted = points;
    sorted.sort_by(|a, b| {
        compare(angle(a), angle(b))
            .then(compare(corner_sum(a), corner_sum(b)))
            .then(compare(corner_diff(a), corner_diff(b)))
    });
    let start = sorted.iter().position(|p| *p == top_left).unwrap_or(0);
    sorted.rotate_left(start);
    sorted
}

/// Size of the rectangle an ordered quadrilateral is mapped onto: the longer
/// of each pair of opposite edges, so nothing observed is scaled down.
pub fn target_size(quad: &Quadrilateral) -> Size<u32> {
    let width = distance_from_point_to_point(&quad.top_left(), &quad.top_right()).max(
        distance_from_point_to_point(&quad.bottom_left(), &quad.bottom_right()),
    );
    let height = distance_from_point_to_point(&quad.top_left(), &quad.bottom_left()).max(
        distance_from_point_to_point(&quad.top_right(), &quad.bottom_right()),
    );
    Size {
        width: width as u32,
        height: height as u32,
    }
}

/// A projective mapping from a page quadrilateral onto an axis-aligned
/// rectangle of `size`.
#[derive(Debug, Clone)]
pub struct PerspectiveTransform {
    pub source: Quadrilateral,
    pub size: Size<u32>,
    projection: Projection,
}

impl PerspectiveTransform {
    pub fn new(quad: &Quadrilateral) -> Result<Self, GradeError> {
        let source = quad.ordered();
        let size = target_size(&source);
        if size.width < 2 || size.height < 2 {
            return Err(GradeError::DegenerateDocument(source));
        }

        let projection = Projection::from_control_points(
            source.corners.map(|p| (p.x, p.y)),
            target_corners(size).map(|p| (p.x, p.y)),
        )
        .ok_or(GradeError::DegenerateDocument(source))?;

        Ok(Self {
            source,
            size,
            projection,
        })
    }

    /// Maps a point from the photo into the rectified image.
    pub fn apply(&self, point: Point<f32>) -> Point<f32> {
        let (x, y) = self.projection * (point.x, point.y);
        Point::new(x, y)
    }

    pub fn warp_rgb(&self, image: &RgbImage) -> RgbImage {
        let mut out = RgbImage::new(self.size.width, self.size.height);
        warp_into(
            image,
            &self.projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut out,
        );
        out
    }

    pub fn warp_gray(&self, image: &GrayImage) -> GrayImage {
        let mut out = GrayImage::new(self.size.width, self.size.height);
        warp_into(
            image,
            &self.projection,
            Interpolation::Bilinear,
            Luma([0]),
            &mut out,
        );
        out
    }
}

/// Corners of the rectified image's outermost pixels, in canonical order.
pub fn target_corners(size: Size<u32>) -> [Point<f32>; 4] {
    let right = (size.width - 1) as f32;
    let bottom = (size.height - 1) as f32;
    [
        Point::new(0.0, 0.0),
        Point::new(right, 0.0),
        Point::new(right, bottom),
        Point::new(0.0, bottom),
    ]
}

/// Warps the color and grayscale photo through the same transform, so the two
/// results are pixel-aligned and share dimensions.
#[time]
pub fn rectify(
    quad: &Quadrilateral,
    color: &RgbImage,
    gray: &GrayImage,
) -> Result<(RgbImage, GrayImage, PerspectiveTransform), GradeError> {
    let transform = PerspectiveTransform::new(quad)?;
    log::debug!(
        "rectifying {:?} onto {}x{}",
        transform.source.corners,
        transform.size.width,
        transform.size.height
    );
    Ok((transform.warp_rgb(color), transform.warp_gray(gray), transform))
}
