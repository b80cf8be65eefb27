use imageproc::point::Point;
use imageproc::rect::Rect;

/// An ordered boundary trace of a connected region, in pixel coordinates.
pub type Contour = Vec<Point<i32>>;

pub fn distance_from_point_to_point(p1: &Point<f32>, p2: &Point<f32>) -> f32 {
    ((p1.x - p2.x).powf(2.0) + (p1.y - p2.y).powf(2.0)).sqrt()
}

/// Gets the smallest axis-aligned rect containing every point of a contour.
/// Extents are inclusive, so a single pixel has a 1x1 bounding rect.
pub fn get_contour_bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

/// Area enclosed by a closed contour, computed with the shoelace formula.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();
    twice_area.abs() / 2.0
}

fn pixel_distance(a: &Point<i32>, b: &Point<i32>) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Distance from `point` to the infinite line through `start` and `end`.
fn distance_to_line(point: &Point<i32>, start: &Point<i32>, end: &Point<i32>) -> f64 {
    let dx = (end.x - start.x) as f64;
    let dy = (end.y - start.y) as f64;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return pixel_distance(point, start);
    }
    (dy * (point.x - start.x) as f64 - dx * (point.y - start.y) as f64).abs() / length
}

/// Simplifies a closed contour with the Douglas-Peucker algorithm. Every
/// point of the input lies within `epsilon` of the returned polygon.
///
/// The curve is split at two mutually distant points so that the split points
/// are themselves likely vertices, then each half is simplified as an open
/// chain.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64) -> Contour {
    if points.len() < 3 {
        return points.to_vec();
    }

    let farthest_from = |origin: usize| {
        (0..points.len())
            .max_by(|&a, &b| {
                pixel_distance(&points[origin], &points[a])
                    .total_cmp(&pixel_distance(&points[origin], &points[b]))
            })
            .unwrap_or(origin)
    };
    let a = farthest_from(0);
    let b = farthest_from(a);
    if a == b {
        return vec![points[a]];
    }

    let (start, end) = (a.min(b), a.max(b));
    let first_half = &points[start..=end];
    let second_half = points[end..]
        .iter()
        .chain(points[..=start].iter())
        .copied()
        .collect::<Vec<_>>();

    let mut polygon = simplify_open_chain(first_half, epsilon);
    polygon.pop();
    let mut rest = simplify_open_chain(&second_half, epsilon);
    rest.pop();
    polygon.append(&mut rest);
    polygon
}

/// Douglas-Peucker on an open chain; both endpoints are always kept.
fn simplify_open_chain(chain: &[Point<i32>], epsilon: f64) -> Contour {
    if chain.len() < 3 {
        return chain.to_vec();
    }

    let first = chain[0];
    let last = chain[chain.len() - 1];
    let (index, max_distance) = chain[1..chain.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, distance_to_line(p, &first, &last)))
        .fold((0, -1.0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });

    if max_distance <= epsilon {
        return vec![first, last];
    }

    let mut left = simplify_open_chain(&chain[..=index], epsilon);
    let right = simplify_open_chain(&chain[index..], epsilon);
    left.pop();
    left.extend(right);
    left
}
