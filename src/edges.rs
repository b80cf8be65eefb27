use image::{GrayImage, RgbImage};
use imageproc::{edges::canny, filter::gaussian_blur_f32};
use logging_timer::time;

use crate::{geometry::Contour, image_utils::find_external_contours};

/// Sigma of the Gaussian equivalent to a 5x5 smoothing kernel.
pub const BLUR_SIGMA: f32 = 1.1;
pub const CANNY_LOW_THRESHOLD: f32 = 5.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 100.0;

/// Smooths a grayscale image and reduces it to a binary edge map.
pub fn detect_edges(gray: &GrayImage) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
    canny(&blurred, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD)
}

/// Finds the external contours of the edges in an image. Order is arbitrary,
/// and an image without edges has no contours.
#[time]
pub fn find_edge_contours(gray: &GrayImage) -> Vec<Contour> {
    let edges = detect_edges(gray);
    let contours = find_external_contours(&edges);
    log::debug!("found {} external edge contours", contours.len());
    contours
}

/// Convenience wrapper over [`find_edge_contours`] for color input.
pub fn find_edge_contours_rgb(image: &RgbImage) -> Vec<Contour> {
    find_edge_contours(&image::imageops::grayscale(image))
}
