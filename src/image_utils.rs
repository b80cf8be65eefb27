use image::{GrayImage, Luma, Rgb};
use imageproc::{
    contours::{find_contours, BorderType},
    contrast::otsu_level,
};
use rusttype::Font;

use crate::geometry::Contour;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const WHITE_RGB: Rgb<u8> = Rgb([255, 255, 255]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
pub const PINK: Rgb<u8> = Rgb([255, 0, 255]);
pub const DARK_GREEN: Rgb<u8> = Rgb([0, 127, 0]);
pub const DARK_BLUE: Rgb<u8> = Rgb([0, 0, 127]);

pub const RAINBOW: [Rgb<u8>; 7] = [
    Rgb([255, 0, 0]),
    Rgb([255, 127, 0]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([75, 0, 130]),
    Rgb([143, 0, 255]),
];

/// Binarizes an image so that dark (inked) pixels become `WHITE` foreground
/// and light paper becomes `BLACK`. The cut-off is the Otsu level, chosen to
/// best separate the two intensity classes.
pub fn binarize_inverse_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] <= level {
            WHITE
        } else {
            BLACK
        }
    })
}

/// Finds the outer borders of every top-level foreground region. Borders of
/// regions nested inside holes of other regions are skipped.
/// The one-pixel frame of the image is treated as background.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour> {
    let mut framed = binary.clone();
    clear_frame_mut(&mut framed);
    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .map(|contour| contour.points)
        .collect()
}

/// Sets the outermost rows and columns of an image to `BLACK`.
pub fn clear_frame_mut(img: &mut GrayImage) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    for x in 0..width {
        img.put_pixel(x, 0, BLACK);
        img.put_pixel(x, height - 1, BLACK);
    }
    for y in 0..height {
        img.put_pixel(0, y, BLACK);
        img.put_pixel(width - 1, y, BLACK);
    }
}

/// Determines the number of pixels in an image that match the given luma.
pub fn count_pixels(img: &GrayImage, luma: &Luma<u8>) -> u32 {
    img.pixels().filter(|p| *p == luma).count() as u32
}

pub fn monospace_font() -> Font<'static> {
    Font::try_from_bytes(include_bytes!("../fonts/DejaVuSansMono.ttf")).expect("font is valid")
}

#[cfg(test)]
mod test {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_binarize_inverse_otsu_marks_ink_as_foreground() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([230]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(10, 10), Luma([20]));

        let binary = binarize_inverse_otsu(&img);
        assert_eq!(*binary.get_pixel(15, 15), WHITE);
        assert_eq!(*binary.get_pixel(2, 2), BLACK);
        assert_eq!(count_pixels(&binary, &WHITE), 100);
    }

    #[test]
    fn test_find_external_contours_skips_nested_regions() {
        let mut img = GrayImage::new(60, 60);
        // a hollow square with a blob inside its hole, plus a separate blob
        draw_filled_rect_mut(&mut img, Rect::at(5, 5).of_size(30, 30), WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(8, 8).of_size(24, 24), BLACK);
        draw_filled_rect_mut(&mut img, Rect::at(15, 15).of_size(5, 5), WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(45, 45).of_size(6, 6), WHITE);

        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_clear_frame_keeps_interior() {
        let mut img = GrayImage::from_pixel(5, 4, WHITE);
        clear_frame_mut(&mut img);
        assert_eq!(count_pixels(&img, &WHITE), 3 * 2);
        assert_eq!(*img.get_pixel(0, 2), BLACK);
        assert_eq!(*img.get_pixel(4, 3), BLACK);
        assert_eq!(*img.get_pixel(2, 1), WHITE);

        clear_frame_mut(&mut GrayImage::new(0, 0));
    }

    #[test]
    fn test_specks_on_the_frame_do_not_hide_regions() {
        let mut img = GrayImage::new(120, 60);
        // a ragged resampling edge down the left column, broken by gaps
        for y in (0..60).filter(|y| y % 3 != 1) {
            img.put_pixel(0, y, WHITE);
        }
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(120, 1), WHITE);
        for i in 0..4 {
            draw_filled_rect_mut(&mut img, Rect::at(15 + i * 25, 20).of_size(20, 20), WHITE);
        }

        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 4);
        for contour in contours {
            assert!(contour.iter().all(|p| p.x > 0 && p.y > 0));
        }
    }

    #[test]
    fn test_find_external_contours_on_empty_image() {
        assert!(find_external_contours(&GrayImage::new(10, 10)).is_empty());
    }
}
