//! Transparent-border trim
//!
//! Crops a raster to the minimal bounding box of its non-transparent pixels.
//! The capture surface runs the same crop before handing the signature to the
//! server; applying it again here is idempotent, so untrimmed captures are
//! corrected and trimmed ones pass through unchanged.

use image::RgbaImage;

/// Crop `source` to the bounding box of pixels with non-zero alpha.
///
/// Returns the source unchanged when every pixel is fully transparent.
/// Single full O(width x height) scan, no early exit.
pub fn trim_transparent_border(source: &RgbaImage) -> RgbaImage {
    let (width, height) = source.dimensions();

    let mut top: Option<u32> = None;
    let mut left: Option<u32> = None;
    let mut right: Option<u32> = None;
    let mut bottom: Option<u32> = None;

    for y in 0..height {
        for x in 0..width {
            let alpha = source.get_pixel(x, y)[3];
            if alpha != 0 {
                if top.is_none() {
                    top = Some(y);
                }
                if left.map_or(true, |l| x < l) {
                    left = Some(x);
                }
                if right.map_or(true, |r| x > r) {
                    right = Some(x);
                }
                bottom = Some(y);
            }
        }
    }

    let (Some(top), Some(left), Some(right), Some(bottom)) = (top, left, right, bottom) else {
        return source.clone();
    };

    let crop_width = right - left + 1;
    let crop_height = bottom - top + 1;
    image::imageops::crop_imm(source, left, top, crop_width, crop_height).to_image()
}
