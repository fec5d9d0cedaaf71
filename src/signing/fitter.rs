//! Image fitter
//!
//! Decodes the captured signature raster and computes the uniform
//! scale-to-fit transform that centers it inside the placement target.

use image::{DynamicImage, GenericImageView, ImageFormat};

use super::error::SignError;
use super::trim::trim_transparent_border;
use super::types::PlacementRect;

/// Encoded format the signature bytes decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    Png,
    Jpeg,
}

/// A decoded signature raster plus its original encoded bytes.
///
/// JPEG sources keep their bytes for direct embedding; PNG sources are
/// embedded from the (border-trimmed) raster.
#[derive(Debug, Clone)]
pub struct DecodedSignature {
    pub format: SignatureFormat,
    pub raster: DynamicImage,
    pub raw: Vec<u8>,
}

impl DecodedSignature {
    /// Decode signature bytes, trying PNG first, then JPEG.
    ///
    /// Alpha-capable rasters are trimmed to their non-transparent bounding
    /// box (a no-op for captures the client already trimmed).
    pub fn decode(bytes: &[u8]) -> Result<Self, SignError> {
        if let Ok(img) = image::load_from_memory_with_format(bytes, ImageFormat::Png) {
            let raster = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(trim_transparent_border(&img.to_rgba8()))
            } else {
                img
            };
            return Ok(Self {
                format: SignatureFormat::Png,
                raster,
                raw: bytes.to_vec(),
            });
        }

        if let Ok(img) = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg) {
            return Ok(Self {
                format: SignatureFormat::Jpeg,
                raster: img,
                raw: bytes.to_vec(),
            });
        }

        Err(SignError::UnsupportedImage)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }
}

/// The signature's draw rectangle inside the target, plus the decoded image.
#[derive(Debug, Clone)]
pub struct FittedPlacement {
    pub draw_x: f64,
    pub draw_y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
    pub image: DecodedSignature,
}

/// Decode `bytes` and fit the raster into `target`.
///
/// With a positive-area target, the image is uniformly scaled by
/// `min(tw/iw, th/ih)` and centered; the result is always fully contained
/// in the target and aspect ratio is exactly preserved. Without a usable
/// target the image is still decoded (the committer decides whether drawing
/// proceeds) and the scale defaults to 1.0.
pub fn fit_signature(bytes: &[u8], target: &PlacementRect) -> Result<FittedPlacement, SignError> {
    let image = DecodedSignature::decode(bytes)?;
    Ok(fit(image, target))
}

/// Fit an already-decoded signature into `target`.
pub fn fit(image: DecodedSignature, target: &PlacementRect) -> FittedPlacement {
    let (width, height) = image.dimensions();
    let image_width = width as f64;
    let image_height = height as f64;
    let rect = target.rect;

    if rect.has_area() && image_width > 0.0 && image_height > 0.0 {
        let scale = (rect.width / image_width).min(rect.height / image_height);
        let draw_width = image_width * scale;
        let draw_height = image_height * scale;
        FittedPlacement {
            draw_x: rect.x + (rect.width - draw_width) / 2.0,
            draw_y: rect.y + (rect.height - draw_height) / 2.0,
            draw_width,
            draw_height,
            image,
        }
    } else {
        FittedPlacement {
            draw_x: rect.x,
            draw_y: rect.y,
            draw_width: image_width,
            draw_height: image_height,
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::types::Rect;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([20, 20, 20, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encode");
        bytes
    }

    fn target_at(x: f64, y: f64, width: f64, height: f64) -> PlacementRect {
        PlacementRect {
            page_index: 0,
            rect: Rect::new(x, y, width, height),
            field: None,
        }
    }

    #[test]
    fn wide_signature_in_reserved_zone_scenario() {
        // 400x100 image into {x:50, y:50, w:200, h:80}.
        let fitted = fit_signature(&opaque_png(400, 100), &target_at(50.0, 50.0, 200.0, 80.0))
            .expect("decode");
        assert_eq!(fitted.draw_width, 200.0);
        assert_eq!(fitted.draw_height, 50.0);
        assert_eq!(fitted.draw_x, 50.0);
        assert_eq!(fitted.draw_y, 65.0);
    }

    #[test]
    fn fitted_rect_is_contained_and_aspect_preserved() {
        let cases = [
            (400u32, 100u32, 200.0, 80.0),
            (50, 300, 200.0, 80.0),
            (123, 77, 31.5, 62.25),
            (10, 10, 500.0, 3.0),
        ];
        for (iw, ih, tw, th) in cases {
            let target = target_at(12.0, 34.0, tw, th);
            let fitted = fit_signature(&opaque_png(iw, ih), &target).expect("decode");

            assert!(fitted.draw_x >= target.rect.x - 1e-9);
            assert!(fitted.draw_y >= target.rect.y - 1e-9);
            assert!(fitted.draw_x + fitted.draw_width <= target.rect.x + tw + 1e-9);
            assert!(fitted.draw_y + fitted.draw_height <= target.rect.y + th + 1e-9);

            let source_ratio = iw as f64 / ih as f64;
            let drawn_ratio = fitted.draw_width / fitted.draw_height;
            assert!((source_ratio - drawn_ratio).abs() < 1e-9);
        }
    }

    #[test]
    fn no_target_still_decodes_at_scale_one() {
        let fitted =
            fit_signature(&opaque_png(64, 32), &PlacementRect::none()).expect("decode");
        assert_eq!(fitted.draw_width, 64.0);
        assert_eq!(fitted.draw_height, 32.0);
        assert_eq!(fitted.image.format, SignatureFormat::Png);
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let err = fit_signature(b"not an image at all", &PlacementRect::none()).unwrap_err();
        assert!(matches!(err, SignError::UnsupportedImage));
    }

    #[test]
    fn jpeg_signature_is_decoded_on_second_attempt() {
        let img = image::RgbImage::from_pixel(30, 20, image::Rgb([200, 10, 10]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .expect("jpeg encode");

        let fitted = fit_signature(&bytes, &target_at(0.0, 0.0, 60.0, 60.0)).expect("decode");
        assert_eq!(fitted.image.format, SignatureFormat::Jpeg);
        assert_eq!(fitted.draw_width, 60.0);
        assert_eq!(fitted.draw_height, 40.0);
    }

    #[test]
    fn untrimmed_capture_is_trimmed_before_fitting() {
        // 100x100 canvas with ink only in a 40x20 box.
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 0]));
        for y in 40..60 {
            for x in 30..70 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encode");

        let fitted = fit_signature(&bytes, &target_at(0.0, 0.0, 80.0, 80.0)).expect("decode");
        assert_eq!(fitted.image.dimensions(), (40, 20));
        assert_eq!(fitted.draw_width, 80.0);
        assert_eq!(fitted.draw_height, 40.0);
    }
}
