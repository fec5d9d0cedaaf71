//! Signature-placement engine
//!
//! The core pipeline behind a sign action: locate the target region inside
//! the PDF, fit the captured signature raster into it, commit the image, and
//! flatten the document into a static artifact.
//!
//! Each invocation owns its document exclusively and performs no network or
//! disk I/O; the pieces are pure transforms over in-memory handles and are
//! independently testable.

mod committer;
mod error;
mod fitter;
mod locator;
mod trim;
mod types;

pub use committer::{commit, flatten};
pub use error::SignError;
pub use fitter::{fit, fit_signature, DecodedSignature, FittedPlacement, SignatureFormat};
pub use locator::{locate, FieldIndex, IndexedField, WidgetRef, RESERVED_FIELD_NAME};
pub use trim::trim_transparent_border;
pub use types::{FieldTarget, Placement, PlacementRect, Rect};

use lopdf::Document;

/// Final serialized byte stream plus how the signature was placed.
#[derive(Debug, Clone)]
pub struct SignedPdf {
    pub bytes: Vec<u8>,
    pub placement: Placement,
}

/// Run the full pipeline: load -> locate -> fit -> commit.
///
/// A document without a usable target is still flattened and returned with
/// [`Placement::None`] so callers can surface the outcome instead of
/// mistaking it for a placed signature.
pub fn sign_pdf(pdf_bytes: &[u8], signature_bytes: &[u8]) -> Result<SignedPdf, SignError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| SignError::PdfParse(e.to_string()))?;

    let target = locator::locate(&doc);
    let fitted = fitter::fit_signature(signature_bytes, &target)?;
    let (bytes, placement) = committer::commit(&mut doc, &fitted, &target)?;

    match placement {
        Placement::None => {
            tracing::warn!("no usable signature target; document flattened without placement")
        }
        other => tracing::debug!(placement = other.as_str(), "signature placed"),
    }

    Ok(SignedPdf { bytes, placement })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use lopdf::{dictionary, Object, ObjectId};
    use std::io::Cursor;

    fn signature_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(120, 40, Rgba([0, 0, 120, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("png encode");
        bytes
    }

    fn fielded_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id: ObjectId = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1i64,
            }),
        );
        let field_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "T" => Object::string_literal("signatureZone"),
            "FT" => "Tx",
            "Rect" => vec![50.into(), 50.into(), 250.into(), 130.into()],
            "P" => Object::Reference(page_id),
        });
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(field_id)],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => Object::Reference(acroform_id),
        });
        doc.trailer.set("Root", catalog_id);
        {
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .expect("page dict");
            page.set("Annots", vec![Object::Reference(field_id)]);
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save fixture");
        bytes
    }

    #[test]
    fn pipeline_signs_a_fielded_document() {
        let signed = sign_pdf(&fielded_pdf(), &signature_png()).expect("sign");
        assert_eq!(signed.placement, Placement::PageOverlay);

        let reloaded = Document::load_mem(&signed.bytes).expect("reload");
        assert!(FieldIndex::build(&reloaded).is_empty());
    }

    #[test]
    fn pipeline_flags_missing_target_instead_of_failing() {
        let mut doc = Document::with_version("1.7");
        let pages_id: ObjectId = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut plain = Vec::new();
        doc.save_to(&mut plain).expect("save fixture");

        let signed = sign_pdf(&plain, &signature_png()).expect("sign");
        assert_eq!(signed.placement, Placement::None);
    }

    #[test]
    fn pipeline_rejects_non_pdf_bytes() {
        let err = sign_pdf(b"definitely not a pdf", &signature_png()).unwrap_err();
        assert!(matches!(err, SignError::PdfParse(_)));
    }

    #[test]
    fn pipeline_rejects_unsupported_signature_bytes() {
        let err = sign_pdf(&fielded_pdf(), b"scribble").unwrap_err();
        assert!(matches!(err, SignError::UnsupportedImage));
    }
}
