//! Document committer
//!
//! Writes the fitted signature into the document (field appearance or page
//! overlay), flattens all interactive form structures, and serializes the
//! final byte stream.
//!
//! Flattening stamps every widget's normal appearance stream into its page
//! content before stripping the widget annotations and the catalog's
//! `/AcroForm`, so the visual result survives as static page content.

use std::io::Write as _;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::error::SignError;
use super::fitter::{DecodedSignature, FittedPlacement, SignatureFormat};
use super::types::{Placement, PlacementRect, Rect};

/// Commit the fitted signature into `doc` and serialize it.
///
/// Placement priority: a field that accepts an image value takes it as its
/// widget appearance; otherwise a usable page target gets a direct overlay;
/// otherwise nothing is placed. Flattening happens unconditionally, so even
/// the no-placement outcome returns a document without live form fields.
pub fn commit(
    doc: &mut Document,
    fitted: &FittedPlacement,
    target: &PlacementRect,
) -> Result<(Vec<u8>, Placement), SignError> {
    let mut placement = Placement::None;

    if let Some(field) = target.field.as_ref().filter(|f| f.accepts_image_value) {
        set_field_image_value(doc, field.widget_id, target.rect, &fitted.image)?;
        placement = Placement::FieldValue;
    } else if target.page_index >= 0 {
        overlay_on_page(doc, target.page_index as u32, fitted)?;
        placement = Placement::PageOverlay;
    }

    flatten(doc)?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| SignError::Serialize(e.to_string()))?;
    Ok((bytes, placement))
}

/// Stamp widget appearances into page content, strip widget annotations,
/// and remove `/AcroForm` from the catalog. Terminal: no field-based
/// placement is possible on the document afterwards.
pub fn flatten(doc: &mut Document) -> Result<(), SignError> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        flatten_page_widgets(doc, page_id)?;
    }
    remove_acroform(doc);
    Ok(())
}

// ---------------------------------------------------------------------------
// Field-value placement
// ---------------------------------------------------------------------------

/// Write the signature as the widget's normal appearance stream. The widget
/// rectangle governs final geometry; the image is fitted into it locally.
fn set_field_image_value(
    doc: &mut Document,
    widget_id: ObjectId,
    widget_rect: Rect,
    image: &DecodedSignature,
) -> Result<(), SignError> {
    let image_id = add_image_xobject(doc, image)?;
    let appearance_id = add_appearance_form(doc, image_id, widget_rect, image.dimensions())?;

    let widget = doc
        .get_object_mut(widget_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| SignError::Commit(e.to_string()))?;
    let mut ap = Dictionary::new();
    ap.set("N", Object::Reference(appearance_id));
    widget.set("AP", Object::Dictionary(ap));
    // A stale state selector would point into the replaced appearance map.
    widget.remove(b"AS");
    Ok(())
}

/// Build a form XObject whose content paints the image fitted and centered
/// inside a `[0 0 rect.width rect.height]` box.
fn add_appearance_form(
    doc: &mut Document,
    image_id: ObjectId,
    rect: Rect,
    (image_width, image_height): (u32, u32),
) -> Result<ObjectId, SignError> {
    let iw = image_width as f64;
    let ih = image_height as f64;
    let (draw_w, draw_h, draw_x, draw_y) = if rect.has_area() && iw > 0.0 && ih > 0.0 {
        let scale = (rect.width / iw).min(rect.height / ih);
        let dw = iw * scale;
        let dh = ih * scale;
        (dw, dh, (rect.width - dw) / 2.0, (rect.height - dh) / 2.0)
    } else {
        (iw, ih, 0.0, 0.0)
    };

    let content = Content {
        operations: draw_image_ops("Sig", draw_w, draw_h, draw_x, draw_y),
    };
    let data = content
        .encode()
        .map_err(|e| SignError::Commit(e.to_string()))?;

    let mut xobjects = Dictionary::new();
    xobjects.set("Sig", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set(
        "BBox",
        vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(rect.width as f32),
            Object::Real(rect.height as f32),
        ],
    );
    dict.set("Resources", Object::Dictionary(resources));
    Ok(doc.add_object(Object::Stream(Stream::new(dict, data))))
}

// ---------------------------------------------------------------------------
// Page overlay placement
// ---------------------------------------------------------------------------

/// Draw the fitted image directly onto the page at the fitter's rectangle,
/// full opacity, no blending.
fn overlay_on_page(
    doc: &mut Document,
    page_index: u32,
    fitted: &FittedPlacement,
) -> Result<(), SignError> {
    let page_id = *doc
        .get_pages()
        .get(&(page_index + 1))
        .ok_or_else(|| SignError::Commit(format!("page index {page_index} out of range")))?;

    let image_id = add_image_xobject(doc, &fitted.image)?;
    let name = register_page_xobject(doc, page_id, image_id)?;
    let ops = draw_image_ops(
        &name,
        fitted.draw_width,
        fitted.draw_height,
        fitted.draw_x,
        fitted.draw_y,
    );
    append_page_content(doc, page_id, ops)
}

/// `q <w> 0 0 <h> <x> <y> cm /<name> Do Q`
fn draw_image_ops(name: &str, width: f64, height: f64, x: f64, y: f64) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(width as f32),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(height as f32),
                Object::Real(x as f32),
                Object::Real(y as f32),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

// ---------------------------------------------------------------------------
// Image XObjects
// ---------------------------------------------------------------------------

/// Embed the decoded signature as an image XObject.
///
/// JPEG bytes pass through with `DCTDecode`; PNG rasters become a
/// FlateDecode `DeviceRGB` stream, with the alpha channel split into a
/// FlateDecode `DeviceGray` `/SMask` when present.
fn add_image_xobject(doc: &mut Document, image: &DecodedSignature) -> Result<ObjectId, SignError> {
    let (width, height) = image.dimensions();

    match image.format {
        SignatureFormat::Jpeg => {
            let color_space: &[u8] = if image.raster.color().has_color() {
                b"DeviceRGB"
            } else {
                b"DeviceGray"
            };
            let mut dict = image_dict(width, height, color_space, b"DCTDecode");
            dict.set("Length", Object::Integer(image.raw.len() as i64));
            Ok(doc.add_object(Object::Stream(Stream::new(dict, image.raw.clone()))))
        }
        SignatureFormat::Png if image.raster.color().has_alpha() => {
            let rgba = image.raster.to_rgba8();
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            let mut alpha = Vec::with_capacity((width * height) as usize);
            for pixel in rgba.pixels() {
                rgb.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
                alpha.push(pixel[3]);
            }

            let compressed_alpha = flate_compress(&alpha)?;
            let mut smask_dict = image_dict(width, height, b"DeviceGray", b"FlateDecode");
            smask_dict.set("Length", Object::Integer(compressed_alpha.len() as i64));
            let smask_id = doc.add_object(Object::Stream(Stream::new(smask_dict, compressed_alpha)));

            let compressed_rgb = flate_compress(&rgb)?;
            let mut dict = image_dict(width, height, b"DeviceRGB", b"FlateDecode");
            dict.set("Length", Object::Integer(compressed_rgb.len() as i64));
            dict.set("SMask", Object::Reference(smask_id));
            Ok(doc.add_object(Object::Stream(Stream::new(dict, compressed_rgb))))
        }
        SignatureFormat::Png => {
            let rgb = image.raster.to_rgb8();
            let compressed = flate_compress(rgb.as_raw())?;
            let mut dict = image_dict(width, height, b"DeviceRGB", b"FlateDecode");
            dict.set("Length", Object::Integer(compressed.len() as i64));
            Ok(doc.add_object(Object::Stream(Stream::new(dict, compressed))))
        }
    }
}

fn image_dict(width: u32, height: u32, color_space: &[u8], filter: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.to_vec()));
    dict
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, SignError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SignError::ImageEncode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| SignError::ImageEncode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Page resource and content plumbing
// ---------------------------------------------------------------------------

/// Register `xobject_id` in the page's `/Resources /XObject` under a fresh
/// name and return it. Indirect resource dictionaries are rewritten in
/// place; missing ones are created inline.
fn register_page_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<String, SignError> {
    let (mut resources, resources_ref) = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => (dict_clone(doc, *id)?, Some(*id)),
            Ok(Object::Dictionary(d)) => (d.clone(), None),
            _ => (Dictionary::new(), None),
        }
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => dict_clone(doc, *id)?,
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    };

    let mut counter = 0usize;
    let name = loop {
        let candidate = format!("SigIm{counter}");
        if !xobjects.has(candidate.as_bytes()) {
            break candidate;
        }
        counter += 1;
    };

    xobjects.set(name.clone(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    match resources_ref {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(resources));
        }
        None => {
            let page = page_dict_mut(doc, page_id)?;
            page.set("Resources", Object::Dictionary(resources));
        }
    }
    Ok(name)
}

/// Append an encoded content stream to the page's `/Contents`, preserving
/// whatever shape (single reference or array) it already has.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), SignError> {
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| SignError::Commit(e.to_string()))?;
    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), encoded)));

    let page = page_dict_mut(doc, page_id)?;
    let existing = page.get(b"Contents").ok().cloned();
    match existing {
        Some(Object::Reference(previous)) => {
            page.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(previous),
                    Object::Reference(content_id),
                ]),
            );
        }
        Some(Object::Array(mut array)) => {
            array.push(Object::Reference(content_id));
            page.set("Contents", Object::Array(array));
        }
        _ => {
            page.set("Contents", Object::Reference(content_id));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Stamp and remove every widget annotation on one page.
fn flatten_page_widgets(doc: &mut Document, page_id: ObjectId) -> Result<(), SignError> {
    let (annotations, annotations_ref) = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => {
                let array = doc
                    .get_object(*id)
                    .and_then(Object::as_array)
                    .map_err(|e| SignError::Flatten(e.to_string()))?
                    .clone();
                (array, Some(*id))
            }
            Ok(Object::Array(array)) => (array.clone(), None),
            _ => return Ok(()),
        }
    };

    let mut kept = Vec::new();
    let mut widgets = Vec::new();
    for entry in annotations {
        let Object::Reference(annot_id) = entry else {
            kept.push(entry);
            continue;
        };
        let Some(dict) = doc.get_object(annot_id).ok().and_then(|o| o.as_dict().ok()) else {
            kept.push(entry);
            continue;
        };
        let is_widget = matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Widget");
        if !is_widget {
            kept.push(entry);
            continue;
        }
        widgets.push((widget_rect(doc, dict), normal_appearance(doc, dict)));
    }

    for (rect, appearance) in widgets {
        let (Some(rect), Some(appearance_id)) = (rect, appearance) else {
            // No usable normal appearance: the widget is stripped without a
            // visual trace.
            continue;
        };
        stamp_appearance(doc, page_id, rect, appearance_id)?;
    }

    if kept.is_empty() {
        let page = page_dict_mut(doc, page_id)?;
        page.remove(b"Annots");
    } else {
        match annotations_ref {
            Some(id) => {
                doc.objects.insert(id, Object::Array(kept));
            }
            None => {
                let page = page_dict_mut(doc, page_id)?;
                page.set("Annots", Object::Array(kept));
            }
        }
    }
    Ok(())
}

/// Paint a widget's appearance form into the page content, mapping the
/// form's `/BBox` onto the widget's `/Rect`.
fn stamp_appearance(
    doc: &mut Document,
    page_id: ObjectId,
    rect: Rect,
    appearance_id: ObjectId,
) -> Result<(), SignError> {
    let bbox = {
        let stream = doc
            .get_object(appearance_id)
            .and_then(Object::as_stream)
            .map_err(|e| SignError::Flatten(e.to_string()))?;
        appearance_bbox(&stream.dict)
    };
    let Some(bbox) = bbox else {
        return Ok(());
    };
    if !bbox.has_area() || !rect.has_area() {
        return Ok(());
    }

    // Appearance streams from the wild may lack the form XObject markers.
    {
        let stream = doc
            .get_object_mut(appearance_id)
            .and_then(Object::as_stream_mut)
            .map_err(|e| SignError::Flatten(e.to_string()))?;
        if stream.dict.get(b"Subtype").is_err() {
            stream.dict.set("Subtype", Object::Name(b"Form".to_vec()));
        }
        if stream.dict.get(b"Type").is_err() {
            stream.dict.set("Type", Object::Name(b"XObject".to_vec()));
        }
    }

    let scale_x = rect.width / bbox.width;
    let scale_y = rect.height / bbox.height;
    let offset_x = rect.x - bbox.x * scale_x;
    let offset_y = rect.y - bbox.y * scale_y;

    let name = register_page_xobject(doc, page_id, appearance_id)?;
    let ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(scale_x as f32),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(scale_y as f32),
                Object::Real(offset_x as f32),
                Object::Real(offset_y as f32),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ];
    append_page_content(doc, page_id, ops)
}

fn remove_acroform(doc: &mut Document) {
    let Some(catalog_id) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|o| o.as_reference().ok())
    else {
        return;
    };
    if let Ok(catalog) = doc.get_object_mut(catalog_id).and_then(Object::as_dict_mut) {
        catalog.remove(b"AcroForm");
    }
}

// ---------------------------------------------------------------------------
// Dictionary helpers
// ---------------------------------------------------------------------------

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, SignError> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| SignError::Commit(e.to_string()))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, SignError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| SignError::Commit(e.to_string()))
}

fn dict_clone(doc: &Document, id: ObjectId) -> Result<Dictionary, SignError> {
    doc.get_object(id)
        .and_then(Object::as_dict)
        .map(Clone::clone)
        .map_err(|e| SignError::Commit(e.to_string()))
}

fn widget_rect(doc: &Document, dict: &Dictionary) -> Option<Rect> {
    let rect_obj = dict.get(b"Rect").ok()?;
    let rect_obj = match rect_obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    rect_from_array(rect_obj.as_array().ok()?)
}

fn appearance_bbox(dict: &Dictionary) -> Option<Rect> {
    rect_from_array(dict.get(b"BBox").ok()?.as_array().ok()?)
}

fn rect_from_array(array: &[Object]) -> Option<Rect> {
    if array.len() != 4 {
        return None;
    }
    let mut nums = [0.0f64; 4];
    for (slot, obj) in nums.iter_mut().zip(array.iter()) {
        *slot = match obj {
            Object::Integer(i) => *i as f64,
            Object::Real(f) => *f as f64,
            _ => return None,
        };
    }
    Some(Rect::from_corners(nums[0], nums[1], nums[2], nums[3]))
}

/// Resolve a widget's `/AP /N` to a stamppable stream id, following `/AS`
/// through state dictionaries.
fn normal_appearance(doc: &Document, widget: &Dictionary) -> Option<ObjectId> {
    let ap_obj = widget.get(b"AP").ok()?;
    let ap = match ap_obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    }
    .as_dict()
    .ok()?;

    match ap.get(b"N").ok()? {
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Stream(_) => Some(*id),
            Object::Dictionary(states) => appearance_state(widget, states),
            _ => None,
        },
        Object::Dictionary(states) => appearance_state(widget, states),
        _ => None,
    }
}

fn appearance_state(widget: &Dictionary, states: &Dictionary) -> Option<ObjectId> {
    let state = match widget.get(b"AS") {
        Ok(Object::Name(name)) => name.clone(),
        _ => return None,
    };
    match states.get(state.as_slice()) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}
