//! Target locator
//!
//! Resolves the zero-or-one region of a document where the signature
//! belongs. Field and widget lookup go through an explicit [`FieldIndex`]
//! built once per document load, so candidate priority is a deterministic
//! rule table rather than runtime introspection.
//!
//! Every failure path returns the no-target sentinel; `locate` never errors.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::types::{FieldTarget, PlacementRect, Rect};

/// The reserved field name the fallback lookup uses (case-sensitive).
pub const RESERVED_FIELD_NAME: &str = "signatureZone";

/// Substring that marks a field as a signature target (matched lowercased).
const SIGNATURE_NAME_FRAGMENT: &str = "signature";

/// Push-button flag in `/Ff` (PDF 1.7 table 226, bit position 17).
const FIELD_FLAG_PUSHBUTTON: i64 = 1 << 16;

/// Cap on field-tree recursion, guards against circular `/Kids`.
const MAX_FIELD_DEPTH: usize = 64;

/// A widget annotation belonging to an indexed field.
#[derive(Debug, Clone)]
pub struct WidgetRef {
    /// Object id of the widget annotation dictionary.
    pub annotation_id: ObjectId,
    /// `/P` page reference, when the widget carries one.
    pub page_id: Option<ObjectId>,
    /// Normalized `/Rect`.
    pub rect: Rect,
}

/// One terminal AcroForm field with its widget annotations, in document
/// enumeration order.
#[derive(Debug, Clone)]
pub struct IndexedField {
    /// Fully qualified name (`/T` parts joined with `.`).
    pub name: String,
    /// Lowercased name, the key the candidate rules match on.
    pub lower_name: String,
    pub field_id: ObjectId,
    /// `/FT` name (`Tx`, `Btn`, `Ch`, `Sig`), possibly inherited.
    pub field_type: Option<String>,
    /// `/Ff` flag bitmask.
    pub flags: i64,
    pub widgets: Vec<WidgetRef>,
}

impl IndexedField {
    /// Whether this field's value can carry an image appearance.
    /// Push-buttons are the one AcroForm field kind rendered purely from
    /// their appearance stream.
    pub fn accepts_image_value(&self) -> bool {
        self.field_type.as_deref() == Some("Btn") && self.flags & FIELD_FLAG_PUSHBUTTON != 0
    }
}

/// Ordered index of a document's terminal form fields.
#[derive(Debug, Default)]
pub struct FieldIndex {
    fields: Vec<IndexedField>,
}

impl FieldIndex {
    /// Walk the catalog's `/AcroForm /Fields` tree and index every terminal
    /// field with its widgets. Documents without a form produce an empty
    /// index.
    pub fn build(doc: &Document) -> Self {
        let mut index = FieldIndex::default();

        let Some(fields_array) = acroform_fields(doc) else {
            return index;
        };

        for entry in &fields_array {
            let Object::Reference(field_id) = entry else {
                continue;
            };
            walk_field_tree(doc, *field_id, None, None, None, 0, &mut index.fields);
        }

        index
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[IndexedField] {
        &self.fields
    }

    /// Direct lookup by exact (case-sensitive) field name.
    pub fn by_exact_name(&self, name: &str) -> Option<&IndexedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Locate the placement target for `doc`.
///
/// Candidate priority: exact lowercased `signaturezone`, then the first
/// field whose lowercased name contains `signature`, then the reserved
/// literal looked up case-sensitively. No heuristic fallback placement: an
/// unmatched document yields the sentinel.
pub fn locate(doc: &Document) -> PlacementRect {
    let index = FieldIndex::build(doc);
    locate_in(doc, &index)
}

/// [`locate`] over a pre-built index.
pub fn locate_in(doc: &Document, index: &FieldIndex) -> PlacementRect {
    if index.is_empty() {
        return PlacementRect::none();
    }

    let candidate = index
        .fields()
        .iter()
        .find(|f| f.lower_name == "signaturezone")
        .or_else(|| {
            index
                .fields()
                .iter()
                .find(|f| f.lower_name.contains(SIGNATURE_NAME_FRAGMENT))
        })
        .or_else(|| index.by_exact_name(RESERVED_FIELD_NAME));

    let Some(field) = candidate else {
        return PlacementRect::none();
    };

    // A field with no visual instance is not usable as a target. Among
    // visual instances, repeated widgets (same field across pages) resolve
    // to the last in enumeration order; zero-area widgets are never
    // selected.
    let Some(widget) = field.widgets.iter().filter(|w| w.rect.has_area()).last() else {
        return PlacementRect::none();
    };

    let Some(page_index) = resolve_widget_page(doc, widget) else {
        return PlacementRect::none();
    };

    PlacementRect {
        page_index: page_index as i32,
        rect: widget.rect,
        field: Some(FieldTarget {
            name: field.name.clone(),
            field_id: field.field_id,
            widget_id: widget.annotation_id,
            accepts_image_value: field.accepts_image_value(),
        }),
    }
}

/// Resolve a widget to a zero-based page index by identity match against the
/// document's page list: the `/P` back-reference first, then a scan of each
/// page's `/Annots` for the widget's id. A widget matching neither is a
/// dangling reference.
fn resolve_widget_page(doc: &Document, widget: &WidgetRef) -> Option<usize> {
    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();

    if let Some(page_ref) = widget.page_id {
        if let Some(index) = pages.iter().find_map(|(&page_num, &page_id)| {
            (page_id == page_ref).then_some((page_num - 1) as usize)
        }) {
            return Some(index);
        }
    }

    for (&page_num, &page_id) in &pages {
        let Some(annots) = page_annotations(doc, page_id) else {
            continue;
        };
        let found = annots
            .iter()
            .any(|a| matches!(a, Object::Reference(id) if *id == widget.annotation_id));
        if found {
            return Some((page_num - 1) as usize);
        }
    }

    None
}

/// Fetch a page's `/Annots` array, following one level of indirection.
fn page_annotations(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let annots = resolve(doc, page.get(b"Annots").ok()?)?;
    annots.as_array().ok().cloned()
}

/// Fetch the catalog's `/AcroForm /Fields` array, following indirection.
fn acroform_fields(doc: &Document) -> Option<Vec<Object>> {
    let root = doc.trailer.get(b"Root").ok()?;
    let catalog = resolve(doc, root)?.as_dict().ok()?;
    let acroform = resolve(doc, catalog.get(b"AcroForm").ok()?)?.as_dict().ok()?;
    let fields = resolve(doc, acroform.get(b"Fields").ok()?)?;
    fields.as_array().ok().cloned()
}

/// Follow a reference to its object; pass anything else through.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Recursively walk the field tree, collecting terminal fields.
///
/// Intermediate nodes contribute their partial `/T` to the qualified name
/// and may pass `/FT` and `/Ff` down to their kids. A kid without `/T` is a
/// widget annotation of its parent, not a child field.
fn walk_field_tree(
    doc: &Document,
    field_id: ObjectId,
    parent_name: Option<&str>,
    inherited_ft: Option<&str>,
    inherited_flags: Option<i64>,
    depth: usize,
    fields: &mut Vec<IndexedField>,
) {
    if depth >= MAX_FIELD_DEPTH {
        return;
    }

    let Some(field_dict) = doc.get_object(field_id).ok().and_then(|o| o.as_dict().ok()) else {
        return;
    };

    let partial_name = dict_string(doc, field_dict, b"T");
    let full_name = match (parent_name, &partial_name) {
        (Some(parent), Some(name)) => format!("{parent}.{name}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(name)) => name.clone(),
        (None, None) => String::new(),
    };

    let field_type = match field_dict.get(b"FT") {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => inherited_ft.map(str::to_owned),
    };
    let flags = dict_i64(doc, field_dict, b"Ff").or(inherited_flags);

    // /Kids with /T are child fields; /Kids without /T are this field's
    // widget annotations.
    if let Some(kids) = dict_array(doc, field_dict, b"Kids") {
        let has_child_fields = kids.iter().any(|kid| {
            resolve(doc, kid)
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.get(b"T").is_ok())
        });

        if has_child_fields {
            for kid in &kids {
                if let Object::Reference(kid_id) = kid {
                    walk_field_tree(
                        doc,
                        *kid_id,
                        Some(&full_name),
                        field_type.as_deref(),
                        flags,
                        depth + 1,
                        fields,
                    );
                }
            }
            return;
        }

        let widgets = kids
            .iter()
            .filter_map(|kid| match kid {
                Object::Reference(kid_id) => widget_ref(doc, *kid_id),
                _ => None,
            })
            .collect();
        push_field(fields, full_name, field_id, field_type, flags, widgets);
        return;
    }

    // No /Kids: a merged field/widget dictionary carries its own /Rect.
    let widgets = widget_ref(doc, field_id).into_iter().collect();
    push_field(fields, full_name, field_id, field_type, flags, widgets);
}

fn push_field(
    fields: &mut Vec<IndexedField>,
    name: String,
    field_id: ObjectId,
    field_type: Option<String>,
    flags: Option<i64>,
    widgets: Vec<WidgetRef>,
) {
    let lower_name = name.to_lowercase();
    fields.push(IndexedField {
        name,
        lower_name,
        field_id,
        field_type,
        flags: flags.unwrap_or(0),
        widgets,
    });
}

/// Read a widget annotation's `/Rect` and `/P` into a [`WidgetRef`].
/// Annotations without a parseable `/Rect` are not visual instances.
fn widget_ref(doc: &Document, annotation_id: ObjectId) -> Option<WidgetRef> {
    let dict = doc
        .get_object(annotation_id)
        .ok()
        .and_then(|o| o.as_dict().ok())?;
    let rect = dict_rect(doc, dict, b"Rect")?;
    let page_id = match dict.get(b"P") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    Some(WidgetRef {
        annotation_id,
        page_id,
        rect,
    })
}

fn dict_string(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn dict_i64(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

fn dict_array(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<Object>> {
    resolve(doc, dict.get(key).ok()?)?.as_array().ok().cloned()
}

/// Read a 4-element `/Rect` (Integer or Real entries) as a normalized rect.
fn dict_rect(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Rect> {
    let arr = dict_array(doc, dict, key)?;
    if arr.len() != 4 {
        return None;
    }
    let mut nums = [0.0f64; 4];
    for (slot, obj) in nums.iter_mut().zip(arr.iter()) {
        *slot = object_to_f64(resolve(doc, obj)?)?;
    }
    Some(Rect::from_corners(nums[0], nums[1], nums[2], nums[3]))
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}
