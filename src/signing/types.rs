//! Placement types for the signing engine

use lopdf::ObjectId;
use serde::Serialize;

/// Axis-aligned rectangle in page space (PDF convention: origin bottom-left,
/// y increases upward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a PDF `/Rect` corner pair, normalizing swapped corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Handle to the form field selected as placement target.
#[derive(Debug, Clone)]
pub struct FieldTarget {
    /// Fully qualified field name (`/T`, hierarchical parts joined with `.`).
    pub name: String,
    /// The field dictionary's object id.
    pub field_id: ObjectId,
    /// The selected widget annotation's object id (equals `field_id` for
    /// merged field/widget dictionaries).
    pub widget_id: ObjectId,
    /// Whether the field's value can carry an image appearance
    /// (push-button fields).
    pub accepts_image_value: bool,
}

/// The resolved placement target.
///
/// `page_index == -1` with a zero rect is the "no usable target" sentinel;
/// a non-negative `page_index` always comes with a positive-area rect.
#[derive(Debug, Clone)]
pub struct PlacementRect {
    /// Zero-based page index, or `-1` when no target was found.
    pub page_index: i32,
    pub rect: Rect,
    pub field: Option<FieldTarget>,
}

impl PlacementRect {
    /// The "no usable target" sentinel.
    pub fn none() -> Self {
        Self {
            page_index: -1,
            rect: Rect::default(),
            field: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.page_index >= 0
    }
}

/// How the signature ended up in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Written as the target field's appearance value.
    FieldValue,
    /// Drawn directly onto the page content.
    PageOverlay,
    /// No usable target; the document was flattened but nothing was placed.
    None,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::FieldValue => "field_value",
            Placement::PageOverlay => "page_overlay",
            Placement::None => "none",
        }
    }
}
